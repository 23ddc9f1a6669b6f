//! License detection for source archives.

use std::{
    collections::BTreeSet,
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use flate2::read::GzDecoder;
use tracing::{debug, trace};

/// License files deeper than this (counting the archive's top-level directory) belong
/// to vendored code, not to the project itself.
const MAX_LICENSE_DEPTH: usize = 2;

/// License texts are short; anything larger is not worth classifying.
const MAX_LICENSE_SIZE: u64 = 256 * 1024;

const LICENSE_STEMS: [&str; 3] = ["license", "licence", "copying"];

/// Returns the SPDX identifiers of the licenses found at the top of a `.tar.gz`
/// archive, sorted and deduplicated. Unrecognized license texts are ignored.
pub fn lookup_licenses<P: AsRef<Path>>(archive: P) -> io::Result<Vec<String>> {
    let archive = archive.as_ref();
    let file = File::open(archive)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut found = BTreeSet::new();
    for entry in tarball.entries()? {
        let entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.into_owned();
        if path.components().count() > MAX_LICENSE_DEPTH || !is_license_file(&path) {
            continue;
        }

        let mut text = String::new();
        entry.take(MAX_LICENSE_SIZE).read_to_string(&mut text)?;

        match classify(&text) {
            Some(id) => {
                debug!("{} is {id}", path.display());
                found.insert(id.to_string());
            }
            None => trace!("unrecognized license text in {}", path.display()),
        }
    }

    Ok(found.into_iter().collect())
}

fn is_license_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    let stem = name.split('.').next().unwrap_or_default();
    LICENSE_STEMS.iter().any(|known| {
        stem == *known
            || stem
                .strip_prefix(known)
                .is_some_and(|rest| rest.starts_with('-'))
    })
}

/// Identifies a license by distinctive phrases of its text.
pub fn classify(text: &str) -> Option<&'static str> {
    let text = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if text.contains("apache license") && text.contains("version 2.0") {
        return Some("Apache-2.0");
    }
    if text.contains("permission is hereby granted, free of charge, to any person obtaining a copy")
    {
        return Some("MIT");
    }
    if text.contains("permission to use, copy, modify, and")
        && text.contains("distribute this software for any purpose with or without fee")
    {
        return Some("ISC");
    }
    if text.contains("redistribution and use in source and binary forms") {
        if text.contains("neither the name") || text.contains("names of its contributors") {
            return Some("BSD-3-Clause");
        }
        return Some("BSD-2-Clause");
    }
    None
}

#[cfg(test)]
mod tests {
    use std::fs;

    use flate2::{write::GzEncoder, Compression};
    use tempfile::tempdir;

    use super::*;
    use crate::test_utils::ARCHIVE;

    const MIT: &str = "Permission is hereby granted, free of charge, to any person obtaining a copy\nof this software and associated documentation files";

    fn build_archive(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_fixture_archive_is_bsd_2_clause() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("yarn-v1.22.19.tar.gz");
        fs::write(&path, ARCHIVE).unwrap();

        assert_eq!(lookup_licenses(&path).unwrap(), vec!["BSD-2-Clause"]);
    }

    #[test]
    fn test_vendored_licenses_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pkg.tar.gz");
        build_archive(
            &path,
            &[
                ("pkg-1.0.0/LICENSE.md", MIT),
                ("pkg-1.0.0/node_modules/dep/LICENSE", "Apache License\nVersion 2.0"),
            ],
        );

        assert_eq!(lookup_licenses(&path).unwrap(), vec!["MIT"]);
    }

    #[test]
    fn test_multiple_licenses_sorted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pkg.tar.gz");
        build_archive(
            &path,
            &[
                ("pkg/LICENSE-MIT", MIT),
                ("pkg/LICENSE-APACHE", "Apache License\n   Version 2.0, January 2004"),
                ("pkg/README.md", MIT),
            ],
        );

        assert_eq!(lookup_licenses(&path).unwrap(), vec!["Apache-2.0", "MIT"]);
    }

    #[test]
    fn test_archive_without_license() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pkg.tar.gz");
        build_archive(&path, &[("pkg/index.js", "module.exports = {}")]);

        assert!(lookup_licenses(&path).unwrap().is_empty());
    }

    #[test]
    fn test_not_a_gzip_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pkg.tar.gz");
        fs::write(&path, b"plain text").unwrap();

        assert!(lookup_licenses(&path).is_err());
    }

    #[test]
    fn test_is_license_file() {
        assert!(is_license_file(Path::new("pkg/LICENSE")));
        assert!(is_license_file(Path::new("pkg/licence.txt")));
        assert!(is_license_file(Path::new("COPYING")));
        assert!(is_license_file(Path::new("pkg/LICENSE-MIT")));
        assert!(!is_license_file(Path::new("pkg/licenses.js")));
        assert!(!is_license_file(Path::new("pkg/README.md")));
    }

    #[test]
    fn test_classify_bsd_variants() {
        let two = "Redistribution and use in source and binary forms, with or without\nmodification, are permitted provided that the following conditions are met:";
        assert_eq!(classify(two), Some("BSD-2-Clause"));

        let three = format!("{two}\n3. Neither the name of the copyright holder nor the names");
        assert_eq!(classify(&three), Some("BSD-3-Clause"));
    }

    #[test]
    fn test_classify_isc() {
        let isc = "Permission to use, copy, modify, and/or distribute this software for any\npurpose with or without fee is hereby granted";
        assert_eq!(classify(isc), Some("ISC"));
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify("All rights reserved."), None);
    }
}
