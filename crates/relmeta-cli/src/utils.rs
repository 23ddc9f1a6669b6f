use std::{
    fmt::Display,
    sync::{LazyLock, PoisonError, RwLock},
};

use nu_ansi_term::Color;
use relmeta_core::{RelmetaError, RelmetaResult};
use ureq::http::{HeaderMap, HeaderName, HeaderValue};

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().unwrap_or_else(PoisonError::into_inner);
        if *color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Parses `Name: value` pairs given on the command line.
pub fn parse_headers(headers: &[String]) -> RelmetaResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for header in headers {
        let (key, value) = header.split_once(':').ok_or_else(|| {
            RelmetaError::Custom(format!(
                "Invalid header `{header}`: expected `Name: value`"
            ))
        })?;
        let name = HeaderName::from_bytes(key.trim().as_bytes()).map_err(|err| {
            RelmetaError::Custom(format!("Invalid header name `{key}`: {err}"))
        })?;
        let value = HeaderValue::from_str(value.trim()).map_err(|err| {
            RelmetaError::Custom(format!("Invalid header value for `{key}`: {err}"))
        })?;
        map.append(name, value);
    }
    Ok(map)
}
