use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    /// Per-request timeout, e.g. 30s or 2m; `none` disables it
    #[arg(required = false, long, short = 'T', global = true)]
    pub timeout: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the effective configuration to stdout
    Config,

    /// List upstream versions metadata can be generated for
    #[clap(name = "versions", visible_alias = "ls")]
    Versions {
        /// Print versions as a JSON array
        #[arg(required = false, long)]
        json_output: bool,

        /// Only print the newest N versions
        #[arg(required = false, short, long)]
        limit: Option<usize>,
    },

    /// Generate verified metadata for the given versions
    #[command(arg_required_else_help = true)]
    #[clap(name = "metadata", visible_alias = "gen")]
    Metadata {
        /// Versions to resolve, e.g. 1.22.19
        #[arg(required = true)]
        versions: Vec<String>,

        /// Write the records to this file instead of stdout
        #[arg(required = false, short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Fail instead of skipping versions that publish no source archive
        #[arg(required = false, long)]
        strict: bool,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_metadata_command() {
        let args = Args::parse_from([
            "relmeta",
            "-vv",
            "--timeout",
            "30s",
            "metadata",
            "1.22.19",
            "1.22.18",
            "-o",
            "out.json",
        ]);

        assert_eq!(args.verbose, 2);
        assert_eq!(args.timeout.as_deref(), Some("30s"));
        match args.command {
            Commands::Metadata {
                versions,
                output,
                strict,
            } => {
                assert_eq!(versions, vec!["1.22.19", "1.22.18"]);
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert!(!strict);
            }
            _ => panic!("expected metadata command"),
        }
    }

    #[test]
    fn test_metadata_requires_versions() {
        assert!(Args::try_parse_from(["relmeta", "metadata"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["relmeta", "versions", "--json-output", "-q"]);
        assert!(args.quiet);
        assert!(matches!(
            args.command,
            Commands::Versions {
                json_output: true,
                limit: None
            }
        ));
    }
}
