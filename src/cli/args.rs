//! CLI argument parsing
//!
//! - Positional: one or more domains
//! - Options: --type, --category, --config, --db, --json, --version, --help

use crate::cli::{Error, Result};
use crate::probe::types::TestType;

/// Parsed CLI arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    /// Domains to probe (more than one runs a batch)
    pub domains: Vec<String>,

    /// Test depth
    pub test_type: TestType,

    /// Merchant category for revenue estimation
    pub category: Option<String>,

    /// TOML configuration file
    pub config_file: Option<String>,

    /// SQLite database file for prior scans and run history
    pub db_file: Option<String>,

    /// JSON output flag
    pub json_output: bool,

    /// Show version and exit
    pub show_version: bool,

    /// Show help and exit
    pub show_help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            test_type: TestType::FullFlow,
            category: None,
            config_file: None,
            db_file: None,
            json_output: false,
            show_version: false,
            show_help: false,
        }
    }
}

/// Parse CLI arguments from std::env::args()
///
/// Grammar:
/// ```text
/// storefront-probe [options] <domain> [domain...]
///
/// OPTIONS:
///   --type <test-type>   browse | search | add_to_cart | checkout | full_flow
///   --category <name>    Revenue baseline category
///   --config <file>      TOML configuration
///   --db <file>          SQLite store
///   --json               Output JSON
///   --version            Show version
///   --help               Show help
/// ```
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut iter = args.into_iter();
    let _program = iter.next();

    let mut out = Args::default();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" => out.show_version = true,
            "--help" | "-h" => out.show_help = true,
            "--json" => out.json_output = true,
            "--type" | "-t" => {
                let value = iter.next().ok_or_else(|| {
                    Error::MissingArgument("--type requires a test type".to_string())
                })?;
                out.test_type = value.parse().map_err(Error::InvalidArgs)?;
            }
            "--category" => {
                let value = iter.next().ok_or_else(|| {
                    Error::MissingArgument("--category requires a name".to_string())
                })?;
                out.category = Some(value);
            }
            "--config" => {
                let value = iter.next().ok_or_else(|| {
                    Error::MissingArgument("--config requires a path".to_string())
                })?;
                out.config_file = Some(value);
            }
            "--db" => {
                let value = iter.next().ok_or_else(|| {
                    Error::MissingArgument("--db requires a path".to_string())
                })?;
                out.db_file = Some(value);
            }
            other if other.starts_with('-') => {
                return Err(Error::InvalidArgs(format!("Unknown option: {}", other)));
            }
            other => out.domains.push(other.to_string()),
        }
    }

    if out.domains.is_empty() && !out.show_help && !out.show_version {
        return Err(Error::MissingArgument("domain".to_string()));
    }

    Ok(out)
}
