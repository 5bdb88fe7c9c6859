//! storefront-probe: agent checkout readiness from the command line

use anyhow::Result;
use storefront_probe::cli::{parse_args, run_cli};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("storefront_probe=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run with --help for usage.");
            std::process::exit(1);
        }
    };

    if args.show_version {
        println!("storefront-probe v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.show_help {
        print_help();
        return Ok(());
    }

    let exit_code = run_cli(args);
    std::process::exit(exit_code);
}

fn print_help() {
    println!("storefront-probe: can an autonomous agent buy from this store?");
    println!();
    println!("USAGE:");
    println!("  storefront-probe [options] <domain> [domain...]");
    println!();
    println!("OPTIONS:");
    println!("  --type, -t <type>    browse | search | add_to_cart | checkout | full_flow (default)");
    println!("  --category <name>    Revenue baseline category (retail, fashion, ...)");
    println!("  --config <file>      TOML configuration file");
    println!("  --db <file>          SQLite store for prior scans and run history");
    println!("  --json               Print the run as JSON");
    println!("  --version, -V        Show version");
    println!("  --help, -h           Show this help");
    println!();
    println!("Logging goes to stderr; set RUST_LOG to change verbosity.");
}
