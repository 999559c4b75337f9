//! bitcache command-line entry point.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use log::LevelFilter;

const PROG: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Content-addressable identifier cache.
#[derive(Parser, Debug)]
#[command(name = PROG)]
#[command(disable_version_flag = true)]
struct Args {
    /// Enable debug output for troubleshooting.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Enable verbose output. May be given more than once.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Display the bitcache version and exit.
    #[arg(short = 'V', long = "version")]
    version: bool,
}

impl Args {
    fn log_level(&self) -> LevelFilter {
        match (self.debug, self.verbose) {
            (true, _) => LevelFilter::Debug,
            (false, 0) => LevelFilter::Warn,
            (false, 1) => LevelFilter::Info,
            (false, _) => LevelFilter::Debug,
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let rendered = e.to_string();
            let message = rendered.lines().next().unwrap_or_default();
            eprintln!("{PROG}: {}", message.trim_start_matches("error: "));
            return ExitCode::from(1);
        }
    };

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    if args.version {
        println!("{VERSION}");
        return ExitCode::SUCCESS;
    }

    log::debug!("{PROG} {VERSION} started with {args:?}");
    let known: bitcache::IdentifierSet<bitcache::Id> = bitcache::IdentifierSet::new();
    log::info!("identifier set ready ({} entries)", known.count());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_surface() {
        let a = Args::try_parse_from(["bitcache", "-d", "-vv"]).unwrap();
        assert!(a.debug);
        assert_eq!(a.verbose, 2);
        assert!(!a.version);

        let a = Args::try_parse_from(["bitcache", "--version"]).unwrap();
        assert!(a.version);
    }

    #[test]
    fn verbosity_maps_to_levels() {
        let a = Args::try_parse_from(["bitcache"]).unwrap();
        assert_eq!(a.log_level(), LevelFilter::Warn);
        let a = Args::try_parse_from(["bitcache", "-v"]).unwrap();
        assert_eq!(a.log_level(), LevelFilter::Info);
        let a = Args::try_parse_from(["bitcache", "--verbose", "--verbose"]).unwrap();
        assert_eq!(a.log_level(), LevelFilter::Debug);
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let e = Args::try_parse_from(["bitcache", "--bogus"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnknownArgument);
    }
}
