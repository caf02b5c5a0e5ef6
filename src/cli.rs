// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   woogle serve [--port N]    coordinator API plus a local worker pump
//
// Everything else (block size, limits, poll timing) comes from the
// environment; see config.rs.
// =============================================================================

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "woogle",
    version,
    about = "A queue-driven website crawler",
    long_about = "woogle crawls a website breadth-first through a message queue. \
                  Each queue message triggers one short worker cycle that scans a few pages, \
                  stores them, and queues the links it found, until the page limit is reached."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the coordinator API with an in-process queue and worker
    ///
    /// Example: woogle serve --port 3001
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_port_override() {
        let cli = Cli::parse_from(["woogle", "serve", "--port", "8080"]);
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080) }));
    }

    #[test]
    fn test_serve_port_defaults_to_config() {
        let cli = Cli::parse_from(["woogle", "serve"]);
        assert!(matches!(cli.command, Commands::Serve { port: None }));
    }

    #[test]
    fn test_no_standalone_cycle_command() {
        // A lone cycle would save into a store nobody else can see
        assert!(Cli::try_parse_from(["woogle", "cycle", "--message", "-"]).is_err());
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Option<u16> for --port
//    - clap treats an Option field as an optional flag
//    - None means "not given", so the PORT variable (or its default) applies
//
// 2. Doc comments become help text
//    - The /// lines on each variant and field show up in `woogle --help`
// -----------------------------------------------------------------------------
