//! Netreach CLI - derive and sync network reachability facts

mod cli;

use clap::Parser;

fn main() {
    // Logging is initialized inside run() once flags are known
    let cli_args = cli::Cli::parse();

    let mut app = cli::NetreachApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
