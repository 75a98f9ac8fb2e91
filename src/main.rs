//! Binary entrypoint for the `unstuck` chat client.

use std::process::ExitCode;

use unstuck_chat::cli;

/// Run the command given on the command line.
fn main() -> ExitCode {
    cli::run()
}
