use std::process::ExitCode;

use clap::Parser;
use remove_dup_cli::{Cli, EXIT_FATAL};

fn main() -> ExitCode {
    let cli = Cli::parse();
    remove_dup_cli::init_tracing(cli.verbose);
    match remove_dup_cli::block_on(cli.run()) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
