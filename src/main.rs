//! `tcompose` entry point.
//!
//! Parses arguments, runs the command and prints failures through
//! [`user_friendly_error`] before exiting with status 1.

use clap::Parser;
use template_compose::cli::Cli;
use template_compose::core::user_friendly_error;

fn main() {
    let cli = Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(e) = cli.execute() {
        user_friendly_error(e).display();
        std::process::exit(1);
    }
}
