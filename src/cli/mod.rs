//! Command-line interface for `tcompose`.
//!
//! # Commands
//!
//! - `render <NAME>`: render a template to stdout
//! - `check <NAME>...`: resolve templates without rendering them and list
//!   their direct dependencies
//!
//! # Global options
//!
//! - `--config <FILE>`: configuration file (also `TCOMPOSE_CONFIG`)
//! - `--verbose`: debug logging on stderr
//! - `--quiet`: errors only
//!
//! `RUST_LOG` overrides the default log filter when neither flag is given.
//!
//! ```bash
//! tcompose --config site/tcompose.toml render index.html --kind html --data page.json
//! tcompose check --root templates index.html about/index.html
//! ```

mod check;
mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::RuntimeConfig;
use crate::constants::CONFIG_ENV_VAR;
use crate::templating::Runtime;

pub use check::CheckCommand;
pub use render::RenderCommand;

#[derive(Parser, Debug)]
#[command(
    name = "tcompose",
    about = "Render composable templates with layouts and includes",
    version,
    long_about = "Resolves {{ template \"@name\" }} and {{ layout \"@name\" }} directives \
                  across a directory of templates and renders the result with Tera."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file.
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template to stdout.
    Render(RenderCommand),
    /// Resolve templates and list their direct dependencies.
    Check(CheckCommand),
}

/// Options shared by every command that builds a runtime.
#[derive(Args, Debug, Default, Clone)]
pub struct RuntimeArgs {
    /// Template root directory; overrides the configuration file.
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl RuntimeArgs {
    /// Runtime for `config`, with `--root` taking precedence over its root.
    fn runtime(&self, config: &RuntimeConfig) -> Runtime {
        let mut config = config.clone();
        if let Some(root) = &self.root {
            config.root.clone_from(root);
        }
        tracing::debug!(root = %config.root.display(), cache = %config.cache, "using template root");
        Runtime::from_config(&config)
    }
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        self.init_logging();
        let config = load_config(self.config.as_deref())?;

        match self.command {
            Commands::Render(cmd) => cmd.execute(&config),
            Commands::Check(cmd) => cmd.execute(&config),
        }
    }

    /// Log filter directive implied by the verbosity flags.
    pub fn log_filter(&self) -> Option<&'static str> {
        if self.verbose {
            Some("template_compose=debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }

    fn init_logging(&self) {
        let filter = match self.log_filter() {
            Some(directive) => EnvFilter::new(directive),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    let Some(path) = path else {
        return Ok(RuntimeConfig::default());
    };
    RuntimeConfig::load(path).with_context(|| format!("failed to load configuration from {}", path.display()))
}
