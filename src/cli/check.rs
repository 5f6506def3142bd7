//! `tcompose check`: resolve templates without rendering them.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::RuntimeArgs;
use crate::config::RuntimeConfig;
use crate::templating::OutputKind;

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Template names, relative to the template root.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Engine to compile with.
    #[arg(short, long, value_enum, default_value_t = OutputKind::Text)]
    pub kind: OutputKind,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

impl CheckCommand {
    pub fn execute(&self, config: &RuntimeConfig) -> Result<()> {
        let runtime = self.runtime.runtime(config);

        for name in &self.names {
            let dependencies = runtime
                .prepare(self.kind, name)
                .with_context(|| format!("failed to resolve `{name}`"))?;
            println!("{} {}", "ok".green(), format_entry(name, &dependencies));
        }
        Ok(())
    }
}

fn format_entry(name: &str, dependencies: &[String]) -> String {
    if dependencies.is_empty() {
        name.to_string()
    } else {
        format!("{name} -> {}", dependencies.join(", "))
    }
}
