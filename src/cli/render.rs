//! `tcompose render`: render one template to stdout.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

use super::RuntimeArgs;
use crate::config::RuntimeConfig;
use crate::templating::OutputKind;

#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Template name, relative to the template root.
    pub name: String,

    /// Engine to render with; `html` escapes interpolated values.
    #[arg(short, long, value_enum, default_value_t = OutputKind::Text)]
    pub kind: OutputKind,

    /// JSON file holding the render data.
    #[arg(short, long, conflicts_with = "data_json")]
    pub data: Option<PathBuf>,

    /// Render data as an inline JSON object.
    #[arg(long)]
    pub data_json: Option<String>,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

impl RenderCommand {
    pub fn execute(&self, config: &RuntimeConfig) -> Result<()> {
        let data = self.load_data()?;
        let runtime = self.runtime.runtime(config);

        let mut out = std::io::stdout().lock();
        runtime
            .render_as(self.kind, &mut out, &self.name, &data)
            .with_context(|| format!("failed to render `{}`", self.name))?;
        out.flush().context("failed to write output")?;
        Ok(())
    }

    fn load_data(&self) -> Result<Value> {
        if let Some(inline) = &self.data_json {
            return serde_json::from_str(inline).context("--data-json is not valid JSON");
        }
        let Some(path) = &self.data else {
            return Ok(Value::Null);
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read render data from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("render data in {} is not valid JSON", path.display()))
    }
}
