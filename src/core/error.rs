//! User-facing error presentation for the command line.
//!
//! Library code returns typed errors ([`ComposeError`], [`ConfigError`]); the
//! binary works with [`anyhow::Error`] and turns the final error into an
//! [`ErrorContext`] right before exiting, attaching details and a suggestion
//! where the failure is one a user can act on.

use colored::Colorize;
use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::templating::ComposeError;

/// An error message with optional details and a suggested fix.
#[derive(Debug)]
pub struct ErrorContext {
    pub message: String,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for the terminal.
///
/// The message is the whole cause chain; the first recognized error in the
/// chain decides the suggestion.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let context = ErrorContext::new(chain_message(&error));

    for cause in error.chain() {
        if let Some(compose) = cause.downcast_ref::<ComposeError>() {
            return compose_context(context, compose);
        }
        if let Some(config) = cause.downcast_ref::<ConfigError>() {
            return match config {
                ConfigError::Read { .. } => context
                    .with_suggestion("Check the --config path or unset the TCOMPOSE_CONFIG variable"),
                ConfigError::Parse { .. } | ConfigError::Invalid(_) => context
                    .with_suggestion("Only `root` and `cache = \"enabled\" | \"disabled\"` are recognized"),
            };
        }
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return io_context(context, io_error);
        }
    }

    context
}

/// Join the cause chain with `: `, skipping causes whose message the
/// previous one already ends with.
fn chain_message(error: &anyhow::Error) -> String {
    let mut message = String::new();
    for cause in error.chain() {
        let text = cause.to_string();
        if message.ends_with(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }
    message
}

fn compose_context(mut context: ErrorContext, error: &ComposeError) -> ErrorContext {
    if matches!(error, ComposeError::Directive { .. }) {
        context = context.with_details(format!("resolution path: {}", error.chain().join(" -> ")));
    }

    match error.root_cause() {
        ComposeError::Io(io_error) => io_context(context, io_error),
        ComposeError::Recursive { name } => context.with_suggestion(format!(
            "`{name}` includes or layouts itself; move the shared part into its own template"
        )),
        ComposeError::DuplicateLayout { name } => {
            context.with_suggestion(format!("Keep a single `layout` directive in `{name}`"))
        }
        ComposeError::Merge { definition, template, .. } => context.with_suggestion(format!(
            "Declare `{{{{ define \"{definition}\" }}}}...{{{{ end }}}}` in `{template}`"
        )),
        ComposeError::Parse { .. } => {
            context.with_suggestion("Check the template syntax near the reported location")
        }
        ComposeError::Execute { .. } | ComposeError::Data(_) => context
            .with_suggestion("Check that the render data provides every value the template uses"),
        ComposeError::Encoding { .. } => context.with_suggestion("Save the template as UTF-8"),
        ComposeError::Directive { .. } => context,
    }
}

fn io_context(context: ErrorContext, error: &io::Error) -> ErrorContext {
    match error.kind() {
        io::ErrorKind::NotFound => context.with_suggestion(
            "Check the template name and the template root (--root or `root` in the config)",
        ),
        io::ErrorKind::PermissionDenied => {
            context.with_suggestion("Template names must stay inside the template root and be readable")
        }
        _ => context,
    }
}
