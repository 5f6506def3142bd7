//! Errors raised while composing and rendering templates.
//!
//! Failures in nested templates are wrapped in [`ComposeError::Directive`]
//! once per level, so a message reads from the outermost template inwards:
//!
//! ```text
//! could not resolve directive `include` `@partials/nav.html` of `index.html`:
//!   could not resolve directive `include` `@icons.html` of `partials/nav.html`:
//!   No such file or directory (os error 2)
//! ```
//!
//! Reader failures are kept as the original [`std::io::Error`] at the bottom of
//! that chain; [`ComposeError::io_error`] digs it out.

use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

use super::engine::EngineError;
use super::scanner::DirectiveKind;

#[derive(Debug, Error)]
pub enum ComposeError {
    /// The reader failed; the error is passed through untouched.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A template includes or layouts itself, directly or transitively.
    #[error("cannot resolve `{name}` recursively")]
    Recursive {
        name: String,
    },

    #[error("'layout' directive cannot be performed twice in `{name}`")]
    DuplicateLayout {
        name: String,
    },

    #[error("could not attach definition `{definition}` to `{template}`: {source}")]
    Merge {
        definition: String,
        template: String,
        #[source]
        source: EngineError,
    },

    #[error("could not parse `{name}`: {source}")]
    Parse {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("could not execute `{name}`: {source}")]
    Execute {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("template `{name}` is not valid UTF-8: {source}")]
    Encoding {
        name: String,
        #[source]
        source: FromUtf8Error,
    },

    /// Render data could not be converted to JSON.
    #[error("could not serialize render data: {0}")]
    Data(#[source] serde_json::Error),

    /// A referenced template failed to resolve.
    #[error("could not resolve directive `{kind}` `{reference}` of `{parent}`: {source}")]
    Directive {
        kind: DirectiveKind,
        reference: String,
        parent: String,
        #[source]
        source: Box<ComposeError>,
    },
}

impl ComposeError {
    /// The innermost error behind any directive wrappers.
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Self::Directive {
            source,
            ..
        } = current
        {
            current = source.as_ref();
        }
        current
    }

    /// The reader's I/O error, if that is what ultimately failed.
    ///
    /// ```
    /// use std::io;
    /// use template_compose::templating::ComposeError;
    ///
    /// let err = ComposeError::from(io::Error::from(io::ErrorKind::NotFound));
    /// assert_eq!(err.io_error().map(io::Error::kind), Some(io::ErrorKind::NotFound));
    /// ```
    pub fn io_error(&self) -> Option<&io::Error> {
        match self.root_cause() {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }

    /// Whether a reader reported the template (or a dependency) as missing.
    pub fn is_not_found(&self) -> bool {
        self.io_error().is_some_and(|err| err.kind() == io::ErrorKind::NotFound)
    }

    /// Whether a composition cycle caused this failure.
    pub fn is_recursive(&self) -> bool {
        matches!(self.root_cause(), Self::Recursive { .. })
    }

    /// Template names from the outermost template down to the failing one.
    pub fn chain(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = self;
        while let Self::Directive {
            parent,
            source,
            ..
        } = current
        {
            names.push(parent.as_str());
            current = source.as_ref();
        }
        match current {
            Self::Recursive {
                name,
            }
            | Self::DuplicateLayout {
                name,
            }
            | Self::Parse {
                name,
                ..
            }
            | Self::Execute {
                name,
                ..
            }
            | Self::Encoding {
                name,
                ..
            } => names.push(name.as_str()),
            Self::Merge {
                template,
                ..
            } => names.push(template.as_str()),
            Self::Io(_) | Self::Data(_) | Self::Directive { .. } => {}
        }
        names
    }
}
