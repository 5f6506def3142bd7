//! Shared constants for directive recognition and template lookup.

/// Marker character that distinguishes composable references from the
/// engine's own definition names.
///
/// Only `{{ template "@name" }}` and `{{ layout "@name" }}` take part in
/// composition; `{{ template "content" }}` is left entirely to the engine.
pub const COMPOSABLE_MARKER: char = '@';

/// File name served when a template name designates a directory.
pub const DIRECTORY_INDEX: &str = "index.html";

/// Default template root used when no configuration is supplied.
pub const DEFAULT_TEMPLATE_ROOT: &str = ".";

/// Environment variable consulted by the CLI for a configuration file path.
pub const CONFIG_ENV_VAR: &str = "TCOMPOSE_CONFIG";
