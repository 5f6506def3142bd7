//! Lexical path handling for template names.
//!
//! Template names look like filesystem paths but are never touched on disk
//! until a reader resolves them, so normalization here is purely lexical and
//! independent of the host platform's separator.

use std::path::{Component, Path, PathBuf};

/// Normalize a template name so the same logical template always maps to the
/// same key.
///
/// Names are relative to the template root, so `/page.html` and `page.html`
/// are the same template. The rules:
/// - backslashes become forward slashes
/// - repeated separators collapse into one
/// - `.` segments are dropped
/// - `..` removes the previous segment; at the front of a relative name it is
///   kept, at the root of an absolute name it is discarded
/// - a leading `/` is dropped
/// - an empty result becomes `.`
///
/// # Examples
///
/// ```
/// use template_compose::utils::paths::normalize_name;
///
/// assert_eq!(normalize_name("partials//./header.html"), "partials/header.html");
/// assert_eq!(normalize_name("/a/b/../c"), "a/c");
/// assert_eq!(normalize_name("../shared\\nav.html"), "../shared/nav.html");
/// assert_eq!(normalize_name("/"), ".");
/// ```
pub fn normalize_name(name: &str) -> String {
    let unified = name.replace('\\', "/");
    let rooted = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Resolve a normalized template name against a root directory.
///
/// Returns `None` when the name would escape `root` (a leading `..` segment),
/// so readers can refuse it before any filesystem access happens.
pub fn resolve_under_root(root: &Path, name: &str) -> Option<PathBuf> {
    let relative = normalize_name(name);
    let relative = Path::new(&relative);

    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}
