//! Composition directive scanning.
//!
//! Directives are found with a single regular expression rather than a template
//! parser. A directive has the shape
//!
//! ```text
//! {{ template "@partials/nav.html" . }}
//! {{ layout "@layouts/base.html" }}
//! ```
//!
//! Only quoted references starting with [`COMPOSABLE_MARKER`] are recognized,
//! so `{{ template "content" }}` remains an ordinary engine action. A directive
//! immediately preceded by an unescaped `{` is treated as literal text.
//!
//! Matches carry byte offsets into the text they were found in. After the
//! caller mutates its buffer (the resolver strips `layout` directives) those
//! offsets are stale, which is why the scanner hands out one match at a time
//! through [`DirectiveScanner::find_at`].

use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use crate::constants::COMPOSABLE_MARKER;
use crate::utils::paths::normalize_name;

static DIRECTIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*(template|layout)\s+"(@[^"]+)"[^}]*\}\}"#)
        .expect("directive pattern is a valid regex")
});

/// Kind of composition directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `{{ template "@name" }}`: splice the named template's definitions in.
    Include,
    /// `{{ layout "@name" }}`: embed this template's content into a base template.
    Layout,
}

impl DirectiveKind {
    fn from_keyword(keyword: &str) -> Self {
        if keyword == "layout" {
            Self::Layout
        } else {
            Self::Include
        }
    }

    /// Keyword as it is written in template source.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Include => "template",
            Self::Layout => "layout",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include => f.write_str("include"),
            Self::Layout => f.write_str("layout"),
        }
    }
}

/// A single directive occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Quoted literal content, marker included (`@partials/nav.html`).
    ///
    /// This is also the engine definition name the referenced template must
    /// declare.
    pub reference: String,
    /// Normalized template name with the marker stripped.
    pub name: String,
    /// Byte range of the whole `{{ ... }}` markup.
    pub span: Range<usize>,
}

/// Stateless scanner for composition directives.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveScanner;

impl DirectiveScanner {
    pub fn new() -> Self {
        Self
    }

    /// Find the first directive starting at or after byte `offset` of `text`.
    ///
    /// Offsets in the returned [`Directive`] are relative to the start of
    /// `text`, not to `offset`.
    pub fn find_at(&self, text: &str, offset: usize) -> Option<Directive> {
        let mut cursor = offset;
        while cursor <= text.len() {
            let captures = DIRECTIVE_PATTERN.captures_at(text, cursor)?;
            let whole = captures.get(0)?;

            if is_brace_escaped(text, whole.start()) {
                // Resume right after the opening brace pair so a directive
                // nested further into this markup can still be seen.
                cursor = whole.start() + 1;
                continue;
            }

            let keyword = captures.get(1)?.as_str();
            let reference = captures.get(2)?.as_str();
            return Some(Directive {
                kind: DirectiveKind::from_keyword(keyword),
                reference: reference.to_string(),
                name: normalize_name(&reference[COMPOSABLE_MARKER.len_utf8()..]),
                span: whole.range(),
            });
        }
        None
    }

    /// Iterate over every directive in an immutable buffer.
    pub fn scan<'t>(&self, text: &'t str) -> Directives<'t> {
        Directives {
            scanner: *self,
            text,
            cursor: 0,
        }
    }
}

/// Iterator returned by [`DirectiveScanner::scan`].
#[derive(Debug)]
pub struct Directives<'t> {
    scanner: DirectiveScanner,
    text: &'t str,
    cursor: usize,
}

impl Iterator for Directives<'_> {
    type Item = Directive;

    fn next(&mut self) -> Option<Self::Item> {
        let directive = self.scanner.find_at(self.text, self.cursor)?;
        self.cursor = directive.span.end;
        Some(directive)
    }
}

/// A directive starting at `start` is escaped when the byte before it is a `{`
/// that is not itself escaped with a backslash.
fn is_brace_escaped(text: &str, start: usize) -> bool {
    let bytes = text.as_bytes();
    match start.checked_sub(1).map(|i| bytes[i]) {
        Some(b'{') => !(start >= 2 && bytes[start - 2] == b'\\'),
        _ => false,
    }
}
