//! Prompt templates.
//!
//! Templates use mustache placeholders. `{{{name}}}` substitutes the value
//! verbatim; `{{name}}` HTML-escapes it. Prompt templates almost always want
//! the triple form, since chunk text is code or prose rather than markup.
//!
//! ```text
//! "Summarize:\n\n{{{chunk}}}\n\nSummary:"
//! ```
//!
//! Unknown names render as the empty string, as in mustache.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::Result;

/// The variable each chunk is bound to during a map pass.
pub const CHUNK_VAR: &str = "chunk";

/// Substitutes named variables into a template.
pub trait Renderer: Send + Sync {
    /// Render `template` with `vars`.
    fn render(&self, template: &str, vars: &[(&str, &str)]) -> Result<String>;
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}\}|\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}")
        .expect("placeholder pattern is valid")
});

/// Variable substitution with mustache placeholder syntax.
///
/// Sections, partials and lambdas are not supported; prompt templates in
/// this crate never need them.
///
/// ```rust
/// use condense::{MustacheRenderer, Renderer};
///
/// let out = MustacheRenderer
///     .render("Q: {{{q}}} / {{q}}", &[("q", "a < b")])
///     .unwrap();
/// assert_eq!(out, "Q: a < b / a &lt; b");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MustacheRenderer;

impl Renderer for MustacheRenderer {
    fn render(&self, template: &str, vars: &[(&str, &str)]) -> Result<String> {
        let lookup = |name: &str| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map_or("", |(_, value)| *value)
        };

        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            match (caps.get(1), caps.get(2)) {
                (Some(raw), _) => lookup(raw.as_str()).to_string(),
                (None, Some(escaped)) => escape_html(lookup(escaped.as_str())),
                (None, None) => String::new(),
            }
        });

        Ok(rendered.into_owned())
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
    out
}
