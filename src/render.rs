//! Template rendering.
//!
//! Templates use a small mustache-like language:
//!
//! - `{{{name}}}` and `{{name}}` are replaced by the value of component
//!   `name`, verbatim.
//! - `{{#first}} a || b || c {{/first}}` emits the first alternative that
//!   is non-empty once placeholders are substituted. Blocks do not nest.
//!
//! Rendering runs in two passes over the text: placeholder substitution,
//! then `{{#first}}` resolution. Whatever placeholder is still left is
//! removed at the end.

use crate::types::Components;
use regex::Regex;
use std::sync::LazyLock;

const FIRST_OPEN: &str = "{{#first}}";
const FIRST_CLOSE: &str = "{{/first}}";
const ALTERNATIVE_SEPARATOR: &str = "||";

static LEFTOVER_PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^}]*\}\}").expect("valid regex"));

/// Render `template` with `components`.
///
/// The result is raw, multi-line text: it still contains blank lines and
/// dangling separators left by missing components.
///
/// # Example
///
/// ```rust
/// use address_formatter::{render, Components};
///
/// let components: Components = [("road", "Rue de Rivoli"), ("town", "Paris")]
///     .into_iter()
///     .collect();
///
/// let rendered = render::render(
///     &components,
///     "{{{road}}}\n{{#first}} {{{city}}} || {{{town}}} {{/first}}",
/// );
/// assert_eq!(rendered, "Rue de Rivoli\nParis");
/// ```
pub fn render(components: &Components, template: &str) -> String {
    let substituted = substitute_placeholders(components, template);
    let resolved = resolve_first_blocks(&substituted);
    LEFTOVER_PLACEHOLDER_RE.replace_all(&resolved, "").into_owned()
}

/// First pass: substitute placeholders whose component is present.
///
/// Unresolved triple-brace placeholders are dropped. Unresolved double-brace
/// tokens are kept, so that the `{{#first}}` markers survive for the second
/// pass.
pub fn substitute_placeholders(components: &Components, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some((name, len)) = placeholder(tail, 3) {
            out.push_str(components.get(name).unwrap_or_default());
            rest = &tail[len..];
        } else if let Some((name, len)) = placeholder(tail, 2) {
            out.push_str(components.get(name).unwrap_or(&tail[..len]));
            rest = &tail[len..];
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Parse a placeholder with `braces` opening and closing braces at the
/// start of `text`. Returns the name and the length of the whole token.
fn placeholder(text: &str, braces: usize) -> Option<(&str, usize)> {
    let open = &"{{{"[..braces];
    let close = &"}}}"[..braces];

    let inner = text.strip_prefix(open)?;
    let end = inner.find('}')?;
    inner[end..]
        .starts_with(close)
        .then(|| (&inner[..end], braces + end + braces))
}

/// Second pass: replace every `{{#first}} ... {{/first}}` block with its
/// first non-empty alternative, trimmed.
///
/// Text after a closing marker is kept as is. A block without a closing
/// marker extends to the end of the text.
pub fn resolve_first_blocks(text: &str) -> String {
    let mut blocks = text.split(FIRST_OPEN);
    let mut out = blocks.next().unwrap_or_default().to_string();

    for block in blocks {
        let (body, after) = block.split_once(FIRST_CLOSE).unwrap_or((block, ""));
        if let Some(alternative) = body
            .split(ALTERNATIVE_SEPARATOR)
            .map(str::trim)
            .find(|alternative| !alternative.is_empty())
        {
            out.push_str(alternative);
        }
        out.push_str(after);
    }

    out
}
