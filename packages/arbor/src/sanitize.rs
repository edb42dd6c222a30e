//! HTML entity escaping and URL filtering.
//!
//! Every text value that reaches a document goes through [`escape_html`] exactly
//! once. [`SafeText`] marks a string that has already been escaped so later
//! stages never escape it a second time.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Escape the characters that can break out of text or attribute context.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            other => out.push(other),
        }
    }
    out
}

/// Text that has already been entity-escaped.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SafeText(Arc<str>);

impl SafeText {
    /// Escape `raw` and wrap the result.
    pub fn escape(raw: &str) -> Self {
        SafeText(Arc::from(escape_html(raw)))
    }

    /// The escaped text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SafeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SafeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true for prop names that denote event handlers (`onClick`,
/// `oninput`, `ONLOAD`).
pub fn is_event_prop(name: &str) -> bool {
    name.len() > 2 && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on"))
}

// =============================================================================
// Names
// =============================================================================

/// Why a name cannot be written into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name contains {0:?}")]
    ForbiddenChar(char),
}

/// Check an attribute or prop name.
///
/// Whitespace, quotes, `=`, `<`, `>`, `/`, `` ` `` and control characters
/// would let a name end the attribute early when serialized.
pub fn check_attribute_name(name: &str) -> Result<(), NameError> {
    check_name(name, |c| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '"' | '\'' | '=' | '<' | '>' | '/' | '`')
    })
}

/// Check one class token. Anything [`escape_html`] would rewrite is refused,
/// as are whitespace and `;`, so the stored token equals the caller's.
pub fn check_class_name(class: &str) -> Result<(), NameError> {
    check_name(class, |c| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '"' | '\'' | '=' | '<' | '>' | '/' | '`' | '&' | ';')
    })
}

/// Check a CSS property name: ASCII letters, digits and `-`, not starting
/// with a digit. Custom properties (`--accent`) pass.
pub fn check_style_property(property: &str) -> Result<(), NameError> {
    if let Some(digit) = property.chars().next().filter(char::is_ascii_digit) {
        return Err(NameError::ForbiddenChar(digit));
    }
    check_name(property, |c| !(c.is_ascii_alphanumeric() || c == '-'))
}

fn check_name(name: &str, forbidden: impl Fn(char) -> bool) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    match name.chars().find(|c| forbidden(*c)) {
        Some(c) => Err(NameError::ForbiddenChar(c)),
        None => Ok(()),
    }
}

/// Split an escaped `style` attribute into declarations.
///
/// A `;` that ends a character reference (`&amp;`, `&#x2F;`) belongs to the
/// value and does not separate declarations.
pub fn split_declarations(style: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut entity = false;
    for (i, c) in style.char_indices() {
        match c {
            '&' => entity = true,
            ';' if entity => entity = false,
            ';' => {
                out.push(&style[start..i]);
                start = i + 1;
            }
            c if entity && !(c.is_ascii_alphanumeric() || c == '#') => entity = false,
            _ => {}
        }
    }
    out.push(&style[start..]);
    out
}

// =============================================================================
// URL filtering
// =============================================================================

const DANGEROUS_SCHEMES: &[&str] = &["javascript", "data", "vbscript", "file", "about"];
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "ftp"];

/// Why a URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("dangerous protocol detected: {0}")]
    Dangerous(String),

    #[error("protocol not allowed: {0}")]
    NotAllowed(String),

    #[error("invalid URL format: no protocol")]
    NoProtocol,
}

/// Validate a URL before it is used for navigation or a request.
///
/// Control characters and surrounding whitespace are stripped first. Relative
/// forms (`#frag`, `/path`, `./path`) pass through unchanged.
pub fn sanitize_url(raw: &str) -> Result<String, UrlError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    if cleaned.is_empty() {
        return Err(UrlError::Empty);
    }

    match scheme_of(&cleaned) {
        Some(scheme) => {
            let lower = scheme.to_ascii_lowercase();
            if DANGEROUS_SCHEMES.contains(&lower.as_str()) {
                Err(UrlError::Dangerous(lower))
            } else if SAFE_SCHEMES.contains(&lower.as_str()) {
                Ok(cleaned)
            } else {
                Err(UrlError::NotAllowed(lower))
            }
        }
        None if is_relative(&cleaned) => Ok(cleaned),
        None => Err(UrlError::NoProtocol),
    }
}

/// Returns true for `#frag`, `/path` and `./path` forms.
pub fn is_relative(url: &str) -> bool {
    url.starts_with('#') || url.starts_with('/') || url.starts_with("./")
}

/// `scheme ":"` where scheme is `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn scheme_of(url: &str) -> Option<&str> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(scheme)
    } else {
        None
    }
}
