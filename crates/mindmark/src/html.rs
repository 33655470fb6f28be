//! Clipboard HTML envelope.
//!
//! When a mind map is copied to the clipboard, the payload travels as JSON
//! inside a `data-mind-map` attribute of an HTML fragment. This module finds
//! that attribute and writes it.

use scraper::{Html, Selector};

use crate::native::NativeTree;
use crate::{MindmarkError, Result};

/// Attribute carrying the JSON payload
pub const PAYLOAD_ATTR: &str = "data-mind-map";

/// Extract the native payload from clipboard HTML.
///
/// # Example
///
/// ```rust
/// use mindmark::extract_payload;
///
/// let html = r#"<meta charset="utf-8"><div data-mind-map="{&quot;root&quot;:&quot;a&quot;,&quot;nodes&quot;:{}}"></div>"#;
/// let tree = extract_payload(html).unwrap();
/// assert_eq!(tree.root.as_deref(), Some("a"));
/// ```
pub fn extract_payload(html: &str) -> Result<NativeTree> {
    let document = Html::parse_fragment(html);
    let selector = Selector::parse(&format!("[{PAYLOAD_ATTR}]"))
        .map_err(|e| MindmarkError::Envelope(format!("{e:?}")))?;

    let json = document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(PAYLOAD_ATTR))
        .ok_or_else(|| MindmarkError::Envelope(format!("no element carries `{PAYLOAD_ATTR}`")))?;

    Ok(serde_json::from_str(json)?)
}

/// Wrap a native payload in an HTML fragment for the clipboard
pub fn wrap_payload(tree: &NativeTree) -> Result<String> {
    let json = serde_json::to_string(tree)?;
    Ok(format!(
        "<div {PAYLOAD_ATTR}=\"{}\"></div>",
        escape_html_attr(&json)
    ))
}

/// Escape HTML attribute value
fn escape_html_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
