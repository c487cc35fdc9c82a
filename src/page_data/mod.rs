//! Decoding of the data blob embedded in rendered listing pages.
//!
//! The listing site ships its search state as a base64-encoded JSON document
//! inside one of the page's `<script>` elements. No tag or attribute marks
//! which one, so the decoder picks the script with the longest text content.
//! A page whose largest script is something else (an inlined bundle, for
//! instance) fails with [`DecodeError`]; callers decide whether to abort.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::DecodeError;

/// Content of a page after navigation has settled.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

impl RenderedPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Text content of every `<script>` element, in document order.
    pub fn script_texts(&self) -> Vec<String> {
        let document = Html::parse_document(&self.html);
        let Ok(selector) = Selector::parse("script") else {
            return Vec::new();
        };

        document
            .select(&selector)
            .map(|script| script.text().collect::<String>())
            .collect()
    }
}

/// Pick the longest script body. Ties resolve to the first one.
pub fn largest_script(scripts: &[String]) -> Option<&str> {
    scripts
        .iter()
        .fold(None, |best: Option<&String>, script| match best {
            Some(current) if current.len() >= script.len() => Some(current),
            _ => Some(script),
        })
        .map(String::as_str)
}

/// Decode a base64 payload into a JSON tree.
pub fn decode_payload(raw: &str) -> Result<Value, DecodeError> {
    let bytes = STANDARD.decode(raw.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Locate and decode the embedded data document of a rendered page.
pub fn decode_page_data(page: &RenderedPage) -> Result<Value, DecodeError> {
    let scripts = page.script_texts();
    let payload = largest_script(&scripts).ok_or(DecodeError::NoScripts)?;
    decode_payload(payload)
}
