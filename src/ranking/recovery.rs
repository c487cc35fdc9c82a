//! Recovery of the ranking array from a free-form model reply.
//!
//! The reply is supposed to be a bare JSON array, but in practice it may be
//! wrapped in a Markdown fence, surrounded by prose, or cut off mid-array when
//! the token ceiling is hit. Strategies are tried in order:
//!
//! 1. the span from the first `[` to the last `]`, parsed as is;
//! 2. the span from the first `[` to the last `},`, closed with `]`, which
//!    keeps every complete element of a truncated array;
//! 3. give up with [`MatchError::RankingParse`] and a short preview.
//!
//! These are heuristics over text nobody controls. A reply containing an
//! unrelated `[` before the array, or a `},` inside a summary string, can
//! defeat them.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::MatchError;
use crate::models::RankedItem;

const PREVIEW_CHARS: usize = 300;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*").expect("code fence pattern is valid"));

/// Shape of one element as the model writes it.
#[derive(Debug, Deserialize)]
struct RawRankedItem {
    job_index: i64,
    match_score: f64,
    #[serde(default)]
    summary: String,
}

impl RawRankedItem {
    fn into_ranked(self) -> Option<RankedItem> {
        let job_index = usize::try_from(self.job_index).ok()?;
        let match_score = self.match_score.round().clamp(0.0, 100.0) as u8;

        Some(RankedItem {
            job_index,
            match_score,
            summary: self.summary,
        })
    }
}

/// Parse the model's reply into ranked items.
///
/// Negative indices are dropped here; indices past the end of the batch are
/// dropped when merging.
pub fn parse_ranked(response: &str) -> Result<Vec<RankedItem>, MatchError> {
    let text = strip_code_fences(response);

    let raw = match parse_bracketed_span(&text) {
        Some(items) => items,
        None => {
            let items = parse_truncated_array(&text).ok_or_else(|| MatchError::RankingParse {
                preview: preview(&text),
            })?;
            warn!(
                "Ranking reply was incomplete; recovered {} complete entries",
                items.len()
            );
            items
        }
    };

    let total = raw.len();
    let ranked: Vec<RankedItem> = raw
        .into_iter()
        .filter_map(RawRankedItem::into_ranked)
        .collect();

    if ranked.len() < total {
        debug!("Dropped {} entries with negative job_index", total - ranked.len());
    }

    Ok(ranked)
}

/// Remove Markdown code-fence markers, tagged `json` or not.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").into_owned()
}

/// First `[` through last `]`.
fn parse_bracketed_span(text: &str) -> Option<Vec<RawRankedItem>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }

    serde_json::from_str(&text[start..=end])
        .map_err(|e| debug!("Bracketed span is not a ranking array: {}", e))
        .ok()
}

/// First `[` through the last complete `}` followed by `,`, closed with `]`.
fn parse_truncated_array(text: &str) -> Option<Vec<RawRankedItem>> {
    let start = text.find('[')?;
    let tail = &text[start..];
    let last_separator = tail.rfind("},")?;

    let candidate = format!("{}]", &tail[..=last_separator]);
    serde_json::from_str(&candidate)
        .map_err(|e| debug!("Truncated ranking could not be repaired: {}", e))
        .ok()
}

fn preview(text: &str) -> String {
    text.chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
