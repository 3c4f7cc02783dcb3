//! Model output parsing
//!
//! The model is asked for a bare JSON array but routinely wraps it in
//! Markdown code fences or adds prose around it. Parsing strips fences,
//! extracts the outermost array, and normalizes each entry — missing titles
//! get a generic placeholder, categories are mapped leniently, and anything
//! past the third entry is dropped.

use serde::Deserialize;

use suggestion::{BreakDuration, Category, Suggestion, new_id};

use crate::error::{Error, Result};

/// Entry shape the model is asked to produce. Every field is optional in
/// practice; normalization fills the gaps.
#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    steps: Vec<String>,
}

/// Parse model output text into at most three normalized suggestions.
pub fn parse_suggestions(text: &str, duration: BreakDuration) -> Result<Vec<Suggestion>> {
    let cleaned = strip_code_fences(text);
    let array = extract_json_array(&cleaned)
        .ok_or_else(|| Error::Malformed("no JSON array in model output".to_string()))?;

    let raw: Vec<RawSuggestion> = serde_json::from_str(array)?;
    if raw.is_empty() {
        return Err(Error::Malformed("empty suggestion array".to_string()));
    }

    Ok(raw
        .into_iter()
        .take(3)
        .map(|r| Suggestion {
            id: new_id(),
            title: if r.title.is_empty() {
                "気晴らし提案".to_string()
            } else {
                r.title
            },
            description: r.description,
            duration: duration.minutes(),
            category: Category::from_label(&r.category),
            steps: r.steps,
        })
        .collect())
}

/// Remove Markdown code fence markers.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Slice from the first `[` to the last `]`.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}
