use serde_json::{Map, Value};
use thiserror::Error;

const OPEN_TAG: &str = "<update>";
const CLOSE_TAG: &str = "</update>";

/// Shown in place of an update block that was applied to the form.
pub const UPDATE_NOTICE: &str = "[Information has been updated]";

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update block is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("update block must be a JSON object")]
    NotAnObject,
}

/// An assistant reply split around its first `<update>…</update>` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateBlock<'a> {
    pub before: &'a str,
    pub body: &'a str,
    pub after: &'a str,
}

impl<'a> UpdateBlock<'a> {
    /// Locates the first complete block. An opening tag with no closing tag
    /// is not a block.
    pub fn find(text: &'a str) -> Option<Self> {
        let start = text.find(OPEN_TAG)?;
        let body_start = start + OPEN_TAG.len();
        let body_len = text[body_start..].find(CLOSE_TAG)?;
        let body_end = body_start + body_len;
        Some(Self {
            before: &text[..start],
            body: &text[body_start..body_end],
            after: &text[body_end + CLOSE_TAG.len()..],
        })
    }

    /// Parses the body as a field patch.
    pub fn parse(&self) -> Result<Map<String, Value>, UpdateError> {
        match serde_json::from_str::<Value>(strip_json_fences(self.body))? {
            Value::Object(map) => Ok(map),
            _ => Err(UpdateError::NotAnObject),
        }
    }

    /// The reply with the block swapped for `replacement`. Later blocks are
    /// never applied, so they are dropped from the text as well.
    pub fn replace_with(&self, replacement: &str) -> String {
        format!("{}{}{}", self.before, replacement, strip_blocks(self.after))
    }
}

/// Removes every complete `<update>…</update>` block from `text`.
fn strip_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(block) = UpdateBlock::find(rest) {
        out.push_str(block.before);
        rest = block.after;
    }
    out.push_str(rest);
    out
}

/// Strips ```json ... ``` or ``` ... ``` fences models sometimes wrap JSON in.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(str::trim)
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}
