//! Versioned codec for the structured cells embedded in task rows.
//!
//! Each structured cell carries a `{"v":1,...}` envelope so that malformed or
//! future-versioned content fails with a specific error instead of silently
//! decoding into an empty default. The one sanctioned exception is the
//! `VisibleTo` column, which historically held a bare CSV list and is still
//! accepted in that form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::Attachment;

pub const CELL_CODEC_VERSION: u64 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported cell codec version {found} (expected {CELL_CODEC_VERSION})")]
    UnsupportedVersion { found: u64 },

    #[error("malformed {cell} cell: {message}")]
    Malformed { cell: &'static str, message: String },
}

impl CodecError {
    fn malformed(cell: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            cell,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct AttachmentsCell {
    v: u64,
    items: Vec<Attachment>,
}

#[derive(Serialize, Deserialize)]
struct VisibleToCell {
    v: u64,
    ids: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct AttendeeResponsesCell {
    v: u64,
    responses: BTreeMap<String, String>,
}

fn check_version(found: u64) -> Result<(), CodecError> {
    if found == CELL_CODEC_VERSION {
        Ok(())
    } else {
        Err(CodecError::UnsupportedVersion { found })
    }
}

pub fn encode_attachments(items: &[Attachment]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let cell = AttachmentsCell {
        v: CELL_CODEC_VERSION,
        items: items.to_vec(),
    };
    serde_json::to_string(&cell).unwrap_or_default()
}

pub fn decode_attachments(cell: &str) -> Result<Vec<Attachment>, CodecError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(Vec::new());
    }
    let parsed: AttachmentsCell = serde_json::from_str(cell)
        .map_err(|e| CodecError::malformed("attachments", e.to_string()))?;
    check_version(parsed.v)?;
    Ok(parsed.items)
}

pub fn encode_visible_to(ids: &[String]) -> String {
    if ids.is_empty() {
        return String::new();
    }
    let cell = VisibleToCell {
        v: CELL_CODEC_VERSION,
        ids: ids.to_vec(),
    };
    serde_json::to_string(&cell).unwrap_or_default()
}

/// Decode the `VisibleTo` cell. Accepts the v1 envelope or a legacy bare CSV
/// list (the column predates the codec).
pub fn decode_visible_to(cell: &str) -> Result<Vec<String>, CodecError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(Vec::new());
    }
    if !cell.starts_with('{') {
        return Ok(cell
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect());
    }
    let parsed: VisibleToCell =
        serde_json::from_str(cell).map_err(|e| CodecError::malformed("visible_to", e.to_string()))?;
    check_version(parsed.v)?;
    Ok(parsed.ids)
}

pub fn encode_attendee_responses(responses: &BTreeMap<String, String>) -> String {
    if responses.is_empty() {
        return String::new();
    }
    let cell = AttendeeResponsesCell {
        v: CELL_CODEC_VERSION,
        responses: responses.clone(),
    };
    serde_json::to_string(&cell).unwrap_or_default()
}

pub fn decode_attendee_responses(cell: &str) -> Result<BTreeMap<String, String>, CodecError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(BTreeMap::new());
    }
    let parsed: AttendeeResponsesCell = serde_json::from_str(cell)
        .map_err(|e| CodecError::malformed("attendee_responses", e.to_string()))?;
    check_version(parsed.v)?;
    Ok(parsed.responses)
}
