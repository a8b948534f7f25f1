//! Persisted shapes for the session and result history records.
//!
//! Encoding writes the full record. Decoding never trusts the stored shape:
//! the raw document is read as a loose JSON object and every field is decoded
//! on its own, falling back to its default when missing or malformed. Records
//! written by an older or newer schema therefore degrade field by field
//! instead of being discarded outright.

use chrono::{DateTime, Utc};
use reader_core::model::{
    ContentSource, FontSize, LetterSpacing, ReaderMode, ReadingPreferences, ResultAttempt,
    SessionDraft, SessionState, StudyContent, TestState,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::repository::StorageError;

/// Storage key of the current session. The suffix is the schema version.
pub const SESSION_KEY: &str = "neuroflow.session.v1";

/// Storage key of the result history. The suffix is the schema version.
pub const RESULTS_KEY: &str = "neuroflow.results.v1";

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

//
// ─── TEST STATE ────────────────────────────────────────────────────────────────
//

/// Stored quiz progress. Unanswered questions are written as `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStateRecord {
    #[serde(default)]
    pub answers: Vec<i64>,
    #[serde(default)]
    pub submitted: bool,
    #[serde(default)]
    pub score: i64,
}

impl TestStateRecord {
    #[must_use]
    pub fn from_state(state: &TestState) -> Self {
        Self {
            answers: state
                .answers()
                .iter()
                .map(|answer| answer.and_then(|idx| i64::try_from(idx).ok()).unwrap_or(-1))
                .collect(),
            submitted: state.submitted(),
            score: i64::from(state.score()),
        }
    }

    #[must_use]
    pub fn into_state(self) -> TestState {
        let answers = self
            .answers
            .into_iter()
            .map(|raw| usize::try_from(raw).ok())
            .collect();
        let score = u32::try_from(self.score).unwrap_or(0);
        TestState::from_persisted(answers, self.submitted, score)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord<'a> {
    content: Option<&'a StudyContent>,
    source: Option<ContentSource>,
    raw_input: &'a str,
    imported_at: Option<DateTime<Utc>>,
    mode: ReaderMode,
    dyslexia_large_text: bool,
    reading_font_size: FontSize,
    reading_letter_spacing: LetterSpacing,
    high_contrast: bool,
    current_section_index: usize,
    completed_sections: Vec<usize>,
    section_tests: BTreeMap<usize, TestStateRecord>,
    final_test: Option<TestStateRecord>,
    final_result_saved: bool,
}

/// Serialize the whole session record.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the record cannot be encoded.
pub fn encode_session(state: &SessionState) -> Result<String, StorageError> {
    let prefs = state.preferences();
    let record = SessionRecord {
        content: state.content(),
        source: state.source(),
        raw_input: state.raw_input(),
        imported_at: state.imported_at(),
        mode: prefs.mode,
        dyslexia_large_text: prefs.dyslexia_large_text,
        reading_font_size: prefs.font_size,
        reading_letter_spacing: prefs.letter_spacing,
        high_contrast: prefs.high_contrast,
        current_section_index: state.current_section_index(),
        completed_sections: state.completed_sections(),
        section_tests: state
            .section_tests()
            .iter()
            .map(|(idx, test)| (*idx, TestStateRecord::from_state(test)))
            .collect(),
        final_test: state.final_test().map(TestStateRecord::from_state),
        final_result_saved: state.is_final_result_saved(),
    };
    serde_json::to_string(&record).map_err(ser)
}

/// Take one field out of the loose record, decoding it on its own.
fn take_field<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.remove(key)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            debug!(field = key, error = %err, "discarding undecodable session field");
            None
        }
    }
}

fn take_section_tests(fields: &mut Map<String, Value>) -> BTreeMap<usize, TestState> {
    let Some(Value::Object(entries)) = fields.remove("sectionTests") else {
        return BTreeMap::new();
    };

    entries
        .into_iter()
        .filter_map(|(key, value)| {
            let idx = key.parse::<usize>().ok()?;
            let record = serde_json::from_value::<TestStateRecord>(value).ok()?;
            Some((idx, record.into_state()))
        })
        .collect()
}

fn take_completed_sections(fields: &mut Map<String, Value>) -> Vec<i64> {
    let Some(Value::Array(items)) = fields.remove("completedSections") else {
        return Vec::new();
    };
    items.iter().filter_map(Value::as_i64).collect()
}

/// Decode a stored session record into a draft, field by field.
///
/// Missing or malformed fields take their default values. The draft still
/// needs [`SessionDraft::normalize`] to satisfy the session invariants.
///
/// # Errors
///
/// Returns `StorageError::Serialization` only when the document is not a JSON
/// object at all.
pub fn decode_session(raw: &str) -> Result<SessionDraft, StorageError> {
    let value: Value = serde_json::from_str(raw).map_err(ser)?;
    let Value::Object(mut fields) = value else {
        return Err(StorageError::Serialization(
            "session record is not an object".into(),
        ));
    };

    let defaults = ReadingPreferences::default();
    let preferences = ReadingPreferences {
        mode: take_field(&mut fields, "mode").unwrap_or(defaults.mode),
        font_size: take_field(&mut fields, "readingFontSize").unwrap_or(defaults.font_size),
        letter_spacing: take_field(&mut fields, "readingLetterSpacing")
            .unwrap_or(defaults.letter_spacing),
        high_contrast: take_field(&mut fields, "highContrast").unwrap_or(defaults.high_contrast),
        dyslexia_large_text: take_field(&mut fields, "dyslexiaLargeText")
            .unwrap_or(defaults.dyslexia_large_text),
    };

    let draft = SessionDraft {
        content: take_field::<Option<StudyContent>>(&mut fields, "content").flatten(),
        source: take_field::<Option<ContentSource>>(&mut fields, "source").flatten(),
        raw_input: take_field(&mut fields, "rawInput").unwrap_or_default(),
        imported_at: take_field::<Option<DateTime<Utc>>>(&mut fields, "importedAt").flatten(),
        preferences,
        current_section_index: take_field(&mut fields, "currentSectionIndex").unwrap_or(0),
        completed_sections: take_completed_sections(&mut fields),
        section_tests: take_section_tests(&mut fields),
        final_test: take_field::<Option<TestStateRecord>>(&mut fields, "finalTest")
            .flatten()
            .map(TestStateRecord::into_state),
        final_result_saved: take_field(&mut fields, "finalResultSaved").unwrap_or(false),
    };

    if !fields.is_empty() {
        debug!(
            unknown = ?fields.keys().collect::<Vec<_>>(),
            "ignoring unknown session fields"
        );
    }

    Ok(draft)
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Serialize the result history, newest first.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the list cannot be encoded.
pub fn encode_results(results: &[ResultAttempt]) -> Result<String, StorageError> {
    serde_json::to_string(results).map_err(ser)
}

/// Decode the result history, skipping entries that cannot be read.
///
/// # Errors
///
/// Returns `StorageError::Serialization` when the document is not a JSON array.
pub fn decode_results(raw: &str) -> Result<Vec<ResultAttempt>, StorageError> {
    let items: Vec<Value> = serde_json::from_str(raw).map_err(ser)?;
    let total = items.len();
    let results: Vec<ResultAttempt> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if results.len() != total {
        warn!(
            skipped = total - results.len(),
            "skipping undecodable result attempts"
        );
    }
    Ok(results)
}
