use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("content document is not valid: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single multiple-choice question.
///
/// `correct_answer` is expected to match one of `options` exactly. That is
/// not checked: a question whose answer is missing from its options can never
/// be scored as correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub fact: String,
}

impl QuizQuestion {
    /// Resolve an option index to its text.
    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    /// Exact, case-sensitive comparison of the selected option against the answer.
    #[must_use]
    pub fn is_correct(&self, selected: Option<usize>) -> bool {
        selected
            .and_then(|idx| self.option(idx))
            .is_some_and(|text| text == self.correct_answer)
    }
}

/// One unit of reading content paired with its mini-test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    pub mini_test: Vec<QuizQuestion>,
}

impl Section {
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.mini_test.len()
    }

    #[must_use]
    pub fn key_points(&self) -> &[String] {
        self.key_points.as_deref().unwrap_or_default()
    }
}

/// Read-only study material supplied by the content catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyContent {
    pub overall_title: String,
    pub sections: Vec<Section>,
    pub final_test: Vec<QuizQuestion>,
}

impl StudyContent {
    /// Parse a content document in its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Json` if the document does not have the expected shape.
    pub fn from_json_str(raw: &str) -> Result<Self, ContentError> {
        Ok(serde_json::from_str(raw)?)
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn last_section_index(&self) -> Option<usize> {
        self.sections.len().checked_sub(1)
    }

    /// Clamp an arbitrary (possibly negative) target into `[0, section_count - 1]`.
    ///
    /// Content without sections clamps everything to 0.
    #[must_use]
    pub fn clamp_section_index(&self, target: i64) -> usize {
        let Some(last) = self.last_section_index() else {
            return 0;
        };
        if target <= 0 {
            return 0;
        }
        usize::try_from(target).map_or(last, |idx| idx.min(last))
    }
}
