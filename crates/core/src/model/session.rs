use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ReaderMode, ReadingPreferences, Section, StudyContent, TestState};

/// How the current content arrived in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Demo,
    Import,
}

impl ContentSource {
    /// Pasted text marks an import; an empty paste means the demo was picked directly.
    #[must_use]
    pub fn for_raw_input(raw_input: &str) -> Self {
        if raw_input.trim().is_empty() {
            Self::Demo
        } else {
            Self::Import
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentSource::Demo => "demo",
            ContentSource::Import => "import",
        }
    }
}

/// The learner's single current session.
///
/// Every value of this type upholds:
/// - `current_section_index` lies in `[0, section_count - 1]` (0 without content)
/// - `completed_sections` is sorted, unique, and refers to existing sections
/// - stored scores never exceed their question count and `final_result_saved`
///   implies a submitted final test
///
/// Answer vectors inside `section_tests`/`final_test` may still be stale; use
/// [`SessionState::section_answers`] and [`SessionState::final_answers`] for
/// length-normalised views.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub(crate) content: Option<StudyContent>,
    pub(crate) source: Option<ContentSource>,
    pub(crate) raw_input: String,
    pub(crate) imported_at: Option<DateTime<Utc>>,
    pub(crate) preferences: ReadingPreferences,
    pub(crate) current_section_index: usize,
    pub(crate) completed_sections: BTreeSet<usize>,
    pub(crate) section_tests: BTreeMap<usize, TestState>,
    pub(crate) final_test: Option<TestState>,
    pub(crate) final_result_saved: bool,
}

/// Loosely-typed session values, as recovered from storage.
///
/// `normalize` turns it into a `SessionState` that satisfies every invariant.
#[derive(Debug, Clone, Default)]
pub struct SessionDraft {
    pub content: Option<StudyContent>,
    pub source: Option<ContentSource>,
    pub raw_input: String,
    pub imported_at: Option<DateTime<Utc>>,
    pub preferences: ReadingPreferences,
    pub current_section_index: i64,
    pub completed_sections: Vec<i64>,
    pub section_tests: BTreeMap<usize, TestState>,
    pub final_test: Option<TestState>,
    pub final_result_saved: bool,
}

impl SessionDraft {
    #[must_use]
    pub fn normalize(self) -> SessionState {
        let section_count = self.content.as_ref().map_or(0, StudyContent::section_count);
        let current_section_index = self
            .content
            .as_ref()
            .map_or(0, |content| content.clamp_section_index(self.current_section_index));

        let completed_sections = self
            .completed_sections
            .into_iter()
            .filter_map(|idx| usize::try_from(idx).ok())
            .filter(|idx| *idx < section_count)
            .collect();

        let section_tests = match self.content.as_ref() {
            Some(content) => self
                .section_tests
                .into_iter()
                .filter_map(|(idx, test)| {
                    let section = content.section(idx)?;
                    Some((idx, test.reconciled(&section.mini_test)))
                })
                .collect(),
            None => BTreeMap::new(),
        };

        let final_test = self
            .content
            .as_ref()
            .zip(self.final_test)
            .map(|(content, test)| test.reconciled(&content.final_test));
        let final_result_saved =
            self.final_result_saved && final_test.as_ref().is_some_and(TestState::submitted);

        SessionState {
            content: self.content,
            source: self.source,
            raw_input: self.raw_input,
            imported_at: self.imported_at,
            preferences: self.preferences,
            current_section_index,
            completed_sections,
            section_tests,
            final_test,
            final_result_saved,
        }
    }
}

impl SessionState {
    #[must_use]
    pub fn content(&self) -> Option<&StudyContent> {
        self.content.as_ref()
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    #[must_use]
    pub fn source(&self) -> Option<ContentSource> {
        self.source
    }

    #[must_use]
    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    #[must_use]
    pub fn imported_at(&self) -> Option<DateTime<Utc>> {
        self.imported_at
    }

    #[must_use]
    pub fn preferences(&self) -> &ReadingPreferences {
        &self.preferences
    }

    #[must_use]
    pub fn mode(&self) -> ReaderMode {
        self.preferences.mode
    }

    #[must_use]
    pub fn current_section_index(&self) -> usize {
        self.current_section_index
    }

    #[must_use]
    pub fn current_section(&self) -> Option<&Section> {
        self.content
            .as_ref()
            .and_then(|content| content.section(self.current_section_index))
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.content.as_ref().map_or(0, StudyContent::section_count)
    }

    /// Completed section indexes, ascending.
    #[must_use]
    pub fn completed_sections(&self) -> Vec<usize> {
        self.completed_sections.iter().copied().collect()
    }

    #[must_use]
    pub fn section_tests(&self) -> &BTreeMap<usize, TestState> {
        &self.section_tests
    }

    #[must_use]
    pub fn section_test(&self, section: usize) -> Option<&TestState> {
        self.section_tests.get(&section)
    }

    #[must_use]
    pub fn final_test(&self) -> Option<&TestState> {
        self.final_test.as_ref()
    }

    /// Whether the current final-test submission is already in the result history.
    #[must_use]
    pub fn is_final_result_saved(&self) -> bool {
        self.final_result_saved
    }

    #[must_use]
    pub fn is_section_complete(&self, section: usize) -> bool {
        self.completed_sections.contains(&section)
    }

    /// True once every section of the loaded content has been submitted.
    ///
    /// Content with no sections is trivially complete; no content is never complete.
    #[must_use]
    pub fn all_sections_complete(&self) -> bool {
        match self.content.as_ref() {
            Some(content) => {
                (0..content.section_count()).all(|idx| self.completed_sections.contains(&idx))
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_last_section(&self, section: usize) -> bool {
        self.content
            .as_ref()
            .and_then(StudyContent::last_section_index)
            .is_some_and(|last| last == section)
    }

    /// Answers for a section's mini-test, sized to its current question count.
    ///
    /// Returns `None` when no content is loaded or the section does not exist.
    #[must_use]
    pub fn section_answers(&self, section: usize) -> Option<Vec<Option<usize>>> {
        let questions = self.content.as_ref()?.section(section)?.question_count();
        Some(TestState::answers_for(
            self.section_tests.get(&section),
            questions,
        ))
    }

    /// Answers for the final test, sized to its current question count.
    #[must_use]
    pub fn final_answers(&self) -> Option<Vec<Option<usize>>> {
        let questions = self.content.as_ref()?.final_test.len();
        Some(TestState::answers_for(self.final_test.as_ref(), questions))
    }
}
