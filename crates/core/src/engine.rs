//! Session progression transitions.
//!
//! Every transition is a pure function from the current session to the next
//! one. Callers persist the result; nothing here touches storage or the clock.
//! Requests that cannot apply (no content, unknown section or question) return
//! an unchanged copy of the current session.

use chrono::{DateTime, Utc};

use crate::model::{ContentSource, PreferenceUpdate, SessionState, StudyContent, TestState};
use crate::scoring;

//
// ─── INTENTS ───────────────────────────────────────────────────────────────────
//

/// A single mutation request from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionIntent {
    Seed {
        content: StudyContent,
        source: ContentSource,
        raw_input: String,
    },
    Navigate {
        target: i64,
    },
    StepSection {
        delta: i64,
    },
    SetSectionAnswer {
        section: usize,
        question: usize,
        option: usize,
    },
    SubmitSectionTest {
        section: usize,
    },
    SetFinalAnswer {
        question: usize,
        option: usize,
    },
    SubmitFinalTest,
    MarkFinalResultSaved,
    UpdatePreference(PreferenceUpdate),
    Restart,
}

impl SessionIntent {
    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionIntent::Seed { .. } => "seed",
            SessionIntent::Navigate { .. } => "navigate",
            SessionIntent::StepSection { .. } => "step_section",
            SessionIntent::SetSectionAnswer { .. } => "set_section_answer",
            SessionIntent::SubmitSectionTest { .. } => "submit_section_test",
            SessionIntent::SetFinalAnswer { .. } => "set_final_answer",
            SessionIntent::SubmitFinalTest => "submit_final_test",
            SessionIntent::MarkFinalResultSaved => "mark_final_result_saved",
            SessionIntent::UpdatePreference(_) => "update_preference",
            SessionIntent::Restart => "restart",
        }
    }
}

/// Dispatch an intent to its transition.
///
/// `now` is only read by `Seed`, which stamps `imported_at`.
#[must_use]
pub fn apply(current: &SessionState, intent: SessionIntent, now: DateTime<Utc>) -> SessionState {
    match intent {
        SessionIntent::Seed {
            content,
            source,
            raw_input,
        } => seed(current, content, source, raw_input, now),
        SessionIntent::Navigate { target } => navigate(current, target),
        SessionIntent::StepSection { delta } => step_section(current, delta),
        SessionIntent::SetSectionAnswer {
            section,
            question,
            option,
        } => set_section_answer(current, section, question, option),
        SessionIntent::SubmitSectionTest { section } => submit_section_test(current, section),
        SessionIntent::SetFinalAnswer { question, option } => {
            set_final_answer(current, question, option)
        }
        SessionIntent::SubmitFinalTest => submit_final_test(current),
        SessionIntent::MarkFinalResultSaved => mark_final_result_saved(current),
        SessionIntent::UpdatePreference(update) => update_preference(current, update),
        SessionIntent::Restart => restart(current),
    }
}

//
// ─── CONTENT & NAVIGATION ──────────────────────────────────────────────────────
//

/// Load new content, discarding all progress but keeping reading preferences.
#[must_use]
pub fn seed(
    current: &SessionState,
    content: StudyContent,
    source: ContentSource,
    raw_input: impl Into<String>,
    now: DateTime<Utc>,
) -> SessionState {
    SessionState {
        content: Some(content),
        source: Some(source),
        raw_input: raw_input.into(),
        imported_at: Some(now),
        preferences: current.preferences,
        ..SessionState::default()
    }
}

/// Move to a section, clamping the target into the valid range.
#[must_use]
pub fn navigate(current: &SessionState, target: i64) -> SessionState {
    let Some(content) = current.content.as_ref() else {
        return current.clone();
    };
    SessionState {
        current_section_index: content.clamp_section_index(target),
        ..current.clone()
    }
}

/// Move `delta` sections away from the current one, clamped like [`navigate`].
#[must_use]
pub fn step_section(current: &SessionState, delta: i64) -> SessionState {
    let index = i64::try_from(current.current_section_index).unwrap_or(i64::MAX);
    navigate(current, index.saturating_add(delta))
}

//
// ─── SECTION MINI-TESTS ────────────────────────────────────────────────────────
//

/// Record an answer for a section question.
///
/// Allowed after submission; `submitted` and `score` keep their stored values
/// until the section is submitted again.
#[must_use]
pub fn set_section_answer(
    current: &SessionState,
    section: usize,
    question: usize,
    option: usize,
) -> SessionState {
    let Some(target) = current
        .content
        .as_ref()
        .and_then(|content| content.section(section))
    else {
        return current.clone();
    };

    let existing = current.section_tests.get(&section);
    let Some(updated) = TestState::with_answer(existing, &target.mini_test, question, option)
    else {
        return current.clone();
    };

    let mut next = current.clone();
    next.section_tests.insert(section, updated);
    next
}

/// Grade a section's mini-test, mark the section complete and move on.
///
/// Submitting again with the same answers produces the same state.
#[must_use]
pub fn submit_section_test(current: &SessionState, section: usize) -> SessionState {
    let Some(content) = current.content.as_ref() else {
        return current.clone();
    };
    let Some(target) = content.section(section) else {
        return current.clone();
    };

    let answers =
        TestState::answers_for(current.section_tests.get(&section), target.question_count());
    let score = scoring::score(&target.mini_test, &answers);

    let mut next = current.clone();
    next.completed_sections.insert(section);
    if !current.is_last_section(section) {
        next.current_section_index = section + 1;
    }
    next.section_tests.insert(section, TestState::graded(answers, score));
    next
}

//
// ─── FINAL TEST ────────────────────────────────────────────────────────────────
//

#[must_use]
pub fn set_final_answer(current: &SessionState, question: usize, option: usize) -> SessionState {
    let Some(content) = current.content.as_ref() else {
        return current.clone();
    };
    let Some(updated) = TestState::with_answer(
        current.final_test.as_ref(),
        &content.final_test,
        question,
        option,
    ) else {
        return current.clone();
    };

    SessionState {
        final_test: Some(updated),
        final_result_saved: false,
        ..current.clone()
    }
}

/// Grade the final test.
///
/// Section completion is not checked here; gating the final test on
/// [`SessionState::all_sections_complete`] is left to the caller.
#[must_use]
pub fn submit_final_test(current: &SessionState) -> SessionState {
    let Some(content) = current.content.as_ref() else {
        return current.clone();
    };

    let answers = TestState::answers_for(current.final_test.as_ref(), content.final_test.len());
    let score = scoring::score(&content.final_test, &answers);

    SessionState {
        final_test: Some(TestState::graded(answers, score)),
        final_result_saved: false,
        ..current.clone()
    }
}

/// Note that the current final-test submission has been recorded.
///
/// Without a submitted final test the session is returned unchanged.
#[must_use]
pub fn mark_final_result_saved(current: &SessionState) -> SessionState {
    if !current.final_test.as_ref().is_some_and(TestState::submitted) {
        return current.clone();
    }
    SessionState {
        final_result_saved: true,
        ..current.clone()
    }
}

//
// ─── PREFERENCES & RESTART ─────────────────────────────────────────────────────
//

#[must_use]
pub fn update_preference(current: &SessionState, update: PreferenceUpdate) -> SessionState {
    let mut next = current.clone();
    next.preferences.apply(update);
    next
}

/// Clear all progress on the current content.
#[must_use]
pub fn restart(current: &SessionState) -> SessionState {
    SessionState {
        current_section_index: 0,
        completed_sections: Default::default(),
        section_tests: Default::default(),
        final_test: None,
        final_result_saved: false,
        ..current.clone()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
