use std::sync::Arc;

use reader_core::engine::{self, SessionIntent};
use reader_core::model::{
    AttemptId, ContentSource, PreferenceUpdate, QuizQuestion, ResultAttempt, SessionState,
    StudyContent,
};
use reader_core::scoring;
use storage::repository::{RecordRepository, Storage};
use tracing::{debug, info};

use crate::error::{ReaderError, StoreError};
use crate::progress::SessionProgress;
use crate::session_store::SessionStore;
use crate::Clock;

/// A final-test question the learner got wrong, detached from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistakeRow {
    pub question: QuizQuestion,
    pub selected: Option<String>,
}

/// Drives every session transition as one read-modify-write against the store.
#[derive(Clone)]
pub struct ReaderService {
    clock: Clock,
    store: SessionStore,
}

impl ReaderService {
    #[must_use]
    pub fn new(clock: Clock, records: Arc<dyn RecordRepository>) -> Self {
        Self {
            clock,
            store: SessionStore::new(records),
        }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self {
            clock,
            store: SessionStore::in_memory(),
        }
    }

    /// Build a service backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if the database cannot be opened or migrated.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, StoreError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(clock, Arc::clone(&storage.records)))
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The persisted session, or defaults when nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    pub async fn rehydrate(&self) -> Result<SessionState, StoreError> {
        self.store.rehydrate().await
    }

    /// Apply one intent and persist the resulting session.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read or the write fails.
    pub async fn apply(&self, intent: SessionIntent) -> Result<SessionState, StoreError> {
        let name = intent.name();
        let now = self.clock.now();
        let next = self
            .store
            .update(move |current| engine::apply(current, intent, now))
            .await?;
        debug!(
            intent = name,
            section = next.current_section_index(),
            completed = next.completed_sections().len(),
            "session updated"
        );
        Ok(next)
    }

    /// Load new content, discarding progress but keeping preferences.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn seed(
        &self,
        content: StudyContent,
        source: ContentSource,
        raw_input: impl Into<String>,
    ) -> Result<SessionState, StoreError> {
        info!(
            title = %content.overall_title,
            sections = content.section_count(),
            source = source.as_str(),
            "seeding session"
        );
        self.apply(SessionIntent::Seed {
            content,
            source,
            raw_input: raw_input.into(),
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn navigate(&self, target: i64) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::Navigate { target }).await
    }

    /// Step forward one section; stays put on the last one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn next_section(&self) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::StepSection { delta: 1 }).await
    }

    /// Step back one section; stays put on the first one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn previous_section(&self) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::StepSection { delta: -1 }).await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn set_section_answer(
        &self,
        section: usize,
        question: usize,
        option: usize,
    ) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::SetSectionAnswer {
            section,
            question,
            option,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn submit_section_test(&self, section: usize) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::SubmitSectionTest { section }).await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn set_final_answer(
        &self,
        question: usize,
        option: usize,
    ) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::SetFinalAnswer { question, option })
            .await
    }

    /// Score the final test. Section completion is not required.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn submit_final_test(&self) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::SubmitFinalTest).await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn update_preference(
        &self,
        update: PreferenceUpdate,
    ) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::UpdatePreference(update)).await
    }

    /// Clear all progress on the current content.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if persistence fails.
    pub async fn restart(&self) -> Result<SessionState, StoreError> {
        self.apply(SessionIntent::Restart).await
    }

    /// Forget the session entirely. Result history is kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    pub async fn reset(&self) -> Result<(), StoreError> {
        info!("resetting session");
        self.store.reset().await
    }

    /// Mistakes in the submitted final test, in question order.
    ///
    /// Empty until the final test has been submitted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    pub async fn final_mistakes(&self) -> Result<Vec<MistakeRow>, StoreError> {
        let state = self.store.rehydrate().await?;
        let Some(content) = state.content() else {
            return Ok(Vec::new());
        };
        if !state.final_test().is_some_and(|test| test.submitted()) {
            return Ok(Vec::new());
        }
        let answers = state.final_answers().unwrap_or_default();

        Ok(scoring::mistakes(&content.final_test, &answers)
            .into_iter()
            .map(|mistake| MistakeRow {
                question: mistake.question.clone(),
                selected: mistake.selected.map(str::to_owned),
            })
            .collect())
    }

    /// Record the submitted final test in the result history.
    ///
    /// Each submission is saved at most once; changing an answer or submitting
    /// again allows another save.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::NoContent` without loaded content.
    /// Returns `ReaderError::FinalTestNotSubmitted` before the final test is submitted.
    /// Returns `ReaderError::ResultAlreadySaved` when this submission was already saved.
    /// Returns `ReaderError::Store` if persistence fails.
    pub async fn save_final_result(&self) -> Result<ResultAttempt, ReaderError> {
        let state = self.store.rehydrate().await?;
        let content = state.content().ok_or(ReaderError::NoContent)?;
        let final_test = state
            .final_test()
            .filter(|test| test.submitted())
            .ok_or(ReaderError::FinalTestNotSubmitted)?;
        if state.is_final_result_saved() {
            return Err(ReaderError::ResultAlreadySaved);
        }

        let attempt = ResultAttempt::new(
            AttemptId::generate(),
            self.clock.now(),
            state.mode(),
            final_test.score(),
            u32::try_from(content.final_test.len()).unwrap_or(u32::MAX),
            content.overall_title.clone(),
        );
        self.store.append_result(attempt.clone()).await?;
        self.apply(SessionIntent::MarkFinalResultSaved).await?;
        info!(
            id = %attempt.id(),
            score = attempt.score(),
            total = attempt.total(),
            "result saved"
        );
        Ok(attempt)
    }

    /// Result history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    pub async fn list_results(&self) -> Result<Vec<ResultAttempt>, StoreError> {
        self.store.list_results().await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    pub async fn clear_results(&self) -> Result<(), StoreError> {
        self.store.clear_results().await
    }

    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    pub async fn progress(&self) -> Result<SessionProgress, StoreError> {
        let state = self.store.rehydrate().await?;
        Ok(SessionProgress::from_state(&state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reader_core::model::{ReaderMode, Section};
    use reader_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;
    use storage::SESSION_KEY;

    fn question(n: usize) -> QuizQuestion {
        QuizQuestion {
            question: format!("Question {n}?"),
            options: vec!["right".into(), "wrong".into(), "other".into()],
            correct_answer: "right".into(),
            fact: format!("Fact {n}."),
        }
    }

    fn content(sections: usize, final_questions: usize) -> StudyContent {
        StudyContent {
            overall_title: "Neural Networks".into(),
            sections: (0..sections)
                .map(|i| Section {
                    title: format!("Section {i}"),
                    content: "Some sentences. More sentences.".into(),
                    key_points: None,
                    mini_test: (0..3).map(question).collect(),
                })
                .collect(),
            final_test: (0..final_questions).map(question).collect(),
        }
    }

    async fn seeded(service: &ReaderService) -> SessionState {
        service
            .seed(content(3, 4), ContentSource::Demo, "")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn rehydrate_on_empty_store_yields_defaults() {
        let service = ReaderService::in_memory(fixed_clock());
        let state = service.rehydrate().await.unwrap();
        assert!(!state.has_content());
        assert_eq!(state.mode(), ReaderMode::Adhd);
        assert_eq!(state.current_section_index(), 0);
    }

    #[tokio::test]
    async fn seed_persists_content_and_stamps_import_time() {
        let service = ReaderService::in_memory(fixed_clock());
        service
            .seed(content(2, 1), ContentSource::Import, "pasted text")
            .await
            .unwrap();

        let state = service.rehydrate().await.unwrap();
        assert_eq!(state.section_count(), 2);
        assert_eq!(state.source(), Some(ContentSource::Import));
        assert_eq!(state.raw_input(), "pasted text");
        assert_eq!(state.imported_at(), Some(fixed_now()));
    }

    #[tokio::test]
    async fn next_and_previous_stay_in_range() {
        let service = ReaderService::in_memory(fixed_clock());
        seeded(&service).await;

        assert_eq!(service.previous_section().await.unwrap().current_section_index(), 0);
        service.next_section().await.unwrap();
        service.next_section().await.unwrap();
        let last = service.next_section().await.unwrap();
        assert_eq!(last.current_section_index(), 2);
        assert_eq!(service.previous_section().await.unwrap().current_section_index(), 1);
    }

    #[tokio::test]
    async fn section_submission_survives_rehydrate() {
        let service = ReaderService::in_memory(fixed_clock());
        seeded(&service).await;

        service.set_section_answer(0, 0, 0).await.unwrap();
        service.set_section_answer(0, 1, 1).await.unwrap();
        service.set_section_answer(0, 2, 0).await.unwrap();
        service.submit_section_test(0).await.unwrap();

        let reloaded = service.rehydrate().await.unwrap();
        let test = reloaded.section_test(0).unwrap();
        assert!(test.submitted());
        assert_eq!(test.score(), 2);
        assert_eq!(reloaded.completed_sections(), vec![0]);
        assert_eq!(reloaded.current_section_index(), 1);
    }

    #[tokio::test]
    async fn answers_change_after_submit_without_rescoring() {
        let service = ReaderService::in_memory(fixed_clock());
        seeded(&service).await;

        service.set_section_answer(0, 0, 0).await.unwrap();
        service.submit_section_test(0).await.unwrap();
        service.set_section_answer(0, 0, 1).await.unwrap();

        let state = service.rehydrate().await.unwrap();
        let test = state.section_test(0).unwrap();
        assert!(test.submitted());
        assert_eq!(test.score(), 1);
        assert_eq!(state.section_answers(0).unwrap()[0], Some(1));

        let resubmitted = service.submit_section_test(0).await.unwrap();
        assert_eq!(resubmitted.section_test(0).unwrap().score(), 0);
    }

    #[tokio::test]
    async fn final_mistakes_empty_until_submitted() {
        let service = ReaderService::in_memory(fixed_clock());
        assert!(service.final_mistakes().await.unwrap().is_empty());

        seeded(&service).await;
        service.set_final_answer(0, 0).await.unwrap();
        service.set_final_answer(1, 2).await.unwrap();
        assert!(service.final_mistakes().await.unwrap().is_empty());

        service.submit_final_test().await.unwrap();
        let mistakes = service.final_mistakes().await.unwrap();
        assert_eq!(mistakes.len(), 3);
        assert_eq!(mistakes[0].question.question, "Question 1?");
        assert_eq!(mistakes[0].selected.as_deref(), Some("other"));
        assert_eq!(mistakes[1].selected, None);
    }

    #[tokio::test]
    async fn save_final_result_requires_submission() {
        let service = ReaderService::in_memory(fixed_clock());
        assert!(matches!(
            service.save_final_result().await,
            Err(ReaderError::NoContent)
        ));

        seeded(&service).await;
        assert!(matches!(
            service.save_final_result().await,
            Err(ReaderError::FinalTestNotSubmitted)
        ));
        assert!(service.list_results().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saved_results_are_listed_newest_first() {
        let mut clock = fixed_clock();
        let records = InMemoryRepository::new();
        let service = ReaderService::new(clock, Arc::new(records.clone()));
        seeded(&service).await;
        service.set_final_answer(0, 0).await.unwrap();
        service.submit_final_test().await.unwrap();
        let first = service.save_final_result().await.unwrap();

        clock.advance(Duration::minutes(5));
        let later = ReaderService::new(clock, Arc::new(records));
        later
            .update_preference(PreferenceUpdate::Mode(ReaderMode::Dyslexia))
            .await
            .unwrap();
        later.submit_final_test().await.unwrap();
        let second = later.save_final_result().await.unwrap();

        assert_eq!(first.score(), 1);
        assert_eq!(first.total(), 4);
        assert_eq!(first.title(), "Neural Networks");
        assert_eq!(first.mode(), ReaderMode::Adhd);
        assert_eq!(second.mode(), ReaderMode::Dyslexia);
        assert_ne!(first.id(), second.id());

        let results = later.list_results().await.unwrap();
        assert_eq!(results, vec![second.clone(), first.clone()]);
        assert!(results[0].timestamp() > results[1].timestamp());

        later.clear_results().await.unwrap();
        assert!(later.list_results().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_submission_is_saved_once() {
        let service = ReaderService::in_memory(fixed_clock());
        seeded(&service).await;
        service.submit_final_test().await.unwrap();
        service.save_final_result().await.unwrap();

        assert!(service.rehydrate().await.unwrap().is_final_result_saved());
        assert!(matches!(
            service.save_final_result().await,
            Err(ReaderError::ResultAlreadySaved)
        ));
        assert_eq!(service.list_results().await.unwrap().len(), 1);

        service.set_final_answer(0, 0).await.unwrap();
        service.submit_final_test().await.unwrap();
        let attempt = service.save_final_result().await.unwrap();
        assert_eq!(attempt.score(), 1);
        assert_eq!(service.list_results().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn answers_outside_the_question_set_are_ignored() {
        let service = ReaderService::in_memory(fixed_clock());
        seeded(&service).await;

        let state = service.set_section_answer(0, 0, 99).await.unwrap();
        assert!(state.section_test(0).is_none());
        let state = service.set_final_answer(0, 7).await.unwrap();
        assert!(state.final_test().is_none());
    }

    #[tokio::test]
    async fn stale_scores_never_reach_the_history() {
        let records = InMemoryRepository::new();
        let service = ReaderService::new(fixed_clock(), Arc::new(records.clone()));
        let state = seeded(&service).await;

        let mut value: serde_json::Value =
            serde_json::from_str(&storage::records::encode_session(&state).unwrap()).unwrap();
        value["sectionTests"] = serde_json::json!({
            "0": {"answers": [0, 0, 0], "submitted": true, "score": 99}
        });
        value["finalTest"] = serde_json::json!({
            "answers": [0, 0, 0, 0], "submitted": true, "score": 9
        });
        records.put_record(SESSION_KEY, &value.to_string()).await.unwrap();

        let state = service.rehydrate().await.unwrap();
        assert_eq!(state.section_test(0).unwrap().score(), 3);
        let attempt = service.save_final_result().await.unwrap();
        assert_eq!((attempt.score(), attempt.total()), (4, 4));
    }

    #[tokio::test]
    async fn reset_forgets_session_but_keeps_results() {
        let service = ReaderService::in_memory(fixed_clock());
        seeded(&service).await;
        service.submit_final_test().await.unwrap();
        service.save_final_result().await.unwrap();

        service.reset().await.unwrap();
        assert!(!service.rehydrate().await.unwrap().has_content());
        assert_eq!(service.list_results().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_session_record_falls_back_to_defaults() {
        let records = InMemoryRepository::new();
        records.put_record(SESSION_KEY, "not json at all").await.unwrap();
        let service = ReaderService::new(fixed_clock(), Arc::new(records));

        let state = service.rehydrate().await.unwrap();
        assert_eq!(state, SessionState::default());

        let state = service.navigate(3).await.unwrap();
        assert_eq!(state.current_section_index(), 0);
    }

    #[tokio::test]
    async fn progress_tracks_completion() {
        let service = ReaderService::in_memory(fixed_clock());
        seeded(&service).await;
        for section in 0..3 {
            service.submit_section_test(section).await.unwrap();
        }

        let progress = service.progress().await.unwrap();
        assert_eq!(progress.total_sections, 3);
        assert_eq!(progress.completed_sections, 3);
        assert!(progress.all_sections_complete);
        assert!(progress.is_last_section);
        assert!(!progress.final_submitted);
        assert_eq!(progress.final_total, 4);
    }
}
