use chrono::Duration;
use reader_core::model::{
    ContentSource, FontSize, PreferenceUpdate, ReaderMode, StudyContent,
};
use reader_core::time::fixed_now;
use services::{Clock, ReaderService};
use std::sync::Arc;
use storage::repository::{InMemoryRepository, RecordRepository};

const LESSON: &str = r#"{
    "overall_title": "How Memory Works",
    "sections": [
        {
            "title": "Encoding",
            "content": "Attention gates what gets stored. Repetition helps.",
            "key_points": ["Attention matters", "Repeat to retain"],
            "mini_test": [
                {"question": "What gates storage?", "options": ["Attention", "Sleep"], "correct_answer": "Attention", "fact": "Focus comes first."},
                {"question": "What helps retention?", "options": ["Noise", "Repetition"], "correct_answer": "Repetition", "fact": "Spacing helps too."},
                {"question": "Is memory passive?", "options": ["Yes", "No"], "correct_answer": "No", "fact": "It is reconstructive."}
            ]
        },
        {
            "title": "Consolidation",
            "content": "Sleep stabilises new memories.",
            "mini_test": [
                {"question": "What stabilises memories?", "options": ["Sleep", "Coffee"], "correct_answer": "Sleep", "fact": "Slow-wave sleep in particular."}
            ]
        }
    ],
    "final_test": [
        {"question": "F1", "options": ["a", "b"], "correct_answer": "a", "fact": "x"},
        {"question": "F2", "options": ["a", "b"], "correct_answer": "b", "fact": "x"},
        {"question": "F3", "options": ["a", "b"], "correct_answer": "a", "fact": "x"},
        {"question": "F4", "options": ["a", "b"], "correct_answer": "b", "fact": "x"},
        {"question": "F5", "options": ["a", "b"], "correct_answer": "a", "fact": "x"},
        {"question": "F6", "options": ["a", "b"], "correct_answer": "b", "fact": "x"},
        {"question": "F7", "options": ["a", "b"], "correct_answer": "a", "fact": "x"},
        {"question": "F8", "options": ["a", "b"], "correct_answer": "b", "fact": "x"},
        {"question": "F9", "options": ["a", "b"], "correct_answer": "a", "fact": "x"},
        {"question": "F10", "options": ["a", "b"], "correct_answer": "b", "fact": "x"}
    ]
}"#;

fn lesson() -> StudyContent {
    StudyContent::from_json_str(LESSON).unwrap()
}

#[tokio::test]
async fn full_reading_session_round_trip() {
    let service = ReaderService::in_memory(Clock::fixed(fixed_now()));
    service
        .update_preference(PreferenceUpdate::FontSize(FontSize::Large))
        .await
        .unwrap();
    service
        .seed(lesson(), ContentSource::for_raw_input(""), "")
        .await
        .unwrap();

    service.set_section_answer(0, 0, 0).await.unwrap();
    service.set_section_answer(0, 1, 0).await.unwrap();
    service.set_section_answer(0, 2, 1).await.unwrap();
    let after_first = service.submit_section_test(0).await.unwrap();
    assert_eq!(after_first.section_test(0).unwrap().score(), 2);
    assert_eq!(after_first.completed_sections(), vec![0]);
    assert_eq!(after_first.current_section_index(), 1);
    assert_eq!(after_first.preferences().font_size, FontSize::Large);
    assert!(!after_first.all_sections_complete());

    service.set_section_answer(1, 0, 0).await.unwrap();
    let after_last = service.submit_section_test(1).await.unwrap();
    assert_eq!(after_last.current_section_index(), 1);
    assert!(after_last.all_sections_complete());

    for (question, option) in [(0, 0), (1, 1), (2, 1)] {
        service.set_final_answer(question, option).await.unwrap();
    }
    let finished = service.submit_final_test().await.unwrap();
    assert_eq!(finished.final_test().unwrap().score(), 2);

    let mistakes = service.final_mistakes().await.unwrap();
    assert_eq!(mistakes.len(), 8);
    assert_eq!(mistakes[0].question.question, "F3");
    assert_eq!(mistakes[0].selected.as_deref(), Some("b"));

    let attempt = service.save_final_result().await.unwrap();
    assert_eq!((attempt.score(), attempt.total()), (2, 10));
    assert_eq!(attempt.title(), "How Memory Works");

    let restarted = service.restart().await.unwrap();
    assert!(restarted.has_content());
    assert!(restarted.completed_sections().is_empty());
    assert!(restarted.final_test().is_none());
    assert_eq!(restarted.preferences().font_size, FontSize::Large);
    assert_eq!(service.list_results().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unanswered_final_test_scores_zero() {
    let service = ReaderService::in_memory(Clock::fixed(fixed_now()));
    service.seed(lesson(), ContentSource::Demo, "").await.unwrap();

    let state = service.submit_final_test().await.unwrap();
    let final_test = state.final_test().unwrap();
    assert!(final_test.submitted());
    assert_eq!(final_test.score(), 0);

    let mistakes = service.final_mistakes().await.unwrap();
    assert_eq!(mistakes.len(), 10);
    assert!(mistakes.iter().all(|m| m.selected.is_none()));
}

#[tokio::test]
async fn results_accumulate_newest_first() {
    let records: Arc<dyn RecordRepository> = Arc::new(InMemoryRepository::new());
    let mut clock = Clock::fixed(fixed_now());
    let service = ReaderService::new(clock, Arc::clone(&records));
    service.seed(lesson(), ContentSource::Demo, "").await.unwrap();
    service.submit_final_test().await.unwrap();
    let first = service.save_final_result().await.unwrap();

    clock.advance(Duration::hours(1));
    let later = ReaderService::new(clock, records);
    later
        .update_preference(PreferenceUpdate::Mode(ReaderMode::Dyslexia))
        .await
        .unwrap();
    later.set_final_answer(0, 0).await.unwrap();
    later.submit_final_test().await.unwrap();
    let second = later.save_final_result().await.unwrap();

    let results = later.list_results().await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id(), second.id());
    assert_eq!(results[1].id(), first.id());
    assert_eq!(results[0].mode(), ReaderMode::Dyslexia);
    assert_eq!(results[0].score(), 1);
}

#[tokio::test]
async fn sqlite_backed_session_survives_reopen() {
    let url = "sqlite:file:memdb_reader_flow?mode=memory&cache=shared";
    let service = ReaderService::new_sqlite(url, Clock::fixed(fixed_now()))
        .await
        .unwrap();
    service
        .seed(lesson(), ContentSource::Import, "pasted notes")
        .await
        .unwrap();
    service.navigate(99).await.unwrap();
    service.set_section_answer(1, 0, 0).await.unwrap();

    let reopened = ReaderService::new_sqlite(url, Clock::fixed(fixed_now()))
        .await
        .unwrap();
    let state = reopened.rehydrate().await.unwrap();
    assert_eq!(state.current_section_index(), 1);
    assert_eq!(state.source(), Some(ContentSource::Import));
    assert_eq!(state.raw_input(), "pasted notes");
    assert_eq!(state.section_answers(1), Some(vec![Some(0)]));
    assert_eq!(state.content().map(|c| c.overall_title.as_str()), Some("How Memory Works"));
}
