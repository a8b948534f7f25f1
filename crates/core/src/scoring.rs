//! Assessment scoring over a question set and an answer vector.
//!
//! Both functions are total: answer vectors shorter than the question set are
//! treated as unanswered past their end, and selections that do not resolve to
//! an option never count as correct.

use crate::model::QuizQuestion;

/// A question the learner did not answer correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mistake<'a> {
    pub question: &'a QuizQuestion,
    /// Text of the chosen option, or `None` when nothing (valid) was chosen.
    pub selected: Option<&'a str>,
}

fn selection(answers: &[Option<usize>], idx: usize) -> Option<usize> {
    answers.get(idx).copied().flatten()
}

/// Number of questions whose selected option equals the correct answer.
///
/// The result is always within `[0, questions.len()]`. No partial credit.
#[must_use]
pub fn score(questions: &[QuizQuestion], answers: &[Option<usize>]) -> u32 {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(idx, question)| question.is_correct(selection(answers, *idx)))
        .count();
    u32::try_from(correct).unwrap_or(u32::MAX)
}

/// Questions answered wrongly or not at all, in question order.
#[must_use]
pub fn mistakes<'a>(questions: &'a [QuizQuestion], answers: &[Option<usize>]) -> Vec<Mistake<'a>> {
    questions
        .iter()
        .enumerate()
        .filter_map(|(idx, question)| {
            let selected = selection(answers, idx).and_then(|opt| question.option(opt));
            if selected == Some(question.correct_answer.as_str()) {
                None
            } else {
                Some(Mistake { question, selected })
            }
        })
        .collect()
}
