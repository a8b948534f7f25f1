use crate::model::QuizQuestion;

/// Progress through one quiz: a section mini-test or the final test.
///
/// `answers` holds one entry per question; `None` means unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestState {
    answers: Vec<Option<usize>>,
    submitted: bool,
    score: u32,
}

impl TestState {
    /// An unsubmitted state with every question unanswered.
    #[must_use]
    pub fn blank(question_count: usize) -> Self {
        Self {
            answers: vec![None; question_count],
            submitted: false,
            score: 0,
        }
    }

    /// Rebuild a state from stored values.
    ///
    /// No shape check happens here: the stored vector may belong to content
    /// that has since been replaced. Readers normalise through
    /// [`TestState::answers_for`].
    #[must_use]
    pub fn from_persisted(answers: Vec<Option<usize>>, submitted: bool, score: u32) -> Self {
        Self {
            answers,
            submitted,
            score,
        }
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn submitted(&self) -> bool {
        self.submitted
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn fits(&self, question_count: usize) -> bool {
        self.answers.len() == question_count
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    #[must_use]
    pub fn all_answered(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    /// Answers sized for `question_count`.
    ///
    /// A missing state, or one whose length disagrees with the question count,
    /// yields a fresh all-unanswered vector.
    #[must_use]
    pub fn answers_for(existing: Option<&Self>, question_count: usize) -> Vec<Option<usize>> {
        match existing {
            Some(state) if state.fits(question_count) => state.answers.clone(),
            _ => vec![None; question_count],
        }
    }

    /// Record one answer, keeping `submitted` and `score` as they were.
    ///
    /// Returns `None` when `question` is outside the question set or `option`
    /// names no option of that question.
    pub(crate) fn with_answer(
        existing: Option<&Self>,
        questions: &[QuizQuestion],
        question: usize,
        option: usize,
    ) -> Option<Self> {
        questions.get(question)?.option(option)?;
        let mut answers = Self::answers_for(existing, questions.len());
        answers[question] = Some(option);
        Some(Self {
            answers,
            submitted: existing.is_some_and(Self::submitted),
            score: existing.map_or(0, Self::score),
        })
    }

    /// Align a stored state with the questions it belongs to.
    ///
    /// A length mismatch yields a blank state. Otherwise selections that name
    /// no option become unanswered and the score is capped at the question
    /// count.
    pub(crate) fn reconciled(self, questions: &[QuizQuestion]) -> Self {
        if !self.fits(questions.len()) {
            return Self::blank(questions.len());
        }
        let answers = self
            .answers
            .into_iter()
            .zip(questions)
            .map(|(answer, question)| answer.filter(|idx| question.option(*idx).is_some()))
            .collect();
        let max_score = u32::try_from(questions.len()).unwrap_or(u32::MAX);
        Self {
            answers,
            submitted: self.submitted,
            score: self.score.min(max_score),
        }
    }

    pub(crate) fn graded(answers: Vec<Option<usize>>, score: u32) -> Self {
        Self {
            answers,
            submitted: true,
            score,
        }
    }
}
