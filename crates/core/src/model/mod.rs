mod attempt;
mod content;
mod ids;
mod preferences;
mod session;
mod test_state;

pub use attempt::ResultAttempt;
pub use content::{ContentError, QuizQuestion, Section, StudyContent};
pub use ids::AttemptId;
pub use preferences::{
    FontSize, LetterSpacing, ParsePreferenceError, PreferenceUpdate, ReaderMode,
    ReadingPreferences,
};
pub use session::{ContentSource, SessionDraft, SessionState};
pub use test_state::TestState;
