use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AttemptId, ReaderMode};

/// A recorded final-test result. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAttempt {
    id: AttemptId,
    timestamp: DateTime<Utc>,
    mode: ReaderMode,
    score: u32,
    total: u32,
    title: String,
}

impl ResultAttempt {
    #[must_use]
    pub fn new(
        id: AttemptId,
        timestamp: DateTime<Utc>,
        mode: ReaderMode,
        score: u32,
        total: u32,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            mode,
            score,
            total,
            title: title.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &AttemptId {
        &self.id
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn mode(&self) -> ReaderMode {
        self.mode
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn decodes_stored_attempt() {
        let raw = r#"{
            "id": "1700000000000",
            "timestamp": "2023-11-14T22:13:20.000Z",
            "mode": "dyslexia",
            "score": 7,
            "total": 10,
            "title": "Rivers"
        }"#;
        let attempt: ResultAttempt = serde_json::from_str(raw).unwrap();
        assert_eq!(attempt.id().as_str(), "1700000000000");
        assert_eq!(attempt.timestamp(), fixed_now());
        assert_eq!(attempt.mode(), ReaderMode::Dyslexia);
        assert_eq!((attempt.score(), attempt.total()), (7, 10));
    }
}
