use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::types::*;

/// One playthrough of a question deck
#[derive(Debug)]
pub(crate) struct Game {
    pub phase: RoundPhase,
    /// Zero-based, -1 before the first round
    pub question_index: i32,
    pub questions: Vec<Question>,
    /// Submissions of the current round, in arrival order
    pub submissions: Vec<AnswerSubmission>,
    /// True whenever no round is accepting answers
    pub round_closed: bool,
    /// Bumped on every round open; timers carry the value they were armed for
    pub round_seq: u64,
    /// Attached participants at round open
    pub expected: usize,
    pub round_started: Option<Instant>,
    pub deadline: Option<DateTime<Utc>>,
}

impl Default for Game {
    fn default() -> Self {
        Self {
            phase: RoundPhase::Idle,
            question_index: -1,
            questions: Vec::new(),
            submissions: Vec::new(),
            round_closed: true,
            round_seq: 0,
            expected: 0,
            round_started: None,
            deadline: None,
        }
    }
}

impl Game {
    pub fn with_questions(questions: Vec<Question>, round_seq: u64) -> Self {
        Self {
            questions,
            round_seq,
            ..Self::default()
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        usize::try_from(self.question_index)
            .ok()
            .and_then(|i| self.questions.get(i))
    }

    pub fn is_round_open(&self) -> bool {
        self.phase == RoundPhase::RoundOpen && !self.round_closed
    }

    pub fn has_submitted(&self, nick: &str) -> bool {
        self.submissions.iter().any(|s| s.nick == nick)
    }

    pub fn info(&self) -> GameInfo {
        GameInfo {
            running: self.phase.is_running(),
            question_index: self.question_index,
            total: self.questions.len(),
            phase: self.phase,
        }
    }
}

/// Single-slot timer: the round timeout or the interlude pause.
///
/// Arming always aborts whatever was armed before.
#[derive(Debug, Default)]
pub(crate) struct RoomTimer {
    handle: Option<JoinHandle<()>>,
}

impl RoomTimer {
    pub fn arm(&mut self, handle: JoinHandle<()>) {
        self.cancel();
        self.handle = Some(handle);
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RoomTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn question() -> Question {
        Question {
            category: "Misc".to_string(),
            question: "2+2?".to_string(),
            options: [
                "3".to_string(),
                "4".to_string(),
                "5".to_string(),
                "22".to_string(),
            ],
            answer_index: 1,
        }
    }

    #[test]
    fn test_no_current_question_before_start() {
        let game = Game::with_questions(vec![question()], 0);
        assert_eq!(game.question_index, -1);
        assert!(game.current_question().is_none());
        assert!(!game.is_round_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_arming_cancels_previous_timer() {
        let mut timer = RoomTimer::default();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let first = tx.clone();
        timer.arm(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = first.send("first");
        }));
        timer.arm(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let _ = tx.send("second");
        }));

        assert_eq!(rx.recv().await, Some("second"));
        assert_eq!(rx.recv().await, None);
    }
}
