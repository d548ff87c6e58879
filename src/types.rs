use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque ID types
pub type RoomId = String;
pub type Nickname = String;
pub type ConnectionId = String;

/// Per-room game timing and deck size
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub questions_per_game: usize,
    pub round_time: Duration,
    pub interlude: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            questions_per_game: 15,
            round_time: Duration::from_secs(10),
            interlude: Duration::from_millis(3000),
        }
    }
}

/// Display letter of one of the four answer options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [
        OptionLetter::A,
        OptionLetter::B,
        OptionLetter::C,
        OptionLetter::D,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// A prepared question: four options in display order, one of them correct.
///
/// `answer_index` stays on the server until the round has closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub category: String,
    pub question: String,
    pub options: [String; 4],
    pub answer_index: usize,
}

impl Question {
    /// Decks are checked for an in-range `answer_index` before a game starts
    pub fn correct_option(&self) -> OptionLetter {
        OptionLetter::from_index(self.answer_index).unwrap_or(OptionLetter::A)
    }
}

/// One answer received during an open round
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub nick: Nickname,
    pub option: OptionLetter,
    /// Server receipt time; client clocks are never trusted
    pub received_at: tokio::time::Instant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    Idle,
    RoundOpen,
    RoundClosing,
    Interlude,
    GameOver,
    RematchPending,
}

impl RoundPhase {
    /// True while a game is in progress (the "running" flag)
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            RoundPhase::RoundOpen | RoundPhase::RoundClosing | RoundPhase::Interlude
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub nick: Nickname,
    pub score: u32,
    pub detached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub running: bool,
    /// Zero-based, -1 before the first question
    pub question_index: i32,
    pub total: usize,
    pub phase: RoundPhase,
}

/// Membership snapshot broadcast on every attach/detach.
/// Never carries the correct answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub admin: Nickname,
    pub players: Vec<PlayerInfo>,
    pub game: GameInfo,
}

/// Entry of `GET /api/rooms`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub admin: Nickname,
    pub players: usize,
    pub running: bool,
    pub question_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub nick: Nickname,
    pub score: u32,
}

/// Per-participant outcome of a single round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundDetail {
    pub nick: Nickname,
    /// Milliseconds from round open to receipt, absent if no answer
    pub time_ms: Option<u64>,
    pub is_correct: bool,
    pub option: Option<OptionLetter>,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub correct_option: OptionLetter,
    #[serde(rename = "winnerNickname")]
    pub winner: Option<Nickname>,
    pub scoreboard: Vec<ScoreEntry>,
    pub details: Vec<RoundDetail>,
}

/// Who the receiving connection is, sent with `joined`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub nick: Option<Nickname>,
    pub is_admin: bool,
    pub observer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_letter_index() {
        assert_eq!(OptionLetter::from_index(2), Some(OptionLetter::C));
        assert_eq!(OptionLetter::from_index(4), None);
    }

    #[test]
    fn test_running_phases() {
        assert!(!RoundPhase::Idle.is_running());
        assert!(RoundPhase::RoundOpen.is_running());
        assert!(RoundPhase::Interlude.is_running());
        assert!(!RoundPhase::GameOver.is_running());
        assert!(!RoundPhase::RematchPending.is_running());
    }
}
