use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Must be the first frame on every connection
    #[serde(rename_all = "camelCase")]
    Join {
        room_id: RoomId,
        #[serde(default, rename = "secret", alias = "password")]
        password: String,
        #[serde(default, rename = "nickname", alias = "nick")]
        nick: String,
        #[serde(default)]
        is_admin: bool,
        #[serde(default, rename = "isObserver", alias = "observer", alias = "spectator")]
        observer: bool,
    },
    /// Admin only
    StartGame,
    SubmitAnswer {
        option: OptionLetter,
    },
    VoteRematch {
        accept: bool,
    },
    /// Admin only: skip the rest of the interlude
    NextQuestion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Joined {
        room: RoomSnapshot,
        you: SessionInfo,
    },
    MembershipUpdate {
        room: RoomSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    QuestionOpened {
        /// One-based for display
        index: usize,
        total: usize,
        category: String,
        #[serde(rename = "questionText")]
        question: String,
        options: [String; 4],
        time_limit_seconds: u64,
        deadline: String,
        server_now: String,
    },
    RoundResult {
        #[serde(flatten)]
        result: RoundResult,
    },
    GameOver {
        scoreboard: Vec<ScoreEntry>,
    },
    RematchUpdate {
        votes: Vec<Nickname>,
        required: usize,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(err: &crate::error::RoomError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"join","roomId":"k7p2xq","secret":"pw1","nickname":"Alice","isAdmin":true}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Join {
                room_id,
                password,
                nick,
                is_admin,
                observer,
            } => {
                assert_eq!(room_id, "k7p2xq");
                assert_eq!(password, "pw1");
                assert_eq!(nick, "Alice");
                assert!(is_admin);
                assert!(!observer);
            }
            other => panic!("Expected Join, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_observer_join_without_password() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join","roomId":"k7p2xq","isObserver":true}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Join { observer: true, .. }));
    }

    #[test]
    fn test_parse_join_legacy_field_names() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"join","roomId":"k7p2xq","password":"pw1","nick":"Bob","spectator":true}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Join {
                password,
                nick,
                observer,
                ..
            } => {
                assert_eq!(password, "pw1");
                assert_eq!(nick, "Bob");
                assert!(observer);
            }
            other => panic!("Expected Join, got {:?}", other),
        }
    }

    #[test]
    fn test_question_opened_uses_question_text() {
        let msg = ServerMessage::QuestionOpened {
            index: 1,
            total: 15,
            category: "Music".to_string(),
            question: "Who wrote the Ninth?".to_string(),
            options: ["a", "b", "c", "d"].map(String::from),
            time_limit_seconds: 10,
            deadline: "2026-01-01T00:00:10+00:00".to_string(),
            server_now: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["questionText"], "Who wrote the Ninth?");
        assert!(json.get("question").is_none());
        assert!(json.get("answerIndex").is_none());
    }

    #[test]
    fn test_unknown_option_letter_is_rejected() {
        let result =
            serde_json::from_str::<ClientMessage>(r#"{"type":"submitAnswer","option":"E"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_round_result_is_flattened() {
        let msg = ServerMessage::RoundResult {
            result: RoundResult {
                correct_option: OptionLetter::B,
                winner: None,
                scoreboard: vec![],
                details: vec![],
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "roundResult");
        assert_eq!(json["correctOption"], "B");
        assert!(json["winnerNickname"].is_null());
        assert!(json.get("winner").is_none());
    }
}
