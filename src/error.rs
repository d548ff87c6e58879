//! Error taxonomy for room operations.
//!
//! Every failure a client can trigger maps onto one [`ErrorKind`]. Errors are only
//! ever reported to the originating connection (WebSocket `error` frame or HTTP
//! response), never broadcast.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::types::RoomId;

/// Coarse classification of a [`RoomError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    AuthFailure,
    NotFound,
    Conflict,
    StateViolation,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("nickname must be 3-12 characters")]
    InvalidNick,

    #[error("wrong room or password")]
    WrongSecret,

    #[error("not the room administrator")]
    NotAdmin,

    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("nickname {0} is already taken in this room")]
    NickTaken(String),

    #[error("game already started, join as observer")]
    GameAlreadyRunning,

    #[error("unknown nickname {0}")]
    UnknownNick(String),

    #[error("not allowed right now: {0}")]
    StateViolation(&'static str),

    #[error("questions unavailable: {0}")]
    QuestionsUnavailable(String),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomError::InvalidInput(_) | RoomError::InvalidNick => ErrorKind::InvalidInput,
            RoomError::WrongSecret | RoomError::NotAdmin => ErrorKind::AuthFailure,
            RoomError::NotFound(_) | RoomError::UnknownNick(_) => ErrorKind::NotFound,
            RoomError::NickTaken(_) | RoomError::GameAlreadyRunning => ErrorKind::Conflict,
            RoomError::StateViolation(_) => ErrorKind::StateViolation,
            RoomError::QuestionsUnavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Stable machine-readable code sent in `error` frames
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::InvalidInput(_) => "INVALID_INPUT",
            RoomError::InvalidNick => "INVALID_NICK",
            RoomError::WrongSecret => "WRONG_SECRET",
            RoomError::NotAdmin => "NOT_ADMIN",
            RoomError::NotFound(_) => "NO_SUCH_ROOM",
            RoomError::NickTaken(_) => "NICK_TAKEN",
            RoomError::GameAlreadyRunning => "GAME_RUNNING",
            RoomError::UnknownNick(_) => "UNKNOWN_NICK",
            RoomError::StateViolation(_) => "STATE_VIOLATION",
            RoomError::QuestionsUnavailable(_) => "QUESTIONS_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::AuthFailure => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::StateViolation => StatusCode::CONFLICT,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(RoomError::InvalidNick.kind(), ErrorKind::InvalidInput);
        assert_eq!(RoomError::WrongSecret.kind(), ErrorKind::AuthFailure);
        assert_eq!(RoomError::NotAdmin.kind(), ErrorKind::AuthFailure);
        assert_eq!(
            RoomError::NotFound("abc123".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(RoomError::GameAlreadyRunning.kind(), ErrorKind::Conflict);
        assert_eq!(
            RoomError::NickTaken("Bob".to_string()).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(RoomError::InvalidNick.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RoomError::WrongSecret.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            RoomError::NotFound("x".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(RoomError::GameAlreadyRunning.status(), StatusCode::CONFLICT);
        assert_eq!(
            RoomError::QuestionsUnavailable("empty".to_string()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
