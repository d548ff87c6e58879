//! WebSocket message dispatch
//!
//! A connection starts unjoined; [`handle_join`] turns its first `join` frame into
//! a [`Session`]. Every later frame goes through [`handle_message`].

use std::sync::Arc;

use crate::error::RoomError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{ConnectionHandle, Room, SubmitOutcome};
use crate::state::AppState;
use crate::types::*;

/// A joined connection
pub struct Session {
    pub room: Arc<Room>,
    /// `None` for observers
    pub nick: Option<Nickname>,
    pub conn_id: ConnectionId,
}

impl Session {
    pub fn is_observer(&self) -> bool {
        self.nick.is_none()
    }
}

/// Unwrap the session nickname, or answer an observer with an error
macro_rules! require_participant {
    ($session:expr, $action:literal) => {
        match &$session.nick {
            Some(nick) => nick,
            None => {
                return Some(ServerMessage::error(&RoomError::StateViolation(concat!(
                    "observers cannot ",
                    $action
                ))))
            }
        }
    };
}

/// Attach the connection to the room named in a `join` frame
pub async fn handle_join(
    msg: ClientMessage,
    state: &AppState,
    conn: &ConnectionHandle,
) -> Result<Session, RoomError> {
    let ClientMessage::Join {
        room_id,
        password,
        nick,
        is_admin,
        observer,
    } = msg
    else {
        return Err(RoomError::StateViolation("join a room first"));
    };

    let room = state.registry.get_room(&room_id).await?;

    if observer {
        room.attach_observer(conn.clone()).await;
        return Ok(Session {
            room,
            nick: None,
            conn_id: conn.id.clone(),
        });
    }

    room.attach(&nick, &password, is_admin, conn.clone()).await?;
    Ok(Session {
        room,
        nick: Some(nick),
        conn_id: conn.id.clone(),
    })
}

/// Handle a frame from a joined connection and return an optional reply.
///
/// Dropped answers and ignored admin actions produce no reply.
pub async fn handle_message(msg: ClientMessage, session: &Session) -> Option<ServerMessage> {
    let room = &session.room;

    match msg {
        ClientMessage::Join { .. } => Some(ServerMessage::error(&RoomError::StateViolation(
            "already joined",
        ))),

        ClientMessage::StartGame => {
            let nick = require_participant!(session, "start the game");
            match room.start_game(nick).await {
                Ok(_) => None,
                Err(e) => Some(ServerMessage::error(&e)),
            }
        }

        ClientMessage::SubmitAnswer { option } => {
            let nick = require_participant!(session, "answer");
            match room.submit_answer(nick, option).await {
                SubmitOutcome::Accepted | SubmitOutcome::AcceptedAndClosed => {}
                outcome => tracing::debug!("Answer from {} dropped: {:?}", nick, outcome),
            }
            None
        }

        ClientMessage::VoteRematch { accept } => {
            let nick = require_participant!(session, "vote");
            match room.vote_rematch(nick, accept).await {
                Ok(_) => None,
                Err(e) => Some(ServerMessage::error(&e)),
            }
        }

        ClientMessage::NextQuestion => {
            let nick = require_participant!(session, "advance the game");
            room.next_question(nick).await;
            None
        }
    }
}

/// Detach when the connection goes away
pub async fn handle_leave(session: &Session) {
    match &session.nick {
        Some(nick) => {
            if let Err(e) = session.room.detach(nick, &session.conn_id).await {
                tracing::warn!("Detach of {} failed: {}", nick, e);
            }
        }
        None => session.room.detach_observer(&session.conn_id).await,
    }
}
