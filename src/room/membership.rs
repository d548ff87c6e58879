use super::{validate_nick, ConnectionHandle, Participant, Room, RoomState};
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::types::*;

impl Room {
    /// Attach a participant connection.
    ///
    /// An unseen nickname is registered on the fly while no game is running.
    /// A known nickname always reattaches and takes over any older connection.
    pub async fn attach(
        &self,
        nick: &str,
        secret: &str,
        as_admin: bool,
        conn: ConnectionHandle,
    ) -> Result<SessionInfo, RoomError> {
        if !self.check_secret(secret) {
            return Err(RoomError::WrongSecret);
        }
        if as_admin && !self.is_admin(nick) {
            return Err(RoomError::NotAdmin);
        }

        let mut state = self.state.lock().await;

        if state.participant(nick).is_none() {
            if state.game.phase.is_running() {
                return Err(RoomError::GameAlreadyRunning);
            }
            validate_nick(nick)?;
            state.participants.push(Participant::new(nick.to_string()));
            tracing::info!("Registered {} in room {} on attach", nick, self.id);
        }

        let conn_id = conn.id.clone();
        let Some(participant) = state.participant_mut(nick) else {
            return Err(RoomError::UnknownNick(nick.to_string()));
        };
        if participant.connection.replace(conn).is_some() {
            tracing::info!("{} reattached in room {}, replacing old connection", nick, self.id);
        }
        participant.detached = false;

        let you = SessionInfo {
            nick: Some(nick.to_string()),
            is_admin: self.is_admin(nick),
            observer: false,
        };

        tracing::info!(
            "{} attached to room {} (connection {})",
            nick,
            self.id,
            conn_id
        );

        self.welcome(&state, nick_connection(&state, nick), you.clone());
        self.broadcast_membership(&mut state);

        Ok(you)
    }

    /// Attach a read-only observer; no password needed
    pub async fn attach_observer(&self, conn: ConnectionHandle) -> SessionInfo {
        let mut state = self.state.lock().await;
        let you = SessionInfo {
            nick: None,
            is_admin: false,
            observer: true,
        };

        tracing::info!("Observer {} attached to room {}", conn.id, self.id);
        self.welcome(&state, Some(&conn), you.clone());
        state.observers.push(conn);
        you
    }

    /// Mark a participant detached, keeping its score.
    ///
    /// Only the connection that is currently attached may detach the nickname;
    /// a late close from a replaced connection is ignored.
    pub async fn detach(&self, nick: &str, conn_id: &str) -> Result<(), RoomError> {
        let mut state = self.state.lock().await;
        let participant = state
            .participant_mut(nick)
            .ok_or_else(|| RoomError::UnknownNick(nick.to_string()))?;

        match &participant.connection {
            Some(conn) if conn.id == conn_id => {
                participant.connection = None;
                participant.detached = true;
            }
            _ => {
                tracing::debug!(
                    "Ignoring stale detach of {} from connection {}",
                    nick,
                    conn_id
                );
                return Ok(());
            }
        }

        tracing::info!("{} detached from room {}", nick, self.id);
        self.broadcast_membership(&mut state);
        Ok(())
    }

    pub async fn detach_observer(&self, conn_id: &str) {
        let mut state = self.state.lock().await;
        state.observers.retain(|o| o.id != conn_id);
        tracing::info!("Observer {} left room {}", conn_id, self.id);
    }

    pub(super) fn broadcast_membership(&self, state: &mut RoomState) {
        let room = self.snapshot_of(state);
        state.broadcast(&ServerMessage::MembershipUpdate { room });
    }

    /// `joined` plus, while a round is open, the live question
    fn welcome(&self, state: &RoomState, conn: Option<&ConnectionHandle>, you: SessionInfo) {
        let Some(conn) = conn else {
            return;
        };

        conn.deliver(ServerMessage::Joined {
            room: self.snapshot_of(state),
            you,
        });

        if state.game.is_round_open() {
            if let Some(msg) = self.question_message(&state.game) {
                conn.deliver(msg);
            }
        }
    }
}

fn nick_connection<'a>(state: &'a RoomState, nick: &str) -> Option<&'a ConnectionHandle> {
    state.participant(nick).and_then(|p| p.connection.as_ref())
}
