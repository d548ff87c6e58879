//! Room entity: membership, the active game and the broadcast fan-out.
//!
//! All mutable room state lives behind one `tokio::sync::Mutex`, so answer
//! submissions, timer firings, detaches and admin actions are applied one at a
//! time. Different rooms never share a lock.

mod game;
mod membership;
mod rematch;
pub mod resolver;
mod scheduler;

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::auth::RoomSecret;
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::questions::QuestionProvider;
use crate::types::*;

use game::{Game, RoomTimer};
pub use scheduler::SubmitOutcome;

/// Outbound side of one client connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    Dropped,
    Closed,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            sender,
        }
    }

    /// Create a handle together with the receiving end the transport drains
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Never waits: a full buffer drops the message for this recipient only
    fn deliver(&self, msg: ServerMessage) -> Delivery {
        match self.sender.try_send(msg) {
            Ok(()) => Delivery::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Outbound buffer full for connection {}, dropping", self.id);
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

#[derive(Debug)]
pub struct Participant {
    pub nick: Nickname,
    pub score: u32,
    connection: Option<ConnectionHandle>,
    pub detached: bool,
}

impl Participant {
    fn new(nick: Nickname) -> Self {
        Self {
            nick,
            score: 0,
            connection: None,
            detached: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.connection.is_some()
    }
}

/// Everything guarded by the room lock
pub(crate) struct RoomState {
    /// Registration order; also the tie-break order of the scoreboard
    participants: Vec<Participant>,
    observers: Vec<ConnectionHandle>,
    game: Game,
    rematch_votes: BTreeSet<Nickname>,
    timer: RoomTimer,
    /// A deck fetch is in flight with the lock released
    deck_pending: bool,
}

impl RoomState {
    fn participant(&self, nick: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.nick == nick)
    }

    fn participant_mut(&mut self, nick: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.nick == nick)
    }

    fn attached_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_attached()).count()
    }

    fn standings(&self) -> Vec<ScoreEntry> {
        self.participants
            .iter()
            .map(|p| ScoreEntry {
                nick: p.nick.clone(),
                score: p.score,
            })
            .collect()
    }

    /// Standings sorted by descending score, ties keep registration order
    fn scoreboard(&self) -> Vec<ScoreEntry> {
        let mut board = self.standings();
        board.sort_by(|a, b| b.score.cmp(&a.score));
        board
    }

    /// Deliver to every attached participant and every observer
    fn broadcast(&mut self, msg: &ServerMessage) {
        for participant in &self.participants {
            if let Some(conn) = &participant.connection {
                conn.deliver(msg.clone());
            }
        }
        self.observers
            .retain(|observer| observer.deliver(msg.clone()) != Delivery::Closed);
    }
}

pub struct Room {
    pub id: RoomId,
    pub admin: Nickname,
    secret: RoomSecret,
    config: GameConfig,
    provider: Arc<dyn QuestionProvider>,
    state: Mutex<RoomState>,
}

impl Room {
    pub fn new(
        id: RoomId,
        secret: &str,
        admin: Nickname,
        config: GameConfig,
        provider: Arc<dyn QuestionProvider>,
    ) -> Self {
        let state = RoomState {
            participants: vec![Participant::new(admin.clone())],
            observers: Vec::new(),
            game: Game::default(),
            rematch_votes: BTreeSet::new(),
            timer: RoomTimer::default(),
            deck_pending: false,
        };

        Self {
            id,
            admin,
            secret: RoomSecret::new(secret),
            config,
            provider,
            state: Mutex::new(state),
        }
    }

    pub fn check_secret(&self, candidate: &str) -> bool {
        self.secret.matches(candidate)
    }

    pub fn is_admin(&self, nick: &str) -> bool {
        self.admin == nick
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn snapshot_of(&self, state: &RoomState) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            admin: self.admin.clone(),
            players: state
                .participants
                .iter()
                .map(|p| PlayerInfo {
                    nick: p.nick.clone(),
                    score: p.score,
                    detached: p.detached,
                })
                .collect(),
            game: state.game.info(),
        }
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        let state = self.state.lock().await;
        self.snapshot_of(&state)
    }

    pub async fn summary(&self) -> RoomSummary {
        let state = self.state.lock().await;
        RoomSummary {
            id: self.id.clone(),
            admin: self.admin.clone(),
            players: state.participants.len(),
            running: state.game.phase.is_running(),
            question_index: state.game.question_index,
        }
    }

    pub async fn phase(&self) -> RoundPhase {
        self.state.lock().await.game.phase
    }

    pub async fn scoreboard(&self) -> Vec<ScoreEntry> {
        self.state.lock().await.scoreboard()
    }

    /// Register a nickname without attaching a connection
    pub async fn register(&self, secret: &str, nick: &str) -> Result<(), RoomError> {
        if !self.check_secret(secret) {
            return Err(RoomError::WrongSecret);
        }
        validate_nick(nick)?;

        let mut state = self.state.lock().await;
        if state.game.phase.is_running() {
            return Err(RoomError::GameAlreadyRunning);
        }
        if state.participant(nick).is_some() {
            return Err(RoomError::NickTaken(nick.to_string()));
        }

        state.participants.push(Participant::new(nick.to_string()));
        tracing::info!("Registered {} in room {}", nick, self.id);
        Ok(())
    }
}

/// Nicknames are 3-12 characters
pub fn validate_nick(nick: &str) -> Result<(), RoomError> {
    let len = nick.chars().count();
    if (3..=12).contains(&len) {
        Ok(())
    } else {
        Err(RoomError::InvalidNick)
    }
}
