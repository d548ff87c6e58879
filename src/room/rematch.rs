use std::sync::Arc;

use super::{Room, RoomState};
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::types::*;

impl Room {
    /// Record a rematch vote after a game ended.
    ///
    /// A yes vote is counted once; a no vote withdraws an earlier yes. When every
    /// registered participant has voted yes a new game starts with a fresh deck.
    /// Returns whether that happened.
    pub async fn vote_rematch(self: &Arc<Self>, nick: &str, accept: bool) -> Result<bool, RoomError> {
        {
            let mut state = self.state.lock().await;

            if !matches!(
                state.game.phase,
                RoundPhase::GameOver | RoundPhase::RematchPending
            ) {
                tracing::debug!("Ignoring rematch vote from {} in room {}", nick, self.id);
                return Ok(false);
            }
            if state.participant(nick).is_none() {
                return Err(RoomError::UnknownNick(nick.to_string()));
            }

            if accept {
                state.rematch_votes.insert(nick.to_string());
            } else {
                state.rematch_votes.remove(nick);
            }
            update_phase(&mut state);

            tracing::info!(
                "Rematch vote in room {}: {} of {}",
                self.id,
                state.rematch_votes.len(),
                state.participants.len()
            );
            broadcast_votes(&mut state);

            if !rematch_agreed(&state) || state.deck_pending {
                return Ok(false);
            }
            state.deck_pending = true;
        }

        tracing::info!("Everyone agreed, fetching rematch deck for room {}", self.id);
        let deck = self.fetch_deck().await;

        let mut state = self.state.lock().await;
        state.deck_pending = false;

        let questions = match deck {
            Ok(questions) => questions,
            Err(e) => {
                // back to an open vote so a later round of votes can retry
                state.rematch_votes.clear();
                update_phase(&mut state);
                broadcast_votes(&mut state);
                return Err(e);
            }
        };

        // a vote may have been withdrawn while the lock was released
        if state.game.phase != RoundPhase::RematchPending || !rematch_agreed(&state) {
            tracing::debug!("Rematch in room {} no longer agreed, dropping deck", self.id);
            return Ok(false);
        }

        self.begin_game(&mut state, questions);
        Ok(true)
    }
}

fn update_phase(state: &mut RoomState) {
    state.game.phase = if state.rematch_votes.is_empty() {
        RoundPhase::GameOver
    } else {
        RoundPhase::RematchPending
    };
}

fn rematch_agreed(state: &RoomState) -> bool {
    !state.participants.is_empty()
        && state
            .participants
            .iter()
            .all(|p| state.rematch_votes.contains(&p.nick))
}

fn broadcast_votes(state: &mut RoomState) {
    let required = state.participants.len();
    let votes = state.rematch_votes.iter().cloned().collect();
    state.broadcast(&ServerMessage::RematchUpdate { votes, required });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::{QuestionError, QuestionProvider, QuestionResult};
    use crate::room::ConnectionHandle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct CountingDeck {
        fetches: AtomicUsize,
        /// Applied to every fetch after the first
        rematch_fails: bool,
        rematch_delay: Duration,
    }

    #[async_trait]
    impl QuestionProvider for CountingDeck {
        async fn fetch(&self, _count: usize) -> QuestionResult<Vec<Question>> {
            if self.fetches.fetch_add(1, Ordering::SeqCst) > 0 {
                if self.rematch_fails {
                    return Err(QuestionError::Empty);
                }
                tokio::time::sleep(self.rematch_delay).await;
            }
            Ok(vec![Question {
                category: "Test".to_string(),
                question: "Pick A".to_string(),
                options: ["a", "b", "c", "d"].map(String::from),
                answer_index: 0,
            }])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    type Finished = (Arc<Room>, Arc<CountingDeck>, Vec<mpsc::Receiver<ServerMessage>>);

    async fn finished_game() -> Finished {
        finished_game_with(CountingDeck::default()).await
    }

    async fn finished_game_with(deck: CountingDeck) -> Finished {
        let deck = Arc::new(deck);
        let room = Arc::new(Room::new(
            "abc123".to_string(),
            "pw1",
            "Alice".to_string(),
            GameConfig {
                questions_per_game: 1,
                round_time: Duration::from_secs(10),
                interlude: Duration::from_secs(3),
            },
            deck.clone(),
        ));

        let mut receivers = Vec::new();
        for nick in ["Alice", "Bob"] {
            let (conn, rx) = ConnectionHandle::channel(64);
            room.attach(nick, "pw1", nick == "Alice", conn).await.unwrap();
            receivers.push(rx);
        }

        room.start_game("Alice").await.unwrap();
        room.submit_answer("Alice", OptionLetter::A).await;
        room.submit_answer("Bob", OptionLetter::B).await;
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(room.phase().await, RoundPhase::GameOver);

        (room, deck, receivers)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rematch_needs_every_participant() {
        let (room, deck, _rx) = finished_game().await;

        assert_eq!(room.vote_rematch("Alice", true).await, Ok(false));
        assert_eq!(room.phase().await, RoundPhase::RematchPending);

        // counted once
        assert_eq!(room.vote_rematch("Alice", true).await, Ok(false));
        assert_eq!(deck.fetches.load(Ordering::SeqCst), 1);

        assert_eq!(room.vote_rematch("Bob", true).await, Ok(true));
        assert_eq!(deck.fetches.load(Ordering::SeqCst), 2);

        let snapshot = room.snapshot().await;
        assert_eq!(snapshot.game.phase, RoundPhase::RoundOpen);
        assert_eq!(snapshot.game.question_index, 0);
        assert!(snapshot.players.iter().all(|p| p.score == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_vote_withdraws_yes() {
        let (room, _deck, _rx) = finished_game().await;

        room.vote_rematch("Bob", true).await.unwrap();
        room.vote_rematch("Bob", false).await.unwrap();
        assert_eq!(room.phase().await, RoundPhase::GameOver);

        room.vote_rematch("Alice", true).await.unwrap();
        assert_eq!(room.phase().await, RoundPhase::RematchPending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vote_broadcasts_progress() {
        let (room, _deck, mut receivers) = finished_game().await;
        room.vote_rematch("Bob", true).await.unwrap();

        let mut last = None;
        while let Ok(msg) = receivers[0].try_recv() {
            last = Some(msg);
        }
        assert_eq!(
            last,
            Some(ServerMessage::RematchUpdate {
                votes: vec!["Bob".to_string()],
                required: 2,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_vote_outside_game_over_is_ignored() {
        let deck = Arc::new(CountingDeck::default());
        let room = Arc::new(Room::new(
            "abc123".to_string(),
            "pw1",
            "Alice".to_string(),
            GameConfig::default(),
            deck,
        ));

        assert_eq!(room.vote_rematch("Alice", true).await, Ok(false));
        assert_eq!(room.phase().await, RoundPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_voter_is_rejected() {
        let (room, _deck, _rx) = finished_game().await;
        assert_eq!(
            room.vote_rematch("Mallory", true).await,
            Err(RoomError::UnknownNick("Mallory".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_restart_reopens_vote() {
        let (room, _deck, mut receivers) = finished_game_with(CountingDeck {
            rematch_fails: true,
            ..CountingDeck::default()
        })
        .await;

        room.vote_rematch("Alice", true).await.unwrap();
        assert!(matches!(
            room.vote_rematch("Bob", true).await,
            Err(RoomError::QuestionsUnavailable(_))
        ));
        assert_eq!(room.phase().await, RoundPhase::GameOver);

        let mut last = None;
        while let Ok(msg) = receivers[1].try_recv() {
            last = Some(msg);
        }
        assert_eq!(
            last,
            Some(ServerMessage::RematchUpdate {
                votes: vec![],
                required: 2,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_vote_withdrawn_during_fetch_cancels_restart() {
        let (room, deck, _rx) = finished_game_with(CountingDeck {
            rematch_delay: Duration::from_secs(5),
            ..CountingDeck::default()
        })
        .await;

        room.vote_rematch("Alice", true).await.unwrap();
        let restarting = tokio::spawn({
            let room = room.clone();
            async move { room.vote_rematch("Bob", true).await }
        });
        tokio::task::yield_now().await;

        // the room still takes votes while the deck is fetched
        assert_eq!(room.vote_rematch("Alice", false).await, Ok(false));

        assert_eq!(restarting.await.unwrap(), Ok(false));
        assert_eq!(deck.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(room.phase().await, RoundPhase::RematchPending);
        assert!(!room.snapshot().await.game.running);
    }
}
