//! Round lifecycle: start, open, collect answers, close, interlude, game over.
//!
//! Timers re-enter the room through its lock and carry the round sequence they
//! were armed for. A firing that no longer matches the current round, or that
//! finds the round already closed, does nothing.

use std::sync::Arc;
use tokio::time::Instant;

use super::{resolver, Room, RoomState};
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::types::*;

use super::game::Game;

/// What happened to a submitted answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Accepted, and it was the last expected answer
    AcceptedAndClosed,
    RoundNotOpen,
    Duplicate,
    UnknownParticipant,
}

impl Room {
    /// Admin action: start the first game. Ignored for anyone else and outside `Idle`.
    ///
    /// The deck is fetched with the room lock released; the phase is checked again
    /// once it is back.
    pub async fn start_game(self: &Arc<Self>, nick: &str) -> Result<bool, RoomError> {
        {
            let mut state = self.state.lock().await;

            if !self.is_admin(nick) {
                tracing::debug!("Ignoring start from non-admin {} in room {}", nick, self.id);
                return Ok(false);
            }
            if state.game.phase != RoundPhase::Idle || state.deck_pending {
                tracing::debug!(
                    "Ignoring start in room {} during {:?}",
                    self.id,
                    state.game.phase
                );
                return Ok(false);
            }
            state.deck_pending = true;
        }

        let deck = self.fetch_deck().await;

        let mut state = self.state.lock().await;
        state.deck_pending = false;
        let questions = deck?;

        if state.game.phase != RoundPhase::Idle {
            tracing::debug!("Room {} left Idle while fetching, dropping deck", self.id);
            return Ok(false);
        }

        self.begin_game(&mut state, questions);
        Ok(true)
    }

    /// Draw a deck from the provider and check it is playable
    pub(super) async fn fetch_deck(&self) -> Result<Vec<Question>, RoomError> {
        let count = self.config.questions_per_game;
        let questions = self.provider.fetch(count).await.map_err(|e| {
            tracing::error!(
                "Question provider {} failed for room {}: {}",
                self.provider.name(),
                self.id,
                e
            );
            RoomError::QuestionsUnavailable(e.to_string())
        })?;

        if questions.is_empty() {
            return Err(RoomError::QuestionsUnavailable("empty deck".to_string()));
        }
        if let Some(bad) = questions
            .iter()
            .find(|q| OptionLetter::from_index(q.answer_index).is_none())
        {
            tracing::error!(
                "Question provider {} returned answer index {} for {:?}",
                self.provider.name(),
                bad.answer_index,
                bad.question
            );
            return Err(RoomError::QuestionsUnavailable(format!(
                "answer index {} out of range",
                bad.answer_index
            )));
        }

        Ok(questions)
    }

    /// Fresh deck, scores to zero, votes cleared, round 0 opened
    pub(super) fn begin_game(self: &Arc<Self>, state: &mut RoomState, questions: Vec<Question>) {
        for participant in state.participants.iter_mut() {
            participant.score = 0;
            participant.detached = !participant.is_attached();
        }
        state.rematch_votes.clear();
        state.timer.cancel();

        let next_seq = state.game.round_seq;
        state.game = Game::with_questions(questions, next_seq);

        tracing::info!(
            "Game started in room {} with {} questions",
            self.id,
            state.game.questions.len()
        );

        self.open_next_round(state);
    }

    /// Advance the index and open that round, or end the game when the deck is exhausted
    fn open_next_round(self: &Arc<Self>, state: &mut RoomState) {
        state.timer.cancel();

        let game = &mut state.game;
        game.question_index += 1;
        game.submissions.clear();

        if game.current_question().is_none() {
            self.end_game(state);
            return;
        }

        game.round_seq += 1;
        game.round_closed = false;
        game.phase = RoundPhase::RoundOpen;
        game.round_started = Some(Instant::now());
        game.deadline = chrono::Duration::from_std(self.config.round_time)
            .ok()
            .map(|limit| chrono::Utc::now() + limit);
        let seq = game.round_seq;
        state.game.expected = state.attached_count();

        tracing::info!(
            "Room {} opened question {}/{} (expecting {} answers)",
            self.id,
            state.game.question_index + 1,
            state.game.questions.len(),
            state.game.expected
        );

        if let Some(msg) = self.question_message(&state.game) {
            state.broadcast(&msg);
        }

        let room = Arc::clone(self);
        let limit = self.config.round_time;
        state.timer.arm(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            room.round_timeout(seq).await;
        }));
    }

    async fn round_timeout(self: &Arc<Self>, seq: u64) {
        let mut state = self.state.lock().await;
        if self.close_round(&mut state, seq) {
            tracing::debug!("Round {} in room {} closed by timeout", seq, self.id);
        }
    }

    /// Record an answer. Late, duplicate and unknown answers are dropped, not errors.
    pub async fn submit_answer(self: &Arc<Self>, nick: &str, option: OptionLetter) -> SubmitOutcome {
        let mut state = self.state.lock().await;

        if !state.game.is_round_open() {
            tracing::debug!("Dropping answer from {} in room {}: round not open", nick, self.id);
            return SubmitOutcome::RoundNotOpen;
        }
        if !state.participant(nick).is_some_and(|p| p.is_attached()) {
            tracing::debug!("Dropping answer from unattached {} in room {}", nick, self.id);
            return SubmitOutcome::UnknownParticipant;
        }
        if state.game.has_submitted(nick) {
            tracing::debug!("Dropping duplicate answer from {} in room {}", nick, self.id);
            return SubmitOutcome::Duplicate;
        }

        state.game.submissions.push(AnswerSubmission {
            nick: nick.to_string(),
            option,
            received_at: Instant::now(),
        });

        let game = &state.game;
        if game.expected > 0 && game.submissions.len() >= game.expected {
            let seq = game.round_seq;
            self.close_round(&mut state, seq);
            return SubmitOutcome::AcceptedAndClosed;
        }

        SubmitOutcome::Accepted
    }

    /// Close the round `seq` exactly once. Returns false when it was already closed
    /// or has been superseded.
    fn close_round(self: &Arc<Self>, state: &mut RoomState, seq: u64) -> bool {
        if state.game.round_seq != seq || !state.game.is_round_open() {
            return false;
        }

        state.game.round_closed = true;
        state.game.phase = RoundPhase::RoundClosing;
        state.timer.cancel();

        let Some(question) = state.game.current_question() else {
            return false;
        };
        let started = state.game.round_started.unwrap_or_else(Instant::now);
        let result = resolver::resolve(question, &state.game.submissions, started, &state.standings());

        if let Some(winner) = &result.winner {
            if let Some(participant) = state.participant_mut(winner) {
                participant.score += 1;
            }
        }

        tracing::info!(
            "Room {} closed question {} with {} answers, winner: {:?}",
            self.id,
            state.game.question_index + 1,
            state.game.submissions.len(),
            result.winner
        );

        state.game.phase = RoundPhase::Interlude;
        state.broadcast(&ServerMessage::RoundResult { result });

        let room = Arc::clone(self);
        let pause = self.config.interlude;
        state.timer.arm(tokio::spawn(async move {
            tokio::time::sleep(pause).await;
            room.finish_interlude(seq).await;
        }));

        true
    }

    async fn finish_interlude(self: &Arc<Self>, seq: u64) {
        let mut state = self.state.lock().await;
        if state.game.phase == RoundPhase::Interlude && state.game.round_seq == seq {
            self.open_next_round(&mut state);
        }
    }

    /// Admin action: cut the interlude short
    pub async fn next_question(self: &Arc<Self>, nick: &str) -> bool {
        let mut state = self.state.lock().await;
        if !self.is_admin(nick) || state.game.phase != RoundPhase::Interlude {
            tracing::debug!("Ignoring next question from {} in room {}", nick, self.id);
            return false;
        }
        self.open_next_round(&mut state);
        true
    }

    fn end_game(&self, state: &mut RoomState) {
        state.timer.cancel();
        state.game.phase = RoundPhase::GameOver;
        state.game.round_closed = true;
        state.game.deadline = None;
        state.rematch_votes.clear();

        let scoreboard = state.scoreboard();
        tracing::info!("Game over in room {}: {:?}", self.id, scoreboard);

        state.broadcast(&ServerMessage::GameOver { scoreboard });
        self.broadcast_membership(state);
    }

    /// `questionOpened` for the live round; never includes the answer
    pub(super) fn question_message(&self, game: &Game) -> Option<ServerMessage> {
        let question = game.current_question()?;
        let deadline = game.deadline?;

        Some(ServerMessage::QuestionOpened {
            index: game.question_index as usize + 1,
            total: game.questions.len(),
            category: question.category.clone(),
            question: question.question.clone(),
            options: question.options.clone(),
            time_limit_seconds: self.config.round_time.as_secs(),
            deadline: deadline.to_rfc3339(),
            server_now: chrono::Utc::now().to_rfc3339(),
        })
    }
}
