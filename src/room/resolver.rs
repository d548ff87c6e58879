//! Answer resolution for a closed round.
//!
//! The fastest correct answer by server receipt time earns the single point.
//! Equal receipt times go to whichever submission arrived first.

use tokio::time::Instant;

use crate::types::*;

/// Resolve a round.
///
/// `standings` are the registered participants with their scores before this
/// round, in registration order. Every one of them gets a detail record, whether
/// they answered or not.
pub fn resolve(
    question: &Question,
    submissions: &[AnswerSubmission],
    round_started: Instant,
    standings: &[ScoreEntry],
) -> RoundResult {
    let correct = question.correct_option();

    // min_by_key keeps the first of equal keys, i.e. arrival order
    let winner = submissions
        .iter()
        .filter(|s| s.option == correct)
        .min_by_key(|s| s.received_at)
        .map(|s| s.nick.clone());

    let details = standings
        .iter()
        .map(|entry| {
            let answer = submissions.iter().find(|s| s.nick == entry.nick);
            RoundDetail {
                nick: entry.nick.clone(),
                time_ms: answer.map(|a| {
                    a.received_at
                        .saturating_duration_since(round_started)
                        .as_millis() as u64
                }),
                is_correct: answer.is_some_and(|a| a.option == correct),
                option: answer.map(|a| a.option),
                points: u32::from(winner.as_deref() == Some(entry.nick.as_str())),
            }
        })
        .collect::<Vec<_>>();

    let mut scoreboard: Vec<ScoreEntry> = standings
        .iter()
        .zip(&details)
        .map(|(entry, detail)| ScoreEntry {
            nick: entry.nick.clone(),
            score: entry.score + detail.points,
        })
        .collect();
    scoreboard.sort_by(|a, b| b.score.cmp(&a.score));

    RoundResult {
        correct_option: correct,
        winner,
        scoreboard,
        details,
    }
}
