// Copyright 2026 The vocadrill developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The card state machine: applies one graded review to a card's
//! persisted learning state.

use crate::fsrs::Difficulty;
use crate::fsrs::LEARNING_STEPS;
use crate::fsrs::RELEARNING_STEPS;
use crate::fsrs::Rating;
use crate::fsrs::Stability;
use crate::fsrs::fuzzed_interval;
use crate::fsrs::initial_difficulty;
use crate::fsrs::initial_stability;
use crate::fsrs::next_difficulty;
use crate::fsrs::next_interval_days;
use crate::fsrs::next_stability;
use crate::fsrs::retrievability;
use crate::fsrs::short_term_stability;
use crate::rng::TinyRng;
use crate::types::card::Card;
use crate::types::card::LearningState;
use crate::types::params::ParameterVector;
use crate::types::review_log::ReviewLog;
use crate::types::timestamp::Timestamp;

/// Applies `rating` to `card` at instant `now`, producing the updated
/// card and the review-log entry. Pure: the caller persists both.
///
/// `fuzz` randomizes day-granularity Review intervals when present; pass
/// `None` for deterministic scheduling.
pub fn apply_rating(
    card: &Card,
    rating: Rating,
    now: Timestamp,
    duration_ms: Option<u64>,
    params: &ParameterVector,
    fuzz: Option<&mut TinyRng>,
) -> (Card, ReviewLog) {
    let w = &params.weights;

    // Memory update first. A card that has never been graded (or a
    // Review-state card whose memory fields were lost) is initialized
    // from the first-review formulas.
    let (stability, difficulty): (Stability, Difficulty) =
        match (card.stability, card.difficulty, card.last_review) {
            (Some(s), Some(d), Some(last_review)) => {
                let elapsed_days = now.days_since(last_review);
                if elapsed_days < 1 {
                    (
                        short_term_stability(w, s, rating),
                        next_difficulty(w, d, rating),
                    )
                } else {
                    let retr = retrievability(w, Some(s), elapsed_days);
                    (
                        next_stability(w, d, s, retr, rating),
                        next_difficulty(w, d, rating),
                    )
                }
            }
            _ => (initial_stability(w, rating), initial_difficulty(w, rating)),
        };

    let (state, step, due) = transition(card, rating, now, stability, params, fuzz);

    let updated = Card {
        state,
        step,
        stability: Some(stability),
        difficulty: Some(difficulty),
        due,
        last_review: Some(now),
        first_review: card.first_review.or(Some(now)),
        ..card.clone()
    };
    let log = ReviewLog {
        card_id: card.id,
        rating,
        review_date_time: now,
        review_duration_ms: duration_ms,
    };
    (updated, log)
}

fn transition(
    card: &Card,
    rating: Rating,
    now: Timestamp,
    stability: Stability,
    params: &ParameterVector,
    fuzz: Option<&mut TinyRng>,
) -> (LearningState, Option<usize>, Timestamp) {
    match card.state {
        LearningState::New => (
            LearningState::Learning,
            Some(0),
            now.add_minutes(LEARNING_STEPS[0]),
        ),
        LearningState::Learning => {
            step_transition(&LEARNING_STEPS, LearningState::Learning, card, rating, now, stability, params)
        }
        LearningState::Relearning => step_transition(
            &RELEARNING_STEPS,
            LearningState::Relearning,
            card,
            rating,
            now,
            stability,
            params,
        ),
        LearningState::Review => match rating {
            Rating::Again if !RELEARNING_STEPS.is_empty() => (
                LearningState::Relearning,
                Some(0),
                now.add_minutes(RELEARNING_STEPS[0]),
            ),
            _ => {
                let mut days = next_interval_days(&params.weights, stability, params.desired_retention);
                if let Some(rng) = fuzz {
                    days = fuzzed_interval(days, rng);
                }
                (LearningState::Review, None, now.add_days(days))
            }
        },
    }
}

/// Shared step logic for the Learning and Relearning states.
fn step_transition(
    steps: &[i64],
    state: LearningState,
    card: &Card,
    rating: Rating,
    now: Timestamp,
    stability: Stability,
    params: &ParameterVector,
) -> (LearningState, Option<usize>, Timestamp) {
    let step = card.step.unwrap_or(0).min(steps.len() - 1);
    match rating {
        Rating::Again => (state, Some(0), now.add_minutes(steps[0])),
        Rating::Hard => {
            // The step index does not advance; the interval sits between
            // the current and next step (or 1.5x the current step when it
            // is the last one).
            let minutes = match steps.get(step + 1) {
                Some(next) => ((steps[step] + next) as f64 / 2.0).round() as i64,
                None => (steps[step] as f64 * 1.5).round() as i64,
            };
            (state, Some(step), now.add_minutes(minutes))
        }
        Rating::Good => {
            if step + 1 < steps.len() {
                (state, Some(step + 1), now.add_minutes(steps[step + 1]))
            } else {
                graduate(now, stability, params)
            }
        }
        Rating::Easy => graduate(now, stability, params),
    }
}

fn graduate(
    now: Timestamp,
    stability: Stability,
    params: &ParameterVector,
) -> (LearningState, Option<usize>, Timestamp) {
    let days = next_interval_days(&params.weights, stability, params.desired_retention);
    (LearningState::Review, None, now.add_days(days))
}
