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

//! Pure FSRS-6 scheduler math. No I/O, no shared state: every function
//! takes the weight vector explicitly so concurrent sessions can call in
//! with different parameter snapshots.

use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::fail;
use crate::rng::TinyRng;
use crate::types::params::Weights;

pub type Recall = f64;
pub type Stability = f64;
pub type Difficulty = f64;

/// Floor for stability after any update.
pub const MIN_STABILITY: Stability = 0.001;

/// Cap on scheduled intervals, in days (one century).
pub const MAX_INTERVAL_DAYS: i64 = 36500;

/// Step sequence for cards in the Learning state, in minutes.
pub const LEARNING_STEPS: [i64; 1] = [10];

/// Step sequence for cards in the Relearning state, in minutes.
pub const RELEARNING_STEPS: [i64; 2] = [1, 10];

/// A review rating. Not chosen by the user directly: derived from the
/// fraction of correctly answered card fields (see the grading module).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        match r {
            Rating::Again => 1,
            Rating::Hard => 2,
            Rating::Good => 3,
            Rating::Easy => 4,
        }
    }
}

impl From<Rating> for f64 {
    fn from(r: Rating) -> f64 {
        u8::from(r) as f64
    }
}

impl TryFrom<u8> for Rating {
    type Error = ErrorReport;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            _ => fail(format!("invalid rating value: {value}")),
        }
    }
}

impl Rating {
    pub fn as_str(&self) -> &str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

pub fn clamp_difficulty(d: Difficulty) -> Difficulty {
    d.clamp(1.0, 10.0)
}

pub fn clamp_stability(s: Stability) -> Stability {
    s.max(MIN_STABILITY)
}

/// S_0(G): stability after the first graded review.
pub fn initial_stability(w: &Weights, rating: Rating) -> Stability {
    let s = match rating {
        Rating::Again => w.initial_stability_again,
        Rating::Hard => w.initial_stability_hard,
        Rating::Good => w.initial_stability_good,
        Rating::Easy => w.initial_stability_easy,
    };
    clamp_stability(s)
}

/// D_0(G): difficulty after the first graded review.
pub fn initial_difficulty(w: &Weights, rating: Rating) -> Difficulty {
    let g: f64 = rating.into();
    clamp_difficulty(w.initial_difficulty_base - f64::exp(w.initial_difficulty_scale * (g - 1.0)) + 1.0)
}

/// R(t, S): the probability of recall after `elapsed_days` without review.
///
/// A card with no stability has never been graded; its retrievability is
/// defined as zero.
pub fn retrievability(w: &Weights, stability: Option<Stability>, elapsed_days: i64) -> Recall {
    match stability {
        None => 0.0,
        Some(s) => {
            let t = elapsed_days.max(0) as f64;
            (1.0 + w.factor() * t / s).powf(w.decay_exponent())
        }
    }
}

/// I(r_d, S): the interval, in days, at which retrievability decays to
/// the desired retention. Clamped to [1, MAX_INTERVAL_DAYS].
pub fn next_interval_days(w: &Weights, stability: Stability, desired_retention: f64) -> i64 {
    let raw = (stability / w.factor()) * (desired_retention.powf(1.0 / w.decay_exponent()) - 1.0);
    (raw.round() as i64).clamp(1, MAX_INTERVAL_DAYS)
}

/// Stability update for a same-day re-review (elapsed time under a day).
pub fn short_term_stability(w: &Weights, stability: Stability, rating: Rating) -> Stability {
    let g: f64 = rating.into();
    let mut increase = f64::exp(w.short_term_scale * (g - 3.0 + w.short_term_offset))
        * stability.powf(-w.short_term_power);
    if matches!(rating, Rating::Good | Rating::Easy) {
        increase = increase.max(1.0);
    }
    clamp_stability(stability * increase)
}

/// D'(D, G): difficulty update, linear damping plus mean reversion toward
/// D_0(Easy).
pub fn next_difficulty(w: &Weights, difficulty: Difficulty, rating: Rating) -> Difficulty {
    let g: f64 = rating.into();
    let delta = -(w.difficulty_delta * (g - 3.0));
    let damped = (10.0 - difficulty) * delta / 9.0;
    let reverted = w.difficulty_reversion * initial_difficulty(w, Rating::Easy)
        + (1.0 - w.difficulty_reversion) * (difficulty + damped);
    clamp_difficulty(reverted)
}

fn stability_on_forget(
    w: &Weights,
    difficulty: Difficulty,
    stability: Stability,
    retr: Recall,
) -> Stability {
    let long_term = w.forget_stability_scale
        * difficulty.powf(-w.forget_difficulty_power)
        * ((stability + 1.0).powf(w.forget_stability_power) - 1.0)
        * f64::exp((1.0 - retr) * w.forget_retrievability_scale);
    let short_term = stability / f64::exp(w.short_term_scale * w.short_term_offset);
    f64::min(long_term, short_term)
}

fn stability_on_recall(
    w: &Weights,
    difficulty: Difficulty,
    stability: Stability,
    retr: Recall,
    rating: Rating,
) -> Stability {
    let hard_penalty = if rating == Rating::Hard {
        w.hard_penalty
    } else {
        1.0
    };
    let easy_bonus = if rating == Rating::Easy {
        w.easy_bonus
    } else {
        1.0
    };
    stability
        * (1.0
            + f64::exp(w.recall_stability_scale)
                * (11.0 - difficulty)
                * stability.powf(-w.recall_stability_power)
                * (f64::exp((1.0 - retr) * w.recall_retrievability_scale) - 1.0)
                * hard_penalty
                * easy_bonus)
}

/// S'(D, S, R, G): stability update across a full (not same-day) review.
pub fn next_stability(
    w: &Weights,
    difficulty: Difficulty,
    stability: Stability,
    retr: Recall,
    rating: Rating,
) -> Stability {
    let s = if rating == Rating::Again {
        stability_on_forget(w, difficulty, stability, retr)
    } else {
        stability_on_recall(w, difficulty, stability, retr, rating)
    };
    clamp_stability(s)
}

// The fuzz factor table: (lower bound in days, upper bound, factor).
const FUZZ_RANGES: [(f64, f64, f64); 3] = [
    (2.5, 7.0, 0.15),
    (7.0, 20.0, 0.10),
    (20.0, f64::INFINITY, 0.05),
];

/// Applies random jitter to an interval so that cards reviewed together
/// do not stay due on the same day forever. Intervals below 2.5 days are
/// returned unchanged.
pub fn fuzzed_interval(days: i64, rng: &mut TinyRng) -> i64 {
    let ivl = days as f64;
    if ivl < 2.5 {
        return days;
    }
    let mut delta = 1.0;
    for (start, end, factor) in FUZZ_RANGES {
        delta += factor * f64::max(f64::min(ivl, end) - start, 0.0);
    }
    let min_ivl = (ivl - delta).round().max(2.0) as i64;
    let max_ivl = ((ivl + delta).round() as i64).min(MAX_INTERVAL_DAYS);
    let min_ivl = min_ivl.min(max_ivl);
    min_ivl + rng.generate((max_ivl - min_ivl + 1) as u32) as i64
}
