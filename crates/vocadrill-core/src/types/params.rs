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

use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;

/// Number of free coefficients in the scheduler.
pub const WEIGHT_COUNT: usize = 21;

/// The free coefficients of the FSRS-6 scheduler.
///
/// The fitting process works with a flat array indexed 0 through 20, but
/// within the scheduler each coefficient has a name, so an index shift in
/// one of the formulas is a type error rather than a silent regression.
/// Comments give the conventional index of each field.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Weights {
    /// w0: initial stability after rating Again on a new card.
    pub initial_stability_again: f64,
    /// w1: initial stability after rating Hard.
    pub initial_stability_hard: f64,
    /// w2: initial stability after rating Good.
    pub initial_stability_good: f64,
    /// w3: initial stability after rating Easy.
    pub initial_stability_easy: f64,
    /// w4: base term of the initial difficulty formula.
    pub initial_difficulty_base: f64,
    /// w5: exponential scale of the initial difficulty formula.
    pub initial_difficulty_scale: f64,
    /// w6: per-rating difficulty delta.
    pub difficulty_delta: f64,
    /// w7: mean reversion weight pulling difficulty toward D_0(Easy).
    pub difficulty_reversion: f64,
    /// w8: stability growth scale on successful recall.
    pub recall_stability_scale: f64,
    /// w9: stability saturation power on successful recall.
    pub recall_stability_power: f64,
    /// w10: retrievability boost on successful recall.
    pub recall_retrievability_scale: f64,
    /// w11: post-lapse stability scale.
    pub forget_stability_scale: f64,
    /// w12: post-lapse difficulty power.
    pub forget_difficulty_power: f64,
    /// w13: post-lapse stability power.
    pub forget_stability_power: f64,
    /// w14: post-lapse retrievability boost.
    pub forget_retrievability_scale: f64,
    /// w15: stability multiplier penalty for Hard.
    pub hard_penalty: f64,
    /// w16: stability multiplier bonus for Easy.
    pub easy_bonus: f64,
    /// w17: same-day review stability scale.
    pub short_term_scale: f64,
    /// w18: same-day review rating offset.
    pub short_term_offset: f64,
    /// w19: same-day review stability power.
    pub short_term_power: f64,
    /// w20: personalized forgetting curve decay.
    pub decay: f64,
}

impl Weights {
    /// Exponent of the forgetting curve, `-w20`.
    pub fn decay_exponent(&self) -> f64 {
        -self.decay
    }

    /// Scale factor of the forgetting curve, chosen so that
    /// retrievability is exactly 0.9 when the elapsed time equals the
    /// stability.
    pub fn factor(&self) -> f64 {
        0.9f64.powf(1.0 / self.decay_exponent()) - 1.0
    }

    /// Builds weights from the first [`WEIGHT_COUNT`] values of a slice.
    ///
    /// The fitting process may emit trailing values beyond the 21
    /// coefficients consumed here; they are ignored.
    pub fn from_slice(values: &[f64]) -> Fallible<Weights> {
        if values.len() < WEIGHT_COUNT {
            return fail(format!(
                "expected at least {WEIGHT_COUNT} weights, got {}",
                values.len()
            ));
        }
        let values = &values[..WEIGHT_COUNT];
        if values.iter().any(|w| !w.is_finite()) {
            return fail("weight vector contains a non-finite value");
        }
        Ok(Weights {
            initial_stability_again: values[0],
            initial_stability_hard: values[1],
            initial_stability_good: values[2],
            initial_stability_easy: values[3],
            initial_difficulty_base: values[4],
            initial_difficulty_scale: values[5],
            difficulty_delta: values[6],
            difficulty_reversion: values[7],
            recall_stability_scale: values[8],
            recall_stability_power: values[9],
            recall_retrievability_scale: values[10],
            forget_stability_scale: values[11],
            forget_difficulty_power: values[12],
            forget_stability_power: values[13],
            forget_retrievability_scale: values[14],
            hard_penalty: values[15],
            easy_bonus: values[16],
            short_term_scale: values[17],
            short_term_offset: values[18],
            short_term_power: values[19],
            decay: values[20],
        })
    }

    pub fn to_vec(self) -> Vec<f64> {
        vec![
            self.initial_stability_again,
            self.initial_stability_hard,
            self.initial_stability_good,
            self.initial_stability_easy,
            self.initial_difficulty_base,
            self.initial_difficulty_scale,
            self.difficulty_delta,
            self.difficulty_reversion,
            self.recall_stability_scale,
            self.recall_stability_power,
            self.recall_retrievability_scale,
            self.forget_stability_scale,
            self.forget_difficulty_power,
            self.forget_stability_power,
            self.forget_retrievability_scale,
            self.hard_penalty,
            self.easy_bonus,
            self.short_term_scale,
            self.short_term_offset,
            self.short_term_power,
            self.decay,
        ]
    }
}

impl Default for Weights {
    /// The published FSRS-6 default parameters, used until the first refit.
    fn default() -> Self {
        Weights {
            initial_stability_again: 0.2172,
            initial_stability_hard: 1.1771,
            initial_stability_good: 3.2602,
            initial_stability_easy: 16.1507,
            initial_difficulty_base: 7.0114,
            initial_difficulty_scale: 0.57,
            difficulty_delta: 2.0966,
            difficulty_reversion: 0.0069,
            recall_stability_scale: 1.5261,
            recall_stability_power: 0.112,
            recall_retrievability_scale: 1.0178,
            forget_stability_scale: 1.849,
            forget_difficulty_power: 0.1133,
            forget_stability_power: 0.3127,
            forget_retrievability_scale: 2.2934,
            hard_penalty: 0.2191,
            easy_bonus: 3.0004,
            short_term_scale: 0.7536,
            short_term_offset: 0.3332,
            short_term_power: 0.1437,
            decay: 0.2,
        }
    }
}

impl TryFrom<Vec<f64>> for Weights {
    type Error = ErrorReport;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Weights::from_slice(&value)
    }
}

impl From<Weights> for Vec<f64> {
    fn from(w: Weights) -> Vec<f64> {
        w.to_vec()
    }
}

/// A user's active scheduling parameters: the weight vector plus the
/// target recall probability at the scheduled due time. Immutable for the
/// duration of a session; replaced wholesale by a successful refit.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct ParameterVector {
    pub weights: Weights,
    pub desired_retention: f64,
}

impl ParameterVector {
    pub fn new(weights: Weights, desired_retention: f64) -> Fallible<Self> {
        if !(desired_retention > 0.0 && desired_retention < 1.0) {
            return fail(format!(
                "desired retention must be in (0, 1), got {desired_retention}"
            ));
        }
        Ok(ParameterVector {
            weights,
            desired_retention,
        })
    }

    /// Replaces the weights, keeping the desired retention.
    pub fn with_weights(self, weights: Weights) -> Self {
        ParameterVector { weights, ..self }
    }
}

impl Default for ParameterVector {
    fn default() -> Self {
        ParameterVector {
            weights: Weights::default(),
            desired_retention: 0.9,
        }
    }
}
