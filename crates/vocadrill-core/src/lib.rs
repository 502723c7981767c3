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

//! vocadrill-core: the scheduling engine of the vocadrill vocabulary
//! trainer.
//!
//! This library is pure (no I/O) and provides:
//! - The FSRS-6 scheduler math (stability, difficulty, retrievability,
//!   intervals, fuzzing)
//! - The card state machine that applies one graded review to a card
//! - Rating derivation from free-text answers
//! - The supporting types: cards, review logs, timestamps, parameter
//!   vectors, a binary min-heap, and a tiny PRNG

pub mod error;
pub mod fsrs;
pub mod grading;
pub mod heap;
pub mod rng;
pub mod schedule;
pub mod types;

// Re-exports for convenience
pub use error::{ErrorReport, Fallible, fail};
pub use fsrs::Rating;
pub use grading::{ANSWER_DELIMITER, AnswerCheck, check_answer};
pub use heap::{BinaryMinHeap, PriorityQueue};
pub use schedule::apply_rating;
pub use types::card::{Card, CardId, LearningState};
pub use types::params::{ParameterVector, WEIGHT_COUNT, Weights};
pub use types::review_log::ReviewLog;
pub use types::timestamp::Timestamp;
