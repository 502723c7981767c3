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

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::fail;
use crate::fsrs::Difficulty;
use crate::fsrs::Stability;
use crate::types::timestamp::Timestamp;

/// Stable identifier of a card.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct CardId(pub i64);

impl CardId {
    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl Display for CardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a card sits in its learning lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LearningState {
    /// Never graded.
    New,
    /// Working through the learning steps.
    Learning,
    /// Graduated; scheduled in whole days.
    Review,
    /// Lapsed out of Review; working through the relearning steps.
    Relearning,
}

impl LearningState {
    pub fn as_str(&self) -> &str {
        match self {
            LearningState::New => "new",
            LearningState::Learning => "learning",
            LearningState::Review => "review",
            LearningState::Relearning => "relearning",
        }
    }
}

impl TryFrom<String> for LearningState {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "new" => Ok(LearningState::New),
            "learning" => Ok(LearningState::Learning),
            "review" => Ok(LearningState::Review),
            "relearning" => Ok(LearningState::Relearning),
            _ => fail(format!("invalid learning state: {value}")),
        }
    }
}

/// One vocabulary item for one user, with its persisted scheduling state.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub user: String,
    /// Deck the card belongs to; scopes sessions.
    pub deck: String,
    /// The prompt shown to the user.
    pub front: String,
    /// Ordered expected answer fragments used to grade free-text input.
    pub answer_key: Vec<String>,
    pub state: LearningState,
    /// Index into the learning/relearning step sequence. Only meaningful
    /// while `state` is Learning or Relearning.
    pub step: Option<usize>,
    /// Memory strength in days. Absent until the first graded review.
    pub stability: Option<Stability>,
    /// Absent until the first graded review.
    pub difficulty: Option<Difficulty>,
    /// Next scheduled review instant.
    pub due: Timestamp,
    pub last_review: Option<Timestamp>,
    /// Set once on the first graded review, never overwritten.
    pub first_review: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Card {
    /// A fresh, never-reviewed card, due immediately.
    pub fn new(
        id: CardId,
        user: impl Into<String>,
        deck: impl Into<String>,
        front: impl Into<String>,
        answer_key: Vec<String>,
        created_at: Timestamp,
    ) -> Self {
        Card {
            id,
            user: user.into(),
            deck: deck.into(),
            front: front.into(),
            answer_key,
            state: LearningState::New,
            step: None,
            stability: None,
            difficulty: None,
            due: created_at,
            last_review: None,
            first_review: None,
            created_at,
        }
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.due <= now
    }
}
