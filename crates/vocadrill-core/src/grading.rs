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

//! Derives a review rating from a free-text answer.
//!
//! Submitted fragments are matched against the card's answer key by
//! membership, not by position: a fragment counts as correct if it
//! appears anywhere in the key. This tolerates reordered answers, and it
//! also means a fragment whose value is duplicated across fields can be
//! counted more than once. That is the documented contract, not a bug.

use crate::error::Fallible;
use crate::error::fail;
use crate::fsrs::Rating;

/// Separates answer fields, both in the stored key and in user input.
pub const ANSWER_DELIMITER: char = ';';

/// The outcome of grading one answer.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AnswerCheck {
    pub rating: Rating,
    pub correct_fields: usize,
    pub total_fields: usize,
}

impl AnswerCheck {
    /// Full credit requires every field to have matched.
    pub fn is_fully_correct(&self) -> bool {
        self.correct_fields == self.total_fields
    }
}

/// Grades `answer` against `answer_key`.
///
/// An empty answer key is a caller error: every card must carry at least
/// one expected field.
pub fn check_answer(answer: &str, answer_key: &[String]) -> Fallible<AnswerCheck> {
    if answer_key.is_empty() {
        return fail("cannot grade a card with an empty answer key");
    }
    let key: Vec<&str> = answer_key.iter().map(|field| field.trim()).collect();
    let correct_fields = answer
        .split(ANSWER_DELIMITER)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty() && key.contains(fragment))
        .count();
    let total_fields = answer_key.len();
    let pct = correct_fields as f64 / total_fields as f64 * 100.0;
    let rating = if pct <= 25.0 {
        Rating::Again
    } else if pct <= 50.0 {
        Rating::Hard
    } else if pct <= 75.0 {
        Rating::Good
    } else {
        Rating::Easy
    };
    Ok(AnswerCheck {
        rating,
        correct_fields,
        total_fields,
    })
}
