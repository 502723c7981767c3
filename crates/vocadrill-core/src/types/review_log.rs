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

use crate::fsrs::Rating;
use crate::types::card::CardId;
use crate::types::timestamp::Timestamp;

/// One graded review. Append-only: produced by the card state machine,
/// consumed in batch by the parameter refit loop, then kept for history.
///
/// The serde representation doubles as the refit wire format: camelCase
/// keys, the rating as a number 1-4, the timestamp as ISO-8601 UTC.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLog {
    pub card_id: CardId,
    pub rating: Rating,
    pub review_date_time: Timestamp,
    pub review_duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let log = ReviewLog {
            card_id: CardId(42),
            rating: Rating::Good,
            review_date_time: Timestamp::try_from("2024-01-01T12:00:00.000Z".to_string())
                .unwrap(),
            review_duration_ms: Some(1500),
        };
        let json = serde_json::to_string(&log).unwrap();
        assert_eq!(
            json,
            "{\"cardId\":42,\"rating\":3,\"reviewDateTime\":\"2024-01-01T12:00:00.000Z\",\"reviewDurationMs\":1500}"
        );
    }

    #[test]
    fn test_wire_format_null_duration() {
        let log = ReviewLog {
            card_id: CardId(1),
            rating: Rating::Again,
            review_date_time: Timestamp::try_from("2024-01-01T12:00:00.000Z".to_string())
                .unwrap(),
            review_duration_ms: None,
        };
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"reviewDurationMs\":null"));
        let back: ReviewLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
