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

use chrono::DateTime;
use chrono::Duration;
use chrono::SecondsFormat;
use chrono::SubsecRound;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;

/// A UTC timestamp with millisecond precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(3))
    }

    /// The current instant.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }

    /// Converts a timestamp into a `DateTime<Utc>`.
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    pub fn add_minutes(self, minutes: i64) -> Self {
        Self(self.0 + Duration::minutes(minutes))
    }

    pub fn add_days(self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Whole days elapsed from `earlier` to `self`, floored, never negative.
    ///
    /// Clock skew can make `earlier` appear to be in the future. Scheduling
    /// must still produce a valid next due date, so negative spans clamp to
    /// zero rather than fail.
    pub fn days_since(self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).num_days().max(0)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let dt = DateTime::parse_from_rfc3339(&value)
            .map_err(|_| ErrorReport::new(format!("Failed to parse timestamp: '{value}'.")))?;
        Ok(Timestamp(dt.with_timezone(&Utc).trunc_subsecs(3)))
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> String {
        ts.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::try_from(s.to_string()).unwrap()
    }

    #[test]
    fn test_timestamp_to_string() {
        let t = ts("2023-10-05T14:30:15.123Z");
        assert_eq!(t.to_string(), "2023-10-05T14:30:15.123Z");
    }

    #[test]
    fn test_serialize() {
        let t = ts("2023-10-05T14:30:15.123Z");
        let serialized = serde_json::to_string(&t).unwrap();
        assert_eq!(serialized, "\"2023-10-05T14:30:15.123Z\"");
    }

    #[test]
    fn test_deserialize() {
        let t: Timestamp = serde_json::from_str("\"2023-10-05T14:30:15.123Z\"").unwrap();
        assert_eq!(t, ts("2023-10-05T14:30:15.123Z"));
    }

    #[test]
    fn test_deserialize_with_offset() {
        let t: Timestamp = serde_json::from_str("\"2023-10-05T16:30:15.123+02:00\"").unwrap();
        assert_eq!(t, ts("2023-10-05T14:30:15.123Z"));
    }

    #[test]
    fn test_arithmetic() {
        let t = ts("2024-01-01T00:00:00.000Z");
        assert_eq!(t.add_minutes(10), ts("2024-01-01T00:10:00.000Z"));
        assert_eq!(t.add_days(3), ts("2024-01-04T00:00:00.000Z"));
    }

    #[test]
    fn test_days_since_floors() {
        let a = ts("2024-01-01T12:00:00.000Z");
        let b = ts("2024-01-04T11:59:00.000Z");
        assert_eq!(b.days_since(a), 2);
        assert_eq!(b.add_minutes(1).days_since(a), 3);
    }

    #[test]
    fn test_days_since_clamps_negative() {
        let a = ts("2024-01-04T00:00:00.000Z");
        let b = ts("2024-01-01T00:00:00.000Z");
        assert_eq!(b.days_since(a), 0);
    }

    #[test]
    fn test_ordering() {
        let a = ts("2024-01-01T00:00:00.000Z");
        assert!(a < a.add_minutes(1));
    }
}
