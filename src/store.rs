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

//! The persistence collaborator: a keyed record store for cards, review
//! logs, and per-user parameter vectors.

use std::path::Path;

use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::params;
use vocadrill_core::Card;
use vocadrill_core::CardId;
use vocadrill_core::ErrorReport;
use vocadrill_core::Fallible;
use vocadrill_core::LearningState;
use vocadrill_core::ParameterVector;
use vocadrill_core::Rating;
use vocadrill_core::ReviewLog;
use vocadrill_core::Timestamp;
use vocadrill_core::Weights;
use vocadrill_core::fail;

pub trait Store {
    fn load_card(&self, id: CardId) -> Fallible<Card>;
    /// Every card for `user`, optionally restricted to one deck.
    fn load_cards(&self, user: &str, deck: Option<&str>) -> Fallible<Vec<Card>>;
    /// Cards due at or before `now`, ordered by due ascending.
    fn load_cards_due_before(
        &self,
        user: &str,
        deck: Option<&str>,
        now: Timestamp,
    ) -> Fallible<Vec<Card>>;
    fn insert_card(
        &mut self,
        user: &str,
        deck: &str,
        front: &str,
        answer_key: &[String],
        created_at: Timestamp,
    ) -> Fallible<CardId>;
    fn save_cards_batch(&mut self, cards: &[Card]) -> Fallible<()>;
    fn append_review_logs_batch(&mut self, user: &str, logs: &[ReviewLog]) -> Fallible<()>;
    /// The most recent `limit` logs for `user`, ordered by review time
    /// ascending.
    fn recent_review_logs(&self, user: &str, limit: usize) -> Fallible<Vec<ReviewLog>>;
    /// `None` means the user has never had a refit; callers fall back to
    /// the default vector.
    fn load_parameter_vector(&self, user: &str) -> Fallible<Option<ParameterVector>>;
    fn save_parameter_vector(&mut self, user: &str, params: &ParameterVector) -> Fallible<()>;
    fn list_users(&self) -> Fallible<Vec<String>>;
}

fn db_err(e: rusqlite::Error) -> ErrorReport {
    ErrorReport::new(format!("database error: {e}"))
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Fallible<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Fallible<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Fallible<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cards (
                 id INTEGER PRIMARY KEY,
                 user TEXT NOT NULL,
                 deck TEXT NOT NULL,
                 front TEXT NOT NULL,
                 answer_key TEXT NOT NULL,
                 state TEXT NOT NULL,
                 step INTEGER,
                 stability REAL,
                 difficulty REAL,
                 due TEXT NOT NULL,
                 last_review TEXT,
                 first_review TEXT,
                 created_at TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS cards_due ON cards (user, due);
             CREATE TABLE IF NOT EXISTS review_logs (
                 id INTEGER PRIMARY KEY,
                 user TEXT NOT NULL,
                 card_id INTEGER NOT NULL,
                 rating INTEGER NOT NULL,
                 reviewed_at TEXT NOT NULL,
                 duration_ms INTEGER
             );
             CREATE INDEX IF NOT EXISTS review_logs_user ON review_logs (user, reviewed_at);
             CREATE TABLE IF NOT EXISTS parameters (
                 user TEXT PRIMARY KEY,
                 weights TEXT NOT NULL,
                 desired_retention REAL NOT NULL
             );",
        )
        .map_err(db_err)?;
        Ok(SqliteStore { conn })
    }

    fn row_to_card(row: &Row) -> Fallible<Card> {
        let id: i64 = row.get(0).map_err(db_err)?;
        let user: String = row.get(1).map_err(db_err)?;
        let deck: String = row.get(2).map_err(db_err)?;
        let front: String = row.get(3).map_err(db_err)?;
        let answer_key: String = row.get(4).map_err(db_err)?;
        let answer_key: Vec<String> = serde_json::from_str(&answer_key)?;
        let state: String = row.get(5).map_err(db_err)?;
        let step: Option<i64> = row.get(6).map_err(db_err)?;
        let stability: Option<f64> = row.get(7).map_err(db_err)?;
        let difficulty: Option<f64> = row.get(8).map_err(db_err)?;
        let due: String = row.get(9).map_err(db_err)?;
        let last_review: Option<String> = row.get(10).map_err(db_err)?;
        let first_review: Option<String> = row.get(11).map_err(db_err)?;
        let created_at: String = row.get(12).map_err(db_err)?;
        Ok(Card {
            id: CardId(id),
            user,
            deck,
            front,
            answer_key,
            state: LearningState::try_from(state)?,
            step: step.map(|s| s as usize),
            stability,
            difficulty,
            due: Timestamp::try_from(due)?,
            last_review: last_review.map(Timestamp::try_from).transpose()?,
            first_review: first_review.map(Timestamp::try_from).transpose()?,
            created_at: Timestamp::try_from(created_at)?,
        })
    }

    fn query_cards(&self, sql: &str, binds: &[&dyn rusqlite::ToSql]) -> Fallible<Vec<Card>> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let mut rows = stmt.query(binds).map_err(db_err)?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            cards.push(Self::row_to_card(row)?);
        }
        Ok(cards)
    }
}

const CARD_COLUMNS: &str = "id, user, deck, front, answer_key, state, step, stability, \
                            difficulty, due, last_review, first_review, created_at";

impl Store for SqliteStore {
    fn load_card(&self, id: CardId) -> Fallible<Card> {
        let cards = self.query_cards(
            &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
            params![id.into_inner()],
        )?;
        match cards.into_iter().next() {
            Some(card) => Ok(card),
            None => fail(format!("no card with id {id}")),
        }
    }

    fn load_cards(&self, user: &str, deck: Option<&str>) -> Fallible<Vec<Card>> {
        match deck {
            Some(deck) => self.query_cards(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE user = ?1 AND deck = ?2"),
                params![user, deck],
            ),
            None => self.query_cards(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE user = ?1"),
                params![user],
            ),
        }
    }

    fn load_cards_due_before(
        &self,
        user: &str,
        deck: Option<&str>,
        now: Timestamp,
    ) -> Fallible<Vec<Card>> {
        let now = now.to_string();
        match deck {
            Some(deck) => self.query_cards(
                &format!(
                    "SELECT {CARD_COLUMNS} FROM cards \
                     WHERE user = ?1 AND deck = ?2 AND due <= ?3 ORDER BY due ASC"
                ),
                params![user, deck, now],
            ),
            None => self.query_cards(
                &format!(
                    "SELECT {CARD_COLUMNS} FROM cards \
                     WHERE user = ?1 AND due <= ?2 ORDER BY due ASC"
                ),
                params![user, now],
            ),
        }
    }

    fn insert_card(
        &mut self,
        user: &str,
        deck: &str,
        front: &str,
        answer_key: &[String],
        created_at: Timestamp,
    ) -> Fallible<CardId> {
        if answer_key.is_empty() {
            return fail("cannot insert a card with an empty answer key");
        }
        self.conn
            .execute(
                "INSERT INTO cards (user, deck, front, answer_key, state, due, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user,
                    deck,
                    front,
                    serde_json::to_string(answer_key)?,
                    LearningState::New.as_str(),
                    created_at.to_string(),
                    created_at.to_string(),
                ],
            )
            .map_err(db_err)?;
        Ok(CardId(self.conn.last_insert_rowid()))
    }

    fn save_cards_batch(&mut self, cards: &[Card]) -> Fallible<()> {
        let tx = self.conn.transaction().map_err(db_err)?;
        for card in cards {
            let changed = tx
                .execute(
                    "UPDATE cards SET state = ?1, step = ?2, stability = ?3, difficulty = ?4, \
                     due = ?5, last_review = ?6, first_review = ?7 WHERE id = ?8",
                    params![
                        card.state.as_str(),
                        card.step.map(|s| s as i64),
                        card.stability,
                        card.difficulty,
                        card.due.to_string(),
                        card.last_review.map(|t| t.to_string()),
                        card.first_review.map(|t| t.to_string()),
                        card.id.into_inner(),
                    ],
                )
                .map_err(db_err)?;
            // The card may have been deleted while the session ran.
            if changed == 0 {
                log::warn!("card {} no longer exists, skipping its update", card.id);
            }
        }
        tx.commit().map_err(db_err)
    }

    fn append_review_logs_batch(&mut self, user: &str, logs: &[ReviewLog]) -> Fallible<()> {
        let tx = self.conn.transaction().map_err(db_err)?;
        for log in logs {
            tx.execute(
                "INSERT INTO review_logs (user, card_id, rating, reviewed_at, duration_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user,
                    log.card_id.into_inner(),
                    u8::from(log.rating),
                    log.review_date_time.to_string(),
                    log.review_duration_ms.map(|d| d as i64),
                ],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)
    }

    fn recent_review_logs(&self, user: &str, limit: usize) -> Fallible<Vec<ReviewLog>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT card_id, rating, reviewed_at, duration_ms FROM \
                 (SELECT id, card_id, rating, reviewed_at, duration_ms FROM review_logs \
                  WHERE user = ?1 ORDER BY reviewed_at DESC, id DESC LIMIT ?2) \
                 ORDER BY reviewed_at ASC, id ASC",
            )
            .map_err(db_err)?;
        let mut rows = stmt.query(params![user, limit as i64]).map_err(db_err)?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            let card_id: i64 = row.get(0).map_err(db_err)?;
            let rating: i64 = row.get(1).map_err(db_err)?;
            let reviewed_at: String = row.get(2).map_err(db_err)?;
            let duration_ms: Option<i64> = row.get(3).map_err(db_err)?;
            logs.push(ReviewLog {
                card_id: CardId(card_id),
                rating: Rating::try_from(rating as u8)?,
                review_date_time: Timestamp::try_from(reviewed_at)?,
                review_duration_ms: duration_ms.map(|d| d as u64),
            });
        }
        Ok(logs)
    }

    fn load_parameter_vector(&self, user: &str) -> Fallible<Option<ParameterVector>> {
        let mut stmt = self
            .conn
            .prepare("SELECT weights, desired_retention FROM parameters WHERE user = ?1")
            .map_err(db_err)?;
        let mut rows = stmt.query(params![user]).map_err(db_err)?;
        match rows.next().map_err(db_err)? {
            None => Ok(None),
            Some(row) => {
                let weights: String = row.get(0).map_err(db_err)?;
                let weights: Weights = serde_json::from_str(&weights)?;
                let desired_retention: f64 = row.get(1).map_err(db_err)?;
                Ok(Some(ParameterVector::new(weights, desired_retention)?))
            }
        }
    }

    fn save_parameter_vector(&mut self, user: &str, vector: &ParameterVector) -> Fallible<()> {
        self.conn
            .execute(
                "INSERT INTO parameters (user, weights, desired_retention) VALUES (?1, ?2, ?3) \
                 ON CONFLICT (user) DO UPDATE SET weights = ?2, desired_retention = ?3",
                params![
                    user,
                    serde_json::to_string(&vector.weights)?,
                    vector.desired_retention,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn list_users(&self) -> Fallible<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT user FROM cards ORDER BY user")
            .map_err(db_err)?;
        let mut rows = stmt.query([]).map_err(db_err)?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            users.push(row.get(0).map_err(db_err)?);
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocadrill_core::apply_rating;

    fn ts(s: &str) -> Timestamp {
        Timestamp::try_from(s.to_string()).unwrap()
    }

    fn key(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_and_load_card() {
        let mut store = SqliteStore::in_memory().unwrap();
        let now = ts("2024-01-01T12:00:00.000Z");
        let id = store
            .insert_card("alice", "spanish", "casa", &key(&["house", "home"]), now)
            .unwrap();
        let card = store.load_card(id).unwrap();
        assert_eq!(card.user, "alice");
        assert_eq!(card.deck, "spanish");
        assert_eq!(card.front, "casa");
        assert_eq!(card.answer_key, key(&["house", "home"]));
        assert_eq!(card.state, LearningState::New);
        assert_eq!(card.due, now);
        assert!(card.stability.is_none());
        assert!(card.last_review.is_none());
    }

    #[test]
    fn test_empty_answer_key_rejected() {
        let mut store = SqliteStore::in_memory().unwrap();
        let now = ts("2024-01-01T12:00:00.000Z");
        assert!(store.insert_card("alice", "spanish", "casa", &[], now).is_err());
    }

    #[test]
    fn test_load_missing_card_is_error() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load_card(CardId(999)).is_err());
    }

    #[test]
    fn test_save_batch_roundtrips_scheduling_state() {
        let mut store = SqliteStore::in_memory().unwrap();
        let now = ts("2024-01-01T12:00:00.000Z");
        let id = store
            .insert_card("alice", "spanish", "casa", &key(&["house"]), now)
            .unwrap();
        let card = store.load_card(id).unwrap();
        let (updated, _) = apply_rating(
            &card,
            Rating::Good,
            now,
            Some(1200),
            &ParameterVector::default(),
            None,
        );
        store.save_cards_batch(&[updated.clone()]).unwrap();
        assert_eq!(store.load_card(id).unwrap(), updated);
    }

    /// A batch member whose row is gone must not fail the batch or block
    /// the other updates.
    #[test]
    fn test_save_batch_tolerates_missing_card() {
        let mut store = SqliteStore::in_memory().unwrap();
        let now = ts("2024-01-01T12:00:00.000Z");
        let id = store
            .insert_card("alice", "spanish", "casa", &key(&["house"]), now)
            .unwrap();
        let card = store.load_card(id).unwrap();
        let (updated, _) = apply_rating(
            &card,
            Rating::Good,
            now,
            None,
            &ParameterVector::default(),
            None,
        );
        let mut ghost = updated.clone();
        ghost.id = CardId(9999);
        store.save_cards_batch(&[ghost, updated.clone()]).unwrap();
        assert_eq!(store.load_card(id).unwrap(), updated);
        assert!(store.load_card(CardId(9999)).is_err());
    }

    #[test]
    fn test_due_filtering_and_ordering() {
        let mut store = SqliteStore::in_memory().unwrap();
        let t0 = ts("2024-01-01T12:00:00.000Z");
        let a = store.insert_card("alice", "spanish", "a", &key(&["a"]), t0).unwrap();
        let b = store
            .insert_card("alice", "spanish", "b", &key(&["b"]), t0.add_days(-2))
            .unwrap();
        store
            .insert_card("alice", "spanish", "c", &key(&["c"]), t0.add_days(2))
            .unwrap();
        store.insert_card("bob", "spanish", "d", &key(&["d"]), t0).unwrap();
        let due = store.load_cards_due_before("alice", None, t0).unwrap();
        let ids: Vec<CardId> = due.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_deck_scoping() {
        let mut store = SqliteStore::in_memory().unwrap();
        let now = ts("2024-01-01T12:00:00.000Z");
        store.insert_card("alice", "spanish", "casa", &key(&["house"]), now).unwrap();
        store.insert_card("alice", "french", "maison", &key(&["house"]), now).unwrap();
        assert_eq!(store.load_cards("alice", None).unwrap().len(), 2);
        assert_eq!(store.load_cards("alice", Some("french")).unwrap().len(), 1);
        assert_eq!(
            store
                .load_cards_due_before("alice", Some("spanish"), now)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_review_logs_roundtrip_and_limit() {
        let mut store = SqliteStore::in_memory().unwrap();
        let t0 = ts("2024-01-01T12:00:00.000Z");
        let logs: Vec<ReviewLog> = (0..5)
            .map(|i| ReviewLog {
                card_id: CardId(i),
                rating: Rating::Good,
                review_date_time: t0.add_minutes(i),
                review_duration_ms: if i % 2 == 0 { Some(1000) } else { None },
            })
            .collect();
        store.append_review_logs_batch("alice", &logs).unwrap();

        let all = store.recent_review_logs("alice", 100).unwrap();
        assert_eq!(all, logs);

        // Bounded to the most recent N, still ascending.
        let recent = store.recent_review_logs("alice", 2).unwrap();
        assert_eq!(recent, logs[3..]);

        assert!(store.recent_review_logs("bob", 100).unwrap().is_empty());
    }

    #[test]
    fn test_parameter_vector_roundtrip() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.load_parameter_vector("alice").unwrap(), None);
        let vector = ParameterVector::default();
        store.save_parameter_vector("alice", &vector).unwrap();
        assert_eq!(store.load_parameter_vector("alice").unwrap(), Some(vector));

        // Wholesale replacement on conflict.
        let mut weights = vector.weights;
        weights.easy_bonus = 2.5;
        let updated = vector.with_weights(weights);
        store.save_parameter_vector("alice", &updated).unwrap();
        assert_eq!(store.load_parameter_vector("alice").unwrap(), Some(updated));
    }

    #[test]
    fn test_list_users() {
        let mut store = SqliteStore::in_memory().unwrap();
        let now = ts("2024-01-01T12:00:00.000Z");
        store.insert_card("bob", "d", "f", &key(&["a"]), now).unwrap();
        store.insert_card("alice", "d", "f", &key(&["a"]), now).unwrap();
        store.insert_card("alice", "d", "g", &key(&["b"]), now).unwrap();
        assert_eq!(store.list_users().unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocadrill.db");
        let now = ts("2024-01-01T12:00:00.000Z");
        let id = {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert_card("alice", "spanish", "casa", &key(&["house"]), now).unwrap()
        };
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_card(id).unwrap().front, "casa");
    }
}
