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

//! The review session manager: an in-memory working set of cards, graded
//! one at a time. Owned exclusively by the logical session that created
//! it; all operations must be sequenced by the caller.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use vocadrill_core::AnswerCheck;
use vocadrill_core::BinaryMinHeap;
use vocadrill_core::Card;
use vocadrill_core::CardId;
use vocadrill_core::Fallible;
use vocadrill_core::ParameterVector;
use vocadrill_core::PriorityQueue;
use vocadrill_core::ReviewLog;
use vocadrill_core::Timestamp;
use vocadrill_core::apply_rating;
use vocadrill_core::check_answer;
use vocadrill_core::fail;
use vocadrill_core::rng::TinyRng;
use vocadrill_core::rng::shuffle;

#[derive(ValueEnum, Clone, Copy, PartialEq, Debug)]
pub enum SessionMode {
    /// Drill every card in scope, shuffled, regardless of due date.
    All,
    /// Drill only due cards, earliest due first, requeueing as they are
    /// rescheduled.
    Recommended,
}

impl Display for SessionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::All => write!(f, "all"),
            SessionMode::Recommended => write!(f, "recommended"),
        }
    }
}

/// What the user is told after an answer is graded.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AnswerFeedback {
    pub is_fully_correct: bool,
    pub correct_field_count: usize,
    pub total_field_count: usize,
}

/// Heap entry ordering: due instant, then insertion order for ties.
struct DueEntry {
    due: Timestamp,
    seq: u64,
    card: Card,
}

impl PartialEq for DueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for DueEntry {}

impl PartialOrd for DueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

enum WorkingSet {
    /// All mode: a fixed shuffled order, consumed front to back.
    Linear(VecDeque<Card>),
    /// Recommended mode: a min-heap keyed by due instant.
    Scheduled(BinaryMinHeap<DueEntry>),
}

/// A graded card waiting for the caller to move to the next question.
struct PendingGrade {
    card: Card,
    fully_correct: bool,
}

/// Everything a finished session hands back for persistence and refit.
pub struct SessionOutcome {
    pub mode: SessionMode,
    pub updated_cards: Vec<Card>,
    pub logs: Vec<ReviewLog>,
    pub correct_count: usize,
    pub incorrect_count: usize,
}

pub struct Session {
    mode: SessionMode,
    params: ParameterVector,
    queue: WorkingSet,
    pending: Option<PendingGrade>,
    correct_count: usize,
    incorrect_count: usize,
    pending_logs: Vec<ReviewLog>,
    /// Latest state of every card graded this session, keyed by id.
    updated: HashMap<CardId, Card>,
    next_seq: u64,
    complete: bool,
    fuzz: Option<TinyRng>,
}

impl Session {
    /// An All-mode session over every card in scope, uniformly shuffled.
    /// The order is fixed for the rest of the session.
    pub fn all(cards: Vec<Card>, params: ParameterVector, rng: &mut TinyRng) -> Self {
        let cards = shuffle(cards, rng);
        let complete = cards.is_empty();
        Session {
            mode: SessionMode::All,
            params,
            queue: WorkingSet::Linear(VecDeque::from(cards)),
            pending: None,
            correct_count: 0,
            incorrect_count: 0,
            pending_logs: Vec::new(),
            updated: HashMap::new(),
            next_seq: 0,
            complete,
            fuzz: None,
        }
    }

    /// A Recommended-mode session over the cards due at `now`, ordered by
    /// due instant. `fuzz` randomizes day-granularity intervals; pass
    /// `None` for deterministic scheduling.
    pub fn recommended(
        cards: Vec<Card>,
        params: ParameterVector,
        now: Timestamp,
        fuzz: Option<TinyRng>,
    ) -> Self {
        let mut heap = BinaryMinHeap::new();
        let mut next_seq = 0;
        for card in cards.into_iter().filter(|card| card.is_due(now)) {
            heap.insert(DueEntry {
                due: card.due,
                seq: next_seq,
                card,
            });
            next_seq += 1;
        }
        let complete = match heap.peek() {
            None => true,
            Some(entry) => entry.due > now,
        };
        Session {
            mode: SessionMode::Recommended,
            params,
            queue: WorkingSet::Scheduled(heap),
            pending: None,
            correct_count: 0,
            incorrect_count: 0,
            pending_logs: Vec::new(),
            updated: HashMap::new(),
            next_seq,
            complete,
            fuzz,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn incorrect_count(&self) -> usize {
        self.incorrect_count
    }

    fn peek_queue(&self, now: Timestamp) -> Option<&Card> {
        match &self.queue {
            WorkingSet::Linear(queue) => queue.front(),
            WorkingSet::Scheduled(heap) => heap
                .peek()
                .filter(|entry| entry.due <= now)
                .map(|entry| &entry.card),
        }
    }

    fn pop_queue(&mut self) -> Option<Card> {
        match &mut self.queue {
            WorkingSet::Linear(queue) => queue.pop_front(),
            WorkingSet::Scheduled(heap) => heap.pop().map(|entry| entry.card),
        }
    }

    /// The card currently up for review.
    ///
    /// In Recommended mode a head whose due instant is in the future means
    /// no card is available: the session is about to complete, and the
    /// card stays in the working set.
    pub fn current_card(&self, now: Timestamp) -> Option<&Card> {
        if self.complete {
            return None;
        }
        if let Some(pending) = &self.pending {
            return Some(&pending.card);
        }
        self.peek_queue(now)
    }

    /// Grades the current card against `answer`, applying the card state
    /// machine and buffering the review log.
    pub fn submit_answer(
        &mut self,
        answer: &str,
        now: Timestamp,
        duration_ms: Option<u64>,
    ) -> Fallible<AnswerFeedback> {
        if self.complete {
            return fail("the session is already complete");
        }
        if self.pending.is_some() {
            return fail("an answer is already pending; advance to the next question first");
        }
        let check: AnswerCheck = match self.peek_queue(now) {
            Some(card) => check_answer(answer, &card.answer_key)?,
            None => return fail("no card is available for review"),
        };
        let card = match self.pop_queue() {
            Some(card) => card,
            None => return fail("no card is available for review"),
        };
        let (updated, log) = apply_rating(
            &card,
            check.rating,
            now,
            duration_ms,
            &self.params,
            self.fuzz.as_mut(),
        );
        log::debug!(
            "graded card {} as {}: due {}",
            updated.id,
            check.rating.as_str(),
            updated.due
        );
        self.pending_logs.push(log);
        self.updated.insert(updated.id, updated.clone());
        self.pending = Some(PendingGrade {
            card: updated,
            fully_correct: check.is_fully_correct(),
        });
        Ok(AnswerFeedback {
            is_fully_correct: check.is_fully_correct(),
            correct_field_count: check.correct_fields,
            total_field_count: check.total_fields,
        })
    }

    /// Moves past the just-graded card and recomputes completion. In
    /// Recommended mode the graded card is reinserted, so it can
    /// resurface in the same session once its (typically short) new
    /// interval elapses. Returns whether the session is complete.
    pub fn advance(&mut self, now: Timestamp) -> bool {
        if let Some(pending) = self.pending.take() {
            if pending.fully_correct {
                self.correct_count += 1;
            } else {
                self.incorrect_count += 1;
            }
            if let WorkingSet::Scheduled(heap) = &mut self.queue {
                let seq = self.next_seq;
                self.next_seq += 1;
                heap.insert(DueEntry {
                    due: pending.card.due,
                    seq,
                    card: pending.card,
                });
            }
        }
        self.complete = match &self.queue {
            WorkingSet::Linear(queue) => queue.is_empty(),
            WorkingSet::Scheduled(heap) => match heap.peek() {
                None => true,
                Some(entry) => entry.due > now,
            },
        };
        self.complete
    }

    /// Tears the session down, yielding everything to flush and refit.
    pub fn finish(self) -> SessionOutcome {
        SessionOutcome {
            mode: self.mode,
            updated_cards: self.updated.into_values().collect(),
            logs: self.pending_logs,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocadrill_core::LearningState;

    fn ts(s: &str) -> Timestamp {
        Timestamp::try_from(s.to_string()).unwrap()
    }

    fn card(id: i64, front: &str, answer: &str, created_at: Timestamp) -> Card {
        Card::new(
            CardId(id),
            "alice",
            "spanish",
            front,
            vec![answer.to_string()],
            created_at,
        )
    }

    fn review_card(id: i64, answer: &str, due: Timestamp) -> Card {
        let created = due.add_days(-10);
        let mut c = card(id, "front", answer, created);
        c.state = LearningState::Review;
        c.stability = Some(10.0);
        c.difficulty = Some(5.0);
        c.last_review = Some(created);
        c.first_review = Some(created);
        c.due = due;
        c
    }

    fn params() -> ParameterVector {
        ParameterVector::default()
    }

    #[test]
    fn test_empty_session_is_complete() {
        let now = ts("2024-01-01T12:00:00.000Z");
        let mut rng = TinyRng::from_seed(1);
        assert!(Session::all(vec![], params(), &mut rng).is_complete());
        assert!(Session::recommended(vec![], params(), now, None).is_complete());
    }

    /// All mode: N cards, complete exactly after the Nth advance.
    #[test]
    fn test_all_mode_completes_after_nth_advance() {
        let now = ts("2024-01-01T12:00:00.000Z");
        let cards = vec![
            card(1, "uno", "one", now),
            card(2, "dos", "two", now),
            card(3, "tres", "three", now),
        ];
        let mut rng = TinyRng::from_seed(9);
        let mut session = Session::all(cards, params(), &mut rng);
        for i in 0..3 {
            assert!(!session.is_complete(), "complete before card {i}");
            assert!(session.current_card(now).is_some());
            session.submit_answer("one", now, None).unwrap();
            let complete = session.advance(now);
            assert_eq!(complete, i == 2);
        }
        assert_eq!(session.correct_count() + session.incorrect_count(), 3);
    }

    /// All mode never requeues: a wrongly answered card does not return.
    #[test]
    fn test_all_mode_does_not_requeue() {
        let now = ts("2024-01-01T12:00:00.000Z");
        let mut rng = TinyRng::from_seed(2);
        let mut session = Session::all(vec![card(1, "uno", "one", now)], params(), &mut rng);
        let feedback = session.submit_answer("wrong", now, None).unwrap();
        assert!(!feedback.is_fully_correct);
        assert!(session.advance(now));
        assert_eq!(session.incorrect_count(), 1);
    }

    #[test]
    fn test_all_mode_preserves_card_set() {
        let now = ts("2024-01-01T12:00:00.000Z");
        let cards: Vec<Card> = (1..=20).map(|i| card(i, "f", "a", now)).collect();
        let mut rng = TinyRng::from_seed(77);
        let mut session = Session::all(cards, params(), &mut rng);
        let mut seen = Vec::new();
        while let Some(current) = session.current_card(now) {
            seen.push(current.id.into_inner());
            session.submit_answer("a", now, None).unwrap();
            session.advance(now);
        }
        seen.sort();
        assert_eq!(seen, (1..=20).collect::<Vec<_>>());
    }

    /// Recommended mode serves the earliest-due card first.
    #[test]
    fn test_recommended_orders_by_due() {
        let now = ts("2024-01-10T12:00:00.000Z");
        let cards = vec![
            review_card(1, "a", now.add_days(-1)),
            review_card(2, "a", now.add_days(-3)),
            review_card(3, "a", now.add_days(-2)),
        ];
        let session = Session::recommended(cards, params(), now, None);
        assert_eq!(session.current_card(now).unwrap().id, CardId(2));
    }

    #[test]
    fn test_recommended_excludes_not_yet_due() {
        let now = ts("2024-01-10T12:00:00.000Z");
        let cards = vec![
            review_card(1, "a", now),
            review_card(2, "a", now.add_days(5)),
        ];
        let mut session = Session::recommended(cards, params(), now, None);
        session.submit_answer("a", now, None).unwrap();
        assert!(session.advance(now));
        let outcome = session.finish();
        assert_eq!(outcome.updated_cards.len(), 1);
    }

    /// The completion property from the session design: after both due
    /// cards are rescheduled into the future, the session is complete
    /// even though the heap is non-empty.
    #[test]
    fn test_recommended_completes_with_nonempty_heap() {
        let now = ts("2024-01-10T12:00:00.000Z");
        let cards = vec![
            review_card(1, "a", now.add_days(-1)),
            review_card(2, "a", now),
        ];
        let mut session = Session::recommended(cards, params(), now, None);

        // Grade the first card correctly: rescheduled days ahead.
        let feedback = session.submit_answer("a", now, None).unwrap();
        assert!(feedback.is_fully_correct);
        assert!(!session.advance(now));

        // Grade the second card wrong: Review -> Relearning, due now+1min.
        let feedback = session.submit_answer("wrong", now, None).unwrap();
        assert!(!feedback.is_fully_correct);
        assert!(session.advance(now));
        assert!(session.current_card(now).is_none());
        assert_eq!(session.correct_count(), 1);
        assert_eq!(session.incorrect_count(), 1);
    }

    /// A lapsed card resurfaces in the same session once its short due
    /// interval elapses.
    #[test]
    fn test_recommended_same_session_relearning() {
        let now = ts("2024-01-10T12:00:00.000Z");
        let cards = vec![
            review_card(1, "a", now.add_days(-1)),
            review_card(2, "a", now),
        ];
        let mut session = Session::recommended(cards, params(), now, None);

        // Lapse both cards: each lands in Relearning, due now+1min.
        session.submit_answer("wrong", now, None).unwrap();
        assert!(!session.advance(now));
        session.submit_answer("wrong", now, None).unwrap();

        // Once their short intervals elapse, card 1 is due again first.
        let later = now.add_minutes(2);
        assert!(!session.advance(later));
        assert_eq!(session.current_card(later).unwrap().id, CardId(1));
    }

    #[test]
    fn test_submit_twice_without_advance_is_error() {
        let now = ts("2024-01-01T12:00:00.000Z");
        let mut rng = TinyRng::from_seed(4);
        let mut session = Session::all(vec![card(1, "f", "a", now)], params(), &mut rng);
        session.submit_answer("a", now, None).unwrap();
        assert!(session.submit_answer("a", now, None).is_err());
    }

    #[test]
    fn test_submit_after_complete_is_error() {
        let now = ts("2024-01-01T12:00:00.000Z");
        let mut session = Session::recommended(vec![], params(), now, None);
        assert!(session.submit_answer("a", now, None).is_err());
    }

    /// The graded card remains "current" until the caller advances.
    #[test]
    fn test_pending_card_stays_current() {
        let now = ts("2024-01-01T12:00:00.000Z");
        let mut rng = TinyRng::from_seed(6);
        let mut session = Session::all(vec![card(1, "f", "a", now)], params(), &mut rng);
        session.submit_answer("a", now, None).unwrap();
        assert_eq!(session.current_card(now).unwrap().id, CardId(1));
    }

    #[test]
    fn test_finish_collects_latest_card_state_and_logs() {
        let now = ts("2024-01-10T12:00:00.000Z");
        let cards = vec![
            review_card(1, "a", now.add_days(-1)),
            review_card(2, "a", now),
        ];
        let mut session = Session::recommended(cards, params(), now, None);

        // Lapse card 1, answer card 2, then catch card 1 when it
        // resurfaces.
        session.submit_answer("wrong", now, None).unwrap();
        session.advance(now);
        session.submit_answer("a", now, None).unwrap();
        let later = now.add_minutes(2);
        assert!(!session.advance(later));
        session.submit_answer("a", later, None).unwrap();
        assert!(session.advance(later));

        let outcome = session.finish();
        assert_eq!(outcome.logs.len(), 3);
        assert_eq!(outcome.updated_cards.len(), 2);
        let card1 = outcome
            .updated_cards
            .iter()
            .find(|c| c.id == CardId(1))
            .unwrap();
        // Latest state only: the relearning lapse was superseded.
        assert_eq!(card1.last_review, Some(later));
    }
}
