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

//! The trainer service: opens sessions over stored cards, routes answers
//! through them, and flushes the results (plus an optional refit) when a
//! session ends.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use vocadrill_core::Card;
use vocadrill_core::Fallible;
use vocadrill_core::ParameterVector;
use vocadrill_core::Timestamp;
use vocadrill_core::Weights;
use vocadrill_core::fail;
use vocadrill_core::rng::TinyRng;

use crate::refit::ON_DEMAND_LOG_LIMIT;
use crate::refit::ParameterFitter;
use crate::session::AnswerFeedback;
use crate::session::Session;
use crate::session::SessionMode;
use crate::session::SessionOutcome;
use crate::store::Store;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SessionHandle(u64);

struct SessionEntry {
    user: String,
    session: Session,
}

/// A fit running in the background. The weights come back through
/// [`Trainer::apply_pending_refits`]; until then the user's stored
/// vector stays in effect.
struct PendingRefit {
    user: String,
    task: JoinHandle<Fallible<Weights>>,
}

/// Tallies returned by [`Trainer::finish_session`].
pub struct SessionSummary {
    pub reviewed: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Whether a background refit was started for this session.
    pub refit_started: bool,
}

pub struct Trainer<S: Store> {
    store: S,
    fitter: Option<Arc<dyn ParameterFitter + Send + Sync>>,
    /// Used for users with no stored parameter vector.
    default_params: ParameterVector,
    sessions: HashMap<SessionHandle, SessionEntry>,
    pending_refits: Vec<PendingRefit>,
    next_handle: u64,
}

impl<S: Store> Trainer<S> {
    pub fn new(
        store: S,
        fitter: Option<Arc<dyn ParameterFitter + Send + Sync>>,
        default_params: ParameterVector,
    ) -> Self {
        Trainer {
            store,
            fitter,
            default_params,
            sessions: HashMap::new(),
            pending_refits: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn params_for(&self, user: &str) -> Fallible<ParameterVector> {
        Ok(self
            .store
            .load_parameter_vector(user)?
            .unwrap_or(self.default_params))
    }

    /// Opens a session for `user`, scoped to `deck` when given. All mode
    /// shuffles everything in scope; Recommended mode drills what is due
    /// at `now`, earliest first.
    pub fn start_session(
        &mut self,
        user: &str,
        deck: Option<&str>,
        mode: SessionMode,
        now: Timestamp,
    ) -> Fallible<SessionHandle> {
        let params = self.params_for(user)?;
        let session = match mode {
            SessionMode::All => {
                let cards = self.store.load_cards(user, deck)?;
                let mut rng = TinyRng::from_clock();
                Session::all(cards, params, &mut rng)
            }
            SessionMode::Recommended => {
                let cards = self.store.load_cards_due_before(user, deck, now)?;
                Session::recommended(cards, params, now, Some(TinyRng::from_clock()))
            }
        };
        let handle = SessionHandle(self.next_handle);
        self.next_handle += 1;
        log::info!("started {mode} session for {user}");
        self.sessions.insert(
            handle,
            SessionEntry {
                user: user.to_string(),
                session,
            },
        );
        Ok(handle)
    }

    fn entry(&self, handle: SessionHandle) -> Fallible<&SessionEntry> {
        match self.sessions.get(&handle) {
            Some(entry) => Ok(entry),
            None => fail("no such session"),
        }
    }

    fn entry_mut(&mut self, handle: SessionHandle) -> Fallible<&mut SessionEntry> {
        match self.sessions.get_mut(&handle) {
            Some(entry) => Ok(entry),
            None => fail("no such session"),
        }
    }

    pub fn is_complete(&self, handle: SessionHandle) -> Fallible<bool> {
        Ok(self.entry(handle)?.session.is_complete())
    }

    pub fn current_card(&self, handle: SessionHandle, now: Timestamp) -> Fallible<Option<&Card>> {
        Ok(self.entry(handle)?.session.current_card(now))
    }

    pub fn submit_answer(
        &mut self,
        handle: SessionHandle,
        answer: &str,
        now: Timestamp,
        duration_ms: Option<u64>,
    ) -> Fallible<AnswerFeedback> {
        self.entry_mut(handle)?
            .session
            .submit_answer(answer, now, duration_ms)
    }

    /// Moves the session past the graded card. Returns whether the
    /// session is now complete.
    pub fn next_question(&mut self, handle: SessionHandle, now: Timestamp) -> Fallible<bool> {
        Ok(self.entry_mut(handle)?.session.advance(now))
    }

    /// Closes the session: flushes updated cards and review logs, and,
    /// when the session was Recommended and produced history, starts a
    /// background refit of the user's parameters. Returns as soon as the
    /// flush is done; the refit never gates session completion.
    /// Persistence failures are logged, never propagated; the in-memory
    /// results are already final.
    pub fn finish_session(&mut self, handle: SessionHandle) -> Fallible<SessionSummary> {
        let entry = match self.sessions.remove(&handle) {
            Some(entry) => entry,
            None => return fail("no such session"),
        };
        let user = entry.user;
        let outcome = entry.session.finish();
        let summary = SessionSummary {
            reviewed: outcome.logs.len(),
            correct: outcome.correct_count,
            incorrect: outcome.incorrect_count,
            refit_started: self.flush_outcome(&user, outcome),
        };
        Ok(summary)
    }

    fn flush_outcome(&mut self, user: &str, outcome: SessionOutcome) -> bool {
        if let Err(e) = self.store.save_cards_batch(&outcome.updated_cards) {
            log::error!("failed to save {} cards for {user}: {e}", outcome.updated_cards.len());
        }
        if let Err(e) = self.store.append_review_logs_batch(user, &outcome.logs) {
            log::error!("failed to append {} review logs for {user}: {e}", outcome.logs.len());
        }
        if outcome.mode != SessionMode::Recommended || outcome.logs.is_empty() {
            return false;
        }
        let fitter = match &self.fitter {
            Some(fitter) => Arc::clone(fitter),
            None => return false,
        };
        let logs = match self.store.recent_review_logs(user, ON_DEMAND_LOG_LIMIT) {
            Ok(logs) if !logs.is_empty() => logs,
            Ok(_) => return false,
            Err(e) => {
                log::warn!("failed to load review history for {user}: {e}");
                return false;
            }
        };
        log::info!("refitting {user} from {} reviews", logs.len());
        let task = tokio::spawn(async move { fitter.fit(&logs).await });
        self.pending_refits.push(PendingRefit {
            user: user.to_string(),
            task,
        });
        true
    }

    /// Waits for any background refits and stores the fitted weights,
    /// keeping each user's desired retention. A failed fit is logged and
    /// leaves the previous vector in place. Returns how many users were
    /// refit.
    pub async fn apply_pending_refits(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_refits);
        let mut applied = 0;
        for refit in pending {
            let user = refit.user;
            match refit.task.await {
                Ok(Ok(weights)) => {
                    let stored = self
                        .store
                        .load_parameter_vector(&user)
                        .map(|current| current.unwrap_or(self.default_params).with_weights(weights))
                        .and_then(|vector| self.store.save_parameter_vector(&user, &vector));
                    match stored {
                        Ok(()) => applied += 1,
                        Err(e) => log::warn!("failed to store refit weights for {user}: {e}"),
                    }
                }
                // The previous vector stays in effect.
                Ok(Err(e)) => log::warn!("refit after session failed for {user}: {e}"),
                Err(e) => log::warn!("refit task for {user} did not complete: {e}"),
            }
        }
        applied
    }
}
