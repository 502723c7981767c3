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

//! The interactive terminal drill loop.

use std::io::BufRead;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use vocadrill_core::Fallible;
use vocadrill_core::Timestamp;

use crate::config::Config;
use crate::refit::ParameterFitter;
use crate::service::Trainer;
use crate::session::SessionMode;
use crate::store::SqliteStore;

pub async fn run_drill(
    config: &Config,
    user: &str,
    deck: Option<&str>,
    mode: SessionMode,
) -> Fallible<()> {
    let store = SqliteStore::open(&config.database)?;
    let fitter: Option<Arc<dyn ParameterFitter + Send + Sync>> = config
        .fitter
        .as_ref()
        .map(|f| Arc::new(f.build()) as Arc<dyn ParameterFitter + Send + Sync>);
    let mut trainer = Trainer::new(store, fitter, config.default_params()?);

    let handle = trainer.start_session(user, deck, mode, Timestamp::now())?;
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let now = Timestamp::now();
        let (front, answer_key) = match trainer.current_card(handle, now)? {
            Some(card) => (card.front.clone(), card.answer_key.clone()),
            None => break,
        };
        println!();
        println!("{front}");
        if answer_key.len() > 1 {
            println!("({} answers, separated by semicolons)", answer_key.len());
        }
        print!("> ");
        std::io::stdout().flush()?;
        let asked_at = Instant::now();
        let answer = match lines.next() {
            Some(line) => line?,
            // EOF ends the session early; what was graded still counts.
            None => break,
        };
        let duration_ms = asked_at.elapsed().as_millis() as u64;
        let now = Timestamp::now();
        let feedback = trainer.submit_answer(handle, &answer, now, Some(duration_ms))?;
        if feedback.is_fully_correct {
            println!("Correct!");
        } else {
            println!(
                "{} of {} correct. Answer: {}",
                feedback.correct_field_count,
                feedback.total_field_count,
                answer_key.join("; ")
            );
        }
        trainer.next_question(handle, Timestamp::now())?;
    }

    let summary = trainer.finish_session(handle)?;
    println!();
    println!(
        "Reviewed {} cards: {} correct, {} incorrect.",
        summary.reviewed, summary.correct, summary.incorrect
    );
    // The tallies above are printed before the refit completes; only
    // process exit waits for it.
    if summary.refit_started && trainer.apply_pending_refits().await > 0 {
        println!("Scheduler parameters refit from your review history.");
    }
    Ok(())
}
