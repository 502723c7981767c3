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

use vocadrill_core::Fallible;
use vocadrill_core::Timestamp;

use crate::config::Config;
use crate::store::SqliteStore;
use crate::store::Store;

pub fn list_due(config: &Config, user: &str, deck: Option<&str>) -> Fallible<()> {
    let store = SqliteStore::open(&config.database)?;
    let cards = store.load_cards_due_before(user, deck, Timestamp::now())?;
    if cards.is_empty() {
        println!("No cards due.");
        return Ok(());
    }
    for card in &cards {
        println!(
            "{}\t{}\t{}\t{}",
            card.due,
            card.deck,
            card.state.as_str(),
            card.front
        );
    }
    println!("{} cards due.", cards.len());
    Ok(())
}
