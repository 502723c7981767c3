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

use std::path::Path;

use vocadrill_core::ANSWER_DELIMITER;
use vocadrill_core::Fallible;
use vocadrill_core::Timestamp;
use vocadrill_core::fail;

use crate::config::Config;
use crate::store::SqliteStore;
use crate::store::Store;

/// Imports cards from a TSV file: `front<TAB>answer;answer;...` per
/// line. Blank lines and lines starting with `#` are skipped.
pub fn import_cards(config: &Config, user: &str, deck: &str, file: &Path) -> Fallible<()> {
    let text = std::fs::read_to_string(file)?;
    let mut store = SqliteStore::open(&config.database)?;
    let now = Timestamp::now();
    let mut imported = 0;
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (front, answers) = match line.split_once('\t') {
            Some(pair) => pair,
            None => {
                return fail(format!(
                    "{}:{}: expected a tab between front and answers",
                    file.display(),
                    lineno + 1
                ));
            }
        };
        let answer_key: Vec<String> = answers
            .split(ANSWER_DELIMITER)
            .map(|field| field.trim().to_string())
            .filter(|field| !field.is_empty())
            .collect();
        if front.trim().is_empty() || answer_key.is_empty() {
            return fail(format!(
                "{}:{}: card has an empty front or answer key",
                file.display(),
                lineno + 1
            ));
        }
        store.insert_card(user, deck, front.trim(), &answer_key, now)?;
        imported += 1;
    }
    println!("Imported {imported} cards into {deck}.");
    Ok(())
}
