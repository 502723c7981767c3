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

use std::path::PathBuf;

use clap::Parser;
use vocadrill_core::Fallible;

use crate::cmd::drill::run_drill;
use crate::cmd::due::list_due;
use crate::cmd::import::import_cards;
use crate::cmd::refit::run_refit;
use crate::config::Config;
use crate::session::SessionMode;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Drill cards in the terminal.
    Drill {
        /// The user whose cards to drill.
        user: String,
        /// Only drill cards from this deck.
        #[arg(long)]
        deck: Option<String>,
        /// Which cards to include: every card, or only those due now.
        #[arg(long, value_enum, default_value_t = SessionMode::Recommended)]
        mode: SessionMode,
        /// Path to the config file. By default, built-in defaults are used.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Import cards from a tab-separated file.
    Import {
        /// The user to import the cards for.
        user: String,
        /// The deck to place the cards in.
        deck: String,
        /// Path to the file: one card per line, front and answer fields
        /// separated by a tab, answer fields separated by semicolons.
        file: PathBuf,
        /// Path to the config file. By default, built-in defaults are used.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the cards currently due.
    Due {
        /// The user whose cards to list.
        user: String,
        /// Only list cards from this deck.
        #[arg(long)]
        deck: Option<String>,
        /// Path to the config file. By default, built-in defaults are used.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Refit scheduler parameters from review history.
    Refit {
        /// The user to refit. Required unless --all is given.
        user: Option<String>,
        /// Refit every user with review history.
        #[arg(long)]
        all: bool,
        /// Path to the config file. By default, built-in defaults are used.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Drill {
            user,
            deck,
            mode,
            config,
        } => {
            let config = Config::load(config.as_deref())?;
            run_drill(&config, &user, deck.as_deref(), mode).await
        }
        Command::Import {
            user,
            deck,
            file,
            config,
        } => {
            let config = Config::load(config.as_deref())?;
            import_cards(&config, &user, &deck, &file)
        }
        Command::Due { user, deck, config } => {
            let config = Config::load(config.as_deref())?;
            list_due(&config, &user, deck.as_deref())
        }
        Command::Refit { user, all, config } => {
            let config = Config::load(config.as_deref())?;
            run_refit(&config, user.as_deref(), all).await
        }
    }
}
