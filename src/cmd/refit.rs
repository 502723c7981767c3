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
use vocadrill_core::fail;

use crate::config::Config;
use crate::refit::SWEEP_LOG_LIMIT;
use crate::refit::refit_sweep;
use crate::refit::refit_user;
use crate::store::SqliteStore;

pub async fn run_refit(config: &Config, user: Option<&str>, all: bool) -> Fallible<()> {
    let fitter = match &config.fitter {
        Some(fitter) => fitter.build(),
        None => return fail("no [fitter] section in the config; nothing to refit with"),
    };
    let mut store = SqliteStore::open(&config.database)?;
    let defaults = config.default_params()?;
    match (user, all) {
        (Some(user), false) => {
            if refit_user(&mut store, &fitter, user, defaults, SWEEP_LOG_LIMIT).await? {
                println!("Refit parameters for {user}.");
            } else {
                println!("No review history for {user}; nothing to refit.");
            }
            Ok(())
        }
        (None, true) => {
            let refitted = refit_sweep(&mut store, &fitter, defaults).await?;
            println!("Refit parameters for {refitted} users.");
            Ok(())
        }
        (Some(_), true) => fail("pass either a user or --all, not both"),
        (None, false) => fail("pass a user to refit, or --all for everyone"),
    }
}
