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
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use vocadrill_core::ErrorReport;
use vocadrill_core::Fallible;
use vocadrill_core::ParameterVector;
use vocadrill_core::Weights;

use crate::refit::SubprocessFitter;

fn default_database() -> PathBuf {
    PathBuf::from("vocadrill.db")
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_retention() -> f64 {
    0.9
}

/// External optimizer invocation, e.g. a Python process wrapping an FSRS
/// optimizer package.
#[derive(Deserialize, Clone, PartialEq, Debug)]
pub struct FitterConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl FitterConfig {
    pub fn build(&self) -> SubprocessFitter {
        SubprocessFitter::new(
            self.command.clone(),
            self.args.clone(),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

#[derive(Deserialize, Clone, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Target recall probability for users who have never been refit.
    #[serde(default = "default_retention")]
    pub desired_retention: f64,
    /// Without a fitter section, sessions never refit and `refit` fails.
    #[serde(default)]
    pub fitter: Option<FitterConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: default_database(),
            desired_retention: default_retention(),
            fitter: None,
        }
    }
}

impl Config {
    /// Loads the config file at `path`, or the defaults when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> Fallible<Self> {
        let path = match path {
            Some(path) => path,
            None => return Ok(Config::default()),
        };
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| ErrorReport::new(format!("bad config {}: {e}", path.display())))
    }

    /// The parameter vector for users who have never been refit. Validates
    /// the configured retention.
    pub fn default_params(&self) -> Fallible<ParameterVector> {
        ParameterVector::new(Weights::default(), self.desired_retention)
    }
}
