// Copyright 2025 eraflo
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

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Budgets of the [`JobScheduler`](super::JobScheduler), one per job type.
///
/// Times are milliseconds per tick. `max_jobs_per_frame` caps how many jobs of a
/// single type run in one tick; the first job of a type is never refused by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSchedulerConfig {
    /// Time for texture uploads.
    pub texture_budget_ms: f64,
    /// Time for shader program compilation.
    pub program_budget_ms: f64,
    /// Time for buffer uploads.
    pub buffer_budget_ms: f64,
    /// Optional per-type cap on executed jobs.
    pub max_jobs_per_frame: Option<u32>,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            texture_budget_ms: 10.0,
            program_budget_ms: 10.0,
            buffer_budget_ms: 30.0,
            max_jobs_per_frame: None,
        }
    }
}

impl JobSchedulerConfig {
    /// A configuration where every type runs exactly its first job each tick.
    pub fn zero() -> Self {
        Self {
            texture_budget_ms: 0.0,
            program_budget_ms: 0.0,
            buffer_budget_ms: 0.0,
            max_jobs_per_frame: None,
        }
    }

    pub(super) fn budget(ms: f64) -> Duration {
        Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
    }
}
