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

//! Cooperative, per-frame budgeted execution of GPU-side work.
//!
//! Jobs are never queued. A caller offers a job with [`JobScheduler::execute`];
//! it runs synchronously if its type still has time left this tick, and the caller
//! tries again next tick otherwise. Every type gets to run one job per tick even
//! when its budget is zero, so no type starves. A type that has used its own time
//! may borrow from a type that still has some, unless the lender was starved
//! during the previous tick.

mod config;

pub use self::config::JobSchedulerConfig;

use std::time::{Duration, Instant};

/// A unit of GPU-side work run by the [`JobScheduler`].
pub trait Job {
    /// Performs the work. Called at most once per successful `execute`.
    fn execute(&mut self);
}

/// The budget category a [`Job`] is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    /// Texture creation and upload.
    Texture,
    /// Shader program compilation.
    Program,
    /// Vertex and index buffer upload.
    Buffer,
}

impl JobType {
    /// Every job type.
    pub const ALL: [JobType; 3] = [JobType::Texture, JobType::Program, JobType::Buffer];

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-tick counters, summed over every job type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Jobs that ran.
    pub executed: u32,
    /// Jobs that were turned away.
    pub refused: u32,
    /// Jobs that ran on time borrowed from another type.
    pub stolen: u32,
}

#[derive(Debug, Clone, Default)]
struct Budget {
    total: Duration,
    used_this_frame: Duration,
    stolen_from_me_this_frame: Duration,
    starved_this_frame: bool,
    starved_last_frame: bool,
    executed_this_frame: u32,
}

impl Budget {
    fn new(total: Duration) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    fn exhausted(&self) -> bool {
        self.used_this_frame + self.stolen_from_me_this_frame >= self.total
    }

    fn reset(&mut self) {
        self.starved_last_frame = self.starved_this_frame;
        self.starved_this_frame = false;
        self.used_this_frame = Duration::ZERO;
        self.stolen_from_me_this_frame = Duration::ZERO;
        self.executed_this_frame = 0;
    }
}

/// Runs GPU-side jobs within per-type time budgets.
#[derive(Debug)]
pub struct JobScheduler {
    budgets: [Budget; 3],
    total_budget: Duration,
    total_used_this_frame: Duration,
    max_jobs_per_frame: Option<u32>,
    disabled_this_frame: bool,
    frame_number: u64,
    stats: FrameStats,
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new(&JobSchedulerConfig::default())
    }
}

impl JobScheduler {
    /// Creates a scheduler with the budgets of `config`.
    pub fn new(config: &JobSchedulerConfig) -> Self {
        let budgets = [
            Budget::new(JobSchedulerConfig::budget(config.texture_budget_ms)),
            Budget::new(JobSchedulerConfig::budget(config.program_budget_ms)),
            Budget::new(JobSchedulerConfig::budget(config.buffer_budget_ms)),
        ];
        let total_budget = budgets
            .iter()
            .fold(Duration::ZERO, |sum, b| sum.saturating_add(b.total));
        log::info!(
            "JobScheduler: budgets texture={:?} program={:?} buffer={:?}",
            budgets[0].total,
            budgets[1].total,
            budgets[2].total
        );
        Self {
            budgets,
            total_budget,
            total_used_this_frame: Duration::ZERO,
            max_jobs_per_frame: config.max_jobs_per_frame.map(|max| max.max(1)),
            disabled_this_frame: false,
            frame_number: 0,
            stats: FrameStats::default(),
        }
    }

    /// Starts a new tick: clears usage and remembers which types were starved.
    pub fn reset_budgets(&mut self) {
        for budget in &mut self.budgets {
            budget.reset();
        }
        self.total_used_this_frame = Duration::ZERO;
        self.disabled_this_frame = false;
        self.frame_number += 1;
        self.stats = FrameStats::default();
    }

    /// Refuses every job until the next [`reset_budgets`](Self::reset_budgets).
    pub fn disable_this_frame(&mut self) {
        self.disabled_this_frame = true;
    }

    /// Returns the number of ticks started so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Returns the counters of the current tick.
    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// Runs `job` now if `job_type` may still spend time this tick.
    ///
    /// Returns `false`, without running or queuing the job, when the budget is spent.
    pub fn execute(&mut self, job: &mut dyn Job, job_type: JobType) -> bool {
        let index = job_type.index();
        let progressed = self.budgets[index].executed_this_frame > 0;

        if self.disabled_this_frame {
            return self.refuse(index);
        }
        if progressed
            && self
                .max_jobs_per_frame
                .is_some_and(|max| self.budgets[index].executed_this_frame >= max)
        {
            return self.refuse(index);
        }
        if progressed && self.total_used_this_frame >= self.total_budget {
            return self.refuse(index);
        }

        let mut lender = None;
        if self.budgets[index].exhausted() {
            lender = self
                .budgets
                .iter()
                .position(|b| !b.exhausted() && !b.starved_last_frame);
            if progressed {
                if lender.is_none() {
                    return self.refuse(index);
                }
                // Starved even when borrowing, so nobody borrows from it next tick.
                self.budgets[index].starved_this_frame = true;
            }
        }

        let start = Instant::now();
        job.execute();
        let duration = start.elapsed();

        self.total_used_this_frame += duration;
        match lender {
            Some(lender) => {
                self.budgets[lender].stolen_from_me_this_frame += duration;
                self.stats.stolen += 1;
                log::debug!(
                    "JobScheduler: {:?} job borrowed {:?} from {:?}",
                    job_type,
                    duration,
                    JobType::ALL[lender]
                );
            }
            None => self.budgets[index].used_this_frame += duration,
        }
        self.budgets[index].executed_this_frame += 1;
        self.stats.executed += 1;
        true
    }

    fn refuse(&mut self, index: usize) -> bool {
        self.budgets[index].starved_this_frame = true;
        self.stats.refused += 1;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingJob {
        runs: u32,
    }

    impl Job for CountingJob {
        fn execute(&mut self) {
            self.runs += 1;
        }
    }

    #[test]
    fn first_job_of_each_type_always_runs() {
        let mut scheduler = JobScheduler::new(&JobSchedulerConfig::zero());
        let mut job = CountingJob::default();

        assert!(scheduler.execute(&mut job, JobType::Texture));
        assert!(!scheduler.execute(&mut job, JobType::Texture));
        assert!(scheduler.execute(&mut job, JobType::Buffer));
        assert_eq!(job.runs, 2);
        assert_eq!(
            scheduler.frame_stats(),
            FrameStats {
                executed: 2,
                refused: 1,
                stolen: 0
            }
        );

        scheduler.reset_budgets();
        assert!(scheduler.execute(&mut job, JobType::Texture));
        assert_eq!(scheduler.frame_number(), 1);
    }

    #[test]
    fn exhausted_type_borrows_from_an_idle_type() {
        let mut scheduler = JobScheduler::new(&JobSchedulerConfig {
            texture_budget_ms: 0.0,
            program_budget_ms: 0.0,
            buffer_budget_ms: 60_000.0,
            max_jobs_per_frame: None,
        });
        let mut job = CountingJob::default();

        assert!(scheduler.execute(&mut job, JobType::Texture));
        assert!(scheduler.execute(&mut job, JobType::Texture));
        assert_eq!(scheduler.frame_stats().stolen, 2);
    }

    #[test]
    fn starved_type_does_not_lend_next_tick() {
        let mut scheduler = JobScheduler::new(&JobSchedulerConfig {
            texture_budget_ms: 0.0,
            program_budget_ms: 0.0,
            buffer_budget_ms: 60_000.0,
            max_jobs_per_frame: None,
        });
        let mut job = CountingJob::default();

        scheduler.disable_this_frame();
        assert!(!scheduler.execute(&mut job, JobType::Buffer));

        scheduler.reset_budgets();
        assert!(scheduler.execute(&mut job, JobType::Texture));
        // The only type with time left was starved last tick.
        assert!(!scheduler.execute(&mut job, JobType::Texture));
    }

    #[test]
    fn job_cap_limits_each_type() {
        let mut scheduler = JobScheduler::new(&JobSchedulerConfig {
            max_jobs_per_frame: Some(2),
            buffer_budget_ms: 60_000.0,
            ..JobSchedulerConfig::default()
        });
        let mut job = CountingJob::default();

        assert!(scheduler.execute(&mut job, JobType::Buffer));
        assert!(scheduler.execute(&mut job, JobType::Buffer));
        assert!(!scheduler.execute(&mut job, JobType::Buffer));
        assert_eq!(job.runs, 2);
    }

    #[test]
    fn disabled_frame_refuses_everything_until_reset() {
        let mut scheduler = JobScheduler::default();
        let mut job = CountingJob::default();

        scheduler.disable_this_frame();
        for job_type in JobType::ALL {
            assert!(!scheduler.execute(&mut job, job_type));
        }
        assert_eq!(job.runs, 0);

        scheduler.reset_budgets();
        assert!(scheduler.execute(&mut job, JobType::Texture));
    }
}
