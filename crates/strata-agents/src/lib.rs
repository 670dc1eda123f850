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

//! # Strata Agents
//!
//! The tactical layer of the streaming pipeline. Agents own the lifecycle of
//! streamed resources: they acquire shared data from the cache, run the lanes off
//! the frame thread, and feed GPU work to the budgeted [`scheduler::JobScheduler`].
//!
//! - [`texture_agent`]: image and texture loaders, from a declared texture
//!   reference to a ready-to-sample GPU texture.
//! - [`scheduler`]: per-frame budgets for GPU-side jobs.

#![warn(missing_docs)]

pub mod context;
pub mod scheduler;
pub mod texture_agent;

pub use context::FrameState;
pub use scheduler::{Job, JobScheduler, JobSchedulerConfig, JobType};
pub use texture_agent::{
    ConfigError, ImageLoadError, ImageResourceLoader, LoaderState, SharedLoaderError,
    TextureLoadError, TextureLoader, TextureLoaderOptions,
};
