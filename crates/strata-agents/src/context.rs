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

//! The per-frame context handed to loaders while they are polled.

use crate::scheduler::JobScheduler;
use std::sync::Arc;
use strata_core::renderer::GraphicsDevice;

/// What a loader may use during one tick of the render loop.
pub struct FrameState<'a> {
    /// The tick being processed.
    pub frame_number: u64,
    /// The device textures are created on.
    pub device: &'a Arc<dyn GraphicsDevice>,
    /// The budget keeper for GPU-side work.
    pub job_scheduler: &'a mut JobScheduler,
}

impl<'a> FrameState<'a> {
    /// Bundles the per-tick collaborators.
    pub fn new(
        frame_number: u64,
        device: &'a Arc<dyn GraphicsDevice>,
        job_scheduler: &'a mut JobScheduler,
    ) -> Self {
        Self {
            frame_number,
            device,
            job_scheduler,
        }
    }
}
