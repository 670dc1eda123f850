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

use std::sync::{Mutex, MutexGuard, PoisonError};
use strata_core::renderer::{GpuTexture, Texture};
use strata_data::CacheResource;

/// A GPU texture held by the resource cache.
///
/// Every loader of the same (image, sampler) pair holds a reference to one
/// upload. The texture is destroyed when the last reference is released.
#[derive(Debug)]
pub(crate) struct UploadedTexture {
    texture: Texture,
    gpu: Mutex<Option<GpuTexture>>,
}

impl UploadedTexture {
    pub(crate) fn new(gpu: GpuTexture) -> Self {
        Self {
            texture: gpu.texture().clone(),
            gpu: Mutex::new(Some(gpu)),
        }
    }

    fn gpu(&self) -> MutexGuard<'_, Option<GpuTexture>> {
        self.gpu.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn texture(&self) -> &Texture {
        &self.texture
    }
}

impl CacheResource for UploadedTexture {
    fn unload(&self) {
        let Some(gpu) = self.gpu().take() else {
            return;
        };
        if let Err(e) = gpu.destroy() {
            log::warn!("Failed to destroy texture {:?}: {e}", self.texture.id);
        }
    }

    fn gpu_byte_length(&self) -> u64 {
        if self.gpu().is_some() {
            self.texture.size_in_bytes
        } else {
            0
        }
    }
}
