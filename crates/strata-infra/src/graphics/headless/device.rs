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

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use strata_core::math::{full_mip_level_count, Extent3D, Origin3D};
pub use strata_core::renderer::{
    FEATURE_TEXTURE_COMPRESSION_ASTC, FEATURE_TEXTURE_COMPRESSION_BC,
    FEATURE_TEXTURE_COMPRESSION_ETC2,
};
use strata_core::renderer::{
    GraphicsDevice, ResourceError, TextureDescriptor, TextureFormat, TextureId,
};

/// A snapshot of one live texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessTextureInfo {
    /// The label given at creation.
    pub label: String,
    /// The size of level 0.
    pub size: Extent3D,
    /// The length of the mip chain.
    pub mip_level_count: u32,
    /// The texel format.
    pub format: TextureFormat,
    /// The memory the full chain occupies.
    pub size_in_bytes: u64,
    /// Number of writes received, per level.
    pub level_writes: Vec<u32>,
    /// Number of times mipmaps were generated.
    pub mipmap_generations: u32,
}

/// Device-wide operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Textures created since the device was built.
    pub textures_created: usize,
    /// Textures destroyed since the device was built.
    pub textures_destroyed: usize,
    /// Successful level writes.
    pub level_writes: usize,
    /// Successful mipmap generations.
    pub mipmap_generations: usize,
}

/// A [`GraphicsDevice`] that validates and records texture operations in memory.
#[derive(Debug)]
pub struct HeadlessDevice {
    features: HashSet<String>,
    textures: Mutex<HashMap<TextureId, HeadlessTextureInfo>>,
    next_texture_id: AtomicUsize,
    vram_allocated_bytes: AtomicU64,
    vram_peak_bytes: AtomicU64,
    textures_created: AtomicUsize,
    textures_destroyed: AtomicUsize,
    level_writes: AtomicUsize,
    mipmap_generations: AtomicUsize,
    fail_writes: AtomicBool,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device supporting every block-compressed format.
    pub fn new() -> Self {
        Self::with_features([
            FEATURE_TEXTURE_COMPRESSION_BC,
            FEATURE_TEXTURE_COMPRESSION_ETC2,
            FEATURE_TEXTURE_COMPRESSION_ASTC,
        ])
    }

    /// Creates a device advertising exactly `features`.
    pub fn with_features<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            textures: Mutex::new(HashMap::new()),
            next_texture_id: AtomicUsize::new(0),
            vram_allocated_bytes: AtomicU64::new(0),
            vram_peak_bytes: AtomicU64::new(0),
            textures_created: AtomicUsize::new(0),
            textures_destroyed: AtomicUsize::new(0),
            level_writes: AtomicUsize::new(0),
            mipmap_generations: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn textures(&self) -> MutexGuard<'_, HashMap<TextureId, HeadlessTextureInfo>> {
        self.textures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generate_texture_id(&self) -> TextureId {
        TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Makes every following `write_texture` call fail with a backend error.
    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Returns a snapshot of a live texture.
    pub fn texture_info(&self, id: TextureId) -> Option<HeadlessTextureInfo> {
        self.textures().get(&id).cloned()
    }

    /// Returns the number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures().len()
    }

    /// Returns the memory held by live textures.
    pub fn vram_allocated_bytes(&self) -> u64 {
        self.vram_allocated_bytes.load(Ordering::Relaxed)
    }

    /// Returns the highest value [`vram_allocated_bytes`](Self::vram_allocated_bytes) reached.
    pub fn vram_peak_bytes(&self) -> u64 {
        self.vram_peak_bytes.load(Ordering::Relaxed)
    }

    /// Returns the operation counters.
    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            textures_created: self.textures_created.load(Ordering::Relaxed),
            textures_destroyed: self.textures_destroyed.load(Ordering::Relaxed),
            level_writes: self.level_writes.load(Ordering::Relaxed),
            mipmap_generations: self.mipmap_generations.load(Ordering::Relaxed),
        }
    }

    fn supports_format(&self, format: TextureFormat) -> bool {
        match format.required_feature() {
            Some(feature) => self.features.contains(feature),
            None => true,
        }
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        if !self.supports_format(descriptor.format) {
            return Err(ResourceError::UnsupportedFormat(format!(
                "{:?}",
                descriptor.format
            )));
        }
        let size = descriptor.size;
        if size.width == 0 || size.height == 0 {
            return Err(ResourceError::BackendError(
                "texture dimensions must be non-zero".to_string(),
            ));
        }
        let max_levels = full_mip_level_count(size.width, size.height);
        if descriptor.mip_level_count == 0 || descriptor.mip_level_count > max_levels {
            return Err(ResourceError::OutOfBounds);
        }

        let id = self.generate_texture_id();
        let size_in_bytes = descriptor.size_in_bytes();
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();

        // Track VRAM usage
        let current_vram = self
            .vram_allocated_bytes
            .fetch_add(size_in_bytes, Ordering::Relaxed)
            + size_in_bytes;
        self.vram_peak_bytes.fetch_max(current_vram, Ordering::Relaxed);
        self.textures_created.fetch_add(1, Ordering::Relaxed);

        log::info!(
            "HeadlessDevice: Created texture '{label}' with ID: {id:?}, {}x{}, {} level(s), size: {size_in_bytes} bytes (VRAM)",
            size.width,
            size.height,
            descriptor.mip_level_count
        );
        self.textures().insert(
            id,
            HeadlessTextureInfo {
                label,
                size,
                mip_level_count: descriptor.mip_level_count,
                format: descriptor.format,
                size_in_bytes,
                level_writes: vec![0; descriptor.mip_level_count as usize],
                mipmap_generations: 0,
            },
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let entry = self.textures().remove(&id).ok_or(ResourceError::NotFound)?;
        self.vram_allocated_bytes
            .fetch_sub(entry.size_in_bytes, Ordering::Relaxed);
        self.textures_destroyed.fetch_add(1, Ordering::Relaxed);
        log::debug!("HeadlessDevice: Destroyed texture with ID: {id:?}");
        Ok(())
    }

    fn write_texture(
        &self,
        texture_id: TextureId,
        mip_level: u32,
        data: &[u8],
        bytes_per_row: Option<u32>,
        offset: Origin3D,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        let mut textures = self.textures();
        let entry = textures
            .get_mut(&texture_id)
            .ok_or(ResourceError::NotFound)?;
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(ResourceError::BackendError(
                "write rejected by the device".to_string(),
            ));
        }
        if mip_level >= entry.mip_level_count {
            return Err(ResourceError::OutOfBounds);
        }

        let level_size = entry.size.mip_level_size(mip_level);
        let (block_width, block_height) = entry.format.block_dimensions();
        let fits = |origin: u32, extent: u32, limit: u32, block: u32| {
            // Compressed writes may cover the padding of the last block.
            origin + extent <= limit.div_ceil(block) * block
        };
        if !fits(offset.x, size.width, level_size.width, block_width)
            || !fits(offset.y, size.height, level_size.height, block_height)
        {
            return Err(ResourceError::OutOfBounds);
        }

        let row_length = entry.format.bytes_per_row(size.width);
        let stride = bytes_per_row.unwrap_or(row_length);
        if stride < row_length {
            return Err(ResourceError::SizeMismatch {
                expected: u64::from(row_length),
                actual: u64::from(stride),
            });
        }
        let rows = u64::from(size.height.div_ceil(block_height));
        let expected = match rows {
            0 => 0,
            rows => u64::from(stride) * (rows - 1) + u64::from(row_length),
        };
        if (data.len() as u64) < expected {
            return Err(ResourceError::SizeMismatch {
                expected,
                actual: data.len() as u64,
            });
        }

        entry.level_writes[mip_level as usize] += 1;
        self.level_writes.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "HeadlessDevice: Wrote {} bytes to texture ID: {texture_id:?} level {mip_level} at offset {offset:?}",
            data.len()
        );
        Ok(())
    }

    fn generate_mipmaps(&self, texture_id: TextureId) -> Result<(), ResourceError> {
        let mut textures = self.textures();
        let entry = textures
            .get_mut(&texture_id)
            .ok_or(ResourceError::NotFound)?;
        if entry.format.is_compressed() {
            return Err(ResourceError::UnsupportedFormat(format!(
                "cannot generate mipmaps for {:?}",
                entry.format
            )));
        }
        entry.mipmap_generations += 1;
        self.mipmap_generations.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "HeadlessDevice: Generated {} mip level(s) for texture ID: {texture_id:?}",
            entry.mip_level_count.saturating_sub(1)
        );
        Ok(())
    }

    fn supports_feature(&self, feature_name: &str) -> bool {
        self.features.contains(feature_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn descriptor(width: u32, height: u32, mips: u32, format: TextureFormat) -> TextureDescriptor<'static> {
        TextureDescriptor {
            label: Some(Cow::Borrowed("test")),
            size: Extent3D::new_2d(width, height),
            mip_level_count: mips,
            format,
        }
    }

    #[test]
    fn tracks_vram_across_create_and_destroy() {
        let device = HeadlessDevice::new();
        let a = device
            .create_texture(&descriptor(4, 4, 3, TextureFormat::Rgba8Unorm))
            .unwrap();
        let b = device
            .create_texture(&descriptor(2, 2, 1, TextureFormat::Rgba8Unorm))
            .unwrap();
        assert_ne!(a, b);
        // 4x4 + 2x2 + 1x1 texels
        assert_eq!(device.vram_allocated_bytes(), 84 + 16);

        device.destroy_texture(a).unwrap();
        assert_eq!(device.vram_allocated_bytes(), 16);
        assert_eq!(device.vram_peak_bytes(), 100);
        assert_eq!(device.texture_count(), 1);
        assert_eq!(device.destroy_texture(a), Err(ResourceError::NotFound));
    }

    #[test]
    fn rejects_writes_outside_the_chain() {
        let device = HeadlessDevice::new();
        let id = device
            .create_texture(&descriptor(2, 2, 1, TextureFormat::Rgba8Unorm))
            .unwrap();
        let result = device.write_texture(
            id,
            1,
            &[0; 4],
            None,
            Origin3D::ZERO,
            Extent3D::new_2d(1, 1),
        );
        assert_eq!(result, Err(ResourceError::OutOfBounds));
    }

    #[test]
    fn rejects_short_data() {
        let device = HeadlessDevice::new();
        let id = device
            .create_texture(&descriptor(2, 2, 1, TextureFormat::Rgba8Unorm))
            .unwrap();
        let result = device.write_texture(
            id,
            0,
            &[0; 12],
            Some(8),
            Origin3D::ZERO,
            Extent3D::new_2d(2, 2),
        );
        assert_eq!(
            result,
            Err(ResourceError::SizeMismatch {
                expected: 16,
                actual: 12
            })
        );
    }

    #[test]
    fn records_block_compressed_levels() {
        let device = HeadlessDevice::new();
        let id = device
            .create_texture(&descriptor(8, 8, 2, TextureFormat::Bc7RgbaUnorm))
            .unwrap();
        device
            .write_texture(id, 0, &[0; 64], Some(32), Origin3D::ZERO, Extent3D::new_2d(8, 8))
            .unwrap();
        device
            .write_texture(id, 1, &[0; 16], Some(16), Origin3D::ZERO, Extent3D::new_2d(4, 4))
            .unwrap();

        let info = device.texture_info(id).unwrap();
        assert_eq!(info.level_writes, vec![1, 1]);
        assert_eq!(info.size_in_bytes, 80);
        assert!(device.generate_mipmaps(id).is_err());
    }

    #[test]
    fn unsupported_compression_is_refused() {
        let device = HeadlessDevice::with_features([FEATURE_TEXTURE_COMPRESSION_ETC2]);
        assert!(device.supports_feature(FEATURE_TEXTURE_COMPRESSION_ETC2));
        assert!(!device.supports_feature(FEATURE_TEXTURE_COMPRESSION_BC));
        assert!(matches!(
            device.create_texture(&descriptor(4, 4, 1, TextureFormat::Bc1RgbaUnorm)),
            Err(ResourceError::UnsupportedFormat(_))
        ));
        assert!(device
            .create_texture(&descriptor(4, 4, 1, TextureFormat::Etc2Rgb8Unorm))
            .is_ok());
    }

    #[test]
    fn counts_mipmap_generation() {
        let device = HeadlessDevice::new();
        let id = device
            .create_texture(&descriptor(4, 2, 3, TextureFormat::Rgba8Unorm))
            .unwrap();
        device.generate_mipmaps(id).unwrap();
        assert_eq!(device.texture_info(id).unwrap().mipmap_generations, 1);
        assert_eq!(device.stats().mipmap_generations, 1);
    }
}
