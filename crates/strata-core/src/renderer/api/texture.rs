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

//! Defines data structures related to GPU texture and sampler resources.

use crate::asset::SamplerEntry;
use crate::math::{is_power_of_two, Extent3D};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use crate::renderer::TextureFormat;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// An opaque handle to a GPU texture owned by a [`GraphicsDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Defines how texture coordinates are handled when sampling outside the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Coordinates wrap around. `1.1` becomes `0.1`.
    Repeat,
    /// Coordinates are clamped to the edge. `1.1` becomes `1.0`.
    ClampToEdge,
    /// Coordinates wrap around, mirroring at each integer boundary.
    MirrorRepeat,
}

impl AddressMode {
    /// OpenGL `CLAMP_TO_EDGE`.
    pub const GL_CLAMP_TO_EDGE: u32 = 33071;
    /// OpenGL `MIRRORED_REPEAT`.
    pub const GL_MIRRORED_REPEAT: u32 = 33648;
    /// OpenGL `REPEAT`.
    pub const GL_REPEAT: u32 = 10497;

    /// Converts an OpenGL wrap enum. Returns `None` for unknown values.
    pub fn from_gl(code: u32) -> Option<Self> {
        match code {
            Self::GL_CLAMP_TO_EDGE => Some(AddressMode::ClampToEdge),
            Self::GL_MIRRORED_REPEAT => Some(AddressMode::MirrorRepeat),
            Self::GL_REPEAT => Some(AddressMode::Repeat),
            _ => None,
        }
    }

    /// Returns the OpenGL enum for this mode.
    pub fn to_gl(self) -> u32 {
        match self {
            AddressMode::ClampToEdge => Self::GL_CLAMP_TO_EDGE,
            AddressMode::MirrorRepeat => Self::GL_MIRRORED_REPEAT,
            AddressMode::Repeat => Self::GL_REPEAT,
        }
    }
}

/// Defines the filtering mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Point sampling. Returns the value of the nearest texel.
    Nearest,
    /// Linear interpolation. Returns a weighted average of the four nearest texels.
    Linear,
}

/// Defines the filtering mode between mipmap levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapFilterMode {
    /// Use the nearest mipmap level.
    Nearest,
    /// Linearly interpolate between the two nearest mipmap levels.
    Linear,
}

/// OpenGL `NEAREST`.
pub const GL_NEAREST: u32 = 9728;
/// OpenGL `LINEAR`.
pub const GL_LINEAR: u32 = 9729;
/// OpenGL `NEAREST_MIPMAP_NEAREST`.
pub const GL_NEAREST_MIPMAP_NEAREST: u32 = 9984;
/// OpenGL `LINEAR_MIPMAP_NEAREST`.
pub const GL_LINEAR_MIPMAP_NEAREST: u32 = 9985;
/// OpenGL `NEAREST_MIPMAP_LINEAR`.
pub const GL_NEAREST_MIPMAP_LINEAR: u32 = 9986;
/// OpenGL `LINEAR_MIPMAP_LINEAR`.
pub const GL_LINEAR_MIPMAP_LINEAR: u32 = 9987;

impl FilterMode {
    /// Converts an OpenGL magnification enum.
    pub fn from_gl_mag(code: u32) -> Option<Self> {
        match code {
            GL_NEAREST => Some(FilterMode::Nearest),
            GL_LINEAR => Some(FilterMode::Linear),
            _ => None,
        }
    }
}

/// Splits an OpenGL minification enum into its texel filter and optional mipmap filter.
pub fn min_filter_from_gl(code: u32) -> Option<(FilterMode, Option<MipmapFilterMode>)> {
    use FilterMode as F;
    use MipmapFilterMode as M;
    match code {
        GL_NEAREST => Some((F::Nearest, None)),
        GL_LINEAR => Some((F::Linear, None)),
        GL_NEAREST_MIPMAP_NEAREST => Some((F::Nearest, Some(M::Nearest))),
        GL_LINEAR_MIPMAP_NEAREST => Some((F::Linear, Some(M::Nearest))),
        GL_NEAREST_MIPMAP_LINEAR => Some((F::Nearest, Some(M::Linear))),
        GL_LINEAR_MIPMAP_LINEAR => Some((F::Linear, Some(M::Linear))),
        _ => None,
    }
}

/// The sampling state applied to a texture.
///
/// The default is the state used when a texture declares no sampler: repeat
/// wrapping on both axes with linear filtering and no mipmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sampler {
    /// The address mode for the S (or U) texture coordinate.
    pub wrap_s: AddressMode,
    /// The address mode for the T (or V) texture coordinate.
    pub wrap_t: AddressMode,
    /// The filter mode for magnification.
    pub mag_filter: FilterMode,
    /// The texel filter mode for minification.
    pub min_filter: FilterMode,
    /// The filter between mipmap levels, `None` when the sampler reads only level 0.
    pub mipmap_filter: Option<MipmapFilterMode>,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            wrap_s: AddressMode::Repeat,
            wrap_t: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: None,
        }
    }
}

/// Names the field of a [`SamplerEntry`] that carried an unknown code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidSamplerCode {
    /// `magFilter` value.
    MagFilter(u32),
    /// `minFilter` value.
    MinFilter(u32),
    /// `wrapS` value.
    WrapS(u32),
    /// `wrapT` value.
    WrapT(u32),
}

impl fmt::Display for InvalidSamplerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidSamplerCode::MagFilter(code) => write!(f, "invalid magFilter {code}"),
            InvalidSamplerCode::MinFilter(code) => write!(f, "invalid minFilter {code}"),
            InvalidSamplerCode::WrapS(code) => write!(f, "invalid wrapS {code}"),
            InvalidSamplerCode::WrapT(code) => write!(f, "invalid wrapT {code}"),
        }
    }
}

impl std::error::Error for InvalidSamplerCode {}

impl Sampler {
    /// Builds a sampler from its declared OpenGL codes. Absent fields take the
    /// [`Default`] values.
    pub fn from_entry(entry: &SamplerEntry) -> Result<Self, InvalidSamplerCode> {
        let defaults = Sampler::default();
        let wrap_s = match entry.wrap_s {
            Some(code) => AddressMode::from_gl(code).ok_or(InvalidSamplerCode::WrapS(code))?,
            None => defaults.wrap_s,
        };
        let wrap_t = match entry.wrap_t {
            Some(code) => AddressMode::from_gl(code).ok_or(InvalidSamplerCode::WrapT(code))?,
            None => defaults.wrap_t,
        };
        let mag_filter = match entry.mag_filter {
            Some(code) => {
                FilterMode::from_gl_mag(code).ok_or(InvalidSamplerCode::MagFilter(code))?
            }
            None => defaults.mag_filter,
        };
        let (min_filter, mipmap_filter) = match entry.min_filter {
            Some(code) => min_filter_from_gl(code).ok_or(InvalidSamplerCode::MinFilter(code))?,
            None => (defaults.min_filter, defaults.mipmap_filter),
        };
        Ok(Self {
            wrap_s,
            wrap_t,
            mag_filter,
            min_filter,
            mipmap_filter,
        })
    }

    /// Returns `true` if sampling reads from more than the base level.
    pub fn requires_mipmap(&self) -> bool {
        self.mipmap_filter.is_some()
    }

    /// Returns `true` if either axis wraps by repetition.
    pub fn wraps(&self) -> bool {
        self.wrap_s != AddressMode::ClampToEdge || self.wrap_t != AddressMode::ClampToEdge
    }

    /// Returns `true` if a raster image sampled this way must have power-of-two sides.
    pub fn requires_power_of_two(&self) -> bool {
        self.requires_mipmap() || self.wraps()
    }

    /// Returns the same sampler reading only the base level.
    ///
    /// `NEAREST_MIPMAP_*` minification becomes `NEAREST` and `LINEAR_MIPMAP_*`
    /// becomes `LINEAR`.
    pub fn without_mipmap(self) -> Self {
        Self {
            mipmap_filter: None,
            ..self
        }
    }

    /// Returns the OpenGL minification enum for this sampler.
    pub fn min_filter_gl(&self) -> u32 {
        use FilterMode as F;
        use MipmapFilterMode as M;
        match (self.min_filter, self.mipmap_filter) {
            (F::Nearest, None) => GL_NEAREST,
            (F::Linear, None) => GL_LINEAR,
            (F::Nearest, Some(M::Nearest)) => GL_NEAREST_MIPMAP_NEAREST,
            (F::Linear, Some(M::Nearest)) => GL_LINEAR_MIPMAP_NEAREST,
            (F::Nearest, Some(M::Linear)) => GL_NEAREST_MIPMAP_LINEAR,
            (F::Linear, Some(M::Linear)) => GL_LINEAR_MIPMAP_LINEAR,
        }
    }

    /// Returns the OpenGL magnification enum for this sampler.
    pub fn mag_filter_gl(&self) -> u32 {
        match self.mag_filter {
            FilterMode::Nearest => GL_NEAREST,
            FilterMode::Linear => GL_LINEAR,
        }
    }
}

impl fmt::Display for Sampler {
    /// Formats the sampler as its four OpenGL codes, `wrapS-wrapT-min-mag`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.wrap_s.to_gl(),
            self.wrap_t.to_gl(),
            self.min_filter_gl(),
            self.mag_filter_gl()
        )
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The dimensions of the texture.
    pub size: Extent3D,
    /// The number of mipmap levels for the texture.
    pub mip_level_count: u32,
    /// The format of the texels in the texture.
    pub format: TextureFormat,
}

impl TextureDescriptor<'_> {
    /// Returns the GPU memory the full mip chain occupies.
    pub fn size_in_bytes(&self) -> u64 {
        self.format.chain_byte_length(
            self.size.width,
            self.size.height,
            self.mip_level_count,
        ) * u64::from(self.size.depth_or_array_layers.max(1))
    }
}

/// A ready-to-sample texture, as exposed to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// The device handle.
    pub id: TextureId,
    /// Width of level 0.
    pub width: u32,
    /// Height of level 0.
    pub height: u32,
    /// Number of mip levels resident on the GPU.
    pub mip_level_count: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// GPU memory occupied by every level.
    pub size_in_bytes: u64,
    /// Sampling state to apply when binding the texture.
    pub sampler: Sampler,
}

impl Texture {
    /// Returns `true` when both sides are powers of two.
    pub fn is_power_of_two(&self) -> bool {
        is_power_of_two(self.width) && is_power_of_two(self.height)
    }
}

/// Exclusive ownership of a GPU texture.
///
/// The texture is released by [`GpuTexture::destroy`], which consumes the owner so
/// it cannot be destroyed twice.
#[derive(Debug)]
pub struct GpuTexture {
    texture: Texture,
    device: Arc<dyn GraphicsDevice>,
}

impl GpuTexture {
    /// Takes ownership of a texture created on `device`.
    pub fn new(texture: Texture, device: Arc<dyn GraphicsDevice>) -> Self {
        Self { texture, device }
    }

    /// Returns the texture's metadata.
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Releases the texture on its device.
    pub fn destroy(self) -> Result<(), ResourceError> {
        self.device.destroy_texture(self.texture.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sampler_fields_use_repeat_and_linear() {
        let sampler = Sampler::from_entry(&SamplerEntry::default()).unwrap();
        assert_eq!(sampler, Sampler::default());
        assert!(!sampler.requires_mipmap());
        assert!(sampler.requires_power_of_two());
    }

    #[test]
    fn mipmap_min_filters_split_into_two_filters() {
        let entry = SamplerEntry {
            min_filter: Some(GL_NEAREST_MIPMAP_LINEAR),
            ..Default::default()
        };
        let sampler = Sampler::from_entry(&entry).unwrap();
        assert_eq!(sampler.min_filter, FilterMode::Nearest);
        assert_eq!(sampler.mipmap_filter, Some(MipmapFilterMode::Linear));
        assert_eq!(sampler.min_filter_gl(), GL_NEAREST_MIPMAP_LINEAR);

        let fallback = sampler.without_mipmap();
        assert_eq!(fallback.min_filter_gl(), GL_NEAREST);

        let linear = Sampler {
            mipmap_filter: Some(MipmapFilterMode::Nearest),
            ..Sampler::default()
        };
        assert_eq!(linear.min_filter_gl(), GL_LINEAR_MIPMAP_NEAREST);
        assert_eq!(linear.without_mipmap().min_filter_gl(), GL_LINEAR);
    }

    #[test]
    fn clamped_non_mipmapped_sampler_accepts_any_size() {
        let entry = SamplerEntry {
            mag_filter: Some(GL_NEAREST),
            min_filter: Some(GL_NEAREST),
            wrap_s: Some(AddressMode::GL_CLAMP_TO_EDGE),
            wrap_t: Some(AddressMode::GL_CLAMP_TO_EDGE),
        };
        let sampler = Sampler::from_entry(&entry).unwrap();
        assert!(!sampler.requires_power_of_two());
        assert_eq!(sampler.to_string(), "33071-33071-9728-9728");
    }

    #[test]
    fn unknown_codes_are_rejected_by_field() {
        let entry = SamplerEntry {
            wrap_t: Some(1),
            ..Default::default()
        };
        assert_eq!(
            Sampler::from_entry(&entry),
            Err(InvalidSamplerCode::WrapT(1))
        );
        assert_eq!(
            Sampler::from_entry(&SamplerEntry {
                min_filter: Some(42),
                ..Default::default()
            })
            .unwrap_err()
            .to_string(),
            "invalid minFilter 42"
        );
    }

    #[test]
    fn descriptor_size_covers_every_level() {
        let descriptor = TextureDescriptor {
            label: None,
            size: Extent3D::new_2d(4, 2),
            mip_level_count: 3,
            format: TextureFormat::Rgba8Unorm,
        };
        // 4x2 + 2x1 + 1x1
        assert_eq!(descriptor.size_in_bytes(), 44);
    }
}
