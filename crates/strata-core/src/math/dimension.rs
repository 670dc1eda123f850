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

//! Provides structs for representing extents (sizes) and origins (offsets) in 3D.
//!
//! These types describe the dimensions of textures and regions within them. They
//! use integer (`u32`) components, matching pixel-based coordinates and sizes.

use super::mip_dimension;

/// A three-dimensional extent, representing width, height, and depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
    /// The depth or number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// Creates the extent of a single-layer 2D image.
    pub const fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    /// Returns the extent of the given mip level of a 2D image with this base size.
    pub fn mip_level_size(&self, level: u32) -> Self {
        Self {
            width: mip_dimension(self.width, level),
            height: mip_dimension(self.height, level),
            depth_or_array_layers: self.depth_or_array_layers,
        }
    }
}

/// A three-dimensional origin, representing an (x, y, z) offset.
///
/// This is used to specify the corner of the region written during a texture upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// The x-coordinate of the origin.
    pub x: u32,
    /// The y-coordinate of the origin.
    pub y: u32,
    /// The z-coordinate or array layer of the origin.
    pub z: u32,
}

impl Origin3D {
    /// The origin at `(0, 0, 0)`.
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_level_size_halves_each_level() {
        let base = Extent3D::new_2d(8, 2);
        assert_eq!(base.mip_level_size(0), Extent3D::new_2d(8, 2));
        assert_eq!(base.mip_level_size(1), Extent3D::new_2d(4, 1));
        assert_eq!(base.mip_level_size(3), Extent3D::new_2d(1, 1));
    }
}
