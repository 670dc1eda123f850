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

//! Integer math used to reason about texture dimensions.
//!
//! Texture sizes are pixel counts, so everything here works on `u32`. The helpers
//! cover the power-of-two rules some sampler configurations impose and the length
//! of a full mipmap chain.

pub mod dimension;

pub use self::dimension::{Extent3D, Origin3D};

/// Returns `true` if `value` is a non-zero power of two.
///
/// # Examples
///
/// ```
/// use strata_core::math::is_power_of_two;
/// assert!(is_power_of_two(1));
/// assert!(is_power_of_two(64));
/// assert!(!is_power_of_two(0));
/// assert!(!is_power_of_two(3));
/// ```
#[inline]
pub fn is_power_of_two(value: u32) -> bool {
    value.is_power_of_two()
}

/// Returns the smallest power of two greater than or equal to `value`.
///
/// Zero maps to one, so the result is always a valid texture dimension.
///
/// # Examples
///
/// ```
/// use strata_core::math::next_power_of_two;
/// assert_eq!(next_power_of_two(0), 1);
/// assert_eq!(next_power_of_two(3), 4);
/// assert_eq!(next_power_of_two(2), 2);
/// assert_eq!(next_power_of_two(513), 1024);
/// ```
#[inline]
pub fn next_power_of_two(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

/// Returns the number of levels in a complete mipmap chain for a 2D texture,
/// down to and including the 1×1 level.
///
/// # Examples
///
/// ```
/// use strata_core::math::full_mip_level_count;
/// assert_eq!(full_mip_level_count(1, 1), 1);
/// assert_eq!(full_mip_level_count(4, 4), 3);
/// assert_eq!(full_mip_level_count(4, 2), 3);
/// assert_eq!(full_mip_level_count(256, 1), 9);
/// ```
#[inline]
pub fn full_mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    u32::BITS - largest.leading_zeros()
}

/// Returns the size of a single dimension at the given mip level, never below one.
///
/// # Examples
///
/// ```
/// use strata_core::math::mip_dimension;
/// assert_eq!(mip_dimension(4, 0), 4);
/// assert_eq!(mip_dimension(4, 2), 1);
/// assert_eq!(mip_dimension(3, 5), 1);
/// ```
#[inline]
pub fn mip_dimension(base: u32, level: u32) -> u32 {
    base.checked_shr(level).unwrap_or(0).max(1)
}
