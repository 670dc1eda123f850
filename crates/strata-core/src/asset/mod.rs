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

//! Provides the foundational traits and the declarative schema for streamed assets.
//!
//! This module defines the "common language" for asset-related operations. It
//! contains the [`Asset`] marker trait and the [`AssetDescription`] schema: the
//! images, textures, samplers and materials a streamed model declares. It has no
//! knowledge of how those resources are fetched or uploaded.

mod description;

pub use description::*;

/// A marker trait for types that can be managed by the asset system.
///
/// The supertraits enforce critical safety guarantees:
/// - `Send` + `Sync`: The asset type can be safely shared and sent between threads.
///   This is essential for background decoding.
/// - `'static`: The asset type does not contain any non-static references, ensuring
///   it can be stored in shared caches.
///
/// # Examples
///
/// ```
/// use strata_core::asset::Asset;
///
/// struct HeightMap {
///     samples: Vec<f32>,
/// }
///
/// impl Asset for HeightMap {}
/// ```
pub trait Asset: Send + Sync + 'static {}
