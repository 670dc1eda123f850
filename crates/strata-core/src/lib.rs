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

//! # Strata Core
//!
//! Foundational crate containing the traits, core types, and interface contracts
//! shared by every stage of the texture streaming pipeline: the asset description
//! schema, decoded image resources, GPU texture and sampler types, the graphics
//! device contract, and the resource locations images are fetched from.

#![warn(missing_docs)]

pub mod asset;
pub mod image;
pub mod io;
pub mod math;
pub mod renderer;

pub use image::{ImageResource, SupportedImageFormats};
pub use io::{FetchError, Resource, ResourceFetcher};
