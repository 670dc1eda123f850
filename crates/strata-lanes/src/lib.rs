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

//! # Strata Lanes
//!
//! Hot-path CPU work of the streaming pipeline. Lanes are stateless, synchronous
//! and thread-safe: callers run them on a blocking pool and only hand over bytes.
//!
//! - [`asset_lane`]: decoders turning fetched bytes into an [`ImageResource`](strata_core::ImageResource).
//! - [`image_lane`]: transformations applied to decoded images before upload.

#![warn(missing_docs)]

pub mod asset_lane;
pub mod image_lane;
