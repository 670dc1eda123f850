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

//! A graphics device without a GPU behind it.
//!
//! [`HeadlessDevice`] keeps the bookkeeping a real backend would (texture table,
//! VRAM usage, per-level writes) and rejects the same invalid calls, which makes it
//! the device of choice for tests and offline tools.

mod device;

pub use self::device::{
    DeviceStats, HeadlessDevice, HeadlessTextureInfo, FEATURE_TEXTURE_COMPRESSION_ASTC,
    FEATURE_TEXTURE_COMPRESSION_BC, FEATURE_TEXTURE_COMPRESSION_ETC2,
};
