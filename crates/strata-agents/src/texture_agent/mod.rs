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

//! Acts as the **[A]gent** for streamed textures.
//!
//! A [`TextureLoader`] turns one texture reference of an asset description into a
//! GPU texture. It shares decoded images with every other loader through the
//! resource cache, where they live as [`ImageResourceLoader`]s, and uploads through
//! the job scheduler so a burst of finished downloads never stalls a frame.
//!
//! The lifecycle is an explicit state machine advanced by `load().await` and by
//! polling `process()` once per frame:
//!
//! ```text
//! Unloaded --load()--> Loading --image ready--> Processing --upload--> Ready
//!                         |                         |
//!                         +--------> Failed <-------+
//! ```
//!
//! `destroy()` moves any state to `Destroyed`.

mod error;
mod image_loader;
mod sampler;
mod texture_loader;
mod upload_job;
mod uploaded_texture;

pub use self::error::{ConfigError, ImageLoadError, SharedLoaderError, TextureLoadError};
pub use self::image_loader::ImageResourceLoader;
pub use self::texture_loader::{LoaderState, TextureLoader, TextureLoaderOptions};
