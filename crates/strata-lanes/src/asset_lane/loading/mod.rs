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

//! Decoders for every image container the pipeline accepts.

mod basis_transcoder;
mod image_loader_lane;
mod ktx2_loader_lane;
mod raster_loader_lane;

pub use self::basis_transcoder::BasisTranscoder;
pub use self::image_loader_lane::ImageLoaderLane;
pub use self::ktx2_loader_lane::*;
pub use self::raster_loader_lane::RasterLoaderLane;
