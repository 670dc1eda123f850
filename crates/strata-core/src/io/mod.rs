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

//! Resource locations and the asynchronous contract for fetching their bytes.
//!
//! A [`Resource`] pairs an absolute URL with the [`ResourceFetcher`] able to read
//! it. Relative image URIs are resolved against the resource of the document that
//! declared them, and `data:` URIs are decoded in place without a fetch.

mod error;
mod resource;

pub use self::error::FetchError;
pub use self::resource::{Resource, ResourceFetcher};
