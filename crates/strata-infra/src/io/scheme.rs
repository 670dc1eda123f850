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

use super::{FileSystemFetcher, HttpFetcher};
use async_trait::async_trait;
use strata_core::io::{FetchError, ResourceFetcher};
use url::Url;

/// Dispatches each URL to the fetcher handling its scheme.
#[derive(Debug, Clone, Default)]
pub struct SchemeFetcher {
    file: FileSystemFetcher,
    http: HttpFetcher,
}

impl SchemeFetcher {
    /// Creates a fetcher for `file:`, `http:` and `https:` URLs.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceFetcher for SchemeFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        match url.scheme() {
            "file" => self.file.fetch(url).await,
            "http" | "https" => self.http.fetch(url).await,
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}
