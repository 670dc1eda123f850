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

use async_trait::async_trait;
use std::io::ErrorKind;
use strata_core::io::{FetchError, ResourceFetcher};
use url::Url;

/// Reads `file:` URLs from the local file system.
///
/// A missing file is reported as `404 Not Found`, like an HTTP server would.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemFetcher;

impl FileSystemFetcher {
    /// Creates a new file system fetcher.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceFetcher for FileSystemFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        if url.scheme() != "file" {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|()| FetchError::InvalidUri(url.to_string()))?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                log::trace!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FetchError::Status {
                code: 404,
                reason: "Not Found".to_string(),
            }),
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_existing_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"texels").unwrap();
        let url = Url::from_file_path(file.path()).unwrap();

        let bytes = FileSystemFetcher::new().fetch(&url).await.unwrap();
        assert_eq!(bytes, b"texels");
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("image.png")).unwrap();

        let err = FileSystemFetcher::new().fetch(&url).await.unwrap_err();
        assert_eq!(err.to_string(), "404 Not Found");
    }

    #[tokio::test]
    async fn other_schemes_are_rejected() {
        let url = Url::parse("https://example.com/image.png").unwrap();
        let err = FileSystemFetcher::new().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(scheme) if scheme == "https"));
    }
}
