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

use super::FetchError;
use async_trait::async_trait;
use base64::Engine as _;
use std::fmt::{self, Debug};
use std::sync::Arc;
use url::Url;

/// A trait for a backend able to read the bytes behind a URL.
///
/// Concrete fetchers live in `strata-infra` (local files, HTTP). The trait is
/// object-safe so resources can carry an `Arc<dyn ResourceFetcher>`.
#[async_trait]
pub trait ResourceFetcher: Send + Sync + Debug {
    /// Reads every byte at `url`.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// An absolute resource location together with the fetcher that reads it.
#[derive(Clone)]
pub struct Resource {
    url: Url,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("url", &self.url.as_str()).finish()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Resource {}

impl Resource {
    /// Creates a resource for `url`, read through `fetcher`.
    pub fn new(url: Url, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { url, fetcher }
    }

    /// Parses `url` and creates a resource for it.
    pub fn parse(url: &str, fetcher: Arc<dyn ResourceFetcher>) -> Result<Self, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidUri(format!("{url}: {e}")))?;
        Ok(Self::new(url, fetcher))
    }

    /// Resolves `uri` against this resource and returns a resource sharing the same
    /// fetcher. Absolute URIs, including `data:` URIs, replace the location.
    pub fn derive(&self, uri: &str) -> Result<Self, FetchError> {
        let url = self
            .url
            .join(uri)
            .map_err(|e| FetchError::InvalidUri(format!("{uri}: {e}")))?;
        Ok(Self {
            url,
            fetcher: Arc::clone(&self.fetcher),
        })
    }

    /// Returns the absolute location.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns `true` for inline `data:` resources.
    pub fn is_data_uri(&self) -> bool {
        self.url.scheme() == "data"
    }

    /// Returns the media type declared by a `data:` URI, or the one implied by the
    /// file extension of the path.
    pub fn media_type(&self) -> Option<String> {
        if self.is_data_uri() {
            let (header, _) = data_uri_parts(self.url.as_str())?;
            let mime = header.split(';').next().unwrap_or_default();
            return (!mime.is_empty()).then(|| mime.to_ascii_lowercase());
        }
        let extension = self
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|file| file.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())?;
        let mime = match extension.as_str() {
            "ktx2" => "image/ktx2",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            _ => return None,
        };
        Some(mime.to_string())
    }

    /// Reads the bytes of the resource.
    ///
    /// `data:` URIs are decoded in place. Every other scheme is delegated to the
    /// fetcher; no retry is attempted.
    pub async fn fetch_bytes(&self) -> Result<Vec<u8>, FetchError> {
        if self.is_data_uri() {
            return decode_data_uri(self.url.as_str());
        }
        log::debug!("Fetching {}", self.url);
        self.fetcher.fetch(&self.url).await
    }
}

fn data_uri_parts(uri: &str) -> Option<(&str, &str)> {
    uri.strip_prefix("data:")?.split_once(',')
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, FetchError> {
    let (header, payload) = data_uri_parts(uri)
        .ok_or_else(|| FetchError::InvalidDataUri("missing ',' separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(FetchError::InvalidDataUri(
            "only base64 payloads are supported".to_string(),
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| FetchError::InvalidDataUri(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResourceFetcher for CountingFetcher {
        async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(url.path().as_bytes().to_vec())
        }
    }

    fn base(fetcher: Arc<CountingFetcher>) -> Resource {
        Resource::parse("https://example.com/models/tile.gltf", fetcher).unwrap()
    }

    #[test]
    fn derive_resolves_relative_uris() {
        let base = base(Arc::new(CountingFetcher::default()));
        let image = base.derive("textures/image.png").unwrap();
        assert_eq!(
            image.url().as_str(),
            "https://example.com/models/textures/image.png"
        );
        assert_eq!(image.media_type().as_deref(), Some("image/png"));

        let absolute = base.derive("https://cdn.example.com/a.KTX2").unwrap();
        assert_eq!(absolute.url().host_str(), Some("cdn.example.com"));
        assert_eq!(absolute.media_type().as_deref(), Some("image/ktx2"));
    }

    #[tokio::test]
    async fn data_uris_are_decoded_without_fetching() {
        let fetcher = Arc::new(CountingFetcher::default());
        let image = base(Arc::clone(&fetcher))
            .derive("data:image/png;base64,AAEC")
            .unwrap();

        assert!(image.is_data_uri());
        assert_eq!(image.media_type().as_deref(), Some("image/png"));
        assert_eq!(image.fetch_bytes().await.unwrap(), vec![0, 1, 2]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn other_schemes_go_through_the_fetcher() {
        let fetcher = Arc::new(CountingFetcher::default());
        let image = base(Arc::clone(&fetcher)).derive("image.png").unwrap();

        let bytes = image.fetch_bytes().await.unwrap();
        assert_eq!(bytes, b"/models/image.png".to_vec());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_base64_data_uris_are_rejected() {
        let image = base(Arc::new(CountingFetcher::default()))
            .derive("data:text/plain,hello")
            .unwrap();
        assert!(matches!(
            image.fetch_bytes().await,
            Err(FetchError::InvalidDataUri(_))
        ));
    }
}
