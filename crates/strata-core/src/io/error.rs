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

use std::fmt;

/// An error raised while reading the bytes behind a [`Resource`](super::Resource).
#[derive(Debug)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Status {
        /// The numeric status code (e.g. `404`).
        code: u16,
        /// The canonical reason phrase (e.g. `Not Found`).
        reason: String,
    },
    /// A local read failed.
    Io(std::io::Error),
    /// A URI could not be parsed or resolved.
    InvalidUri(String),
    /// A `data:` URI is malformed.
    InvalidDataUri(String),
    /// The request could not be completed (connection, TLS, body read).
    Network(String),
    /// No fetcher handles this URL scheme.
    UnsupportedScheme(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status { code, reason } => write!(f, "{code} {reason}"),
            FetchError::Io(err) => write!(f, "I/O error: {err}"),
            FetchError::InvalidUri(msg) => write!(f, "Invalid URI: {msg}"),
            FetchError::InvalidDataUri(msg) => write!(f, "Invalid data URI: {msg}"),
            FetchError::Network(msg) => write!(f, "Network error: {msg}"),
            FetchError::UnsupportedScheme(scheme) => {
                write!(f, "Unsupported URL scheme: {scheme}")
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_displays_code_and_reason() {
        let err = FetchError::Status {
            code: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "404 Not Found");
    }
}
