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

//! Defines the error types of the rendering contracts.

use std::fmt;

/// An error related to the creation or use of a GPU resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds (e.g., a mip level
    /// past the end of the chain).
    OutOfBounds,
    /// The data supplied for a write does not match the size of the target region.
    SizeMismatch {
        /// Bytes the region requires.
        expected: u64,
        /// Bytes supplied.
        actual: u64,
    },
    /// The device cannot store textures in the requested format.
    UnsupportedFormat(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => {
                write!(f, "Resource access out of bounds.")
            }
            ResourceError::SizeMismatch { expected, actual } => {
                write!(
                    f,
                    "Resource write size mismatch: expected {expected} bytes, got {actual}."
                )
            }
            ResourceError::UnsupportedFormat(format) => {
                write!(f, "Texture format not supported by the device: {format}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_error_display() {
        assert_eq!(
            format!("{}", ResourceError::BackendError("lost".to_string())),
            "Backend-specific resource error: lost"
        );
        assert_eq!(
            format!(
                "{}",
                ResourceError::SizeMismatch {
                    expected: 16,
                    actual: 12
                }
            ),
            "Resource write size mismatch: expected 16 bytes, got 12."
        );
    }
}
