//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Serialization error types.

use std::error::Error;
use std::fmt;

type BoxedSource = Box<dyn Error + Send + Sync>;

/// Error produced while encoding a message or writing a frame.
#[derive(Debug)]
pub struct SerializationError {
    message: String,
    source: Option<BoxedSource>,
}

impl SerializationError {
    /// Creates an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serialization error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl Error for SerializationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Error produced while reading a frame or decoding a message.
#[derive(Debug)]
pub struct DeserializationError {
    message: String,
    source: Option<BoxedSource>,
}

impl DeserializationError {
    /// Creates an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` if the underlying cause is an I/O error, meaning the
    /// stream itself failed rather than the bytes being malformed.
    pub fn is_io(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.downcast_ref::<std::io::Error>().is_some())
    }
}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deserialization error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl Error for DeserializationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<postcard::Error> for SerializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source("postcard encoding failed", err)
    }
}

impl From<postcard::Error> for DeserializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source("postcard decoding failed", err)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("json encoding failed", err)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for DeserializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("json decoding failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_display_includes_cause() {
        let error = SerializationError::with_source(
            "failed to write frame",
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
        );
        assert_eq!(
            error.to_string(),
            "serialization error: failed to write frame (caused by: pipe closed)"
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn test_io_classification() {
        let io_error = DeserializationError::with_source(
            "failed to read frame",
            io::Error::new(io::ErrorKind::UnexpectedEof, "eof"),
        );
        assert!(io_error.is_io());

        let malformed = DeserializationError::new("frame too large");
        assert!(!malformed.is_io());
    }
}
