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

//! Postcard payload serializer.
//!
//! Compact binary encoding; also the fixed encoding of call and reply frames.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// Serializer that encodes payloads with postcard.
#[derive(Clone, Debug, Default)]
pub struct PostcardSerializer {
    max_size: Option<usize>,
}

impl PostcardSerializer {
    /// Creates a serializer with no size limit.
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Rejects encoded payloads larger than `max_size` bytes.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

impl Serializer for PostcardSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        let bytes = postcard::to_allocvec(value)?;
        match self.max_size {
            Some(max) if bytes.len() > max => Err(SerializationError::new(format!(
                "encoded size {} exceeds limit {}",
                bytes.len(),
                max
            ))),
            _ => Ok(bytes),
        }
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.max_size {
            Some(max) if bytes.len() > max => Err(DeserializationError::new(format!(
                "payload size {} exceeds limit {}",
                bytes.len(),
                max
            ))),
            _ => Ok(postcard::from_bytes(bytes)?),
        }
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_applies_to_both_directions() {
        let serializer = PostcardSerializer::new().with_max_size(4);
        let long = "GET /api/v1/traces".to_string();

        assert!(serializer.serialize(&long).is_err());

        let bytes = PostcardSerializer::new().serialize(&long).unwrap();
        let result: Result<String, _> = serializer.deserialize(&bytes);
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_input_fails() {
        let serializer = PostcardSerializer::new();
        let bytes = serializer.serialize(&(7i32, "apiInfo".to_string())).unwrap();
        let result: Result<(i32, String), _> = serializer.deserialize(&bytes[..bytes.len() - 2]);
        assert!(result.is_err());
    }
}
