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

use crate::serialization::{DeserializationError, SerializationError};

/// Encodes and decodes request payloads.
///
/// Call and reply frames always travel as postcard; the `Serializer` only
/// decides how the payload inside a call is encoded, so agents and the
/// collector must agree on one.
pub trait Serializer: Send + Sync + 'static {
    /// Encodes `value` into bytes.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized;

    /// Decodes a value from `bytes`.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned;

    /// Short name of the format, used in logs.
    fn name(&self) -> &'static str;
}
