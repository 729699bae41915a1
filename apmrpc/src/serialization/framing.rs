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

//! Length-prefixed message framing.
//!
//! Every message on a transport is one frame:
//!
//! ```text
//! +------------------+----------------------+
//! | Length (4 bytes) | Payload (N bytes)    |
//! +------------------+----------------------+
//! ```
//!
//! The length is a big-endian `u32`. Agents send [`CallFrame`]s and the
//! collector answers each one with a [`ReplyFrame`] carrying the same
//! `call_id`; both are postcard-encoded.
//!
//! # Examples
//!
//! ```rust
//! use apmrpc::serialization::framing::{read_frame, write_frame, MAX_FRAME_SIZE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut buffer = Vec::new();
//! write_frame(&mut buffer, b"Hello").await?;
//!
//! let mut reader = &buffer[..];
//! let frame = read_frame(&mut reader, MAX_FRAME_SIZE).await?;
//! assert_eq!(frame, Some(b"Hello".to_vec()));
//! # Ok(())
//! # }
//! ```

use crate::client::Metadata;
use crate::serialization::{DeserializationError, SerializationError, Serializer};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame size accepted by default (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// One outbound call from an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    /// Per-channel call sequence number, echoed in the reply
    pub call_id: u64,
    /// Full method name, e.g. `"v1.Metadata/RequestApiMetaData"`
    pub method: String,
    /// Headers produced by the header factory and interceptors
    pub headers: Metadata,
    /// Request payload encoded with the agreed [`Serializer`]
    pub payload: Vec<u8>,
}

/// The collector's answer to a [`CallFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyFrame {
    /// The `call_id` of the call being answered
    pub call_id: u64,
    /// Encoded response, or `None` when the handler wrote no response
    pub payload: Option<Vec<u8>>,
}

/// Writes one frame and flushes the writer.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), SerializationError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_SIZE {
        return Err(SerializationError::new(format!(
            "frame size {} exceeds maximum allowed size {}",
            payload.len(),
            MAX_FRAME_SIZE
        )));
    }

    let len_bytes = (payload.len() as u32).to_be_bytes();
    writer
        .write_all(&len_bytes)
        .await
        .map_err(|e| SerializationError::with_source("failed to write frame length", e))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| SerializationError::with_source("failed to write frame payload", e))?;
    writer
        .flush()
        .await
        .map_err(|e| SerializationError::with_source("failed to flush frame", e))?;

    Ok(())
}

/// Reads one frame of at most `max_len` bytes.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly on a frame
/// boundary. A stream that ends inside a frame is an error.
pub async fn read_frame<R>(
    reader: &mut R,
    max_len: usize,
) -> Result<Option<Vec<u8>>, DeserializationError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; FRAME_HEADER_SIZE];
    let mut filled = 0;
    while filled < FRAME_HEADER_SIZE {
        let n = reader
            .read(&mut len_bytes[filled..])
            .await
            .map_err(|e| DeserializationError::with_source("failed to read frame length", e))?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(DeserializationError::with_source(
                "stream ended inside frame header",
                std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            ));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_len {
        return Err(DeserializationError::new(format!(
            "frame size {} exceeds maximum allowed size {}",
            len, max_len
        )));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| DeserializationError::with_source("failed to read frame payload", e))?;

    Ok(Some(payload))
}

/// Serializes `message` with `serializer` and writes it as one frame.
pub async fn write_message<W, S, T>(
    writer: &mut W,
    serializer: &S,
    message: &T,
) -> Result<(), SerializationError>
where
    W: AsyncWrite + Unpin,
    S: Serializer,
    T: Serialize + ?Sized,
{
    let payload = serializer.serialize(message)?;
    write_frame(writer, &payload).await
}

/// Reads one frame and deserializes it with `serializer`.
pub async fn read_message<R, S, T>(
    reader: &mut R,
    serializer: &S,
    max_len: usize,
) -> Result<Option<T>, DeserializationError>
where
    R: AsyncRead + Unpin,
    S: Serializer,
    T: serde::de::DeserializeOwned,
{
    match read_frame(reader, max_len).await? {
        Some(payload) => serializer.deserialize(&payload).map(Some),
        None => Ok(None),
    }
}
