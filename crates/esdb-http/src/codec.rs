//! Request/response body codec.
//!
//! Bodies are UTF-8 on the wire and never prefixed with a byte-order mark.
//! Incoming bodies are drained completely before the text is handed out.

use crate::error::HttpResult;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, TryStreamExt};
use std::pin::Pin;

/// Incoming body as a stream of chunks
pub type BodyStream = Pin<Box<dyn Stream<Item = HttpResult<Bytes>> + Send>>;

/// Encode request text as UTF-8 without a BOM.
///
/// The returned buffer starts at offset zero and is moved into the request,
/// so it is consumed exactly once.
pub fn encode(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

/// Drain a body stream to exhaustion and decode it as UTF-8.
///
/// The stream is owned here and dropped on every exit path, including a read
/// error halfway through, which releases the underlying connection.
pub async fn decode<S>(body: S) -> HttpResult<String>
where
    S: Stream<Item = HttpResult<Bytes>> + Send,
{
    let buffer = body
        .try_fold(BytesMut::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await?;

    Ok(decode_bytes(&buffer))
}

/// Decode a complete body. Invalid sequences become U+FFFD.
pub fn decode_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Wrap an in-memory body as a single-chunk stream
pub fn single_chunk(bytes: impl Into<Bytes>) -> BodyStream {
    let bytes = bytes.into();
    Box::pin(stream::once(async move { Ok(bytes) }))
}
