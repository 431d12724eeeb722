//! Length-prefixed JSON frames carried on a connection's single stream.
//!
//! Layout: 4-byte big-endian length, then that many bytes of JSON.

use crate::core::config::MAX_FRAME_LEN;
use crate::core::transport::CloseReason;
use anyhow::{Result, bail};
use iroh::endpoint::{RecvStream, SendStream};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Frame {
    /// Handshake: the sender's namespaced name.
    Hello { from: String },
    /// An application payload (an envelope).
    Data { payload: Value },
    /// Orderly goodbye.
    Bye { reason: CloseReason },
}

/// Serialize a frame with its length prefix.
pub fn encode(frame: &Frame) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(frame)?;
    if body.len() > MAX_FRAME_LEN {
        bail!("frame too large: {} bytes", body.len());
    }
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Parse a frame body (without the length prefix).
pub fn decode(body: &[u8]) -> Result<Frame> {
    Ok(serde_json::from_slice(body)?)
}

pub async fn write_frame(send: &mut SendStream, frame: &Frame) -> Result<()> {
    let data = encode(frame)?;
    send.write_all(&data).await?;
    Ok(())
}

/// Read the next frame. Returns `Ok(None)` once the stream has ended.
pub async fn read_frame(recv: &mut RecvStream) -> Result<Option<Frame>> {
    let mut len_buf = [0u8; 4];
    if recv.read_exact(&mut len_buf).await.is_err() {
        return Ok(None);
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        bail!("peer sent oversized frame: {len} bytes");
    }

    let mut body = vec![0u8; len];
    recv.read_exact(&mut body).await?;
    decode(&body).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_prefixes_length() {
        let bytes = encode(&Frame::Bye {
            reason: CloseReason::Busy,
        })
        .unwrap();
        let len = u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize;
        assert_eq!(len, bytes.len() - 4);
        let body: Value = serde_json::from_slice(&bytes[4..]).unwrap();
        assert_eq!(body, json!({ "kind": "bye", "reason": "busy" }));
    }

    #[test]
    fn data_frame_carries_envelope_verbatim() {
        let frame = Frame::Data {
            payload: json!({ "type": "msg", "content": "yo" }),
        };
        let bytes = encode(&frame).unwrap();
        assert_eq!(decode(&bytes[4..]).unwrap(), frame);
    }

    #[test]
    fn oversized_frames_are_refused() {
        let frame = Frame::Data {
            payload: Value::String("x".repeat(MAX_FRAME_LEN)),
        };
        assert!(encode(&frame).is_err());
    }

    #[test]
    fn unknown_kinds_fail_to_decode() {
        assert!(decode(br#"{"kind":"ring"}"#).is_err());
    }
}
