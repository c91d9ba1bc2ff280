//! Length-prefixed bincode framing for RPC messages.
//!
//! ```text
//! +----------+------------------+
//! | Len(4)   | Payload(Len)     |
//! +----------+------------------+
//! ```
//!
//! The length is a big-endian `u32` and does not include itself.

use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::codec::{Decoder, Encoder};

use crate::rpc::RpcError;

/// Maximum frame payload size (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Header size in bytes.
const HEADER_SIZE: usize = 4;

/// Codec decoding frames into `D` and encoding any serializable message.
///
/// Servers use `RpcCodec<RpcRequest>`, clients `RpcCodec<RpcResponse>`.
#[derive(Debug)]
pub struct RpcCodec<D> {
    max_frame_size: usize,
    _decode: PhantomData<fn() -> D>,
}

impl<D> RpcCodec<D> {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            _decode: PhantomData,
        }
    }
}

impl<D> Default for RpcCodec<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DeserializeOwned> Decoder for RpcCodec<D> {
    type Item = D;
    type Error = RpcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > self.max_frame_size {
            return Err(RpcError::FrameTooLarge(len));
        }
        if src.len() < HEADER_SIZE + len {
            src.reserve(HEADER_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(len);
        Ok(Some(bincode::deserialize(&payload)?))
    }
}

impl<D, E: Serialize> Encoder<E> for RpcCodec<D> {
    type Error = RpcError;

    fn encode(&mut self, item: E, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = bincode::serialize(&item)?;
        if payload.len() > self.max_frame_size {
            return Err(RpcError::FrameTooLarge(payload.len()));
        }

        dst.reserve(HEADER_SIZE + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);
        Ok(())
    }
}
