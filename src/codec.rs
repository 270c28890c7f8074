//! Byte-level encoder and decoder for sharing messages.
//!
//! Every frame starts with `[kind: u8][sender: i64]`. Payload fields follow in
//! the order the sender wrote them; nothing on the wire marks field
//! boundaries, so readers must mirror the writer exactly. All numbers are
//! little-endian. Strings are a `u32` byte length followed by UTF-8.

use crate::error::{LinkError, Result};
use crate::protocol::{MessageHeader, MessageKind, Quat, UserId, Vec3, HEADER_LEN};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const DEFAULT_CAPACITY: usize = 64;

/// An outgoing frame under construction.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    kind: MessageKind,
    buffer: BytesMut,
}

impl OutboundMessage {
    /// Starts a frame with the mandatory `[kind][sender]` header.
    pub fn begin(kind: MessageKind, sender: UserId) -> Self {
        let mut buffer = BytesMut::with_capacity(DEFAULT_CAPACITY);
        buffer.put_u8(kind.as_u8());
        buffer.put_i64_le(sender);
        Self { kind, buffer }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Payload length, excluding the header.
    pub fn payload_len(&self) -> usize {
        self.buffer.len() - HEADER_LEN
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(value as u8);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.put_i64_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.put_f32_le(value);
    }

    pub fn write_vec3(&mut self, v: Vec3) {
        self.write_f32(v.x);
        self.write_f32(v.y);
        self.write_f32(v.z);
    }

    pub fn write_quat(&mut self, q: Quat) {
        self.write_f32(q.x);
        self.write_f32(q.y);
        self.write_f32(q.z);
        self.write_f32(q.w);
    }

    pub fn write_transform(&mut self, position: Vec3, rotation: Quat) {
        self.write_vec3(position);
        self.write_quat(rotation);
    }

    /// Appends a `u32` byte length followed by the UTF-8 bytes.
    ///
    /// # Panics
    ///
    /// Panics if `value` is longer than `u32::MAX` bytes. Such a string can
    /// never fit in one frame, so it is a caller bug rather than bad input.
    pub fn write_string(&mut self, value: &str) {
        self.buffer.put_u32_le(string_len_prefix(value.len()));
        self.buffer.put_slice(value.as_bytes());
    }
}

fn string_len_prefix(len: usize) -> u32 {
    u32::try_from(len).expect("string length exceeds u32::MAX bytes")
}

/// A read cursor over one delivered frame.
#[derive(Debug)]
pub struct InboundMessage<'a> {
    data: &'a [u8],
    len: usize,
}

impl<'a> InboundMessage<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { len: data.len(), data }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Unread bytes, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        self.data
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.data.remaining() < needed {
            return Err(LinkError::Truncated {
                needed,
                remaining: self.data.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.data.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.data.get_i32_le())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.data.get_i64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.data.get_f32_le())
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        self.ensure(12)?;
        Ok(Vec3::new(
            self.data.get_f32_le(),
            self.data.get_f32_le(),
            self.data.get_f32_le(),
        ))
    }

    pub fn read_quat(&mut self) -> Result<Quat> {
        self.ensure(16)?;
        Ok(Quat::new(
            self.data.get_f32_le(),
            self.data.get_f32_le(),
            self.data.get_f32_le(),
            self.data.get_f32_le(),
        ))
    }

    pub fn read_transform(&mut self) -> Result<(Vec3, Quat)> {
        let position = self.read_vec3()?;
        let rotation = self.read_quat()?;
        Ok((position, rotation))
    }

    pub fn read_string(&mut self) -> Result<String> {
        self.ensure(4)?;
        let len = self.data.get_u32_le() as usize;
        self.ensure(len)?;

        let bytes = self.data[..len].to_vec();
        self.data.advance(len);

        Ok(String::from_utf8(bytes)?)
    }

    /// Reads the sender id. Used by handlers, which receive the cursor just
    /// past the kind byte.
    pub fn read_sender(&mut self) -> Result<UserId> {
        self.read_i64()
    }

    /// Reads the whole `[kind][sender]` header from the start of a frame.
    pub fn read_header(&mut self) -> Result<MessageHeader> {
        let kind = MessageKind::try_from(self.read_u8()?)?;
        let sender = self.read_sender()?;
        Ok(MessageHeader { kind, sender })
    }
}
