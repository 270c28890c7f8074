//! Bounded recording of frames crossing the context, for offline inspection.

use crate::error::Result;
use crate::policy::DeliveryPolicy;
use crate::protocol::{Message, MessageHeader, MessageKind};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedFrame {
    pub sequence: u64,
    pub direction: Direction,
    pub kind: MessageKind,
    /// Set for outbound frames only.
    pub policy: Option<DeliveryPolicy>,
    pub data: Vec<u8>,
}

impl CapturedFrame {
    pub fn decode(&self) -> Result<(MessageHeader, Message)> {
        Message::decode_frame(&self.data)
    }
}

#[derive(Debug)]
pub struct CaptureLog {
    frames: VecDeque<CapturedFrame>,
    limit: usize,
    next_sequence: u64,
    evicted: u64,
}

impl CaptureLog {
    pub fn new(limit: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(limit.min(1024)),
            limit,
            next_sequence: 0,
            evicted: 0,
        }
    }

    pub fn record_outbound(&mut self, kind: MessageKind, policy: DeliveryPolicy, data: &[u8]) {
        self.push(Direction::Outbound, kind, Some(policy), data);
    }

    pub fn record_inbound(&mut self, kind: MessageKind, data: &[u8]) {
        self.push(Direction::Inbound, kind, None, data);
    }

    fn push(
        &mut self,
        direction: Direction,
        kind: MessageKind,
        policy: Option<DeliveryPolicy>,
        data: &[u8],
    ) {
        if self.limit == 0 {
            return;
        }

        while self.frames.len() >= self.limit {
            self.frames.pop_front();
            self.evicted += 1;
        }

        self.frames.push_back(CapturedFrame {
            sequence: self.next_sequence,
            direction,
            kind,
            policy,
            data: data.to_vec(),
        });
        self.next_sequence += 1;
    }

    pub fn frames(&self) -> impl Iterator<Item = &CapturedFrame> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn export(&self, format: CaptureFormat) -> Result<Bytes> {
        let frames: Vec<CapturedFrame> = self.frames.iter().cloned().collect();
        CaptureSerializer::new(format).serialize(&frames)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureFormat {
    Json,
    MessagePack,
    Bincode,
}

pub struct CaptureSerializer {
    format: CaptureFormat,
}

impl CaptureSerializer {
    pub fn new(format: CaptureFormat) -> Self {
        Self { format }
    }

    pub fn serialize(&self, frames: &[CapturedFrame]) -> Result<Bytes> {
        match self.format {
            CaptureFormat::Json => {
                let json = serde_json::to_vec(frames)?;
                Ok(Bytes::from(json))
            }
            CaptureFormat::MessagePack => {
                let msgpack = rmp_serde::to_vec(frames)?;
                Ok(Bytes::from(msgpack))
            }
            CaptureFormat::Bincode => {
                let bincode_data = bincode::serialize(frames)?;
                Ok(Bytes::from(bincode_data))
            }
        }
    }

    pub fn deserialize(&self, data: &[u8]) -> Result<Vec<CapturedFrame>> {
        match self.format {
            CaptureFormat::Json => Ok(serde_json::from_slice(data)?),
            CaptureFormat::MessagePack => Ok(rmp_serde::from_slice(data)?),
            CaptureFormat::Bincode => Ok(bincode::deserialize(data)?),
        }
    }

    pub fn format(&self) -> CaptureFormat {
        self.format
    }
}
