use crate::codec::{InboundMessage, OutboundMessage};
use crate::error::{LinkError, Result};
use serde::{Deserialize, Serialize};

/// Stable id of a session participant, prefixed into every outbound message.
pub type UserId = i64;

/// First message id not reserved for the transport's own control traffic.
pub const USER_MESSAGE_ID_START: u8 = 134;

/// First channel id not reserved by the transport.
pub const USER_CHANNEL_START: u8 = 16;

pub const KINDS_START: u8 = USER_MESSAGE_ID_START;
/// One past the last real kind (the `Max` sentinel).
pub const KINDS_END: u8 = KINDS_START + MessageKind::COUNT as u8;

/// Encoded size of the `[kind][sender]` header.
pub const HEADER_LEN: usize = 1 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    HeadTransform = USER_MESSAGE_ID_START,
    UserAvatar,
    UserHit,
    ShootProjectile,
    StageTransform,
    ResetStage,
    ExplodeTarget,
    Commands,
    SpawnCommands,
    UpdatePos,
    Delete,
    Color,
}

impl MessageKind {
    pub const COUNT: usize = 12;

    /// Every kind in wire order. New kinds are appended, never inserted.
    pub const ALL: [MessageKind; Self::COUNT] = [
        MessageKind::HeadTransform,
        MessageKind::UserAvatar,
        MessageKind::UserHit,
        MessageKind::ShootProjectile,
        MessageKind::StageTransform,
        MessageKind::ResetStage,
        MessageKind::ExplodeTarget,
        MessageKind::Commands,
        MessageKind::SpawnCommands,
        MessageKind::UpdatePos,
        MessageKind::Delete,
        MessageKind::Color,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Dense index into per-kind tables.
    pub fn index(self) -> usize {
        (self as u8 - KINDS_START) as usize
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        if (KINDS_START..KINDS_END).contains(&value) {
            Some(Self::ALL[(value - KINDS_START) as usize])
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::HeadTransform => "HeadTransform",
            MessageKind::UserAvatar => "UserAvatar",
            MessageKind::UserHit => "UserHit",
            MessageKind::ShootProjectile => "ShootProjectile",
            MessageKind::StageTransform => "StageTransform",
            MessageKind::ResetStage => "ResetStage",
            MessageKind::ExplodeTarget => "ExplodeTarget",
            MessageKind::Commands => "Commands",
            MessageKind::SpawnCommands => "SpawnCommands",
            MessageKind::UpdatePos => "UpdatePos",
            MessageKind::Delete => "Delete",
            MessageKind::Color => "Color",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = LinkError;

    fn try_from(value: u8) -> Result<Self> {
        MessageKind::from_u8(value).ok_or(LinkError::InvalidKind(value))
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u8())
    }
}

/// Logical sub-channels used by the transport for independent ordering lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelId {
    /// Transport-owned lane shared by avatar and stage traffic.
    Avatar = 3,
    Anchors = USER_CHANNEL_START,
}

impl ChannelId {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_user_channel(self) -> bool {
        self.as_u8() >= USER_CHANNEL_START
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        self.scale(rhs)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

impl From<[f32; 4]> for Quat {
    fn from(q: [f32; 4]) -> Self {
        Quat::new(q[0], q[1], q[2], q[3])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub kind: MessageKind,
    pub sender: UserId,
}

/// A fully decoded message, one variant per [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    HeadTransform {
        position: Vec3,
        rotation: Quat,
        has_anchor: u8,
    },
    UserAvatar {
        avatar_id: i32,
    },
    UserHit {
        hit_user_id: UserId,
    },
    ShootProjectile {
        position: Vec3,
        direction: Vec3,
    },
    StageTransform {
        position: Vec3,
        rotation: Quat,
    },
    ResetStage,
    ExplodeTarget,
    Command {
        command: String,
    },
    SpawnCommand {
        name_id: String,
        position: Vec3,
    },
    UpdatePos {
        id: String,
        position: Vec3,
        rotation: Quat,
    },
    Delete {
        id: String,
    },
    Color {
        id: String,
        color: Vec3,
    },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::HeadTransform { .. } => MessageKind::HeadTransform,
            Message::UserAvatar { .. } => MessageKind::UserAvatar,
            Message::UserHit { .. } => MessageKind::UserHit,
            Message::ShootProjectile { .. } => MessageKind::ShootProjectile,
            Message::StageTransform { .. } => MessageKind::StageTransform,
            Message::ResetStage => MessageKind::ResetStage,
            Message::ExplodeTarget => MessageKind::ExplodeTarget,
            Message::Command { .. } => MessageKind::Commands,
            Message::SpawnCommand { .. } => MessageKind::SpawnCommands,
            Message::UpdatePos { .. } => MessageKind::UpdatePos,
            Message::Delete { .. } => MessageKind::Delete,
            Message::Color { .. } => MessageKind::Color,
        }
    }

    /// Appends this message's payload. The header must already be written.
    pub fn encode_payload(&self, out: &mut OutboundMessage) {
        match self {
            Message::HeadTransform { position, rotation, has_anchor } => {
                out.write_transform(*position, *rotation);
                out.write_u8(*has_anchor);
            }
            Message::UserAvatar { avatar_id } => out.write_i32(*avatar_id),
            Message::UserHit { hit_user_id } => out.write_i64(*hit_user_id),
            Message::ShootProjectile { position, direction } => {
                out.write_vec3(*position);
                out.write_vec3(*direction);
            }
            Message::StageTransform { position, rotation } => {
                out.write_transform(*position, *rotation);
            }
            Message::ResetStage | Message::ExplodeTarget => {}
            Message::Command { command } => out.write_string(command),
            Message::SpawnCommand { name_id, position } => {
                out.write_string(name_id);
                out.write_vec3(*position);
            }
            Message::UpdatePos { id, position, rotation } => {
                out.write_string(id);
                out.write_transform(*position, *rotation);
            }
            Message::Delete { id } => out.write_string(id),
            Message::Color { id, color } => {
                out.write_string(id);
                out.write_vec3(*color);
            }
        }
    }

    /// Builds a complete frame: header followed by payload.
    pub fn encode(&self, sender: UserId) -> OutboundMessage {
        let mut out = OutboundMessage::begin(self.kind(), sender);
        self.encode_payload(&mut out);
        out
    }

    /// Decodes the payload of `kind`, with the cursor positioned after the header.
    pub fn decode(kind: MessageKind, input: &mut InboundMessage<'_>) -> Result<Self> {
        let message = match kind {
            MessageKind::HeadTransform => {
                let (position, rotation) = input.read_transform()?;
                Message::HeadTransform {
                    position,
                    rotation,
                    has_anchor: input.read_u8()?,
                }
            }
            MessageKind::UserAvatar => Message::UserAvatar {
                avatar_id: input.read_i32()?,
            },
            MessageKind::UserHit => Message::UserHit {
                hit_user_id: input.read_i64()?,
            },
            MessageKind::ShootProjectile => Message::ShootProjectile {
                position: input.read_vec3()?,
                direction: input.read_vec3()?,
            },
            MessageKind::StageTransform => {
                let (position, rotation) = input.read_transform()?;
                Message::StageTransform { position, rotation }
            }
            MessageKind::ResetStage => Message::ResetStage,
            MessageKind::ExplodeTarget => Message::ExplodeTarget,
            MessageKind::Commands => Message::Command {
                command: input.read_string()?,
            },
            MessageKind::SpawnCommands => Message::SpawnCommand {
                name_id: input.read_string()?,
                position: input.read_vec3()?,
            },
            MessageKind::UpdatePos => {
                let id = input.read_string()?;
                let (position, rotation) = input.read_transform()?;
                Message::UpdatePos { id, position, rotation }
            }
            MessageKind::Delete => Message::Delete {
                id: input.read_string()?,
            },
            MessageKind::Color => Message::Color {
                id: input.read_string()?,
                color: input.read_vec3()?,
            },
        };

        Ok(message)
    }

    /// Decodes a whole frame, header included.
    pub fn decode_frame(data: &[u8]) -> Result<(MessageHeader, Self)> {
        let mut input = InboundMessage::new(data);
        let header = input.read_header()?;
        let message = Self::decode(header.kind, &mut input)?;
        Ok((header, message))
    }
}
