use crate::error::{LinkError, Result};
use crate::protocol::{MessageKind, HEADER_LEN};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

pub type SchemaVersion = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldType {
    U8 = 0,
    I32 = 1,
    I64 = 2,
    F32 = 3,
    Vec3 = 4,
    Quat = 5,
    String = 6,
}

impl FieldType {
    /// Encoded size; for strings, the size of the length prefix alone.
    pub fn min_size(self) -> usize {
        match self {
            FieldType::U8 => 1,
            FieldType::I32 | FieldType::F32 | FieldType::String => 4,
            FieldType::I64 => 8,
            FieldType::Vec3 => 12,
            FieldType::Quat => 16,
        }
    }

    pub fn is_fixed_size(self) -> bool {
        self != FieldType::String
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::U8 => "u8",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::F32 => "f32",
            FieldType::Vec3 => "vec3",
            FieldType::Quat => "quat",
            FieldType::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldSchema {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
        }
    }
}

/// Payload layout of one message kind, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSchema {
    pub kind: MessageKind,
    pub fields: Vec<FieldSchema>,
}

impl KindSchema {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields.push(FieldSchema::new(name, field_type));
        self
    }

    /// Smallest possible frame, header included.
    pub fn min_frame_len(&self) -> usize {
        HEADER_LEN + self.fields.iter().map(|f| f.field_type.min_size()).sum::<usize>()
    }

    pub fn is_fixed_size(&self) -> bool {
        self.fields.iter().all(|f| f.field_type.is_fixed_size())
    }

    pub fn describe(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.field_type.name()))
            .collect();
        format!("{}({})", self.kind.name(), fields.join(", "))
    }
}

/// Wire layouts for every message kind.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: AHashMap<MessageKind, KindSchema>,
    version: SchemaVersion,
}

impl SchemaRegistry {
    pub fn standard() -> Self {
        use FieldType::*;

        let schemas = [
            KindSchema::new(MessageKind::HeadTransform)
                .with_field("position", Vec3)
                .with_field("rotation", Quat)
                .with_field("has_anchor", U8),
            KindSchema::new(MessageKind::UserAvatar).with_field("avatar_id", I32),
            KindSchema::new(MessageKind::UserHit).with_field("hit_user_id", I64),
            KindSchema::new(MessageKind::ShootProjectile)
                .with_field("position", Vec3)
                .with_field("direction", Vec3),
            KindSchema::new(MessageKind::StageTransform)
                .with_field("position", Vec3)
                .with_field("rotation", Quat),
            KindSchema::new(MessageKind::ResetStage),
            KindSchema::new(MessageKind::ExplodeTarget),
            KindSchema::new(MessageKind::Commands).with_field("command", String),
            KindSchema::new(MessageKind::SpawnCommands)
                .with_field("name_id", String)
                .with_field("position", Vec3),
            KindSchema::new(MessageKind::UpdatePos)
                .with_field("id", String)
                .with_field("position", Vec3)
                .with_field("rotation", Quat),
            KindSchema::new(MessageKind::Delete).with_field("id", String),
            KindSchema::new(MessageKind::Color)
                .with_field("id", String)
                .with_field("color", Vec3),
        ];

        Self {
            schemas: schemas.into_iter().map(|s| (s.kind, s)).collect(),
            version: 1,
        }
    }

    /// Replaces the layout of a kind and bumps the registry version.
    pub fn register(&mut self, schema: KindSchema) {
        self.schemas.insert(schema.kind, schema);
        self.version += 1;
    }

    pub fn get(&self, kind: MessageKind) -> Option<&KindSchema> {
        self.schemas.get(&kind)
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn min_frame_len(&self, kind: MessageKind) -> usize {
        self.get(kind)
            .map(KindSchema::min_frame_len)
            .unwrap_or(HEADER_LEN)
    }

    /// Checks the kind byte and the minimum length of a raw frame.
    pub fn validate_frame(&self, data: &[u8]) -> Result<MessageKind> {
        let byte = *data
            .first()
            .ok_or_else(|| LinkError::InvalidMessage("empty frame".to_string()))?;
        let kind = MessageKind::try_from(byte)?;

        let needed = self.min_frame_len(kind);
        if data.len() < needed {
            return Err(LinkError::Truncated {
                needed,
                remaining: data.len(),
            });
        }
        Ok(kind)
    }

    /// Digest of the ordered kind table and every layout. Peers whose
    /// fingerprints differ cannot decode each other's frames.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"sharing-link");

        for kind in MessageKind::ALL {
            hasher.update(&[kind.as_u8()]);
            hasher.update(kind.name().as_bytes());

            if let Some(schema) = self.get(kind) {
                for field in &schema.fields {
                    hasher.update(field.name.as_bytes());
                    hasher.update(&[field.field_type as u8]);
                }
            }
            hasher.update(&[0xff]);
        }

        let hash = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(prefix)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
