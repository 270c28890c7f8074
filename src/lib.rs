//! Typed message dispatch and encoding for shared sessions.
//!
//! Messages are broadcast over a host-provided [`Transport`] as
//! `[kind: u8][sender: i64][payload]` frames, each kind carried with a fixed
//! [`DeliveryPolicy`]. Inbound frames are routed by kind to handlers held in a
//! [`HandlerTable`], owned together with the transport by a [`SharingContext`].

pub mod protocol;
pub mod codec;
pub mod policy;
pub mod registry;
pub mod dispatch;
pub mod lifecycle;
pub mod transport;
pub mod context;
pub mod config;
pub mod schema;
pub mod capture;
pub mod error;
pub mod debug;

pub use protocol::{
    ChannelId, Message, MessageHeader, MessageKind, Quat, UserId, Vec3,
    HEADER_LEN, KINDS_END, KINDS_START, USER_CHANNEL_START, USER_MESSAGE_ID_START,
};

pub use codec::{
    InboundMessage, OutboundMessage,
};

pub use policy::{
    DeliveryPolicy, Priority, Reliability,
};

pub use registry::{
    Handler, HandlerTable,
};

pub use dispatch::{
    on_receive, Delivery,
};

pub use lifecycle::{
    Lifecycle, LifecycleState,
};

pub use transport::{
    Broadcast, MemoryTransport, Session, StaticSession, Transport,
};

pub use context::{
    ContextStats, SharingContext,
};

pub use config::SharingConfig;

pub use schema::{
    FieldSchema, FieldType, KindSchema, SchemaRegistry, SchemaVersion,
};

pub use capture::{
    CaptureFormat, CaptureLog, CaptureSerializer, CapturedFrame, Direction,
};

pub use error::{
    LinkError, Result,
};

pub use debug::{
    init_debug_mode, is_debug_enabled, is_trace_enabled,
    log_message, log_frame, trace_send, trace_receive, trace_skipped,
    format_bytes, message_summary,
};
