use crate::capture::CaptureLog;
use crate::codec::InboundMessage;
use crate::config::SharingConfig;
use crate::debug;
use crate::dispatch::{self, Delivery};
use crate::error::Result;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::protocol::{Message, MessageKind, Quat, UserId, Vec3};
use crate::registry::HandlerTable;
use crate::transport::{Session, Transport};
use bytes::Bytes;
use tracing::{debug, trace};

/// Owns everything one participant needs to exchange sharing messages: the
/// transport, the identity source, the handler table and the lifecycle.
///
/// Handlers may be registered at any time. Listeners are installed on the
/// transport once the session becomes available (see [`SharingContext::tick`])
/// and removed exactly once by [`SharingContext::shutdown`] or on drop.
pub struct SharingContext<T: Transport, S: Session> {
    transport: T,
    session: S,
    config: SharingConfig,
    handlers: HandlerTable,
    lifecycle: Lifecycle,
    local_user_id: Option<UserId>,
    capture: Option<CaptureLog>,
    ticks_since_attempt: u32,
    stats: ContextStats,
}

impl<T: Transport, S: Session> SharingContext<T, S> {
    /// Builds an uninitialized context.
    ///
    /// Fails with [`LinkError::Config`](crate::LinkError::Config) if `config` does not pass
    /// [`SharingConfig::validate`].
    pub fn new(transport: T, session: S, config: SharingConfig) -> Result<Self> {
        config.validate()?;

        let capture = config
            .enable_capture
            .then(|| CaptureLog::new(config.capture_limit));
        let ticks_since_attempt = config.init_retry_ticks;

        Ok(Self {
            transport,
            session,
            config,
            handlers: HandlerTable::new(),
            lifecycle: Lifecycle::new(),
            local_user_id: None,
            capture,
            ticks_since_attempt,
            stats: ContextStats::default(),
        })
    }

    /// Builds a context and makes one initialization attempt right away.
    pub fn start(transport: T, session: S, config: SharingConfig) -> Result<Self> {
        let mut context = Self::new(transport, session, config)?;
        context.try_initialize();
        Ok(context)
    }

    /// Per-frame hook from the host. Retries initialization every
    /// `init_retry_ticks` ticks until the session is available.
    pub fn tick(&mut self) {
        if self.lifecycle.state() != LifecycleState::Uninitialized {
            return;
        }

        self.ticks_since_attempt = self.ticks_since_attempt.saturating_add(1);
        if self.ticks_since_attempt >= self.config.init_retry_ticks {
            self.try_initialize();
        }
    }

    /// Installs listeners for every kind and caches the local user id if the
    /// session is available. Returns whether the context is ready.
    pub fn try_initialize(&mut self) -> bool {
        if !self.lifecycle.record_attempt() {
            return self.lifecycle.is_ready();
        }
        self.ticks_since_attempt = 0;

        if !self.session.is_available() {
            trace!(attempt = self.lifecycle.init_attempts(), "session not available yet");
            return false;
        }

        for kind in MessageKind::ALL {
            self.transport.add_listener(kind);
        }

        let user_id = self.session.local_user_id();
        self.local_user_id = Some(user_id);
        debug!(user_id, "cached local user id");

        self.lifecycle.mark_ready()
    }

    /// Removes every listener and handler. Only the first call has any effect.
    pub fn shutdown(&mut self) {
        if !self.lifecycle.begin_shutdown() {
            return;
        }

        for kind in MessageKind::ALL {
            self.transport.remove_listener(kind);
        }
        self.handlers.unregister_all();
        self.local_user_id = None;

        self.lifecycle.finish_shutdown();
    }

    /// Same as [`SharingContext::shutdown`], for hosts with a disable hook.
    pub fn disable(&mut self) {
        self.shutdown();
    }

    pub fn register<F>(&mut self, kind: MessageKind, handler: F)
    where
        F: FnMut(&mut InboundMessage<'_>) + Send + 'static,
    {
        self.handlers.register(kind, handler);
    }

    pub fn register_decoded<F>(&mut self, kind: MessageKind, handler: F)
    where
        F: FnMut(UserId, Message) + Send + 'static,
    {
        self.handlers.register_decoded(kind, handler);
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerTable {
        &mut self.handlers
    }

    /// Encodes and broadcasts `message` with its kind's delivery policy.
    ///
    /// Returns `Ok(false)` without touching the transport when the context is
    /// not ready or the transport is disconnected.
    pub fn send(&mut self, message: &Message) -> Result<bool> {
        let kind = message.kind();

        let sender = match self.local_user_id {
            Some(id) if self.lifecycle.is_ready() => id,
            _ => {
                self.stats.skipped += 1;
                debug::trace_skipped(kind, "not ready");
                return Ok(false);
            }
        };

        if !self.transport.is_connected() {
            self.stats.skipped += 1;
            debug::trace_skipped(kind, "not connected");
            return Ok(false);
        }

        let mut out = self.transport.create_message(kind, sender);
        message.encode_payload(&mut out);

        let policy = kind.policy();
        debug::trace_send(kind, out.len(), &policy);
        debug::log_frame("outbound", out.as_bytes());
        if let Some(capture) = self.capture.as_mut() {
            capture.record_outbound(kind, policy, out.as_bytes());
        }

        self.transport.broadcast(out, policy)?;
        self.stats.sent += 1;
        Ok(true)
    }

    pub fn send_head_transform(&mut self, position: Vec3, rotation: Quat, has_anchor: u8) -> Result<bool> {
        self.send(&Message::HeadTransform {
            position,
            rotation,
            has_anchor,
        })
    }

    pub fn send_user_avatar(&mut self, avatar_id: i32) -> Result<bool> {
        self.send(&Message::UserAvatar { avatar_id })
    }

    pub fn send_user_hit(&mut self, hit_user_id: UserId) -> Result<bool> {
        self.send(&Message::UserHit { hit_user_id })
    }

    /// The spawn point is advanced along `direction` by the configured lead.
    pub fn send_shoot_projectile(&mut self, position: Vec3, direction: Vec3) -> Result<bool> {
        let lead = self.config.projectile_lead;
        self.send(&Message::ShootProjectile {
            position: position + direction * lead,
            direction,
        })
    }

    pub fn send_stage_transform(&mut self, position: Vec3, rotation: Quat) -> Result<bool> {
        self.send(&Message::StageTransform { position, rotation })
    }

    pub fn send_reset_stage(&mut self) -> Result<bool> {
        self.send(&Message::ResetStage)
    }

    pub fn send_explode_target(&mut self) -> Result<bool> {
        self.send(&Message::ExplodeTarget)
    }

    pub fn send_command(&mut self, command: &str) -> Result<bool> {
        self.send(&Message::Command {
            command: command.to_string(),
        })
    }

    pub fn send_spawn_command(&mut self, name_id: &str, position: Vec3) -> Result<bool> {
        self.send(&Message::SpawnCommand {
            name_id: name_id.to_string(),
            position,
        })
    }

    pub fn send_update_pos(&mut self, id: &str, position: Vec3, rotation: Quat) -> Result<bool> {
        self.send(&Message::UpdatePos {
            id: id.to_string(),
            position,
            rotation,
        })
    }

    pub fn send_color(&mut self, id: &str, color: Vec3) -> Result<bool> {
        self.send(&Message::Color {
            id: id.to_string(),
            color,
        })
    }

    pub fn send_delete(&mut self, id: &str) -> Result<bool> {
        self.send(&Message::Delete { id: id.to_string() })
    }

    /// Routes one delivered frame to its handler. For transports that push
    /// frames instead of being drained with [`SharingContext::pump`].
    ///
    /// # Panics
    ///
    /// Panics if the frame's kind byte is outside the registered kind range.
    pub fn on_receive(&mut self, raw: &[u8]) -> Delivery {
        if !self.lifecycle.is_ready() {
            return Delivery::Inactive;
        }

        if let Some(kind) = raw.first().and_then(|b| MessageKind::from_u8(*b)) {
            debug::log_frame("inbound", raw);
            if let Some(capture) = self.capture.as_mut() {
                capture.record_inbound(kind, raw);
            }
        }

        let delivery = dispatch::on_receive(&mut self.handlers, raw);
        match delivery {
            Delivery::Handled(kind) => {
                self.stats.received += 1;
                self.stats.handled += 1;
                debug::trace_receive(kind, raw.len(), true);
            }
            Delivery::Unhandled(kind) => {
                self.stats.received += 1;
                self.stats.unhandled += 1;
                debug::trace_receive(kind, raw.len(), false);
            }
            Delivery::Empty => {
                self.stats.empty += 1;
                trace!("dropped empty frame");
            }
            Delivery::Inactive => {}
        }
        delivery
    }

    /// Drains every frame the transport has delivered and dispatches each.
    /// Returns the number of frames processed.
    pub fn pump(&mut self) -> Result<usize> {
        if !self.lifecycle.is_ready() || !self.transport.is_connected() {
            return Ok(0);
        }

        let mut processed = 0;
        while let Some(frame) = self.transport.receive()? {
            self.on_receive(&frame);
            processed += 1;
        }
        Ok(processed)
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    pub fn local_user_id(&self) -> Option<UserId> {
        self.local_user_id
    }

    pub fn config(&self) -> &SharingConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn capture(&self) -> Option<&CaptureLog> {
        self.capture.as_ref()
    }

    /// Serializes the capture log in the configured `capture_format`.
    /// `None` when capture is disabled.
    pub fn export_capture(&self) -> Result<Option<Bytes>> {
        self.capture
            .as_ref()
            .map(|capture| capture.export(self.config.capture_format))
            .transpose()
    }

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            init_attempts: self.lifecycle.init_attempts(),
            ..self.stats.clone()
        }
    }
}

impl<T: Transport, S: Session> Drop for SharingContext<T, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub sent: u64,
    pub skipped: u64,
    /// Frames that carried a kind byte.
    pub received: u64,
    pub handled: u64,
    pub unhandled: u64,
    pub empty: u64,
    pub init_attempts: u32,
}
