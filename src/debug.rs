use crate::policy::DeliveryPolicy;
use crate::protocol::{Message, MessageHeader, MessageKind};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);
static TRACE_MODE: AtomicBool = AtomicBool::new(false);

/// Initialize debug mode from environment variables
///
/// - `SHARING_LINK_DEBUG=1`: log every decoded message as pretty JSON
/// - `SHARING_LINK_TRACE=1`: log every frame sent, received or skipped
pub fn init_debug_mode() {
    let debug = env_flag("SHARING_LINK_DEBUG");
    let trace = env_flag("SHARING_LINK_TRACE");

    set_debug_mode(debug, trace);

    if debug {
        debug!("debug mode enabled, messages will be logged as JSON");
    }
    if trace {
        debug!("trace mode enabled, frame activity will be logged");
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|value| flag_enabled(&value)).unwrap_or(false)
}

/// `1`, `true`, `yes` and `on` (any case) enable a flag; anything else,
/// including `0` and the empty string, leaves it off.
fn flag_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn set_debug_mode(debug: bool, trace: bool) {
    DEBUG_MODE.store(debug, Ordering::Relaxed);
    TRACE_MODE.store(trace, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn is_trace_enabled() -> bool {
    TRACE_MODE.load(Ordering::Relaxed)
}

/// Log a decoded message as JSON if debug mode is enabled
pub fn log_message(direction: &str, header: &MessageHeader, message: &Message) {
    if !is_debug_enabled() {
        return;
    }

    match serde_json::to_string_pretty(message) {
        Ok(json) => debug!(
            direction,
            kind = %header.kind,
            sender = header.sender,
            "message:\n{}",
            json
        ),
        Err(e) => debug!(error = %e, "failed to serialize message to JSON"),
    }
}

/// Log a raw frame by decoding it first. Undecodable frames are logged as hex.
pub fn log_frame(direction: &str, data: &[u8]) {
    if !is_debug_enabled() {
        return;
    }

    match Message::decode_frame(data) {
        Ok((header, message)) => log_message(direction, &header, &message),
        Err(e) => debug!(direction, error = %e, frame = %hex_preview(data, 32), "undecodable frame"),
    }
}

pub fn trace_send(kind: MessageKind, bytes: usize, policy: &DeliveryPolicy) {
    if !is_trace_enabled() {
        return;
    }

    trace!(
        %kind,
        size = %format_bytes(bytes),
        priority = ?policy.priority,
        reliability = ?policy.reliability,
        channel = ?policy.channel,
        "-> broadcast"
    );
}

pub fn trace_receive(kind: MessageKind, bytes: usize, handled: bool) {
    if !is_trace_enabled() {
        return;
    }

    trace!(%kind, size = %format_bytes(bytes), handled, "<- received");
}

pub fn trace_skipped(kind: MessageKind, reason: &str) {
    if !is_trace_enabled() {
        return;
    }

    trace!(%kind, reason, "send skipped");
}

/// Format bytes in human-readable format (KB, MB, etc.)
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn hex_preview(data: &[u8], max: usize) -> String {
    let mut out: String = data
        .iter()
        .take(max)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if data.len() > max {
        out.push_str(" ..");
    }
    out
}

/// One-line summary of a message
pub fn message_summary(message: &Message) -> String {
    match message {
        Message::HeadTransform { position, has_anchor, .. } => format!(
            "HeadTransform at ({:.2}, {:.2}, {:.2}) anchor={}",
            position.x, position.y, position.z, has_anchor
        ),
        Message::UserAvatar { avatar_id } => format!("UserAvatar {}", avatar_id),
        Message::UserHit { hit_user_id } => format!("UserHit user={}", hit_user_id),
        Message::ShootProjectile { position, .. } => format!(
            "ShootProjectile from ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        ),
        Message::StageTransform { position, .. } => format!(
            "StageTransform at ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        ),
        Message::ResetStage => "ResetStage".to_string(),
        Message::ExplodeTarget => "ExplodeTarget".to_string(),
        Message::Command { command } => format!("Command {:?}", command),
        Message::SpawnCommand { name_id, .. } => format!("SpawnCommand {:?}", name_id),
        Message::UpdatePos { id, .. } => format!("UpdatePos {:?}", id),
        Message::Delete { id } => format!("Delete {:?}", id),
        Message::Color { id, color } => format!(
            "Color {:?} ({:.2}, {:.2}, {:.2})",
            id, color.x, color.y, color.z
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Vec3;

    #[test]
    fn test_flag_enabled() {
        for value in ["1", "true", "TRUE", "Yes", "on", " 1 "] {
            assert!(flag_enabled(value), "{value:?} should enable");
        }
        for value in ["0", "false", "off", "no", "", "2"] {
            assert!(!flag_enabled(value), "{value:?} should not enable");
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 bytes");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
    }

    #[test]
    fn test_hex_preview() {
        assert_eq!(hex_preview(&[0x86, 0x01], 8), "86 01");
        assert_eq!(hex_preview(&[1, 2, 3], 2), "01 02 ..");
    }

    #[test]
    fn test_message_summary() {
        let message = Message::Color {
            id: "lamp".to_string(),
            color: Vec3::new(1.0, 0.0, 0.25),
        };
        assert_eq!(message_summary(&message), "Color \"lamp\" (1.00, 0.00, 0.25)");
        assert_eq!(message_summary(&Message::ResetStage), "ResetStage");
    }

    #[test]
    fn test_debug_mode_initialization() {
        // Should not crash without env vars
        init_debug_mode();
    }
}
