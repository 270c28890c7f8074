//! Routing of delivered frames to registered handlers.

use crate::codec::InboundMessage;
use crate::protocol::{MessageKind, KINDS_END, KINDS_START};
use crate::registry::HandlerTable;
use tracing::trace;

/// Outcome of routing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Handled(MessageKind),
    /// No handler is registered for the kind; the frame was dropped.
    Unhandled(MessageKind),
    /// The frame had no kind byte.
    Empty,
    /// The receiving context is not ready; the frame was dropped unread.
    Inactive,
}

/// Reads the kind byte of `raw` and hands the rest of the frame to its
/// handler. The sender header is left for the handler to read.
///
/// # Panics
///
/// Panics if the kind byte is outside `[KINDS_START, KINDS_END)`. Listeners
/// are only installed for that range, so such a frame means the sender and
/// receiver were built with different kind tables.
pub fn on_receive(table: &mut HandlerTable, raw: &[u8]) -> Delivery {
    let mut input = InboundMessage::new(raw);

    let Ok(byte) = input.read_u8() else {
        trace!("dropping empty frame");
        return Delivery::Empty;
    };

    let kind = match MessageKind::from_u8(byte) {
        Some(kind) => kind,
        None => panic!(
            "message kind {} outside registered range [{}, {})",
            byte, KINDS_START, KINDS_END
        ),
    };

    if table.dispatch(kind, &mut input) {
        Delivery::Handled(kind)
    } else {
        Delivery::Unhandled(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::OutboundMessage;
    use crate::protocol::{Message, Vec3};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_head_transform_scenario() {
        let mut table = HandlerTable::new();
        let result = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&result);
        table.register(MessageKind::HeadTransform, move |input| {
            let sender = input.read_sender().unwrap();
            let position = input.read_vec3().unwrap();
            let has_anchor = input.read_u8().unwrap();
            *sink.lock().unwrap() = Some((sender, position, has_anchor));
        });

        let mut frame = OutboundMessage::begin(MessageKind::HeadTransform, 42);
        frame.write_vec3(Vec3::new(1.0, 2.0, 3.0));
        frame.write_u8(1);
        let bytes = frame.into_bytes();

        assert_eq!(
            on_receive(&mut table, &bytes),
            Delivery::Handled(MessageKind::HeadTransform)
        );
        assert_eq!(
            *result.lock().unwrap(),
            Some((42, Vec3::new(1.0, 2.0, 3.0), 1))
        );
    }

    #[test]
    fn test_unhandled_kind_is_dropped() {
        let mut table = HandlerTable::new();
        let bytes = Message::ExplodeTarget.encode(1).into_bytes();

        assert_eq!(
            on_receive(&mut table, &bytes),
            Delivery::Unhandled(MessageKind::ExplodeTarget)
        );
    }

    #[test]
    fn test_empty_frame() {
        let mut table = HandlerTable::new();
        assert_eq!(on_receive(&mut table, &[]), Delivery::Empty);
    }

    #[test]
    #[should_panic(expected = "outside registered range")]
    fn test_out_of_range_kind_panics() {
        let mut table = HandlerTable::new();
        on_receive(&mut table, &[KINDS_END, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
