use crate::codec::InboundMessage;
use crate::protocol::{Message, MessageKind, UserId};
use tracing::{trace, warn};

/// Raw handler: receives the cursor positioned just after the kind byte.
pub type Handler = Box<dyn FnMut(&mut InboundMessage<'_>) + Send>;

/// One optional handler per message kind, indexed densely by kind.
pub struct HandlerTable {
    handlers: [Option<Handler>; MessageKind::COUNT],
}

impl HandlerTable {
    pub fn new() -> Self {
        Self {
            handlers: std::array::from_fn(|_| None),
        }
    }

    /// Installs `handler` for `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: MessageKind, handler: F)
    where
        F: FnMut(&mut InboundMessage<'_>) + Send + 'static,
    {
        if self.handlers[kind.index()].is_some() {
            trace!(%kind, "replacing handler");
        }
        self.handlers[kind.index()] = Some(Box::new(handler));
    }

    /// Installs a handler that receives the sender and the decoded message.
    /// Frames that fail to decode are dropped with a warning.
    pub fn register_decoded<F>(&mut self, kind: MessageKind, mut handler: F)
    where
        F: FnMut(UserId, Message) + Send + 'static,
    {
        self.register(kind, move |input| {
            let decoded = input
                .read_sender()
                .and_then(|sender| Message::decode(kind, input).map(|m| (sender, m)));

            match decoded {
                Ok((sender, message)) => handler(sender, message),
                Err(e) => warn!(%kind, error = %e, "dropping malformed message"),
            }
        });
    }

    pub fn unregister(&mut self, kind: MessageKind) -> bool {
        self.handlers[kind.index()].take().is_some()
    }

    pub fn unregister_all(&mut self) {
        for slot in self.handlers.iter_mut() {
            *slot = None;
        }
    }

    pub fn is_registered(&self, kind: MessageKind) -> bool {
        self.handlers[kind.index()].is_some()
    }

    pub fn registered_count(&self) -> usize {
        self.handlers.iter().filter(|h| h.is_some()).count()
    }

    /// Runs the handler for `kind`, if any. Returns whether one ran.
    pub fn dispatch(&mut self, kind: MessageKind, input: &mut InboundMessage<'_>) -> bool {
        match self.handlers[kind.index()].as_mut() {
            Some(handler) => {
                handler(input);
                true
            }
            None => false,
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<_> = MessageKind::ALL
            .iter()
            .filter(|k| self.is_registered(**k))
            .map(|k| k.name())
            .collect();

        f.debug_struct("HandlerTable")
            .field("registered", &registered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::OutboundMessage;
    use crate::protocol::{Vec3, HEADER_LEN};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_register_then_dispatch_runs_once() {
        let mut table = HandlerTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        for kind in MessageKind::ALL {
            let calls = Arc::clone(&calls);
            let seen = Arc::clone(&seen);
            table.register(kind, move |input| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().push(input.read_sender().unwrap());
            });
        }

        for kind in MessageKind::ALL {
            let frame = OutboundMessage::begin(kind, kind.as_u8() as i64).into_bytes();
            let mut input = InboundMessage::new(&frame[1..]);
            assert!(table.dispatch(kind, &mut input));
        }

        assert_eq!(calls.load(Ordering::SeqCst), MessageKind::COUNT);
        let seen = seen.lock().unwrap();
        for (kind, sender) in MessageKind::ALL.iter().zip(seen.iter()) {
            assert_eq!(*sender, kind.as_u8() as i64);
        }
    }

    #[test]
    fn test_dispatch_without_handler_is_silent() {
        let mut table = HandlerTable::new();
        let frame = [0u8; HEADER_LEN - 1];
        let mut input = InboundMessage::new(&frame);

        assert!(!table.dispatch(MessageKind::Color, &mut input));
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut table = HandlerTable::new();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&hits);
        table.register(MessageKind::UserHit, move |_| first.lock().unwrap().push("first"));
        let second = Arc::clone(&hits);
        table.register(MessageKind::UserHit, move |_| second.lock().unwrap().push("second"));

        let mut input = InboundMessage::new(&[]);
        table.dispatch(MessageKind::UserHit, &mut input);

        assert_eq!(*hits.lock().unwrap(), vec!["second"]);
        assert_eq!(table.registered_count(), 1);
    }

    #[test]
    fn test_unregister_all_on_empty_table() {
        let mut table = HandlerTable::new();
        table.unregister_all();
        assert_eq!(table.registered_count(), 0);

        table.register(MessageKind::Delete, |_| {});
        table.register(MessageKind::Color, |_| {});
        assert!(table.unregister(MessageKind::Delete));
        assert!(!table.unregister(MessageKind::Delete));

        table.unregister_all();
        assert!(!table.is_registered(MessageKind::Color));
    }

    #[test]
    fn test_register_decoded() {
        let mut table = HandlerTable::new();
        let received = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&received);
        table.register_decoded(MessageKind::SpawnCommands, move |sender, message| {
            *sink.lock().unwrap() = Some((sender, message));
        });

        let message = Message::SpawnCommand {
            name_id: "tree".to_string(),
            position: Vec3::new(0.0, 1.0, 0.0),
        };
        let frame = message.encode(11).into_bytes();
        let mut input = InboundMessage::new(&frame[1..]);
        table.dispatch(MessageKind::SpawnCommands, &mut input);

        assert_eq!(*received.lock().unwrap(), Some((11, message)));
    }

    #[test]
    fn test_register_decoded_drops_malformed() {
        let mut table = HandlerTable::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        table.register_decoded(MessageKind::UserAvatar, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let frame = OutboundMessage::begin(MessageKind::UserAvatar, 1).into_bytes();
        let mut input = InboundMessage::new(&frame[1..]);
        assert!(table.dispatch(MessageKind::UserAvatar, &mut input));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
