use crate::protocol::{ChannelId, MessageKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    Immediate = 0,
    Medium = 1,
    Low = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Reliability {
    Unreliable = 0,
    /// Unreliable, but stale packets are discarded on arrival.
    UnreliableSequenced = 1,
    Reliable = 2,
    ReliableOrdered = 3,
}

impl Reliability {
    pub fn is_reliable(self) -> bool {
        matches!(self, Reliability::Reliable | Reliability::ReliableOrdered)
    }

    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            Reliability::UnreliableSequenced | Reliability::ReliableOrdered
        )
    }
}

/// How the transport should carry one message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryPolicy {
    pub priority: Priority,
    pub reliability: Reliability,
    pub channel: ChannelId,
}

impl DeliveryPolicy {
    pub const fn new(priority: Priority, reliability: Reliability, channel: ChannelId) -> Self {
        Self {
            priority,
            reliability,
            channel,
        }
    }
}

const fn avatar(priority: Priority, reliability: Reliability) -> DeliveryPolicy {
    DeliveryPolicy::new(priority, reliability, ChannelId::Avatar)
}

impl MessageKind {
    /// Delivery policy for this kind. Latest-value state (poses, positions,
    /// colors) is unreliable-sequenced; one-shot events are reliable.
    pub const fn policy(self) -> DeliveryPolicy {
        use Priority::*;
        use Reliability::*;

        match self {
            MessageKind::HeadTransform => avatar(Immediate, UnreliableSequenced),
            MessageKind::UserAvatar => avatar(Medium, Reliable),
            MessageKind::UserHit => avatar(Medium, ReliableOrdered),
            MessageKind::ShootProjectile => avatar(Immediate, Reliable),
            MessageKind::StageTransform => avatar(Immediate, ReliableOrdered),
            MessageKind::ResetStage => avatar(Immediate, ReliableOrdered),
            MessageKind::ExplodeTarget => avatar(Immediate, ReliableOrdered),
            MessageKind::Commands => avatar(Immediate, ReliableOrdered),
            MessageKind::SpawnCommands => avatar(Immediate, ReliableOrdered),
            MessageKind::UpdatePos => avatar(Immediate, UnreliableSequenced),
            MessageKind::Delete => avatar(Immediate, ReliableOrdered),
            MessageKind::Color => avatar(Immediate, UnreliableSequenced),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        use Priority::*;
        use Reliability::*;

        let expected = [
            (MessageKind::HeadTransform, Immediate, UnreliableSequenced),
            (MessageKind::UserAvatar, Medium, Reliable),
            (MessageKind::UserHit, Medium, ReliableOrdered),
            (MessageKind::ShootProjectile, Immediate, Reliable),
            (MessageKind::StageTransform, Immediate, ReliableOrdered),
            (MessageKind::ResetStage, Immediate, ReliableOrdered),
            (MessageKind::ExplodeTarget, Immediate, ReliableOrdered),
            (MessageKind::Commands, Immediate, ReliableOrdered),
            (MessageKind::SpawnCommands, Immediate, ReliableOrdered),
            (MessageKind::UpdatePos, Immediate, UnreliableSequenced),
            (MessageKind::Delete, Immediate, ReliableOrdered),
            (MessageKind::Color, Immediate, UnreliableSequenced),
        ];

        assert_eq!(expected.len(), MessageKind::COUNT);
        for (kind, priority, reliability) in expected {
            let policy = kind.policy();
            assert_eq!(policy.priority, priority, "{kind}");
            assert_eq!(policy.reliability, reliability, "{kind}");
            assert_eq!(policy.channel, ChannelId::Avatar, "{kind}");
        }
    }

    #[test]
    fn test_one_shot_events_are_reliable() {
        for kind in [
            MessageKind::UserHit,
            MessageKind::ResetStage,
            MessageKind::SpawnCommands,
            MessageKind::Delete,
        ] {
            assert!(kind.policy().reliability.is_reliable());
        }
        assert!(!MessageKind::HeadTransform.policy().reliability.is_reliable());
    }

    #[test]
    fn test_reliability_flags() {
        assert!(Reliability::UnreliableSequenced.is_ordered());
        assert!(!Reliability::Reliable.is_ordered());
        assert!(!Reliability::Unreliable.is_reliable());
    }
}
