//! Property tests for the message codec.
//!
//! Decoders must reject arbitrary input with an error rather than panic, and
//! every typed message must survive an encode/decode pass unchanged.

use proptest::prelude::*;
use sharing_link::{Message, MessageKind, Quat, SchemaRegistry, Vec3, HEADER_LEN};

fn vec3() -> impl Strategy<Value = Vec3> {
    (-1.0e6f32..1.0e6, -1.0e6f32..1.0e6, -1.0e6f32..1.0e6).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn quat() -> impl Strategy<Value = Quat> {
    (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0)
        .prop_map(|(x, y, z, w)| Quat::new(x, y, z, w))
}

fn message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (vec3(), quat(), any::<u8>()).prop_map(|(position, rotation, has_anchor)| {
            Message::HeadTransform { position, rotation, has_anchor }
        }),
        any::<i32>().prop_map(|avatar_id| Message::UserAvatar { avatar_id }),
        any::<i64>().prop_map(|hit_user_id| Message::UserHit { hit_user_id }),
        (vec3(), vec3()).prop_map(|(position, direction)| Message::ShootProjectile { position, direction }),
        Just(Message::ResetStage),
        ".{0,40}".prop_map(|command| Message::Command { command }),
        (".{0,20}", vec3(), quat()).prop_map(|(id, position, rotation)| {
            Message::UpdatePos { id, position, rotation }
        }),
        (".{0,20}", vec3()).prop_map(|(id, color)| Message::Color { id, color }),
    ]
}

proptest! {
    /// Arbitrary bytes never panic the frame decoder
    #[test]
    fn arbitrary_bytes_dont_crash_decoder(
        random_bytes in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let _result = Message::decode_frame(&random_bytes);
    }

    /// Arbitrary payloads behind a valid header never panic
    #[test]
    fn arbitrary_payloads_dont_crash_decoder(
        kind_index in 0..MessageKind::COUNT,
        sender in any::<i64>(),
        payload in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let kind = MessageKind::ALL[kind_index];
        let mut frame = vec![kind.as_u8()];
        frame.extend_from_slice(&sender.to_le_bytes());
        frame.extend_from_slice(&payload);

        if let Ok((header, _)) = Message::decode_frame(&frame) {
            prop_assert_eq!(header.kind, kind);
            prop_assert_eq!(header.sender, sender);
        }
    }

    /// Typed messages decode to what was encoded
    #[test]
    fn messages_survive_encoding(message in message(), sender in any::<i64>()) {
        let frame = message.encode(sender).into_bytes();
        prop_assert!(frame.len() >= HEADER_LEN);
        prop_assert!(SchemaRegistry::standard().validate_frame(&frame).is_ok());

        let (header, decoded) = Message::decode_frame(&frame).unwrap();
        prop_assert_eq!(header.sender, sender);
        prop_assert_eq!(decoded, message);
    }
}
