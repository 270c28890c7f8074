use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sharing_link::{
    on_receive, CaptureFormat, CaptureLog, HandlerTable, Message, MessageKind, Quat, Vec3,
};

fn sample_messages() -> Vec<Message> {
    vec![
        Message::HeadTransform {
            position: Vec3::new(0.1, 1.6, -0.4),
            rotation: Quat::new(0.0, 0.38, 0.0, 0.92),
            has_anchor: 1,
        },
        Message::UpdatePos {
            id: "hologram-cube-0042".to_string(),
            position: Vec3::new(2.0, 0.5, 1.0),
            rotation: Quat::IDENTITY,
        },
        Message::Command {
            command: "select:hologram-cube-0042".to_string(),
        },
        Message::ResetStage,
    ]
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for message in sample_messages() {
        let size = message.encode(1).len();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(message.kind().name()),
            &message,
            |b, message| {
                b.iter(|| black_box(message.encode(black_box(7)).into_bytes()));
            },
        );
    }

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for message in sample_messages() {
        let frame = message.encode(1).into_bytes();
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(message.kind().name()),
            &frame,
            |b, frame| {
                b.iter(|| black_box(Message::decode_frame(frame).unwrap()));
            },
        );
    }

    group.finish();
}

fn benchmark_dispatch(c: &mut Criterion) {
    let mut table = HandlerTable::new();
    for kind in MessageKind::ALL {
        table.register_decoded(kind, |sender, message| {
            black_box((sender, message));
        });
    }

    let frames: Vec<_> = sample_messages()
        .iter()
        .map(|m| m.encode(3).into_bytes())
        .collect();

    c.bench_function("dispatch_decoded", |b| {
        b.iter(|| {
            for frame in &frames {
                black_box(on_receive(&mut table, frame));
            }
        });
    });
}

fn benchmark_capture_export(c: &mut Criterion) {
    let mut log = CaptureLog::new(1024);
    for (i, message) in sample_messages().iter().cycle().take(1024).enumerate() {
        let frame = message.encode(i as i64);
        log.record_outbound(message.kind(), message.kind().policy(), frame.as_bytes());
    }

    let mut group = c.benchmark_group("capture_export");

    for format in [CaptureFormat::Json, CaptureFormat::MessagePack, CaptureFormat::Bincode] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", format)),
            &format,
            |b, format| {
                b.iter(|| black_box(log.export(*format).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_encode,
    benchmark_decode,
    benchmark_dispatch,
    benchmark_capture_export,
);

criterion_main!(benches);
