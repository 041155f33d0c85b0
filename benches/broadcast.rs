use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use framecast::encode::{FrameEncoder, JpegEncoder};
use framecast::events::EventBus;
use framecast::stream::{BroadcastScheduler, ClientConnection, ConnectionRegistry, FrameSink};
use framecast::{FrameBuffer, Resolution, TestPattern};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Accepts everything, keeps nothing
struct NullSink;

impl FrameSink for NullSink {
    fn is_connected(&self) -> bool {
        true
    }

    fn try_write(&self, payload: &Bytes) -> io::Result<usize> {
        Ok(payload.len())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

fn pattern_frame(resolution: Resolution) -> framecast::Frame {
    use framecast::FrameSource;
    let mut pattern = TestPattern::new(resolution, framecast::Framerate::FPS_30);
    block_on(pattern.next_frame()).expect("pattern frame")
}

// The pattern source never awaits, so a current-thread runtime is enough
fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn bench_jpeg_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("jpeg_encode");
    for resolution in [Resolution::VGA, Resolution::HD_720P] {
        let frame = pattern_frame(resolution);
        let encoder = JpegEncoder::new(85);
        group.bench_with_input(BenchmarkId::from_parameter(resolution), &frame, |b, frame| {
            b.iter(|| encoder.encode(black_box(frame)).expect("encode"))
        });
    }
    group.finish();
}

fn bench_tick_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_fanout");
    for clients in [1usize, 8, 64] {
        let frames = Arc::new(FrameBuffer::new());
        frames.publish(pattern_frame(Resolution::VGA));

        let registry = Arc::new(ConnectionRegistry::new(EventBus::default()));
        for n in 0..clients {
            let peer = format!("127.0.0.1:{}", 20000 + n).parse().expect("peer");
            let connection = ClientConnection::new(registry.next_id(), peer, Box::new(NullSink));
            registry.add(Arc::new(connection));
        }

        let scheduler = BroadcastScheduler::new(
            frames,
            registry,
            Arc::new(JpegEncoder::default()),
            Duration::from_millis(33),
        );
        group.bench_with_input(BenchmarkId::from_parameter(clients), &scheduler, |b, scheduler| {
            b.iter(|| scheduler.tick().expect("tick"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_jpeg_encode, bench_tick_fanout);
criterion_main!(benches);
