use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use formstream::{DecoderEvent, Multipart, MultipartConfig};
use rand::{distributions::Alphanumeric, Rng};
use tokio::runtime::Runtime;

fn field_events(count: usize) -> Vec<DecoderEvent> {
    let mut rng = rand::thread_rng();
    let mut events: Vec<DecoderEvent> = (0..count)
        .map(|i| {
            let value: String = (&mut rng)
                .sample_iter(Alphanumeric)
                .take(64)
                .map(char::from)
                .collect();
            DecoderEvent::Field {
                name: format!("field{i}"),
                value,
                name_truncated: false,
                value_truncated: false,
            }
        })
        .collect();
    events.push(DecoderEvent::Finished);
    events
}

async fn drain_parts(events: Vec<DecoderEvent>, count: usize) {
    let mut multipart =
        Multipart::from_decoder(Ok(futures::stream::iter(events)), MultipartConfig::default());
    let mut parts = multipart.parts().unwrap();
    let mut seen = 0;
    while let Some(_part) = parts.next().await.unwrap() {
        seen += 1;
    }
    assert_eq!(seen, count);
}

fn part_stream_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("part_stream");
    group.sample_size(10);
    for count in [64usize, 512] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::new("drain_fields", count), |b| {
            b.iter(|| rt.block_on(drain_parts(field_events(count), count)));
        });
    }
    group.finish();
}

criterion_group!(benches, part_stream_benchmark);
criterion_main!(benches);
