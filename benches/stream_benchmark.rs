//! Performance benchmarks for stream ingestion
//!
//! Measures line decoding and frame dispatch for responses of varying size.
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use difychat::sse::{parse_line, LineDecoder, SseLine};
use difychat::stream::StreamAccumulator;

/// Generate a streamed response body with `fragments` message frames
fn generate_stream_body(fragments: usize) -> Vec<u8> {
    let mut body = String::new();
    for i in 0..fragments {
        let frame = serde_json::json!({
            "event": "message",
            "answer": format!("第{}段采购说明，包含预算与流程。", i),
            "conversation_id": "conv-bench"
        });
        body.push_str(&format!("data: {}\n\n", frame));
    }
    body.push_str("data: {\"event\":\"message_end\",\"message_id\":\"msg-bench\"}\n\n");
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn ingest(body: &[u8], chunk_size: usize) -> usize {
    let mut decoder = LineDecoder::new();
    let mut accumulator = StreamAccumulator::new(None);
    let mut lines = Vec::new();

    for chunk in body.chunks(chunk_size) {
        lines.extend(decoder.decode(chunk));
    }
    lines.extend(decoder.finish());

    for line in &lines {
        match parse_line(line) {
            SseLine::Frame(frame) => {
                accumulator.apply(&frame);
            }
            SseLine::Done => break,
            SseLine::Skip | SseLine::Ignored => {}
        }
    }
    accumulator.full_answer().len()
}

/// Benchmark full ingestion with network-sized chunks
fn bench_stream_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_ingest");

    for size in [10, 100, 1000].iter() {
        let body = generate_stream_body(*size);
        group.throughput(Throughput::Bytes(body.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_fragments", size)),
            &body,
            |b, body| b.iter(|| black_box(ingest(black_box(body), 1024))),
        );
    }

    group.finish();
}

/// Benchmark decoding when chunks split most multibyte characters
fn bench_small_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_small_chunks");
    let body = generate_stream_body(100);
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk_size in [1, 7, 64].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_byte_chunks", chunk_size)),
            chunk_size,
            |b, &chunk_size| b.iter(|| black_box(ingest(black_box(&body), chunk_size))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_stream_ingest, bench_small_chunks);

criterion_main!(benches);
