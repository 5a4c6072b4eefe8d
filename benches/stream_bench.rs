use bytes::Bytes;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::stream;
use ndjson_stream::streaming::{EventNormalizer, FrameDecoder};
use ndjson_stream::{EventStream, StreamOptions};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use std::hint::black_box;

fn sample_body(updates: usize) -> String {
    let mut body = String::from("{\"type\":\"start\",\"request_id\":\"resp_1\",\"model\":\"m\"}\n");
    for i in 0..updates {
        body.push_str(&format!(
            "{{\"type\":\"update\",\"delta\":\"token {} of the response \"}}\n",
            i
        ));
        if i % 50 == 0 {
            body.push_str("{\"type\":\"ping\"}\n");
        }
    }
    body.push_str("{\"type\":\"tool_use_start\",\"tool_call_delta\":{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"search\"}}}\n");
    for part in ["{\\\"query\\\":", "\\\"rust ndjson\\\"", "}"] {
        body.push_str(&format!(
            "{{\"type\":\"tool_use_delta\",\"tool_call_delta\":{{\"index\":0,\"function\":{{\"arguments\":\"{}\"}}}}}}\n",
            part
        ));
    }
    body.push_str("{\"type\":\"tool_use_stop\"}\n");
    body.push_str("{\"type\":\"completion\",\"usage\":{\"input_tokens\":10,\"output_tokens\":500,\"total_tokens\":510},\"stop_reason\":\"end_turn\"}\n");
    body
}

fn benchmark_decode_and_normalize(c: &mut Criterion) {
    let body = sample_body(500);
    let mut group = c.benchmark_group("decode_normalize");
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk_size in [64usize, 1024, 16 * 1024] {
        group.bench_function(format!("chunk_{}", chunk_size), |b| {
            b.iter(|| {
                let mut decoder = FrameDecoder::new();
                let mut normalizer = EventNormalizer::new();
                let mut events = 0usize;
                for chunk in body.as_bytes().chunks(chunk_size) {
                    decoder.push(black_box(chunk)).unwrap();
                    while let Some(frame) = decoder.next_frame().unwrap() {
                        black_box(normalizer.normalize(frame).unwrap());
                        events += 1;
                    }
                }
                events
            });
        });
    }

    group.finish();
}

fn benchmark_collect(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let body = Bytes::from(sample_body(500));
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"));

    let mut group = c.benchmark_group("event_stream");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("collect", |b| {
        b.iter(|| {
            let chunks: Vec<std::io::Result<Bytes>> = (0..body.len())
                .step_by(1024)
                .map(|start| Ok(body.slice(start..(start + 1024).min(body.len()))))
                .collect();
            let events =
                EventStream::open(&headers, stream::iter(chunks), StreamOptions::default())
                    .unwrap();
            black_box(runtime.block_on(events.collect()).unwrap())
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_decode_and_normalize, benchmark_collect);
criterion_main!(benches);
