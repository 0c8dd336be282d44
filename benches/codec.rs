//! Benchmarks for the message codec.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use burrow::message::{decode_response, encode_query};
use burrow::record::{RecordKey, RecordType};

fn encode_name(name: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    for label in name.split('.') {
        bytes.push(label.len() as u8);
        bytes.extend_from_slice(label.as_bytes());
    }
    bytes.push(0);
    bytes
}

fn record(host: &str, type_code: u16, ttl: u32, rdata: &[u8]) -> Vec<u8> {
    let mut bytes = encode_name(host);
    bytes.extend_from_slice(&type_code.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&ttl.to_be_bytes());
    bytes.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    bytes.extend_from_slice(rdata);
    bytes
}

/// A realistic referral: authority NS records plus glue, question echoed.
fn create_referral_response() -> Vec<u8> {
    let mut bytes = vec![0x12, 0x34, 0x80, 0x00, 0, 1, 0, 0, 0, 4, 0, 4];
    bytes.extend_from_slice(&encode_name("www.example.com"));
    bytes.extend_from_slice(&[0, 1, 0, 1]);
    for ns in ["a", "b", "c", "d"] {
        bytes.extend_from_slice(&record(
            "example.com",
            2,
            172800,
            &encode_name(&format!("ns-{ns}.example-dns.net")),
        ));
    }
    for (i, ns) in ["a", "b", "c", "d"].into_iter().enumerate() {
        bytes.extend_from_slice(&record(
            &format!("ns-{ns}.example-dns.net"),
            1,
            172800,
            &[192, 5, 6, 30 + i as u8],
        ));
    }
    bytes
}

/// The same referral with every repeated name squeezed through a pointer.
fn create_compressed_response() -> Vec<u8> {
    let mut bytes = vec![0x12, 0x34, 0x80, 0x00, 0, 1, 0, 0, 0, 4, 0, 0];
    let zone_offset = bytes.len() + 4; // "example.com" inside the question name
    bytes.extend_from_slice(&encode_name("www.example.com"));
    bytes.extend_from_slice(&[0, 1, 0, 1]);
    for ns in ["a", "b", "c", "d"] {
        bytes.extend_from_slice(&record(
            &format!("ns-{ns}.example-dns.net"),
            2,
            172800,
            &[0xC0, zone_offset as u8],
        ));
    }
    bytes
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let referral = create_referral_response();
    group.bench_function("referral_with_glue", |b| {
        b.iter(|| decode_response(black_box(&referral)));
    });

    let compressed = create_compressed_response();
    group.bench_function("compressed_names", |b| {
        b.iter(|| decode_response(black_box(&compressed)));
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let key = RecordKey::new("www.example.com", RecordType::A);
    group.bench_function("a_query", |b| {
        b.iter(|| encode_query(black_box(&key)));
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
