//! Benchmarks for the untrusted-input parsing paths: SPNEGO/base64
//! decoding, PAC buffer parsing, and RPC_SID decoding.

#![allow(clippy::unwrap_used, missing_docs)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gmsa_spnego::pac;
use gmsa_spnego::pac::sid::parse_rpc_sid;
use gmsa_spnego::spnego::decode_mech_token;

fn encode_rpc_sid(revision: u8, authority: u64, sub_authorities: &[u32]) -> Vec<u8> {
    let mut buf = vec![revision, sub_authorities.len() as u8];
    buf.extend_from_slice(&authority.to_be_bytes()[2..8]);
    for sa in sub_authorities {
        buf.extend_from_slice(&sa.to_le_bytes());
    }
    buf
}

fn bench_decode_mech_token_rejects_garbage(c: &mut Criterion) {
    let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02]);

    c.bench_function("spnego_decode_mech_token_invalid", |b| {
        b.iter(|| {
            let result = decode_mech_token(black_box(&encoded));
            black_box(result)
        })
    });
}

fn bench_rpc_sid_parse(c: &mut Criterion) {
    let buf = encode_rpc_sid(1, 5, &[21, 1_111_111, 2_222_222, 3_333_333, 1001]);

    c.bench_function("pac_parse_rpc_sid", |b| {
        b.iter(|| {
            let sid = parse_rpc_sid(black_box(&buf)).unwrap();
            black_box(sid)
        })
    });
}

fn bench_pac_parse_empty(c: &mut Criterion) {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());

    c.bench_function("pac_parse_zero_buffers", |b| {
        b.iter(|| {
            let decoded = pac::parse(black_box(&buf)).unwrap();
            black_box(decoded.logon_info.is_some())
        })
    });
}

criterion_group!(benches, bench_decode_mech_token_rejects_garbage, bench_rpc_sid_parse, bench_pac_parse_empty);
criterion_main!(benches);
