// Identity derivation & identifier handling benchmarks.
//
// Covers recovery-phrase to key-pair derivation (PBKDF2 seed stretch plus
// the hardened identity path), hub token signing, identifier parsing, and
// address-mapping decoding at several document sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Map, Value};

use cruxpay_protocol::crypto::keys::derive_identity_keypair;
use cruxpay_protocol::identity::{BlockstackId, CruxId};
use cruxpay_protocol::network::GaiaHub;
use cruxpay_protocol::payment::AddressMapping;

const PHRASE: &str = "jelly level auction pluck system record unique huge text fold galaxy home";

fn bench_derive_identity(c: &mut Criterion) {
    c.bench_function("identity/derive_keypair", |b| {
        b.iter(|| derive_identity_keypair(black_box(PHRASE)));
    });
}

fn bench_hub_token(c: &mut Criterion) {
    let key_pair = derive_identity_keypair(PHRASE).expect("valid phrase");
    let challenge = r#"["gaiahub","0","hub.cruxpay.com","blockstack_storage_please_sign"]"#;

    c.bench_function("identity/hub_token", |b| {
        b.iter(|| GaiaHub::v0_token(key_pair.private_key_hex(), black_box(challenge)));
    });
}

fn bench_parse_identifiers(c: &mut Criterion) {
    c.bench_function("identifier/parse_crux", |b| {
        b.iter(|| CruxId::parse(black_box("alice@cruxdev.crux")));
    });

    c.bench_function("identifier/parse_blockstack", |b| {
        b.iter(|| BlockstackId::parse(black_box("alice.cruxdev.id")));
    });
}

fn bench_decode_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping/decode");

    for size in [1usize, 10, 100] {
        let document: Map<String, Value> = (0..size)
            .map(|i| {
                (
                    format!("asset-{i:04}"),
                    json!({"addressHash": format!("addr-{i:04}"), "secIdentifier": "memo"}),
                )
            })
            .collect();
        let document = Value::Object(document);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, doc| {
            b.iter(|| AddressMapping::decode(doc));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_derive_identity,
    bench_hub_token,
    bench_parse_identifiers,
    bench_decode_mapping,
);
criterion_main!(benches);
