//! # Data Transfer Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | dt-03 Network | Frame encode / decode of protocol messages |
//! | dt-02 Channel Store | Channel record put / get / recovery scan |
//! | dt-01 Voucher Registry | Voucher encode / decode through a registered codec |

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dt_01_voucher_registry::{BincodeCodec, VoucherRegistry};
use dt_02_channel_store::{ChannelStateStore, ChannelStore, InMemoryKVStore};
use dt_03_network::{ErrorCode, MessageCodec, TransferMessage};
use serde::{Deserialize, Serialize};
use shared_types::{
    ChannelId, ChannelState, ChannelStatus, Cid, Direction, PeerId, Selector, TransferId,
    TypedPayload, VoucherType,
};
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BenchVoucher {
    deal: u64,
    label: String,
}

impl VoucherType for BenchVoucher {
    const TYPE: &'static str = "BenchVoucher";
}

fn channel_id(id: u64) -> ChannelId {
    ChannelId::new(PeerId::new("requester"), PeerId::new("provider"), TransferId(id))
}

fn open_message(voucher_size: usize) -> TransferMessage {
    TransferMessage::Open {
        channel_id: channel_id(1),
        direction: Direction::Pull,
        base_cid: Cid::new("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"),
        selector: Selector::all(),
        voucher: TypedPayload::new("BenchVoucher", vec![0xAB; voucher_size]),
    }
}

fn channel_state(id: u64) -> ChannelState {
    let mut state = ChannelState::new(
        channel_id(id),
        Direction::Pull,
        PeerId::new("requester"),
        Cid::new("bafy-root"),
        Selector::all(),
        TypedPayload::new("BenchVoucher", vec![1; 64]),
        1_700_000_000_000,
    );
    state.status = ChannelStatus::Transferring;
    state.received_bytes = id * 1024;
    state.received_blocks = id;
    state
}

// ============================================================================
// DT-03: Wire Codec
// ============================================================================

fn bench_message_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("dt-03-wire-codec");

    for voucher_size in [64usize, 1024, 16 * 1024] {
        let message = open_message(voucher_size);
        let mut codec = MessageCodec::default();
        let mut encoded = BytesMut::new();
        codec.encode(message.clone(), &mut encoded).unwrap();
        let frame = encoded.freeze();

        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("encode_open", voucher_size),
            &message,
            |b, message| {
                let mut codec = MessageCodec::default();
                b.iter(|| {
                    let mut buf = BytesMut::with_capacity(frame.len());
                    codec.encode(black_box(message.clone()), &mut buf).unwrap();
                    buf
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("decode_open", voucher_size),
            &frame,
            |b, frame| {
                let mut codec = MessageCodec::default();
                b.iter(|| {
                    let mut buf = BytesMut::from(&frame[..]);
                    codec.decode(black_box(&mut buf)).unwrap()
                })
            },
        );
    }

    let error = TransferMessage::error(channel_id(9), ErrorCode::Transport, "stalled");
    group.bench_function("encode_decode_error", |b| {
        let mut codec = MessageCodec::default();
        b.iter(|| {
            let mut buf = BytesMut::new();
            codec.encode(black_box(error.clone()), &mut buf).unwrap();
            codec.decode(&mut buf).unwrap()
        })
    });

    group.finish();
}

// ============================================================================
// DT-02: Channel Store
// ============================================================================

fn bench_channel_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("dt-02-channel-store");

    let store = ChannelStore::new(Arc::new(InMemoryKVStore::new()), "bench");
    let state = channel_state(1);
    group.bench_function("put_transition", |b| {
        b.iter(|| store.put(black_box(&state)).unwrap())
    });

    store.put(&state).unwrap();
    let id = state.channel_id.clone();
    group.bench_function("get", |b| b.iter(|| store.get(black_box(&id)).unwrap()));

    for channels in [100u64, 1_000] {
        let store = ChannelStore::new(Arc::new(InMemoryKVStore::new()), "bench");
        for id in 1..=channels {
            store.put(&channel_state(id)).unwrap();
        }
        group.throughput(Throughput::Elements(channels));
        group.bench_with_input(
            BenchmarkId::new("list_non_terminal", channels),
            &store,
            |b, store| b.iter(|| store.list_non_terminal().unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("highest_transfer_id", channels),
            &store,
            |b, store| {
                let requester = PeerId::new("requester");
                b.iter(|| store.highest_transfer_id(black_box(&requester)).unwrap())
            },
        );
    }

    group.finish();
}

// ============================================================================
// DT-01: Voucher Registry
// ============================================================================

fn bench_voucher_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("dt-01-voucher-registry");

    let registry = VoucherRegistry::new("voucher");
    registry
        .register(BenchVoucher::TYPE, BincodeCodec::<BenchVoucher>::new())
        .unwrap();
    let voucher = TypedPayload::from_typed(&BenchVoucher {
        deal: 42,
        label: "storage-deal".repeat(8),
    })
    .unwrap();
    let wire = registry.encode(&voucher).unwrap();

    group.bench_function("encode", |b| {
        b.iter(|| registry.encode(black_box(&voucher)).unwrap())
    });
    group.bench_function("decode", |b| {
        b.iter(|| registry.decode(&voucher.type_id, black_box(&wire)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_message_codec,
    bench_channel_store,
    bench_voucher_registry
);
criterion_main!(benches);
