use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use trickle_decoders::DecoderExt;
use trickle_decoders::common::{Endianness, NUL, int_decoder, long_decoder, utf8_string_decoder_em};
use trickle_tests::{Tree, decode_chunked, tree_decoder};
use trickle_wire::Decoder;

fn bench_scalars(c: &mut Criterion) {
    let bytes: Vec<u8> = (0..1024_i64).flat_map(i64::to_be_bytes).collect();
    let mut group = c.benchmark_group("scalars");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("long_vec_exact", |b| {
        let mut decoder = long_decoder(Endianness::Big).to_vec_exact(1024);
        b.iter(|| decoder.decode_slice(&bytes).get().unwrap());
    });
    group.bench_function("long_vec_exact_64b_chunks", |b| {
        let mut decoder = long_decoder(Endianness::Big).to_vec_exact(1024);
        b.iter(|| decode_chunked(&mut decoder, &bytes, 64));
    });
    group.finish();
}

fn bench_marker_strings(c: &mut Criterion) {
    let mut bytes = b"lorem ipsum dolor sit amet ".repeat(40);
    bytes.push(0);

    c.bench_function("marker_string_1kb", |b| {
        let mut decoder = utf8_string_decoder_em(NUL).unwrap();
        b.iter(|| decoder.decode_slice(&bytes).get().unwrap());
    });
}

fn bench_composed_trees(c: &mut Criterion) {
    let mut group = c.benchmark_group("composed_tree");

    for depth in [2_usize, 4, 6] {
        let tree = Tree::complete(3, depth);
        let bytes = tree.to_bytes();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("whole", format!("depth{depth}")),
            &bytes,
            |b, bytes| {
                let mut decoder = tree_decoder();
                b.iter(|| decoder.decode_slice(bytes).get().unwrap());
            },
        );
        group.bench_with_input(
            BenchmarkId::new("16b_chunks", format!("depth{depth}")),
            &bytes,
            |b, bytes| {
                let mut decoder = tree_decoder();
                b.iter(|| decode_chunked(&mut decoder, bytes, 16));
            },
        );
    }

    group.finish();
}

fn bench_prefixed_collection(c: &mut Criterion) {
    let mut bytes = 4096_i32.to_be_bytes().to_vec();
    bytes.extend((0..4096_i32).flat_map(i32::to_le_bytes));

    c.bench_function("int_vec_4096", |b| {
        let mut decoder = int_decoder(Endianness::Little).to_vec(int_decoder(Endianness::Big));
        b.iter(|| decoder.decode_slice(&bytes).get().unwrap());
    });
}

criterion_group!(
    benches,
    bench_scalars,
    bench_marker_strings,
    bench_composed_trees,
    bench_prefixed_collection
);
criterion_main!(benches);
