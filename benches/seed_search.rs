// seedalign/benches/seed_search.rs

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seedalign::aligner::SeedAligner;
use seedalign::cache::CacheIface;
use seedalign::constraint::Constraint;
use seedalign::ebwt::Ebwt;
use seedalign::metrics::SeedSearchMetrics;
use seedalign::penalty::Penalties;
use seedalign::read::Read;
use seedalign::results::SeedResults;
use seedalign::seed::Seed;
use seedalign::sinks::SinkSet;

const REF_LEN: usize = 100_000;
const READ_LEN: usize = 100;
const N_READS: usize = 64;

fn random_reference(rng: &mut StdRng) -> Vec<u8> {
    (0..REF_LEN).map(|_| rng.gen_range(0..4u8)).collect()
}

/// Reads sampled from the reference with sparse substitution errors.
fn sample_reads(rng: &mut StdRng, reference: &[u8]) -> Vec<Read> {
    (0..N_READS)
        .map(|i| {
            let start = rng.gen_range(0..reference.len() - READ_LEN);
            let mut seq: Vec<u8> = reference[start..start + READ_LEN].to_vec();
            for b in seq.iter_mut() {
                if rng.gen_bool(0.01) {
                    *b = (*b + rng.gen_range(1..4)) & 3;
                }
            }
            let ascii: Vec<u8> = seq.iter().map(|&c| seedalign::dna::decode_base(c)).collect();
            Read::from_ascii(&format!("r{}", i), &ascii, &vec![b'I'; READ_LEN])
        })
        .collect()
}

fn bench_seed_search(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xb1d1);
    let reference = random_reference(&mut rng);
    let mut rev = reference.clone();
    rev.reverse();
    let fw = Ebwt::build(&reference);
    let bw = Ebwt::build(&rev);
    let reads = sample_reads(&mut rng, &reference);
    let pens = Penalties::default();

    let mut group = c.benchmark_group("seed_search");
    for mms in [0u32, 1, 2] {
        let mut policies = Vec::new();
        Seed::mm_seeds(mms, 20, &mut policies, Constraint::default());
        group.bench_function(format!("mms{}", mms), |b| {
            let mut aligner = SeedAligner::new();
            let mut sr = SeedResults::new();
            let mut cache = CacheIface::new(1 << 16, None);
            let mut met = SeedSearchMetrics::new();
            b.iter(|| {
                for read in &reads {
                    cache.next_read();
                    aligner.instantiate_seeds(&policies, 5, read, &pens, 2.0, 0.1, &mut sr, &mut met);
                    aligner.search_all_seeds(
                        &fw,
                        &bw,
                        read,
                        &pens,
                        &mut cache,
                        &mut sr,
                        &mut met,
                        &SinkSet::new(),
                    );
                    black_box(sr.num_elts());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_seed_search);
criterion_main!(benches);
