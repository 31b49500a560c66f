//! # CastChain Consensus Benchmarks
//!
//! Hot paths of a round, measured at validator-set sizes a network
//! actually reaches:
//!
//! | Path | Runs |
//! |------|------|
//! | Proof generation / verification | once per proof received |
//! | Winner selection | once per height over the proof bag |
//! | Claim tally | once per height over all claims |
//! | Canonical block selection | once per competing block |

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use cc_08_consensus::domain::tally_claims;
use cc_08_consensus::{create_proof, select_canonical, select_winner, verify_proof};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_types::{Address, Block, Proof, WinnerClaim};

const TIP: &str = "4f1c0a9d2e7b3c5a8f6e1d0b9a7c3e5f2d4b6a8c0e1f3a5b7d9c2e4f6a8b0c1d";

fn ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
}

fn proofs(count: usize, height: u64) -> Vec<Proof> {
    (0..count)
        .map(|i| {
            create_proof(
                Address::from(format!("0x{:040x}", i)),
                &format!("02{:064x}", i),
                height,
                TIP,
                ip(),
            )
        })
        .collect()
}

// ============================================================================
// PROOF CODEC
// ============================================================================

fn bench_proof_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof-codec");
    group.measurement_time(Duration::from_secs(5));

    let proof = proofs(1, 1)[0].clone();
    group.bench_function("create_proof", |b| {
        b.iter(|| {
            create_proof(
                black_box(proof.address.clone()),
                black_box(&proof.public_key),
                black_box(1),
                black_box(TIP),
                ip(),
            )
        })
    });
    group.bench_function("verify_proof", |b| b.iter(|| verify_proof(black_box(&proof))));
    group.finish();
}

// ============================================================================
// SELECTION
// ============================================================================

fn bench_winner_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("winner-selection");

    for size in [10usize, 100, 1_000, 10_000] {
        let bag = proofs(size, 7);
        let banned: HashSet<Address> = bag.iter().take(size / 10).map(|p| p.address.clone()).collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("select_winner", size), &bag, |b, bag| {
            b.iter(|| select_winner(black_box(bag), 7, black_box(&banned)))
        });

        let mut rng = rand::thread_rng();
        let claims: Vec<WinnerClaim> = (0..size)
            .map(|i| WinnerClaim {
                voter: Address::from(format!("0xvoter{:06}", i)),
                height: 7,
                winner: bag[rng.gen_range(0..bag.len().min(5))].clone(),
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("tally_claims", size), &claims, |b, claims| {
            b.iter(|| tally_claims(black_box(claims), 7, &HashSet::new()))
        });
    }
    group.finish();
}

// ============================================================================
// FORK CHOICE
// ============================================================================

fn bench_fork_choice(c: &mut Criterion) {
    let mut group = c.benchmark_group("fork-choice");

    for size in [2usize, 16, 128] {
        let candidates: Vec<(Block, IpAddr)> = (0..size)
            .map(|i| {
                let block = Block {
                    height: 12,
                    hash: String::new(),
                    prev_hash: TIP.to_string(),
                    validator: Address::from(format!("0x{:040x}", i)),
                    validator_proof: format!("{:064x}", i),
                    timestamp: 1_700_000_000 + i as i64,
                    size: 0,
                    chain_ref_id: String::new(),
                    transactions: Vec::new(),
                }
                .seal();
                (block, ip())
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("select_canonical", size), &candidates, |b, candidates| {
            b.iter(|| select_canonical(black_box(candidates)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_proof_codec,
    bench_winner_selection,
    bench_fork_choice
);
criterion_main!(benches);
