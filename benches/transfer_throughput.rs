//! Benchmark suite for transfer throughput
//!
//! Measures the cost of a full transfer (lock, validate, write, commit) when
//! transfers run one after another and when many contend for the same two
//! rows at once.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```

use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::runtime::Runtime;
use transfer_engine::{
    AccountId, AccountService, Currency, Database, TransferEngine, TransferRequest,
};

fn main() {
    divan::main();
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

/// Two funded NGN accounts on a fresh database
fn setup(rt: &Runtime) -> (TransferEngine, AccountId, AccountId) {
    rt.block_on(async {
        let db = Arc::new(Database::default());
        let service = AccountService::new(Arc::clone(&db));
        let a = service.create_account("bench-a", "NGN").await.expect("create a");
        let b = service.create_account("bench-b", "NGN").await.expect("create b");
        service
            .top_up(a.id, Decimal::from(1_000_000_000))
            .await
            .expect("top up a");
        service
            .top_up(b.id, Decimal::from(1_000_000_000))
            .await
            .expect("top up b");
        (TransferEngine::new(db), a.id, b.id)
    })
}

fn request(source: AccountId, destination: AccountId, reference: String) -> TransferRequest {
    TransferRequest {
        source_account_id: source,
        destination_account_id: destination,
        amount: Decimal::ONE,
        currency: Currency::new("NGN").expect("currency"),
        reference,
    }
}

/// Transfers issued one at a time
#[divan::bench(args = [10, 100, 1_000])]
fn sequential_transfers(bencher: divan::Bencher, count: usize) {
    let rt = runtime();
    bencher
        .with_inputs(|| setup(&rt))
        .bench_values(|(engine, a, b)| {
            rt.block_on(async {
                for i in 0..count {
                    engine
                        .execute_transfer(request(a, b, format!("seq-{}", i)))
                        .await
                        .expect("transfer");
                }
            })
        });
}

/// Transfers fired concurrently in both directions between the same pair
#[divan::bench(args = [10, 100, 1_000])]
fn contended_bidirectional_transfers(bencher: divan::Bencher, count: usize) {
    let rt = runtime();
    bencher
        .with_inputs(|| setup(&rt))
        .bench_values(|(engine, a, b)| {
            rt.block_on(async {
                let handles = (0..count).map(|i| {
                    let engine = engine.clone();
                    let (source, destination) = if i % 2 == 0 { (a, b) } else { (b, a) };
                    tokio::spawn(async move {
                        engine
                            .execute_transfer(request(source, destination, format!("con-{}", i)))
                            .await
                    })
                });
                for result in join_all(handles).await {
                    result.expect("task panicked").expect("transfer");
                }
            })
        });
}

/// Replaying a reference that already committed
#[divan::bench]
fn idempotent_replay(bencher: divan::Bencher) {
    let rt = runtime();
    let (engine, a, b) = setup(&rt);
    rt.block_on(engine.execute_transfer(request(a, b, "replay".to_string())))
        .expect("first transfer");

    bencher.bench_local(|| {
        rt.block_on(engine.execute_transfer(request(a, b, "replay".to_string())))
            .expect("replay")
    });
}
