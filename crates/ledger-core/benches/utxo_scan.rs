use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{Blockchain, Signer, Transaction, Wallet};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::hint::black_box;

/// A chain of `blocks` blocks, each rewarding Alice and paying a random amount
/// from her to one of a handful of recipients.
fn busy_chain(blocks: u64) -> (Blockchain, Wallet) {
    let mut rng = StdRng::seed_from_u64(42);
    let alice = Wallet::from_secret([1u8; 32]);
    let recipients: Vec<Wallet> = (2..6).map(|seed| Wallet::from_secret([seed; 32])).collect();
    let mut chain = Blockchain::new([0u8; 32]);

    for height in 1..=blocks {
        let reward = Transaction::new_coinbase_with_nonce(alice.address(), 50, height);
        let block = chain.mine_block(vec![reward]).expect("fresh coinbase");
        chain.add_block(block).expect("next height");

        let to = &recipients[rng.gen_range(0..recipients.len())];
        let amount = rng.gen_range(1..10);
        let tx = Transaction::new_transfer(&alice, &to.address(), amount, &chain)
            .expect("alice is always funded");
        let block = chain.mine_block(vec![tx]).expect("unique transfer");
        chain.add_block(block).expect("next height");
    }
    (chain, alice)
}

fn bench_utxo_scan(c: &mut Criterion) {
    let (chain, alice) = busy_chain(500);
    let address = alice.address();

    c.bench_function("find_spendable_utxo_1000_blocks", |b| {
        b.iter(|| black_box(chain.find_spendable_utxo(black_box(&address))));
    });

    c.bench_function("mine_block_duplicate_scan_1000_blocks", |b| {
        let tx = Transaction::new_coinbase_with_nonce(alice.address(), 50, u64::MAX);
        b.iter(|| black_box(chain.mine_block(vec![tx.clone()])));
    });
}

criterion_group!(benches, bench_utxo_scan);
criterion_main!(benches);
