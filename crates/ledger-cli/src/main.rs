use anyhow::Result;
use clap::{Parser, Subcommand};
use ledger_core::constants::{COIN, DEFAULT_BLOCK_REWARD, DEFAULT_GENESIS_SEED};
use ledger_core::{sha256, Ledger, Signer, Wallet};
use std::sync::Arc;
use tokio::task;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Demonstrations of the UTXO ledger core")]
struct Cli {
    /// Bytes hashed into the genesis block hash
    #[arg(long, global = true, default_value = DEFAULT_GENESIS_SEED)]
    genesis_seed: String,
    /// Print the resulting chain as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reward Alice, then send part of it to Bob in a second block
    Demo {
        /// Coinbase amount in base units
        #[arg(long, default_value_t = DEFAULT_BLOCK_REWARD)]
        reward: u64,
        /// Amount Alice sends to Bob
        #[arg(long, default_value_t = COIN)]
        amount: u64,
    },
    /// Send several transfers from concurrent tasks and commit them in one block
    Parallel {
        /// Number of concurrent transfers
        #[arg(long, default_value_t = 4)]
        transfers: u64,
        /// Coinbase amount credited to Alice before the transfers
        #[arg(long, default_value_t = DEFAULT_BLOCK_REWARD)]
        reward: u64,
        /// Amount per transfer
        #[arg(long, default_value_t = COIN)]
        amount: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ledger = Arc::new(Ledger::new(sha256(cli.genesis_seed.as_bytes())));
    info!(seed = %cli.genesis_seed, "created ledger");

    match cli.cmd {
        Command::Demo { reward, amount } => run_demo(&ledger, reward, amount)?,
        Command::Parallel {
            transfers,
            reward,
            amount,
        } => run_parallel(Arc::clone(&ledger), transfers, reward, amount).await?,
    }

    ledger.verify()?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&ledger.snapshot())?);
    }
    Ok(())
}

fn run_demo(ledger: &Ledger, reward: u64, amount: u64) -> Result<()> {
    let alice = Wallet::new();
    let bob = Wallet::new();
    println!("Alice's address: {}", alice.address());
    println!("Bob's address:   {}", bob.address());

    ledger.reward(&alice.address(), reward);
    ledger.commit_pending()?;
    println!("Alice's balance: {}", coins(ledger.balance(&alice.address())));

    ledger.transfer(&alice, &bob.address(), amount)?;
    let block = ledger.commit_pending()?;
    println!(
        "Block {} ({}) committed",
        block.height,
        hex::encode(block.hash)
    );
    println!("Alice's balance: {}", coins(ledger.balance(&alice.address())));
    println!("Bob's balance:   {}", coins(ledger.balance(&bob.address())));
    Ok(())
}

async fn run_parallel(ledger: Arc<Ledger>, transfers: u64, reward: u64, amount: u64) -> Result<()> {
    let alice = Arc::new(Wallet::new());
    let bob = Wallet::new();
    println!("Alice's address: {}", alice.address());
    println!("Bob's address:   {}", bob.address());

    ledger.reward(&alice.address(), reward);
    ledger.commit_pending()?;
    println!("Alice's balance: {}", coins(ledger.balance(&alice.address())));

    let mut handles = Vec::new();
    for i in 0..transfers {
        let ledger = Arc::clone(&ledger);
        let alice = Arc::clone(&alice);
        let to = bob.address();
        handles.push(task::spawn(async move {
            let hash = ledger.transfer(alice.as_ref(), &to, amount)?;
            info!(task = i, tx = %hex::encode(hash), "submitted transfer");
            Ok::<_, ledger_core::LedgerError>(hash)
        }));
    }
    // Mining must see every transfer.
    for handle in handles {
        handle.await??;
    }

    let block = ledger.commit_pending()?;
    println!(
        "Block {} committed with {} transactions",
        block.height,
        block.data.len()
    );
    println!("Alice's balance: {}", coins(ledger.balance(&alice.address())));
    println!("Bob's balance:   {}", coins(ledger.balance(&bob.address())));
    Ok(())
}

fn coins(value: u64) -> String {
    format!("{}.{:08}", value / COIN, value % COIN)
}
