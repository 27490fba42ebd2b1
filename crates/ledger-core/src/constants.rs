pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Bytes of the public-key digest kept in an address.
pub const ADDRESS_SIZE: usize = 20;
/// Base units per coin.
pub const COIN: u64 = 100_000_000;
pub const DEFAULT_BLOCK_REWARD: u64 = 20 * COIN;
pub const DEFAULT_GENESIS_SEED: &str = "ledger-genesis";
