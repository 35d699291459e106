pub mod nonce;

pub use nonce::{NonceGenerator, OsRandom, RandomSource, RequestNonce};
