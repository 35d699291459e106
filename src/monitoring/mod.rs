pub mod stats;

pub use stats::{CspStats, StatsSnapshot};
