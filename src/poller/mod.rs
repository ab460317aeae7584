/// Interval-driven fetch lifecycle shared by every panel
pub mod data_poller;

pub use data_poller::{fetch_once, DataPoller, PollContext};
