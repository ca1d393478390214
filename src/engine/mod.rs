//! Polling engine for Wallet Watch
//!
//! Lease-guarded poll cycles, their scheduler, and the persisted run state.

pub mod lock;
pub mod poller;
pub mod scheduler;

pub use lock::{PollLeaseGuard, PollLock};
pub use poller::{
    api_key_for, PollEngine, PollEngineConfig, PollOutcome, PollReport, PollRunState, PollTrigger,
    ServiceError,
};
pub use scheduler::PollScheduler;
