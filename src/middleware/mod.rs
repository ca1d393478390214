//! Middleware for Wallet Watch

mod lazy_poll;

pub use lazy_poll::lazy_poll;
