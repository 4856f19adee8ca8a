//! Valtrix - sales gamification and offline sync core
//!
//! Valtrix turns a salesperson's daily activity into motivation and keeps the
//! app usable without a connection.
//!
//! ## Components
//!
//! 1. **Gamification**: daily streaks, achievement unlocks, points and levels,
//!    persisted in SQLite.
//!
//! 2. **Offline queue**: mutations made while offline are stored locally and
//!    replayed in order, with bounded retries, once connectivity returns.

mod atomic_file;
pub mod config;
pub mod gamification;
pub mod offline;

pub use config::Config;
