//! CLI command implementations

pub mod gamification;
pub mod init;
pub mod queue;
