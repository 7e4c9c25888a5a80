//! Structured configuration documents.
//!
//! Configuration actions parse the current file into one of these, apply a
//! named set of overrides and serialize it back, instead of overwriting whole
//! files.

pub mod ini;
pub mod managed_block;
pub mod sshd;

pub use ini::IniDocument;
pub use managed_block::ManagedBlock;
pub use sshd::SshdConfig;
