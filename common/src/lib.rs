//! Kursmon Common Types
//!
//! This crate contains shared types used across the kursmon workspace,
//! including exchange quotes, canonical rates, history records, the
//! workspace error type and the injectable clock.

pub mod rate;
pub mod record;
pub mod error;
pub mod time;

pub use rate::*;
pub use record::*;
pub use error::*;
pub use time::*;
