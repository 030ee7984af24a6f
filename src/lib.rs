#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod index;
pub mod pipeline;
pub mod stats;
pub mod storage;

pub use error::{AuditError, Result};
