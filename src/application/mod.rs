// Application layer - use cases over the in-memory account store

mod clock;
mod config;
pub mod error;
mod ledger;
mod service;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use ledger::*;
pub use service::*;
