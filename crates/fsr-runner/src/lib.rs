pub mod config;
pub mod context;
pub mod harness;
pub mod runner;

pub use config::*;
pub use context::*;
pub use harness::*;
pub use runner::*;
