pub mod error;
pub mod metrics;
pub mod retry;
pub mod runner;
pub mod scanner;
pub mod state;
