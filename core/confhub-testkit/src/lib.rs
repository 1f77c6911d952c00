//! Offline harness for schema authors: build a synthetic settings collection,
//! run a script against it, assert on the resulting state. Scripts go through
//! the same runner, sandbox and guard as production.

mod client;
mod error;
mod row;

pub use client::{TestClient, TestClientBuilder, run_script};
pub use error::HarnessError;
pub use row::{TestCell, TestRow};
