//! HTTP boundary: transfer submission, ledger reads and the live update
//! stream.

pub mod app;
pub mod middleware;
