//! BRICKSCAN — Marketplace Price Arbitrage Scanner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod budget;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod ledger;
pub mod scanner;
pub mod signals;
pub mod source;
pub mod storage;
pub mod types;
