//! Weighing Lab (WeighLab) Library
//!
//! Core functionality for turning a weighing into a concentration, a stock
//! debit, and a uniquely coded label.

pub mod build_info;
pub mod concentration;
pub mod config;
pub mod db;
pub mod error;
pub mod label;
pub mod ledger;
pub mod mcp;
pub mod measure;
pub mod models;
pub mod service;
pub mod tools;
