//! WeighLab Tools module
//!
//! MCP tool implementations for the weighing lab.

pub mod compounds;
pub mod labels;
pub mod status;
pub mod weighing;
