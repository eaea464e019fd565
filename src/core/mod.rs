//! Core application modules
//!
//! This module contains configuration, constants, logging, the Messages
//! API client, and the smoke-test runner.

pub mod client;
pub mod config;
pub mod constants;
pub mod logging;
pub mod runner;

#[cfg(test)]
pub mod test_support;
