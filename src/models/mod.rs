//! API data models
//!
//! This module contains the wire structures for the Anthropic Messages API.

pub mod claude;
