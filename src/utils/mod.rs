//! Utility functions for code generation, URL checks, and request handling.
//!
//! - [`code_generator`] - Short code generation and custom name validation
//! - [`destination`] - Destination URL validation
//! - [`host`] - `Host` header normalization
//! - [`client_ip`] - Visitor IP resolution
//! - [`user_agent`] - Browser and OS classification

pub mod client_ip;
pub mod code_generator;
pub mod destination;
pub mod host;
pub mod user_agent;
