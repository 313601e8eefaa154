//! h2check - HTTP/2 conformance probing toolkit
//!
//! This crate provides the substrate HTTP/2 conformance scenarios are built
//! on: a permissive frame codec, an HPACK compression context and a client
//! connection that turns the server's byte stream into ordered events.

pub mod config;
pub mod http;

pub use config::{ConfigError, TargetConfig};
