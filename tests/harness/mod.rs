//! Test harness shared by the integration tests.
//!
//! Provides an echo server on a random local port, a minimal client that
//! performs the opening handshake by hand, and helpers for building
//! client-side frames.

#![allow(dead_code)]

mod client;
mod server;

pub use client::{TestClient, masked_frame, read_response_head};
pub use server::TestServer;
