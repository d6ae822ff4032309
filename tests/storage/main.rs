//! Integration tests for Layer 1: Storage
//!
//! Tests for query keys, the world's mutation protocol, and index strategies.

mod teardown;
mod world;
