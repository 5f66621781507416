//! Test helper utilities
//!
//! Shared utilities for testing classtrack-server

pub mod seed;
pub mod stub_provider;

// Re-export commonly used items
#[allow(unused_imports)]
pub use seed::{seed_class, seed_session, seed_student, seed_tutor, ts};
#[allow(unused_imports)]
pub use stub_provider::{participant, span, StubProvider};
