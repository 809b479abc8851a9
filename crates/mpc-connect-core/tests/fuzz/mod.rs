//! Fuzz tests module
//!
//! Property-based testing using proptest to find edge cases:
//! - Status decoding
//! - Token validity and tier selection
//! - Poll backoff bounds

pub mod status_fuzz;
