//! Integration test crate for the Chroma colour pipeline.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every chroma crate to verify they work together.

#[cfg(test)]
mod fixtures;


#[cfg(test)]
mod composition;
