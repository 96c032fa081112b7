//! # stow-test
//!
//! Integration tests for stow.
//!
//! This crate contains:
//! - Shared record types and store constructors
//! - A backend contract suite every [`Storer`](stow_store::Storer) must pass

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;

/// Backend contract checks
pub mod contract;
