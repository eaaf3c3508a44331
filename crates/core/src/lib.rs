//! SpareHub Core - Shared types library.
//!
//! This crate provides common types used across all SpareHub components:
//! - `storefront` - Customer-facing catalog, cart, and checkout service
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, order/payment status enums, money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
