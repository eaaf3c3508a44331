//! Request middleware and extractors.

pub mod identity;

pub use identity::{AdminUser, CurrentUser};
