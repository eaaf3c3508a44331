//! Shared type definitions.

pub mod id;
pub mod money;
pub mod status;

pub use id::*;
pub use money::{discounted_unit_price, round_currency};
pub use status::{OrderStatus, PaymentMethod, PaymentStatus};
