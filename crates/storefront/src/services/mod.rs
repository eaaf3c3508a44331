//! Business logic built on top of the repositories: pricing, checkout,
//! fulfillment transitions, and notification fan-out.

pub mod checkout;
pub mod notifications;
pub mod orders;
pub mod pricing;
