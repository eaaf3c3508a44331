//! Domain models mirroring the relational rows.
//!
//! Repositories in [`crate::db`] map database rows into these structs;
//! route handlers serialize them directly onto the JSON surface.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod push;
pub mod user;

pub use address::Address;
pub use cart::{CartLine, CartView};
pub use order::{Order, OrderItem, OrderStatusHistory, PlacedOrder};
pub use product::Product;
pub use push::PushSubscription;
pub use user::User;
