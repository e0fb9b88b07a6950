//! Domain models for the storefront.
//!
//! Row structs decoded by sqlx live next to the repository that reads them;
//! the types here are the validated shapes handlers and services work with.

pub mod discount;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use discount::DiscountCode;
pub use order::{Order, OrderItem, OrderReceipt};
pub use product::{Product, ProductSummary};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
