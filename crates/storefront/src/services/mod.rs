//! Business logic services for the storefront.
//!
//! Services sit between route handlers and the repositories in [`crate::db`].
//! They borrow the pool (and other shared state) for the duration of a
//! request and are cheap to construct per call.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod discount;
pub mod notification;
