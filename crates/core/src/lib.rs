//! DRIVE Core - Shared domain library.
//!
//! This crate provides the types and rules shared by all DRIVE components:
//! - `storefront` - JSON API server for the shop (cart, checkout, auth)
//! - `cli` - Command-line tools for migrations, seeding and role management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything that decides *what* an order looks like
//! lives here so it can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and statuses
//! - [`cart`] - In-memory cart state with change notifications
//! - [`discount`] - Percent discount codes and their arithmetic
//! - [`checkout`] - Customer validation and order planning against live stock

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod discount;
pub mod types;

pub use types::*;
