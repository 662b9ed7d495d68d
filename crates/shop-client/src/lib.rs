//! REST collaborator clients for Pawcart
//!
//! This crate provides the cart/order API client and the geocoding API
//! client, plus the shared domain types they exchange. Service base URLs
//! are injected through [`ShopConfig`]; nothing here reads module-level
//! state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cart;
pub mod config;
pub mod geocode;
pub mod types;

pub use cart::{CartApi, CartApiError};
pub use config::ShopConfig;
pub use geocode::{GeocodeApi, GeocodeClient, GeocodeError};
pub use types::{CartItem, Coordinate, DisplayMeta, OrderReceipt, PlaceHit};
