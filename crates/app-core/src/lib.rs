//! Core application logic for Pawcart
//!
//! This crate contains the domain services behind the interactive screens:
//! checkout totals and selection/sheet synchronization, and the debounced
//! location search with reverse-geocode caching.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkout;
pub mod location;
