//! Interactive UI state for Pawcart
//!
//! This crate owns the state the rendering layer cannot: the draggable
//! bottom-sheet controller, the pointer-gesture tracker that feeds it, and
//! the cart selection store that drives the checkout sheet.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gesture;
pub mod selection;
pub mod sheet;
