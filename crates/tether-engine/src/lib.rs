//! Tether engine crate.
//!
//! Foundation pieces shared by the layout engine and the tools built on it:
//! logger bootstrap and the 2D coordinate type.

pub mod coords;
pub mod logging;
