//! Coordinate types shared by widgets and layouts.
//!
//! Logical pixels, origin top-left, +X right, +Y down.

mod vec2;

pub use vec2::Vec2;
