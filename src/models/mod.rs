//! Models module for the system layout engine
//!
//! This module contains the data structures the layout engine reads
//! (score tree, style context) and the renderable elements it owns.

pub mod elements;
pub mod geometry;
pub mod score;
pub mod style;

// Re-export commonly used types
pub use elements::*;
pub use geometry::*;
pub use score::*;
pub use style::LayoutStyle;
