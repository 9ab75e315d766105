//! System layout engine for a music notation editor
//!
//! A system is one horizontal line of music spanning all staves. This crate
//! keeps a system's visual layout consistent under interactive editing: it
//! computes the vertical stacking of staves, bracket placement, instrument
//! name placement and cross-staff spanner anchoring for one system, given
//! the score's structural tree and an explicit style context.
//!
//! Layout is single-threaded and synchronous; every pass runs to completion
//! on the editing thread. Degenerate input (fully hidden scores, empty
//! systems) degrades to a valid no-op layout instead of failing.

pub mod layout;
pub mod models;
pub mod skyline;

// Re-export commonly used types
pub use layout::{LayoutError, SysStaff, System};
pub use models::*;
pub use skyline::{Skyline, SkylineLine};
