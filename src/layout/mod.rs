//! System layout engine
//!
//! A [`System`](system::System) is one horizontal line of music spanning all
//! staves. Layout runs in two passes: `layout_system` resolves the
//! horizontal frame (left margin, bracket columns, instrument-name x
//! positions), then `layout2` stacks the staves vertically against skyline,
//! spacer and style constraints. `restore_layout2` cheaply re-applies a
//! previously saved vertical state.

pub mod brackets;
pub mod names;
pub mod system;
pub mod vertical;

pub use system::{SysStaff, System};

use thiserror::Error;

use crate::models::score::MeasureId;

/// Errors reported by the container operations.
///
/// Layout passes themselves never fail: degenerate geometry (no visible
/// staves, empty measure lists) is tolerated with a logged anomaly so a
/// fully-collapsed display cannot crash the editor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// A staff index outside the system's staff list was passed in
    #[error("staff index {index} out of range ({nstaves} staves)")]
    StaffIndexOutOfRange { index: usize, nstaves: usize },

    /// A measure handle that does not exist in the score arena
    #[error("unknown measure {0:?}")]
    UnknownMeasure(MeasureId),
}
