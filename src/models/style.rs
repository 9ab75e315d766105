//! Layout style context
//!
//! Every distance and policy flag the system layout reads, gathered into one
//! explicit context that is threaded into the layout calls. This replaces
//! key-based lookups against a score-global style table: the set of fields
//! below is exactly the set of keys this engine consumes.
//!
//! All distances are in score units (1 spatium = `spatium` units; defaults
//! use a 4.0-unit spatium so a 5-line staff is 16.0 units tall).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Style distances and policies consumed by system layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutStyle {
    /// Staff-space unit; most other distances are multiples of this
    pub spatium: f64,

    /// Smallest allowed gap between any two stacked skylines
    pub min_vertical_distance: f64,

    /// Base gap between staves of different parts
    pub staff_distance: f64,

    /// Base gap between staves of the same part (grand staff)
    pub akkolade_distance: f64,

    /// Replacement for both base gaps when vertical spread is enabled
    pub min_staff_spread: f64,

    /// Minimum gap between two systems (page view)
    pub min_system_distance: f64,

    /// Minimum gap between two systems when vertical spread is enabled
    pub min_system_spread: f64,

    /// Horizontal gap between stacked bracket columns
    pub bracket_distance: f64,

    /// Gap between instrument names and the bracket/staff block
    pub instrument_name_offset: f64,

    /// Extra left indentation applied to the first system
    pub first_system_indentation: f64,

    /// Spread staves/systems to fill the page vertically
    pub enable_vertical_spread: bool,

    /// Align a bracketless system flush with the left margin
    pub align_system_to_margin: bool,

    /// Keep single-staff brackets visible when hiding empty staves collapsed them
    pub always_show_brackets_when_empty_staves_are_hidden: bool,

    /// Suppress instrument names when the score has exactly one part
    pub hide_instrument_name_if_one_instrument: bool,

    /// Master switch for instrument names
    pub show_instrument_names: bool,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            spatium: 4.0,
            min_vertical_distance: 2.0,
            staff_distance: 26.0,
            akkolade_distance: 26.0,
            min_staff_spread: 14.0,
            min_system_distance: 34.0,
            min_system_spread: 34.0,
            bracket_distance: 2.0,
            instrument_name_offset: 4.0,
            first_system_indentation: 20.0,
            enable_vertical_spread: false,
            align_system_to_margin: false,
            always_show_brackets_when_empty_staves_are_hidden: false,
            hide_instrument_name_if_one_instrument: true,
            show_instrument_names: true,
        }
    }
}

/// Shared engraving defaults, for callers that never customize the style
static ENGRAVING_DEFAULTS: Lazy<LayoutStyle> = Lazy::new(LayoutStyle::default);

impl LayoutStyle {
    /// The stock engraving defaults as a shared reference
    pub fn engraving_defaults() -> &'static LayoutStyle {
        &ENGRAVING_DEFAULTS
    }

    /// Base gap between staves of different parts, honoring spread mode
    pub fn effective_staff_distance(&self) -> f64 {
        if self.enable_vertical_spread {
            self.min_staff_spread
        } else {
            self.staff_distance
        }
    }

    /// Base gap between staves of the same part, honoring spread mode
    pub fn effective_akkolade_distance(&self) -> f64 {
        if self.enable_vertical_spread {
            self.min_staff_spread
        } else {
            self.akkolade_distance
        }
    }

    /// Minimum system-to-system gap, honoring spread mode
    pub fn effective_system_distance(&self) -> f64 {
        if self.enable_vertical_spread {
            self.min_system_spread
        } else {
            self.min_system_distance
        }
    }
}
