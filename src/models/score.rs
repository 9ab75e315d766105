//! Structural score tree read by system layout
//!
//! The layout engine borrows this data, it never owns it: staves, parts and
//! the measure chain live in arenas on [`Score`], and systems refer to them
//! through index handles (`MeasureId`, staff indices). Removing a measure
//! from a system therefore never destroys the measure itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::style::LayoutStyle;

/// Tracks per staff; staff index * VOICES is the staff's first track
pub const VOICES: usize = 4;

/// Handle to a measure in the score's measure arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeasureId(pub usize);

/// Handle to a system, used for measure back-references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SystemId(pub usize);

/// Score display mode. Continuous view renders the whole score as one long
/// system and only maintains partial skylines between full relayouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    Page,
    Continuous,
}

/// Kind of a vertical spacer attached to a measure/staff boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpacerKind {
    /// Elastic spacer constraining the gap above a staff
    Up,
    /// Elastic spacer constraining the gap below a staff
    Down,
    /// Mandatory exact gap below a staff; overrides all other constraints
    Fixed,
}

/// User-placed vertical spacing constraint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacer {
    pub kind: SpacerKind,
    pub gap: f64,
}

/// Kind of a staff-grouping bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketKind {
    Normal,
    Brace,
    Square,
    Line,
    /// Placeholder carrying column information without a drawable bracket
    NoBracket,
}

/// Bracket attachment on a staff: spans `span` staves starting at the staff
/// it is attached to, stacked horizontally by `column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketItem {
    pub kind: BracketKind,
    pub span: usize,
    pub column: usize,
}

/// One logical stave of the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    /// Number of staff lines (1 for percussion-style single-line staves)
    pub lines: u32,
    /// Distance between adjacent lines, in spatiums
    pub line_distance: f64,
    /// Per-staff magnification
    pub mag: f64,
    pub visible: bool,
    /// User-specified extra distance above this staff
    pub user_dist: f64,
    pub brackets: Vec<BracketItem>,
}

impl Default for Staff {
    fn default() -> Self {
        Self {
            lines: 5,
            line_distance: 1.0,
            mag: 1.0,
            visible: true,
            user_dist: 0.0,
            brackets: Vec::new(),
        }
    }
}

impl Staff {
    /// Intrinsic height: distance from the top to the bottom staff line
    pub fn height(&self, style: &LayoutStyle) -> f64 {
        (self.lines.saturating_sub(1)) as f64 * self.line_distance * self.mag * style.spatium
    }

    pub fn is_one_line(&self) -> bool {
        self.lines <= 1
    }
}

/// An instrument name entry on a part, with its measured width.
///
/// Text measurement is not this engine's concern; the editor shell measures
/// the rendered label and stores the width here, the same way measured cell
/// widths are fed into line layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffName {
    pub name: String,
    /// Vertical anchor rule index (see `NameAnchor`)
    pub anchor_pos: u8,
    pub width: f64,
}

/// A part groups a contiguous run of staves played by one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub long_names: Vec<StaffName>,
    pub short_names: Vec<StaffName>,
    pub nstaves: usize,
}

impl Part {
    pub fn new(nstaves: usize) -> Self {
        Self {
            long_names: Vec::new(),
            short_names: Vec::new(),
            nstaves,
        }
    }
}

/// An ordinary measure: notes live elsewhere; layout only needs its width,
/// its spacer attachments and the system back-reference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Measure {
    pub width: f64,
    pub bbox: crate::models::geometry::RectF,
    /// System currently displaying this measure, if any
    pub system: Option<SystemId>,
    pub page_break: bool,
    spacers_up: BTreeMap<usize, Spacer>,
    spacers_down: BTreeMap<usize, Spacer>,
}

impl Measure {
    /// Measure with a laid-out width and no spacers attached
    pub fn with_width(width: f64) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn vspacer_up(&self, staff_idx: usize) -> Option<&Spacer> {
        self.spacers_up.get(&staff_idx)
    }

    pub fn vspacer_down(&self, staff_idx: usize) -> Option<&Spacer> {
        self.spacers_down.get(&staff_idx)
    }

    pub fn set_vspacer_up(&mut self, staff_idx: usize, spacer: Spacer) {
        self.spacers_up.insert(staff_idx, spacer);
    }

    pub fn set_vspacer_down(&mut self, staff_idx: usize, spacer: Spacer) {
        self.spacers_down.insert(staff_idx, spacer);
    }
}

/// Horizontal frame (e.g. a gap box between measures)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HBox {
    pub width: f64,
    pub bbox: crate::models::geometry::RectF,
    pub system: Option<SystemId>,
}

/// Vertical frame; a system can contain at most one, as its first entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VBox {
    pub height: f64,
    pub top_gap: f64,
    pub bottom_gap: f64,
    pub bbox: crate::models::geometry::RectF,
    pub system: Option<SystemId>,
}

/// Text frame; behaves like a vertical frame with content-derived height
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TBox {
    pub height: f64,
    pub top_gap: f64,
    pub bottom_gap: f64,
    pub bbox: crate::models::geometry::RectF,
    pub system: Option<SystemId>,
}

/// Entry in the score's measure chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasureBase {
    Measure(Measure),
    HBox(HBox),
    VBox(VBox),
    TBox(TBox),
}

impl MeasureBase {
    pub fn is_measure(&self) -> bool {
        matches!(self, MeasureBase::Measure(_))
    }

    pub fn is_vertical_frame(&self) -> bool {
        matches!(self, MeasureBase::VBox(_) | MeasureBase::TBox(_))
    }

    pub fn as_measure(&self) -> Option<&Measure> {
        match self {
            MeasureBase::Measure(m) => Some(m),
            _ => None,
        }
    }

    pub fn system(&self) -> Option<SystemId> {
        match self {
            MeasureBase::Measure(m) => m.system,
            MeasureBase::HBox(b) => b.system,
            MeasureBase::VBox(b) => b.system,
            MeasureBase::TBox(b) => b.system,
        }
    }

    pub fn set_system(&mut self, system: Option<SystemId>) {
        match self {
            MeasureBase::Measure(m) => m.system = system,
            MeasureBase::HBox(b) => b.system = system,
            MeasureBase::VBox(b) => b.system = system,
            MeasureBase::TBox(b) => b.system = system,
        }
    }

    pub fn page_break(&self) -> bool {
        match self {
            MeasureBase::Measure(m) => m.page_break,
            _ => false,
        }
    }
}

/// Element kinds whose ownership registration is delegated to the score
/// rather than held by a system (beams and measure frames).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreOwned {
    Beam(u32),
    MeasureBox(MeasureId),
}

/// The document-model arena a system layout pass reads from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Score {
    pub style: LayoutStyle,
    pub view_mode: ViewMode,
    pub staves: Vec<Staff>,
    pub parts: Vec<Part>,
    measures: Vec<MeasureBase>,
    registered: Vec<ScoreOwned>,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nstaves(&self) -> usize {
        self.staves.len()
    }

    pub fn staff(&self, idx: usize) -> Option<&Staff> {
        self.staves.get(idx)
    }

    pub fn add_measure(&mut self, mb: MeasureBase) -> MeasureId {
        self.measures.push(mb);
        MeasureId(self.measures.len() - 1)
    }

    pub fn measure(&self, id: MeasureId) -> Option<&MeasureBase> {
        self.measures.get(id.0)
    }

    pub fn measure_mut(&mut self, id: MeasureId) -> Option<&mut MeasureBase> {
        self.measures.get_mut(id.0)
    }

    /// Index of the first staff of the given part
    pub fn first_staff_of_part(&self, part_idx: usize) -> Option<usize> {
        if part_idx >= self.parts.len() {
            return None;
        }
        Some(self.parts[..part_idx].iter().map(|p| p.nstaves).sum())
    }

    /// Index of the last staff of the given part
    pub fn last_staff_of_part(&self, part_idx: usize) -> Option<usize> {
        let first = self.first_staff_of_part(part_idx)?;
        let n = self.parts[part_idx].nstaves;
        if n == 0 {
            return None;
        }
        Some(first + n - 1)
    }

    /// Part owning the given staff index
    pub fn part_of_staff(&self, staff_idx: usize) -> Option<usize> {
        let mut first = 0;
        for (pi, p) in self.parts.iter().enumerate() {
            if staff_idx < first + p.nstaves {
                return Some(pi);
            }
            first += p.nstaves;
        }
        None
    }

    /// True when the staff is the top staff of its part
    pub fn is_top_of_part(&self, staff_idx: usize) -> bool {
        match self.part_of_staff(staff_idx) {
            Some(pi) => self.first_staff_of_part(pi) == Some(staff_idx),
            None => false,
        }
    }

    /// Register an element whose ownership lives score-wide
    pub fn register_element(&mut self, el: ScoreOwned) {
        self.registered.push(el);
    }

    /// Drop a score-wide element registration; logs when it was never registered
    pub fn unregister_element(&mut self, el: ScoreOwned) {
        match self.registered.iter().position(|r| *r == el) {
            Some(i) => {
                self.registered.remove(i);
            }
            None => log::warn!("unregister_element: {:?} not found", el),
        }
    }

    pub fn registered_elements(&self) -> &[ScoreOwned] {
        &self.registered
    }

    pub fn is_continuous_view(&self) -> bool {
        self.view_mode == ViewMode::Continuous
    }

    /// Serialize the structural tree for the editor shell
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore a structural tree handed over by the editor shell
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
