//! Renderable elements attached to a system
//!
//! The set of element kinds a system can hold is closed: attachment is
//! dispatched over the [`SystemElement`] enum, so an element the layout does
//! not know about cannot be expressed at all. Beams and measure frames are
//! special in that the system only routes them — their ownership is
//! registered with the score.

use serde::{Deserialize, Serialize};

use super::geometry::{PointF, RectF};
use super::score::{BracketKind, MeasureId, ScoreOwned};

/// Long names show on the first system, short names on the rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentNameKind {
    Long,
    Short,
}

/// Vertical anchor rule for instrument names, relative to the part's staves
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameAnchor {
    /// Center across the whole part (first to last visible staff)
    PartCenter = 0,
    /// Center on the part's first staff
    FirstStaff = 1,
    /// Center between the first and second staff
    BetweenFirstAndSecond = 2,
    /// Center on the second staff
    SecondStaff = 3,
    /// Center between the second and third staff
    BetweenSecondAndThird = 4,
    /// Center on the third staff
    ThirdStaff = 5,
}

impl NameAnchor {
    /// Map a stored anchor index to a rule, defaulting to part-centering
    pub fn from_pos(pos: u8) -> Self {
        match pos {
            1 => NameAnchor::FirstStaff,
            2 => NameAnchor::BetweenFirstAndSecond,
            3 => NameAnchor::SecondStaff,
            4 => NameAnchor::BetweenSecondAndThird,
            5 => NameAnchor::ThirdStaff,
            _ => NameAnchor::PartCenter,
        }
    }
}

/// Horizontal alignment of instrument names in the name column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HAlign {
    Left,
    Center,
    #[default]
    Right,
}

/// A positioned instrument-name label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentName {
    pub text: String,
    pub kind: InstrumentNameKind,
    pub anchor: NameAnchor,
    pub align: HAlign,
    /// User offset applied after anchoring
    pub offset: PointF,
    /// Measured label width, supplied by the editor shell
    pub width: f64,
    /// Resolved position, written by layout
    pub pos: PointF,
    /// Staff whose name list currently holds this element
    pub staff_idx: usize,
}

impl InstrumentName {
    pub fn new(text: impl Into<String>, kind: InstrumentNameKind, staff_idx: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            anchor: NameAnchor::PartCenter,
            align: HAlign::default(),
            offset: PointF::default(),
            width: 0.0,
            pos: PointF::default(),
            staff_idx,
        }
    }
}

/// A laid-out bracket instance spanning a contiguous run of staves.
///
/// Identity for reuse across relayouts is the (track, column, kind, measure)
/// tuple; `first_staff`/`last_staff` are the visible span resolved by layout
/// and may be narrower than the declared item span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub kind: BracketKind,
    pub column: usize,
    /// Track of the staff the bracket item is attached to
    pub track: usize,
    /// Measure the bracket sits in front of; `None` means front of system
    pub measure: Option<MeasureId>,
    /// Span declared on the originating bracket item
    pub declared_span: usize,
    pub first_staff: usize,
    pub last_staff: usize,
    pub generated: bool,
    pub pos: PointF,
    pub width: f64,
    pub height: f64,
    /// False when hidden staves collapsed the bracket away
    pub visible: bool,
}

impl Bracket {
    /// True when `staff_idx` lies within this bracket's resolved span
    pub fn contains_staff(&self, staff_idx: usize) -> bool {
        staff_idx >= self.first_staff && staff_idx <= self.last_staff
    }
}

/// Spanner kinds whose segments can be attached to a system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpannerKind {
    Slur,
    Tie,
    Hairpin,
    Ottava,
    Trill,
    Vibrato,
    Volta,
    Pedal,
    TextLine,
    LyricsLine,
    Glissando,
    LetRing,
    PalmMute,
}

/// One system's segment of a spanner (slur, hairpin, ottava, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpannerSegment {
    pub kind: SpannerKind,
    pub start_staff: usize,
    pub end_staff: usize,
    pub rect: RectF,
}

impl SpannerSegment {
    pub fn new(kind: SpannerKind, start_staff: usize, end_staff: usize) -> Self {
        Self {
            kind,
            start_staff,
            end_staff,
            rect: RectF::default(),
        }
    }

    /// A segment whose endpoints sit on different staves is re-anchored
    /// after vertical stacking
    pub fn is_cross_staff(&self) -> bool {
        self.start_staff != self.end_staff
    }
}

/// Which side of the system break a divider marker sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DividerSide {
    Left,
    Right,
}

/// System divider marker shown between systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDivider {
    pub side: DividerSide,
    pub pos: PointF,
}

/// Closed enumeration of everything attachable to a system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SystemElement {
    InstrumentName(InstrumentName),
    Bracket(Bracket),
    SpannerSegment(SpannerSegment),
    SystemDivider(SystemDivider),
    /// Ownership registered with the score, not the system
    ScoreOwned(ScoreOwned),
}
