//! System container and per-staff layout records
//!
//! A `System` owns its `SysStaff` records, bracket instances, divider slots
//! and spanner segments; measures and staves are only referenced through
//! arena handles and outlive the system. All mutation is serialized through
//! the single layout call chain, so there is no interior locking anywhere.

use serde::{Deserialize, Serialize};

use crate::models::elements::{
    Bracket, DividerSide, HAlign, InstrumentName, SpannerSegment, SystemDivider, SystemElement,
};
use crate::models::geometry::{PointF, RectF};
use crate::models::score::{MeasureBase, MeasureId, Score, SystemId};
use crate::models::style::LayoutStyle;
use crate::skyline::Skyline;

use super::LayoutError;

/// Per-staff layout record: one per score staff, in score order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SysStaff {
    bbox: RectF,
    /// Extra vertical offset for 1-line staves (barline centering)
    y_off: f64,
    show: bool,
    skyline: Skyline,
    pub instrument_names: Vec<InstrumentName>,
    /// Remembered skyline distance for continuous view; never shrinks
    /// between full relayouts
    continuous_dist: f64,
    saved_y: f64,
    saved_height: f64,
}

impl SysStaff {
    pub fn new() -> Self {
        Self {
            show: true,
            ..Self::default()
        }
    }

    pub fn bbox(&self) -> &RectF {
        &self.bbox
    }

    pub fn bbox_mut(&mut self) -> &mut RectF {
        &mut self.bbox
    }

    pub fn y(&self) -> f64 {
        self.bbox.y
    }

    pub fn show(&self) -> bool {
        self.show
    }

    pub fn set_show(&mut self, show: bool) {
        self.show = show;
    }

    pub fn y_off(&self) -> f64 {
        self.y_off
    }

    pub fn set_y_off(&mut self, y_off: f64) {
        self.y_off = y_off;
    }

    pub fn skyline(&self) -> &Skyline {
        &self.skyline
    }

    pub fn skyline_mut(&mut self) -> &mut Skyline {
        &mut self.skyline
    }

    /// Bottom of the occupied space; falls back to the saved staff height
    /// when no skyline has been built
    pub fn y_bottom(&self) -> f64 {
        self.skyline.south().max().unwrap_or(self.saved_height)
    }

    /// Remember the stacked position so `restore_layout` can reproduce it
    pub fn save_layout(&mut self) {
        self.saved_y = self.bbox.y;
        self.saved_height = self.bbox.height;
    }

    pub fn restore_layout(&mut self) {
        self.bbox.set_y(self.saved_y);
        self.bbox.set_height(self.saved_height);
    }

    pub fn continuous_dist(&self) -> f64 {
        self.continuous_dist
    }

    pub fn set_continuous_dist(&mut self, dist: f64) {
        self.continuous_dist = dist;
    }

    /// Forget the continuous-view distance memory (full relayout)
    pub fn reset_continuous_dist(&mut self) {
        self.continuous_dist = 0.0;
    }
}

/// One horizontal line of music spanning all staves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct System {
    id: SystemId,
    pub(super) measures: Vec<MeasureId>,
    pub(super) staves: Vec<SysStaff>,
    pub(super) brackets: Vec<Bracket>,
    divider_left: Option<SystemDivider>,
    divider_right: Option<SystemDivider>,
    pub(super) spanner_segments: Vec<SpannerSegment>,
    bbox: RectF,
    pos: PointF,
    pub(super) left_margin: f64,
    pub(super) system_height: f64,
}

impl System {
    pub fn new(id: SystemId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    // ------------------------------------------------------------------
    // Measure list
    // ------------------------------------------------------------------

    pub fn measures(&self) -> &[MeasureId] {
        &self.measures
    }

    /// Append a measure to this system and take its back-reference
    pub fn append_measure(&mut self, score: &mut Score, id: MeasureId) -> Result<(), LayoutError> {
        let Some(mb) = score.measure_mut(id) else {
            return Err(LayoutError::UnknownMeasure(id));
        };
        mb.set_system(Some(self.id));
        self.measures.push(id);
        Ok(())
    }

    /// Drop a measure from the list; clears the back-reference when it still
    /// points at this system, but never destroys the measure itself
    pub fn remove_measure(&mut self, score: &mut Score, id: MeasureId) {
        self.measures.retain(|m| *m != id);
        if let Some(mb) = score.measure_mut(id) {
            if mb.system() == Some(self.id) {
                mb.set_system(None);
            }
        }
    }

    pub fn remove_last_measure(&mut self, score: &mut Score) {
        let Some(id) = self.measures.pop() else {
            return;
        };
        if let Some(mb) = score.measure_mut(id) {
            if mb.system() == Some(self.id) {
                mb.set_system(None);
            }
        }
    }

    /// Detach all measures and spanner segments; divider slots are reused
    pub fn clear(&mut self, score: &mut Score) {
        for id in self.measures.drain(..) {
            if let Some(mb) = score.measure_mut(id) {
                if mb.system() == Some(self.id) {
                    mb.set_system(None);
                }
            }
        }
        self.spanner_segments.clear();
    }

    /// A system can contain at most one vertical frame, as its first entry
    pub fn vbox(&self, score: &Score) -> Option<MeasureId> {
        let first = *self.measures.first()?;
        match score.measure(first) {
            Some(mb) if mb.is_vertical_frame() => Some(first),
            _ => None,
        }
    }

    pub fn first_measure(&self, score: &Score) -> Option<MeasureId> {
        self.measures
            .iter()
            .copied()
            .find(|id| score.measure(*id).is_some_and(MeasureBase::is_measure))
    }

    pub fn last_measure(&self, score: &Score) -> Option<MeasureId> {
        self.measures
            .iter()
            .rev()
            .copied()
            .find(|id| score.measure(*id).is_some_and(MeasureBase::is_measure))
    }

    pub fn page_break(&self, score: &Score) -> bool {
        self.measures
            .last()
            .and_then(|id| score.measure(*id))
            .is_some_and(MeasureBase::page_break)
    }

    // ------------------------------------------------------------------
    // Staff records
    // ------------------------------------------------------------------

    pub fn staves(&self) -> &[SysStaff] {
        &self.staves
    }

    pub fn staff(&self, idx: usize) -> Option<&SysStaff> {
        self.staves.get(idx)
    }

    pub fn staff_mut(&mut self, idx: usize) -> Option<&mut SysStaff> {
        self.staves.get_mut(idx)
    }

    /// Insert a fresh staff record; its y starts as a guess below its
    /// predecessor until `layout2` stacks it for real
    pub fn insert_staff(&mut self, style: &LayoutStyle, idx: usize) -> Result<(), LayoutError> {
        if idx > self.staves.len() {
            return Err(LayoutError::StaffIndexOutOfRange {
                index: idx,
                nstaves: self.staves.len(),
            });
        }
        let mut staff = SysStaff::new();
        if idx > 0 {
            staff.bbox.set_y(self.staves[idx - 1].y() + 6.0 * style.spatium);
        }
        self.staves.insert(idx, staff);
        Ok(())
    }

    pub fn remove_staff(&mut self, idx: usize) -> Result<(), LayoutError> {
        if idx >= self.staves.len() {
            return Err(LayoutError::StaffIndexOutOfRange {
                index: idx,
                nstaves: self.staves.len(),
            });
        }
        self.staves.remove(idx);
        Ok(())
    }

    /// Keep the staff records in lock-step with the score's staff count
    pub fn adjust_staves_number(&mut self, style: &LayoutStyle, nstaves: usize) {
        for i in self.staves.len()..nstaves {
            // cannot fail: i is always the current length
            let _ = self.insert_staff(style, i);
        }
        while self.staves.len() > nstaves {
            self.staves.pop();
        }
    }

    /// Staff visible both in the score and in this system's record
    pub(super) fn staff_visible(&self, score: &Score, idx: usize) -> bool {
        score.staff(idx).is_some_and(|s| s.visible) && self.staves.get(idx).is_some_and(SysStaff::show)
    }

    pub fn next_visible_staff(&self, score: &Score, staff_idx: usize) -> Option<usize> {
        (staff_idx + 1..self.staves.len()).find(|&i| self.staff_visible(score, i))
    }

    pub fn first_visible_staff(&self, score: &Score) -> Option<usize> {
        (0..self.staves.len()).find(|&i| self.staff_visible(score, i))
    }

    /// First staff record flagged visible, logging when there is none
    pub fn first_visible_sys_staff(&self) -> Option<usize> {
        let idx = self.staves.iter().position(SysStaff::show);
        if idx.is_none() {
            log::debug!("first_visible_sys_staff: no visible staff record");
        }
        idx
    }

    pub fn last_visible_sys_staff(&self) -> Option<usize> {
        let idx = self.staves.iter().rposition(SysStaff::show);
        if idx.is_none() {
            log::debug!("last_visible_sys_staff: no visible staff record");
        }
        idx
    }

    pub(super) fn first_sys_staff_of_part(&self, score: &Score, part_idx: usize) -> Option<usize> {
        score.first_staff_of_part(part_idx)
    }

    pub(super) fn first_visible_sys_staff_of_part(
        &self,
        score: &Score,
        part_idx: usize,
    ) -> Option<usize> {
        let first = self.first_sys_staff_of_part(score, part_idx)?;
        let last = score.last_staff_of_part(part_idx)?;
        (first..=last).find(|&i| self.staves.get(i).is_some_and(SysStaff::show))
    }

    // ------------------------------------------------------------------
    // Geometry accessors
    // ------------------------------------------------------------------

    pub fn bbox(&self) -> &RectF {
        &self.bbox
    }

    pub(super) fn bbox_mut(&mut self) -> &mut RectF {
        &mut self.bbox
    }

    pub fn pos(&self) -> PointF {
        self.pos
    }

    pub fn set_pos(&mut self, x: f64, y: f64) {
        self.pos = PointF::new(x, y);
    }

    pub fn width(&self) -> f64 {
        self.bbox.width
    }

    /// The page-layout pass stretches the system to its final width before
    /// the vertical pass runs
    pub fn set_width(&mut self, width: f64) {
        self.bbox.width = width;
    }

    pub fn height(&self) -> f64 {
        self.system_height
    }

    pub fn left_margin(&self) -> f64 {
        self.left_margin
    }

    /// Staff y in page coordinates; degenerate indices answer the system's
    /// own position
    pub fn staff_y_page(&self, staff_idx: usize) -> f64 {
        match self.staves.get(staff_idx) {
            Some(ss) => ss.y() + self.pos.y,
            None => self.pos.y,
        }
    }

    // ------------------------------------------------------------------
    // Attached elements
    // ------------------------------------------------------------------

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn spanner_segments(&self) -> &[SpannerSegment] {
        &self.spanner_segments
    }

    pub fn spanner_segments_mut(&mut self) -> &mut [SpannerSegment] {
        &mut self.spanner_segments
    }

    pub fn divider(&self, side: DividerSide) -> Option<&SystemDivider> {
        match side {
            DividerSide::Left => self.divider_left.as_ref(),
            DividerSide::Right => self.divider_right.as_ref(),
        }
    }

    /// Attach a renderable element. The element set is closed; misuse that
    /// is still expressible (stale staff index, duplicate segment) signals a
    /// modeling bug upstream and is logged, making the call a no-op.
    pub fn add(&mut self, score: &mut Score, el: SystemElement) {
        match el {
            SystemElement::InstrumentName(name) => {
                let idx = name.staff_idx;
                match self.staves.get_mut(idx) {
                    Some(ss) => ss.instrument_names.push(name),
                    None => log::warn!(
                        "add: instrument name staff index {} out of range ({} staves)",
                        idx,
                        self.staves.len()
                    ),
                }
            }
            SystemElement::Bracket(b) => self.brackets.push(b),
            SystemElement::SpannerSegment(seg) => {
                if cfg!(debug_assertions) && self.spanner_segments.contains(&seg) {
                    log::warn!("add: {:?} segment already attached", seg.kind);
                    return;
                }
                self.spanner_segments.push(seg);
            }
            SystemElement::SystemDivider(sd) => match sd.side {
                DividerSide::Left => self.divider_left = Some(sd),
                DividerSide::Right => self.divider_right = Some(sd),
            },
            SystemElement::ScoreOwned(owned) => score.register_element(owned),
        }
    }

    /// Detach a previously attached element; unknown elements are logged
    /// and the call is a no-op
    pub fn remove(&mut self, score: &mut Score, el: &SystemElement) {
        match el {
            SystemElement::InstrumentName(name) => {
                let Some(ss) = self.staves.get_mut(name.staff_idx) else {
                    log::warn!(
                        "remove: instrument name staff index {} out of range",
                        name.staff_idx
                    );
                    return;
                };
                match ss.instrument_names.iter().position(|n| n == name) {
                    Some(i) => {
                        ss.instrument_names.remove(i);
                    }
                    None => log::warn!("remove: instrument name '{}' not found", name.text),
                }
            }
            SystemElement::Bracket(b) => {
                let key = (b.track, b.column, b.kind, b.measure);
                match self
                    .brackets
                    .iter()
                    .position(|x| (x.track, x.column, x.kind, x.measure) == key)
                {
                    Some(i) => {
                        self.brackets.remove(i);
                    }
                    None => log::warn!("remove: bracket not found"),
                }
            }
            SystemElement::SpannerSegment(seg) => {
                match self.spanner_segments.iter().position(|s| s == seg) {
                    Some(i) => {
                        self.spanner_segments.remove(i);
                    }
                    None => log::warn!("remove: {:?} segment not found", seg.kind),
                }
            }
            SystemElement::SystemDivider(sd) => {
                let slot = match sd.side {
                    DividerSide::Left => &mut self.divider_left,
                    DividerSide::Right => &mut self.divider_right,
                };
                if slot.is_none() {
                    log::warn!("remove: no {:?} divider attached", sd.side);
                }
                *slot = None;
            }
            SystemElement::ScoreOwned(owned) => score.unregister_element(*owned),
        }
    }

    pub fn change(&mut self, score: &mut Score, old: &SystemElement, new: SystemElement) {
        self.remove(score, old);
        self.add(score, new);
    }

    // ------------------------------------------------------------------
    // Hit testing
    // ------------------------------------------------------------------

    /// Staff whose vertical band contains the canvas-relative `y`, expanded
    /// by a 2-spatium margin so drag and drop works just above/below the
    /// staff lines
    pub fn y2staff(&self, score: &Score, y: f64) -> Option<usize> {
        let y = y - self.pos.y;
        let margin = score.style.spatium * 2.0;
        self.staves
            .iter()
            .position(|s| y >= s.bbox.top() - margin && y < s.bbox.bottom() + margin)
    }

    /// Staff closest to `y` for drag targeting. `preferred_staff` gets the
    /// whole inter-staff gap as its hit zone; other boundaries split the gap
    /// at `spacing_factor`. May answer `nstaves` when `y` lies below
    /// `page_height`-bounded space of the last staff.
    pub fn search_staff(
        &self,
        score: &Score,
        y: f64,
        preferred_staff: Option<usize>,
        spacing_factor: f64,
        page_height: f64,
    ) -> usize {
        let nstaves = score.nstaves();
        let mut i = 0;
        while i < nstaves {
            if !self.staff_visible(score, i) {
                i += 1;
                continue;
            }
            let mut ni = i + 1;
            while ni < nstaves && !self.staff_visible(score, ni) {
                ni += 1;
            }

            let sy2 = if ni != nstaves {
                let s1y2 = self.staves[i].bbox.bottom();
                let next_top = self.staves[ni].bbox.y;
                if preferred_staff == Some(i) {
                    next_top
                } else if preferred_staff == Some(ni) {
                    s1y2
                } else {
                    s1y2 + (next_top - s1y2) * spacing_factor
                }
            } else {
                page_height - self.pos.y
            };
            if y > sy2 {
                i = ni;
                continue;
            }
            break;
        }
        i
    }

    // ------------------------------------------------------------------
    // Horizontal pass
    // ------------------------------------------------------------------

    /// Horizontal layout: resolve the left margin from instrument names and
    /// bracket columns, pre-position each staff's box at its intrinsic
    /// height, place brackets and name labels on the x axis. Vertical
    /// stacking is deferred to `layout2`.
    pub fn layout_system(
        &mut self,
        score: &Score,
        xo1: f64,
        is_first_system: bool,
        first_system_indent: bool,
    ) {
        if self.staves.is_empty() {
            // frame-only system
            return;
        }

        let style = &score.style;
        let name_offset = style.instrument_name_offset;

        let mut max_names_width = self.system_names_width(score);
        if is_first_system && first_system_indent {
            max_names_width = max_names_width.max(style.first_system_indentation);
        }

        // the margin reserves space for the widest bracket stack any system
        // could show, so staves align across systems with hidden staves
        let max_brackets_width = self.total_bracket_offset(score);
        let brackets_width = self.layout_brackets(score);
        let bracket_width_difference = max_brackets_width - brackets_width;
        self.left_margin = if max_names_width == 0.0 {
            if style.align_system_to_margin {
                bracket_width_difference
            } else {
                max_brackets_width
            }
        } else {
            max_names_width + bracket_width_difference + name_offset
        };

        for staff_idx in 0..self.staves.len() {
            if !self.staff_visible(score, staff_idx) {
                self.staves[staff_idx].bbox = RectF::default();
                continue;
            }
            // staff(idx) exists: staff_visible already looked it up
            let Some(staff) = score.staff(staff_idx) else {
                continue;
            };
            let x = self.left_margin + xo1;
            let ss = &mut self.staves;
            if staff.is_one_line() {
                let h = staff.line_distance * staff.mag * style.spatium;
                ss[staff_idx].bbox.set_rect(x, -h, 0.0, 2.0 * h);
            } else {
                let h = staff.height(style);
                ss[staff_idx].bbox.set_rect(x, 0.0, 0.0, h);
            }
        }

        self.set_brackets_x_position(xo1 + self.left_margin, style);

        // names get x positions for every staff here; which staves end up
        // hidden is only known after the vertical pass
        for ss in &mut self.staves {
            for name in &mut ss.instrument_names {
                name.pos.x = match name.align {
                    HAlign::Left => -brackets_width,
                    HAlign::Center => (max_names_width - name.width) / 2.0 - brackets_width,
                    HAlign::Right => max_names_width - name.width - brackets_width,
                };
            }
        }
    }
}
