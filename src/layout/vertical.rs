//! Vertical stacking of staves within a system
//!
//! `layout2` runs after measure layout and resolves the y position and
//! height of every visible staff. Each adjacent pair is separated by the
//! largest of: the base distance (staff or akkolade distance on top of the
//! upper staff's height), the lower staff's user distance, spacer
//! constraints, and the skyline collision distance plus the configured
//! minimum. A FIXED spacer short-circuits everything else to an exact gap.
//!
//! In continuous view only a partial skyline exists per pass, so the
//! skyline distance is remembered per staff and never shrinks until a full
//! relayout resets it.

use crate::models::elements::SpannerKind;
use crate::models::score::{MeasureBase, Score, Spacer, SpacerKind};

use super::system::System;

// Barline extent for 1-line staves, in half-spatium units: the barline runs
// two spatiums above and below the single line.
const ONE_LINE_BARLINE_FROM: f64 = -4.0;
const ONE_LINE_BARLINE_TO: f64 = 4.0;

impl System {
    /// Vertical layout: stack the visible staves, propagate the resulting
    /// height to the measures, then place brackets, instrument names and
    /// cross-staff spanner segments against the final staff positions.
    pub fn layout2(&mut self, score: &mut Score) {
        if let Some(vb) = self.vbox(score) {
            // frame-only system: the frame's own box is the system box
            let width = self.width();
            if let Some(mb) = score.measure_mut(vb) {
                let bbox = match mb {
                    MeasureBase::VBox(b) => {
                        b.bbox.set_rect(0.0, 0.0, width, b.top_gap + b.height + b.bottom_gap);
                        b.bbox
                    }
                    MeasureBase::TBox(b) => {
                        b.bbox.set_rect(0.0, 0.0, width, b.top_gap + b.height + b.bottom_gap);
                        b.bbox
                    }
                    _ => return,
                };
                *self.bbox_mut() = bbox;
            }
            return;
        }

        self.set_pos(0.0, 0.0);

        let mut visible_staves: Vec<usize> = Vec::new();
        for i in 0..self.staves.len() {
            if self.staff_visible(score, i) {
                visible_staves.push(i);
            } else {
                *self.staves[i].bbox_mut() = Default::default();
            }
        }

        let style = score.style.clone();
        let spatium = style.spatium;
        let min_vertical_distance = style.min_vertical_distance;
        let staff_distance = style.effective_staff_distance();
        let akkolade_distance = style.effective_akkolade_distance();

        if visible_staves.is_empty() {
            log::warn!(
                "layout2: no visible staves ({} in system, {} in score)",
                self.staves.len(),
                score.nstaves()
            );
            return;
        }

        let width = self.width();
        let left_margin = self.left_margin;
        let has_measure = self.first_measure(score).is_some();

        let mut y = 0.0;
        for (k, &si1) in visible_staves.iter().enumerate() {
            // staff indices in visible_staves were validated by staff_visible
            let Some(staff) = score.staff(si1) else {
                continue;
            };
            let staff_height = staff.height(&style);

            let (y_off, h) = if staff.is_one_line() {
                (
                    spatium * ONE_LINE_BARLINE_TO * 0.5,
                    spatium * (ONE_LINE_BARLINE_TO - ONE_LINE_BARLINE_FROM) * 0.5,
                )
            } else {
                (0.0, staff_height)
            };

            let next = visible_staves.get(k + 1).copied();
            let Some(si2) = next else {
                let ss = &mut self.staves[si1];
                ss.set_y_off(y_off);
                ss.bbox_mut().set_rect(left_margin, y - y_off, width - left_margin, h);
                ss.save_layout();
                break;
            };
            let Some(staff2) = score.staff(si2) else {
                continue;
            };

            let mut dist = staff_height;
            if score.part_of_staff(si1) == score.part_of_staff(si2) {
                let mag = if has_measure { staff.mag } else { 1.0 };
                dist += akkolade_distance * mag;
            } else {
                dist += staff_distance;
            }
            dist += staff2.user_dist;

            let mut fixed_space = false;
            for &mid in &self.measures {
                let Some(MeasureBase::Measure(m)) = score.measure(mid) else {
                    continue;
                };
                if let Some(sp) = m.vspacer_down(si1) {
                    if sp.kind == SpacerKind::Fixed {
                        dist = staff_height + sp.gap;
                        fixed_space = true;
                        break;
                    }
                    dist = dist.max(staff_height + sp.gap);
                }
                if let Some(sp) = m.vspacer_up(si2) {
                    dist = dist.max(sp.gap + staff_height);
                }
            }

            if !fixed_space {
                // in continuous view we normally only have a partial skyline
                // for the system; a full one is only built on a full layout,
                // so the distance is remembered between passes and grown
                // when necessary — it never shrinks until a full relayout
                let mut d = self.staves[si1]
                    .skyline()
                    .min_distance(self.staves[si2].skyline())
                    .unwrap_or(staff_height);
                if score.is_continuous_view() {
                    let previous = self.staves[si1].continuous_dist();
                    if d > previous {
                        self.staves[si1].set_continuous_dist(d);
                    } else {
                        d = previous;
                    }
                }
                dist = dist.max(d + min_vertical_distance);
            }

            let ss = &mut self.staves[si1];
            ss.set_y_off(y_off);
            ss.bbox_mut().set_rect(left_margin, y - y_off, width - left_margin, h);
            ss.save_layout();
            y += dist;
        }

        // visible_staves is non-empty here
        let last = visible_staves[visible_staves.len() - 1];
        self.system_height = self.staves[last].bbox().bottom();
        let height = self.system_height;
        self.bbox_mut().set_height(height);

        self.set_measure_height(score, height);
        self.layout_brackets_vertical(score);
        self.layout_instrument_names(score);
        self.layout_cross_staff_spanners();
    }

    /// Re-apply the vertical state saved by the last `layout2`; used when
    /// content changed but geometry did not. Reproduces the saved boxes and
    /// height exactly.
    pub fn restore_layout2(&mut self, score: &mut Score) {
        if self.vbox(score).is_some() {
            return;
        }
        for ss in &mut self.staves {
            ss.restore_layout();
        }
        let height = self.system_height;
        self.bbox_mut().set_height(height);
        self.set_measure_height(score, height);
    }

    /// Propagate the system height to every measure and frame on it
    pub fn set_measure_height(&self, score: &mut Score, height: f64) {
        let spatium = score.style.spatium;
        for &mid in &self.measures {
            match score.measure_mut(mid) {
                Some(MeasureBase::Measure(m)) => {
                    // measures overshoot the staves by one spatium on both ends
                    let w = m.width;
                    m.bbox.set_rect(0.0, -spatium, w, height + 2.0 * spatium);
                }
                Some(MeasureBase::HBox(b)) => {
                    let w = b.width;
                    b.bbox.set_rect(0.0, 0.0, w, height);
                }
                Some(MeasureBase::TBox(b)) => {
                    let h = b.top_gap + b.height + b.bottom_gap;
                    b.bbox.set_rect(0.0, 0.0, b.bbox.width, h);
                }
                Some(other) => {
                    log::warn!("set_measure_height: unhandled measure kind {}", kind_name(other));
                }
                None => log::warn!("set_measure_height: stale measure handle {:?}", mid),
            }
        }
    }

    /// Re-anchor spanner segments whose endpoints sit on different staves
    /// to the final staff positions
    fn layout_cross_staff_spanners(&mut self) {
        let geo: Vec<(f64, f64)> = self
            .staves
            .iter()
            .map(|s| (s.bbox().top(), s.bbox().bottom()))
            .collect();
        for seg in &mut self.spanner_segments {
            if seg.kind != SpannerKind::Slur || !seg.is_cross_staff() {
                continue;
            }
            let a = seg.start_staff.min(seg.end_staff);
            let b = seg.start_staff.max(seg.end_staff);
            let (Some(&(top, _)), Some(&(_, bottom))) = (geo.get(a), geo.get(b)) else {
                log::warn!(
                    "cross-staff segment references staves {}..{} outside system",
                    seg.start_staff,
                    seg.end_staff
                );
                continue;
            };
            seg.rect.set_y(top);
            seg.rect.set_height(bottom - top);
        }
    }

    // ------------------------------------------------------------------
    // Inter-system spacing (page layout)
    // ------------------------------------------------------------------

    /// Minimum distance between this system (above) and `other` (below)
    /// without element collisions. Frame-only systems use their frame gap
    /// constants instead of skylines.
    pub fn min_distance(&self, other: &System, score: &Score) -> f64 {
        let gaps = |id| match score.measure(id) {
            Some(MeasureBase::VBox(b)) => (b.top_gap, b.bottom_gap),
            Some(MeasureBase::TBox(b)) => (b.top_gap, b.bottom_gap),
            _ => (0.0, 0.0),
        };
        match (self.vbox(score), other.vbox(score)) {
            (Some(vb1), None) => return gaps(vb1).1.max(other.min_top()),
            (None, Some(vb2)) => return gaps(vb2).0.max(self.min_bottom(score)),
            (Some(vb1), Some(vb2)) => return gaps(vb2).0 + gaps(vb1).1,
            (None, None) => {}
        }

        let style = &score.style;
        let min_vertical_distance = style.min_vertical_distance;
        let mut dist = style.effective_system_distance();

        let nstaves = self.staves.len();
        let mut first_staff = 0;
        while first_staff + 1 < nstaves {
            let score_show = score.staff(first_staff).is_some_and(|s| s.visible);
            let other_show = other.staves.get(first_staff).is_some_and(|s| s.show());
            if score_show && other_show {
                break;
            }
            first_staff += 1;
        }
        let mut last_staff = nstaves.saturating_sub(1);
        while last_staff > 0 {
            let score_show = score.staff(last_staff).is_some_and(|s| s.visible);
            let self_show = self.staves.get(last_staff).is_some_and(|s| s.show());
            if score_show && self_show {
                break;
            }
            last_staff -= 1;
        }

        if let Some(staff) = score.staff(first_staff) {
            dist = dist.max(staff.user_dist);
        }

        let mut fixed_down_distance = false;
        for &mid in &self.measures {
            let Some(MeasureBase::Measure(m)) = score.measure(mid) else {
                continue;
            };
            if let Some(sp) = m.vspacer_down(last_staff) {
                if sp.kind == SpacerKind::Fixed {
                    dist = sp.gap;
                    fixed_down_distance = true;
                    break;
                }
                dist = dist.max(sp.gap);
            }
        }
        if !fixed_down_distance {
            for &mid in &other.measures {
                let Some(MeasureBase::Measure(m)) = score.measure(mid) else {
                    continue;
                };
                if let Some(sp) = m.vspacer_up(first_staff) {
                    dist = dist.max(sp.gap);
                }
            }

            if let (Some(upper), Some(lower)) =
                (self.staves.get(last_staff), other.staves.get(first_staff))
            {
                if let Some(mut sld) = upper.skyline().min_distance(lower.skyline()) {
                    sld -= upper.bbox().height - min_vertical_distance;
                    dist = dist.max(sld);
                }
            }
        }
        dist
    }

    /// Minimum top margin: how far the first visible staff's content
    /// reaches above the system's top edge
    pub fn min_top(&self) -> f64 {
        let Some(si) = self.first_visible_sys_staff() else {
            return 0.0;
        };
        match self.staves[si].skyline().north().min() {
            Some(n) => -n,
            None => 0.0,
        }
    }

    /// Minimum bottom margin: how far the last visible staff's content
    /// hangs below the staff box
    pub fn min_bottom(&self, score: &Score) -> f64 {
        if let Some(vb) = self.vbox(score) {
            return match score.measure(vb) {
                Some(MeasureBase::VBox(b)) => b.bottom_gap,
                Some(MeasureBase::TBox(b)) => b.bottom_gap,
                _ => 0.0,
            };
        }
        let Some(si) = self.last_visible_sys_staff() else {
            return 0.0;
        };
        let ss = &self.staves[si];
        match ss.skyline().south().max() {
            Some(s) => s - ss.bbox().height,
            None => 0.0,
        }
    }

    /// Distance required by spacers at the system's top (`up`) or bottom
    /// boundary; a FIXED spacer wins outright
    pub fn spacer_distance(&self, score: &Score, up: bool) -> f64 {
        let staff = if up {
            self.first_visible_sys_staff()
        } else {
            self.last_visible_sys_staff()
        };
        let Some(staff_idx) = staff else {
            return 0.0;
        };
        let mut dist = 0.0_f64;
        for &mid in &self.measures {
            let Some(MeasureBase::Measure(m)) = score.measure(mid) else {
                continue;
            };
            let sp = if up {
                m.vspacer_up(staff_idx)
            } else {
                m.vspacer_down(staff_idx)
            };
            if let Some(sp) = sp {
                if sp.kind == SpacerKind::Fixed {
                    return sp.gap;
                }
                dist = dist.max(sp.gap);
            }
        }
        dist
    }

    /// Largest up-spacer constraining the top of this system. A FIXED
    /// down-spacer carried over from the previous system wins outright.
    pub fn up_spacer(
        &self,
        score: &Score,
        staff_idx: usize,
        prev_down_spacer: Option<Spacer>,
    ) -> Option<Spacer> {
        if let Some(prev) = prev_down_spacer {
            if prev.kind == SpacerKind::Fixed {
                return Some(prev);
            }
        }
        let mut spacer = prev_down_spacer;
        for &mid in &self.measures {
            let Some(MeasureBase::Measure(m)) = score.measure(mid) else {
                continue;
            };
            if let Some(sp) = m.vspacer_up(staff_idx) {
                let replace = match spacer {
                    None => true,
                    Some(cur) => cur.kind == SpacerKind::Up && sp.gap > cur.gap,
                };
                if replace {
                    spacer = Some(*sp);
                }
            }
        }
        spacer
    }

    /// Largest down-spacer for this system; a FIXED one wins outright
    pub fn down_spacer(&self, score: &Score, staff_idx: usize) -> Option<Spacer> {
        let mut spacer: Option<Spacer> = None;
        for &mid in &self.measures {
            let Some(MeasureBase::Measure(m)) = score.measure(mid) else {
                continue;
            };
            if let Some(sp) = m.vspacer_down(staff_idx) {
                if sp.kind == SpacerKind::Fixed {
                    return Some(*sp);
                }
                if spacer.map_or(true, |cur| sp.gap > cur.gap) {
                    spacer = Some(*sp);
                }
            }
        }
        spacer
    }

    /// Forget all continuous-view distance memory; call when triggering a
    /// full relayout (e.g. toggling page view and back)
    pub fn reset_continuous_distances(&mut self) {
        for ss in &mut self.staves {
            ss.reset_continuous_dist();
        }
    }
}

fn kind_name(mb: &MeasureBase) -> &'static str {
    match mb {
        MeasureBase::Measure(_) => "Measure",
        MeasureBase::HBox(_) => "HBox",
        MeasureBase::VBox(_) => "VBox",
        MeasureBase::TBox(_) => "TBox",
    }
}
