//! Bracket layout
//!
//! Brackets are declared on staves as `BracketItem`s (kind, span, column)
//! and materialized here as per-system `Bracket` instances. Hidden staves
//! shrink a bracket to its visible span; a bracket collapsed to a single
//! staff is dropped unless its declared span genuinely is one or the score
//! always shows brackets over hidden staves. Columns stack horizontally:
//! higher columns are displaced left past any lower-column bracket whose
//! staff range they overlap.

use crate::models::elements::Bracket;
use crate::models::geometry::PointF;
use crate::models::score::{BracketItem, BracketKind, MeasureId, Score, VOICES};
use crate::models::style::LayoutStyle;

use super::system::System;

// Nominal bracket widths, in spatiums
const NORMAL_BRACKET_WIDTH_SP: f64 = 0.5;
const BRACE_WIDTH_SP: f64 = 0.75;
const SQUARE_BRACKET_WIDTH_SP: f64 = 0.35;
const LINE_BRACKET_WIDTH_SP: f64 = 0.35;

fn bracket_width(kind: BracketKind, style: &LayoutStyle) -> f64 {
    let sp = match kind {
        BracketKind::Normal => NORMAL_BRACKET_WIDTH_SP,
        BracketKind::Brace => BRACE_WIDTH_SP,
        BracketKind::Square => SQUARE_BRACKET_WIDTH_SP,
        BracketKind::Line => LINE_BRACKET_WIDTH_SP,
        BracketKind::NoBracket => 0.0,
    };
    sp * style.spatium
}

impl System {
    /// Number of bracket columns declared across all staves
    pub fn brackets_columns_count(&self, score: &Score) -> usize {
        let mut columns = 0;
        for staff in &score.staves {
            for bi in &staff.brackets {
                columns = columns.max(bi.column + 1);
            }
        }
        columns
    }

    /// Create or reuse bracket instances for the front of the system and
    /// return the total horizontal width they consume
    pub fn layout_brackets(&mut self, score: &Score) -> f64 {
        let first_measure = self.first_measure(score);
        self.layout_brackets_impl(score, first_measure, false)
    }

    /// Bracket width as it would be with no staff hidden; used to reserve
    /// margin space so staves align across systems. Recomputes the bracket
    /// list, so call `layout_brackets` afterwards for the real state.
    pub fn total_bracket_offset(&mut self, score: &Score) -> f64 {
        let first_measure = self.first_measure(score);
        self.layout_brackets_impl(score, first_measure, true)
    }

    fn layout_brackets_impl(
        &mut self,
        score: &Score,
        measure: Option<MeasureId>,
        ignore_visibility: bool,
    ) -> f64 {
        let nstaves = self.staves.len();
        let columns = self.brackets_columns_count(score);
        let mut column_width = vec![0.0_f64; columns];

        let mut old = std::mem::take(&mut self.brackets);

        for staff_idx in 0..nstaves {
            let Some(staff) = score.staff(staff_idx) else {
                continue;
            };
            for column in 0..columns {
                for bi in &staff.brackets {
                    if bi.column != column || bi.kind == BracketKind::NoBracket {
                        continue;
                    }
                    if let Some(w) = self.create_bracket(
                        score,
                        bi,
                        column,
                        staff_idx,
                        &mut old,
                        measure,
                        ignore_visibility,
                    ) {
                        column_width[column] = column_width[column].max(w);
                    }
                }
            }
        }
        // unmatched old instances are discarded here
        drop(old);

        let mut total = 0.0;
        if !self.brackets.is_empty() {
            let bd = score.style.bracket_distance;
            for w in column_width {
                total += w + bd;
            }
        }
        total
    }

    /// Create a bracket over the staves `bi` spans, clipped to the system
    /// and shrunk to visible staves, reusing a matching instance from `old`
    /// when one exists. Answers the bracket width, or `None` when hidden
    /// staves collapse the bracket away.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn create_bracket(
        &mut self,
        score: &Score,
        bi: &BracketItem,
        column: usize,
        staff_idx: usize,
        old: &mut Vec<Bracket>,
        measure: Option<MeasureId>,
        ignore_visibility: bool,
    ) -> Option<f64> {
        let nstaves = self.staves.len();
        if nstaves == 0 || bi.span == 0 {
            return None;
        }

        let mut first_staff = staff_idx;
        let mut last_staff = (staff_idx + bi.span - 1).min(nstaves - 1);
        let visible =
            |idx: usize| ignore_visibility || self.staff_visible(score, idx);
        while first_staff <= last_staff && !visible(first_staff) {
            first_staff += 1;
        }
        if first_staff > last_staff {
            return None;
        }
        while last_staff > first_staff && !visible(last_staff) {
            last_staff -= 1;
        }
        let span = last_staff - first_staff + 1;

        // do not show a bracket that hidden staves reduced to a single
        // staff, unless it was declared that way or policy keeps it
        let show = span > 1
            || bi.span == span
            || (span == 1 && score.style.always_show_brackets_when_empty_staves_are_hidden);
        if !show {
            return None;
        }

        let track = staff_idx * VOICES;
        let mut bracket = match old.iter().position(|b| {
            b.track == track && b.column == column && b.kind == bi.kind && b.measure == measure
        }) {
            Some(i) => old.remove(i),
            None => Bracket {
                kind: bi.kind,
                column,
                track,
                measure,
                declared_span: bi.span,
                first_staff,
                last_staff,
                generated: true,
                pos: PointF::default(),
                width: bracket_width(bi.kind, &score.style),
                height: 0.0,
                visible: true,
            },
        };
        bracket.declared_span = bi.span;
        bracket.first_staff = first_staff;
        bracket.last_staff = last_staff;
        bracket.visible = true;
        let width = bracket.width;
        self.brackets.push(bracket);
        Some(width)
    }

    /// Lay brackets right-to-left from `x_position`, displacing a bracket
    /// left past every lower-column bracket whose staff range overlaps it
    pub fn set_brackets_x_position(&mut self, x_position: f64, style: &LayoutStyle) {
        let bd = style.bracket_distance;
        let spans: Vec<(usize, usize, usize, f64)> = self
            .brackets
            .iter()
            .map(|b| (b.first_staff, b.last_staff, b.column, b.width))
            .collect();
        for b1 in &mut self.brackets {
            let mut x_offset = 0.0;
            for &(first2, last2, column2, width2) in &spans {
                let first_inside = b1.first_staff >= first2 && b1.first_staff <= last2;
                let last_inside = b1.last_staff >= first2 && b1.last_staff <= last2;
                if b1.column > column2 && (first_inside || last_inside) {
                    x_offset += width2 + bd;
                }
            }
            b1.pos.x = x_position - x_offset - b1.width;
        }
    }

    /// Set each bracket's vertical run to the span of its visible staves;
    /// a bracket whose span closed up entirely gets zero height and is
    /// flagged invisible. Runs after vertical stacking.
    pub fn layout_brackets_vertical(&mut self, score: &Score) {
        let geo: Vec<(f64, f64, bool)> = self
            .staves
            .iter()
            .map(|s| (s.bbox().top(), s.bbox().bottom(), s.show()))
            .collect();
        let always_show = score.style.always_show_brackets_when_empty_staves_are_hidden;

        for b in &mut self.brackets {
            let mut s1 = b.first_staff;
            let last = b.last_staff.min(geo.len().saturating_sub(1));
            while s1 <= last && !geo[s1].2 {
                s1 += 1;
            }
            let any_visible = s1 <= last;
            let mut s2 = last;
            while s2 > s1 && !geo[s2].2 {
                s2 -= 1;
            }

            let shown = if always_show {
                any_visible
            } else {
                any_visible && (s1 < s2 || b.declared_span == 1)
            };

            let (sy, ey) = if shown {
                (geo[s1].0, geo[s2].1)
            } else {
                (0.0, 0.0)
            };
            b.pos.y = sy;
            b.height = ey - sy;
            b.visible = shown;
        }
    }

    /// Add brackets in front of a specific measure, typically behind a
    /// horizontal frame; existing front-of-system brackets are kept
    pub fn add_brackets(&mut self, score: &Score, measure: MeasureId) {
        if self.staves.is_empty() {
            // frame-only system
            return;
        }
        let nstaves = self.staves.len();
        let columns = self.brackets_columns_count(score);

        let mut old = std::mem::take(&mut self.brackets);

        for staff_idx in 0..nstaves {
            let Some(staff) = score.staff(staff_idx) else {
                continue;
            };
            for column in 0..columns {
                for bi in &staff.brackets {
                    if bi.column != column || bi.kind == BracketKind::NoBracket {
                        continue;
                    }
                    self.create_bracket(
                        score,
                        bi,
                        column,
                        staff_idx,
                        &mut old,
                        Some(measure),
                        false,
                    );
                }
            }
        }

        let measure_x = score
            .measure(measure)
            .and_then(|mb| mb.as_measure().map(|m| m.bbox.x))
            .unwrap_or(0.0);
        self.set_brackets_x_position(measure_x, &score.style);

        self.brackets.append(&mut old);
    }
}
