//! Instrument name placement
//!
//! Each part's names hang off the top staff of the part. When that staff is
//! hidden, the name elements migrate to the part's first visible staff so
//! they always render. Vertical centering follows the per-name anchor rule;
//! anchors that reference staves a narrow part does not have are clamped to
//! the staves that exist.

use crate::models::elements::{InstrumentName, InstrumentNameKind, NameAnchor};
use crate::models::score::Score;

use super::system::System;

impl System {
    /// Widest instrument name across all staves, plus the configured offset;
    /// zero when no names are attached
    pub fn system_names_width(&self, score: &Score) -> f64 {
        let name_offset = score.style.instrument_name_offset;
        let mut names_width = 0.0_f64;
        for part_idx in 0..score.parts.len() {
            let Some(first) = score.first_staff_of_part(part_idx) else {
                continue;
            };
            let Some(last) = score.last_staff_of_part(part_idx) else {
                continue;
            };
            for staff_idx in first..=last {
                let Some(ss) = self.staff(staff_idx) else {
                    continue;
                };
                for name in &ss.instrument_names {
                    names_width = names_width.max(name.width + name_offset);
                }
            }
        }
        names_width
    }

    /// Build instrument-name elements from the parts' long or short name
    /// lists, reusing existing elements in place. Applies the suppression
    /// policy: names disabled score-wide, or a single-part score with
    /// `hide_instrument_name_if_one_instrument`, clears every name list.
    pub fn set_instrument_names(&mut self, score: &Score, long_names: bool) {
        if self.vbox(score).is_some() {
            // frame-only system
            return;
        }
        let style = &score.style;
        if !style.show_instrument_names
            || (style.hide_instrument_name_if_one_instrument && score.parts.len() == 1)
        {
            for ss in &mut self.staves {
                ss.instrument_names.clear();
            }
            return;
        }

        let kind = if long_names {
            InstrumentNameKind::Long
        } else {
            InstrumentNameKind::Short
        };

        for staff_idx in 0..self.staves.len() {
            let visible = score.staff(staff_idx).is_some_and(|s| s.visible);
            if !score.is_top_of_part(staff_idx) || !visible {
                self.staves[staff_idx].instrument_names.clear();
                continue;
            }
            let Some(part_idx) = score.part_of_staff(staff_idx) else {
                continue;
            };
            let part = &score.parts[part_idx];
            let names = if long_names {
                &part.long_names
            } else {
                &part.short_names
            };

            let list = &mut self.staves[staff_idx].instrument_names;
            for (idx, sn) in names.iter().enumerate() {
                if idx == list.len() {
                    list.push(InstrumentName::new(sn.name.clone(), kind, staff_idx));
                }
                let name = &mut list[idx];
                name.text = sn.name.clone();
                name.kind = kind;
                name.anchor = NameAnchor::from_pos(sn.anchor_pos);
                name.width = sn.width;
                name.staff_idx = staff_idx;
            }
            list.truncate(names.len());
        }
    }

    /// Vertically center each part's names against the final staff
    /// positions. Runs after the staves have been stacked.
    pub fn layout_instrument_names(&mut self, score: &Score) {
        if self.staves.is_empty() {
            return;
        }
        let geo: Vec<(f64, f64, bool)> = self
            .staves
            .iter()
            .map(|s| (s.bbox().top(), s.bbox().bottom(), s.show()))
            .collect();

        let mut staff_idx = 0;
        for part_idx in 0..score.parts.len() {
            let nstaves = score.parts[part_idx].nstaves;
            if let Some(visible) = self.first_visible_sys_staff_of_part(score, part_idx) {
                // the nominal top staff holds the names; keep them rendering
                // when it is hidden by moving them to the first visible staff
                let holder = if visible != staff_idx && staff_idx < self.staves.len() {
                    let mut moved = std::mem::take(&mut self.staves[staff_idx].instrument_names);
                    for name in &mut moved {
                        name.staff_idx = visible;
                    }
                    self.staves[visible].instrument_names.append(&mut moved);
                    visible
                } else {
                    staff_idx
                };

                let last_of_part = (staff_idx + nstaves.max(1) - 1).min(geo.len().saturating_sub(1));
                // clamp anchor staves into the part so narrow parts degrade
                // to their nearest existing staff
                let clamp = |offset: usize| (staff_idx + offset).min(last_of_part);

                if let Some(ss) = self.staves.get_mut(holder) {
                    let holder_geo = geo[holder.min(geo.len() - 1)];
                    for name in &mut ss.instrument_names {
                        let (y1, y2) = match name.anchor {
                            NameAnchor::PartCenter => {
                                let mut bottom = holder_geo.1;
                                for i in (staff_idx..=last_of_part).rev() {
                                    if geo[i].2 {
                                        bottom = geo[i].1;
                                        break;
                                    }
                                }
                                (holder_geo.0, bottom)
                            }
                            NameAnchor::FirstStaff => (holder_geo.0, holder_geo.1),
                            NameAnchor::BetweenFirstAndSecond => {
                                (holder_geo.0, geo[clamp(1)].1)
                            }
                            NameAnchor::SecondStaff => (geo[clamp(1)].0, geo[clamp(1)].1),
                            NameAnchor::BetweenSecondAndThird => {
                                (geo[clamp(1)].0, geo[clamp(2)].1)
                            }
                            NameAnchor::ThirdStaff => (geo[clamp(2)].0, geo[clamp(2)].1),
                        };
                        name.pos.y = y1 + (y2 - y1) * 0.5 + name.offset.y;
                    }
                }
            }
            staff_idx += nstaves;
        }
    }
}
