// System container: measure/staff bookkeeping, element attachment, hit
// testing, frames and inter-system spacing

use pretty_assertions::assert_eq;
use score_system_layout::models::{
    DividerSide, LayoutStyle, Measure, MeasureBase, Part, RectF, Score, ScoreOwned, Spacer,
    SpacerKind, SpannerKind, SpannerSegment, Staff, SystemDivider, SystemElement, SystemId, VBox,
};
use score_system_layout::{LayoutError, System};

fn make_score(nparts: usize) -> Score {
    let mut score = Score::new();
    score.style = LayoutStyle {
        spatium: 10.0,
        min_vertical_distance: 2.0,
        staff_distance: 14.0,
        akkolade_distance: 10.0,
        ..LayoutStyle::default()
    };
    for _ in 0..nparts {
        score.parts.push(Part::new(1));
        score.staves.push(Staff::default());
    }
    score
}

fn make_system(score: &mut Score, id: usize, nmeasures: usize) -> System {
    let mut system = System::new(SystemId(id));
    system.adjust_staves_number(&score.style, score.nstaves());
    for _ in 0..nmeasures {
        let mid = score.add_measure(MeasureBase::Measure(Measure::with_width(120.0)));
        system.append_measure(score, mid).unwrap();
    }
    system.set_width(800.0);
    system
}

fn layout(system: &mut System, score: &mut Score) {
    system.layout_system(score, 0.0, false, false);
    system.layout2(score);
}

#[test]
fn measures_carry_a_back_reference_to_their_system() {
    let mut score = make_score(1);
    let mut system = make_system(&mut score, 7, 2);

    let first = system.measures()[0];
    assert_eq!(score.measure(first).unwrap().system(), Some(SystemId(7)));

    system.remove_measure(&mut score, first);
    assert_eq!(score.measure(first).unwrap().system(), None);
    assert_eq!(system.measures().len(), 1);

    system.remove_last_measure(&mut score);
    assert!(system.measures().is_empty());
}

#[test]
fn appending_an_unknown_measure_is_an_error() {
    let mut score = make_score(1);
    let mut system = make_system(&mut score, 0, 0);

    let err = system
        .append_measure(&mut score, score_system_layout::models::MeasureId(99))
        .unwrap_err();
    assert!(matches!(err, LayoutError::UnknownMeasure(_)));
}

#[test]
fn clear_detaches_measures_but_keeps_staves() {
    let mut score = make_score(2);
    let mut system = make_system(&mut score, 0, 3);
    let ids: Vec<_> = system.measures().to_vec();

    system.clear(&mut score);

    assert!(system.measures().is_empty());
    assert_eq!(system.staves().len(), 2);
    for id in ids {
        assert_eq!(score.measure(id).unwrap().system(), None);
    }
}

#[test]
fn staff_records_track_the_score_staff_count() {
    let mut score = make_score(3);
    let mut system = make_system(&mut score, 0, 1);
    assert_eq!(system.staves().len(), 3);

    system.adjust_staves_number(&score.style, 5);
    assert_eq!(system.staves().len(), 5);
    system.adjust_staves_number(&score.style, 2);
    assert_eq!(system.staves().len(), 2);

    assert!(matches!(
        system.remove_staff(9),
        Err(LayoutError::StaffIndexOutOfRange { .. })
    ));
}

#[test]
fn dividers_occupy_one_slot_per_side() {
    let mut score = make_score(1);
    let mut system = make_system(&mut score, 0, 1);

    let left = SystemDivider {
        side: DividerSide::Left,
        pos: Default::default(),
    };
    system.add(&mut score, SystemElement::SystemDivider(left.clone()));
    assert!(system.divider(DividerSide::Left).is_some());
    assert!(system.divider(DividerSide::Right).is_none());

    system.remove(&mut score, &SystemElement::SystemDivider(left));
    assert!(system.divider(DividerSide::Left).is_none());
}

#[test]
fn score_owned_elements_are_registered_with_the_score() {
    let mut score = make_score(1);
    let mut system = make_system(&mut score, 0, 1);

    system.add(&mut score, SystemElement::ScoreOwned(ScoreOwned::Beam(3)));
    assert_eq!(score.registered_elements(), &[ScoreOwned::Beam(3)]);

    system.remove(&mut score, &SystemElement::ScoreOwned(ScoreOwned::Beam(3)));
    assert!(score.registered_elements().is_empty());
}

#[test]
fn out_of_range_instrument_name_is_a_logged_no_op() {
    let mut score = make_score(1);
    let mut system = make_system(&mut score, 0, 1);

    let name = score_system_layout::models::InstrumentName::new(
        "Ghost",
        score_system_layout::models::InstrumentNameKind::Long,
        9,
    );
    system.add(&mut score, SystemElement::InstrumentName(name));
    assert!(system.staff(0).unwrap().instrument_names.is_empty());
}

#[test]
fn cross_staff_slur_segments_stretch_between_their_staves() {
    let mut score = make_score(2);
    let mut system = make_system(&mut score, 0, 1);
    let seg = SpannerSegment::new(SpannerKind::Slur, 0, 1);
    system.add(&mut score, SystemElement::SpannerSegment(seg));

    layout(&mut system, &mut score);

    let seg = &system.spanner_segments()[0];
    assert_eq!(seg.rect.top(), system.staff(0).unwrap().bbox().top());
    assert_eq!(seg.rect.bottom(), system.staff(1).unwrap().bbox().bottom());
}

#[test]
fn y2staff_hits_within_a_two_spatium_margin() {
    let mut score = make_score(2);
    let mut system = make_system(&mut score, 0, 1);
    layout(&mut system, &mut score);
    // staves at 0..40 and 54..94, margin 20

    assert_eq!(system.y2staff(&score, -19.0), Some(0));
    assert_eq!(system.y2staff(&score, 45.0), Some(0));
    assert_eq!(system.y2staff(&score, 61.0), Some(1));
    assert_eq!(system.y2staff(&score, -30.0), None);
    assert_eq!(system.y2staff(&score, 200.0), None);
}

#[test]
fn search_staff_splits_the_gap_at_the_spacing_factor() {
    let mut score = make_score(2);
    let mut system = make_system(&mut score, 0, 1);
    layout(&mut system, &mut score);
    // gap runs 40..54, midpoint 47

    assert_eq!(system.search_staff(&score, 46.0, None, 0.5, f64::INFINITY), 0);
    assert_eq!(system.search_staff(&score, 48.0, None, 0.5, f64::INFINITY), 1);
    // the preferred staff claims the whole gap
    assert_eq!(system.search_staff(&score, 41.0, Some(1), 0.5, f64::INFINITY), 1);
    assert_eq!(system.search_staff(&score, 53.0, Some(0), 0.5, f64::INFINITY), 0);
    // below the page-bounded zone of the last staff: one past the end
    assert_eq!(system.search_staff(&score, 250.0, None, 0.5, 200.0), 2);
}

#[test]
fn frame_only_system_takes_the_frame_geometry() {
    let mut score = make_score(1);
    // frame geometry is style-independent; the stock defaults suffice
    score.style = LayoutStyle::engraving_defaults().clone();
    let mut system = System::new(SystemId(0));
    system.set_width(800.0);
    let vb = score.add_measure(MeasureBase::VBox(VBox {
        height: 60.0,
        top_gap: 8.0,
        bottom_gap: 12.0,
        ..VBox::default()
    }));
    system.append_measure(&mut score, vb).unwrap();

    assert_eq!(system.vbox(&score), Some(vb));
    system.layout2(&mut score);
    assert_eq!(*system.bbox(), RectF::new(0.0, 0.0, 800.0, 80.0));
}

#[test]
fn system_distance_defaults_to_the_style_minimum() {
    let mut score = make_score(2);
    let mut upper = make_system(&mut score, 0, 1);
    let mut lower = make_system(&mut score, 1, 1);
    layout(&mut upper, &mut score);
    layout(&mut lower, &mut score);

    assert_eq!(
        upper.min_distance(&lower, &score),
        score.style.min_system_distance
    );
}

#[test]
fn system_distance_honors_skyline_overhang() {
    let mut score = make_score(2);
    let mut upper = make_system(&mut score, 0, 1);
    let mut lower = make_system(&mut score, 1, 1);
    // content hangs 50 below the upper system's last staff box and the
    // lower system's first staff reaches 10 above its own
    upper
        .staff_mut(1)
        .unwrap()
        .skyline_mut()
        .add(RectF::new(0.0, 40.0, 100.0, 50.0));
    lower
        .staff_mut(0)
        .unwrap()
        .skyline_mut()
        .add(RectF::new(0.0, -10.0, 100.0, 10.0));
    layout(&mut upper, &mut score);
    layout(&mut lower, &mut score);

    // skyline distance 100, minus the staff height (40) already inside the
    // upper system, plus the vertical minimum of 2
    assert_eq!(upper.min_distance(&lower, &score), 62.0);
}

#[test]
fn fixed_spacer_pins_the_system_distance() {
    let mut score = make_score(2);
    let upper = make_system(&mut score, 0, 1);
    let lower = make_system(&mut score, 1, 1);
    let mid = upper.measures()[0];
    if let Some(MeasureBase::Measure(m)) = score.measure_mut(mid) {
        m.set_vspacer_down(
            1,
            Spacer {
                kind: SpacerKind::Fixed,
                gap: 7.0,
            },
        );
    }

    assert_eq!(upper.min_distance(&lower, &score), 7.0);
    assert_eq!(upper.spacer_distance(&score, false), 7.0);
}

#[test]
fn up_spacer_on_the_lower_system_raises_the_distance() {
    let mut score = make_score(2);
    let upper = make_system(&mut score, 0, 1);
    let lower = make_system(&mut score, 1, 1);
    let mid = lower.measures()[0];
    if let Some(MeasureBase::Measure(m)) = score.measure_mut(mid) {
        m.set_vspacer_up(
            0,
            Spacer {
                kind: SpacerKind::Up,
                gap: 50.0,
            },
        );
    }

    assert_eq!(upper.min_distance(&lower, &score), 50.0);
    assert_eq!(lower.spacer_distance(&score, true), 50.0);
}

#[test]
fn spacer_carry_over_prefers_fixed_then_largest() {
    let mut score = make_score(1);
    let mut system = make_system(&mut score, 0, 1);
    let mid = system.measures()[0];
    if let Some(MeasureBase::Measure(m)) = score.measure_mut(mid) {
        m.set_vspacer_up(
            0,
            Spacer {
                kind: SpacerKind::Up,
                gap: 12.0,
            },
        );
    }

    // a FIXED spacer carried from the previous system wins outright
    let fixed = Spacer {
        kind: SpacerKind::Fixed,
        gap: 4.0,
    };
    assert_eq!(system.up_spacer(&score, 0, Some(fixed)), Some(fixed));

    // an elastic carry-over loses to a larger up spacer on this system
    let small = Spacer {
        kind: SpacerKind::Up,
        gap: 5.0,
    };
    assert_eq!(
        system.up_spacer(&score, 0, Some(small)),
        Some(Spacer {
            kind: SpacerKind::Up,
            gap: 12.0,
        })
    );

    assert_eq!(system.up_spacer(&score, 0, None).map(|s| s.gap), Some(12.0));
    assert_eq!(system.down_spacer(&score, 0), None);
}

#[test]
fn visible_staff_queries_skip_hidden_records() {
    let mut score = make_score(3);
    let mut system = make_system(&mut score, 0, 1);
    system.staff_mut(0).unwrap().set_show(false);

    assert_eq!(system.first_visible_staff(&score), Some(1));
    assert_eq!(system.next_visible_staff(&score, 1), Some(2));
    assert_eq!(system.next_visible_staff(&score, 2), None);
}

#[test]
fn staff_positions_translate_to_page_coordinates() {
    let mut score = make_score(2);
    let mut system = make_system(&mut score, 0, 1);
    layout(&mut system, &mut score);
    system.set_pos(0.0, 100.0);

    assert_eq!(system.staff_y_page(0), 100.0);
    assert_eq!(system.staff_y_page(1), 154.0);
    // degenerate index answers the system position
    assert_eq!(system.staff_y_page(9), 100.0);
}

#[test]
fn y_bottom_prefers_skyline_then_saved_height() {
    let mut score = make_score(2);
    let mut system = make_system(&mut score, 0, 1);
    system
        .staff_mut(0)
        .unwrap()
        .skyline_mut()
        .add(RectF::new(0.0, 0.0, 100.0, 55.0));
    layout(&mut system, &mut score);

    assert_eq!(system.staff(0).unwrap().y_bottom(), 55.0);
    // no skyline on the second staff: fall back to its saved height
    assert_eq!(system.staff(1).unwrap().y_bottom(), 40.0);
}

#[test]
fn min_top_and_min_bottom_reflect_skyline_reach() {
    let mut score = make_score(2);
    let mut system = make_system(&mut score, 0, 1);
    system
        .staff_mut(0)
        .unwrap()
        .skyline_mut()
        .add(RectF::new(0.0, -15.0, 100.0, 15.0));
    system
        .staff_mut(1)
        .unwrap()
        .skyline_mut()
        .add(RectF::new(0.0, 0.0, 100.0, 55.0));
    layout(&mut system, &mut score);

    assert_eq!(system.min_top(), 15.0);
    // last staff box is 40 high, content reaches 55
    assert_eq!(system.min_bottom(&score), 15.0);
}
