// Instrument names: creation, suppression, migration, anchoring

use pretty_assertions::assert_eq;
use score_system_layout::models::{
    InstrumentNameKind, LayoutStyle, Measure, MeasureBase, NameAnchor, Part, Score, Staff,
    StaffName, SystemId,
};
use score_system_layout::System;

fn make_score(parts: &[usize]) -> Score {
    let mut score = Score::new();
    score.style = LayoutStyle {
        spatium: 10.0,
        min_vertical_distance: 2.0,
        staff_distance: 14.0,
        akkolade_distance: 10.0,
        ..LayoutStyle::default()
    };
    for &n in parts {
        score.parts.push(Part::new(n));
        for _ in 0..n {
            score.staves.push(Staff::default());
        }
    }
    score
}

fn name(text: &str, anchor_pos: u8, width: f64) -> StaffName {
    StaffName {
        name: text.to_string(),
        anchor_pos,
        width,
    }
}

fn make_system(score: &mut Score) -> System {
    let mut system = System::new(SystemId(0));
    system.adjust_staves_number(&score.style, score.nstaves());
    let id = score.add_measure(MeasureBase::Measure(Measure::with_width(120.0)));
    system.append_measure(score, id).unwrap();
    system.set_width(800.0);
    system
}

fn layout(system: &mut System, score: &mut Score) {
    system.layout_system(score, 0.0, false, false);
    system.layout2(score);
}

#[test]
fn names_attach_to_the_top_staff_of_each_part() {
    let mut score = make_score(&[2, 1]);
    score.parts[0].long_names.push(name("Piano", 0, 30.0));
    score.parts[1].long_names.push(name("Cello", 1, 24.0));
    let mut system = make_system(&mut score);

    system.set_instrument_names(&score, true);

    let names0 = &system.staff(0).unwrap().instrument_names;
    assert_eq!(names0.len(), 1);
    assert_eq!(names0[0].text, "Piano");
    assert_eq!(names0[0].kind, InstrumentNameKind::Long);
    assert_eq!(names0[0].anchor, NameAnchor::PartCenter);
    assert!(system.staff(1).unwrap().instrument_names.is_empty());
    assert_eq!(system.staff(2).unwrap().instrument_names[0].text, "Cello");
    assert_eq!(
        system.staff(2).unwrap().instrument_names[0].anchor,
        NameAnchor::FirstStaff
    );
}

#[test]
fn short_names_replace_long_names_in_place() {
    let mut score = make_score(&[1, 1]);
    score.parts[0].long_names.push(name("Violoncello", 0, 60.0));
    score.parts[0].short_names.push(name("Vc.", 0, 18.0));
    score.parts[1].long_names.push(name("Viola", 0, 40.0));
    let mut system = make_system(&mut score);

    system.set_instrument_names(&score, true);
    system.set_instrument_names(&score, false);

    let names0 = &system.staff(0).unwrap().instrument_names;
    assert_eq!(names0.len(), 1);
    assert_eq!(names0[0].text, "Vc.");
    assert_eq!(names0[0].kind, InstrumentNameKind::Short);
    // the other part has no short names at all
    assert!(system.staff(1).unwrap().instrument_names.is_empty());
}

#[test]
fn single_part_scores_suppress_names_by_default() {
    let mut score = make_score(&[2]);
    score.parts[0].long_names.push(name("Organ", 0, 36.0));
    let mut system = make_system(&mut score);

    system.set_instrument_names(&score, true);
    assert!(system.staff(0).unwrap().instrument_names.is_empty());

    score.style.hide_instrument_name_if_one_instrument = false;
    system.set_instrument_names(&score, true);
    assert_eq!(system.staff(0).unwrap().instrument_names.len(), 1);
}

#[test]
fn disabling_names_clears_existing_elements() {
    let mut score = make_score(&[1, 1]);
    score.parts[0].long_names.push(name("Flute", 0, 28.0));
    let mut system = make_system(&mut score);

    system.set_instrument_names(&score, true);
    assert_eq!(system.staff(0).unwrap().instrument_names.len(), 1);

    score.style.show_instrument_names = false;
    system.set_instrument_names(&score, true);
    assert!(system.staff(0).unwrap().instrument_names.is_empty());
}

#[test]
fn names_migrate_to_the_first_visible_staff_of_the_part() {
    let mut score = make_score(&[2, 1]);
    score.parts[0].long_names.push(name("Piano", 0, 30.0));
    score.parts[1].long_names.push(name("Cello", 0, 24.0));
    let mut system = make_system(&mut score);
    system.set_instrument_names(&score, true);
    system.staff_mut(0).unwrap().set_show(false);

    layout(&mut system, &mut score);

    // the label moved, and its text and kind survived the move
    assert!(system.staff(0).unwrap().instrument_names.is_empty());
    let moved = &system.staff(1).unwrap().instrument_names;
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].text, "Piano");
    assert_eq!(moved[0].kind, InstrumentNameKind::Long);
    assert_eq!(moved[0].staff_idx, 1);
    // centered on its new holder staff (top 0, height 40)
    assert_eq!(moved[0].pos.y, 20.0);
}

#[test]
fn part_center_anchor_spans_first_to_last_visible_staff() {
    let mut score = make_score(&[2]);
    score.style.hide_instrument_name_if_one_instrument = false;
    score.parts[0].long_names.push(name("Piano", 0, 30.0));
    let mut system = make_system(&mut score);
    system.set_instrument_names(&score, true);

    layout(&mut system, &mut score);

    // staff 0 spans 0..40, staff 1 spans 50..90 (akkolade distance 10)
    let n = &system.staff(0).unwrap().instrument_names[0];
    assert_eq!(n.pos.y, 45.0);
}

#[test]
fn second_staff_anchor_centers_on_the_second_staff() {
    let mut score = make_score(&[2]);
    score.style.hide_instrument_name_if_one_instrument = false;
    score.parts[0].long_names.push(name("Piano", 3, 30.0));
    let mut system = make_system(&mut score);
    system.set_instrument_names(&score, true);

    layout(&mut system, &mut score);

    let n = &system.staff(0).unwrap().instrument_names[0];
    assert_eq!(n.anchor, NameAnchor::SecondStaff);
    assert_eq!(n.pos.y, 70.0);
}

#[test]
fn anchors_clamp_inside_a_narrow_part() {
    // a third-staff anchor on a single-staff part degrades to that staff
    let mut score = make_score(&[1, 1]);
    score.parts[0].long_names.push(name("Horn", 5, 26.0));
    let mut system = make_system(&mut score);
    system.set_instrument_names(&score, true);

    layout(&mut system, &mut score);

    let n = &system.staff(0).unwrap().instrument_names[0];
    assert_eq!(n.anchor, NameAnchor::ThirdStaff);
    assert_eq!(n.pos.y, 20.0);
}

#[test]
fn right_aligned_names_share_a_right_edge() {
    let mut score = make_score(&[1, 1]);
    score.parts[0].long_names.push(name("Violoncello", 1, 30.0));
    score.parts[1].long_names.push(name("Viola", 1, 18.0));
    let mut system = make_system(&mut score);
    system.set_instrument_names(&score, true);

    layout(&mut system, &mut score);

    // widest name is 30, name offset 4: the margin is 30 + 4 + 4
    assert_eq!(system.left_margin(), 38.0);
    assert_eq!(system.staff(0).unwrap().bbox().left(), 38.0);
    let n0 = &system.staff(0).unwrap().instrument_names[0];
    let n1 = &system.staff(1).unwrap().instrument_names[0];
    assert_eq!(n0.pos.x + n0.width, n1.pos.x + n1.width);
    assert_eq!(n0.pos.x, 4.0);
}

#[test]
fn first_system_indentation_applies_without_names() {
    let mut score = make_score(&[1, 1]);
    let mut system = make_system(&mut score);

    system.layout_system(&score, 0.0, true, true);

    // indentation (20) stands in for the missing name column
    assert_eq!(
        system.left_margin(),
        20.0 + score.style.instrument_name_offset
    );
}
