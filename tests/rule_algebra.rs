//! Row-level semantics of the four operator families, checked end to end
//! through both application and satisfaction.

use rand::rngs::StdRng;
use rand::SeedableRng;

use raven_matrices::configs;
use raven_matrices::core::attribute::{number_value, EntityAttr};
use raven_matrices::rules::{Rule, RuleAttr, RuleKind};
use raven_matrices::solver;

fn set_count(panel: &mut raven_matrices::aot::Panel, rng: &mut StdRng, level: i32) {
    let layout = panel.layout_mut(0);
    layout.number.set_level(level);
    let count = number_value(layout.number.level());
    layout.position.sample(rng, count);
    layout.rebuild_entities(rng, None);
}

#[test]
fn count_progression_steps_across_a_row() {
    let mut rng = StdRng::seed_from_u64(1);
    let template = configs::distribute_nine().template;
    let mut first = template.sample(&mut rng);
    set_count(&mut first, &mut rng, 2);

    let rule = Rule::new(RuleKind::Progression, RuleAttr::Number, 0, 1);
    let second = rule
        .apply(&mut rng, std::slice::from_ref(&first), None)
        .unwrap();
    let history = vec![first.clone(), second.clone()];
    let third = rule.apply(&mut rng, &history, None).unwrap();

    assert_eq!(second.layout(0).number.level(), 3);
    assert_eq!(third.layout(0).number.level(), 4);
    assert_eq!(third.layout(0).entities.len(), 5);
    assert!(solver::rule_satisfied(&rule, &first, &second, &third));
}

#[test]
fn color_arithmetic_adds_without_bias() {
    let mut rng = StdRng::seed_from_u64(2);
    let template = configs::center_single().template;
    let mut a = template.sample(&mut rng);
    let mut b = template.sample(&mut rng);
    a.layout_mut(0).set_entity_levels(EntityAttr::Color, 2);
    b.layout_mut(0).set_entity_levels(EntityAttr::Color, 3);

    let rule = Rule::new(RuleKind::Arithmetic, RuleAttr::Color, 0, 1);
    let history = vec![a.clone(), b.clone()];
    let out = rule.apply(&mut rng, &history, None).unwrap();

    assert_eq!(out.layout(0).entity_level(EntityAttr::Color), Some(5));
    assert!(solver::rule_satisfied(&rule, &a, &b, &out));

    // A level off by one no longer satisfies the rule.
    let mut wrong = out.clone();
    wrong.layout_mut(0).set_entity_levels(EntityAttr::Color, 4);
    assert!(!solver::rule_satisfied(&rule, &a, &b, &wrong));
}

#[test]
fn size_arithmetic_keeps_the_additive_bias() {
    let mut rng = StdRng::seed_from_u64(3);
    let template = configs::center_single().template;
    let mut a = template.sample(&mut rng);
    let mut b = template.sample(&mut rng);
    a.layout_mut(0).set_entity_levels(EntityAttr::Size, 1);
    b.layout_mut(0).set_entity_levels(EntityAttr::Size, 2);

    let rule = Rule::new(RuleKind::Arithmetic, RuleAttr::Size, 0, 1);
    let history = vec![a.clone(), b.clone()];
    let out = rule.apply(&mut rng, &history, None).unwrap();

    // 1 + 2 + 1 = 4
    assert_eq!(out.layout(0).entity_level(EntityAttr::Size), Some(4));
    assert!(solver::rule_satisfied(&rule, &a, &b, &out));
}

#[test]
fn distribute_three_draws_outside_both_lags() {
    let mut rng = StdRng::seed_from_u64(4);
    let template = configs::center_single().template;
    let mut a = template.sample(&mut rng);
    let mut b = template.sample(&mut rng);
    a.layout_mut(0).set_entity_levels(EntityAttr::Shape, 0);
    b.layout_mut(0).set_entity_levels(EntityAttr::Shape, 2);

    let rule = Rule::new(RuleKind::DistributeThree, RuleAttr::Shape, 0, 0);
    let history = vec![a.clone(), b.clone()];
    for _ in 0..30 {
        let out = rule.apply(&mut rng, &history, None).unwrap();
        let v3 = out.layout(0).entity_level(EntityAttr::Shape).unwrap();
        assert!([1, 3, 4].contains(&v3));
        assert!(solver::rule_satisfied(&rule, &a, &b, &out));
    }

    // Repeating a lagged value breaks pairwise distinctness.
    let mut repeat = b.clone();
    repeat.layout_mut(0).set_entity_levels(EntityAttr::Shape, 0);
    assert!(!solver::rule_satisfied(&rule, &a, &b, &repeat));
}

#[test]
fn position_arithmetic_takes_the_union() {
    let mut rng = StdRng::seed_from_u64(5);
    let template = configs::distribute_four().template;
    let mut a = template.sample(&mut rng);
    let mut b = template.sample(&mut rng);
    for (panel, active) in [(&mut a, vec![0usize, 1]), (&mut b, vec![1, 2])] {
        let layout = panel.layout_mut(0);
        layout.number.set_level(active.len() as i32 - 1);
        layout.position.set_active(active);
        layout.rebuild_entities(&mut rng, None);
    }

    let rule = Rule::new(RuleKind::Arithmetic, RuleAttr::Position, 0, 1);
    let history = vec![a.clone(), b.clone()];
    let out = rule.apply(&mut rng, &history, None).unwrap();

    let set = out.layout(0).position.active_set();
    assert_eq!(set.len(), 3);
    assert!(set.contains(&0) && set.contains(&1) && set.contains(&2));
    assert_eq!(out.layout(0).number.level(), 2);
    assert!(solver::rule_satisfied(&rule, &a, &b, &out));
}

#[test]
fn position_progression_shifts_modulo_the_catalog() {
    let mut rng = StdRng::seed_from_u64(6);
    let template = configs::distribute_four().template;
    let mut a = template.sample(&mut rng);
    {
        let layout = a.layout_mut(0);
        layout.number.set_level(1);
        layout.position.set_active(vec![2, 3]);
        layout.rebuild_entities(&mut rng, None);
    }

    let rule = Rule::new(RuleKind::Progression, RuleAttr::Position, 0, 2);
    let out = rule
        .apply(&mut rng, std::slice::from_ref(&a), None)
        .unwrap();

    assert_eq!(out.layout(0).position.active(), &[0, 1]);
    // Entities follow the slots.
    for (e, bbox) in out
        .layout(0)
        .entities
        .iter()
        .zip(out.layout(0).position.boxes())
    {
        assert_eq!(e.bbox, bbox);
    }
}

#[test]
fn second_component_is_untouched_by_first_component_rules() {
    let mut rng = StdRng::seed_from_u64(7);
    let template = configs::left_center_single_right_center_single().template;
    let a = template.sample(&mut rng);

    let rule = Rule::new(RuleKind::Progression, RuleAttr::Size, 0, 1);
    let out = rule
        .apply(&mut rng, std::slice::from_ref(&a), None)
        .unwrap();

    assert!(out.layout(1).equivalent(a.layout(1)));
}
