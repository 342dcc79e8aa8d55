//! Rule-group proposals and template-side feasibility.
//!
//! The generator proposes one rule per attribute category per component,
//! then asks `prune` whether the configuration can legally host the
//! proposal. On success `prune` returns a narrowed clone of the template
//! whose *current* constraints leave headroom for the proposed operators
//! (the *original* constraints are preserved for Distribute-Three).

use rand::Rng;

use crate::aot::Panel;
use crate::core::attribute::LevelBounds;
use crate::rules::{Rule, RuleAttr, RuleGroup, RuleKind};

/// Progression step parameters.
pub const PROGRESSION_STEPS: [i32; 4] = [-2, -1, 1, 2];

/// Arithmetic sign parameters.
pub const ARITHMETIC_SIGNS: [i32; 2] = [1, -1];

fn sample_param(rng: &mut impl Rng, kind: RuleKind) -> i32 {
    match kind {
        RuleKind::Progression => PROGRESSION_STEPS[rng.gen_range(0..PROGRESSION_STEPS.len())],
        RuleKind::Arithmetic => ARITHMETIC_SIGNS[rng.gen_range(0..ARITHMETIC_SIGNS.len())],
        RuleKind::Constant | RuleKind::DistributeThree => 0,
    }
}

fn sample_kind(rng: &mut impl Rng, pool: &[RuleKind]) -> RuleKind {
    pool[rng.gen_range(0..pool.len())]
}

const ALL_KINDS: [RuleKind; 4] = [
    RuleKind::Constant,
    RuleKind::Progression,
    RuleKind::Arithmetic,
    RuleKind::DistributeThree,
];

// Arithmetic over shape indices is meaningless, so Shape excludes it.
const SHAPE_KINDS: [RuleKind; 3] = [
    RuleKind::Constant,
    RuleKind::Progression,
    RuleKind::DistributeThree,
];

/// Propose one rule group per component: a Number-or-Position rule first,
/// then one rule for each entity attribute.
pub fn sample_rule_groups(rng: &mut impl Rng, component_count: usize) -> Vec<RuleGroup> {
    (0..component_count)
        .map(|c| {
            let pos_attr = if rng.gen_bool(0.5) {
                RuleAttr::Number
            } else {
                RuleAttr::Position
            };
            let pos_kind = sample_kind(rng, &ALL_KINDS);
            let shape_kind = sample_kind(rng, &SHAPE_KINDS);
            let size_kind = sample_kind(rng, &ALL_KINDS);
            let color_kind = sample_kind(rng, &ALL_KINDS);
            RuleGroup {
                rules: vec![
                    Rule::new(pos_kind, pos_attr, c, sample_param(rng, pos_kind)),
                    Rule::new(shape_kind, RuleAttr::Shape, c, sample_param(rng, shape_kind)),
                    Rule::new(size_kind, RuleAttr::Size, c, sample_param(rng, size_kind)),
                    Rule::new(color_kind, RuleAttr::Color, c, sample_param(rng, color_kind)),
                ],
            }
        })
        .collect()
}

/// Feasibility check of a rule-group proposal against a template panel.
///
/// Returns a clone of the template with its current constraints narrowed so
/// every proposed operator has headroom, or `None` when the proposal cannot
/// be legally applied to this configuration.
pub fn prune(template: &Panel, groups: &[RuleGroup]) -> Option<Panel> {
    let mut narrowed = template.clone();
    for group in groups {
        for rule in &group.rules {
            if rule.component >= narrowed.component_count() {
                return None;
            }
            if !narrow_for_rule(&mut narrowed, rule) {
                return None;
            }
        }
    }
    Some(narrowed)
}

/// Narrow `panel`'s current constraints for `rule`; false when infeasible.
fn narrow_for_rule(panel: &mut Panel, rule: &Rule) -> bool {
    let layout = panel.layout_mut(rule.component);
    let catalog = layout.position.catalog_len();
    match (rule.kind, rule.attr) {
        (RuleKind::Constant, _) => true,

        (RuleKind::Progression, RuleAttr::Number) => {
            let bounds = layout.number.bounds();
            if bounds.len() <= rule.param.unsigned_abs() as usize {
                return false;
            }
            layout.number.narrow(bounds.shrunk(rule.param));
            true
        }
        (RuleKind::Progression, RuleAttr::Position) => {
            // A shift must actually move the occupied slots.
            catalog >= 2 && rule.param.rem_euclid(catalog as i32) != 0
        }
        (RuleKind::Progression, _) => {
            let attr = match rule.attr.entity_attr() {
                Some(a) => a,
                None => return false,
            };
            let bounds = layout.entity_constraint.bounds(attr);
            if bounds.len() <= rule.param.unsigned_abs() as usize {
                return false;
            }
            layout
                .entity_constraint
                .set_bounds(attr, bounds.shrunk(rule.param));
            true
        }

        (RuleKind::Arithmetic, RuleAttr::Number) => {
            let bounds = layout.number.bounds();
            if bounds.len() < 2 {
                return false;
            }
            if rule.param > 0 {
                // Both operands must fit the additive result in-domain.
                let max = bounds.min.max((bounds.max - 1) / 2);
                layout.number.narrow(LevelBounds::new(bounds.min, max));
            }
            true
        }
        (RuleKind::Arithmetic, RuleAttr::Position) => catalog >= 2,
        (RuleKind::Arithmetic, RuleAttr::Shape) => false,
        (RuleKind::Arithmetic, _) => {
            let attr = match rule.attr.entity_attr() {
                Some(a) => a,
                None => return false,
            };
            let bounds = layout.entity_constraint.bounds(attr);
            if bounds.len() < 2 {
                return false;
            }
            if rule.param > 0 {
                let headroom = if rule.attr == RuleAttr::Color {
                    bounds.max / 2
                } else {
                    (bounds.max - 1) / 2
                };
                let max = bounds.min.max(headroom);
                layout
                    .entity_constraint
                    .set_bounds(attr, LevelBounds::new(bounds.min, max));
            }
            true
        }

        (RuleKind::DistributeThree, RuleAttr::Number) => layout.orig_number.len() >= 3,
        (RuleKind::DistributeThree, RuleAttr::Position) => {
            catalog >= 3 && layout.orig_number.len() >= 3
        }
        (RuleKind::DistributeThree, _) => {
            let attr = match rule.attr.entity_attr() {
                Some(a) => a,
                None => return false,
            };
            layout.orig_entity_constraint.bounds(attr).len() >= 3
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn groups_cover_every_component_and_category() {
        let mut rng = StdRng::seed_from_u64(50);
        let groups = sample_rule_groups(&mut rng, 2);
        assert_eq!(groups.len(), 2);
        for (c, group) in groups.iter().enumerate() {
            assert_eq!(group.rules.len(), 4);
            assert!(group.rules.iter().all(|r| r.component == c));
            assert!(group.rules[0].attr.is_positional());
            assert_eq!(group.rules[1].attr, RuleAttr::Shape);
            assert_eq!(group.rules[2].attr, RuleAttr::Size);
            assert_eq!(group.rules[3].attr, RuleAttr::Color);
        }
    }

    #[test]
    fn shape_never_gets_arithmetic() {
        let mut rng = StdRng::seed_from_u64(51);
        for _ in 0..200 {
            let groups = sample_rule_groups(&mut rng, 1);
            assert_ne!(groups[0].rules[1].kind, RuleKind::Arithmetic);
        }
    }

    #[test]
    fn prune_rejects_count_rules_on_singleton_layouts() {
        let template = configs::center_single().template;
        let constant = |attr| Rule::new(RuleKind::Constant, attr, 0, 0);
        let mut rules = vec![
            Rule::new(RuleKind::Progression, RuleAttr::Number, 0, 1),
            constant(RuleAttr::Shape),
            constant(RuleAttr::Size),
            constant(RuleAttr::Color),
        ];
        let groups = vec![RuleGroup {
            rules: rules.clone(),
        }];
        assert!(prune(&template, &groups).is_none());

        rules[0] = constant(RuleAttr::Number);
        let groups = vec![RuleGroup { rules }];
        assert!(prune(&template, &groups).is_some());
    }

    #[test]
    fn prune_narrows_progression_headroom_but_keeps_originals() {
        let template = configs::distribute_nine().template;
        let groups = vec![RuleGroup {
            rules: vec![
                Rule::new(RuleKind::Progression, RuleAttr::Number, 0, 2),
                Rule::new(RuleKind::Constant, RuleAttr::Shape, 0, 0),
                Rule::new(RuleKind::Constant, RuleAttr::Size, 0, 0),
                Rule::new(RuleKind::Constant, RuleAttr::Color, 0, 0),
            ],
        }];
        let narrowed = prune(&template, &groups).unwrap();
        assert_eq!(narrowed.layout(0).number.bounds(), LevelBounds::new(0, 6));
        assert_eq!(narrowed.layout(0).orig_number, LevelBounds::new(0, 8));
    }

    #[test]
    fn prune_rejects_mismatched_component_indices() {
        let template = configs::center_single().template;
        let groups = vec![RuleGroup {
            rules: vec![Rule::new(RuleKind::Constant, RuleAttr::Number, 1, 0)],
        }];
        assert!(prune(&template, &groups).is_none());
    }
}
