//! Rule-only checker: scores candidate panels against the rule algebra
//! without any generator-internal state.
//!
//! Every satisfaction check here mirrors the arithmetic in [`crate::rules`]
//! to the digit: the ±1 biases, the Color exception, the `abs()` on
//! subtraction, and the empty-layout identities. The generator relies on
//! this agreement: an instance is only emitted when the checker re-derives
//! the generated answer uniquely.

use rand::Rng;
use rustc_hash::FxHashSet;

use crate::aot::{Layout, Panel};
use crate::core::attribute::{number_value, EntityAttr};
use crate::rules::{Rule, RuleAttr, RuleGroup, RuleKind};

/// Score every candidate: one point per satisfied atomic rule, summed over
/// all components' rule groups. `context` is `[lag-2, lag-1]`.
pub fn score_candidates(
    groups: &[RuleGroup],
    context: &[Panel],
    candidates: &[Panel],
) -> Vec<u32> {
    debug_assert!(context.len() >= 2);
    let lag2 = &context[context.len() - 2];
    let lag1 = &context[context.len() - 1];
    candidates
        .iter()
        .map(|cand| {
            groups
                .iter()
                .flat_map(|g| &g.rules)
                .filter(|rule| rule_satisfied(rule, lag2, lag1, cand))
                .count() as u32
        })
        .collect()
}

/// The candidate index whose score is the unique strict maximum, if any.
/// `None` signals an ambiguous or unsolvable puzzle.
pub fn unique_best(scores: &[u32]) -> Option<usize> {
    let max = *scores.iter().max()?;
    if max == 0 {
        return None;
    }
    let mut best = None;
    for (i, &s) in scores.iter().enumerate() {
        if s == max {
            if best.is_some() {
                return None;
            }
            best = Some(i);
        }
    }
    best
}

/// Pick the best-scoring candidate. Ties and all-zero scores fall back to a
/// uniform-random choice among the maximal set, signalling a defective
/// puzzle upstream.
pub fn solve(
    rng: &mut impl Rng,
    groups: &[RuleGroup],
    context: &[Panel],
    candidates: &[Panel],
) -> usize {
    debug_assert!(!candidates.is_empty());
    if context.len() < 2 {
        return rng.gen_range(0..candidates.len());
    }
    let scores = score_candidates(groups, context, candidates);
    let max = scores.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return rng.gen_range(0..candidates.len());
    }
    let best: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|(_, &s)| s == max)
        .map(|(i, _)| i)
        .collect();
    best[rng.gen_range(0..best.len())]
}

/// Whether `cand` satisfies one atomic rule given the last two context
/// panels of its row.
pub fn rule_satisfied(rule: &Rule, lag2: &Panel, lag1: &Panel, cand: &Panel) -> bool {
    let c = rule.component;
    if c >= lag2.component_count() || c >= lag1.component_count() || c >= cand.component_count()
    {
        return false;
    }
    let l1 = lag2.layout(c);
    let l2 = lag1.layout(c);
    let lc = cand.layout(c);
    match rule.attr.entity_attr() {
        None => positional_satisfied(rule, l1, l2, lc),
        Some(attr) => entity_satisfied(rule, attr, l1, l2, lc),
    }
}

fn positional_satisfied(rule: &Rule, l1: &Layout, l2: &Layout, lc: &Layout) -> bool {
    match rule.kind {
        RuleKind::Constant => {
            number_value(l2.number.level()) == number_value(lc.number.level())
                && l2.position.active_set() == lc.position.active_set()
        }
        RuleKind::Progression => match rule.attr {
            RuleAttr::Number => {
                let v1 = l1.number.level();
                let v2 = l2.number.level();
                let v3 = lc.number.level();
                v2 - v1 == v3 - v2 && v2 - v1 == rule.param
            }
            _ => {
                let counts_equal = number_value(l1.number.level())
                    == number_value(l2.number.level())
                    && number_value(l2.number.level()) == number_value(lc.number.level());
                if !counts_equal {
                    return false;
                }
                if lc.is_empty() {
                    return true;
                }
                let m = lc.position.catalog_len() as i32;
                let shifted = |s: &FxHashSet<usize>| -> FxHashSet<usize> {
                    s.iter()
                        .map(|&p| (p as i32 + rule.param).rem_euclid(m) as usize)
                        .collect()
                };
                let s1 = l1.position.active_set();
                let s2 = l2.position.active_set();
                let s3 = lc.position.active_set();
                s2 == shifted(&s1) && s3 == shifted(&s2)
            }
        },
        RuleKind::Arithmetic => match rule.attr {
            RuleAttr::Number => {
                let v1 = l1.number.level();
                let v2 = l2.number.level();
                let v3 = lc.number.level();
                if rule.param > 0 {
                    v3 == v1 + v2 + 1
                } else {
                    v3 == (v1 - v2).abs()
                }
            }
            _ => {
                let s1 = l1.position.active_set();
                let s2 = l2.position.active_set();
                let s3 = lc.position.active_set();
                let expected: FxHashSet<usize> = if rule.param > 0 {
                    s1.union(&s2).copied().collect()
                } else {
                    s1.difference(&s2).copied().collect()
                };
                s3 == expected
            }
        },
        RuleKind::DistributeThree => match rule.attr {
            RuleAttr::Number => {
                let v1 = l1.number.level();
                let v2 = l2.number.level();
                let v3 = lc.number.level();
                v1 != v2 && v1 != v3 && v2 != v3
            }
            _ => {
                let s1 = l1.position.active_set();
                let s2 = l2.position.active_set();
                let s3 = lc.position.active_set();
                s1 != s2 && s1 != s3 && s2 != s3
            }
        },
    }
}

fn entity_satisfied(
    rule: &Rule,
    attr: EntityAttr,
    l1: &Layout,
    l2: &Layout,
    lc: &Layout,
) -> bool {
    // Entity rules only apply to layouts whose siblings agree on the
    // attribute (empty layouts count as consistent).
    if !l1.consistent(attr) || !l2.consistent(attr) || !lc.consistent(attr) {
        return false;
    }
    let (e1, e2, e3) = (l1.is_empty(), l2.is_empty(), lc.is_empty());

    if e1 && e2 && e3 {
        return true;
    }

    // Candidate emptied out: only a subtractive Arithmetic that cancelled
    // two equal operands explains it.
    if e3 {
        if rule.kind == RuleKind::Arithmetic && rule.param < 0 && !e1 && !e2 {
            return l1.entity_level(attr) == l2.entity_level(attr);
        }
        return false;
    }

    // An empty operand feeding a non-empty candidate: only an additive
    // Arithmetic with the empty side treated as level zero.
    if e1 || e2 {
        if rule.kind == RuleKind::Arithmetic && rule.param > 0 {
            let v1 = l1.entity_level(attr).unwrap_or(0);
            let v2 = l2.entity_level(attr).unwrap_or(0);
            let v3 = match lc.entity_level(attr) {
                Some(v) => v,
                None => return false,
            };
            let expected = if rule.attr == RuleAttr::Color {
                v1 + v2
            } else {
                v1 + v2 + 1
            };
            return v3 == expected;
        }
        return false;
    }

    let v1 = match l1.entity_level(attr) {
        Some(v) => v,
        None => return false,
    };
    let v2 = match l2.entity_level(attr) {
        Some(v) => v,
        None => return false,
    };
    let v3 = match lc.entity_level(attr) {
        Some(v) => v,
        None => return false,
    };

    match rule.kind {
        RuleKind::Constant => v3 == v2,
        RuleKind::Progression => v2 - v1 == v3 - v2 && v2 - v1 == rule.param,
        RuleKind::Arithmetic => {
            if rule.param > 0 {
                let expected = if rule.attr == RuleAttr::Color {
                    v1 + v2
                } else {
                    v1 + v2 + 1
                };
                v3 == expected
            } else {
                let expected = if rule.attr == RuleAttr::Color {
                    (v1 - v2).abs()
                } else {
                    (v1 - v2 - 1).abs()
                };
                v3 == expected
            }
        }
        RuleKind::DistributeThree => v1 != v2 && v1 != v3 && v2 != v3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn single(seed: u64) -> Panel {
        let mut rng = StdRng::seed_from_u64(seed);
        configs::center_single().template.sample(&mut rng)
    }

    fn with_color(seed: u64, level: i32) -> Panel {
        let mut p = single(seed);
        p.layout_mut(0).set_entity_levels(EntityAttr::Color, level);
        p
    }

    #[test]
    fn color_arithmetic_check_is_unbiased() {
        let rule = Rule::new(RuleKind::Arithmetic, RuleAttr::Color, 0, 1);
        let lag2 = with_color(1, 2);
        let lag1 = with_color(2, 3);
        let good = with_color(3, 5);
        let biased = with_color(4, 6);
        assert!(rule_satisfied(&rule, &lag2, &lag1, &good));
        assert!(!rule_satisfied(&rule, &lag2, &lag1, &biased));
    }

    #[test]
    fn size_arithmetic_check_keeps_the_bias() {
        let rule = Rule::new(RuleKind::Arithmetic, RuleAttr::Size, 0, 1);
        let mut lag2 = single(5);
        let mut lag1 = single(6);
        let mut good = single(7);
        lag2.layout_mut(0).set_entity_levels(EntityAttr::Size, 1);
        lag1.layout_mut(0).set_entity_levels(EntityAttr::Size, 2);
        good.layout_mut(0).set_entity_levels(EntityAttr::Size, 4);
        assert!(rule_satisfied(&rule, &lag2, &lag1, &good));
    }

    #[test]
    fn progression_check_requires_the_sampled_step() {
        let rule = Rule::new(RuleKind::Progression, RuleAttr::Color, 0, 2);
        let lag2 = with_color(8, 1);
        let lag1 = with_color(9, 3);
        let good = with_color(10, 5);
        let wrong_step = with_color(11, 4);
        assert!(rule_satisfied(&rule, &lag2, &lag1, &good));
        assert!(!rule_satisfied(&rule, &lag2, &lag1, &wrong_step));
    }

    #[test]
    fn unique_best_rejects_ties_and_zeros() {
        assert_eq!(unique_best(&[0, 0, 0]), None);
        assert_eq!(unique_best(&[3, 3, 1]), None);
        assert_eq!(unique_best(&[1, 4, 2]), Some(1));
    }

    #[test]
    fn solve_prefers_the_unique_best() {
        let mut rng = StdRng::seed_from_u64(40);
        let rule = Rule::new(RuleKind::Constant, RuleAttr::Color, 0, 0);
        let groups = vec![RuleGroup { rules: vec![rule] }];
        let lag2 = with_color(12, 4);
        let lag1 = with_color(13, 4);
        let candidates = vec![with_color(14, 7), with_color(15, 4), with_color(16, 9)];
        let context = vec![lag2, lag1];
        assert_eq!(solve(&mut rng, &groups, &context, &candidates), 1);
    }
}
