//! The rule engine: four operator families over scene-graph attributes.
//!
//! Rules are stateless. Every application is a pure function of the last one
//! (unary) or two (binary) panels of the row history plus the rule's sampled
//! parameter; no rule-instance counters exist. This is what lets the solver
//! re-derive satisfaction from the same triple of panels.

use std::fmt;

use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::aot::Panel;
use crate::core::attribute::{number_value, EntityAttr};

/// The four operator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Constant,
    Progression,
    Arithmetic,
    DistributeThree,
}

impl RuleKind {
    /// Number of preceding panels the rule reads.
    #[inline]
    pub fn arity(self) -> usize {
        match self {
            RuleKind::Constant | RuleKind::Progression => 1,
            RuleKind::Arithmetic | RuleKind::DistributeThree => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleKind::Constant => "Constant",
            RuleKind::Progression => "Progression",
            RuleKind::Arithmetic => "Arithmetic",
            RuleKind::DistributeThree => "DistributeThree",
        }
    }
}

/// The attributes a rule may bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleAttr {
    Number,
    Position,
    Shape,
    Size,
    Color,
}

impl RuleAttr {
    /// True for the attributes that govern slot occupancy.
    #[inline]
    pub fn is_positional(self) -> bool {
        matches!(self, RuleAttr::Number | RuleAttr::Position)
    }

    /// The per-entity attribute this binds to, if any.
    #[inline]
    pub fn entity_attr(self) -> Option<EntityAttr> {
        match self {
            RuleAttr::Shape => Some(EntityAttr::Shape),
            RuleAttr::Size => Some(EntityAttr::Size),
            RuleAttr::Color => Some(EntityAttr::Color),
            RuleAttr::Number | RuleAttr::Position => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleAttr::Number => "Number",
            RuleAttr::Position => "Position",
            RuleAttr::Shape => "Shape",
            RuleAttr::Size => "Size",
            RuleAttr::Color => "Color",
        }
    }
}

/// Structured failure from rule application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyError {
    /// An Arithmetic union/difference on Position produced an empty slot
    /// set; the derived panel must be discarded by the caller.
    EmptyPositionResult { component: usize },
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::EmptyPositionResult { component } => write!(
                f,
                "position arithmetic produced an empty slot set in component {component}"
            ),
        }
    }
}

impl std::error::Error for ApplyError {}

/// An immutable-after-construction operator bound to one attribute and one
/// component index, with one sampled parameter:
/// the progression step, or the arithmetic sign, or unused (0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub kind: RuleKind,
    pub attr: RuleAttr,
    pub component: usize,
    pub param: i32,
}

/// One rule per attribute category for a single component. The first rule
/// governs Number or Position; the rest govern entity attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub rules: Vec<Rule>,
}

impl Rule {
    pub fn new(kind: RuleKind, attr: RuleAttr, component: usize, param: i32) -> Self {
        Self {
            kind,
            attr,
            component,
            param,
        }
    }

    /// Transform `history` into the next panel of the row.
    ///
    /// `history` holds the already-produced panels of the row; only the last
    /// one (unary) or two (binary) are read. `template`, when present, is
    /// the partially-built panel a multi-rule group chains onto; otherwise
    /// the new panel is based on the most recent history panel.
    ///
    /// A binary rule invoked with a single history panel returns a plain
    /// copy of it. That output carries no rule semantics; callers must
    /// verify the finished column through the solver before accepting it.
    pub fn apply(
        &self,
        rng: &mut impl Rng,
        history: &[Panel],
        template: Option<&Panel>,
    ) -> Result<Panel, ApplyError> {
        debug_assert!(!history.is_empty());
        let last = &history[history.len() - 1];
        if self.kind.arity() == 2 && history.len() < 2 {
            return Ok(last.clone());
        }
        let mut out = template.unwrap_or(last).clone();
        match self.kind {
            RuleKind::Constant => {}
            RuleKind::Progression => self.apply_progression(rng, last, &mut out),
            RuleKind::Arithmetic => {
                let prev = &history[history.len() - 2];
                self.apply_arithmetic(rng, prev, last, &mut out)?;
            }
            RuleKind::DistributeThree => {
                let prev = &history[history.len() - 2];
                self.apply_distribute_three(rng, prev, last, &mut out);
            }
        }
        Ok(out)
    }

    fn apply_progression(&self, rng: &mut impl Rng, src: &Panel, out: &mut Panel) {
        let c = self.component;
        if src.layout(c).is_empty() {
            return;
        }
        match self.attr {
            RuleAttr::Number => {
                let template = src.layout(c).first().cloned();
                let layout = out.layout_mut(c);
                let next = layout.number.level() + self.param;
                layout.set_number_derived(next);
                let count = number_value(layout.number.level());
                layout.position.sample(rng, count);
                layout.rebuild_entities(rng, template.as_ref());
            }
            RuleAttr::Position => {
                let layout = out.layout_mut(c);
                layout.position.shift(self.param);
                layout.rebox_entities();
            }
            RuleAttr::Shape | RuleAttr::Size | RuleAttr::Color => {
                let attr = self.attr.entity_attr().unwrap_or(EntityAttr::Shape);
                // Propagate from the source column's first entity; siblings
                // homogenize onto it implicitly.
                if let Some(base) = src.layout(c).entity_level(attr) {
                    out.layout_mut(c)
                        .set_entity_levels_derived(attr, base + self.param);
                }
            }
        }
    }

    fn apply_arithmetic(
        &self,
        rng: &mut impl Rng,
        prev: &Panel,
        last: &Panel,
        out: &mut Panel,
    ) -> Result<(), ApplyError> {
        let c = self.component;
        match self.attr {
            RuleAttr::Number => {
                let v1 = prev.layout(c).number.level();
                let v2 = last.layout(c).number.level();
                let total = if self.param > 0 {
                    v1 + v2 + 1
                } else {
                    (v1 - v2).abs()
                };
                let template = last.layout(c).first().cloned();
                let layout = out.layout_mut(c);
                layout.set_number_derived(total);
                let count = number_value(layout.number.level());
                layout.position.sample(rng, count);
                layout.rebuild_entities(rng, template.as_ref());
            }
            RuleAttr::Position => {
                let s1 = prev.layout(c).position.active_set();
                let s2 = last.layout(c).position.active_set();
                let result: FxHashSet<usize> = if self.param > 0 {
                    s1.union(&s2).copied().collect()
                } else {
                    s1.difference(&s2).copied().collect()
                };
                if result.is_empty() {
                    return Err(ApplyError::EmptyPositionResult { component: c });
                }
                let mut active: Vec<usize> = result.into_iter().collect();
                active.sort_unstable();
                let template = last.layout(c).first().cloned();
                let layout = out.layout_mut(c);
                // The cardinality is a fact, not a sample; it never exceeds
                // the catalog and must not be clipped by narrowed bounds.
                layout.set_number_derived(active.len() as i32 - 1);
                layout.position.set_active(active);
                layout.rebuild_entities(rng, template.as_ref());
            }
            RuleAttr::Shape | RuleAttr::Size | RuleAttr::Color => {
                if prev.layout(c).is_empty() || last.layout(c).is_empty() {
                    return Ok(());
                }
                let attr = self.attr.entity_attr().unwrap_or(EntityAttr::Size);
                let v1 = prev.layout(c).entity_level(attr).unwrap_or(0);
                let v2 = last.layout(c).entity_level(attr).unwrap_or(0);
                // Color combines without the ±1 bias all other entity
                // attributes carry.
                let level = match (self.attr, self.param > 0) {
                    (RuleAttr::Color, true) => v1 + v2,
                    (RuleAttr::Color, false) => (v1 - v2).abs(),
                    (_, true) => v1 + v2 + 1,
                    (_, false) => (v1 - v2 - 1).abs(),
                };
                out.layout_mut(c).set_entity_levels_derived(attr, level);
            }
        }
        Ok(())
    }

    fn apply_distribute_three(
        &self,
        rng: &mut impl Rng,
        prev: &Panel,
        last: &Panel,
        out: &mut Panel,
    ) {
        let c = self.component;
        match self.attr {
            RuleAttr::Number => {
                let domain = out.layout(c).orig_number;
                if domain.len() < 3 {
                    return;
                }
                let v1 = prev.layout(c).number.level();
                let v2 = last.layout(c).number.level();
                let pool: Vec<i32> = domain.iter().filter(|l| *l != v1 && *l != v2).collect();
                let v3 = if pool.is_empty() {
                    let all: Vec<i32> = domain.iter().collect();
                    all[rng.gen_range(0..all.len())]
                } else {
                    pool[rng.gen_range(0..pool.len())]
                };
                let template = last.layout(c).first().cloned();
                let layout = out.layout_mut(c);
                layout.set_number_derived(v3);
                let count = number_value(layout.number.level());
                layout.position.sample(rng, count);
                layout.rebuild_entities(rng, template.as_ref());
            }
            RuleAttr::Position => {
                // Slot occupancy is gated by the same original Number domain
                // as the count itself.
                if out.layout(c).orig_number.len() < 3 {
                    return;
                }
                let s1 = prev.layout(c).position.active_set();
                let s2 = last.layout(c).position.active_set();
                let layout = out.layout_mut(c);
                let count = number_value(layout.number.level());
                let active = layout.position.sample_distinct(rng, count, &[s1, s2]);
                layout.position.set_active(active);
                if layout.position.active().len() == layout.entities.len() {
                    layout.rebox_entities();
                } else {
                    let template = last.layout(c).first().cloned();
                    layout.rebuild_entities(rng, template.as_ref());
                }
            }
            RuleAttr::Shape | RuleAttr::Size | RuleAttr::Color => {
                let attr = self.attr.entity_attr().unwrap_or(EntityAttr::Shape);
                let domain = out.layout(c).orig_entity_constraint.bounds(attr);
                if domain.len() < 3 {
                    return;
                }
                if prev.layout(c).is_empty() || last.layout(c).is_empty() {
                    return;
                }
                let v1 = prev.layout(c).entity_level(attr).unwrap_or(0);
                let v2 = last.layout(c).entity_level(attr).unwrap_or(0);
                let pool: Vec<i32> = domain.iter().filter(|l| *l != v1 && *l != v2).collect();
                let v3 = if pool.is_empty() {
                    let all: Vec<i32> = domain.iter().collect();
                    all[rng.gen_range(0..all.len())]
                } else {
                    pool[rng.gen_range(0..pool.len())]
                };
                out.layout_mut(c).set_entity_levels_derived(attr, v3);
            }
        }
    }
}
