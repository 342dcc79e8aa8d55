//! The scene graph ("attributed object tree"): a fixed-depth hierarchy
//! Panel → Structure → Component → Layout → Entity.
//!
//! Panels own their full subtree; a "deep copy" is an ordinary [`Clone`].
//! No aliasing between panels exists, so rules may mutate a cloned panel
//! freely without observing another column's state.

use rand::Rng;

use crate::core::attribute::{
    number_value, EntityAttr, LevelBounds, LeveledAttr, Uniformity,
};
use crate::core::slots::{PositionAttr, SlotBox};

/// Per-entity level bounds for the four non-positional attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityConstraints {
    pub shape: LevelBounds,
    pub size: LevelBounds,
    pub color: LevelBounds,
    pub angle: LevelBounds,
}

impl EntityConstraints {
    /// The full legal domain of every entity attribute.
    pub fn full() -> Self {
        Self {
            shape: EntityAttr::Shape.full_domain(),
            size: EntityAttr::Size.full_domain(),
            color: EntityAttr::Color.full_domain(),
            angle: EntityAttr::Angle.full_domain(),
        }
    }

    #[inline]
    pub fn bounds(&self, attr: EntityAttr) -> LevelBounds {
        match attr {
            EntityAttr::Shape => self.shape,
            EntityAttr::Size => self.size,
            EntityAttr::Color => self.color,
            EntityAttr::Angle => self.angle,
        }
    }

    pub fn set_bounds(&mut self, attr: EntityAttr, bounds: LevelBounds) {
        match attr {
            EntityAttr::Shape => self.shape = bounds,
            EntityAttr::Size => self.size = bounds,
            EntityAttr::Color => self.color = bounds,
            EntityAttr::Angle => self.angle = bounds,
        }
    }
}

/// A leaf scene object: one drawable shape with its realized bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub shape: LeveledAttr,
    pub size: LeveledAttr,
    pub color: LeveledAttr,
    pub angle: LeveledAttr,
    pub bbox: SlotBox,
}

impl Entity {
    /// Draw a fresh entity within `cons`, placed at `bbox`.
    pub fn sample(rng: &mut impl Rng, cons: &EntityConstraints, bbox: SlotBox) -> Self {
        let mut e = Self {
            shape: LeveledAttr::new(cons.shape),
            size: LeveledAttr::new(cons.size),
            color: LeveledAttr::new(cons.color),
            angle: LeveledAttr::new(cons.angle),
            bbox,
        };
        e.resample(rng);
        e
    }

    /// Redraw every non-positional attribute independently within this
    /// entity's own bounds.
    pub fn resample(&mut self, rng: &mut impl Rng) {
        self.shape.sample_in_bounds(rng);
        self.size.sample_in_bounds(rng);
        self.color.sample_in_bounds(rng);
        self.angle.sample_in_bounds(rng);
    }

    #[inline]
    pub fn attr(&self, attr: EntityAttr) -> &LeveledAttr {
        match attr {
            EntityAttr::Shape => &self.shape,
            EntityAttr::Size => &self.size,
            EntityAttr::Color => &self.color,
            EntityAttr::Angle => &self.angle,
        }
    }

    #[inline]
    pub fn attr_mut(&mut self, attr: EntityAttr) -> &mut LeveledAttr {
        match attr {
            EntityAttr::Shape => &mut self.shape,
            EntityAttr::Size => &mut self.size,
            EntityAttr::Color => &mut self.color,
            EntityAttr::Angle => &mut self.angle,
        }
    }

    /// Copy the non-positional levels of `other` verbatim (bounding box
    /// unchanged). Not clipped: the source level is legal by construction.
    pub fn match_levels(&mut self, other: &Entity) {
        self.shape.copy_level_from(&other.shape);
        self.size.copy_level_from(&other.size);
        self.color.copy_level_from(&other.color);
        self.angle.copy_level_from(&other.angle);
    }

    /// Resolved levels, used for structural comparisons.
    #[inline]
    pub fn signature(&self) -> (i32, i32, i32, i32) {
        (
            self.shape.level(),
            self.size.level(),
            self.color.level(),
            self.angle.level(),
        )
    }
}

/// A layout: the number/position/uniformity attributes plus the entities
/// placed into the active slots.
///
/// Layouts carry two constraint sets: the *current* one (used for ordinary
/// sampling, possibly narrowed by feasibility checking) and the *original*
/// one (the unnarrowed domain, which rule outputs are sampled from and
/// written against).
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub name: &'static str,
    pub number: LeveledAttr,
    pub position: PositionAttr,
    pub uniformity: Uniformity,
    pub entities: Vec<Entity>,
    pub entity_constraint: EntityConstraints,
    pub orig_entity_constraint: EntityConstraints,
    pub orig_number: LevelBounds,
}

impl Layout {
    pub fn template(
        name: &'static str,
        number_bounds: LevelBounds,
        uniformity_bounds: LevelBounds,
        catalog: Vec<SlotBox>,
        entity_constraint: EntityConstraints,
    ) -> Self {
        Self {
            name,
            number: LeveledAttr::new(number_bounds),
            position: PositionAttr::new(catalog),
            uniformity: Uniformity::new(uniformity_bounds),
            entities: Vec::new(),
            entity_constraint,
            orig_entity_constraint: entity_constraint,
            orig_number: number_bounds,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&Entity> {
        self.entities.first()
    }

    /// The first entity's level for `attr`, or `None` when empty.
    pub fn entity_level(&self, attr: EntityAttr) -> Option<i32> {
        self.first().map(|e| e.attr(attr).level())
    }

    /// True when every entity shares the same level for `attr`. Empty
    /// layouts count as consistent.
    pub fn consistent(&self, attr: EntityAttr) -> bool {
        match self.first() {
            None => true,
            Some(first) => {
                let lvl = first.attr(attr).level();
                self.entities.iter().all(|e| e.attr(attr).level() == lvl)
            }
        }
    }

    /// Set every entity's level for `attr` (clipped per entity bounds).
    pub fn set_entity_levels(&mut self, attr: EntityAttr, level: i32) {
        for e in &mut self.entities {
            e.attr_mut(attr).set_level(level);
        }
    }

    /// Write a Number level produced by a rule. Rule outputs are derived in
    /// or drawn from the original domain, so they clip against it rather
    /// than the narrowed sampling bounds.
    pub fn set_number_derived(&mut self, level: i32) {
        self.number.set_level_within(self.orig_number, level);
    }

    /// Rule-output counterpart of [`Layout::set_entity_levels`]: clips
    /// against the original per-entity domain instead of the narrowed one.
    pub fn set_entity_levels_derived(&mut self, attr: EntityAttr, level: i32) {
        let bounds = self.orig_entity_constraint.bounds(attr);
        for e in &mut self.entities {
            e.attr_mut(attr).set_level_within(bounds, level);
        }
    }

    /// Append `entity`. When the layout is uniform and siblings exist, the
    /// new entity's non-positional levels are forced to match the first
    /// sibling rather than kept as sampled.
    pub fn insert(&mut self, mut entity: Entity) {
        if self.uniformity.is_uniform() {
            if let Some(first) = self.entities.first() {
                let first = first.clone();
                entity.match_levels(&first);
            }
        }
        self.entities.push(entity);
    }

    /// Realize every attribute of this layout from scratch.
    pub fn sample(&mut self, rng: &mut impl Rng) {
        self.uniformity.sample(rng);
        self.number.sample_in_bounds(rng);
        self.number.record_history();
        self.position.sample(rng, number_value(self.number.level()));
        self.entities.clear();
        for bbox in self.position.boxes() {
            let entity = Entity::sample(rng, &self.entity_constraint, bbox);
            self.insert(entity);
        }
    }

    /// Destroy and rebuild the entity list for the current active slots.
    ///
    /// Each slot receives a clone of `template` (re-boxed, and independently
    /// resampled unless the layout is uniform), or a freshly sampled entity
    /// when no template exists.
    pub fn rebuild_entities(&mut self, rng: &mut impl Rng, template: Option<&Entity>) {
        let uniform = self.uniformity.is_uniform();
        let boxes = self.position.boxes();
        self.entities.clear();
        for bbox in boxes {
            let entity = match template {
                Some(t) => {
                    let mut e = t.clone();
                    e.bbox = bbox;
                    if !uniform {
                        e.resample(rng);
                    }
                    e
                }
                None => Entity::sample(rng, &self.entity_constraint, bbox),
            };
            self.insert(entity);
        }
    }

    /// Re-box existing entities to the current active slots without
    /// rebuilding them. Counts must match.
    pub fn rebox_entities(&mut self) {
        let boxes = self.position.boxes();
        debug_assert_eq!(boxes.len(), self.entities.len());
        for (e, bbox) in self.entities.iter_mut().zip(boxes) {
            e.bbox = bbox;
        }
    }

    /// Change the entity count while keeping surviving entities untouched.
    ///
    /// Shrinking drops entities from the tail; growing occupies free slots
    /// and clones the first entity into them (or samples fresh ones when the
    /// layout was empty).
    pub fn set_count_preserving(&mut self, rng: &mut impl Rng, level: i32) {
        self.set_number_derived(level);
        let target = number_value(self.number.level());
        let current = self.entities.len();
        if target < current {
            let keep = self.position.active()[..target].to_vec();
            self.position.set_active(keep);
            self.entities.truncate(target);
        } else if target > current {
            // fill_free prepends; mirror it so entity order tracks active order.
            for (_, bbox) in self.position.fill_free(rng, target - current) {
                let entity = match self.entities.first() {
                    Some(first) => {
                        let mut e = first.clone();
                        e.bbox = bbox;
                        e
                    }
                    None => Entity::sample(rng, &self.entity_constraint, bbox),
                };
                self.entities.insert(0, entity);
            }
        }
    }

    /// Adopt a specific active slot subset, resizing the entity list to
    /// match (survivors keep their levels, additions clone the first entity).
    pub fn set_positions_preserving(&mut self, rng: &mut impl Rng, active: Vec<usize>) {
        debug_assert!(!active.is_empty());
        self.set_number_derived(active.len() as i32 - 1);
        while self.entities.len() > active.len() {
            self.entities.pop();
        }
        while self.entities.len() < active.len() {
            let entity = match self.entities.first() {
                Some(first) => first.clone(),
                None => {
                    let bbox = self.position.catalog()[active[0]];
                    Entity::sample(rng, &self.entity_constraint, bbox)
                }
            };
            self.entities.push(entity);
        }
        self.position.set_active(active);
        self.rebox_entities();
    }

    /// Structural equivalence on resolved attributes: same count, same
    /// active slot set, and identical entity signatures per slot.
    pub fn equivalent(&self, other: &Layout) -> bool {
        if self.number.level() != other.number.level() {
            return false;
        }
        if self.position.active_set() != other.position.active_set() {
            return false;
        }
        let key = |l: &Layout| {
            let mut v: Vec<(usize, (i32, i32, i32, i32))> = l
                .position
                .active()
                .iter()
                .zip(&l.entities)
                .map(|(&idx, e)| (idx, e.signature()))
                .collect();
            v.sort_unstable();
            v
        };
        key(self) == key(other)
    }
}

/// A named grouping of exactly one layout, addressed by index from rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: &'static str,
    pub layout: Layout,
}

/// The overall configuration: one or more components.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub name: &'static str,
    pub components: Vec<Component>,
}

/// One cell of the puzzle grid: a fully realized scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub structure: Structure,
}

impl Panel {
    pub fn new(structure: Structure) -> Self {
        Self { structure }
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        self.structure.components.len()
    }

    #[inline]
    pub fn layout(&self, component: usize) -> &Layout {
        &self.structure.components[component].layout
    }

    #[inline]
    pub fn layout_mut(&mut self, component: usize) -> &mut Layout {
        &mut self.structure.components[component].layout
    }

    /// Realize a fresh panel from this template: every attribute at every
    /// depth is redrawn subject to the current constraints.
    pub fn sample(&self, rng: &mut impl Rng) -> Panel {
        let mut panel = self.clone();
        for component in &mut panel.structure.components {
            component.layout.sample(rng);
        }
        panel
    }

    /// Replace component `index` with the same component of `src`.
    pub fn merge_component(&mut self, src: &Panel, index: usize) {
        self.structure.components[index] = src.structure.components[index].clone();
    }

    /// Structural equivalence on resolved attributes across all components.
    pub fn equivalent(&self, other: &Panel) -> bool {
        self.component_count() == other.component_count()
            && self
                .structure
                .components
                .iter()
                .zip(&other.structure.components)
                .all(|(a, b)| a.layout.equivalent(&b.layout))
    }
}
