use rand::Rng;
use serde::{Deserialize, Serialize};

/// Entity counts realized by the `Number` attribute, indexed by level.
pub const NUMBER_VALUES: [usize; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Shape names, indexed by level (ordered by vertex count, circle last).
pub const SHAPE_NAMES: [&str; 5] = ["triangle", "square", "pentagon", "hexagon", "circle"];

/// Scale factors relative to the slot bounding box, indexed by level.
pub const SIZE_VALUES: [f64; 6] = [0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

/// Fill intensities (255 = white, 0 = black), indexed by level.
pub const COLOR_VALUES: [u8; 10] = [255, 224, 196, 168, 140, 112, 84, 56, 28, 0];

/// Rotation angles in degrees, indexed by level.
pub const ANGLE_VALUES: [i32; 8] = [-135, -90, -45, 0, 45, 90, 135, 180];

/// Uniformity table, indexed by level. Two `false` entries bias sampling
/// towards non-uniform layouts.
pub const UNIFORMITY_VALUES: [bool; 3] = [false, false, true];

#[inline]
pub fn number_value(level: i32) -> usize {
    NUMBER_VALUES[level as usize]
}

#[inline]
pub fn shape_name(level: i32) -> &'static str {
    SHAPE_NAMES[level as usize]
}

#[inline]
pub fn size_value(level: i32) -> f64 {
    SIZE_VALUES[level as usize]
}

#[inline]
pub fn color_value(level: i32) -> u8 {
    COLOR_VALUES[level as usize]
}

#[inline]
pub fn angle_value(level: i32) -> i32 {
    ANGLE_VALUES[level as usize]
}

/// The non-positional attributes every entity carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityAttr {
    Shape,
    Size,
    Color,
    Angle,
}

impl EntityAttr {
    /// Full legal level domain of the attribute's value table.
    #[inline]
    pub fn full_domain(self) -> LevelBounds {
        match self {
            EntityAttr::Shape => LevelBounds::new(0, SHAPE_NAMES.len() as i32 - 1),
            EntityAttr::Size => LevelBounds::new(0, SIZE_VALUES.len() as i32 - 1),
            EntityAttr::Color => LevelBounds::new(0, COLOR_VALUES.len() as i32 - 1),
            EntityAttr::Angle => LevelBounds::new(0, ANGLE_VALUES.len() as i32 - 1),
        }
    }
}

/// An inclusive range of operable levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBounds {
    pub min: i32,
    pub max: i32,
}

impl LevelBounds {
    #[inline]
    pub fn new(min: i32, max: i32) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.max - self.min + 1) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    #[inline]
    pub fn contains(&self, level: i32) -> bool {
        self.min <= level && level <= self.max
    }

    #[inline]
    pub fn clip(&self, level: i32) -> i32 {
        level.clamp(self.min, self.max)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = i32> {
        self.min..=self.max
    }

    /// Shrink the range by `by` from the top (positive `by`) or bottom
    /// (negative `by`). Collapses to a single level rather than inverting.
    pub fn shrunk(&self, by: i32) -> Self {
        if by >= 0 {
            Self {
                min: self.min,
                max: (self.max - by).max(self.min),
            }
        } else {
            Self {
                min: (self.min - by).min(self.max),
                max: self.max,
            }
        }
    }
}

/// A discrete leveled attribute: an index into one of the value tables,
/// together with its operable bounds and the levels realized earlier in the
/// current generation run.
///
/// Mutations clip the level: ordinarily into the attribute's own bounds,
/// or into a caller-supplied domain via [`LeveledAttr::set_level_within`].
#[derive(Debug, Clone, PartialEq)]
pub struct LeveledAttr {
    level: i32,
    bounds: LevelBounds,
    history: Vec<i32>,
}

impl LeveledAttr {
    pub fn new(bounds: LevelBounds) -> Self {
        Self {
            level: bounds.min,
            bounds,
            history: Vec::new(),
        }
    }

    #[inline]
    pub fn level(&self) -> i32 {
        self.level
    }

    #[inline]
    pub fn bounds(&self) -> LevelBounds {
        self.bounds
    }

    #[inline]
    pub fn set_level(&mut self, level: i32) {
        self.level = self.bounds.clip(level);
    }

    /// Set the level clipped against `bounds` instead of the attribute's
    /// own. Used for values derived in or drawn from a wider domain than
    /// the current sampling bounds.
    #[inline]
    pub fn set_level_within(&mut self, bounds: LevelBounds, level: i32) {
        self.level = bounds.clip(level);
    }

    /// Copy `other`'s level verbatim. Levels written through
    /// [`LeveledAttr::set_level_within`] may sit outside this attribute's
    /// own bounds; a copy must preserve them exactly.
    #[inline]
    pub fn copy_level_from(&mut self, other: &LeveledAttr) {
        self.level = other.level;
    }

    /// Narrow the operable bounds, keeping the level inside them.
    pub fn narrow(&mut self, bounds: LevelBounds) {
        let min = bounds.min.max(self.bounds.min);
        let max = bounds.max.min(self.bounds.max);
        if min <= max {
            self.bounds = LevelBounds::new(min, max);
            self.level = self.bounds.clip(self.level);
        }
    }

    #[inline]
    pub fn record_history(&mut self) {
        self.history.push(self.level);
    }

    /// Draw a level uniformly from the intersection of the attribute's own
    /// bounds and the supplied bounds.
    pub fn sample(&mut self, rng: &mut impl Rng, min: i32, max: i32) {
        let lo = min.max(self.bounds.min);
        let hi = max.min(self.bounds.max);
        debug_assert!(lo <= hi);
        self.level = rng.gen_range(lo..=hi);
    }

    pub fn sample_in_bounds(&mut self, rng: &mut impl Rng) {
        self.sample(rng, self.bounds.min, self.bounds.max);
    }

    /// Draw a level in `bounds` (defaults to the attribute's own bounds) that
    /// avoids `excluded`, the attribute's history, and the current level.
    ///
    /// When the exclusions cover the whole domain the constraints are relaxed
    /// progressively: first the history is dropped, then the current level,
    /// and as a last resort any in-bounds level is allowed. A domain of one
    /// or two levels therefore degrades to a repeat instead of panicking.
    pub fn sample_new(
        &self,
        rng: &mut impl Rng,
        bounds: Option<LevelBounds>,
        excluded: &[i32],
    ) -> i32 {
        let b = bounds.unwrap_or(self.bounds);
        let all: Vec<i32> = b.iter().collect();
        debug_assert!(!all.is_empty());

        let strict: Vec<i32> = all
            .iter()
            .copied()
            .filter(|l| {
                *l != self.level && !excluded.contains(l) && !self.history.contains(l)
            })
            .collect();
        if !strict.is_empty() {
            return strict[rng.gen_range(0..strict.len())];
        }

        let no_history: Vec<i32> = all
            .iter()
            .copied()
            .filter(|l| *l != self.level && !excluded.contains(l))
            .collect();
        if !no_history.is_empty() {
            return no_history[rng.gen_range(0..no_history.len())];
        }

        let no_current: Vec<i32> = all.iter().copied().filter(|l| *l != self.level).collect();
        if !no_current.is_empty() {
            return no_current[rng.gen_range(0..no_current.len())];
        }

        all[rng.gen_range(0..all.len())]
    }
}

/// Whether sibling entities in a layout must share identical non-positional
/// levels. Sampled once at panel creation and never resampled by rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniformity {
    level: i32,
    bounds: LevelBounds,
}

impl Uniformity {
    pub fn new(bounds: LevelBounds) -> Self {
        debug_assert!(bounds.min >= 0 && bounds.max < UNIFORMITY_VALUES.len() as i32);
        Self {
            level: bounds.min,
            bounds,
        }
    }

    pub fn sample(&mut self, rng: &mut impl Rng) {
        self.level = rng.gen_range(self.bounds.min..=self.bounds.max);
    }

    #[inline]
    pub fn level(&self) -> i32 {
        self.level
    }

    #[inline]
    pub fn is_uniform(&self) -> bool {
        UNIFORMITY_VALUES[self.level as usize]
    }
}
