//! Builtin panel configurations.
//!
//! Each configuration is a template panel: the structure/component/layout
//! skeleton with slot catalogs and constraints, but no realized attributes.
//! `Panel::sample` turns a template into a concrete grid cell.

use crate::aot::{Component, EntityConstraints, Layout, Panel, Structure};
use crate::core::attribute::{EntityAttr, LevelBounds, NUMBER_VALUES};
use crate::core::slots::SlotBox;

/// A named template panel.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub name: &'static str,
    pub template: Panel,
}

const UNIFORMITY_BOUNDS: LevelBounds = LevelBounds { min: 0, max: 2 };

fn number_bounds(max_entities: usize) -> LevelBounds {
    debug_assert!(max_entities >= 1 && max_entities <= NUMBER_VALUES.len());
    LevelBounds::new(0, max_entities as i32 - 1)
}

fn full_panel_slot() -> Vec<SlotBox> {
    vec![SlotBox::new(0.5, 0.5, 1.0, 1.0)]
}

fn grid_slots(side: usize, origin: f64, extent: f64) -> Vec<SlotBox> {
    let cell = extent / side as f64;
    let mut slots = Vec::with_capacity(side * side);
    for row in 0..side {
        for col in 0..side {
            slots.push(SlotBox::new(
                origin + (col as f64 + 0.5) * cell,
                origin + (row as f64 + 0.5) * cell,
                cell,
                cell,
            ));
        }
    }
    slots
}

fn single_component(name: &'static str, layout: Layout) -> Panel {
    Panel::new(Structure {
        name,
        components: vec![Component {
            name: "Grid",
            layout,
        }],
    })
}

/// One entity filling the whole panel.
pub fn center_single() -> PanelConfig {
    let layout = Layout::template(
        "center",
        number_bounds(1),
        UNIFORMITY_BOUNDS,
        full_panel_slot(),
        EntityConstraints::full(),
    );
    PanelConfig {
        name: "center_single",
        template: single_component("Singleton", layout),
    }
}

/// Up to four entities on a 2x2 grid.
pub fn distribute_four() -> PanelConfig {
    let layout = Layout::template(
        "grid2x2",
        number_bounds(4),
        UNIFORMITY_BOUNDS,
        grid_slots(2, 0.0, 1.0),
        EntityConstraints::full(),
    );
    PanelConfig {
        name: "distribute_four",
        template: single_component("Distribute", layout),
    }
}

/// Up to nine entities on a 3x3 grid.
pub fn distribute_nine() -> PanelConfig {
    let layout = Layout::template(
        "grid3x3",
        number_bounds(9),
        UNIFORMITY_BOUNDS,
        grid_slots(3, 0.0, 1.0),
        EntityConstraints::full(),
    );
    PanelConfig {
        name: "distribute_nine",
        template: single_component("Distribute", layout),
    }
}

fn two_singletons(
    name: &'static str,
    structure: &'static str,
    first: (&'static str, SlotBox),
    second: (&'static str, SlotBox),
) -> PanelConfig {
    let make = |layout_name: &'static str, slot: SlotBox| Layout::template(
        layout_name,
        number_bounds(1),
        UNIFORMITY_BOUNDS,
        vec![slot],
        EntityConstraints::full(),
    );
    PanelConfig {
        name,
        template: Panel::new(Structure {
            name: structure,
            components: vec![
                Component {
                    name: first.0,
                    layout: make("half", first.1),
                },
                Component {
                    name: second.0,
                    layout: make("half", second.1),
                },
            ],
        }),
    }
}

/// Two side-by-side singleton components.
pub fn left_center_single_right_center_single() -> PanelConfig {
    two_singletons(
        "left_center_single_right_center_single",
        "LeftRight",
        ("Left", SlotBox::new(0.25, 0.5, 0.5, 1.0)),
        ("Right", SlotBox::new(0.75, 0.5, 0.5, 1.0)),
    )
}

/// Two stacked singleton components.
pub fn up_center_single_down_center_single() -> PanelConfig {
    two_singletons(
        "up_center_single_down_center_single",
        "UpDown",
        ("Up", SlotBox::new(0.5, 0.25, 1.0, 0.5)),
        ("Down", SlotBox::new(0.5, 0.75, 1.0, 0.5)),
    )
}

/// A large outer singleton with a small inner singleton nested inside it.
pub fn in_center_single_out_center_single() -> PanelConfig {
    let mut outer_cons = EntityConstraints::full();
    // The outer entity must stay large enough to contain the inner one.
    outer_cons.set_bounds(EntityAttr::Size, LevelBounds::new(3, 5));
    let outer = Layout::template(
        "out_center",
        number_bounds(1),
        UNIFORMITY_BOUNDS,
        full_panel_slot(),
        outer_cons,
    );
    let inner = Layout::template(
        "in_center",
        number_bounds(1),
        UNIFORMITY_BOUNDS,
        vec![SlotBox::new(0.5, 0.5, 0.33, 0.33)],
        EntityConstraints::full(),
    );
    PanelConfig {
        name: "in_center_single_out_center_single",
        template: Panel::new(Structure {
            name: "InOut",
            components: vec![
                Component {
                    name: "Out",
                    layout: outer,
                },
                Component {
                    name: "In",
                    layout: inner,
                },
            ],
        }),
    }
}

/// A large outer singleton with an inner 2x2 grid nested inside it.
pub fn in_distribute_four_out_center_single() -> PanelConfig {
    let mut outer_cons = EntityConstraints::full();
    outer_cons.set_bounds(EntityAttr::Size, LevelBounds::new(3, 5));
    let outer = Layout::template(
        "out_center",
        number_bounds(1),
        UNIFORMITY_BOUNDS,
        full_panel_slot(),
        outer_cons,
    );
    let inner = Layout::template(
        "in_grid2x2",
        number_bounds(4),
        UNIFORMITY_BOUNDS,
        grid_slots(2, 0.25, 0.5),
        EntityConstraints::full(),
    );
    PanelConfig {
        name: "in_distribute_four_out_center_single",
        template: Panel::new(Structure {
            name: "InOut",
            components: vec![
                Component {
                    name: "Out",
                    layout: outer,
                },
                Component {
                    name: "In",
                    layout: inner,
                },
            ],
        }),
    }
}

/// Names of every builtin configuration, in a stable order.
pub fn available_names() -> Vec<&'static str> {
    vec![
        "center_single",
        "distribute_four",
        "distribute_nine",
        "left_center_single_right_center_single",
        "up_center_single_down_center_single",
        "in_center_single_out_center_single",
        "in_distribute_four_out_center_single",
    ]
}

/// Look a builtin configuration up by name.
pub fn by_name(name: &str) -> Option<PanelConfig> {
    match name {
        "center_single" => Some(center_single()),
        "distribute_four" => Some(distribute_four()),
        "distribute_nine" => Some(distribute_nine()),
        "left_center_single_right_center_single" => {
            Some(left_center_single_right_center_single())
        }
        "up_center_single_down_center_single" => Some(up_center_single_down_center_single()),
        "in_center_single_out_center_single" => Some(in_center_single_out_center_single()),
        "in_distribute_four_out_center_single" => Some(in_distribute_four_out_center_single()),
        _ => None,
    }
}
