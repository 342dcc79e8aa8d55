//! Exportable instance manifests and loaders.
//!
//! A manifest stores everything needed to render or re-grade an instance
//! without the generator: the realized grid and candidate panels with both
//! their discrete levels and their resolved semantic values, the rule
//! groups per derived column, and the answer index.

use std::fmt;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::aot::{Entity, Layout, Panel};
use crate::core::attribute::{angle_value, color_value, shape_name, size_value};
use crate::core::slots::SlotBox;
use crate::generator::Puzzle;
use crate::rules::RuleGroup;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug)]
pub enum ManifestError {
    Io {
        stage: &'static str,
        path: String,
        error: String,
    },
    Unsupported {
        reason: String,
    },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io { stage, path, error } => {
                write!(f, "{stage}: {path}: {error}")
            }
            ManifestError::Unsupported { reason } => write!(f, "unsupported manifest: {reason}"),
        }
    }
}

impl std::error::Error for ManifestError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleManifest {
    pub format_version: u32,
    pub created_unix_secs: u64,
    pub configuration: String,
    pub seed: u64,
    /// Row-major; the last panel of the last row duplicates the answer.
    pub grid: Vec<Vec<PanelManifest>>,
    /// One rule-group set per derived column.
    pub column_rules: Vec<Vec<RuleGroup>>,
    pub candidates: Vec<PanelManifest>,
    pub answer_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelManifest {
    pub structure: String,
    pub components: Vec<ComponentManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentManifest {
    pub name: String,
    pub layout: LayoutManifest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutManifest {
    pub name: String,
    pub uniform: bool,
    pub number_level: i32,
    pub slots: Vec<usize>,
    pub entities: Vec<EntityManifest>,
}

/// One drawable entity: each attribute as its level plus the resolved value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityManifest {
    pub bbox: SlotBox,
    pub shape_level: i32,
    pub shape: String,
    pub size_level: i32,
    pub size: f64,
    pub color_level: i32,
    pub color: u8,
    pub angle_level: i32,
    pub angle: i32,
}

impl EntityManifest {
    fn from_entity(e: &Entity) -> Self {
        Self {
            bbox: e.bbox,
            shape_level: e.shape.level(),
            shape: shape_name(e.shape.level()).to_string(),
            size_level: e.size.level(),
            size: size_value(e.size.level()),
            color_level: e.color.level(),
            color: color_value(e.color.level()),
            angle_level: e.angle.level(),
            angle: angle_value(e.angle.level()),
        }
    }
}

impl LayoutManifest {
    fn from_layout(layout: &Layout) -> Self {
        Self {
            name: layout.name.to_string(),
            uniform: layout.uniformity.is_uniform(),
            number_level: layout.number.level(),
            slots: layout.position.active().to_vec(),
            entities: layout.entities.iter().map(EntityManifest::from_entity).collect(),
        }
    }
}

impl PanelManifest {
    pub fn from_panel(panel: &Panel) -> Self {
        Self {
            structure: panel.structure.name.to_string(),
            components: panel
                .structure
                .components
                .iter()
                .map(|c| ComponentManifest {
                    name: c.name.to_string(),
                    layout: LayoutManifest::from_layout(&c.layout),
                })
                .collect(),
        }
    }
}

impl PuzzleManifest {
    pub fn from_puzzle(puzzle: &Puzzle) -> Self {
        let created_unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            format_version: FORMAT_VERSION,
            created_unix_secs,
            configuration: puzzle.config.to_string(),
            seed: puzzle.seed,
            grid: puzzle
                .grid
                .iter()
                .map(|row| row.iter().map(PanelManifest::from_panel).collect())
                .collect(),
            column_rules: puzzle.column_rules.clone(),
            candidates: puzzle
                .candidates
                .iter()
                .map(PanelManifest::from_panel)
                .collect(),
            answer_index: puzzle.answer_index,
        }
    }
}

pub fn write_json(path: &Path, manifest: &PuzzleManifest) -> Result<(), ManifestError> {
    let f = fs::File::create(path).map_err(|e| ManifestError::Io {
        stage: "manifest_create",
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, manifest).map_err(|e| ManifestError::Io {
        stage: "manifest_serialize",
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    w.flush().map_err(|e| ManifestError::Io {
        stage: "manifest_flush",
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

pub fn read_json(path: &Path) -> Result<PuzzleManifest, ManifestError> {
    let f = fs::File::open(path).map_err(|e| ManifestError::Io {
        stage: "manifest_open",
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let r = BufReader::new(f);
    let manifest: PuzzleManifest =
        serde_json::from_reader(r).map_err(|e| ManifestError::Io {
            stage: "manifest_parse",
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(ManifestError::Unsupported {
            reason: format!(
                "format_version {} (expected {FORMAT_VERSION})",
                manifest.format_version
            ),
        });
    }
    Ok(manifest)
}
