//! Side tables shipped next to the step package: the LDraw color palette and
//! the human readable part descriptions shown in part lists.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::package::StepPackage;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const NEUTRAL: Rgb = Rgb {
        r: 0.5,
        g: 0.5,
        b: 0.5,
    };

    /// Asset name of the material baked for this color.
    pub fn material_key(&self) -> String {
        format!("Mat_{:.3}_{:.3}_{:.3}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LDrawColor {
    pub color: Rgb,
    #[serde(default)]
    pub bl_color: i32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTable {
    colors: BTreeMap<i32, LDrawColor>,
}

impl ColorTable {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("parsing color table JSON")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data =
            fs::read(path).with_context(|| format!("reading color table {}", path.display()))?;
        Self::from_slice(&data).with_context(|| format!("loading color table {}", path.display()))
    }

    /// Grey entry for every color code the package uses, for runs without a
    /// palette file.
    pub fn placeholder_for(package: &StepPackage) -> Self {
        let colors = package
            .color_codes()
            .into_iter()
            .map(|code| {
                (
                    code,
                    LDrawColor {
                        color: Rgb::NEUTRAL,
                        bl_color: 0,
                        name: format!("Color {code}"),
                    },
                )
            })
            .collect();
        Self { colors }
    }

    pub fn insert(&mut self, code: i32, color: LDrawColor) {
        self.colors.insert(code, color);
    }

    pub fn get(&self, code: i32) -> Option<&LDrawColor> {
        self.colors.get(&code)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDescription {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartDescriptions {
    parts: BTreeMap<String, PartDescription>,
}

impl PartDescriptions {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("reading part descriptions {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing part descriptions {}", path.display()))
    }

    pub fn insert(&mut self, part_id: impl Into<String>, description: PartDescription) {
        self.parts.insert(part_id.into(), description);
    }

    pub fn get(&self, part_id: &str) -> Option<&PartDescription> {
        self.parts.get(part_id)
    }
}

/// Asset file name for a part id; subfolder separators become underscores.
pub fn part_file_name(part_id: &str) -> String {
    part_id.replace('\\', "_")
}
