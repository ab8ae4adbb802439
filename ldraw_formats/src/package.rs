//! Step package wire format: the models, their build steps, and the flattened
//! presentation order written by the instruction authoring tool. Vectors are
//! stored as `{x, y, z}` objects, build modifications are keyed by the step
//! that applies them, and everything is immutable once loaded.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    hash::{Hash, Hasher},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }

    fn offset(self, amount: f32) -> Vec3 {
        Vec3::new(self.x + amount, self.y + amount, self.z + amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "default_w")]
    pub w: f32,
}

fn default_w() -> f32 {
    1.0
}

impl Default for Quat {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Quat {
    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

/// Axis-aligned box stored as center plus half-size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Bounds {
    fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: Vec3::new(
                (min.x + max.x) * 0.5,
                (min.y + max.y) * 0.5,
                (min.z + max.z) * 0.5,
            ),
            extents: Vec3::new(
                (max.x - min.x) * 0.5,
                (max.y - min.y) * 0.5,
                (max.z - min.z) * 0.5,
            ),
        }
    }

    /// Radius of the sphere that circumscribes the box.
    pub fn radius(&self) -> f32 {
        self.extents.length()
    }
}

/// Identity of a part: the file it comes from and its LDraw color code.
/// Placement is deliberately excluded so identical bricks count together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartCore {
    pub part_id: String,
    pub color: i32,
}

impl PartCore {
    pub fn new(part_id: impl Into<String>, color: i32) -> Self {
        Self {
            part_id: part_id.into(),
            color,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(flatten)]
    pub core: PartCore,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quat,
}

impl Part {
    pub fn new(part_id: impl Into<String>, color: i32) -> Self {
        Self {
            core: PartCore::new(part_id, color),
            position: Vec3::ZERO,
            rotation: Quat::default(),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn part_id(&self) -> &str {
        &self.core.part_id
    }

    pub fn color(&self) -> i32 {
        self.core.color
    }
}

impl PartialEq for Part {
    fn eq(&self, other: &Self) -> bool {
        self.core == other.core
    }
}

impl Eq for Part {}

impl Hash for Part {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.core.hash(state);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default)]
    pub parts: Vec<Part>,
    /// `None` inherits; a zero vector is an explicit (identity) rotation.
    #[serde(default)]
    pub rotation: Option<Vec3>,
    #[serde(default = "no_rotation_ref", alias = "rotationRef")]
    pub rot_ref: i32,
    pub radius: f32,
    #[serde(default)]
    pub center: Vec3,
    #[serde(default)]
    pub model_bounds: Option<Bounds>,
}

fn no_rotation_ref() -> i32 {
    -1
}

impl Step {
    pub fn new(parts: Vec<Part>, center: Vec3, radius: f32) -> Self {
        Self {
            parts,
            rotation: None,
            rot_ref: -1,
            radius,
            center,
            model_bounds: None,
        }
    }

    /// Index of the step whose rotation this step borrows, if any.
    pub fn rotation_ref(&self) -> Option<usize> {
        usize::try_from(self.rot_ref).ok()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}

/// Retracts parts `[start, end]` of step `step` once the keyed step is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMod {
    pub step: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelData {
    pub model_name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub build_mods: BTreeMap<usize, BuildMod>,
}

impl ModelData {
    pub fn new(model_name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            model_name: model_name.into(),
            steps,
            build_mods: BTreeMap::new(),
        }
    }

    pub fn with_build_mod(mut self, at_step: usize, build_mod: BuildMod) -> Self {
        self.build_mods.insert(at_step, build_mod);
        self
    }

    pub fn build_mod(&self, step: usize) -> Option<&BuildMod> {
        self.build_mods.get(&step)
    }

    /// Box enclosing every framing sphere of the model.
    pub fn compute_bounds(&self) -> Option<Bounds> {
        let mut spheres = self
            .steps
            .iter()
            .filter(|step| step.radius.is_finite() && step.radius > 0.0);
        let first = spheres.next()?;
        let mut min = first.center.offset(-first.radius);
        let mut max = first.center.offset(first.radius);
        for step in spheres {
            min = min.min(step.center.offset(-step.radius));
            max = max.max(step.center.offset(step.radius));
        }
        Some(Bounds::from_min_max(min, max))
    }

    fn fill_model_bounds(&mut self) {
        let Some(bounds) = self.compute_bounds() else {
            return;
        };
        for step in &mut self.steps {
            if step.model_bounds.is_none() {
                step.model_bounds = Some(bounds);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatStep {
    pub model: usize,
    #[serde(alias = "modelStepIndex")]
    pub model_step_idx: usize,
}

impl FlatStep {
    pub fn new(model: usize, model_step_idx: usize) -> Self {
        Self {
            model,
            model_step_idx,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPackage {
    pub models: Vec<ModelData>,
    pub flat_steps: Vec<FlatStep>,
}

impl StepPackage {
    /// Builds a package from in-memory models, validating it the same way a
    /// parsed package is validated.
    pub fn new(models: Vec<ModelData>, flat_steps: Vec<FlatStep>) -> Result<Self> {
        let mut package = Self { models, flat_steps };
        package.validate()?;
        package.finish();
        Ok(package)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut package: StepPackage =
            serde_json::from_slice(bytes).context("parsing step package JSON")?;
        package.validate().context("validating step package")?;
        package.finish();
        Ok(package)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data =
            fs::read(path).with_context(|| format!("reading step package {}", path.display()))?;
        Self::from_slice(&data).with_context(|| format!("loading step package {}", path.display()))
    }

    fn finish(&mut self) {
        for model in &mut self.models {
            model.fill_model_bounds();
        }
    }

    pub fn total_steps(&self) -> usize {
        self.flat_steps.len()
    }

    pub fn flat_step(&self, index: usize) -> Option<FlatStep> {
        self.flat_steps.get(index).copied()
    }

    /// Names of every model; a part whose id matches one is a submodel.
    pub fn model_names(&self) -> BTreeSet<String> {
        self.models
            .iter()
            .map(|model| model.model_name.clone())
            .collect()
    }

    pub fn color_codes(&self) -> BTreeSet<i32> {
        self.models
            .iter()
            .flat_map(|model| model.steps.iter())
            .flat_map(|step| step.parts.iter())
            .map(Part::color)
            .collect()
    }

    pub fn part_count(&self) -> usize {
        self.models
            .iter()
            .flat_map(|model| model.steps.iter())
            .map(Step::part_count)
            .sum()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
