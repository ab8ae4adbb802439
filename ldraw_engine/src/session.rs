use std::path::Path;

use glam::Vec2;
use ldraw_formats::PartDescriptions;
use serde::Serialize;

use crate::camera::{CameraState, StepCamera};
use crate::config::ViewerConfig;
use crate::input::{GestureTracker, InputAdapter};
use crate::navigator::FlatStepNavigator;
use crate::runtime::BuildScene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    PartList,
    Model,
}

/// One row of the part list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartListEntry {
    pub part_id: String,
    pub color: i32,
    pub count: usize,
    pub first_index: usize,
    pub submodel: bool,
    /// Catalogue number shown to the user.
    pub display_id: Option<String>,
    pub description: Option<String>,
    pub color_name: Option<String>,
}

pub struct BuildSession {
    scene: BuildScene,
    camera: StepCamera,
    navigator: FlatStepNavigator,
    input: InputAdapter,
    gestures: GestureTracker,
    descriptions: PartDescriptions,
    current_step: usize,
    phase: StepPhase,
}

impl BuildSession {
    pub fn new(scene: BuildScene, descriptions: PartDescriptions, config: &ViewerConfig) -> Self {
        Self {
            scene,
            camera: StepCamera::new(config.lens(), config.animate),
            navigator: FlatStepNavigator::from_config(config),
            input: InputAdapter::from_config(config),
            gestures: GestureTracker::new(config.pinch_zoom_scale),
            descriptions,
            current_step: 0,
            phase: StepPhase::PartList,
        }
    }

    /// Opens the screen at `step` (clamped into range), part list first.
    pub fn start(&mut self, step: usize) {
        self.current_step = step.min(self.total_steps().saturating_sub(1));
        self.phase = self.entry_phase(self.current_step);
        log::info!(
            "starting at step {} of {}",
            self.current_step + 1,
            self.total_steps()
        );
        self.show_current_step();
    }

    pub fn scene(&self) -> &BuildScene {
        &self.scene
    }

    pub fn camera(&self) -> &StepCamera {
        &self.camera
    }

    pub fn camera_state(&self) -> CameraState {
        self.camera.state()
    }

    pub fn navigator(&self) -> &FlatStepNavigator {
        &self.navigator
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.scene.total_steps()
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn can_navigate(&self) -> bool {
        self.navigator.can_navigate()
    }

    /// Fraction of the build reached, counting the current step as done.
    pub fn build_progress(&self) -> f32 {
        match self.total_steps() {
            0 => 0.0,
            total => (self.current_step + 1) as f32 / total as f32,
        }
    }

    pub fn next_step(&mut self) -> bool {
        if !self.can_navigate() {
            return false;
        }
        match self.phase {
            StepPhase::PartList => self.phase = StepPhase::Model,
            StepPhase::Model => {
                if self.current_step + 1 < self.total_steps() {
                    self.current_step += 1;
                    self.phase = self.entry_phase(self.current_step);
                }
            }
        }
        self.show_current_step();
        true
    }

    pub fn previous_step(&mut self) -> bool {
        if !self.can_navigate() {
            return false;
        }
        if self.phase == StepPhase::Model && self.has_parts(self.current_step) {
            self.phase = StepPhase::PartList;
        } else if self.current_step > 0 {
            self.current_step -= 1;
            self.phase = StepPhase::Model;
        }
        self.show_current_step();
        true
    }

    /// Jumps straight to `step`, as picking it from the step strip does.
    pub fn select_step(&mut self, step: usize) -> bool {
        if step >= self.total_steps() {
            log::debug!("step {step} out of range ({} steps)", self.total_steps());
            return false;
        }
        self.current_step = step;
        self.phase = self.entry_phase(step);
        self.show_current_step();
        true
    }

    /// Advances camera animation by `dt` seconds. Returns true on the tick
    /// that finishes revealing a step.
    pub fn tick(&mut self, dt: f32) -> bool {
        match self.camera.advance(dt) {
            Some(transition) => self.navigator.finish_transition(&mut self.scene, transition),
            None => false,
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) -> bool {
        if !self.can_navigate() {
            return false;
        }
        self.input.on_rotate_delta(&mut self.camera, dx, dy);
        true
    }

    pub fn zoom(&mut self, delta: f32) -> bool {
        self.can_navigate() && self.input.on_zoom_delta(&mut self.camera, delta)
    }

    pub fn pointer_down(&mut self, id: u64, position: Vec2) {
        self.gestures.pointer_down(id, position);
    }

    pub fn pointer_up(&mut self, id: u64) {
        self.gestures.pointer_up(id);
    }

    /// Feeds a pointer sample. Gestures made while navigation is blocked
    /// are dropped.
    pub fn pointer_move(&mut self, id: u64, position: Vec2) -> bool {
        let gesture = self.gestures.pointer_move(id, position);
        match gesture {
            Some(gesture) if self.can_navigate() => {
                self.input.apply(&mut self.camera, gesture);
                true
            }
            _ => false,
        }
    }

    /// Part list of the current step, joined with catalogue descriptions and
    /// color names.
    pub fn current_parts(&self) -> Vec<PartListEntry> {
        self.scene
            .step_parts(self.current_step)
            .into_iter()
            .map(|tally| {
                let part_id = tally.part.part_id;
                let submodel = self.scene.is_submodel(&part_id);
                let (mut display_id, color_name) = if submodel {
                    (None, None)
                } else {
                    let stem = Path::new(&part_id)
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned());
                    let color_name = self
                        .scene
                        .colors()
                        .get(tally.part.color)
                        .map(|color| color.name.clone());
                    (stem, color_name)
                };
                let entry = self.descriptions.get(&part_id);
                if let Some(id) = entry.and_then(|entry| entry.id.clone()) {
                    display_id = Some(id);
                }
                PartListEntry {
                    description: entry.and_then(|entry| entry.description.clone()),
                    part_id,
                    color: tally.part.color,
                    count: tally.count,
                    first_index: tally.first_index,
                    submodel,
                    display_id,
                    color_name,
                }
            })
            .collect()
    }

    fn has_parts(&self, step: usize) -> bool {
        !self.scene.step_parts(step).is_empty()
    }

    fn entry_phase(&self, step: usize) -> StepPhase {
        if self.has_parts(step) {
            StepPhase::PartList
        } else {
            StepPhase::Model
        }
    }

    fn show_current_step(&mut self) {
        if self.phase == StepPhase::PartList {
            return;
        }
        let model = self.scene.model_of(self.current_step);
        if self.navigator.current_model().is_some() && self.navigator.current_model() != model {
            self.navigator.hide_current_model(&mut self.scene);
        }
        self.navigator
            .goto_step(&mut self.scene, &mut self.camera, self.current_step, true);
    }
}
