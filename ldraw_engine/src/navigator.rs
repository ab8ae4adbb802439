//! Walks the flattened step list. Showing a step reveals every earlier step
//! of its model (with build modifications applied), hides the rest, frames
//! the camera on the step, and reveals the step itself once the camera has
//! arrived. Navigation is refused while that camera move is in flight.

use glam::Vec3;
use ldraw_formats::Step;

use crate::camera::{CameraTag, FrameOutcome, FrameRequest, StepCamera, TransitionId};
use crate::config::ViewerConfig;
use crate::runtime::{to_glam, BuildScene, RuntimeModel};

/// Step waiting for its camera transition to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingReveal {
    transition: TransitionId,
    model: usize,
    step: usize,
}

#[derive(Debug)]
pub struct FlatStepNavigator {
    current_step: Option<usize>,
    current_model: Option<usize>,
    /// `(model, step)` currently drawn in the highlight layer.
    highlighted: Option<(usize, usize)>,
    can_navigate: bool,
    pending: Option<PendingReveal>,
    preview: bool,
    default_rotation: Vec3,
}

impl FlatStepNavigator {
    pub fn new(default_rotation: Vec3, preview: bool) -> Self {
        Self {
            current_step: None,
            current_model: None,
            highlighted: None,
            can_navigate: true,
            pending: None,
            preview,
            default_rotation,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.default_rotation(), config.preview)
    }

    pub fn can_navigate(&self) -> bool {
        self.can_navigate
    }

    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    pub fn current_model(&self) -> Option<usize> {
        self.current_model
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// True while a step is waiting for its camera move.
    pub fn is_revealing(&self) -> bool {
        self.pending.is_some()
    }

    /// Shows flattened step `index`. Out-of-range indices are ignored.
    pub fn goto_step(
        &mut self,
        scene: &mut BuildScene,
        camera: &mut StepCamera,
        index: usize,
        animate: bool,
    ) -> bool {
        let Some(flat) = scene.flat_step(index) else {
            log::debug!("flat step {index} out of range ({} steps)", scene.total_steps());
            return false;
        };
        let (model, step) = (flat.model, flat.model_step_idx);
        let Some((step_count, is_last, framing)) = scene.model(model).and_then(|runtime| {
            let data = runtime.step(step)?;
            let framing = self.framing(runtime, step, data)?;
            Some((runtime.step_count(), runtime.is_last_step(step), framing))
        }) else {
            log::debug!("flat step {index} points at missing step {step} of model {model}");
            return false;
        };

        self.current_step = Some(index);
        self.update_highlight(scene, model, step);

        for earlier in 0..step {
            apply_build_mod(scene, model, earlier);
            scene.show_step(model, earlier, true);
        }
        for later in step..step_count {
            scene.show_step(model, later, false);
        }

        scene.show_model(model, true);
        self.current_model = Some(model);

        self.can_navigate = false;
        self.pending = None;
        let request = FrameRequest::new(framing.center, framing.radius)
            .with_rotation(framing.rotation)
            .animated(animate)
            .tagged(CameraTag(model))
            .clean_state(is_last);
        match camera.set_camera(request) {
            FrameOutcome::Completed => self.reveal(scene, model, step),
            FrameOutcome::Animating(transition) => {
                self.pending = Some(PendingReveal {
                    transition,
                    model,
                    step,
                });
            }
        }
        true
    }

    pub fn next_step(
        &mut self,
        scene: &mut BuildScene,
        camera: &mut StepCamera,
        animate: bool,
    ) -> bool {
        if !self.can_navigate {
            return false;
        }
        let next = self.current_step.map_or(0, |step| step + 1);
        self.goto_step(scene, camera, next, animate)
    }

    pub fn previous_step(
        &mut self,
        scene: &mut BuildScene,
        camera: &mut StepCamera,
        animate: bool,
    ) -> bool {
        if !self.can_navigate {
            return false;
        }
        let Some(previous) = self.current_step.and_then(|step| step.checked_sub(1)) else {
            return false;
        };
        self.goto_step(scene, camera, previous, animate)
    }

    /// Completes the reveal waiting on `transition`. Ids of superseded
    /// transitions are ignored.
    pub fn finish_transition(&mut self, scene: &mut BuildScene, transition: TransitionId) -> bool {
        match self.pending {
            Some(pending) if pending.transition == transition => {
                self.pending = None;
                self.reveal(scene, pending.model, pending.step);
                true
            }
            _ => false,
        }
    }

    /// Hides (and thereby unloads) the model shown last.
    pub fn hide_current_model(&mut self, scene: &mut BuildScene) {
        if let Some(model) = self.current_model.take() {
            scene.show_model(model, false);
        }
    }

    fn reveal(&mut self, scene: &mut BuildScene, model: usize, step: usize) {
        apply_build_mod(scene, model, step);
        scene.show_step(model, step, true);
        self.can_navigate = true;
    }

    fn update_highlight(&mut self, scene: &mut BuildScene, model: usize, step: usize) {
        if self.preview {
            return;
        }
        if let Some((old_model, old_step)) = self.highlighted.take() {
            scene.highlight_step(old_model, old_step, false);
        }
        scene.highlight_step(model, step, true);
        self.highlighted = Some((model, step));
    }

    fn framing(
        &self,
        runtime: &RuntimeModel,
        step: usize,
        data: &Step,
    ) -> Option<Framing> {
        let rotation = match (data.rotation, data.rotation_ref()) {
            (Some(rotation), _) => Some(to_glam(rotation)),
            // The referenced step may itself have no rotation; then the
            // current view direction is kept.
            (None, Some(reference)) => runtime.step(reference)?.rotation.map(to_glam),
            (None, None) => Some(self.default_rotation),
        };
        let (center, radius) = match data.model_bounds.filter(|_| self.preview) {
            Some(bounds) => (to_glam(bounds.center), bounds.radius()),
            None => (to_glam(data.center), data.radius),
        };
        log::debug!("framing step {step} of {}: center {center}, radius {radius}", runtime.name());
        Some(Framing {
            center,
            radius,
            rotation,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Framing {
    center: Vec3,
    radius: f32,
    rotation: Option<Vec3>,
}

/// Re-shows `step` in full when the model has any build modifications, then
/// hides the range the modification keyed on `step` retracts.
fn apply_build_mod(scene: &mut BuildScene, model: usize, step: usize) {
    let Some(runtime) = scene.model(model) else {
        return;
    };
    let has_build_mods = runtime.has_build_mods();
    let build_mod = runtime.build_mod(step).copied();
    if has_build_mods {
        scene.show_step_parts(model, step, true, 0, None);
    }
    if let Some(build_mod) = build_mod {
        scene.show_step_parts(
            model,
            build_mod.step,
            false,
            build_mod.start,
            Some(build_mod.end),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraLens;
    use crate::geometry::CatalogGeometry;
    use crate::runtime::GeometryPolicy;
    use ldraw_formats::{Bounds, ColorTable, FlatStep, ModelData, Part, StepPackage};

    fn step(parts: usize, center: f32) -> Step {
        Step::new(
            (0..parts).map(|i| Part::new(format!("{i}.dat"), 16)).collect(),
            ldraw_formats::Vec3::new(center, 0.0, 0.0),
            1.0 + center,
        )
    }

    fn fixture(models: Vec<ModelData>, flats: Vec<FlatStep>) -> (BuildScene, StepCamera) {
        let package = StepPackage::new(models, flats).expect("valid package");
        let colors = ColorTable::placeholder_for(&package);
        let scene = BuildScene::new(
            &package,
            colors,
            Box::new(CatalogGeometry::permissive()),
            GeometryPolicy::Lazy,
        );
        (scene, StepCamera::new(CameraLens::default(), true))
    }

    fn single_model() -> (BuildScene, StepCamera) {
        let model = ModelData::new("main", vec![step(2, 0.0), step(1, 1.0), step(3, 2.0)]);
        fixture(vec![model], (0..3).map(|i| FlatStep::new(0, i)).collect())
    }

    fn navigator() -> FlatStepNavigator {
        FlatStepNavigator::new(Vec3::new(30.0, 45.0, 0.0), false)
    }

    #[test]
    fn snap_reveals_target_and_earlier_steps() {
        let (mut scene, mut camera) = single_model();
        let mut nav = navigator();
        assert!(nav.goto_step(&mut scene, &mut camera, 1, false));
        assert!(nav.can_navigate());
        assert_eq!(scene.visible_steps(0), vec![0, 1]);
        assert_eq!(nav.current_model(), Some(0));
        assert_eq!(camera.state().center, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(camera.state().rotation, Vec3::new(30.0, 45.0, 0.0));
        let snapshot = scene.step_snapshot(0, 1).expect("snapshot");
        assert!(snapshot.highlighted);
    }

    #[test]
    fn moving_back_hides_later_steps_and_moves_highlight() {
        let (mut scene, mut camera) = single_model();
        let mut nav = navigator();
        nav.goto_step(&mut scene, &mut camera, 2, false);
        nav.goto_step(&mut scene, &mut camera, 0, false);
        assert_eq!(scene.visible_steps(0), vec![0]);
        let highlighted: Vec<bool> = (0..3)
            .map(|i| scene.step_snapshot(0, i).expect("snapshot").highlighted)
            .collect();
        assert_eq!(highlighted, vec![true, false, false]);
    }

    #[test]
    fn out_of_range_goto_changes_nothing() {
        let (mut scene, mut camera) = single_model();
        let mut nav = navigator();
        nav.goto_step(&mut scene, &mut camera, 1, false);
        assert!(!nav.goto_step(&mut scene, &mut camera, 3, false));
        assert_eq!(nav.current_step(), Some(1));
        assert_eq!(scene.visible_steps(0), vec![0, 1]);
    }

    #[test]
    fn animated_reveal_waits_for_matching_transition() {
        let (mut scene, mut camera) = single_model();
        let mut nav = navigator();
        nav.goto_step(&mut scene, &mut camera, 0, false);
        assert!(nav.goto_step(&mut scene, &mut camera, 1, true));
        assert!(!nav.can_navigate());
        assert!(nav.is_revealing());
        assert_eq!(scene.visible_steps(0), vec![0]);

        assert!(!nav.next_step(&mut scene, &mut camera, true));
        assert!(!nav.previous_step(&mut scene, &mut camera, true));
        assert_eq!(nav.current_step(), Some(1));

        let mut finished = None;
        while finished.is_none() {
            finished = camera.advance(1.0 / 30.0);
        }
        let id = finished.expect("finished");
        assert!(nav.finish_transition(&mut scene, id));
        assert!(nav.can_navigate());
        assert_eq!(scene.visible_steps(0), vec![0, 1]);
        assert!(!nav.finish_transition(&mut scene, id));
    }

    #[test]
    fn superseded_transition_never_reveals() {
        let (mut scene, mut camera) = single_model();
        let mut nav = navigator();
        nav.goto_step(&mut scene, &mut camera, 0, false);
        nav.goto_step(&mut scene, &mut camera, 1, true);
        let first = camera.transition().map(|t| t.id()).expect("animating");
        nav.goto_step(&mut scene, &mut camera, 0, true);
        assert!(!nav.finish_transition(&mut scene, first));
        assert!(!nav.can_navigate());
    }

    #[test]
    fn next_and_previous_walk_the_flat_list() {
        let (mut scene, mut camera) = single_model();
        let mut nav = navigator();
        assert!(!nav.previous_step(&mut scene, &mut camera, false));
        assert!(nav.next_step(&mut scene, &mut camera, false));
        assert_eq!(nav.current_step(), Some(0));
        assert!(nav.next_step(&mut scene, &mut camera, false));
        assert!(nav.next_step(&mut scene, &mut camera, false));
        assert!(!nav.next_step(&mut scene, &mut camera, false));
        assert_eq!(nav.current_step(), Some(2));
        assert!(nav.previous_step(&mut scene, &mut camera, false));
        assert_eq!(nav.current_step(), Some(1));
    }

    #[test]
    fn rotation_falls_back_through_reference() {
        let mut explicit = step(1, 0.0);
        explicit.rotation = Some(ldraw_formats::Vec3::new(10.0, 20.0, 0.0));
        let mut borrowing = step(1, 0.0);
        borrowing.rot_ref = 0;
        let mut borrows_nothing = step(1, 0.0);
        borrows_nothing.rot_ref = 2;
        let model = ModelData::new(
            "main",
            vec![explicit, borrowing, step(1, 0.0), borrows_nothing],
        );
        let (mut scene, mut camera) =
            fixture(vec![model], (0..4).map(|i| FlatStep::new(0, i)).collect());
        let mut nav = navigator();

        nav.goto_step(&mut scene, &mut camera, 1, false);
        assert_eq!(camera.state().rotation, Vec3::new(10.0, 20.0, 0.0));
        nav.goto_step(&mut scene, &mut camera, 2, false);
        assert_eq!(camera.state().rotation, Vec3::new(30.0, 45.0, 0.0));
        let forward = camera.transform().forward;
        // Step 2 has no rotation of its own to lend, so the view direction stays.
        nav.goto_step(&mut scene, &mut camera, 3, false);
        assert_eq!(camera.state().rotation, Vec3::new(30.0, 45.0, 0.0));
        assert!((camera.transform().forward - forward).length() < 1e-4);
    }

    #[test]
    fn preview_frames_model_bounds_without_highlight() {
        let mut first = step(1, 0.0);
        first.model_bounds = Some(Bounds {
            center: ldraw_formats::Vec3::new(5.0, 5.0, 5.0),
            extents: ldraw_formats::Vec3::new(3.0, 4.0, 0.0),
        });
        let model = ModelData::new("main", vec![first]);
        let (mut scene, mut camera) = fixture(vec![model], vec![FlatStep::new(0, 0)]);
        let mut nav = FlatStepNavigator::new(Vec3::ZERO, true);
        nav.goto_step(&mut scene, &mut camera, 0, false);
        assert_eq!(camera.state().center, Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(camera.state().radius, 5.0);
        assert!(!scene.step_snapshot(0, 0).expect("snapshot").highlighted);
    }

    #[test]
    fn hide_current_model_unloads_geometry() {
        let (mut scene, mut camera) = single_model();
        let mut nav = navigator();
        nav.goto_step(&mut scene, &mut camera, 2, false);
        assert_eq!(scene.loaded_steps(), 3);
        nav.hide_current_model(&mut scene);
        assert_eq!(scene.loaded_steps(), 0);
        assert_eq!(nav.current_model(), None);
        assert!(!scene.is_model_shown(0));
    }
}
