//! Orbit camera that frames a bounding sphere and either snaps to the new
//! view or animates there from the last committed pose of the same tag.

mod transition;

use std::collections::HashMap;

use glam::{Quat, Vec3};

pub use transition::{
    duration_between, slerp_unit, smoothstep, Transition, TransitionId, TransitionStep,
};

/// Smallest radius the rig will frame; degenerate requests are raised to it.
const MIN_FRAMING_RADIUS: f32 = 1e-3;
/// Keeps the fit distance finite for extreme fields of view.
const MIN_HALF_FOV_SINE: f32 = 1e-4;
const FRAMING_MARGIN: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLens {
    /// Vertical field of view.
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near_clip: f32,
}

impl Default for CameraLens {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near_clip: 0.3,
        }
    }
}

impl CameraLens {
    /// Vertical and horizontal half angles in radians.
    pub fn half_fovs(&self) -> (f32, f32) {
        let half_vertical = (self.fov_degrees.to_radians() * 0.5)
            .clamp(MIN_HALF_FOV_SINE, std::f32::consts::FRAC_PI_2 - MIN_HALF_FOV_SINE);
        let aspect = if self.aspect.is_finite() && self.aspect > 0.0 {
            self.aspect
        } else {
            1.0
        };
        let half_horizontal = (half_vertical.tan() * aspect).atan();
        (half_vertical, half_horizontal)
    }

    /// Eye distance at which a sphere of `radius` fits both fields of view,
    /// padded by the near plane or 20%, whichever is larger.
    pub fn framing_distance(&self, radius: f32) -> f32 {
        let (half_vertical, half_horizontal) = self.half_fovs();
        let fit = |half: f32| radius / half.sin().max(MIN_HALF_FOV_SINE);
        let distance = fit(half_vertical).max(fit(half_horizontal));
        (distance + self.near_clip).max(distance * FRAMING_MARGIN)
    }
}

/// Groups requests that show "the same view", e.g. every step of one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraTag(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub center: Vec3,
    pub position: Vec3,
    pub up: Vec3,
}

/// Live camera placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::NEG_Y,
        }
    }
}

impl CameraTransform {
    fn apply(&mut self, pose: CameraPose) {
        self.position = pose.position;
        self.look_at(pose.center, pose.up);
    }

    fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        if forward != Vec3::ZERO {
            self.forward = forward;
        }
        let orthogonal = |up: Vec3| (up - self.forward * up.dot(self.forward)).normalize_or_zero();
        let mut next_up = orthogonal(up);
        if next_up == Vec3::ZERO {
            next_up = orthogonal(self.up);
        }
        if next_up == Vec3::ZERO {
            next_up = self.forward.any_orthonormal_vector();
        }
        self.up = next_up;
    }
}

/// Arguments of one framing request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    pub center: Vec3,
    pub radius: f32,
    /// Euler degrees; `None` keeps the current view direction.
    pub rotation: Option<Vec3>,
    pub animate: bool,
    /// `None` reuses the current tag.
    pub tag: Option<CameraTag>,
    /// Forget the tag's pose once framed and leave the camera untagged.
    pub clean_state: bool,
}

impl FrameRequest {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            rotation: None,
            animate: false,
            tag: None,
            clean_state: false,
        }
    }

    pub fn with_rotation(mut self, rotation: Option<Vec3>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn animated(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }

    pub fn tagged(mut self, tag: CameraTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn clean_state(mut self, clean_state: bool) -> Self {
        self.clean_state = clean_state;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The camera is already at the target.
    Completed,
    /// Completion is reported by a later [`StepCamera::advance`].
    Animating(TransitionId),
}

/// Framing parameters of the most recent request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub center: Vec3,
    pub radius: f32,
    pub rotation: Vec3,
    pub up: Vec3,
}

#[derive(Debug)]
pub struct StepCamera {
    lens: CameraLens,
    animate_enabled: bool,
    transform: CameraTransform,
    center: Vec3,
    radius: f32,
    rotation: Vec3,
    up: Vec3,
    current_tag: Option<CameraTag>,
    tag_poses: HashMap<CameraTag, CameraPose>,
    transition: Option<Transition>,
    next_transition: u64,
}

impl StepCamera {
    pub fn new(lens: CameraLens, animate_enabled: bool) -> Self {
        let transform = CameraTransform::default();
        Self {
            lens,
            animate_enabled,
            transform,
            center: Vec3::ZERO,
            radius: 1.0,
            rotation: Vec3::ZERO,
            up: transform.up,
            current_tag: None,
            tag_poses: HashMap::new(),
            transition: None,
            next_transition: 0,
        }
    }

    pub fn lens(&self) -> CameraLens {
        self.lens
    }

    pub fn animate_enabled(&self) -> bool {
        self.animate_enabled
    }

    pub fn set_animate_enabled(&mut self, enabled: bool) {
        self.animate_enabled = enabled;
    }

    pub fn transform(&self) -> CameraTransform {
        self.transform
    }

    pub fn state(&self) -> CameraState {
        CameraState {
            center: self.center,
            radius: self.radius,
            rotation: self.rotation,
            up: self.up,
        }
    }

    pub fn current_tag(&self) -> Option<CameraTag> {
        self.current_tag
    }

    pub fn tag_pose(&self, tag: CameraTag) -> Option<CameraPose> {
        self.tag_poses.get(&tag).copied()
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    pub fn set_camera(&mut self, request: FrameRequest) -> FrameOutcome {
        let radius = if request.radius.is_finite() && request.radius > 0.0 {
            request.radius
        } else {
            log::debug!("raising framing radius {} to {MIN_FRAMING_RADIUS}", request.radius);
            MIN_FRAMING_RADIUS
        };
        self.center = request.center;
        self.radius = radius;

        let distance = self.lens.framing_distance(radius);
        let position = match request.rotation {
            Some(rotation) => {
                self.rotation = rotation;
                let orientation = euler_orientation(rotation);
                self.up = orientation * Vec3::NEG_Y;
                request.center + orientation * (Vec3::Z * distance)
            }
            None => request.center - self.transform.forward * distance,
        };
        let target = CameraPose {
            center: request.center,
            position,
            up: self.up,
        };

        if let Some(tag) = request.tag {
            self.current_tag = Some(tag);
        }
        let tag = self.current_tag;
        if request.clean_state {
            self.current_tag = None;
        }

        if self.animate_enabled && request.animate {
            let committed = tag.and_then(|tag| Some((tag, self.tag_poses.get(&tag).copied()?)));
            if let Some((tag, start)) = committed {
                return self.begin_transition(tag, request.clean_state, start, target);
            }
        }

        if let Some(previous) = self.transition.take() {
            log::debug!("snap cancelled transition {:?}", previous.id());
        }
        self.transform.apply(target);
        self.commit_tag(tag, request.center, request.clean_state);
        FrameOutcome::Completed
    }

    /// Moves an in-flight transition forward. Returns its id on the tick it
    /// reaches the target.
    pub fn advance(&mut self, dt: f32) -> Option<TransitionId> {
        let step = self.transition.as_mut()?.advance(dt);
        match step {
            TransitionStep::InProgress(pose) => {
                self.transform.apply(pose);
                None
            }
            TransitionStep::Finished(pose) => {
                let finished = self.transition.take()?;
                self.transform.apply(pose);
                self.commit_tag(Some(finished.tag()), pose.center, finished.clean_state());
                log::debug!(
                    "transition {:?} finished after {:.2}s",
                    finished.id(),
                    finished.elapsed()
                );
                Some(finished.id())
            }
        }
    }

    /// Drops the in-flight transition; its completion never fires.
    pub fn cancel(&mut self) -> Option<TransitionId> {
        self.transition.take().map(|transition| transition.id())
    }

    fn begin_transition(
        &mut self,
        tag: CameraTag,
        clean_state: bool,
        start: CameraPose,
        target: CameraPose,
    ) -> FrameOutcome {
        let id = TransitionId(self.next_transition);
        self.next_transition += 1;
        let transition = Transition::new(id, tag, clean_state, start, target);
        log::debug!(
            "transition {id:?} for {tag:?} over {:.2}s",
            transition.duration()
        );
        self.transform.apply(transition.sample(0.0));
        if let Some(previous) = self.transition.replace(transition) {
            log::debug!("transition {:?} superseded by {id:?}", previous.id());
        }
        FrameOutcome::Animating(id)
    }

    fn commit_tag(&mut self, tag: Option<CameraTag>, center: Vec3, clean_state: bool) {
        let Some(tag) = tag else {
            return;
        };
        if clean_state {
            self.tag_poses.remove(&tag);
        } else {
            self.tag_poses.insert(
                tag,
                CameraPose {
                    center,
                    position: self.transform.position,
                    up: self.transform.up,
                },
            );
        }
    }
}

/// X, then Y, then Z about the world axes, with the Z angle negated.
pub fn euler_orientation(degrees: Vec3) -> Quat {
    let x = Quat::from_axis_angle(Vec3::X, degrees.x.to_radians());
    let y = Quat::from_axis_angle(Vec3::Y, degrees.y.to_radians());
    let z = Quat::from_axis_angle(Vec3::Z, (-degrees.z).to_radians());
    z * y * x
}
