use glam::Vec3;

use super::{CameraPose, CameraTag};

/// Identifies one requested transition; a superseded id never completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionId(pub(crate) u64);

const MIN_DURATION: f32 = 0.2;
const MAX_DURATION: f32 = 2.0;

/// Outcome of advancing a transition by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionStep {
    InProgress(CameraPose),
    Finished(CameraPose),
}

/// Orbit-style move between two poses: the view direction and up vector are
/// slerped, the distance and center are lerped, all on a smoothstep curve.
#[derive(Debug, Clone)]
pub struct Transition {
    id: TransitionId,
    tag: CameraTag,
    clean_state: bool,
    start: CameraPose,
    target: CameraPose,
    start_dir: Vec3,
    end_dir: Vec3,
    start_distance: f32,
    end_distance: f32,
    elapsed: f32,
    duration: f32,
}

impl Transition {
    pub fn new(
        id: TransitionId,
        tag: CameraTag,
        clean_state: bool,
        start: CameraPose,
        target: CameraPose,
    ) -> Self {
        let start_offset = start.position - start.center;
        let end_offset = target.position - target.center;
        Self {
            id,
            tag,
            clean_state,
            start,
            target,
            start_dir: start_offset.normalize_or_zero(),
            end_dir: end_offset.normalize_or_zero(),
            start_distance: start_offset.length(),
            end_distance: end_offset.length(),
            elapsed: 0.0,
            duration: duration_between(&start, &target),
        }
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn tag(&self) -> CameraTag {
        self.tag
    }

    pub fn clean_state(&self) -> bool {
        self.clean_state
    }

    pub fn start(&self) -> CameraPose {
        self.start
    }

    pub fn target(&self) -> CameraPose {
        self.target
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn advance(&mut self, dt: f32) -> TransitionStep {
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.duration {
            TransitionStep::Finished(self.target)
        } else {
            TransitionStep::InProgress(self.sample(self.elapsed / self.duration))
        }
    }

    /// Pose at normalized time `t` (clamped to `[0, 1]`, eased internally).
    pub fn sample(&self, t: f32) -> CameraPose {
        let t = smoothstep(t.clamp(0.0, 1.0));
        let dir = slerp_unit(self.start_dir, self.end_dir, t);
        let distance = self.start_distance + (self.end_distance - self.start_distance) * t;
        let up = slerp_unit(self.start.up, self.target.up, t);
        let center = self.start.center.lerp(self.target.center, t);
        CameraPose {
            center,
            position: center + dir * distance,
            up,
        }
    }
}

/// Longer moves take longer, within `[0.2, 2.0]` seconds.
pub fn duration_between(start: &CameraPose, target: &CameraPose) -> f32 {
    let distance = start.position.distance(target.position);
    let angle = angle_degrees(start.up, target.up);
    ((distance + angle * 0.05) * 0.2).clamp(MIN_DURATION, MAX_DURATION)
}

pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn angle_degrees(a: Vec3, b: Vec3) -> f32 {
    let (a, b) = (a.normalize_or_zero(), b.normalize_or_zero());
    if a == Vec3::ZERO || b == Vec3::ZERO {
        return 0.0;
    }
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Spherical interpolation between directions; the result is unit length.
pub fn slerp_unit(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let a = a.normalize_or_zero();
    let b = b.normalize_or_zero();
    if a == Vec3::ZERO || b == Vec3::ZERO {
        return a.lerp(b, t).normalize_or_zero();
    }
    let d = a.dot(b).clamp(-1.0, 1.0);

    // Nearly identical directions: plain lerp is accurate and stable.
    if d > 0.9995 {
        return a.lerp(b, t).normalize_or_zero();
    }

    // Opposite directions have no unique arc; swing through any perpendicular.
    if d < -0.9995 {
        let axis = a.any_orthonormal_vector();
        let angle = std::f32::consts::PI * t;
        return (a * angle.cos() + axis * angle.sin()).normalize_or_zero();
    }

    let omega = d.acos();
    let sin_omega = omega.sin();
    let s0 = ((1.0 - t) * omega).sin() / sin_omega;
    let s1 = (t * omega).sin() / sin_omega;
    (a * s0 + b * s1).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn pose(center: Vec3, position: Vec3, up: Vec3) -> CameraPose {
        CameraPose {
            center,
            position,
            up,
        }
    }

    fn approx(a: Vec3, b: Vec3) {
        assert!((a - b).length() <= EPSILON, "{a:?} != {b:?}");
    }

    #[test]
    fn duration_is_clamped() {
        let a = pose(Vec3::ZERO, Vec3::Z, Vec3::Y);
        assert!((duration_between(&a, &a) - MIN_DURATION).abs() < EPSILON);
        let far = pose(Vec3::ZERO, Vec3::Z * 100.0, Vec3::Y);
        assert!((duration_between(&a, &far) - MAX_DURATION).abs() < EPSILON);
    }

    #[test]
    fn duration_grows_with_distance_and_roll() {
        let a = pose(Vec3::ZERO, Vec3::Z * 2.0, Vec3::Y);
        let b = pose(Vec3::ZERO, Vec3::Z * 6.0, Vec3::Y);
        // (4 + 0) * 0.2
        assert!((duration_between(&a, &b) - 0.8).abs() < EPSILON);
        let rolled = pose(Vec3::ZERO, Vec3::Z * 6.0, Vec3::X);
        // (4 + 90 * 0.05) * 0.2
        assert!((duration_between(&a, &rolled) - 1.7).abs() < EPSILON);
    }

    #[test]
    fn smoothstep_endpoints_and_midpoint() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < EPSILON);
        assert!(smoothstep(0.25) < 0.25);
    }

    #[test]
    fn slerp_stays_on_unit_sphere() {
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            let v = slerp_unit(Vec3::X, Vec3::Y, t);
            assert!((v.length() - 1.0).abs() < EPSILON);
        }
        approx(
            slerp_unit(Vec3::X, Vec3::Y, 0.5),
            Vec3::new(1.0, 1.0, 0.0).normalize(),
        );
        let opposite = slerp_unit(Vec3::X, Vec3::NEG_X, 0.5);
        assert!(opposite.dot(Vec3::X).abs() < EPSILON);
    }

    #[test]
    fn samples_hit_both_endpoints_and_keep_distance_on_arc() {
        let start = pose(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), Vec3::NEG_Y);
        let target = pose(Vec3::new(2.0, 0.0, 0.0), Vec3::new(6.0, 0.0, 0.0), Vec3::NEG_Y);
        let transition = Transition::new(TransitionId(1), CameraTag(0), false, start, target);
        approx(transition.sample(0.0).position, start.position);
        approx(transition.sample(1.0).position, target.position);
        let mid = transition.sample(0.5);
        approx(mid.center, Vec3::new(1.0, 0.0, 0.0));
        assert!(((mid.position - mid.center).length() - 4.0).abs() < EPSILON);
    }

    #[test]
    fn advance_finishes_exactly_on_target() {
        let start = pose(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), Vec3::NEG_Y);
        let target = pose(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), Vec3::NEG_Y);
        let mut transition = Transition::new(TransitionId(1), CameraTag(0), false, start, target);
        let mut ticks = 0;
        loop {
            ticks += 1;
            match transition.advance(1.0 / 60.0) {
                TransitionStep::InProgress(p) => {
                    assert!(((p.position - p.center).length() - 4.0).abs() < 1e-3);
                }
                TransitionStep::Finished(p) => {
                    assert_eq!(p, target);
                    break;
                }
            }
            assert!(ticks < 1000, "transition never finished");
        }
        assert!(ticks as f32 / 60.0 >= transition.duration() - 1e-3);
    }
}
