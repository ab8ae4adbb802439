use std::collections::BTreeMap;

use glam::Vec2;

use crate::camera::{FrameRequest, StepCamera};
use crate::config::ViewerConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputAdapter {
    /// Degrees per unit of drag.
    pub rotation_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl Default for InputAdapter {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl InputAdapter {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            rotation_speed: config.rotation_speed,
            min_radius: config.min_radius,
            max_radius: config.max_radius,
        }
    }

    /// Orbits around the current center. Yaw flips direction while the
    /// camera is upside down so dragging still follows the pointer.
    pub fn on_rotate_delta(&self, camera: &mut StepCamera, dx: f32, dy: f32) {
        let state = camera.state();
        let mut rotation = state.rotation;
        rotation.x -= dy * self.rotation_speed;
        let pitch = rotation.x.rem_euclid(360.0);
        let sign = if pitch > 90.0 && pitch < 270.0 { -1.0 } else { 1.0 };
        rotation.y -= dx * self.rotation_speed * sign;
        camera.set_camera(
            FrameRequest::new(state.center, state.radius).with_rotation(Some(rotation)),
        );
    }

    /// Moves the camera in by `delta`. Requests that would leave the radius
    /// range are dropped.
    pub fn on_zoom_delta(&self, camera: &mut StepCamera, delta: f32) -> bool {
        let state = camera.state();
        let radius = state.radius - delta;
        if !(self.min_radius..=self.max_radius).contains(&radius) {
            return false;
        }
        camera.set_camera(FrameRequest::new(state.center, radius));
        true
    }

    pub fn apply(&self, camera: &mut StepCamera, gesture: GestureDelta) {
        match gesture {
            GestureDelta::Rotate { dx, dy } => self.on_rotate_delta(camera, dx, dy),
            GestureDelta::Zoom(delta) => {
                self.on_zoom_delta(camera, delta);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureDelta {
    Rotate { dx: f32, dy: f32 },
    Zoom(f32),
}

/// Pointer bookkeeping: one pointer drags, two pointers pinch.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    pinch_zoom_scale: f32,
    pointers: BTreeMap<u64, Vec2>,
    pinch_distance: Option<f32>,
}

impl GestureTracker {
    pub fn new(pinch_zoom_scale: f32) -> Self {
        Self {
            pinch_zoom_scale,
            pointers: BTreeMap::new(),
            pinch_distance: None,
        }
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn pointer_down(&mut self, id: u64, position: Vec2) {
        self.pointers.insert(id, position);
        self.reset_pinch();
    }

    pub fn pointer_up(&mut self, id: u64) {
        self.pointers.remove(&id);
        self.reset_pinch();
    }

    pub fn pointer_move(&mut self, id: u64, position: Vec2) -> Option<GestureDelta> {
        let slot = self.pointers.get_mut(&id)?;
        let previous = std::mem::replace(slot, position);
        match self.pointers.len() {
            1 => {
                let delta = position - previous;
                Some(GestureDelta::Rotate {
                    dx: delta.x,
                    dy: delta.y,
                })
            }
            2 => {
                let distance = self.pair_distance()?;
                let previous_distance = self.pinch_distance.replace(distance)?;
                Some(GestureDelta::Zoom(
                    (distance - previous_distance) * self.pinch_zoom_scale,
                ))
            }
            _ => None,
        }
    }

    fn reset_pinch(&mut self) {
        self.pinch_distance = self.pair_distance();
    }

    fn pair_distance(&self) -> Option<f32> {
        if self.pointers.len() != 2 {
            return None;
        }
        let mut positions = self.pointers.values();
        let a = positions.next()?;
        let b = positions.next()?;
        Some(a.distance(*b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraLens;
    use glam::Vec3;

    fn camera_at(rotation: Vec3, radius: f32) -> StepCamera {
        let mut camera = StepCamera::new(CameraLens::default(), true);
        camera.set_camera(FrameRequest::new(Vec3::ZERO, radius).with_rotation(Some(rotation)));
        camera
    }

    #[test]
    fn drag_changes_pitch_and_yaw() {
        let mut camera = camera_at(Vec3::new(30.0, 45.0, 0.0), 5.0);
        InputAdapter::default().on_rotate_delta(&mut camera, 10.0, 5.0);
        let rotation = camera.state().rotation;
        assert!((rotation.x - 29.0).abs() < 1e-4);
        assert!((rotation.y - 43.0).abs() < 1e-4);
        assert_eq!(camera.state().radius, 5.0);
    }

    #[test]
    fn yaw_reverses_when_upside_down() {
        let mut camera = camera_at(Vec3::new(180.0, 0.0, 0.0), 5.0);
        InputAdapter::default().on_rotate_delta(&mut camera, 10.0, 0.0);
        assert!((camera.state().rotation.y - 2.0).abs() < 1e-4);

        let mut camera = camera_at(Vec3::new(-90.0 - 45.0, 0.0, 0.0), 5.0);
        InputAdapter::default().on_rotate_delta(&mut camera, 10.0, 0.0);
        assert!((camera.state().rotation.y - 2.0).abs() < 1e-4);
    }

    #[test]
    fn zoom_respects_radius_range() {
        let adapter = InputAdapter::default();
        let mut camera = camera_at(Vec3::ZERO, 1.0);
        assert!(adapter.on_zoom_delta(&mut camera, 0.5));
        assert_eq!(camera.state().radius, 0.5);
        assert!(!adapter.on_zoom_delta(&mut camera, 0.4));
        assert_eq!(camera.state().radius, 0.5);
        assert!(!adapter.on_zoom_delta(&mut camera, -40.0));
        assert!(adapter.on_zoom_delta(&mut camera, -29.5));
        assert_eq!(camera.state().radius, 30.0);
    }

    #[test]
    fn zoom_keeps_view_direction() {
        let mut camera = camera_at(Vec3::new(30.0, 45.0, 0.0), 4.0);
        let forward = camera.transform().forward;
        InputAdapter::default().on_zoom_delta(&mut camera, 1.0);
        assert!((camera.transform().forward - forward).length() < 1e-4);
        let distance = camera.transform().position.length();
        assert!((distance - camera.lens().framing_distance(3.0)).abs() < 1e-3);
    }

    #[test]
    fn single_pointer_drags() {
        let mut tracker = GestureTracker::new(0.02);
        tracker.pointer_down(1, Vec2::new(10.0, 10.0));
        assert_eq!(
            tracker.pointer_move(1, Vec2::new(13.0, 6.0)),
            Some(GestureDelta::Rotate { dx: 3.0, dy: -4.0 })
        );
        assert_eq!(tracker.pointer_move(7, Vec2::ZERO), None);
        assert_eq!(tracker.active_pointers(), 1);
    }

    #[test]
    fn two_pointers_pinch() {
        let mut tracker = GestureTracker::new(0.02);
        tracker.pointer_down(1, Vec2::new(0.0, 0.0));
        tracker.pointer_down(2, Vec2::new(100.0, 0.0));
        let Some(GestureDelta::Zoom(delta)) = tracker.pointer_move(2, Vec2::new(150.0, 0.0)) else {
            panic!("expected zoom");
        };
        assert!((delta - 1.0).abs() < 1e-5);

        tracker.pointer_up(2);
        assert_eq!(tracker.active_pointers(), 1);
        assert!(matches!(
            tracker.pointer_move(1, Vec2::new(1.0, 0.0)),
            Some(GestureDelta::Rotate { .. })
        ));
    }
}
