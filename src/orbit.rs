use glam::Vec3;
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::input::Input;

/// Damping factor applied per 60Hz-equivalent frame.
///
/// An explicit coefficient rather than an on/off flag, so settling speed is
/// tunable without touching the easing math.
pub const DEFAULT_DAMPING: f32 = 0.05;

/// A damped camera controller orbiting a target point.
///
/// Input moves *goal* spherical coordinates; every tick the eased
/// coordinates settle toward the goals, so rotation, zoom, and pan glide to a
/// stop instead of snapping. [`update`](OrbitController::update) must run
/// once per tick before frame callbacks and rendering, so camera easing lands
/// in the same frame as scene updates.
///
/// # Example
/// ```ignore
/// let mut orbit = OrbitController::new()
///     .target(Vec3::ZERO)
///     .distance(30.0);
///
/// // Each tick:
/// orbit.update(&input, dt);
/// orbit.apply_to(&mut camera);
/// ```
#[derive(Clone, Debug)]
pub struct OrbitController {
    /// Eased point the camera orbits around.
    target: Vec3,
    /// Horizontal angle in radians (yaw).
    azimuth: f32,
    /// Vertical angle in radians (pitch), clamped to avoid gimbal lock.
    elevation: f32,
    /// Eased distance from target.
    distance: f32,

    goal_target: Vec3,
    goal_azimuth: f32,
    goal_elevation: f32,
    goal_distance: f32,

    /// Fraction of the remaining delta absorbed per 60Hz frame.
    pub damping: f32,
    /// Mouse sensitivity for rotation, radians per pixel.
    pub rotate_sensitivity: f32,
    /// Scroll zoom sensitivity, world units per line.
    pub zoom_sensitivity: f32,
    /// Pan sensitivity, world units per pixel at reference distance.
    pub pan_sensitivity: f32,
    /// Minimum distance from target.
    pub min_distance: f32,
    /// Maximum distance from target.
    pub max_distance: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            azimuth: 0.0,
            elevation: 0.0,
            distance: 30.0,
            goal_target: Vec3::ZERO,
            goal_azimuth: 0.0,
            goal_elevation: 0.0,
            goal_distance: 30.0,
            damping: DEFAULT_DAMPING,
            rotate_sensitivity: 0.005,
            zoom_sensitivity: 1.5,
            pan_sensitivity: 0.02,
            min_distance: 12.0,
            max_distance: 300.0,
        }
    }
}

impl OrbitController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the point to orbit around.
    pub fn target(mut self, target: impl Into<Vec3>) -> Self {
        let target = target.into();
        self.target = target;
        self.goal_target = target;
        self
    }

    /// Set the distance from target.
    pub fn distance(mut self, distance: f32) -> Self {
        let distance = distance.clamp(self.min_distance, self.max_distance);
        self.distance = distance;
        self.goal_distance = distance;
        self
    }

    /// Set the damping coefficient (0 disables easing entirely; 1 snaps).
    pub fn damping(mut self, damping: f32) -> Self {
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    /// Set distance limits.
    pub fn distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self.goal_distance = self.goal_distance.clamp(min, max);
        self.distance = self.distance.clamp(min, max);
        self
    }

    /// Advance goals from input, then ease toward them.
    ///
    /// Left-drag rotates, right-drag pans the target, scroll zooms.
    pub fn update(&mut self, input: &Input, dt: f32) {
        if input.mouse_down(MouseButton::Left) {
            let delta = input.cursor_delta();
            self.rotate_by(delta.x, delta.y);
        }
        if input.mouse_down(MouseButton::Right) {
            let delta = input.cursor_delta();
            self.pan_by(delta.x, delta.y);
        }
        let scroll = input.scroll_delta();
        if scroll.y != 0.0 {
            self.zoom_by(scroll.y);
        }
        self.ease(dt);
    }

    /// Write the eased pose into the camera.
    pub fn apply_to(&self, camera: &mut Camera) {
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );
        camera.position = self.target + offset;
        camera.target = self.target;
    }

    /// Current eased distance from target.
    pub fn current_distance(&self) -> f32 {
        self.distance
    }

    /// Current eased orbit target.
    pub fn current_target(&self) -> Vec3 {
        self.target
    }

    pub(crate) fn rotate_by(&mut self, dx_pixels: f32, dy_pixels: f32) {
        self.goal_azimuth -= dx_pixels * self.rotate_sensitivity;
        self.goal_elevation = (self.goal_elevation + dy_pixels * self.rotate_sensitivity).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
    }

    pub(crate) fn zoom_by(&mut self, scroll_lines: f32) {
        self.goal_distance = (self.goal_distance - scroll_lines * self.zoom_sensitivity)
            .clamp(self.min_distance, self.max_distance);
    }

    pub(crate) fn pan_by(&mut self, dx_pixels: f32, dy_pixels: f32) {
        // Pan in the camera plane: screen-x maps against azimuth-right,
        // screen-y against world up, scaled so panning feels constant at any
        // zoom level.
        let scale = self.pan_sensitivity * (self.goal_distance / 30.0);
        let right = Vec3::new(self.goal_azimuth.cos(), 0.0, -self.goal_azimuth.sin());
        self.goal_target += right * (-dx_pixels * scale) + Vec3::Y * (dy_pixels * scale);
    }

    pub(crate) fn ease(&mut self, dt: f32) {
        // Framerate-independent form of "absorb `damping` of the remaining
        // delta each 60Hz frame".
        let alpha = if self.damping >= 1.0 {
            1.0
        } else {
            1.0 - (1.0 - self.damping).powf(dt * 60.0)
        };
        self.azimuth += (self.goal_azimuth - self.azimuth) * alpha;
        self.elevation += (self.goal_elevation - self.elevation) * alpha;
        self.distance += (self.goal_distance - self.distance) * alpha;
        self.target += (self.goal_target - self.target) * alpha;
    }

    #[cfg(test)]
    fn goal_distance(&self) -> f32 {
        self.goal_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn zoom_settles_toward_goal_without_overshoot() {
        let mut orbit = OrbitController::new().distance(30.0);
        orbit.zoom_by(4.0); // zoom in by 6 units

        let goal = orbit.goal_distance();
        let mut last = orbit.current_distance();
        for _ in 0..600 {
            orbit.ease(DT);
            let now = orbit.current_distance();
            assert!(now <= last + 1e-4, "distance must settle monotonically");
            assert!(now >= goal - 1e-4, "distance must not overshoot the goal");
            last = now;
        }
        assert!((orbit.current_distance() - goal).abs() < 1e-2);
    }

    #[test]
    fn elevation_is_clamped_short_of_the_poles() {
        let mut orbit = OrbitController::new();
        orbit.rotate_by(0.0, 1e6);
        orbit.ease(10.0);

        let mut camera = Camera::default();
        orbit.apply_to(&mut camera);
        // Even pinned at the clamp, the orbit frame stays well-defined.
        assert!(camera.position.is_finite());
        assert!(camera.position.y < orbit.current_distance());
    }

    #[test]
    fn pan_moves_the_target() {
        let mut orbit = OrbitController::new();
        orbit.pan_by(120.0, 0.0);
        orbit.ease(10.0);
        assert!(orbit.current_target().length() > 0.0);
    }

    #[test]
    fn full_damping_snaps_immediately() {
        let mut orbit = OrbitController::new().damping(1.0).distance(30.0);
        orbit.zoom_by(2.0);
        orbit.ease(DT);
        assert!((orbit.current_distance() - orbit.goal_distance()).abs() < 1e-6);
    }

    #[test]
    fn applied_pose_orbits_at_current_distance() {
        let mut orbit = OrbitController::new().distance(30.0);
        orbit.rotate_by(200.0, -80.0);
        for _ in 0..120 {
            orbit.ease(DT);
        }

        let mut camera = Camera::default();
        orbit.apply_to(&mut camera);
        let d = (camera.position - camera.target).length();
        assert!((d - orbit.current_distance()).abs() < 1e-3);
    }
}
