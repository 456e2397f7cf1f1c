use glam::{Mat4, Vec3};

/// A perspective camera for the shared scene.
///
/// The default pose sits 30 units back from the origin on the +Z axis,
/// looking at the origin, matching the distance the sun and starfield are
/// framed for.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(75.0, 1.0, 0.1, 1000.0)
    }
}

impl Camera {
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 30.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: fov_deg.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Update the aspect ratio after a viewport resize.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pose_looks_at_origin_from_z30() {
        let camera = Camera::default();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 30.0));
        assert_eq!(camera.target, Vec3::ZERO);

        // The view matrix must map the camera position to the eye origin.
        let eye = camera.view_matrix() * camera.position.extend(1.0);
        assert!(eye.truncate().length() < 1e-5);
    }

    #[test]
    fn set_aspect_is_reflected_in_projection() {
        let mut camera = Camera::default();
        camera.set_aspect(1920.0 / 1080.0);

        let proj = camera.projection_matrix();
        let focal = 1.0 / (camera.fov_y * 0.5).tan();
        assert!((proj.col(0).x - focal / (1920.0 / 1080.0)).abs() < 1e-5);
        assert!((proj.col(1).y - focal).abs() < 1e-5);
    }

    #[test]
    fn degenerate_aspect_is_rejected() {
        let mut camera = Camera::default();
        let before = camera.aspect;
        camera.set_aspect(0.0);
        camera.set_aspect(f32::NAN);
        assert_eq!(camera.aspect, before);
    }
}
