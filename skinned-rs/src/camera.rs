//! First-person camera with a left-handed view

use glam::{Mat3, Mat4, Vec3};
use serde::Serialize;

/// Movement keys held during a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MovementKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementKeys {
    /// Parse a `W`/`A`/`S`/`D` key string, case-insensitively
    pub fn parse(keys: &str) -> Option<Self> {
        let mut held = Self::default();
        for key in keys.chars() {
            match key.to_ascii_uppercase() {
                'W' => held.forward = true,
                'S' => held.back = true,
                'A' => held.left = true,
                'D' => held.right = true,
                _ => return None,
            }
        }
        Some(held)
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    right: Vec3,
    up: Vec3,
    look: Vec3,

    fov_y: f32,
    aspect: f32,
    near_z: f32,
    far_z: f32,

    view: Mat4,
    proj: Mat4,
    view_dirty: bool,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            right: Vec3::X,
            up: Vec3::Y,
            look: Vec3::Z,
            fov_y: 0.25 * std::f32::consts::PI,
            aspect: 1.0,
            near_z: 1.0,
            far_z: 1000.0,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_dirty: true,
        };
        camera.set_lens(camera.fov_y, camera.aspect, camera.near_z, camera.far_z);
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.view_dirty = true;
    }

    pub fn look(&self) -> Vec3 {
        self.look
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn near_z(&self) -> f32 {
        self.near_z
    }

    pub fn far_z(&self) -> f32 {
        self.far_z
    }

    pub fn set_lens(&mut self, fov_y: f32, aspect: f32, near_z: f32, far_z: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near_z = near_z;
        self.far_z = far_z;
        self.proj = Mat4::perspective_lh(fov_y, aspect, near_z, far_z);
    }

    /// Point the camera from `position` at `target`
    pub fn look_at(&mut self, position: Vec3, target: Vec3, world_up: Vec3) {
        let look = (target - position).normalize_or(Vec3::Z);
        let right = world_up.cross(look).normalize_or(Vec3::X);
        self.position = position;
        self.look = look;
        self.right = right;
        self.up = look.cross(right);
        self.view_dirty = true;
    }

    /// Move along the look vector
    pub fn walk(&mut self, distance: f32) {
        self.position += self.look * distance;
        self.view_dirty = true;
    }

    /// Move along the right vector
    pub fn strafe(&mut self, distance: f32) {
        self.position += self.right * distance;
        self.view_dirty = true;
    }

    /// Rotate up and look about the right vector
    pub fn pitch(&mut self, angle: f32) {
        let r = Mat3::from_axis_angle(self.right, angle);
        self.up = r * self.up;
        self.look = r * self.look;
        self.view_dirty = true;
    }

    /// Rotate the basis about the world Y axis
    pub fn rotate_y(&mut self, angle: f32) {
        let r = Mat3::from_rotation_y(angle);
        self.right = r * self.right;
        self.up = r * self.up;
        self.look = r * self.look;
        self.view_dirty = true;
    }

    /// Apply held movement keys for one frame
    pub fn apply_keys(&mut self, keys: MovementKeys, speed: f32, dt: f32) {
        let step = speed * dt;
        if keys.forward {
            self.walk(step);
        }
        if keys.back {
            self.walk(-step);
        }
        if keys.left {
            self.strafe(-step);
        }
        if keys.right {
            self.strafe(step);
        }
    }

    /// Re-orthonormalize the basis and rebuild the view matrix if it moved
    pub fn update_view_matrix(&mut self) {
        if !self.view_dirty {
            return;
        }

        self.look = self.look.normalize_or(Vec3::Z);
        self.up = self.look.cross(self.right).normalize_or(Vec3::Y);
        self.right = self.up.cross(self.look);

        self.view = Mat4::look_to_lh(self.position, self.look, self.up);
        self.view_dirty = false;
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }
}
