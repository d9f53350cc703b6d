//! Rotating directional light and its shadow-map transform

use glam::{Mat3, Mat4, Vec3};
use serde::Serialize;

/// Maps NDC x/y in `[-1, 1]` to texture space `[0, 1]` with v pointing down
const NDC_TO_TEXTURE: Mat4 = Mat4::from_cols_array(&[
    0.5, 0.0, 0.0, 0.0, //
    0.0, -0.5, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.5, 0.5, 0.0, 1.0,
]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Light-space matrices for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShadowTransform {
    /// Direction the light travels, unit length
    pub light_direction: Vec3,
    pub light_position: Vec3,
    pub near_z: f32,
    pub far_z: f32,
    pub view: Mat4,
    pub proj: Mat4,
    /// World space to shadow-map texture space
    pub shadow_transform: Mat4,
}

impl ShadowTransform {
    /// Fit an orthographic light frustum tightly around `bounds`.
    ///
    /// The light sits `2 * radius` behind the sphere centre along
    /// `direction` and looks at the centre.
    pub fn fit(direction: Vec3, bounds: &BoundingSphere) -> Self {
        let light_direction = direction.normalize_or(Vec3::NEG_Y);
        let light_position = bounds.center - 2.0 * bounds.radius * light_direction;
        let up = if light_direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_lh(light_position, bounds.center, up);

        let center = view.transform_point3(bounds.center);
        let r = bounds.radius;
        let (l, b, n) = (center.x - r, center.y - r, center.z - r);
        let (rt, t, f) = (center.x + r, center.y + r, center.z + r);
        let proj = Mat4::orthographic_lh(l, rt, b, t, n, f);

        Self {
            light_direction,
            light_position,
            near_z: n,
            far_z: f,
            view,
            proj,
            shadow_transform: NDC_TO_TEXTURE * proj * view,
        }
    }
}

/// Directional light that turns about the world Y axis
#[derive(Debug, Clone)]
pub struct RotatingLight {
    base_direction: Vec3,
    rotation_speed: f32,
    angle: f32,
}

impl RotatingLight {
    pub fn new(base_direction: Vec3, rotation_speed: f32) -> Self {
        Self {
            base_direction,
            rotation_speed,
            angle: 0.0,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Current light direction
    pub fn direction(&self) -> Vec3 {
        Mat3::from_rotation_y(self.angle) * self.base_direction
    }

    /// Turn the light by one frame and fit the shadow frustum around `bounds`
    pub fn advance(&mut self, dt: f32, bounds: &BoundingSphere) -> ShadowTransform {
        self.angle += self.rotation_speed * dt;
        ShadowTransform::fit(self.direction(), bounds)
    }
}
