//! Per-frame constant blocks in the layout the shaders read.
//!
//! Every block is `#[repr(C)]` and `bytemuck::Pod`, so a frame can be copied
//! into upload memory with a plain byte copy. Matrices are stored as 16
//! column-major floats of the column-vector matrix.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Bone matrices the skinning shader indexes into
pub const MAX_BONES: usize = 96;

/// Light slots in a pass block
pub const MAX_LIGHTS: usize = 16;

/// Constant buffer elements are placed on 256-byte boundaries
pub const CONSTANT_BUFFER_ALIGNMENT: usize = 256;

/// Round `size` up to the constant buffer alignment
pub const fn constant_buffer_byte_size(size: usize) -> usize {
    (size + CONSTANT_BUFFER_ALIGNMENT - 1) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: [f32; 16],
    pub tex_transform: [f32; 16],
}

impl ObjectConstants {
    pub fn new(world: &Mat4, tex_transform: &Mat4) -> Self {
        Self {
            world: world.to_cols_array(),
            tex_transform: tex_transform.to_cols_array(),
        }
    }
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self {
            world: IDENTITY,
            tex_transform: IDENTITY,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialConstants {
    pub diffuse_albedo: [f32; 4],
    pub fresnel_r0: [f32; 3],
    pub roughness: f32,
    /// Non-zero when a diffuse texture is bound
    pub texture_on: u32,
    /// Non-zero when a normal map is bound
    pub normal_on: u32,
    pub padding: [f32; 2],
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            diffuse_albedo: [1.0; 4],
            fresnel_r0: [0.01; 3],
            roughness: 0.25,
            texture_on: 0,
            normal_on: 0,
            padding: [0.0; 2],
        }
    }
}

/// Light kinds understood by the lighting shader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LightType {
    Directional = 0,
    Point = 1,
    Spot = 2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    pub light_type: u32,
    pub padding: [f32; 3],
    pub strength: [f32; 3],
    pub falloff_start: f32,
    pub direction: [f32; 3],
    pub falloff_end: f32,
    pub position: [f32; 3],
    pub spot_power: f32,
}

impl LightConstants {
    pub fn directional(direction: Vec3, strength: Vec3) -> Self {
        Self {
            light_type: LightType::Directional as u32,
            direction: direction.to_array(),
            strength: strength.to_array(),
            ..Default::default()
        }
    }
}

impl Default for LightConstants {
    fn default() -> Self {
        Self {
            light_type: LightType::Directional as u32,
            padding: [0.0; 3],
            strength: [0.5; 3],
            falloff_start: 1.0,
            direction: [0.0, -1.0, 0.0],
            falloff_end: 10.0,
            position: [0.0; 3],
            spot_power: 64.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
    pub view: [f32; 16],
    pub inv_view: [f32; 16],
    pub proj: [f32; 16],
    pub inv_proj: [f32; 16],
    pub view_proj: [f32; 16],
    pub inv_view_proj: [f32; 16],
    pub shadow_transform: [f32; 16],

    pub ambient_light: [f32; 4],
    pub eye_pos_w: [f32; 3],
    pub light_count: u32,
    pub lights: [LightConstants; MAX_LIGHTS],

    pub fog_color: [f32; 4],
    pub fog_start: f32,
    pub fog_range: f32,
    pub fog_padding: [f32; 2],
}

impl PassConstants {
    /// Fill the camera matrices and their inverses from `view` and `proj`
    pub fn with_camera(view: Mat4, proj: Mat4) -> Self {
        let view_proj = proj * view;
        Self {
            view: view.to_cols_array(),
            inv_view: view.inverse().to_cols_array(),
            proj: proj.to_cols_array(),
            inv_proj: proj.inverse().to_cols_array(),
            view_proj: view_proj.to_cols_array(),
            inv_view_proj: view_proj.inverse().to_cols_array(),
            ..Default::default()
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        Mat4::from_cols_array(&self.view_proj)
    }

    pub fn active_lights(&self) -> &[LightConstants] {
        let count = (self.light_count as usize).min(MAX_LIGHTS);
        &self.lights[..count]
    }
}

impl Default for PassConstants {
    fn default() -> Self {
        Self {
            view: IDENTITY,
            inv_view: IDENTITY,
            proj: IDENTITY,
            inv_proj: IDENTITY,
            view_proj: IDENTITY,
            inv_view_proj: IDENTITY,
            shadow_transform: IDENTITY,
            ambient_light: [0.0, 0.0, 0.0, 1.0],
            eye_pos_w: [0.0; 3],
            light_count: MAX_LIGHTS as u32,
            lights: [LightConstants::default(); MAX_LIGHTS],
            fog_color: [0.7, 0.7, 0.7, 1.0],
            fog_start: 5.0,
            fog_range: 150.0,
            fog_padding: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkinnedConstants {
    pub bone_transforms: [[f32; 16]; MAX_BONES],
}

impl SkinnedConstants {
    /// Copy `transforms` into the leading slots; the rest stay identity
    pub fn from_transforms(transforms: &[Mat4]) -> Self {
        let mut constants = Self::default();
        for (slot, m) in constants.bone_transforms.iter_mut().zip(transforms) {
            *slot = m.to_cols_array();
        }
        constants
    }

    pub fn bone(&self, index: usize) -> Option<Mat4> {
        self.bone_transforms.get(index).map(Mat4::from_cols_array)
    }
}

impl Default for SkinnedConstants {
    fn default() -> Self {
        Self {
            bone_transforms: [IDENTITY; MAX_BONES],
        }
    }
}

/// CPU-side stand-in for a mapped upload heap.
///
/// Elements are written by index; constant buffers pad each element to the
/// 256-byte boundary.
#[derive(Debug, Clone)]
pub struct UploadBuffer<T: Pod> {
    data: Vec<u8>,
    element_byte_size: usize,
    count: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> UploadBuffer<T> {
    pub fn new(count: usize, is_constant_buffer: bool) -> Self {
        let size = std::mem::size_of::<T>();
        let element_byte_size = if is_constant_buffer {
            constant_buffer_byte_size(size)
        } else {
            size
        };
        Self {
            data: vec![0; element_byte_size * count],
            element_byte_size,
            count,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn element_byte_size(&self) -> usize {
        self.element_byte_size
    }

    /// Copy `value` into slot `index`; returns false when out of range
    pub fn copy_data(&mut self, index: usize, value: &T) -> bool {
        if index >= self.count {
            return false;
        }
        let start = index * self.element_byte_size;
        let bytes = bytemuck::bytes_of(value);
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        true
    }

    /// Read slot `index` back
    pub fn element(&self, index: usize) -> Option<T> {
        if index >= self.count {
            return None;
        }
        let start = index * self.element_byte_size;
        let size = std::mem::size_of::<T>();
        Some(bytemuck::pod_read_unaligned(&self.data[start..start + size]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Everything one frame writes for the GPU
#[derive(Debug, Clone)]
pub struct FrameConstants {
    pub objects: UploadBuffer<ObjectConstants>,
    pub materials: UploadBuffer<MaterialConstants>,
    /// Slot 0 is the main pass, slot 1 the shadow pass
    pub passes: UploadBuffer<PassConstants>,
    pub skinned: UploadBuffer<SkinnedConstants>,
}

impl FrameConstants {
    pub const MAIN_PASS: usize = 0;
    pub const SHADOW_PASS: usize = 1;

    pub fn new(object_count: usize, material_count: usize, skinned_count: usize) -> Self {
        Self {
            objects: UploadBuffer::new(object_count, true),
            materials: UploadBuffer::new(material_count, true),
            passes: UploadBuffer::new(2, true),
            skinned: UploadBuffer::new(skinned_count, true),
        }
    }

    pub fn main_pass(&self) -> Option<PassConstants> {
        self.passes.element(Self::MAIN_PASS)
    }

    pub fn shadow_pass(&self) -> Option<PassConstants> {
        self.passes.element(Self::SHADOW_PASS)
    }

    /// Total bytes across all upload buffers
    pub fn byte_size(&self) -> usize {
        self.objects.as_bytes().len()
            + self.materials.as_bytes().len()
            + self.passes.as_bytes().len()
            + self.skinned.as_bytes().len()
    }
}

/// Diffuse albedo, Fresnel reflectance and roughness as a constant block
pub fn material_constants(
    diffuse_albedo: Vec4,
    fresnel_r0: Vec3,
    roughness: f32,
    has_diffuse: bool,
    has_normal: bool,
) -> MaterialConstants {
    MaterialConstants {
        diffuse_albedo: diffuse_albedo.to_array(),
        fresnel_r0: fresnel_r0.to_array(),
        roughness,
        texture_on: u32::from(has_diffuse),
        normal_on: u32::from(has_normal),
        padding: [0.0; 2],
    }
}
