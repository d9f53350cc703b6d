//! Scene tables: geometries, textures, materials and render items.
//!
//! The tables are arenas. Render items refer to geometry and materials by
//! index newtypes, and each render layer is a list of render item ids, so
//! nothing in the scene holds a pointer into another table.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3, Vec4};
use m3d::{M3dMaterial, ModelParts, StaticMesh, Subset};
use serde::Serialize;
use thiserror::Error;

use crate::frame::{MAX_BONES, MaterialConstants, ObjectConstants, material_constants};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("model has {bones} bones but at most {max} fit in the skinning constants")]
    TooManyBones { bones: usize, max: usize },

    #[error("model has {materials} materials but {subsets} subsets")]
    SubsetMismatch { materials: usize, subsets: usize },

    #[error("subset {subset} references faces past the end of the index buffer")]
    SubsetOutOfRange { subset: usize },
}

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GeometryId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MaterialId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RenderItemId(usize);

impl GeometryId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl MaterialId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl RenderItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Draw passes, in the order they are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RenderLayer {
    Opaque,
    SkinnedOpaque,
    Transparent,
    AlphaTested,
    Debug,
    Skybox,
}

impl RenderLayer {
    pub const COUNT: usize = 6;

    pub const ALL: [RenderLayer; Self::COUNT] = [
        RenderLayer::Opaque,
        RenderLayer::SkinnedOpaque,
        RenderLayer::Transparent,
        RenderLayer::AlphaTested,
        RenderLayer::Debug,
        RenderLayer::Skybox,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RenderLayer::Opaque => "Opaque",
            RenderLayer::SkinnedOpaque => "SkinnedOpaque",
            RenderLayer::Transparent => "Transparent",
            RenderLayer::AlphaTested => "AlphaTested",
            RenderLayer::Debug => "Debug",
            RenderLayer::Skybox => "Skybox",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    pub fn byte_size(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Procedural primitives the scene draws.
///
/// Only the vertex and index counts the generator would produce are kept;
/// the meshes themselves are built on the GPU side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Primitive {
    /// Unit-face box split `subdivisions` times
    Box { subdivisions: u32 },
    /// `rows x columns` vertex grid
    Grid { rows: u32, columns: u32 },
    Sphere { slices: u32, stacks: u32 },
    /// Open tube plus top and bottom caps
    Cylinder { slices: u32, stacks: u32 },
    Quad,
}

impl Primitive {
    pub fn vertex_count(self) -> usize {
        match self {
            // Each subdivision emits six vertices for every input triangle
            Primitive::Box { subdivisions: 0 } => 24,
            Primitive::Box { subdivisions } => 6 * 12 * 4usize.pow(subdivisions - 1),
            Primitive::Grid { rows, columns } => (rows * columns) as usize,
            Primitive::Sphere { slices, stacks } => {
                2 + (stacks.saturating_sub(1) * (slices + 1)) as usize
            }
            Primitive::Cylinder { slices, stacks } => {
                ((stacks + 1) * (slices + 1) + 2 * (slices + 2)) as usize
            }
            Primitive::Quad => 4,
        }
    }

    pub fn index_count(self) -> usize {
        match self {
            Primitive::Box { subdivisions } => 36 * 4usize.pow(subdivisions),
            Primitive::Grid { rows, columns } => {
                6 * (rows.saturating_sub(1) * columns.saturating_sub(1)) as usize
            }
            Primitive::Sphere { slices, stacks } => {
                6 * (slices * stacks.saturating_sub(1)) as usize
            }
            Primitive::Cylinder { slices, stacks } => (6 * slices * stacks + 6 * slices) as usize,
            Primitive::Quad => 6,
        }
    }
}

/// Draw-range metadata for one mesh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub name: String,
    pub vertex_count: usize,
    pub index_count: usize,
    pub start_index_location: usize,
    pub base_vertex_location: i32,
    pub index_format: IndexFormat,
}

impl Geometry {
    pub fn primitive(name: &str, primitive: Primitive) -> Self {
        Self {
            name: name.to_string(),
            vertex_count: primitive.vertex_count(),
            index_count: primitive.index_count(),
            start_index_location: 0,
            base_vertex_location: 0,
            index_format: IndexFormat::U16,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.index_count / 3
    }
}

/// A texture and the shader-visible slot it occupies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Texture {
    pub name: String,
    pub filename: PathBuf,
    pub srv_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    pub cb_index: usize,
    pub diffuse_srv: Option<usize>,
    pub normal_srv: Option<usize>,
    pub diffuse_albedo: Vec4,
    pub fresnel_r0: Vec3,
    pub roughness: f32,
}

impl Material {
    pub fn constants(&self) -> MaterialConstants {
        material_constants(
            self.diffuse_albedo,
            self.fresnel_r0,
            self.roughness,
            self.diffuse_srv.is_some(),
            self.normal_srv.is_some(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderItem {
    pub obj_cb_index: usize,
    pub world: Mat4,
    pub tex_transform: Mat4,
    pub geometry: GeometryId,
    pub material: MaterialId,
    /// Slot of the bone palette this item is skinned with
    pub skinned_cb_index: Option<usize>,
}

impl RenderItem {
    pub fn constants(&self) -> ObjectConstants {
        ObjectConstants::new(&self.world, &self.tex_transform)
    }
}

/// World matrix of the skinned character: scaled down, mirrored in Z,
/// turned to face the camera and pushed back along Z
pub fn skinned_world() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
        * Mat4::from_rotation_y(PI)
        * Mat4::from_scale(Vec3::new(0.05, 0.05, -0.05))
}

/// File stem used as a texture name: everything before the last dot
fn texture_name(file: &str) -> &str {
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    geometries: Vec<Geometry>,
    textures: Vec<Texture>,
    materials: Vec<Material>,
    render_items: Vec<RenderItem>,
    layers: [Vec<RenderItemId>; RenderLayer::COUNT],
    skinned_srv_heap_start: usize,
    skybox_srv: usize,
}

impl Scene {
    /// Build the demo scene around a skinned model.
    ///
    /// The skull item is only added when a skull mesh is given.
    pub fn sample(
        parts: &ModelParts,
        skull: Option<&StaticMesh>,
        texture_dir: &Path,
    ) -> Result<Self> {
        let bone_count = parts.skinned.bone_count();
        if bone_count > MAX_BONES {
            return Err(SceneError::TooManyBones {
                bones: bone_count,
                max: MAX_BONES,
            });
        }
        if parts.materials.len() != parts.subsets.len() {
            return Err(SceneError::SubsetMismatch {
                materials: parts.materials.len(),
                subsets: parts.subsets.len(),
            });
        }

        let mut scene = Self::default();
        scene.build_textures(&parts.materials, texture_dir);
        let geometry = scene.build_geometries(parts, skull)?;
        let materials = scene.build_materials(&parts.materials);
        scene.build_render_items(&geometry, &materials);

        log::info!(
            "Built scene: {} geometries, {} textures, {} materials, {} render items",
            scene.geometries.len(),
            scene.textures.len(),
            scene.materials.len(),
            scene.render_items.len()
        );
        Ok(scene)
    }

    fn build_textures(&mut self, skinned: &[M3dMaterial], texture_dir: &Path) {
        let base = [
            ("bricks", "bricks.dds"),
            ("bricksNormal", "bricks_nmap.dds"),
            ("stone", "stone.dds"),
            ("tile", "tile.dds"),
            ("tileNormal", "tile_nmap.dds"),
            ("fence", "WireFence.dds"),
            ("default", "white1x1.dds"),
        ];
        for (name, file) in base {
            self.push_texture(name, texture_dir.join(file));
        }

        self.skinned_srv_heap_start = self.textures.len();
        for material in skinned {
            for file in [&material.diffuse_map_name, &material.normal_map_name] {
                if file.is_empty() {
                    continue;
                }
                let name = texture_name(file);
                if self.texture_slot(name).is_none() {
                    self.push_texture(name, texture_dir.join(file));
                }
            }
        }

        // The cube map follows every 2D texture
        self.skybox_srv = self.textures.len();
        self.push_texture("skyCubeMap", texture_dir.join("grasscube1024.dds"));
    }

    fn push_texture(&mut self, name: &str, filename: PathBuf) {
        let srv_index = self.textures.len();
        self.textures.push(Texture {
            name: name.to_string(),
            filename,
            srv_index,
        });
    }

    fn texture_slot(&self, name: &str) -> Option<usize> {
        self.textures
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.srv_index)
    }

    fn build_geometries(
        &mut self,
        parts: &ModelParts,
        skull: Option<&StaticMesh>,
    ) -> Result<SceneGeometry> {
        let shape = |scene: &mut Self, name: &str, primitive: Primitive| {
            scene.add_geometry(Geometry::primitive(name, primitive))
        };

        let sky_sphere = shape(self, "Sphere", Primitive::Sphere { slices: 20, stacks: 20 });
        let fence_box = shape(self, "Box", Primitive::Box { subdivisions: 3 });
        let grid = shape(self, "Grid", Primitive::Grid { rows: 60, columns: 40 });
        let cylinder = shape(self, "Cylinder", Primitive::Cylinder { slices: 20, stacks: 20 });
        let quad = shape(self, "Quad", Primitive::Quad);

        let skull = skull.map(|mesh| {
            self.add_geometry(Geometry {
                name: "Skull".to_string(),
                vertex_count: mesh.vertices.len(),
                index_count: mesh.indices.len(),
                start_index_location: 0,
                base_vertex_location: 0,
                index_format: IndexFormat::U32,
            })
        });

        let mut skinned = Vec::with_capacity(parts.subsets.len());
        for (i, subset) in parts.subsets.iter().enumerate() {
            skinned.push(self.add_skinned_geometry(i, subset, parts)?);
        }

        Ok(SceneGeometry {
            sphere: sky_sphere,
            fence_box,
            grid,
            cylinder,
            quad,
            skull,
            skinned,
        })
    }

    fn add_skinned_geometry(
        &mut self,
        index: usize,
        subset: &Subset,
        parts: &ModelParts,
    ) -> Result<GeometryId> {
        let range = subset.index_range();
        if range.end > parts.indices.len() {
            return Err(SceneError::SubsetOutOfRange { subset: index });
        }
        Ok(self.add_geometry(Geometry {
            name: format!("sm_{index}"),
            vertex_count: parts.vertices.len(),
            index_count: range.len(),
            start_index_location: range.start,
            base_vertex_location: 0,
            index_format: IndexFormat::U16,
        }))
    }

    fn build_materials(&mut self, skinned: &[M3dMaterial]) -> SceneMaterials {
        let white = Vec4::ONE;
        let add = |scene: &mut Self,
                   name: &str,
                   diffuse: Option<usize>,
                   normal: Option<usize>,
                   albedo: Vec4,
                   fresnel: Vec3,
                   roughness: f32| {
            scene.add_material(Material {
                name: name.to_string(),
                cb_index: scene.materials.len(),
                diffuse_srv: diffuse,
                normal_srv: normal,
                diffuse_albedo: albedo,
                fresnel_r0: fresnel,
                roughness,
            })
        };

        let bricks = add(self, "bricks0", Some(0), Some(1), white, Vec3::splat(0.02), 0.1);
        let _stone = add(self, "stone0", Some(2), None, white, Vec3::splat(0.05), 0.3);
        let tile = add(self, "tile0", Some(3), Some(4), white, Vec3::splat(0.02), 0.2);
        let skull = add(
            self,
            "skull",
            None,
            None,
            Vec4::new(1.0, 1.0, 1.0, 0.5),
            Vec3::splat(0.05),
            0.3,
        );
        let wirefence = add(self, "wirefence", Some(5), None, white, Vec3::splat(0.1), 0.25);
        let mirror = add(
            self,
            "mirror",
            Some(6),
            None,
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec3::new(0.98, 0.97, 0.95),
            0.1,
        );
        let skybox_srv = self.skybox_srv;
        let skybox = add(self, "skybox", Some(skybox_srv), None, white, Vec3::splat(0.1), 1.0);

        let skinned = skinned
            .iter()
            .map(|m| {
                let diffuse = self.texture_slot(texture_name(&m.diffuse_map_name));
                let normal = self.texture_slot(texture_name(&m.normal_map_name));
                let diffuse = diffuse.filter(|_| !m.diffuse_map_name.is_empty());
                let normal = normal.filter(|_| m.has_normal_map());
                add(
                    self,
                    &m.name,
                    diffuse,
                    normal,
                    m.diffuse_albedo,
                    m.fresnel_r0,
                    m.roughness,
                )
            })
            .collect();

        SceneMaterials {
            bricks,
            tile,
            skull,
            wirefence,
            mirror,
            skybox,
            skinned,
        }
    }

    fn build_render_items(&mut self, geometry: &SceneGeometry, materials: &SceneMaterials) {
        let item = |world, tex_transform, geometry, material| RenderItem {
            obj_cb_index: 0,
            world,
            tex_transform,
            geometry,
            material,
            skinned_cb_index: None,
        };

        self.add_render_item(
            item(
                Mat4::from_scale(Vec3::splat(5000.0)),
                Mat4::IDENTITY,
                geometry.sphere,
                materials.skybox,
            ),
            RenderLayer::Skybox,
        );
        self.add_render_item(
            item(
                Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)) * Mat4::from_scale(Vec3::splat(2.0)),
                Mat4::IDENTITY,
                geometry.fence_box,
                materials.wirefence,
            ),
            RenderLayer::AlphaTested,
        );
        self.add_render_item(
            item(
                Mat4::IDENTITY,
                Mat4::from_scale(Vec3::new(8.0, 8.0, 1.0)),
                geometry.grid,
                materials.tile,
            ),
            RenderLayer::Opaque,
        );
        if let Some(skull) = geometry.skull {
            self.add_render_item(
                item(
                    Mat4::from_scale_rotation_translation(
                        Vec3::splat(0.5),
                        Quat::IDENTITY,
                        Vec3::new(0.0, 1.0, 0.0),
                    ),
                    Mat4::IDENTITY,
                    skull,
                    materials.skull,
                ),
                RenderLayer::Opaque,
            );
        }
        self.add_render_item(
            item(Mat4::IDENTITY, Mat4::IDENTITY, geometry.quad, materials.tile),
            RenderLayer::Debug,
        );

        for i in 0..5 {
            let z = -10.0 + i as f32 * 5.0;
            for x in [-5.0, 5.0] {
                self.add_render_item(
                    item(
                        Mat4::from_translation(Vec3::new(x, 1.5, z)),
                        Mat4::IDENTITY,
                        geometry.cylinder,
                        materials.bricks,
                    ),
                    RenderLayer::Opaque,
                );
            }
            for x in [-5.0, 5.0] {
                self.add_render_item(
                    item(
                        Mat4::from_translation(Vec3::new(x, 3.5, z)),
                        Mat4::IDENTITY,
                        geometry.sphere,
                        materials.mirror,
                    ),
                    RenderLayer::Opaque,
                );
            }
        }

        let world = skinned_world();
        for (&geo, &material) in geometry.skinned.iter().zip(&materials.skinned) {
            let mut ritem = item(world, Mat4::IDENTITY, geo, material);
            ritem.skinned_cb_index = Some(0);
            self.add_render_item(ritem, RenderLayer::SkinnedOpaque);
        }
    }

    fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    fn add_render_item(&mut self, mut item: RenderItem, layer: RenderLayer) -> RenderItemId {
        let id = RenderItemId(self.render_items.len());
        item.obj_cb_index = id.0;
        self.render_items.push(item);
        self.layers[layer as usize].push(id);
        id
    }

    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn render_items(&self) -> &[RenderItem] {
        &self.render_items
    }

    pub fn geometry(&self, id: GeometryId) -> &Geometry {
        &self.geometries[id.0]
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn render_item(&self, id: RenderItemId) -> &RenderItem {
        &self.render_items[id.0]
    }

    pub fn layer(&self, layer: RenderLayer) -> &[RenderItemId] {
        &self.layers[layer as usize]
    }

    pub fn find_geometry(&self, name: &str) -> Option<GeometryId> {
        self.geometries
            .iter()
            .position(|g| g.name == name)
            .map(GeometryId)
    }

    pub fn find_material(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(MaterialId)
    }

    /// First shader-visible slot holding a skinned-model texture
    pub fn skinned_srv_heap_start(&self) -> usize {
        self.skinned_srv_heap_start
    }

    pub fn skybox_srv(&self) -> usize {
        self.skybox_srv
    }

    /// The shadow map follows the sky cube map
    pub fn shadow_map_srv(&self) -> usize {
        self.skybox_srv + 1
    }

    /// Number of bone palettes render items reference
    pub fn skinned_palette_count(&self) -> usize {
        self.render_items
            .iter()
            .filter_map(|r| r.skinned_cb_index)
            .max()
            .map_or(0, |max| max + 1)
    }
}

struct SceneGeometry {
    sphere: GeometryId,
    fence_box: GeometryId,
    grid: GeometryId,
    cylinder: GeometryId,
    quad: GeometryId,
    skull: Option<GeometryId>,
    skinned: Vec<GeometryId>,
}

struct SceneMaterials {
    bricks: MaterialId,
    tile: MaterialId,
    skull: MaterialId,
    wirefence: MaterialId,
    mirror: MaterialId,
    skybox: MaterialId,
    skinned: Vec<MaterialId>,
}
