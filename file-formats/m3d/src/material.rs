//! Materials referenced by the subsets of a model

use std::io::Write;

use glam::{Vec3, Vec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reader::TokenReader;

/// Surface description of one subset
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct M3dMaterial {
    /// Unique material name
    pub name: String,
    /// Diffuse albedo; the file stores RGB and alpha is always 1
    pub diffuse_albedo: Vec4,
    /// Fresnel reflectance at normal incidence
    pub fresnel_r0: Vec3,
    /// Surface roughness in `[0, 1]`
    pub roughness: f32,
    /// Whether the material uses alpha clipping
    pub alpha_clip: bool,
    /// Shader family the material was authored for (e.g. `Skinned`)
    pub material_type_name: String,
    /// Diffuse texture file name
    pub diffuse_map_name: String,
    /// Normal map file name
    pub normal_map_name: String,
}

impl Default for M3dMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_albedo: Vec4::ONE,
            fresnel_r0: Vec3::splat(0.01),
            roughness: 0.25,
            alpha_clip: false,
            material_type_name: "Skinned".to_string(),
            diffuse_map_name: String::new(),
            normal_map_name: String::new(),
        }
    }
}

impl M3dMaterial {
    pub(crate) fn read(reader: &mut TokenReader<'_>) -> Result<Self> {
        let name = reader.labeled("Name:")?;
        reader.expect("Diffuse:")?;
        let diffuse = reader.vec3("diffuse albedo")?;
        reader.expect("Fresnel0:")?;
        let fresnel_r0 = reader.vec3("fresnel")?;
        let roughness = reader.labeled("Roughness:")?;
        let alpha_clip: u8 = reader.labeled("AlphaClip:")?;
        if alpha_clip > 1 {
            return Err(reader.error(format!("AlphaClip must be 0 or 1, found {alpha_clip}")));
        }

        Ok(Self {
            name,
            diffuse_albedo: diffuse.extend(1.0),
            fresnel_r0,
            roughness,
            alpha_clip: alpha_clip == 1,
            material_type_name: reader.labeled("MaterialTypeName:")?,
            diffuse_map_name: reader.labeled("DiffuseMap:")?,
            normal_map_name: reader.labeled("NormalMap:")?,
        })
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let d = self.diffuse_albedo;
        let f = self.fresnel_r0;
        writeln!(writer, "Name: {}", self.name)?;
        writeln!(writer, "Diffuse: {} {} {}", d.x, d.y, d.z)?;
        writeln!(writer, "Fresnel0: {} {} {}", f.x, f.y, f.z)?;
        writeln!(writer, "Roughness: {}", self.roughness)?;
        writeln!(writer, "AlphaClip: {}", u8::from(self.alpha_clip))?;
        writeln!(writer, "MaterialTypeName: {}", self.material_type_name)?;
        writeln!(writer, "DiffuseMap: {}", self.diffuse_map_name)?;
        writeln!(writer, "NormalMap: {}", self.normal_map_name)?;
        writeln!(writer)?;
        Ok(())
    }

    /// Whether a normal map is referenced
    pub fn has_normal_map(&self) -> bool {
        !self.normal_map_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLDIER_HEAD: &str = "Name: soldier_head
Diffuse: 1 1 1
Fresnel0: 0.05 0.05 0.05
Roughness: 0.5
AlphaClip: 0
MaterialTypeName: Skinned
DiffuseMap: head_diff.dds
NormalMap: head_norm.dds
";

    #[test]
    fn test_read_material() {
        let mut reader = TokenReader::new(SOLDIER_HEAD);
        let material = M3dMaterial::read(&mut reader).unwrap();
        assert_eq!(material.name, "soldier_head");
        assert_eq!(material.diffuse_albedo, Vec4::ONE);
        assert_eq!(material.fresnel_r0, Vec3::splat(0.05));
        assert_eq!(material.roughness, 0.5);
        assert!(!material.alpha_clip);
        assert_eq!(material.diffuse_map_name, "head_diff.dds");
        assert!(material.has_normal_map());
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_alpha_clip_out_of_range() {
        let text = SOLDIER_HEAD.replace("AlphaClip: 0", "AlphaClip: 2");
        let mut reader = TokenReader::new(&text);
        assert!(M3dMaterial::read(&mut reader).is_err());
    }
}
