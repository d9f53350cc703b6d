//! Parser, writer and skeletal animation evaluator for M3D skinned models.
//!
//! M3D is a whitespace-separated text format holding everything needed to
//! draw and animate a skinned character: materials, a subset table mapping
//! materials to triangle ranges, skinned vertices, a triangle list, the bone
//! offsets and hierarchy, and any number of keyframed animation clips.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use m3d::{M3dModel, SkinnedModelInstance};
//!
//! let model = M3dModel::load("Models/soldier.m3d")?;
//! model.validate()?;
//!
//! let parts = model.into_parts()?;
//! let mut soldier = SkinnedModelInstance::new(Arc::new(parts.skinned), "Take1")?;
//!
//! for _ in 0..60 {
//!     soldier.advance(1.0 / 60.0);
//! }
//! println!("{} bone matrices", soldier.final_transforms().len());
//! # Ok::<(), m3d::M3dError>(())
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod animation;
pub mod error;
pub mod header;
pub mod material;
pub mod model;
mod reader;
pub mod skeleton;
pub mod skinning;
pub mod static_mesh;
pub mod subset;
pub mod vertex;

pub use animation::{
    AnimationClip, BonePose, BoneTrack, ClipId, Keyframe, SkinnedData, SkinnedModelInstance,
};
pub use error::{M3dError, Result};
pub use header::M3dHeader;
pub use material::M3dMaterial;
pub use model::{M3dModel, ModelParts};
pub use skeleton::{Bone, Skeleton};
pub use static_mesh::{StaticMesh, StaticVertex};
pub use subset::Subset;
pub use vertex::{MAX_INFLUENCES, SkinnedVertex};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
