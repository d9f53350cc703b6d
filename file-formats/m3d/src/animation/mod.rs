//! Skeletal animation
//!
//! This module turns the clips stored in an M3D file into skinning matrices:
//! - Keyframes and per-bone tracks with clamped linear/spherical interpolation
//! - Named clips with one optional track per bone
//! - [`SkinnedData`], the read-only animator shared between instances
//! - [`SkinnedModelInstance`], a looping playback cursor
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use m3d::{M3dModel, animation::SkinnedModelInstance};
//!
//! let model = M3dModel::load("Models/soldier.m3d")?;
//! let data = Arc::new(model.skinned_data()?);
//! let mut instance = SkinnedModelInstance::new(data, "Take1")?;
//!
//! // Once per frame
//! instance.advance(delta_seconds);
//! let matrices = instance.gpu_matrices();
//! ```

mod clip;
mod instance;
mod keyframe;
mod skinned_data;
mod track;

pub use clip::AnimationClip;
pub use instance::SkinnedModelInstance;
pub use keyframe::{BonePose, Keyframe};
pub use skinned_data::{ClipId, SkinnedData};
pub use track::BoneTrack;
