//! Per-model playback state

use std::sync::Arc;

use glam::Mat4;

use super::skinned_data::{ClipId, SkinnedData};
use crate::error::Result;

/// One animated copy of a skinned model.
///
/// Owns its time cursor and output buffer. The skeleton and clips are shared
/// with other instances through an `Arc` and never modified.
#[derive(Debug, Clone)]
pub struct SkinnedModelInstance {
    data: Arc<SkinnedData>,
    clip: ClipId,
    clip_name: String,
    clip_end: f32,
    time_pos: f32,
    final_transforms: Vec<Mat4>,
}

impl SkinnedModelInstance {
    /// Create an instance playing `clip_name` from the start.
    ///
    /// An unknown clip fails here, so [`advance`](Self::advance) never has to.
    pub fn new(data: Arc<SkinnedData>, clip_name: &str) -> Result<Self> {
        let clip = data.clip_id(clip_name)?;
        let clip_end = data.clip(clip).map_or(0.0, |c| c.end_time());
        let final_transforms = vec![Mat4::IDENTITY; data.bone_count()];

        let mut instance = Self {
            data,
            clip,
            clip_name: clip_name.to_string(),
            clip_end,
            time_pos: 0.0,
            final_transforms,
        };
        instance.evaluate();
        Ok(instance)
    }

    /// Move the cursor forward by `dt` seconds and re-evaluate.
    ///
    /// Once the cursor passes the end of the clip it restarts at zero. The
    /// overshoot is dropped, not carried into the next loop.
    pub fn advance(&mut self, dt: f32) {
        self.time_pos += dt;
        if self.time_pos > self.clip_end {
            log::trace!(
                "Clip '{}' looped at {:.4}s (end {:.4}s)",
                self.clip_name,
                self.time_pos,
                self.clip_end
            );
            self.time_pos = 0.0;
        }
        self.evaluate();
    }

    /// Switch to another clip and rewind
    pub fn set_clip(&mut self, clip_name: &str) -> Result<()> {
        let clip = self.data.clip_id(clip_name)?;
        self.clip = clip;
        self.clip_name = clip_name.to_string();
        self.clip_end = self.data.clip(clip).map_or(0.0, |c| c.end_time());
        self.time_pos = 0.0;
        self.evaluate();
        Ok(())
    }

    fn evaluate(&mut self) {
        self.data
            .final_transforms_into(self.clip, self.time_pos, &mut self.final_transforms);
    }

    pub fn data(&self) -> &Arc<SkinnedData> {
        &self.data
    }

    pub fn clip_name(&self) -> &str {
        &self.clip_name
    }

    /// Length of the current clip in seconds
    pub fn clip_duration(&self) -> f32 {
        self.clip_end
    }

    /// Current cursor position in seconds
    pub fn time_pos(&self) -> f32 {
        self.time_pos
    }

    /// Skinning matrices from the latest evaluation, indexed by bone
    pub fn final_transforms(&self) -> &[Mat4] {
        &self.final_transforms
    }

    /// Column-major matrices ready to copy into a constant buffer
    pub fn gpu_matrices(&self) -> Vec<[f32; 16]> {
        self.final_transforms
            .iter()
            .map(Mat4::to_cols_array)
            .collect()
    }
}
