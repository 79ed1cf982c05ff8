use crate::Transform;
use glam::{Mat4, Quat, Vec3};

/// One blendable pose entry. Entries start clean; a bone nothing touched
/// keeps its rest pose when the component builds matrices.
#[derive(Copy, Clone, Debug)]
pub struct PoseEntry {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    dirty: bool,
}

impl Default for PoseEntry {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            dirty: false,
        }
    }
}

/// Per-bone local transforms accumulated across active states and layers
/// during one evaluation.
#[derive(Clone, Debug, Default)]
pub struct Pose {
    entries: Vec<PoseEntry>,
}

impl Pose {
    pub fn new(num_bones: usize) -> Self {
        Self {
            entries: vec![PoseEntry::default(); num_bones],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, bone: usize) -> &PoseEntry {
        &self.entries[bone]
    }

    pub fn is_dirty(&self, bone: usize) -> bool {
        self.entries[bone].dirty
    }

    /// `entry = entry * (1 - weight) + sample * weight`.
    pub fn blend(&mut self, bone: usize, sample: &Transform, weight: f32) {
        let entry = &mut self.entries[bone];
        entry.translation = entry.translation.lerp(sample.translation, weight);
        entry.rotation = entry.rotation.slerp(sample.rotation, weight);
        entry.scale = entry.scale.lerp(sample.scale, weight);
        entry.dirty = true;
    }

    /// `entry += sample * weight`, componentwise. The rotation is summed on
    /// the accumulator's hemisphere so the weighted mix stays shortest-path;
    /// it is renormalized when the matrix is built.
    pub fn accumulate(&mut self, bone: usize, sample: &Transform, weight: f32) {
        let entry = &mut self.entries[bone];
        entry.translation += sample.translation * weight;
        entry.scale += sample.scale * weight;

        let mut rotation = sample.rotation;
        if entry.rotation.dot(rotation) < 0.0 {
            rotation = -rotation;
        }
        entry.rotation = entry.rotation + rotation * weight;
        entry.dirty = true;
    }

    /// Rescales every entry, making room before additive contributions are
    /// layered on top during a crossfade.
    pub fn scale_weights(&mut self, factor: f32) {
        for entry in &mut self.entries {
            entry.translation *= factor;
            entry.rotation = entry.rotation * factor;
            entry.scale *= factor;
        }
    }

    /// Local matrix for a bone, with the accumulated rotation renormalized.
    pub fn local_matrix(&self, bone: usize) -> Mat4 {
        let entry = &self.entries[bone];
        let rotation = if entry.rotation.length_squared() > 1.0e-12 {
            entry.rotation.normalize()
        } else {
            Quat::IDENTITY
        };
        Mat4::from_scale_rotation_translation(entry.scale, rotation, entry.translation)
    }
}
