use crate::{Error, PackedQuat};
use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;

/// Local-space TRS transform.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One bone of the skeleton. The bone's id is its index in
/// [`RigData::bones`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneData {
    /// Parent bone index; `None` for the root. Always less than the bone's
    /// own index, so one forward pass resolves model-space transforms.
    pub parent: Option<usize>,
    /// Rest-pose local transform, used wherever a channel has no keys.
    pub rest: Transform,
    /// Inverse bind ("offset") matrix taking vertices from model space into
    /// this bone's local space.
    pub inverse_bind: Mat4,
}

/// The three keyframe tracks a bone can have within a clip.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    Translation,
    Rotation,
    Scale,
}

impl Channel {
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Translation => 0,
            Self::Rotation => 1,
            Self::Scale => 2,
        }
    }
}

/// A key's payload; the channel is the variant.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyValue {
    Translation(Vec3),
    Rotation(PackedQuat),
    Scale(Vec3),
}

impl KeyValue {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Translation(_) => Channel::Translation,
            Self::Rotation(_) => Channel::Rotation,
            Self::Scale(_) => Channel::Scale,
        }
    }
}

/// One sample of one bone channel.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyFrame {
    /// Sample time in clip ticks.
    pub time: f32,
    pub bone: u16,
    pub value: KeyValue,
}

/// An immutable keyframed animation.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationClip {
    pub name: String,
    /// Clip length in ticks.
    pub duration: f32,
    pub ticks_per_second: f32,
    /// A single stream interleaved across bones and channels, ordered by the
    /// time each sample is first needed (see [`ClipBuilder`]). Within one
    /// bone channel, sample times are non-decreasing.
    pub frames: Vec<KeyFrame>,
}

impl AnimationClip {
    pub fn duration_in_seconds(&self) -> f32 {
        if self.ticks_per_second > 0.0 {
            self.duration / self.ticks_per_second
        } else {
            0.0
        }
    }
}

/// Assembles an [`AnimationClip`] from per-bone channel samples.
///
/// The per-channel samples are merged into one stream ordered by *needed
/// time*: the time of the sample two keys earlier in its own channel. The
/// playback cache consumes the stream strictly forward with a single
/// cursor, and this ordering keeps every channel's window exactly one key
/// ahead of the current time.
#[derive(Clone, Debug, Default)]
pub struct ClipBuilder {
    name: String,
    duration: f32,
    ticks_per_second: f32,
    staged: Vec<Vec<KeyFrame>>,
}

impl ClipBuilder {
    pub fn new(name: impl Into<String>, duration: f32, ticks_per_second: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            ticks_per_second,
            staged: Vec::new(),
        }
    }

    pub fn translation(mut self, bone: u16, keys: &[(f32, Vec3)]) -> Self {
        self.staged.push(
            keys.iter()
                .map(|&(time, value)| KeyFrame {
                    time,
                    bone,
                    value: KeyValue::Translation(value),
                })
                .collect(),
        );
        self
    }

    pub fn rotation(mut self, bone: u16, keys: &[(f32, Quat)]) -> Self {
        self.staged.push(
            keys.iter()
                .map(|&(time, value)| KeyFrame {
                    time,
                    bone,
                    value: KeyValue::Rotation(PackedQuat::from_quat(value)),
                })
                .collect(),
        );
        self
    }

    pub fn scale(mut self, bone: u16, keys: &[(f32, Vec3)]) -> Self {
        self.staged.push(
            keys.iter()
                .map(|&(time, value)| KeyFrame {
                    time,
                    bone,
                    value: KeyValue::Scale(value),
                })
                .collect(),
        );
        self
    }

    pub fn build(self) -> AnimationClip {
        let mut merged: Vec<(f32, KeyFrame)> = Vec::new();
        for channel in &self.staged {
            for (i, frame) in channel.iter().enumerate() {
                let needed = channel[i.saturating_sub(2)].time;
                merged.push((needed, *frame));
            }
        }
        // Stable, so channels interleave in insertion order at equal times.
        merged.sort_by(|a, b| a.0.total_cmp(&b.0));

        AnimationClip {
            name: self.name,
            duration: self.duration,
            ticks_per_second: self.ticks_per_second,
            frames: merged.into_iter().map(|(_, frame)| frame).collect(),
        }
    }
}

/// The immutable skeleton-plus-clips asset a component animates. Shared
/// between entities as `Arc<RigData>`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigData {
    pub bones: Vec<BoneData>,
    pub animations: Vec<AnimationClip>,
    pub animation_index: HashMap<String, usize>,
}

impl RigData {
    /// Builds a rig, validating the invariants evaluation relies on: bones
    /// stored parent-before-child, clip bone indices in range, and key
    /// times non-decreasing within each bone channel. Violations are asset
    /// defects and fail construction outright.
    pub fn new(bones: Vec<BoneData>, animations: Vec<AnimationClip>) -> Result<Self, Error> {
        for (bone, data) in bones.iter().enumerate() {
            if let Some(parent) = data.parent {
                if parent >= bone {
                    return Err(Error::InvalidHierarchy { bone, parent });
                }
            }
        }

        for clip in &animations {
            let mut last_time: HashMap<(u16, usize), f32> = HashMap::new();
            for frame in &clip.frames {
                if frame.bone as usize >= bones.len() {
                    return Err(Error::InvalidBoneIndex {
                        clip: clip.name.clone(),
                        bone: frame.bone as usize,
                    });
                }
                let key = (frame.bone, frame.value.channel().index());
                if let Some(&previous) = last_time.get(&key) {
                    if frame.time < previous {
                        return Err(Error::UnsortedFrames {
                            clip: clip.name.clone(),
                            bone: frame.bone as usize,
                        });
                    }
                }
                last_time.insert(key, frame.time);
            }
        }

        let animation_index = animations
            .iter()
            .enumerate()
            .map(|(index, clip)| (clip.name.clone(), index))
            .collect();

        Ok(Self {
            bones,
            animations,
            animation_index,
        })
    }

    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    pub fn animation(&self, name: &str) -> Option<(usize, &AnimationClip)> {
        self.animation_index
            .get(name)
            .map(|&index| (index, &self.animations[index]))
    }
}
