use crate::runtime::pose::Pose;
use crate::runtime::state_machine::{AnimationStateMachine, BlendMode};
use crate::{Error, RigData};
use glam::Mat4;
use std::sync::Arc;

/// Memory layout expected by the consumer of the bone-matrix buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum MatrixLayout {
    /// glam-native column-major matrices.
    #[default]
    ColumnMajor,
    /// Transposed on write, for row-major consumers.
    RowMajor,
}

/// One weighted state machine contributing to an entity's pose.
#[derive(Clone, Debug)]
pub struct AnimationLayer {
    name: String,
    pub weight: f32,
    pub mode: BlendMode,
    machine: AnimationStateMachine,
}

impl AnimationLayer {
    pub fn new(name: impl Into<String>, weight: f32, mode: BlendMode) -> Self {
        let name = name.into();
        let machine = AnimationStateMachine::new(name.clone());
        Self {
            name,
            weight,
            mode,
            machine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_machine(&self) -> &AnimationStateMachine {
        &self.machine
    }

    pub fn state_machine_mut(&mut self) -> &mut AnimationStateMachine {
        &mut self.machine
    }

    fn update(&mut self, dt: f32, rig: &RigData) {
        self.machine.update(dt, rig);
    }

    fn evaluate(&self, rig: &RigData, pose: &mut Pose) {
        self.machine.evaluate(rig, pose, self.weight, self.mode);
    }
}

/// Entity-facing animation component: weighted layers over a shared rig,
/// producing the skinning-matrix buffer once per tick.
#[derive(Clone, Debug)]
pub struct AnimationComponent {
    rig: Option<Arc<RigData>>,
    layers: Vec<AnimationLayer>,
    pub output_layout: MatrixLayout,
}

impl Default for AnimationComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationComponent {
    /// Starts with a single full-weight blend layer.
    pub fn new() -> Self {
        Self {
            rig: None,
            layers: vec![AnimationLayer::new("base", 1.0, BlendMode::Blend)],
            output_layout: MatrixLayout::ColumnMajor,
        }
    }

    pub fn bind_rig(&mut self, rig: Arc<RigData>) {
        self.rig = Some(rig);
    }

    pub fn rig(&self) -> Option<&Arc<RigData>> {
        self.rig.as_ref()
    }

    pub fn add_layer(&mut self, layer: AnimationLayer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    pub fn layer(&self, index: usize) -> Option<&AnimationLayer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut AnimationLayer> {
        self.layers.get_mut(index)
    }

    /// The state machine of a layer, for wiring up states.
    pub fn state_machine(&mut self, layer: usize) -> Option<&mut AnimationStateMachine> {
        self.layers
            .get_mut(layer)
            .map(AnimationLayer::state_machine_mut)
    }

    /// Requests an immediate cut on the base layer.
    pub fn play(&mut self, name: &str) -> Result<(), Error> {
        self.play_on_layer(name, 0)
    }

    pub fn play_on_layer(&mut self, name: &str, layer: usize) -> Result<(), Error> {
        let layer = self
            .layers
            .get_mut(layer)
            .ok_or(Error::InvalidLayerIndex { index: layer })?;
        layer.machine.play(name)
    }

    /// Requests a crossfade on the base layer.
    pub fn cross_fade(&mut self, name: &str, normalized_duration: f32) -> Result<(), Error> {
        self.cross_fade_on_layer(name, normalized_duration, 0)
    }

    pub fn cross_fade_on_layer(
        &mut self,
        name: &str,
        normalized_duration: f32,
        layer: usize,
    ) -> Result<(), Error> {
        let layer = self
            .layers
            .get_mut(layer)
            .ok_or(Error::InvalidLayerIndex { index: layer })?;
        layer.machine.cross_fade(name, normalized_duration)
    }

    /// Advances every layer by the tick delta, resolving queued transitions.
    /// A no-op until a rig is bound.
    pub fn update(&mut self, dt: f32) {
        let Some(rig) = self.rig.clone() else {
            return;
        };
        for layer in &mut self.layers {
            layer.update(dt, &rig);
        }
    }

    /// Fills `buffer` with model-space skinning matrices, one per bone in
    /// bone-index order.
    ///
    /// `buffer` must hold at least `num_bones` matrices; nothing is written
    /// on failure.
    pub fn fill_in_bone_matrices(&self, buffer: &mut [Mat4]) -> Result<(), Error> {
        let Some(rig) = self.rig.as_deref() else {
            return Err(Error::NoRig);
        };

        let num_bones = rig.num_bones();
        if buffer.len() < num_bones {
            return Err(Error::BufferTooSmall {
                required: num_bones,
                provided: buffer.len(),
            });
        }

        // Rest pose is the default for bones no state touched.
        for (matrix, bone) in buffer.iter_mut().zip(&rig.bones) {
            *matrix = bone.rest.to_matrix();
        }

        let mut pose = Pose::new(num_bones);
        for layer in &self.layers {
            layer.evaluate(rig, &mut pose);
        }

        for bone in 0..num_bones {
            if pose.is_dirty(bone) {
                buffer[bone] = pose.local_matrix(bone);
            }
        }

        // Bones are stored parent-before-child, so one forward pass takes
        // every local matrix into model space.
        for bone in 1..num_bones {
            if let Some(parent) = rig.bones[bone].parent {
                buffer[bone] = buffer[parent] * buffer[bone];
            }
        }

        for (matrix, bone) in buffer.iter_mut().zip(&rig.bones) {
            *matrix = *matrix * bone.inverse_bind;
            if self.output_layout == MatrixLayout::RowMajor {
                *matrix = matrix.transpose();
            }
        }

        Ok(())
    }
}
