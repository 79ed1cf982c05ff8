use crate::runtime::frame_cache::StateCache;
use crate::runtime::pose::Pose;
use crate::{AnimationClip, Channel, Error, KeyValue, RigData, Transform, catmull_rom};
use crate::interp::local_t;
use glam::{Quat, Vec3};
use std::collections::{HashMap, VecDeque};

/// Name of the placeholder state every machine starts in.
pub const ENTRY_STATE: &str = "entry";

/// How a state's evaluated sample combines into the pose buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlendMode {
    /// `result = result * (1 - weight) + sample * weight`.
    Blend,
    /// `result += sample * weight`; crossfades layer their two endpoint
    /// states this way.
    Additive,
}

/// A queued `play`/`cross_fade` request, resolved on the next update.
#[derive(Clone, Debug)]
struct TransitionRequest {
    target: String,
    normalized_duration: f32,
}

/// A leaf state: one named animation clip with playback settings, plus the
/// keyframe cache that exists while the state is entered.
#[derive(Clone, Debug)]
pub struct AnimationState {
    name: String,
    /// Clip name, resolved against the rig on every update. A name the rig
    /// does not know plays nothing.
    pub animation: String,
    pub speed: f32,
    pub looping: bool,
    cache: Option<StateCache>,
}

impl AnimationState {
    fn new(name: String) -> Self {
        Self {
            name,
            animation: String::new(),
            speed: 1.0,
            looping: true,
            cache: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The playback cache, present while the state is entered.
    pub fn cache(&self) -> Option<&StateCache> {
        self.cache.as_ref()
    }

    fn enter(&mut self, rig: &RigData) {
        self.cache = Some(StateCache::new(rig.num_bones()));
    }

    fn exit(&mut self) {
        self.cache = None;
    }

    fn update(&mut self, dt: f32, rig: &RigData) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        let Some((_, clip)) = rig.animation(&self.animation) else {
            log::warn!(
                "state '{}' references unknown animation '{}'",
                self.name,
                self.animation
            );
            return;
        };

        cache.ticks += dt * self.speed * clip.ticks_per_second;

        if cache.ticks > clip.duration {
            if self.looping {
                // Keep the remainder past the wrap; the windows restart
                // empty and re-bracket it on the advance below.
                cache.ticks = if clip.duration > 0.0 {
                    cache.ticks.rem_euclid(clip.duration)
                } else {
                    0.0
                };
                cache.reset();
            } else {
                cache.ticks = clip.duration;
            }
        }

        cache.advance(clip);
    }

    fn evaluate(&self, rig: &RigData, pose: &mut Pose, weight: f32, mode: BlendMode) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let Some((_, clip)) = rig.animation(&self.animation) else {
            return;
        };

        for (bone, data) in rig.bones.iter().enumerate() {
            let frame_cache = cache.frame_cache(bone);
            let sample = Transform {
                translation: sample_vector(
                    clip,
                    frame_cache.window(Channel::Translation),
                    cache.ticks,
                    data.rest.translation,
                ),
                rotation: sample_rotation(
                    clip,
                    frame_cache.window(Channel::Rotation),
                    cache.ticks,
                    data.rest.rotation,
                ),
                scale: sample_vector(
                    clip,
                    frame_cache.window(Channel::Scale),
                    cache.ticks,
                    data.rest.scale,
                ),
            };

            match mode {
                BlendMode::Blend => pose.blend(bone, &sample, weight),
                BlendMode::Additive => pose.accumulate(bone, &sample, weight),
            }
        }
    }

    /// Clip length in seconds, or zero when the clip name resolves to
    /// nothing.
    pub fn duration_in_seconds(&self, rig: &RigData) -> f32 {
        match rig.animation(&self.animation) {
            Some((_, clip)) => clip.duration_in_seconds(),
            None => 0.0,
        }
    }
}

fn vec3_at(clip: &AnimationClip, index: usize) -> Vec3 {
    // Windows never mix channels, so a vector window only holds vector keys.
    match clip.frames[index].value {
        KeyValue::Translation(value) | KeyValue::Scale(value) => value,
        KeyValue::Rotation(_) => Vec3::ZERO,
    }
}

fn quat_at(clip: &AnimationClip, index: usize) -> Quat {
    match clip.frames[index].value {
        KeyValue::Rotation(packed) => packed.to_quat(),
        KeyValue::Translation(_) | KeyValue::Scale(_) => Quat::IDENTITY,
    }
}

/// Samples a translation/scale window: Catmull-Rom once four keys are
/// cached, linear between two, snap to one, rest pose with none.
fn sample_vector(
    clip: &AnimationClip,
    window: &[Option<usize>; 4],
    ticks: f32,
    rest: Vec3,
) -> Vec3 {
    match *window {
        [i0, Some(i1), Some(i2), Some(i3)] => {
            if clip.frames[i2].time <= ticks {
                // Playback reached the look-ahead key: interpolate the last
                // segment, reusing the newest key as the trailing tangent.
                let t = local_t(ticks, clip.frames[i2].time, clip.frames[i3].time);
                catmull_rom(
                    vec3_at(clip, i1),
                    vec3_at(clip, i2),
                    vec3_at(clip, i3),
                    vec3_at(clip, i3),
                    t,
                )
            } else {
                let i0 = i0.unwrap_or(i1);
                let t = local_t(ticks, clip.frames[i1].time, clip.frames[i2].time);
                catmull_rom(
                    vec3_at(clip, i0),
                    vec3_at(clip, i1),
                    vec3_at(clip, i2),
                    vec3_at(clip, i3),
                    t,
                )
            }
        }
        [_, _, Some(i2), Some(i3)] => {
            let t = local_t(ticks, clip.frames[i2].time, clip.frames[i3].time);
            vec3_at(clip, i2).lerp(vec3_at(clip, i3), t)
        }
        [_, _, _, Some(i3)] => vec3_at(clip, i3),
        _ => rest,
    }
}

/// Samples a rotation window. Four keys are tracked, but rotation
/// deliberately interpolates between the two nearest keys only; no
/// quadrangle fitting across the outer pair.
fn sample_rotation(
    clip: &AnimationClip,
    window: &[Option<usize>; 4],
    ticks: f32,
    rest: Quat,
) -> Quat {
    match *window {
        [_, Some(i1), Some(i2), Some(i3)] => {
            if clip.frames[i2].time <= ticks {
                let t = local_t(ticks, clip.frames[i2].time, clip.frames[i3].time);
                quat_at(clip, i2).slerp(quat_at(clip, i3), t)
            } else {
                let t = local_t(ticks, clip.frames[i1].time, clip.frames[i2].time);
                quat_at(clip, i1).slerp(quat_at(clip, i2), t)
            }
        }
        [_, _, Some(i2), Some(i3)] => {
            let t = local_t(ticks, clip.frames[i2].time, clip.frames[i3].time);
            quat_at(clip, i2).slerp(quat_at(clip, i3), t)
        }
        [_, _, _, Some(i3)] => quat_at(clip, i3),
        _ => rest,
    }
}

/// Closed set of state-machine nodes, dispatched by `match`.
///
/// A machine can itself stand in as a state, so layered graphs nest without
/// trait objects in the per-bone evaluation path.
#[derive(Clone, Debug)]
pub enum StateNode {
    /// Zero-duration placeholder every machine starts in.
    Entry,
    Clip(AnimationState),
    Machine(Box<AnimationStateMachine>),
}

impl StateNode {
    fn name(&self) -> &str {
        match self {
            Self::Entry => ENTRY_STATE,
            Self::Clip(state) => state.name(),
            Self::Machine(machine) => machine.name(),
        }
    }

    fn enter(&mut self, rig: &RigData) {
        match self {
            Self::Entry => {}
            Self::Clip(state) => state.enter(rig),
            Self::Machine(machine) => machine.enter(rig),
        }
    }

    fn exit(&mut self) {
        match self {
            Self::Entry => {}
            Self::Clip(state) => state.exit(),
            Self::Machine(machine) => machine.exit(),
        }
    }

    fn update(&mut self, dt: f32, rig: &RigData) {
        match self {
            Self::Entry => {}
            Self::Clip(state) => state.update(dt, rig),
            Self::Machine(machine) => machine.update(dt, rig),
        }
    }

    fn evaluate(&self, rig: &RigData, pose: &mut Pose, weight: f32, mode: BlendMode) {
        match self {
            Self::Entry => {}
            Self::Clip(state) => state.evaluate(rig, pose, weight, mode),
            Self::Machine(machine) => machine.evaluate(rig, pose, weight, mode),
        }
    }

    fn duration_in_seconds(&self, rig: &RigData) -> f32 {
        match self {
            Self::Entry => 0.0,
            Self::Clip(state) => state.duration_in_seconds(rig),
            Self::Machine(machine) => machine.duration_in_seconds(rig),
        }
    }
}

/// Named states, a pending-transition queue, and crossfade timing for one
/// layer of an entity's animation.
#[derive(Clone, Debug)]
pub struct AnimationStateMachine {
    name: String,
    states: Vec<StateNode>,
    state_index: HashMap<String, usize>,
    current: usize,
    previous: Option<usize>,
    /// Seconds since the current state was entered.
    elapsed_time: f32,
    /// Length of the active crossfade; zero when no transition is running.
    transition_duration: f32,
    transitions: VecDeque<TransitionRequest>,
    first_update: bool,
}

impl AnimationStateMachine {
    pub fn new(name: impl Into<String>) -> Self {
        let mut state_index = HashMap::new();
        state_index.insert(ENTRY_STATE.to_string(), 0);
        Self {
            name: name.into(),
            states: vec![StateNode::Entry],
            state_index,
            current: 0,
            previous: None,
            elapsed_time: 0.0,
            transition_duration: 0.0,
            transitions: VecDeque::new(),
            first_update: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the state the machine is currently in.
    pub fn current_state(&self) -> &str {
        self.states[self.current].name()
    }

    /// Seconds since the current state was entered.
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition_duration > 0.0
    }

    /// Adds a leaf state and returns it for configuration.
    pub fn add_state(&mut self, name: impl Into<String>) -> &mut AnimationState {
        let name = name.into();
        self.state_index.insert(name.clone(), self.states.len());
        self.states.push(StateNode::Clip(AnimationState::new(name)));
        match self.states.last_mut() {
            Some(StateNode::Clip(state)) => state,
            _ => unreachable!(),
        }
    }

    /// Adds a nested machine, addressable as a state under its own name.
    pub fn add_machine(&mut self, machine: AnimationStateMachine) {
        self.state_index.insert(machine.name.clone(), self.states.len());
        self.states.push(StateNode::Machine(Box::new(machine)));
    }

    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        let index = *self.state_index.get(name)?;
        match &self.states[index] {
            StateNode::Clip(state) => Some(state),
            _ => None,
        }
    }

    pub fn state_mut(&mut self, name: &str) -> Option<&mut AnimationState> {
        let index = *self.state_index.get(name)?;
        match &mut self.states[index] {
            StateNode::Clip(state) => Some(state),
            _ => None,
        }
    }

    /// Picks the state the machine starts in; it is entered on the first
    /// update. Only meaningful before that update runs.
    pub fn set_start_state(&mut self, name: &str) -> Result<(), Error> {
        match self.state_index.get(name) {
            Some(&index) => {
                self.current = index;
                Ok(())
            }
            None => Err(Error::UnknownState {
                name: name.to_string(),
            }),
        }
    }

    /// Requests an immediate cut to `name` on the next update.
    pub fn play(&mut self, name: &str) -> Result<(), Error> {
        self.request(name, 0.0)
    }

    /// Requests a crossfade to `name`, timed as `normalized_duration` of the
    /// target state's clip length.
    pub fn cross_fade(&mut self, name: &str, normalized_duration: f32) -> Result<(), Error> {
        self.request(name, normalized_duration)
    }

    fn request(&mut self, name: &str, normalized_duration: f32) -> Result<(), Error> {
        if !self.state_index.contains_key(name) {
            return Err(Error::UnknownState {
                name: name.to_string(),
            });
        }
        self.transitions.push_back(TransitionRequest {
            target: name.to_string(),
            normalized_duration,
        });
        Ok(())
    }

    fn enter(&mut self, rig: &RigData) {
        self.states[self.current].enter(rig);
    }

    fn exit(&mut self) {
        if let Some(previous) = self.previous {
            self.states[previous].exit();
        }
        self.states[self.current].exit();
    }

    /// Resolves at most one queued transition, then advances playback.
    pub fn update(&mut self, dt: f32, rig: &RigData) {
        if self.first_update {
            self.first_update = false;
            self.states[self.current].enter(rig);
        }

        // First valid request wins; self-transitions are skipped. The queue
        // never survives a tick.
        while let Some(request) = self.transitions.pop_front() {
            if request.target == self.states[self.current].name() {
                continue;
            }

            let Some(&target) = self.state_index.get(&request.target) else {
                log::warn!(
                    "machine '{}': transition to unknown state '{}' ignored",
                    self.name,
                    request.target
                );
                continue;
            };

            if let Some(previous) = self.previous {
                self.states[previous].exit();
            }
            self.previous = Some(self.current);

            self.current = target;
            self.states[self.current].enter(rig);

            self.elapsed_time = 0.0;
            self.transition_duration =
                request.normalized_duration * self.states[self.current].duration_in_seconds(rig);
            break;
        }
        self.transitions.clear();

        self.elapsed_time += dt;

        if self.transition_duration > 0.0 {
            if self.elapsed_time > self.transition_duration {
                self.transition_duration = 0.0;
            } else if let Some(previous) = self.previous {
                // Keep the fading state's pose current through the blend.
                self.states[previous].update(dt, rig);
            }
        }

        self.states[self.current].update(dt, rig);
    }

    /// Produces this machine's pose contribution.
    ///
    /// Outside a transition this is the current state at full `weight`.
    /// During one, the existing buffer is rescaled to make room and the two
    /// endpoint states are layered additively at `(1 - alpha)` and `alpha`
    /// of `weight`, which realizes a linear crossfade without a pop.
    pub fn evaluate(&self, rig: &RigData, pose: &mut Pose, weight: f32, mode: BlendMode) {
        if self.transition_duration > 0.0 {
            let alpha = self.elapsed_time / self.transition_duration;

            if mode == BlendMode::Blend {
                pose.scale_weights(1.0 - weight);
            }

            if let Some(previous) = self.previous {
                self.states[previous].evaluate(
                    rig,
                    pose,
                    (1.0 - alpha) * weight,
                    BlendMode::Additive,
                );
            }
            self.states[self.current].evaluate(rig, pose, alpha * weight, BlendMode::Additive);
        } else {
            self.states[self.current].evaluate(rig, pose, weight, mode);
        }
    }

    /// Seconds of the current state's clip; zero for the entry placeholder.
    pub fn duration_in_seconds(&self, rig: &RigData) -> f32 {
        self.states[self.current].duration_in_seconds(rig)
    }
}
