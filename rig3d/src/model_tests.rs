use crate::{
    AnimationClip, BoneData, Channel, ClipBuilder, Error, KeyFrame, KeyValue, RigData, Transform,
};
use glam::{Mat4, Quat, Vec3};

fn bone(parent: Option<usize>) -> BoneData {
    BoneData {
        parent,
        rest: Transform::IDENTITY,
        inverse_bind: Mat4::IDENTITY,
    }
}

#[test]
fn clip_builder_orders_frames_by_needed_time() {
    let clip = ClipBuilder::new("walk", 30.0, 30.0)
        .translation(
            0,
            &[
                (0.0, Vec3::ZERO),
                (10.0, Vec3::X),
                (20.0, Vec3::Y),
                (30.0, Vec3::Z),
            ],
        )
        .rotation(
            0,
            &[
                (0.0, Quat::IDENTITY),
                (10.0, Quat::from_rotation_y(0.5)),
                (20.0, Quat::from_rotation_y(1.0)),
                (30.0, Quat::from_rotation_y(1.5)),
            ],
        )
        .build();

    // A sample two keys ahead of playback is already needed, so the fourth
    // key of each channel (needed at its channel's second key time) sorts
    // after the first three of both.
    let channels: Vec<Channel> = clip.frames.iter().map(|f| f.value.channel()).collect();
    assert_eq!(
        channels,
        vec![
            Channel::Translation,
            Channel::Translation,
            Channel::Translation,
            Channel::Rotation,
            Channel::Rotation,
            Channel::Rotation,
            Channel::Translation,
            Channel::Rotation,
        ]
    );

    let times: Vec<f32> = clip.frames.iter().map(|f| f.time).collect();
    assert_eq!(times, vec![0.0, 10.0, 20.0, 0.0, 10.0, 20.0, 30.0, 30.0]);
}

#[test]
fn clip_builder_keeps_channel_times_non_decreasing() {
    let clip = ClipBuilder::new("walk", 50.0, 25.0)
        .translation(
            0,
            &[(0.0, Vec3::ZERO), (25.0, Vec3::X), (50.0, Vec3::Y)],
        )
        .build();

    let rig = RigData::new(vec![bone(None)], vec![clip]);
    assert!(rig.is_ok());
}

#[test]
fn rig_rejects_bones_stored_before_their_parent() {
    let bones = vec![bone(None), bone(Some(1))];
    let result = RigData::new(bones, Vec::new());
    assert!(matches!(
        result,
        Err(Error::InvalidHierarchy { bone: 1, parent: 1 })
    ));
}

#[test]
fn rig_rejects_clip_bones_outside_the_skeleton() {
    let clip = ClipBuilder::new("walk", 10.0, 30.0)
        .translation(5, &[(0.0, Vec3::ZERO)])
        .build();

    let result = RigData::new(vec![bone(None)], vec![clip]);
    assert!(matches!(
        result,
        Err(Error::InvalidBoneIndex { bone: 5, .. })
    ));
}

#[test]
fn rig_rejects_decreasing_key_times_within_a_channel() {
    let clip = AnimationClip {
        name: "broken".to_string(),
        duration: 10.0,
        ticks_per_second: 30.0,
        frames: vec![
            KeyFrame {
                time: 5.0,
                bone: 0,
                value: KeyValue::Translation(Vec3::ZERO),
            },
            KeyFrame {
                time: 2.0,
                bone: 0,
                value: KeyValue::Translation(Vec3::X),
            },
        ],
    };

    let result = RigData::new(vec![bone(None)], vec![clip]);
    assert!(matches!(result, Err(Error::UnsortedFrames { bone: 0, .. })));
}

#[test]
fn animations_are_addressable_by_name() {
    let walk = ClipBuilder::new("walk", 10.0, 30.0).build();
    let run = ClipBuilder::new("run", 20.0, 30.0).build();
    let rig = RigData::new(vec![bone(None)], vec![walk, run]).unwrap();

    let (index, clip) = rig.animation("run").unwrap();
    assert_eq!(index, 1);
    assert_eq!(clip.name, "run");
    assert!(rig.animation("swim").is_none());
}

#[test]
fn clip_duration_in_seconds() {
    let clip = ClipBuilder::new("walk", 60.0, 30.0).build();
    assert_eq!(clip.duration_in_seconds(), 2.0);

    let degenerate = ClipBuilder::new("broken", 60.0, 0.0).build();
    assert_eq!(degenerate.duration_in_seconds(), 0.0);
}
