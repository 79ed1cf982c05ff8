use crate::runtime::pose::Pose;
use crate::Transform;
use glam::{Quat, Vec3};

fn assert_vec3_approx(actual: Vec3, expected: Vec3) {
    let diff = (actual - expected).length();
    assert!(
        diff <= 1.0e-5,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn sample(translation: Vec3) -> Transform {
    Transform {
        translation,
        ..Transform::IDENTITY
    }
}

#[test]
fn untouched_entries_stay_clean_and_identity() {
    let pose = Pose::new(2);
    assert!(!pose.is_dirty(0));
    assert!(!pose.is_dirty(1));
    assert_eq!(pose.local_matrix(0), glam::Mat4::IDENTITY);
}

#[test]
fn full_weight_blend_replaces_the_entry() {
    let mut pose = Pose::new(1);
    let target = Transform {
        translation: Vec3::new(1.0, 2.0, 3.0),
        rotation: Quat::from_rotation_y(0.8),
        scale: Vec3::splat(2.0),
    };

    pose.blend(0, &target, 1.0);

    assert!(pose.is_dirty(0));
    let entry = pose.entry(0);
    assert_vec3_approx(entry.translation, target.translation);
    assert_vec3_approx(entry.scale, target.scale);
    assert!(entry.rotation.angle_between(target.rotation) < 1.0e-5);
}

#[test]
fn half_weight_blend_mixes_with_the_existing_entry() {
    let mut pose = Pose::new(1);
    pose.blend(0, &sample(Vec3::new(4.0, 0.0, 0.0)), 1.0);
    pose.blend(0, &sample(Vec3::new(8.0, 0.0, 0.0)), 0.5);

    assert_vec3_approx(pose.entry(0).translation, Vec3::new(6.0, 0.0, 0.0));
}

#[test]
fn rescaled_buffer_plus_additive_contributions_is_an_affine_mix() {
    let mut pose = Pose::new(1);
    pose.blend(0, &sample(Vec3::new(2.0, 0.0, 0.0)), 1.0);

    // The crossfade shape: make room, then layer both endpoints.
    pose.scale_weights(0.0);
    pose.accumulate(0, &sample(Vec3::ZERO), 0.5);
    pose.accumulate(0, &sample(Vec3::new(10.0, 0.0, 0.0)), 0.5);

    assert_vec3_approx(pose.entry(0).translation, Vec3::new(5.0, 0.0, 0.0));
    assert_vec3_approx(pose.entry(0).scale, Vec3::ONE);
}

#[test]
fn additive_rotation_accumulates_on_one_hemisphere() {
    let rotation = Quat::from_rotation_z(1.2);
    let flipped = -rotation;

    let mut pose = Pose::new(1);
    pose.scale_weights(0.0);
    pose.accumulate(
        0,
        &Transform {
            rotation,
            ..Transform::IDENTITY
        },
        0.5,
    );
    pose.accumulate(
        0,
        &Transform {
            rotation: flipped,
            ..Transform::IDENTITY
        },
        0.5,
    );

    // q and -q are the same rotation; the mix must not cancel to zero.
    let matrix = pose.local_matrix(0);
    let rotated = matrix.transform_vector3(Vec3::X);
    let expected = rotation * Vec3::X;
    assert_vec3_approx(rotated, expected);
}

#[test]
fn weighted_slerp_blend_lands_between_rotations() {
    let a = Quat::from_rotation_y(0.0);
    let b = Quat::from_rotation_y(1.0);

    let mut pose = Pose::new(1);
    pose.blend(
        0,
        &Transform {
            rotation: a,
            ..Transform::IDENTITY
        },
        1.0,
    );
    pose.blend(
        0,
        &Transform {
            rotation: b,
            ..Transform::IDENTITY
        },
        0.5,
    );

    let halfway = Quat::from_rotation_y(0.5);
    assert!(pose.entry(0).rotation.angle_between(halfway) < 1.0e-4);
}
