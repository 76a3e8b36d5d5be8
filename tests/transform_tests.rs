//! Transform and propagation tests
//!
//! Tests for:
//! - Root / child global transform composition
//! - Dynamic propagation on update (level by level)
//! - Immediate recomputation of static subtrees
//! - Idempotent, bit-identical propagation (serial and parallel)
//! - Global setters, velocities, directions and bounds

mod common;

use common::*;
use glam::{Quat, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use stratum::{BoundingBoxSphere, ObjectDesc, Transform, World, WorldSettings};

// ============================================================================
// Composition
// ============================================================================

#[test]
fn root_global_equals_local() {
    let mut world = test_world();
    let local = Transform::new(
        Vec3::new(1.0, 2.0, 3.0),
        Quat::from_rotation_y(0.3),
        Vec3::splat(2.0),
    );
    let root = world
        .create_object(&ObjectDesc::new().with_local(local).dynamic())
        .unwrap();
    world.update();

    assert_eq!(world.global_transform(root), Some(local));
}

#[test]
fn child_global_is_parent_global_composed_with_local() {
    let mut world = test_world();
    let parent = world
        .create_object(
            &ObjectDesc::new()
                .with_position(Vec3::new(10.0, 0.0, 0.0))
                .with_rotation(Quat::from_rotation_z(FRAC_PI_2))
                .with_scale(Vec3::splat(2.0))
                .dynamic(),
        )
        .unwrap();
    let child = world
        .create_object(&ObjectDesc::new().with_parent(parent).with_position(Vec3::X))
        .unwrap();
    world.update();

    // (1,0,0) scaled by 2, rotated 90° about Z, then offset by (10,0,0)
    let global = world.global_position(child).unwrap();
    assert!(vec3_approx(global, Vec3::new(10.0, 2.0, 0.0)));
    assert!(vec3_approx(world.global_scaling(child).unwrap(), Vec3::splat(2.0)));
    assert_globals_consistent(&world);
}

#[test]
fn moving_dynamic_root_moves_child_after_update() {
    let mut world = test_world();
    let root = world
        .create_object(&ObjectDesc::new().dynamic())
        .unwrap();
    let child = world
        .create_object(&ObjectDesc::new().with_parent(root).with_position(Vec3::X))
        .unwrap();
    world.update();
    assert!(vec3_approx(world.global_position(child).unwrap(), Vec3::new(1.0, 0.0, 0.0)));

    world.set_local_position(root, Vec3::new(5.0, 0.0, 0.0));
    // Dynamic globals only change on propagation.
    assert!(vec3_approx(world.global_position(child).unwrap(), Vec3::new(1.0, 0.0, 0.0)));

    world.update();
    assert!(vec3_approx(world.global_position(child).unwrap(), Vec3::new(6.0, 0.0, 0.0)));
}

#[test]
fn moving_static_root_updates_subtree_immediately() {
    let mut world = test_world();
    let nodes = chain(&mut world, 4, false);

    world.set_local_position(nodes[0], Vec3::new(0.0, 10.0, 0.0));

    let leaf = world.global_position(nodes[3]).unwrap();
    assert!(vec3_approx(leaf, Vec3::new(3.0, 10.0, 0.0)));
    assert_globals_consistent(&world);
}

#[test]
fn dynamic_child_of_static_parent_follows_parent() {
    let mut world = test_world();
    let parent = world
        .create_object(&ObjectDesc::new().with_position(Vec3::Y))
        .unwrap();
    let child = world
        .create_object(
            &ObjectDesc::new()
                .with_parent(parent)
                .with_position(Vec3::X)
                .dynamic(),
        )
        .unwrap();
    world.update();

    assert!(world.try_get_object(parent).unwrap().is_static());
    assert!(world.try_get_object(child).unwrap().is_dynamic());
    assert!(vec3_approx(world.global_position(child).unwrap(), Vec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn deep_dynamic_chain_propagates_in_one_update() {
    let mut world = test_world();
    let nodes = chain(&mut world, 32, true);

    world.set_local_rotation(nodes[0], Quat::from_rotation_z(FRAC_PI_2));
    world.update();

    // Every node adds (1,0,0) in its parent's frame; the root rotation turns X into Y.
    let leaf = world.global_position(nodes[31]).unwrap();
    assert!((leaf - Vec3::new(0.0, 32.0, 0.0)).length() < 1e-3);
    assert_globals_consistent(&world);
}

// ============================================================================
// Determinism
// ============================================================================

fn build_wide_world(settings: WorldSettings) -> World {
    let mut world = World::new(settings).unwrap();
    let root = world
        .create_object(&ObjectDesc::new().with_position(Vec3::new(1.0, 2.0, 3.0)).dynamic())
        .unwrap();

    // Several blocks per level so parallel propagation actually splits work.
    for i in 0..400 {
        let f = i as f32;
        let child = world
            .create_object(
                &ObjectDesc::new()
                    .with_parent(root)
                    .with_position(Vec3::new(f * 0.1, -f, 0.5))
                    .with_rotation(Quat::from_rotation_x(f * 0.01)),
            )
            .unwrap();
        world
            .create_object(
                &ObjectDesc::new()
                    .with_parent(child)
                    .with_position(Vec3::new(0.3, 0.0, f))
                    .with_scale(Vec3::splat(1.0 + f * 0.001)),
            )
            .unwrap();
    }
    world.set_local_rotation(root, Quat::from_rotation_y(FRAC_PI_4));
    world
}

#[test]
fn propagation_twice_is_bit_identical() {
    init_logging();
    let mut world = build_wide_world(test_settings());
    world.update_global_transforms();

    let first: Vec<_> = world
        .objects()
        .iter()
        .map(|(h, _)| transform_bits(&world.global_transform(h).unwrap()))
        .collect();

    world.update_global_transforms();

    let second: Vec<_> = world
        .objects()
        .iter()
        .map(|(h, _)| transform_bits(&world.global_transform(h).unwrap()))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn parallel_and_serial_propagation_agree() {
    init_logging();
    let mut parallel = build_wide_world(test_settings());
    let mut serial = build_wide_world(WorldSettings {
        parallel_propagation: false,
        ..test_settings()
    });

    assert!(parallel.stats().dynamic_hierarchy.blocks > 3);

    parallel.update();
    serial.update();

    let globals = |world: &World| -> Vec<_> {
        world
            .objects()
            .iter()
            .map(|(h, _)| transform_bits(&world.global_transform(h).unwrap()))
            .collect()
    };
    assert_eq!(globals(&parallel), globals(&serial));
    assert_globals_consistent(&parallel);
}

// ============================================================================
// Global Setters
// ============================================================================

#[test]
fn set_global_position_derives_local_from_parent() {
    let mut world = test_world();
    let parent = world
        .create_object(
            &ObjectDesc::new()
                .with_position(Vec3::new(2.0, 0.0, 0.0))
                .with_scale(Vec3::splat(2.0)),
        )
        .unwrap();
    let child = world
        .create_object(&ObjectDesc::new().with_parent(parent))
        .unwrap();

    assert!(world.set_global_position(child, Vec3::new(4.0, 2.0, 0.0)));

    assert!(vec3_approx(world.local_position(child).unwrap(), Vec3::new(1.0, 1.0, 0.0)));
    assert!(vec3_approx(world.global_position(child).unwrap(), Vec3::new(4.0, 2.0, 0.0)));
}

#[test]
fn set_global_rotation_on_dynamic_object_applies_immediately() {
    let mut world = test_world();
    let parent = world
        .create_object(&ObjectDesc::new().with_rotation(Quat::from_rotation_z(FRAC_PI_2)).dynamic())
        .unwrap();
    let child = world
        .create_object(&ObjectDesc::new().with_parent(parent))
        .unwrap();
    world.update();

    assert!(world.set_global_rotation(child, Quat::IDENTITY));
    assert!(world.global_rotation(child).unwrap().abs_diff_eq(Quat::IDENTITY, EPSILON));
    assert!(
        world
            .local_rotation(child)
            .unwrap()
            .abs_diff_eq(Quat::from_rotation_z(-FRAC_PI_2), EPSILON)
    );
}

#[test]
fn set_global_position_sees_parent_moved_this_tick() {
    let mut world = test_world();
    let parent = world.create_object(&ObjectDesc::new().dynamic()).unwrap();
    let child = world
        .create_object(&ObjectDesc::new().with_parent(parent))
        .unwrap();
    world.update();

    world.set_local_position(parent, Vec3::new(10.0, 0.0, 0.0));
    assert!(world.set_global_position(child, Vec3::new(3.0, 0.0, 0.0)));
    assert!(vec3_approx(world.local_position(child).unwrap(), Vec3::new(-7.0, 0.0, 0.0)));

    world.update();
    assert!(vec3_approx(world.global_position(child).unwrap(), Vec3::new(3.0, 0.0, 0.0)));
    assert!(vec3_approx(world.global_position(parent).unwrap(), Vec3::new(10.0, 0.0, 0.0)));
}

#[test]
fn setters_on_stale_handles_report_failure() {
    let mut world = test_world();
    let object = world.create_object(&ObjectDesc::new()).unwrap();
    world.delete_object_now(object, false);

    assert!(!world.set_local_position(object, Vec3::ONE));
    assert!(!world.set_global_position(object, Vec3::ONE));
    assert!(world.global_transform(object).is_none());
    assert!(world.linear_velocity(object).is_none());
}

// ============================================================================
// Velocity, Directions, Bounds
// ============================================================================

#[test]
fn linear_velocity_uses_last_tick() {
    let mut world = test_world();
    let object = world
        .create_object(&ObjectDesc::new().dynamic())
        .unwrap();
    world.update();

    world.set_local_position(object, Vec3::new(1.0, 0.0, 0.0));
    world.update();

    // 1 unit in a 10ms tick.
    let velocity = world.linear_velocity(object).unwrap();
    assert!((velocity - Vec3::new(100.0, 0.0, 0.0)).length() < 1e-2);

    world.update();
    assert!(vec3_approx(world.linear_velocity(object).unwrap(), Vec3::ZERO));
}

#[test]
fn angular_velocity_uses_last_tick() {
    let mut world = test_world();
    let object = world
        .create_object(&ObjectDesc::new().dynamic())
        .unwrap();
    world.update();

    world.set_local_rotation(object, Quat::from_rotation_z(0.1));
    world.update();

    let angular = world.angular_velocity(object).unwrap();
    assert!((angular - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-2);
}

#[test]
fn direction_helpers_follow_rotation() {
    let mut world = test_world();
    let object = world
        .create_object(&ObjectDesc::new().with_rotation(Quat::from_rotation_z(FRAC_PI_2)))
        .unwrap();

    assert!(vec3_approx(world.global_dir_forwards(object).unwrap(), Vec3::Y));
    assert!(vec3_approx(world.global_dir_right(object).unwrap(), -Vec3::X));
    assert!(vec3_approx(world.global_dir_up(object).unwrap(), Vec3::Z));
}

#[test]
fn global_bounds_follow_parent_scale() {
    let mut world = test_world();
    let parent = world
        .create_object(
            &ObjectDesc::new()
                .with_position(Vec3::new(5.0, 0.0, 0.0))
                .with_scale(Vec3::splat(3.0))
                .dynamic(),
        )
        .unwrap();
    let child = world
        .create_object(
            &ObjectDesc::new()
                .with_parent(parent)
                .with_bounds(BoundingBoxSphere::from_sphere(Vec3::ZERO, 1.0)),
        )
        .unwrap();
    world.update();

    let bounds = world.global_bounds(child).unwrap();
    assert!(bounds.is_valid());
    assert!(vec3_approx(bounds.center, Vec3::new(5.0, 0.0, 0.0)));
    assert!(approx_eq(bounds.radius, 3.0));

    assert!(world.set_local_bounds(parent, BoundingBoxSphere::from_box(-Vec3::ONE, Vec3::ONE)));
    assert!(vec3_approx(world.global_bounds(parent).unwrap().max(), Vec3::new(8.0, 3.0, 3.0)));
}
