//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use glam::Vec3;
use stratum::{ClockSettings, ObjectHandle, Transform, World, WorldSettings};

pub const EPSILON: f32 = 1e-5;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

/// Settings with a fixed 10ms clock step and parallel propagation enabled
/// for every level, so tests exercise the task system path.
pub fn test_settings() -> WorldSettings {
    WorldSettings {
        name: "TestWorld".into(),
        min_blocks_for_parallel_level: 1,
        clock: ClockSettings {
            fixed_time_step: Some(Duration::from_millis(10)),
            ..ClockSettings::default()
        },
        ..WorldSettings::default()
    }
}

pub fn test_world() -> World {
    init_logging();
    World::new(test_settings()).expect("world")
}

/// Bit patterns of a transform, for exact comparisons.
pub fn transform_bits(t: &Transform) -> [u32; 10] {
    let p = t.position.to_array();
    let r = t.rotation.to_array();
    let s = t.scale.to_array();
    [
        p[0].to_bits(),
        p[1].to_bits(),
        p[2].to_bits(),
        r[0].to_bits(),
        r[1].to_bits(),
        r[2].to_bits(),
        r[3].to_bits(),
        s[0].to_bits(),
        s[1].to_bits(),
        s[2].to_bits(),
    ]
}

/// Checks every cross-reference between objects and transform records.
pub fn assert_hierarchy_consistent(world: &World) {
    let mut records = 0;
    for (handle, object) in world.objects().iter() {
        let data = world
            .transformation_data(handle)
            .unwrap_or_else(|| panic!("{handle:?} has no transform record"));
        assert_eq!(data.object, handle, "record back-reference of {handle:?}");
        records += 1;

        match object.parent() {
            None => {
                assert_eq!(object.hierarchy_level(), 0);
                assert_eq!(data.parent, None);
            }
            Some(parent) => {
                let parent_object = world.try_get_object(parent).expect("parent resolves");
                assert!(parent_object.children().contains(&handle));
                assert_eq!(object.hierarchy_level(), parent_object.hierarchy_level() + 1);
                assert_eq!(data.parent, Some(parent_object.data_ref()), "parent ref of {handle:?}");
                assert!(
                    !(parent_object.is_dynamic() && object.is_static()),
                    "static {handle:?} under dynamic parent"
                );
            }
        }

        for &child in object.children() {
            let child_object = world.try_get_object(child).expect("child resolves");
            assert_eq!(child_object.parent(), Some(handle));
        }
    }

    let stats = world.stats();
    assert_eq!(
        records,
        stats.static_hierarchy.records + stats.dynamic_hierarchy.records,
        "every record belongs to exactly one object"
    );
}

/// Checks `global == parent.global ∘ local` (or `global == local` for roots)
/// for every object.
pub fn assert_globals_consistent(world: &World) {
    for (handle, object) in world.objects().iter() {
        let data = world.transformation_data(handle).expect("record");
        let expected = match object.parent() {
            Some(parent) => world
                .global_transform(parent)
                .expect("parent global")
                .compose(&data.local),
            None => data.local,
        };
        assert!(
            vec3_approx(data.global.position, expected.position),
            "{handle:?}: {:?} != {:?}",
            data.global.position,
            expected.position
        );
        assert!(data.global.rotation.abs_diff_eq(expected.rotation, EPSILON));
        assert!(vec3_approx(data.global.scale, expected.scale));
    }
}

pub fn chain(world: &mut World, depth: usize, dynamic: bool) -> Vec<ObjectHandle> {
    let mut handles = Vec::with_capacity(depth);
    let mut parent = None;
    for i in 0..depth {
        let mut desc = stratum::ObjectDesc::new()
            .with_name(format!("node{i}"))
            .with_position(Vec3::X);
        if dynamic {
            desc = desc.dynamic();
        }
        if let Some(p) = parent {
            desc = desc.with_parent(p);
        }
        let handle = world.create_object(&desc).expect("create");
        handles.push(handle);
        parent = Some(handle);
    }
    handles
}
