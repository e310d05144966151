//! Transparency Integration Tests
//!
//! Two identical worlds run the same random operation sequence: one through
//! the call-site caches, one through full resolution only. Every observable
//! result, values and errors alike, must match.

use core_types::{MethodLookup, NamespaceId, RuntimeResult, TypeId, Value};
use object_model::{Heap, TypeSpec};
use opcache::{CacheConfig, CodeCaches};
use proptest::prelude::*;

const GLOBAL_NAMES: [&str; 3] = ["x", "y", "len"];
const ATTR_NAMES: [&str; 5] = ["a", "b", "m", "p", "s"];
const OBJECTS: usize = 4;
const TYPES: usize = 3;
// A call site always looks up the same name; a few sites share each name.
const SITES_PER_NAME: usize = 2;
const SITE_COUNT: usize = GLOBAL_NAMES.len() + 3 * ATTR_NAMES.len() * SITES_PER_NAME;

const LOAD_ATTR: usize = 0;
const LOAD_METHOD: usize = 1;
const STORE_ATTR: usize = 2;

fn attr_site(kind: usize, attr: usize, site: usize) -> usize {
    GLOBAL_NAMES.len() + (kind * ATTR_NAMES.len() + attr) * SITES_PER_NAME + site
}

struct World {
    heap: Heap,
    globals: NamespaceId,
    builtins: NamespaceId,
    types: Vec<TypeId>,
    objects: Vec<Value>,
}

fn build_world() -> World {
    let mut heap = Heap::new();
    let globals = heap.new_namespace();
    let builtins = heap.new_namespace();
    heap.set_name(builtins, "len", Value::Int(100));
    heap.set_name(globals, "x", Value::Int(1));

    let a = heap.new_type("A", &[], TypeSpec::default()).unwrap();
    let b = heap.new_type("B", &[a], TypeSpec::generic_dict()).unwrap();
    let c = heap.new_type("C", &[], TypeSpec::with_slots(&["s"])).unwrap();

    let m = heap.new_function("m", |_, args| Ok(args[0].clone()));
    heap.set_type_attr(a, "m", Value::Function(m));
    let getter = heap.new_function("get_p", |heap, args| heap.get_attribute(&args[0], "a"));
    let prop = heap.new_property(getter);
    heap.set_type_attr(a, "p", Value::Descriptor(prop));

    let objects = vec![
        Value::Object(heap.new_instance(a)),
        Value::Object(heap.new_instance(a)),
        Value::Object(heap.new_instance(b)),
        Value::Object(heap.new_instance(c)),
    ];
    World {
        heap,
        globals,
        builtins,
        types: vec![a, b, c],
        objects,
    }
}

#[derive(Debug, Clone)]
enum Op {
    LoadGlobal { name: usize },
    SetGlobal { name: usize, value: i64 },
    DelGlobal { name: usize },
    SetBuiltin { name: usize, value: i64 },
    LoadAttr { obj: usize, attr: usize, site: usize },
    LoadMethod { obj: usize, attr: usize, site: usize },
    StoreAttr { obj: usize, attr: usize, value: i64, site: usize },
    DelAttr { obj: usize, attr: usize },
    SetTypeAttr { ty: usize, attr: usize, value: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let name = 0..GLOBAL_NAMES.len();
    let obj = 0..OBJECTS;
    let attr = 0..ATTR_NAMES.len();
    let site = 0..SITES_PER_NAME;
    let value = -3i64..3;
    prop_oneof![
        3 => name.clone().prop_map(|name| Op::LoadGlobal { name }),
        1 => (name.clone(), value.clone()).prop_map(|(name, value)| Op::SetGlobal { name, value }),
        1 => name.clone().prop_map(|name| Op::DelGlobal { name }),
        1 => (name, value.clone()).prop_map(|(name, value)| Op::SetBuiltin { name, value }),
        4 => (obj.clone(), attr.clone(), site.clone())
            .prop_map(|(obj, attr, site)| Op::LoadAttr { obj, attr, site }),
        2 => (obj.clone(), attr.clone(), site.clone())
            .prop_map(|(obj, attr, site)| Op::LoadMethod { obj, attr, site }),
        3 => (obj.clone(), attr.clone(), value.clone(), site)
            .prop_map(|(obj, attr, value, site)| Op::StoreAttr { obj, attr, value, site }),
        1 => (obj, attr.clone()).prop_map(|(obj, attr)| Op::DelAttr { obj, attr }),
        1 => (0..TYPES, attr, value).prop_map(|(ty, attr, value)| Op::SetTypeAttr { ty, attr, value }),
    ]
}

/// Observable outcome of one operation
#[derive(Debug, PartialEq)]
enum Outcome {
    Value(RuntimeResult<Value>),
    Method(RuntimeResult<MethodLookup>),
    Unit(RuntimeResult<()>),
}

fn run_cached(world: &mut World, caches: &mut CodeCaches, op: &Op) -> Outcome {
    let World {
        heap,
        globals,
        builtins,
        types,
        objects,
    } = world;
    match *op {
        Op::LoadGlobal { name } => Outcome::Value(caches.load_global(
            name,
            &*heap,
            GLOBAL_NAMES[name],
            *globals,
            *builtins,
        )),
        Op::LoadAttr { obj, attr, site } => Outcome::Value(caches.load_attr(
            attr_site(LOAD_ATTR, attr, site),
            &*heap,
            &objects[obj],
            ATTR_NAMES[attr],
        )),
        Op::LoadMethod { obj, attr, site } => Outcome::Method(caches.load_method(
            attr_site(LOAD_METHOD, attr, site),
            &*heap,
            &objects[obj],
            ATTR_NAMES[attr],
        )),
        Op::StoreAttr {
            obj,
            attr,
            value,
            site,
        } => Outcome::Unit(caches.store_attr(
            attr_site(STORE_ATTR, attr, site),
            heap,
            &objects[obj],
            ATTR_NAMES[attr],
            Value::Int(value),
        )),
        _ => mutate(heap, *globals, *builtins, types, objects, op),
    }
}

fn run_uncached(world: &mut World, op: &Op) -> Outcome {
    let World {
        heap,
        globals,
        builtins,
        types,
        objects,
    } = world;
    match *op {
        Op::LoadGlobal { name } => Outcome::Value(
            heap.resolve_global(GLOBAL_NAMES[name], *globals, *builtins)
                .map(|lookup| lookup.value),
        ),
        Op::LoadAttr { obj, attr, .. } => {
            Outcome::Value(heap.get_attribute(&objects[obj], ATTR_NAMES[attr]))
        }
        Op::LoadMethod { obj, attr, .. } => {
            Outcome::Method(heap.load_method(&objects[obj], ATTR_NAMES[attr]))
        }
        Op::StoreAttr {
            obj, attr, value, ..
        } => Outcome::Unit(heap.set_attribute(&objects[obj], ATTR_NAMES[attr], Value::Int(value))),
        _ => mutate(heap, *globals, *builtins, types, objects, op),
    }
}

fn mutate(
    heap: &mut Heap,
    globals: NamespaceId,
    builtins: NamespaceId,
    types: &[TypeId],
    objects: &[Value],
    op: &Op,
) -> Outcome {
    match *op {
        Op::SetGlobal { name, value } => {
            heap.set_name(globals, GLOBAL_NAMES[name], Value::Int(value));
            Outcome::Unit(Ok(()))
        }
        Op::DelGlobal { name } => Outcome::Unit(heap.del_name(globals, GLOBAL_NAMES[name])),
        Op::SetBuiltin { name, value } => {
            heap.set_name(builtins, GLOBAL_NAMES[name], Value::Int(value));
            Outcome::Unit(Ok(()))
        }
        Op::DelAttr { obj, attr } => Outcome::Unit(heap.del_attribute(&objects[obj], ATTR_NAMES[attr])),
        Op::SetTypeAttr { ty, attr, value } => {
            heap.set_type_attr(types[ty], ATTR_NAMES[attr], Value::Int(value));
            Outcome::Unit(Ok(()))
        }
        Op::LoadGlobal { .. } | Op::LoadAttr { .. } | Op::LoadMethod { .. } | Op::StoreAttr { .. } => {
            unreachable!("handled by the caller")
        }
    }
}

proptest! {
    #[test]
    fn cached_and_uncached_runs_are_indistinguishable(
        ops in prop::collection::vec(op_strategy(), 1..200),
        threshold in 1u8..4,
    ) {
        let config = CacheConfig {
            failure_threshold: threshold,
            max_switches: 2,
            ..CacheConfig::eager()
        };
        let mut caches = CodeCaches::new(SITE_COUNT, config);
        let mut cached = build_world();
        let mut plain = build_world();

        for (step, op) in ops.iter().enumerate() {
            let left = run_cached(&mut cached, &mut caches, op);
            let right = run_uncached(&mut plain, op);
            prop_assert_eq!(left, right, "step {} diverged on {:?}", step, op);
        }

        for obj in 0..OBJECTS {
            for attr in ATTR_NAMES {
                let left = cached.heap.get_attribute(&cached.objects[obj], attr);
                let right = plain.heap.get_attribute(&plain.objects[obj], attr);
                prop_assert_eq!(left, right);
            }
        }
    }
}

/// The same program with caching disabled by an unreachable activation
/// threshold produces the same results and never touches the records.
#[test]
fn test_inactive_table_is_pure_fallback() {
    let mut world = build_world();
    let config = CacheConfig {
        activation_runs: u32::MAX,
        ..CacheConfig::default()
    };
    let mut caches = CodeCaches::new(SITE_COUNT, config);
    let ops = [
        Op::LoadGlobal { name: 0 },
        Op::StoreAttr {
            obj: 0,
            attr: 0,
            value: 1,
            site: 0,
        },
        Op::LoadAttr {
            obj: 0,
            attr: 3,
            site: 0,
        },
        Op::LoadMethod {
            obj: 1,
            attr: 2,
            site: 0,
        },
    ];
    for op in &ops {
        let _ = run_cached(&mut world, &mut caches, op);
    }
    assert!(!caches.is_active());
    assert_eq!(caches.stats().total_hits() + caches.stats().total_misses(), 0);
}
