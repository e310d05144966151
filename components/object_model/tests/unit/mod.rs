//! Unit tests for the object model's host interface

use core_types::{AttrKind, RuntimeError, RuntimeHost, StorageShape, Value};
use object_model::{Heap, TypeSpec};

// ============================================================================
// Version stamp tests
// ============================================================================

#[test]
fn test_namespace_version_changes_on_rebind() {
    let mut heap = Heap::new();
    let ns = heap.new_namespace();
    heap.set_name(ns, "x", Value::Int(1));
    let v1 = heap.namespace_version(ns);
    heap.set_name(ns, "x", Value::Int(2));
    assert!(heap.namespace_version(ns) > v1);
}

#[test]
fn test_del_name_missing_is_name_error() {
    let mut heap = Heap::new();
    let ns = heap.new_namespace();
    assert!(heap.del_name(ns, "x").is_err());
}

#[test]
fn test_type_version_changes_on_attr_delete() {
    let mut heap = Heap::new();
    let t = heap.new_type("T", &[], TypeSpec::default()).unwrap();
    heap.set_type_attr(t, "a", Value::Int(1));
    let v = heap.type_version(t);
    heap.del_type_attr(t, "a").unwrap();
    assert!(heap.type_version(t) > v);
    assert!(heap.del_type_attr(t, "a").is_err());
}

#[test]
fn test_keys_version_only_changes_on_extension() {
    let mut heap = Heap::new();
    let t = heap.new_type("T", &[], TypeSpec::default()).unwrap();
    let p = Value::Object(heap.new_instance(t));
    heap.set_attribute(&p, "a", Value::Int(1)).unwrap();
    let keys = heap.type_obj(t).shared_keys.unwrap();
    let v = heap.keys_version(keys);
    heap.set_attribute(&p, "a", Value::Int(2)).unwrap();
    assert_eq!(heap.keys_version(keys), v);
    heap.set_attribute(&p, "b", Value::Int(3)).unwrap();
    assert!(heap.keys_version(keys) > v);
}

// ============================================================================
// Storage introspection tests
// ============================================================================

#[test]
fn test_storage_shapes() {
    let mut heap = Heap::new();
    let split = heap.new_type("S", &[], TypeSpec::default()).unwrap();
    let generic = heap.new_type("G", &[], TypeSpec::generic_dict()).unwrap();
    let slotted = heap.new_type("L", &[], TypeSpec::with_slots(&["a"])).unwrap();

    let s = heap.new_instance(split);
    let g = heap.new_instance(generic);
    let l = heap.new_instance(slotted);

    assert!(matches!(heap.instance_storage(s), StorageShape::Split { .. }));
    assert!(matches!(heap.instance_storage(g), StorageShape::Generic { .. }));
    assert_eq!(heap.instance_storage(l), StorageShape::NoDict);
}

#[test]
fn test_split_value_and_replace() {
    let mut heap = Heap::new();
    let t = heap.new_type("T", &[], TypeSpec::default()).unwrap();
    let id = heap.new_instance(t);
    let p = Value::Object(id);
    heap.set_attribute(&p, "a", Value::Int(1)).unwrap();

    assert_eq!(heap.split_value(id, 0), Some(Value::Int(1)));
    assert!(heap.split_replace(id, 0, Value::Int(9)));
    assert!(!heap.split_replace(id, 1, Value::Int(9)));
    assert_eq!(heap.get_attribute(&p, "a"), Ok(Value::Int(9)));
}

#[test]
fn test_dict_find_and_entry() {
    let mut heap = Heap::new();
    let t = heap.new_type("G", &[], TypeSpec::generic_dict()).unwrap();
    let id = heap.new_instance(t);
    let g = Value::Object(id);
    heap.set_attribute(&g, "a", Value::Int(1)).unwrap();

    let idx = heap.dict_find(id, "a").unwrap();
    assert_eq!(heap.dict_entry(id, idx, "a"), Some(Value::Int(1)));
    assert_eq!(heap.dict_entry(id, idx, "b"), None);
}

#[test]
fn test_classify_attr() {
    let mut heap = Heap::new();
    let t = heap
        .new_type("T", &[], TypeSpec::with_slots(&["s"]))
        .unwrap();
    let f = heap.new_function("f", |_, _| Ok(Value::None));
    let prop = heap.new_property(f);

    assert_eq!(heap.classify_attr(&Value::Int(1)), AttrKind::Plain);
    assert_eq!(heap.classify_attr(&Value::Function(f)), AttrKind::Method(f));
    assert!(matches!(
        heap.classify_attr(&Value::Descriptor(prop)),
        AttrKind::DataDescriptor { .. }
    ));
    let slot = heap.lookup_type_attr(t, "s").unwrap();
    assert!(matches!(
        heap.classify_attr(&slot),
        AttrKind::Slot { index: 0, .. }
    ));
}

#[test]
fn test_inherited_slots_are_numbered_after_base() {
    let mut heap = Heap::new();
    let base = heap
        .new_type("Base", &[], TypeSpec::with_slots(&["a"]))
        .unwrap();
    let sub = heap
        .new_type("Sub", &[base], TypeSpec::with_slots(&["b"]))
        .unwrap();
    let b = heap.lookup_type_attr(sub, "b").unwrap();
    assert!(matches!(heap.classify_attr(&b), AttrKind::Slot { index: 1, .. }));
    assert_eq!(heap.type_obj(sub).slot_count, 2);
}

#[test]
fn test_slots_of_a_later_base_are_laid_out() {
    let mut heap = Heap::new();
    let plain = heap.new_type("Plain", &[], TypeSpec::default()).unwrap();
    let slotted = heap
        .new_type("Slotted", &[], TypeSpec::with_slots(&["y"]))
        .unwrap();
    let c = heap
        .new_type("C", &[plain, slotted], TypeSpec::default())
        .unwrap();
    assert_eq!(heap.type_obj(c).slot_count, 1);

    let o = Value::Object(heap.new_instance(c));
    heap.set_attribute(&o, "y", Value::Int(1)).unwrap();
    heap.set_attribute(&o, "z", Value::Int(2)).unwrap();
    assert_eq!(heap.get_attribute(&o, "y"), Ok(Value::Int(1)));
    assert_eq!(heap.get_attribute(&o, "z"), Ok(Value::Int(2)));
    heap.del_attribute(&o, "y").unwrap();
    assert!(heap.get_attribute(&o, "y").is_err());
}

#[test]
fn test_conflicting_slot_layouts_are_rejected() {
    let mut heap = Heap::new();
    let a = heap.new_type("A", &[], TypeSpec::with_slots(&["x"])).unwrap();
    let b = heap.new_type("B", &[], TypeSpec::with_slots(&["y"])).unwrap();
    assert_eq!(
        heap.new_type("C", &[a, b], TypeSpec::default()),
        Err(RuntimeError::type_error(
            "multiple bases have instance lay-out conflict"
        ))
    );
}

#[test]
fn test_bases_sharing_one_slot_layout_are_accepted() {
    let mut heap = Heap::new();
    let a = heap.new_type("A", &[], TypeSpec::with_slots(&["x"])).unwrap();
    let b = heap.new_type("B", &[a], TypeSpec::with_slots(&[])).unwrap();
    let d = heap.new_type("D", &[a], TypeSpec::with_slots(&["y"])).unwrap();
    let c = heap.new_type("C", &[b, d], TypeSpec::with_slots(&[])).unwrap();
    assert_eq!(heap.type_obj(c).slot_count, 2);

    let o = Value::Object(heap.new_instance(c));
    heap.set_attribute(&o, "x", Value::Int(1)).unwrap();
    heap.set_attribute(&o, "y", Value::Int(2)).unwrap();
    assert_eq!(heap.get_attribute(&o, "x"), Ok(Value::Int(1)));
    assert_eq!(heap.get_attribute(&o, "y"), Ok(Value::Int(2)));
}

#[test]
fn test_type_of_non_object_is_none() {
    let heap = Heap::new();
    assert_eq!(heap.type_of(&Value::Int(3)), None);
}
