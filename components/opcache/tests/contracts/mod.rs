//! Contract tests for the probe/fill interface used by a dispatch loop

use core_types::{RuntimeHost, Value};
use object_model::{Heap, TypeSpec};
use opcache::{
    fill_attr, fill_global, fill_method, fill_store, try_cached_attr, try_cached_global,
    try_cached_method, try_cached_store, AdaptivePolicy, CacheEntry, CallSiteCache, FillOutcome,
    SiteState, StrategyTag,
};

#[test]
fn contract_cold_site_always_misses() {
    let mut heap = Heap::new();
    let globals = heap.new_namespace();
    let builtins = heap.new_namespace();
    heap.set_name(globals, "x", Value::Int(1));
    let t = heap.new_type("T", &[], TypeSpec::default()).unwrap();
    let o = Value::Object(heap.new_instance(t));
    heap.set_attribute(&o, "a", Value::Int(1)).unwrap();

    let mut site = CallSiteCache::new();
    assert!(try_cached_global(&mut site, &heap, "x", globals, builtins).is_none());
    assert!(try_cached_attr(&mut site, &heap, &o, "a").is_none());
    assert!(try_cached_method(&mut site, &heap, &o, "a").is_none());
    assert!(!try_cached_store(&mut site, &mut heap, &o, &Value::Int(2)));
    assert_eq!(site, CallSiteCache::new());
    assert_eq!(heap.get_attribute(&o, "a"), Ok(Value::Int(1)));
}

#[test]
fn contract_fill_then_probe_hits() {
    let mut heap = Heap::new();
    let globals = heap.new_namespace();
    let builtins = heap.new_namespace();
    heap.set_name(builtins, "print", Value::Int(0));
    let policy = AdaptivePolicy::default();

    let mut site = CallSiteCache::new();
    let lookup = heap.resolve_global("print", globals, builtins).unwrap();
    let outcome = fill_global(&mut site, &heap, globals, builtins, &lookup, &policy);
    assert_eq!(outcome, FillOutcome::Filled(StrategyTag::GlobalValue));
    assert_eq!(
        try_cached_global(&mut site, &heap, "print", globals, builtins),
        Some(Value::Int(0))
    );
}

#[test]
fn contract_miss_leaves_record_untouched() {
    let mut heap = Heap::new();
    let t = heap.new_type("T", &[], TypeSpec::default()).unwrap();
    let o = Value::Object(heap.new_instance(t));
    heap.set_attribute(&o, "a", Value::Int(1)).unwrap();
    let policy = AdaptivePolicy::default();

    let mut site = CallSiteCache::new();
    fill_attr(&mut site, &heap, &o, "a", &policy);
    heap.set_type_attr(t, "unrelated", Value::None);

    let before = site.clone();
    assert!(try_cached_attr(&mut site, &heap, &o, "a").is_none());
    assert_eq!(site, before);
}

#[test]
fn contract_entries_of_another_kind_never_hit() {
    let mut heap = Heap::new();
    let globals = heap.new_namespace();
    let builtins = heap.new_namespace();
    heap.set_name(globals, "a", Value::Int(1));
    let t = heap.new_type("T", &[], TypeSpec::default()).unwrap();
    let o = Value::Object(heap.new_instance(t));
    heap.set_attribute(&o, "a", Value::Int(1)).unwrap();
    let policy = AdaptivePolicy::default();

    let mut site = CallSiteCache::new();
    let lookup = heap.resolve_global("a", globals, builtins).unwrap();
    fill_global(&mut site, &heap, globals, builtins, &lookup, &policy);
    assert!(try_cached_attr(&mut site, &heap, &o, "a").is_none());
    assert!(!try_cached_store(&mut site, &mut heap, &o, &Value::Int(2)));

    fill_store(&mut site, &heap, &o, "a", &policy);
    assert!(matches!(site.entry(), CacheEntry::Store(_)));
    assert!(try_cached_global(&mut site, &heap, "a", globals, builtins).is_none());
    assert!(try_cached_store(&mut site, &mut heap, &o, &Value::Int(2)));
    assert_eq!(heap.get_attribute(&o, "a"), Ok(Value::Int(2)));
}

#[test]
fn contract_method_fill_reports_unbound_on_hit() {
    let mut heap = Heap::new();
    let t = heap.new_type("T", &[], TypeSpec::default()).unwrap();
    let f = heap.new_function("m", |_, _| Ok(Value::None));
    heap.set_type_attr(t, "m", Value::Function(f));
    let o = Value::Object(heap.new_instance(t));
    let policy = AdaptivePolicy::default();

    let mut site = CallSiteCache::new();
    let full = heap.resolve_method(&o, "m").unwrap();
    assert!(full.unbound);
    fill_method(&mut site, &heap, &o, "m", &policy);
    let cached = try_cached_method(&mut site, &heap, &o, "m").unwrap().unwrap();
    assert_eq!(cached, full);
}

#[test]
fn contract_disabled_site_refuses_fills() {
    let mut heap = Heap::new();
    let a = heap.new_type("A", &[], TypeSpec::default()).unwrap();
    let b = heap.new_type("B", &[], TypeSpec::default()).unwrap();
    let x = Value::Object(heap.new_instance(a));
    let y = Value::Object(heap.new_instance(b));
    heap.set_attribute(&x, "v", Value::Int(0)).unwrap();
    heap.set_attribute(&y, "v", Value::Int(0)).unwrap();
    let policy = AdaptivePolicy {
        failure_threshold: 1,
        max_switches: 0,
        global_index_mode: true,
    };

    let mut site = CallSiteCache::new();
    assert_eq!(
        fill_store(&mut site, &heap, &x, "v", &policy),
        FillOutcome::Filled(StrategyTag::SplitStore)
    );
    assert_eq!(fill_store(&mut site, &heap, &y, "v", &policy), FillOutcome::Disabled);
    assert_eq!(site.state(), SiteState::Disabled);
    assert_eq!(fill_store(&mut site, &heap, &x, "v", &policy), FillOutcome::Disabled);
    assert!(!try_cached_store(&mut site, &mut heap, &x, &Value::Int(1)));
}
