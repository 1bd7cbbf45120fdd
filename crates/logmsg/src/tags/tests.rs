use super::{global_registry, TagRegistry, TagSet};

#[test]
fn intern_is_stable_and_deduplicates() {
    let registry = TagRegistry::new();
    let a = registry.intern("webserver");
    let b = registry.intern("webserver");
    let c = registry.intern("database");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(registry.name_of(a).as_deref(), Some("webserver"));
}

#[test]
fn lookup_does_not_register() {
    let registry = TagRegistry::new();
    assert!(registry.lookup("unknown").is_none());
    registry.intern("unknown");
    assert!(registry.lookup("unknown").is_some());
}

#[test]
fn tag_set_inline_roundtrip() {
    let registry = TagRegistry::new();
    let mut set = TagSet::new();
    let id = registry.intern("mark");
    assert!(!set.is_set(id));
    set.set(id);
    assert!(set.is_set(id));
    set.clear(id);
    assert!(!set.is_set(id));
}

#[test]
fn tag_set_spills_into_overflow_past_64() {
    let registry = TagRegistry::new();
    let mut set = TagSet::new();
    let ids: Vec<_> = (0..200).map(|i| registry.intern(&format!("tag-{i}"))).collect();
    for id in &ids {
        set.set(*id);
    }
    assert!(!set.is_empty());
    for id in &ids {
        assert!(set.is_set(*id));
    }
    let seen: Vec<_> = set.iter().collect();
    assert_eq!(seen.len(), ids.len());
}

#[test]
fn empty_set_reports_empty() {
    let set = TagSet::new();
    assert!(set.is_empty());
}

#[test]
fn global_registry_is_the_same_instance_across_calls() {
    let a = global_registry().intern("global-registry-test-tag");
    let b = global_registry().intern("global-registry-test-tag");
    assert_eq!(a, b);
}
