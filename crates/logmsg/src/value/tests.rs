use super::{Handle, Value, ValuePayload, ValueType};

#[test]
fn set_and_get_roundtrip() {
    let mut payload = ValuePayload::new();
    payload.set("app", Value::string("sshd"));
    assert_eq!(payload.get("app").unwrap().as_str(), Some("sshd"));
    assert_eq!(payload.get("app").unwrap().value_type(), ValueType::String);
}

#[test]
fn handle_addressing_uses_reserved_name() {
    let mut payload = ValuePayload::new();
    payload.set_handle(Handle::Program, Value::string("cron"));
    assert_eq!(
        payload.get_handle(Handle::Program).unwrap().as_str(),
        Some("cron")
    );
    assert_eq!(payload.get(".program").unwrap().as_str(), Some("cron"));
}

#[test]
fn clone_shares_base_until_write() {
    let mut original = ValuePayload::new();
    original.set("host", Value::string("alpha"));

    let clone = original.clone();
    assert_eq!(clone.get("host").unwrap().as_str(), Some("alpha"));

    original.set("host", Value::string("beta"));
    assert_eq!(original.get("host").unwrap().as_str(), Some("beta"));
    assert_eq!(clone.get("host").unwrap().as_str(), Some("alpha"));
}

#[test]
fn remove_masks_base_value() {
    let mut base = ValuePayload::new();
    base.set("pid", Value::integer(42));
    let mut derived = base.rebased_clone();
    derived.remove("pid");
    assert!(derived.get("pid").is_none());
    assert_eq!(base.get("pid").unwrap().as_str(), Some("42"));
}

#[test]
fn rebased_clone_merges_tail_into_new_base() {
    let mut base = ValuePayload::new();
    base.set("a", Value::integer(1));
    base.set("b", Value::integer(2));

    let merged = base.rebased_clone();
    let visible: std::collections::BTreeMap<_, _> = merged
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_str().map(str::to_string)))
        .collect();
    assert_eq!(visible.len(), 2);
}

#[test]
fn iter_reflects_tombstones_and_overrides() {
    let mut base = ValuePayload::new();
    base.set("a", Value::integer(1));
    base.set("b", Value::integer(2));

    let mut derived = base.rebased_clone();
    derived.remove("a");
    derived.set("b", Value::integer(20));
    derived.set("c", Value::integer(3));

    let mut names: Vec<_> = derived.iter().map(|(k, _)| k.to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["b", "c"]);
    assert_eq!(derived.get("b").unwrap().as_str(), Some("20"));
}
