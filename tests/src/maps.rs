use prost_proxy::{Object, ProxyError};

use crate::schema::{IntMessage, TestMessage};
use crate::{make_test_message, mutate_int_message};

#[test]
fn string_int_map() {
    let message = make_test_message();
    let map = message.map("string_int_map").unwrap();
    map.set("k1", 5).unwrap();
    map.set("k2", 6).unwrap();

    assert_eq!(map.len().unwrap(), 2);
    assert_eq!(map.get("k1").unwrap(), Some(Object::Int(5)));
    assert_eq!(map.get("k2").unwrap(), Some(Object::Int(6)));
    assert!(map.contains("k1").unwrap());
    assert!(map.contains("k2").unwrap());
    assert!(!map.contains("k3").unwrap());

    let keys: Vec<Object> = map.keys().unwrap().collect();
    assert_eq!(keys, [Object::from("k1"), Object::from("k2")]);
    let values: Vec<Object> = map.values().unwrap().collect();
    assert_eq!(values, [Object::Int(5), Object::Int(6)]);
    let items: Vec<(Object, Object)> = map.items().unwrap().collect();
    assert_eq!(
        items,
        [
            (Object::from("k1"), Object::Int(5)),
            (Object::from("k2"), Object::Int(6))
        ]
    );

    let mut native = TestMessage::default();
    native.string_int_map.insert("k1".to_owned(), 5);
    native.string_int_map.insert("k2".to_owned(), 6);
    assert_eq!(
        map.to_dict().unwrap(),
        Object::dict(native.string_int_map.iter().map(|(k, v)| (k.as_str(), *v)))
    );

    map.update_kwargs(&[("k3", Object::Int(7))]).unwrap();
    assert_eq!(map.get("k3").unwrap(), Some(Object::Int(7)));
    map.update(&Object::dict([("k4", 8)])).unwrap();
    assert_eq!(map.get("k4").unwrap(), Some(Object::Int(8)));

    map.clear().unwrap();
    assert!(map.is_empty().unwrap());

    assert!(matches!(map.set(5, 5), Err(ProxyError::TypeMismatch(_))));
    assert!(matches!(map.set("k", "foo"), Err(ProxyError::TypeMismatch(_))));
    assert!(matches!(
        message.set("string_int_map", Object::dict([("k", 5)])),
        Err(ProxyError::ImmutableFieldAssignment { .. })
    ));
}

#[test]
fn missing_scalar_keys_are_misses() {
    let message = make_test_message();
    let map = message.map("string_int_map").unwrap();
    assert_eq!(map.get("missing").unwrap(), None);
    assert!(map.is_empty().unwrap());
    assert!(!map.remove("missing").unwrap());

    map.set("present", 1).unwrap();
    assert!(map.remove("present").unwrap());
    assert!(map.is_empty().unwrap());
}

#[test]
fn int_message_map() {
    let message = make_test_message();
    let map = message.map("int_message_map").unwrap();
    map.entry(5).unwrap().set("value", 2).unwrap();
    map.entry(6).unwrap().set("value", 3).unwrap();

    assert_eq!(map.len().unwrap(), 2);
    assert_eq!(map.entry(5).unwrap().get("value").unwrap(), Object::Int(2));
    assert_eq!(map.entry(6).unwrap().get("value").unwrap(), Object::Int(3));
    assert!(map.contains(5).unwrap());
    assert!(map.contains(6).unwrap());
    assert!(!map.contains(7).unwrap());

    let keys: Vec<Object> = map.keys().unwrap().collect();
    assert_eq!(keys, [Object::Int(5), Object::Int(6)]);

    let values: Vec<Object> = map
        .values()
        .unwrap()
        .map(|value| value.into_message().unwrap().get("value").unwrap())
        .collect();
    assert_eq!(values, [Object::Int(2), Object::Int(3)]);

    let items: Vec<(Object, Object)> = map
        .items()
        .unwrap()
        .map(|(key, value)| (key, value.into_message().unwrap().get("value").unwrap()))
        .collect();
    assert_eq!(
        items,
        [(Object::Int(5), Object::Int(2)), (Object::Int(6), Object::Int(3))]
    );

    assert_eq!(map.to_string(), "{5: value: 2, 6: value: 3}");

    map.update(&Object::dict([(7, Object::native(IntMessage { value: 8 }))]))
        .unwrap();
    assert_eq!(map.entry(7).unwrap().get("value").unwrap(), Object::Int(8));

    map.clear().unwrap();
    assert!(map.is_empty().unwrap());

    assert!(matches!(map.entry("foo"), Err(ProxyError::TypeMismatch(_))));
    assert_eq!(
        map.set(1, Object::native(IntMessage::default())).unwrap_err(),
        ProxyError::InvalidEntryReplacement {
            field: "protoproxy.test.TestMessage.int_message_map".to_owned()
        }
    );
    assert!(matches!(
        message.set(
            "int_message_map",
            Object::dict([(1, Object::native(IntMessage::default()))])
        ),
        Err(ProxyError::ImmutableFieldAssignment { .. })
    ));
}

#[test]
fn message_map_lookup_creates_entries() {
    let message = make_test_message();
    let map = message.map("int_message_map").unwrap();
    let value = map.get(3).unwrap().unwrap();
    assert!(map.contains(3).unwrap());
    assert_eq!(
        value.into_message().unwrap().get("value").unwrap(),
        Object::Int(0)
    );
}

#[test]
fn entry_replacement_and_field_assignment_fail_differently() {
    let message = make_test_message();
    let entry = message
        .map("int_message_map")
        .unwrap()
        .set(1, Object::native(IntMessage::default()))
        .unwrap_err();
    let field = message
        .set("int_message_map", Object::Dict(Vec::new()))
        .unwrap_err();
    assert!(matches!(entry, ProxyError::InvalidEntryReplacement { .. }));
    assert!(matches!(field, ProxyError::ImmutableFieldAssignment { .. }));
}

#[test]
fn map_entries_can_be_mutated_through_casters() {
    let message = make_test_message();
    let entry = message.map("int_message_map").unwrap().entry(1).unwrap();
    mutate_int_message(4, &Object::Message(entry)).unwrap();
    assert_eq!(
        message.map("int_message_map").unwrap().to_string(),
        "{1: value: 4}"
    );
}

#[test]
fn update_from_another_map() {
    let source = make_test_message();
    source.map("string_int_map").unwrap().set("a", 1).unwrap();
    let target = make_test_message();
    let map = target.map("string_int_map").unwrap();
    map.set("b", 2).unwrap();
    map.update(&Object::Map(source.map("string_int_map").unwrap()))
        .unwrap();
    assert_eq!(map.to_dict().unwrap(), Object::dict([("a", 1), ("b", 2)]));
}
