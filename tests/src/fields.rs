use prost_proxy::{Object, ProxyError, Strategy};

use crate::schema::test_message::TestEnum;
use crate::schema::IntMessage;
use crate::{make_test_message, test_message_class};

#[test]
fn singular_fields() {
    let message = make_test_message();
    message.set("string_value", "test").unwrap();
    message.set("int_value", 5).unwrap();
    message.set("double_value", 5.5).unwrap();
    message.message("int_message").unwrap().set("value", 6).unwrap();

    assert_eq!(message.get("string_value").unwrap(), Object::from("test"));
    assert_eq!(message.get("int_value").unwrap(), Object::Int(5));
    assert_eq!(message.get("double_value").unwrap(), Object::Float(5.5));
    assert_eq!(
        message.message("int_message").unwrap().get("value").unwrap(),
        Object::Int(6)
    );
}

#[test]
fn negative_zero_keeps_its_sign() {
    let message = make_test_message();
    message.set("double_value", -0.0).unwrap();
    match message.get("double_value").unwrap() {
        Object::Float(value) => assert!(value == 0.0 && value.is_sign_negative()),
        other => panic!("unexpected value {:?}", other),
    }

    message.set("double_value", 0.0).unwrap();
    match message.get("double_value").unwrap() {
        Object::Float(value) => assert!(value == 0.0 && value.is_sign_positive()),
        other => panic!("unexpected value {:?}", other),
    }
}

#[test]
fn scalar_reads_are_snapshots() {
    let message = make_test_message();
    message.set("int_value", 5).unwrap();
    let mut value = message.get("int_value").unwrap();
    value = match value {
        Object::Int(n) => Object::Int(n + 1),
        other => other,
    };
    assert_eq!(value, Object::Int(6));
    assert_eq!(message.get("int_value").unwrap(), Object::Int(5));
}

#[test]
fn scalar_assignment_checks_kinds() {
    let message = make_test_message();
    assert!(matches!(
        message.set("int_value", "five"),
        Err(ProxyError::TypeMismatch(_))
    ));
    assert!(matches!(
        message.set("int_value", i64::from(i32::MAX) + 1),
        Err(ProxyError::TypeMismatch(_))
    ));
    assert!(matches!(
        message.set("string_value", 5),
        Err(ProxyError::TypeMismatch(_))
    ));
    assert_eq!(message.get("int_value").unwrap(), Object::Int(0));
}

#[test]
fn enum_fields() {
    let message = make_test_message();
    assert_eq!(message.get("enum_value").unwrap(), Object::Int(0));
    assert_eq!(message.enum_name("enum_value").unwrap(), "ZERO");

    message.set("enum_value", 1).unwrap();
    assert_eq!(message.get("enum_value").unwrap(), Object::from(TestEnum::One as i32));

    message.set("enum_value", TestEnum::Two as i32).unwrap();
    assert_eq!(message.get("enum_value").unwrap(), Object::Int(2));

    message.set("enum_value", "ONE").unwrap();
    assert_eq!(message.enum_name("enum_value").unwrap(), "ONE");

    assert!(matches!(
        message.set("enum_value", 7),
        Err(ProxyError::TypeMismatch(_))
    ));
    assert!(matches!(
        message.set("enum_value", "THREE"),
        Err(ProxyError::TypeMismatch(_))
    ));
    assert!(matches!(
        message.enum_name("int_value"),
        Err(ProxyError::TypeMismatch(_))
    ));
}

#[test]
fn nonexistent_field() {
    let message = make_test_message();
    assert!(matches!(
        message.get("invalid_field"),
        Err(ProxyError::UnknownField { .. })
    ));
    assert!(matches!(
        message.set("invalid_field", 5),
        Err(ProxyError::UnknownField { .. })
    ));
}

#[test]
fn composite_fields_cannot_be_assigned() {
    let message = make_test_message();
    let attempts = [
        ("int_message", Object::native(IntMessage::default())),
        ("repeated_int_value", Object::List(Vec::new())),
        ("repeated_int_message", Object::List(Vec::new())),
        ("repeated_enum_value", Object::List(Vec::new())),
        ("string_int_map", Object::Dict(Vec::new())),
        ("int_message_map", Object::Dict(Vec::new())),
    ];
    for (name, value) in attempts {
        assert_eq!(
            message.set(name, value).unwrap_err(),
            ProxyError::ImmutableFieldAssignment {
                message: "protoproxy.test.TestMessage".to_owned(),
                field: name.to_owned(),
            }
        );
    }
}

#[test]
fn has_field() {
    let message = make_test_message();
    assert!(!message.has_field("int_message").unwrap());
    // Reading a sub-message does not make it present.
    let _ = message.message("int_message").unwrap().get("value").unwrap();
    assert!(!message.has_field("int_message").unwrap());

    message.message("int_message").unwrap().set("value", 5).unwrap();
    assert!(message.has_field("int_message").unwrap());

    assert!(matches!(
        message.has_field("non_existent_field"),
        Err(ProxyError::InvalidArgument(_))
    ));

    assert!(!message.has_field("test_oneof").unwrap());
    message.set("oneof_a", 5).unwrap();
    assert!(message.has_field("test_oneof").unwrap());
}

#[test]
fn clear_field() {
    let message = make_test_message();
    message.message("int_message").unwrap().set("value", 5).unwrap();
    assert!(message.has_field("int_message").unwrap());
    message.clear_field("int_message").unwrap();
    assert!(!message.has_field("int_message").unwrap());

    assert!(matches!(
        message.clear_field("non_existent_field"),
        Err(ProxyError::InvalidArgument(_))
    ));

    message.set("oneof_a", 5).unwrap();
    message.clear_field("test_oneof").unwrap();
    assert!(!message.has_field("test_oneof").unwrap());
}

#[test]
fn which_oneof() {
    let message = make_test_message();
    assert!(matches!(
        message.which_oneof("non_existent_field"),
        Err(ProxyError::InvalidArgument(_))
    ));
    assert_eq!(message.which_oneof("test_oneof").unwrap(), None);

    message.set("oneof_a", 5).unwrap();
    assert_eq!(message.which_oneof("test_oneof").unwrap().as_deref(), Some("oneof_a"));

    message.set("oneof_b", 6).unwrap();
    assert_eq!(message.which_oneof("test_oneof").unwrap().as_deref(), Some("oneof_b"));
    assert!(!message.has_field("oneof_a").unwrap());
    assert_eq!(message.get("oneof_a").unwrap(), Object::Int(0));
}

#[test]
fn oneof_members_with_zero_values_are_present() {
    let message = make_test_message();
    message.set("oneof_b", 0).unwrap();
    assert_eq!(message.which_oneof("test_oneof").unwrap().as_deref(), Some("oneof_b"));
}

#[test]
fn constructor_keywords() {
    let message = test_message_class()
        .construct(&[
            ("int_value", Object::Int(4)),
            ("repeated_int_value", Object::from(vec![6, 7])),
            ("enum_value", Object::from("ONE")),
        ])
        .unwrap();
    assert!(!message.has_field("int_message").unwrap());
    assert_eq!(message.repeated("repeated_int_value").unwrap().len().unwrap(), 2);
    assert_eq!(message.enum_name("enum_value").unwrap(), "ONE");
    assert_eq!(message.get("int_value").unwrap(), Object::Int(4));

    assert!(matches!(
        test_message_class().construct(&[("invalid_field", Object::Int(1))]),
        Err(ProxyError::UnknownField { .. })
    ));
}

#[test]
fn list_fields_in_number_order() {
    let message = make_test_message();
    message.set("double_value", 1.5).unwrap();
    message.set("string_value", "a").unwrap();
    message.repeated("repeated_int_value").unwrap().append(3).unwrap();
    // Zero values of fields without presence are not listed.
    message.set("int_value", 0).unwrap();

    let names: Vec<String> = message
        .list_fields()
        .unwrap()
        .into_iter()
        .map(|(field, _)| field.name().to_owned())
        .collect();
    assert_eq!(names, ["string_value", "repeated_int_value", "double_value"]);
}

#[test]
fn clear_resets_every_field() {
    let message = crate::fully_populated();
    message.clear().unwrap();
    assert!(message.list_fields().unwrap().is_empty());
    assert_eq!(message, make_test_message());
}

#[test]
fn field_strategies() {
    let message = make_test_message();
    let strategy = |name: &str| match message.get(name).unwrap() {
        Object::Message(_) => Strategy::Message,
        Object::Repeated(field) => field.accessor().strategy(),
        Object::Map(field) => field.accessor().strategy(),
        _ => Strategy::Scalar,
    };
    assert_eq!(strategy("int_message"), Strategy::Message);
    assert_eq!(strategy("repeated_int_value"), Strategy::RepeatedScalar);
    assert_eq!(strategy("repeated_int_message"), Strategy::RepeatedMessage);
    assert_eq!(strategy("repeated_enum_value"), Strategy::RepeatedEnum);
    assert_eq!(strategy("string_int_map"), Strategy::MapScalar);
    assert_eq!(strategy("int_message_map"), Strategy::MapMessage);
}
