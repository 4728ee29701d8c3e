//! The test schema, installed into the global descriptor pool, and its
//! statically-typed counterparts.
//!
//! Equivalent to:
//!
//! ```proto
//! syntax = "proto3";
//! package protoproxy.test;
//!
//! message IntMessage {
//!   int32 value = 1;
//! }
//!
//! message TestMessage {
//!   enum TestEnum {
//!     ZERO = 0;
//!     ONE = 1;
//!     TWO = 2;
//!   }
//!   string string_value = 1;
//!   int32 int_value = 2;
//!   IntMessage int_message = 3;
//!   repeated int32 repeated_int_value = 4;
//!   repeated IntMessage repeated_int_message = 5;
//!   map<string, int32> string_int_map = 6;
//!   map<int32, IntMessage> int_message_map = 7;
//!   TestEnum enum_value = 8;
//!   repeated TestEnum repeated_enum_value = 9;
//!   double double_value = 10;
//!   oneof test_oneof {
//!     int32 oneof_a = 11;
//!     int32 oneof_b = 12;
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use prost::Message as _;
use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, OneofDescriptorProto,
};

pub const PACKAGE: &str = "protoproxy.test";
pub const TEST_MESSAGE: &str = "protoproxy.test.TestMessage";
pub const INT_MESSAGE: &str = "protoproxy.test.IntMessage";
pub const ANY: &str = "google.protobuf.Any";

static INSTALLED: Lazy<()> = Lazy::new(|| {
    let pool = DescriptorPool::global();
    let mut files = Vec::new();
    if pool.get_message_by_name(ANY).is_none() {
        files.push(any_file());
    }
    if pool.get_message_by_name(TEST_MESSAGE).is_none() {
        files.push(test_file());
    }
    if !files.is_empty() {
        let set = FileDescriptorSet { file: files };
        DescriptorPool::decode_global_file_descriptor_set(set.encode_to_vec().as_slice())
            .expect("failed to install the test schema");
    }
});

/// Adds the test schema to the global descriptor pool, once.
pub fn install() {
    Lazy::force(&INSTALLED);
}

/// A pool holding a private copy of the test schema, separate from the global
/// pool.
pub fn standalone_pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![test_file()],
    })
    .expect("failed to build a standalone test schema")
}

pub fn test_message_descriptor() -> MessageDescriptor {
    descriptor(TEST_MESSAGE)
}

pub fn int_message_descriptor() -> MessageDescriptor {
    descriptor(INT_MESSAGE)
}

fn descriptor(name: &str) -> MessageDescriptor {
    install();
    DescriptorPool::global()
        .get_message_by_name(name)
        .unwrap_or_else(|| panic!("{} is not installed", name))
}

fn field(name: &str, number: i32, label: Label, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, label: Label, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, label, Type::Message)
    }
}

fn enum_field(name: &str, number: i32, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(".protoproxy.test.TestMessage.TestEnum".to_owned()),
        ..field(name, number, label, Type::Enum)
    }
}

fn oneof_field(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index: Some(0),
        ..field(name, number, Label::Optional, Type::Int32)
    }
}

fn map_entry(name: &str, key: FieldDescriptorProto, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: vec![key, value],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn test_file() -> FileDescriptorProto {
    let int_message = DescriptorProto {
        name: Some("IntMessage".to_owned()),
        field: vec![field("value", 1, Label::Optional, Type::Int32)],
        ..Default::default()
    };

    let test_enum = EnumDescriptorProto {
        name: Some("TestEnum".to_owned()),
        value: ["ZERO", "ONE", "TWO"]
            .iter()
            .zip(0..)
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some((*name).to_owned()),
                number: Some(number),
                options: None,
            })
            .collect(),
        ..Default::default()
    };

    let test_message = DescriptorProto {
        name: Some("TestMessage".to_owned()),
        field: vec![
            field("string_value", 1, Label::Optional, Type::String),
            field("int_value", 2, Label::Optional, Type::Int32),
            message_field("int_message", 3, Label::Optional, ".protoproxy.test.IntMessage"),
            field("repeated_int_value", 4, Label::Repeated, Type::Int32),
            message_field(
                "repeated_int_message",
                5,
                Label::Repeated,
                ".protoproxy.test.IntMessage",
            ),
            message_field(
                "string_int_map",
                6,
                Label::Repeated,
                ".protoproxy.test.TestMessage.StringIntMapEntry",
            ),
            message_field(
                "int_message_map",
                7,
                Label::Repeated,
                ".protoproxy.test.TestMessage.IntMessageMapEntry",
            ),
            enum_field("enum_value", 8, Label::Optional),
            enum_field("repeated_enum_value", 9, Label::Repeated),
            field("double_value", 10, Label::Optional, Type::Double),
            oneof_field("oneof_a", 11),
            oneof_field("oneof_b", 12),
        ],
        nested_type: vec![
            map_entry(
                "StringIntMapEntry",
                field("key", 1, Label::Optional, Type::String),
                field("value", 2, Label::Optional, Type::Int32),
            ),
            map_entry(
                "IntMessageMapEntry",
                field("key", 1, Label::Optional, Type::Int32),
                message_field("value", 2, Label::Optional, ".protoproxy.test.IntMessage"),
            ),
        ],
        enum_type: vec![test_enum],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("test_oneof".to_owned()),
            options: None,
        }],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("protoproxy/test.proto".to_owned()),
        package: Some(PACKAGE.to_owned()),
        message_type: vec![int_message, test_message],
        syntax: Some("proto3".to_owned()),
        ..Default::default()
    }
}

fn any_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/protobuf/any.proto".to_owned()),
        package: Some("google.protobuf".to_owned()),
        message_type: vec![DescriptorProto {
            name: Some("Any".to_owned()),
            field: vec![
                field("type_url", 1, Label::Optional, Type::String),
                field("value", 2, Label::Optional, Type::Bytes),
            ],
            ..Default::default()
        }],
        syntax: Some("proto3".to_owned()),
        ..Default::default()
    }
}

/// Statically-typed `protoproxy.test.IntMessage`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct IntMessage {
    #[prost(int32, tag = "1")]
    pub value: i32,
}

impl prost::Name for IntMessage {
    const NAME: &'static str = "IntMessage";
    const PACKAGE: &'static str = PACKAGE;
}

/// Statically-typed `protoproxy.test.TestMessage`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TestMessage {
    #[prost(string, tag = "1")]
    pub string_value: String,
    #[prost(int32, tag = "2")]
    pub int_value: i32,
    #[prost(message, optional, tag = "3")]
    pub int_message: Option<IntMessage>,
    #[prost(int32, repeated, tag = "4")]
    pub repeated_int_value: Vec<i32>,
    #[prost(message, repeated, tag = "5")]
    pub repeated_int_message: Vec<IntMessage>,
    #[prost(btree_map = "string, int32", tag = "6")]
    pub string_int_map: BTreeMap<String, i32>,
    #[prost(btree_map = "int32, message", tag = "7")]
    pub int_message_map: BTreeMap<i32, IntMessage>,
    #[prost(enumeration = "test_message::TestEnum", tag = "8")]
    pub enum_value: i32,
    #[prost(enumeration = "test_message::TestEnum", repeated, tag = "9")]
    pub repeated_enum_value: Vec<i32>,
    #[prost(double, tag = "10")]
    pub double_value: f64,
    #[prost(oneof = "test_message::TestOneof", tags = "11, 12")]
    pub test_oneof: Option<test_message::TestOneof>,
}

impl prost::Name for TestMessage {
    const NAME: &'static str = "TestMessage";
    const PACKAGE: &'static str = PACKAGE;
}

pub mod test_message {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum TestEnum {
        Zero = 0,
        One = 1,
        Two = 2,
    }

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum TestOneof {
        #[prost(int32, tag = "11")]
        OneofA(i32),
        #[prost(int32, tag = "12")]
        OneofB(i32),
    }
}
