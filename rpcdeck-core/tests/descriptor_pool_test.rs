use echo_service::FILE_DESCRIPTOR_SET;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, MethodDescriptorProto,
    OneofDescriptorProto, ServiceDescriptorProto,
};
use rpcdeck_core::prost::Message;
use rpcdeck_core::prost_reflect::{DescriptorPool, DynamicMessage};
use rpcdeck_core::schema::{
    FieldKind, FieldNode, MessageMember, ScalarKind, SchemaNode, SchemaTree, TypeRef, walk,
};
use rpcdeck_core::session::CallMode;
use serde_json::json;

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        json_name: None,
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.into()),
        ..field(name, number, ty)
    }
}

fn in_oneof(field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index: Some(index),
        ..field
    }
}

fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field
    }
}

/// `inventory.proto`: a recursive message with a map, a oneof, a nested enum and a proto3
/// optional field, plus a service using it.
fn inventory_descriptor_set() -> Vec<u8> {
    let levels_entry = DescriptorProto {
        name: Some("LevelsEntry".into()),
        field: vec![field("key", 1, Type::String), field("value", 2, Type::Int32)],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };

    let kind = EnumDescriptorProto {
        name: Some("Kind".into()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("KIND_RAW".into()),
                number: Some(0),
                options: None,
            },
            EnumValueDescriptorProto {
                name: Some("KIND_PACKED".into()),
                number: Some(1),
                options: None,
            },
        ],
        ..Default::default()
    };

    let stock = DescriptorProto {
        name: Some("Stock".into()),
        field: vec![
            field("name", 1, Type::String),
            repeated(message_field(
                "levels",
                2,
                Type::Message,
                ".inventory.Stock.LevelsEntry",
            )),
            in_oneof(field("warehouse", 3, Type::Int64), 0),
            in_oneof(field("supplier", 4, Type::String), 0),
            message_field("kind", 5, Type::Enum, ".inventory.Stock.Kind"),
            repeated(message_field("children", 6, Type::Message, ".inventory.Stock")),
            FieldDescriptorProto {
                proto3_optional: Some(true),
                ..in_oneof(field("label", 7, Type::String), 1)
            },
        ],
        nested_type: vec![levels_entry],
        enum_type: vec![kind],
        oneof_decl: vec![
            OneofDescriptorProto {
                name: Some("source".into()),
                options: None,
            },
            OneofDescriptorProto {
                name: Some("_label".into()),
                options: None,
            },
        ],
        ..Default::default()
    };

    let service = ServiceDescriptorProto {
        name: Some("Inventory".into()),
        method: vec![
            MethodDescriptorProto {
                name: Some("Check".into()),
                input_type: Some(".inventory.Stock".into()),
                output_type: Some(".inventory.Stock".into()),
                ..Default::default()
            },
            MethodDescriptorProto {
                name: Some("Feed".into()),
                input_type: Some(".inventory.Stock".into()),
                output_type: Some(".inventory.Stock".into()),
                client_streaming: Some(true),
                server_streaming: Some(true),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let file = FileDescriptorProto {
        name: Some("inventory.proto".into()),
        package: Some("inventory".into()),
        message_type: vec![stock],
        service: vec![service],
        syntax: Some("proto3".into()),
        ..Default::default()
    };

    FileDescriptorSet { file: vec![file] }.encode_to_vec()
}

fn stock_node(tree: &SchemaTree) -> &rpcdeck_core::schema::MessageNode {
    let SchemaNode::Namespace(ns) = &tree.nodes[0] else {
        panic!("Expected the inventory namespace");
    };
    assert_eq!(ns.name, "inventory");

    ns.nested
        .iter()
        .find_map(|node| match node {
            SchemaNode::Message(m) if m.name == "Stock" => Some(m),
            _ => None,
        })
        .expect("Stock not found")
}

#[test]
fn test_pool_conversion_keeps_structure() {
    let tree = SchemaTree::from_descriptor_set(&inventory_descriptor_set()).unwrap();
    let stock = stock_node(&tree);

    assert_eq!(
        stock.members,
        vec![
            MessageMember::Field(FieldNode::plain("name", TypeRef::Scalar(ScalarKind::String))),
            MessageMember::Field(FieldNode::map(
                "levels",
                ScalarKind::String,
                TypeRef::Scalar(ScalarKind::Int32)
            )),
            MessageMember::OneOf(rpcdeck_core::schema::OneOfNode {
                name: "source".into(),
                fields: vec![
                    FieldNode::plain("warehouse", TypeRef::Scalar(ScalarKind::Int64)),
                    FieldNode::plain("supplier", TypeRef::Scalar(ScalarKind::String)),
                ],
            }),
            MessageMember::Field(FieldNode::plain(
                "kind",
                TypeRef::Named("inventory.Stock.Kind".into())
            )),
            MessageMember::Field(FieldNode::repeated(
                "children",
                TypeRef::Named("inventory.Stock".into())
            )),
            MessageMember::Field(FieldNode::plain("label", TypeRef::Scalar(ScalarKind::String))),
        ]
    );

    // Map entries are an encoding detail and do not show up as nested messages.
    assert_eq!(stock.nested.len(), 1);
    assert!(matches!(&stock.nested[0], SchemaNode::Enum(e) if e.name == "Kind"));

    // Maps are not reported as repeated, even though they are on the wire.
    let levels = stock
        .members
        .iter()
        .find_map(|m| match m {
            MessageMember::Field(f) if f.name == "levels" => Some(f),
            _ => None,
        })
        .unwrap();
    assert!(matches!(levels.kind, FieldKind::Map { .. }));
    assert!(!levels.repeated);
}

#[test]
fn test_walked_pool_samples_are_valid_requests() {
    let bytes = inventory_descriptor_set();
    let pool = DescriptorPool::decode(bytes.as_slice()).unwrap();
    let services = walk(&SchemaTree::from(&pool));

    assert_eq!(services.len(), 1);
    assert_eq!(services[0].id, "inventory.Inventory");

    let check = &services[0].methods[0];
    assert_eq!(check.id.as_str(), "inventory.Inventory/Check");
    assert_eq!(check.mode, CallMode::Unary);
    assert_eq!(services[0].methods[1].mode, CallMode::BidirectionalStream);

    assert_eq!(
        check.request_body,
        json!({
            "name": "",
            "levels": { "": 3200 },
            "warehouse": 6400,
            "kind": 0,
            "children": [{}],
            "label": "",
        })
    );

    let input = pool.get_message_by_name("inventory.Stock").unwrap();
    DynamicMessage::deserialize(input, check.request_body.clone())
        .expect("Sample body should be accepted by the schema");
}

/// `clock.proto`, whose request uses `Timestamp`, `Duration` and a wrapper type.
fn clock_descriptor_set() -> Vec<u8> {
    let well_known = |file: &str, messages: Vec<DescriptorProto>| FileDescriptorProto {
        name: Some(format!("google/protobuf/{file}.proto")),
        package: Some("google.protobuf".into()),
        message_type: messages,
        syntax: Some("proto3".into()),
        ..Default::default()
    };
    let message = |name: &str, fields: Vec<FieldDescriptorProto>| DescriptorProto {
        name: Some(name.into()),
        field: fields,
        ..Default::default()
    };
    let seconds_and_nanos = || vec![field("seconds", 1, Type::Int64), field("nanos", 2, Type::Int32)];

    let timestamp = well_known("timestamp", vec![message("Timestamp", seconds_and_nanos())]);
    let duration = well_known("duration", vec![message("Duration", seconds_and_nanos())]);
    let wrappers = well_known(
        "wrappers",
        vec![message("Int32Value", vec![field("value", 1, Type::Int32)])],
    );

    let alarm = message(
        "Alarm",
        vec![
            message_field("at", 1, Type::Message, ".google.protobuf.Timestamp"),
            message_field("snooze", 2, Type::Message, ".google.protobuf.Duration"),
            message_field("repeat", 3, Type::Message, ".google.protobuf.Int32Value"),
        ],
    );

    let clock = FileDescriptorProto {
        name: Some("clock.proto".into()),
        package: Some("clock".into()),
        dependency: vec![
            "google/protobuf/timestamp.proto".into(),
            "google/protobuf/duration.proto".into(),
            "google/protobuf/wrappers.proto".into(),
        ],
        message_type: vec![alarm],
        service: vec![ServiceDescriptorProto {
            name: Some("Clock".into()),
            method: vec![MethodDescriptorProto {
                name: Some("Set".into()),
                input_type: Some(".clock.Alarm".into()),
                output_type: Some(".clock.Alarm".into()),
                ..Default::default()
            }],
            ..Default::default()
        }],
        syntax: Some("proto3".into()),
        ..Default::default()
    };

    FileDescriptorSet {
        file: vec![timestamp, duration, wrappers, clock],
    }
    .encode_to_vec()
}

#[test]
fn test_well_known_type_samples_are_valid_requests() {
    let bytes = clock_descriptor_set();
    let pool = DescriptorPool::decode(bytes.as_slice()).unwrap();
    let services = walk(&SchemaTree::from(&pool));

    let set = services
        .iter()
        .flat_map(|service| &service.methods)
        .find(|method| method.id.as_str() == "clock.Clock/Set")
        .unwrap();

    assert_eq!(
        set.request_body,
        json!({ "at": "1970-01-01T00:00:00Z", "snooze": "0s", "repeat": 3200 })
    );

    let input = pool.get_message_by_name("clock.Alarm").unwrap();
    DynamicMessage::deserialize(input, set.request_body.clone())
        .expect("Well-known type samples should be accepted by the schema");
}

#[test]
fn test_echo_descriptor_set() {
    let services = walk(&SchemaTree::from_descriptor_set(FILE_DESCRIPTOR_SET).unwrap());

    let echo = services
        .iter()
        .find(|s| s.id == "echo.EchoService")
        .expect("EchoService not found");

    let methods: Vec<_> = echo
        .methods
        .iter()
        .map(|m| (m.name.as_str(), m.mode, m.request_body.clone()))
        .collect();

    assert_eq!(
        methods,
        vec![
            ("UnaryEcho", CallMode::Unary, json!({ "message": "" })),
            ("ServerStreamingEcho", CallMode::ServerStream, json!({ "message": "" })),
            ("ClientStreamingEcho", CallMode::ClientStream, json!({ "message": "" })),
            ("BidirectionalEcho", CallMode::BidirectionalStream, json!({ "message": "" })),
        ]
    );
}

#[test]
fn test_invalid_descriptor_set_is_an_error() {
    assert!(SchemaTree::from_descriptor_set(b"not a descriptor set").is_err());
}
