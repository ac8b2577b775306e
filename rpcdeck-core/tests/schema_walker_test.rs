use rpcdeck_core::schema::{
    EnumNode, EnumValueNode, FieldNode, MessageNode, MethodNode, NamespaceNode, ScalarKind,
    SchemaNode, SchemaTree, SchemaWalker, ServiceNode, TypeRef, walk,
};
use rpcdeck_core::session::CallMode;
use serde_json::json;
use tracing_test::traced_test;

fn scalar(kind: ScalarKind) -> TypeRef {
    TypeRef::Scalar(kind)
}

fn named(name: &str) -> TypeRef {
    TypeRef::Named(name.to_string())
}

/// A `shop` namespace with one service whose request exercises every sampling rule.
fn shop_tree() -> SchemaTree {
    let status = EnumNode {
        name: "Status".into(),
        values: vec![
            EnumValueNode {
                name: "ACTIVE".into(),
                number: 7,
            },
            EnumValueNode {
                name: "UNKNOWN".into(),
                number: 0,
            },
        ],
    };

    let item = MessageNode::new(
        "Item",
        vec![
            FieldNode::plain("sku", scalar(ScalarKind::String)),
            FieldNode::plain("price", scalar(ScalarKind::Double)),
        ],
    );

    let order = MessageNode::new(
        "Order",
        vec![
            FieldNode::plain("id", scalar(ScalarKind::Uint64)),
            FieldNode::repeated("tags", scalar(ScalarKind::String)),
            FieldNode::repeated("items", named("shop.Item")),
            FieldNode::map("quantities", ScalarKind::String, scalar(ScalarKind::Int32)),
            FieldNode::plain("status", named("shop.Status")),
            // Relative to the `shop.Order` scope, found through the redirect.
            FieldNode::plain("note", named("Note")),
        ],
    )
    .with_oneof(
        "payment",
        vec![
            FieldNode::plain("card", scalar(ScalarKind::Int32)),
            FieldNode::plain("voucher", scalar(ScalarKind::String)),
        ],
    )
    .with_nested(SchemaNode::Message(MessageNode::new(
        "Note",
        vec![FieldNode::plain("text", scalar(ScalarKind::String))],
    )));

    SchemaTree::new(vec![SchemaNode::Namespace(NamespaceNode {
        name: "shop".into(),
        nested: vec![
            SchemaNode::Enum(status),
            SchemaNode::Message(item),
            SchemaNode::Message(order),
            SchemaNode::Service(ServiceNode {
                name: "Orders".into(),
                methods: vec![
                    MethodNode::unary("Place", "shop.Order", "shop.Order"),
                    MethodNode::unary("Upload", "shop.Item", "shop.Order").streaming(true, false),
                    MethodNode::unary("Watch", "shop.Order", "shop.Item").streaming(false, true),
                    MethodNode::unary("Sync", "Item", "Item").streaming(true, true),
                ],
            }),
        ],
    })])
}

#[test]
fn test_walk_produces_method_stubs() {
    let services = walk(&shop_tree());

    assert_eq!(services.len(), 1);
    let service = &services[0];
    assert_eq!(service.id, "shop.Orders");
    assert_eq!(service.namespace, "shop");
    assert_eq!(service.name, "Orders");

    let modes: Vec<_> = service.methods.iter().map(|m| (m.id.as_str(), m.mode)).collect();
    assert_eq!(
        modes,
        vec![
            ("shop.Orders/Place", CallMode::Unary),
            ("shop.Orders/Upload", CallMode::ClientStream),
            ("shop.Orders/Watch", CallMode::ServerStream),
            ("shop.Orders/Sync", CallMode::BidirectionalStream),
        ]
    );
}

#[test]
fn test_sample_request_body() {
    let services = walk(&shop_tree());
    let place = &services[0].methods[0];

    assert_eq!(
        place.request_body,
        json!({
            "id": 64000,
            "tags": [""],
            "items": [{ "sku": "", "price": 3.141592 }],
            "quantities": { "": 3200 },
            "status": 7,
            "note": { "text": "" },
            "card": 3200,
        })
    );
}

#[test]
fn test_oneof_samples_only_the_first_alternative() {
    let tree = SchemaTree::new(vec![SchemaNode::Message(
        MessageNode::new("Choice", vec![]).with_oneof(
            "pick",
            vec![
                FieldNode::plain("a", scalar(ScalarKind::Int32)),
                FieldNode::plain("b", scalar(ScalarKind::String)),
            ],
        ),
    )]);

    let body = SchemaWalker::new(&tree).sample_message("Choice").unwrap();
    assert_eq!(body, json!({ "a": 3200 }));
    assert!(body.get("b").is_none());
}

#[test]
fn test_repeated_field_samples_one_element() {
    let tree = SchemaTree::new(vec![]);
    let walker = SchemaWalker::new(&tree);

    let field = FieldNode::repeated("names", scalar(ScalarKind::String));
    assert_eq!(walker.sample_value(&field, ""), json!([""]));
}

#[test]
fn test_scalar_samples() {
    let samples: Vec<_> = [
        ScalarKind::String,
        ScalarKind::Bool,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::Uint32,
        ScalarKind::Uint64,
        ScalarKind::Sint32,
        ScalarKind::Sint64,
        ScalarKind::Fixed32,
        ScalarKind::Fixed64,
        ScalarKind::Sfixed32,
        ScalarKind::Sfixed64,
        ScalarKind::Double,
        ScalarKind::Float,
        ScalarKind::Bytes,
    ]
    .iter()
    .map(ScalarKind::sample)
    .collect();

    assert_eq!(
        samples,
        vec![
            json!(""),
            json!(true),
            json!(3200),
            json!(6400),
            json!(32000),
            json!(64000),
            json!(320),
            json!(640),
            json!(3200),
            json!(64000),
            json!(320),
            json!(640),
            json!(3.141592),
            json!(5.512322),
            json!(""),
        ]
    );
}

#[test]
fn test_map_keys_are_stringified() {
    let tree = SchemaTree::new(vec![]);
    let walker = SchemaWalker::new(&tree);

    let by_id = FieldNode::map("by_id", ScalarKind::Int64, scalar(ScalarKind::Bool));
    assert_eq!(walker.sample_value(&by_id, ""), json!({ "6400": true }));

    let flags = FieldNode::map("flags", ScalarKind::Bool, scalar(ScalarKind::String));
    assert_eq!(walker.sample_value(&flags, ""), json!({ "true": "" }));
}

#[test]
fn test_recursive_messages_terminate() {
    let tree = SchemaTree::new(vec![SchemaNode::Namespace(NamespaceNode {
        name: "fs".into(),
        nested: vec![SchemaNode::Message(MessageNode::new(
            "Dir",
            vec![
                FieldNode::plain("name", scalar(ScalarKind::String)),
                FieldNode::plain("parent", named("fs.Dir")),
                FieldNode::repeated("children", named("Dir")),
            ],
        ))],
    })]);

    let body = SchemaWalker::new(&tree).sample_message("fs.Dir").unwrap();
    assert_eq!(body, json!({ "name": "", "parent": {}, "children": [{}] }));
}

#[test]
#[traced_test]
fn test_unresolved_type_samples_null() {
    let tree = SchemaTree::new(vec![SchemaNode::Message(MessageNode::new(
        "Broken",
        vec![
            FieldNode::plain("ok", scalar(ScalarKind::Bool)),
            FieldNode::plain("ghost", named("nowhere.Ghost")),
        ],
    ))]);

    let body = SchemaWalker::new(&tree).sample_message("Broken").unwrap();
    assert_eq!(body, json!({ "ok": true, "ghost": null }));
    assert!(logs_contain("Could not resolve field type"));
}

#[test]
fn test_well_known_types_use_their_json_form() {
    let tree = SchemaTree::new(vec![SchemaNode::Message(MessageNode::new(
        "Event",
        vec![
            FieldNode::plain("at", named(".google.protobuf.Timestamp")),
            FieldNode::plain("took", named("google.protobuf.Duration")),
            FieldNode::plain("count", named("google.protobuf.Int32Value")),
            FieldNode::plain("note", named("google.protobuf.StringValue")),
            FieldNode::repeated("tags", named("google.protobuf.BoolValue")),
            FieldNode::plain("extra", named("google.protobuf.Struct")),
        ],
    ))]);

    let body = SchemaWalker::new(&tree).sample_message("Event").unwrap();
    assert_eq!(
        body,
        json!({
            "at": "1970-01-01T00:00:00Z",
            "took": "0s",
            "count": 3200,
            "note": "",
            "tags": [true],
            "extra": {},
        })
    );
}

#[test]
fn test_enum_samples_first_declared_value() {
    let tree = shop_tree();
    let walker = SchemaWalker::new(&tree);

    let field = FieldNode::plain("status", named("Status"));
    assert_eq!(walker.sample_value(&field, "shop.Order"), json!(7));
    assert_eq!(walker.sample_message("shop.Status"), None);
}

#[test]
fn test_walk_is_deterministic() {
    let tree = shop_tree();
    assert_eq!(walk(&tree), walk(&tree));
    assert_eq!(
        serde_json::to_string(&walk(&tree)).unwrap(),
        serde_json::to_string(&walk(&shop_tree())).unwrap()
    );
}

#[test]
fn test_services_in_nested_namespaces() {
    let tree = SchemaTree::new(vec![
        SchemaNode::Service(ServiceNode {
            name: "Root".into(),
            methods: vec![],
        }),
        SchemaNode::Namespace(NamespaceNode {
            name: "a".into(),
            nested: vec![SchemaNode::Namespace(NamespaceNode {
                name: "b".into(),
                nested: vec![SchemaNode::Service(ServiceNode {
                    name: "Deep".into(),
                    methods: vec![MethodNode::unary("Ping", "a.b.Missing", "a.b.Missing")],
                })],
            })],
        }),
    ]);

    let services = walk(&tree);
    assert_eq!(services[0].id, "Root");
    assert_eq!(services[0].namespace, "");
    assert_eq!(services[1].id, "a.b.Deep");
    assert_eq!(services[1].namespace, "a.b");
    assert_eq!(services[1].methods[0].id.as_str(), "a.b.Deep/Ping");
    assert_eq!(services[1].methods[0].request_body, json!(null));
}
