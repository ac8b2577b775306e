//! Builds a [`SchemaTree`] out of a `prost-reflect` [`DescriptorPool`].
//!
//! Packages become nested [`NamespaceNode`]s (`a.b` becomes `a` containing `b`). Every type
//! reference is emitted fully qualified, so no scope resolution is needed for trees built here.
use super::tree::{
    EnumNode, EnumValueNode, FieldKind, FieldNode, MessageMember, MessageNode, MethodNode,
    NamespaceNode, OneOfNode, ScalarKind, SchemaNode, SchemaTree, ServiceNode, TypeRef,
};
use prost_reflect::{
    DescriptorError, DescriptorPool, EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor,
    ServiceDescriptor,
};

impl SchemaTree {
    /// Decodes a binary `FileDescriptorSet` and converts it into a tree.
    pub fn from_descriptor_set(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let pool = DescriptorPool::decode(bytes)?;
        Ok(Self::from(&pool))
    }
}

impl From<&DescriptorPool> for SchemaTree {
    fn from(pool: &DescriptorPool) -> Self {
        let mut nodes = vec![];

        for file in pool.files() {
            let package: Vec<&str> = file
                .package_name()
                .split('.')
                .filter(|segment| !segment.is_empty())
                .collect();
            let scope = namespace_mut(&mut nodes, &package);

            scope.extend(file.enums().map(|e| SchemaNode::Enum(enum_node(&e))));
            scope.extend(file.messages().map(|m| SchemaNode::Message(message_node(&m))));
            scope.extend(file.services().map(|s| SchemaNode::Service(service_node(&s))));
        }

        SchemaTree::new(nodes)
    }
}

fn namespace_mut<'a>(nodes: &'a mut Vec<SchemaNode>, path: &[&str]) -> &'a mut Vec<SchemaNode> {
    let Some((head, rest)) = path.split_first() else {
        return nodes;
    };

    let position = nodes
        .iter()
        .position(|node| matches!(node, SchemaNode::Namespace(ns) if ns.name == *head));

    let index = match position {
        Some(index) => index,
        None => {
            nodes.push(SchemaNode::Namespace(NamespaceNode {
                name: head.to_string(),
                nested: vec![],
            }));
            nodes.len() - 1
        }
    };

    match &mut nodes[index] {
        SchemaNode::Namespace(ns) => namespace_mut(&mut ns.nested, rest),
        _ => unreachable!("position only matches namespace nodes"),
    }
}

fn service_node(service: &ServiceDescriptor) -> ServiceNode {
    ServiceNode {
        name: service.name().to_string(),
        methods: service
            .methods()
            .map(|method| {
                MethodNode::unary(
                    method.name(),
                    method.input().full_name(),
                    method.output().full_name(),
                )
                .streaming(method.is_client_streaming(), method.is_server_streaming())
            })
            .collect(),
    }
}

fn message_node(message: &MessageDescriptor) -> MessageNode {
    let mut members = vec![];

    for field in message.fields() {
        match field.containing_oneof() {
            Some(oneof) if !oneof.is_synthetic() => {
                let seen = members.iter().any(
                    |member| matches!(member, MessageMember::OneOf(group) if group.name == oneof.name()),
                );
                if !seen {
                    members.push(MessageMember::OneOf(OneOfNode {
                        name: oneof.name().to_string(),
                        fields: oneof.fields().map(|f| field_node(&f)).collect(),
                    }));
                }
            }
            _ => members.push(MessageMember::Field(field_node(&field))),
        }
    }

    let nested = message
        .child_enums()
        .map(|e| SchemaNode::Enum(enum_node(&e)))
        .chain(
            message
                .child_messages()
                .filter(|m| !m.is_map_entry())
                .map(|m| SchemaNode::Message(message_node(&m))),
        )
        .collect();

    MessageNode {
        name: message.name().to_string(),
        members,
        nested,
    }
}

fn field_node(field: &FieldDescriptor) -> FieldNode {
    if field.is_map()
        && let Kind::Message(entry) = field.kind()
    {
        let key = scalar_kind(&entry.map_entry_key_field().kind()).unwrap_or(ScalarKind::String);
        let value = type_ref(&entry.map_entry_value_field().kind());
        return FieldNode::map(field.name(), key, value);
    }

    FieldNode {
        name: field.name().to_string(),
        kind: FieldKind::Plain(type_ref(&field.kind())),
        repeated: field.is_list(),
    }
}

fn enum_node(enum_desc: &EnumDescriptor) -> EnumNode {
    EnumNode {
        name: enum_desc.name().to_string(),
        values: enum_desc
            .values()
            .map(|value| EnumValueNode {
                name: value.name().to_string(),
                number: value.number(),
            })
            .collect(),
    }
}

fn type_ref(kind: &Kind) -> TypeRef {
    match kind {
        Kind::Message(message) => TypeRef::Named(message.full_name().to_string()),
        Kind::Enum(enum_desc) => TypeRef::Named(enum_desc.full_name().to_string()),
        scalar => TypeRef::Scalar(scalar_kind(scalar).unwrap_or(ScalarKind::Bytes)),
    }
}

fn scalar_kind(kind: &Kind) -> Option<ScalarKind> {
    let scalar = match kind {
        Kind::Double => ScalarKind::Double,
        Kind::Float => ScalarKind::Float,
        Kind::Int32 => ScalarKind::Int32,
        Kind::Int64 => ScalarKind::Int64,
        Kind::Uint32 => ScalarKind::Uint32,
        Kind::Uint64 => ScalarKind::Uint64,
        Kind::Sint32 => ScalarKind::Sint32,
        Kind::Sint64 => ScalarKind::Sint64,
        Kind::Fixed32 => ScalarKind::Fixed32,
        Kind::Fixed64 => ScalarKind::Fixed64,
        Kind::Sfixed32 => ScalarKind::Sfixed32,
        Kind::Sfixed64 => ScalarKind::Sfixed64,
        Kind::Bool => ScalarKind::Bool,
        Kind::String => ScalarKind::String,
        Kind::Bytes => ScalarKind::Bytes,
        Kind::Message(_) | Kind::Enum(_) => return None,
    };
    Some(scalar)
}
