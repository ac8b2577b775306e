use std::collections::HashMap;

/// Scalar Protobuf field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Scalar(ScalarKind),
    /// A message or enum, referenced by name.
    ///
    /// The name is either fully qualified (optionally with a leading `.`) or relative to the scope
    /// of the message that declares the field.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Plain(TypeRef),
    Map { key: ScalarKind, value: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub name: String,
    pub kind: FieldKind,
    pub repeated: bool,
}

impl FieldNode {
    pub fn plain(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Plain(ty),
            repeated: false,
        }
    }

    pub fn repeated(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            repeated: true,
            ..Self::plain(name, ty)
        }
    }

    pub fn map(name: impl Into<String>, key: ScalarKind, value: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Map { key, value },
            repeated: false,
        }
    }
}

/// A oneof group. Alternatives are kept in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOfNode {
    pub name: String,
    pub fields: Vec<FieldNode>,
}

/// A member of a message body, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageMember {
    Field(FieldNode),
    OneOf(OneOfNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNode {
    pub name: String,
    pub members: Vec<MessageMember>,
    /// Messages and enums declared inside this message.
    pub nested: Vec<SchemaNode>,
}

impl MessageNode {
    pub fn new(name: impl Into<String>, fields: Vec<FieldNode>) -> Self {
        Self {
            name: name.into(),
            members: fields.into_iter().map(MessageMember::Field).collect(),
            nested: vec![],
        }
    }

    pub fn with_oneof(mut self, name: impl Into<String>, fields: Vec<FieldNode>) -> Self {
        self.members.push(MessageMember::OneOf(OneOfNode {
            name: name.into(),
            fields,
        }));
        self
    }

    pub fn with_nested(mut self, node: SchemaNode) -> Self {
        self.nested.push(node);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueNode {
    pub name: String,
    pub number: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumNode {
    pub name: String,
    /// Values in declaration order, which is not necessarily numeric order.
    pub values: Vec<EnumValueNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNode {
    pub name: String,
    pub input_type: String,
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

impl MethodNode {
    pub fn unary(
        name: impl Into<String>,
        input_type: impl Into<String>,
        output_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.into(),
            output_type: output_type.into(),
            client_streaming: false,
            server_streaming: false,
        }
    }

    pub fn streaming(mut self, client_streaming: bool, server_streaming: bool) -> Self {
        self.client_streaming = client_streaming;
        self.server_streaming = server_streaming;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNode {
    pub name: String,
    pub methods: Vec<MethodNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNode {
    pub name: String,
    pub nested: Vec<SchemaNode>,
}

/// A node of a parsed schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Namespace(NamespaceNode),
    Service(ServiceNode),
    Message(MessageNode),
    Enum(EnumNode),
}

/// The root of a parsed schema: the top-level nodes of the anonymous root namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaTree {
    pub nodes: Vec<SchemaNode>,
}

impl SchemaTree {
    pub fn new(nodes: Vec<SchemaNode>) -> Self {
        Self { nodes }
    }
}

/// A message or enum found by [`TypeRegistry`].
#[derive(Debug, Clone, Copy)]
pub enum TypeDef<'a> {
    Message(&'a MessageNode),
    Enum(&'a EnumNode),
}

/// Index of every message and enum of a [`SchemaTree`], keyed by fully qualified name.
#[derive(Debug, Default)]
pub struct TypeRegistry<'a> {
    types: HashMap<String, TypeDef<'a>>,
}

impl<'a> TypeRegistry<'a> {
    pub fn index(tree: &'a SchemaTree) -> Self {
        let mut registry = Self::default();
        registry.index_nodes("", &tree.nodes);
        registry
    }

    fn index_nodes(&mut self, scope: &str, nodes: &'a [SchemaNode]) {
        for node in nodes {
            match node {
                SchemaNode::Namespace(ns) => {
                    self.index_nodes(&qualify(scope, &ns.name), &ns.nested);
                }
                SchemaNode::Message(message) => {
                    let full_name = qualify(scope, &message.name);
                    self.index_nodes(&full_name, &message.nested);
                    self.types.insert(full_name, TypeDef::Message(message));
                }
                SchemaNode::Enum(enum_node) => {
                    self.types
                        .insert(qualify(scope, &enum_node.name), TypeDef::Enum(enum_node));
                }
                SchemaNode::Service(_) => {}
            }
        }
    }

    /// Direct lookup by fully qualified name. A leading `.` is ignored.
    pub fn get(&self, name: &str) -> Option<(String, TypeDef<'a>)> {
        let name = name.trim_start_matches('.');
        self.types
            .get(name)
            .map(|def| (name.to_string(), *def))
    }

    /// Resolves `name` relative to `scope`, trying the innermost scope first and walking outwards
    /// (`a.b.C.name`, `a.b.name`, `a.name`, `name`).
    pub fn resolve_in_scope(&self, name: &str, scope: &str) -> Option<(String, TypeDef<'a>)> {
        let mut scope = scope;
        loop {
            if let Some(found) = self.get(&qualify(scope, name)) {
                return Some(found);
            }
            if scope.is_empty() {
                return None;
            }
            scope = scope.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("");
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

pub(crate) fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}
