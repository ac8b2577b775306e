use super::tree::{
    FieldKind, FieldNode, MessageMember, MessageNode, ScalarKind, SchemaNode, SchemaTree,
    ServiceNode, TypeDef, TypeRef, TypeRegistry, qualify,
};
use crate::session::{CallMode, MethodId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A service found in the schema, with a stub for each of its methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Fully qualified service name, e.g. `my.package.Greeter`.
    pub id: String,
    /// Dotted namespace path, empty for services declared at the root.
    pub namespace: String,
    pub name: String,
    pub methods: Vec<MethodStub>,
}

/// Everything needed to call a method: its address, its call mode and a sample request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodStub {
    pub id: MethodId,
    pub namespace: String,
    pub service_name: String,
    pub name: String,
    pub mode: CallMode,
    pub request_body: Value,
}

/// Walks `tree` and returns every service it declares, in declaration order.
pub fn walk(tree: &SchemaTree) -> Vec<Service> {
    SchemaWalker::new(tree).walk()
}

/// Turns a [`SchemaTree`] into [`Service`]s with deterministic sample request bodies.
///
/// Sampling rules:
///
/// * Scalars get a fixed representative literal (see [`ScalarKind::sample`]).
/// * Enums get the number of their first declared value.
/// * Oneof groups contribute only their first declared alternative.
/// * Maps get a single entry, repeated fields a single element.
/// * `google.protobuf` well-known types get a value in their JSON form, e.g. an RFC 3339 string
///   for `Timestamp` or the bare scalar for the wrapper types.
/// * Named types are looked up by fully qualified name first. When that fails they are resolved
///   once relative to the declaring message's scope. If that fails too the field samples to `null`.
/// * A message that is already being sampled further up the current path samples to `{}`, which
///   keeps self-referencing messages finite.
pub struct SchemaWalker<'a> {
    tree: &'a SchemaTree,
    registry: TypeRegistry<'a>,
}

impl<'a> SchemaWalker<'a> {
    pub fn new(tree: &'a SchemaTree) -> Self {
        Self {
            tree,
            registry: TypeRegistry::index(tree),
        }
    }

    pub fn walk(&self) -> Vec<Service> {
        let mut services = vec![];
        self.walk_nodes("", &self.tree.nodes, &mut services);
        services
    }

    fn walk_nodes(&self, namespace: &str, nodes: &[SchemaNode], services: &mut Vec<Service>) {
        for node in nodes {
            match node {
                SchemaNode::Namespace(ns) => {
                    self.walk_nodes(&qualify(namespace, &ns.name), &ns.nested, services)
                }
                SchemaNode::Service(service) => services.push(self.service(namespace, service)),
                SchemaNode::Message(_) | SchemaNode::Enum(_) => {}
            }
        }
    }

    fn service(&self, namespace: &str, service: &ServiceNode) -> Service {
        let full_name = qualify(namespace, &service.name);

        let methods = service
            .methods
            .iter()
            .map(|method| MethodStub {
                id: MethodId::new(&full_name, &method.name),
                namespace: namespace.to_string(),
                service_name: service.name.clone(),
                name: method.name.clone(),
                mode: CallMode::from_flags(method.client_streaming, method.server_streaming),
                request_body: self.type_value(
                    &TypeRef::Named(method.input_type.clone()),
                    namespace,
                    &mut vec![],
                ),
            })
            .collect();

        tracing::debug!(service = %full_name, "Walked service");

        Service {
            id: full_name,
            namespace: namespace.to_string(),
            name: service.name.clone(),
            methods,
        }
    }

    /// Samples the message named `name` (fully qualified). Returns `None` if it is not a message
    /// of this schema.
    pub fn sample_message(&self, name: &str) -> Option<Value> {
        match self.registry.get(name)? {
            (full_name, TypeDef::Message(message)) => {
                Some(self.message_value(&full_name, message, &mut vec![]))
            }
            (_, TypeDef::Enum(_)) => None,
        }
    }

    /// Samples a single field declared inside the message `scope`.
    pub fn sample_value(&self, field: &FieldNode, scope: &str) -> Value {
        self.field_value(field, scope, &mut vec![])
    }

    fn message_value(&self, full_name: &str, message: &MessageNode, path: &mut Vec<String>) -> Value {
        if path.iter().any(|visited| visited == full_name) {
            return Value::Object(Map::new());
        }
        path.push(full_name.to_string());

        let mut fields = Map::new();
        for member in &message.members {
            let field = match member {
                MessageMember::Field(field) => field,
                MessageMember::OneOf(group) => match group.fields.first() {
                    Some(first) => first,
                    None => continue,
                },
            };
            let value = self.field_value(field, full_name, path);
            fields.insert(field.name.clone(), value);
        }

        path.pop();
        Value::Object(fields)
    }

    fn field_value(&self, field: &FieldNode, scope: &str, path: &mut Vec<String>) -> Value {
        match &field.kind {
            FieldKind::Map { key, value } => {
                let mut entry = Map::new();
                entry.insert(map_key(*key), self.type_value(value, scope, path));
                Value::Object(entry)
            }
            FieldKind::Plain(ty) if field.repeated => {
                Value::Array(vec![self.type_value(ty, scope, path)])
            }
            FieldKind::Plain(ty) => self.type_value(ty, scope, path),
        }
    }

    fn type_value(&self, ty: &TypeRef, scope: &str, path: &mut Vec<String>) -> Value {
        let name = match ty {
            TypeRef::Scalar(kind) => return kind.sample(),
            TypeRef::Named(name) => name,
        };

        let resolved = self.resolve(name, scope);
        let full_name = match &resolved {
            Some((full_name, _)) => full_name.as_str(),
            None => name.trim_start_matches('.'),
        };
        if let Some(value) = well_known_value(full_name) {
            return value;
        }

        match resolved {
            Some((full_name, TypeDef::Message(message))) => {
                self.message_value(&full_name, message, path)
            }
            Some((_, TypeDef::Enum(enum_node))) => enum_node
                .values
                .first()
                .map(|value| Value::from(value.number))
                .unwrap_or(Value::Null),
            None => {
                tracing::warn!(type_name = %name, scope, "Could not resolve field type, sampling null");
                Value::Null
            }
        }
    }

    fn resolve(&self, name: &str, scope: &str) -> Option<(String, TypeDef<'a>)> {
        self.registry.get(name).or_else(|| {
            tracing::debug!(type_name = %name, scope, "Resolving type relative to its scope");
            self.registry.resolve_in_scope(name, scope)
        })
    }
}

impl ScalarKind {
    /// The representative literal used in sample request bodies.
    pub fn sample(&self) -> Value {
        match self {
            ScalarKind::String => Value::from(""),
            ScalarKind::Bool => Value::from(true),
            ScalarKind::Int32 | ScalarKind::Fixed32 => Value::from(3200),
            ScalarKind::Int64 => Value::from(6400),
            ScalarKind::Uint32 => Value::from(32000),
            ScalarKind::Uint64 | ScalarKind::Fixed64 => Value::from(64000),
            ScalarKind::Sint32 | ScalarKind::Sfixed32 => Value::from(320),
            ScalarKind::Sint64 | ScalarKind::Sfixed64 => Value::from(640),
            ScalarKind::Double => Value::from(3.141592),
            ScalarKind::Float => Value::from(5.512322),
            // Protobuf JSON carries bytes as base64 strings.
            ScalarKind::Bytes => Value::from(""),
        }
    }
}

/// Samples for the `google.protobuf` types whose JSON form is not an object of their fields.
fn well_known_value(full_name: &str) -> Option<Value> {
    let value = match full_name.strip_prefix("google.protobuf.")? {
        "Timestamp" => Value::from("1970-01-01T00:00:00Z"),
        "Duration" => Value::from("0s"),
        "FieldMask" => Value::from(""),
        "Struct" | "Empty" => Value::Object(Map::new()),
        "ListValue" => Value::Array(vec![]),
        "Value" => Value::from(""),
        "DoubleValue" => ScalarKind::Double.sample(),
        "FloatValue" => ScalarKind::Float.sample(),
        "Int64Value" => ScalarKind::Int64.sample(),
        "UInt64Value" => ScalarKind::Uint64.sample(),
        "Int32Value" => ScalarKind::Int32.sample(),
        "UInt32Value" => ScalarKind::Uint32.sample(),
        "BoolValue" => ScalarKind::Bool.sample(),
        "StringValue" => ScalarKind::String.sample(),
        "BytesValue" => ScalarKind::Bytes.sample(),
        _ => return None,
    };
    Some(value)
}

fn map_key(kind: ScalarKind) -> String {
    match kind.sample() {
        Value::String(key) => key,
        other => other.to_string(),
    }
}
