//! # Schema
//!
//! Everything needed to go from a parsed Protobuf schema to ready-to-edit method stubs.
//!
//! * **[`SchemaTree`]:** an owned descriptor tree made of [`SchemaNode`] variants (namespaces,
//!   services, messages and enums). It can be built by hand or from a binary `FileDescriptorSet`
//!   (see [`SchemaTree::from_descriptor_set`]).
//! * **[`SchemaWalker`]:** walks the tree, producing one [`Service`] per service node, each with a
//!   [`MethodStub`] per method carrying a deterministic sample request body.
//!
//! ## Example
//!
//! ```rust
//! use rpcdeck_core::schema::{FieldNode, MessageNode, MethodNode, NamespaceNode, ScalarKind,
//!     SchemaNode, SchemaTree, ServiceNode, TypeRef, walk};
//!
//! let tree = SchemaTree::new(vec![SchemaNode::Namespace(NamespaceNode {
//!     name: "greet".into(),
//!     nested: vec![
//!         SchemaNode::Message(MessageNode::new(
//!             "Hello",
//!             vec![FieldNode::plain("name", TypeRef::Scalar(ScalarKind::String))],
//!         )),
//!         SchemaNode::Service(ServiceNode {
//!             name: "Greeter".into(),
//!             methods: vec![MethodNode::unary("SayHello", "greet.Hello", "greet.Hello")],
//!         }),
//!     ],
//! })]);
//!
//! let services = walk(&tree);
//! assert_eq!(services[0].methods[0].id.as_str(), "greet.Greeter/SayHello");
//! assert_eq!(services[0].methods[0].request_body, serde_json::json!({ "name": "" }));
//! ```
mod pool;
mod tree;
mod walker;

pub use tree::*;
pub use walker::*;
