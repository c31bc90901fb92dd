//! Marshal/unmarshal rules for host types.
//!
//! A [`Registry`] is frozen once built. New rules go through a
//! [`RegistryBuilder`], which starts from the built-in rules (object trees,
//! links, big integers) and appends host rules in registration order.

use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dagcbor_types::{Cid, Link, Node};
use num_bigint::BigUint;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::bigint::from_magnitude;
use crate::de::from_node;
use crate::error::{CodecError, CodecResult, RegistryError};
use crate::ser::to_node;

type MarshalFn = dyn Fn(&dyn Any) -> CodecResult<Node> + Send + Sync;
type UnmarshalFn = dyn Fn(Node) -> CodecResult<Box<dyn Any + Send>> + Send + Sync;
type AssignFn = fn(Box<dyn Any + Send>, &mut dyn Any) -> bool;

/// How one host type becomes an object tree and back.
#[derive(Clone)]
pub struct TypeRule {
    type_id: TypeId,
    type_name: &'static str,
    marshal: Arc<MarshalFn>,
    unmarshal: Arc<UnmarshalFn>,
    assign: AssignFn,
}

impl TypeRule {
    /// A rule from explicit transform functions.
    pub fn new<T, M, U>(marshal: M, unmarshal: U) -> Self
    where
        T: Any + Send,
        M: Fn(&T) -> CodecResult<Node> + Send + Sync + 'static,
        U: Fn(Node) -> CodecResult<T> + Send + Sync + 'static,
    {
        let type_name = any::type_name::<T>();
        Self {
            type_id: TypeId::of::<T>(),
            type_name,
            marshal: Arc::new(move |value: &dyn Any| match value.downcast_ref::<T>() {
                Some(v) => marshal(v),
                None => Err(CodecError::TypeMismatch {
                    expected: type_name,
                }),
            }),
            unmarshal: Arc::new(move |node: Node| {
                unmarshal(node).map(|v| Box::new(v) as Box<dyn Any + Send>)
            }),
            assign: assign::<T>,
        }
    }

    /// A rule derived from the type's serde implementation. Field order
    /// does not matter; map keys are sorted on encode.
    pub fn derived<T>() -> Self
    where
        T: Serialize + DeserializeOwned + Any + Send,
    {
        Self::new::<T, _, _>(|value: &T| to_node(value), from_node::<T>)
    }

    /// The host type this rule covers.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the host type, for error messages.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn marshal(&self, value: &dyn Any) -> CodecResult<Node> {
        (self.marshal)(value)
    }

    pub(crate) fn unmarshal(&self, node: Node) -> CodecResult<Box<dyn Any + Send>> {
        (self.unmarshal)(node)
    }

    /// Unmarshal into an existing slot of this rule's type.
    pub(crate) fn unmarshal_into(&self, node: Node, slot: &mut dyn Any) -> CodecResult<()> {
        let value = self.unmarshal(node)?;
        if (self.assign)(value, slot) {
            Ok(())
        } else {
            Err(CodecError::TypeMismatch {
                expected: self.type_name,
            })
        }
    }
}

impl fmt::Debug for TypeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRule")
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn assign<T: Any>(value: Box<dyn Any + Send>, slot: &mut dyn Any) -> bool {
    match (value.downcast::<T>(), slot.downcast_mut::<T>()) {
        (Ok(value), Some(slot)) => {
            *slot = *value;
            true
        }
        _ => false,
    }
}

fn link_target(node: Node) -> CodecResult<Cid> {
    match node {
        Node::Link(cid) => Ok(cid),
        other => Err(CodecError::UnexpectedKind {
            expected: "link",
            found: other.kind(),
        }),
    }
}

fn builtin_rules() -> Vec<TypeRule> {
    vec![
        TypeRule::new::<Node, _, _>(|node: &Node| Ok(node.clone()), |node: Node| Ok(node)),
        TypeRule::new::<Cid, _, _>(|cid: &Cid| Ok(Node::Link(*cid)), link_target),
        TypeRule::new::<Link, _, _>(
            |link: &Link| Ok(Node::Link(link.0)),
            |node: Node| link_target(node).map(Link),
        ),
        TypeRule::new::<BigUint, _, _>(
            |n: &BigUint| Ok(Node::BigInt(n.clone())),
            |node: Node| match node {
                Node::Bytes(b) => Ok(from_magnitude(&b)),
                Node::BigInt(n) => Ok(n),
                other => Err(CodecError::UnexpectedKind {
                    expected: "bytes",
                    found: other.kind(),
                }),
            },
        ),
    ]
}

/// An immutable rule set. Cloning shares the underlying table.
#[derive(Clone)]
pub struct Registry {
    rules: Arc<[TypeRule]>,
    index: Arc<HashMap<TypeId, usize>>,
}

impl Registry {
    /// A builder seeded with the built-in rules.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            rules: builtin_rules(),
        }
    }

    /// A builder seeded with this registry's rules.
    pub fn to_builder(&self) -> RegistryBuilder {
        RegistryBuilder {
            rules: self.rules.to_vec(),
        }
    }

    /// Look up the rule for a host type.
    pub fn rule_for(&self, type_id: TypeId) -> Option<&TypeRule> {
        self.index.get(&type_id).map(|&i| &self.rules[i])
    }

    /// Whether `T` has a rule.
    pub fn contains<T: Any>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    /// Rule type names in registration order.
    pub fn rules(&self) -> Vec<&'static str> {
        self.rules.iter().map(TypeRule::type_name).collect()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("rules", &self.rules())
            .finish()
    }
}

/// Collects rules before they are frozen into a [`Registry`].
#[derive(Debug)]
pub struct RegistryBuilder {
    rules: Vec<TypeRule>,
}

impl RegistryBuilder {
    /// Append a rule. A second rule for the same type is rejected and the
    /// builder keeps the first.
    pub fn register(&mut self, rule: TypeRule) -> Result<&mut Self, RegistryError> {
        if self.rules.iter().any(|r| r.type_id == rule.type_id) {
            return Err(RegistryError::Conflict(rule.type_name));
        }
        self.rules.push(rule);
        Ok(self)
    }

    /// Append a rule derived from `T`'s serde implementation.
    pub fn register_type<T>(&mut self) -> Result<&mut Self, RegistryError>
    where
        T: Serialize + DeserializeOwned + Any + Send,
    {
        self.register(TypeRule::derived::<T>())
    }

    /// Finish the rule set.
    pub fn build(self) -> Registry {
        let index = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.type_id, i))
            .collect();
        debug!(rules = self.rules.len(), "built cbor rule set");
        Registry {
            rules: self.rules.into(),
            index: Arc::new(index),
        }
    }
}
