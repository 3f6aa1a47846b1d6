//! Resource nodes: single declared infrastructure units.

use std::collections::BTreeMap;

use cairn_common::types::{NodeId, NodeOrigin, ResourceKind};

use crate::token::AttributeValue;

/// One declared infrastructure unit.
///
/// A node is assembled with the builder methods and then handed to
/// [`Stack::declare`](crate::stack::Stack::declare), which validates it against
/// the catalog and takes ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    id: NodeId,
    kind: ResourceKind,
    origin: NodeOrigin,
    attributes: BTreeMap<String, AttributeValue>,
}

impl ResourceNode {
    /// Starts a managed node of the given kind.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            origin: NodeOrigin::Managed,
            attributes: BTreeMap::new(),
        }
    }

    /// Starts a node standing for a resource that already exists.
    #[must_use]
    pub fn imported(
        id: impl Into<NodeId>,
        kind: ResourceKind,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            origin: NodeOrigin::Imported {
                identifier: identifier.into(),
            },
            attributes: BTreeMap::new(),
        }
    }

    /// Sets an attribute, replacing any previous value.
    #[must_use]
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let _ = self.attributes.insert(attribute.into(), value.into());
        self
    }

    /// Node id, unique within its stack.
    #[must_use]
    pub const fn id(&self) -> &NodeId {
        &self.id
    }

    /// Resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Whether the deployment creates this resource.
    #[must_use]
    pub const fn origin(&self) -> &NodeOrigin {
        &self.origin
    }

    /// Declared attributes, keyed by name.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// Value of one declared attribute.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.attributes.get(attribute)
    }
}
