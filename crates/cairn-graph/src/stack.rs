//! Stacks: named, ordered collections of resource nodes.
//!
//! A stack owns its nodes exclusively. Cross-stack relationships exist only
//! as tokens stored in node attributes or as explicit dependencies recorded
//! by the composition graph.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use cairn_common::error::{CairnError, Result};
use cairn_common::types::{NodeId, ResourceKind, StackName};

use crate::catalog::{Availability, ResourceCatalog};
use crate::node::ResourceNode;
use crate::token::{AttributeValue, OutputToken};

/// A token consumed by a node of this stack, recorded at declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReference {
    /// Consuming node.
    pub consumer: NodeId,
    /// Attribute of the consumer holding the token.
    pub attribute: String,
    /// The consumed token.
    pub token: OutputToken,
}

/// A named deployable grouping of resource nodes.
#[derive(Debug, Clone)]
pub struct Stack {
    name: StackName,
    catalog: Arc<ResourceCatalog>,
    nodes: Vec<ResourceNode>,
    index: HashMap<NodeId, usize>,
    references: Vec<TokenReference>,
    explicit_dependencies: BTreeSet<StackName>,
}

impl Stack {
    /// Creates an empty stack validated against `catalog`.
    #[must_use]
    pub fn new(name: impl Into<StackName>, catalog: Arc<ResourceCatalog>) -> Self {
        Self {
            name: name.into(),
            catalog,
            nodes: Vec::new(),
            index: HashMap::new(),
            references: Vec::new(),
            explicit_dependencies: BTreeSet::new(),
        }
    }

    /// Stack name.
    #[must_use]
    pub const fn name(&self) -> &StackName {
        &self.name
    }

    /// Catalog the stack validates declarations against.
    #[must_use]
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.index
            .get(&NodeId::new(id))
            .and_then(|&pos| self.nodes.get(pos))
    }

    /// Tokens consumed by this stack's nodes, in declaration order.
    #[must_use]
    pub fn references(&self) -> &[TokenReference] {
        &self.references
    }

    /// Stacks this one was explicitly declared to depend on.
    #[must_use]
    pub const fn explicit_dependencies(&self) -> &BTreeSet<StackName> {
        &self.explicit_dependencies
    }

    /// Declares a node in this stack.
    ///
    /// Validation runs before anything is stored, so a failed declaration
    /// leaves the stack untouched.
    ///
    /// # Errors
    ///
    /// - `DuplicateNode` if the id is already used in this stack.
    /// - `UnknownAttribute` if an attribute is not in the kind's schema.
    /// - `InvalidAttribute` if a deferred attribute is given a token, or an
    ///   imported node is given any token.
    pub fn declare(&mut self, node: ResourceNode) -> Result<()> {
        if self.index.contains_key(node.id()) {
            return Err(CairnError::DuplicateNode {
                stack: self.name.to_string(),
                node: node.id().to_string(),
            });
        }
        self.check_attributes(&node)?;

        for (attribute, value) in node.attributes() {
            for token in value.tokens() {
                tracing::debug!(
                    producer = %token,
                    stack = %self.name,
                    node = %node.id(),
                    attribute = %attribute,
                    "recorded token reference"
                );
                self.references.push(TokenReference {
                    consumer: node.id().clone(),
                    attribute: attribute.clone(),
                    token: token.clone(),
                });
            }
        }

        tracing::debug!(stack = %self.name, node = %node.id(), kind = %node.kind(), "declared node");
        let _ = self.index.insert(node.id().clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Declares an existing resource looked up by `identifier`.
    ///
    /// The node carries no attributes; its outputs are still tokens so
    /// consumers are ordered after this stack.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if the id is already used in this stack.
    pub fn declare_imported(
        &mut self,
        id: impl Into<NodeId>,
        kind: ResourceKind,
        identifier: impl Into<String>,
    ) -> Result<()> {
        self.declare(ResourceNode::imported(id, kind, identifier))
    }

    fn check_attributes(&self, node: &ResourceNode) -> Result<()> {
        for (attribute, value) in node.attributes() {
            let availability = self
                .catalog
                .availability(node.kind(), attribute)
                .ok_or_else(|| CairnError::UnknownAttribute {
                    node: node.id().to_string(),
                    kind: node.kind().to_string(),
                    attribute: attribute.clone(),
                })?;

            if value.is_concrete() {
                continue;
            }
            if node.origin().is_imported() {
                return Err(CairnError::InvalidAttribute {
                    node: node.id().to_string(),
                    attribute: attribute.clone(),
                    message: "imported resources cannot consume tokens".into(),
                });
            }
            if availability == Availability::Deferred {
                return Err(CairnError::InvalidAttribute {
                    node: node.id().to_string(),
                    attribute: attribute.clone(),
                    message: "a deferred attribute can only be pinned to a concrete value".into(),
                });
            }
        }
        Ok(())
    }

    /// Requests an attribute of a declared node.
    ///
    /// Declared attributes set to a concrete value come back as given.
    /// Everything else is not known yet and comes back as a token bound to
    /// this node, including declared attributes that hold a token; a deferred
    /// attribute pinned at declaration carries the pinned value in the token.
    ///
    /// # Errors
    ///
    /// - `UnknownNode` if no node has this id.
    /// - `UnknownAttribute` if the node's kind has no such attribute.
    pub fn attribute(&self, node: &str, attribute: &str) -> Result<AttributeValue> {
        let declared = self.node(node).ok_or_else(|| CairnError::UnknownNode {
            stack: self.name.to_string(),
            node: node.to_owned(),
        })?;
        let availability = self
            .catalog
            .availability(declared.kind(), attribute)
            .ok_or_else(|| CairnError::UnknownAttribute {
                node: node.to_owned(),
                kind: declared.kind().to_string(),
                attribute: attribute.to_owned(),
            })?;

        let value = match (availability, declared.get(attribute)) {
            (Availability::Declared, Some(value)) if value.is_concrete() => value.clone(),
            (Availability::Deferred, pinned) => AttributeValue::Token(OutputToken::new(
                self.name.clone(),
                declared.id().clone(),
                attribute,
                pinned.and_then(AttributeValue::as_concrete).cloned(),
            )),
            (Availability::Declared, _) => AttributeValue::Token(OutputToken::new(
                self.name.clone(),
                declared.id().clone(),
                attribute,
                None,
            )),
        };
        Ok(value)
    }

    /// Requests an attribute and requires it to be a single token.
    ///
    /// # Errors
    ///
    /// Same as [`Stack::attribute`], plus `InvalidAttribute` if the attribute
    /// is concrete or a list.
    pub fn output(&self, node: &str, attribute: &str) -> Result<OutputToken> {
        match self.attribute(node, attribute)? {
            AttributeValue::Token(token) => Ok(token),
            _ => Err(CairnError::InvalidAttribute {
                node: node.to_owned(),
                attribute: attribute.to_owned(),
                message: "attribute is not an output token".into(),
            }),
        }
    }

    pub(crate) fn add_explicit_dependency(&mut self, dependency: StackName) -> bool {
        self.explicit_dependencies.insert(dependency)
    }
}
