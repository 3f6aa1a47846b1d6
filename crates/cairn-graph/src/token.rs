//! Attribute values and output tokens.
//!
//! An [`OutputToken`] stands in for an attribute whose value is assigned only
//! when the producing resource is created. Tokens are plain back-references:
//! holding one never implies ownership of the producer.

use std::collections::BTreeMap;
use std::fmt;

use cairn_common::constants::{PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN};
use cairn_common::types::{NodeId, StackName};
use serde::Serialize;
use serde_json::Value;

/// Deferred reference to an attribute of a resource node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputToken {
    stack: StackName,
    node: NodeId,
    attribute: String,
    resolved: Option<Value>,
}

impl OutputToken {
    /// Tokens are only minted by a stack when an attribute is requested.
    pub(crate) fn new(
        stack: StackName,
        node: NodeId,
        attribute: impl Into<String>,
        resolved: Option<Value>,
    ) -> Self {
        Self {
            stack,
            node,
            attribute: attribute.into(),
            resolved,
        }
    }

    /// Stack owning the producer node.
    #[must_use]
    pub const fn stack(&self) -> &StackName {
        &self.stack
    }

    /// Producer node id.
    #[must_use]
    pub const fn node(&self) -> &NodeId {
        &self.node
    }

    /// Attribute of the producer this token stands for.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Value pinned by the producer's declaration, if any.
    #[must_use]
    pub const fn resolved(&self) -> Option<&Value> {
        self.resolved.as_ref()
    }

    /// Placeholder string substituted at deployment time.
    #[must_use]
    pub fn placeholder(&self) -> String {
        format!("{PLACEHOLDER_OPEN}{self}{PLACEHOLDER_CLOSE}")
    }
}

impl fmt::Display for OutputToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.stack, self.node, self.attribute)
    }
}

/// Value of a node attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Known at declaration time.
    Concrete(Value),
    /// Known only once the producer is provisioned.
    Token(OutputToken),
    /// Ordered collection mixing concrete values and tokens.
    List(Vec<AttributeValue>),
    /// Keyed collection mixing concrete values and tokens.
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Builds a map value from key/value pairs.
    #[must_use]
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Returns `true` if this value holds no token at any depth.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        match self {
            Self::Concrete(_) => true,
            Self::Token(_) => false,
            Self::List(items) => items.iter().all(Self::is_concrete),
            Self::Map(entries) => entries.values().all(Self::is_concrete),
        }
    }

    /// Returns the token if this value is exactly one token.
    #[must_use]
    pub const fn as_token(&self) -> Option<&OutputToken> {
        match self {
            Self::Token(token) => Some(token),
            _ => None,
        }
    }

    /// Returns the concrete value if this value holds no token.
    #[must_use]
    pub const fn as_concrete(&self) -> Option<&Value> {
        match self {
            Self::Concrete(value) => Some(value),
            _ => None,
        }
    }

    /// Collects every token in this value, depth first.
    #[must_use]
    pub fn tokens(&self) -> Vec<&OutputToken> {
        let mut found = Vec::new();
        self.collect_tokens(&mut found);
        found
    }

    fn collect_tokens<'a>(&'a self, found: &mut Vec<&'a OutputToken>) {
        match self {
            Self::Concrete(_) => {}
            Self::Token(token) => found.push(token),
            Self::List(items) => {
                for item in items {
                    item.collect_tokens(found);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.collect_tokens(found);
                }
            }
        }
    }
}

impl From<OutputToken> for AttributeValue {
    fn from(token: OutputToken) -> Self {
        Self::Token(token)
    }
}

impl From<&OutputToken> for AttributeValue {
    fn from(token: &OutputToken) -> Self {
        Self::Token(token.clone())
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        Self::Concrete(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Concrete(Value::from(value))
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Concrete(Value::from(value))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Concrete(Value::from(value))
    }
}

impl From<u16> for AttributeValue {
    fn from(value: u16) -> Self {
        Self::Concrete(Value::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Concrete(Value::from(value))
    }
}

impl<T: Into<Self>> From<Vec<T>> for AttributeValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}
