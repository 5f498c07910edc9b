//! Triplestore query DSL and SELECT response decoding.
//!
//! The types mirror the JSON schema of the triplestore contract: every
//! enum is externally tagged with snake_case names, e.g.
//! `{"node": {"named_node": {"full": "…"}}}`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::DataverseError;
use crate::ontology::{CORE_NAMESPACE, CORE_PREFIX};

/// A query message accepted by the triplestore contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriplestoreQuery {
    Select { query: SelectQuery },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    pub prefixes: Vec<Prefix>,
    pub select: Vec<SelectItem>,
    #[serde(rename = "where")]
    pub where_: Vec<WhereCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SelectQuery {
    /// A query over the core ontology selecting `variables`.
    pub fn new(variables: &[&str], patterns: Vec<TriplePattern>) -> Self {
        Self {
            prefixes: vec![Prefix {
                prefix: CORE_PREFIX.into(),
                namespace: CORE_NAMESPACE.into(),
            }],
            select: variables
                .iter()
                .map(|v| SelectItem::Variable(v.to_string()))
                .collect(),
            where_: patterns
                .into_iter()
                .map(|p| WhereCondition::Simple(SimpleWhereCondition::TriplePattern(p)))
                .collect(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Wrap into the contract query message.
    pub fn into_message(self) -> TriplestoreQuery {
        TriplestoreQuery::Select { query: self }
    }

    /// The triple patterns of the `where` clause.
    pub fn patterns(&self) -> impl Iterator<Item = &TriplePattern> {
        self.where_.iter().map(|condition| match condition {
            WhereCondition::Simple(SimpleWhereCondition::TriplePattern(p)) => p,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefix {
    pub prefix: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectItem {
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhereCondition {
    Simple(SimpleWhereCondition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleWhereCondition {
    TriplePattern(TriplePattern),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: VarOrNode,
    pub predicate: VarOrNamedNode,
    pub object: VarOrNodeOrLiteral,
}

impl TriplePattern {
    pub fn new(
        subject: VarOrNode,
        predicate: VarOrNamedNode,
        object: VarOrNodeOrLiteral,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

/// An IRI, either compact (`core:hasStatus`) or full.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Iri {
    Prefixed(String),
    Full(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    NamedNode(Iri),
    BlankNode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarOrNode {
    Variable(String),
    Node(Node),
}

impl VarOrNode {
    pub fn var(name: &str) -> Self {
        Self::Variable(name.into())
    }

    pub fn iri(full: &str) -> Self {
        Self::Node(Node::NamedNode(Iri::Full(full.into())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarOrNamedNode {
    Variable(String),
    NamedNode(Iri),
}

impl VarOrNamedNode {
    pub fn prefixed(compact: &str) -> Self {
        Self::NamedNode(Iri::Prefixed(compact.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarOrNodeOrLiteral {
    Variable(String),
    Node(Node),
    Literal(Literal),
}

impl VarOrNodeOrLiteral {
    pub fn var(name: &str) -> Self {
        Self::Variable(name.into())
    }

    pub fn iri(full: &str) -> Self {
        Self::Node(Node::NamedNode(Iri::Full(full.into())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Simple(String),
    LanguageTaggedString { value: String, language: String },
    TypedValue { value: String, datatype: Iri },
}

/// Response of a SELECT query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectResponse {
    pub head: Head,
    pub results: Results,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Head {
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub bindings: Vec<Binding>,
}

/// One solution: variable name → bound value.
pub type Binding = BTreeMap<String, BindingValue>;

/// A bound value. Only IRIs and literals are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BindingValue {
    Uri {
        value: Iri,
    },
    Literal {
        value: String,
        #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<Iri>,
    },
}

impl BindingValue {
    pub fn uri(full: impl Into<String>) -> Self {
        Self::Uri {
            value: Iri::Full(full.into()),
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    /// The full IRI of a `uri` binding, or the text of a `literal`.
    pub fn as_str(&self) -> Result<&str, DataverseError> {
        match self {
            Self::Uri {
                value: Iri::Full(full),
            } => Ok(full),
            Self::Uri {
                value: Iri::Prefixed(compact),
            } => Err(DataverseError::Decode(format!(
                "unexpected compact IRI in binding: {compact}"
            ))),
            Self::Literal { value, .. } => Ok(value),
        }
    }
}

fn resolve<'a>(binding: &'a Binding, name: &str) -> Result<&'a str, DataverseError> {
    binding
        .get(name)
        .ok_or_else(|| DataverseError::Decode(format!("unbound variable: {name}")))?
        .as_str()
}

impl SelectResponse {
    /// Distinct values of `name` over the bindings matching every
    /// `(variable, value)` filter.
    pub fn values(
        &self,
        name: &str,
        filters: &[(&str, &str)],
    ) -> Result<BTreeSet<String>, DataverseError> {
        let mut values = BTreeSet::new();
        'bindings: for binding in &self.results.bindings {
            for (var, expected) in filters {
                if resolve(binding, var)? != *expected {
                    continue 'bindings;
                }
            }
            values.insert(resolve(binding, name)?.to_string());
        }
        Ok(values)
    }
}
