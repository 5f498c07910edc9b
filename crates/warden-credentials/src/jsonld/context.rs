//! JSON-LD 1.1 context processing.
//!
//! Covers what credential contexts use: remote and inline contexts, compact
//! IRIs, `@vocab`, default language, type coercion, `@set`/`@list`/`@graph`
//! containers, property- and type-scoped contexts and `@protected` terms.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::Contexts;
use crate::error::CredentialError;

/// Bound on nested remote context inclusion.
const MAX_CONTEXT_DEPTH: usize = 16;

const CONTEXT_KEYWORDS: [&str; 8] = [
    "@base",
    "@direction",
    "@import",
    "@language",
    "@propagate",
    "@protected",
    "@version",
    "@vocab",
];

fn malformed(message: impl Into<String>) -> CredentialError {
    CredentialError::Malformed(message.into())
}

/// Whether `value` is an absolute IRI (has a scheme).
pub fn is_absolute_iri(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMapping {
    Id,
    Vocab,
    Datatype(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Set,
    List,
    Graph,
}

#[derive(Debug, Clone, Default)]
pub struct TermDefinition {
    /// Expanded IRI or keyword, `None` for a term mapped to null.
    pub iri: Option<String>,
    pub type_mapping: Option<TypeMapping>,
    pub container: Option<Container>,
    /// `Some(None)` when the term explicitly clears the default language.
    pub language: Option<Option<String>>,
    pub scoped: Option<Value>,
    pub protected: bool,
}

impl TermDefinition {
    fn same_as(&self, other: &Self) -> bool {
        self.iri == other.iri
            && self.type_mapping == other.type_mapping
            && self.container == other.container
            && self.language == other.language
            && self.scoped == other.scoped
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    pub override_protected: bool,
    pub propagate: bool,
}

impl ProcessOptions {
    pub const DEFAULT: Self = Self {
        override_protected: false,
        propagate: true,
    };
    pub const PROPERTY_SCOPED: Self = Self {
        override_protected: true,
        propagate: true,
    };
    pub const TYPE_SCOPED: Self = Self {
        override_protected: false,
        propagate: false,
    };
}

/// Term definitions of a local context being processed.
struct LocalScope<'a> {
    local: &'a Map<String, Value>,
    protected: bool,
    override_protected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveContext {
    terms: HashMap<String, TermDefinition>,
    vocab: Option<String>,
    language: Option<String>,
    previous: Option<Box<ActiveContext>>,
}

impl ActiveContext {
    pub fn term(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term)
    }

    /// Default language of string values.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The context in effect before non-propagated type-scoped contexts.
    pub fn previous(&self) -> Option<&ActiveContext> {
        self.previous.as_deref()
    }

    /// Expand `value` to an IRI, blank node label or keyword.
    ///
    /// Returns `None` for a term mapped to null. Unresolvable values come
    /// back unchanged, so callers check [`is_absolute_iri`].
    pub fn expand_iri(&self, value: &str, vocab: bool) -> Option<String> {
        if value.starts_with('@') {
            return Some(value.to_string());
        }
        if vocab {
            if let Some(definition) = self.terms.get(value) {
                return definition.iri.clone();
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Some(value.to_string());
            }
            let prefix_iri = self
                .terms
                .get(prefix)
                .and_then(|d| d.iri.as_deref())
                .filter(|iri| !iri.starts_with('@'));
            return Some(match prefix_iri {
                Some(iri) => format!("{iri}{suffix}"),
                None => value.to_string(),
            });
        }
        match (&self.vocab, vocab) {
            (Some(base), true) => Some(format!("{base}{value}")),
            _ => Some(value.to_string()),
        }
    }

    /// Apply a local context, yielding the new active context.
    pub fn process(
        &self,
        local: &Value,
        contexts: &Contexts,
        options: ProcessOptions,
    ) -> Result<Self, CredentialError> {
        self.process_at(local, contexts, options, 0)
    }

    fn process_at(
        &self,
        local: &Value,
        contexts: &Contexts,
        options: ProcessOptions,
        depth: usize,
    ) -> Result<Self, CredentialError> {
        let propagate = match local.get("@propagate") {
            None => options.propagate,
            Some(Value::Bool(propagate)) => *propagate,
            Some(_) => return Err(malformed("@propagate must be a boolean")),
        };

        let mut result = self.clone();
        if !propagate && result.previous.is_none() {
            result.previous = Some(Box::new(self.clone()));
        }

        let entries = match local {
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        for entry in entries {
            match entry {
                Value::Null => {
                    if !options.override_protected && result.terms.values().any(|d| d.protected)
                    {
                        return Err(malformed("context nullification drops protected terms"));
                    }
                    let previous = if propagate {
                        None
                    } else {
                        result.previous.take()
                    };
                    result = Self {
                        previous,
                        ..Self::default()
                    };
                }
                Value::String(url) => {
                    if depth >= MAX_CONTEXT_DEPTH {
                        return Err(malformed(format!(
                            "context '{url}' is nested more than {MAX_CONTEXT_DEPTH} deep"
                        )));
                    }
                    let remote = contexts.context(url)?;
                    result = result.process_at(remote, contexts, ProcessOptions::DEFAULT, depth + 1)?;
                }
                Value::Object(definitions) => result.define(definitions, options)?,
                other => return Err(malformed(format!("invalid @context entry: {other}"))),
            }
        }

        Ok(result)
    }

    fn define(
        &mut self,
        local: &Map<String, Value>,
        options: ProcessOptions,
    ) -> Result<(), CredentialError> {
        if local.contains_key("@import") {
            return Err(malformed("@import is not supported"));
        }

        match local.get("@vocab") {
            None => {}
            Some(Value::Null) => self.vocab = None,
            Some(Value::String(vocab)) => {
                let iri = self
                    .expand_iri(vocab, true)
                    .filter(|iri| is_absolute_iri(iri))
                    .ok_or_else(|| malformed(format!("invalid @vocab '{vocab}'")))?;
                self.vocab = Some(iri);
            }
            Some(other) => return Err(malformed(format!("invalid @vocab: {other}"))),
        }

        match local.get("@language") {
            None => {}
            Some(Value::Null) => self.language = None,
            Some(Value::String(language)) => self.language = Some(language.to_lowercase()),
            Some(other) => return Err(malformed(format!("invalid @language: {other}"))),
        }

        let protected = match local.get("@protected") {
            None => false,
            Some(Value::Bool(protected)) => *protected,
            Some(_) => return Err(malformed("@protected must be a boolean")),
        };

        let scope = LocalScope {
            local,
            protected,
            override_protected: options.override_protected,
        };
        let mut defined = HashMap::new();
        for term in local.keys() {
            if !CONTEXT_KEYWORDS.contains(&term.as_str()) {
                self.create_term(&scope, term, &mut defined)?;
            }
        }
        Ok(())
    }

    fn create_term(
        &mut self,
        scope: &LocalScope<'_>,
        term: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<(), CredentialError> {
        match defined.get(term) {
            Some(true) => return Ok(()),
            Some(false) => return Err(malformed(format!("cyclic IRI mapping for '{term}'"))),
            None => {}
        }
        defined.insert(term.to_string(), false);

        // Keyword-like terms are ignored.
        let Some(value) = scope.local.get(term).filter(|_| !term.starts_with('@')) else {
            defined.insert(term.to_string(), true);
            return Ok(());
        };

        let previous = self.terms.remove(term);
        let mut definition = TermDefinition {
            protected: scope.protected,
            ..TermDefinition::default()
        };

        match value {
            Value::Null => {}
            Value::String(id) => definition.iri = Some(self.term_iri(scope, term, id, defined)?),
            Value::Object(map) => self.define_expanded(scope, term, map, &mut definition, defined)?,
            other => {
                return Err(malformed(format!(
                    "invalid definition for term '{term}': {other}"
                )))
            }
        }

        if let Some(previous) = previous {
            if previous.protected && !scope.override_protected {
                if !previous.same_as(&definition) {
                    return Err(malformed(format!("protected term '{term}' redefined")));
                }
                definition = previous;
            }
        }

        self.terms.insert(term.to_string(), definition);
        defined.insert(term.to_string(), true);
        Ok(())
    }

    fn define_expanded(
        &mut self,
        scope: &LocalScope<'_>,
        term: &str,
        map: &Map<String, Value>,
        definition: &mut TermDefinition,
        defined: &mut HashMap<String, bool>,
    ) -> Result<(), CredentialError> {
        if map.contains_key("@reverse") {
            return Err(malformed(format!("reverse term '{term}' is not supported")));
        }

        if let Some(protected) = map.get("@protected") {
            definition.protected = protected
                .as_bool()
                .ok_or_else(|| malformed(format!("@protected of '{term}' must be a boolean")))?;
        }

        if let Some(type_mapping) = map.get("@type") {
            let type_mapping = type_mapping
                .as_str()
                .ok_or_else(|| malformed(format!("@type of '{term}' must be a string")))?;
            definition.type_mapping = Some(match type_mapping {
                "@id" => TypeMapping::Id,
                "@vocab" => TypeMapping::Vocab,
                keyword if keyword.starts_with('@') => {
                    return Err(malformed(format!(
                        "type mapping '{keyword}' of '{term}' is not supported"
                    )))
                }
                datatype => {
                    self.resolve_dependencies(scope, datatype, defined)?;
                    let iri = self
                        .expand_iri(datatype, true)
                        .filter(|iri| is_absolute_iri(iri))
                        .ok_or_else(|| {
                            malformed(format!("datatype '{datatype}' of '{term}' is not an IRI"))
                        })?;
                    TypeMapping::Datatype(iri)
                }
            });
        }

        definition.iri = match map.get("@id") {
            Some(Value::Null) => None,
            Some(Value::String(id)) => Some(self.term_iri(scope, term, id, defined)?),
            Some(other) => return Err(malformed(format!("invalid @id of '{term}': {other}"))),
            None => Some(self.default_iri(scope, term, defined)?),
        };

        if let Some(container) = map.get("@container") {
            definition.container = Some(
                parse_container(container)
                    .ok_or_else(|| malformed(format!("unsupported @container of '{term}'")))?,
            );
        }

        if let Some(language) = map.get("@language") {
            definition.language = Some(match language {
                Value::Null => None,
                Value::String(language) => Some(language.to_lowercase()),
                other => return Err(malformed(format!("invalid @language of '{term}': {other}"))),
            });
        }

        definition.scoped = map.get("@context").cloned();
        Ok(())
    }

    /// IRI mapping of `term` from an explicit `@id`.
    fn term_iri(
        &mut self,
        scope: &LocalScope<'_>,
        term: &str,
        id: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<String, CredentialError> {
        if id == term {
            return self.default_iri(scope, term, defined);
        }
        if id.starts_with('@') {
            if id == "@context" {
                return Err(malformed(format!("'{term}' cannot alias @context")));
            }
            return Ok(id.to_string());
        }
        self.resolve_dependencies(scope, id, defined)?;
        self.expand_iri(id, true)
            .filter(|iri| is_absolute_iri(iri) || iri.starts_with("_:"))
            .ok_or_else(|| malformed(format!("'{id}' of term '{term}' is not an IRI")))
    }

    /// IRI mapping of a term with no `@id`.
    fn default_iri(
        &mut self,
        scope: &LocalScope<'_>,
        term: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<String, CredentialError> {
        if let Some((prefix, suffix)) = term.split_once(':') {
            if !suffix.starts_with("//") && scope.local.contains_key(prefix) {
                self.create_term(scope, prefix, defined)?;
            }
            return self
                .expand_iri(term, false)
                .ok_or_else(|| malformed(format!("term '{term}' has no IRI mapping")));
        }
        match &self.vocab {
            Some(vocab) => Ok(format!("{vocab}{term}")),
            None => Err(malformed(format!("term '{term}' has no IRI mapping"))),
        }
    }

    /// Define the local terms `value` depends on before expanding it.
    fn resolve_dependencies(
        &mut self,
        scope: &LocalScope<'_>,
        value: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<(), CredentialError> {
        if scope.local.contains_key(value) {
            self.create_term(scope, value, defined)?;
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if !suffix.starts_with("//") && scope.local.contains_key(prefix) {
                self.create_term(scope, prefix, defined)?;
            }
        }
        Ok(())
    }
}

fn parse_container(value: &Value) -> Option<Container> {
    let names: Vec<&str> = match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(items) => items.iter().map(Value::as_str).collect::<Option<_>>()?,
        _ => return None,
    };
    let mut container = Container::Set;
    for name in names {
        match name {
            "@set" => {}
            "@list" => container = Container::List,
            "@graph" => container = Container::Graph,
            _ => return None,
        }
    }
    Some(container)
}
