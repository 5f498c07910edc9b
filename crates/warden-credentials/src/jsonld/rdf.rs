//! Conversion of JSON-LD documents to RDF datasets.

use oxrdf::{BlankNode, Dataset, GraphName, Literal, NamedNode, Quad, Subject, Term};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use super::context::{is_absolute_iri, ActiveContext, Container, ProcessOptions, TypeMapping};
use super::Contexts;
use crate::error::CredentialError;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

/// Keywords this processor does not implement.
const UNSUPPORTED_KEYWORDS: [&str; 6] = ["@included", "@index", "@json", "@nest", "@reverse", "@set"];

fn malformed(message: impl Into<String>) -> CredentialError {
    CredentialError::Malformed(message.into())
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn named_node(iri: &str) -> Result<NamedNode, CredentialError> {
    NamedNode::new(iri).map_err(|e| malformed(format!("invalid IRI '{iri}': {e}")))
}

/// A node of the graph: the subject of its properties.
#[derive(Debug, Clone)]
enum Node {
    Named(NamedNode),
    Blank(BlankNode),
}

impl Node {
    fn subject(&self) -> Subject {
        match self {
            Self::Named(node) => node.clone().into(),
            Self::Blank(node) => node.clone().into(),
        }
    }

    fn term(&self) -> Term {
        match self {
            Self::Named(node) => node.clone().into(),
            Self::Blank(node) => node.clone().into(),
        }
    }

    fn graph_name(&self) -> GraphName {
        match self {
            Self::Named(node) => node.clone().into(),
            Self::Blank(node) => node.clone().into(),
        }
    }
}

pub(super) struct RdfWriter<'a> {
    contexts: &'a Contexts,
    dataset: Dataset,
    labels: HashMap<String, BlankNode>,
    next_blank: usize,
}

impl<'a> RdfWriter<'a> {
    pub fn new(contexts: &'a Contexts) -> Self {
        Self {
            contexts,
            dataset: Dataset::new(),
            labels: HashMap::new(),
            next_blank: 0,
        }
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    pub fn document(&mut self, document: &Value) -> Result<(), CredentialError> {
        let Value::Object(root) = document else {
            return Err(malformed("JSON-LD document must be an object"));
        };

        let mut active = ActiveContext::default();
        if let Some(local) = root.get("@context") {
            active = active.process(local, self.contexts, ProcessOptions::DEFAULT)?;
        }

        // A top-level object holding only @graph contributes no node itself.
        let mut members = root.iter().filter(|(key, _)| key.as_str() != "@context");
        if let (Some((key, nodes)), None) = (members.next(), members.next()) {
            if active.expand_iri(key, true).as_deref() == Some("@graph") {
                for node in as_items(nodes) {
                    let node = node
                        .as_object()
                        .ok_or_else(|| malformed("@graph entries must be objects"))?;
                    self.node(&active, node, &GraphName::DefaultGraph, key)?;
                }
                return Ok(());
            }
        }

        self.node(&ActiveContext::default(), root, &GraphName::DefaultGraph, "")?;
        Ok(())
    }

    fn fresh(&mut self) -> BlankNode {
        let node = BlankNode::new_unchecked(format!("b{}", self.next_blank));
        self.next_blank += 1;
        node
    }

    fn labelled(&mut self, label: &str) -> BlankNode {
        if let Some(node) = self.labels.get(label) {
            return node.clone();
        }
        let node = self.fresh();
        self.labels.insert(label.to_string(), node.clone());
        node
    }

    fn emit(&mut self, subject: &Node, predicate: &NamedNode, object: Term, graph: &GraphName) {
        let quad = Quad::new(subject.subject(), predicate.clone(), object, graph.clone());
        self.dataset.insert(&quad);
    }

    fn node_id(&mut self, active: &ActiveContext, id: &str, vocab: bool) -> Result<Node, CredentialError> {
        if let Some(label) = id.strip_prefix("_:") {
            return Ok(Node::Blank(self.labelled(label)));
        }
        let iri = active
            .expand_iri(id, vocab)
            .filter(|iri| is_absolute_iri(iri))
            .ok_or_else(|| malformed(format!("'{id}' does not expand to an absolute IRI")))?;
        Ok(Node::Named(named_node(&iri)?))
    }

    fn node(
        &mut self,
        parent: &ActiveContext,
        map: &Map<String, Value>,
        graph: &GraphName,
        path: &str,
    ) -> Result<Node, CredentialError> {
        let mut active = match map.get("@context") {
            Some(local) => parent.process(local, self.contexts, ProcessOptions::DEFAULT)?,
            None => parent.clone(),
        };

        let type_scope = active.clone();
        let mut types: Vec<(&str, String)> = Vec::new();
        for (key, value) in map {
            if type_scope.expand_iri(key, true).as_deref() != Some("@type") {
                continue;
            }
            for item in as_items(value) {
                let name = item
                    .as_str()
                    .ok_or_else(|| malformed(format!("{}: type must be a string", join(path, key))))?;
                types.push((name, join(path, key)));
            }
        }
        types.sort_unstable();
        for (name, _) in &types {
            if let Some(scoped) = type_scope.term(name).and_then(|d| d.scoped.as_ref()) {
                active = active.process(scoped, self.contexts, ProcessOptions::TYPE_SCOPED)?;
            }
        }

        let mut id = None;
        for (key, value) in map {
            if active.expand_iri(key, true).as_deref() == Some("@id") {
                let value = value
                    .as_str()
                    .ok_or_else(|| malformed(format!("{}: @id must be a string", join(path, key))))?;
                id = Some(value);
            }
        }
        let subject = match id {
            Some(id) => self.node_id(&active, id, false)?,
            None => Node::Blank(self.fresh()),
        };

        let rdf_type = NamedNode::new_unchecked(RDF_TYPE);
        for (name, here) in &types {
            let iri = type_scope
                .expand_iri(name, true)
                .filter(|iri| is_absolute_iri(iri))
                .ok_or_else(|| CredentialError::UndefinedTerm(format!("{here}={name}")))?;
            let object = named_node(&iri)?;
            self.emit(&subject, &rdf_type, object.into(), graph);
        }

        for (key, value) in map {
            let here = join(path, key);
            let iri = active
                .expand_iri(key, true)
                .ok_or_else(|| CredentialError::UndefinedTerm(here.clone()))?;
            match iri.as_str() {
                "@context" | "@id" | "@type" => {}
                "@graph" => {
                    let inner = active.previous().unwrap_or(&active).clone();
                    let name = subject.graph_name();
                    for item in as_items(value) {
                        let item = item
                            .as_object()
                            .ok_or_else(|| malformed(format!("{here}: entries must be objects")))?;
                        self.node(&inner, item, &name, &here)?;
                    }
                }
                keyword if UNSUPPORTED_KEYWORDS.contains(&keyword) => {
                    return Err(malformed(format!("{here}: {keyword} is not supported")))
                }
                keyword if keyword.starts_with('@') => {
                    return Err(malformed(format!("{here}: unexpected {keyword} in a node")))
                }
                _ if !is_absolute_iri(&iri) => return Err(CredentialError::UndefinedTerm(here)),
                _ => {
                    let predicate = named_node(&iri)?;
                    self.property(&active, key, &predicate, value, &subject, graph, &here)?;
                }
            }
        }

        Ok(subject)
    }

    #[allow(clippy::too_many_arguments)]
    fn property(
        &mut self,
        active: &ActiveContext,
        term: &str,
        predicate: &NamedNode,
        value: &Value,
        subject: &Node,
        graph: &GraphName,
        path: &str,
    ) -> Result<(), CredentialError> {
        let items = as_items(value);
        match active.term(term).and_then(|d| d.container) {
            Some(Container::List) => {
                let head = self.list(active, term, items, graph, path)?;
                self.emit(subject, predicate, head, graph);
            }
            Some(Container::Graph) => {
                for item in items {
                    match item {
                        Value::Object(map) if !is_value_object(active, map) => {
                            let name = self.fresh();
                            let inner = self.nested_context(active, term, map)?;
                            self.node(&inner, map, &GraphName::BlankNode(name.clone()), path)?;
                            self.emit(subject, predicate, name.into(), graph);
                        }
                        other => {
                            if let Some(object) = self.object(active, term, other, graph, path)? {
                                self.emit(subject, predicate, object, graph);
                            }
                        }
                    }
                }
            }
            Some(Container::Set) | None => {
                for item in items {
                    if let Some(object) = self.object(active, term, item, graph, path)? {
                        self.emit(subject, predicate, object, graph);
                    }
                }
            }
        }
        Ok(())
    }

    fn object(
        &mut self,
        active: &ActiveContext,
        term: &str,
        value: &Value,
        graph: &GraphName,
        path: &str,
    ) -> Result<Option<Term>, CredentialError> {
        match value {
            Value::Null => Ok(None),
            Value::Array(_) => Err(malformed(format!("{path}: nested arrays are not supported"))),
            Value::Object(map) if is_value_object(active, map) => value_literal(active, map, path),
            Value::Object(map) => {
                if let Some(items) = keyword_member(active, map, "@list") {
                    let items = as_items(items);
                    return self.list(active, term, items, graph, path).map(Some);
                }
                let inner = self.nested_context(active, term, map)?;
                let node = self.node(&inner, map, graph, path)?;
                Ok(Some(node.term()))
            }
            scalar => {
                let scoped = self.property_scope(active.clone(), active, term)?;
                self.scalar(&scoped, active, term, scalar, path).map(Some)
            }
        }
    }

    fn list(
        &mut self,
        active: &ActiveContext,
        term: &str,
        items: &[Value],
        graph: &GraphName,
        path: &str,
    ) -> Result<Term, CredentialError> {
        let mut objects = Vec::with_capacity(items.len());
        for item in items {
            if let Some(object) = self.object(active, term, item, graph, path)? {
                objects.push(object);
            }
        }

        let first = NamedNode::new_unchecked(RDF_FIRST);
        let rest = NamedNode::new_unchecked(RDF_REST);
        let mut head: Term = NamedNode::new_unchecked(RDF_NIL).into();
        for object in objects.into_iter().rev() {
            let cell = Node::Blank(self.fresh());
            self.emit(&cell, &first, object, graph);
            self.emit(&cell, &rest, head, graph);
            head = cell.term();
        }
        Ok(head)
    }

    /// Context for a node object nested under `term`.
    ///
    /// Non-propagated type-scoped contexts end at the node boundary, unless
    /// the object is a bare `@id` reference.
    fn nested_context(
        &self,
        active: &ActiveContext,
        term: &str,
        map: &Map<String, Value>,
    ) -> Result<ActiveContext, CredentialError> {
        let reference = map.len() == 1
            && map
                .keys()
                .all(|key| active.expand_iri(key, true).as_deref() == Some("@id"));
        let base = match active.previous() {
            Some(previous) if !reference => previous.clone(),
            _ => active.clone(),
        };
        self.property_scope(base, active, term)
    }

    fn property_scope(
        &self,
        base: ActiveContext,
        active: &ActiveContext,
        term: &str,
    ) -> Result<ActiveContext, CredentialError> {
        match active.term(term).and_then(|d| d.scoped.as_ref()) {
            Some(scoped) => base.process(scoped, self.contexts, ProcessOptions::PROPERTY_SCOPED),
            None => Ok(base),
        }
    }

    fn scalar(
        &mut self,
        scoped: &ActiveContext,
        active: &ActiveContext,
        term: &str,
        value: &Value,
        path: &str,
    ) -> Result<Term, CredentialError> {
        let definition = active.term(term);
        let type_mapping = definition.and_then(|d| d.type_mapping.as_ref());

        if let Value::String(s) = value {
            match type_mapping {
                Some(TypeMapping::Id) => return Ok(self.node_id(scoped, s, false)?.term()),
                Some(TypeMapping::Vocab) => return Ok(self.node_id(scoped, s, true)?.term()),
                _ => {}
            }
        }

        let datatype = match type_mapping {
            Some(TypeMapping::Datatype(datatype)) => Some(datatype.as_str()),
            _ => None,
        };
        let language = match (value, datatype) {
            (Value::String(_), None) => match definition.and_then(|d| d.language.as_ref()) {
                Some(language) => language.as_deref(),
                None => scoped.language(),
            },
            _ => None,
        };
        literal(value, datatype, language, path)
    }
}

fn as_items(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        single => std::slice::from_ref(single),
    }
}

fn keyword_member<'v>(
    active: &ActiveContext,
    map: &'v Map<String, Value>,
    keyword: &str,
) -> Option<&'v Value> {
    map.iter()
        .find(|(key, _)| active.expand_iri(key, true).as_deref() == Some(keyword))
        .map(|(_, value)| value)
}

fn is_value_object(active: &ActiveContext, map: &Map<String, Value>) -> bool {
    keyword_member(active, map, "@value").is_some()
}

fn value_literal(
    active: &ActiveContext,
    map: &Map<String, Value>,
    path: &str,
) -> Result<Option<Term>, CredentialError> {
    let mut value = &Value::Null;
    let mut datatype = None;
    let mut language = None;
    for (key, member) in map {
        match active.expand_iri(key, true).as_deref() {
            Some("@value") => value = member,
            Some("@type") => {
                let name = member
                    .as_str()
                    .ok_or_else(|| malformed(format!("{path}: value type must be a string")))?;
                if name.starts_with('@') {
                    return Err(malformed(format!("{path}: value type {name} is not supported")));
                }
                let iri = active
                    .expand_iri(name, true)
                    .filter(|iri| is_absolute_iri(iri))
                    .ok_or_else(|| CredentialError::UndefinedTerm(format!("{path}={name}")))?;
                datatype = Some(iri);
            }
            Some("@language") => {
                let tag = member
                    .as_str()
                    .ok_or_else(|| malformed(format!("{path}: language must be a string")))?;
                language = Some(tag.to_lowercase());
            }
            Some("@context") => {}
            _ => return Err(malformed(format!("{path}: invalid value object member '{key}'"))),
        }
    }

    match value {
        Value::Null => Ok(None),
        Value::Object(_) | Value::Array(_) => {
            Err(malformed(format!("{path}: @value must be a scalar")))
        }
        scalar => literal(scalar, datatype.as_deref(), language.as_deref(), path).map(Some),
    }
}

fn literal(
    value: &Value,
    datatype: Option<&str>,
    language: Option<&str>,
    path: &str,
) -> Result<Term, CredentialError> {
    let (lexical, implied) = match value {
        Value::String(s) => (s.clone(), None),
        Value::Bool(b) => (b.to_string(), Some(XSD_BOOLEAN)),
        Value::Number(n) => number_lexical(n, datatype),
        _ => return Err(malformed(format!("{path}: expected a scalar value"))),
    };

    let literal = match (datatype.or(implied), language) {
        (Some(datatype), _) => Literal::new_typed_literal(lexical, named_node(datatype)?),
        (None, Some(language)) => Literal::new_language_tagged_literal(lexical, language)
            .map_err(|e| malformed(format!("{path}: invalid language tag '{language}': {e}")))?,
        (None, None) => Literal::new_simple_literal(lexical),
    };
    Ok(literal.into())
}

/// Lexical form and implied datatype of a JSON number.
fn number_lexical(number: &Number, datatype: Option<&str>) -> (String, Option<&'static str>) {
    let as_double = datatype == Some(XSD_DOUBLE);
    if !as_double {
        if let Some(i) = number.as_i64() {
            return (i.to_string(), Some(XSD_INTEGER));
        }
        if let Some(u) = number.as_u64() {
            return (u.to_string(), Some(XSD_INTEGER));
        }
    }

    let value = number.as_f64().unwrap_or_default();
    if !as_double && value.fract() == 0.0 && value.abs() < 1e21 {
        return (format!("{value:.0}"), Some(XSD_INTEGER));
    }
    (canonical_double(value), Some(XSD_DOUBLE))
}

/// `xsd:double` canonical form: one leading digit, no trailing zeros.
fn canonical_double(value: f64) -> String {
    let formatted = format!("{value:.15E}");
    let Some((mantissa, exponent)) = formatted.split_once('E') else {
        return formatted;
    };
    let mut mantissa = mantissa.trim_end_matches('0').to_string();
    if mantissa.ends_with('.') {
        mantissa.push('0');
    }
    format!("{mantissa}E{exponent}")
}
