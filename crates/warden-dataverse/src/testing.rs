//! In-memory stand-ins for the dataverse contracts and the logic module.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::client::ContractQuerier;
use crate::error::DataverseError;
use crate::governance::{AnswerResult, LogicAnswer, LogicQuerier, Substitution};
use crate::ontology;
use crate::program::unquote_atom;
use crate::query::{
    Binding, BindingValue, Head, Iri, Literal, Node, Results, SelectQuery, SelectResponse,
    TriplestoreQuery, VarOrNamedNode, VarOrNode, VarOrNodeOrLiteral,
};

pub const DATAVERSE_ADDRESS: &str = "okp41dataverse";
pub const TRIPLESTORE_ADDRESS: &str = "okp41triplestore";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Iri(String),
    Literal(String),
}

struct Triple {
    subject: String,
    predicate: String,
    object: Term,
}

type Solution = BTreeMap<String, Term>;

/// A dataverse contract and its triplestore, answering basic graph patterns
/// over an in-memory triple list.
#[derive(Default)]
pub struct MemoryTriplestore {
    triples: Vec<Triple>,
    failing: bool,
    calls: AtomicUsize,
}

impl MemoryTriplestore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triple whose object is an IRI. `predicate` may be a `core:` compact IRI.
    pub fn with_iri(mut self, subject: &str, predicate: &str, object: &str) -> Self {
        self.push(subject, predicate, Term::Iri(object.into()));
        self
    }

    /// Add a triple whose object is a literal.
    pub fn with_literal(mut self, subject: &str, predicate: &str, object: &str) -> Self {
        self.push(subject, predicate, Term::Literal(object.into()));
        self
    }

    /// Make every query fail with a transport error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn push(&mut self, subject: &str, predicate: &str, object: Term) {
        self.triples.push(Triple {
            subject: subject.into(),
            predicate: ontology::expand(predicate).unwrap_or_else(|| predicate.into()),
            object,
        });
    }

    pub fn dataverse_address(&self) -> &'static str {
        DATAVERSE_ADDRESS
    }

    pub fn triplestore_address(&self) -> &'static str {
        TRIPLESTORE_ADDRESS
    }

    /// Number of contract queries received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn select(&self, query: &SelectQuery) -> SelectResponse {
        let prefixes: BTreeMap<&str, &str> = query
            .prefixes
            .iter()
            .map(|p| (p.prefix.as_str(), p.namespace.as_str()))
            .collect();
        let resolve = |iri: &Iri| match iri {
            Iri::Full(full) => full.clone(),
            Iri::Prefixed(compact) => match compact.split_once(':') {
                Some((prefix, local)) if prefixes.contains_key(prefix) => {
                    format!("{}{local}", prefixes[prefix])
                }
                _ => compact.clone(),
            },
        };

        let mut solutions: Vec<Solution> = vec![Solution::new()];
        for pattern in query.patterns() {
            let mut next = Vec::new();
            for solution in &solutions {
                for triple in &self.triples {
                    let mut extended = solution.clone();
                    let subject = match &pattern.subject {
                        VarOrNode::Variable(v) => {
                            unify(v, Term::Iri(triple.subject.clone()), &mut extended)
                        }
                        VarOrNode::Node(Node::NamedNode(iri)) => resolve(iri) == triple.subject,
                        VarOrNode::Node(Node::BlankNode(_)) => false,
                    };
                    let predicate = match &pattern.predicate {
                        VarOrNamedNode::Variable(v) => {
                            unify(v, Term::Iri(triple.predicate.clone()), &mut extended)
                        }
                        VarOrNamedNode::NamedNode(iri) => resolve(iri) == triple.predicate,
                    };
                    let object = match &pattern.object {
                        VarOrNodeOrLiteral::Variable(v) => {
                            unify(v, triple.object.clone(), &mut extended)
                        }
                        VarOrNodeOrLiteral::Node(Node::NamedNode(iri)) => {
                            triple.object == Term::Iri(resolve(iri))
                        }
                        VarOrNodeOrLiteral::Literal(Literal::Simple(s)) => {
                            triple.object == Term::Literal(s.clone())
                        }
                        _ => false,
                    };
                    if subject && predicate && object {
                        next.push(extended);
                    }
                }
            }
            solutions = next;
        }

        let vars: Vec<String> = query
            .select
            .iter()
            .map(|item| match item {
                crate::query::SelectItem::Variable(v) => v.clone(),
            })
            .collect();
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let bindings: Vec<Binding> = solutions
            .into_iter()
            .take(limit)
            .map(|solution| {
                vars.iter()
                    .filter_map(|var| {
                        let value = match solution.get(var)? {
                            Term::Iri(iri) => BindingValue::uri(iri.clone()),
                            Term::Literal(text) => BindingValue::literal(text.clone()),
                        };
                        Some((var.clone(), value))
                    })
                    .collect::<Binding>()
            })
            .collect();

        SelectResponse {
            head: Head { vars },
            results: Results { bindings },
        }
    }
}

fn unify(var: &str, value: Term, solution: &mut Solution) -> bool {
    match solution.get(var) {
        Some(bound) => *bound == value,
        None => {
            solution.insert(var.to_string(), value);
            true
        }
    }
}

#[async_trait]
impl ContractQuerier for MemoryTriplestore {
    async fn query_smart(&self, contract: &str, msg: &Value) -> Result<Value, DataverseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(DataverseError::Transport("connection refused".into()));
        }

        match contract {
            DATAVERSE_ADDRESS if msg.get("dataverse").is_some() => {
                Ok(json!({ "triplestore_address": TRIPLESTORE_ADDRESS }))
            }
            TRIPLESTORE_ADDRESS => {
                let message: TriplestoreQuery = serde_json::from_value(msg.clone())?;
                let TriplestoreQuery::Select { query } = message;
                Ok(serde_json::to_value(self.select(&query))?)
            }
            other => Err(DataverseError::Transport(format!(
                "no contract at address {other}"
            ))),
        }
    }
}

/// Outcome scripted for one governance code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permitted,
    Prohibited,
    /// No paragraph applies: the query has no solution.
    Undecided,
}

/// A logic module answering governance checks from a fixed table keyed by
/// the consulted governance code URI.
#[derive(Default)]
pub struct ScriptedLogic {
    decisions: BTreeMap<String, Decision>,
    programs: Mutex<Vec<String>>,
}

impl ScriptedLogic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decision(mut self, gov_code: &str, decision: Decision) -> Self {
        self.decisions.insert(gov_code.into(), decision);
        self
    }

    /// Programs received so far.
    pub fn programs(&self) -> Vec<String> {
        self.programs.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.programs().len()
    }
}

fn consulted(program: &str) -> Option<String> {
    let rest = program.strip_prefix(":- consult(")?;
    let end = rest.find(").\n")?;
    Some(unquote_atom(&rest[..end]))
}

#[async_trait]
impl LogicQuerier for ScriptedLogic {
    async fn ask(&self, program: &str, _query: &str) -> Result<LogicAnswer, DataverseError> {
        if let Ok(mut programs) = self.programs.lock() {
            programs.push(program.to_string());
        }

        let gov_code = consulted(program)
            .ok_or_else(|| DataverseError::Logic("program consults nothing".into()))?;
        let decision = self.decisions.get(&gov_code).ok_or_else(|| {
            DataverseError::Logic(format!("existence_error(source_sink, '{gov_code}')"))
        })?;

        let (result, evidence) = match decision {
            Decision::Permitted => ("permitted", "[1:permitted]"),
            Decision::Prohibited => ("prohibited", "[1:permitted,2:prohibited]"),
            Decision::Undecided => return Ok(LogicAnswer::default()),
        };
        Ok(LogicAnswer {
            has_more: false,
            variables: vec!["Result".into(), "Evidence".into()],
            results: vec![AnswerResult {
                error: None,
                substitutions: vec![
                    Substitution {
                        variable: "Result".into(),
                        expression: result.into(),
                    },
                    Substitution {
                        variable: "Evidence".into(),
                        expression: evidence.into(),
                    },
                ],
            }],
        })
    }
}
