//! Vocabulary of the dataverse ontology used by the fixed queries.

/// Prefix name bound to [`CORE_NAMESPACE`] in queries.
pub const CORE_PREFIX: &str = "core";
pub const CORE_NAMESPACE: &str = "https://ontology.okp4.space/core/";

/// Execution status thesaurus.
pub const EXECUTION_STATUS_NAMESPACE: &str =
    "https://ontology.okp4.space/thesaurus/execution-status/";

/// Order → zone it runs in.
pub const HAS_ZONE: &str = "core:hasZone";
/// Order → one of its executions.
pub const HAS_EXECUTION: &str = "core:hasExecution";
/// Execution → participating service.
pub const HAS_PARTICIPANT: &str = "core:hasParticipant";
/// Execution → status IRI (an execution accumulates statuses).
pub const HAS_STATUS: &str = "core:hasStatus";
/// Execution → consumed resource (dataset or service).
pub const CONSUMES: &str = "core:consumes";
/// Publication → published resource.
pub const DESCRIBES: &str = "core:describes";
/// Publication → service serving it.
pub const SERVED_BY: &str = "core:servedBy";
/// Publication → access URI (literal).
pub const HAS_ACCESS_URI: &str = "core:hasAccessURI";
/// Resource → governance.
pub const HAS_GOVERNANCE: &str = "core:hasGovernance";
/// Governance → governance code URI (literal).
pub const HAS_GOVERNANCE_CODE: &str = "core:hasGovernanceCode";

/// Full IRI of a status term such as `InExecution`.
pub fn execution_status(term: &str) -> String {
    format!("{EXECUTION_STATUS_NAMESPACE}{term}")
}

/// Expand a `core:` compact IRI.
pub fn expand(compact: &str) -> Option<String> {
    let (prefix, local) = compact.split_once(':')?;
    (prefix == CORE_PREFIX).then(|| format!("{CORE_NAMESPACE}{local}"))
}
