//! Warden Dataverse — Queries against the dataverse knowledge graph and
//! evaluation of resource governance through the logic module.

pub mod client;
pub mod error;
pub mod governance;
pub mod ontology;
pub mod program;
pub mod query;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{ContractQuerier, DataverseClient, LcdContractQuerier};
pub use error::DataverseError;
pub use governance::{GovernanceEvaluator, LcdLogicQuerier, LogicAnswer, LogicQuerier};
pub use program::gov_check_program;
pub use query::{SelectQuery, SelectResponse};
