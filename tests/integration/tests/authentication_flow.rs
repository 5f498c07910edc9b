//! Integration test: credential exchange and token checks across the
//! credentials, dataverse and auth crates.

use std::sync::Arc;

use chrono::{Duration, Utc};
use warden_core::ErrorKind;
use warden_credentials::testing::{test_loader, TestKey};
use warden_credentials::{CachingDocumentLoader, ProofSuite};
use warden_dataverse::testing::{Decision, ScriptedLogic};
use warden_integration_tests::{gateway, present, OrderGraph, ZONE};

const CURATOR: &str = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";
const ARCHIVE: &str = "did:key:z6MkArchiveService";
const CURATOR_GOV: &str = "https://gov.example/curator.pl";
const ARCHIVE_GOV: &str = "https://gov.example/archive.pl";
const GENOMES_GOV: &str = "https://gov.example/genomes.pl";
const SAMPLES_GOV: &str = "https://gov.example/samples.pl";
const GENOMES_URI: &str = "https://s3.example/genomes";
const SAMPLES_URI: &str = "https://s3.example/samples";

fn permissive() -> Arc<ScriptedLogic> {
    Arc::new(
        ScriptedLogic::new()
            .with_decision(CURATOR_GOV, Decision::Permitted)
            .with_decision(ARCHIVE_GOV, Decision::Permitted)
            .with_decision(GENOMES_GOV, Decision::Permitted)
            .with_decision(SAMPLES_GOV, Decision::Permitted),
    )
}

/// One running execution where both services read the genomes dataset.
fn shared_order() -> OrderGraph {
    OrderGraph::new()
        .execution(
            "urn:exec:1",
            &["InExecution"],
            &[CURATOR, ARCHIVE],
            &[CURATOR, ARCHIVE, "urn:dataset:genomes"],
        )
        .governed(CURATOR, CURATOR_GOV)
        .governed(ARCHIVE, ARCHIVE_GOV)
        .governed("urn:dataset:genomes", GENOMES_GOV)
        .published("urn:dataset:genomes", CURATOR, GENOMES_URI)
}

// =========================================================================
// Credential exchange
// =========================================================================

#[tokio::test]
async fn test_every_proof_suite_yields_a_usable_token() {
    let gateway = gateway(
        CURATOR,
        b"curator secret",
        shared_order().build(),
        permissive(),
        Arc::new(test_loader()),
    );

    let cases = [
        (TestKey::ed25519(), ProofSuite::Ed25519Signature2018),
        (TestKey::ed25519(), ProofSuite::Ed25519Signature2020),
        (TestKey::secp256k1(), ProofSuite::EcdsaSecp256k1Signature2019),
    ];
    for (key, suite) in cases {
        let token = gateway
            .authenticate(&present(&key, CURATOR, suite))
            .await
            .unwrap_or_else(|e| panic!("{suite} credential rejected: {e}"));
        let claims = gateway.authorize(&token, GENOMES_URI).unwrap();
        assert_eq!(claims.sub, key.did());
        assert_eq!(claims.iss, CURATOR);
    }
}

#[tokio::test]
async fn test_only_executions_consuming_the_service_contribute() {
    let graph = OrderGraph::new()
        .execution(
            "urn:exec:1",
            &["InExecution"],
            &[CURATOR],
            &[CURATOR, "urn:dataset:genomes"],
        )
        // Running, but this service is not one of its resources.
        .execution("urn:exec:2", &["InExecution"], &[CURATOR], &["urn:dataset:samples"])
        .governed(CURATOR, CURATOR_GOV)
        .governed("urn:dataset:genomes", GENOMES_GOV)
        .governed("urn:dataset:samples", SAMPLES_GOV)
        .published("urn:dataset:genomes", CURATOR, GENOMES_URI)
        .published("urn:dataset:samples", CURATOR, SAMPLES_URI)
        .build();
    let gateway = gateway(CURATOR, b"secret", graph, permissive(), Arc::new(test_loader()));

    let token = gateway
        .authenticate(&present(&TestKey::ed25519(), CURATOR, ProofSuite::Ed25519Signature2020))
        .await
        .unwrap();

    let claims = gateway.authorize(&token, GENOMES_URI).unwrap();
    assert_eq!(claims.can.read.len(), 1);
    let err = gateway.authorize(&token, SAMPLES_URI).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_finished_execution_grants_nothing() {
    let graph = OrderGraph::new()
        .execution(
            "urn:exec:1",
            &["Created", "InExecution", "Delivered"],
            &[CURATOR],
            &[CURATOR, "urn:dataset:genomes"],
        )
        .governed(CURATOR, CURATOR_GOV)
        .build();
    let logic = permissive();
    let gateway = gateway(CURATOR, b"secret", graph, logic.clone(), Arc::new(test_loader()));

    let err = gateway
        .authenticate(&present(&TestKey::ed25519(), CURATOR, ProofSuite::Ed25519Signature2020))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(logic.calls(), 0);
}

#[tokio::test]
async fn test_governance_sees_subject_zone_and_actions() {
    let logic = permissive();
    let gateway = gateway(
        CURATOR,
        b"secret",
        shared_order().build(),
        logic.clone(),
        Arc::new(test_loader()),
    );
    let key = TestKey::ed25519();

    gateway
        .authenticate(&present(&key, CURATOR, ProofSuite::Ed25519Signature2020))
        .await
        .unwrap();

    // The archive's own governance is never consulted by the curator.
    let programs = logic.programs();
    assert_eq!(programs.len(), 2);
    assert!(programs[0].contains(CURATOR_GOV));
    assert!(programs[0].contains("action('service:use')."));
    assert!(programs[1].contains(GENOMES_GOV));
    assert!(programs[1].contains("action('dataset:read')."));
    for program in &programs {
        assert!(program.contains(&format!("subject('{}').", key.did())));
        assert!(program.contains(&format!("zone('{ZONE}').")));
    }
}

#[tokio::test]
async fn test_tampered_credential_never_reaches_the_dataverse() {
    let graph = shared_order().build();
    let gateway = gateway(CURATOR, b"secret", graph.clone(), permissive(), Arc::new(test_loader()));

    let raw = present(&TestKey::ed25519(), CURATOR, ProofSuite::Ed25519Signature2020);
    let mut vc: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    vc["credentialSubject"]["forOrder"] = "urn:order:other".into();

    let err = gateway
        .authenticate(&serde_json::to_vec(&vc).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verification);
    assert_eq!(graph.calls(), 0);
}

#[tokio::test]
async fn test_context_documents_fetched_once() {
    let loader = Arc::new(CachingDocumentLoader::new(test_loader(), 8).unwrap());
    let gateway = gateway(
        CURATOR,
        b"secret",
        shared_order().build(),
        permissive(),
        loader.clone(),
    );

    for _ in 0..3 {
        gateway
            .authenticate(&present(&TestKey::ed25519(), CURATOR, ProofSuite::Ed25519Signature2020))
            .await
            .unwrap();
    }
    assert_eq!(loader.cached().await, 2);
}

// =========================================================================
// Token scope
// =========================================================================

#[tokio::test]
async fn test_tokens_are_bound_to_their_gateway() {
    let graph = shared_order().build();
    let curator = gateway(CURATOR, b"curator secret", graph.clone(), permissive(), Arc::new(test_loader()));
    let archive = gateway(ARCHIVE, b"archive secret", graph, permissive(), Arc::new(test_loader()));
    let key = TestKey::ed25519();

    let curator_token = curator
        .authenticate(&present(&key, CURATOR, ProofSuite::Ed25519Signature2020))
        .await
        .unwrap();
    let err = archive.authorize(&curator_token, GENOMES_URI).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Token);

    // A credential for the curator is useless at the archive.
    let err = archive
        .authenticate(&present(&key, CURATOR, ProofSuite::Ed25519Signature2020))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // The archive takes part but publishes nothing: an empty grant.
    let archive_token = archive
        .authenticate(&present(&key, ARCHIVE, ProofSuite::Ed25519Signature2020))
        .await
        .unwrap();
    let err = archive.authorize(&archive_token, GENOMES_URI).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_expired_token_requires_reauthentication() {
    let gateway = gateway(
        CURATOR,
        b"secret",
        shared_order().build(),
        permissive(),
        Arc::new(test_loader()),
    );
    let key = TestKey::ed25519();
    let raw = present(&key, CURATOR, ProofSuite::Ed25519Signature2020);

    let stale = gateway
        .authenticate_at(&raw, Utc::now() - Duration::minutes(10))
        .await
        .unwrap();
    let err = gateway.authorize(&stale, GENOMES_URI).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Token);

    let fresh = gateway.authenticate(&raw).await.unwrap();
    assert!(gateway.authorize(&fresh, GENOMES_URI).is_ok());
}
