//! Helpers for building signed credentials in tests.

use ed25519_dalek::Signer as _;
use k256::ecdsa::signature::Signer as _;
use rand::rngs::OsRng;
use serde_json::{json, Map, Value};

use warden_crypto::{b64url_encode, multibase_encode, DidKey, PublicKey};

use crate::credential::CREDENTIALS_V1_CONTEXT;
use crate::jsonld::Contexts;
use crate::loader::StaticDocumentLoader;
use crate::proof::{signing_input, ProofSuite};

pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";

/// Seed of the first RFC 8032 Ed25519 test key.
pub const VECTOR_SEED: [u8; 32] = [
    0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c, 0xc4,
    0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae, 0x7f, 0x60,
];

/// `did:key` of [`VECTOR_SEED`].
pub const VECTOR_DID: &str = "did:key:z6MktwupdmLXVVqTzCw4i46r4uGyosGXRnR3XjN4Zq7oMMsw";

/// A signing key of either supported algorithm.
pub enum TestKey {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl TestKey {
    pub fn ed25519() -> Self {
        Self::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
    }

    pub fn ed25519_from_seed(seed: [u8; 32]) -> Self {
        Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed))
    }

    pub fn secp256k1() -> Self {
        Self::Secp256k1(k256::ecdsa::SigningKey::random(&mut OsRng))
    }

    pub fn did_key(&self) -> DidKey {
        let public = match self {
            Self::Ed25519(sk) => PublicKey::from(sk.verifying_key()),
            Self::Secp256k1(sk) => PublicKey::from(k256::ecdsa::VerifyingKey::from(sk)),
        };
        DidKey::from_public_key(public)
    }

    pub fn did(&self) -> String {
        self.did_key().to_string()
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Ed25519(sk) => sk.sign(message).to_bytes().to_vec(),
            Self::Secp256k1(sk) => {
                let sig: k256::ecdsa::Signature = sk.sign(message);
                sig.to_bytes().to_vec()
            }
        }
    }
}

/// An unsigned authentication credential from `issuer` about `subject_id`.
pub fn credential(issuer: &str, subject_id: &str, to_service: &str, for_order: &str) -> Value {
    json!({
        "@context": [
            CREDENTIALS_V1_CONTEXT,
            ED25519_2020_CONTEXT,
            {
                "AuthorizationCredential": "https://ontology.okp4.space/core/AuthorizationCredential",
                "toService": {"@id": "https://ontology.okp4.space/core/toService", "@type": "@id"},
                "forOrder": {"@id": "https://ontology.okp4.space/core/forOrder", "@type": "@id"}
            }
        ],
        "id": "urn:uuid:6f1b4a0e-0000-4000-8000-000000000001",
        "type": ["VerifiableCredential", "AuthorizationCredential"],
        "issuer": issuer,
        "issuanceDate": "2024-01-01T00:00:00Z",
        "credentialSubject": {
            "id": subject_id,
            "toService": to_service,
            "forOrder": for_order
        }
    })
}

/// Attach a proof of `suite` made with `key` to `document`.
pub fn sign_credential(mut document: Value, key: &TestKey, suite: ProofSuite) -> Value {
    if let Some(map) = document.as_object_mut() {
        map.remove("proof");
    }

    let mut proof = Map::new();
    proof.insert("type".into(), json!(suite.as_str()));
    proof.insert("created".into(), json!("2024-01-01T00:00:00Z"));
    proof.insert("verificationMethod".into(), json!(key.did_key().verification_method()));
    proof.insert("proofPurpose".into(), json!("assertionMethod"));

    let input = signing_input(&document, &proof, &test_contexts(&document))
        .expect("test credential should canonicalize");
    match suite.jws_alg() {
        Some(alg) => {
            let header = json!({"alg": alg, "b64": false, "crit": ["b64"]});
            let header = b64url_encode(header.to_string().as_bytes());
            let mut message = format!("{header}.").into_bytes();
            message.extend_from_slice(&input);
            let signature = b64url_encode(&key.sign(&message));
            proof.insert("jws".into(), json!(format!("{header}..{signature}")));
        }
        None => {
            proof.insert("proofValue".into(), json!(multibase_encode(&key.sign(&input))));
        }
    }

    document["proof"] = Value::Object(proof);
    document
}

/// Contexts of `document`, served by [`test_loader`].
pub fn test_contexts(document: &Value) -> Contexts {
    let loader = test_loader();
    Contexts::load_with(document, |url| loader.get(url)).expect("test contexts should load")
}

/// A loader serving condensed copies of the contexts used by [`credential`].
pub fn test_loader() -> StaticDocumentLoader {
    let proof_purpose = json!({
        "@id": "sec:proofPurpose",
        "@type": "@vocab",
        "@context": {
            "@version": 1.1,
            "@protected": true,
            "id": "@id",
            "type": "@type",
            "sec": "https://w3id.org/security#",
            "assertionMethod": {"@id": "sec:assertionMethod", "@type": "@id", "@container": "@set"},
            "authentication": {"@id": "sec:authenticationMethod", "@type": "@id", "@container": "@set"}
        }
    });
    let proof_terms = |proof_value: Value| {
        json!({
            "@version": 1.1,
            "@protected": true,
            "id": "@id",
            "type": "@type",
            "sec": "https://w3id.org/security#",
            "xsd": "http://www.w3.org/2001/XMLSchema#",
            "challenge": "sec:challenge",
            "created": {"@id": "http://purl.org/dc/terms/created", "@type": "xsd:dateTime"},
            "domain": "sec:domain",
            "expires": {"@id": "sec:expiration", "@type": "xsd:dateTime"},
            "jws": "sec:jws",
            "nonce": "sec:nonce",
            "proofPurpose": proof_purpose.clone(),
            "proofValue": proof_value,
            "verificationMethod": {"@id": "sec:verificationMethod", "@type": "@id"}
        })
    };
    let proof = json!({"@id": "https://w3id.org/security#proof", "@type": "@id", "@container": "@graph"});

    StaticDocumentLoader::new()
        .with_document(
            CREDENTIALS_V1_CONTEXT,
            json!({"@context": {
                "@version": 1.1,
                "@protected": true,
                "id": "@id",
                "type": "@type",
                "VerifiableCredential": {
                    "@id": "https://www.w3.org/2018/credentials#VerifiableCredential",
                    "@context": {
                        "@version": 1.1,
                        "@protected": true,
                        "id": "@id",
                        "type": "@type",
                        "cred": "https://www.w3.org/2018/credentials#",
                        "sec": "https://w3id.org/security#",
                        "xsd": "http://www.w3.org/2001/XMLSchema#",
                        "credentialSchema": {"@id": "cred:credentialSchema", "@type": "@id"},
                        "credentialStatus": {"@id": "cred:credentialStatus", "@type": "@id"},
                        "credentialSubject": {"@id": "cred:credentialSubject", "@type": "@id"},
                        "evidence": {"@id": "cred:evidence", "@type": "@id"},
                        "expirationDate": {"@id": "cred:expirationDate", "@type": "xsd:dateTime"},
                        "holder": {"@id": "cred:holder", "@type": "@id"},
                        "issued": {"@id": "cred:issued", "@type": "xsd:dateTime"},
                        "issuer": {"@id": "cred:issuer", "@type": "@id"},
                        "issuanceDate": {"@id": "cred:issuanceDate", "@type": "xsd:dateTime"},
                        "proof": proof.clone(),
                        "validFrom": {"@id": "cred:validFrom", "@type": "xsd:dateTime"},
                        "validUntil": {"@id": "cred:validUntil", "@type": "xsd:dateTime"}
                    }
                },
                "Ed25519Signature2018": {
                    "@id": "https://w3id.org/security#Ed25519Signature2018",
                    "@context": proof_terms(json!("sec:proofValue"))
                },
                "EcdsaSecp256k1Signature2019": {
                    "@id": "https://w3id.org/security#EcdsaSecp256k1Signature2019",
                    "@context": proof_terms(json!("sec:proofValue"))
                }
            }}),
        )
        .with_document(
            ED25519_2020_CONTEXT,
            json!({"@context": {
                "id": "@id",
                "type": "@type",
                "@protected": true,
                "proof": proof,
                "Ed25519Signature2020": {
                    "@id": "https://w3id.org/security#Ed25519Signature2020",
                    "@context": proof_terms(json!({
                        "@id": "https://w3id.org/security#proofValue",
                        "@type": "https://w3id.org/security#multibase"
                    }))
                }
            }}),
        )
}
