//! Linked-data proof verification.
//!
//! Supported suites: `Ed25519Signature2018` and `EcdsaSecp256k1Signature2019`
//! (detached JWS, `b64:false`) and `Ed25519Signature2020` (multibase
//! `proofValue`). Signatures cover
//! `sha256(urdna2015(proof options)) || sha256(urdna2015(document))`, the
//! proof options carrying the document's `@context`.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use warden_crypto::{b64url_decode, multibase_decode, DidKey, KeyType};

use crate::canonical::canonical_hash;
use crate::credential::VerifiableCredential;
use crate::error::CredentialError;
use crate::jsonld::Contexts;

/// Proof members that hold the signature and are excluded from the signed options.
const SIGNATURE_MEMBERS: [&str; 3] = ["jws", "proofValue", "signatureValue"];

/// A supported linked-data signature suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofSuite {
    Ed25519Signature2018,
    Ed25519Signature2020,
    EcdsaSecp256k1Signature2019,
}

impl ProofSuite {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ed25519Signature2018 => "Ed25519Signature2018",
            Self::Ed25519Signature2020 => "Ed25519Signature2020",
            Self::EcdsaSecp256k1Signature2019 => "EcdsaSecp256k1Signature2019",
        }
    }

    /// Key type the suite signs with.
    pub fn key_type(self) -> KeyType {
        match self {
            Self::Ed25519Signature2018 | Self::Ed25519Signature2020 => KeyType::Ed25519,
            Self::EcdsaSecp256k1Signature2019 => KeyType::Secp256k1,
        }
    }

    /// JWS `alg` of the detached-JWS suites.
    pub fn jws_alg(self) -> Option<&'static str> {
        match self {
            Self::Ed25519Signature2018 => Some("EdDSA"),
            Self::EcdsaSecp256k1Signature2019 => Some("ES256K"),
            Self::Ed25519Signature2020 => None,
        }
    }
}

impl fmt::Display for ProofSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofSuite {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ed25519Signature2018" => Ok(Self::Ed25519Signature2018),
            "Ed25519Signature2020" => Ok(Self::Ed25519Signature2020),
            "EcdsaSecp256k1Signature2019" => Ok(Self::EcdsaSecp256k1Signature2019),
            other => Err(CredentialError::UnsupportedProof(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JwsHeader {
    alg: String,
    #[serde(default = "default_b64")]
    b64: bool,
    #[serde(default)]
    crit: Vec<String>,
}

fn default_b64() -> bool {
    true
}

/// Bytes covered by the proof signature.
///
/// `proof` is the proof object as embedded in `document`; its signature
/// members are ignored. `document` is the credential without its proof.
pub fn signing_input(
    document: &Value,
    proof: &Map<String, Value>,
    contexts: &Contexts,
) -> Result<Vec<u8>, CredentialError> {
    let mut options = proof.clone();
    for member in SIGNATURE_MEMBERS {
        options.remove(member);
    }
    options.remove("@context");
    if let Some(context) = document.get("@context") {
        options.insert("@context".into(), context.clone());
    }

    let mut input = Vec::with_capacity(64);
    input.extend_from_slice(&canonical_hash(&Value::Object(options), contexts)?);
    input.extend_from_slice(&canonical_hash(document, contexts)?);
    Ok(input)
}

fn str_member<'a>(proof: &'a Map<String, Value>, name: &str) -> Result<&'a str, CredentialError> {
    proof
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| CredentialError::InvalidProof(format!("proof has no '{name}'")))
}

/// Verify the single proof of `vc`, returning the key that signed it.
///
/// `contexts` must hold every remote context the credential references.
pub fn verify_proof(vc: &VerifiableCredential, contexts: &Contexts) -> Result<DidKey, CredentialError> {
    let proof = vc.proof()?;
    let suite: ProofSuite = str_member(proof, "type")?.parse()?;

    let purpose = str_member(proof, "proofPurpose")?;
    if purpose != "assertionMethod" {
        return Err(CredentialError::InvalidProof(format!(
            "unexpected proof purpose '{purpose}'"
        )));
    }

    let method = str_member(proof, "verificationMethod")?;
    let signer = DidKey::resolve_verification_method(vc.issuer()?, method)?;
    if signer.public_key().key_type() != suite.key_type() {
        return Err(CredentialError::InvalidProof(format!(
            "{suite} requires a {} key, got {}",
            suite.key_type(),
            signer.public_key().key_type()
        )));
    }

    let input = signing_input(&vc.unsecured_document(), proof, contexts)?;
    match suite.jws_alg() {
        Some(alg) => verify_detached_jws(str_member(proof, "jws")?, alg, &input, &signer)?,
        None => {
            let signature = multibase_decode(str_member(proof, "proofValue")?)?;
            warden_crypto::verify(&input, &signature, signer.public_key())?;
        }
    }

    Ok(signer)
}

fn verify_detached_jws(
    jws: &str,
    expected_alg: &str,
    input: &[u8],
    signer: &DidKey,
) -> Result<(), CredentialError> {
    let segments: Vec<&str> = jws.split('.').collect();
    let (header_segment, signature_segment) = match segments.as_slice() {
        [header, "", signature] => (*header, *signature),
        _ => return Err(CredentialError::InvalidProof("jws must be detached".into())),
    };

    let header: JwsHeader = serde_json::from_slice(&b64url_decode(header_segment)?)
        .map_err(|e| CredentialError::InvalidProof(format!("invalid jws header: {e}")))?;
    if header.alg != expected_alg {
        return Err(CredentialError::InvalidProof(format!(
            "jws alg '{}' does not match {expected_alg}",
            header.alg
        )));
    }
    if header.b64 || !header.crit.iter().any(|c| c == "b64") {
        return Err(CredentialError::InvalidProof(
            "jws must use an unencoded payload".into(),
        ));
    }

    let mut message = Vec::with_capacity(header_segment.len() + 1 + input.len());
    message.extend_from_slice(header_segment.as_bytes());
    message.push(b'.');
    message.extend_from_slice(input);

    let signature = b64url_decode(signature_segment)?;
    warden_crypto::verify(&message, &signature, signer.public_key())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{credential, sign_credential, test_contexts, TestKey, VECTOR_DID, VECTOR_SEED};
    use serde_json::json;

    const SERVICE: &str = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";

    fn signed(key: &TestKey, suite: ProofSuite) -> Value {
        let did = key.did();
        sign_credential(credential(&did, &did, SERVICE, "urn:order:1"), key, suite)
    }

    fn verify_value(value: Value) -> Result<DidKey, CredentialError> {
        let contexts = test_contexts(&value);
        verify_proof(&VerifiableCredential::from_value(value)?, &contexts)
    }

    /// Credential of the RFC 8032 test key, with a proof made independently
    /// of this crate.
    fn vector(proof: Value) -> Value {
        let mut document = credential(VECTOR_DID, VECTOR_DID, SERVICE, "urn:order:1");
        document["proof"] = proof;
        document
    }

    fn vector_method() -> String {
        format!("{VECTOR_DID}#{}", &VECTOR_DID["did:key:".len()..])
    }

    #[test]
    fn test_suite_names() {
        for suite in [
            ProofSuite::Ed25519Signature2018,
            ProofSuite::Ed25519Signature2020,
            ProofSuite::EcdsaSecp256k1Signature2019,
        ] {
            assert_eq!(suite.as_str().parse::<ProofSuite>().unwrap(), suite);
        }
        assert!(matches!(
            "RsaSignature2018".parse::<ProofSuite>(),
            Err(CredentialError::UnsupportedProof(_))
        ));
    }

    #[test]
    fn test_ed25519_signature_2020_vector() {
        let value = vector(json!({
            "type": "Ed25519Signature2020",
            "created": "2024-01-01T00:00:00Z",
            "verificationMethod": vector_method(),
            "proofPurpose": "assertionMethod",
            "proofValue": "zrmvbYaGDmgTNF6ZwFHK2XVmiMa9RWVb9DmxFxRqUs2T9tK7rUKGUv7D2cAMfACAE9CPQ3mwz67w44p812qMKEDe"
        }));
        let signer = verify_value(value.clone()).unwrap();
        assert_eq!(signer.to_string(), VECTOR_DID);

        let resigned = sign_credential(
            vector(Value::Null),
            &TestKey::ed25519_from_seed(VECTOR_SEED),
            ProofSuite::Ed25519Signature2020,
        );
        assert_eq!(resigned["proof"]["proofValue"], value["proof"]["proofValue"]);
    }

    #[test]
    fn test_ed25519_signature_2018_vector() {
        let value = vector(json!({
            "type": "Ed25519Signature2018",
            "created": "2024-01-01T00:00:00Z",
            "verificationMethod": vector_method(),
            "proofPurpose": "assertionMethod",
            "jws": "eyJhbGciOiJFZERTQSIsImI2NCI6ZmFsc2UsImNyaXQiOlsiYjY0Il19..7JFFircUuYiAV-e9NN0jXwHMm2OTRyUFR2Bs1sIdpBPLgTwyvZpkE1wIDyQ4bvK4fhqQu2gH3ckhAUNeGDRcBQ"
        }));
        assert!(verify_value(value).is_ok());
    }

    #[test]
    fn test_all_suites_verify() {
        let ed = TestKey::ed25519();
        let secp = TestKey::secp256k1();
        assert!(verify_value(signed(&ed, ProofSuite::Ed25519Signature2018)).is_ok());
        assert!(verify_value(signed(&ed, ProofSuite::Ed25519Signature2020)).is_ok());
        let signer = verify_value(signed(&secp, ProofSuite::EcdsaSecp256k1Signature2019)).unwrap();
        assert_eq!(signer.to_string(), secp.did());
    }

    #[test]
    fn test_equivalent_json_shapes_still_verify() {
        let key = TestKey::ed25519();
        let value = signed(&key, ProofSuite::Ed25519Signature2020);

        let mut issuer_object = value.clone();
        issuer_object["issuer"] = json!({"id": key.did()});
        assert!(verify_value(issuer_object).is_ok());

        let mut subject_array = value.clone();
        subject_array["credentialSubject"] = json!([value["credentialSubject"].clone()]);
        assert!(verify_value(subject_array).is_ok());
    }

    #[test]
    fn test_tampered_document_fails() {
        let key = TestKey::ed25519();
        for suite in [ProofSuite::Ed25519Signature2018, ProofSuite::Ed25519Signature2020] {
            let mut value = signed(&key, suite);
            value["credentialSubject"]["forOrder"] = json!("urn:order:2");
            assert!(matches!(
                verify_value(value),
                Err(CredentialError::Crypto(_))
            ));
        }
    }

    #[test]
    fn test_tampered_proof_options_fail() {
        let key = TestKey::secp256k1();
        let mut value = signed(&key, ProofSuite::EcdsaSecp256k1Signature2019);
        value["proof"]["created"] = json!("2030-01-01T00:00:00Z");
        assert!(verify_value(value).is_err());
    }

    #[test]
    fn test_suite_key_type_mismatch() {
        let key = TestKey::secp256k1();
        let mut value = signed(&key, ProofSuite::EcdsaSecp256k1Signature2019);
        value["proof"]["type"] = json!("Ed25519Signature2018");
        assert!(matches!(
            verify_value(value),
            Err(CredentialError::InvalidProof(_))
        ));
    }

    #[test]
    fn test_foreign_verification_method_rejected() {
        let key = TestKey::ed25519();
        let other = TestKey::ed25519();
        let mut value = signed(&key, ProofSuite::Ed25519Signature2020);
        value["proof"]["verificationMethod"] =
            json!(format!("{}#{}", other.did(), &other.did()["did:key:".len()..]));
        assert!(matches!(
            verify_value(value),
            Err(CredentialError::Crypto(_))
        ));
    }

    #[test]
    fn test_attached_jws_rejected() {
        let key = TestKey::ed25519();
        let mut value = signed(&key, ProofSuite::Ed25519Signature2018);
        let jws = value["proof"]["jws"].as_str().unwrap().to_string();
        let (header, signature) = jws.split_once("..").unwrap();
        value["proof"]["jws"] = json!(format!("{header}.cGF5bG9hZA.{signature}"));
        assert!(matches!(
            verify_value(value),
            Err(CredentialError::InvalidProof(_))
        ));
    }

    #[test]
    fn test_signing_input_ignores_signature_members() {
        let document = credential(VECTOR_DID, VECTOR_DID, SERVICE, "urn:order:1");
        let contexts = test_contexts(&document);
        let mut proof = json!({
            "type": "Ed25519Signature2020",
            "created": "2024-01-01T00:00:00Z",
            "verificationMethod": vector_method(),
            "proofPurpose": "assertionMethod"
        })
        .as_object()
        .unwrap()
        .clone();
        let before = signing_input(&document, &proof, &contexts).unwrap();
        proof.insert("proofValue".into(), json!("zsig"));
        assert_eq!(signing_input(&document, &proof, &contexts).unwrap(), before);
        assert_eq!(before.len(), 64);
    }

    #[test]
    fn test_undefined_proof_option_rejected() {
        let key = TestKey::ed25519();
        let mut value = signed(&key, ProofSuite::Ed25519Signature2020);
        value["proof"]["unknownOption"] = json!("x");
        assert!(matches!(
            verify_value(value),
            Err(CredentialError::UndefinedTerm(_))
        ));
    }

    #[test]
    fn test_wrong_proof_purpose() {
        let key = TestKey::ed25519();
        let mut value = signed(&key, ProofSuite::Ed25519Signature2020);
        value["proof"]["proofPurpose"] = json!("authentication");
        assert!(matches!(
            verify_value(value),
            Err(CredentialError::InvalidProof(_))
        ));
    }
}
