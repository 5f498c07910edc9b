//! HTTP API server for the Warden node.
//!
//! Exposes the two protocols of the authenticator: exchanging a credential for
//! a capability token and checking a token against a resource URI.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use warden_auth::{Authenticator, TokenClaims};
use warden_core::{AuthError, ErrorKind};

// --- Request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct AuthorizeQuery {
    pub uri: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service_id: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Transport => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Validation
        | ErrorKind::Verification
        | ErrorKind::NotFound
        | ErrorKind::Ambiguous
        | ErrorKind::GovernanceDenied
        | ErrorKind::Token => StatusCode::UNAUTHORIZED,
    }
}

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// --- Handlers ---

async fn handle_health(State(auth): State<Arc<Authenticator>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        service_id: auth.service_id().to_string(),
    })
}

/// The body is the raw credential. Failure details stay in the logs.
async fn handle_auth(
    State(auth): State<Arc<Authenticator>>,
    body: Bytes,
) -> Result<Json<AuthResponse>, ApiError> {
    match auth.authenticate(&body).await {
        Ok(access_token) => Ok(Json(AuthResponse { access_token })),
        Err(err) => {
            let status = status_for(err.kind());
            let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                "dataverse unavailable"
            } else {
                "authentication failed"
            };
            Err(api_error(status, message))
        }
    }
}

async fn handle_authorize(
    State(auth): State<Arc<Authenticator>>,
    headers: HeaderMap,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Json<TokenClaims>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

    auth.authorize(token, &query.uri)
        .map(Json)
        .map_err(|err: AuthError| {
            tracing::debug!(uri = %query.uri, error = %err, "authorization refused");
            api_error(status_for(err.kind()), err.to_string())
        })
}

// --- Server ---

pub fn build_router(authenticator: Arc<Authenticator>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/auth", post(handle_auth))
        .route("/api/v1/authorize", get(handle_authorize))
        .with_state(authenticator)
}

pub async fn start_api_server<F>(
    listen_addr: SocketAddr,
    authenticator: Arc<Authenticator>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(authenticator);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use warden_core::AuthenticatorConfig;
    use warden_credentials::proof::ProofSuite;
    use warden_credentials::testing::{credential, sign_credential, test_loader, TestKey};
    use warden_dataverse::ontology::{self, execution_status};
    use warden_dataverse::testing::{
        Decision, MemoryTriplestore, ScriptedLogic, TRIPLESTORE_ADDRESS,
    };
    use warden_dataverse::DataverseClient;

    const SERVICE: &str = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";
    const ORDER: &str = "urn:order:1";
    const EXEC: &str = "urn:exec:1";
    const SERVICE_GOV: &str = "https://gov.example/service.pl";
    const DATASET_GOV: &str = "https://gov.example/dataset.pl";
    const DATASET_URI: &str = "https://s3.example/bucket/dataset";

    fn store() -> MemoryTriplestore {
        MemoryTriplestore::new()
            .with_iri(ORDER, ontology::HAS_ZONE, "urn:zone:1")
            .with_iri(ORDER, ontology::HAS_EXECUTION, EXEC)
            .with_iri(EXEC, ontology::HAS_PARTICIPANT, SERVICE)
            .with_iri(EXEC, ontology::HAS_STATUS, &execution_status("InExecution"))
            .with_iri(EXEC, ontology::CONSUMES, SERVICE)
            .with_iri(EXEC, ontology::CONSUMES, "urn:dataset:1")
            .with_iri(SERVICE, ontology::HAS_GOVERNANCE, "urn:gov:service")
            .with_literal("urn:gov:service", ontology::HAS_GOVERNANCE_CODE, SERVICE_GOV)
            .with_iri("urn:dataset:1", ontology::HAS_GOVERNANCE, "urn:gov:dataset")
            .with_literal("urn:gov:dataset", ontology::HAS_GOVERNANCE_CODE, DATASET_GOV)
            .with_iri("urn:publication:1", ontology::DESCRIBES, "urn:dataset:1")
            .with_iri("urn:publication:1", ontology::SERVED_BY, SERVICE)
            .with_literal("urn:publication:1", ontology::HAS_ACCESS_URI, DATASET_URI)
    }

    fn router(store: MemoryTriplestore, dataset: Decision) -> Router {
        let dataverse = Arc::new(DataverseClient::new(Arc::new(store), TRIPLESTORE_ADDRESS));
        let logic = ScriptedLogic::new()
            .with_decision(SERVICE_GOV, Decision::Permitted)
            .with_decision(DATASET_GOV, dataset);
        let authenticator = Authenticator::new(
            AuthenticatorConfig::new(SERVICE),
            b"api test secret".to_vec(),
            Arc::new(test_loader()),
            dataverse,
            Arc::new(logic),
        )
        .unwrap();
        build_router(Arc::new(authenticator))
    }

    fn signed_credential(to_service: &str) -> Vec<u8> {
        let key = TestKey::ed25519();
        let did = key.did();
        let vc = sign_credential(
            credential(&did, &did, to_service, ORDER),
            &key,
            ProofSuite::Ed25519Signature2020,
        );
        serde_json::to_vec(&vc).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn auth_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth")
            .body(Body::from(body))
            .unwrap()
    }

    fn authorize_request(token: Option<&str>, uri: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(format!("/api/v1/authorize?uri={uri}"));
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(store(), Decision::Permitted);
        let request = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service_id"], SERVICE);
    }

    #[tokio::test]
    async fn test_auth_then_authorize() {
        let app = router(store(), Decision::Permitted);

        let (status, body) = send(app.clone(), auth_request(signed_credential(SERVICE))).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["accessToken"].as_str().unwrap().to_string();

        let (status, claims) = send(app.clone(), authorize_request(Some(&token), DATASET_URI)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(claims["iss"], SERVICE);
        assert_eq!(claims["can"]["read"][0], DATASET_URI);

        let (status, body) = send(app, authorize_request(Some(&token), "https://other")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("forbidden"));
    }

    #[tokio::test]
    async fn test_auth_failures_are_generic() {
        let app = router(store(), Decision::Prohibited);

        let (status, body) = send(app.clone(), auth_request(signed_credential(SERVICE))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication failed");

        let (status, body) = send(app, auth_request(b"{not json".to_vec())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication failed");
    }

    #[tokio::test]
    async fn test_dataverse_outage_is_server_error() {
        let app = router(store().failing(), Decision::Permitted);
        let (status, body) = send(app, auth_request(signed_credential(SERVICE))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "dataverse unavailable");
    }

    #[tokio::test]
    async fn test_authorize_requires_valid_bearer() {
        let app = router(store(), Decision::Permitted);

        let (status, _) = send(app.clone(), authorize_request(None, DATASET_URI)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(app, authorize_request(Some("garbage"), DATASET_URI)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(ErrorKind::Transport),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(ErrorKind::GovernanceDenied), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::Token), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
