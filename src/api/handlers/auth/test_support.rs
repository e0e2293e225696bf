//! Shared fixtures for auth tests: a throwaway RSA signing key exposed as a
//! static JWKS, ready-made auth state, and a `oneshot` router harness.

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{Algorithm, EncodingKey, Header, jwk::JwkSet};
use once_cell::sync::Lazy;
use rsa::{
    RsaPrivateKey,
    pkcs1::{EncodeRsaPrivateKey, LineEnding},
    traits::PublicKeyParts,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use super::{
    provider::{GOOGLE_ISSUERS, GoogleVerifier},
    state::{AuthConfig, AuthState},
};
use crate::store::{MemoryStore, SharedStore};

pub(crate) const CLIENT_ID: &str = "bookshelf-test.apps.googleusercontent.com";
pub(crate) const JWT_SECRET: &str = "test-secret";
const KID: &str = "test-key";

pub(crate) struct TestProvider {
    encoding: EncodingKey,
    jwks: JwkSet,
}

// 2048-bit keygen is slow in debug builds; generate once per test binary.
static PROVIDER: Lazy<TestProvider> = Lazy::new(|| {
    let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate RSA key");
    let pem = key.to_pkcs1_pem(LineEnding::LF).expect("encode RSA key");
    let encoding = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("load RSA key");
    let jwks = serde_json::from_value(json!({
        "keys": [{
            "kty": "RSA",
            "kid": KID,
            "alg": "RS256",
            "use": "sig",
            "n": Base64UrlUnpadded::encode_string(&key.n().to_bytes_be()),
            "e": Base64UrlUnpadded::encode_string(&key.e().to_bytes_be()),
        }]
    }))
    .expect("build JWKS");
    TestProvider { encoding, jwks }
});

impl TestProvider {
    pub(crate) fn shared() -> &'static Self {
        &PROVIDER
    }

    pub(crate) fn verifier(&self) -> GoogleVerifier {
        GoogleVerifier::new(self.jwks.clone(), CLIENT_ID.to_string())
    }

    pub(crate) fn jwks(&self) -> &JwkSet {
        &self.jwks
    }

    pub(crate) fn sign(&self, claims: &Value) -> Result<String> {
        self.sign_with_kid(claims, KID)
    }

    pub(crate) fn sign_with_kid(&self, claims: &Value, kid: &str) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        Ok(jsonwebtoken::encode(&header, claims, &self.encoding)?)
    }
}

/// Claims of a well-formed Google ID token for [`CLIENT_ID`].
pub(crate) fn id_token_claims(sub: &str, email: Option<&str>) -> Value {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "iss": GOOGLE_ISSUERS[1],
        "aud": CLIENT_ID,
        "sub": sub,
        "name": "Test User",
        "iat": now,
        "exp": now + 3600,
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
        claims["email_verified"] = json!(true);
    }
    claims
}

/// Auth state with provider login enabled against [`TestProvider`].
pub(crate) fn auth_state() -> Arc<AuthState> {
    let state = AuthState::new(
        AuthConfig::new(),
        &SecretString::from(JWT_SECRET.to_string()),
    )
    .with_provider(Arc::new(TestProvider::shared().verifier()));
    Arc::new(state)
}

/// Auth state with provider login disabled.
pub(crate) fn auth_state_without_provider() -> Arc<AuthState> {
    Arc::new(AuthState::new(
        AuthConfig::new(),
        &SecretString::from(JWT_SECRET.to_string()),
    ))
}

/// Router over a fresh in-memory store, driven with `oneshot`.
pub(crate) struct TestApp {
    router: Router,
}

impl TestApp {
    pub(crate) fn new() -> Self {
        Self::with_auth(auth_state())
    }

    pub(crate) fn with_auth(auth: Arc<AuthState>) -> Self {
        let store: SharedStore = Arc::new(MemoryStore::new());
        Self {
            router: crate::api::app(store, auth),
        }
    }

    /// Send a request and return the status plus the JSON body (`Null` when empty).
    pub(crate) async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send_request(request).await
    }

    pub(crate) async fn send_request(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    /// Register `username` and return its session token.
    pub(crate) async fn register(&self, username: &str) -> Result<String> {
        let (status, body) = self
            .send(
                "POST",
                "/api/register",
                None,
                Some(json!({ "username": username, "password": "secret" })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {body}");
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("missing token")
    }
}
