// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixtures shared by unit tests: RSA signing keys, a mocked JWKS endpoint
//! and token builders.

use std::collections::HashMap;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{AuthConfig, ISSUER_DOMAIN_ENV, JWKS_RPM_ENV, JWKS_URL_ENV};

/// JWKS publishing the public half of [`PRIMARY_KEY_PEM`] as `k1`.
pub const JWKS_FIXTURE: &str = include_str!("../tests/fixtures/jwks.json");
pub const PRIMARY_KEY_PEM: &str = include_str!("../tests/fixtures/primary_rsa.pem");
/// A key absent from the JWKS.
pub const ROGUE_KEY_PEM: &str = include_str!("../tests/fixtures/rogue_rsa.pem");

pub const JWKS_PATH: &str = "/.well-known/jwks.json";
pub const ISSUER_DOMAIN: &str = "tenant.example.com";
pub const ISSUER: &str = "https://tenant.example.com/";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Payload for `sub`, valid for an hour.
pub fn claims_for(sub: &str, nickname: &str) -> serde_json::Value {
    json!({
        "sub": sub,
        "nickname": nickname,
        "email": format!("{nickname}@example.com"),
        "email_verified": true,
        "iss": ISSUER,
        "iat": now(),
        "exp": now() + 3600,
    })
}

/// RS256 token signed with `pem`, header `kid` set when given.
pub fn sign(claims: &serde_json::Value, kid: Option<&str>, pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

pub fn sign_primary(claims: &serde_json::Value) -> String {
    sign(claims, Some("k1"), PRIMARY_KEY_PEM)
}

/// Mock JWKS endpoint serving the fixture.
pub async fn jwks_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(JWKS_FIXTURE))
        .mount(&server)
        .await;
    server
}

/// Auth settings pointing at `server`, with a generous fetch ceiling.
pub fn auth_config(server: &MockServer) -> AuthConfig {
    let vars = HashMap::from([
        (ISSUER_DOMAIN_ENV.to_string(), ISSUER_DOMAIN.to_string()),
        (JWKS_URL_ENV.to_string(), format!("{}{}", server.uri(), JWKS_PATH)),
        (JWKS_RPM_ENV.to_string(), "60".to_string()),
    ]);
    AuthConfig::from_vars(&vars).unwrap()
}
