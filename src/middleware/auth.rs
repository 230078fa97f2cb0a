use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::router::MedminderState;

/// Gate for the scheduler controls and the manual reminder trigger.
///
/// The admin key may arrive as `x-admin-key`, as a bearer token, or as `?key=`
/// (the legacy `/send_reminders` link). An empty configured key matches nothing.
pub fn ensure_authorized(
    headers: &HeaderMap,
    query: Option<&str>,
    expected: &str,
) -> Result<(), Response> {
    if !expected.is_empty() {
        let presented = presented_keys(headers, query);
        if presented
            .iter()
            .any(|key| bool::from(key.as_bytes().ct_eq(expected.as_bytes())))
        {
            return Ok(());
        }
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized", "reason": "admin key required"})),
    )
        .into_response())
}

fn presented_keys(headers: &HeaderMap, query: Option<&str>) -> Vec<String> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let mut keys = Vec::new();
    keys.extend(header("x-admin-key").map(str::to_owned));
    if let Some(auth) = header("authorization").map(str::trim)
        && let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
    {
        keys.push(token.to_owned());
    }
    if let Some(qs) = query {
        keys.extend(
            url::form_urlencoded::parse(qs.as_bytes())
                .filter(|(k, _)| k == "key")
                .map(|(_, v)| v.into_owned()),
        );
    }
    keys
}

#[derive(Debug, Clone, Copy)]
pub struct RequireAdminKey;

impl FromRequestParts<MedminderState> for RequireAdminKey {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &MedminderState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, parts.uri.query(), &state.admin_key)?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn accepts_header_bearer_and_query() {
        let mut headers = HeaderMap::new();
        assert!(ensure_authorized(&headers, Some("key=k1"), "k1").is_ok());
        assert!(ensure_authorized(&headers, Some("key=nope"), "k1").is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer k1"));
        assert!(ensure_authorized(&headers, None, "k1").is_ok());

        let mut headers = HeaderMap::new();
        headers.insert("x-admin-key", HeaderValue::from_static("k1"));
        assert!(ensure_authorized(&headers, None, "k1").is_ok());
        assert!(ensure_authorized(&headers, None, "k2").is_err());
    }

    #[test]
    fn empty_configured_key_rejects_everything() {
        let mut headers = HeaderMap::new();
        headers.insert("x-admin-key", HeaderValue::from_static(""));
        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(ensure_authorized(&headers, Some("key="), "").is_err());
        assert!(ensure_authorized(&HeaderMap::new(), None, "").is_err());
    }
}
