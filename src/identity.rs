use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

/// Header the identity gateway fills in after verifying the client token.
/// Token verification itself happens outside this service; by the time a
/// request reaches us the uid is already trusted.
const AUTH_UID_HEADER: &str = "x-auth-uid";

/// Extracts the externally-verified uid. Rejects requests that bypassed the
/// gateway.
pub struct Identity(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get(AUTH_UID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing verified identity".to_string(),
            ))?;
        Ok(Identity(uid.to_string()))
    }
}
