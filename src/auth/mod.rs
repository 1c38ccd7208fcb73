use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Type of JWT: access or refresh. Only access tokens open API routes;
/// refresh tokens are the session service's business.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// JWT payload as issued by the session service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

/// Extracts and validates the bearer token, yielding the user id.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthorized("missing Authorization header"))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthorized("invalid auth scheme"))?;

        let cfg = &state.config.jwt;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        let decoding = DecodingKey::from_secret(cfg.secret.as_bytes());

        let data = decode::<Claims>(token, &decoding, &validation)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token"))?;

        if data.claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthorized("not an access token"));
        }

        Ok(AuthUser(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;

    fn token_for(kind: TokenKind, ttl_secs: i64, iss: &str, aud: &str) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id,
            iat: now as usize,
            exp: (now + ttl_secs) as usize,
            iss: iss.into(),
            aud: aud.into(),
            kind,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test"),
        )
        .unwrap();
        (user_id, token)
    }

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn accepts_valid_access_token() {
        let state = AppState::fake();
        let (user_id, token) = token_for(TokenKind::Access, 300, "test", "test");
        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));

        let AuthUser(extracted) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(extracted, user_id);
    }

    #[tokio::test]
    async fn rejects_refresh_token() {
        let state = AppState::fake();
        let (_, token) = token_for(TokenKind::Refresh, 300, "test", "test");
        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));

        assert!(AuthUser::from_request_parts(&mut parts, &state)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let state = AppState::fake();
        let (_, token) = token_for(TokenKind::Access, -300, "test", "test");
        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));

        assert!(AuthUser::from_request_parts(&mut parts, &state)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rejects_wrong_audience() {
        let state = AppState::fake();
        let (_, token) = token_for(TokenKind::Access, 300, "test", "someone-else");
        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));

        assert!(AuthUser::from_request_parts(&mut parts, &state)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rejects_missing_header_and_bad_scheme() {
        let state = AppState::fake();

        let mut parts = parts_with_header(None);
        assert!(AuthUser::from_request_parts(&mut parts, &state)
            .await
            .is_err());

        let mut parts = parts_with_header(Some("Basic dXNlcjpwdw=="));
        assert!(AuthUser::from_request_parts(&mut parts, &state)
            .await
            .is_err());
    }
}
