use ai_bus_common::error::{CollaboratorError, CollaboratorResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Token {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[schema(value_type = String)]
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Issues and verifies HS256 bearer tokens. Grounded on the same
/// access/refresh split the original auth module used, reimplemented with
/// `jsonwebtoken` instead of python-jose.
pub struct JwtManager {
    secret: String,
    access_expire: Duration,
    refresh_expire: Duration,
}

impl JwtManager {
    pub fn new(secret: impl Into<String>, access_expire_minutes: i64, refresh_expire_days: i64) -> Self {
        Self {
            secret: secret.into(),
            access_expire: Duration::minutes(access_expire_minutes),
            refresh_expire: Duration::days(refresh_expire_days),
        }
    }

    pub fn issue(&self, user_id: &str) -> CollaboratorResult<Token> {
        let access_token = self.create_token(user_id, TokenType::Access, self.access_expire)?;
        let refresh_token = self.create_token(user_id, TokenType::Refresh, self.refresh_expire)?;
        Ok(Token {
            access_token,
            refresh_token: Some(refresh_token),
            token_type: "bearer",
            expires_in: self.access_expire.num_seconds(),
        })
    }

    pub fn create_access_token(&self, user_id: &str) -> CollaboratorResult<String> {
        self.create_token(user_id, TokenType::Access, self.access_expire)
    }

    pub fn create_refresh_token(&self, user_id: &str) -> CollaboratorResult<String> {
        self.create_token(user_id, TokenType::Refresh, self.refresh_expire)
    }

    fn create_token(&self, user_id: &str, token_type: TokenType, ttl: Duration) -> CollaboratorResult<String> {
        let now = Utc::now();
        let claims = TokenPayload {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| CollaboratorError::Other(anyhow::anyhow!(e)))
    }

    pub fn decode_token(&self, token: &str) -> CollaboratorResult<TokenPayload> {
        decode::<TokenPayload>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| CollaboratorError::Unauthorized(e.to_string()))
    }

    /// Verifies the token and additionally asserts its `type` claim matches
    /// what the caller expects — a refresh token presented where an access
    /// token is required is rejected even though the signature is valid.
    pub fn verify_token(&self, token: &str, expected: TokenType) -> CollaboratorResult<TokenPayload> {
        let payload = self.decode_token(token)?;
        if payload.token_type != expected {
            return Err(CollaboratorError::Unauthorized("unexpected token type".into()));
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret", 30, 7)
    }

    #[test]
    fn issues_and_verifies_access_token() {
        let manager = manager();
        let token = manager.create_access_token("user-1").unwrap();
        let payload = manager.verify_token(&token, TokenType::Access).unwrap();
        assert_eq!(payload.sub, "user-1");
    }

    #[test]
    fn rejects_refresh_token_presented_as_access() {
        let manager = manager();
        let token = manager.create_refresh_token("user-1").unwrap();
        assert!(manager.verify_token(&token, TokenType::Access).is_err());
    }

    #[test]
    fn rejects_tampered_secret() {
        let manager = manager();
        let other = JwtManager::new("different-secret", 30, 7);
        let token = manager.create_access_token("user-1").unwrap();
        assert!(other.verify_token(&token, TokenType::Access).is_err());
    }
}
