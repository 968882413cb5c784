use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

/// Token claims. Tokens are minted by an external identity provider; the
/// gallery only verifies them. Profile fields are optional and are copied
/// onto the local user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl Claims {
    /// Claims valid for `ttl_secs` from now. Negative values yield an expired token.
    pub fn new(user_id: impl Into<String>, role: UserRole, ttl_secs: i64) -> Self {
        let issued_at = Utc::now().timestamp();
        Self {
            sub: user_id.into(),
            role,
            iat: issued_at,
            exp: issued_at + ttl_secs,
            email: None,
            first_name: None,
            last_name: None,
            picture: None,
        }
    }

    /// Signs the claims with HS256. Used by tests and local tooling.
    pub fn encode(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::default(), self, &EncodingKey::from_secret(secret.as_bytes()))
    }
}

/// Caller identity taken from a verified token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        let Claims { sub, role, email, first_name, last_name, picture, .. } = claims;
        Self { id: sub, role, email, first_name, last_name, picture }
    }
}
