use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use chrono::{Duration, Utc};

/// Lifetime of both session cookies and the tokens inside them.
pub const SESSION_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    Admin,
    Employee,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // admin username or employee id
    pub role: SessionRole,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(subject: String, role: SessionRole) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(SESSION_HOURS);

        Self {
            sub: subject,
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn create_token(secret: &str, subject: String, role: SessionRole) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(subject, role);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_role() {
        let token = create_token("s3cret", "EMP-ID".to_string(), SessionRole::Employee).unwrap();
        let claims = verify_token("s3cret", &token).unwrap();
        assert_eq!(claims.sub, "EMP-ID");
        assert_eq!(claims.role, SessionRole::Employee);
        assert!(verify_token("other", &token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = bcrypt::hash("123456", 4).unwrap();
        assert!(verify_password("123456", &hash).unwrap());
        assert!(!verify_password("654321", &hash).unwrap());
    }
}
