use super::PortalError;
use crate::models::PrincipalKind;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Verified against when a login names an unknown email, so the response
/// takes as long as a wrong password would.
const DUMMY_HASH: &str = "$2b$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW";

pub fn hash_password(password: &str) -> Result<String, PortalError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| PortalError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Burns one bcrypt verification without a real hash.
pub fn verify_against_dummy(password: &str) {
    let _ = bcrypt::verify(password, DUMMY_HASH);
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    kind: PrincipalKind,
    iat: i64,
    exp: i64,
}

/// What a valid token says about its holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub subject_id: String,
    pub kind: PrincipalKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        TokenResponse { access_token, token_type: "bearer".to_string() }
    }
}

/// Issues and validates HS256 bearer tokens with a server-held secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        TokenService {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, subject_id: &str, kind: PrincipalKind) -> Result<String, PortalError> {
        self.issue_with_ttl(subject_id, kind, self.ttl)
    }

    pub fn issue_with_ttl(&self, subject_id: &str, kind: PrincipalKind, ttl: Duration) -> Result<String, PortalError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: subject_id.to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PortalError::Internal(format!("token signing failed: {}", e)))
    }

    /// Every rejection reason collapses into `Unauthenticated`.
    pub fn validate(&self, token: &str) -> Result<TokenSubject, PortalError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                log::debug!("Rejected bearer token: {:?}", e.kind());
                PortalError::Unauthenticated
            })?;

        if data.claims.sub.is_empty() {
            return Err(PortalError::Unauthenticated);
        }
        Ok(TokenSubject { subject_id: data.claims.sub, kind: data.claims.kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &[u8]) -> TokenService {
        TokenService::new(secret, Duration::hours(24))
    }

    #[test]
    fn issued_token_validates_to_its_subject() {
        let tokens = service(b"0123456789abcdef0123456789abcdef");
        let token = tokens.issue("client-1", PrincipalKind::Client).unwrap();
        let subject = tokens.validate(&token).unwrap();
        assert_eq!(subject.subject_id, "client-1");
        assert_eq!(subject.kind, PrincipalKind::Client);
    }

    #[test]
    fn wrong_secret_expired_and_garbage_fail_alike() {
        let tokens = service(b"0123456789abcdef0123456789abcdef");
        let other = service(b"fedcba9876543210fedcba9876543210");

        let foreign = other.issue("client-1", PrincipalKind::Client).unwrap();
        let expired = tokens
            .issue_with_ttl("client-1", PrincipalKind::Client, Duration::hours(-1))
            .unwrap();

        for bad in [foreign.as_str(), expired.as_str(), "not.a.token", ""] {
            let err = tokens.validate(bad).unwrap_err();
            assert!(matches!(err, PortalError::Unauthenticated));
            assert_eq!(err.to_string(), "Could not validate credentials");
        }
    }

    #[test]
    fn token_without_kind_is_rejected() {
        #[derive(Serialize)]
        struct Partial {
            sub: String,
            exp: i64,
        }
        let secret = b"0123456789abcdef0123456789abcdef";
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Partial { sub: "client-1".into(), exp: (Utc::now() + Duration::hours(1)).timestamp() },
            &EncodingKey::from_secret(secret),
        )
        .unwrap();
        assert!(matches!(service(secret).validate(&token), Err(PortalError::Unauthenticated)));
    }

    #[test]
    fn passwords_hash_and_verify() {
        let hash = hash_password("demo123").unwrap();
        assert_ne!(hash, "demo123");
        assert!(verify_password("demo123", &hash));
        assert!(!verify_password("demo124", &hash));
        assert!(!verify_password("demo123", "not-a-bcrypt-hash"));
    }
}
