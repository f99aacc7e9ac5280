use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by the handshake token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub exp: u64,
}

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Authentication error"),
        }
    }
}

impl std::error::Error for AuthError {}

/// HS256 verification of the token presented at WebSocket upgrade. An
/// unverifiable identity rejects the connection; nothing downstream ever
/// re-checks identity per event.
pub struct Authenticator {
    decoding_key: DecodingKey,
}

impl Authenticator {
    pub fn new() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET environment variable must be set");
        Self::from_secret(&secret)
    }

    pub fn from_secret(secret: &str) -> Self {
        Authenticator {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(data.claims.id)
    }
}
