//! RS256 token signing and verification

use jsonwebtoken::{decode, decode_header, encode, Algorithm, Header, Validation};
use tracing::{debug, warn};

use latch_core::{AuthError, AuthResult, Claims, TokenType};

use crate::keys::{SigningKey, VerifyingKey};

const ALGORITHM: Algorithm = Algorithm::RS256;

/// Signs claims into bearer tokens and verifies them back.
///
/// A codec built with [`TokenCodec::verifier`] only holds the public key and
/// cannot sign.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    issuer: String,
    signing_key: Option<SigningKey>,
    verifying_key: VerifyingKey,
}

impl TokenCodec {
    /// Codec able to both sign and verify
    pub fn new(signing_key: SigningKey, issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            verifying_key: signing_key.verifying_key(),
            signing_key: Some(signing_key),
        }
    }

    /// Verification-only codec
    pub fn verifier(verifying_key: VerifyingKey, issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            signing_key: None,
            verifying_key,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign claims into a compact JWS
    pub fn sign(&self, claims: &Claims) -> AuthResult<String> {
        let key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| AuthError::signing("codec holds no private key"))?;

        encode(&Header::new(ALGORITHM), claims, key.encoding_key())
            .map_err(|e| AuthError::signing(e.to_string()))
    }

    /// Verify a token, optionally prefixed with `Bearer `, and return its claims.
    ///
    /// Every failure maps to the same [`AuthError::InvalidToken`].
    pub fn verify(&self, raw: &str) -> AuthResult<Claims> {
        let raw = raw.trim();
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if token.is_empty() {
            debug!("Empty bearer token");
            return Err(AuthError::InvalidToken);
        }

        let header = decode_header(token).map_err(|e| {
            warn!("Malformed token header: {}", e);
            AuthError::InvalidToken
        })?;
        if header.alg != ALGORITHM {
            warn!("Rejected token signed with {:?}", header.alg);
            return Err(AuthError::InvalidToken);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<Claims>(token, self.verifying_key.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("Token verification failed: {}", e);
                AuthError::InvalidToken
            })
    }

    /// Verify a token and require a specific token type
    pub fn verify_as(&self, raw: &str, expected: TokenType) -> AuthResult<Claims> {
        let claims = self.verify(raw)?;
        if claims.token_type != expected {
            warn!(
                "Expected {} but got {}",
                expected.as_str(),
                claims.token_type.as_str()
            );
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}
