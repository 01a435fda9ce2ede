//! RSA key material loading
//!
//! Private keys are accepted as PKCS#8 or PKCS#1, public keys as SPKI (PKIX) or
//! PKCS#1. Either can be given as PEM text or as a base64 string of the DER
//! bytes. A PEM block whose label does not match its contents is decoded
//! from the DER body instead.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::path::Path;

use latch_core::{AuthError, AuthResult};

/// Private half of the token signing key pair
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    public: VerifyingKey,
}

impl SigningKey {
    /// Parse a PEM encoded private key
    pub fn from_pem(pem: &[u8]) -> AuthResult<Self> {
        let text = pem_text(pem)?;
        match RsaPrivateKey::from_pkcs8_pem(text).or_else(|_| RsaPrivateKey::from_pkcs1_pem(text)) {
            Ok(private) => Self::from_rsa(&private),
            Err(_) => Self::from_der(&pem_body(pem)?),
        }
    }

    /// Parse a base64 string holding the DER bytes of a private key
    pub fn from_base64_der(encoded: &str) -> AuthResult<Self> {
        Self::from_der(&decode_base64(encoded)?)
    }

    /// Read a PEM encoded private key from disk
    pub fn from_pem_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| AuthError::key_parse(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_pem(&bytes)
    }

    pub fn from_der(der: &[u8]) -> AuthResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_der(der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(der))
            .map_err(|_| AuthError::key_parse("not a PKCS#8 or PKCS#1 RSA private key"))?;
        Self::from_rsa(&private)
    }

    fn from_rsa(private: &RsaPrivateKey) -> AuthResult<Self> {
        let pkcs1 = private
            .to_pkcs1_der()
            .map_err(|e| AuthError::key_parse(e.to_string()))?;
        let public = VerifyingKey::from_rsa(&private.to_public_key())?;

        Ok(Self {
            encoding: EncodingKey::from_rsa_der(pkcs1.as_bytes()),
            public,
        })
    }

    /// Public key matching this private key
    pub fn verifying_key(&self) -> VerifyingKey {
        self.public.clone()
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(RS256)")
    }
}

/// Public key used to verify tokens
#[derive(Clone)]
pub struct VerifyingKey {
    decoding: DecodingKey,
}

impl VerifyingKey {
    /// Parse a PEM encoded public key
    pub fn from_pem(pem: &[u8]) -> AuthResult<Self> {
        let text = pem_text(pem)?;
        match RsaPublicKey::from_public_key_pem(text).or_else(|_| RsaPublicKey::from_pkcs1_pem(text)) {
            Ok(public) => Self::from_rsa(&public),
            Err(_) => Self::from_der(&pem_body(pem)?),
        }
    }

    /// Parse a base64 string holding the DER bytes of a public key
    pub fn from_base64_der(encoded: &str) -> AuthResult<Self> {
        Self::from_der(&decode_base64(encoded)?)
    }

    pub fn from_pem_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| AuthError::key_parse(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_pem(&bytes)
    }

    pub fn from_der(der: &[u8]) -> AuthResult<Self> {
        let public = RsaPublicKey::from_public_key_der(der)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(der))
            .map_err(|_| AuthError::key_parse("not a PKIX or PKCS#1 RSA public key"))?;
        Self::from_rsa(&public)
    }

    fn from_rsa(public: &RsaPublicKey) -> AuthResult<Self> {
        let pkcs1 = public
            .to_pkcs1_der()
            .map_err(|e| AuthError::key_parse(e.to_string()))?;
        Ok(Self {
            decoding: DecodingKey::from_rsa_der(pkcs1.as_bytes()),
        })
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerifyingKey(RS256)")
    }
}

fn pem_text(pem: &[u8]) -> AuthResult<&str> {
    std::str::from_utf8(pem).map_err(|_| AuthError::key_parse("PEM is not UTF-8"))
}

/// Decode the PEM body regardless of its label
fn pem_body(pem: &[u8]) -> AuthResult<Vec<u8>> {
    let (_label, der) = rsa::pkcs8::der::pem::decode_vec(pem)
        .map_err(|e| AuthError::key_parse(format!("invalid PEM: {}", e)))?;
    Ok(der)
}

fn decode_base64(encoded: &str) -> AuthResult<Vec<u8>> {
    let compact: String = encoded.split_whitespace().collect();
    STANDARD
        .decode(compact)
        .map_err(|e| AuthError::key_parse(format!("invalid base64: {}", e)))
}
