// crates/fieldsync-server/src/token.rs
// ============================================================================
// Module: Bearer Token Authority
// Description: Signed, time-bounded bearer tokens for authenticated callers.
// Purpose: Issue and verify session tokens without server-side state.
// Dependencies: base64, ed25519-dalek, fieldsync-core, rand, serde_json
// ============================================================================

//! ## Overview
//! A token is `base64url(claims).base64url(signature)` where the signature is
//! Ed25519 over the encoded claims segment. Claims carry the account id, role,
//! email, and issue/expiry instants. Verification is fail-closed: any decoding,
//! signature, or expiry problem rejects the token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use fieldsync_core::AccountId;
use fieldsync_core::Role;
use fieldsync_core::Subject;
use fieldsync_core::Timestamp;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Token lifetime in milliseconds (8 hours).
pub const TOKEN_TTL_MILLIS: i64 = 8 * 60 * 60 * 1_000;
/// Maximum accepted token length in bytes.
pub const MAX_TOKEN_BYTES: usize = 4 * 1024;
/// Maximum accepted authorization header length in bytes.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Claims embedded in a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenClaims {
    /// Account identifier.
    pub sub: AccountId,
    /// Role at issue time.
    pub role: Role,
    /// Login email at issue time.
    pub email: String,
    /// Issue instant (unix millis).
    pub iat: i64,
    /// Expiry instant (unix millis).
    pub exp: i64,
}

impl TokenClaims {
    /// Returns the caller identity carried by the claims.
    #[must_use]
    pub fn subject(&self) -> Subject {
        Subject::new(self.sub.clone(), self.role)
    }
}

/// Freshly issued token with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Encoded bearer token.
    pub token: String,
    /// Expiry instant.
    pub expires_at: Timestamp,
}

/// Token issuance and verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Authorization header missing.
    #[error("missing authorization")]
    Missing,
    /// Header or token shape is invalid.
    #[error("malformed token")]
    Malformed,
    /// Signature does not verify.
    #[error("invalid token signature")]
    Signature,
    /// Token is past its expiry.
    #[error("token expired")]
    Expired,
    /// Claims could not be encoded.
    #[error("token encoding failed")]
    Encode,
}

// ============================================================================
// SECTION: Authority
// ============================================================================

/// Ed25519 token signer and verifier.
///
/// # Invariants
/// - Tokens are valid for exactly [`TOKEN_TTL_MILLIS`] after issue.
#[derive(Clone)]
pub struct TokenAuthority {
    /// Signing key.
    signing: SigningKey,
    /// Matching verification key.
    verifying: VerifyingKey,
}

impl TokenAuthority {
    /// Builds an authority from a 32-byte Ed25519 seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(seed);
        let verifying = signing.verifying_key();
        Self {
            signing,
            verifying,
        }
    }

    /// Builds an authority from a random seed; tokens do not survive restart.
    #[must_use]
    pub fn ephemeral() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Issues a token for `subject` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encode`] when the claims cannot be serialized.
    pub fn issue(
        &self,
        subject: &Subject,
        email: &str,
        now: Timestamp,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now.saturating_add_millis(TOKEN_TTL_MILLIS);
        let claims = TokenClaims {
            sub: subject.id.clone(),
            role: subject.role,
            email: email.to_string(),
            iat: now.as_unix_millis(),
            exp: expires_at.as_unix_millis(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Encode)?;
        let encoded = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.signing.sign(encoded.as_bytes());
        let token = format!("{encoded}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()));
        Ok(IssuedToken {
            token,
            expires_at,
        })
    }

    /// Verifies `token` at `now` and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`], [`TokenError::Signature`], or
    /// [`TokenError::Expired`].
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<TokenClaims, TokenError> {
        if token.len() > MAX_TOKEN_BYTES {
            return Err(TokenError::Malformed);
        }
        let (encoded, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature_bytes =
            URL_SAFE_NO_PAD.decode(signature).map_err(|_| TokenError::Malformed)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| TokenError::Malformed)?;
        self.verifying
            .verify_strict(encoded.as_bytes(), &signature)
            .map_err(|_| TokenError::Signature)?;
        let payload = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| TokenError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        if now.as_unix_millis() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

// ============================================================================
// SECTION: Header Parsing
// ============================================================================

/// Extracts the bearer token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`TokenError::Missing`] when the header is absent and
/// [`TokenError::Malformed`] for oversized or non-bearer values.
pub fn parse_bearer_token(auth_header: Option<&str>) -> Result<&str, TokenError> {
    let header = auth_header.ok_or(TokenError::Missing)?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(TokenError::Malformed);
    }
    let (scheme, token) = header.trim().split_once(' ').ok_or(TokenError::Malformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(TokenError::Malformed);
    }
    Ok(token)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
