use serde::Deserialize;
use std::fmt;

/// Opaque ciphertext of a connection password.
///
/// No `PartialEq` and a redacted `Debug`; only a
/// [`SecretCodec`](crate::service::secret_codec::SecretCodec) gives it meaning.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    pub fn new(ciphertext: impl Into<String>) -> Self {
        Self(ciphertext.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw ciphertext text, for persistence and codecs.
    pub fn expose_ciphertext(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptedSecret(<redacted>)")
    }
}

/// Decrypted password. Only produced by a codec or by an inbound request.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Plaintext(String);

impl Plaintext {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Plaintext(<redacted>)")
    }
}
