use crate::error::VaultError;
use crate::types::secret::{EncryptedSecret, Plaintext};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use openssl::symm::{Cipher, Crypter, Mode};

/// AES-256-GCM nonce size in bytes.
const NONCE_SIZE: usize = 12;
/// AES-256-GCM authentication tag size in bytes.
const TAG_SIZE: usize = 16;
const KEY_SIZE: usize = 32;

/// Boundary between stored ciphertext and usable passwords.
///
/// Implementations may delegate to an external key-management service.
pub trait SecretCodec: Send + Sync {
    fn encrypt(&self, plaintext: &Plaintext) -> Result<EncryptedSecret, VaultError>;
    fn decrypt(&self, ciphertext: &EncryptedSecret) -> Result<Plaintext, VaultError>;
}

/// Local AES-256-GCM codec keyed from configuration.
/// Stores `base64(nonce || ciphertext || tag)`.
#[derive(Clone)]
pub struct AesGcmCodec {
    key: Vec<u8>,
}

impl AesGcmCodec {
    /// Creates a codec from a hex-encoded 32-byte key.
    pub fn from_hex_key(hex_key: &str) -> Result<Self, VaultError> {
        let key = hex::decode(hex_key.trim())
            .map_err(|_| VaultError::Codec("secret key is not valid hex".to_string()))?;
        if key.len() != KEY_SIZE {
            return Err(VaultError::Codec(format!(
                "secret key must be {KEY_SIZE} bytes (256 bits), got {} bytes",
                key.len()
            )));
        }
        Ok(Self { key })
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, openssl::error::ErrorStack> {
        let cipher = Cipher::aes_256_gcm();
        let mut nonce = [0u8; NONCE_SIZE];
        openssl::rand::rand_bytes(&mut nonce)?;

        let mut crypter = Crypter::new(cipher, Mode::Encrypt, &self.key, Some(&nonce))?;
        let mut ciphertext = vec![0u8; plaintext.len() + cipher.block_size()];
        let mut count = crypter.update(plaintext, &mut ciphertext)?;
        count += crypter.finalize(&mut ciphertext[count..])?;
        ciphertext.truncate(count);

        let mut tag = [0u8; TAG_SIZE];
        crypter.get_tag(&mut tag)?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len() + TAG_SIZE);
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&ciphertext);
        output.extend_from_slice(&tag);
        Ok(output)
    }

    fn open(&self, data: &[u8]) -> Result<Vec<u8>, openssl::error::ErrorStack> {
        let cipher = Cipher::aes_256_gcm();
        let nonce = &data[..NONCE_SIZE];
        let tag = &data[data.len() - TAG_SIZE..];
        let ciphertext = &data[NONCE_SIZE..data.len() - TAG_SIZE];

        let mut crypter = Crypter::new(cipher, Mode::Decrypt, &self.key, Some(nonce))?;
        crypter.set_tag(tag)?;

        let mut plaintext = vec![0u8; ciphertext.len() + cipher.block_size()];
        let mut count = crypter.update(ciphertext, &mut plaintext)?;
        count += crypter.finalize(&mut plaintext[count..])?;
        plaintext.truncate(count);
        Ok(plaintext)
    }
}

impl SecretCodec for AesGcmCodec {
    fn encrypt(&self, plaintext: &Plaintext) -> Result<EncryptedSecret, VaultError> {
        let sealed = self
            .seal(plaintext.expose().as_bytes())
            .map_err(|e| VaultError::Codec(format!("encryption failed: {e}")))?;
        Ok(EncryptedSecret::new(STANDARD.encode(sealed)))
    }

    fn decrypt(&self, ciphertext: &EncryptedSecret) -> Result<Plaintext, VaultError> {
        let data = STANDARD
            .decode(ciphertext.expose_ciphertext())
            .map_err(|_| VaultError::Codec("ciphertext is not valid base64".to_string()))?;
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(VaultError::Codec(
                "ciphertext is too short to contain nonce and tag".to_string(),
            ));
        }
        let opened = self
            .open(&data)
            .map_err(|_| VaultError::Codec("ciphertext failed authentication".to_string()))?;
        String::from_utf8(opened)
            .map(Plaintext::new)
            .map_err(|_| VaultError::Codec("decrypted secret is not UTF-8".to_string()))
    }
}
