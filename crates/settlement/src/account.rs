//! Custodial signing accounts.
//!
//! Key material is a 32-byte ed25519 seed. The on-chain address derives
//! deterministically from the public key (single-signer scheme: sha3-256 of
//! the public key followed by a 0x00 scheme byte), so a stored seed always
//! reproduces the same address.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use perp_bot_core::{EngineError, Result, WalletRecord};
use rand::rngs::OsRng;
use sha3::{Digest, Sha3_256};

const SINGLE_SIGNER_SCHEME: u8 = 0x00;

/// An ed25519 signing account for the settlement layer.
pub struct SettlementAccount {
    signing_key: SigningKey,
    address: String,
}

impl SettlementAccount {
    /// Generates a fresh account from the OS entropy source.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let address = derive_address(&signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// Reconstructs an account from a stored 32-byte hex seed.
    ///
    /// # Errors
    /// Returns an internal error if the seed is not valid 32-byte hex.
    pub fn from_private_key_hex(private_key_hex: &str) -> Result<Self> {
        let key = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let bytes = hex::decode(key)
            .map_err(|e| EngineError::internal(format!("invalid private key hex: {e}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EngineError::internal("private key must be 32 bytes"))?;
        let signing_key = SigningKey::from_bytes(&seed);
        let address = derive_address(&signing_key.verifying_key());
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Reconstructs the account custodied by a wallet record.
    ///
    /// # Errors
    /// Returns an internal error if the stored key material is corrupt.
    pub fn from_wallet(wallet: &WalletRecord) -> Result<Self> {
        Self::from_private_key_hex(&wallet.private_key_hex)
    }

    /// The derived on-chain address, `0x`-prefixed.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The 32-byte seed as hex, without prefix. Persisted exactly once at
    /// wallet creation and never regenerated.
    #[must_use]
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The public key as `0x`-prefixed hex.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.verifying_key().as_bytes()))
    }

    /// Signs a message and returns the detached signature.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Builds the wallet record persisted for a newly registered user.
    #[must_use]
    pub fn into_wallet_record(self, user_id: impl Into<String>) -> WalletRecord {
        WalletRecord {
            user_id: user_id.into(),
            address: self.address.clone(),
            private_key_hex: self.private_key_hex(),
        }
    }
}

/// Derives the single-signer address for a public key.
fn derive_address(verifying_key: &VerifyingKey) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(verifying_key.as_bytes());
    hasher.update([SINGLE_SIGNER_SCHEME]);
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_account_round_trips_through_hex() {
        let account = SettlementAccount::generate();
        let seed = account.private_key_hex();
        let restored = SettlementAccount::from_private_key_hex(&seed).unwrap();
        assert_eq!(account.address(), restored.address());
    }

    #[test]
    fn address_is_deterministic_for_seed() {
        let seed = "11".repeat(32);
        let a = SettlementAccount::from_private_key_hex(&seed).unwrap();
        let b = SettlementAccount::from_private_key_hex(&seed).unwrap();
        assert_eq!(a.address(), b.address());
        assert!(a.address().starts_with("0x"));
        assert_eq!(a.address().len(), 2 + 64);
    }

    #[test]
    fn accepts_prefixed_seed() {
        let seed = "22".repeat(32);
        let plain = SettlementAccount::from_private_key_hex(&seed).unwrap();
        let prefixed = SettlementAccount::from_private_key_hex(&format!("0x{seed}")).unwrap();
        assert_eq!(plain.address(), prefixed.address());
    }

    #[test]
    fn rejects_short_seed() {
        let Err(err) = SettlementAccount::from_private_key_hex("abcd") else {
            panic!("short seed must be rejected");
        };
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[test]
    fn wallet_record_reproduces_account() {
        let record = SettlementAccount::generate().into_wallet_record("u1");
        let restored = SettlementAccount::from_wallet(&record).unwrap();
        assert_eq!(restored.address(), record.address);
        assert_eq!(record.user_id, "u1");
    }

    #[test]
    fn signature_verifies() {
        use ed25519_dalek::Verifier;
        let account = SettlementAccount::generate();
        let sig = account.sign(b"payload");
        account
            .signing_key
            .verifying_key()
            .verify(b"payload", &sig)
            .unwrap();
    }
}
