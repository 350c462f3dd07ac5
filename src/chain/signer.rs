//! Signing authority
//!
//! The platform's custodial chain keypair. Loaded once at process start from
//! a hex-encoded environment variable, held only in memory, and passed by
//! handle into the settlement path. The secret must never appear in logs or
//! error payloads; `Debug` prints the public key only.

use anyhow::{Context, anyhow};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use solana_sdk::signer::keypair::Keypair;
use std::fmt;

pub struct SigningAuthority {
    keypair: Keypair,
}

impl SigningAuthority {
    /// Load the keypair from the named environment variable
    /// (hex-encoded 64-byte ed25519 keypair).
    pub fn from_env(var: &str) -> anyhow::Result<Self> {
        let secret_hex = std::env::var(var)
            .with_context(|| format!("Signing authority secret not set ({})", var))?;
        Self::from_secret_hex(&secret_hex)
    }

    pub fn from_secret_hex(secret_hex: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|_| anyhow!("Signing authority secret is not valid hex"))?;
        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|_| anyhow!("Signing authority secret is not a valid keypair"))?;
        Ok(Self { keypair })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn address(&self) -> String {
        self.pubkey().to_string()
    }

    pub(crate) fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for SigningAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningAuthority")
            .field("pubkey", &self.pubkey())
            .field("secret", &"<redacted>")
            .finish()
    }
}
