//! Key generation consumed by the bootstrap ceremony
//!
//! The coordinator treats key generation as an opaque, trusted provider behind
//! [`KeyProvider`]. [`DealerKeyProvider`] is the production implementation:
//! Ed25519 key pairs for peers and a trusted-dealer FROST sharing for the
//! threshold key.
//!
//! FROST needs `min_signers >= 2`, so clusters of up to three peers (t = 1)
//! get single-signer material instead: one Ed25519 scalar that every peer
//! holds, which is exactly a degree-0 sharing.

use crate::keys::{PeerKeyPair, SigningMode, ThresholdKeyMaterial, ThresholdParams};
use crate::{Result, RollcallError};
use async_trait::async_trait;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use ed25519_dalek::SigningKey;
use frost_ed25519 as frost;
use rand::rngs::OsRng;

/// Source of bootstrap key material.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Generate and serialize a fresh asymmetric key pair for one peer.
    async fn generate_key_pair(&self) -> Result<PeerKeyPair>;

    /// Generate and serialize threshold key material for `params.participants` peers.
    ///
    /// Share `i` of the result belongs to the peer with id `i`.
    async fn generate_threshold_keys(&self, params: ThresholdParams)
        -> Result<ThresholdKeyMaterial>;
}

/// Production key provider backed by the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct DealerKeyProvider;

impl DealerKeyProvider {
    /// Create a new dealer provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyProvider for DealerKeyProvider {
    async fn generate_key_pair(&self) -> Result<PeerKeyPair> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Ok(PeerKeyPair {
            private_key: signing_key.to_bytes().to_vec(),
            public_key: signing_key.verifying_key().to_bytes().to_vec(),
        })
    }

    async fn generate_threshold_keys(
        &self,
        params: ThresholdParams,
    ) -> Result<ThresholdKeyMaterial> {
        match params.signing_mode() {
            SigningMode::SingleSigner => Ok(single_signer_keys(params)),
            SigningMode::Threshold => frost_dealer_keys(params),
        }
    }
}

fn single_signer_keys(params: ThresholdParams) -> ThresholdKeyMaterial {
    let secret = Scalar::random(&mut OsRng);
    let public_key = EdwardsPoint::mul_base(&secret).compress().to_bytes().to_vec();
    let share = secret.to_bytes().to_vec();

    ThresholdKeyMaterial {
        params,
        mode: SigningMode::SingleSigner,
        public_key,
        private_shares: vec![share; usize::from(params.participants)],
    }
}

fn frost_dealer_keys(params: ThresholdParams) -> Result<ThresholdKeyMaterial> {
    let (shares, public_key_package) = frost::keys::generate_with_dealer(
        params.participants,
        params.threshold,
        frost::keys::IdentifierList::Default,
        &mut OsRng,
    )
    .map_err(|e| RollcallError::crypto(format!("FROST dealer key generation failed: {e}")))?;

    // Default identifiers are 1..=n; share index i goes to peer i.
    let mut private_shares = Vec::with_capacity(usize::from(params.participants));
    for index in 0..params.participants {
        let identifier = frost::Identifier::try_from(index + 1)
            .map_err(|e| RollcallError::crypto(format!("invalid FROST identifier: {e}")))?;
        let secret_share = shares.get(&identifier).ok_or_else(|| {
            RollcallError::crypto(format!("dealer produced no share for index {index}"))
        })?;
        let key_package = frost::keys::KeyPackage::try_from(secret_share.clone()).map_err(|e| {
            RollcallError::crypto(format!("share {index} failed verification: {e}"))
        })?;
        private_shares.push(key_package.signing_share().serialize().to_vec());
    }

    Ok(ThresholdKeyMaterial {
        params,
        mode: SigningMode::Threshold,
        public_key: public_key_package.verifying_key().serialize().to_vec(),
        private_shares,
    })
}
