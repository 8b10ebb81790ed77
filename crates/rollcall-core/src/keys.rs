//! Key material minted during bootstrap.

use crate::identifiers::PeerId;
use crate::{Result, RollcallError};
use serde::{Deserialize, Serialize};

/// Serialized asymmetric key pair generated for one peer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerKeyPair {
    /// Private half, returned only to the owning peer
    #[serde(with = "hex::serde")]
    pub private_key: Vec<u8>,
    /// Public half, published in the roster
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
}

impl std::fmt::Debug for PeerKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerKeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &hex::encode(&self.public_key))
            .finish()
    }
}

/// Threshold parameters derived from the cluster size.
///
/// A cluster of `n` peers tolerates `f = floor((n - 1) / 3)` Byzantine
/// faults and needs `t = 2f + 1` shares to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdParams {
    /// Number of share holders (n)
    pub participants: u16,
    /// Tolerated faulty peers (f)
    pub fault_tolerance: u16,
    /// Shares required to sign (t)
    pub threshold: u16,
}

impl ThresholdParams {
    /// Parameters for a cluster of `n` peers.
    pub fn for_cluster(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(RollcallError::invalid(
                "threshold keys need at least one participant",
            ));
        }
        let participants = u16::try_from(n).map_err(|_| {
            RollcallError::invalid(format!("cluster of {n} peers exceeds u16 share indices"))
        })?;
        let fault_tolerance = (participants - 1) / 3;
        Ok(Self {
            participants,
            fault_tolerance,
            threshold: 2 * fault_tolerance + 1,
        })
    }

    /// Signing mode these parameters call for.
    pub fn signing_mode(&self) -> SigningMode {
        if self.threshold < 2 {
            SigningMode::SingleSigner
        } else {
            SigningMode::Threshold
        }
    }
}

/// Indicates whether key material is single-signer Ed25519 or FROST threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningMode {
    /// 1-of-n: every share is the same Ed25519 scalar
    SingleSigner,
    /// t-of-n with t >= 2, dealt with FROST
    Threshold,
}

impl std::fmt::Display for SigningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningMode::SingleSigner => write!(f, "single-signer"),
            SigningMode::Threshold => write!(f, "threshold"),
        }
    }
}

/// Threshold public key plus one private share per peer.
#[derive(Clone, PartialEq, Eq)]
pub struct ThresholdKeyMaterial {
    /// Parameters the material was generated for
    pub params: ThresholdParams,
    /// Which scheme produced the material
    pub mode: SigningMode,
    /// Serialized group public key
    pub public_key: Vec<u8>,
    /// Serialized private shares, indexed by peer id
    pub private_shares: Vec<Vec<u8>>,
}

impl ThresholdKeyMaterial {
    /// Share belonging to `peer_id`.
    pub fn share_for(&self, peer_id: PeerId) -> Result<&[u8]> {
        self.private_shares
            .get(peer_id.index())
            .map(Vec::as_slice)
            .ok_or_else(|| {
                RollcallError::fatal(format!(
                    "no threshold share for {peer_id} among {} shares",
                    self.private_shares.len()
                ))
            })
    }

    /// Check that there is one non-empty share per participant.
    pub fn verify_complete(&self) -> Result<()> {
        let expected = usize::from(self.params.participants);
        if self.private_shares.len() != expected {
            return Err(RollcallError::fatal(format!(
                "threshold key material holds {} shares, expected {expected}",
                self.private_shares.len()
            )));
        }
        if self.public_key.is_empty() || self.private_shares.iter().any(Vec::is_empty) {
            return Err(RollcallError::fatal(
                "threshold key material contains empty key fields",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ThresholdKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdKeyMaterial")
            .field("params", &self.params)
            .field("mode", &self.mode)
            .field("public_key", &hex::encode(&self.public_key))
            .field("private_shares", &self.private_shares.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_params_for_common_cluster_sizes() {
        let cases = [(1, 0, 1), (4, 1, 3), (7, 2, 5), (10, 3, 7)];
        for (n, f, t) in cases {
            let params = ThresholdParams::for_cluster(n).unwrap();
            assert_eq!(params.participants as usize, n);
            assert_eq!(params.fault_tolerance, f);
            assert_eq!(params.threshold, t);
        }
    }

    #[test]
    fn test_small_clusters_are_single_signer() {
        for n in 1..=3 {
            let params = ThresholdParams::for_cluster(n).unwrap();
            assert_eq!(params.signing_mode(), SigningMode::SingleSigner);
        }
        let params = ThresholdParams::for_cluster(4).unwrap();
        assert_eq!(params.signing_mode(), SigningMode::Threshold);
    }

    #[test]
    fn test_params_reject_empty_cluster() {
        assert!(ThresholdParams::for_cluster(0).is_err());
        assert!(ThresholdParams::for_cluster(usize::from(u16::MAX) + 1).is_err());
    }

    #[test]
    fn test_share_lookup_and_completeness() {
        let material = ThresholdKeyMaterial {
            params: ThresholdParams::for_cluster(2).unwrap(),
            mode: SigningMode::SingleSigner,
            public_key: vec![9; 32],
            private_shares: vec![vec![1; 32], vec![2; 32]],
        };
        material.verify_complete().unwrap();
        assert_eq!(material.share_for(PeerId(1)).unwrap(), &[2u8; 32][..]);
        assert!(material.share_for(PeerId(2)).unwrap_err().is_fatal());

        let broken = ThresholdKeyMaterial {
            private_shares: vec![vec![1; 32], Vec::new()],
            ..material
        };
        assert!(broken.verify_complete().unwrap_err().is_fatal());
    }

    proptest! {
        #[test]
        fn prop_threshold_law(n in 1usize..=1000) {
            let params = ThresholdParams::for_cluster(n).unwrap();
            let f = (n - 1) / 3;
            prop_assert_eq!(params.threshold as usize, 2 * f + 1);
            prop_assert!(params.threshold as usize <= n);
            prop_assert!(n > 3 * params.fault_tolerance as usize);
        }
    }
}
