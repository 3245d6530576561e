//! Merkle distribution builder.
//!
//! Builds the published artifact from a [`CumulativeLedger`]: the root, the
//! exact total, and one claim (beneficiary, cumulative amount, proof) per
//! participant. Leaf hashing and tree rules come from [`drip_core::merkle`],
//! the same definitions the claim verifier uses.

use std::collections::BTreeMap;

use drip_core::error::DistributionError;
use drip_core::merkle::{leaf_hash, verify_proof, MerkleTree};
use drip_core::types::{decimal, Address, CumulativeLedger, Hash256, LedgerEntry, ParticipantId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One participant's published claim.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    pub beneficiary: Address,
    /// Cumulative amount, not the increment since the last distribution.
    #[serde(with = "decimal")]
    pub amount: u128,
    pub proof: Vec<Hash256>,
}

impl Claim {
    pub fn leaf(&self, participant: &ParticipantId) -> Hash256 {
        leaf_hash(participant, &self.beneficiary, self.amount)
    }
}

/// A published cumulative distribution. Immutable once built.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub merkle_root: Hash256,
    #[serde(with = "decimal")]
    pub total_amount: u128,
    pub claims: BTreeMap<ParticipantId, Claim>,
}

impl Distribution {
    /// Build the distribution for `ledger`.
    ///
    /// An empty ledger gives root [`Hash256::ZERO`] and no claims.
    pub fn build(ledger: &CumulativeLedger) -> Result<Self, DistributionError> {
        let total_amount = ledger.total().ok_or(DistributionError::TotalOverflow)?;

        let leaves: Vec<(ParticipantId, LedgerEntry, Hash256)> = ledger
            .iter()
            .map(|(p, e)| (*p, *e, leaf_hash(p, &e.beneficiary, e.cumulative_amount)))
            .collect();
        let hashes: Vec<Hash256> = leaves.iter().map(|(_, _, h)| *h).collect();
        let tree = MerkleTree::from_leaf_hashes(&hashes);

        let claims = leaves
            .into_iter()
            .map(|(participant, entry, leaf)| {
                // Present: the tree was built from exactly these leaves.
                let proof = tree.proof(&leaf).unwrap_or_default();
                (
                    participant,
                    Claim {
                        beneficiary: entry.beneficiary,
                        amount: entry.cumulative_amount,
                        proof,
                    },
                )
            })
            .collect();

        let distribution = Self {
            merkle_root: tree.root(),
            total_amount,
            claims,
        };
        info!(
            root = %distribution.merkle_root,
            total = %distribution.total_amount,
            claims = distribution.claims.len(),
            "distribution built"
        );
        Ok(distribution)
    }

    pub fn claim(&self, participant: &ParticipantId) -> Option<&Claim> {
        self.claims.get(participant)
    }

    /// Recompute the participant's leaf and check its proof against the root.
    pub fn verify_claim(&self, participant: &ParticipantId) -> bool {
        self.claims.get(participant).is_some_and(|c| {
            Self::verify(&self.merkle_root, participant, &c.beneficiary, c.amount, &c.proof)
        })
    }

    /// The check a claim contract performs for one tuple.
    pub fn verify(
        root: &Hash256,
        participant: &ParticipantId,
        beneficiary: &Address,
        amount: u128,
        proof: &[Hash256],
    ) -> bool {
        verify_proof(leaf_hash(participant, beneficiary, amount), proof, root)
    }

    /// Rebuild the ledger this distribution was built from.
    pub fn to_ledger(&self) -> CumulativeLedger {
        self.claims
            .iter()
            .map(|(p, c)| {
                (
                    *p,
                    LedgerEntry {
                        beneficiary: c.beneficiary,
                        cumulative_amount: c.amount,
                    },
                )
            })
            .collect()
    }

    /// Every participant whose amount here falls below its floor: the amount
    /// in `prior`, or the cumulative amount already claimed, whichever is
    /// larger. Participants missing here count as zero.
    pub fn regressions(
        &self,
        prior: Option<&Distribution>,
        claimed: &BTreeMap<ParticipantId, u128>,
    ) -> Vec<DistributionError> {
        let mut floors: BTreeMap<ParticipantId, u128> = claimed.clone();
        if let Some(prior) = prior {
            for (p, c) in &prior.claims {
                let floor = floors.entry(*p).or_default();
                *floor = (*floor).max(c.amount);
            }
        }

        floors
            .into_iter()
            .filter_map(|(participant, floor)| {
                let new = self.claims.get(&participant).map_or(0, |c| c.amount);
                (new < floor).then_some(DistributionError::Regression {
                    participant,
                    new,
                    floor,
                })
            })
            .collect()
    }

    /// Publisher-side guard run before a root is set on-chain.
    ///
    /// Returns the first regression found, in participant order.
    pub fn check_supersedes(
        &self,
        prior: Option<&Distribution>,
        claimed: &BTreeMap<ParticipantId, u128>,
    ) -> Result<(), DistributionError> {
        match self.regressions(prior, claimed).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
