//! Multi-stream combiner.
//!
//! `cumulative = prior + Σ amounts` per participant, with checked addition.
//! Streams are supplied in priority order; the beneficiary is the last one
//! seen (later streams override earlier ones and the prior ledger).
//! Participants absent from this run keep their prior row.

use drip_core::error::CombineError;
use drip_core::types::{CumulativeLedger, LedgerEntry, RewardEntry};
use tracing::{debug, info};

/// Merge this run's streams into `prior`, producing the next ledger.
///
/// Zero-amount entries still update the beneficiary of an existing row but
/// never create a row for a participant the ledger does not know yet.
pub fn combine(
    prior: &CumulativeLedger,
    streams: &[Vec<RewardEntry>],
) -> Result<CumulativeLedger, CombineError> {
    let mut ledger = prior.clone();
    let mut added: u128 = 0;

    for stream in streams {
        for entry in stream {
            let next = match ledger.get(&entry.participant) {
                Some(row) => LedgerEntry {
                    beneficiary: entry.beneficiary,
                    cumulative_amount: row
                        .cumulative_amount
                        .checked_add(entry.amount)
                        .ok_or(CombineError::Overflow(entry.participant))?,
                },
                None if entry.amount == 0 => continue,
                None => LedgerEntry {
                    beneficiary: entry.beneficiary,
                    cumulative_amount: entry.amount,
                },
            };
            debug!(
                participant = %entry.participant,
                cumulative = %next.cumulative_amount,
                "ledger row"
            );
            ledger.insert(entry.participant, next);
            added = added.saturating_add(entry.amount);
        }
    }

    info!(
        streams = streams.len(),
        participants = ledger.len(),
        added = %added,
        "ledger combined"
    );
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drip_core::types::{Address, ParticipantId};
    use proptest::prelude::*;

    fn pid(seed: u8) -> ParticipantId {
        ParticipantId([seed; 20])
    }

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    fn entry(p: u8, b: u8, amount: u128) -> RewardEntry {
        RewardEntry::new(pid(p), addr(b), amount)
    }

    fn row(b: u8, amount: u128) -> LedgerEntry {
        LedgerEntry {
            beneficiary: addr(b),
            cumulative_amount: amount,
        }
    }

    #[test]
    fn empty_run_keeps_prior() {
        let prior: CumulativeLedger = [(pid(1), row(1, 500))].into_iter().collect();
        assert_eq!(combine(&prior, &[]).unwrap(), prior);
    }

    #[test]
    fn sums_across_streams_and_prior() {
        let prior: CumulativeLedger = [(pid(1), row(1, 1000))].into_iter().collect();
        let streams = vec![vec![entry(1, 1, 150), entry(2, 2, 40)], vec![entry(1, 1, 50)]];
        let ledger = combine(&prior, &streams).unwrap();
        assert_eq!(ledger.amount_of(&pid(1)), 1200);
        assert_eq!(ledger.amount_of(&pid(2)), 40);
    }

    #[test]
    fn absent_participants_keep_prior_values() {
        let prior: CumulativeLedger = [(pid(1), row(1, 1000)), (pid(2), row(2, 300))]
            .into_iter()
            .collect();
        let ledger = combine(&prior, &[vec![entry(1, 1, 1)]]).unwrap();
        assert_eq!(ledger.get(&pid(2)), Some(&row(2, 300)));
    }

    #[test]
    fn last_stream_wins_beneficiary() {
        let prior: CumulativeLedger = [(pid(1), row(9, 10))].into_iter().collect();
        let streams = vec![vec![entry(1, 3, 5)], vec![entry(1, 4, 5)]];
        let ledger = combine(&prior, &streams).unwrap();
        assert_eq!(ledger.get(&pid(1)), Some(&row(4, 20)));
    }

    #[test]
    fn zero_entry_updates_beneficiary_of_existing_row() {
        let prior: CumulativeLedger = [(pid(1), row(1, 100))].into_iter().collect();
        let ledger = combine(&prior, &[vec![entry(1, 7, 0)]]).unwrap();
        assert_eq!(ledger.get(&pid(1)), Some(&row(7, 100)));
    }

    #[test]
    fn zero_entry_never_creates_row() {
        let ledger = combine(&CumulativeLedger::new(), &[vec![entry(5, 5, 0)]]).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn zero_then_positive_uses_later_beneficiary() {
        let streams = vec![vec![entry(1, 1, 0)], vec![entry(1, 2, 10)]];
        let ledger = combine(&CumulativeLedger::new(), &streams).unwrap();
        assert_eq!(ledger.get(&pid(1)), Some(&row(2, 10)));
    }

    #[test]
    fn overflow_is_reported() {
        let prior: CumulativeLedger = [(pid(1), row(1, u128::MAX))].into_iter().collect();
        assert_eq!(
            combine(&prior, &[vec![entry(1, 1, 1)]]),
            Err(CombineError::Overflow(pid(1)))
        );
    }

    proptest! {
        #[test]
        fn amounts_commute_across_stream_order(
            a in prop::collection::vec((0u8..8, 0u64..1_000_000), 0..20),
            b in prop::collection::vec((0u8..8, 0u64..1_000_000), 0..20),
        ) {
            let to_stream = |v: &[(u8, u64)]| -> Vec<RewardEntry> {
                v.iter().map(|&(p, amt)| entry(p, 0, u128::from(amt))).collect()
            };
            let (sa, sb) = (to_stream(&a), to_stream(&b));
            let ab = combine(&CumulativeLedger::new(), &[sa.clone(), sb.clone()]).unwrap();
            let ba = combine(&CumulativeLedger::new(), &[sb, sa]).unwrap();
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn never_decreases_prior(
            prior_amounts in prop::collection::vec(0u64..1_000_000, 1..8),
            new_amounts in prop::collection::vec((0u8..8, 0u64..1_000_000), 0..20),
        ) {
            let prior: CumulativeLedger = prior_amounts
                .iter()
                .enumerate()
                .map(|(i, &amt)| (pid(i as u8), row(i as u8, u128::from(amt))))
                .collect();
            let stream: Vec<RewardEntry> = new_amounts
                .iter()
                .map(|&(p, amt)| entry(p, p, u128::from(amt)))
                .collect();
            let next = combine(&prior, &[stream]).unwrap();
            for (p, e) in prior.iter() {
                prop_assert!(next.amount_of(p) >= e.cumulative_amount);
            }
        }
    }
}
