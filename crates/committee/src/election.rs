use oracle_types::{keccak256, Address, Hash256, U256};

use crate::error::CommitteeError;

/// Seeded Fisher-Yates partial shuffle (spec §4.1).
///
/// `active` is the committee order for *this* call only — the caller
/// decides how that order is produced; it need not be stable across
/// calls, only within one. The result is a pure function of
/// `(active, n, seed)`: same inputs, same output, always.
pub fn elect_subcommittee(
    active: &[Address],
    n: usize,
    seed: Hash256,
) -> Result<Vec<Address>, CommitteeError> {
    if n > active.len() {
        return Err(CommitteeError::InsufficientMembers { active: active.len(), requested: n });
    }

    let mut pool = active.to_vec();
    for i in 0..n {
        let remaining = (pool.len() - i) as u64;
        let h = keccak256(&seed_with_index(seed, i as u64));
        let offset = (hash_to_u256(h) % U256::from(remaining)).as_u64();
        let j = i + offset as usize;
        pool.swap(i, j);
    }
    pool.truncate(n);
    Ok(pool)
}

fn seed_with_index(seed: Hash256, i: u64) -> [u8; 40] {
    let mut buf = [0u8; 40];
    buf[..32].copy_from_slice(&seed.0);
    buf[32..].copy_from_slice(&i.to_be_bytes());
    buf
}

fn hash_to_u256(h: Hash256) -> U256 {
    U256::from_be_bytes(h.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_types::keccak256;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let active: Vec<Address> = (0..10).map(addr).collect();
        let seed = keccak256(&42u64.to_be_bytes());
        let a = elect_subcommittee(&active, 5, seed).unwrap();
        let b = elect_subcommittee(&active, 5, seed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn subset_and_unique() {
        let active: Vec<Address> = (0..10).map(addr).collect();
        let seed = keccak256(b"seed");
        let chosen = elect_subcommittee(&active, 6, seed).unwrap();
        assert_eq!(chosen.len(), 6);
        let mut sorted = chosen.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), chosen.len());
        for v in &chosen {
            assert!(active.contains(v));
        }
    }

    #[test]
    fn fails_when_n_exceeds_active() {
        let active: Vec<Address> = (0..3).map(addr).collect();
        let seed = keccak256(b"seed");
        let err = elect_subcommittee(&active, 4, seed).unwrap_err();
        assert_eq!(err, CommitteeError::InsufficientMembers { active: 3, requested: 4 });
    }

    proptest::proptest! {
        #[test]
        fn election_is_pure(n in 1usize..8, members in 8usize..20, raw_seed: u64) {
            let active: Vec<Address> = (0..members as u8).map(addr).collect();
            let seed = keccak256(&raw_seed.to_be_bytes());
            let a = elect_subcommittee(&active, n, seed).unwrap();
            let b = elect_subcommittee(&active, n, seed).unwrap();
            proptest::prop_assert_eq!(a.clone(), b);
            proptest::prop_assert_eq!(a.len(), n);
            let mut sorted = a.clone();
            sorted.sort();
            sorted.dedup();
            proptest::prop_assert_eq!(sorted.len(), a.len());
        }
    }
}
