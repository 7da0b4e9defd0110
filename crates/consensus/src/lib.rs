//! §4.3/§4.4/§4.5 Consensus Engine: response intake, finalization,
//! settlement. Built directly on `oracle-ledger` (storage) and
//! `oracle-committee` (the payout escrow); owns no state of its own.

mod callback;
mod config;
mod engine;
mod error;

pub use callback::{FinalizationCallback, LoggingCallback, NullCallback};
pub use config::ConsensusConfig;
pub use engine::{ConsensusEngine, SubmitOutcome};
pub use error::ConsensusError;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use oracle_committee::{CommitteeConfig, CommitteeRegistry};
    use oracle_ledger::{AllocateParams, CallbackTarget, InMemoryStore, RequestLedger};
    use oracle_types::{keccak256, Address, ConsensusType, Status, U256};

    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    /// Captures every delivered callback payload for assertions.
    struct RecordingCallback {
        calls: StdMutex<Vec<(U256, Vec<Vec<u8>>, Status, U256)>>,
    }

    impl RecordingCallback {
        fn new() -> Self {
            RecordingCallback { calls: StdMutex::new(Vec::new()) }
        }
    }

    impl FinalizationCallback for RecordingCallback {
        fn handle_response(&self, request_id: U256, results: &[Vec<u8>], status: Status, final_cost: U256) {
            self.calls.lock().unwrap().push((request_id, results.to_vec(), status, final_cost));
        }
    }

    struct Harness {
        engine: ConsensusEngine<InMemoryStore>,
        ledger: Arc<RequestLedger<InMemoryStore>>,
        committee: Arc<CommitteeRegistry>,
        callback: Arc<RecordingCallback>,
    }

    fn harness(capacity: usize, config: ConsensusConfig) -> Harness {
        let ledger = Arc::new(RequestLedger::new(InMemoryStore::new(capacity)));
        let committee = Arc::new(CommitteeRegistry::new(CommitteeConfig::default()));
        let callback = Arc::new(RecordingCallback::new());
        let engine = ConsensusEngine::new(
            Arc::clone(&ledger),
            Arc::clone(&committee),
            Arc::clone(&callback) as Arc<dyn FinalizationCallback>,
            config,
        );
        Harness { engine, ledger, committee, callback }
    }

    fn allocate(
        ledger: &RequestLedger<InMemoryStore>,
        subcommittee: Vec<Address>,
        threshold: usize,
        consensus_type: ConsensusType,
        max_cost: U256,
    ) -> U256 {
        ledger.allocate(AllocateParams {
            requester: addr(200),
            callback: CallbackTarget { address: Some(addr(201)), selector: [0; 4] },
            subcommittee,
            threshold,
            consensus_type,
            agent_creator: Some(addr(202)),
            max_cost,
            created_at: 0,
        })
    }

    /// S1: happy path, Majority.
    #[test]
    fn s1_happy_path_majority() {
        let h = harness(8, ConsensusConfig { gas_price: U256::ZERO, ..ConsensusConfig::default() });
        let subcommittee = vec![addr(1), addr(2), addr(3)];
        let id = allocate(&h.ledger, subcommittee.clone(), 2, ConsensusType::Majority, U256::from(3000u64));

        let out1 = h
            .engine
            .submit_response(id, addr(1), b"OK".to_vec(), keccak256(b"r1"), U256::from(100u64), true, 0)
            .unwrap();
        assert_eq!(out1, SubmitOutcome::Recorded { finalized: None });

        let out2 = h
            .engine
            .submit_response(id, addr(2), b"OK".to_vec(), keccak256(b"r2"), U256::from(200u64), true, 0)
            .unwrap();
        assert_eq!(out2, SubmitOutcome::Recorded { finalized: Some(Status::Success) });

        let req = h.ledger.get(id).unwrap();
        assert_eq!(req.status, Status::Success);
        // median(100, 200) = (100+200)/2 = 150; validatorCosts = 450.
        assert_eq!(req.final_cost, U256::from(450u64));

        assert_eq!(h.committee.pending_balance(addr(1)), U256::from(105u64));
        assert_eq!(h.committee.pending_balance(addr(2)), U256::from(105u64));
        assert_eq!(h.committee.pending_balance(addr(3)), U256::from(105u64));
        assert_eq!(h.committee.pending_balance(addr(202)), U256::from(90u64));
        // rebate: 3000 - 450 = 2550, credited to requester addr(200).
        assert_eq!(h.committee.pending_balance(addr(200)), U256::from(2550u64));

        let calls = h.callback.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec![b"OK".to_vec()]);
        assert_eq!(calls[0].2, Status::Success);
    }

    /// S2: Threshold mode, heterogeneous values.
    #[test]
    fn s2_threshold_heterogeneous() {
        let h = harness(8, ConsensusConfig { gas_price: U256::ZERO, ..ConsensusConfig::default() });
        let subcommittee = vec![addr(1), addr(2), addr(3)];
        let id = allocate(&h.ledger, subcommittee, 3, ConsensusType::Threshold, U256::from(10_000u64));

        h.engine.submit_response(id, addr(1), b"A".to_vec(), keccak256(b"r1"), U256::from(100u64), true, 0).unwrap();
        h.engine.submit_response(id, addr(2), b"B".to_vec(), keccak256(b"r2"), U256::from(105u64), true, 0).unwrap();
        let out = h
            .engine
            .submit_response(id, addr(3), b"C".to_vec(), keccak256(b"r3"), U256::from(102u64), true, 0)
            .unwrap();
        assert_eq!(out, SubmitOutcome::Recorded { finalized: Some(Status::Success) });

        let req = h.ledger.get(id).unwrap();
        assert_eq!(req.status, Status::Success);
        // median(100, 102, 105) = 102; validatorCosts = 306.
        assert_eq!(req.final_cost, U256::from(306u64));

        let calls = h.callback.calls.lock().unwrap();
        assert_eq!(calls[0].1, vec![b"A".to_vec(), b"B".to_vec(), b"C".to_vec()]);
    }

    /// S3: success impossible forces Failed before the third response.
    #[test]
    fn s3_success_impossible() {
        let h = harness(8, ConsensusConfig { gas_price: U256::ZERO, ..ConsensusConfig::default() });
        let subcommittee = vec![addr(1), addr(2), addr(3)];
        let id = allocate(&h.ledger, subcommittee, 2, ConsensusType::Majority, U256::from(3000u64));

        h.engine
            .submit_response(id, addr(1), vec![], keccak256(b"r1"), U256::from(100u64), false, 0)
            .unwrap();
        let out = h
            .engine
            .submit_response(id, addr(2), vec![], keccak256(b"r2"), U256::from(200u64), false, 0)
            .unwrap();
        assert_eq!(out, SubmitOutcome::Recorded { finalized: Some(Status::Failed) });

        let req = h.ledger.get(id).unwrap();
        assert_eq!(req.status, Status::Failed);
        assert_eq!(req.final_cost, U256::from(450u64));

        let calls = h.callback.calls.lock().unwrap();
        assert!(calls[0].1.is_empty());
        assert_eq!(calls[0].2, Status::Failed);
    }

    /// S4: timeout with partial data.
    #[test]
    fn s4_timeout_with_partial_data() {
        let h = harness(
            8,
            ConsensusConfig { gas_price: U256::ZERO, request_timeout_secs: 100, ..ConsensusConfig::default() },
        );
        let subcommittee = vec![addr(1), addr(2), addr(3)];
        let id = allocate(&h.ledger, subcommittee, 2, ConsensusType::Majority, U256::from(3000u64));

        h.engine
            .submit_response(id, addr(1), b"only".to_vec(), keccak256(b"r1"), U256::from(100u64), true, 0)
            .unwrap();

        h.engine.timeout_request(id, 101).unwrap();

        let req = h.ledger.get(id).unwrap();
        assert_eq!(req.status, Status::TimedOut);
        // median of a single response (100) * 3 subcommittee members = 300.
        assert_eq!(req.final_cost, U256::from(300u64));

        let calls = h.callback.calls.lock().unwrap();
        assert_eq!(calls[0].1, vec![b"only".to_vec()]);
        assert_eq!(calls[0].2, Status::TimedOut);
    }

    #[test]
    fn already_finalized_is_silent_on_submit() {
        let h = harness(8, ConsensusConfig { gas_price: U256::ZERO, ..ConsensusConfig::default() });
        let subcommittee = vec![addr(1), addr(2), addr(3)];
        let id = allocate(&h.ledger, subcommittee, 2, ConsensusType::Majority, U256::from(3000u64));
        h.engine.submit_response(id, addr(1), b"OK".to_vec(), keccak256(b"r1"), U256::from(100u64), true, 0).unwrap();
        h.engine.submit_response(id, addr(2), b"OK".to_vec(), keccak256(b"r2"), U256::from(200u64), true, 0).unwrap();

        let late = h
            .engine
            .submit_response(id, addr(3), b"OK".to_vec(), keccak256(b"r3"), U256::from(50u64), true, 0)
            .unwrap();
        assert_eq!(late, SubmitOutcome::Ignored);
    }

    #[test]
    fn duplicate_response_from_same_validator_errors() {
        let h = harness(8, ConsensusConfig::default());
        let subcommittee = vec![addr(1), addr(2), addr(3)];
        let id = allocate(&h.ledger, subcommittee, 3, ConsensusType::Threshold, U256::from(3000u64));
        h.engine.submit_response(id, addr(1), vec![], keccak256(b"r1"), U256::from(1u64), true, 0).unwrap();
        let err = h
            .engine
            .submit_response(id, addr(1), vec![], keccak256(b"r1"), U256::from(1u64), true, 0)
            .unwrap_err();
        assert_eq!(err, ConsensusError::AlreadyResponded);
    }

    #[test]
    fn non_member_cannot_submit() {
        let h = harness(8, ConsensusConfig::default());
        let subcommittee = vec![addr(1), addr(2), addr(3)];
        let id = allocate(&h.ledger, subcommittee, 2, ConsensusType::Majority, U256::from(3000u64));
        let err = h
            .engine
            .submit_response(id, addr(9), vec![], keccak256(b"r9"), U256::from(1u64), true, 0)
            .unwrap_err();
        assert_eq!(err, ConsensusError::NotSubcommitteeMember);
    }
}
