//! The process-wide `Engine` object (spec.md §9 "Global mutable state"):
//! one owned instance wiring the Committee Registry, Agent Registry,
//! Request Ledger and Consensus Engine together, exposing the full
//! on-chain API of spec.md §6 and emitting its three event types.

mod config;
mod error;
mod events;

pub use config::EngineConfig;
pub use error::EngineError;
pub use events::{EngineEvent, EVENT_CHANNEL_CAPACITY};

use std::sync::Arc;

use oracle_agent_registry::AgentRegistry;
use oracle_committee::{CommitteeConfig, CommitteeRegistry, UpkeepOutcome};
use oracle_consensus::{ConsensusConfig, ConsensusEngine, ConsensusError, FinalizationCallback, SubmitOutcome};
use oracle_ledger::{AllocateParams, CallbackTarget, InMemoryStore, Request, Response, Store};
use oracle_types::{keccak256, Address, ConsensusType, Status, U256};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

/// Arguments to `create_advanced_request` (spec.md §4.2
/// `createAdvancedRequest`). `create_request` fills in the engine's
/// defaults and calls through to this.
pub struct CreateRequestParams {
    pub agent_id: u64,
    pub requester: Address,
    pub callback: CallbackTarget,
    /// Carried only as far as the `RequestCreated` event — the ledger
    /// itself is payload-free (spec.md §4.2 step 5).
    pub payload: Vec<u8>,
    pub deposit_value: U256,
    pub subcommittee_size: usize,
    pub threshold: usize,
    pub consensus_type: ConsensusType,
    pub now: u64,
}

pub struct Engine<S: Store = InMemoryStore, A: AgentRegistry = oracle_agent_registry::InMemoryAgentRegistry> {
    ledger: Arc<oracle_ledger::RequestLedger<S>>,
    committee: Arc<CommitteeRegistry>,
    agent_registry: Arc<A>,
    consensus: ConsensusEngine<S>,
    config: EngineConfig,
    events: broadcast::Sender<EngineEvent>,
    /// Guards the whole `createRequest`/`createAdvancedRequest` sequence
    /// (peek next id, elect subcommittee, allocate) as one atomic block —
    /// the on-chain layer's single-threaded transaction model (spec.md
    /// §5) applied to the one operation that spans three collaborators.
    create_lock: Mutex<()>,
}

impl<S: Store, A: AgentRegistry> Engine<S, A> {
    pub fn new(
        config: EngineConfig,
        committee_config: CommitteeConfig,
        consensus_config: ConsensusConfig,
        store: S,
        agent_registry: A,
        callback: Arc<dyn FinalizationCallback>,
    ) -> Self {
        let ledger = Arc::new(oracle_ledger::RequestLedger::new(store));
        let committee = Arc::new(CommitteeRegistry::new(committee_config));
        let consensus =
            ConsensusEngine::new(Arc::clone(&ledger), Arc::clone(&committee), callback, consensus_config);
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Engine {
            ledger,
            committee,
            agent_registry: Arc::new(agent_registry),
            consensus,
            config,
            events,
            create_lock: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// §4.2 `createRequest` convenience: engine-configured defaults,
    /// Majority consensus.
    pub fn create_request(
        &self,
        agent_id: u64,
        requester: Address,
        callback: CallbackTarget,
        payload: Vec<u8>,
        deposit_value: U256,
        now: u64,
    ) -> Result<U256, EngineError> {
        self.create_advanced_request(CreateRequestParams {
            agent_id,
            requester,
            callback,
            payload,
            deposit_value,
            subcommittee_size: self.config.default_subcommittee_size,
            threshold: self.config.default_threshold,
            consensus_type: ConsensusType::Majority,
            now,
        })
    }

    /// §4.2 `createAdvancedRequest`, steps 1-6.
    pub fn create_advanced_request(&self, params: CreateRequestParams) -> Result<U256, EngineError> {
        let _guard = self.create_lock.lock();

        if params.threshold == 0 || params.threshold > params.subcommittee_size {
            return Err(EngineError::InvalidThreshold {
                threshold: params.threshold,
                subcommittee_size: params.subcommittee_size,
            });
        }

        let expected_deposit =
            self.config.max_per_agent_fee * U256::from(params.subcommittee_size as u64);
        if params.deposit_value != expected_deposit {
            return Err(EngineError::IncorrectDeposit {
                expected: expected_deposit,
                actual: params.deposit_value,
            });
        }

        let agent = self.agent_registry.get_agent(params.agent_id)?;

        // Committee membership sizing (`InsufficientMembers`) is enforced
        // by `elect_subcommittee` itself; no separate check needed here.
        let peeked_id = self.ledger.next_request_id();
        let seed = keccak256(&peeked_id.to_be_bytes());
        let subcommittee =
            self.committee.elect_subcommittee(params.subcommittee_size, seed, params.now)?;

        let request_id = self.ledger.allocate(AllocateParams {
            requester: params.requester,
            callback: params.callback,
            subcommittee: subcommittee.clone(),
            threshold: params.threshold,
            consensus_type: params.consensus_type,
            agent_creator: Some(agent.owner),
            max_cost: params.deposit_value,
            created_at: params.now,
        });
        debug_assert_eq!(request_id, peeked_id, "no allocation can race inside create_lock");

        info!(%request_id, agent_id = params.agent_id, subcommittee_len = subcommittee.len(), "request created");
        let _ = self.events.send(EngineEvent::RequestCreated {
            request_id,
            agent_id: params.agent_id,
            max_cost_per_agent: self.config.max_per_agent_fee,
            payload: params.payload,
            subcommittee,
            threshold: params.threshold,
        });
        Ok(request_id)
    }

    /// §4.3 `submitResponse`.
    pub fn submit_response(
        &self,
        request_id: U256,
        validator: Address,
        result: Vec<u8>,
        receipt: oracle_types::Hash256,
        cost: U256,
        success: bool,
        now: u64,
    ) -> Result<SubmitOutcome, EngineError> {
        let outcome =
            self.consensus.submit_response(request_id, validator, result, receipt, cost, success, now)?;
        if let SubmitOutcome::Recorded { finalized: Some(status) } = outcome {
            let _ = self.events.send(EngineEvent::RequestFinalized { request_id, status });
        }
        Ok(outcome)
    }

    /// §4.3 `timeoutRequest`.
    pub fn timeout_request(&self, request_id: U256, now: u64) -> Result<(), EngineError> {
        self.consensus.timeout_request(request_id, now)?;
        let _ = self.events.send(EngineEvent::RequestFinalized { request_id, status: Status::TimedOut });
        Ok(())
    }

    /// §4.3 `upkeepRequests`, emitting `RequestFinalized` for every id it
    /// actually times out.
    pub fn upkeep_requests(&self, now: u64) {
        for request_id in self.consensus.upkeep_requests(now) {
            let _ = self.events.send(EngineEvent::RequestFinalized { request_id, status: Status::TimedOut });
        }
    }

    /// §6 `getRequest`.
    pub fn get_request(&self, request_id: U256) -> Result<Request, EngineError> {
        self.ledger.get(request_id).map_err(|err| EngineError::from(ConsensusError::from(err)))
    }

    /// §6 `getResponses`.
    pub fn get_responses(&self, request_id: U256) -> Result<Vec<Response>, EngineError> {
        Ok(self.get_request(request_id)?.responses)
    }

    /// §6 `getRequestDeposit`.
    pub fn get_request_deposit(&self) -> U256 {
        self.config.default_deposit()
    }

    /// §4.1 `heartbeat`.
    pub fn heartbeat(&self, who: Address, now: u64) {
        self.committee.heartbeat(who, now);
    }

    /// §4.1 `upkeep`, emitting `NewEpoch` when the active set changed.
    pub fn committee_upkeep(&self, now: u64) -> UpkeepOutcome {
        let outcome = self.committee.upkeep(now);
        if let UpkeepOutcome::NewEpoch { epoch, ref members } = outcome {
            let _ = self.events.send(EngineEvent::NewEpoch { epoch, members: members.clone() });
        }
        outcome
    }

    pub fn get_active_members(&self, now: u64) -> Vec<Address> {
        self.committee.get_active_members(now)
    }

    pub fn is_active(&self, who: Address, now: u64) -> bool {
        self.committee.is_active(who, now)
    }

    pub fn current_epoch(&self) -> u64 {
        self.committee.current_epoch()
    }

    /// §4.1 `claim`.
    pub fn claim(&self, who: Address) -> Result<U256, EngineError> {
        Ok(self.committee.claim(who)?)
    }

    pub fn pending_balance(&self, who: Address) -> U256 {
        self.committee.pending_balance(who)
    }

    /// Agent Registry lookup (spec.md §6 "Agent Registry API (consumed)"),
    /// exposed so off-chain collaborators (the validator runner) can
    /// resolve an agent id to its container image without their own copy
    /// of the registry.
    pub fn get_agent(&self, id: u64) -> Result<oracle_agent_registry::AgentMeta, EngineError> {
        Ok(self.agent_registry.get_agent(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_agent_registry::{AgentMeta, InMemoryAgentRegistry};
    use oracle_consensus::NullCallback;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    fn engine_with_members(n: u8) -> Engine<InMemoryStore, InMemoryAgentRegistry> {
        let agents = InMemoryAgentRegistry::new();
        agents.register(
            1,
            AgentMeta {
                metadata_uri: "ipfs://meta".into(),
                container_image_uri: "oci://agent:latest".into(),
                owner: addr(250),
            },
        );
        let engine = Engine::new(
            EngineConfig::default(),
            CommitteeConfig::default(),
            ConsensusConfig { gas_price: U256::ZERO, ..ConsensusConfig::default() },
            InMemoryStore::new(8),
            agents,
            Arc::new(NullCallback),
        );
        for i in 1..=n {
            engine.heartbeat(addr(i), 0);
        }
        engine
    }

    #[test]
    fn create_request_elects_subcommittee_and_emits_event() {
        let engine = engine_with_members(5);
        let mut rx = engine.subscribe();
        let deposit = engine.get_request_deposit();
        let id = engine
            .create_request(1, addr(100), CallbackTarget::NONE, b"payload".to_vec(), deposit, 0)
            .unwrap();

        let request = engine.get_request(id).unwrap();
        assert_eq!(request.subcommittee.len(), engine.config.default_subcommittee_size);
        assert_eq!(request.agent_creator, Some(addr(250)));

        match rx.try_recv().unwrap() {
            EngineEvent::RequestCreated { request_id, agent_id, .. } => {
                assert_eq!(request_id, id);
                assert_eq!(agent_id, 1);
            }
            other => panic!("expected RequestCreated, got {other:?}"),
        }
    }

    #[test]
    fn create_request_rejects_wrong_deposit() {
        let engine = engine_with_members(5);
        let err = engine
            .create_request(1, addr(100), CallbackTarget::NONE, vec![], U256::from(1u64), 0)
            .unwrap_err();
        assert!(matches!(err, EngineError::IncorrectDeposit { .. }));
    }

    #[test]
    fn create_request_fails_when_committee_too_small() {
        let engine = engine_with_members(1);
        let deposit = engine.get_request_deposit();
        let err = engine
            .create_request(1, addr(100), CallbackTarget::NONE, vec![], deposit, 0)
            .unwrap_err();
        assert!(matches!(err, EngineError::Committee(_)));
    }

    #[test]
    fn unknown_agent_surfaces_as_engine_error() {
        let engine = engine_with_members(5);
        let deposit = engine.get_request_deposit();
        let err = engine
            .create_request(99, addr(100), CallbackTarget::NONE, vec![], deposit, 0)
            .unwrap_err();
        assert!(matches!(err, EngineError::AgentRegistry(_)));
    }

    #[test]
    fn submit_response_emits_finalized_event() {
        let engine = engine_with_members(5);
        let deposit = engine.get_request_deposit();
        let id = engine.create_request(1, addr(100), CallbackTarget::NONE, vec![], deposit, 0).unwrap();
        let request = engine.get_request(id).unwrap();
        let mut rx = engine.subscribe();
        // Drain the RequestCreated event already emitted by create_request.
        let _ = rx.try_recv();

        for (i, validator) in request.subcommittee.iter().enumerate().take(2) {
            engine
                .submit_response(
                    id,
                    *validator,
                    b"OK".to_vec(),
                    oracle_types::keccak256(&[i as u8]),
                    U256::from(100u64),
                    true,
                    0,
                )
                .unwrap();
        }

        match rx.try_recv().unwrap() {
            EngineEvent::RequestFinalized { request_id, status } => {
                assert_eq!(request_id, id);
                assert_eq!(status, Status::Success);
            }
            other => panic!("expected RequestFinalized, got {other:?}"),
        }
    }
}
