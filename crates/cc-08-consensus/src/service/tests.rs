use super::*;
use crate::adapters::{InMemoryChain, LoopbackNetwork, Member, StaticDirectory};
use crate::domain::{generate, ExclusionPolicy};
use crate::ports::MempoolGateway;
use parking_lot::Mutex;
use shared_types::{FixedTimeSource, Timestamp, Transaction, TransactionKind};
use std::net::Ipv4Addr;
use std::time::Duration;

const NOW: Timestamp = 1_700_000_000;

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

struct TestSigner {
    address: Address,
    public_key: String,
}

impl Signer for TestSigner {
    fn sign(&self, _message: &[u8]) -> Option<String> {
        Some(format!("sig-{}", self.address))
    }

    fn address(&self) -> Address {
        self.address.clone()
    }

    fn public_key(&self) -> String {
        self.public_key.clone()
    }
}

#[derive(Default)]
struct MockMempool {
    pending: Mutex<Vec<Transaction>>,
    removed: Mutex<Vec<String>>,
    /// Set to refuse every block's contents with this reason.
    refuse_blocks: Mutex<Option<String>>,
}

#[async_trait]
impl MempoolGateway for MockMempool {
    async fn submit(&self, tx: Transaction) -> Result<(), String> {
        self.pending.lock().push(tx);
        Ok(())
    }

    async fn select_for_block(&self, max_count: usize, _max_bytes: usize) -> Vec<Transaction> {
        self.pending.lock().iter().take(max_count).cloned().collect()
    }

    async fn validate_block_transactions(&self, _block: &Block) -> Result<(), String> {
        match self.refuse_blocks.lock().clone() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    async fn remove_included(&self, transactions: &[Transaction]) {
        self.pending
            .lock()
            .retain(|tx| !transactions.iter().any(|t| t.hash == tx.hash));
        self.removed
            .lock()
            .extend(transactions.iter().map(|tx| tx.hash.clone()));
    }
}

fn transfer(nonce: u64) -> Transaction {
    let mut tx = Transaction {
        hash: String::new(),
        from_address: Address::from("0xalice"),
        to_address: Address::from("0xbob"),
        amount: 10,
        fee: 1,
        nonce,
        timestamp: NOW,
        kind: TransactionKind::Transfer,
        public_key: "pk-0xalice".into(),
        signature: "sig-0xalice".into(),
        payload: String::new(),
    };
    tx.hash = tx.compute_hash();
    tx
}

struct Node {
    service: Arc<ConsensusService>,
    chain: Arc<InMemoryChain>,
    mempool: Arc<MockMempool>,
    directory: Arc<StaticDirectory>,
    address: Address,
}

fn spawn_node(
    network: &Arc<LoopbackNetwork>,
    name: &str,
    public_key: &str,
    local_ip: IpAddr,
    members: Vec<Member>,
) -> Node {
    let address = Address::from(name);
    let link = Arc::new(network.link(local_ip));
    let chain = Arc::new(InMemoryChain::new());
    let mempool = Arc::new(MockMempool::default());
    let directory = Arc::new(StaticDirectory::new(address.clone(), members));
    let service = Arc::new(ConsensusService::new(ConsensusDependencies {
        config: ConsensusConfig::for_testing(),
        signer: Arc::new(TestSigner {
            address: address.clone(),
            public_key: public_key.into(),
        }),
        local_ip,
        peers: link.clone(),
        broadcaster: link,
        chain: chain.clone(),
        directory: directory.clone(),
        mempool: mempool.clone(),
        time_source: Arc::new(FixedTimeSource::new(NOW)),
    }));
    network.register(local_ip, service.clone());
    Node {
        service,
        chain,
        mempool,
        directory,
        address,
    }
}

fn solo_node() -> Node {
    let network = LoopbackNetwork::new();
    spawn_node(&network, "0xsolo", "pk-solo", ip(1), vec![])
}

/// A key whose genesis VRF sits in the upper half of the range.
fn high_vrf_key(prefix: &str) -> String {
    (0..)
        .map(|i| format!("{}-{}", prefix, i))
        .find(|pk| generate(pk, 0, GENESIS_PREV_HASH).vrf_number > 1 << 30)
        .unwrap()
}

/// A key that beats `rival` at genesis.
fn beating_key(prefix: &str, rival: &str) -> String {
    let target = generate(rival, 0, GENESIS_PREV_HASH).vrf_number;
    (0..)
        .map(|i| format!("{}-{}", prefix, i))
        .find(|pk| generate(pk, 0, GENESIS_PREV_HASH).vrf_number < target)
        .unwrap()
}

async fn wait_for_round(service: &ConsensusService) {
    while service.current_round().is_none() {
        tokio::task::yield_now().await;
    }
}

async fn wait_for_phase(service: &ConsensusService, phase: RoundPhase) {
    while service.current_round().map(|r| r.phase()) != Some(phase) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A genesis block by `producer`, entitled by its key.
fn genesis_by(producer: &Address, key: &str, timestamp: Timestamp, transactions: Vec<Transaction>) -> Block {
    let proof = create_proof(producer.clone(), key, 0, GENESIS_PREV_HASH, ip(2));
    BlockTemplate {
        height: 0,
        prev_hash: GENESIS_PREV_HASH,
        validator: producer,
        validator_proof: &proof.proof_hash,
        timestamp,
        chain_ref_id: "",
    }
    .craft(transactions)
}

/// Two genesis blocks by `producer`, returned as (higher hash, lower hash).
/// The higher one carries `tx`.
fn competing_genesis(producer: &Address, key: &str, tx: Transaction) -> (Block, Block) {
    let plain = genesis_by(producer, key, NOW, vec![]);
    let loaded = (1..)
        .map(|offset| genesis_by(producer, key, NOW + offset, vec![tx.clone()]))
        .find(|block| block.hash > plain.hash)
        .unwrap();
    (loaded, plain)
}

/// Follower `0xf` with one registered peer `0xp` at ip(2) whose key beats
/// the follower's at genesis.
fn follower_with_peer() -> (Node, Address, String) {
    let network = LoopbackNetwork::new();
    let own_key = high_vrf_key("pk-f");
    let peer_key = beating_key("pk-p", &own_key);
    let peer = Address::from("0xp");
    let node = spawn_node(
        &network,
        "0xf",
        &own_key,
        ip(1),
        vec![Member::new("0xf", ip(1), own_key.clone()), Member::new(peer.clone(), ip(2), peer_key.clone())],
    );
    (node, peer, peer_key)
}

// =============================================================================
// SINGLE NODE
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_solo_node_produces_genesis() {
    let node = solo_node();
    node.mempool.submit(transfer(0)).await.unwrap();

    let outcome = node.service.run_height().await.unwrap();

    let HeightOutcome::Produced(block) = outcome else {
        panic!("expected a produced block, got {:?}", outcome);
    };
    assert_eq!(block.height, 0);
    assert_eq!(block.prev_hash, GENESIS_PREV_HASH);
    assert_eq!(block.validator, node.address);
    assert_eq!(block.transactions.len(), 1);
    assert!(block.is_hash_consistent());
    assert_eq!(node.chain.height(), Some(0));
    assert_eq!(node.mempool.removed.lock().len(), 1);
    assert!(node.mempool.pending.lock().is_empty());
    assert!(node.service.current_round().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_solo_node_extends_its_own_chain() {
    let node = solo_node();
    let first = node.service.run_height().await.unwrap();
    let second = node.service.run_height().await.unwrap();

    let (HeightOutcome::Produced(genesis), HeightOutcome::Produced(next)) = (first, second) else {
        panic!("solo node should produce every height");
    };
    assert_eq!(next.height, 1);
    assert_eq!(next.prev_hash, genesis.hash);
    assert_eq!(node.service.block_at(1).await, Some(next));
}

#[tokio::test(start_paused = true)]
async fn test_understaked_node_casts_nothing() {
    let node = solo_node();
    let mut config = ConsensusConfig::for_testing();
    config.min_stake = 100;
    let service = ConsensusService::new(ConsensusDependencies {
        config,
        signer: Arc::new(TestSigner {
            address: node.address.clone(),
            public_key: "pk-solo".into(),
        }),
        local_ip: ip(1),
        peers: Arc::new(LoopbackNetwork::new().link(ip(1))),
        broadcaster: Arc::new(LoopbackNetwork::new().link(ip(1))),
        chain: node.chain.clone(),
        directory: node.directory.clone(),
        mempool: node.mempool.clone(),
        time_source: Arc::new(FixedTimeSource::new(NOW)),
    });

    let outcome = service.run_height().await.unwrap();
    assert_eq!(outcome, HeightOutcome::NoWinner { height: 0 });
    assert!(node.chain.is_empty());
}

// =============================================================================
// TWO NODES
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_two_nodes_agree_on_one_block() {
    let network = LoopbackNetwork::new();
    let members = vec![Member::new("0xa", ip(1), "pk-a"), Member::new("0xb", ip(2), "pk-b")];
    let a = spawn_node(&network, "0xa", "pk-a", ip(1), members.clone());
    let b = spawn_node(&network, "0xb", "pk-b", ip(2), members);

    let (out_a, out_b) = tokio::join!(a.service.run_height(), b.service.run_height());
    let (out_a, out_b) = (out_a.unwrap(), out_b.unwrap());

    assert!(out_a.is_committed(), "a: {:?}", out_a);
    assert!(out_b.is_committed(), "b: {:?}", out_b);

    let expected_leader = if generate("pk-a", 0, GENESIS_PREV_HASH).vrf_number
        < generate("pk-b", 0, GENESIS_PREV_HASH).vrf_number
    {
        &a.address
    } else {
        &b.address
    };
    let block_a = a.chain.last_block().await.unwrap();
    let block_b = b.chain.last_block().await.unwrap();
    assert_eq!(block_a, block_b);
    assert_eq!(&block_a.validator, expected_leader);
}

// =============================================================================
// PRODUCER FAILURE
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_no_show_producer_is_excluded_after_three_strikes() {
    let network = LoopbackNetwork::new();
    let own_key = high_vrf_key("pk-live");
    let ghost_key = beating_key("pk-ghost", &own_key);
    let ghost = Address::from("0xghost");
    let members = vec![
        Member::new("0xlive", ip(1), own_key.clone()),
        Member::new(ghost.clone(), ip(9), ghost_key.clone()),
    ];
    let node = spawn_node(&network, "0xlive", &own_key, ip(1), members);
    let ghost_proof = create_proof(ghost.clone(), &ghost_key, 0, GENESIS_PREV_HASH, ip(9));

    let policy = ExclusionPolicy::default();
    for strike in 1..=policy.strike_threshold {
        let service = node.service.clone();
        let height = tokio::spawn(async move { service.run_height().await });
        wait_for_round(&node.service).await;
        assert!(node.service.accept_proof(ghost_proof.clone(), ip(9)).await.unwrap());

        let outcome = height.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            HeightOutcome::ProducerNoShow {
                height: 0,
                producer: ghost.clone(),
                strikes: strike,
            }
        );
    }
    assert_eq!(node.service.excluded_producers(), vec![ghost.clone()]);
    // Each missed height charges the failed heartbeat and the no-show.
    assert_eq!(node.directory.check_failures(&ghost), 2 * policy.strike_threshold);

    // Excluded: our own proof wins, but one caster out of two is no quorum.
    let service = node.service.clone();
    let height = tokio::spawn(async move { service.run_height().await });
    wait_for_round(&node.service).await;
    node.service.accept_proof(ghost_proof.clone(), ip(9)).await.unwrap();
    let outcome = height.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        HeightOutcome::QuorumNotReached {
            height: 0,
            approvals: 1,
            casters: 2,
        }
    );
    assert!(node.chain.is_empty());
}

// =============================================================================
// INBOUND API
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_inputs_without_round_are_refused() {
    let node = solo_node();
    let proof = create_proof(node.address.clone(), "pk-solo", 0, GENESIS_PREV_HASH, ip(1));
    assert!(matches!(
        node.service.accept_proof(proof, ip(1)).await,
        Err(ConsensusError::NoActiveRound)
    ));
    assert!(matches!(
        node.service.accept_approval(0, Address::from("0xpeer"), ip(2)),
        Err(ConsensusError::NoActiveRound)
    ));
    assert_eq!(node.service.current_height(), None);
}

#[tokio::test(start_paused = true)]
async fn test_approval_must_come_from_registered_ip() {
    let network = LoopbackNetwork::new();
    let peer = Address::from("0xpeer");
    let node = spawn_node(
        &network,
        "0xlead",
        "pk-lead",
        ip(1),
        vec![Member::new("0xlead", ip(1), "pk-lead"), Member::new(peer.clone(), ip(2), "pk-peer")],
    );
    let service = node.service.clone();
    let height = tokio::spawn(async move { service.run_height().await });
    wait_for_round(&node.service).await;

    assert!(matches!(
        node.service.accept_approval(0, Address::from("0xstranger"), ip(2)),
        Err(ConsensusError::UnknownApprover(_))
    ));
    assert!(matches!(
        node.service.accept_approval(0, peer.clone(), ip(3)),
        Err(ConsensusError::UnknownApprover(_))
    ));
    assert!(matches!(
        node.service.accept_approval(5, peer.clone(), ip(2)),
        Err(ConsensusError::WrongHeight { .. })
    ));
    assert!(node.service.accept_approval(0, peer.clone(), ip(2)).unwrap());
    assert!(!node.service.accept_approval(0, peer, ip(2)).unwrap());

    // The early approval carries the leader over the quorum.
    let outcome = height.await.unwrap().unwrap();
    assert!(matches!(outcome, HeightOutcome::Produced(_)));
}

#[tokio::test(start_paused = true)]
async fn test_block_extending_tip_is_caught_up() {
    let network = LoopbackNetwork::new();
    let producer = spawn_node(&network, "0xprod", "pk-prod", ip(7), vec![]);
    let HeightOutcome::Produced(genesis) = producer.service.run_height().await.unwrap() else {
        panic!("solo node should produce genesis");
    };

    let lagging = spawn_node(
        &LoopbackNetwork::new(),
        "0xlag",
        "pk-lag",
        ip(1),
        vec![Member::new("0xprod", ip(7), "pk-prod")],
    );
    lagging.service.accept_block(genesis.clone(), ip(7)).await.unwrap();
    assert_eq!(lagging.chain.height(), Some(0));
    assert_eq!(lagging.directory.check_failures(&producer.address), 0);

    assert!(matches!(
        lagging.service.accept_block(genesis, ip(7)).await,
        Err(ConsensusError::WrongHeight { expected: 1, actual: 0 })
    ));
}

// =============================================================================
// INBOUND AUTHENTICATION
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_proofs_must_come_from_registered_casters() {
    let network = LoopbackNetwork::new();
    let own_key = high_vrf_key("pk-live");
    let peer_key = high_vrf_key("pk-peer");
    let peer = Address::from("0xpeer");
    let node = spawn_node(
        &network,
        "0xlive",
        &own_key,
        ip(1),
        vec![Member::new("0xlive", ip(1), own_key.clone()), Member::new(peer.clone(), ip(2), peer_key.clone())],
    );
    let service = node.service.clone();
    let height = tokio::spawn(async move { service.run_height().await });
    wait_for_round(&node.service).await;

    // A freshly ground key under a new address would win every election.
    let ground = beating_key("pk-mallory", &own_key);
    let mallory = create_proof(Address::from("0xmallory-1"), &ground, 0, GENESIS_PREV_HASH, ip(5));
    assert!(matches!(
        node.service.accept_proof(mallory, ip(5)).await,
        Err(ConsensusError::UnknownCaster(_))
    ));

    let impostor = create_proof(peer.clone(), &ground, 0, GENESIS_PREV_HASH, ip(2));
    assert!(matches!(
        node.service.accept_proof(impostor, ip(2)).await,
        Err(ConsensusError::KeyMismatch(_))
    ));

    let genuine = create_proof(peer.clone(), &peer_key, 0, GENESIS_PREV_HASH, ip(2));
    assert!(matches!(
        node.service.accept_proof(genuine.clone(), ip(5)).await,
        Err(ConsensusError::SourceMismatch { .. })
    ));
    assert!(node.service.accept_proof(genuine, ip(2)).await.unwrap());

    let outcome = height.await.unwrap().unwrap();
    assert!(
        !matches!(&outcome, HeightOutcome::ProducerNoShow { producer, .. } if producer.as_str().starts_with("0xmallory")),
        "{:?}",
        outcome
    );
}

#[tokio::test(start_paused = true)]
async fn test_understaked_caster_proof_is_refused() {
    let (node, peer, peer_key) = follower_with_peer();
    node.chain.set_stake(node.address.clone(), 100);
    let mut config = ConsensusConfig::for_testing();
    config.min_stake = 50;
    let service = Arc::new(ConsensusService::new(ConsensusDependencies {
        config,
        signer: Arc::new(TestSigner {
            address: node.address.clone(),
            public_key: high_vrf_key("pk-f"),
        }),
        local_ip: ip(1),
        peers: Arc::new(LoopbackNetwork::new().link(ip(1))),
        broadcaster: Arc::new(LoopbackNetwork::new().link(ip(1))),
        chain: node.chain.clone(),
        directory: node.directory.clone(),
        mempool: node.mempool.clone(),
        time_source: Arc::new(FixedTimeSource::new(NOW)),
    }));
    let height = tokio::spawn({
        let service = service.clone();
        async move { service.run_height().await }
    });
    wait_for_round(&service).await;

    let proof = create_proof(peer.clone(), &peer_key, 0, GENESIS_PREV_HASH, ip(2));
    assert!(matches!(
        service.accept_proof(proof, ip(2)).await,
        Err(ConsensusError::InsufficientStake { stake: 0, .. })
    ));
    height.abort();
}

#[tokio::test(start_paused = true)]
async fn test_claims_need_a_registered_voter_at_its_address() {
    let (node, peer, peer_key) = follower_with_peer();
    let service = node.service.clone();
    let height = tokio::spawn(async move { service.run_height().await });
    wait_for_round(&node.service).await;

    let winner = create_proof(peer.clone(), &peer_key, 0, GENESIS_PREV_HASH, ip(2));
    let claim = |voter: &str, winner: &Proof| WinnerClaim {
        voter: Address::from(voter),
        height: 0,
        winner: winner.clone(),
    };

    // One sender cannot invent voters.
    for i in 0..3 {
        assert!(matches!(
            node.service.accept_claim(claim(&format!("0xsybil-{}", i), &winner), ip(2)).await,
            Err(ConsensusError::UnknownCaster(_))
        ));
    }
    assert!(matches!(
        node.service.accept_claim(claim("0xp", &winner), ip(6)).await,
        Err(ConsensusError::SourceMismatch { .. })
    ));
    let stranger = create_proof(Address::from("0xmallory"), "pk-m", 0, GENESIS_PREV_HASH, ip(6));
    assert!(matches!(
        node.service.accept_claim(claim("0xp", &stranger), ip(2)).await,
        Err(ConsensusError::UnknownCaster(_))
    ));
    assert!(node.service.accept_claim(claim("0xp", &winner), ip(2)).await.unwrap());
    assert!(!node.service.accept_claim(claim("0xp", &winner), ip(2)).await.unwrap());
    height.abort();
}

#[tokio::test(start_paused = true)]
async fn test_crafted_block_from_outside_the_casting_set_is_refused() {
    let node = solo_node();
    let service = node.service.clone();
    let height = tokio::spawn(async move { service.run_height().await });
    wait_for_round(&node.service).await;

    let mallory = Address::from("0xmallory");
    let crafted = BlockTemplate {
        height: 0,
        prev_hash: GENESIS_PREV_HASH,
        validator: &mallory,
        validator_proof: "not-a-proof",
        timestamp: NOW,
        chain_ref_id: "",
    }
    .craft(vec![]);
    assert!(matches!(
        node.service.accept_block(crafted, ip(5)).await,
        Err(ConsensusError::UnknownCaster(_))
    ));

    let HeightOutcome::Produced(block) = height.await.unwrap().unwrap() else {
        panic!("solo node should produce its own block");
    };
    assert_eq!(block.validator, node.address);
    assert_eq!(node.chain.last_block().await.unwrap().validator, node.address);
}

#[tokio::test(start_paused = true)]
async fn test_caster_block_needs_its_proof_source_and_contents() {
    let (node, peer, peer_key) = follower_with_peer();
    let service = node.service.clone();
    let height = tokio::spawn(async move { service.run_height().await });
    wait_for_round(&node.service).await;

    let mut unproven = genesis_by(&peer, &peer_key, NOW, vec![]);
    unproven.validator_proof = "not-a-proof".into();
    let unproven = unproven.seal();
    assert!(matches!(
        node.service.accept_block(unproven, ip(2)).await,
        Err(ConsensusError::WrongProducer { height: 0, .. })
    ));

    let block = genesis_by(&peer, &peer_key, NOW, vec![]);
    assert!(matches!(
        node.service.accept_block(block.clone(), ip(8)).await,
        Err(ConsensusError::SourceMismatch { .. })
    ));

    *node.mempool.refuse_blocks.lock() = Some("replayed nonce".into());
    assert!(matches!(
        node.service.accept_block(block.clone(), ip(2)).await,
        Err(ConsensusError::InvalidBlockContents(_))
    ));
    *node.mempool.refuse_blocks.lock() = None;

    node.service.accept_block(block.clone(), ip(2)).await.unwrap();
    assert_eq!(height.await.unwrap().unwrap(), HeightOutcome::Adopted(block));
}

// =============================================================================
// COMPETING BLOCKS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_lower_hash_block_wins_even_when_it_arrives_second() {
    let (node, peer, peer_key) = follower_with_peer();
    let service = node.service.clone();
    let height = tokio::spawn(async move { service.run_height().await });
    wait_for_round(&node.service).await;

    let (higher, lower) = competing_genesis(&peer, &peer_key, transfer(0));
    node.service.accept_block(higher, ip(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    node.service.accept_block(lower.clone(), ip(2)).await.unwrap();

    assert_eq!(height.await.unwrap().unwrap(), HeightOutcome::Adopted(lower.clone()));
    assert_eq!(node.chain.last_block().await, Some(lower));
    assert_eq!(node.directory.fork_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_better_block_after_commit_replaces_the_tip() {
    let (node, peer, peer_key) = follower_with_peer();
    let displaced_tx = transfer(0);
    let (higher, lower) = competing_genesis(&peer, &peer_key, displaced_tx.clone());

    node.service.accept_block(higher.clone(), ip(2)).await.unwrap();
    assert_eq!(node.chain.last_block().await, Some(higher.clone()));

    node.service.accept_block(lower.clone(), ip(2)).await.unwrap();
    assert_eq!(node.chain.last_block().await, Some(lower.clone()));
    assert_eq!(node.chain.len(), 1);
    assert_eq!(node.directory.fork_count(), 1);
    // The displaced block's transaction goes back to the pool.
    assert_eq!(node.mempool.pending.lock().clone(), vec![displaced_tx]);

    // The displaced block cannot come back.
    assert!(matches!(
        node.service.accept_block(higher, ip(2)).await,
        Err(ConsensusError::WrongHeight { expected: 1, actual: 0 })
    ));
    assert_eq!(node.chain.last_block().await, Some(lower));
}

#[tokio::test(start_paused = true)]
async fn test_leader_yields_to_a_better_producers_block() {
    let network = LoopbackNetwork::new();
    let own_key = high_vrf_key("pk-l");
    let peer_key = beating_key("pk-p", &own_key);
    let peer = Address::from("0xp");
    let node = spawn_node(
        &network,
        "0xl",
        &own_key,
        ip(1),
        vec![Member::new("0xl", ip(1), own_key.clone()), Member::new(peer.clone(), ip(2), peer_key.clone())],
    );
    let service = node.service.clone();
    let height = tokio::spawn(async move { service.run_height().await });

    // The peer's proof never reached us, so we lead.
    wait_for_phase(&node.service, RoundPhase::AwaitingApproval).await;
    let better = genesis_by(&peer, &peer_key, NOW, vec![]);
    node.service.accept_block(better.clone(), ip(2)).await.unwrap();
    assert!(node.service.accept_approval(0, peer.clone(), ip(2)).unwrap());

    assert_eq!(height.await.unwrap().unwrap(), HeightOutcome::Adopted(better.clone()));
    assert_eq!(node.chain.last_block().await, Some(better));
}

// =============================================================================
// SUPERVISOR
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_loop_produces_until_shutdown() {
    let node = solo_node();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(node.service.clone().run(shutdown_rx));

    tokio::time::sleep(Duration::from_secs(10)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let blocks = node.chain.blocks();
    assert!(blocks.len() >= 2, "only {} blocks", blocks.len());
    for pair in blocks.windows(2) {
        assert_eq!(pair[1].prev_hash, pair[0].hash);
        assert_eq!(pair[1].height, pair[0].height + 1);
    }
}
