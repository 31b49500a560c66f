//! # Multi-Node Devnet
//!
//! Three fully wired nodes on one loopback network. Validators learn about
//! each other only through signed advertisements, then elect, approve and
//! commit blocks together.

#[cfg(test)]
mod tests {
    use cc_06_mempool::MempoolApi;
    use cc_08_consensus::{ConsensusError, HeightOutcome};
    use cc_01_validator_registry::Secp256k1Signer;

    use crate::fixtures::{advertisement, client_ip, code, signed_transfer, Devnet};

    // =============================================================================
    // DISCOVERY
    // =============================================================================

    #[tokio::test]
    async fn test_advertisements_populate_every_registry() {
        let devnet = Devnet::new(3);
        devnet.introduce().await;

        let mut expected = devnet.addresses();
        expected.sort();
        for node in &devnet.nodes {
            let casting = node.container.registry.registry().casting_set();
            assert_eq!(casting, expected);
            for other in &devnet.nodes {
                assert_eq!(
                    node.container.registry.registry().ip_of(&other.address()),
                    Some(other.ip)
                );
            }
        }
    }

    #[tokio::test]
    async fn test_gossip_spreads_one_nodes_list_to_its_peers() {
        let devnet = Devnet::new(3);
        let seed = &devnet.nodes[0];
        let list: Vec<_> = devnet
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| advertisement(&node.signer, node.ip, &format!("node-{}", i)))
            .collect();
        seed.deliver(code::VALIDATOR_LIST, &serde_json::to_vec(&list).unwrap(), client_ip())
            .await
            .unwrap();
        for node in &devnet.nodes[1..] {
            assert!(node.container.registry.registry().is_empty());
        }

        let delivered = seed
            .container
            .registry
            .gossip_once(seed.container.gossip.as_ref(), &seed.address())
            .await;
        assert_eq!(delivered, 2);

        let mut expected = devnet.addresses();
        expected.sort();
        for node in &devnet.nodes {
            assert_eq!(node.container.registry.registry().casting_set(), expected);
        }
    }

    // =============================================================================
    // AGREEMENT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_three_nodes_commit_the_same_genesis() {
        let devnet = Devnet::new(3);
        devnet.introduce().await;
        let [a, b, c] = &devnet.nodes[..] else {
            unreachable!()
        };

        let (out_a, out_b, out_c) = tokio::join!(
            a.container.consensus.run_height(),
            b.container.consensus.run_height(),
            c.container.consensus.run_height(),
        );
        let outcomes = [out_a.unwrap(), out_b.unwrap(), out_c.unwrap()];
        for outcome in &outcomes {
            assert!(outcome.is_committed(), "{:?}", outcome);
        }
        let produced = outcomes
            .iter()
            .filter(|o| matches!(o, HeightOutcome::Produced(_)))
            .count();
        assert_eq!(produced, 1);

        let tips: Vec<_> = devnet
            .nodes
            .iter()
            .map(|n| n.container.chain.blocks())
            .collect();
        assert_eq!(tips[0].len(), 1);
        assert_eq!(tips[0], tips[1]);
        assert_eq!(tips[1], tips[2]);
        assert!(devnet.addresses().contains(&tips[0][0].validator));
        assert!(tips[0][0].is_hash_consistent());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gossiped_transaction_is_committed_once_everywhere() {
        let devnet = Devnet::new(3);
        devnet.introduce().await;

        let wallet = Secp256k1Signer::random();
        let tx = signed_transfer(&wallet, 0, 40);
        let payload = serde_json::to_vec(&tx).unwrap();
        for node in &devnet.nodes {
            node.deliver(code::TRANSACTION, &payload, client_ip())
                .await
                .unwrap();
            assert_eq!(node.container.mempool.status().count, 1);
        }

        let [a, b, c] = &devnet.nodes[..] else {
            unreachable!()
        };
        let (out_a, out_b, out_c) = tokio::join!(
            a.container.consensus.run_height(),
            b.container.consensus.run_height(),
            c.container.consensus.run_height(),
        );
        assert!(out_a.unwrap().is_committed());
        assert!(out_b.unwrap().is_committed());
        assert!(out_c.unwrap().is_committed());

        for node in &devnet.nodes {
            let blocks = node.container.chain.blocks();
            let hits: usize = blocks
                .iter()
                .map(|b| b.transactions.iter().filter(|t| t.hash == tx.hash).count())
                .sum();
            assert_eq!(hits, 1);
            assert_eq!(node.container.mempool.status().count, 0);
        }

        // Replaying the mined transaction is refused.
        let replay = devnet.nodes[0]
            .deliver(code::TRANSACTION, &payload, client_ip())
            .await;
        assert!(matches!(replay, Err(ConsensusError::Mempool(_))));
    }
}
