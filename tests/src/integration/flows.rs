//! # Cross-Crate Flows
//!
//! Registry authentication, peer reports and block catch-up, each driven
//! through the wire handler of a wired node.

#[cfg(test)]
mod tests {
    use cc_08_consensus::{ConsensusApi, ConsensusError, HeightOutcome};
    use shared_types::{FailedProducerReport, IpReport};

    use crate::fixtures::{advertisement, client_ip, code, node_ip, Devnet};

    // =============================================================================
    // AUTHENTICATION PENALTIES
    // =============================================================================

    #[tokio::test]
    async fn test_forged_advertisements_ban_the_relay() {
        let devnet = Devnet::with_config(1, |config| {
            config.auth.rate_limit_after = 3;
            config.auth.ban_after = 3;
        });
        let node = &devnet.nodes[0];
        let relay = node_ip(42);

        let forged: Vec<_> = (0..3)
            .map(|i| {
                let mut adv = advertisement(&node.signer, node.ip, "honest");
                adv.unique_name = format!("forged-{}", i);
                adv
            })
            .collect();
        node.deliver(code::VALIDATOR_LIST, &serde_json::to_vec(&forged).unwrap(), relay)
            .await
            .unwrap();

        assert!(node.container.registry.registry().is_empty());
        assert!(node.container.registry.is_banned(relay));
        let dropped = node.deliver(code::TRANSACTION, b"not even json", relay).await;
        assert!(matches!(dropped, Err(ConsensusError::SourceBanned(ip)) if ip == relay));

        // Other sources are unaffected.
        let genuine = vec![advertisement(&node.signer, node.ip, "honest")];
        node.deliver(code::VALIDATOR_LIST, &serde_json::to_vec(&genuine).unwrap(), client_ip())
            .await
            .unwrap();
        assert_eq!(node.container.registry.registry().len(), 1);
    }

    // =============================================================================
    // PEER REPORTS
    // =============================================================================

    #[tokio::test]
    async fn test_ip_report_needs_a_known_validator() {
        let devnet = Devnet::new(2);
        devnet.introduce().await;
        let node = &devnet.nodes[0];
        let peer = &devnet.nodes[1];

        let known = IpReport {
            address: peer.address(),
            ip_address: peer.ip.to_string(),
        };
        node.deliver(code::IP_REPORT, &serde_json::to_vec(&known).unwrap(), client_ip())
            .await
            .unwrap();

        let unknown = IpReport {
            address: shared_types::Address::from("0x00000000000000000000000000000000000000aa"),
            ip_address: "10.9.9.9".into(),
        };
        let result = node
            .deliver(code::IP_REPORT, &serde_json::to_vec(&unknown).unwrap(), client_ip())
            .await;
        assert!(matches!(result, Err(ConsensusError::Registry(_))));
    }

    #[tokio::test]
    async fn test_failed_producer_report_is_advisory() {
        let devnet = Devnet::new(2);
        devnet.introduce().await;
        let node = &devnet.nodes[0];
        let report = FailedProducerReport {
            reporter: devnet.nodes[1].address(),
            producer: node.address(),
            height: 3,
        };
        node.deliver(code::FAILED_PRODUCER, &serde_json::to_vec(&report).unwrap(), devnet.nodes[1].ip)
            .await
            .unwrap();
        assert!(node.container.consensus.excluded_producers().is_empty());
    }

    // =============================================================================
    // CATCH-UP
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_lagging_node_catches_up_from_confirmed_blocks() {
        // No node is introduced, so the producer and the stranger run alone.
        let devnet = Devnet::new(3);
        let producer = &devnet.nodes[0];
        let lagging = &devnet.nodes[1];
        let stranger = &devnet.nodes[2];

        let mut produced = Vec::new();
        for _ in 0..2 {
            match producer.container.consensus.run_height().await.unwrap() {
                HeightOutcome::Produced(block) => produced.push(block),
                other => panic!("solo producer should produce, got {:?}", other),
            }
        }
        let HeightOutcome::Produced(foreign) = stranger.container.consensus.run_height().await.unwrap() else {
            panic!("solo stranger should produce");
        };

        // The lagging node learns the producer, and only the producer.
        let list = vec![advertisement(&producer.signer, producer.ip, "producer")];
        lagging
            .deliver(code::VALIDATOR_LIST, &serde_json::to_vec(&list).unwrap(), client_ip())
            .await
            .unwrap();

        let refused = lagging
            .deliver(code::CONFIRMED_BLOCK, &serde_json::to_vec(&foreign).unwrap(), stranger.ip)
            .await;
        assert!(matches!(refused, Err(ConsensusError::UnknownCaster(_))), "{:?}", refused);
        assert!(lagging.container.chain.is_empty());

        for block in &produced {
            let payload = serde_json::to_vec(block).unwrap();
            lagging
                .deliver(code::CONFIRMED_BLOCK, &payload, producer.ip)
                .await
                .unwrap();
        }
        assert_eq!(lagging.container.chain.blocks(), producer.container.chain.blocks());

        let stale = serde_json::to_vec(&produced[0]).unwrap();
        let result = lagging.deliver(code::CONFIRMED_BLOCK, &stale, producer.ip).await;
        assert!(matches!(result, Err(ConsensusError::WrongHeight { expected: 2, actual: 0 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_block_from_wrong_address_is_refused() {
        let devnet = Devnet::new(2);
        let producer = &devnet.nodes[0];
        let lagging = &devnet.nodes[1];
        let HeightOutcome::Produced(genesis) = producer.container.consensus.run_height().await.unwrap() else {
            panic!("solo producer should produce");
        };
        let list = vec![advertisement(&producer.signer, producer.ip, "producer")];
        lagging
            .deliver(code::VALIDATOR_LIST, &serde_json::to_vec(&list).unwrap(), client_ip())
            .await
            .unwrap();

        let relayed = lagging
            .deliver(code::CONFIRMED_BLOCK, &serde_json::to_vec(&genesis).unwrap(), client_ip())
            .await;
        assert!(matches!(relayed, Err(ConsensusError::SourceMismatch { .. })), "{:?}", relayed);
        assert!(lagging.container.chain.is_empty());
    }
}
