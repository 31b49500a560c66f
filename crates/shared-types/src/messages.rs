//! # Inbound Messages
//!
//! Every peer payload arrives as `(code, bytes)`. It is bounded, decoded once
//! into [`InboundMessage`] and from then on matched exhaustively.

use crate::entities::{Address, Block, Height, Proof, Timestamp, Transaction};
use crate::errors::PayloadError;
use crate::payload::PayloadLimits;
use serde::{Deserialize, Serialize};

/// Wire codes for inbound payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCode {
    IpReport,
    ProofVote,
    ValidatorList,
    FailedProducerReport,
    ConfirmedBlock,
    Transaction,
    FailureNotice,
}

impl MessageCode {
    pub fn parse(code: &str) -> Result<Self, PayloadError> {
        match code {
            "1" => Ok(Self::IpReport),
            "2" => Ok(Self::ProofVote),
            "3" => Ok(Self::ValidatorList),
            "4" => Ok(Self::FailedProducerReport),
            "7" => Ok(Self::ConfirmedBlock),
            "7777" => Ok(Self::Transaction),
            "9999" => Ok(Self::FailureNotice),
            other => Err(PayloadError::UnknownCode(other.chars().take(16).collect())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpReport => "1",
            Self::ProofVote => "2",
            Self::ValidatorList => "3",
            Self::FailedProducerReport => "4",
            Self::ConfirmedBlock => "7",
            Self::Transaction => "7777",
            Self::FailureNotice => "9999",
        }
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// A peer telling us which IP it sees for an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpReport {
    pub address: Address,
    pub ip_address: String,
}

/// A peer's locally computed winner for a height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerClaim {
    pub voter: Address,
    pub height: Height,
    pub winner: Proof,
}

/// Code `"2"` carries either a raw proof or a winner claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProofVote {
    Proof(Proof),
    Claim(WinnerClaim),
}

/// A signed self-advertisement from a validator.
///
/// Fields arrive as raw strings so length caps can be applied before any
/// of them is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorAdvertisement {
    pub address: String,
    pub ip_address: String,
    pub public_key: String,
    pub signature: String,
    pub signature_message: String,
    pub unique_name: String,
    pub nonce: String,
    pub timestamp: Timestamp,
}

impl ValidatorAdvertisement {
    /// The message a validator signs when advertising itself.
    pub fn canonical_message(
        address: &str,
        ip_address: &str,
        unique_name: &str,
        nonce: &str,
        timestamp: Timestamp,
    ) -> String {
        format!("{address}|{ip_address}|{unique_name}|{nonce}|{timestamp}")
    }

    pub fn expected_message(&self) -> String {
        Self::canonical_message(
            &self.address,
            &self.ip_address,
            &self.unique_name,
            &self.nonce,
            self.timestamp,
        )
    }
}

/// A peer reporting that a producer failed to deliver its block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedProducerReport {
    pub reporter: Address,
    pub producer: Address,
    pub height: Height,
}

/// A peer signalling it could not process something we sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    pub reason: String,
}

// =============================================================================
// CLOSED MESSAGE ENUM
// =============================================================================

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    IpReport(IpReport),
    ProofVote(ProofVote),
    ValidatorList(Vec<ValidatorAdvertisement>),
    FailedProducerReport(FailedProducerReport),
    ConfirmedBlock(Box<Block>),
    Transaction(Box<Transaction>),
    FailureNotice(FailureNotice),
}

impl InboundMessage {
    /// Bound and decode a raw payload for the given wire code.
    pub fn decode(code: &str, payload: &[u8], limits: &PayloadLimits) -> Result<Self, PayloadError> {
        let code = MessageCode::parse(code)?;
        let json = limits.max_json_bytes;
        Ok(match code {
            MessageCode::IpReport => Self::IpReport(limits.decode(payload, json)?),
            MessageCode::ProofVote => Self::ProofVote(limits.decode(payload, json)?),
            MessageCode::ValidatorList => Self::ValidatorList(limits.decode(payload, json)?),
            MessageCode::FailedProducerReport => {
                Self::FailedProducerReport(limits.decode(payload, json)?)
            }
            MessageCode::ConfirmedBlock => {
                Self::ConfirmedBlock(Box::new(limits.decode(payload, limits.max_block_bytes)?))
            }
            MessageCode::Transaction => Self::Transaction(Box::new(
                limits.decode(payload, limits.max_transaction_bytes)?,
            )),
            MessageCode::FailureNotice => Self::FailureNotice(limits.decode(payload, json)?),
        })
    }

    pub fn code(&self) -> MessageCode {
        match self {
            Self::IpReport(_) => MessageCode::IpReport,
            Self::ProofVote(_) => MessageCode::ProofVote,
            Self::ValidatorList(_) => MessageCode::ValidatorList,
            Self::FailedProducerReport(_) => MessageCode::FailedProducerReport,
            Self::ConfirmedBlock(_) => MessageCode::ConfirmedBlock,
            Self::Transaction(_) => MessageCode::Transaction,
            Self::FailureNotice(_) => MessageCode::FailureNotice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_code_rejected() {
        let err = InboundMessage::decode("42", b"{}", &PayloadLimits::default()).unwrap_err();
        assert_eq!(err, PayloadError::UnknownCode("42".into()));
    }

    #[test]
    fn test_decode_failure_notice() {
        let msg = InboundMessage::decode("9999", br#"{"reason":"busy"}"#, &PayloadLimits::default())
            .unwrap();
        assert_eq!(
            msg,
            InboundMessage::FailureNotice(FailureNotice {
                reason: "busy".into()
            })
        );
        assert_eq!(msg.code().as_str(), "9999");
    }

    #[test]
    fn test_decode_proof_vote_proof() {
        let json = br#"{"type":"proof","data":{"address":"v1","public_key":"pk","block_height":7,
            "previous_block_hash":"ab","proof_hash":"h","vrf_number":9,"ip_address":"10.0.0.1"}}"#;
        let msg = InboundMessage::decode("2", json, &PayloadLimits::default()).unwrap();
        match msg {
            InboundMessage::ProofVote(ProofVote::Proof(p)) => {
                assert_eq!(p.block_height, 7);
                assert_eq!(p.address, Address::from("v1"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_transaction_cap_applies_to_code_7777() {
        let limits = PayloadLimits {
            max_transaction_bytes: 8,
            ..PayloadLimits::default()
        };
        let err = InboundMessage::decode("7777", br#"{"hash":"0123456789"}"#, &limits).unwrap_err();
        assert!(matches!(err, PayloadError::TooLarge { limit: 8, .. }));
    }

    #[test]
    fn test_advertisement_expected_message() {
        let adv = ValidatorAdvertisement {
            address: "a".into(),
            ip_address: "1.2.3.4".into(),
            public_key: "pk".into(),
            signature: "s".into(),
            signature_message: String::new(),
            unique_name: "node".into(),
            nonce: "n1".into(),
            timestamp: 5,
        };
        assert_eq!(adv.expected_message(), "a|1.2.3.4|node|n1|5");
    }
}
