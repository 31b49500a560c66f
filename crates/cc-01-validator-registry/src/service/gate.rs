//! # Authentication Gate
//!
//! Every validator advertisement passes through here before it can touch
//! the registry. Checks run cheapest first:
//!
//! 1. Source IP penalty status (banned / rate limited)
//! 2. Field length caps
//! 3. IP parse, key-to-address derivation, message binding
//! 4. Signature verification
//! 5. Timestamp window
//! 6. Address block-list
//! 7. Account lookup (the only async, expensive step)
//!
//! The remote only ever sees [`AuthError`]'s generic message; the cause is
//! logged here and the source IP is charged a failure.

use std::net::IpAddr;
use std::sync::Arc;

use shared_types::{AddressBlockList, SignatureVerifier, Timestamp, ValidatorAdvertisement};

use crate::domain::{
    AuthError, AuthFailureCause, AuthFailureTracker, FieldLimits, PenaltyStatus,
    VerifiedAdvertisement,
};
use crate::ports::AccountLookup;

pub struct AuthenticationGate {
    verifier: Arc<dyn SignatureVerifier>,
    block_list: Arc<dyn AddressBlockList>,
    accounts: Arc<dyn AccountLookup>,
    tracker: Arc<AuthFailureTracker>,
    limits: FieldLimits,
    max_skew_secs: i64,
}

impl AuthenticationGate {
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        block_list: Arc<dyn AddressBlockList>,
        accounts: Arc<dyn AccountLookup>,
        tracker: Arc<AuthFailureTracker>,
        limits: FieldLimits,
        max_skew_secs: i64,
    ) -> Self {
        Self {
            verifier,
            block_list,
            accounts,
            tracker,
            limits,
            max_skew_secs,
        }
    }

    pub fn tracker(&self) -> &Arc<AuthFailureTracker> {
        &self.tracker
    }

    /// Authenticate one advertisement received from `source`.
    pub async fn authenticate(
        &self,
        adv: &ValidatorAdvertisement,
        source: IpAddr,
        now: Timestamp,
    ) -> Result<VerifiedAdvertisement, AuthError> {
        match self.tracker.admit(source, now) {
            PenaltyStatus::Clear => {}
            PenaltyStatus::RateLimited => {
                return Err(self.reject(source, now, AuthFailureCause::RateLimited, false));
            }
            PenaltyStatus::Banned { .. } => {
                return Err(self.reject(source, now, AuthFailureCause::Banned, false));
            }
        }

        match self.check(adv, now).await {
            Ok(verified) => Ok(verified),
            Err(cause) => Err(self.reject(source, now, cause, true)),
        }
    }

    async fn check(
        &self,
        adv: &ValidatorAdvertisement,
        now: Timestamp,
    ) -> Result<VerifiedAdvertisement, AuthFailureCause> {
        self.check_field_lengths(adv)?;

        let ip_address: IpAddr = adv
            .ip_address
            .parse()
            .map_err(|_| AuthFailureCause::InvalidIp)?;

        let address = self
            .verifier
            .derive_address(&adv.public_key)
            .filter(|derived| derived.as_str().eq_ignore_ascii_case(&adv.address))
            .ok_or(AuthFailureCause::KeyAddressMismatch)?;

        if adv.signature_message != adv.expected_message() {
            return Err(AuthFailureCause::MessageMismatch);
        }

        if !self
            .verifier
            .verify(&address, adv.signature_message.as_bytes(), &adv.signature)
        {
            return Err(AuthFailureCause::BadSignature);
        }

        if (now - adv.timestamp).abs() > self.max_skew_secs {
            return Err(AuthFailureCause::StaleAdvertisement);
        }

        if self.block_list.is_blocked(&address) {
            return Err(AuthFailureCause::Blocked);
        }

        if !self.accounts.is_known_account(&address).await {
            return Err(AuthFailureCause::UnknownAccount);
        }

        Ok(VerifiedAdvertisement {
            address,
            ip_address,
            public_key: adv.public_key.clone(),
            signature: adv.signature.clone(),
            signature_message: adv.signature_message.clone(),
            unique_name: adv.unique_name.clone(),
            nonce: adv.nonce.clone(),
            timestamp: adv.timestamp,
        })
    }

    fn check_field_lengths(&self, adv: &ValidatorAdvertisement) -> Result<(), AuthFailureCause> {
        let fields = [
            ("address", adv.address.len(), self.limits.address),
            ("public_key", adv.public_key.len(), self.limits.public_key),
            ("signature", adv.signature.len(), self.limits.signature),
            (
                "signature_message",
                adv.signature_message.len(),
                self.limits.signature_message,
            ),
            ("ip_address", adv.ip_address.len(), self.limits.ip_address),
            ("nonce", adv.nonce.len(), self.limits.nonce),
            ("unique_name", adv.unique_name.len(), self.limits.unique_name),
        ];
        for (field, len, limit) in fields {
            if len > limit {
                return Err(AuthFailureCause::FieldTooLong { field, len, limit });
            }
        }
        Ok(())
    }

    fn reject(
        &self,
        source: IpAddr,
        now: Timestamp,
        cause: AuthFailureCause,
        charge: bool,
    ) -> AuthError {
        tracing::debug!(peer_ip = %source, reason = %cause, "Authentication rejected");
        cc_telemetry::AUTH_FAILURES.inc();
        if charge {
            self.tracker.record_failure(source, now);
        }
        AuthError::new(cause)
    }
}
