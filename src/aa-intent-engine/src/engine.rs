use aa_intent_types::{GasQuote, Intent, NetworkPolicy, NetworkSelection, SessionContext, UnsignedOperation};
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    assembler::{assemble_call_data, JobRequest, SponsorshipDescriptor},
    auth::{generate_auth_payload, SessionCredentials},
    config::EngineConfig,
    errors::{Result, ValidationError},
    operation::{build_unsigned_operation, ensure_same_deployment, sign_operation, SignedOperation},
    paymaster::{generate_paymaster_data, Validity},
    signer::SigningKey,
};

/// Entry point for hosts: reads the network selection once per call and runs the pipeline.
#[derive(Clone, Debug, Default)]
pub struct IntentEngine {
    config: EngineConfig,
}

impl IntentEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn require_network(selection: &impl NetworkSelection) -> Result<NetworkPolicy> {
        selection
            .snapshot()
            .ok_or_else(|| ValidationError::MissingField("network").into())
    }

    /// Call data for `intent`, targeting the selected network's job manager.
    pub fn call_data(
        &self,
        intent: &Intent,
        session: &SessionContext,
        nonce: &str,
        selection: &impl NetworkSelection,
        sponsorship: &SponsorshipDescriptor,
    ) -> Result<String> {
        let network = Self::require_network(selection)?;
        assemble_call_data(
            &JobRequest {
                intent,
                session,
                nonce,
                target: &network.job_manager,
                network: Some(&network),
                sponsorship,
            },
            &self.config,
        )
    }

    /// Assemble call data, authorize the paymaster when the network sponsors gas, and fill an
    /// unsigned operation for the session's account.
    ///
    /// The session must be bound to the selected network's chain and entry point.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_operation(
        &self,
        intent: &Intent,
        session: &SessionContext,
        selection: &impl NetworkSelection,
        nonce: &str,
        gas: &GasQuote,
        client_key: &SigningKey,
        now: OffsetDateTime,
    ) -> Result<UnsignedOperation> {
        let network = Self::require_network(selection)?;
        ensure_same_deployment(session, &network)?;
        let call_data = assemble_call_data(
            &JobRequest {
                intent,
                session,
                nonce,
                target: &network.job_manager,
                network: Some(&network),
                sponsorship: &SponsorshipDescriptor::default(),
            },
            &self.config,
        )?;

        let sponsored = network.sponsorship_enabled
            && network.paymaster.as_deref().is_some_and(|p| !p.trim().is_empty());
        let paymaster_data = if sponsored {
            let validity = Validity::starting_at(now, self.config.paymaster_validity_secs)?;
            Some(generate_paymaster_data(nonce, validity, client_key)?)
        } else {
            None
        };

        let op = build_unsigned_operation(
            &call_data,
            &session.user_address,
            nonce,
            gas,
            &network,
            paymaster_data,
            &self.config,
        )?;
        debug!(
            network = %network.network_id,
            sponsored,
            kind = intent.type_tag(),
            "prepared user operation"
        );
        Ok(op)
    }

    /// Sign for the session's deployment, refusing if a selected network names another one.
    pub fn sign(
        &self,
        op: UnsignedOperation,
        session: &SessionContext,
        selection: &impl NetworkSelection,
        key: &SigningKey,
    ) -> Result<SignedOperation> {
        if let Some(network) = selection.snapshot() {
            ensure_same_deployment(session, &network)?;
        }
        sign_operation(op, session, key)
    }

    /// Fresh session credentials for a login attempt.
    pub fn authenticate(
        &self,
        session: &SessionContext,
        selection: &impl NetworkSelection,
        client_key: &SigningKey,
    ) -> Result<SessionCredentials> {
        let network = selection.snapshot();
        generate_auth_payload(session, network.as_ref(), client_key, &self.config)
    }
}
