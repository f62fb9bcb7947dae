//! Session authentication payload.
//!
//! Each login attempt gets a fresh session key. The payload binds that key's address to the client
//! (client signature) and proves possession of it (session signature); both sign the same hash,
//! `keccak256(leftpad32(sessionAddress))`.

use aa_intent_types::{NetworkPolicy, SessionContext};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    config::EngineConfig,
    errors::Result,
    hash::keccak256,
    paymaster::{generate_paymaster_data, Validity},
    signer::{sign_hex, SigningKey},
    utils::bytes::{left_pad, normalize_address, to_hex},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub nonce: String,
    pub client_id: String,
    pub session_public_key: String,
    pub max_fee_per_gas: String,
    pub max_priority_fee_per_gas: String,
    pub paymaster_address: Option<String>,
    pub paymaster_data: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    /// `0x` hex of the 32-byte left-padded session address.
    pub auth_data: String,
    pub session_data: SessionData,
    pub client_signature: String,
    pub user_signature: String,
}

/// Payload for the authentication transport plus the session key that later operations are
/// signed with.
#[derive(Debug)]
pub struct SessionCredentials {
    pub payload: AuthPayload,
    pub session_key: SigningKey,
}

/// Build a payload with OS entropy and the current time.
pub fn generate_auth_payload(
    session: &SessionContext,
    network: Option<&NetworkPolicy>,
    client_key: &SigningKey,
    config: &EngineConfig,
) -> Result<SessionCredentials> {
    generate_auth_payload_with(
        &mut OsRng,
        OffsetDateTime::now_utc(),
        session,
        network,
        client_key,
        config,
    )
}

/// Same as [`generate_auth_payload`] with an injected RNG and clock.
pub fn generate_auth_payload_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    now: OffsetDateTime,
    session: &SessionContext,
    network: Option<&NetworkPolicy>,
    client_key: &SigningKey,
    config: &EngineConfig,
) -> Result<SessionCredentials> {
    let session_key = SigningKey::random(rng);
    let mut nonce = [0u8; 32];
    rng.fill_bytes(&mut nonce);
    let nonce = to_hex(&nonce);

    let validity = Validity::starting_at(now, config.paymaster_validity_secs)?;
    let paymaster_data = generate_paymaster_data(&nonce, validity, client_key)?;
    let paymaster_address = network
        .and_then(|n| n.paymaster.as_deref())
        .filter(|p| !p.trim().is_empty())
        .map(|p| normalize_address(p, "paymaster"))
        .transpose()?;

    let auth_data = left_pad::<32>(&session_key.address(), "sessionAddress")?;
    let digest = keccak256(auth_data);
    let client_signature = sign_hex(digest.as_slice(), client_key)?;
    let user_signature = sign_hex(digest.as_slice(), &session_key)?;

    debug!(
        session = %session_key.address_hex(),
        client_id = %session.client_id,
        valid_until = validity.valid_until,
        "generated session auth payload"
    );

    Ok(SessionCredentials {
        payload: AuthPayload {
            auth_data: to_hex(&auth_data),
            session_data: SessionData {
                nonce,
                client_id: session.client_id.clone(),
                session_public_key: session_key.public_key_hex(),
                max_fee_per_gas: config.session_max_fee_per_gas.clone(),
                max_priority_fee_per_gas: config.session_max_priority_fee_per_gas.clone(),
                paymaster_address,
                paymaster_data,
            },
            client_signature,
            user_signature,
        },
        session_key,
    })
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use time::macros::datetime;

    use super::*;
    use crate::utils::{bytes::parse_hex_bytes, crypto::recover_address};

    fn session() -> SessionContext {
        SessionContext {
            user_address: "0x1111111111111111111111111111111111111111".into(),
            client_id: "client-123".into(),
            entry_point_address: "0x0000000071727De22E5E9d8BAf0edAc6f37da032".into(),
            chain_id: 80002,
        }
    }

    fn client() -> SigningKey {
        SigningKey::from_hex("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap()
    }

    fn generate(seed: u64) -> SessionCredentials {
        generate_auth_payload_with(
            &mut StdRng::seed_from_u64(seed),
            datetime!(2024-01-01 00:00 UTC),
            &session(),
            None,
            &client(),
            &EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_both_signatures_cover_session_address() {
        let creds = generate(1);
        let auth_data = parse_hex_bytes(&creds.payload.auth_data, "authData").unwrap();
        assert_eq!(&auth_data[..12], &[0u8; 12]);
        assert_eq!(&auth_data[12..], &creds.session_key.address());

        let digest = keccak256(&auth_data);
        let client_sig = parse_hex_bytes(&creds.payload.client_signature, "sig").unwrap();
        let user_sig = parse_hex_bytes(&creds.payload.user_signature, "sig").unwrap();
        assert_eq!(recover_address(digest.as_slice(), &client_sig).unwrap(), client().address());
        assert_eq!(
            recover_address(digest.as_slice(), &user_sig).unwrap(),
            creds.session_key.address()
        );
    }

    #[test]
    fn test_session_data_fields() {
        let creds = generate(2);
        let data = &creds.payload.session_data;
        assert_eq!(data.client_id, "client-123");
        assert_eq!(data.session_public_key, creds.session_key.public_key_hex());
        assert_eq!(data.max_fee_per_gas, EngineConfig::default().session_max_fee_per_gas);
        assert_eq!(data.paymaster_address, None);

        // Six-hour window starting at the injected clock.
        let blob = parse_hex_bytes(&data.paymaster_data, "paymasterData").unwrap();
        let until = u64::from_be_bytes(blob[56..64].try_into().unwrap());
        assert_eq!(until, 1_704_067_200 + 6 * 60 * 60);
    }

    #[test]
    fn test_fresh_session_key_per_attempt() {
        let a = generate(3);
        let b = generate(4);
        assert_ne!(a.session_key.address(), b.session_key.address());
        assert_ne!(a.payload.session_data.nonce, b.payload.session_data.nonce);

        let again = generate(3);
        assert_eq!(a.payload, again.payload);
    }

    #[test]
    fn test_paymaster_address_from_network() {
        let network = NetworkPolicy {
            network_id: "polygon-amoy".into(),
            chain_id: 80002,
            gsn_enabled: false,
            sponsorship_enabled: true,
            entry_point: "0x0000000071727De22E5E9d8BAf0edAc6f37da032".into(),
            paymaster: Some("0x5555555555555555555555555555555555555555".into()),
            job_manager: "0x6666666666666666666666666666666666666666".into(),
        };
        let creds = generate_auth_payload_with(
            &mut StdRng::seed_from_u64(5),
            datetime!(2024-01-01 00:00 UTC),
            &session(),
            Some(&network),
            &client(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(
            creds.payload.session_data.paymaster_address.as_deref(),
            Some("0x5555555555555555555555555555555555555555")
        );
        let json = serde_json::to_value(&creds.payload).unwrap();
        assert!(json["sessionData"]["sessionPublicKey"].as_str().unwrap().starts_with("0x04"));
        assert!(json.get("authData").is_some());
    }
}
