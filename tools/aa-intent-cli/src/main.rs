use std::{
    fs,
    path::{Path, PathBuf},
};

use aa_intent_engine::{
    abi::selector_of_signature,
    hasher::user_operation_hash_hex,
    paymaster::generate_paymaster_data,
    utils::bytes::to_hex,
    EngineConfig, IntentEngine, SigningKey, Validity,
};
use aa_intent_types::{GasQuote, Intent, NetworkPolicy, SessionContext, UnsignedOperation};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Offline driver for the intent engine: reads JSON inputs, prints JSON results.
///
/// Nothing here talks to a node; nonces and gas quotes come from the caller.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Engine configuration (JSON, camelCase keys). Missing keys keep their defaults.
    #[arg(long, global = true, env = "ENGINE_CONFIG")]
    config: Option<PathBuf>,

    /// Client private key (hex string, 0x...). Used for paymaster data and session auth.
    #[arg(long, global = true, env = "CLIENT_PRIVATE_KEY", hide_env_values = true)]
    client_key: Option<String>,

    /// Write the result to this file instead of stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 4-byte selector of a canonical signature, eg `transfer(address,uint256)`.
    Selector { signature: String },

    /// Assemble call data for an intent against the context's network.
    CallData {
        #[arg(long)]
        intent: PathBuf,
        #[arg(long)]
        context: PathBuf,
        #[arg(long)]
        nonce: String,
    },

    /// Build an unsigned operation (call data, paymaster data, gas) for an intent.
    Prepare {
        #[arg(long)]
        intent: PathBuf,
        #[arg(long)]
        context: PathBuf,
        #[arg(long)]
        nonce: String,
    },

    /// Signing hash of an unsigned operation.
    OpHash {
        #[arg(long)]
        op: PathBuf,
        #[arg(long)]
        context: PathBuf,
    },

    /// Hash and sign an unsigned operation.
    SignOp {
        #[arg(long)]
        op: PathBuf,
        #[arg(long)]
        context: PathBuf,
        /// Session key to sign with; defaults to the client key.
        #[arg(long, env = "SESSION_PRIVATE_KEY", hide_env_values = true)]
        session_key: Option<String>,
    },

    /// Signed paymaster authorization blob.
    PaymasterData {
        #[arg(long)]
        nonce: String,
        /// Unix seconds.
        #[arg(long)]
        valid_until: u64,
        /// Unix seconds; defaults to 0.
        #[arg(long, default_value_t = 0)]
        valid_after: u64,
    },

    /// Fresh session key plus the signed login payload.
    AuthPayload {
        #[arg(long)]
        context: PathBuf,
    },
}

/// Everything the host would normally supply at the call boundary.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CallContext {
    session: SessionContext,
    #[serde(default)]
    network: Option<NetworkPolicy>,
    #[serde(default)]
    gas: Option<GasQuote>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => read_json::<EngineConfig>(path)?,
        None => EngineConfig::default(),
    };
    let engine = IntentEngine::new(config);

    let result = run(&cli, &engine)?;
    match &cli.out {
        Some(path) => {
            write_json_atomic(path, &result)?;
            info!(path = %path.display(), "wrote result");
        }
        None => println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed serialising result")?
        ),
    }
    Ok(())
}

fn run(cli: &Cli, engine: &IntentEngine) -> Result<Value> {
    match &cli.command {
        Command::Selector { signature } => {
            let sel = selector_of_signature(signature)?;
            Ok(json!({ "signature": signature, "selector": to_hex(&sel) }))
        }
        Command::CallData {
            intent,
            context,
            nonce,
        } => {
            let intent: Intent = read_json(intent)?;
            let ctx: CallContext = read_json(context)?;
            let call_data = engine.call_data(
                &intent,
                &ctx.session,
                nonce,
                &ctx.network,
                &Default::default(),
            )?;
            Ok(json!({ "type": intent.type_tag(), "callData": call_data }))
        }
        Command::Prepare {
            intent,
            context,
            nonce,
        } => {
            let intent: Intent = read_json(intent)?;
            let ctx: CallContext = read_json(context)?;
            let gas = ctx
                .gas
                .as_ref()
                .ok_or_else(|| anyhow!("context is missing `gas` (maxFeePerGas, maxPriorityFeePerGas)"))?;
            let client = client_key(cli)?;
            let op = engine.prepare_operation(
                &intent,
                &ctx.session,
                &ctx.network,
                nonce,
                gas,
                &client,
                OffsetDateTime::now_utc(),
            )?;
            Ok(serde_json::to_value(op)?)
        }
        Command::OpHash { op, context } => {
            let op: UnsignedOperation = read_json(op)?;
            let ctx: CallContext = read_json(context)?;
            let hash = user_operation_hash_hex(
                &op,
                &ctx.session.entry_point_address,
                ctx.session.chain_id,
            )?;
            Ok(json!({ "opHash": hash }))
        }
        Command::SignOp {
            op,
            context,
            session_key,
        } => {
            let op: UnsignedOperation = read_json(op)?;
            let ctx: CallContext = read_json(context)?;
            let key = match session_key {
                Some(hex) => SigningKey::from_hex(hex).context("invalid --session-key")?,
                None => client_key(cli)?,
            };
            let signed = engine.sign(op, &ctx.session, &ctx.network, &key)?;
            Ok(json!({ "opHash": signed.op_hash_hex(), "userOperation": signed }))
        }
        Command::PaymasterData {
            nonce,
            valid_until,
            valid_after,
        } => {
            let client = client_key(cli)?;
            let validity = Validity {
                valid_until: *valid_until,
                valid_after: *valid_after,
            };
            let data = generate_paymaster_data(nonce, validity, &client)?;
            Ok(json!({
                "client": client.address_hex(),
                "validUntil": valid_until,
                "validAfter": valid_after,
                "paymasterData": data,
            }))
        }
        Command::AuthPayload { context } => {
            let ctx: CallContext = read_json(context)?;
            let client = client_key(cli)?;
            let creds = engine.authenticate(&ctx.session, &ctx.network, &client)?;
            let generated_at = OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_else(|_| "unknown".to_string());
            Ok(json!({
                "payload": creds.payload,
                "sessionAddress": creds.session_key.address_hex(),
                "sessionKey": creds.session_key.to_hex(),
                "generatedAt": generated_at,
            }))
        }
    }
}

fn client_key(cli: &Cli) -> Result<SigningKey> {
    let hex = cli
        .client_key
        .as_deref()
        .ok_or_else(|| anyhow!("missing client key: provide --client-key (or set CLIENT_PRIVATE_KEY)"))?;
    SigningKey::from_hex(hex).context("invalid client key")
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed parsing JSON in {}", path.display()))
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising result")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
