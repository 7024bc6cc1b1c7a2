//! Client configuration, populated from environment variables.

use std::time::Duration;

use candid::Principal;
use url::Url;

use crate::error::ClientError;
use crate::origin::is_local_hostname;

/// Canister id of the ledger on a default local replica.
pub const DEFAULT_CANISTER_ID: &str = "uxrrr-q7777-77774-qaaaq-cai";

/// Canister id of Internet Identity on a default local replica.
pub const DEFAULT_LOCAL_PROVIDER_ID: &str = "rdmx6-jaaaa-aaaaa-aaadq-cai";

pub const DEFAULT_NETWORK_HOST: &str = "http://127.0.0.1:4943";

const DEFAULT_LOCAL_PROVIDER_PORT: u16 = 4943;
const DEFAULT_MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_TIMES: usize = 3;

/// Runtime configuration for a Token Portal client.
///
/// Every field has a default that targets a local `dfx` replica, so a client
/// can be started with zero configuration during development.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `TPORTAL_CANISTER_ID` | `uxrrr-q7777-77774-qaaaq-cai` | Ledger canister to call |
/// | `TPORTAL_NETWORK_HOST` | `http://127.0.0.1:4943` | Replica / boundary node URL |
/// | `TPORTAL_II_CANISTER_ID` | `rdmx6-jaaaa-aaaaa-aaadq-cai` | Local identity-provider canister |
/// | `TPORTAL_II_PORT` | `4943` | Port of the local identity provider |
/// | `TPORTAL_MAX_TTL_SECS` | `604800` (7 days) | Requested credential lifetime |
/// | `TPORTAL_LOGIN_TIMEOUT_SECS` | `10` | Give up on the provider after this long |
/// | `TPORTAL_RETRY_TIMES` | `3` | Transport retries on TCP errors |
/// | `TPORTAL_FETCH_ROOT_KEY` | `true` for local hosts | Fetch the replica's root key |
/// | `TPORTAL_ALLOW_UNCERTIFIED_UPDATES` | `false` | Allow updates without a verified root key |
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// The ledger canister every actor is bound to.
    pub canister_id: Principal,

    /// Where the agent sends calls.
    pub network_host: Url,

    /// Identity-provider canister used when the page is served locally.
    pub local_provider_id: String,

    pub local_provider_port: u16,

    /// Passed to the identity provider as the requested delegation lifetime.
    /// Not enforced locally.
    pub max_time_to_live: Duration,

    pub login_timeout: Duration,

    /// Handed to the transport; the client itself never loops on a call.
    pub retry_times: usize,

    /// Fetch the root key from `network_host` instead of trusting the
    /// built-in mainnet key. Only meaningful for local replicas.
    pub fetch_root_key: bool,

    /// Let update calls through when the root-key fetch failed.
    pub allow_uncertified_updates: bool,
}

impl PortalConfig {
    /// Defaults for a local `dfx` replica.
    pub fn local() -> Self {
        Self::from_lookup(|_| None).expect("built-in defaults are valid")
    }

    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let canister_text =
            lookup("TPORTAL_CANISTER_ID").unwrap_or_else(|| DEFAULT_CANISTER_ID.into());
        let canister_id = Principal::from_text(canister_text.trim()).map_err(|e| {
            ClientError::Config(format!("TPORTAL_CANISTER_ID '{canister_text}': {e}"))
        })?;

        let host_text =
            lookup("TPORTAL_NETWORK_HOST").unwrap_or_else(|| DEFAULT_NETWORK_HOST.into());
        let network_host = Url::parse(host_text.trim())
            .map_err(|e| ClientError::Config(format!("TPORTAL_NETWORK_HOST '{host_text}': {e}")))?;

        let host_is_local = network_host
            .host_str()
            .map(is_local_hostname)
            .unwrap_or(false);

        Ok(Self {
            canister_id,
            network_host,
            local_provider_id: lookup("TPORTAL_II_CANISTER_ID")
                .unwrap_or_else(|| DEFAULT_LOCAL_PROVIDER_ID.into()),
            local_provider_port: parse_var(&lookup, "TPORTAL_II_PORT")?
                .unwrap_or(DEFAULT_LOCAL_PROVIDER_PORT),
            max_time_to_live: parse_var(&lookup, "TPORTAL_MAX_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_MAX_TTL),
            login_timeout: parse_var(&lookup, "TPORTAL_LOGIN_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LOGIN_TIMEOUT),
            retry_times: parse_var(&lookup, "TPORTAL_RETRY_TIMES")?.unwrap_or(DEFAULT_RETRY_TIMES),
            fetch_root_key: parse_var(&lookup, "TPORTAL_FETCH_ROOT_KEY")?.unwrap_or(host_is_local),
            allow_uncertified_updates: parse_var(&lookup, "TPORTAL_ALLOW_UNCERTIFIED_UPDATES")?
                .unwrap_or(false),
        })
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::local()
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ClientError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ClientError::Config(format!("{key} '{raw}': {e}"))),
    }
}
