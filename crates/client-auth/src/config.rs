//! Configuration for the private_key_jwt authenticator.
//!
//! [`ValidationPolicy`] is built once per authenticator from a flat property
//! bag and is immutable afterwards. Malformed values never fail startup: the
//! offending property is logged at `warn` and its documented default is used.
//!
//! [`ServiceConfig`] carries the extra settings the standalone binary needs.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::{BTreeSet, HashMap};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Property names
// ============================================================================

pub const TOKEN_ENDPOINT_ALIAS: &str = "TokenEndpointAlias";
pub const BACKCHANNEL_ENDPOINT_ALIAS: &str = "BackchannelEndpointAlias";
pub const PREVENT_TOKEN_REUSE: &str = "PreventTokenReuse";
pub const REJECT_BEFORE_IN_MINUTES: &str = "RejectBeforeInMinutes";
pub const ENABLE_CACHE_FOR_JTI: &str = "EnableCacheForJTI";
pub const VALID_AUDIENCES: &str = "ValidAudiences";
pub const VALID_ISSUER: &str = "ValidIssuer";
pub const MANDATORY_CLAIMS: &str = "MandatoryClaims";
pub const CLOCK_SKEW_SECONDS: &str = "ClockSkewSeconds";

// ============================================================================
// Defaults
// ============================================================================

/// Default expected audience: the token endpoint identifier.
pub const DEFAULT_TOKEN_ENDPOINT_ALIAS: &str = "https://localhost:9443/oauth2/token";

/// Default expected audience for backchannel (CIBA) authentication requests.
pub const DEFAULT_BACKCHANNEL_ENDPOINT_ALIAS: &str = "https://localhost:9443/oauth2/ciba";

pub const DEFAULT_PREVENT_TOKEN_REUSE: bool = true;

pub const DEFAULT_ENABLE_JTI_CACHE: bool = true;

/// Default maximum age of an assertion, measured from its issuance claim.
pub const DEFAULT_REJECT_BEFORE_MINUTES: u32 = 15;

pub const DEFAULT_MANDATORY_CLAIMS: [&str; 5] = ["iss", "sub", "aud", "exp", "jti"];

/// Default bind address for the standalone service.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8090";

/// Default interval between replay cache purges.
pub const DEFAULT_REPLAY_PURGE_INTERVAL_SECONDS: u64 = 60;

// ============================================================================
// Audience
// ============================================================================

/// Audience values an assertion may be addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Audience {
    /// Nothing configured; the token endpoint alias is expected.
    #[default]
    None,
    Single(String),
    Multiple(BTreeSet<String>),
}

impl Audience {
    fn from_list(values: &str) -> Self {
        let mut set: BTreeSet<String> = values
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();

        match set.len() {
            0 => Audience::None,
            1 => set.pop_first().map_or(Audience::None, Audience::Single),
            _ => Audience::Multiple(set),
        }
    }
}

// ============================================================================
// ValidationPolicy
// ============================================================================

/// Immutable policy the claims validator enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Record each accepted `jti` and reject later presentations of it.
    pub prevent_token_reuse: bool,
    /// Configured audiences for token endpoint calls.
    pub valid_audience: Audience,
    /// Expected audience when `valid_audience` is [`Audience::None`].
    pub token_endpoint_alias: String,
    /// Only audience accepted on the backchannel authentication endpoint.
    pub backchannel_audience: String,
    /// Maximum age of an assertion in minutes, from `iat` (or `nbf`).
    pub reject_before_minutes: u32,
    /// Exact `iss` value required, if set.
    pub valid_issuer: Option<String>,
    /// Claims that must be present and non-empty, in check order.
    pub mandatory_claims: Vec<String>,
    /// Back replay prevention with the jti cache. When false, no replay checks run.
    pub cache_used_jti: bool,
    /// How far in the future `iat` may be (clock drift tolerance).
    pub clock_skew_seconds: i64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            prevent_token_reuse: DEFAULT_PREVENT_TOKEN_REUSE,
            valid_audience: Audience::None,
            token_endpoint_alias: DEFAULT_TOKEN_ENDPOINT_ALIAS.to_string(),
            backchannel_audience: DEFAULT_BACKCHANNEL_ENDPOINT_ALIAS.to_string(),
            reject_before_minutes: DEFAULT_REJECT_BEFORE_MINUTES,
            valid_issuer: None,
            mandatory_claims: DEFAULT_MANDATORY_CLAIMS
                .iter()
                .map(ToString::to_string)
                .collect(),
            cache_used_jti: DEFAULT_ENABLE_JTI_CACHE,
            clock_skew_seconds: DEFAULT_CLOCK_SKEW.as_secs() as i64,
        }
    }
}

impl ValidationPolicy {
    /// Load the policy from environment variables named after the properties.
    pub fn from_env() -> Self {
        Self::from_vars(&env::vars().collect())
    }

    /// Load the policy from a property map. Never fails; see module docs.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let defaults = Self::default();

        let token_endpoint_alias = non_empty(vars, TOKEN_ENDPOINT_ALIAS)
            .map_or(defaults.token_endpoint_alias, ToString::to_string);

        let backchannel_audience = non_empty(vars, BACKCHANNEL_ENDPOINT_ALIAS)
            .map_or(defaults.backchannel_audience, ToString::to_string);

        let prevent_token_reuse =
            parse_bool(vars, PREVENT_TOKEN_REUSE, defaults.prevent_token_reuse);

        let cache_used_jti = parse_bool(vars, ENABLE_CACHE_FOR_JTI, defaults.cache_used_jti);

        let reject_before_minutes = match non_empty(vars, REJECT_BEFORE_IN_MINUTES) {
            Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|e| {
                tracing::warn!(
                    target: "client_auth.config",
                    property = REJECT_BEFORE_IN_MINUTES,
                    value = raw,
                    error = %e,
                    default = DEFAULT_REJECT_BEFORE_MINUTES,
                    "Invalid private_key_jwt validity period in configuration, using default"
                );
                DEFAULT_REJECT_BEFORE_MINUTES
            }),
            None => defaults.reject_before_minutes,
        };

        let clock_skew_seconds = match non_empty(vars, CLOCK_SKEW_SECONDS) {
            Some(raw) => parse_clock_skew(raw),
            None => defaults.clock_skew_seconds,
        };

        let valid_audience = non_empty(vars, VALID_AUDIENCES)
            .map_or(Audience::None, Audience::from_list);

        let valid_issuer = non_empty(vars, VALID_ISSUER).map(|s| s.trim().to_string());

        let mandatory_claims = match non_empty(vars, MANDATORY_CLAIMS) {
            Some(raw) => {
                let claims = dedup_claim_list(raw);
                if claims.is_empty() {
                    tracing::warn!(
                        target: "client_auth.config",
                        property = MANDATORY_CLAIMS,
                        "Mandatory claim list is empty after parsing, using default"
                    );
                    defaults.mandatory_claims
                } else {
                    claims
                }
            }
            None => defaults.mandatory_claims,
        };

        Self {
            prevent_token_reuse,
            valid_audience,
            token_endpoint_alias,
            backchannel_audience,
            reject_before_minutes,
            valid_issuer,
            mandatory_claims,
            cache_used_jti,
            clock_skew_seconds,
        }
    }

    /// Whether replay checks (and jti recording) run at all.
    pub fn replay_protection_enabled(&self) -> bool {
        self.prevent_token_reuse && self.cache_used_jti
    }

    /// Whether `aud` is one of the audiences expected for this call site.
    ///
    /// Backchannel calls accept only the backchannel audience; all other calls
    /// accept the configured audiences, or the token endpoint alias when none
    /// are configured.
    pub fn accepts_audience(&self, aud: &str, is_backchannel: bool) -> bool {
        if is_backchannel {
            return aud == self.backchannel_audience;
        }

        match &self.valid_audience {
            Audience::None => aud == self.token_endpoint_alias,
            Audience::Single(expected) => aud == expected,
            Audience::Multiple(expected) => expected.contains(aud),
        }
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

/// Only `true` and `false` (any case) are accepted. Anything else, including
/// `yes` or `0`, is logged and the default is kept, so a typo never switches
/// a protection off.
fn parse_bool(vars: &HashMap<String, String>, key: &str, default: bool) -> bool {
    let Some(raw) = non_empty(vars, key) else {
        return default;
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => {
            tracing::warn!(
                target: "client_auth.config",
                property = key,
                value = raw,
                default = default,
                "Invalid boolean in configuration, using default"
            );
            default
        }
    }
}

fn parse_clock_skew(raw: &str) -> i64 {
    let default = DEFAULT_CLOCK_SKEW.as_secs() as i64;
    let max = MAX_CLOCK_SKEW.as_secs() as i64;

    match raw.trim().parse::<i64>() {
        Ok(secs) if secs < 0 => {
            tracing::warn!(
                target: "client_auth.config",
                property = CLOCK_SKEW_SECONDS,
                value = secs,
                default = default,
                "Negative clock skew in configuration, using default"
            );
            default
        }
        Ok(secs) if secs > max => {
            tracing::warn!(
                target: "client_auth.config",
                property = CLOCK_SKEW_SECONDS,
                value = secs,
                max = max,
                "Clock skew exceeds maximum, clamping"
            );
            max
        }
        Ok(secs) => secs,
        Err(e) => {
            tracing::warn!(
                target: "client_auth.config",
                property = CLOCK_SKEW_SECONDS,
                value = raw,
                error = %e,
                default = default,
                "Invalid clock skew in configuration, using default"
            );
            default
        }
    }
}

fn dedup_claim_list(raw: &str) -> Vec<String> {
    let mut claims: Vec<String> = Vec::new();
    for claim in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if !claims.iter().any(|c| c == claim) {
            claims.push(claim.to_string());
        }
    }
    claims
}

// ============================================================================
// ServiceConfig
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub client_keys_path: PathBuf,
    pub replay_purge_interval_seconds: u64,
    /// Soft cap on live replay cache entries. Unbounded when unset.
    pub replay_cache_max_entries: Option<usize>,
    pub policy: ValidationPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let client_keys_path = vars
            .get("CLIENT_KEYS_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("CLIENT_KEYS_PATH".to_string()))?;

        let replay_purge_interval_seconds = match vars.get("REPLAY_PURGE_INTERVAL_SECONDS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        name: "REPLAY_PURGE_INTERVAL_SECONDS".to_string(),
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        name: "REPLAY_PURGE_INTERVAL_SECONDS".to_string(),
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_REPLAY_PURGE_INTERVAL_SECONDS,
        };

        let replay_cache_max_entries = match vars.get("REPLAY_CACHE_MAX_ENTRIES") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        name: "REPLAY_CACHE_MAX_ENTRIES".to_string(),
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(max) => Some(max),
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        name: "REPLAY_CACHE_MAX_ENTRIES".to_string(),
                        reason: e.to_string(),
                    })
                }
            },
            None => None,
        };

        Ok(ServiceConfig {
            bind_address,
            client_keys_path,
            replay_purge_interval_seconds,
            replay_cache_max_entries,
            policy: ValidationPolicy::from_vars(vars),
        })
    }
}
