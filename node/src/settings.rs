//! Layered run configuration: TOML file first, `TBW_*` environment variables on top.

use anyhow::{anyhow, bail, Context, Result};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tbw_core::RunWindow;
use tbw_treasury::{AdminShare, FairFeeSchedule, PayoutPolicy, SmallWalletBonus};
use tbw_types::{Address, ChainTimestamp, Height};

const ENV_PREFIX: &str = "TBW";

/// Per-address share override, `[[custom_shares]]`
#[derive(Debug, Clone, Deserialize)]
struct CustomShare {
    address: Address,
    share: Decimal,
}

/// Per-address payout frequency in blocks, `[[custom_frequencies]]`
#[derive(Debug, Clone, Deserialize)]
struct CustomFrequency {
    address: Address,
    blocks: u64,
}

/// Payout redirection, `[[redirects]]`
#[derive(Debug, Clone, Deserialize)]
struct Redirect {
    from: Address,
    to: Address,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_path: Option<PathBuf>,
    pub delegate_public_key: String,
    pub delegate_address: Address,
    pub start_height: Height,
    pub end_height: Option<Height>,

    pub voter_share: Decimal,
    pub voter_fee_share: Decimal,
    pub donation_share: Decimal,
    pub donation_address: Option<Address>,
    pub min_payout: Decimal,
    pub min_voter_balance: Decimal,
    pub small_wallet_threshold: Option<Decimal>,
    pub small_wallet_share: Option<Decimal>,
    pub blacklist: Vec<Address>,
    pub whitelist: Vec<Address>,
    pub custom_shares: BTreeMap<Address, Decimal>,
    pub custom_frequencies: BTreeMap<Address, u64>,
    pub redirects: BTreeMap<Address, Address>,
    pub admins: Vec<AdminShare>,

    pub fair_fees: bool,
    pub transfers_per_multipayment: u32,
    pub multipayment_fee: Decimal,
    pub transfer_fee: Decimal,
    pub vendor_field: String,

    pub log_level: String,
    pub log_format: String,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
}

fn get_string_value(config: &Config, key: &str) -> Option<String> {
    config
        .get_string(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn get_bool_value(config: &Config, key: &str, default: bool) -> bool {
    if let Ok(value) = config.get_bool(key) {
        return value;
    }
    get_string_value(config, key)
        .and_then(|raw| raw.parse::<bool>().ok())
        .unwrap_or(default)
}

/// Parse an optional scalar; present-but-malformed values are errors.
fn parse_value<T>(config: &Config, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_string_value(config, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|err| anyhow!("invalid value for {key}: {raw} ({err})"))
        })
        .transpose()
}

/// Address lists come as TOML arrays or comma-separated strings.
fn get_list(config: &Config, key: &str) -> Vec<String> {
    if let Ok(values) = config.get::<Vec<String>>(key) {
        return values;
    }
    get_string_value(config, key)
        .map(|raw| {
            raw.split(',')
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn get_table<T: DeserializeOwned>(config: &Config, key: &str) -> Result<Vec<T>> {
    match config.get::<Vec<T>>(key) {
        Ok(values) => Ok(values),
        Err(ConfigError::NotFound(_)) => Ok(Vec::new()),
        Err(err) => Err(err).with_context(|| format!("invalid table {key}")),
    }
}

impl AppConfig {
    /// Load from `config_path` (if any) and the process environment.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::from_sources(config_path, environment())
    }

    fn from_sources(config_path: Option<&str>, env: Environment) -> Result<Self> {
        let resolved_path = match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path)
            }
            None => None,
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        let config = builder.add_source(env).build()?;

        let admins = get_table::<AdminShare>(&config, "admins")?;
        let custom_shares = get_table::<CustomShare>(&config, "custom_shares")?
            .into_iter()
            .map(|entry| (entry.address, entry.share))
            .collect();
        let custom_frequencies = get_table::<CustomFrequency>(&config, "custom_frequencies")?
            .into_iter()
            .map(|entry| (entry.address, entry.blocks))
            .collect();
        let redirects = get_table::<Redirect>(&config, "redirects")?
            .into_iter()
            .map(|entry| (entry.from, entry.to))
            .collect();

        let schedule = FairFeeSchedule::default();

        Ok(Self {
            config_path: resolved_path,
            delegate_public_key: get_string_value(&config, "delegate_public_key")
                .unwrap_or_default(),
            delegate_address: get_string_value(&config, "delegate_address").unwrap_or_default(),
            start_height: parse_value(&config, "start_height")?.unwrap_or(0),
            end_height: parse_value(&config, "end_height")?,

            voter_share: parse_value(&config, "voter_share")?.unwrap_or(Decimal::new(9, 1)),
            voter_fee_share: parse_value(&config, "voter_fee_share")?.unwrap_or_default(),
            donation_share: parse_value(&config, "donation_share")?.unwrap_or_default(),
            donation_address: get_string_value(&config, "donation_address"),
            min_payout: parse_value(&config, "min_payout")?.unwrap_or_default(),
            min_voter_balance: parse_value(&config, "min_voter_balance")?.unwrap_or_default(),
            small_wallet_threshold: parse_value(&config, "small_wallet_threshold")?,
            small_wallet_share: parse_value(&config, "small_wallet_share")?,
            blacklist: get_list(&config, "blacklist"),
            whitelist: get_list(&config, "whitelist"),
            custom_shares,
            custom_frequencies,
            redirects,
            admins,

            fair_fees: get_bool_value(&config, "fair_fees", schedule.enabled),
            transfers_per_multipayment: parse_value(&config, "transfers_per_multipayment")?
                .unwrap_or(schedule.transfers_per_multipayment),
            multipayment_fee: parse_value(&config, "multipayment_fee")?
                .unwrap_or(schedule.multipayment_fee),
            transfer_fee: parse_value(&config, "transfer_fee")?.unwrap_or(schedule.transfer_fee),
            vendor_field: get_string_value(&config, "vendor_field")
                .unwrap_or_else(|| "tbw".to_string()),

            log_level: get_string_value(&config, "log_level").unwrap_or_else(|| "info".to_string()),
            log_format: get_string_value(&config, "log_format")
                .unwrap_or_else(|| "pretty".to_string()),
        })
    }

    /// Build the validated payout policy.
    pub fn payout_policy(&self) -> Result<PayoutPolicy> {
        let small_wallet_bonus = match (self.small_wallet_threshold, self.small_wallet_share) {
            (Some(threshold), Some(share)) => Some(SmallWalletBonus { threshold, share }),
            (None, None) => None,
            _ => bail!("small_wallet_threshold and small_wallet_share must be set together"),
        };

        let policy = PayoutPolicy {
            voter_share: self.voter_share,
            voter_fee_share: self.voter_fee_share,
            donation_share: self.donation_share,
            donation_address: self.donation_address.clone(),
            min_payout: self.min_payout,
            min_voter_balance: self.min_voter_balance,
            small_wallet_bonus,
            blacklist: self.blacklist.clone(),
            whitelist: self.whitelist.clone(),
            custom_shares: self.custom_shares.clone(),
            custom_frequencies: self.custom_frequencies.clone(),
            redirects: self.redirects.clone(),
            admins: self.admins.clone(),
            fair_fees: FairFeeSchedule {
                enabled: self.fair_fees,
                transfers_per_multipayment: self.transfers_per_multipayment,
                multipayment_fee: self.multipayment_fee,
                transfer_fee: self.transfer_fee,
            },
            vendor_field: self.vendor_field.clone(),
        };

        policy.validate()?;
        Ok(policy)
    }

    /// Delegate and height range of the run.
    pub fn run_window(&self, now: Option<ChainTimestamp>) -> Result<RunWindow> {
        if self.delegate_public_key.is_empty() {
            bail!("delegate_public_key is required");
        }
        if self.delegate_address.is_empty() {
            bail!("delegate_address is required");
        }

        let window = RunWindow {
            delegate_public_key: self.delegate_public_key.clone(),
            delegate_address: self.delegate_address.clone(),
            start_height: self.start_height,
            end_height: self.end_height,
            now,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn source(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
