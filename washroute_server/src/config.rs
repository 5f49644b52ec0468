use std::env;

use chrono::Duration;
use log::*;
use washroute_common::{
    helpers::{parse_boolean_flag, parse_non_negative},
    Secret,
};

const DEFAULT_WRS_HOST: &str = "127.0.0.1";
const DEFAULT_WRS_PORT: u16 = 8370;
const DEFAULT_SIGNATURE_HEADER: &str = "x-gateway-signature";
const DEFAULT_SETTLEMENT_HOLD: Duration = Duration::hours(24);
const DEFAULT_SWEEP_INTERVAL_MINS: u64 = 60;
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(48);
/// Ten years. Longer holds and timeouts are treated as typos.
const MAX_CONFIGURED_HOURS: i64 = 24 * 365 * 10;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The shared secret the payment gateway signs its webhooks with.
    pub webhook_secret: Secret<String>,
    /// The request header that carries the webhook signature.
    pub signature_header: String,
    /// If false, webhook signatures are not checked. **DANGER**: anyone can then mark orders as paid.
    pub webhook_signature_checks: bool,
    /// Callers of `/jobs/settlement_sweep` must present this value in the `X-Sweep-Secret` header. If it is not set,
    /// the endpoint refuses every request.
    pub sweep_secret: Option<Secret<String>>,
    /// How long a commission waits in `pending_settlement` before it can be paid out.
    pub settlement_hold: Duration,
    /// How often the in-process settlement worker runs. `None` disables the worker.
    pub sweep_interval: Option<std::time::Duration>,
    /// The time before an unpaid order is cancelled and its payment marked as abandoned.
    pub unpaid_order_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WRS_HOST.to_string(),
            port: DEFAULT_WRS_PORT,
            database_url: String::default(),
            webhook_secret: Secret::default(),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            webhook_signature_checks: true,
            sweep_secret: None,
            settlement_hold: DEFAULT_SETTLEMENT_HOLD,
            sweep_interval: Some(std::time::Duration::from_secs(DEFAULT_SWEEP_INTERVAL_MINS * 60)),
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("WRS_HOST").ok().unwrap_or_else(|| DEFAULT_WRS_HOST.into());
        let port = env::var("WRS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for WRS_PORT. {e} Using the default, {DEFAULT_WRS_PORT}, instead."
                    );
                    DEFAULT_WRS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_WRS_PORT);
        let database_url = env::var("WRS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ WRS_DATABASE_URL is not set. Please set it to the URL for the WashRoute database.");
            String::default()
        });
        let webhook_secret =
            env::var("WRS_WEBHOOK_SECRET").ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
                error!(
                    "🪛️ WRS_WEBHOOK_SECRET is not set. Please set it to the secret your payment gateway signs \
                     webhooks with. Every webhook will be rejected until you do."
                );
                String::default()
            });
        let signature_header = env::var("WRS_SIGNATURE_HEADER")
            .ok()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.into());
        let webhook_signature_checks = parse_boolean_flag(env::var("WRS_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !webhook_signature_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Never run a production server like this. 🚨️");
        }
        let sweep_secret = env::var("WRS_SWEEP_SECRET").ok().filter(|s| !s.is_empty()).map(Secret::new);
        if sweep_secret.is_none() {
            warn!("🪛️ WRS_SWEEP_SECRET is not set. The /jobs/settlement_sweep endpoint will refuse every request.");
        }
        let settlement_hold = hours_from_env("WRS_SETTLEMENT_HOLD_HOURS", DEFAULT_SETTLEMENT_HOLD);
        let unpaid_order_timeout = hours_from_env("WRS_UNPAID_ORDER_TIMEOUT", DEFAULT_UNPAID_ORDER_TIMEOUT);
        let sweep_interval = configure_sweep_interval();
        Self {
            host,
            port,
            database_url,
            webhook_secret: Secret::new(webhook_secret),
            signature_header,
            webhook_signature_checks,
            sweep_secret,
            settlement_hold,
            sweep_interval,
            unpaid_order_timeout,
        }
    }
}

fn hours_from_env(var: &str, default: Duration) -> Duration {
    env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default value of {} hrs.", default.num_hours()))
        .and_then(|s| {
            parse_hours(&s).ok_or_else(|| {
                error!("🪛️ Invalid configuration value for {var}: '{s}'. Using {} hrs.", default.num_hours())
            })
        })
        .ok()
        .unwrap_or(default)
}

/// A whole, non-negative number of hours, no more than [`MAX_CONFIGURED_HOURS`].
fn parse_hours(value: &str) -> Option<Duration> {
    parse_non_negative(value).filter(|h| *h <= MAX_CONFIGURED_HOURS).and_then(Duration::try_hours)
}

fn configure_sweep_interval() -> Option<std::time::Duration> {
    let mins = env::var("WRS_SWEEP_INTERVAL_MINS")
        .map_err(|_| {
            info!("🪛️ WRS_SWEEP_INTERVAL_MINS is not set. Using the default value of {DEFAULT_SWEEP_INTERVAL_MINS} mins.")
        })
        .and_then(|s| {
            parse_non_negative(&s).ok_or_else(|| {
                warn!("🪛️ Invalid configuration value for WRS_SWEEP_INTERVAL_MINS: '{s}'. Using the default.")
            })
        })
        .ok()
        .map(|v| v.unsigned_abs())
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_MINS);
    if mins == 0 {
        info!("🪛️ The in-process settlement worker is disabled. Trigger /jobs/settlement_sweep externally instead.");
        None
    } else {
        Some(std::time::Duration::from_secs(mins * 60))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. Secrets are deliberately left out so they are not
/// passed around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub signature_header: String,
    pub settlement_hold: Duration,
    pub unpaid_order_timeout: Duration,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            signature_header: config.signature_header.clone(),
            settlement_hold: config.settlement_hold,
            unpaid_order_timeout: config.unpaid_order_timeout,
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}
