/// `load_config` module: builds the [`RelayConfig`] from process environment.
///
/// This is the only place environment variables are read. `.env` files are honoured
/// (loaded in `main` through `dotenvy`) so local runs need no exported shell state.
///
/// # Variables
/// - `TWITTER_API_URL` (required): base URL of the source API
/// - `SLEEP_DURATION`: poll interval in seconds, fractional allowed (default 60)
/// - `CREDENTIALS_PATH`: snapshot file (default `credentials.json`)
/// - `LINK_SHORTENERS`: comma-separated shortener hosts (default `t.co,ift.tt`)
/// - `FOOTER_LABEL`: label before the source link in every status
/// - `STRIP_DISCLAIMERS`: `|`-separated boilerplate removed from every post
/// - `REQUEST_TIMEOUT`: timeout for timeline fetches and status posts in seconds (default 5)
/// - `RESOLVE_TIMEOUT`: shortlink resolution timeout in seconds (default 10)
///
/// # Errors
/// Missing or malformed values are configuration errors and abort startup; all
/// of them are reported through `anyhow::Error` with the offending variable named.
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tootbridge_core::config::RelayConfig;
use tracing::{error, info};

pub const SOURCE_ENDPOINT_VAR: &str = "TWITTER_API_URL";
pub const POLL_INTERVAL_VAR: &str = "SLEEP_DURATION";
pub const CREDENTIALS_PATH_VAR: &str = "CREDENTIALS_PATH";
pub const SHORTENERS_VAR: &str = "LINK_SHORTENERS";
pub const FOOTER_LABEL_VAR: &str = "FOOTER_LABEL";
pub const DISCLAIMERS_VAR: &str = "STRIP_DISCLAIMERS";
pub const REQUEST_TIMEOUT_VAR: &str = "REQUEST_TIMEOUT";
pub const RESOLVE_TIMEOUT_VAR: &str = "RESOLVE_TIMEOUT";

/// Load the relay configuration. `credentials` overrides `CREDENTIALS_PATH`.
pub fn load_config(credentials: Option<PathBuf>) -> Result<RelayConfig> {
    let source_endpoint = match non_empty_var(SOURCE_ENDPOINT_VAR) {
        Some(url) => url,
        None => {
            error!(var = SOURCE_ENDPOINT_VAR, "Source API url is missing");
            bail!("{SOURCE_ENDPOINT_VAR} environment variable not set: source API url is missing");
        }
    };

    let mut config = RelayConfig::new(source_endpoint.trim_end_matches('/'));

    if let Some(raw) = non_empty_var(POLL_INTERVAL_VAR) {
        config.poll_interval = parse_seconds(POLL_INTERVAL_VAR, &raw)?;
    }
    if let Some(raw) = non_empty_var(REQUEST_TIMEOUT_VAR) {
        config.request_timeout = parse_seconds(REQUEST_TIMEOUT_VAR, &raw)?;
    }
    if let Some(raw) = non_empty_var(RESOLVE_TIMEOUT_VAR) {
        config.resolve_timeout = parse_seconds(RESOLVE_TIMEOUT_VAR, &raw)?;
    }

    config.credentials_path = match credentials {
        Some(path) => path,
        None => non_empty_var(CREDENTIALS_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or(config.credentials_path),
    };

    if let Some(raw) = non_empty_var(SHORTENERS_VAR) {
        config.text.shorteners = split_list(&raw, ',');
    }
    if let Some(label) = non_empty_var(FOOTER_LABEL_VAR) {
        config.text.footer_label = label;
    }
    if let Some(raw) = non_empty_var(DISCLAIMERS_VAR) {
        config.text.disclaimers = split_list(&raw, '|');
    }

    info!(
        poll_interval_secs = config.poll_interval.as_secs_f64(),
        "Polling frequency is set"
    );
    Ok(config)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_seconds(var: &str, raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{var} must be a number of seconds, got '{raw}'"))?;
    if !secs.is_finite() || secs <= 0.0 {
        error!(var, value = raw, "Duration must be positive");
        bail!("{var} must be a positive number of seconds, got '{raw}'");
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => Ok(duration),
        Err(e) => {
            error!(var, value = raw, error = %e, "Duration out of range");
            bail!("{var} is out of range, got '{raw}': {e}");
        }
    }
}

fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
