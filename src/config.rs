use crate::{
    models::bucket::{BucketKey, PolicyKey},
    services::auth_service::DEFAULT_SCOPES,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, ffi::OsString, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub bucket_key: BucketKey,
    pub bucket_policy: PolicyKey,
    pub file_name: String,
    pub file_path: PathBuf,
    pub base_url: String,
    pub scopes: Vec<String>,
    pub auto_refresh: bool,
    pub chunk_retries: u32,
    pub retry_base_delay: Duration,
    pub force_translate: bool,
    pub manifest_polls: u32,
    pub poll_interval: Duration,
    pub request_timeout: Option<Duration>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Upload a design file and request its translation into a viewable format"
)]
pub struct Args {
    /// Application client id (overrides FORGE_CLIENT_ID)
    #[arg(long)]
    pub client_id: Option<String>,

    /// Application client secret (overrides FORGE_CLIENT_SECRET)
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Bucket name; the lowercased client id is appended to form the key (overrides FORGE_BUCKET_NAME)
    #[arg(long)]
    pub bucket_name: Option<String>,

    /// Retention policy for a newly created bucket (overrides FORGE_BUCKET_POLICY)
    #[arg(long)]
    pub bucket_policy: Option<String>,

    /// Object name to upload the file as (overrides FORGE_FILE_NAME)
    #[arg(long)]
    pub file_name: Option<String>,

    /// Local file to upload (overrides FORGE_FILE_PATH)
    #[arg(long)]
    pub file_path: Option<PathBuf>,

    /// API base URL (overrides FORGE_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// OAuth scope to request; repeat for several (replaces the default set)
    #[arg(long = "scope")]
    pub scopes: Vec<String>,

    /// Do not refresh the access token once it expires
    #[arg(long)]
    pub no_auto_refresh: bool,

    /// Times a failing chunk is sent again (overrides FORGE_CHUNK_RETRIES)
    #[arg(long)]
    pub chunk_retries: Option<u32>,

    /// Replace derivatives from an earlier translation
    #[arg(long)]
    pub force_translate: bool,

    /// How many times to check the manifest (overrides FORGE_MANIFEST_POLLS)
    #[arg(long)]
    pub manifest_polls: Option<u32>,

    /// Seconds between manifest checks (overrides FORGE_POLL_INTERVAL_SECS)
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Per-request timeout in seconds; none by default (overrides FORGE_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |name| env::var_os(name))
    }

    /// Merge CLI args over values looked up by `lookup`, over defaults.
    ///
    /// Values are taken as raw OS strings; only the file path is kept that way,
    /// every other value must be valid Unicode.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let var = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Some(value) => value
                    .into_string()
                    .map(Some)
                    .map_err(|raw| anyhow::anyhow!("{} is not valid Unicode: {:?}", name, raw)),
                None => Ok(None),
            }
        };
        let required = |cli: Option<String>, name: &str, flag: &str| -> Result<String> {
            match cli.or(var(name)?) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => bail!("{} is not set (or pass --{})", name, flag),
            }
        };

        let client_id = required(args.client_id, "FORGE_CLIENT_ID", "client-id")?;
        let client_secret = required(args.client_secret, "FORGE_CLIENT_SECRET", "client-secret")?;
        let bucket_name = required(args.bucket_name, "FORGE_BUCKET_NAME", "bucket-name")?;
        let file_name = required(args.file_name, "FORGE_FILE_NAME", "file-name")?;
        let file_path = match args
            .file_path
            .or_else(|| lookup("FORGE_FILE_PATH").map(PathBuf::from))
        {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => bail!("FORGE_FILE_PATH is not set (or pass --file-path)"),
        };

        let bucket_key = BucketKey::for_client(&bucket_name, &client_id)
            .context("deriving bucket key from FORGE_BUCKET_NAME and FORGE_CLIENT_ID")?;

        let bucket_policy = match args.bucket_policy.or(var("FORGE_BUCKET_POLICY")?) {
            Some(value) => PolicyKey::from_str(&value)
                .map_err(anyhow::Error::msg)
                .context("parsing FORGE_BUCKET_POLICY")?,
            None => PolicyKey::default(),
        };

        let base_url = args
            .base_url
            .or(var("FORGE_BASE_URL")?)
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());

        let scopes = if args.scopes.is_empty() {
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
        } else {
            args.scopes
        };

        let chunk_retries = match args.chunk_retries {
            Some(value) => value,
            None => parse_var(&var, "FORGE_CHUNK_RETRIES")?.unwrap_or(0),
        };
        let manifest_polls = match args.manifest_polls {
            Some(value) => value,
            None => parse_var(&var, "FORGE_MANIFEST_POLLS")?.unwrap_or(1),
        };
        if manifest_polls == 0 {
            bail!("manifest polls must be at least 1");
        }
        let poll_interval_secs = match args.poll_interval_secs {
            Some(value) => value,
            None => parse_var(&var, "FORGE_POLL_INTERVAL_SECS")?.unwrap_or(10),
        };
        let request_timeout_secs = match args.request_timeout_secs {
            Some(value) => Some(value),
            None => parse_var(&var, "FORGE_REQUEST_TIMEOUT_SECS")?,
        };

        Ok(Self {
            client_id,
            client_secret,
            bucket_key,
            bucket_policy,
            file_name,
            file_path,
            base_url,
            scopes,
            auto_refresh: !args.no_auto_refresh,
            chunk_retries,
            retry_base_delay: Duration::from_millis(500),
            force_translate: args.force_translate,
            manifest_polls,
            poll_interval: Duration::from_secs(poll_interval_secs),
            request_timeout: request_timeout_secs.map(Duration::from_secs),
        })
    }
}

fn parse_var<T, F>(var: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Result<Option<String>>,
{
    match var(name)? {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(None),
    }
}
