//! Configuration surface
//!
//! Every recognised option comes from the environment; anything malformed
//! is a fatal [`Error::Config`] at startup. Defaults follow the documented
//! contract, not the platform.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default storage directory for synced sources.
pub const DEFAULT_STORAGE_DIR: &str = "./.prompts_cache";

/// Default branch for git sources.
pub const DEFAULT_GIT_BRANCH: &str = "main";

/// Default remote polling interval.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(300_000);

/// Default git retry budget.
pub const DEFAULT_GIT_MAX_RETRIES: u32 = 3;

/// Wire transport selection. Only stdio is served; the other values are
/// accepted so configuration stays portable across deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
    Sse,
}

impl Transport {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "http" => Some(Self::Http),
            "sse" => Some(Self::Sse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
            Self::Sse => "sse",
        }
    }
}

/// Language injected into every render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "en" => Some(Self::En),
            "zh" => Some(Self::Zh),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// User sources in priority order (lower index = higher priority).
    pub repo_urls: Vec<String>,
    /// Optional system source supplying the `common` group.
    pub system_repo_url: Option<String>,
    pub storage_dir: PathBuf,
    /// Active group set; `common` is implied by a system source.
    pub groups: Vec<String>,
    pub git_branch: String,
    pub git_max_retries: u32,
    pub git_polling_interval: Duration,
    pub watch_mode: bool,
    pub cache_cleanup_interval: Option<Duration>,
    pub transport: Transport,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub language: Language,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup, for tests.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let repo_urls = match (get("PROMPT_REPO_URLS"), get("PROMPT_REPO_URL")) {
            (Some(list), _) => split_list(&list),
            (None, Some(single)) => split_list(&single),
            (None, None) => Vec::new(),
        };
        if repo_urls.is_empty() {
            return Err(Error::config(
                "PROMPT_REPO_URL or PROMPT_REPO_URLS must name at least one source",
            ));
        }
        for url in &repo_urls {
            prompt_fs::validate_source(url)
                .map_err(|e| Error::config(format!("PROMPT_REPO_URL: {e}")))?;
        }

        let system_repo_url = get("SYSTEM_REPO_URL").filter(|s| !s.trim().is_empty());
        if let Some(url) = &system_repo_url {
            prompt_fs::validate_source(url)
                .map_err(|e| Error::config(format!("SYSTEM_REPO_URL: {e}")))?;
        }

        let storage_dir = get("STORAGE_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));

        let groups = get("MCP_GROUPS").map(|v| split_list(&v)).unwrap_or_default();

        let git_branch = get("GIT_BRANCH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GIT_BRANCH.to_string());

        let git_max_retries = parse_optional(&get, "GIT_MAX_RETRIES")?
            .unwrap_or(DEFAULT_GIT_MAX_RETRIES);

        let git_polling_interval = parse_optional::<u64>(&get, "GIT_POLLING_INTERVAL")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLLING_INTERVAL);

        let watch_mode = match get("WATCH_MODE") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| Error::config(format!("WATCH_MODE: not a boolean: '{raw}'")))?,
            None => false,
        };

        let cache_cleanup_interval =
            parse_optional::<u64>(&get, "CACHE_CLEANUP_INTERVAL")?.map(Duration::from_millis);

        let transport = match get("TRANSPORT_TYPE") {
            Some(raw) => Transport::parse(&raw).ok_or_else(|| {
                Error::config(format!(
                    "TRANSPORT_TYPE: expected stdio, http, or sse, got '{raw}'"
                ))
            })?,
            None => Transport::Stdio,
        };

        let language = match get("MCP_LANGUAGE") {
            Some(raw) => Language::parse(&raw).ok_or_else(|| {
                Error::config(format!("MCP_LANGUAGE: expected en or zh, got '{raw}'"))
            })?,
            None => Language::En,
        };

        Ok(Self {
            repo_urls,
            system_repo_url,
            storage_dir,
            groups,
            git_branch,
            git_max_retries,
            git_polling_interval,
            watch_mode,
            cache_cleanup_interval,
            transport,
            log_level: get("LOG_LEVEL").filter(|s| !s.trim().is_empty()),
            log_file: get("LOG_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            language,
        })
    }

    /// Whether a system source is configured.
    pub fn has_system_source(&self) -> bool {
        self.system_repo_url.is_some()
    }

    /// Sibling directory the system source syncs into.
    pub fn system_dir(&self) -> PathBuf {
        let mut name = self
            .storage_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prompts".to_string());
        name.push_str("_system");
        self.storage_dir
            .parent()
            .map(|p| p.join(&name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_optional<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match get(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::config(format!("{key}: not a number: '{raw}'"))),
    }
}
