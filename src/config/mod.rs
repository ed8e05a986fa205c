use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::cli::OutputFormat;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Outbound HTTP settings
    pub http: HttpConfig,

    /// Transcript selection and output defaults
    pub transcripts: TranscriptConfig,

    /// Page markers used to classify gated or caption-less pages
    pub markers: GateMarkers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Deadline for each network call, in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Locale forced on the watch page so metadata comes back English-keyed
    pub accept_language: String,

    /// Pre-accepted consent cookie value, sent as `CONSENT=<value>`
    pub consent_cookie: Option<String>,

    /// Optional proxy URL for all requests
    pub proxy: Option<String>,

    /// Base of the watch page URL
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Language codes tried in order when none are given
    pub default_languages: Vec<String>,

    /// Prefer manually created tracks over generated ones of the same language
    pub prefer_manual: bool,

    /// Default output format
    pub default_format: String,

    /// Keep inline formatting tags in segment text
    pub preserve_formatting: bool,
}

/// Substrings that classify a successfully fetched page.
///
/// Upstream markup drifts; these lists are meant to be maintained through the
/// config file rather than treated as exhaustive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateMarkers {
    pub captcha: Vec<String>,
    pub unavailable: Vec<String>,
    pub age: Vec<String>,
    pub region: Vec<String>,
    pub login: Vec<String>,
    /// Present when a player rendered but carries no caption data
    pub captions_disabled: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US".to_string(),
            consent_cookie: None,
            proxy: None,
            base_url: "https://www.youtube.com".to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            default_languages: vec!["en".to_string()],
            prefer_manual: true,
            default_format: "json".to_string(),
            preserve_formatting: false,
        }
    }
}

impl Default for GateMarkers {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            captcha: list(&[r#"class="g-recaptcha""#]),
            unavailable: list(&[r#""playabilityStatus":{"status":"ERROR""#]),
            age: list(&[
                r#""status":"AGE_CHECK_REQUIRED""#,
                r#""desktopLegacyAgeGateReason""#,
                "Sign in to confirm your age",
            ]),
            region: list(&[
                "not made this video available in your country",
                r#""reason":"Video unavailable in your country""#,
            ]),
            login: list(&[r#""status":"LOGIN_REQUIRED""#]),
            captions_disabled: list(&[r#""playabilityStatus":"#]),
        }
    }
}

impl Config {
    /// Load configuration from file or fall back to defaults
    pub async fn load() -> Result<Self> {
        match Self::config_path()? {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the config file in use, if one exists
    fn config_path() -> Result<Option<PathBuf>> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("tubescribe.yaml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        let user_config = Self::default_path()?;
        Ok(user_config.exists().then_some(user_config))
    }

    /// Where `config --init` writes
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("tubescribe").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than zero");
        }

        Url::parse(&self.http.base_url)
            .with_context(|| format!("http.base_url is not a valid URL: {}", self.http.base_url))?;

        if let Some(proxy) = &self.http.proxy {
            Url::parse(proxy).with_context(|| format!("http.proxy is not a valid URL: {proxy}"))?;
        }

        OutputFormat::from_str(&self.transcripts.default_format)?;

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Timeout: {}s", self.http.timeout_secs);
        println!("  Accept-Language: {}", self.http.accept_language);
        println!("  Base URL: {}", self.http.base_url);
        if let Some(proxy) = &self.http.proxy {
            println!("  Proxy: {}", proxy);
        }
        println!("  Consent cookie: {}", if self.http.consent_cookie.is_some() { "set" } else { "unset" });
        println!("  Default languages: {}", self.transcripts.default_languages.join(","));
        println!("  Prefer manual: {}", self.transcripts.prefer_manual);
        println!("  Default format: {}", self.transcripts.default_format);
        println!("  Preserve formatting: {}", self.transcripts.preserve_formatting);
    }
}
