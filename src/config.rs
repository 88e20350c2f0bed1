use crate::domain::{TagPattern, Version};
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Represents the complete configuration for git-release.
///
/// Loaded once at run start and passed by reference to each component; it is
/// never mutated during a run.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub conventional_commits: ConventionalCommitsConfig,

    #[serde(default)]
    pub reasoning: ReasoningConfig,

    #[serde(default)]
    pub hosting: HostingConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub version_file: VersionFileConfig,

    #[serde(default)]
    pub stages: StagesConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_trunk() -> String {
    "main".to_string()
}

fn default_tag_pattern() -> String {
    "v{version}".to_string()
}

fn default_baseline_version() -> String {
    "0.0.0".to_string()
}

/// Repository location, trunk branch and tag naming.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RepositoryConfig {
    #[serde(default = "default_path")]
    pub path: PathBuf,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_trunk")]
    pub trunk: String,

    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,

    /// Version assumed when no release tag exists yet
    #[serde(default = "default_baseline_version")]
    pub baseline_version: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            path: default_path(),
            remote: default_remote(),
            trunk: default_trunk(),
            tag_pattern: default_tag_pattern(),
            baseline_version: default_baseline_version(),
        }
    }
}

impl RepositoryConfig {
    pub fn tag_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(self.tag_pattern.clone())
    }

    pub fn baseline(&self) -> Result<Version> {
        Version::parse(&self.baseline_version).map_err(|e| {
            ReleaseError::config(format!(
                "Invalid baseline_version '{}': {}",
                self.baseline_version, e
            ))
        })
    }
}

/// Returns the default list of conventional commit types.
fn default_commit_types() -> Vec<String> {
    [
        "feat", "fix", "docs", "style", "refactor", "test", "chore", "build", "ci", "perf",
        "revert",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Returns the default list of breaking change indicators.
fn default_breaking_change_indicators() -> Vec<String> {
    vec![
        "BREAKING CHANGE:".to_string(),
        "BREAKING-CHANGE:".to_string(),
    ]
}

fn default_minor_types() -> Vec<String> {
    vec!["feat".to_string(), "feature".to_string()]
}

fn default_patch_types() -> Vec<String> {
    vec![
        "fix".to_string(),
        "perf".to_string(),
        "refactor".to_string(),
        "revert".to_string(),
    ]
}

/// Returns the default list of keywords that mark a non-conventional message as major.
fn default_major_keywords() -> Vec<String> {
    vec!["breaking".to_string(), "incompatible".to_string()]
}

/// Returns the default list of keywords that mark a non-conventional message as minor.
fn default_minor_keywords() -> Vec<String> {
    vec![
        "feature".to_string(),
        "add ".to_string(),
        "enhancement".to_string(),
    ]
}

/// Returns the default list of keywords that mark a non-conventional message as patch.
fn default_patch_keywords() -> Vec<String> {
    vec!["fix".to_string(), "bug".to_string(), "crash".to_string()]
}

/// Configuration for conventional commit analysis.
///
/// Defines the types, breaking change indicators, and keywords used to classify
/// commits locally before any reasoning service is consulted.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConventionalCommitsConfig {
    #[serde(default = "default_commit_types")]
    pub types: Vec<String>,

    #[serde(default = "default_breaking_change_indicators")]
    pub breaking_change_indicators: Vec<String>,

    #[serde(default = "default_minor_types")]
    pub minor_types: Vec<String>,

    #[serde(default = "default_patch_types")]
    pub patch_types: Vec<String>,

    #[serde(default = "default_major_keywords")]
    pub major_keywords: Vec<String>,

    #[serde(default = "default_minor_keywords")]
    pub minor_keywords: Vec<String>,

    #[serde(default = "default_patch_keywords")]
    pub patch_keywords: Vec<String>,
}

impl Default for ConventionalCommitsConfig {
    fn default() -> Self {
        ConventionalCommitsConfig {
            types: default_commit_types(),
            breaking_change_indicators: default_breaking_change_indicators(),
            minor_types: default_minor_types(),
            patch_types: default_patch_types(),
            major_keywords: default_major_keywords(),
            minor_keywords: default_minor_keywords(),
            patch_keywords: default_patch_keywords(),
        }
    }
}

fn default_reasoning_api_key_env() -> String {
    "REASONING_API_KEY".to_string()
}

fn default_reasoning_timeout() -> u64 {
    30
}

/// External reasoning service used for ambiguous bumps and prose notes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReasoningConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_reasoning_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        ReasoningConfig {
            enabled: false,
            endpoint: None,
            model: None,
            api_key_env: default_reasoning_api_key_env(),
            timeout_secs: default_reasoning_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_hosting_timeout() -> u64 {
    60
}

/// Release hosting API.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HostingConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// `owner/name`; derived from the remote URL when absent
    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_hosting_timeout")]
    pub timeout_secs: u64,
}

impl Default for HostingConfig {
    fn default() -> Self {
        HostingConfig {
            api_url: default_api_url(),
            repository: None,
            token_env: default_token_env(),
            timeout_secs: default_hosting_timeout(),
        }
    }
}

fn default_title_pattern() -> String {
    "Release {tag}".to_string()
}

fn default_true() -> bool {
    true
}

/// Release record options.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReleaseConfig {
    /// Supports `{tag}` and `{version}` placeholders
    #[serde(default = "default_title_pattern")]
    pub title_pattern: String,

    /// Artifact files attached to every release, relative to the repository root
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,

    #[serde(default = "default_true")]
    pub mark_latest: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            title_pattern: default_title_pattern(),
            artifacts: Vec::new(),
            mark_latest: true,
        }
    }
}

impl ReleaseConfig {
    pub fn title(&self, tag: &str, version: &Version) -> String {
        self.title_pattern
            .replace("{tag}", tag)
            .replace("{version}", &version.to_string())
    }
}

fn default_version_pattern() -> String {
    r#"version\s*=\s*"([^"]+)""#.to_string()
}

fn default_commit_message() -> String {
    "chore(release): bump version to {version} [skip ci]".to_string()
}

/// Tracked asset carrying an embedded version string.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VersionFileConfig {
    /// Relative to the repository root; propagation is disabled when absent
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Regex whose first capture group is the embedded version
    #[serde(default = "default_version_pattern")]
    pub pattern: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_true")]
    pub push: bool,
}

impl Default for VersionFileConfig {
    fn default() -> Self {
        VersionFileConfig {
            path: None,
            pattern: default_version_pattern(),
            commit_message: default_commit_message(),
            push: true,
        }
    }
}

/// Shell commands for the gate stages; an absent command skips the stage.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StagesConfig {
    #[serde(default)]
    pub build: Option<String>,

    #[serde(default)]
    pub lint: Option<String>,

    #[serde(default)]
    pub security: Option<String>,

    /// Coverage report produced by the build stage, forwarded as-is
    #[serde(default)]
    pub coverage_report: Option<PathBuf>,
}

fn default_webhook_env() -> String {
    "RELEASE_WEBHOOK_URL".to_string()
}

fn default_notify_timeout() -> u64 {
    10
}

/// Notification sink.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_webhook_env")]
    pub webhook_url_env: String,

    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            webhook_url_env: default_webhook_env(),
            timeout_secs: default_notify_timeout(),
        }
    }
}

/// Credentials and endpoints injected through the environment
///
/// Read exactly once at run start; components receive them explicitly.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    pub hosting_token: Option<String>,
    pub reasoning_api_key: Option<String>,
    pub webhook_url: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("hosting_token", &self.hosting_token.as_ref().map(|_| "***"))
            .field(
                "reasoning_api_key",
                &self.reasoning_api_key.as_ref().map(|_| "***"),
            )
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

impl Secrets {
    /// Read the environment variables named by the configuration
    pub fn from_env(config: &Config) -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Secrets {
            hosting_token: read(&config.hosting.token_env),
            reasoning_api_key: read(&config.reasoning.api_key_env),
            webhook_url: read(&config.notify.webhook_url_env),
        }
    }
}

impl Config {
    /// Checks everything the release stage needs before any mutation happens.
    ///
    /// Every failure here is a configuration error and therefore fatal.
    pub fn validate_for_release(&self, secrets: &Secrets, dry_run: bool) -> Result<()> {
        self.repository.tag_pattern()?;
        self.repository.baseline()?;

        if self.version_file.path.is_some() {
            let re = regex::Regex::new(&self.version_file.pattern).map_err(|e| {
                ReleaseError::config(format!("Invalid version_file.pattern: {}", e))
            })?;
            if re.captures_len() < 2 {
                return Err(ReleaseError::config(
                    "version_file.pattern must contain a capture group for the version",
                ));
            }
        }

        if self.reasoning.enabled && self.reasoning.endpoint.is_none() {
            return Err(ReleaseError::config(
                "reasoning.enabled is set but reasoning.endpoint is missing",
            ));
        }

        if !dry_run && secrets.hosting_token.is_none() {
            return Err(ReleaseError::config(format!(
                "Hosting token not found in environment variable {}",
                self.hosting.token_env
            )));
        }

        Ok(())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitrelease.toml` in current directory
/// 3. `~/.config/.gitrelease.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path).map_err(|e| {
            ReleaseError::config(format!("Cannot read {}: {}", path.display(), e))
        })?
    } else if Path::new("./gitrelease.toml").exists() {
        fs::read_to_string("./gitrelease.toml")?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".gitrelease.toml");
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}

/// Parses configuration from TOML text
pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).map_err(|e| ReleaseError::config(format!("Invalid configuration: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets_with_token() -> Secrets {
        Secrets {
            hosting_token: Some("t".to_string()),
            ..Secrets::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.repository.remote, "origin");
        assert_eq!(config.repository.trunk, "main");
        assert_eq!(config.repository.tag_pattern, "v{version}");
        assert!(!config.reasoning.enabled);
        assert!(config.release.mark_latest);
        assert!(config.version_file.path.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = parse_config(
            r#"
[repository]
trunk = "master"
tag_pattern = "{version}"

[stages]
build = "cargo test"
"#,
        )
        .unwrap();

        assert_eq!(config.repository.trunk, "master");
        assert_eq!(config.repository.remote, "origin");
        assert_eq!(config.stages.build.as_deref(), Some("cargo test"));
        assert!(config.stages.lint.is_none());
    }

    #[test]
    fn test_parse_invalid_is_config_error() {
        let err = parse_config("[repository\n").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_release_title() {
        let release = ReleaseConfig::default();
        assert_eq!(
            release.title("v1.2.4", &Version::new(1, 2, 4)),
            "Release v1.2.4"
        );
    }

    #[test]
    fn test_validate_requires_token_unless_dry_run() {
        let config = Config::default();
        assert!(config.validate_for_release(&Secrets::default(), false).is_err());
        assert!(config.validate_for_release(&Secrets::default(), true).is_ok());
        assert!(config.validate_for_release(&secrets_with_token(), false).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_tag_pattern() {
        let mut config = Config::default();
        config.repository.tag_pattern = "release".to_string();
        assert!(config
            .validate_for_release(&secrets_with_token(), false)
            .is_err());
    }

    #[test]
    fn test_validate_version_pattern_needs_group() {
        let mut config = Config::default();
        config.version_file.path = Some(PathBuf::from("Cargo.toml"));
        config.version_file.pattern = r#"version = "\d+""#.to_string();
        assert!(config
            .validate_for_release(&secrets_with_token(), false)
            .is_err());
    }

    #[test]
    fn test_validate_reasoning_needs_endpoint() {
        let mut config = Config::default();
        config.reasoning.enabled = true;
        assert!(config
            .validate_for_release(&secrets_with_token(), false)
            .is_err());
        config.reasoning.endpoint = Some("http://localhost:8080/v1/assist".to_string());
        assert!(config
            .validate_for_release(&secrets_with_token(), false)
            .is_ok());
    }

    #[test]
    fn test_secrets_debug_redacts() {
        let secrets = Secrets {
            hosting_token: Some("ghp_secret".to_string()),
            reasoning_api_key: None,
            webhook_url: None,
        };
        let printed = format!("{:?}", secrets);
        assert!(!printed.contains("ghp_secret"));
        assert!(printed.contains("***"));
    }
}
