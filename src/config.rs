use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ReleaseError, Result};

/// File name looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "gitflow.toml";

/// File name looked up in the user config directory
pub const USER_CONFIG_FILE: &str = "gitflow-release.toml";

/// Represents the complete configuration for gitflow-release.
///
/// Contains the remote and long-lived branch names, release policy switches,
/// extra manifest files and store publishing settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub branches: BranchesConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub manifests: ManifestsConfig,

    #[serde(default)]
    pub publish: PublishConfig,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_develop() -> String {
    "develop".to_string()
}

fn default_master() -> String {
    "master".to_string()
}

fn default_true() -> bool {
    true
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_ci_branch_env() -> String {
    "DRONE_COMMIT_BRANCH".to_string()
}

/// Names of the two long-lived git-flow branches.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    #[serde(default = "default_develop")]
    pub develop: String,

    #[serde(default = "default_master")]
    pub master: String,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            develop: default_develop(),
            master: default_master(),
        }
    }
}

/// Switches for the behaviours the release scripts disagreed on.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Non-hotfix releases bump at least the minor component
    #[serde(default = "default_true")]
    pub promote_patch_to_minor: bool,

    /// Delete the local target branch once it has been merged and pushed
    #[serde(default)]
    pub delete_merged_branch: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            promote_patch_to_minor: true,
            delete_merged_branch: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ManifestsConfig {
    /// Version-carrying JSON files bumped in addition to the package manager's own
    #[serde(default)]
    pub extra: Vec<String>,
}

/// Settings for publishing the extension build to the web store.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PublishConfig {
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub extension_id: Option<String>,

    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Environment variable a CI system uses to announce the branch being built
    #[serde(default = "default_ci_branch_env")]
    pub ci_branch_env: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig {
            client_id: None,
            extension_id: None,
            build_dir: default_build_dir(),
            ci_branch_env: default_ci_branch_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote: default_remote(),
            branches: BranchesConfig::default(),
            policy: PolicyConfig::default(),
            manifests: ManifestsConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl Config {
    /// All manifest files a develop release rewrites for the given package manager.
    pub fn manifest_files(&self, package_manager: crate::domain::PackageManager) -> Vec<String> {
        let mut files = package_manager.manifest_files();
        for extra in &self.manifests.extra {
            if !files.contains(extra) {
                files.push(extra.clone());
            }
        }
        files
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitflow.toml` in current directory
/// 3. `gitflow-release.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)
            .map_err(|e| ReleaseError::config(format!("Cannot read '{}': {}", path, e)))?
    } else if Path::new(LOCAL_CONFIG_FILE).exists() {
        fs::read_to_string(LOCAL_CONFIG_FILE)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(USER_CONFIG_FILE);
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

/// Parse a TOML configuration string, filling in defaults for missing keys.
pub fn parse_config(config_str: &str) -> Result<Config> {
    toml::from_str(config_str).map_err(|e| ReleaseError::config(e.to_string()))
}
