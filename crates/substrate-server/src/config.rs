// crates/substrate-server/src/config.rs
// ============================================================================
// Module: Substrate Server Configuration
// Description: Configuration loading and validation for the control-plane server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, substrate-core, substrate-store-sqlite
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits; missing or invalid configuration fails closed rather than
//! falling back to an implicit default. `deployment.env` here is the one
//! place an operator fixes a process's environment for the lifetime of its
//! boot — every resolved request context inherits it, never a header.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use substrate_core::Env;
use substrate_core::Mode;
use substrate_core::ResourceKind;
use substrate_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

const DEFAULT_CONFIG_NAME: &str = "substrate.toml";
const CONFIG_ENV_VAR: &str = "SUBSTRATE_CONFIG";
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_required_resource_kinds() -> Vec<ResourceKind> {
    vec![ResourceKind::RoutingRegistry, ResourceKind::EventStream, ResourceKind::BlackboardStore, ResourceKind::MemoryStore]
}

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// Root configuration for a substrate server process.
#[derive(Debug, Clone, Deserialize)]
pub struct SubstrateConfig {
    /// HTTP server bind and body-size configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Deployment-fixed environment and default mode.
    pub deployment: DeploymentConfig,
    /// SQLite store configuration backing the routing registry, event
    /// streams, blackboard, and audit chain.
    pub sqlite: SqliteStoreConfig,
    /// Root directory for the `lab`-mode filesystem object store adapter.
    #[serde(default = "default_lab_root")]
    pub lab_object_store_root: PathBuf,
    /// Resource kinds the startup validator must find a route for before
    /// the process accepts traffic.
    #[serde(default = "default_required_resource_kinds")]
    pub required_resource_kinds: Vec<ResourceKind>,
}

fn default_lab_root() -> PathBuf {
    PathBuf::from("var/object_store")
}

impl SubstrateConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// an explicit `path`, else `SUBSTRATE_CONFIG`, else `substrate.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_owned()));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_owned()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        if self.required_resource_kinds.is_empty() {
            return Err(ConfigError::Invalid("required_resource_kinds must not be empty".to_owned()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// HTTP bind and body-size configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_owned()
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("max_body_bytes must be greater than zero".to_owned()));
        }
        let _addr: SocketAddr = self.bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_owned()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Deployment Config
// ============================================================================

/// Fixes the deployment's environment and default operating mode at boot.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    /// Environment this process runs in; never client-suppliable.
    pub env: Env,
    /// Mode assumed when a request's `X-Mode` header is absent and the
    /// endpoint does not require it (health checks).
    #[serde(default = "default_mode")]
    pub default_mode: Mode,
}

const fn default_mode() -> Mode {
    Mode::Saas
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Path Resolution
// ============================================================================

fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_owned()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(body.as_bytes()).expect("write");
        file
    }

    #[test]
    fn loads_minimal_valid_config() {
        let file = write_config(
            r#"
            [deployment]
            env = "prod"

            [sqlite]
            path = "substrate.db"
            "#,
        );
        let config = SubstrateConfig::load(Some(file.path())).expect("loads");
        assert_eq!(config.deployment.env, Env::Prod);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn rejects_invalid_bind_address() {
        let file = write_config(
            r#"
            [server]
            bind = "not-an-address"

            [deployment]
            env = "dev"

            [sqlite]
            path = "substrate.db"
            "#,
        );
        let err = SubstrateConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_required_resource_kinds() {
        let file = write_config(
            r#"
            required_resource_kinds = []

            [deployment]
            env = "dev"

            [sqlite]
            path = "substrate.db"
            "#,
        );
        let err = SubstrateConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
