//! Node configuration.
//!
//! Every field has a default, so an empty TOML file is a valid configuration.
//!
//! ```toml
//! sql_addr = "127.0.0.1:5432"
//! rpc_addr = "127.0.0.1:50051"
//! region = "asia"
//! join = "10.0.0.1:50051"
//! data_dir = "./data/asia"
//! storage = "file"
//! registration = "idempotent"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cluster::{NodeDescriptor, RegistrationPolicy};

/// Errors from loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// Where the node keeps its catalog and rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Append-only log under `data_dir`.
    #[default]
    File,
    /// Volatile; lost on exit.
    Memory,
}

/// Configuration of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// SQL (wire protocol) listen address.
    #[serde(default = "default_sql_addr")]
    pub sql_addr: String,

    /// RPC listen address.
    #[serde(default = "default_rpc_addr")]
    pub rpc_addr: String,

    /// Region label matched by partition placement constraints.
    #[serde(default = "default_region")]
    pub region: String,

    /// RPC address of the bootstrap peer; empty for the first node.
    #[serde(default)]
    pub join: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub storage: StorageKind,

    #[serde(default)]
    pub registration: RegistrationPolicy,
}

fn default_sql_addr() -> String {
    "127.0.0.1:5432".to_string()
}

fn default_rpc_addr() -> String {
    "127.0.0.1:50051".to_string()
}

fn default_region() -> String {
    "default".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/default")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            sql_addr: default_sql_addr(),
            rpc_addr: default_rpc_addr(),
            region: default_region(),
            join: String::new(),
            data_dir: default_data_dir(),
            storage: StorageKind::default(),
            registration: RegistrationPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Path of the metadata log used by file storage.
    pub fn metadata_log(&self) -> PathBuf {
        self.data_dir.join("metadata.log")
    }

    /// Descriptor this node registers for itself.
    pub fn node_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            sql_address: self.sql_addr.clone(),
            rpc_address: self.rpc_addr.clone(),
            region: self.region.clone(),
            data_dir: self.data_dir.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.sql_addr, "127.0.0.1:5432");
        assert_eq!(config.storage, StorageKind::File);
        assert_eq!(config.registration, RegistrationPolicy::Idempotent);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
region = "asia"
join = "10.0.0.1:50051"
data_dir = "/var/lib/regiondb"
storage = "memory"
registration = "additive"
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.region, "asia");
        assert_eq!(config.join, "10.0.0.1:50051");
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.registration, RegistrationPolicy::Additive);
        assert_eq!(
            config.metadata_log(),
            PathBuf::from("/var/lib/regiondb/metadata.log")
        );
        assert_eq!(config.rpc_addr, "127.0.0.1:50051");
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "storage = \"tape\"").unwrap();
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));

        assert!(matches!(
            ServerConfig::from_file(Path::new("/nonexistent/regiondb.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_node_descriptor() {
        let config = ServerConfig {
            region: "eu".to_string(),
            ..ServerConfig::default()
        };
        let node = config.node_descriptor();
        assert_eq!(node.region, "eu");
        assert_eq!(node.rpc_address, "127.0.0.1:50051");
        assert_eq!(node.data_dir, "./data/default");
    }
}
