use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub mode: OperationMode,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub resolution: ResolutionConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Fast,      // Cache aggressively, short timeouts
    Accurate,  // Always fresh, patient retries
    Balanced,  // Default
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_json_retries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Namespace for v5 entity ids. Changing it changes every id.
    pub id_namespace: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_concurrent_llm_calls: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Balanced,
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            resolution: ResolutionConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            max_json_retries: 3,
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            id_namespace: extract::DEFAULT_NAMESPACE,
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_llm_calls: 3,
            request_timeout_secs: 60,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10000,
        }
    }
}

impl AppConfig {
    pub fn fast_mode() -> Self {
        Self {
            mode: OperationMode::Fast,
            concurrency: ConcurrencyConfig {
                max_concurrent_llm_calls: 10,
                request_timeout_secs: 30,
            },
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 500,
                max_backoff_ms: 5000,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 50000,
            },
            ..Self::default()
        }
    }

    pub fn accurate_mode() -> Self {
        Self {
            mode: OperationMode::Accurate,
            concurrency: ConcurrencyConfig {
                max_concurrent_llm_calls: 2,
                request_timeout_secs: 120,
            },
            retry: RetryConfig {
                max_retries: 5,
                initial_backoff_ms: 2000,
                max_backoff_ms: 20000,
            },
            cache: CacheConfig {
                enabled: false,
                max_entries: 0,
            },
            ..Self::default()
        }
    }

    fn for_mode(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Fast => Self::fast_mode(),
            OperationMode::Accurate => Self::accurate_mode(),
            OperationMode::Balanced => Self::default(),
        }
    }

    /// Defaults, then `$CIDOC_CONFIG` (JSON), then environment overrides.
    pub fn load() -> Result<Self> {
        let base = match std::env::var("CIDOC_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn with_overrides<F>(self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("CIDOC_MODE") {
            Some(mode) => {
                let mode: OperationMode = serde_json::from_value(serde_json::Value::String(mode.to_lowercase()))
                    .with_context(|| format!("Invalid CIDOC_MODE {:?}", mode))?;
                Self {
                    server: self.server,
                    llm: self.llm,
                    resolution: self.resolution,
                    ..Self::for_mode(mode)
                }
            }
            None => self,
        };

        if let Some(addr) = lookup("CIDOC_BIND") {
            config.server.bind_addr = addr;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            config.llm.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            config.llm.model = model;
        }
        if let Some(namespace) = lookup("CIDOC_ID_NAMESPACE") {
            config.resolution.id_namespace = Uuid::parse_str(namespace.trim())
                .with_context(|| format!("Invalid CIDOC_ID_NAMESPACE {:?}", namespace))?;
        }

        Ok(config)
    }
}
