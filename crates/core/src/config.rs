//! Configuration management for MediGuide.
//!
//! This module handles loading and merging configuration from multiple sources,
//! in increasing order of precedence:
//! - Built-in defaults
//! - Config file (`mediguide.yaml` in the workspace, or `MEDIGUIDE_CONFIG`)
//! - Environment variables (a `.env` file in the working directory is honoured)
//! - Command-line flags
//!
//! Relative paths in the configuration are resolved against the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Environment variable holding the Google Generative Language API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Default config file name inside the workspace.
pub const DEFAULT_CONFIG_FILE: &str = "mediguide.yaml";

/// Known completion providers.
pub const LLM_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Known embedding providers.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["gemini", "ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root; relative paths resolve against it
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Persisted vector index settings
    pub index: IndexConfig,

    /// Document ingestion settings
    pub ingest: IngestConfig,

    /// Completion model settings
    pub llm: LlmConfig,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Prompt template settings
    pub prompt: PromptConfig,

    /// API key for Google-hosted models
    #[serde(skip_serializing)]
    pub google_api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index directory (holds `index.sqlite`)
    pub path: PathBuf,

    /// Number of chunks retrieved per question
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("medical_index"),
            top_k: 3,
        }
    }
}

/// Document ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory scanned for PDF files
    pub data_dir: PathBuf,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            chunk_size: 500,
            chunk_overlap: 20,
        }
    }
}

/// Completion model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider identifier ("gemini", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Optional custom endpoint
    pub endpoint: Option<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            endpoint: None,
            timeout_secs: 120,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider identifier ("gemini", "ollama", "trigram")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Optional custom endpoint
    pub endpoint: Option<String>,

    /// Maximum texts per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            dimensions: 768,
            endpoint: None,
            batch_size: 100,
        }
    }
}

/// Prompt template settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// YAML prompt definition overriding the built-in template
    pub template_file: Option<PathBuf>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    server: Option<ServerSection>,
    index: Option<IndexSection>,
    ingest: Option<IngestSection>,
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingSection>,
    prompt: Option<PromptSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexSection {
    path: Option<PathBuf>,
    #[serde(rename = "topK")]
    top_k: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct IngestSection {
    #[serde(rename = "dataDir")]
    data_dir: Option<PathBuf>,
    #[serde(rename = "chunkSize")]
    chunk_size: Option<usize>,
    #[serde(rename = "chunkOverlap")]
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
    #[serde(rename = "batchSize")]
    batch_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct PromptSection {
    #[serde(rename = "templateFile")]
    template_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            server: ServerConfig::default(),
            index: IndexConfig::default(),
            ingest: IngestConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingSettings::default(),
            prompt: PromptConfig::default(),
            google_api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `MEDIGUIDE_WORKSPACE`: Override workspace path
    /// - `MEDIGUIDE_CONFIG`: Path to config file
    /// - `MEDIGUIDE_HOST` / `MEDIGUIDE_PORT`: Server bind address
    /// - `MEDIGUIDE_INDEX`: Index directory
    /// - `MEDIGUIDE_DATA_DIR`: PDF directory
    /// - `MEDIGUIDE_LLM_PROVIDER` / `MEDIGUIDE_MODEL`: Completion model
    /// - `MEDIGUIDE_EMBEDDING_PROVIDER`: Embedding provider
    /// - `GOOGLE_API_KEY`: API key for Gemini
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use mediguide_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration for an explicit workspace and config file.
    ///
    /// `None` falls back to `MEDIGUIDE_WORKSPACE` / `MEDIGUIDE_CONFIG`, then
    /// to the current directory and `mediguide.yaml`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        // A missing .env file is not an error. Runs before logging is set up.
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("MEDIGUIDE_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("MEDIGUIDE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config.config_path();
        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env()?;

        Ok(config)
    }

    /// Path of the config file that `load` reads.
    pub fn config_path(&self) -> PathBuf {
        match self.config_file {
            Some(ref cf) => self.resolve_path(cf),
            None => self.workspace.join(DEFAULT_CONFIG_FILE),
        }
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(host) = std::env::var("MEDIGUIDE_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("MEDIGUIDE_PORT") {
            self.server.port = parse_port(&port)?;
        }

        if let Ok(index) = std::env::var("MEDIGUIDE_INDEX") {
            self.index.path = PathBuf::from(index);
        }

        if let Ok(data_dir) = std::env::var("MEDIGUIDE_DATA_DIR") {
            self.ingest.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(provider) = std::env::var("MEDIGUIDE_LLM_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("MEDIGUIDE_MODEL") {
            self.llm.model = model;
        }

        if let Ok(provider) = std::env::var("MEDIGUIDE_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        self.google_api_key = std::env::var(GOOGLE_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(server) = file.server {
            if let Some(host) = server.host {
                result.server.host = host;
            }
            if let Some(port) = server.port {
                result.server.port = port;
            }
        }

        if let Some(index) = file.index {
            if let Some(path) = index.path {
                result.index.path = path;
            }
            if let Some(top_k) = index.top_k {
                result.index.top_k = top_k;
            }
        }

        if let Some(ingest) = file.ingest {
            if let Some(data_dir) = ingest.data_dir {
                result.ingest.data_dir = data_dir;
            }
            if let Some(chunk_size) = ingest.chunk_size {
                result.ingest.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = ingest.chunk_overlap {
                result.ingest.chunk_overlap = chunk_overlap;
            }
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                result.llm.provider = provider;
            }
            if let Some(model) = llm.model {
                result.llm.model = model;
            }
            if llm.endpoint.is_some() {
                result.llm.endpoint = llm.endpoint;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                result.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
            if embedding.endpoint.is_some() {
                result.embedding.endpoint = embedding.endpoint;
            }
            if let Some(batch_size) = embedding.batch_size {
                result.embedding.batch_size = batch_size;
            }
        }

        if let Some(prompt) = file.prompt {
            if prompt.template_file.is_some() {
                result.prompt.template_file = prompt.template_file;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables
    /// and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        llm_provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = llm_provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Resolve a possibly relative path against the workspace.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Absolute index directory.
    pub fn index_path(&self) -> PathBuf {
        self.resolve_path(&self.index.path)
    }

    /// Absolute PDF directory.
    pub fn data_dir(&self) -> PathBuf {
        self.resolve_path(&self.ingest.data_dir)
    }

    /// Absolute prompt template file, if one is configured.
    pub fn prompt_template_path(&self) -> Option<PathBuf> {
        self.prompt
            .template_file
            .as_ref()
            .map(|p| self.resolve_path(p))
    }

    /// Validate everything `serve` and `ask` need, including the LLM key.
    pub fn validate_serving(&self) -> AppResult<()> {
        self.validate()?;

        if self.llm.provider == "gemini" {
            self.require_google_key()?;
        }

        Ok(())
    }

    /// Validate configuration before any network or disk work starts.
    ///
    /// Only the embedding provider's key is required here; ingestion never
    /// calls the LLM.
    pub fn validate(&self) -> AppResult<()> {
        if !LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                LLM_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("LLM model cannot be empty".to_string()));
        }

        if self.index.top_k == 0 {
            return Err(AppError::Config("index.topK must be at least 1".to_string()));
        }

        if self.ingest.chunk_size == 0 {
            return Err(AppError::Config(
                "ingest.chunkSize must be at least 1".to_string(),
            ));
        }

        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(AppError::Config(format!(
                "ingest.chunkOverlap ({}) must be smaller than ingest.chunkSize ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }

        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.dimensions and embedding.batchSize must be at least 1".to_string(),
            ));
        }

        if self.embedding.provider == "gemini" {
            self.require_google_key()?;
        }

        Ok(())
    }

    fn require_google_key(&self) -> AppResult<()> {
        match self.google_api_key {
            Some(_) => Ok(()),
            None => Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                GOOGLE_API_KEY_ENV
            ))),
        }
    }
}

fn parse_port(value: &str) -> AppResult<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("Invalid MEDIGUIDE_PORT: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".to_string();
        config.llm.model = "llama3.2".to_string();
        config.embedding.provider = "trigram".to_string();
        config.embedding.model = "trigram-v1".to_string();
        config.embedding.dimensions = 384;
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.index.top_k, 3);
        assert_eq!(config.ingest.chunk_size, 500);
        assert_eq!(config.ingest.chunk_overlap, 20);
        assert_eq!(config.server.port, 5000);
        assert!(!config.verbose);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.llm.provider, "ollama");
        assert_eq!(overridden.llm.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_resolve_path() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/mediguide");

        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/mediguide/medical_index")
        );
        assert_eq!(
            config.resolve_path(Path::new("/abs/data")),
            PathBuf::from("/abs/data")
        );
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
server:
  port: 8080
index:
  path: idx
  topK: 5
ingest:
  chunkSize: 800
llm:
  provider: ollama
  model: llama3.2
  endpoint: http://localhost:11434
embedding:
  provider: trigram
  dimensions: 128
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.server.port, 8080);
        assert_eq!(merged.server.host, "127.0.0.1");
        assert_eq!(merged.index.path, PathBuf::from("idx"));
        assert_eq!(merged.index.top_k, 5);
        assert_eq!(merged.ingest.chunk_size, 800);
        assert_eq!(merged.ingest.chunk_overlap, 20);
        assert_eq!(merged.llm.provider, "ollama");
        assert_eq!(
            merged.llm.endpoint.as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(merged.embedding.provider, "trigram");
        assert_eq!(merged.embedding.dimensions, 128);
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_reads_workspace_config() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(DEFAULT_CONFIG_FILE),
            "index:\n  topK: 7\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.index.top_k, 7);
    }

    #[test]
    fn test_load_from_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(
            Some(temp.path().to_path_buf()),
            Some(PathBuf::from("missing.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "server: [unclosed").unwrap();

        assert!(AppConfig::default().merge_yaml(&path).is_err());
    }

    #[test]
    fn test_validate_offline_config() {
        assert!(offline_config().validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = offline_config();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());

        let mut config = offline_config();
        config.embedding.provider = "faiss".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serving_requires_google_key_for_gemini_llm() {
        let mut config = offline_config();
        config.llm.provider = "gemini".to_string();
        config.google_api_key = None;

        let err = config.validate_serving().unwrap_err();
        assert!(err.to_string().contains(GOOGLE_API_KEY_ENV));

        config.google_api_key = Some("test-key".to_string());
        assert!(config.validate_serving().is_ok());
    }

    #[test]
    fn test_port_from_env_must_be_numeric() {
        assert_eq!(parse_port("8080").unwrap(), 8080);
        assert_eq!(parse_port(" 9000 ").unwrap(), 9000);

        let err = parse_port("eighty").unwrap_err();
        assert!(err.to_string().contains("Invalid MEDIGUIDE_PORT"));
        assert!(parse_port("70000").is_err());
    }

    #[test]
    fn test_offline_ingest_needs_no_google_key() {
        let mut config = AppConfig::default();
        config.embedding.provider = "trigram".to_string();
        config.google_api_key = None;

        assert_eq!(config.llm.provider, "gemini");
        assert!(config.validate().is_ok());
        assert!(config.validate_serving().is_err());
    }

    #[test]
    fn test_gemini_embeddings_require_google_key() {
        let mut config = offline_config();
        config.embedding.provider = "gemini".to_string();
        config.google_api_key = None;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(GOOGLE_API_KEY_ENV));
    }

    #[test]
    fn test_validate_chunk_overlap() {
        let mut config = offline_config();
        config.ingest.chunk_overlap = config.ingest.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_top_k() {
        let mut config = offline_config();
        config.index.top_k = 0;
        assert!(config.validate().is_err());
    }
}
