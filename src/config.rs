use crate::error::{Result, StorefrontError};
use crate::upload::types::{GALLERY_CHUNK_SIZE, IMAGE_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_GALLERY_CHUNK_SIZE: u64 = GALLERY_CHUNK_SIZE;

pub const DEFAULT_IMAGE_CHUNK_SIZE: u64 = IMAGE_CHUNK_SIZE;

pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 3;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Maximum accepted file size for attachments (100MB)
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(rename = "serverUrl")]
    pub server_url: Option<String>,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(rename = "galleryChunkSize", default = "default_gallery_chunk_size")]
    pub gallery_chunk_size: u64,
    #[serde(rename = "imageChunkSize", default = "default_image_chunk_size")]
    pub image_chunk_size: u64,
    #[serde(
        rename = "maxConcurrentUploads",
        default = "default_max_concurrent_uploads"
    )]
    pub max_concurrent_uploads: usize,
    #[serde(rename = "requestTimeoutSecs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(rename = "maxUploadSize", default = "default_max_upload_size")]
    pub max_upload_size: u64,
    #[serde(rename = "verifyChecksum", default)]
    pub verify_checksum: bool,
}

fn default_gallery_chunk_size() -> u64 {
    DEFAULT_GALLERY_CHUNK_SIZE
}

fn default_image_chunk_size() -> u64 {
    DEFAULT_IMAGE_CHUNK_SIZE
}

fn default_max_concurrent_uploads() -> usize {
    DEFAULT_MAX_CONCURRENT_UPLOADS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            gallery_chunk_size: DEFAULT_GALLERY_CHUNK_SIZE,
            image_chunk_size: DEFAULT_IMAGE_CHUNK_SIZE,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            verify_checksum: false,
        }
    }
}

impl StorefrontConfig {
    /// Config pointing at `server_url` with every other field defaulted
    pub fn with_server(server_url: &str) -> Self {
        Self {
            server_url: Some(server_url.to_string()),
            ..Self::default()
        }
    }

    /// Parsed server base URL, always ending in `/` so endpoint joins keep any path prefix
    pub fn base_url(&self) -> Result<Url> {
        let raw = self
            .server_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StorefrontError::Config("No server URL configured".to_string()))?;

        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{}/", raw)
        };

        let url = Url::parse(&normalized)
            .map_err(|e| StorefrontError::Config(format!("Invalid server URL '{}': {}", raw, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(StorefrontError::Config(format!(
                "Unsupported server URL scheme '{}'",
                other
            ))),
        }
    }

    /// Resolve an endpoint path relative to the server base
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url()?
            .join(path.trim_start_matches('/'))
            .map_err(|e| StorefrontError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// `$STOREFRONT_HOME` if set, otherwise `~/.storefront`
pub fn get_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("STOREFRONT_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".storefront"))
        .ok_or_else(|| StorefrontError::Config("Could not find home directory".to_string()))
}

pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}

pub fn get_logs_dir() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("logs"))
}

/// Create `dir` (and parents) with owner-only permissions on Unix
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = fs::metadata(dir)?;
            let mut permissions = metadata.permissions();
            permissions.set_mode(0o700);
            fs::set_permissions(dir, permissions)?;
        }
    }
    Ok(())
}

pub fn ensure_config_dir() -> Result<()> {
    ensure_private_dir(&get_config_dir()?)
}

pub fn ensure_logs_dir() -> Result<()> {
    ensure_private_dir(&get_logs_dir()?)
}

pub fn load_config() -> Result<StorefrontConfig> {
    load_config_from(&get_config_dir()?)
}

pub fn save_config(config: &StorefrontConfig) -> Result<()> {
    save_config_to(&get_config_dir()?, config)
}

/// Load `config.json` from `dir`; a missing file yields defaults
pub fn load_config_from(dir: &Path) -> Result<StorefrontConfig> {
    ensure_private_dir(dir)?;

    let config_file = dir.join("config.json");

    if config_file.exists() {
        let content = fs::read_to_string(&config_file)?;
        let config: StorefrontConfig = serde_json::from_str(&content).map_err(|e| {
            StorefrontError::Config(format!("{}: {}", config_file.display(), e))
        })?;
        Ok(config)
    } else {
        Ok(StorefrontConfig::default())
    }
}

pub fn save_config_to(dir: &Path, config: &StorefrontConfig) -> Result<()> {
    ensure_private_dir(dir)?;

    let config_file = dir.join("config.json");
    let content = serde_json::to_string_pretty(config)?;

    fs::write(&config_file, content)?;

    // Set permissions to 600 (read/write for owner only) on Unix systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(&config_file)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(&config_file, permissions)?;
    }

    Ok(())
}
