//! Management of the address-formatting configuration directory.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration directory.
pub const CONF_DIR_ENV: &str = "ADDRESS_FORMATTING_CONF_DIR";

/// Archive of the community address-formatting repository.
pub const DEFAULT_ARCHIVE_URL: &str =
    "https://github.com/OpenCageData/address-formatting/archive/refs/heads/master.tar.gz";

/// Files that must be present for a directory to be usable.
const REQUIRED_FILES: &[&str] = &[
    "countries/worldwide.yaml",
    "components.yaml",
    "state_codes.yaml",
    "county_codes.yaml",
];

/// Directory of the archive that holds the configuration.
#[cfg(feature = "runtime-data")]
const ARCHIVE_CONF_DIR: &str = "conf";

/// Configuration directory manager.
#[derive(Debug, Clone)]
pub struct DataManager {
    data_dir: PathBuf,
    config: DataConfig,
}

impl DataManager {
    /// Create a new data manager with the default data directory.
    pub fn new() -> Self {
        Self::with_config(DataConfig::default())
    }

    /// Create a new data manager with a custom data directory.
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self::with_config(DataConfig {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..DataConfig::default()
        })
    }

    /// Create a new data manager with custom configuration.
    pub fn with_config(config: DataConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            config,
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the configuration.
    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    /// Check if the required configuration files are present.
    pub fn is_data_available(&self) -> bool {
        self.data_dir.is_dir() && REQUIRED_FILES.iter().all(|file| self.data_dir.join(file).is_file())
    }

    /// Verify that every required file exists and is non-empty.
    pub fn verify_data(&self) -> Result<()> {
        for file in REQUIRED_FILES {
            let path = self.data_dir.join(file);
            let metadata = std::fs::metadata(&path)
                .map_err(|e| Error::data_error(format!("Missing data file {file}: {e}")))?;

            if metadata.len() == 0 {
                return Err(Error::data_error(format!("Empty data file: {file}")));
            }
        }
        Ok(())
    }

    /// Get the total size of the data directory in bytes.
    pub fn data_size(&self) -> Result<u64> {
        if !self.data_dir.exists() {
            return Ok(0);
        }

        fn visit_dir(dir: &Path, total: &mut u64) -> std::io::Result<()> {
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let metadata = entry.metadata()?;

                if metadata.is_dir() {
                    visit_dir(&entry.path(), total)?;
                } else {
                    *total += metadata.len();
                }
            }
            Ok(())
        }

        let mut total_size = 0u64;
        visit_dir(&self.data_dir, &mut total_size)
            .map_err(|e| Error::data_error(format!("Failed to calculate data size: {e}")))?;
        Ok(total_size)
    }

    /// Remove the data directory.
    pub fn cleanup(&self) -> Result<()> {
        if self.data_dir.exists() {
            std::fs::remove_dir_all(&self.data_dir).map_err(|e| {
                Error::data_error(format!("Failed to cleanup data directory: {e}"))
            })?;
        }
        Ok(())
    }

    /// Ensure the configuration is available, downloading it if allowed.
    #[cfg(feature = "runtime-data")]
    pub async fn ensure_data(&self) -> Result<()> {
        if !self.is_data_available() {
            if !self.config.auto_download {
                return Err(Error::data_error(format!(
                    "Configuration not found in {} and auto_download is disabled",
                    self.data_dir.display()
                )));
            }
            self.download_data().await?;
        }

        if self.config.verify_integrity {
            self.verify_data()?;
        }
        Ok(())
    }

    /// Download the configuration archive and extract its `conf/` tree.
    #[cfg(feature = "runtime-data")]
    pub async fn download_data(&self) -> Result<()> {
        use futures::StreamExt;

        let url = &self.config.base_url;
        log::info!("downloading address-formatting configuration from {url}");

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .build()
            .map_err(|e| Error::network_error(format!("Failed to build HTTP client: {e}")))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network_error(format!("Failed to download {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::network_error(format!(
                "Download failed with status: {}",
                response.status()
            )));
        }

        let mut archive = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| Error::network_error(format!("Failed to read response: {e}")))?;
            archive.extend_from_slice(&chunk);
        }
        log::info!("downloaded {} bytes, extracting", archive.len());

        let data_dir = self.data_dir.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_conf(&archive, &data_dir))
            .await
            .map_err(|e| Error::data_error(format!("Extraction task failed: {e}")))??;

        log::info!("extracted {extracted} files into {}", self.data_dir.display());
        Ok(())
    }
}

impl Default for DataManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Unpack the entries under `<top-level>/conf/` of a gzipped tarball into
/// `data_dir`. Returns the number of files written.
#[cfg(feature = "runtime-data")]
pub fn extract_conf(archive: &[u8], data_dir: &Path) -> Result<usize> {
    use flate2::read::GzDecoder;
    use std::path::Component;
    use tar::Archive;

    std::fs::create_dir_all(data_dir)
        .map_err(|e| Error::data_error(format!("Failed to create data directory: {e}")))?;

    let mut archive = Archive::new(GzDecoder::new(archive));
    let entries = archive
        .entries()
        .map_err(|e| Error::data_error(format!("Failed to read archive: {e}")))?;

    let mut extracted = 0;
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::data_error(format!("Corrupt archive entry: {e}")))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.into_owned();
        let mut parts = path.components().skip(1);
        if parts.next() != Some(Component::Normal(ARCHIVE_CONF_DIR.as_ref())) {
            continue;
        }
        let relative: PathBuf = parts.collect();
        if relative.as_os_str().is_empty()
            || !relative.components().all(|c| matches!(c, Component::Normal(_)))
        {
            continue;
        }

        let target = data_dir.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&target).map_err(|e| {
            Error::data_error(format!("Failed to extract {}: {e}", relative.display()))
        })?;
        extracted += 1;
    }

    if extracted == 0 {
        return Err(Error::data_error("Archive contains no conf/ directory"));
    }
    Ok(extracted)
}

/// Get the default configuration directory.
pub fn default_data_dir() -> PathBuf {
    if let Ok(env_data_dir) = std::env::var(CONF_DIR_ENV) {
        let path = PathBuf::from(env_data_dir);
        if path.exists() {
            return path;
        }
    }

    // Checkout of the address-formatting repository next to the project
    let project_data_dir = PathBuf::from("conf");
    if project_data_dir.exists() {
        return project_data_dir;
    }

    match dirs::cache_dir() {
        Some(cache_dir) => cache_dir.join("address-formatter-rs"),
        None => PathBuf::from(".address-formatter-rs"),
    }
}

/// Configuration for data management.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Data directory path
    pub data_dir: PathBuf,
    /// Whether to download data automatically
    pub auto_download: bool,
    /// Whether to verify data integrity
    pub verify_integrity: bool,
    /// URL of the gzipped address-formatting archive
    pub base_url: String,
    /// Timeout for downloads
    pub timeout_seconds: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            auto_download: true,
            verify_integrity: true,
            base_url: DEFAULT_ARCHIVE_URL.to_string(),
            timeout_seconds: 300,
        }
    }
}
