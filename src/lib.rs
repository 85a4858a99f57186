//! # address-formatter
//!
//! Format loosely structured address components, as produced by geocoders,
//! into human-readable postal addresses following each country's
//! conventions.
//!
//! Formatting is driven entirely by the declarative templates of the
//! community address-formatting project: per-country templates, component
//! aliases, and state and county code tables.
//!
//! ## Features
//!
//! - **Component normalization**: alias resolution, district
//!   reclassification, garbage filtering and code derivation
//! - **Country rules**: redirects between country templates and territory
//!   overrides
//! - **Template rendering**: placeholders and `{{#first}}` alternatives
//! - **Idempotent cleanup**: whitespace, dangling separators, repeated lines
//!   and segments
//! - **Thread Safe**: one loaded configuration can serve concurrent requests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use address_formatter::{AddressFormatter, Components};
//!
//! # async fn run() -> address_formatter::Result<()> {
//! // Locate (and on first run download) the configuration
//! let formatter = AddressFormatter::new().await?;
//!
//! let components: Components = [
//!     ("road", "Avenue Gustave Eiffel"),
//!     ("postcode", "75007"),
//!     ("city", "Paris"),
//!     ("country", "France"),
//!     ("country_code", "fr"),
//! ]
//! .into_iter()
//! .collect();
//!
//! println!("{}", formatter.format_address(components));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cleaner;
pub mod config;
pub mod data;
pub mod error;
pub mod loader;
pub mod normalizer;
pub mod render;
pub mod selector;
pub mod types;

// Re-export main API
pub use cleaner::clean;
pub use config::{
    AddressConfig, AddressConfigBuilder, CodeTable, ComponentDefinition, ComponentTable,
    CountryRule, PostformatRule, ReplaceRule, StateMatch, Template, TemplateBuilder,
    TerritoryOverride,
};
pub use error::{Error, Result};
pub use normalizer::ComponentNormalizer;
pub use selector::TemplateSelector;
pub use types::*;

use std::path::Path;
use std::sync::Arc;

/// Main entry point for address formatting.
///
/// The formatter holds a loaded [`AddressConfig`] behind an [`Arc`]; cloning
/// it is cheap and clones share the configuration.
///
/// # Examples
///
/// ```rust
/// use address_formatter::{AddressConfig, AddressFormatter, Components, Template};
///
/// let config = AddressConfig::builder()
///     .template(
///         "default",
///         Template::builder()
///             .address_template("{{{house_number}}} {{{road}}}\n{{{city}}}")
///             .build()?,
///     )
///     .build()?;
/// let formatter = AddressFormatter::from_config(config);
///
/// let components: Components = [("road", "Main St"), ("house_number", "12"), ("city", "Springfield")]
///     .into_iter()
///     .collect();
/// assert_eq!(formatter.format_address(components), "12 Main St\nSpringfield");
/// # Ok::<(), address_formatter::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AddressFormatter {
    config: Arc<AddressConfig>,
}

impl AddressFormatter {
    /// Initialize with the default configuration.
    ///
    /// This locates the configuration directory and, on first run, may
    /// download it.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration cannot be found, downloaded
    /// or loaded.
    pub async fn new() -> Result<Self> {
        Self::with_config(FormatterConfig::default()).await
    }

    /// Initialize with a custom configuration.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use address_formatter::{AddressFormatter, FormatterConfig};
    ///
    /// # async fn run() -> address_formatter::Result<()> {
    /// let config = FormatterConfig::builder()
    ///     .data_dir("/srv/address-formatting/conf")
    ///     .auto_download_data(false)
    ///     .build();
    ///
    /// let formatter = AddressFormatter::with_config(config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_config(config: FormatterConfig) -> Result<Self> {
        let mut data_config = config.data_config;
        data_config.auto_download = config.auto_download_data;
        data_config.verify_integrity = config.verify_data_integrity;
        let data_manager = data::DataManager::with_config(data_config);

        #[cfg(feature = "runtime-data")]
        {
            data_manager.ensure_data().await?;
        }
        #[cfg(not(feature = "runtime-data"))]
        {
            if !data_manager.is_data_available() {
                return Err(Error::data_error(
                    "Configuration not available and runtime-data feature disabled",
                ));
            }
            if config.verify_data_integrity {
                data_manager.verify_data()?;
            }
        }

        Self::from_dir(data_manager.data_dir())
    }

    /// Load the configuration directory at `dir`.
    ///
    /// # Errors
    ///
    /// See [`loader::load_dir`].
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        loader::load_dir(dir).map(Self::from_config)
    }

    /// Wrap an already built configuration.
    pub fn from_config(config: AddressConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The configuration used by this instance.
    pub fn config(&self) -> &AddressConfig {
        &self.config
    }

    /// Format `components` into a multi-line address.
    pub fn format_address(&self, components: Components) -> String {
        let (components, template) = ComponentNormalizer::new(&self.config).normalize(components);
        let text = TemplateSelector::new(&self.config).select(&components, template);

        let mut rendered = clean(&render::render(&components, &text));
        for rule in &template.postformat_replace {
            rendered = rule.apply(&rendered);
        }
        clean(&rendered)
    }

    /// The synthesized attention value of `components`: the joined values of
    /// unknown components, typically a venue or POI name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use address_formatter::{AddressConfig, AddressFormatter, ComponentDefinition, Components, Template};
    ///
    /// let config = AddressConfig::builder()
    ///     .template("default", Template::builder().address_template("{{{road}}}").build()?)
    ///     .component(ComponentDefinition::new("road", ["street"]))
    ///     .build()?;
    /// let formatter = AddressFormatter::from_config(config);
    ///
    /// let components: Components = [("viewpoint", "Tour Eiffel 3e étage"), ("street", "Avenue Anatole France")]
    ///     .into_iter()
    ///     .collect();
    /// assert_eq!(formatter.guess_name(components).as_deref(), Some("Tour Eiffel 3e étage"));
    /// # Ok::<(), address_formatter::Error>(())
    /// ```
    pub fn guess_name(&self, components: Components) -> Option<String> {
        let (mut components, _) = ComponentNormalizer::new(&self.config).normalize(components);
        components.remove(names::ATTENTION)
    }

    /// Names of the components that are neither canonical nor known
    /// aliases, in sorted order.
    pub fn guess_type_candidates(&self, mut components: Components) -> Vec<String> {
        let normalizer = ComponentNormalizer::new(&self.config);
        normalizer.sanitize(&mut components);
        normalizer.unknown_components(&components)
    }

    /// Format every component set, in order.
    pub fn format_batch(&self, batch: &[Components]) -> Vec<String> {
        batch
            .iter()
            .map(|components| self.format_address(components.clone()))
            .collect()
    }

    /// Format every component set on the rayon thread pool. The output
    /// order matches the input order.
    #[cfg(feature = "parallel")]
    pub fn format_batch_parallel(&self, batch: &[Components]) -> Vec<String> {
        use rayon::prelude::*;

        batch
            .par_iter()
            .map(|components| self.format_address(components.clone()))
            .collect()
    }
}

/// Configuration for [`AddressFormatter`] initialization.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Whether to automatically download the configuration if missing
    pub auto_download_data: bool,

    /// Whether to verify the configuration files before loading
    pub verify_data_integrity: bool,

    /// Data management configuration
    pub data_config: data::DataConfig,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            auto_download_data: true,
            verify_data_integrity: true,
            data_config: data::DataConfig::default(),
        }
    }
}

impl FormatterConfig {
    /// Create a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use address_formatter::FormatterConfig;
    ///
    /// let config = FormatterConfig::builder()
    ///     .auto_download_data(false)
    ///     .verify_data_integrity(true)
    ///     .build();
    /// assert!(!config.auto_download_data);
    /// ```
    pub fn builder() -> FormatterConfigBuilder {
        FormatterConfigBuilder::new()
    }
}

/// Builder for FormatterConfig.
#[derive(Debug, Clone)]
pub struct FormatterConfigBuilder {
    auto_download_data: bool,
    verify_data_integrity: bool,
    data_config: data::DataConfig,
}

impl FormatterConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            auto_download_data: true,
            verify_data_integrity: true,
            data_config: data::DataConfig::default(),
        }
    }

    /// Set whether to automatically download the configuration.
    pub fn auto_download_data(mut self, enabled: bool) -> Self {
        self.auto_download_data = enabled;
        self
    }

    /// Set whether to verify the configuration files.
    pub fn verify_data_integrity(mut self, enabled: bool) -> Self {
        self.verify_data_integrity = enabled;
        self
    }

    /// Set the data configuration.
    pub fn data_config(mut self, config: data::DataConfig) -> Self {
        self.data_config = config;
        self
    }

    /// Set a custom configuration directory.
    pub fn data_dir<P: Into<std::path::PathBuf>>(mut self, dir: P) -> Self {
        self.data_config.data_dir = dir.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> FormatterConfig {
        FormatterConfig {
            auto_download_data: self.auto_download_data,
            verify_data_integrity: self.verify_data_integrity,
            data_config: self.data_config,
        }
    }
}

impl Default for FormatterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
