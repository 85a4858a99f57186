//! Loading of the address-formatting `conf/` directory.
//!
//! The expected layout is the one published by the community
//! address-formatting project:
//!
//! ```text
//! conf/
//! ├── components.yaml      # one `{name, aliases}` document per component
//! ├── county_codes.yaml    # country -> code -> name | {lang: name}
//! ├── state_codes.yaml     # country -> code -> name | {lang: name}
//! └── countries/
//!     └── worldwide.yaml   # key -> template text | template mapping
//! ```

use crate::config::{AddressConfig, CodeTable, ComponentDefinition, Template};
use crate::error::{Error, Result};
use crate::types::scalar_to_string;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Directory holding the per-country template files.
pub const COUNTRIES_DIR: &str = "countries";
/// Component definitions file.
pub const COMPONENTS_FILE: &str = "components.yaml";
/// State code table file.
pub const STATE_CODES_FILE: &str = "state_codes.yaml";
/// County code table file.
pub const COUNTY_CODES_FILE: &str = "county_codes.yaml";

/// Load a complete configuration from a `conf/` directory.
///
/// # Errors
///
/// Returns an error when a required file is missing or unreadable, when a
/// file is not valid YAML, when a pattern does not compile, or when the
/// resulting configuration has no usable `default` template.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<AddressConfig> {
    let dir = dir.as_ref();

    let mut builder = AddressConfig::builder();
    let mut template_count = 0usize;
    for path in template_files(&dir.join(COUNTRIES_DIR))? {
        let templates = parse_templates(&read(&path)?)?;
        template_count += templates.len();
        for (key, template) in templates {
            builder = builder.template(key, template);
        }
    }

    let components = parse_components(&read(&dir.join(COMPONENTS_FILE))?)?;
    let state_codes = parse_code_table(&read(&dir.join(STATE_CODES_FILE))?)?;
    let county_codes = parse_code_table(&read(&dir.join(COUNTY_CODES_FILE))?)?;

    log::info!(
        "loaded {template_count} templates, {} components, state codes for {} and county codes for {} countries from {}",
        components.len(),
        state_codes.len(),
        county_codes.len(),
        dir.display()
    );

    builder
        .components(components)
        .state_codes(state_codes)
        .county_codes(county_codes)
        .build()
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::data_error(format!("Failed to read {}: {e}", path.display())))
}

/// `*.yaml` files of the countries directory, sorted by name.
fn template_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::data_error(format!("Failed to list {}: {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse a countries file into `(key, template)` pairs, in file order.
pub fn parse_templates(source: &str) -> Result<Vec<(String, Template)>> {
    let root: Value = serde_yaml::from_str(source)?;
    let Value::Mapping(entries) = root else {
        return Ok(Vec::new());
    };

    let mut templates = Vec::with_capacity(entries.len());
    for (key, entry) in &entries {
        let Some(key) = scalar_to_string(key) else {
            continue;
        };
        let template =
            parse_template(entry).inspect_err(|e| log::error!("invalid template `{key}`: {e}"))?;
        templates.push((key, template));
    }
    Ok(templates)
}

fn parse_template(entry: &Value) -> Result<Template> {
    let builder = Template::builder();
    let mapping = match entry {
        Value::String(text) => return builder.address_template(text).build(),
        Value::Mapping(mapping) => mapping,
        _ => return builder.build(),
    };

    let mut builder = builder;
    if let Some(text) = string_field(mapping, "address_template") {
        builder = builder.address_template(text);
    }
    if let Some(text) = string_field(mapping, "fallback_template") {
        builder = builder.fallback_template(text);
    }
    if let Some(code) = string_field(mapping, "use_country") {
        builder = builder.use_country(code);
    }
    if let Some(country) = string_field(mapping, "change_country") {
        builder = builder.change_country(country);
    }
    if let Some(pair) = string_field(mapping, "add_component") {
        builder = builder.add_component(pair);
    }
    for (from, to) in replacement_pairs(mapping.get("replace")) {
        builder = builder.replace(from, to);
    }
    for (from, to) in replacement_pairs(mapping.get("postformat_replace")) {
        builder = builder.postformat_replace(from, to);
    }
    builder.build()
}

fn string_field(mapping: &Mapping, key: &str) -> Option<String> {
    mapping.get(key).and_then(scalar_to_string)
}

/// Replacement lists are either a list of `[from, to]` pairs or a single
/// `[from, to]` pair.
fn replacement_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    let Some(Value::Sequence(items)) = value else {
        return Vec::new();
    };

    match items.first() {
        Some(Value::Sequence(_)) => items.iter().filter_map(pair).collect(),
        Some(Value::String(_)) => pair(&Value::Sequence(items.clone())).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn pair(value: &Value) -> Option<(String, String)> {
    match value.as_sequence()?.as_slice() {
        [from, to] => Some((scalar_to_string(from)?, scalar_to_string(to).unwrap_or_default())),
        _ => None,
    }
}

/// Parse the multi-document components file.
pub fn parse_components(source: &str) -> Result<Vec<ComponentDefinition>> {
    let mut definitions = Vec::new();
    for document in serde_yaml::Deserializer::from_str(source) {
        let value = Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        definitions.push(ComponentDefinition::deserialize(value)?);
    }
    Ok(definitions)
}

/// Parse a state or county code file.
pub fn parse_code_table(source: &str) -> Result<CodeTable> {
    let root: Value = serde_yaml::from_str(source)?;
    let mut table = CodeTable::new();

    let Value::Mapping(countries) = root else {
        return Ok(table);
    };
    for (country, codes) in &countries {
        let (Some(country), Value::Mapping(codes)) = (scalar_to_string(country), codes) else {
            continue;
        };
        for (code, names) in codes {
            let Some(code) = scalar_to_string(code) else {
                continue;
            };
            match names {
                Value::Mapping(localized) => {
                    for name in localized.values().filter_map(scalar_to_string) {
                        table.insert(&country, &code, &name);
                    }
                }
                other => {
                    if let Some(name) = scalar_to_string(other) {
                        table.insert(&country, &code, &name);
                    }
                }
            }
        }
    }
    Ok(table)
}
