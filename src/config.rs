//! In-memory address formatting configuration.
//!
//! An [`AddressConfig`] bundles everything the formatting pipeline reads:
//! the per-country [`Template`]s (one of which must be keyed `"default"`),
//! the ordered component definitions used for alias resolution, and the
//! state/county code tables. It is built once, validated, and never
//! mutated afterwards, so a single instance can be shared between threads.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

/// Key of the template used when a country has no template of its own.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Matches the `<component>=<literal>` form of a replacement source.
static COMPONENT_VALUE_RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("valid regex"));

/// Matches `$1`-style group references not already wrapped in braces.
static GROUP_REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("valid regex"));

/// A pre-render rewrite applied to component values.
#[derive(Debug, Clone)]
pub enum ReplaceRule {
    /// Replace the whole value of `component` with `to` when it equals `value`.
    ComponentValue {
        /// Component the rule is scoped to
        component: String,
        /// Exact value that triggers the rule
        value: String,
        /// Replacement value
        to: String,
    },
    /// Regex substitution applied to every component value.
    Pattern {
        /// Compiled pattern
        regex: Regex,
        /// Replacement text, with group references normalized
        to: String,
    },
}

impl ReplaceRule {
    /// Parse a `(from, to)` pair from the configuration.
    ///
    /// `from` of the form `city=Foo` becomes a [`ReplaceRule::ComponentValue`];
    /// anything else is compiled as a regular expression.
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        if let Some(captures) = COMPONENT_VALUE_RULE_RE.captures(from) {
            return Ok(Self::ComponentValue {
                component: captures[1].to_string(),
                value: captures[2].to_string(),
                to: to.to_string(),
            });
        }

        Ok(Self::Pattern {
            regex: compile(from)?,
            to: normalize_replacement(to),
        })
    }

    /// Apply the rule to one component value.
    pub fn apply(&self, component: &str, value: &str) -> Option<String> {
        match self {
            Self::ComponentValue {
                component: target,
                value: expected,
                to,
            } => (target == component && expected == value).then(|| to.clone()),
            Self::Pattern { regex, to } => match regex.replace_all(value, to.as_str()) {
                std::borrow::Cow::Borrowed(_) => None,
                std::borrow::Cow::Owned(replaced) => Some(replaced),
            },
        }
    }
}

/// A regex substitution applied to the rendered address text.
#[derive(Debug, Clone)]
pub struct PostformatRule {
    regex: Regex,
    to: String,
}

impl PostformatRule {
    /// Compile a `(from, to)` pair from the configuration.
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        Ok(Self {
            regex: compile(from)?,
            to: normalize_replacement(to),
        })
    }

    /// Apply the rule to the rendered text.
    pub fn apply(&self, text: &str) -> String {
        self.regex.replace_all(text, self.to.as_str()).into_owned()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::invalid_pattern(pattern, e))
}

/// Rewrite `$1` into `${1}` so that a following word character is not read
/// as part of the group name.
fn normalize_replacement(to: &str) -> String {
    GROUP_REFERENCE_RE.replace_all(to, "$${$1}").into_owned()
}

/// How a template's country code is reinterpreted before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CountryRule {
    /// The country code is used as is.
    #[default]
    None,
    /// Treat this country as `use_country`, optionally rewriting the
    /// `country` component and injecting an extra component.
    Redirect {
        /// Country code whose template is used instead
        use_country: String,
        /// New `country` value, may contain one `$component` placeholder
        change_country: Option<String>,
        /// Extra `(key, value)` component to inject
        add_component: Option<(String, String)>,
    },
}

/// How a territory override compares the `state` component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateMatch {
    /// Case-sensitive equality
    Exact(String),
    /// Case-insensitive equality
    IgnoreCase(String),
}

impl StateMatch {
    /// Whether `state` satisfies the match.
    pub fn matches(&self, state: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == state,
            Self::IgnoreCase(expected) => expected.to_lowercase() == state.to_lowercase(),
        }
    }
}

/// A constituent territory reported by geocoders as a state of its parent
/// country (e.g. Aruba as a state of the Netherlands).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryOverride {
    /// Condition on the `state` component
    pub state: StateMatch,
    /// Country code to use instead of the parent's
    pub country_code: String,
    /// Display name stored in the `country` component
    pub country: String,
}

impl TerritoryOverride {
    /// Create a new territory override.
    pub fn new(state: StateMatch, country_code: &str, country: &str) -> Self {
        Self {
            state,
            country_code: country_code.to_string(),
            country: country.to_string(),
        }
    }
}

/// The built-in territory overrides, keyed by parent country code.
pub fn default_territories() -> BTreeMap<String, Vec<TerritoryOverride>> {
    let mut territories = BTreeMap::new();
    territories.insert(
        "NL".to_string(),
        vec![
            TerritoryOverride::new(StateMatch::Exact("Curaçao".into()), "CW", "Curaçao"),
            TerritoryOverride::new(
                StateMatch::IgnoreCase("sint maarten".into()),
                "SX",
                "Sint Maarten",
            ),
            TerritoryOverride::new(StateMatch::IgnoreCase("Aruba".into()), "AW", "Aruba"),
        ],
    );
    territories
}

/// Per-country rendering configuration.
#[derive(Debug, Clone, Default)]
pub struct Template {
    /// Main template text
    pub address_template: Option<String>,
    /// Template used when the components are not "minimal"
    pub fallback_template: Option<String>,
    /// Country redirect rule
    pub country_rule: CountryRule,
    /// Rules applied to component values before rendering
    pub replace: Vec<ReplaceRule>,
    /// Rules applied to the rendered text
    pub postformat_replace: Vec<PostformatRule>,
}

impl Template {
    /// Create a template builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use address_formatter::Template;
    ///
    /// let template = Template::builder()
    ///     .address_template("{{{road}}} {{{house_number}}}\n{{{city}}}")
    ///     .replace("^Rue ", "R. ")
    ///     .build()?;
    ///
    /// assert_eq!(template.replace.len(), 1);
    /// # Ok::<(), address_formatter::Error>(())
    /// ```
    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::default()
    }
}

/// Builder for [`Template`]. Patterns are compiled in [`TemplateBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    address_template: Option<String>,
    fallback_template: Option<String>,
    use_country: Option<String>,
    change_country: Option<String>,
    add_component: Option<String>,
    replace: Vec<(String, String)>,
    postformat_replace: Vec<(String, String)>,
}

impl TemplateBuilder {
    /// Set the main template text.
    pub fn address_template(mut self, text: impl Into<String>) -> Self {
        self.address_template = Some(text.into());
        self
    }

    /// Set the fallback template text.
    pub fn fallback_template(mut self, text: impl Into<String>) -> Self {
        self.fallback_template = Some(text.into());
        self
    }

    /// Treat this country as another one.
    pub fn use_country(mut self, code: impl Into<String>) -> Self {
        self.use_country = Some(code.into());
        self
    }

    /// Rewrite the `country` component when redirecting.
    pub fn change_country(mut self, country: impl Into<String>) -> Self {
        self.change_country = Some(country.into());
        self
    }

    /// Inject a `key=value` component when redirecting.
    pub fn add_component(mut self, pair: impl Into<String>) -> Self {
        self.add_component = Some(pair.into());
        self
    }

    /// Append a pre-render replacement rule.
    pub fn replace(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replace.push((from.into(), to.into()));
        self
    }

    /// Append a postformat replacement rule.
    pub fn postformat_replace(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.postformat_replace.push((from.into(), to.into()));
        self
    }

    /// Compile the rules and build the template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for a pattern that does not compile
    /// and [`Error::ConfigError`] for a malformed `add_component`.
    /// `change_country` and `add_component` have no effect without
    /// `use_country`.
    pub fn build(self) -> Result<Template> {
        let add_component = self
            .add_component
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => Ok((key.to_string(), value.to_string())),
                None => Err(Error::config_error(format!(
                    "add_component `{pair}` is not of the form key=value"
                ))),
            })
            .transpose()?;

        let country_rule = match self.use_country {
            Some(use_country) => CountryRule::Redirect {
                use_country,
                change_country: self.change_country,
                add_component,
            },
            None => {
                if self.change_country.is_some() || add_component.is_some() {
                    log::warn!("change_country and add_component are ignored without use_country");
                }
                CountryRule::None
            }
        };

        let replace = self
            .replace
            .iter()
            .map(|(from, to)| ReplaceRule::parse(from, to))
            .collect::<Result<Vec<_>>>()?;

        let postformat_replace = self
            .postformat_replace
            .iter()
            .map(|(from, to)| PostformatRule::parse(from, to))
            .collect::<Result<Vec<_>>>()?;

        Ok(Template {
            address_template: self.address_template,
            fallback_template: self.fallback_template,
            country_rule,
            replace,
            postformat_replace,
        })
    }
}

/// A canonical component name and its aliases, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ComponentDefinition {
    /// Canonical component name
    pub name: String,
    /// Alternative names, first match wins during alias fill-in
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ComponentDefinition {
    /// Create a component definition.
    pub fn new<I, S>(name: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered component definitions plus an alias → canonical index.
#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    definitions: Vec<ComponentDefinition>,
    aliases: HashMap<String, String>,
}

impl ComponentTable {
    /// Build the table from definitions in declared order.
    ///
    /// A later definition with the same canonical name replaces the earlier one.
    pub fn new(definitions: impl IntoIterator<Item = ComponentDefinition>) -> Self {
        let mut table = Self::default();
        for definition in definitions {
            table.push(definition);
        }
        table
    }

    fn push(&mut self, definition: ComponentDefinition) {
        for alias in &definition.aliases {
            self.aliases.insert(alias.clone(), definition.name.clone());
        }
        match self.definitions.iter_mut().find(|d| d.name == definition.name) {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }

    /// Definitions in declared order.
    pub fn definitions(&self) -> &[ComponentDefinition] {
        &self.definitions
    }

    /// Canonical name for an alias.
    pub fn canonical_name(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Whether `name` is a canonical name or a known alias.
    pub fn is_known(&self, name: &str) -> bool {
        self.aliases.contains_key(name) || self.definitions.iter().any(|d| d.name == name)
    }
}

/// Country code → code → accepted (uppercased) display names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    countries: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl CodeTable {
    /// Create an empty code table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name for `code` in `country`.
    pub fn insert(&mut self, country: &str, code: &str, name: &str) {
        self.countries
            .entry(country.to_uppercase())
            .or_default()
            .entry(code.to_string())
            .or_default()
            .insert(name.to_uppercase());
    }

    /// Builder-style variant of [`CodeTable::insert`].
    pub fn with(mut self, country: &str, code: &str, name: &str) -> Self {
        self.insert(country, code, name);
        self
    }

    /// Look up the code whose accepted names contain `name`.
    ///
    /// Codes are visited in sorted order and the last match wins.
    pub fn lookup(&self, country: &str, name: &str) -> Option<&str> {
        let codes = self.countries.get(&country.to_uppercase())?;
        let name = name.to_uppercase();
        codes
            .iter()
            .filter(|(_, names)| names.contains(&name))
            .map(|(code, _)| code.as_str())
            .next_back()
    }

    /// Number of countries with at least one code.
    pub fn len(&self) -> usize {
        self.countries.len()
    }

    /// Whether the table holds no countries.
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// The complete, immutable formatting configuration.
#[derive(Debug, Clone)]
pub struct AddressConfig {
    templates: HashMap<String, Template>,
    components: ComponentTable,
    state_codes: CodeTable,
    county_codes: CodeTable,
    territories: BTreeMap<String, Vec<TerritoryOverride>>,
}

impl AddressConfig {
    /// Create a configuration builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use address_formatter::{AddressConfig, ComponentDefinition, Template};
    ///
    /// let config = AddressConfig::builder()
    ///     .template("default", Template::builder().address_template("{{{road}}}").build()?)
    ///     .component(ComponentDefinition::new("road", ["street"]))
    ///     .build()?;
    ///
    /// assert!(config.template("FR").address_template.is_some());
    /// # Ok::<(), address_formatter::Error>(())
    /// ```
    pub fn builder() -> AddressConfigBuilder {
        AddressConfigBuilder::new()
    }

    /// Template for a country code, falling back to `"default"`.
    pub fn template(&self, country_code: &str) -> &Template {
        self.templates
            .get(country_code)
            .unwrap_or_else(|| self.default_template())
    }

    /// Template registered under exactly `key`, if any.
    pub fn get_template(&self, key: &str) -> Option<&Template> {
        self.templates.get(key)
    }

    /// The `"default"` template.
    pub fn default_template(&self) -> &Template {
        &self.templates[DEFAULT_TEMPLATE]
    }

    /// Number of templates, including `"default"`.
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Component definitions and aliases.
    pub fn components(&self) -> &ComponentTable {
        &self.components
    }

    /// State code table.
    pub fn state_codes(&self) -> &CodeTable {
        &self.state_codes
    }

    /// County code table.
    pub fn county_codes(&self) -> &CodeTable {
        &self.county_codes
    }

    /// Territory overrides for a parent country code.
    pub fn territories(&self, country_code: &str) -> &[TerritoryOverride] {
        self.territories
            .get(country_code)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Builder for [`AddressConfig`].
#[derive(Debug, Clone)]
pub struct AddressConfigBuilder {
    templates: HashMap<String, Template>,
    components: Vec<ComponentDefinition>,
    state_codes: CodeTable,
    county_codes: CodeTable,
    territories: BTreeMap<String, Vec<TerritoryOverride>>,
}

impl AddressConfigBuilder {
    /// Create a builder holding the built-in territory overrides.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            components: Vec::new(),
            state_codes: CodeTable::new(),
            county_codes: CodeTable::new(),
            territories: default_territories(),
        }
    }

    /// Add or replace the template for `key`.
    pub fn template(mut self, key: impl Into<String>, template: Template) -> Self {
        self.templates.insert(key.into(), template);
        self
    }

    /// Append a component definition.
    pub fn component(mut self, definition: ComponentDefinition) -> Self {
        self.components.push(definition);
        self
    }

    /// Append several component definitions.
    pub fn components(mut self, definitions: impl IntoIterator<Item = ComponentDefinition>) -> Self {
        self.components.extend(definitions);
        self
    }

    /// Set the state code table.
    pub fn state_codes(mut self, table: CodeTable) -> Self {
        self.state_codes = table;
        self
    }

    /// Set the county code table.
    pub fn county_codes(mut self, table: CodeTable) -> Self {
        self.county_codes = table;
        self
    }

    /// Register an extra territory override under a parent country code.
    pub fn territory(mut self, parent: impl Into<String>, territory: TerritoryOverride) -> Self {
        self.territories.entry(parent.into()).or_default().push(territory);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when there is no `"default"` template or
    /// when it has no address template.
    pub fn build(self) -> Result<AddressConfig> {
        let default = self.templates.get(DEFAULT_TEMPLATE).ok_or_else(|| {
            Error::config_error(format!("missing `{DEFAULT_TEMPLATE}` template"))
        })?;

        if default
            .address_template
            .as_deref()
            .is_none_or(|t| t.trim().is_empty())
        {
            return Err(Error::config_error(format!(
                "`{DEFAULT_TEMPLATE}` template has no address_template"
            )));
        }

        Ok(AddressConfig {
            templates: self.templates,
            components: ComponentTable::new(self.components),
            state_codes: self.state_codes,
            county_codes: self.county_codes,
            territories: self.territories,
        })
    }
}

impl Default for AddressConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn default_template() -> Template {
        Template::builder()
            .address_template("{{{road}}}")
            .build()
            .unwrap()
    }

    #[test]
    fn test_component_value_rule() {
        let rule = ReplaceRule::parse("state=Distrito Federal", "DF").unwrap();
        assert_matches!(rule, ReplaceRule::ComponentValue { ref component, .. } if component == "state");

        assert_eq!(rule.apply("state", "Distrito Federal"), Some("DF".to_string()));
        assert_eq!(rule.apply("state", "Distrito Federal Norte"), None);
        assert_eq!(rule.apply("city", "Distrito Federal"), None);
    }

    #[test]
    fn test_pattern_rule_applies_to_any_component() {
        let rule = ReplaceRule::parse("^Rue ", "R. ").unwrap();
        assert_eq!(rule.apply("road", "Rue de Rivoli"), Some("R. de Rivoli".to_string()));
        assert_eq!(rule.apply("city", "Rue Village"), Some("R. Village".to_string()));
        assert_eq!(rule.apply("road", "Avenue Foch"), None);
    }

    #[test]
    fn test_group_references_are_normalized() {
        let rule = PostformatRule::parse(r"(\d{5}) (\w+)", "$2 $1x").unwrap();
        assert_eq!(rule.apply("75007 Paris"), "Paris 75007x");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = Template::builder()
            .address_template("{{{road}}}")
            .postformat_replace("(unclosed", "")
            .build();
        assert_matches!(result, Err(Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_redirect_rule() {
        let template = Template::builder()
            .use_country("FR")
            .change_country("France")
            .add_component("state=Guadeloupe")
            .build()
            .unwrap();

        assert_eq!(
            template.country_rule,
            CountryRule::Redirect {
                use_country: "FR".to_string(),
                change_country: Some("France".to_string()),
                add_component: Some(("state".to_string(), "Guadeloupe".to_string())),
            }
        );
    }

    #[test]
    fn test_malformed_add_component() {
        let result = Template::builder()
            .use_country("FR")
            .add_component("Guadeloupe")
            .build();
        assert_matches!(result, Err(Error::ConfigError { .. }));
    }

    #[test]
    fn test_change_country_without_redirect_is_ignored() {
        let template = Template::builder()
            .address_template("{{{road}}}")
            .change_country("France")
            .build()
            .unwrap();
        assert_eq!(template.country_rule, CountryRule::None);
    }

    #[test]
    fn test_missing_default_template() {
        let result = AddressConfig::builder()
            .template("FR", default_template())
            .build();
        assert_matches!(result, Err(Error::ConfigError { message }) if message.contains("default"));
    }

    #[test]
    fn test_default_template_without_text() {
        let result = AddressConfig::builder()
            .template("default", Template::default())
            .build();
        assert_matches!(result, Err(Error::ConfigError { .. }));
    }

    #[test]
    fn test_unknown_country_uses_default() {
        let config = AddressConfig::builder()
            .template("default", default_template())
            .build()
            .unwrap();

        assert_eq!(
            config.template("ZZ").address_template.as_deref(),
            Some("{{{road}}}")
        );
        assert!(config.get_template("ZZ").is_none());
    }

    #[test]
    fn test_component_table() {
        let table = ComponentTable::new([
            ComponentDefinition::new("road", ["street", "footway"]),
            ComponentDefinition::new("city", ["town"]),
        ]);

        assert_eq!(table.canonical_name("footway"), Some("road"));
        assert!(table.is_known("road"));
        assert!(table.is_known("town"));
        assert!(!table.is_known("viewpoint"));
        assert_eq!(table.definitions().len(), 2);
    }

    #[test]
    fn test_code_table_lookup_is_case_insensitive() {
        let table = CodeTable::new()
            .with("us", "CA", "California")
            .with("US", "NY", "New York");

        assert_eq!(table.lookup("US", "california"), Some("CA"));
        assert_eq!(table.lookup("us", "NEW YORK"), Some("NY"));
        assert_eq!(table.lookup("US", "Texas"), None);
        assert_eq!(table.lookup("DE", "California"), None);
    }

    #[test]
    fn test_code_table_last_match_wins() {
        let table = CodeTable::new()
            .with("GB", "ENG", "Shared")
            .with("GB", "SCT", "Shared");

        assert_eq!(table.lookup("GB", "shared"), Some("SCT"));
    }

    #[test]
    fn test_state_match() {
        assert!(StateMatch::Exact("Curaçao".into()).matches("Curaçao"));
        assert!(!StateMatch::Exact("Curaçao".into()).matches("curaçao"));
        assert!(StateMatch::IgnoreCase("sint maarten".into()).matches("Sint Maarten"));
    }
}
