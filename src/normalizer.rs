//! Component normalization.
//!
//! Turns the loosely-structured key/value output of a geocoder into the
//! canonical component set the templates are written against. The steps
//! run in a fixed order because later steps read what earlier ones wrote:
//!
//! 1. country code resolution (redirects, territory overrides)
//! 2. district reclassification
//! 3. alias fill-in
//! 4. sanity cleaning of garbage values
//! 5. country/state fix-ups
//! 6. template replacement rules
//! 7. state/county code derivation
//! 8. attention synthesis from unknown components

use crate::config::{AddressConfig, CountryRule, Template};
use crate::types::{names, Components};
use regex::Regex;
use std::sync::LazyLock;

/// Countries too small to have a district between city and state; their
/// `district` is a neighbourhood.
const SMALL_DISTRICT_COUNTRIES: &[&str] = &["BR", "CR", "ES", "NI", "PY", "RO", "TG", "TM", "XK"];

/// Postcodes longer than this are geocoder garbage.
const MAX_POSTCODE_LEN: usize = 20;

static CHANGE_COUNTRY_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\w+)").expect("valid regex"));

static MULTI_POSTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+;[0-9]+$").expect("valid regex"));

static PAIRED_POSTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{5}),[0-9]{5}").expect("valid regex"));

static UNITED_STATES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^united states").expect("valid regex"));

static WASHINGTON_DC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^washington,? d\.?c\.?$").expect("valid regex"));

/// Normalizes raw components against a loaded configuration.
#[derive(Debug, Clone, Copy)]
pub struct ComponentNormalizer<'a> {
    config: &'a AddressConfig,
}

impl<'a> ComponentNormalizer<'a> {
    /// Create a normalizer reading from `config`.
    pub fn new(config: &'a AddressConfig) -> Self {
        Self { config }
    }

    /// Run the full normalization pipeline.
    ///
    /// Returns the normalized components together with the template selected
    /// by the resolved country code.
    ///
    /// # Example
    ///
    /// ```rust
    /// use address_formatter::{AddressConfig, ComponentNormalizer, Components, Template};
    ///
    /// let config = AddressConfig::builder()
    ///     .template("default", Template::builder().address_template("{{{road}}}").build()?)
    ///     .build()?;
    ///
    /// let raw: Components = [("country_code", "uk")].into_iter().collect();
    /// let (normalized, _template) = ComponentNormalizer::new(&config).normalize(raw);
    /// assert_eq!(normalized.get("country_code"), Some("GB"));
    /// # Ok::<(), address_formatter::Error>(())
    /// ```
    pub fn normalize(&self, mut components: Components) -> (Components, &'a Template) {
        self.sanitize(&mut components);

        let template = self
            .config
            .template(components.get(names::COUNTRY_CODE).unwrap_or_default());

        self.apply_replacements(&mut components, template);
        self.add_codes(&mut components);
        self.configure_attention(&mut components);

        (components, template)
    }

    /// Steps 1 to 5: everything that does not depend on the active template.
    pub fn sanitize(&self, components: &mut Components) {
        let country_code = self.resolve_country_code(components);
        if let Some(code) = &country_code {
            components.insert(names::COUNTRY_CODE, code);
        }

        reclassify_district(components, country_code.as_deref());
        self.fill_aliases(components);
        sanity_clean(components);
        fix_country(components);
    }

    /// Component names that are neither canonical nor a known alias, in
    /// sorted order.
    pub fn unknown_components(&self, components: &Components) -> Vec<String> {
        let table = self.config.components();
        components
            .names()
            .filter(|name| !table.is_known(name))
            .map(str::to_string)
            .collect()
    }

    fn resolve_country_code(&self, components: &mut Components) -> Option<String> {
        let mut code = components.get(names::COUNTRY_CODE)?.to_uppercase();
        if code.chars().count() != 2 || !code.chars().all(char::is_alphabetic) {
            return None;
        }
        if code == "UK" {
            return Some("GB".to_string());
        }

        if let Some(template) = self.config.get_template(&code)
            && let CountryRule::Redirect {
                use_country,
                change_country,
                add_component,
            } = &template.country_rule
        {
            log::debug!("country code {code} redirected to {use_country}");
            code = use_country.clone();

            if let Some(country) = change_country {
                let country = substitute_component(country, components);
                components.insert(names::COUNTRY, country);
            }
            if let Some((key, value)) = add_component {
                components.insert(key.as_str(), value);
            }
        }

        if let Some(state) = components.get(names::STATE).map(str::to_string) {
            for territory in self.config.territories(&code) {
                if territory.state.matches(&state) {
                    log::debug!("state {state} resolved to territory {}", territory.country_code);
                    code = territory.country_code.clone();
                    components.insert(names::COUNTRY, &territory.country);
                }
            }
        }

        Some(code)
    }

    fn fill_aliases(&self, components: &mut Components) {
        for definition in self.config.components().definitions() {
            if components.contains(&definition.name) {
                continue;
            }
            let value = definition
                .aliases
                .iter()
                .find_map(|alias| components.get(alias))
                .map(str::to_string);
            if let Some(value) = value {
                components.insert(definition.name.as_str(), value);
            }
        }
    }

    fn apply_replacements(&self, components: &mut Components, template: &Template) {
        if template.replace.is_empty() {
            return;
        }
        for (name, value) in components.iter_mut() {
            for rule in &template.replace {
                if let Some(replaced) = rule.apply(name, value) {
                    *value = replaced;
                }
            }
        }
    }

    fn add_codes(&self, components: &mut Components) {
        add_code(
            components,
            names::STATE,
            names::STATE_CODE,
            |country, name| self.config.state_codes().lookup(country, name),
        );
        add_code(
            components,
            names::COUNTY,
            names::COUNTY_CODE,
            |country, name| self.config.county_codes().lookup(country, name),
        );
    }

    fn configure_attention(&self, components: &mut Components) {
        let unknown = self.unknown_components(components);
        if unknown.is_empty() {
            return;
        }
        let attention = unknown
            .iter()
            .filter_map(|name| components.get(name))
            .collect::<Vec<_>>()
            .join(", ");
        components.insert(names::ATTENTION, attention);
    }
}

/// Replace the last `$component` reference in `text` with that component's
/// value (empty when absent).
fn substitute_component(text: &str, components: &Components) -> String {
    match CHANGE_COUNTRY_VAR_RE.captures_iter(text).last() {
        Some(captures) => {
            let value = components.get(&captures[1]).unwrap_or_default();
            text.replace(&captures[0], value)
        }
        None => text.to_string(),
    }
}

fn reclassify_district(components: &mut Components, country_code: Option<&str>) {
    let small = country_code.is_some_and(|code| SMALL_DISTRICT_COUNTRIES.contains(&code));
    let target = if small {
        names::NEIGHBOURHOOD
    } else {
        names::STATE_DISTRICT
    };

    if components.contains(target) {
        return;
    }
    if let Some(district) = components.remove(names::DISTRICT) {
        components.insert(target, district);
    }
}

fn sanity_clean(components: &mut Components) {
    if let Some(postcode) = components.get(names::POSTCODE) {
        if postcode.chars().count() > MAX_POSTCODE_LEN || MULTI_POSTCODE_RE.is_match(postcode) {
            log::debug!("dropping invalid postcode {postcode:?}");
            components.remove(names::POSTCODE);
        } else if let Some(first) = PAIRED_POSTCODE_RE
            .captures(postcode)
            .map(|captures| captures[1].to_string())
        {
            components.insert(names::POSTCODE, first);
        }
    }

    components.retain(|name, value| {
        let is_url = value.contains("http://") || value.contains("https://");
        if is_url {
            log::debug!("dropping component {name} holding a URL");
        }
        !is_url
    });
}

fn fix_country(components: &mut Components) {
    let numeric_country = components
        .get(names::COUNTRY)
        .is_some_and(|country| country.parse::<i32>().is_ok());
    if numeric_country && let Some(state) = components.remove(names::STATE) {
        log::debug!("numeric country replaced by state {state:?}");
        components.insert(names::COUNTRY, state);
    }

    if components.get(names::COUNTRY_CODE) != Some("US") {
        return;
    }
    let Some(state) = components.get(names::STATE) else {
        return;
    };

    if UNITED_STATES_RE.is_match(state) {
        components.insert(names::STATE, "US");
    } else if WASHINGTON_DC_RE.is_match(state) {
        components.insert(names::STATE_CODE, "DC");
        components.insert(names::STATE, "District of Columbia");
        components.insert(names::CITY, "Washington");
    }
}

fn add_code<'c>(
    components: &mut Components,
    source: &str,
    target: &str,
    lookup: impl Fn(&str, &str) -> Option<&'c str>,
) {
    if components.contains(target) {
        return;
    }
    let (Some(name), Some(country)) = (components.get(source), components.get(names::COUNTRY_CODE))
    else {
        return;
    };

    let country = country.to_uppercase();
    let code = lookup(&country, name).map(str::to_string);
    components.insert(names::COUNTRY_CODE, country);
    if let Some(code) = code {
        components.insert(target, code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodeTable, ComponentDefinition};

    fn config() -> AddressConfig {
        AddressConfig::builder()
            .template(
                "default",
                Template::builder()
                    .address_template("{{{road}}}\n{{{city}}}\n{{{country}}}")
                    .build()
                    .unwrap(),
            )
            .template(
                "FR",
                Template::builder()
                    .address_template("{{{road}}}\n{{{postcode}}} {{{city}}}")
                    .replace("^Rue ", "R. ")
                    .replace("city=Paris 7e", "Paris")
                    .build()
                    .unwrap(),
            )
            .template(
                "GP",
                Template::builder()
                    .use_country("FR")
                    .change_country("$state, France")
                    .add_component("region=Caraïbes")
                    .build()
                    .unwrap(),
            )
            .components([
                ComponentDefinition::new("road", ["street", "footway"]),
                ComponentDefinition::new("city", ["town", "village"]),
                ComponentDefinition::new("neighbourhood", ["suburb"]),
                ComponentDefinition::new("state_district", Vec::<String>::new()),
                ComponentDefinition::new("state", Vec::<String>::new()),
                ComponentDefinition::new("state_code", Vec::<String>::new()),
                ComponentDefinition::new("county", Vec::<String>::new()),
                ComponentDefinition::new("county_code", Vec::<String>::new()),
                ComponentDefinition::new("region", Vec::<String>::new()),
                ComponentDefinition::new("postcode", Vec::<String>::new()),
                ComponentDefinition::new("country", Vec::<String>::new()),
                ComponentDefinition::new("country_code", Vec::<String>::new()),
                ComponentDefinition::new("attention", Vec::<String>::new()),
            ])
            .state_codes(CodeTable::new().with("US", "CA", "California"))
            .county_codes(CodeTable::new().with("IT", "RM", "Roma"))
            .build()
            .unwrap()
    }

    fn components(pairs: &[(&str, &str)]) -> Components {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_uk_becomes_gb() {
        let config = config();
        let (normalized, _) =
            ComponentNormalizer::new(&config).normalize(components(&[("country_code", "uk")]));
        assert_eq!(normalized.get("country_code"), Some("GB"));
    }

    #[test]
    fn test_invalid_country_code_is_left_alone() {
        let config = config();
        let (normalized, template) =
            ComponentNormalizer::new(&config).normalize(components(&[("country_code", "fra")]));
        assert_eq!(normalized.get("country_code"), Some("fra"));
        assert!(std::ptr::eq(template, config.default_template()));
    }

    #[test]
    fn test_redirect_changes_country_and_adds_component() {
        let config = config();
        let (normalized, template) = ComponentNormalizer::new(&config).normalize(components(&[
            ("country_code", "gp"),
            ("state", "Guadeloupe"),
        ]));

        assert_eq!(normalized.get("country_code"), Some("FR"));
        assert_eq!(normalized.get("country"), Some("Guadeloupe, France"));
        assert_eq!(normalized.get("region"), Some("Caraïbes"));
        assert!(std::ptr::eq(template, config.template("FR")));
    }

    #[test]
    fn test_netherlands_territories() {
        let config = config();
        let normalizer = ComponentNormalizer::new(&config);

        let (normalized, _) =
            normalizer.normalize(components(&[("country_code", "nl"), ("state", "Curaçao")]));
        assert_eq!(normalized.get("country_code"), Some("CW"));
        assert_eq!(normalized.get("country"), Some("Curaçao"));

        let (normalized, _) =
            normalizer.normalize(components(&[("country_code", "NL"), ("state", "SINT MAARTEN")]));
        assert_eq!(normalized.get("country_code"), Some("SX"));
        assert_eq!(normalized.get("country"), Some("Sint Maarten"));

        let (normalized, _) =
            normalizer.normalize(components(&[("country_code", "NL"), ("state", "aruba")]));
        assert_eq!(normalized.get("country_code"), Some("AW"));

        let (normalized, _) =
            normalizer.normalize(components(&[("country_code", "NL"), ("state", "curaçao")]));
        assert_eq!(normalized.get("country_code"), Some("NL"));
    }

    #[test]
    fn test_district_reclassification() {
        let config = config();
        let normalizer = ComponentNormalizer::new(&config);

        let (normalized, _) =
            normalizer.normalize(components(&[("country_code", "es"), ("district", "Centro")]));
        assert_eq!(normalized.get("neighbourhood"), Some("Centro"));
        assert!(!normalized.contains("district"));

        let (normalized, _) =
            normalizer.normalize(components(&[("country_code", "de"), ("district", "Mitte")]));
        assert_eq!(normalized.get("state_district"), Some("Mitte"));

        let (normalized, _) = normalizer.normalize(components(&[
            ("country_code", "de"),
            ("district", "Mitte"),
            ("state_district", "Berlin"),
        ]));
        assert_eq!(normalized.get("state_district"), Some("Berlin"));
        assert_eq!(normalized.get("district"), Some("Mitte"));
    }

    #[test]
    fn test_alias_fill_in_first_match_wins() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config).normalize(components(&[
            ("footway", "Path"),
            ("street", "Main St"),
        ]));

        assert_eq!(normalized.get("road"), Some("Main St"));
        assert_eq!(normalized.get("footway"), Some("Path"));
        assert_eq!(normalized.get("street"), Some("Main St"));
    }

    #[test]
    fn test_alias_does_not_override_canonical() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config)
            .normalize(components(&[("city", "Lyon"), ("town", "Villeurbanne")]));
        assert_eq!(normalized.get("city"), Some("Lyon"));
    }

    #[test]
    fn test_postcode_sanity() {
        let config = config();
        let normalizer = ComponentNormalizer::new(&config);

        let (normalized, _) =
            normalizer.normalize(components(&[("postcode", "1234567890123456789012345")]));
        assert!(!normalized.contains("postcode"));

        let (normalized, _) = normalizer.normalize(components(&[("postcode", "12345;67890")]));
        assert!(!normalized.contains("postcode"));

        let (normalized, _) =
            normalizer.normalize(components(&[("postcode", "10115,10117,10119")]));
        assert_eq!(normalized.get("postcode"), Some("10115"));

        let (normalized, _) = normalizer.normalize(components(&[("postcode", "SW1A 1AA")]));
        assert_eq!(normalized.get("postcode"), Some("SW1A 1AA"));
    }

    #[test]
    fn test_urls_are_dropped() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config).normalize(components(&[
            ("road", "https://example.com/road"),
            ("city", "Berlin"),
        ]));
        assert!(!normalized.contains("road"));
        assert_eq!(normalized.get("city"), Some("Berlin"));
    }

    #[test]
    fn test_numeric_country_swapped_with_state() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config)
            .normalize(components(&[("country", "123"), ("state", "Texas")]));
        assert_eq!(normalized.get("country"), Some("Texas"));
        assert!(!normalized.contains("state"));
    }

    #[test]
    fn test_non_numeric_country_untouched() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config)
            .normalize(components(&[("country", "Germany"), ("state", "Bayern")]));
        assert_eq!(normalized.get("country"), Some("Germany"));
        assert_eq!(normalized.get("state"), Some("Bayern"));
    }

    #[test]
    fn test_washington_dc() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config).normalize(components(&[
            ("country_code", "us"),
            ("state", "Washington D.C."),
        ]));
        assert_eq!(normalized.get("state_code"), Some("DC"));
        assert_eq!(normalized.get("state"), Some("District of Columbia"));
        assert_eq!(normalized.get("city"), Some("Washington"));
    }

    #[test]
    fn test_united_states_state_rewritten() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config).normalize(components(&[
            ("country_code", "US"),
            ("state", "United States of America"),
        ]));
        assert_eq!(normalized.get("state"), Some("US"));
    }

    #[test]
    fn test_replace_rules() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config).normalize(components(&[
            ("country_code", "fr"),
            ("road", "Rue de Rivoli"),
            ("city", "Paris 7e"),
        ]));
        assert_eq!(normalized.get("road"), Some("R. de Rivoli"));
        assert_eq!(normalized.get("city"), Some("Paris"));
    }

    #[test]
    fn test_state_and_county_codes() {
        let config = config();
        let normalizer = ComponentNormalizer::new(&config);

        let (normalized, _) =
            normalizer.normalize(components(&[("country_code", "us"), ("state", "california")]));
        assert_eq!(normalized.get("state_code"), Some("CA"));

        let (normalized, _) =
            normalizer.normalize(components(&[("country_code", "it"), ("county", "Roma")]));
        assert_eq!(normalized.get("county_code"), Some("RM"));

        let (normalized, _) = normalizer.normalize(components(&[
            ("country_code", "us"),
            ("state", "California"),
            ("state_code", "XX"),
        ]));
        assert_eq!(normalized.get("state_code"), Some("XX"));
    }

    #[test]
    fn test_attention_from_unknown_components() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config).normalize(components(&[
            ("viewpoint", "Tour Eiffel 3e étage"),
            ("road", "Avenue Gustave Eiffel"),
            ("attention", "ignored"),
        ]));
        assert_eq!(normalized.get("attention"), Some("Tour Eiffel 3e étage"));
    }

    #[test]
    fn test_attention_joins_in_key_order() {
        let config = config();
        let (normalized, _) = ComponentNormalizer::new(&config)
            .normalize(components(&[("zoo", "Zoo"), ("cafe", "Café")]));
        assert_eq!(normalized.get("attention"), Some("Café, Zoo"));
    }

    #[test]
    fn test_empty_input() {
        let config = config();
        let (normalized, template) =
            ComponentNormalizer::new(&config).normalize(Components::new());
        assert!(normalized.is_empty());
        assert!(std::ptr::eq(template, config.default_template()));
    }
}
