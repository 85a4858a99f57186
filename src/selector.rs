//! Template selection.

use crate::config::{AddressConfig, Template};
use crate::types::{names, Components};

/// Components of which at least one must be present for the main template
/// to be used.
const MINIMAL_COMPONENTS: &[&str] = &[names::ROAD, names::POSTCODE];

/// Chooses the template text to render for a normalized component set.
#[derive(Debug, Clone, Copy)]
pub struct TemplateSelector<'a> {
    config: &'a AddressConfig,
}

impl<'a> TemplateSelector<'a> {
    /// Create a selector reading from `config`.
    pub fn new(config: &'a AddressConfig) -> Self {
        Self { config }
    }

    /// Pick the template text for `components`.
    ///
    /// When the components are not [minimal](has_minimal_components) the
    /// active template's fallback is preferred, then the default template's
    /// fallback. Line endings are normalized to `\n`.
    pub fn select(&self, components: &Components, template: &Template) -> String {
        let default = self.config.default_template();

        let chosen = if has_minimal_components(components) {
            template.address_template.as_deref()
        } else {
            template
                .fallback_template
                .as_deref()
                .or(default.fallback_template.as_deref())
                .or(template.address_template.as_deref())
        };

        // A redirect-only template carries no text of its own
        let text = chosen
            .or(default.fallback_template.as_deref())
            .or(default.address_template.as_deref())
            .unwrap_or_default();

        log::trace!("selected template: {text:?}");
        text.replace("\r\n", "\n")
    }
}

/// Whether at most one of the minimal components is missing.
pub fn has_minimal_components(components: &Components) -> bool {
    let missing = MINIMAL_COMPONENTS
        .iter()
        .filter(|name| !components.contains(name))
        .count();
    missing < MINIMAL_COMPONENTS.len()
}
