//! Prefix Resolver - dialing prefix to node set

use dcstatus_core::NodeId;

use crate::{flag_emoji, PrefixCatalog, PrefixDescriptor};

/// Prefixes always offered as quick picks, in this order
pub const FIXED_SUGGESTIONS: [&str; 5] = ["1", "30", "33", "974", "1876"];

/// Locale pick plus the fixed quick picks
pub const MAX_SUGGESTIONS: usize = 1 + FIXED_SUGGESTIONS.len();

/// Result of a successful resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub descriptor: PrefixDescriptor,
    /// Serving nodes in association table order
    pub node_ids: Vec<NodeId>,
}

/// Entry of the prefix selector
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOption {
    pub prefix: String,
    pub title: String,
    /// `+39 🇮🇹`
    pub caption: String,
}

/// Resolves dialing prefixes against a catalog
#[derive(Clone, Debug, Default)]
pub struct PrefixResolver {
    catalog: PrefixCatalog,
}

impl PrefixResolver {
    pub fn new(catalog: PrefixCatalog) -> Self {
        PrefixResolver { catalog }
    }

    pub fn catalog(&self) -> &PrefixCatalog {
        &self.catalog
    }

    /// Look up a prefix. A leading `+` is accepted. Unknown prefixes
    /// resolve to `None`, which callers treat as a silent no-op.
    pub fn resolve(&self, prefix: &str) -> Option<Resolution> {
        let prefix = prefix.trim().trim_start_matches('+');

        let Some(descriptor) = self.catalog.descriptor(prefix) else {
            tracing::debug!(prefix, "prefix not in catalog");
            return None;
        };

        let node_ids = self.catalog.nodes_serving(prefix);
        tracing::debug!(prefix, nodes = ?node_ids, "prefix resolved");

        Some(Resolution {
            descriptor: descriptor.clone(),
            node_ids,
        })
    }

    /// Quick picks for the identify panel
    ///
    /// The first language of `languages` that matches a descriptor country
    /// contributes that descriptor; the fixed prefixes follow. A tag like
    /// `fr-FR` is compared in full and by its primary subtag.
    pub fn suggestions<S: AsRef<str>>(&self, languages: &[S]) -> Vec<&PrefixDescriptor> {
        let locale_pick = languages
            .iter()
            .find_map(|language| self.descriptor_for_language(language.as_ref()));

        let mut picks: Vec<&PrefixDescriptor> = Vec::with_capacity(MAX_SUGGESTIONS);
        let fixed = FIXED_SUGGESTIONS
            .iter()
            .filter_map(|prefix| self.catalog.descriptor(prefix));

        for desc in locale_pick.into_iter().chain(fixed) {
            if !picks.iter().any(|p| p.prefix == desc.prefix) {
                picks.push(desc);
            }
        }

        picks.truncate(MAX_SUGGESTIONS);
        picks
    }

    /// Selector entries: every descriptor served by at least one node
    pub fn selectable(&self) -> Vec<SelectOption> {
        self.catalog
            .descriptors
            .iter()
            .filter(|d| self.catalog.is_served(&d.prefix))
            .map(|d| {
                let caption = match flag_emoji(&d.locale_iso2) {
                    Some(flag) => format!("+{} {}", d.prefix, flag),
                    None => format!("+{}", d.prefix),
                };
                SelectOption {
                    prefix: d.prefix.clone(),
                    title: d.display_name.clone(),
                    caption,
                }
            })
            .collect()
    }

    fn descriptor_for_language(&self, language: &str) -> Option<&PrefixDescriptor> {
        let tag = language.trim().to_ascii_lowercase();
        let primary = tag.split(['-', '_']).next().unwrap_or_default();

        self.catalog.descriptors.iter().find(|d| {
            let iso = d.locale_iso2.to_ascii_lowercase();
            iso == tag || iso == primary
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn small_catalog() -> PrefixCatalog {
        PrefixCatalog::new(
            vec![
                PrefixDescriptor::new("1", "United States", "US", "201 555 0123"),
                PrefixDescriptor::new("33", "France", "FR", "6 12 34 56 78"),
                PrefixDescriptor::new("39", "Italy", "IT", "312 345 6789"),
                PrefixDescriptor::new("974", "Qatar", "QA", "3312 3456"),
                PrefixDescriptor::new("44", "United Kingdom", "GB", "7400 123456"),
            ],
            vec![
                vec!["1".into()],
                vec!["33".into(), "39".into()],
                vec![],
                vec!["39".into(), "974".into()],
                vec![],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_in_table_order() {
        let resolver = PrefixResolver::new(small_catalog());
        let resolution = resolver.resolve("39").unwrap();

        assert_eq!(resolution.descriptor.display_name, "Italy");
        assert_eq!(resolution.node_ids, vec![NodeId(2), NodeId(4)]);
    }

    #[test]
    fn test_resolve_accepts_plus_sign() {
        let resolver = PrefixResolver::new(small_catalog());
        assert_eq!(resolver.resolve(" +974").unwrap().node_ids, vec![NodeId(4)]);
    }

    #[test]
    fn test_resolve_miss() {
        let resolver = PrefixResolver::new(small_catalog());
        assert!(resolver.resolve("999").is_none());
        assert!(resolver.resolve("").is_none());
    }

    #[test]
    fn test_resolve_known_but_unserved() {
        let resolver = PrefixResolver::new(small_catalog());
        let resolution = resolver.resolve("44").unwrap();
        assert!(resolution.node_ids.is_empty());
    }

    #[test]
    fn test_suggestions_locale_first_without_duplicates() {
        let resolver = PrefixResolver::new(small_catalog());
        let picks: Vec<&str> = resolver
            .suggestions(&["fr-FR", "en-US"])
            .iter()
            .map(|d| d.prefix.as_str())
            .collect();

        // 30 and 1876 are not in this catalog
        assert_eq!(picks, vec!["33", "1", "974"]);
    }

    #[test]
    fn test_suggestions_first_matching_language_wins() {
        let resolver = PrefixResolver::new(small_catalog());
        let picks = resolver.suggestions(&["xx", "IT", "fr"]);
        assert_eq!(picks[0].prefix, "39");
    }

    #[test]
    fn test_suggestions_without_locale_match() {
        let resolver = PrefixResolver::new(small_catalog());
        let picks: Vec<&str> = resolver
            .suggestions::<&str>(&[])
            .iter()
            .map(|d| d.prefix.as_str())
            .collect();
        assert_eq!(picks, vec!["1", "33", "974"]);
    }

    #[test]
    fn test_builtin_suggestions() {
        let resolver = PrefixResolver::default();
        let picks: Vec<&str> = resolver
            .suggestions(&["it-IT"])
            .iter()
            .map(|d| d.prefix.as_str())
            .collect();
        assert_eq!(picks, vec!["39", "1", "30", "33", "974", "1876"]);
    }

    #[test]
    fn test_selectable_skips_unserved() {
        let resolver = PrefixResolver::new(small_catalog());
        let options = resolver.selectable();

        let prefixes: Vec<&str> = options.iter().map(|o| o.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["1", "33", "39", "974"]);
        assert_eq!(options[2].caption, "+39 \u{1F1EE}\u{1F1F9}");
        assert_eq!(options[2].title, "Italy");
    }

    proptest! {
        #[test]
        fn prop_suggestions_bounded_and_unique(
            languages in prop::collection::vec("[a-zA-Z]{2}(-[A-Z]{2})?", 0..6),
        ) {
            let resolver = PrefixResolver::default();
            let picks = resolver.suggestions(languages.as_slice());

            prop_assert!(picks.len() <= MAX_SUGGESTIONS);
            let mut prefixes: Vec<&str> = picks.iter().map(|d| d.prefix.as_str()).collect();
            prefixes.sort_unstable();
            prefixes.dedup();
            prop_assert_eq!(prefixes.len(), picks.len());
        }

        #[test]
        fn prop_resolved_nodes_serve_prefix(index in 0usize..37) {
            let resolver = PrefixResolver::default();
            let catalog = resolver.catalog();
            let prefix = &catalog.descriptors[index % catalog.descriptors.len()].prefix;
            let resolution = resolver.resolve(prefix).unwrap();

            for node in &resolution.node_ids {
                let row = &catalog.associations[node.index().unwrap()];
                prop_assert!(row.contains(prefix));
            }
        }
    }
}
