//! Tag → translator rule tables.

pub(crate) mod defaults;
pub mod rule;

use indexmap::IndexMap;

use rule::{Translator, TranslatorConfig};

/// An ordered mapping of upper-cased tag names to translator rules.
///
/// Keys may be given as comma-separated lists; each tag is assigned
/// independently. Scoped sub-tables (code blocks, anchor interiors, table
/// interiors) are collections too, referenced through a rule's
/// `child_translators`.
#[derive(Debug, Clone, Default)]
pub struct TranslatorCollection {
    entries: IndexMap<String, Translator>,
}

impl TranslatorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a rule to each tag in the comma-separated list, replacing any
    /// existing rule outright
    pub fn set(&mut self, keys: &str, translator: Translator) {
        for key in split_keys(keys) {
            self.entries.insert(key, translator.clone());
        }
    }

    /// Assign a rule to each tag, merging with any existing rule: two fixed
    /// configs merge field-wise (new fields win); when either side is a
    /// factory, the new rule wraps the old one as its base
    pub fn set_with_base(&mut self, keys: &str, translator: Translator) {
        for key in split_keys(keys) {
            let merged = match self.entries.shift_remove(&key) {
                None => translator.clone(),
                Some(existing) => merge(translator.clone(), existing),
            };
            self.entries.insert(key, merged);
        }
    }

    pub fn get(&self, tag: &str) -> Option<&Translator> {
        self.entries.get(tag.trim().to_uppercase().as_str())
    }

    pub fn remove(&mut self, keys: &str) {
        for key in split_keys(keys) {
            self.entries.shift_remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Translator)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn split_keys(keys: &str) -> impl Iterator<Item = String> + '_ {
    keys.split(',')
        .map(|key| key.trim().to_uppercase())
        .filter(|key| !key.is_empty())
}

fn merge(new: Translator, existing: Translator) -> Translator {
    match (new, existing) {
        (Translator::Static(new), Translator::Static(old)) => {
            Translator::Static(new.merged_over(&old))
        }
        (Translator::Dynamic { factory, base }, old) => Translator::Dynamic {
            factory,
            base: base.or(Some(Box::new(old))),
        },
        (Translator::Static(new), old @ Translator::Dynamic { .. }) => {
            let fixed: TranslatorConfig = new;
            Translator::Dynamic {
                factory: std::sync::Arc::new(move |_| fixed.clone()),
                base: Some(Box::new(old)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;
    use crate::options::Options;
    use crate::visitor::NodeMetadata;
    use rule::TranslatorContext;

    fn resolve_with_empty_ctx(translator: &Translator) -> TranslatorConfig {
        let dom = Dom::new();
        let options = Options::default();
        let metadata = NodeMetadata::default();
        let scratch = std::cell::RefCell::new(crate::visitor::Scratch::default());
        let ctx = TranslatorContext {
            node: dom.root(),
            dom: &dom,
            options: &options,
            metadata: &metadata,
            scratch: &scratch,
        };
        translator.resolve(&ctx)
    }

    fn prefix_rule(prefix: &str) -> Translator {
        Translator::Static(TranslatorConfig {
            prefix: Some(prefix.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_set_and_get_uppercases_keys() {
        let mut collection = TranslatorCollection::new();
        collection.set("strong,b", prefix_rule("**"));
        assert!(collection.get("STRONG").is_some());
        assert!(collection.get("b").is_some());
        assert!(collection.get("em").is_none());
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut collection = TranslatorCollection::new();
        collection.set("em,i", prefix_rule("_"));
        collection.remove("i");
        assert!(collection.get("EM").is_some());
        assert!(collection.get("I").is_none());
    }

    #[test]
    fn test_set_replaces_outright() {
        let mut collection = TranslatorCollection::new();
        collection.set(
            "p",
            Translator::Static(TranslatorConfig {
                prefix: Some("old".to_string()),
                surrounding_newlines: Some(2),
                ..Default::default()
            }),
        );
        collection.set("p", prefix_rule("new"));
        let config = match collection.get("P") {
            Some(Translator::Static(config)) => config.clone(),
            _ => panic!("expected static rule"),
        };
        assert_eq!(config.prefix.as_deref(), Some("new"));
        assert_eq!(config.surrounding_newlines, None);
    }

    #[test]
    fn test_set_with_base_merges_static_configs() {
        let mut collection = TranslatorCollection::new();
        collection.set(
            "p",
            Translator::Static(TranslatorConfig {
                surrounding_newlines: Some(2),
                ..Default::default()
            }),
        );
        collection.set_with_base("p", prefix_rule("> "));
        let config = match collection.get("P") {
            Some(Translator::Static(config)) => config.clone(),
            _ => panic!("expected static rule"),
        };
        assert_eq!(config.prefix.as_deref(), Some("> "));
        assert_eq!(config.surrounding_newlines, Some(2));
    }

    #[test]
    fn test_set_with_base_wraps_existing_under_factory() {
        let mut collection = TranslatorCollection::new();
        collection.set(
            "h1",
            Translator::Static(TranslatorConfig {
                surrounding_newlines: Some(2),
                ..Default::default()
            }),
        );
        collection.set_with_base(
            "h1",
            Translator::factory(|_| TranslatorConfig {
                prefix: Some("# ".to_string()),
                ..Default::default()
            }),
        );

        let translator = collection.get("H1").expect("rule present");
        let config = resolve_with_empty_ctx(translator);
        assert_eq!(config.prefix.as_deref(), Some("# "));
        assert_eq!(config.surrounding_newlines(), 2);
    }

    #[test]
    fn test_static_over_factory_still_resolves_base() {
        let mut collection = TranslatorCollection::new();
        collection.set(
            "x",
            Translator::factory(|_| TranslatorConfig {
                surrounding_newlines: Some(1),
                postfix: Some("!".to_string()),
                ..Default::default()
            }),
        );
        collection.set_with_base("x", prefix_rule("@"));

        let translator = collection.get("X").expect("rule present");
        let config = resolve_with_empty_ctx(translator);
        assert_eq!(config.prefix.as_deref(), Some("@"));
        assert_eq!(config.postfix.as_deref(), Some("!"));
        assert_eq!(config.surrounding_newlines(), 1);
    }
}
