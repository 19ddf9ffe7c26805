//! Grammar construction defaults.
//!
//! A [`Config`] carries the ignorable pattern and the default keyword trie.
//! Every grammar copies the config it was started from, so later changes to
//! a config (or to a clone of it) never reach grammars already built.

use std::sync::Arc;

use crate::Attribute;
use crate::grammar::Grammar;
use crate::pattern::{Matcher, Pattern};
use crate::trie::Trie;

pub struct Config<A> {
    pub(crate) ignore: Option<Matcher<A>>,
    pub(crate) trie: Option<Arc<Trie>>,
}

impl<A> Clone for Config<A> {
    fn clone(&self) -> Self {
        Config {
            ignore: self.ignore.clone(),
            trie: self.trie.clone(),
        }
    }
}

impl<A> Default for Config<A> {
    fn default() -> Self {
        Config { ignore: None, trie: None }
    }
}

impl<A: Attribute> Config<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip `pattern` before the first token and after every token.
    pub fn with_ignore(mut self, pattern: impl Into<Pattern<A>>) -> Self {
        self.set_ignore(Some(pattern.into()));
        self
    }

    /// Use `keywords` for `key`, `not_key` and identifier boundaries.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_keywords(keywords);
        self
    }

    pub fn set_ignore(&mut self, pattern: Option<Pattern<A>>) {
        self.ignore = pattern.map(Matcher::from);
    }

    pub fn set_keywords<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.trie = Some(Arc::new(Trie::new(keywords)));
    }

    pub fn has_ignore(&self) -> bool {
        self.ignore.is_some()
    }

    pub fn trie(&self) -> Option<&Arc<Trie>> {
        self.trie.as_ref()
    }

    /// Start an empty grammar using this configuration.
    pub fn grammar(&self) -> Grammar<A> {
        Grammar::with_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Parse;

    #[test]
    fn test_default_has_nothing() {
        let config: Config<String> = Config::default();
        assert!(!config.has_ignore());
        assert!(config.trie().is_none());
    }

    #[test]
    fn test_ignore_skipped_before_first_token() {
        let config: Config<String> = Config::new().with_ignore(Pattern::regex(r"\s+").unwrap());
        let g = config.grammar().then("765").then("346");
        let r = g.parse("  765   346  ", None).unwrap();
        assert_eq!(r.last_index, 13);
    }

    #[test]
    fn test_clone_is_independent() {
        let base: Config<String> = Config::new().with_ignore(Pattern::regex(r"\s+").unwrap());
        let mut private = base.clone();
        private.set_ignore(None);

        assert!(base.grammar().then("a").then("b").parse("a b", None).is_some());
        assert!(private.grammar().then("a").then("b").parse("a b", None).is_none());
    }

    #[test]
    fn test_grammar_keeps_config_at_construction() {
        let mut config: Config<String> = Config::new().with_ignore(" ");
        let g = config.grammar().then("a").then("b");
        config.set_ignore(None);
        assert!(g.parse("a b", None).is_some());
    }
}
