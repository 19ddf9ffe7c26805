//! Atomic patterns and their normalisation into matchers.
//!
//! A [`Pattern`] is anything a grammar can test at an offset: literal text,
//! an anchored regular expression, a nested grammar, or a custom function.
//! Every kind is turned into a [`Matcher`] once, when the instruction that
//! uses it is built. The interpreter only ever sees matchers.

use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::Attribute;
use crate::code::Program;
use crate::error::BuildError;
use crate::interpreter;

/// The result of one successful match.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<A> {
    /// The text covered by the match.
    pub matched: String,
    /// Byte offset immediately after the match.
    pub last_index: usize,
    /// Attribute synthesized by the pattern, if any.
    pub attribute: Option<A>,
    /// Regex capture groups (group 0 first). Empty for other pattern kinds.
    pub extra: Vec<Option<String>>,
}

impl<A> Match<A> {
    /// A match of `text[start..end]` with no attribute.
    pub fn span(text: &str, start: usize, end: usize) -> Self {
        Match {
            matched: text[start..end].to_string(),
            last_index: end,
            attribute: None,
            extra: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Option<A>) -> Self {
        self.attribute = attribute;
        self
    }
}

/// Signature of a custom matching function: `(text, offset, inherited)`.
pub type MatchFn<A> = dyn Fn(&str, usize, Option<&A>) -> Option<Match<A>> + Send + Sync;

/// Case and line flags for [`Pattern::regex_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
}

/// A matchable value, before normalisation.
pub enum Pattern<A> {
    Literal(String),
    /// Already anchored at the start of the haystack.
    Regex(Regex),
    Grammar(Arc<Program<A>>),
    Func(Arc<MatchFn<A>>),
}

impl<A> Pattern<A> {
    /// Compile a regular expression that only matches at the current offset.
    pub fn regex(source: &str) -> Result<Self, BuildError> {
        Self::regex_with(source, RegexFlags::default())
    }

    pub fn regex_with(source: &str, flags: RegexFlags) -> Result<Self, BuildError> {
        let anchored = format!(r"\A(?:{source})");
        let regex = RegexBuilder::new(&anchored)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .build()?;
        Ok(Pattern::Regex(regex))
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&str, usize, Option<&A>) -> Option<Match<A>> + Send + Sync + 'static,
    {
        Pattern::Func(Arc::new(f))
    }
}

impl<A> From<&str> for Pattern<A> {
    fn from(literal: &str) -> Self {
        Pattern::Literal(literal.to_string())
    }
}

impl<A> From<String> for Pattern<A> {
    fn from(literal: String) -> Self {
        Pattern::Literal(literal)
    }
}

impl<A> From<Arc<Program<A>>> for Pattern<A> {
    fn from(program: Arc<Program<A>>) -> Self {
        Pattern::Grammar(program)
    }
}

impl<A> fmt::Debug for Pattern<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(s) => write!(f, "{s:?}"),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
            Pattern::Grammar(p) => write!(f, "<grammar: {} instructions>", p.len()),
            Pattern::Func(_) => f.write_str("<fn>"),
        }
    }
}

/// A normalised pattern: one callable with a fixed contract.
pub struct Matcher<A> {
    label: String,
    func: Arc<MatchFn<A>>,
}

impl<A> Clone for Matcher<A> {
    fn clone(&self) -> Self {
        Matcher {
            label: self.label.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<A> fmt::Debug for Matcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl<A: Attribute> Matcher<A> {
    pub fn new(pattern: impl Into<Pattern<A>>) -> Self {
        let pattern: Pattern<A> = pattern.into();
        Self::from(pattern)
    }

    pub fn find_at(&self, text: &str, index: usize, inherited: Option<&A>) -> Option<Match<A>> {
        (self.func)(text, index, inherited)
    }

    /// A matcher around a plain function, with a label for program listings.
    pub(crate) fn from_fn<F>(label: &str, f: F) -> Self
    where
        F: Fn(&str, usize, Option<&A>) -> Option<Match<A>> + Send + Sync + 'static,
    {
        Matcher {
            label: label.to_string(),
            func: Arc::new(f),
        }
    }
}

impl<A: Attribute> From<Pattern<A>> for Matcher<A> {
    fn from(pattern: Pattern<A>) -> Self {
        let label = format!("{pattern:?}");
        let func: Arc<MatchFn<A>> = match pattern {
            Pattern::Literal(literal) => Arc::new(move |text: &str, index: usize, _: Option<&A>| {
                text.get(index..)?
                    .starts_with(literal.as_str())
                    .then(|| Match::span(text, index, index + literal.len()))
            }),
            Pattern::Regex(regex) => Arc::new(move |text: &str, index: usize, _: Option<&A>| {
                find_regex(&regex, text, index)
            }),
            Pattern::Grammar(program) => Arc::new(move |text: &str, index: usize, inherited: Option<&A>| {
                interpreter::run(&program, text, index, inherited.cloned())
            }),
            Pattern::Func(func) => func,
        };
        Matcher { label, func }
    }
}

fn find_regex<A>(regex: &Regex, text: &str, index: usize) -> Option<Match<A>> {
    let haystack = text.get(index..)?;
    if regex.captures_len() > 1 {
        let caps = regex.captures(haystack)?;
        let whole = caps.get(0)?;
        let extra = caps
            .iter()
            .map(|group| group.map(|g| g.as_str().to_string()))
            .collect();
        Some(Match {
            matched: whole.as_str().to_string(),
            last_index: index + whole.end(),
            attribute: None,
            extra,
        })
    } else {
        let whole = regex.find(haystack)?;
        Some(Match {
            matched: whole.as_str().to_string(),
            last_index: index + whole.end(),
            attribute: None,
            extra: vec![Some(whole.as_str().to_string())],
        })
    }
}
