//! Parse entry points.
//!
//! Every grammar handle implements [`Parse`], which provides anchored, exact,
//! first-partial and global scanning on top of the interpreter.

use std::sync::Arc;

use tracing::debug;

use crate::Attribute;
use crate::code::Program;
use crate::grammar::{Grammar, Sealed};
use crate::interpreter;
use crate::pattern::Pattern;

/// A successful parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<A> {
    pub matched: String,
    /// Byte offset immediately after the match.
    pub last_index: usize,
    pub attribute: Option<A>,
    /// Where the match began; only set by the scanning entry points.
    pub start_index: Option<usize>,
}

pub trait Parse<A: Attribute> {
    fn program(&self) -> &Program<A>;

    /// Match at `index` without requiring the rest of the input.
    fn parse_start(&self, text: &str, index: usize, attribute: Option<A>) -> Option<Parsed<A>> {
        let m = interpreter::run(self.program(), text, index, attribute)?;
        Some(Parsed {
            matched: m.matched,
            last_index: m.last_index,
            attribute: m.attribute,
            start_index: None,
        })
    }

    /// Match the whole of `text`.
    fn parse(&self, text: &str, attribute: Option<A>) -> Option<Parsed<A>> {
        let result = self.parse_start(text, 0, attribute).filter(|r| r.last_index == text.len());
        debug!(matched = result.is_some(), len = text.len(), "parse");
        result
    }

    /// Find the first offset where the grammar matches.
    ///
    /// The end of input is tried last, so a grammar that can match empty
    /// always succeeds.
    fn parse_part(&self, text: &str, attribute: Option<A>) -> Option<Parsed<A>> {
        let result = boundaries(text).find_map(|start| {
            let mut r = self.parse_start(text, start, attribute.clone())?;
            r.start_index = Some(start);
            Some(r)
        });
        debug!(start = result.as_ref().and_then(|r| r.start_index), "parse_part");
        result
    }

    /// Fold every non-overlapping match into an accumulator.
    ///
    /// After a match the scan resumes at its end; an empty match moves the
    /// scan forward one character.
    fn parse_part_global<B, F>(&self, text: &str, init: B, mut f: F) -> B
    where
        F: FnMut(B, Parsed<A>) -> B,
    {
        let mut acc = init;
        let mut index = 0;
        while index <= text.len() {
            match self.parse_start(text, index, None) {
                Some(mut r) => {
                    let next = if r.last_index > index {
                        r.last_index
                    } else {
                        next_boundary(text, index)
                    };
                    r.start_index = Some(index);
                    acc = f(acc, r);
                    index = next;
                }
                None => index = next_boundary(text, index),
            }
        }
        acc
    }

    /// Collect every non-overlapping match in order.
    fn parse_part_global_array(&self, text: &str) -> Vec<Parsed<A>> {
        let all = self.parse_part_global(text, Vec::new(), |mut acc, r| {
            acc.push(r);
            acc
        });
        debug!(matches = all.len(), "parse_part_global");
        all
    }
}

/// Char-boundary offsets of `text`, including its end.
fn boundaries(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()))
}

/// The next char boundary after `index`; past the end when at the end.
fn next_boundary(text: &str, index: usize) -> usize {
    text[index..].chars().next().map_or(index + 1, |ch| index + ch.len_utf8())
}

/// A finished grammar, cheap to clone and share.
pub struct Parser<A>(Arc<Program<A>>);

impl<A> Clone for Parser<A> {
    fn clone(&self) -> Self {
        Parser(Arc::clone(&self.0))
    }
}

impl<A> Parser<A> {
    pub(crate) fn from_program(program: Program<A>) -> Self {
        Parser(Arc::new(program))
    }

    pub fn listing(&self) -> String {
        self.0.listing()
    }
}

impl<A: Attribute> Parse<A> for Parser<A> {
    fn program(&self) -> &Program<A> {
        &self.0
    }
}

impl<A: Attribute> Parse<A> for Grammar<A> {
    fn program(&self) -> &Program<A> {
        &self.program
    }
}

impl<A: Attribute> Parse<A> for Sealed<A> {
    fn program(&self) -> &Program<A> {
        &self.program
    }
}

impl<A> From<Grammar<A>> for Parser<A> {
    fn from(grammar: Grammar<A>) -> Self {
        Parser::from_program(grammar.program)
    }
}

impl<A> From<Sealed<A>> for Parser<A> {
    fn from(sealed: Sealed<A>) -> Self {
        Parser::from_program(sealed.program)
    }
}

impl<A> From<Parser<A>> for Pattern<A> {
    fn from(parser: Parser<A>) -> Self {
        Pattern::Grammar(parser.0)
    }
}

impl<A> From<&Parser<A>> for Pattern<A> {
    fn from(parser: &Parser<A>) -> Self {
        Pattern::Grammar(Arc::clone(&parser.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    fn digits() -> Grammar<String> {
        Grammar::new().then_with(Pattern::regex("[0-9]+").unwrap(), Action::matched())
    }

    // --- Anchored and exact ---

    #[test]
    fn test_parse_requires_full_input() {
        let g: Grammar<String> = Grammar::new().then("765");
        assert!(g.parse("765", None).is_some());
        assert!(g.parse("765961", None).is_none());
        assert_eq!(g.parse_start("765961", 0, None).unwrap().last_index, 3);
    }

    #[test]
    fn test_parse_start_at_offset() {
        let g = digits();
        assert!(g.parse_start("a765", 0, None).is_none());
        let r = g.parse_start("a765", 1, None).unwrap();
        assert_eq!(r.matched, "765");
        assert_eq!(r.last_index, 4);
        assert_eq!(r.start_index, None);
    }

    #[test]
    fn test_parse_passes_inherited_attribute() {
        let g: Grammar<String> = Grammar::new().then("a");
        let r = g.parse("a", Some("seed".to_string())).unwrap();
        assert_eq!(r.attribute.as_deref(), Some("seed"));
    }

    // --- Partial ---

    #[test]
    fn test_parse_part_reports_start() {
        let g: Grammar<String> = Grammar::new().then("765");
        let r = g.parse_part("876765346", None).unwrap();
        assert_eq!(r.matched, "765");
        assert_eq!(r.start_index, Some(3));
        assert_eq!(r.last_index, 6);
    }

    #[test]
    fn test_parse_part_no_match() {
        let g: Grammar<String> = Grammar::new().then("765");
        assert!(g.parse_part("876346", None).is_none());
    }

    #[test]
    fn test_parse_part_empty_match_at_end() {
        let g: Grammar<String> = Grammar::new().is_end();
        let r = g.parse_part("abc", None).unwrap();
        assert_eq!(r.start_index, Some(3));
        assert_eq!(r.matched, "");
    }

    #[test]
    fn test_parse_part_skips_inside_chars() {
        let g: Grammar<String> = Grammar::new().then("x");
        let r = g.parse_part("ééx", None).unwrap();
        assert_eq!(r.start_index, Some(4));
    }

    // --- Global ---

    #[test]
    fn test_global_array() {
        let found: Vec<_> = digits()
            .parse_part_global_array("765x876xx346xxx")
            .into_iter()
            .map(|r| r.matched)
            .collect();
        assert_eq!(found, vec!["765", "876", "346"]);
    }

    #[test]
    fn test_global_fold() {
        let joined = digits().parse_part_global("765x876xx346xxx", String::new(), |acc, r| {
            r.attribute.unwrap_or_default() + &acc
        });
        assert_eq!(joined, "346876765");
    }

    #[test]
    fn test_global_records_starts() {
        let starts: Vec<_> = digits()
            .parse_part_global_array("765x876")
            .iter()
            .map(|r| r.start_index)
            .collect();
        assert_eq!(starts, vec![Some(0), Some(4)]);
    }

    #[test]
    fn test_global_empty_matches_advance() {
        let g: Sealed<String> = Grammar::new().then_zero_or_more("a");
        let found: Vec<_> = g
            .parse_part_global_array("aab")
            .into_iter()
            .map(|r| (r.start_index, r.matched))
            .collect();
        assert_eq!(
            found,
            vec![(Some(0), "aa".to_string()), (Some(2), String::new()), (Some(3), String::new())]
        );
    }

    // --- Parser handle ---

    #[test]
    fn test_parser_is_shareable() {
        let p = digits().build();
        let q = p.clone();
        let g: Grammar<String> = Grammar::new().then(&p).then("+").then(q);
        assert_eq!(g.parse("1+2", None).unwrap().attribute.as_deref(), Some("2"));
        assert!(p.parse("42", None).is_some());
    }

    #[test]
    fn test_parser_across_threads() {
        let p = digits().build();
        let handles: Vec<_> = ["1", "22", "333"]
            .into_iter()
            .map(|s| {
                let p = p.clone();
                std::thread::spawn(move || p.parse(s, None).map(|r| r.last_index))
            })
            .collect();
        let lens: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(lens, vec![Some(1), Some(2), Some(3)]);
    }
}
