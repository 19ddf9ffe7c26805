//! Recursive and mutually recursive grammars.
//!
//! A [`Forward`] is a placeholder that can be used as a pattern before the
//! grammar it stands for exists. Matching goes through the placeholder, so
//! the grammar only has to be supplied before the first parse.
//!
//! A defined forward that is reachable from its own grammar forms an `Arc`
//! cycle; such parsers live for the rest of the process.

use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::Attribute;
use crate::driver::{Parse, Parser};
use crate::error::BuildError;
use crate::interpreter;
use crate::pattern::{Match, Pattern};

pub struct Forward<A>(Arc<OnceLock<Parser<A>>>);

impl<A> Clone for Forward<A> {
    fn clone(&self) -> Self {
        Forward(Arc::clone(&self.0))
    }
}

impl<A> Default for Forward<A> {
    fn default() -> Self {
        Forward(Arc::new(OnceLock::new()))
    }
}

impl<A: Attribute> Forward<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the placeholder. A forward can be defined once.
    pub fn define(&self, parser: impl Into<Parser<A>>) -> Result<(), BuildError> {
        self.0
            .set(parser.into())
            .map_err(|_| BuildError::ForwardAlreadyDefined)
    }

    pub fn is_defined(&self) -> bool {
        self.0.get().is_some()
    }

    fn bind(&self, parser: &Parser<A>) {
        self.0.get_or_init(|| parser.clone());
    }

    fn find_at(&self, text: &str, index: usize, inherited: Option<&A>) -> Option<Match<A>> {
        match self.0.get() {
            Some(parser) => interpreter::run(parser.program(), text, index, inherited.cloned()),
            None => {
                warn!(offset = index, "forward reference matched before it was defined");
                None
            }
        }
    }
}

impl<A: Attribute> From<&Forward<A>> for Pattern<A> {
    fn from(forward: &Forward<A>) -> Self {
        let forward = forward.clone();
        Pattern::func(move |text: &str, index: usize, inherited: Option<&A>| forward.find_at(text, index, inherited))
    }
}

impl<A: Attribute> From<Forward<A>> for Pattern<A> {
    fn from(forward: Forward<A>) -> Self {
        Pattern::from(&forward)
    }
}

/// Build a grammar that refers to itself.
///
/// ```
/// use skein::{Forward, Grammar, Parse, Parser, Pattern, fix};
///
/// let parens: Parser<String> = fix(|parens: &Forward<String>| {
///     let nested: Grammar<String> = Grammar::new().then("(").then(parens).then(")");
///     Grammar::new().or([Pattern::from(nested), Pattern::from("")])
/// });
/// let g: Grammar<String> = Grammar::new().then(&parens).is_end();
/// assert!(g.parse("(())", None).is_some());
/// assert!(g.parse("(()", None).is_none());
/// ```
pub fn fix<A, F, G>(f: F) -> Parser<A>
where
    A: Attribute,
    F: FnOnce(&Forward<A>) -> G,
    G: Into<Parser<A>>,
{
    let cell = Forward::new();
    let parser = f(&cell).into();
    cell.bind(&parser);
    parser
}

/// Build `N` grammars that may refer to each other.
///
/// The closure receives one placeholder per grammar and returns the
/// grammars in the same order.
pub fn letrec<A, F, const N: usize>(f: F) -> [Parser<A>; N]
where
    A: Attribute,
    F: FnOnce(&[Forward<A>; N]) -> [Parser<A>; N],
{
    let cells: [Forward<A>; N] = std::array::from_fn(|_| Forward::new());
    let parsers = f(&cells);
    for (cell, parser) in cells.iter().zip(&parsers) {
        cell.bind(parser);
    }
    parsers
}

/// A fixed set of placeholders, defined one by one and checked at the end.
pub struct Nonterminals<A> {
    cells: Vec<Forward<A>>,
}

impl<A: Attribute> Nonterminals<A> {
    pub fn new(count: usize) -> Self {
        Nonterminals {
            cells: (0..count).map(|_| Forward::new()).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Forward<A>> {
        self.cells.get(index)
    }

    /// All parsers in declaration order, or the first undefined index.
    pub fn finish(self) -> Result<Vec<Parser<A>>, BuildError> {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| cell.0.get().cloned().ok_or(BuildError::ForwardUndefined { index }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::config::Config;
    use crate::grammar::Grammar;

    fn balanced() -> Grammar<String> {
        let parens: Parser<String> = fix(|s| {
            Grammar::new().or([
                Pattern::from(Grammar::new().then("(").then(s).then(")")),
                Pattern::from(Grammar::new()),
            ])
        });
        Grammar::new().then(parens).is_end()
    }

    #[test]
    fn test_fix_balanced_parens() {
        let g = balanced();
        assert_eq!(g.parse("((()))", None).unwrap().last_index, 6);
        assert_eq!(g.parse("", None).unwrap().last_index, 0);
        assert!(g.parse("((())", None).is_none());
        assert!(g.parse("(()))", None).is_none());
    }

    fn binary(op: &'static str, config: &Config<i64>, operand: &Forward<i64>, f: fn(i64, i64) -> i64) -> Grammar<i64> {
        config
            .grammar()
            .then(op)
            .then_with(operand, Action::new(move |_, a: Option<i64>, b: Option<i64>, _| Some(f(b?, a?))))
    }

    /// `term := factor (("+" | "-") factor)?` and so on, as in the classic
    /// three-level arithmetic grammar.
    fn arithmetic(config: &Config<i64>) -> Grammar<i64> {
        let [term, _, _] = letrec(|[t, f, e]: &[Forward<i64>; 3]| {
            let term = config
                .grammar()
                .then(f)
                .then_maybe(config.grammar().or([
                    binary("+", config, f, |l, r| l + r),
                    binary("-", config, f, |l, r| l - r),
                ]))
                .build();
            let factor = config
                .grammar()
                .then(e)
                .then_maybe(config.grammar().or([
                    binary("*", config, e, |l, r| l * r),
                    binary("/", config, e, |l, r| l / r),
                ]))
                .build();
            let element = config
                .grammar()
                .or([
                    Pattern::from(config.grammar().then_int(Pattern::regex("[0-9]+").unwrap())),
                    Pattern::from(config.grammar().then("(").then(t).then(")")),
                ])
                .build();
            [term, factor, element]
        });
        config.grammar().then(term).is_end()
    }

    #[test]
    fn test_letrec_arithmetic() {
        let g = arithmetic(&Config::new());
        assert_eq!(g.parse("1+2*3", None).unwrap().attribute, Some(7));
        assert_eq!(g.parse("4-6/2", None).unwrap().attribute, Some(1));
        assert_eq!(g.parse("(1+2)*3", None).unwrap().attribute, Some(9));
        assert!(g.parse("1+", None).is_none());
    }

    #[test]
    fn test_letrec_with_ignore() {
        let config = Config::new().with_ignore(Pattern::regex(r"\s+").unwrap());
        let g = arithmetic(&config);
        assert_eq!(g.parse(" 1  +  2  *  3  ", None).unwrap().attribute, Some(7));
        assert_eq!(g.parse("  4  -  6/   2   ", None).unwrap().attribute, Some(1));
    }

    #[test]
    fn test_undefined_forward_does_not_match() {
        let f: Forward<String> = Forward::new();
        let g = Grammar::new().then(&f);
        assert!(g.parse("a", None).is_none());
        f.define(Grammar::new().then("a")).unwrap();
        assert!(g.parse("a", None).is_some());
    }

    #[test]
    fn test_forward_defined_once() {
        let f: Forward<String> = Forward::new();
        f.define(Grammar::new().then("a")).unwrap();
        let err = f.define(Grammar::new().then("b")).unwrap_err();
        assert!(matches!(err, BuildError::ForwardAlreadyDefined));
        assert!(f.is_defined());
    }

    #[test]
    fn test_nonterminals() {
        let nt: Nonterminals<String> = Nonterminals::new(2);
        let list = nt.get(1).unwrap().clone();
        nt.get(0)
            .unwrap()
            .define(Grammar::new().then("[").then(&list).then("]"))
            .unwrap();
        list.define(Grammar::new().then_zero_or_more("x")).unwrap();
        let parsers = nt.finish().unwrap();
        assert!(parsers[0].parse("[xxx]", None).is_some());
    }

    #[test]
    fn test_nonterminals_reports_undefined() {
        let nt: Nonterminals<String> = Nonterminals::new(2);
        nt.get(0).unwrap().define(Grammar::new().then("a")).unwrap();
        assert!(matches!(nt.finish(), Err(BuildError::ForwardUndefined { index: 1 })));
    }
}
