//! Operator-precedence grammars.
//!
//! An [`OperatorTable`] lists precedence levels from loosest to tightest.
//! Each level is built from the plain combinators: a left-associative level
//! is its operand followed by zero or more `op operand` steps, a
//! right-associative level recurses into itself after at most one operator,
//! and so on. Operator symbols are matched as keywords, longest first.

use std::sync::Arc;

use crate::Attribute;
use crate::action::Action;
use crate::config::Config;
use crate::driver::Parser;
use crate::error::BuildError;
use crate::grammar::Grammar;
use crate::pattern::Pattern;
use crate::recursion::Forward;
use crate::trie::Trie;

type BinaryFn<A> = Arc<dyn Fn(A, A) -> A + Send + Sync>;
type UnaryFn<A> = Arc<dyn Fn(A) -> A + Send + Sync>;
type PrimaryFn<A> = Box<dyn FnOnce(&[Forward<A>]) -> Parser<A>>;

/// A binary operator: symbol and `(left, right) -> result`.
pub struct Binary<A> {
    symbol: String,
    apply: BinaryFn<A>,
}

impl<A> Binary<A> {
    pub fn new<F>(symbol: &str, apply: F) -> Self
    where
        F: Fn(A, A) -> A + Send + Sync + 'static,
    {
        Binary {
            symbol: symbol.to_string(),
            apply: Arc::new(apply),
        }
    }
}

/// A prefix or postfix operator.
pub struct Unary<A> {
    symbol: String,
    apply: UnaryFn<A>,
}

impl<A> Unary<A> {
    pub fn new<F>(symbol: &str, apply: F) -> Self
    where
        F: Fn(A) -> A + Send + Sync + 'static,
    {
        Unary {
            symbol: symbol.to_string(),
            apply: Arc::new(apply),
        }
    }
}

enum Level<A> {
    Left(Vec<Binary<A>>),
    Right(Vec<Binary<A>>),
    Prefix(Vec<Unary<A>>),
    Postfix(Vec<Unary<A>>),
    Primary(PrimaryFn<A>),
}

impl<A> Level<A> {
    fn symbols(&self) -> Vec<&str> {
        match self {
            Level::Left(ops) | Level::Right(ops) => ops.iter().map(|op| op.symbol.as_str()).collect(),
            Level::Prefix(ops) | Level::Postfix(ops) => ops.iter().map(|op| op.symbol.as_str()).collect(),
            Level::Primary(_) => Vec::new(),
        }
    }
}

/// Precedence levels, loosest first.
pub struct OperatorTable<A> {
    levels: Vec<Level<A>>,
}

impl<A: Attribute> Default for OperatorTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Attribute> OperatorTable<A> {
    pub fn new() -> Self {
        OperatorTable { levels: Vec::new() }
    }

    pub fn left(mut self, ops: Vec<Binary<A>>) -> Self {
        self.levels.push(Level::Left(ops));
        self
    }

    pub fn right(mut self, ops: Vec<Binary<A>>) -> Self {
        self.levels.push(Level::Right(ops));
        self
    }

    pub fn prefix(mut self, ops: Vec<Unary<A>>) -> Self {
        self.levels.push(Level::Prefix(ops));
        self
    }

    pub fn postfix(mut self, ops: Vec<Unary<A>>) -> Self {
        self.levels.push(Level::Postfix(ops));
        self
    }

    /// A level given by its own grammar. `f` receives a placeholder for
    /// every level; index 0 is the whole expression.
    pub fn primary<F, G>(mut self, f: F) -> Self
    where
        F: FnOnce(&[Forward<A>]) -> G + 'static,
        G: Into<Parser<A>>,
    {
        self.levels.push(Level::Primary(Box::new(move |levels| f(levels).into())));
        self
    }

    /// Build the expression grammar. Every grammar it creates starts from
    /// `config`, so an ignorable pattern there applies between tokens.
    pub fn build(self, config: &Config<A>) -> Result<Parser<A>, BuildError> {
        let count = self.levels.len();
        if count == 0 {
            return Err(BuildError::EmptyOperatorTable);
        }
        // Operator levels take their operand from the level below.
        if !matches!(self.levels[count - 1], Level::Primary(_)) {
            return Err(BuildError::MissingOperand { level: count - 1 });
        }

        let trie = Arc::new(Trie::new(self.levels.iter().flat_map(Level::symbols)));
        let forwards: Vec<Forward<A>> = (0..count).map(|_| Forward::new()).collect();
        let mut built = Vec::with_capacity(count);
        for (i, level) in self.levels.into_iter().enumerate() {
            let this = &forwards[i];
            let parser = match level {
                Level::Primary(f) => f(&forwards),
                Level::Left(ops) => {
                    let next = &forwards[i + 1];
                    let step = config
                        .grammar()
                        .or(ops.iter().map(|op| binary_step(config, &trie, op, next)));
                    config.grammar().then(next).then_zero_or_more(step).build()
                }
                Level::Right(ops) => {
                    let next = &forwards[i + 1];
                    let step = config
                        .grammar()
                        .or(ops.iter().map(|op| binary_step(config, &trie, op, this)));
                    config.grammar().then(next).then_maybe(step).build()
                }
                Level::Prefix(ops) => {
                    let next = &forwards[i + 1];
                    let branches = ops
                        .iter()
                        .map(|op| Pattern::from(prefix_step(config, &trie, op, this)))
                        .chain(std::iter::once(Pattern::from(next)));
                    config.grammar().or(branches).build()
                }
                Level::Postfix(ops) => {
                    let next = &forwards[i + 1];
                    let step = config
                        .grammar()
                        .or(ops.iter().map(|op| postfix_step(config, &trie, op)));
                    config.grammar().then(next).then_zero_or_more(step).build()
                }
            };
            this.define(parser.clone())?;
            built.push(parser);
        }
        built.into_iter().next().ok_or(BuildError::EmptyOperatorTable)
    }
}

/// `op operand`, combining the inherited left side with the operand.
fn binary_step<A: Attribute>(config: &Config<A>, trie: &Arc<Trie>, op: &Binary<A>, operand: &Forward<A>) -> Grammar<A> {
    let apply = Arc::clone(&op.apply);
    config.grammar().key_in(&op.symbol, Arc::clone(trie)).then_with(
        operand,
        Action::new(move |_, right: Option<A>, left: Option<A>, _| Some(apply(left?, right?))),
    )
}

fn prefix_step<A: Attribute>(config: &Config<A>, trie: &Arc<Trie>, op: &Unary<A>, operand: &Forward<A>) -> Grammar<A> {
    let apply = Arc::clone(&op.apply);
    config.grammar().key_in(&op.symbol, Arc::clone(trie)).then_with(
        operand,
        Action::new(move |_, value: Option<A>, _, _| value.map(|v| apply(v))),
    )
}

fn postfix_step<A: Attribute>(config: &Config<A>, trie: &Arc<Trie>, op: &Unary<A>) -> Grammar<A> {
    let apply = Arc::clone(&op.apply);
    config
        .grammar()
        .key_in(&op.symbol, Arc::clone(trie))
        .action(move |value: Option<A>| value.map(|v| apply(v)))
}
