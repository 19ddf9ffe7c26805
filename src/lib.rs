//! Parser combinators compiled to a small backtracking machine.
//!
//! Grammars are built by chaining patterns onto a [`Grammar`]. Each step
//! appends instructions to a [`Program`], which the interpreter runs against
//! the input. Every grammar carries an optional attribute that actions
//! synthesize from matched text and pass along the chain.
//!
//! # Example
//!
//! ```rust
//! use skein::{Action, Config, Grammar, Parse, Pattern};
//!
//! let config: Config<String> = Config::new().with_ignore(Pattern::regex(r"\s+").unwrap());
//! let word = Pattern::regex("[a-z]+").unwrap();
//!
//! let list = config
//!     .grammar()
//!     .then_with(word, Action::matched())
//!     .delimit(",")
//!     .fold(Action::new(|_, item, acc: Option<String>, _| Some(acc? + &item?)), String::new());
//!
//! let parsed = list.parse("a , bc ,d", None).unwrap();
//! assert_eq!(parsed.attribute.as_deref(), Some("abcd"));
//! ```

pub mod action;
pub mod code;
mod config;
mod driver;
mod error;
mod grammar;
mod interpreter;
mod operator;
mod pattern;
mod recursion;
mod trie;

pub use action::{Action, merge};
pub use code::{Instruction, Program};
pub use config::Config;
pub use driver::{Parse, Parsed, Parser};
pub use error::BuildError;
pub use grammar::{Grammar, Sealed};
pub use operator::{Binary, OperatorTable, Unary};
pub use pattern::{Match, Matcher, Pattern, RegexFlags};
pub use recursion::{Forward, Nonterminals, fix, letrec};
pub use trie::{Trie, TrieMatch};

/// Values that can flow through a grammar as attributes.
///
/// Parsers are shared across threads, so attributes must be too.
pub trait Attribute: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Attribute for T {}
