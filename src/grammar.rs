//! Fluent grammar builder.
//!
//! A [`Grammar`] appends instructions to its own [`Program`]. Repetition
//! combinators consume the grammar and return a [`Sealed`] handle: the loop's
//! jump offsets are fixed, so only the line-break and end-of-input terminals
//! may follow, plus [`Sealed::fold`] to attach the aggregation action.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::Attribute;
use crate::action::Action;
use crate::code::{CaptureId, Instruction, Program};
use crate::config::Config;
use crate::error::{BuildError, check_bounds};
use crate::pattern::{Match, Matcher, Pattern};
use crate::trie::Trie;

/// An open grammar: any combinator may be chained.
pub struct Grammar<A> {
    pub(crate) program: Program<A>,
    config: Config<A>,
}

/// A grammar ending in a repetition.
pub struct Sealed<A> {
    pub(crate) program: Program<A>,
    /// Address of the loop's `RepeatTry`.
    repeat: usize,
}

impl<A: Attribute> Default for Grammar<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Attribute> Grammar<A> {
    /// An empty grammar with no ignorable pattern and no keywords.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub(crate) fn with_config(config: &Config<A>) -> Self {
        let mut program = Program::new(config.ignore.clone());
        if config.ignore.is_some() {
            program.push(Instruction::SkipIgnored);
        }
        Grammar {
            program,
            config: config.clone(),
        }
    }

    fn push_match(&mut self, matcher: Matcher<A>, action: Option<Action<A>>, capture: Option<CaptureId>) {
        self.program.push(Instruction::Match {
            matcher,
            action,
            capture,
            skip_ignored: true,
        });
    }

    // --- Sequential matching ---

    /// Match `pattern`; the attribute it synthesizes replaces the current one.
    pub fn then(mut self, pattern: impl Into<Pattern<A>>) -> Self {
        self.push_match(Matcher::new(pattern), None, None);
        self
    }

    pub fn then_with(mut self, pattern: impl Into<Pattern<A>>, action: Action<A>) -> Self {
        self.push_match(Matcher::new(pattern), Some(action), None);
        self
    }

    /// Match `pattern` and keep the inherited attribute.
    pub fn then_pass(self, pattern: impl Into<Pattern<A>>) -> Self {
        self.then_with(pattern, Action::pass())
    }

    /// Match `pattern` and use its text, read as an integer, as the attribute.
    pub fn then_int(self, pattern: impl Into<Pattern<A>>) -> Self
    where
        A: From<i64>,
    {
        self.then_with(
            pattern,
            Action::new(|matched, _, _, _| matched.parse::<i64>().ok().map(A::from)),
        )
    }

    /// Match `pattern` and use its text, read as a float, as the attribute.
    pub fn then_float(self, pattern: impl Into<Pattern<A>>) -> Self
    where
        A: From<f64>,
    {
        self.then_with(
            pattern,
            Action::new(|matched, _, _, _| matched.parse::<f64>().ok().map(A::from)),
        )
    }

    /// Match a decimal float literal with optional fraction and exponent.
    pub fn real(self, signed: bool) -> Self
    where
        A: From<f64>,
    {
        let regex = if signed { &SIGNED_REAL } else { &REAL };
        self.then_float(Pattern::Regex(Regex::clone(regex)))
    }

    /// Match one line break: `\r\n`, `\r` or `\n`.
    pub fn br(mut self) -> Self {
        self.push_match(line_break(), None, None);
        self
    }

    /// Match the end of input.
    pub fn is_end(mut self) -> Self {
        self.push_match(end_of_input(), None, None);
        self
    }

    /// Match `id` only where it is not the prefix of a longer word.
    ///
    /// The identifier must be followed by the end of input, the ignorable
    /// pattern, or the start of a keyword. With neither an ignorable pattern
    /// nor keywords configured, any continuation is accepted.
    pub fn equals_id(mut self, id: &str) -> Self {
        self.program.push(Instruction::Match {
            matcher: Pattern::from(id).into(),
            action: None,
            capture: None,
            skip_ignored: false,
        });
        let ignore = self.config.ignore.clone();
        let trie = self.config.trie.clone();
        let boundary = Matcher::from_fn("<id boundary>", move |text: &str, index: usize, inherited: Option<&A>| {
            let at_boundary = index >= text.len()
                || (ignore.is_none() && trie.is_none())
                || ignore.as_ref().is_some_and(|m| m.find_at(text, index, inherited).is_some())
                || trie.as_ref().is_some_and(|t| t.search(text, index).is_some_and(|m| m.last_index > index));
            at_boundary.then(|| Match::span(text, index, index))
        });
        self.program.push(Instruction::Lookahead {
            matcher: boundary,
            positive: true,
        });
        self.program.push(Instruction::SkipIgnored);
        self
    }

    // --- Choice and assertions ---

    /// Ordered choice: the first branch that matches wins.
    pub fn or<I, P>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Pattern<A>>,
    {
        let branches = branches.into_iter().map(Matcher::new).collect();
        self.program.push(Instruction::Alternate(branches));
        self
    }

    pub fn lookahead(mut self, pattern: impl Into<Pattern<A>>) -> Self {
        self.program.push(Instruction::Lookahead {
            matcher: Matcher::new(pattern),
            positive: true,
        });
        self
    }

    pub fn lookahead_not(mut self, pattern: impl Into<Pattern<A>>) -> Self {
        self.program.push(Instruction::Lookahead {
            matcher: Matcher::new(pattern),
            positive: false,
        });
        self
    }

    /// Continue only if `pred` accepts the current attribute.
    pub fn cond<F>(mut self, pred: F) -> Self
    where
        F: Fn(Option<&A>) -> bool + Send + Sync + 'static,
    {
        self.program.push(Instruction::Condition(Arc::new(pred)));
        self
    }

    // --- Attribute control ---

    /// Drop all attributes computed from here to the end of the grammar.
    pub fn pass_all(mut self) -> Self {
        self.program.push(Instruction::PassAll);
        self
    }

    /// Overwrite the current attribute.
    pub fn attr(mut self, value: A) -> Self {
        self.program.push(Instruction::SetAttribute(value));
        self
    }

    /// Transform the current attribute; an absent result keeps it.
    pub fn action<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<A>) -> Option<A> + Send + Sync + 'static,
    {
        self.program.push(Instruction::RunAction(Arc::new(f)));
        self
    }

    // --- Keywords ---

    /// Match `word` as the longest keyword at this offset.
    pub fn key(self, word: &str) -> Self {
        let trie = self.default_trie();
        self.key_in(word, trie)
    }

    pub fn key_in(mut self, word: &str, trie: Arc<Trie>) -> Self {
        self.program.push(Instruction::KeywordMatch {
            trie,
            word: word.to_string(),
        });
        self
    }

    /// Succeed only where no keyword starts.
    pub fn not_key(self) -> Self {
        self.key("")
    }

    pub fn not_key_in(self, trie: Arc<Trie>) -> Self {
        self.key_in("", trie)
    }

    fn default_trie(&self) -> Arc<Trie> {
        match &self.config.trie {
            Some(trie) => Arc::clone(trie),
            None => Arc::new(Trie::new(std::iter::empty::<&str>())),
        }
    }

    // --- Repetition of this grammar ---

    /// Repeat this whole grammar between `min` and `max` times.
    pub fn times(self, min: usize, max: Option<usize>) -> Result<Sealed<A>, BuildError> {
        let config = self.config.clone();
        config.grammar().then_times(min, max, self)
    }

    pub fn at_least(self, min: usize) -> Sealed<A> {
        let config = self.config.clone();
        config.grammar().then_at_least(min, self)
    }

    pub fn at_most(self, max: usize) -> Result<Sealed<A>, BuildError> {
        self.times(0, Some(max))
    }

    pub fn maybe(self) -> Sealed<A> {
        let config = self.config.clone();
        config.grammar().then_maybe(self)
    }

    pub fn zero_or_more(self) -> Sealed<A> {
        self.at_least(0)
    }

    pub fn one_or_more(self) -> Sealed<A> {
        self.at_least(1)
    }

    /// Match this grammar one or more times, separated by `delimiter`.
    pub fn delimit(self, delimiter: impl Into<Pattern<A>>) -> Sealed<A> {
        let config = self.config.clone();
        config.grammar().then_delimit(self, delimiter)
    }

    // --- Repetition of a pattern ---

    pub fn then_times(
        self,
        min: usize,
        max: Option<usize>,
        pattern: impl Into<Pattern<A>>,
    ) -> Result<Sealed<A>, BuildError> {
        check_bounds(min, max)?;
        Ok(self.repeat(min, max, pattern.into()))
    }

    pub fn then_at_least(self, min: usize, pattern: impl Into<Pattern<A>>) -> Sealed<A> {
        self.repeat(min, None, pattern.into())
    }

    pub fn then_at_most(self, max: usize, pattern: impl Into<Pattern<A>>) -> Result<Sealed<A>, BuildError> {
        self.then_times(0, Some(max), pattern)
    }

    pub fn then_maybe(self, pattern: impl Into<Pattern<A>>) -> Sealed<A> {
        self.repeat(0, Some(1), pattern.into())
    }

    pub fn then_zero_or_more(self, pattern: impl Into<Pattern<A>>) -> Sealed<A> {
        self.then_at_least(0, pattern)
    }

    pub fn then_one_or_more(self, pattern: impl Into<Pattern<A>>) -> Sealed<A> {
        self.then_at_least(1, pattern)
    }

    /// Match `pattern` one or more times, separated by `delimiter`.
    ///
    /// A trailing delimiter with no element after it is left unconsumed.
    pub fn then_delimit(mut self, pattern: impl Into<Pattern<A>>, delimiter: impl Into<Pattern<A>>) -> Sealed<A> {
        let element: Matcher<A> = Matcher::new(pattern);
        let capture = self.program.new_capture();
        self.program.push(Instruction::LoopHeader { capture });
        self.push_match(element.clone(), None, Some(capture));
        let repeat = self.program.push(Instruction::RepeatTry {
            capture,
            min: 0,
            exit: 0,
            action: None,
            init: None,
        });
        self.push_match(Matcher::new(delimiter), None, None);
        self.push_match(element, None, Some(capture));
        self.close_loop(repeat, None)
    }

    /// Bounds are checked by the caller.
    fn repeat(mut self, min: usize, max: Option<usize>, pattern: Pattern<A>) -> Sealed<A> {
        let capture = self.program.new_capture();
        self.program.push(Instruction::LoopHeader { capture });
        let repeat = self.program.push(Instruction::RepeatTry {
            capture,
            min,
            exit: 0,
            action: None,
            init: None,
        });
        self.push_match(pattern.into(), None, Some(capture));
        self.close_loop(repeat, max)
    }

    /// Append the loop's `JumpBack` and patch the exit of its `RepeatTry`.
    fn close_loop(mut self, repeat: usize, max: Option<usize>) -> Sealed<A> {
        let jump = self.program.len();
        self.program.push(Instruction::JumpBack {
            back: jump - repeat,
            max,
        });
        let exit_to = self.program.len();
        if let Instruction::RepeatTry { exit, .. } = &mut self.program.instructions[repeat] {
            *exit = exit_to - repeat;
        }
        Sealed {
            program: self.program,
            repeat,
        }
    }

    /// Freeze into a shareable parser.
    pub fn build(self) -> crate::driver::Parser<A> {
        crate::driver::Parser::from_program(self.program)
    }

    pub fn listing(&self) -> String {
        self.program.listing()
    }
}

impl<A: Attribute> Sealed<A> {
    /// Fold every iteration's result into the attribute once the loop is done.
    ///
    /// `action` is called as `(matched, iteration, accumulator, extra)` in
    /// iteration order; the accumulator starts from `init`, or the attribute
    /// the grammar held when the loop began.
    pub fn fold(mut self, action: Action<A>, init: impl Into<Option<A>>) -> Self {
        if let Instruction::RepeatTry {
            action: slot,
            init: start,
            ..
        } = &mut self.program.instructions[self.repeat]
        {
            *slot = Some(action);
            *start = init.into();
        }
        self
    }

    pub fn br(mut self) -> Self {
        self.push_terminal(line_break());
        self
    }

    pub fn is_end(mut self) -> Self {
        self.push_terminal(end_of_input());
        self
    }

    fn push_terminal(&mut self, matcher: Matcher<A>) {
        self.program.push(Instruction::Match {
            matcher,
            action: None,
            capture: None,
            skip_ignored: true,
        });
    }

    pub fn build(self) -> crate::driver::Parser<A> {
        crate::driver::Parser::from_program(self.program)
    }

    pub fn listing(&self) -> String {
        self.program.listing()
    }
}

impl<A> From<Grammar<A>> for Pattern<A> {
    fn from(grammar: Grammar<A>) -> Self {
        Pattern::Grammar(Arc::new(grammar.program))
    }
}

impl<A> From<Sealed<A>> for Pattern<A> {
    fn from(sealed: Sealed<A>) -> Self {
        Pattern::Grammar(Arc::new(sealed.program))
    }
}

/// Digits with an optional fraction, or a bare fraction, then an optional
/// exponent. A trailing `.` or `e` is left unmatched.
static REAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").expect("real literal regex")
});

static SIGNED_REAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A[+-]?(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").expect("signed real literal regex")
});

fn line_break<A: Attribute>() -> Matcher<A> {
    Matcher::from_fn("<br>", |text: &str, index: usize, _: Option<&A>| {
        let rest = text.get(index..)?;
        let len = if rest.starts_with("\r\n") {
            2
        } else if rest.starts_with('\r') || rest.starts_with('\n') {
            1
        } else {
            return None;
        };
        Some(Match::span(text, index, index + len))
    })
}

fn end_of_input<A: Attribute>() -> Matcher<A> {
    Matcher::from_fn("<end>", |text: &str, index: usize, _: Option<&A>| {
        (index >= text.len()).then(|| Match::span(text, text.len(), text.len()))
    })
}
