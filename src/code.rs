//! Linear instruction representation for compiled grammars.
//!
//! A [`Program`] is what a grammar builder produces and what the interpreter
//! runs. Control flow inside a repetition uses relative jump offsets that are
//! patched while the same program is still being built.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::action::Action;
use crate::pattern::Matcher;
use crate::trie::Trie;

/// Identifies one repetition construct's slot in the capture table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureId(pub(crate) usize);

/// Gate on the current attribute.
pub type Predicate<A> = Arc<dyn Fn(Option<&A>) -> bool + Send + Sync>;

/// Attribute transform for [`Instruction::RunAction`].
pub type Transform<A> = Arc<dyn Fn(Option<A>) -> Option<A> + Send + Sync>;

/// A compiled grammar.
pub struct Program<A> {
    pub(crate) instructions: Vec<Instruction<A>>,
    /// Pattern skipped between tokens, if configured.
    pub(crate) ignore: Option<Matcher<A>>,
    /// Number of capture slots used by this program.
    pub(crate) captures: usize,
}

impl<A> Program<A> {
    pub(crate) fn new(ignore: Option<Matcher<A>>) -> Self {
        Program {
            instructions: Vec::new(),
            ignore,
            captures: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction<A>] {
        &self.instructions
    }

    pub(crate) fn push(&mut self, instr: Instruction<A>) -> usize {
        self.instructions.push(instr);
        self.instructions.len() - 1
    }

    pub(crate) fn new_capture(&mut self) -> CaptureId {
        let id = CaptureId(self.captures);
        self.captures += 1;
        id
    }

    /// One instruction per line, prefixed by its address.
    pub fn listing(&self) -> String {
        self.instructions
            .iter()
            .enumerate()
            .map(|(pc, instr)| format!("{pc:4}  {instr:?}"))
            .join("\n")
    }
}

impl<A> fmt::Debug for Program<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("instructions", &self.instructions)
            .field("ignore", &self.ignore)
            .field("captures", &self.captures)
            .finish()
    }
}

/// A single compiled instruction.
pub enum Instruction<A> {
    /// Test and consume a pattern, then transform the attribute.
    Match {
        matcher: Matcher<A>,
        action: Option<Action<A>>,
        /// Record the match as one iteration of this repetition.
        capture: Option<CaptureId>,
        skip_ignored: bool,
    },
    /// Start of a repetition: opens the capture slot once per parse.
    LoopHeader { capture: CaptureId },
    /// Try one more iteration; on failure jump `exit` forward if `min` is met.
    RepeatTry {
        capture: CaptureId,
        min: usize,
        exit: usize,
        action: Option<Action<A>>,
        init: Option<A>,
    },
    /// End of a repetition body; jumps `back` to the matching `RepeatTry`.
    JumpBack { back: usize, max: Option<usize> },
    /// Ordered choice.
    Alternate(Vec<Matcher<A>>),
    /// Zero-width assertion.
    Lookahead { matcher: Matcher<A>, positive: bool },
    Condition(Predicate<A>),
    SetAttribute(A),
    RunAction(Transform<A>),
    /// Discard attributes from here to the end of the program.
    PassAll,
    SkipIgnored,
    /// Accept iff the longest keyword path equals `word`.
    KeywordMatch { trie: Arc<Trie>, word: String },
}

impl<A> fmt::Debug for Instruction<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Match {
                matcher,
                action,
                capture,
                skip_ignored,
            } => {
                write!(f, "MATCH {matcher:?}")?;
                if action.is_some() {
                    f.write_str(" +action")?;
                }
                if let Some(CaptureId(id)) = capture {
                    write!(f, " capture#{id}")?;
                }
                if !skip_ignored {
                    f.write_str(" noskip")?;
                }
                Ok(())
            }
            Instruction::LoopHeader { capture } => write!(f, "LOOP capture#{}", capture.0),
            Instruction::RepeatTry { min, exit, action, .. } => {
                write!(f, "REPEAT min={min} exit=+{exit}")?;
                if action.is_some() {
                    f.write_str(" +fold")?;
                }
                Ok(())
            }
            Instruction::JumpBack { back, max } => match max {
                Some(max) => write!(f, "JUMP -{back} max={max}"),
                None => write!(f, "JUMP -{back}"),
            },
            Instruction::Alternate(branches) => write!(f, "ALT [{}]", branches.iter().map(|b| format!("{b:?}")).join(", ")),
            Instruction::Lookahead { matcher, positive } => {
                write!(f, "{} {matcher:?}", if *positive { "AHEAD" } else { "AHEAD-NOT" })
            }
            Instruction::Condition(_) => f.write_str("COND"),
            Instruction::SetAttribute(_) => f.write_str("ATTR"),
            Instruction::RunAction(_) => f.write_str("ACTION"),
            Instruction::PassAll => f.write_str("PASSALL"),
            Instruction::SkipIgnored => f.write_str("IGNORE"),
            Instruction::KeywordMatch { word, .. } => write!(f, "KEY {word:?}"),
        }
    }
}
