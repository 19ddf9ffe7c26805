//! Backtracking interpreter for compiled grammars.
//!
//! [`run`] executes a [`Program`] against a string from a given offset. The
//! interpreter walks the instructions with a program counter; every loop
//! iteration and every nested grammar is an ordinary recursive call, so a
//! failed attempt is undone simply by returning `None`.
//!
//! The capture table holds each repetition's per-iteration matches. It is
//! created for one invocation of one program, shared by the recursive loop
//! calls of that invocation, and truncated when an attempted iteration fails.
//!
//! Recursion depth follows the input: each loop iteration and each nested
//! grammar costs one `exec` stack frame. A `zero_or_more` over a long input
//! is therefore bounded by the thread's stack size and can overflow it.

use tracing::{debug, trace};

use crate::Attribute;
use crate::action::{Action, merge};
use crate::code::{CaptureId, Instruction, Program};
use crate::pattern::Match;

/// Result of one interpreter call.
struct Outcome<A> {
    last_index: usize,
    attribute: Option<A>,
}

/// Run `program` on `text` starting at byte offset `start`.
pub(crate) fn run<A: Attribute>(program: &Program<A>, text: &str, start: usize, inherited: Option<A>) -> Option<Match<A>> {
    let mut machine = Machine {
        program,
        text,
        captures: vec![None; program.captures],
    };
    let outcome = machine.exec(start, 0, inherited, 0, false)?;
    Some(Match {
        matched: text.get(start..outcome.last_index)?.to_string(),
        last_index: outcome.last_index,
        attribute: outcome.attribute,
        extra: Vec::new(),
    })
}

struct Machine<'p, 't, A> {
    program: &'p Program<A>,
    text: &'t str,
    captures: Vec<Option<Vec<Match<A>>>>,
}

impl<A: Attribute> Machine<'_, '_, A> {
    /// Execute from `pc` at offset `start`. `count` is the number of loop
    /// iterations already entered by the enclosing calls.
    fn exec(&mut self, start: usize, pc: usize, attr: Option<A>, count: usize, pass_all: bool) -> Option<Outcome<A>> {
        let program = self.program;
        let text = self.text;
        let mut pc = pc;
        let mut index = start;
        let mut attr = attr;
        let mut pass_all = pass_all;
        let mut preattr = None;

        while let Some(instr) = program.instructions.get(pc) {
            trace!(pc, offset = index, instr = ?instr, "exec");
            match instr {
                Instruction::Match {
                    matcher,
                    action,
                    capture,
                    skip_ignored,
                } => {
                    let m = matcher.find_at(text, index, attr.as_ref())?;
                    index = m.last_index;
                    attr = execute_action(attr, action.as_ref(), &m, pass_all);
                    if let Some(id) = capture {
                        self.record(*id, m);
                    }
                    if *skip_ignored {
                        index = self.skip_ignored(index, attr.as_ref());
                    }
                    pc += 1;
                }
                Instruction::LoopHeader { capture } => {
                    let slot = &mut self.captures[capture.0];
                    if slot.is_none() {
                        *slot = Some(Vec::new());
                    }
                    preattr = attr.clone();
                    pc += 1;
                }
                Instruction::RepeatTry {
                    capture,
                    min,
                    exit,
                    action,
                    init,
                } => {
                    let recorded = self.recorded(*capture);
                    match self.exec(index, pc + 1, attr.clone(), count + 1, pass_all) {
                        Some(r) => {
                            attr = if pass_all { None } else { merge(attr, r.attribute) };
                            if count == 0 {
                                attr = self.finish_loop(attr, preattr.take(), *capture, action.as_ref(), init, pass_all);
                            }
                            return Some(Outcome {
                                last_index: r.last_index,
                                attribute: attr,
                            });
                        }
                        None => {
                            self.truncate(*capture, recorded);
                            if count < *min {
                                return None;
                            }
                            if count == 0 {
                                attr = self.finish_loop(attr, preattr.take(), *capture, action.as_ref(), init, pass_all);
                            }
                            pc += exit;
                        }
                    }
                }
                Instruction::JumpBack { back, max } => {
                    if max.is_some_and(|max| count >= max) {
                        pc += 1;
                    } else if index == start {
                        // Every further iteration would match empty too.
                        trace!(pc, offset = index, "iteration consumed nothing");
                        pc += 1;
                    } else {
                        pc -= back;
                    }
                }
                Instruction::Alternate(branches) => {
                    let m = branches
                        .iter()
                        .find_map(|branch| branch.find_at(text, index, attr.as_ref()))?;
                    index = m.last_index;
                    attr = if pass_all { None } else { merge(attr, m.attribute) };
                    index = self.skip_ignored(index, attr.as_ref());
                    pc += 1;
                }
                Instruction::Lookahead { matcher, positive } => {
                    if matcher.find_at(text, index, attr.as_ref()).is_some() != *positive {
                        return None;
                    }
                    pc += 1;
                }
                Instruction::Condition(pred) => {
                    if !pred(attr.as_ref()) {
                        return None;
                    }
                    pc += 1;
                }
                Instruction::SetAttribute(value) => {
                    attr = if pass_all { None } else { Some(value.clone()) };
                    pc += 1;
                }
                Instruction::RunAction(f) => {
                    let result = f(attr.clone());
                    attr = if pass_all { None } else { merge(attr, result) };
                    pc += 1;
                }
                Instruction::PassAll => {
                    pass_all = true;
                    pc += 1;
                }
                Instruction::SkipIgnored => {
                    index = self.skip_ignored(index, attr.as_ref());
                    pc += 1;
                }
                Instruction::KeywordMatch { trie, word } => {
                    let found = trie.search(text, index)?;
                    if found.matched != word.as_str() {
                        return None;
                    }
                    index = found.last_index;
                    index = self.skip_ignored(index, attr.as_ref());
                    pc += 1;
                }
            }
        }

        Some(Outcome {
            last_index: index,
            attribute: attr,
        })
    }

    fn skip_ignored(&self, index: usize, attr: Option<&A>) -> usize {
        match &self.program.ignore {
            Some(ignore) => ignore
                .find_at(self.text, index, attr)
                .map_or(index, |m| m.last_index),
            None => index,
        }
    }

    fn record(&mut self, id: CaptureId, m: Match<A>) {
        if let Some(Some(list)) = self.captures.get_mut(id.0) {
            list.push(m);
        }
    }

    fn recorded(&self, id: CaptureId) -> usize {
        self.captures
            .get(id.0)
            .and_then(Option::as_ref)
            .map_or(0, Vec::len)
    }

    fn truncate(&mut self, id: CaptureId, len: usize) {
        if let Some(Some(list)) = self.captures.get_mut(id.0) {
            list.truncate(len);
        }
    }

    /// Settle the attribute once a loop is done.
    ///
    /// With a fold action the accumulator starts from `init`, or the
    /// attribute held before the loop, and takes in every recorded iteration
    /// in order. Without one, the attribute threaded through the iterations
    /// stands.
    fn finish_loop(
        &self,
        attr: Option<A>,
        preattr: Option<A>,
        id: CaptureId,
        action: Option<&Action<A>>,
        init: &Option<A>,
        pass_all: bool,
    ) -> Option<A> {
        let captured = self
            .captures
            .get(id.0)
            .and_then(Option::as_deref)
            .unwrap_or_default();
        debug!(iterations = captured.len(), folded = action.is_some(), "repetition finished");
        match action {
            Some(action) => {
                let seed = if pass_all { None } else { merge(preattr, init.clone()) };
                captured
                    .iter()
                    .fold(seed, |acc, m| execute_action(acc, Some(action), m, pass_all))
            }
            None if pass_all => None,
            None => attr,
        }
    }
}

/// Compute the attribute after a successful match.
///
/// Under `pass_all` the action still runs but its result is dropped.
fn execute_action<A: Attribute>(attr: Option<A>, action: Option<&Action<A>>, m: &Match<A>, pass_all: bool) -> Option<A> {
    match action {
        Some(action) => {
            let result = action.call(&m.matched, m.attribute.clone(), attr.clone(), &m.extra);
            if pass_all { None } else { merge(attr, result) }
        }
        None if pass_all => None,
        None => merge(attr, m.attribute.clone()),
    }
}
