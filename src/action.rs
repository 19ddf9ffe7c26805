//! Semantic actions and the attribute merge rule.

use std::fmt;
use std::sync::Arc;

/// Signature of an action: `(matched, synthesized, inherited, extra)`.
///
/// For a repetition fold the same shape is used, with the iteration's
/// attribute as `synthesized` and the accumulator as `inherited`.
pub type ActionFn<A> = dyn Fn(&str, Option<A>, Option<A>, &[Option<String>]) -> Option<A> + Send + Sync;

/// A shareable semantic action.
pub struct Action<A>(Arc<ActionFn<A>>);

impl<A> Clone for Action<A> {
    fn clone(&self) -> Self {
        Action(Arc::clone(&self.0))
    }
}

impl<A> fmt::Debug for Action<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<action>")
    }
}

impl<A: Clone + 'static> Action<A> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, Option<A>, Option<A>, &[Option<String>]) -> Option<A> + Send + Sync + 'static,
    {
        Action(Arc::new(f))
    }

    pub fn call(&self, matched: &str, synthesized: Option<A>, inherited: Option<A>, extra: &[Option<String>]) -> Option<A> {
        (self.0)(matched, synthesized, inherited, extra)
    }

    /// Use the matched text as the attribute.
    pub fn matched() -> Self
    where
        A: From<String>,
    {
        Action::new(|matched, _, _, _| Some(A::from(matched.to_string())))
    }

    /// Use the attribute the pattern synthesized.
    pub fn synthesized() -> Self {
        Action::new(|_, synthesized, _, _| synthesized)
    }

    /// Keep the inherited attribute.
    pub fn inherited() -> Self {
        Action::new(|_, _, inherited, _| inherited)
    }

    /// Produce nothing; the merge rule then keeps the inherited attribute.
    pub fn pass() -> Self {
        Action::new(|_, _, _, _| None)
    }
}

/// Merge a freshly computed attribute into the current one.
///
/// A present value replaces the old one; an absent value leaves it alone.
pub fn merge<A>(old: Option<A>, new: Option<A>) -> Option<A> {
    new.or(old)
}
