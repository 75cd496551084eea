//! Extended state of a running machine.

use serde::Serialize;
use std::fmt::Debug;

/// Extended state carried alongside the active configuration.
///
/// Context is never mutated directly. Assign actions return patches and the
/// interpreter applies them in declaration order, so every write to the
/// context is an explicit, named field assignment.
///
/// # Example
///
/// ```rust
/// use chartmind::core::Context;
/// use serde::Serialize;
///
/// #[derive(Clone, Debug, Default, Serialize)]
/// struct Counter {
///     count: u32,
///     label: String,
/// }
///
/// #[derive(Debug)]
/// enum CounterPatch {
///     Count(u32),
///     Label(String),
/// }
///
/// impl Context for Counter {
///     type Patch = CounterPatch;
///
///     fn apply(&mut self, patch: CounterPatch) {
///         match patch {
///             CounterPatch::Count(count) => self.count = count,
///             CounterPatch::Label(label) => self.label = label,
///         }
///     }
/// }
///
/// let mut ctx = Counter::default();
/// ctx.apply(CounterPatch::Count(2));
/// assert_eq!(ctx.count, 2);
/// ```
pub trait Context: Clone + Debug + Serialize + Send + Sync + 'static {
    /// A single field assignment.
    type Patch: Debug + Send + 'static;

    /// Apply one field assignment.
    fn apply(&mut self, patch: Self::Patch);

    /// Apply assignments in order.
    fn apply_all<I>(&mut self, patches: I)
    where
        I: IntoIterator<Item = Self::Patch>,
    {
        for patch in patches {
            self.apply(patch);
        }
    }
}
