//! Generation of visitation thunk tables.
//!
//! For operands `O0 .. O(K-1)` the table holds one thunk per combination of
//! their alternatives. It is produced by two mutually recursive traits over
//! type-level lists:
//!
//! - [`Table`] walks the operands, last one first, and for each operand hands
//!   its list of alternatives to [`Fan`];
//! - [`Fan`] walks the alternatives of that operand and, for each one, records
//!   the choice in the selection `S` and recurses into [`Table`] for the
//!   remaining operands, concatenating the results.
//!
//! Since the last operand is expanded outermost, the first operand varies
//! fastest: the thunk for alternative indices `i0 .. i(K-1)` sits at
//! `Σ i_k * divisor_k` where `divisor_0 = 1` and `divisor_k` is the product of
//! the alternative counts of the operands before `k`.

use core::{marker::PhantomData, ptr::NonNull};

use crate::{
    dispatch::operand::{Extract, Operand},
    flat::{Concat, FlatArray, Leaf},
    list::{Cons, Nil},
    util::Erased,
};

/// Signature of a thunk: visitor, operand storages, result slot.
pub type Thunk = unsafe fn(NonNull<Erased>, &[NonNull<Erased>], NonNull<Erased>);

/// A visitor accepting the arguments `Args`.
///
/// For a single operand `Args` is the extracted alternative itself (`&T`,
/// `&mut T` or `T` depending on how the union was passed); for several
/// operands it is a tuple of them, in operand order.
pub trait Visit<Args> {
    /// The result of visiting `Args`.
    type Output;

    /// Visits one combination of alternatives.
    fn visit(&mut self, args: Args) -> Self::Output;
}

/// Policy turning each combination's output into the common result type `R`.
pub trait Resolve<O, R> {
    /// Converts the output of one combination.
    fn resolve(output: O) -> R;
}

/// Requires every combination to produce exactly `R`.
#[derive(Clone, Copy, Debug)]
pub enum Exact {}

impl<R> Resolve<R, R> for Exact {
    #[inline]
    fn resolve(output: R) -> R {
        output
    }
}

/// Accepts any output convertible into `R`.
#[derive(Clone, Copy, Debug)]
pub enum Convert {}

impl<O: Into<R>, R> Resolve<O, R> for Convert {
    #[inline]
    fn resolve(output: O) -> R {
        output.into()
    }
}

/// Marks that operand `O` takes part in a combination with its alternative
/// `T`.
pub struct Pick<O, T>(PhantomData<(fn() -> O, fn() -> T)>);

/// A list of [`Pick`]s, one per operand in operand order, describing one
/// combination.
///
/// # Safety
///
/// [`Selection::extract`] may only read `storages[k]` as the alternative picked
/// for operand `k`.
pub unsafe trait Selection {
    /// The arguments passed to the visitor.
    type Args;

    /// Extracts the picked alternatives from the operands' storages.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `storages` has one entry per operand, and entry `k` is the storage of
    ///    operand `k`, currently holding the alternative picked for it.
    /// 2. Each storage is extracted at most once, and owned operands are not
    ///    dropped afterwards.
    unsafe fn extract(storages: &[NonNull<Erased>]) -> Self::Args;
}

/// Implements [`Selection`] for a list of picks of the given arity.
macro_rules! selection {
    ($args:ty; $($operand:ident $alternative:ident $index:tt),+) => {
        // SAFETY: `extract` reads storage `k` only as the alternative picked for
        // operand `k`.
        unsafe impl<$($operand, $alternative),+> Selection for selection!(@list $($operand $alternative)+)
        where
            $($operand: Extract<$alternative>,)+
        {
            type Args = $args;

            #[inline]
            unsafe fn extract(storages: &[NonNull<Erased>]) -> Self::Args {
                ($(
                    // SAFETY:
                    // 1. Guaranteed by the caller
                    // 2. Guaranteed by the caller
                    unsafe { <$operand as Extract<$alternative>>::extract(storages[$index]) }
                ),+)
            }
        }
    };
    (@list) => { Nil };
    (@list $operand:ident $alternative:ident $($rest:ident)*) => {
        Cons<Pick<$operand, $alternative>, selection!(@list $($rest)*)>
    };
}

selection!(<O0 as Extract<T0>>::Arg; O0 T0 0);
selection!(
    (<O0 as Extract<T0>>::Arg, <O1 as Extract<T1>>::Arg);
    O0 T0 0, O1 T1 1
);
selection!(
    (
        <O0 as Extract<T0>>::Arg,
        <O1 as Extract<T1>>::Arg,
        <O2 as Extract<T2>>::Arg,
    );
    O0 T0 0, O1 T1 1, O2 T2 2
);
selection!(
    (
        <O0 as Extract<T0>>::Arg,
        <O1 as Extract<T1>>::Arg,
        <O2 as Extract<T2>>::Arg,
        <O3 as Extract<T3>>::Arg,
    );
    O0 T0 0, O1 T1 1, O2 T2 2, O3 T3 3
);

/// Invokes visitor `V` on the combination `S` and writes the result as `R`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `visitor` points to a `V` that may be mutated.
/// 2. The requirements of [`Selection::extract`] hold for `S` and `storages`.
/// 3. `result` is valid for writes of an `R`.
unsafe fn thunk<V, S, R, P>(
    visitor: NonNull<Erased>,
    storages: &[NonNull<Erased>],
    result: NonNull<Erased>,
) where
    S: Selection,
    V: Visit<S::Args>,
    P: Resolve<<V as Visit<S::Args>>::Output, R>,
{
    let mut visitor = visitor.cast::<V>();
    // SAFETY:
    // 1. Guaranteed by the caller
    let visitor: &mut V = unsafe { visitor.as_mut() };
    // SAFETY:
    // 2. Guaranteed by the caller
    let args = unsafe { S::extract(storages) };
    let output = P::resolve(visitor.visit(args));
    // SAFETY:
    // 3. Guaranteed by the caller
    unsafe { result.cast::<R>().write(output) };
}

/// The thunk table for the operands `Self` (in reverse order), given the picks
/// `S` already made for the operands after them.
///
/// # Safety
///
/// [`Table::THUNKS`] must hold, in mixed-radix order with the first remaining
/// operand varying fastest, one thunk per combination of alternatives of the
/// remaining operands, each combined with `S`.
pub unsafe trait Table<V, R, P, S> {
    /// The layout of the table.
    type Thunks: FlatArray<Thunk>;
    /// The table itself.
    const THUNKS: Self::Thunks;
}

// SAFETY: with no operands left the only combination is `S` itself.
unsafe impl<V, R, P, S> Table<V, R, P, S> for Nil
where
    S: Selection,
    V: Visit<S::Args>,
    P: Resolve<<V as Visit<S::Args>>::Output, R>,
{
    type Thunks = Leaf<Thunk>;
    const THUNKS: Self::Thunks = Leaf(thunk::<V, S, R, P> as Thunk);
}

// SAFETY: `Fan` lays out one block per alternative of `O`, in order, and each
// block is the table of the operands before `O`.
unsafe impl<V, R, P, S, O, Rest> Table<V, R, P, S> for Cons<O, Rest>
where
    O: Operand,
    O::Alternatives: Fan<V, R, P, S, O, Rest>,
{
    type Thunks = <O::Alternatives as Fan<V, R, P, S, O, Rest>>::Thunks;
    const THUNKS: Self::Thunks = <O::Alternatives as Fan<V, R, P, S, O, Rest>>::THUNKS;
}

/// The blocks of a thunk table for the alternatives `Self` of operand `O`.
///
/// # Safety
///
/// [`Fan::THUNKS`] must hold, for each alternative `T` of `Self` in order, the
/// table of `Rest` given the picks `Cons<Pick<O, T>, S>`.
pub unsafe trait Fan<V, R, P, S, O, Rest> {
    /// The layout of the blocks.
    type Thunks: FlatArray<Thunk>;
    /// The blocks themselves.
    const THUNKS: Self::Thunks;
}

// SAFETY: no alternatives, no blocks.
unsafe impl<V, R, P, S, O, Rest> Fan<V, R, P, S, O, Rest> for Nil {
    type Thunks = ();
    const THUNKS: Self::Thunks = ();
}

// SAFETY: the block for `H` comes first, followed by the blocks for the tail.
unsafe impl<V, R, P, S, O, Rest, H, Tail> Fan<V, R, P, S, O, Rest> for Cons<H, Tail>
where
    Rest: Table<V, R, P, Cons<Pick<O, H>, S>>,
    Tail: Fan<V, R, P, S, O, Rest>,
{
    type Thunks = Concat<
        <Rest as Table<V, R, P, Cons<Pick<O, H>, S>>>::Thunks,
        <Tail as Fan<V, R, P, S, O, Rest>>::Thunks,
    >;
    const THUNKS: Self::Thunks = Concat(
        <Rest as Table<V, R, P, Cons<Pick<O, H>, S>>>::THUNKS,
        <Tail as Fan<V, R, P, S, O, Rest>>::THUNKS,
    );
}
