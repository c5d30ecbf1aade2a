//! Parser definition.

/// The trait for abstracting the generated LALR(1) parse table.
pub trait ParseTable {
    /// The number to identify the state of LR automaton.
    type State: Copy;

    /// The number to identify the terminal/nonterminal symbols.
    type Symbol: Copy;

    /// The context value corresponding to the matched production rule.
    type Reduce;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol.
    ///
    /// If there is no lookahead symbol, a `None` is passed as the end of input.
    /// After a reduction the left-hand side nonterminal is passed as the
    /// lookahead, and the result tells where the goto leads.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Symbol, Self::Reduce>;
}

macro_rules! impl_parse_table_for_pointer {
    ($($ptr:ty),*) => {$(
        impl<T: ?Sized + ParseTable> ParseTable for $ptr {
            type State = T::State;
            type Symbol = T::Symbol;
            type Reduce = T::Reduce;

            fn initial_state(&self) -> Self::State {
                (**self).initial_state()
            }

            fn action(
                &self,
                current: Self::State,
                lookahead: Option<Self::Symbol>,
            ) -> ParseAction<Self::State, Self::Symbol, Self::Reduce> {
                (**self).action(current, lookahead)
            }
        }
    )*};
}

impl_parse_table_for_pointer!(&T, std::rc::Rc<T>, std::sync::Arc<T>);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseAction<TState, TSymbol, TReduce> {
    /// Consume the lookahead and go to the state.
    Shift(TState),
    /// Consume the lookahead and reduce by the rule right away.
    ShiftReduce(TReduce, TSymbol, usize),
    /// Reduce by the rule with the left-hand side and the length of the right-hand side.
    Reduce(TReduce, TSymbol, usize),
    Accept,
    /// The lookahead is not acceptable here.
    Fail,
    Error(ParseActionError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseActionError {
    #[error("incorrect state")]
    IncorrectState,

    #[error("incorrect symbol")]
    IncorrectSymbol,
}
