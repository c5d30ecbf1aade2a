//! Parser.

use crate::definition::{ParseAction, ParseActionError, ParseTable};
use std::{fmt, mem};

/// A trait for abstracting token symbols.
pub trait Token<TSym> {
    fn as_symbol(&self) -> TSym;
}

/// The parser driven based on the generated parse table.
#[derive(Debug)]
pub struct Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Symbol>,
{
    definition: TDef,
    state_stack: Vec<TDef::State>,
    item_stack: Vec<ParseItem<TTok, TDef::Symbol>>,
    parser_state: ParserState,
    peeked_token: Option<TTok>,
}

#[derive(Debug)]
enum ParserState {
    Reading,
    PendingGoto,
    Accepted,
}

impl<TDef, TTok> Parser<TDef, TTok>
where
    TDef: ParseTable,
    TTok: Token<TDef::Symbol>,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            state_stack: vec![initial_state],
            item_stack: vec![],
            parser_state: ParserState::Reading,
            peeked_token: None,
        }
    }

    /// Consume some tokens and drive the state machine
    /// until it matches a certain production rule.
    ///
    /// The symbols matched by the rule are stored in `args`.
    pub fn next_event<I, E>(
        &mut self,
        tokens: &mut I,
        args: &mut Vec<ParseItem<TTok, TDef::Symbol>>,
    ) -> Result<ParseEvent<TDef>, ParseError<E>>
    where
        I: Iterator<Item = Result<TTok, E>>,
        E: fmt::Display,
    {
        loop {
            if matches!(self.parser_state, ParserState::Accepted) {
                return Err(ParseError::AlreadyAccepted);
            }

            let current = *self
                .state_stack
                .last()
                .ok_or_else(|| ParseError::EmptyNodeStack)?;

            let pending_goto = matches!(self.parser_state, ParserState::PendingGoto);
            let input = if pending_goto {
                match self
                    .item_stack
                    .last()
                    .ok_or_else(|| ParseError::EmptyItemStack)?
                {
                    ParseItem::N(s) => Some(*s),
                    _ => return Err(ParseError::ParserDef(ParseActionError::IncorrectSymbol)),
                }
            } else {
                if self.peeked_token.is_none() {
                    self.peeked_token = tokens.next().transpose().map_err(ParseError::Lexer)?;
                }
                self.peeked_token.as_ref().map(|t| t.as_symbol())
            };

            match self.definition.action(current, input) {
                ParseAction::Shift(n) => {
                    if !pending_goto {
                        self.shift_token::<E>()?;
                    }
                    self.parser_state = ParserState::Reading;
                    self.state_stack.push(n);
                    continue;
                }

                // The shifted symbol is reduced at once, so no state is pushed for it.
                ParseAction::ShiftReduce(reduce, lhs, n) => {
                    if !pending_goto {
                        self.shift_token::<E>()?;
                    }
                    self.reduce::<E>(lhs, n, n.saturating_sub(1), args)?;
                    return Ok(ParseEvent::Reduce(reduce));
                }

                ParseAction::Reduce(reduce, lhs, n) => {
                    self.reduce::<E>(lhs, n, n, args)?;
                    return Ok(ParseEvent::Reduce(reduce));
                }

                ParseAction::Accept => {
                    let arg = self
                        .item_stack
                        .pop()
                        .ok_or_else(|| ParseError::EmptyItemStack)?;
                    args.clear();
                    args.push(arg);

                    self.parser_state = ParserState::Accepted;
                    return Ok(ParseEvent::Accept);
                }

                ParseAction::Fail => {
                    return Err(ParseError::Syntax);
                }

                ParseAction::Error(err) => {
                    return Err(ParseError::ParserDef(err));
                }
            }
        }
    }

    fn shift_token<E: fmt::Display>(&mut self) -> Result<(), ParseError<E>> {
        let t = self
            .peeked_token
            .take()
            .ok_or_else(|| ParseError::UnexpectedEOI)?;
        self.item_stack.push(ParseItem::T(t));
        Ok(())
    }

    fn reduce<E: fmt::Display>(
        &mut self,
        lhs: TDef::Symbol,
        nitems: usize,
        nstates: usize,
        args: &mut Vec<ParseItem<TTok, TDef::Symbol>>,
    ) -> Result<(), ParseError<E>> {
        if self.item_stack.len() < nitems {
            return Err(ParseError::EmptyItemStack);
        }
        // The initial state must stay on the stack.
        if self.state_stack.len() <= nstates {
            return Err(ParseError::EmptyNodeStack);
        }

        args.clear();
        args.extend(self.item_stack.drain(self.item_stack.len() - nitems..));
        self.state_stack.truncate(self.state_stack.len() - nstates);

        self.item_stack.push(ParseItem::N(lhs));
        self.parser_state = ParserState::PendingGoto;
        Ok(())
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ParseItem<TTok, TSym> {
    T(TTok),
    N(TSym),

    #[doc(hidden)]
    __Empty,
}

impl<TTok, TSym> Default for ParseItem<TTok, TSym> {
    fn default() -> Self {
        Self::__Empty
    }
}

impl<TTok, TSym> ParseItem<TTok, TSym> {
    pub fn take(&mut self) -> Option<Self> {
        match mem::replace(self, Self::__Empty) {
            Self::__Empty => None,
            me => Some(me),
        }
    }
}

#[derive(Debug)]
pub enum ParseEvent<TDef>
where
    TDef: ParseTable,
{
    Reduce(TDef::Reduce),
    Accept,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError<L: fmt::Display> {
    #[error("from lexer: {}", _0)]
    Lexer(L),

    #[error("from parser definition: {}", _0)]
    ParserDef(ParseActionError),

    #[error("syntax error")]
    Syntax,

    #[error("unexpected EOI")]
    UnexpectedEOI,

    #[error("empty node stack")]
    EmptyNodeStack,

    #[error("empty item stack")]
    EmptyItemStack,

    #[error("already accepted")]
    AlreadyAccepted,
}
