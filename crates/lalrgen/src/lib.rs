//! A LALR(1) parser table generator.
//!
//! The generation is performed in the following passes:
//!
//! 1. nullable symbols and first sets ([`first_sets`])
//! 2. rule precedences ([`precedence`])
//! 3. LR(0) states with propagation links ([`lr0`])
//! 4. follow sets ([`lalr`])
//! 5. parser actions and conflict resolution ([`action`])
//! 6. default reductions and state renumbering ([`compress`])
//! 7. packed action tables ([`parse_table`])

pub mod action;
pub mod compress;
pub mod first_sets;
pub mod grammar;
pub mod lalr;
pub mod lr0;
pub mod packing;
pub mod parse_table;
pub mod precedence;
pub mod types;
pub mod util;

use crate::{
    action::Diagnostics, first_sets::FirstSets, grammar::Grammar, lr0::Automaton,
    parse_table::ParserTables,
};

/// How a shift/reduce conflict between equal precedences without
/// associativity is settled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NonassocPolicy {
    /// Keep the shift and report the conflict.
    #[default]
    Conflict,
    /// Replace the shift with a syntax error, as `%nonassoc` does.
    Error,
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    compress: bool,
    resort: bool,
    nonassoc: NonassocPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            compress: true,
            resort: true,
            nonassoc: NonassocPolicy::Conflict,
        }
    }

    /// Whether to use default reductions and fuse shifts into
    /// reduce-only states.
    pub fn compress(&mut self, enabled: bool) -> &mut Self {
        self.compress = enabled;
        self
    }

    /// Whether to renumber the states so that the ones with more actions come first.
    pub fn resort(&mut self, enabled: bool) -> &mut Self {
        self.resort = enabled;
        self
    }

    pub fn nonassoc(&mut self, policy: NonassocPolicy) -> &mut Self {
        self.nonassoc = policy;
        self
    }

    pub fn nonassoc_policy(&self) -> NonassocPolicy {
        self.nonassoc
    }
}

/// An error that aborts the table construction.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("{what} did not reach a fixed point within {bound} passes")]
    FixedPointBound { what: &'static str, bound: usize },

    #[error("state {state} was looked up with a different basis")]
    BasisMismatch { state: usize },

    #[error("state {state} has no transition on symbol {symbol}")]
    MissingTransition { state: usize, symbol: usize },

    #[error("too many states")]
    TooManyStates,

    #[error("too many configurations")]
    TooManyItems,

    #[error("action table offset is out of range")]
    OffsetOverflow,

    #[error("packed row for state {state} does not reproduce its actions")]
    PackingMismatch { state: usize },
}

/// The result of the parser table generation.
#[derive(Debug)]
pub struct Generated {
    pub automaton: Automaton,
    pub tables: ParserTables,
    pub diagnostics: Diagnostics,
}

/// Generate the parser tables of the specified grammar.
#[tracing::instrument(skip_all)]
pub fn generate(g: &Grammar, config: &Config) -> Result<Generated, BuildError> {
    let first_sets = FirstSets::compute(g)?;
    let precedences = precedence::resolve(g);

    let mut automaton = lr0::build(g, &first_sets)?;
    tracing::debug!("built {} states", automaton.states.len());
    lalr::find_links(&mut automaton);
    lalr::find_follow_sets(g, &mut automaton)?;

    let diagnostics = action::find_actions(g, &precedences, &mut automaton, config)?;

    if config.compress {
        compress::compress_tables(g, &mut automaton);
    }
    if config.resort {
        compress::resort_states(g, &mut automaton);
    }
    for conflict in &diagnostics.conflicts {
        tracing::warn!("parsing conflict in {}", conflict.display(g, &automaton));
    }

    let tables = ParserTables::build(g, &automaton)?;
    tracing::debug!(
        "action table: {} entries for {} of {} states",
        tables.actions.len(),
        tables.nxstate,
        tables.nstate,
    );

    Ok(Generated {
        automaton,
        tables,
        diagnostics,
    })
}
