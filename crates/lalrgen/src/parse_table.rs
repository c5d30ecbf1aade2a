//! The packed parser tables.
//!
//! Every action is encoded as a single integer:
//!
//! | range                                 | meaning                          |
//! |---------------------------------------|----------------------------------|
//! | `0..min_shift_reduce`                 | shift, then go to the state      |
//! | `min_shift_reduce..error_action`      | shift, then reduce by the rule   |
//! | `error_action`                        | syntax error                     |
//! | `accept_action`                       | accept                           |
//! | `no_action`                           | unused slot                      |
//! | `min_reduce..max_action`              | reduce by the rule               |

use crate::{
    action::{Action, ActionKind},
    grammar::{Grammar, RuleID, SymbolID},
    lr0::Automaton,
    packing::ActionTable,
    util::display_fn,
    BuildError,
};
use lalrgen_runtime::definition::{ParseAction, ParseActionError, ParseTable};
use std::fmt;

/// A decoded table entry. Rules are identified by their code index.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TableAction {
    Shift(usize),
    ShiftReduce(u16),
    Error,
    Accept,
    NoAction,
    Reduce(u16),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    pub id: RuleID,
    pub left: SymbolID,
    pub len: usize,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct ParserTables {
    pub nstate: usize,
    /// The number of states that have rows in the packed array. The rest
    /// only perform their default reduction.
    pub nxstate: usize,
    pub nterminal: usize,
    pub nsymbol: usize,
    pub nrule: usize,

    pub min_shift_reduce: u32,
    pub error_action: u32,
    pub accept_action: u32,
    pub no_action: u32,
    pub min_reduce: u32,
    pub max_action: u32,

    /// The shared action array.
    pub actions: Vec<u32>,
    /// The lookahead each slot of `actions` belongs to; `nsymbol` if unused.
    pub lookaheads: Vec<usize>,
    /// Per state number, the offset of the terminal row.
    pub shift_offsets: Vec<Option<i32>>,
    /// Per state number, the offset of the nonterminal row.
    pub reduce_offsets: Vec<Option<i32>>,
    /// Per state number, the action taken when the lookahead is not in its row.
    pub defaults: Vec<u32>,

    /// Per terminal, the token tried next when it cannot be shifted.
    pub fallback: Vec<Option<SymbolID>>,
    pub wildcard: Option<SymbolID>,
    /// Per rule code index.
    pub rules: Vec<RuleInfo>,
}

impl ParserTables {
    #[tracing::instrument(skip_all)]
    pub fn build(g: &Grammar, automaton: &Automaton) -> Result<Self, BuildError> {
        let nstate = automaton.states.len();
        let nterminal = g.nterminal();
        let nsymbol = g.nsymbol();
        let nrule = g.nrule();

        let min_shift_reduce = nstate as u32;
        let error_action = min_shift_reduce + nrule as u32;
        let accept_action = error_action + 1;
        let no_action = accept_action + 1;
        let min_reduce = no_action + 1;
        let max_action = min_reduce + nrule as u32;

        let mut tables = Self {
            nstate,
            nxstate: nstate,
            nterminal,
            nsymbol,
            nrule,
            min_shift_reduce,
            error_action,
            accept_action,
            no_action,
            min_reduce,
            max_action,
            actions: vec![],
            lookaheads: vec![],
            shift_offsets: vec![None; nstate],
            reduce_offsets: vec![None; nstate],
            defaults: vec![error_action; nstate],
            fallback: vec![None; nterminal],
            wildcard: g.wildcard,
            rules: vec![],
        };

        // States that only reduce are never entered, so their rows are omitted.
        while tables.nxstate > 1
            && automaton.state(automaton.order[tables.nxstate - 1]).auto_reduce
        {
            tables.nxstate -= 1;
        }

        for (number, state) in automaton.states_in_order().enumerate() {
            if let Some(rule) = state.default_reduce {
                tables.defaults[number] = min_reduce + g.rule(rule).code_index() as u32;
            }
        }

        for terminal in g.terminals() {
            tables.fallback[terminal.id().index()] = terminal.fallback();
        }

        let mut rules: Vec<_> = g
            .rules
            .values()
            .filter(|rule| rule.id() != RuleID::ACCEPT)
            .map(|rule| {
                (
                    rule.code_index(),
                    RuleInfo {
                        id: rule.id(),
                        left: rule.left(),
                        len: rule.right().len(),
                    },
                )
            })
            .collect();
        rules.sort_by_key(|(code, _)| *code);
        tables.rules = rules.into_iter().map(|(_, info)| info).collect();

        // Collect the rows of each state, and place the larger ones first.
        struct Row {
            number: usize,
            is_token: bool,
            entries: Vec<(usize, u32)>,
        }
        let mut rows = vec![];
        for (number, state) in automaton.states_in_order().take(tables.nxstate).enumerate() {
            let mut tokens = vec![];
            let mut nonterminals = vec![];
            for action in &state.actions {
                let Some(code) = tables.compute_action(g, automaton, action) else {
                    continue;
                };
                let lookahead = action.lookahead.index();
                if lookahead < nterminal {
                    tokens.push((lookahead, code));
                } else if lookahead < nsymbol {
                    nonterminals.push((lookahead, code));
                }
            }
            rows.push(Row {
                number,
                is_token: true,
                entries: tokens,
            });
            rows.push(Row {
                number,
                is_token: false,
                entries: nonterminals,
            });
        }
        rows.sort_by(|a, b| b.entries.len().cmp(&a.entries.len()));

        let mut table = ActionTable::new(nterminal);
        for row in rows.iter().filter(|row| !row.entries.is_empty()) {
            for &(lookahead, code) in &row.entries {
                table.add_action(lookahead, code);
            }
            let offset = table.insert(row.is_token)?;
            tracing::trace!(
                "state {} {} row at offset {}",
                row.number,
                if row.is_token { "token" } else { "nonterminal" },
                offset
            );
            if row.is_token {
                tables.shift_offsets[row.number] = Some(offset);
            } else {
                tables.reduce_offsets[row.number] = Some(offset);
            }
        }

        for slot in table.entries() {
            match slot {
                Some(entry) => {
                    tables.lookaheads.push(entry.lookahead);
                    tables.actions.push(entry.action);
                }
                None => {
                    tables.lookaheads.push(nsymbol);
                    tables.actions.push(no_action);
                }
            }
        }

        for row in &rows {
            for &(lookahead, code) in &row.entries {
                let lookahead = SymbolID::from_raw(lookahead as u16);
                if tables.lookup_exact(row.number, lookahead) != Some(code) {
                    return Err(BuildError::PackingMismatch { state: row.number });
                }
            }
        }

        Ok(tables)
    }

    /// The integer code of a live action, or `None` for the others.
    fn compute_action(&self, g: &Grammar, automaton: &Automaton, action: &Action) -> Option<u32> {
        let code = |rule: RuleID| g.rule(rule).code_index() as u32;
        match action.kind {
            ActionKind::Shift(to) => Some(automaton.state(to).number as u32),
            // Nonterminals are shifted by the goto after a reduction, which
            // the parser follows with the reduction right away.
            ActionKind::ShiftReduce(rule) if action.lookahead.index() >= self.nterminal => {
                Some(self.min_reduce + code(rule))
            }
            ActionKind::ShiftReduce(rule) => Some(self.min_shift_reduce + code(rule)),
            ActionKind::Reduce(rule) => Some(self.min_reduce + code(rule)),
            ActionKind::Error => Some(self.error_action),
            ActionKind::Accept => Some(self.accept_action),
            _ => None,
        }
    }

    fn entry(&self, offset: Option<i32>, lookahead: SymbolID) -> Option<u32> {
        let i = usize::try_from(offset? + lookahead.index() as i32).ok()?;
        if *self.lookaheads.get(i)? == lookahead.index() {
            Some(self.actions[i])
        } else {
            None
        }
    }

    /// The action stored in the row of the state for the lookahead, ignoring
    /// defaults, fallbacks and the wildcard.
    pub fn lookup_exact(&self, state: usize, lookahead: SymbolID) -> Option<u32> {
        let offsets = if lookahead.index() < self.nterminal {
            &self.shift_offsets
        } else {
            &self.reduce_offsets
        };
        self.entry(*offsets.get(state)?, lookahead)
    }

    /// The action performed in the state when the terminal is the lookahead.
    pub fn find_shift_action(&self, state: usize, lookahead: SymbolID) -> u32 {
        let default = self.defaults.get(state).copied().unwrap_or(self.error_action);
        let Some(offset) = self.shift_offsets.get(state).copied().flatten() else {
            return default;
        };

        let mut lookahead = lookahead;
        // A chain of fallbacks visits each terminal at most once.
        for _ in 0..=self.nterminal {
            if let Some(action) = self.entry(Some(offset), lookahead) {
                return action;
            }
            if let Some(fallback) = self.fallback.get(lookahead.index()).copied().flatten() {
                lookahead = fallback;
                continue;
            }
            if let Some(wildcard) = self.wildcard {
                if lookahead != SymbolID::EOI {
                    if let Some(action) = self.entry(Some(offset), wildcard) {
                        return action;
                    }
                }
            }
            break;
        }
        default
    }

    /// The action performed after reducing to the nonterminal in the state.
    pub fn find_reduce_action(&self, state: usize, nonterminal: SymbolID) -> Option<u32> {
        self.entry(self.reduce_offsets.get(state).copied().flatten(), nonterminal)
    }

    pub fn decode(&self, code: u32) -> TableAction {
        match code {
            c if c < self.min_shift_reduce => TableAction::Shift(c as usize),
            c if c < self.error_action => TableAction::ShiftReduce((c - self.min_shift_reduce) as u16),
            c if c == self.error_action => TableAction::Error,
            c if c == self.accept_action => TableAction::Accept,
            c if c >= self.min_reduce && c < self.max_action => {
                TableAction::Reduce((c - self.min_reduce) as u16)
            }
            _ => TableAction::NoAction,
        }
    }

    /// The total number of table entries.
    pub fn size(&self) -> usize {
        self.actions.len()
            + self.lookaheads.len()
            + self.shift_offsets.len()
            + self.reduce_offsets.len()
            + self.defaults.len()
    }

    pub fn display_stats(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            writeln!(f, "states:          {} ({} with rows)", self.nstate, self.nxstate)?;
            writeln!(f, "terminals:       {}", self.nterminal)?;
            writeln!(f, "symbols:         {}", self.nsymbol)?;
            writeln!(f, "rules:           {}", self.nrule)?;
            writeln!(f, "action entries:  {}", self.actions.len())?;
            writeln!(f, "total size:      {}", self.size())
        })
    }

    fn to_parse_action(
        &self,
        code: u32,
        after_goto: bool,
    ) -> ParseAction<usize, SymbolID, RuleID> {
        let rule = |index: u16| self.rules.get(index as usize);
        match self.decode(code) {
            TableAction::Shift(next) => ParseAction::Shift(next),
            TableAction::ShiftReduce(index) => match rule(index) {
                Some(info) => ParseAction::ShiftReduce(info.id, info.left, info.len),
                None => ParseAction::Error(ParseActionError::IncorrectState),
            },
            TableAction::Reduce(index) => match rule(index) {
                Some(info) if after_goto => ParseAction::ShiftReduce(info.id, info.left, info.len),
                Some(info) => ParseAction::Reduce(info.id, info.left, info.len),
                None => ParseAction::Error(ParseActionError::IncorrectState),
            },
            TableAction::Accept => ParseAction::Accept,
            TableAction::Error => ParseAction::Fail,
            TableAction::NoAction => ParseAction::Error(ParseActionError::IncorrectState),
        }
    }
}

impl ParseTable for ParserTables {
    type State = usize;
    type Symbol = SymbolID;
    type Reduce = RuleID;

    fn initial_state(&self) -> Self::State {
        0
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Symbol, Self::Reduce> {
        let lookahead = lookahead.unwrap_or(SymbolID::EOI);
        if lookahead.index() < self.nterminal {
            self.to_parse_action(self.find_shift_action(current, lookahead), false)
        } else {
            match self.find_reduce_action(current, lookahead) {
                Some(code) => self.to_parse_action(code, true),
                None => ParseAction::Error(ParseActionError::IncorrectSymbol),
            }
        }
    }
}
