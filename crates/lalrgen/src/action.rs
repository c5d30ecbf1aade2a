//! Parser actions and conflict resolution.

use crate::{
    grammar::{Assoc, Grammar, RuleID, SymbolID, SymbolKind},
    lr0::{Automaton, StateID},
    precedence::RulePrecedences,
    util::{display_fn, get_two_mut},
    BuildError, Config, NonassocPolicy,
};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Action {
    pub lookahead: SymbolID,
    pub kind: ActionKind,
}

/// The kind of a parser action.
///
/// Actions that lost a conflict are kept with a tag describing why, so that
/// they can still be reported.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Shift(StateID),
    Accept,
    Reduce(RuleID),
    /// A syntax error; produced by a non-associative operator.
    Error,
    /// A shift that lost against another shift.
    SSConflict(StateID),
    /// A reduce that could not be resolved against a shift.
    SRConflict(RuleID),
    /// A reduce that lost against another reduce.
    RRConflict(RuleID),
    /// A shift that lost by precedence.
    ShiftResolved(StateID),
    /// A reduce that lost by precedence.
    ReduceResolved(RuleID),
    /// A reduce covered by the default reduction of the state.
    NotUsed(RuleID),
    /// Shift and immediately reduce by the rule.
    ShiftReduce(RuleID),
}

impl ActionKind {
    fn rank(&self) -> u8 {
        match self {
            Self::Shift(..) => 0,
            Self::Accept => 1,
            Self::Reduce(..) => 2,
            Self::Error => 3,
            Self::SSConflict(..) => 4,
            Self::SRConflict(..) => 5,
            Self::RRConflict(..) => 6,
            Self::ShiftResolved(..) => 7,
            Self::ReduceResolved(..) => 8,
            Self::NotUsed(..) => 9,
            Self::ShiftReduce(..) => 10,
        }
    }

    /// Whether the action is performed by the parser.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Shift(..) | Self::Accept | Self::Reduce(..) | Self::Error | Self::ShiftReduce(..)
        )
    }

    pub fn rule(&self) -> Option<RuleID> {
        match self {
            Self::Reduce(r)
            | Self::SRConflict(r)
            | Self::RRConflict(r)
            | Self::ReduceResolved(r)
            | Self::NotUsed(r)
            | Self::ShiftReduce(r) => Some(*r),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<StateID> {
        match self {
            Self::Shift(s) | Self::SSConflict(s) | Self::ShiftResolved(s) => Some(*s),
            _ => None,
        }
    }
}

impl Action {
    pub const fn new(lookahead: SymbolID, kind: ActionKind) -> Self {
        Self { lookahead, kind }
    }

    fn sort_key(&self) -> (SymbolID, u8, u16) {
        let tie = match (self.kind.rule(), self.kind.target()) {
            (Some(rule), _) => rule.into_raw(),
            (None, Some(state)) => state.index() as u16,
            (None, None) => 0,
        };
        (self.lookahead, self.kind.rank(), tie)
    }

    pub fn display<'a>(&'a self, g: &'a Grammar, automaton: &'a Automaton) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            write!(f, "{:>15} ", g.symbol(self.lookahead).name())?;
            let number = |s: &StateID| automaton.state(*s).number;
            match &self.kind {
                ActionKind::Shift(s) => write!(f, "shift        {}", number(s)),
                ActionKind::ShiftReduce(r) => {
                    write!(f, "shift-reduce {}", g.rule(*r).display(g))
                }
                ActionKind::Accept => write!(f, "accept"),
                ActionKind::Reduce(r) => write!(f, "reduce       {}", g.rule(*r).display(g)),
                ActionKind::Error => write!(f, "error"),
                ActionKind::SSConflict(s) => {
                    write!(f, "shift        {:<7} ** Parsing conflict **", number(s))
                }
                ActionKind::SRConflict(r) | ActionKind::RRConflict(r) => write!(
                    f,
                    "reduce       {} ** Parsing conflict **",
                    g.rule(*r).display(g)
                ),
                ActionKind::ShiftResolved(s) => {
                    write!(f, "shift        {:<7} -- dropped by precedence", number(s))
                }
                ActionKind::ReduceResolved(r) => write!(
                    f,
                    "reduce       {} -- dropped by precedence",
                    g.rule(*r).display(g)
                ),
                ActionKind::NotUsed(r) => {
                    write!(f, "reduce       {} -- default", g.rule(*r).display(g))
                }
            }
        })
    }
}

/// Sort the actions by lookahead and then by kind.
pub fn sort_actions(actions: &mut [Action]) {
    actions.sort_by_key(Action::sort_key);
}

/// A conflict that could not be resolved by precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub lookahead: SymbolID,
    /// The action kept in the tables.
    pub winner: ActionKind,
    /// The discarded action, tagged with the kind of conflict.
    pub loser: ActionKind,
}

impl Conflict {
    /// Shows the table number of the state, so it is only meaningful once
    /// the states are numbered for good.
    pub fn display<'a>(&'a self, g: &'a Grammar, automaton: &'a Automaton) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            write!(
                f,
                "state {} on `{}'",
                automaton.state(self.state).number,
                g.symbol(self.lookahead).name()
            )
        })
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    pub conflicts: Vec<Conflict>,
    pub conflict_count: usize,
    /// Rules that are never reduced in any state.
    pub unreduced_rules: Vec<RuleID>,
    /// Nonterminals that have no production rules.
    pub empty_nonterminals: Vec<SymbolID>,
}

/// Compute the actions of every state and resolve the conflicts among them.
#[tracing::instrument(skip_all)]
pub fn find_actions(
    g: &Grammar,
    precedences: &RulePrecedences,
    automaton: &mut Automaton,
    config: &Config,
) -> Result<Diagnostics, BuildError> {
    let mut diagnostics = Diagnostics::default();

    for index in 0..automaton.states.len() {
        let state = &automaton.states[index];
        let mut actions = vec![];

        for item_id in &state.items {
            let item = automaton.item(*item_id);
            match item.core.next_symbol(g) {
                Some(next) => {
                    if !state.transitions.contains_key(&next) {
                        return Err(BuildError::MissingTransition {
                            state: index,
                            symbol: next.index(),
                        });
                    }
                }
                None if item.core.rule == RuleID::ACCEPT => {
                    actions.push(Action::new(SymbolID::EOI, ActionKind::Accept));
                }
                None => {
                    for t in item.follow.iter() {
                        actions.push(Action::new(t, ActionKind::Reduce(item.core.rule)));
                    }
                }
            }
        }

        for (&symbol, &to) in &state.transitions {
            let symbol = g.symbol(symbol);
            match symbol.kind() {
                SymbolKind::MultiTerminal => {
                    for member in symbol.members() {
                        actions.push(Action::new(*member, ActionKind::Shift(to)));
                    }
                }
                _ => actions.push(Action::new(symbol.id(), ActionKind::Shift(to))),
            }
        }

        sort_actions(&mut actions);

        let state_id = state.id;
        for i in 0..actions.len() {
            let mut j = i + 1;
            while j < actions.len() && actions[j].lookahead == actions[i].lookahead {
                let (x, y) = get_two_mut(&mut actions, i, j);
                if resolve_conflict(g, precedences, config.nonassoc_policy(), x, y) {
                    diagnostics.conflict_count += 1;
                    diagnostics.conflicts.push(Conflict {
                        state: state_id,
                        lookahead: x.lookahead,
                        winner: x.kind,
                        loser: y.kind,
                    });
                }
                j += 1;
            }
        }

        automaton.states[index].actions = actions;
    }

    let mut reduced = vec![false; g.nrule()];
    for state in &automaton.states {
        for action in &state.actions {
            if let ActionKind::Reduce(rule) = action.kind {
                reduced[rule.into_raw() as usize] = true;
            }
        }
    }
    for rule in g.rules.values().filter(|r| r.id() != RuleID::ACCEPT) {
        if !reduced[rule.id().into_raw() as usize] {
            tracing::warn!("this rule can not be reduced: {}", rule.display(g));
            diagnostics.unreduced_rules.push(rule.id());
        }
    }

    diagnostics.empty_nonterminals = g.empty_nonterminals();
    for symbol in &diagnostics.empty_nonterminals {
        tracing::warn!("nonterminal `{}' has no rules", g.symbol(*symbol).name());
    }

    Ok(diagnostics)
}

/// Resolve a conflict between two actions on the same lookahead, where `x`
/// sorts before `y`.
///
/// Returns `true` if the conflict could not be resolved by precedence.
fn resolve_conflict(
    g: &Grammar,
    precedences: &RulePrecedences,
    policy: NonassocPolicy,
    x: &mut Action,
    y: &mut Action,
) -> bool {
    match (x.kind, y.kind) {
        (ActionKind::Shift(_), ActionKind::Shift(t)) => {
            y.kind = ActionKind::SSConflict(t);
            true
        }

        (ActionKind::Shift(s), ActionKind::Reduce(r)) => {
            let shift_prec = g.symbol(x.lookahead).precedence();
            let rule_prec = precedences.get(r);
            match (shift_prec, rule_prec) {
                (Some(sp), Some(rp)) if sp.priority > rp.priority => {
                    y.kind = ActionKind::ReduceResolved(r);
                    false
                }
                (Some(sp), Some(rp)) if sp.priority < rp.priority => {
                    x.kind = ActionKind::ShiftResolved(s);
                    false
                }
                (Some(sp), Some(_)) if sp.assoc == Assoc::Right => {
                    y.kind = ActionKind::ReduceResolved(r);
                    false
                }
                (Some(sp), Some(_)) if sp.assoc == Assoc::Left => {
                    x.kind = ActionKind::ShiftResolved(s);
                    false
                }
                (Some(_), Some(_)) if policy == NonassocPolicy::Error => {
                    x.kind = ActionKind::Error;
                    y.kind = ActionKind::ReduceResolved(r);
                    false
                }
                _ => {
                    y.kind = ActionKind::SRConflict(r);
                    true
                }
            }
        }

        // The lower rule index always wins a reduce/reduce conflict.
        (ActionKind::Reduce(_) | ActionKind::Accept | ActionKind::Error, ActionKind::Reduce(r)) => {
            y.kind = ActionKind::RRConflict(r);
            true
        }

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{first_sets::FirstSets, lalr, lr0, precedence};

    fn actions_of(g: &Grammar, config: &Config) -> (Automaton, Diagnostics) {
        let first_sets = FirstSets::compute(g).unwrap();
        let precs = precedence::resolve(g);
        let mut automaton = lr0::build(g, &first_sets).unwrap();
        lalr::find_links(&mut automaton);
        lalr::find_follow_sets(g, &mut automaton).unwrap();
        let diagnostics = find_actions(g, &precs, &mut automaton, config).unwrap();
        (automaton, diagnostics)
    }

    fn binop(assoc: Assoc) -> Grammar {
        Grammar::define(|def| {
            let e = def.symbol("e")?;
            let op = def.symbol("OP")?;
            let num = def.symbol("NUM")?;
            def.precedence(assoc, [op])?;
            def.rule(e, [e, op, e], None)?;
            def.rule(e, [num], None)?;
            Ok(())
        })
        .unwrap()
    }

    /// The actions on `OP` in the state containing `e ::= e OP e *`.
    fn actions_after_operand(g: &Grammar, automaton: &Automaton) -> Vec<ActionKind> {
        let op = g.find_symbol("OP").unwrap();
        let state = automaton
            .states
            .iter()
            .find(|s| {
                s.items.iter().any(|id| {
                    let core = automaton.item(*id).core;
                    core.rule == RuleID::from_raw(0) && core.dot == 3
                })
            })
            .unwrap();
        state
            .actions
            .iter()
            .filter(|a| a.lookahead == op)
            .map(|a| a.kind)
            .collect()
    }

    #[test]
    fn left_assoc_reduces() {
        let g = binop(Assoc::Left);
        let (automaton, diagnostics) = actions_of(&g, &Config::new());
        let kinds = actions_after_operand(&g, &automaton);
        assert!(matches!(
            kinds[..],
            [ActionKind::ShiftResolved(_), ActionKind::Reduce(_)]
        ));
        assert_eq!(diagnostics.conflict_count, 0);
    }

    #[test]
    fn right_assoc_shifts() {
        let g = binop(Assoc::Right);
        let (automaton, diagnostics) = actions_of(&g, &Config::new());
        let kinds = actions_after_operand(&g, &automaton);
        assert!(matches!(
            kinds[..],
            [ActionKind::Shift(_), ActionKind::ReduceResolved(_)]
        ));
        assert_eq!(diagnostics.conflict_count, 0);
    }

    #[test]
    fn nonassoc_follows_policy() {
        let g = binop(Assoc::Nonassoc);

        let (automaton, diagnostics) = actions_of(&g, &Config::new());
        let kinds = actions_after_operand(&g, &automaton);
        assert!(matches!(
            kinds[..],
            [ActionKind::Shift(_), ActionKind::SRConflict(_)]
        ));
        assert_eq!(diagnostics.conflict_count, 1);
        assert_eq!(diagnostics.conflicts.len(), 1);

        let mut config = Config::new();
        config.nonassoc(NonassocPolicy::Error);
        let (automaton, diagnostics) = actions_of(&g, &config);
        let kinds = actions_after_operand(&g, &automaton);
        assert!(matches!(
            kinds[..],
            [ActionKind::Error, ActionKind::ReduceResolved(_)]
        ));
        assert_eq!(diagnostics.conflict_count, 0);
    }

    #[test]
    fn reduce_reduce_prefers_earlier_rule() {
        // s ::= a | b
        // a ::= X
        // b ::= X
        let g = Grammar::define(|def| {
            let s = def.symbol("s")?;
            let a = def.symbol("a")?;
            let b = def.symbol("b")?;
            let x = def.symbol("X")?;
            def.rule(s, [a], None)?;
            def.rule(s, [b], None)?;
            def.rule(a, [x], None)?;
            def.rule(b, [x], None)?;
            Ok(())
        })
        .unwrap();
        let (automaton, diagnostics) = actions_of(&g, &Config::new());
        assert_eq!(diagnostics.conflict_count, 1);
        let conflict = &diagnostics.conflicts[0];
        assert_eq!(conflict.lookahead, SymbolID::EOI);
        assert_eq!(conflict.winner, ActionKind::Reduce(RuleID::from_raw(2)));
        assert_eq!(conflict.loser, ActionKind::RRConflict(RuleID::from_raw(3)));
        // `b ::= X` loses everywhere. `s ::= b` is still reduced in the goto state.
        assert_eq!(diagnostics.unreduced_rules, [RuleID::from_raw(3)]);

        for state in &automaton.states {
            let mut live: Vec<_> = state
                .actions
                .iter()
                .filter(|a| a.kind.is_live())
                .map(|a| a.lookahead)
                .collect();
            let n = live.len();
            live.dedup();
            assert_eq!(live.len(), n, "more than one live action per lookahead");
        }
    }

    #[test]
    fn token_class_shifts_each_member() {
        let g = Grammar::define(|def| {
            let e = def.symbol("e")?;
            let num = def.symbol("NUM")?;
            let ident = def.symbol("IDENT")?;
            let atom = def.token_class("ATOM", [num, ident])?;
            def.rule(e, [atom], None)?;
            Ok(())
        })
        .unwrap();
        let (automaton, _) = actions_of(&g, &Config::new());
        let start = automaton.state(StateID::from_raw(0));
        let shifted: Vec<_> = start
            .actions
            .iter()
            .filter(|a| matches!(a.kind, ActionKind::Shift(_)))
            .map(|a| g.symbol(a.lookahead).name())
            .collect();
        assert_eq!(shifted, ["NUM", "IDENT", "e"]);
    }

    #[test]
    fn reports_empty_nonterminals() {
        let g = Grammar::define(|def| {
            let s = def.symbol("s")?;
            let x = def.symbol("X")?;
            let unused = def.symbol("unused")?;
            def.rule(s, [x], None)?;
            def.rule(s, [unused], None)?;
            Ok(())
        })
        .unwrap();
        let (_, diagnostics) = actions_of(&g, &Config::new());
        let unused = g.find_symbol("unused").unwrap();
        assert_eq!(diagnostics.empty_nonterminals, [unused]);
    }
}
