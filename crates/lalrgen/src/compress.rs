//! Reduction of the parser actions before packing.

use crate::{
    action::{sort_actions, ActionKind},
    grammar::{Grammar, RuleID},
    lr0::{Automaton, StateID},
    types::Map,
};

/// Replace the most frequent reduction of each state with a default
/// reduction, and fuse shifts into states that can only reduce.
#[tracing::instrument(skip_all)]
pub fn compress_tables(g: &Grammar, automaton: &mut Automaton) {
    for state in &mut automaton.states {
        let uses_wildcard = g.wildcard.map_or(false, |wildcard| {
            state
                .actions
                .iter()
                .any(|a| a.lookahead == wildcard && matches!(a.kind, ActionKind::Shift(_)))
        });
        // A wildcard lookahead must never be consumed by a default reduction.
        if uses_wildcard {
            continue;
        }

        let mut counts = Map::<RuleID, usize>::default();
        for action in &state.actions {
            if let ActionKind::Reduce(rule) = action.kind {
                *counts.entry(rule).or_default() += 1;
            }
        }
        let mut best: Option<(RuleID, usize)> = None;
        for (&rule, &n) in &counts {
            if best.map_or(true, |(_, m)| n > m) {
                best = Some((rule, n));
            }
        }
        let Some((best, _)) = best else {
            continue;
        };

        for action in &mut state.actions {
            if action.kind == ActionKind::Reduce(best) {
                action.kind = ActionKind::NotUsed(best);
            }
        }
        sort_actions(&mut state.actions);
        state.default_reduce = Some(best);
        state.auto_reduce = !state.actions.iter().any(|a| a.kind.is_live());
    }

    // Shifting into a state that reduces unconditionally is the same as
    // shifting and reducing at once.
    let fused: Map<StateID, RuleID> = automaton
        .states
        .iter()
        .filter(|s| s.auto_reduce)
        .filter_map(|s| Some((s.id, s.default_reduce?)))
        .collect();
    let mut nfused = 0;
    for state in &mut automaton.states {
        for action in &mut state.actions {
            if let ActionKind::Shift(to) = action.kind {
                if let Some(&rule) = fused.get(&to) {
                    action.kind = ActionKind::ShiftReduce(rule);
                    nfused += 1;
                }
            }
        }
    }
    tracing::debug!(
        "{} auto-reduce states, {} fused shifts",
        fused.len(),
        nfused
    );
}

/// Renumber the states so that the ones with more actions come first.
///
/// The start state always keeps number 0.
#[tracing::instrument(skip_all)]
pub fn resort_states(g: &Grammar, automaton: &mut Automaton) {
    let counts: Vec<(usize, usize)> = automaton
        .states
        .iter()
        .map(|state| {
            let mut ntoken = 0;
            let mut nnonterminal = 0;
            for action in state.actions.iter().filter(|a| a.kind.is_live()) {
                if action.lookahead.index() < g.nterminal() {
                    ntoken += 1;
                } else {
                    nnonterminal += 1;
                }
            }
            (ntoken, nnonterminal)
        })
        .collect();

    let mut order: Vec<StateID> = automaton.order.clone();
    order[1..].sort_by(|a, b| {
        let (ta, na) = counts[a.index()];
        let (tb, nb) = counts[b.index()];
        nb.cmp(&na)
            .then(tb.cmp(&ta))
            .then(automaton.states[b.index()].number.cmp(&automaton.states[a.index()].number))
    });

    for (number, id) in order.iter().enumerate() {
        automaton.states[id.index()].number = number;
    }
    automaton.order = order;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::{self, Action},
        first_sets::FirstSets,
        grammar::{Assoc, SymbolID},
        lalr, lr0, precedence, Config,
    };

    fn prepare(g: &Grammar) -> Automaton {
        let first_sets = FirstSets::compute(g).unwrap();
        let precs = precedence::resolve(g);
        let mut automaton = lr0::build(g, &first_sets).unwrap();
        lalr::find_links(&mut automaton);
        lalr::find_follow_sets(g, &mut automaton).unwrap();
        action::find_actions(g, &precs, &mut automaton, &Config::new()).unwrap();
        automaton
    }

    fn expr_grammar() -> Grammar {
        Grammar::define(|def| {
            let e = def.symbol("e")?;
            let plus = def.symbol("PLUS")?;
            let times = def.symbol("TIMES")?;
            let num = def.symbol("NUM")?;
            def.precedence(Assoc::Left, [plus])?;
            def.precedence(Assoc::Left, [times])?;
            def.rule(e, [e, plus, e], None)?;
            def.rule(e, [e, times, e], None)?;
            def.rule(e, [num], None)?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn default_reduce_and_fusion() {
        let g = expr_grammar();
        let mut automaton = prepare(&g);
        compress_tables(&g, &mut automaton);

        let num = g.find_symbol("NUM").unwrap();
        let num_rule = RuleID::from_raw(2);

        // `e ::= NUM *` has nothing left but its default reduction.
        let num_state = automaton
            .states
            .iter()
            .find(|s| s.default_reduce == Some(num_rule))
            .unwrap();
        assert!(num_state.auto_reduce);
        assert!(num_state.actions.iter().all(|a| !a.kind.is_live()));

        // every shift of NUM is fused with the reduction.
        for state in &automaton.states {
            for action in state.actions.iter().filter(|a| a.lookahead == num) {
                assert_eq!(action.kind, ActionKind::ShiftReduce(num_rule));
            }
        }
    }

    #[test]
    fn default_reduce_takes_plurality() {
        // after X, `q` reduces on two of four lookaheads, `p` and `r` on one each.
        let g = Grammar::define(|def| {
            let s = def.symbol("s")?;
            let [p, q, r] = [def.symbol("p")?, def.symbol("q")?, def.symbol("r")?];
            let x = def.symbol("X")?;
            let ys = [def.symbol("Y1")?, def.symbol("Y2")?, def.symbol("Y3")?, def.symbol("Y4")?];
            def.rule(s, [p, ys[0]], None)?;
            def.rule(s, [q, ys[1]], None)?;
            def.rule(s, [q, ys[2]], None)?;
            def.rule(s, [r, ys[3]], None)?;
            for left in [p, q, r] {
                def.rule(left, [x], None)?;
            }
            Ok(())
        })
        .unwrap();
        let mut automaton = prepare(&g);
        compress_tables(&g, &mut automaton);

        let left_of = |rule: RuleID| g.symbol(g.rule(rule).left()).name().to_owned();
        let state = automaton
            .states
            .iter()
            .find(|s| s.actions.iter().filter_map(|a| a.kind.rule()).count() == 4)
            .unwrap();
        assert_eq!(state.default_reduce.map(left_of).as_deref(), Some("q"));
        assert!(!state.auto_reduce);

        let mut live: Vec<_> = state
            .actions
            .iter()
            .filter_map(|a| match a.kind {
                ActionKind::Reduce(rule) => Some(left_of(rule)),
                _ => None,
            })
            .collect();
        live.sort();
        assert_eq!(live, ["p", "r"]);
    }

    #[test]
    fn wildcard_suppresses_default() {
        // s ::= X ANY | X
        let g = Grammar::define(|def| {
            let s = def.symbol("s")?;
            let x = def.symbol("X")?;
            let any = def.symbol("ANY")?;
            def.wildcard(any)?;
            def.rule(s, [x, any], None)?;
            def.rule(s, [x], None)?;
            Ok(())
        })
        .unwrap();
        let mut automaton = prepare(&g);
        compress_tables(&g, &mut automaton);

        let any = g.find_symbol("ANY").unwrap();
        let state = automaton
            .states
            .iter()
            .find(|s| s.transitions.contains_key(&any))
            .unwrap();
        assert_eq!(state.default_reduce, None);
        assert!(state
            .actions
            .contains(&Action::new(SymbolID::EOI, ActionKind::Reduce(RuleID::from_raw(1)))));
    }

    #[test]
    fn resort_keeps_start_state() {
        let g = expr_grammar();
        let mut automaton = prepare(&g);
        compress_tables(&g, &mut automaton);
        resort_states(&g, &mut automaton);

        assert_eq!(automaton.order[0], StateID::from_raw(0));
        assert_eq!(automaton.state(StateID::from_raw(0)).number, 0);

        let mut numbers: Vec<_> = automaton.states.iter().map(|s| s.number).collect();
        numbers.sort();
        assert_eq!(numbers, (0..automaton.states.len()).collect::<Vec<_>>());

        // states with more nonterminal actions come first.
        let live_nonterminals = |id: &StateID| {
            automaton
                .state(*id)
                .actions
                .iter()
                .filter(|a| a.kind.is_live() && a.lookahead.index() >= g.nterminal())
                .count()
        };
        for pair in automaton.order[1..].windows(2) {
            assert!(live_nonterminals(&pair[0]) >= live_nonterminals(&pair[1]));
        }
    }
}
