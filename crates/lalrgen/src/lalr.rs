//! LALR(1) follow sets computation.
//!
//! The follow sets seeded during the LR(0) construction are propagated along
//! the links between configurations until nothing changes. Since the states
//! with equal bases were merged, the result is the LALR(1) lookahead.

use crate::{
    grammar::{Grammar, RuleID, SymbolID},
    lr0::{Automaton, ItemCore, ItemID, StateID},
    util::{fixed_point, get_two_mut},
    BuildError,
};

/// Convert the backward links recorded by the state construction into forward links.
#[tracing::instrument(skip_all)]
pub fn find_links(automaton: &mut Automaton) {
    for i in 0..automaton.items.len() {
        let backward_links = automaton.items[i].backward_links.clone();
        for source in backward_links {
            let links = &mut automaton.items[source.index()].forward_links;
            let target = ItemID::from_index(i);
            if !links.contains(&target) {
                links.push(target);
            }
        }
    }
}

/// Propagate follow sets along the forward links until a fixed point is reached.
///
/// Returns the number of passes over the configurations.
#[tracing::instrument(skip_all)]
pub fn find_follow_sets(g: &Grammar, automaton: &mut Automaton) -> Result<usize, BuildError> {
    let start = automaton.state(StateID::from_raw(0));
    let seed = start
        .basis
        .iter()
        .copied()
        .find(|id| automaton.item(*id).core == ItemCore::new(RuleID::ACCEPT, 0))
        .ok_or(BuildError::BasisMismatch { state: 0 })?;
    automaton.items[seed.index()].follow.insert(SymbolID::EOI);

    let nitems = automaton.items.len();
    let mut dirty = vec![true; nitems];

    // Every productive pass adds at least one terminal to some follow set.
    let bound = nitems * g.nterminal() + 1;
    let passes = fixed_point("follow sets", bound, || {
        let mut changed = false;
        for i in 0..nitems {
            if !dirty[i] {
                continue;
            }
            dirty[i] = false;

            for k in 0..automaton.items[i].forward_links.len() {
                let target = automaton.items[i].forward_links[k].index();
                if target == i {
                    continue;
                }
                let (source, target_item) = get_two_mut(&mut automaton.items, i, target);
                if target_item.follow.union_with(&source.follow) {
                    dirty[target] = true;
                    changed = true;
                }
            }
        }
        changed
    })?;

    tracing::debug!("follow sets converged after {} passes", passes);
    Ok(passes)
}
