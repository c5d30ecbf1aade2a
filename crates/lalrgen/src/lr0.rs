//! Construction of LR(0) states.
//!
//! Each state owns a set of configurations (LR items). Configurations are
//! stored in a single arena and linked to each other by index, so that the
//! follow sets can later be propagated along the links.

use crate::{
    action::Action,
    first_sets::FirstSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalSet},
    types::{Map, Queue},
    util::display_fn,
    BuildError,
};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "St#{:03}", self.0)
    }
}

impl StateID {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemID(u32);

impl fmt::Debug for ItemID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I#{:04}", self.0)
    }
}

impl ItemID {
    /// `index` must be a position in the item arena.
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A rule with a position marker, ordered by rule and then by position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemCore {
    pub rule: RuleID,
    pub dot: u16,
}

impl ItemCore {
    pub const fn new(rule: RuleID, dot: u16) -> Self {
        Self { rule, dot }
    }

    /// The symbol just after the dot.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(self.dot as usize).copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.dot as usize == g.rule(self.rule).right().len()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{} ::=", g.symbol(rule.left()))?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.dot as usize {
                    f.write_str(" *")?;
                }
                write!(f, " {}", g.symbol(*symbol))?;
            }
            if self.dot as usize == rule.right().len() {
                f.write_str(" *")?;
            }
            Ok(())
        })
    }
}

/// A configuration: an LR(0) item inside a particular state, together with
/// its follow set and propagation links.
#[derive(Debug)]
pub struct Item {
    pub core: ItemCore,
    pub state: StateID,
    pub is_basis: bool,
    pub follow: TerminalSet,
    /// Configurations whose follow sets include the follow set of this one.
    pub forward_links: Vec<ItemID>,
    /// Configurations whose follow sets are included in this one.
    pub backward_links: Vec<ItemID>,
}

#[derive(Debug)]
pub struct State {
    pub id: StateID,
    /// The state number used in the generated tables.
    pub number: usize,
    /// The basis configurations, sorted by core.
    pub basis: Vec<ItemID>,
    /// All configurations of this state (basis and closure), sorted by core.
    pub items: Vec<ItemID>,
    pub transitions: Map<SymbolID, StateID>,
    pub actions: Vec<Action>,
    pub default_reduce: Option<RuleID>,
    /// Whether the state performs the default reduction without consulting the lookahead.
    pub auto_reduce: bool,
}

#[derive(Debug)]
pub struct Automaton {
    /// The states, indexed by `StateID`. State 0 is the start state.
    pub states: Vec<State>,
    pub items: Vec<Item>,
    /// The state IDs ordered by state number.
    pub order: Vec<StateID>,
}

impl Automaton {
    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn item(&self, id: ItemID) -> &Item {
        &self.items[id.index()]
    }

    /// Find the state whose basis consists of exactly the specified cores.
    pub fn find_state(&self, basis: &[ItemCore]) -> Option<StateID> {
        self.states.iter().map(|s| s.id).find(|id| {
            let state = self.state(*id);
            state.basis.len() == basis.len()
                && state
                    .basis
                    .iter()
                    .zip(basis)
                    .all(|(item, core)| self.item(*item).core == *core)
        })
    }

    /// The states in the order of state numbers.
    pub fn states_in_order(&self) -> impl Iterator<Item = &State> + '_ {
        self.order.iter().map(|id| self.state(*id))
    }

    pub fn display<'a>(&'a self, g: &'a Grammar) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            for state in self.states_in_order() {
                writeln!(f, "State {}:", state.number)?;
                for id in &state.items {
                    let item = self.item(*id);
                    if !item.is_basis && !item.core.is_complete(g) {
                        continue;
                    }
                    write!(f, "  {:>5} {}", "", item.core.display(g))?;
                    if !item.follow.is_empty() {
                        f.write_str("  [")?;
                        for (i, t) in item.follow.iter().enumerate() {
                            if i > 0 {
                                f.write_str(" ")?;
                            }
                            write!(f, "{}", g.symbol(t))?;
                        }
                        f.write_str("]")?;
                    }
                    writeln!(f)?;
                }
                writeln!(f)?;
                for action in &state.actions {
                    writeln!(f, "  {}", action.display(g, self))?;
                }
                if let Some(rule) = state.default_reduce {
                    write!(f, "  {:>15} reduce {}", "{default}", g.rule(rule).display(g))?;
                    if state.auto_reduce {
                        f.write_str(" (auto)")?;
                    }
                    writeln!(f)?;
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

/// Compute the LR(0) states of the grammar.
///
/// The follow sets are seeded with the spontaneously generated lookaheads
/// and the backward propagation links are recorded, but no propagation is
/// performed here.
#[tracing::instrument(skip_all)]
pub fn build(g: &Grammar, first_sets: &FirstSets) -> Result<Automaton, BuildError> {
    let mut builder = Builder {
        g,
        first_sets,
        items: vec![],
        states: vec![],
        isocores: Map::default(),
        pending: Queue::default(),
    };

    builder.get_state(vec![(ItemCore::new(RuleID::ACCEPT, 0), None)])?;
    while let Some(id) = builder.pending.pop() {
        builder.closure(id)?;
        builder.build_shifts(id)?;
    }

    let order = builder.states.iter().map(|s| s.id).collect();
    Ok(Automaton {
        states: builder.states,
        items: builder.items,
        order,
    })
}

struct Builder<'g> {
    g: &'g Grammar,
    first_sets: &'g FirstSets,
    items: Vec<Item>,
    states: Vec<State>,
    isocores: Map<Vec<ItemCore>, StateID>,
    pending: Queue<StateID>,
}

impl Builder<'_> {
    fn new_item(
        &mut self,
        core: ItemCore,
        state: StateID,
        is_basis: bool,
    ) -> Result<ItemID, BuildError> {
        let raw = u32::try_from(self.items.len()).map_err(|_| BuildError::TooManyItems)?;
        self.items.push(Item {
            core,
            state,
            is_basis,
            follow: TerminalSet::default(),
            forward_links: vec![],
            backward_links: vec![],
        });
        Ok(ItemID(raw))
    }

    /// Return the state with the given basis, creating it if it does not exist yet.
    ///
    /// `basis` must be sorted by core. Each entry carries the configuration
    /// in the predecessor state that the basis configuration was derived from.
    fn get_state(&mut self, basis: Vec<(ItemCore, Option<ItemID>)>) -> Result<StateID, BuildError> {
        let key: Vec<ItemCore> = basis.iter().map(|(core, _)| *core).collect();

        if let Some(&id) = self.isocores.get(&key) {
            let state = &self.states[id.index()];
            if state.basis.len() != basis.len() {
                return Err(BuildError::BasisMismatch { state: id.index() });
            }
            for (&item_id, (core, source)) in state.basis.iter().zip(&basis) {
                let item = &mut self.items[item_id.index()];
                if item.core != *core {
                    return Err(BuildError::BasisMismatch { state: id.index() });
                }
                if let Some(source) = source {
                    item.backward_links.push(*source);
                }
            }
            return Ok(id);
        }

        let raw = u16::try_from(self.states.len())
            .ok()
            .filter(|raw| *raw < u16::MAX)
            .ok_or(BuildError::TooManyStates)?;
        let id = StateID(raw);

        let mut basis_ids = Vec::with_capacity(basis.len());
        for (core, source) in basis {
            let item_id = self.new_item(core, id, true)?;
            if let Some(source) = source {
                self.items[item_id.index()].backward_links.push(source);
            }
            basis_ids.push(item_id);
        }

        tracing::trace!("new state {:?} with {} basis items", id, basis_ids.len());
        self.states.push(State {
            id,
            number: id.index(),
            basis: basis_ids.clone(),
            items: basis_ids,
            transitions: Map::default(),
            actions: vec![],
            default_reduce: None,
            auto_reduce: false,
        });
        self.isocores.insert(key, id);
        self.pending.push(id);

        Ok(id)
    }

    /// Add the closure configurations of the state.
    fn closure(&mut self, id: StateID) -> Result<(), BuildError> {
        let g = self.g;
        let first_sets = self.first_sets;

        let mut list = self.states[id.index()].basis.clone();
        let mut in_state: Map<ItemCore, ItemID> = list
            .iter()
            .map(|item_id| (self.items[item_id.index()].core, *item_id))
            .collect();

        let mut cursor = 0;
        while cursor < list.len() {
            let item_id = list[cursor];
            cursor += 1;

            let core = self.items[item_id.index()].core;
            let rule = g.rule(core.rule);
            let Some(&next) = rule.right().get(core.dot as usize) else {
                continue;
            };
            if !g.symbol(next).is_nonterminal() {
                continue;
            }

            let (first, rest_nullable) = first_sets.first_of(&rule.right()[core.dot as usize + 1..]);
            for next_rule in g.rules_of(next) {
                let new_core = ItemCore::new(next_rule.id(), 0);
                let new_id = match in_state.get(&new_core) {
                    Some(new_id) => *new_id,
                    None => {
                        let new_id = self.new_item(new_core, id, false)?;
                        in_state.insert(new_core, new_id);
                        list.push(new_id);
                        new_id
                    }
                };
                self.items[new_id.index()].follow.union_with(&first);
                if rest_nullable {
                    let links = &mut self.items[item_id.index()].forward_links;
                    if !links.contains(&new_id) {
                        links.push(new_id);
                    }
                }
            }
        }

        list.sort_by_key(|item_id| self.items[item_id.index()].core);
        self.states[id.index()].items = list;

        Ok(())
    }

    /// Compute the successor states of the state.
    fn build_shifts(&mut self, id: StateID) -> Result<(), BuildError> {
        let g = self.g;

        let mut groups: Map<SymbolID, Vec<(ItemCore, Option<ItemID>)>> = Map::default();
        for &item_id in &self.states[id.index()].items {
            let core = self.items[item_id.index()].core;
            if let Some(next) = core.next_symbol(g) {
                groups
                    .entry(next)
                    .or_default()
                    .push((ItemCore::new(core.rule, core.dot + 1), Some(item_id)));
            }
        }

        for (symbol, mut basis) in groups {
            basis.sort_by_key(|(core, _)| *core);
            let to = self.get_state(basis)?;
            self.states[id.index()].transitions.insert(symbol, to);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cores(automaton: &Automaton, items: &[ItemID]) -> Vec<ItemCore> {
        items.iter().map(|id| automaton.item(*id).core).collect()
    }

    #[test]
    fn states_of_left_recursive_list() {
        // a ::= . | a X
        let g = Grammar::define(|def| {
            let a = def.symbol("a")?;
            let x = def.symbol("X")?;
            def.rule(a, [], None)?;
            def.rule(a, [a, x], None)?;
            Ok(())
        })
        .unwrap();
        let first_sets = FirstSets::compute(&g).unwrap();
        let automaton = build(&g, &first_sets).unwrap();

        // 0: $accept ::= * a
        // 1: $accept ::= a *, a ::= a * X
        // 2: a ::= a X *
        assert_eq!(automaton.states.len(), 3);

        let start = automaton.state(StateID::from_raw(0));
        assert_eq!(cores(&automaton, &start.basis), [ItemCore::new(RuleID::ACCEPT, 0)]);
        assert_eq!(start.items.len(), 3);

        let a = g.find_symbol("a").unwrap();
        let x = g.find_symbol("X").unwrap();
        let s1 = start.transitions[&a];
        let s2 = automaton.state(s1).transitions[&x];
        assert_eq!(
            cores(&automaton, &automaton.state(s2).basis),
            [ItemCore::new(RuleID::from_raw(1), 2)]
        );
        assert!(automaton.state(s2).transitions.is_empty());
    }

    #[test]
    fn closure_seeds_follow_sets_and_links() {
        // s ::= a Y
        // a ::= X | .
        let g = Grammar::define(|def| {
            let s = def.symbol("s")?;
            let a = def.symbol("a")?;
            let x = def.symbol("X")?;
            let y = def.symbol("Y")?;
            def.rule(s, [a, y], None)?;
            def.rule(a, [x], None)?;
            def.rule(a, [], None)?;
            Ok(())
        })
        .unwrap();
        let first_sets = FirstSets::compute(&g).unwrap();
        let automaton = build(&g, &first_sets).unwrap();
        let y = g.find_symbol("Y").unwrap();

        let start = automaton.state(StateID::from_raw(0));
        for item_id in &start.items {
            let item = automaton.item(*item_id);
            if g.rule(item.core.rule).left() == g.find_symbol("a").unwrap() {
                // FIRST(Y) is generated spontaneously.
                assert!(item.follow.contains(y));
                assert_eq!(item.follow.len(), 1);
            }
        }

        // `$accept ::= * s` propagates to `s ::= * a Y`, since nothing follows `s`.
        let accept = automaton.item(start.basis[0]);
        assert_eq!(accept.forward_links.len(), 1);
        let s_item = automaton.item(accept.forward_links[0]);
        assert_eq!(s_item.core, ItemCore::new(RuleID::from_raw(0), 0));
        // `s ::= * a Y` has no forward links, since `Y` is not nullable.
        assert!(s_item.forward_links.is_empty());

        // every successor basis remembers where it came from.
        for state in &automaton.states[1..] {
            for item_id in &state.basis {
                assert!(!automaton.item(*item_id).backward_links.is_empty());
            }
        }
    }

    #[test]
    fn equal_basis_is_shared() {
        // s ::= X a | Y a
        // a ::= Z
        let g = Grammar::define(|def| {
            let s = def.symbol("s")?;
            let a = def.symbol("a")?;
            let x = def.symbol("X")?;
            let y = def.symbol("Y")?;
            let z = def.symbol("Z")?;
            def.rule(s, [x, a], None)?;
            def.rule(s, [y, a], None)?;
            def.rule(a, [z], None)?;
            Ok(())
        })
        .unwrap();
        let first_sets = FirstSets::compute(&g).unwrap();
        let automaton = build(&g, &first_sets).unwrap();

        let z_state = automaton
            .find_state(&[ItemCore::new(RuleID::from_raw(2), 1)])
            .unwrap();
        let basis = automaton.item(automaton.state(z_state).basis[0]);
        // reached from both `s ::= X * a` and `s ::= Y * a` closures.
        assert_eq!(basis.backward_links.len(), 2);

        let mut keys: Vec<_> = automaton
            .states
            .iter()
            .map(|s| cores(&automaton, &s.basis))
            .collect();
        let n = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), n);
    }
}
