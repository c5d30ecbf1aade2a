//! Calculation of nullable symbols and first sets.

use crate::{
    grammar::{Grammar, SymbolID, SymbolKind, TerminalSet},
    util::{fixed_point, get_two_mut},
    BuildError,
};

#[derive(Debug)]
pub struct FirstSets {
    nullable: Vec<bool>,
    first_sets: Vec<TerminalSet>,
    nullable_passes: usize,
    first_set_passes: usize,
}

impl FirstSets {
    #[tracing::instrument(skip_all)]
    pub fn compute(g: &Grammar) -> Result<Self, BuildError> {
        let (nullable, nullable_passes) = nullable_symbols(g)?;
        let (first_sets, first_set_passes) = first_sets(g, &nullable)?;
        tracing::trace!(
            "nullable: {} passes, first sets: {} passes",
            nullable_passes,
            first_set_passes
        );
        Ok(Self {
            nullable,
            first_sets,
            nullable_passes,
            first_set_passes,
        })
    }

    /// The number of passes the nullability computation took, including
    /// the final one that made no change.
    pub fn nullable_passes(&self) -> usize {
        self.nullable_passes
    }

    pub fn first_set_passes(&self) -> usize {
        self.first_set_passes
    }

    /// Return whether the symbol derives the empty string.
    ///
    /// Terminals and token classes are never nullable.
    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        self.nullable[symbol.index()]
    }

    /// `First(symbol)`
    pub fn first(&self, symbol: SymbolID) -> &TerminalSet {
        &self.first_sets[symbol.index()]
    }

    /// `First(symbols)` together with whether the entire sequence is nullable.
    pub fn first_of(&self, symbols: &[SymbolID]) -> (TerminalSet, bool) {
        let mut res = TerminalSet::default();
        for symbol in symbols {
            res.union_with(self.first(*symbol));
            if !self.is_nullable(*symbol) {
                return (res, false);
            }
        }
        (res, true)
    }
}

fn nullable_symbols(g: &Grammar) -> Result<(Vec<bool>, usize), BuildError> {
    let mut nullable = vec![false; g.symbols.len()];

    // Every productive pass marks at least one more nonterminal.
    let bound = g.nonterminals().count() + 1;
    let passes = fixed_point("nullable symbols", bound, || {
        let mut changed = false;
        for rule in g.rules.values() {
            if nullable[rule.left().index()] {
                continue;
            }
            if rule.right().iter().all(|s| nullable[s.index()]) {
                nullable[rule.left().index()] = true;
                changed = true;
            }
        }
        changed
    })?;

    Ok((nullable, passes))
}

fn first_sets(g: &Grammar, nullable: &[bool]) -> Result<(Vec<TerminalSet>, usize), BuildError> {
    let mut first_sets: Vec<TerminalSet> = g
        .symbols
        .values()
        .map(|symbol| match symbol.kind() {
            SymbolKind::Terminal => Some(symbol.id()).into_iter().collect(),
            SymbolKind::MultiTerminal => symbol.members().iter().copied().collect(),
            SymbolKind::Nonterminal => TerminalSet::default(),
        })
        .collect();

    // Every productive pass adds at least one terminal to some nonterminal.
    let bound = g.nonterminals().count() * g.nterminal() + 1;
    let passes = fixed_point("first sets", bound, || {
        let mut changed = false;
        for rule in g.rules.values() {
            let left = rule.left().index();
            for symbol in rule.right() {
                if symbol.index() != left {
                    let (sup, sub) = get_two_mut(&mut first_sets, left, symbol.index());
                    changed |= sup.union_with(sub);
                }
                if !nullable[symbol.index()] {
                    break;
                }
            }
        }
        changed
    })?;

    Ok((first_sets, passes))
}
