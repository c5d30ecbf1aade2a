//! Effective precedence of production rules.

use crate::{
    grammar::{Grammar, Precedence, RuleID, SymbolID, SymbolKind},
    types::Map,
};

/// The precedence used when resolving conflicts on each rule.
#[derive(Debug, Default)]
pub struct RulePrecedences {
    symbols: Map<RuleID, SymbolID>,
    precedences: Map<RuleID, Precedence>,
}

impl RulePrecedences {
    /// The symbol that determines the precedence of the rule, if any.
    pub fn symbol(&self, rule: RuleID) -> Option<SymbolID> {
        self.symbols.get(&rule).copied()
    }

    pub fn get(&self, rule: RuleID) -> Option<Precedence> {
        self.precedences.get(&rule).copied()
    }
}

/// Assign the precedence of each rule.
///
/// An explicitly marked symbol wins. Otherwise the last terminal or
/// token class on the right-hand side is used.
#[tracing::instrument(skip_all)]
pub fn resolve(g: &Grammar) -> RulePrecedences {
    let mut res = RulePrecedences::default();
    for rule in g.rules.values() {
        let symbol = rule.precedence_mark().or_else(|| {
            rule.right()
                .iter()
                .rev()
                .copied()
                .find(|s| g.symbol(*s).kind() != SymbolKind::Nonterminal)
        });
        let Some(symbol) = symbol else {
            continue;
        };
        let precedence = precedence_of(g, symbol);
        res.symbols.insert(rule.id(), symbol);
        if let Some(precedence) = precedence {
            res.precedences.insert(rule.id(), precedence);
        }
    }
    res
}

/// The precedence of a symbol; a token class takes the first member that has one.
pub fn precedence_of(g: &Grammar, symbol: SymbolID) -> Option<Precedence> {
    let symbol = g.symbol(symbol);
    match symbol.kind() {
        SymbolKind::MultiTerminal => symbol
            .members()
            .iter()
            .find_map(|m| g.symbol(*m).precedence()),
        _ => symbol.precedence(),
    }
}
