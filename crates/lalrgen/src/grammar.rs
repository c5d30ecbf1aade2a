//! Grammar types.

use crate::{types::Map, util::display_fn};
use std::{fmt, marker::PhantomData};

// ==== Symbols ====

/// The index of a grammar symbol.
///
/// Terminals come first (starting with the end-of-input marker), then
/// nonterminals, then multi-terminals. The index is assigned once when the
/// grammar definition is finalized and never changes afterwards.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolID(u16);

impl SymbolID {
    /// Reserved terminal symbol that means the end of input.
    pub const EOI: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOI => write!(f, "S#End"),
            _ => write!(f, "S#{:03}", self.0),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
    /// A set of terminals that match at the same position (`%token_class`).
    MultiTerminal,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Precedence {
    pub priority: u16,
    pub assoc: Assoc,
}

impl Precedence {
    pub const fn new(priority: u16, assoc: Assoc) -> Self {
        Self { priority, assoc }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Nonassoc => write!(f, "nonassoc"),
        }
    }
}

#[derive(Debug)]
pub struct Symbol {
    id: SymbolID,
    name: String,
    kind: SymbolKind,
    precedence: Option<Precedence>,
    fallback: Option<SymbolID>,
    members: Vec<SymbolID>,
    destructor: Option<String>,
    datatype: Option<String>,
}

impl Symbol {
    pub fn id(&self) -> SymbolID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolKind::Terminal
    }

    pub fn is_nonterminal(&self) -> bool {
        self.kind == SymbolKind::Nonterminal
    }

    pub fn precedence(&self) -> Option<Precedence> {
        self.precedence
    }

    /// The token tried instead of this one when it cannot be shifted.
    pub fn fallback(&self) -> Option<SymbolID> {
        self.fallback
    }

    /// The constituent terminals of a multi-terminal, in declaration order.
    pub fn members(&self) -> &[SymbolID] {
        &self.members
    }

    pub fn destructor(&self) -> Option<&str> {
        self.destructor.as_deref()
    }

    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ==== Terminal sets ====

/// A set of terminal symbols, such as first sets and follow sets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: SymbolID) -> bool {
        self.inner.contains(id.index())
    }
    pub fn insert(&mut self, id: SymbolID) -> bool {
        self.inner.insert(id.index())
    }
    /// Add all elements of `other`, and return whether this set has grown.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if other.inner.is_subset(&self.inner) {
            return false;
        }
        self.inner.union_with(&other.inner);
        true
    }
    pub fn is_subset(&self, other: &Self) -> bool {
        self.inner.is_subset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = SymbolID> + '_ {
        // bit indices never exceed the number of terminals.
        self.inner.iter().map(|raw| SymbolID::from_raw(raw as u16))
    }
}

impl FromIterator<SymbolID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = SymbolID>,
    {
        Self {
            inner: iter.into_iter().map(SymbolID::index).collect(),
        }
    }
}

// ==== Rules ====

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleID(u16);

impl RuleID {
    /// The augmented rule `$accept ::= <start>`.
    pub const ACCEPT: Self = Self(u16::MAX);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::ACCEPT => write!(f, "R#Accept"),
            _ => write!(f, "R#{:03}", self.0),
        }
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: SymbolID,
    right: Vec<SymbolID>,
    precedence: Option<SymbolID>,
    code: Option<String>,
    code_index: u16,
}

impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> SymbolID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    /// The symbol explicitly marked as the precedence of this rule.
    pub fn precedence_mark(&self) -> Option<SymbolID> {
        self.precedence
    }

    /// The action code executed when this rule is reduced.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The rule number used in the generated tables.
    ///
    /// Rules carrying action code are numbered first.
    pub fn code_index(&self) -> u16 {
        self.code_index
    }

    // `"LHS ::= R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ::=", g.symbols[&self.left])?;
            for symbol in &self.right {
                write!(f, " {}", g.symbols[symbol])?;
            }
            Ok(())
        })
    }
}

// ==== Grammar ====

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub symbols: Map<SymbolID, Symbol>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: SymbolID,
    pub accept_symbol: SymbolID,
    pub wildcard: Option<SymbolID>,
    nterminal: usize,
    nsymbol: usize,
    rules_by_left: Map<SymbolID, Vec<RuleID>>,
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            symbols: vec![],
            names: Map::default(),
            rules: vec![],
            start: None,
            wildcard: None,
            next_priority: 1,
            _marker: PhantomData,
        };
        def.insert_symbol("$", SymbolKind::Terminal);
        def.insert_symbol("$accept", SymbolKind::Nonterminal);

        f(&mut def)?;

        def.end()
    }

    /// The number of terminal symbols, including the end-of-input marker.
    pub fn nterminal(&self) -> usize {
        self.nterminal
    }

    /// The number of terminal and nonterminal symbols.
    ///
    /// Multi-terminals are numbered from here on, and this index also marks
    /// an unused slot in the packed tables.
    pub fn nsymbol(&self) -> usize {
        self.nsymbol
    }

    /// The number of rules declared by the user, excluding the augmented rule.
    pub fn nrule(&self) -> usize {
        self.rules.len() - 1
    }

    pub fn symbol(&self, id: SymbolID) -> &Symbol {
        &self.symbols[&id]
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    pub fn find_symbol(&self, name: &str) -> Option<SymbolID> {
        self.symbols
            .values()
            .find(|symbol| symbol.name == name)
            .map(|symbol| symbol.id)
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols.values().filter(|s| s.is_terminal())
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols.values().filter(|s| s.is_nonterminal())
    }

    /// The rules whose left-hand side is `left`, in declaration order.
    pub fn rules_of(&self, left: SymbolID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules_by_left
            .get(&left)
            .into_iter()
            .flatten()
            .map(|id| &self.rules[id])
    }

    /// Nonterminals without any production rule.
    pub fn empty_nonterminals(&self) -> Vec<SymbolID> {
        self.nonterminals()
            .filter(|n| !self.rules_by_left.contains_key(&n.id))
            .map(|n| n.id)
            .collect()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals() {
            write!(f, "{}", terminal)?;
            if let Some(prec) = terminal.precedence() {
                write!(f, " (priority={}, assoc={})", prec.priority, prec.assoc)?;
            }
            if let Some(fallback) = terminal.fallback() {
                write!(f, " (fallback={})", self.symbols[&fallback])?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        let classes: Vec<_> = self
            .symbols
            .values()
            .filter(|s| s.kind == SymbolKind::MultiTerminal)
            .collect();
        if !classes.is_empty() {
            writeln!(f, "\n## token classes:")?;
            for class in classes {
                write!(f, "{} =", class)?;
                for (i, member) in class.members.iter().enumerate() {
                    let sep = if i == 0 { " " } else { "|" };
                    write!(f, "{}{}", sep, self.symbols[member])?;
                }
                writeln!(f)?;
            }
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            if rule.id == RuleID::ACCEPT {
                continue;
            }
            write!(f, "{} .", rule.display(self))?;
            if let Some(prec) = rule.precedence {
                write!(f, " [{}]", self.symbols[&prec])?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

// ==== Grammar definition ====

/// A handle to a symbol declared in a [`GrammarDef`].
///
/// The handle is only meaningful during the definition; symbols are
/// renumbered when the grammar is finalized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SymbolRef(u16);

#[derive(Debug)]
struct PendingSymbol {
    name: String,
    kind: SymbolKind,
    precedence: Option<Precedence>,
    fallback: Option<SymbolRef>,
    members: Vec<SymbolRef>,
    destructor: Option<String>,
    datatype: Option<String>,
}

#[derive(Debug)]
struct PendingRule {
    left: SymbolRef,
    right: Vec<SymbolRef>,
    precedence: Option<SymbolRef>,
    code: Option<String>,
}

/// The contextual values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    symbols: Vec<PendingSymbol>,
    names: Map<String, SymbolRef>,
    rules: Vec<PendingRule>,
    start: Option<SymbolRef>,
    wildcard: Option<SymbolRef>,
    next_priority: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    fn insert_symbol(&mut self, name: &str, kind: SymbolKind) -> SymbolRef {
        let id = SymbolRef(self.symbols.len() as u16);
        self.symbols.push(PendingSymbol {
            name: name.to_owned(),
            kind,
            precedence: None,
            fallback: None,
            members: vec![],
            destructor: None,
            datatype: None,
        });
        self.names.insert(name.to_owned(), id);
        id
    }

    fn declare(&mut self, name: &str, kind: SymbolKind) -> Result<SymbolRef, GrammarDefError> {
        if !verify_ident(name) {
            return Err(GrammarDefError::InvalidName(name.to_owned()));
        }
        if self.names.contains_key(name) {
            return Err(GrammarDefError::DuplicateSymbol(name.to_owned()));
        }
        if self.symbols.len() >= u16::MAX as usize {
            return Err("too many symbols".into());
        }
        Ok(self.insert_symbol(name, kind))
    }

    fn pending(&mut self, symbol: SymbolRef) -> Result<&mut PendingSymbol, GrammarDefError> {
        self.symbols
            .get_mut(symbol.0 as usize)
            .ok_or_else(|| format!("unknown symbol handle: {:?}", symbol).into())
    }

    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<SymbolRef, GrammarDefError> {
        self.declare(name, SymbolKind::Terminal)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<SymbolRef, GrammarDefError> {
        self.declare(name, SymbolKind::Nonterminal)
    }

    /// Look up a symbol by name, declaring it on first use.
    ///
    /// New names starting with an upper-case letter become terminals and
    /// all others become nonterminals.
    pub fn symbol(&mut self, name: &str) -> Result<SymbolRef, GrammarDefError> {
        if let Some(id) = self.names.get(name) {
            return Ok(*id);
        }
        let kind = match name.chars().next() {
            Some(ch) if ch.is_uppercase() => SymbolKind::Terminal,
            _ => SymbolKind::Nonterminal,
        };
        self.declare(name, kind)
    }

    /// Declare a token class matching any of the given terminals.
    pub fn token_class<I>(&mut self, name: &str, members: I) -> Result<SymbolRef, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolRef>,
    {
        let members: Vec<_> = members.into_iter().collect();
        if members.is_empty() {
            return Err(GrammarDefError::InvalidTokenClass(name.to_owned()));
        }
        for member in &members {
            if self.pending(*member)?.kind != SymbolKind::Terminal {
                return Err(GrammarDefError::InvalidTokenClass(name.to_owned()));
            }
        }
        let id = self.declare(name, SymbolKind::MultiTerminal)?;
        self.symbols[id.0 as usize].members = members;
        Ok(id)
    }

    /// Assign the next precedence level to the specified terminals.
    ///
    /// Every call creates a level binding tighter than all earlier ones.
    pub fn precedence<I>(&mut self, assoc: Assoc, terminals: I) -> Result<(), GrammarDefError>
    where
        I: IntoIterator<Item = SymbolRef>,
    {
        let prec = Precedence::new(self.next_priority, assoc);
        self.next_priority += 1;
        for t in terminals {
            let symbol = self.pending(t)?;
            if symbol.kind != SymbolKind::Terminal {
                return Err(GrammarDefError::NotTerminal(symbol.name.clone()));
            }
            if symbol.precedence.is_some() {
                return Err(format!(
                    "the precedence of `{}' has already been assigned",
                    symbol.name
                )
                .into());
            }
            symbol.precedence = Some(prec);
        }
        Ok(())
    }

    /// Make each of `tokens` fall back to `target` when it cannot be parsed.
    pub fn fallback<I>(&mut self, target: SymbolRef, tokens: I) -> Result<(), GrammarDefError>
    where
        I: IntoIterator<Item = SymbolRef>,
    {
        let target_symbol = self.pending(target)?;
        if target_symbol.kind != SymbolKind::Terminal {
            return Err(GrammarDefError::NotTerminal(target_symbol.name.clone()));
        }
        for token in tokens {
            if token == target {
                return Err("a token cannot fall back to itself".into());
            }
            let symbol = self.pending(token)?;
            if symbol.kind != SymbolKind::Terminal {
                return Err(GrammarDefError::NotTerminal(symbol.name.clone()));
            }
            if symbol.fallback.is_some() {
                return Err(format!("more than one fallback assigned to `{}'", symbol.name).into());
            }
            symbol.fallback = Some(target);
        }
        Ok(())
    }

    /// Specify the token that matches any input token.
    pub fn wildcard(&mut self, token: SymbolRef) -> Result<(), GrammarDefError> {
        let symbol = self.pending(token)?;
        if symbol.kind != SymbolKind::Terminal {
            return Err(GrammarDefError::NotTerminal(symbol.name.clone()));
        }
        if self.wildcard.replace(token).is_some() {
            return Err("the wildcard token has already been specified".into());
        }
        Ok(())
    }

    /// Attach the code executed when the symbol is discarded.
    pub fn destructor(&mut self, symbol: SymbolRef, code: &str) -> Result<(), GrammarDefError> {
        self.pending(symbol)?.destructor = Some(code.to_owned());
        Ok(())
    }

    /// Attach the semantic value type carried by the symbol.
    pub fn datatype(&mut self, symbol: SymbolRef, ty: &str) -> Result<(), GrammarDefError> {
        self.pending(symbol)?.datatype = Some(ty.to_owned());
        Ok(())
    }

    /// Specify a production rule into this grammar.
    pub fn rule<I>(
        &mut self,
        left: SymbolRef,
        right: I,
        precedence: Option<SymbolRef>,
    ) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolRef>,
    {
        let right: Vec<_> = right.into_iter().collect();

        // `$` and `$accept` belong to the augmented start rule.
        if let Some(reserved) = std::iter::once(&left).chain(&right).find(|s| s.0 <= 1) {
            return Err(GrammarDefError::Reserved(
                self.symbols[reserved.0 as usize].name.clone(),
            ));
        }

        let lhs = self.pending(left)?;
        if lhs.kind != SymbolKind::Nonterminal {
            return Err(GrammarDefError::NotNonterminal(lhs.name.clone()));
        }
        for symbol in &right {
            self.pending(*symbol)?;
        }
        if let Some(prec) = precedence {
            let symbol = self.pending(prec)?;
            if symbol.kind == SymbolKind::Nonterminal {
                return Err(GrammarDefError::NotTerminal(symbol.name.clone()));
            }
        }
        if self
            .rules
            .iter()
            .any(|rule| rule.left == left && rule.right == right)
        {
            return Err(GrammarDefError::DuplicateRule(
                self.symbols[left.0 as usize].name.clone(),
            ));
        }
        if self.rules.len() >= (u16::MAX - 1) as usize {
            return Err("too many rules".into());
        }

        let id = RuleID::from_raw(self.rules.len() as u16);
        self.rules.push(PendingRule {
            left,
            right,
            precedence,
            code: None,
        });
        Ok(id)
    }

    /// Attach the code executed when the rule is reduced.
    pub fn action(&mut self, rule: RuleID, code: &str) -> Result<(), GrammarDefError> {
        let rule = self
            .rules
            .get_mut(rule.into_raw() as usize)
            .ok_or_else(|| GrammarDefError::from(format!("unknown rule: {:?}", rule)))?;
        rule.code = Some(code.to_owned());
        Ok(())
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: SymbolRef) -> Result<(), GrammarDefError> {
        if symbol.0 <= 1 {
            return Err(GrammarDefError::Reserved(self.symbols[symbol.0 as usize].name.clone()));
        }
        let pending = self.pending(symbol)?;
        if pending.kind != SymbolKind::Nonterminal {
            return Err(GrammarDefError::NotNonterminal(pending.name.clone()));
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn end(self) -> Result<Grammar, GrammarDefError> {
        if self.rules.is_empty() {
            return Err(GrammarDefError::NoRules);
        }

        // When not specified, the left-hand side of the first rule is the start symbol.
        let start = match self.start {
            Some(start) => start,
            None => self.rules[0].left,
        };

        // Sort symbols: terminals, nonterminals, then token classes.
        // Symbols of the same kind keep their declaration order.
        let rank = |kind: SymbolKind| match kind {
            SymbolKind::Terminal => 0,
            SymbolKind::Nonterminal => 1,
            SymbolKind::MultiTerminal => 2,
        };
        let mut order: Vec<usize> = (0..self.symbols.len()).collect();
        order.sort_by_key(|&i| (rank(self.symbols[i].kind), i));

        let mut remap = vec![SymbolID::EOI; self.symbols.len()];
        for (index, &old) in order.iter().enumerate() {
            remap[old] = SymbolID::from_raw(index as u16);
        }
        let id_of = |r: SymbolRef| remap[r.0 as usize];

        let nterminal = self
            .symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Terminal)
            .count();
        let nsymbol = nterminal
            + self
                .symbols
                .iter()
                .filter(|s| s.kind == SymbolKind::Nonterminal)
                .count();

        let mut pending_symbols: Vec<Option<PendingSymbol>> =
            self.symbols.into_iter().map(Some).collect();
        let mut symbols = Map::default();
        for &old in &order {
            let Some(symbol) = pending_symbols[old].take() else {
                continue;
            };
            let id = remap[old];
            symbols.insert(
                id,
                Symbol {
                    id,
                    name: symbol.name,
                    kind: symbol.kind,
                    precedence: symbol.precedence,
                    fallback: symbol.fallback.map(id_of),
                    members: symbol.members.into_iter().map(id_of).collect(),
                    destructor: symbol.destructor,
                    datatype: symbol.datatype,
                },
            );
        }

        // Rules with action code are numbered before the ones without.
        let mut next_code = 0u16;
        let mut code_indices = vec![0u16; self.rules.len()];
        for pass in [true, false] {
            for (i, rule) in self.rules.iter().enumerate() {
                if rule.code.is_some() == pass {
                    code_indices[i] = next_code;
                    next_code += 1;
                }
            }
        }

        let mut rules = Map::default();
        let mut rules_by_left = Map::<SymbolID, Vec<RuleID>>::default();
        for (i, rule) in self.rules.into_iter().enumerate() {
            let id = RuleID::from_raw(i as u16);
            let left = id_of(rule.left);
            rules_by_left.entry(left).or_default().push(id);
            rules.insert(
                id,
                Rule {
                    id,
                    left,
                    right: rule.right.into_iter().map(id_of).collect(),
                    precedence: rule.precedence.map(id_of),
                    code: rule.code,
                    code_index: code_indices[i],
                },
            );
        }

        let accept_symbol = id_of(SymbolRef(1));
        let start_symbol = id_of(start);
        rules_by_left
            .entry(accept_symbol)
            .or_default()
            .push(RuleID::ACCEPT);
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: accept_symbol,
                right: vec![start_symbol],
                precedence: None,
                code: None,
                code_index: u16::MAX,
            },
        );

        Ok(Grammar {
            symbols,
            rules,
            start_symbol,
            accept_symbol,
            wildcard: self.wildcard.map(id_of),
            nterminal,
            nsymbol,
            rules_by_left,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("incorrect symbol name: `{}'", _0)]
    InvalidName(String),

    #[error("the symbol `{}' has already been declared", _0)]
    DuplicateSymbol(String),

    #[error("`{}' is not a terminal symbol", _0)]
    NotTerminal(String),

    #[error("`{}' is not a nonterminal symbol", _0)]
    NotNonterminal(String),

    #[error("the token class `{}' must consist of one or more terminals", _0)]
    InvalidTokenClass(String),

    #[error("duplicate production rule detected for `{}'", _0)]
    DuplicateRule(String),

    #[error("the reserved symbol `{}' cannot be used in rules or as the start symbol", _0)]
    Reserved(String),

    #[error("the grammar contains no rules")]
    NoRules,

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

fn verify_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        // The identifier must not be empty.
        return false;
    };
    (first == '_' || unicode_ident::is_xid_start(first))
        && chars.all(unicode_ident::is_xid_continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_sorted_by_kind() {
        let g = Grammar::define(|def| {
            let expr = def.symbol("expr")?;
            let num = def.symbol("NUM")?;
            let ident = def.symbol("IDENT")?;
            let atom = def.token_class("ATOM", [num, ident])?;
            let term = def.symbol("term")?;
            def.rule(expr, [term], None)?;
            def.rule(term, [atom], None)?;
            Ok(())
        })
        .unwrap();

        let names: Vec<_> = g.symbols.values().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["$", "NUM", "IDENT", "$accept", "expr", "term", "ATOM"]
        );
        assert_eq!(g.nterminal(), 3);
        assert_eq!(g.nsymbol(), 6);
        for (i, symbol) in g.symbols.values().enumerate() {
            assert_eq!(symbol.id().index(), i);
        }

        let atom = g.symbol(g.find_symbol("ATOM").unwrap());
        assert_eq!(atom.kind(), SymbolKind::MultiTerminal);
        let members: Vec<_> = atom.members().iter().map(|m| g.symbol(*m).name()).collect();
        assert_eq!(members, ["NUM", "IDENT"]);

        // the start symbol defaults to the left-hand side of the first rule.
        assert_eq!(g.symbol(g.start_symbol).name(), "expr");
        let accept = g.rule(RuleID::ACCEPT);
        assert_eq!(accept.left(), g.accept_symbol);
        assert_eq!(accept.right(), [g.start_symbol]);
    }

    #[test]
    fn rules_with_code_are_numbered_first() {
        let g = Grammar::define(|def| {
            let a = def.symbol("a")?;
            let x = def.symbol("X")?;
            let y = def.symbol("Y")?;
            def.rule(a, [x], None)?;
            let r1 = def.rule(a, [y], None)?;
            def.rule(a, [x, y], None)?;
            def.action(r1, "{ 1 }")?;
            Ok(())
        })
        .unwrap();

        let codes: Vec<_> = (0..3)
            .map(|i| g.rule(RuleID::from_raw(i)).code_index())
            .collect();
        assert_eq!(codes, [1, 0, 2]);
        assert_eq!(g.nrule(), 3);
    }

    #[test]
    fn rejects_malformed_definitions() {
        let err = Grammar::define(|def| {
            def.terminal("PLUS")?;
            def.terminal("PLUS")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateSymbol(..)));

        let err = Grammar::define(|def| {
            def.terminal("1abc")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::InvalidName(..)));

        let err = Grammar::define(|def| {
            let t = def.terminal("T")?;
            def.rule(t, [], None)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::NotNonterminal(..)));

        let err = Grammar::define(|def| {
            def.nonterminal("a")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::NoRules));

        let err = Grammar::define(|def| {
            let a = def.symbol("a")?;
            let x = def.symbol("X")?;
            def.rule(a, [x], None)?;
            def.rule(a, [x], None)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateRule(..)));

        let err = Grammar::define(|def| {
            let a = def.symbol("a")?;
            let eoi = def.symbol("$")?;
            def.rule(a, [eoi], None)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::Reserved(..)));

        let err = Grammar::define(|def| {
            let a = def.symbol("a")?;
            let x = def.symbol("X")?;
            def.rule(a, [x], None)?;
            let accept = def.symbol("$accept")?;
            def.start_symbol(accept)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::Reserved(ref name) if name == "$accept"));
    }

    #[test]
    fn display_reprints_the_grammar() {
        let g = Grammar::define(|def| {
            let e = def.symbol("e")?;
            let plus = def.symbol("PLUS")?;
            let num = def.symbol("NUM")?;
            def.precedence(Assoc::Left, [plus])?;
            def.rule(e, [e, plus, e], None)?;
            def.rule(e, [num], None)?;
            Ok(())
        })
        .unwrap();
        let text = g.to_string();
        assert!(text.contains("PLUS (priority=1, assoc=left)"));
        assert!(text.contains("e ::= e PLUS e ."));
        assert!(text.contains("e (start)"));
        assert!(!text.contains("$accept ::="));
    }
}
