//! Drive the runtime parser with the generated tables.

use lalrgen::{
    generate,
    grammar::{Grammar, GrammarDef, GrammarDefError, SymbolID},
    Config,
};
use lalrgen_runtime::parser::{ParseError, ParseEvent, ParseItem, Parser, Token};
use lalrgen_tests::grammars;
use std::convert::Infallible;

#[derive(Debug)]
struct Tok(SymbolID);

impl Token<SymbolID> for Tok {
    fn as_symbol(&self) -> SymbolID {
        self.0
    }
}

/// Parse the whitespace-separated token names and collect the reduced rules.
fn parse(
    f: impl FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarDefError>,
    config: &Config,
    input: &str,
) -> anyhow::Result<Result<Vec<String>, ParseError<Infallible>>> {
    let g = Grammar::define(f)?;
    let generated = generate(&g, config)?;

    let tokens: Vec<Tok> = input
        .split_whitespace()
        .map(|name| {
            g.find_symbol(name)
                .map(Tok)
                .ok_or_else(|| anyhow::anyhow!("unknown token: {}", name))
        })
        .collect::<anyhow::Result<_>>()?;
    let mut tokens = tokens.into_iter().map(Ok::<_, Infallible>);

    let mut parser = Parser::new(&generated.tables);
    let mut args = vec![];
    let mut events = vec![];
    loop {
        match parser.next_event(&mut tokens, &mut args) {
            Ok(ParseEvent::Reduce(rule)) => {
                let rule = g.rule(rule);
                assert_eq!(args.len(), rule.right().len());
                events.push(rule.display(&g).to_string());
            }
            Ok(ParseEvent::Accept) => {
                assert!(matches!(args[..], [ParseItem::N(s)] if s == g.start_symbol));
                return Ok(Ok(events));
            }
            Err(err) => return Ok(Err(err)),
        }
    }
}

fn configs() -> Vec<Config> {
    let mut uncompressed = Config::new();
    uncompressed.compress(false).resort(false);
    vec![Config::new(), uncompressed]
}

#[test]
fn precedence_orders_reductions() -> anyhow::Result<()> {
    for config in configs() {
        let events = parse(grammars::calc, &config, "NUM PLUS NUM TIMES NUM")?.unwrap();
        assert_eq!(
            events,
            [
                "expr ::= NUM",
                "expr ::= NUM",
                "expr ::= NUM",
                "expr ::= expr TIMES expr",
                "expr ::= expr PLUS expr",
            ]
        );
    }
    Ok(())
}

#[test]
fn left_associative_operators_reduce_first() -> anyhow::Result<()> {
    let events = parse(grammars::calc, &Config::new(), "NUM MINUS NUM MINUS NUM")?.unwrap();
    assert_eq!(
        events,
        [
            "expr ::= NUM",
            "expr ::= NUM",
            "expr ::= expr MINUS expr",
            "expr ::= NUM",
            "expr ::= expr MINUS expr",
        ]
    );
    Ok(())
}

#[test]
fn unary_minus_binds_tighter() -> anyhow::Result<()> {
    let events = parse(grammars::calc, &Config::new(), "MINUS NUM TIMES NUM")?.unwrap();
    assert_eq!(
        events,
        [
            "expr ::= NUM",
            "expr ::= MINUS expr",
            "expr ::= NUM",
            "expr ::= expr TIMES expr",
        ]
    );
    Ok(())
}

#[test]
fn nullable_list() -> anyhow::Result<()> {
    for config in configs() {
        let events = parse(grammars::nullable_list, &config, "X X")?.unwrap();
        assert_eq!(events, ["list ::=", "list ::= list X", "list ::= list X"]);

        let events = parse(grammars::nullable_list, &config, "")?.unwrap();
        assert_eq!(events, ["list ::="]);
    }
    Ok(())
}

#[test]
fn token_class_members() -> anyhow::Result<()> {
    let events = parse(grammars::token_class, &Config::new(), "NUM COMMA STR")?.unwrap();
    assert_eq!(events, ["list ::= ATOM", "list ::= list COMMA ATOM"]);
    Ok(())
}

#[test]
fn keyword_falls_back_to_identifier() -> anyhow::Result<()> {
    let events = parse(grammars::keyword_fallback, &Config::new(), "LET IN EQUAL ID")?.unwrap();
    assert_eq!(events, ["stmt ::= LET ID EQUAL ID"]);

    // the keyword is still rejected where no identifier is expected.
    let err = parse(grammars::keyword_fallback, &Config::new(), "IN")?.unwrap_err();
    assert!(matches!(err, ParseError::Syntax));
    Ok(())
}

#[test]
fn syntax_errors() -> anyhow::Result<()> {
    for config in configs() {
        let err = parse(grammars::calc, &config, "NUM PLUS PLUS NUM")?.unwrap_err();
        assert!(matches!(err, ParseError::Syntax));

        let err = parse(grammars::calc, &config, "LPAREN NUM")?.unwrap_err();
        assert!(matches!(err, ParseError::Syntax));
    }
    Ok(())
}
