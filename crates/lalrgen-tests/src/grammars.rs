//! Grammar definitions used in tests and benchmarks.

use lalrgen::grammar::{Assoc, GrammarDef, GrammarDefError};

type Result = std::result::Result<(), GrammarDefError>;

/// A grammar that is LALR(1) but needs lookaheads to choose between `A ::= ID`
/// and `T ::= ID`.
pub fn g_simple1(g: &mut GrammarDef<'_>) -> Result {
    let equal = g.terminal("EQUAL")?;
    let plus = g.terminal("PLUS")?;
    let ident = g.terminal("ID")?;
    let num = g.terminal("NUM")?;

    let a = g.nonterminal("A")?;
    let e = g.nonterminal("E")?;
    let t = g.nonterminal("T")?;

    g.rule(a, [e, equal, e], None)?;
    g.rule(a, [ident], None)?;
    g.rule(e, [e, plus, t], None)?;
    g.rule(e, [t], None)?;
    g.rule(t, [num], None)?;
    g.rule(t, [ident], None)?;

    g.start_symbol(a)?;
    Ok(())
}

/// Arithmetic expressions, stratified by operator strength.
pub fn g_simple2(g: &mut GrammarDef<'_>) -> Result {
    let plus = g.terminal("PLUS")?;
    let star = g.terminal("STAR")?;
    let lparen = g.terminal("LPAREN")?;
    let rparen = g.terminal("RPAREN")?;
    let num = g.terminal("NUM")?;

    let e = g.nonterminal("E")?;
    let t = g.nonterminal("T")?;
    let f = g.nonterminal("F")?;

    // E : E '+' T | T ;
    g.rule(e, [e, plus, t], None)?;
    g.rule(e, [t], None)?;
    // T : T '*' F | F ;
    g.rule(t, [t, star, f], None)?;
    g.rule(t, [f], None)?;
    // F : '(' E ')' | num ;
    g.rule(f, [lparen, e, rparen], None)?;
    g.rule(f, [num], None)?;

    Ok(())
}

pub fn g2(g: &mut GrammarDef<'_>) -> Result {
    let comma = g.terminal("COMMA")?;
    let colon = g.terminal("COLON")?;
    let ident = g.terminal("ID")?;

    let def = g.nonterminal("DEF")?;
    let param_spec = g.nonterminal("PARAM_SPEC")?;
    let return_spec = g.nonterminal("RETURN_SPEC")?;
    let type_ = g.nonterminal("TYPE")?;
    let name = g.nonterminal("NAME")?;
    let name_list = g.nonterminal("NAME_LIST")?;

    g.rule(def, [param_spec, return_spec, comma], None)?;
    g.rule(param_spec, [type_], None)?;
    g.rule(param_spec, [name_list, colon, type_], None)?;
    g.rule(return_spec, [type_], None)?;
    g.rule(return_spec, [name, colon, type_], None)?;
    g.rule(type_, [ident], None)?;
    g.rule(name, [ident], None)?;
    g.rule(name_list, [name], None)?;
    g.rule(name_list, [name, comma, name_list], None)?;

    Ok(())
}

pub fn g4(g: &mut GrammarDef<'_>) -> Result {
    let plus = g.terminal("PLUS")?;
    let lparen = g.terminal("LPAREN")?;
    let rparen = g.terminal("RPAREN")?;
    let num = g.terminal("NUM")?;

    let e = g.nonterminal("E")?;
    let t = g.nonterminal("T")?;

    // E → E + T | T
    // T → ( E ) | n
    g.rule(e, [e, plus, t], None)?;
    g.rule(e, [t], None)?;
    g.rule(t, [lparen, e, rparen], None)?;
    g.rule(t, [num], None)?;

    Ok(())
}

/// Ambiguous arithmetic expressions disambiguated by precedence.
pub fn calc(g: &mut GrammarDef<'_>) -> Result {
    let plus = g.symbol("PLUS")?;
    let minus = g.symbol("MINUS")?;
    let times = g.symbol("TIMES")?;
    let divide = g.symbol("DIVIDE")?;
    let uminus = g.symbol("UMINUS")?;
    let lparen = g.symbol("LPAREN")?;
    let rparen = g.symbol("RPAREN")?;
    let num = g.symbol("NUM")?;

    let expr = g.symbol("expr")?;

    g.precedence(Assoc::Left, [plus, minus])?;
    g.precedence(Assoc::Left, [times, divide])?;
    g.precedence(Assoc::Right, [uminus])?;

    for op in [plus, minus, times, divide] {
        let rule = g.rule(expr, [expr, op, expr], None)?;
        g.action(rule, "A = B op C;")?;
    }
    g.rule(expr, [minus, expr], Some(uminus))?;
    g.rule(expr, [lparen, expr, rparen], None)?;
    g.rule(expr, [num], None)?;

    Ok(())
}

/// `list ::= . | list X`
pub fn nullable_list(g: &mut GrammarDef<'_>) -> Result {
    let x = g.symbol("X")?;
    let list = g.symbol("list")?;
    g.rule(list, [], None)?;
    g.rule(list, [list, x], None)?;
    Ok(())
}

/// A comma-separated list of atoms, where an atom is any of `NUM` or `STR`.
pub fn token_class(g: &mut GrammarDef<'_>) -> Result {
    let num = g.symbol("NUM")?;
    let str_ = g.symbol("STR")?;
    let comma = g.symbol("COMMA")?;
    let atom = g.token_class("ATOM", [num, str_])?;

    let list = g.symbol("list")?;
    g.rule(list, [atom], None)?;
    g.rule(list, [list, comma, atom], None)?;
    Ok(())
}

/// Both `a` and `b` derive `X`, which is a reduce/reduce conflict.
pub fn reduce_conflict(g: &mut GrammarDef<'_>) -> Result {
    let x = g.symbol("X")?;
    let s = g.symbol("s")?;
    let a = g.symbol("a")?;
    let b = g.symbol("b")?;
    g.rule(s, [a], None)?;
    g.rule(s, [b], None)?;
    g.rule(a, [x], None)?;
    g.rule(b, [x], None)?;
    Ok(())
}

/// The dangling else, which has a single shift/reduce conflict.
pub fn dangling_else(g: &mut GrammarDef<'_>) -> Result {
    let t_if = g.symbol("IF")?;
    let t_else = g.symbol("ELSE")?;
    let other = g.symbol("OTHER")?;
    let stmt = g.symbol("stmt")?;
    g.rule(stmt, [t_if, stmt], None)?;
    g.rule(stmt, [t_if, stmt, t_else, stmt], None)?;
    g.rule(stmt, [other], None)?;
    Ok(())
}

/// Identifiers may be used where keywords are not expected.
pub fn keyword_fallback(g: &mut GrammarDef<'_>) -> Result {
    let ident = g.symbol("ID")?;
    let t_let = g.symbol("LET")?;
    let t_in = g.symbol("IN")?;
    let equal = g.symbol("EQUAL")?;
    g.fallback(ident, [t_in])?;

    let stmt = g.symbol("stmt")?;
    g.rule(stmt, [t_let, ident, equal, ident], None)?;
    Ok(())
}

pub fn min_caml(g: &mut GrammarDef<'_>) -> Result {
    let l_paren = g.terminal("LPAREN")?;
    let r_paren = g.terminal("RPAREN")?;
    let t_true = g.terminal("TRUE")?;
    let t_false = g.terminal("FALSE")?;
    let integer = g.terminal("INTEGER")?;
    let float = g.terminal("FLOAT")?;
    let ident = g.terminal("IDENT")?;
    let t_not = g.terminal("NOT")?;
    let plus = g.terminal("PLUS")?;
    let plus_dot = g.terminal("PLUS_DOT")?;
    let minus = g.terminal("MINUS")?;
    let minus_dot = g.terminal("MINUS_DOT")?;
    let star_dot = g.terminal("STAR_DOT")?;
    let slash_dot = g.terminal("SLASH_DOT")?;
    let equal = g.terminal("EQUAL")?;
    let less_greater = g.terminal("LESS_GREATER")?;
    let less = g.terminal("LESS")?;
    let greater = g.terminal("GREATER")?;
    let less_equal = g.terminal("LESS_EQUAL")?;
    let greater_equal = g.terminal("GREATER_EQUAL")?;
    let less_minus = g.terminal("LESS_MINUS")?;
    let comma = g.terminal("COMMA")?;
    let semicolon = g.terminal("SEMICOLON")?;
    let t_if = g.terminal("IF")?;
    let t_then = g.terminal("THEN")?;
    let t_else = g.terminal("ELSE")?;
    let t_let = g.terminal("LET")?;
    let t_rec = g.terminal("REC")?;
    let t_in = g.terminal("IN")?;
    let array_make = g.terminal("ARRAY_MAKE")?;
    let dot = g.terminal("DOT")?;

    let simple_exp = g.nonterminal("SIMPLE_EXP")?;
    let app_exp = g.nonterminal("APP_EXP")?;
    let neg_exp = g.nonterminal("NEG_EXP")?;
    let mult_exp = g.nonterminal("MULT_EXP")?;
    let add_exp = g.nonterminal("ADD_EXP")?;
    let rel_exp = g.nonterminal("REL_EXP")?;
    let tuple_exp = g.nonterminal("TUPLE_EXP")?;
    let put_exp = g.nonterminal("PUT_EXP")?;
    let if_exp = g.nonterminal("IF_EXP")?;
    let let_exp = g.nonterminal("LET_EXP")?;
    let exp = g.nonterminal("EXPR")?;
    let formal_args = g.nonterminal("FORMAL_ARGS")?;
    let actual_args = g.nonterminal("ACTUAL_ARGS")?;
    let tuple_exp_rest = g.nonterminal("TUPLE_EXP_REST")?;
    let fundef = g.nonterminal("FUNDEF")?;
    let pat = g.nonterminal("PAT")?;

    let rules: Vec<(_, Vec<_>)> = vec![
        (simple_exp, vec![l_paren, exp, r_paren]),
        (simple_exp, vec![l_paren, r_paren]),
        (simple_exp, vec![t_true]),
        (simple_exp, vec![t_false]),
        (simple_exp, vec![integer]),
        (simple_exp, vec![float]),
        (simple_exp, vec![ident]),
        (simple_exp, vec![simple_exp, dot, l_paren, exp, r_paren]),
        //
        (app_exp, vec![simple_exp]),
        (app_exp, vec![simple_exp, actual_args]),
        (app_exp, vec![array_make, simple_exp, simple_exp]),
        (app_exp, vec![t_not, app_exp]),
        //
        (neg_exp, vec![app_exp]),
        (neg_exp, vec![minus, neg_exp]),
        (neg_exp, vec![minus_dot, neg_exp]),
        //
        (mult_exp, vec![neg_exp]),
        (mult_exp, vec![mult_exp, star_dot, neg_exp]),
        (mult_exp, vec![mult_exp, slash_dot, neg_exp]),
        //
        (add_exp, vec![mult_exp]),
        (add_exp, vec![add_exp, plus, mult_exp]),
        (add_exp, vec![add_exp, minus, mult_exp]),
        (add_exp, vec![add_exp, plus_dot, mult_exp]),
        (add_exp, vec![add_exp, minus_dot, mult_exp]),
        //
        (rel_exp, vec![add_exp]),
        (rel_exp, vec![rel_exp, equal, add_exp]),
        (rel_exp, vec![rel_exp, less_greater, add_exp]),
        (rel_exp, vec![rel_exp, less, add_exp]),
        (rel_exp, vec![rel_exp, greater, add_exp]),
        (rel_exp, vec![rel_exp, less_equal, add_exp]),
        (rel_exp, vec![rel_exp, greater_equal, add_exp]),
        //
        (tuple_exp, vec![rel_exp]),
        (tuple_exp, vec![rel_exp, comma, tuple_exp_rest]),
        (tuple_exp_rest, vec![rel_exp]),
        (tuple_exp_rest, vec![rel_exp, comma, tuple_exp_rest]),
        //
        (put_exp, vec![tuple_exp]),
        (
            put_exp,
            vec![simple_exp, dot, l_paren, exp, r_paren, less_minus, exp],
        ),
        //
        (if_exp, vec![put_exp]),
        (if_exp, vec![t_if, exp, t_then, exp, t_else, exp]),
        //
        (let_exp, vec![t_let, ident, equal, exp, t_in, exp]),
        (let_exp, vec![t_let, t_rec, fundef, t_in, exp]),
        (
            let_exp,
            vec![t_let, l_paren, pat, r_paren, equal, exp, t_in, exp],
        ),
        //
        (fundef, vec![ident, formal_args, equal, exp]),
        (formal_args, vec![ident, formal_args]),
        (formal_args, vec![ident]),
        (actual_args, vec![actual_args, simple_exp]),
        (actual_args, vec![simple_exp]),
        (pat, vec![pat, comma, ident]),
        (pat, vec![ident, comma, ident]),
        //
        (exp, vec![if_exp]),
        (exp, vec![if_exp, semicolon, exp]),
        (exp, vec![let_exp]),
    ];
    for (left, right) in rules {
        g.rule(left, right, None)?;
    }

    g.start_symbol(exp)?;
    Ok(())
}
