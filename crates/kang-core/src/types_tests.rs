use crate::types::{Associativity, GrammarBuilder, Precedence, Reference};

#[test]
fn builder_assigns_sequential_ids_and_wires_variable_rules() {
    let mut builder = GrammarBuilder::new();
    let a = builder.add_terminal("a".to_string(), false).unwrap();
    let error = builder.add_terminal("@error".to_string(), false).unwrap();
    let s = builder.add_variable("S".to_string(), None).unwrap();

    let r1 = builder.reserve_rule(s);
    builder.fill_rule(r1, vec![Reference::Terminal { id: a, preserved: true }], None, Associativity::None);

    let grammar = builder.finish(s, error);

    assert_eq!(grammar.variable(s).rules, vec![r1]);
    assert_eq!(grammar.rule(r1).lhs, s);
    assert!(!grammar.variable(s).is_collapsible());
    assert_eq!(grammar.start(), s);
    assert_eq!(grammar.error_terminal(), error);
}

#[test]
fn collapsible_variable_reports_parent_rule() {
    let mut builder = GrammarBuilder::new();
    let error = builder.add_terminal("@error".to_string(), false).unwrap();
    let s = builder.add_variable("S".to_string(), None).unwrap();
    let owning_rule = builder.reserve_rule(s);

    let aux = builder.add_variable("$aux0".to_string(), Some(owning_rule)).unwrap();
    let aux_rule = builder.reserve_rule(aux);
    builder.fill_rule(aux_rule, vec![], None, Associativity::None);
    builder.fill_rule(owning_rule, vec![Reference::Variable(aux)], None, Associativity::None);

    let grammar = builder.finish(s, error);
    assert!(grammar.variable(aux).is_collapsible());
    assert_eq!(grammar.variable(aux).parent_rule, Some(owning_rule));
}

#[test]
fn display_rule_renders_epsilon_for_empty_rhs() {
    let mut builder = GrammarBuilder::new();
    let error = builder.add_terminal("@error".to_string(), false).unwrap();
    let s = builder.add_variable("S".to_string(), None).unwrap();
    let rule = builder.reserve_rule(s);
    builder.fill_rule(rule, vec![], None, Associativity::None);
    let grammar = builder.finish(s, error);

    assert_eq!(grammar.display_rule(rule).to_string(), "S -> ε");
}

#[test]
fn display_rule_renders_terminal_and_variable_names() {
    let mut builder = GrammarBuilder::new();
    let error = builder.add_terminal("@error".to_string(), false).unwrap();
    let plus = builder.add_terminal("PLUS".to_string(), false).unwrap();
    let e = builder.add_variable("E".to_string(), None).unwrap();
    let rule = builder.reserve_rule(e);
    builder.fill_rule(
        rule,
        vec![
            Reference::Variable(e),
            Reference::Terminal { id: plus, preserved: true },
            Reference::Variable(e),
        ],
        Some(Precedence { set: 0, level: 0 }),
        Associativity::Left,
    );
    let grammar = builder.finish(e, error);

    assert_eq!(grammar.display_rule(rule).to_string(), "E -> E PLUS E");
}

#[test]
fn is_error_rule_detects_error_terminal_reference() {
    let mut builder = GrammarBuilder::new();
    let error = builder.add_terminal("@error".to_string(), false).unwrap();
    let semi = builder.add_terminal("SEMI".to_string(), false).unwrap();
    let stmt = builder.add_variable("stmt".to_string(), None).unwrap();
    let rule = builder.reserve_rule(stmt);
    builder.fill_rule(
        rule,
        vec![
            Reference::Terminal { id: error, preserved: true },
            Reference::Terminal { id: semi, preserved: true },
        ],
        None,
        Associativity::None,
    );
    let grammar = builder.finish(stmt, error);

    assert!(grammar.is_error_rule(rule));
}
