use crate::doc::{
    AssociativityDoc, ConstructDoc, GrammarDoc, PrecedenceEntryDoc, TerminalDoc, VariableDoc,
};
use crate::error::GrammarError;
use crate::loader::load;
use crate::types::Reference;

fn terminal(name: &str) -> ConstructDoc {
    ConstructDoc::Terminal { name: name.to_string(), preserved: None }
}

fn variable(name: &str) -> ConstructDoc {
    ConstructDoc::Variable { name: name.to_string() }
}

/// `E -> E '+' E | E '*' E | id`, `+` level 0 / `*` level 1, both
/// left-associative, single precedence set.
#[test]
fn precedence_block_assigns_ascending_levels_and_shared_set() {
    let doc = GrammarDoc {
        start: "E".to_string(),
        terminals: vec![
            TerminalDoc { name: "PLUS".to_string(), discardable: false },
            TerminalDoc { name: "STAR".to_string(), discardable: false },
            TerminalDoc { name: "ID".to_string(), discardable: false },
        ],
        variables: vec![VariableDoc {
            name: "E".to_string(),
            rules: vec![vec![terminal("ID")]],
            precedence_blocks: vec![vec![
                PrecedenceEntryDoc::Rule {
                    associativity: AssociativityDoc::Left,
                    rule: vec![variable("E"), terminal("PLUS"), variable("E")],
                },
                PrecedenceEntryDoc::Rule {
                    associativity: AssociativityDoc::Left,
                    rule: vec![variable("E"), terminal("STAR"), variable("E")],
                },
            ]],
        }],
    };

    let grammar = load(&doc).expect("valid grammar");
    let e = grammar.variable_by_name("E").unwrap();
    let rules: Vec<_> = grammar.variable(e).rules.iter().map(|&id| grammar.rule(id)).collect();

    // id-rule is plain: no precedence.
    assert!(rules.iter().any(|r| r.precedence.is_none() && r.rhs.len() == 1));

    let plus_rule = rules.iter().find(|r| r.rhs.len() == 3 && matches!(r.rhs[1], Reference::Terminal { id, .. } if grammar.terminal(id).name == "PLUS")).unwrap();
    let star_rule = rules.iter().find(|r| r.rhs.len() == 3 && matches!(r.rhs[1], Reference::Terminal { id, .. } if grammar.terminal(id).name == "STAR")).unwrap();

    let plus_prec = plus_rule.precedence.unwrap();
    let star_prec = star_rule.precedence.unwrap();
    assert_eq!(plus_prec.set, star_prec.set, "both rules share one precedence set");
    assert!(star_prec.level > plus_prec.level, "* is declared after + so it binds tighter");
}

/// `S -> S S | a` with no precedence set — both rules desugar with
/// `precedence: None`, which is what forces the table builder to fail the
/// resulting shift/reduce conflict rather than resolve it.
#[test]
fn rules_without_precedence_block_carry_no_precedence() {
    let doc = GrammarDoc {
        start: "S".to_string(),
        terminals: vec![TerminalDoc { name: "a".to_string(), discardable: false }],
        variables: vec![VariableDoc {
            name: "S".to_string(),
            rules: vec![vec![variable("S"), variable("S")], vec![terminal("a")]],
            precedence_blocks: vec![],
        }],
    };

    let grammar = load(&doc).expect("valid grammar");
    let s = grammar.variable_by_name("S").unwrap();
    for &rule_id in &grammar.variable(s).rules {
        assert!(grammar.rule(rule_id).precedence.is_none());
    }
}

#[test]
fn optional_construct_produces_collapsible_variable_with_two_rules() {
    let doc = GrammarDoc {
        start: "stmt".to_string(),
        terminals: vec![TerminalDoc { name: "ELSE".to_string(), discardable: false }],
        variables: vec![VariableDoc {
            name: "stmt".to_string(),
            rules: vec![vec![ConstructDoc::Optional { items: vec![terminal("ELSE")] }]],
            precedence_blocks: vec![],
        }],
    };

    let grammar = load(&doc).expect("valid grammar");
    let stmt = grammar.variable_by_name("stmt").unwrap();
    let stmt_rule = grammar.rule(grammar.variable(stmt).rules[0]);
    let Reference::Variable(aux) = stmt_rule.rhs[0] else { panic!("expected a variable reference") };

    let aux_var = grammar.variable(aux);
    assert!(aux_var.is_collapsible());
    assert_eq!(aux_var.rules.len(), 2);
    let lengths: Vec<_> = aux_var.rules.iter().map(|&id| grammar.rule(id).rhs.len()).collect();
    assert!(lengths.contains(&1), "one rule consumes ELSE");
    assert!(lengths.contains(&0), "the other is the empty alternative");
}

#[test]
fn unbounded_repeat_produces_left_recursive_and_base_rules() {
    let doc = GrammarDoc {
        start: "stmts".to_string(),
        terminals: vec![TerminalDoc { name: "STMT".to_string(), discardable: false }],
        variables: vec![VariableDoc {
            name: "stmts".to_string(),
            rules: vec![vec![ConstructDoc::Repeat { min: 0, max: None, items: vec![terminal("STMT")] }]],
            precedence_blocks: vec![],
        }],
    };

    let grammar = load(&doc).expect("valid grammar");
    let stmts = grammar.variable_by_name("stmts").unwrap();
    let Reference::Variable(aux) = grammar.rule(grammar.variable(stmts).rules[0]).rhs[0] else {
        panic!("expected a variable reference")
    };

    let rules: Vec<_> = grammar.variable(aux).rules.iter().map(|&id| grammar.rule(id)).collect();
    assert_eq!(rules.len(), 2);
    let recursive = rules.iter().find(|r| r.rhs.iter().any(|r| matches!(r, Reference::Variable(v) if *v == aux))).unwrap();
    assert_eq!(recursive.rhs.len(), 2, "A -> A STMT");
    let base = rules.iter().find(|r| !r.rhs.iter().any(|r| matches!(r, Reference::Variable(v) if *v == aux))).unwrap();
    assert!(base.rhs.is_empty(), "min=0 so the base case is epsilon");
}

#[test]
fn bounded_repeat_produces_one_rule_per_count() {
    let doc = GrammarDoc {
        start: "digits".to_string(),
        terminals: vec![TerminalDoc { name: "DIGIT".to_string(), discardable: false }],
        variables: vec![VariableDoc {
            name: "digits".to_string(),
            rules: vec![vec![ConstructDoc::Repeat { min: 1, max: Some(3), items: vec![terminal("DIGIT")] }]],
            precedence_blocks: vec![],
        }],
    };

    let grammar = load(&doc).expect("valid grammar");
    let digits = grammar.variable_by_name("digits").unwrap();
    let Reference::Variable(aux) = grammar.rule(grammar.variable(digits).rules[0]).rhs[0] else {
        panic!("expected a variable reference")
    };
    let mut lengths: Vec<_> = grammar.variable(aux).rules.iter().map(|&id| grammar.rule(id).rhs.len()).collect();
    lengths.sort_unstable();
    assert_eq!(lengths, vec![1, 2, 3]);
}

#[test]
fn repeat_min_greater_than_max_is_invalid_grammar() {
    let doc = GrammarDoc {
        start: "digits".to_string(),
        terminals: vec![TerminalDoc { name: "DIGIT".to_string(), discardable: false }],
        variables: vec![VariableDoc {
            name: "digits".to_string(),
            rules: vec![vec![ConstructDoc::Repeat { min: 3, max: Some(1), items: vec![terminal("DIGIT")] }]],
            precedence_blocks: vec![],
        }],
    };

    let err = load(&doc).unwrap_err();
    assert!(matches!(err, GrammarError::RepeatMinGreaterThanMax { min: 3, max: 1 }));
}

#[test]
fn choice_produces_one_rule_per_alternative() {
    let doc = GrammarDoc {
        start: "lit".to_string(),
        terminals: vec![
            TerminalDoc { name: "INT".to_string(), discardable: false },
            TerminalDoc { name: "REAL".to_string(), discardable: false },
        ],
        variables: vec![VariableDoc {
            name: "lit".to_string(),
            rules: vec![vec![ConstructDoc::Choice { alternatives: vec![vec![terminal("INT")], vec![terminal("REAL")]] }]],
            precedence_blocks: vec![],
        }],
    };

    let grammar = load(&doc).expect("valid grammar");
    let lit = grammar.variable_by_name("lit").unwrap();
    let Reference::Variable(aux) = grammar.rule(grammar.variable(lit).rules[0]).rhs[0] else {
        panic!("expected a variable reference")
    };
    assert_eq!(grammar.variable(aux).rules.len(), 2);
}

/// `stmt -> id '=' expr ';' | @error ';'`.
#[test]
fn error_construct_references_the_reserved_error_terminal_with_preserved_true() {
    let doc = GrammarDoc {
        start: "stmt".to_string(),
        terminals: vec![TerminalDoc { name: "SEMI".to_string(), discardable: false }],
        variables: vec![VariableDoc {
            name: "stmt".to_string(),
            rules: vec![vec![ConstructDoc::Error, terminal("SEMI")]],
            precedence_blocks: vec![],
        }],
    };

    let grammar = load(&doc).expect("valid grammar");
    let stmt = grammar.variable_by_name("stmt").unwrap();
    let rule_id = grammar.variable(stmt).rules[0];
    assert!(grammar.is_error_rule(rule_id));
    let Reference::Terminal { id, preserved } = grammar.rule(rule_id).rhs[0] else {
        panic!("expected a terminal reference")
    };
    assert_eq!(id, grammar.error_terminal());
    assert!(preserved);
}

#[test]
fn terminal_preserved_defaults_to_inverse_of_discardable() {
    let doc = GrammarDoc {
        start: "stmt".to_string(),
        terminals: vec![TerminalDoc { name: "SEMI".to_string(), discardable: true }],
        variables: vec![VariableDoc {
            name: "stmt".to_string(),
            rules: vec![vec![terminal("SEMI")]],
            precedence_blocks: vec![],
        }],
    };

    let grammar = load(&doc).expect("valid grammar");
    let stmt = grammar.variable_by_name("stmt").unwrap();
    let rule_id = grammar.variable(stmt).rules[0];
    let Reference::Terminal { preserved, .. } = grammar.rule(rule_id).rhs[0] else {
        panic!("expected a terminal reference")
    };
    assert!(!preserved, "a discardable terminal defaults to not preserved");
}

#[test]
fn unknown_start_variable_is_rejected() {
    let doc = GrammarDoc {
        start: "missing".to_string(),
        terminals: vec![],
        variables: vec![VariableDoc { name: "S".to_string(), rules: vec![vec![]], precedence_blocks: vec![] }],
    };

    let err = load(&doc).unwrap_err();
    assert!(matches!(err, GrammarError::UnknownStartVariable { name } if name == "missing"));
}

#[test]
fn reserved_error_terminal_name_in_the_document_is_rejected() {
    let doc = GrammarDoc {
        start: "S".to_string(),
        terminals: vec![TerminalDoc { name: "@error".to_string(), discardable: false }],
        variables: vec![VariableDoc { name: "S".to_string(), rules: vec![vec![]], precedence_blocks: vec![] }],
    };

    let err = load(&doc).unwrap_err();
    assert!(matches!(err, GrammarError::ReservedTerminalName { .. }));
}

#[test]
fn duplicate_variable_name_is_rejected() {
    let doc = GrammarDoc {
        start: "S".to_string(),
        terminals: vec![],
        variables: vec![
            VariableDoc { name: "S".to_string(), rules: vec![vec![]], precedence_blocks: vec![] },
            VariableDoc { name: "S".to_string(), rules: vec![vec![]], precedence_blocks: vec![] },
        ],
    };

    let err = load(&doc).unwrap_err();
    assert!(matches!(err, GrammarError::DuplicateVariable { name } if name == "S"));
}

#[test]
fn forward_reference_to_a_later_declared_variable_resolves() {
    let doc = GrammarDoc {
        start: "a".to_string(),
        terminals: vec![TerminalDoc { name: "X".to_string(), discardable: false }],
        variables: vec![
            VariableDoc { name: "a".to_string(), rules: vec![vec![variable("b")]], precedence_blocks: vec![] },
            VariableDoc { name: "b".to_string(), rules: vec![vec![terminal("X")]], precedence_blocks: vec![] },
        ],
    };

    load(&doc).expect("forward references across variables resolve");
}
