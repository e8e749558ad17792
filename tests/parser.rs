#[cfg(test)]
mod parser_tests {
    use fox::ast_printer::AstPrinter;
    use fox::error::Diagnostics;
    use fox::expr::{Expr, LiteralValue};
    use fox::parser::Parser;
    use fox::scanner::scan;
    use fox::stmt::Stmt;

    fn parse_program(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let statements = Parser::new(&tokens).parse(&mut diagnostics);
        (statements, diagnostics)
    }

    fn print_expression(source: &str) -> String {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let expr = Parser::new(&tokens)
            .parse_expression(&mut diagnostics)
            .expect("expression should parse");
        assert!(!diagnostics.has_errors(), "{}", diagnostics);
        AstPrinter::print(&expr)
    }

    #[test]
    fn test_precedence_and_grouping() {
        assert_eq!(print_expression("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expression("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expression("-123 * (45.67)"), "(* (- 123.0) (group 45.67))");
        assert_eq!(print_expression("!!true"), "(! (! true))");
        assert_eq!(print_expression("1 < 2 == 3 >= 4"), "(== (< 1.0 2.0) (>= 3.0 4.0))");
    }

    #[test]
    fn test_binary_operators_are_left_associative() {
        assert_eq!(print_expression("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
        assert_eq!(print_expression("8 / 4 / 2"), "(/ (/ 8.0 4.0) 2.0)");
    }

    #[test]
    fn test_logical_and_binds_tighter_than_or() {
        assert_eq!(print_expression("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(print_expression("a = b = 1"), "(= a (= b 1.0))");
        assert_eq!(print_expression("obj.field = 2"), "(= (. obj field) 2.0)");
    }

    #[test]
    fn test_calls_and_property_access() {
        assert_eq!(print_expression("f(1, x)(2)"), "(call (call f 1.0 x) 2.0)");
        assert_eq!(print_expression("a.b.c()"), "(call (. (. a b) c))");
        assert_eq!(print_expression("\"hello\""), "hello");
        assert_eq!(print_expression("nil"), "nil");
    }

    #[test]
    fn test_expression_must_consume_all_tokens() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("1 2", &mut diagnostics);
        let expr = Parser::new(&tokens).parse_expression(&mut diagnostics);

        assert!(expr.is_none());
        assert!(diagnostics.to_string().contains("Expected end of expression."));
    }

    #[test]
    fn test_for_desugars_into_while() {
        let (statements, diagnostics) =
            parse_program("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(!diagnostics.has_errors());
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block, got {:?}", statements[0]);
        };
        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };
        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected block body, got {:?}", body);
        };
        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn test_for_without_clauses_loops_on_true() {
        let (statements, diagnostics) = parse_program("for (;;) print 1;");
        assert!(!diagnostics.has_errors());

        match &statements[0] {
            Stmt::While { condition, body } => {
                assert_eq!(*condition, Expr::Literal(LiteralValue::True));
                assert!(matches!(body.as_ref(), Stmt::Print(_)));
            }
            other => panic!("expected bare while, got {:?}", other),
        }
    }

    #[test]
    fn test_class_declaration_with_superclass() {
        let (statements, diagnostics) = parse_program(
            "class B < A { init(x) { this.x = x; } get() { return super.get(); } }",
        );
        assert!(!diagnostics.has_errors(), "{}", diagnostics);

        match &statements[0] {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
                let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
                assert_eq!(names, ["init", "get"]);
                assert_eq!(methods[0].params.len(), 1);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (statements, diagnostics) = parse_program("1 + 2 = 3; print 4;");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.to_string(),
            "[line 1] Error at '=': Invalid assignment target."
        );
        // Both statements survive: the parser did not resynchronise.
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_error_recovery_reports_every_bad_declaration() {
        let (statements, diagnostics) = parse_program("var = 1;\nprint 2;\nprint ;\nprint 3;");

        let messages: Vec<String> = diagnostics.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            [
                "[line 1] Error at '=': Expected variable name.",
                "[line 3] Error at ';': Expected expression.",
            ]
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_missing_semicolon_reported_at_end() {
        let (_, diagnostics) = parse_program("print 1");

        assert_eq!(
            diagnostics.to_string(),
            "[line 1] Error at end: Expected ';' after value."
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (statements, diagnostics) = parse_program(&source);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics
            .to_string()
            .contains("Can't have more than 255 arguments."));
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_super_requires_method_name() {
        let (_, diagnostics) = parse_program("class A < B { m() { super; } }");

        assert!(diagnostics.to_string().contains("Expected '.' after 'super'."));
    }

    #[test]
    fn test_reference_ids_are_unique() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("a = b; c;", &mut diagnostics);
        let mut parser = Parser::with_first_id(&tokens, 10);
        let statements = parser.parse(&mut diagnostics);

        let mut ids = Vec::new();
        for stmt in &statements {
            if let Stmt::Expression(expr) = stmt {
                match expr {
                    Expr::Assign { value, id, .. } => {
                        ids.push(*id);
                        if let Expr::Variable { id, .. } = value.as_ref() {
                            ids.push(*id);
                        }
                    }
                    Expr::Variable { id, .. } => ids.push(*id),
                    _ => {}
                }
            }
        }

        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id.0 >= 10));
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id.0 < parser.next_id()));
    }
}
