#[cfg(test)]
mod resolver_tests {
    use fox::error::Diagnostics;
    use fox::expr::Expr;
    use fox::parser::Parser;
    use fox::resolver::{Locals, Resolver};
    use fox::scanner::scan;
    use fox::stmt::Stmt;

    fn parse(source: &str) -> Vec<Stmt> {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let statements = Parser::new(&tokens).parse(&mut diagnostics);
        assert!(!diagnostics.has_errors(), "{}", diagnostics);
        statements
    }

    fn resolve(statements: &[Stmt]) -> (Locals, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut resolver = Resolver::new();
        resolver.resolve(statements, &mut diagnostics);
        (resolver.into_locals(), diagnostics)
    }

    fn messages(source: &str) -> Vec<String> {
        let statements = parse(source);
        let (_, diagnostics) = resolve(&statements);
        diagnostics.iter().map(|e| e.to_string()).collect()
    }

    /// Hop count recorded for the single `print <variable>;` inside `stmt`.
    fn print_depth(locals: &Locals, stmt: &Stmt) -> Option<usize> {
        match stmt {
            Stmt::Print(Expr::Variable { id, .. }) => locals.get(id).copied(),
            Stmt::Block(inner) => inner.iter().find_map(|s| print_depth(locals, s)),
            Stmt::Function(decl) => decl.body.iter().find_map(|s| print_depth(locals, s)),
            _ => None,
        }
    }

    #[test]
    fn test_globals_are_not_recorded() {
        let statements = parse("var a = 1; print a;");
        let (locals, diagnostics) = resolve(&statements);

        assert!(diagnostics.is_empty());
        assert!(locals.is_empty());
    }

    #[test]
    fn test_hop_counts() {
        let statements = parse("{ var a = 1; { { print a; } } }");
        let (locals, diagnostics) = resolve(&statements);

        assert!(diagnostics.is_empty());
        assert_eq!(print_depth(&locals, &statements[0]), Some(2));
    }

    #[test]
    fn test_innermost_shadow_wins() {
        let statements = parse("{ var a = 1; { var a = 2; print a; } }");
        let (locals, diagnostics) = resolve(&statements);

        assert!(diagnostics.is_empty());
        assert_eq!(print_depth(&locals, &statements[0]), Some(0));
    }

    #[test]
    fn test_closure_captures_enclosing_function_scope() {
        let statements = parse("fun outer() { var x = 1; fun inner() { print x; } }");
        let (locals, diagnostics) = resolve(&statements);

        assert!(diagnostics.is_empty());
        let Stmt::Function(outer) = &statements[0] else {
            panic!("expected function");
        };
        // inner body scope → outer body scope
        assert_eq!(print_depth(&locals, &outer.body[1]), Some(1));
    }

    #[test]
    fn test_resolving_twice_gives_the_same_table() {
        let statements = parse("{ var a; fun f(b) { print a; print b; } }");
        let (first, _) = resolve(&statements);
        let (second, _) = resolve(&statements);

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_redeclaration_in_local_scope() {
        assert_eq!(
            messages("{ var a = 1; var a = 2; }"),
            ["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        // Globals may be redeclared.
        assert!(messages("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_duplicate_parameter() {
        assert_eq!(
            messages("fun f(a, a) {}"),
            ["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            messages("var a = 1; { var a = a; }"),
            ["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_invalid_return() {
        assert_eq!(
            messages("return 1;"),
            ["[line 1] Error at 'return': Can't return from top-level code."]
        );
        assert_eq!(
            messages("class A { init() { return 1; } }"),
            ["[line 1] Error at 'return': Can't return a value from an initializer."]
        );
        assert!(messages("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_invalid_this_and_super() {
        assert_eq!(
            messages("print this;"),
            ["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
        assert_eq!(
            messages("fun f() { super.m(); }"),
            ["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );
        assert_eq!(
            messages("class A { m() { super.m(); } }"),
            ["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        assert_eq!(
            messages("class A < A {}"),
            ["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_all_errors_are_collected() {
        let errors = messages("return;\nprint this;\n{ var b; var b; }");

        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("[line 1]"));
        assert!(errors[1].starts_with("[line 2]"));
        assert!(errors[2].starts_with("[line 3]"));
    }
}
