#[cfg(test)]
mod session_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use fox::session::{RunError, Session, EXIT_RUNTIME_ERROR, EXIT_STATIC_ERROR};
    use fox::value::Value;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
        }
    }

    fn session() -> (Session, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Session::with_output(Box::new(buffer.clone())), buffer)
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let (mut session, buffer) = session();

        let error = session
            .run("print \"never\";\nvar;")
            .expect_err("parse error expected");
        assert_eq!(buffer.contents(), "");
        assert_eq!(error.exit_code(), EXIT_STATIC_ERROR);
        assert!(matches!(error, RunError::Static(_)));

        let error = session
            .run("print \"never\";\nreturn 1;")
            .expect_err("resolve error expected");
        assert_eq!(buffer.contents(), "");
        assert_eq!(error.exit_code(), EXIT_STATIC_ERROR);
        assert_eq!(
            error.to_string(),
            "[line 2] Error at 'return': Can't return from top-level code."
        );
    }

    #[test]
    fn test_every_static_error_is_reported() {
        let (mut session, _) = session();

        let error = session
            .run("var x = $;\nprint @;")
            .expect_err("scan errors expected");

        match error {
            RunError::Static(diagnostics) => {
                let lines: Vec<String> = diagnostics.iter().map(|e| e.to_string()).collect();
                assert_eq!(
                    lines,
                    [
                        "[line 1] Error: Unexpected character: $",
                        "[line 1] Error at ';': Expected expression.",
                        "[line 2] Error: Unexpected character: @",
                        "[line 2] Error at ';': Expected expression.",
                    ]
                );
            }
            other => panic!("expected static error, got {}", other),
        }
    }

    #[test]
    fn test_runtime_error_exit_code() {
        let (mut session, buffer) = session();

        let error = session
            .run("print \"before\";\nprint nil + 1;")
            .expect_err("runtime error expected");
        assert_eq!(error.exit_code(), EXIT_RUNTIME_ERROR);
        assert!(matches!(error, RunError::Runtime(_)));
        assert_eq!(buffer.contents(), "before\n");
    }

    #[test]
    fn test_session_keeps_state_between_runs() {
        let (mut session, buffer) = session();

        assert!(session.run("var x = 1; fun inc() { x = x + 1; }").is_ok());
        assert!(session.run("inc(); inc();").is_ok());
        // An error on one line does not lose earlier definitions.
        assert!(session.run("print nope;").is_err());
        assert!(session.run("{ var y = x; print y; }").is_ok());
        assert!(session
            .run("class A { hi() { return \"hi\"; } }")
            .is_ok());
        assert!(session.run("class B < A {} print B().hi();").is_ok());

        assert_eq!(buffer.contents(), "3\nhi\n");
    }

    #[test]
    fn test_closures_survive_across_runs() {
        let (mut session, buffer) = session();

        assert!(session
            .run("fun make() { var n = 0; fun f() { n = n + 1; print n; } return f; }")
            .is_ok());
        assert!(session.run("var counter = make();").is_ok());
        assert!(session.run("counter(); counter();").is_ok());

        assert_eq!(buffer.contents(), "1\n2\n");
    }

    #[test]
    fn test_evaluate_expression() {
        let (mut session, _) = session();

        match session.evaluate("(1 + 2) * 4") {
            Ok(Value::Number(n)) => assert_eq!(n, 12.0),
            other => panic!("unexpected result: {:?}", other),
        }
        match session.evaluate("\"a\" + \"b\"") {
            Ok(value) => assert_eq!(value.to_string(), "ab"),
            Err(e) => panic!("unexpected error: {}", e),
        }

        let error = session.evaluate("-true").expect_err("should fail at runtime");
        assert_eq!(error.exit_code(), EXIT_RUNTIME_ERROR);

        let error = session.evaluate("1 +").expect_err("should fail to parse");
        assert_eq!(error.exit_code(), EXIT_STATIC_ERROR);
    }

    #[test]
    fn test_evaluate_sees_globals_from_run() {
        let (mut session, _) = session();

        assert!(session.run("var answer = 41;").is_ok());
        match session.evaluate("answer + 1") {
            Ok(value) => assert_eq!(value.to_string(), "42"),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn test_static_errors_are_reported_in_source_order() {
        let (mut session, _) = session();

        let error = session
            .run("var = 1;\nprint 2;\nprint @;")
            .expect_err("static errors expected");

        assert_eq!(
            error.to_string(),
            "[line 1] Error at '=': Expected variable name.\n\
             [line 3] Error: Unexpected character: @\n\
             [line 3] Error at ';': Expected expression."
        );
    }

    #[test]
    fn test_top_level_resolutions_are_dropped_after_a_run() {
        let (mut session, buffer) = session();

        assert!(session.run("{ var a = 1; print a; }").is_ok());
        assert_eq!(session.interpreter().resolved_len(), 0);

        // Only the reference inside the function body outlives the run.
        assert!(session
            .run("var f; { var b = 2; fun g() { print b; } f = g; }")
            .is_ok());
        assert_eq!(session.interpreter().resolved_len(), 1);

        assert!(session.run("f();").is_ok());
        assert!(session.run("{ var c = nil; print c + 1; }").is_err());
        assert_eq!(session.interpreter().resolved_len(), 1);

        assert_eq!(buffer.contents(), "1\n2\n");
    }
}
