#[cfg(test)]
mod tests {
    use crate::ast::{Kind, NodeKind};
    use crate::error::ParseErrorKind;
    use crate::parser::{parse_module, parse_script, ParseOutput, Parser};
    use serde_json::{json, Value};

    fn script(source: &str) -> ParseOutput {
        parse_script(source).unwrap_or_else(|e| panic!("{}: {}", source, e))
    }

    fn statements(source: &str) -> Vec<Value> {
        let output = script(source);
        let tree = output.ast.to_json(output.root);
        tree["statements"].as_array().cloned().unwrap_or_default()
    }

    /// The expression of the first statement.
    fn expression(source: &str) -> Value {
        statements(source)[0]["expression"].clone()
    }

    fn script_error(source: &str) -> (ParseErrorKind, String) {
        match parse_script(source) {
            Ok(_) => panic!("expected a parse error for {:?}", source),
            Err(e) => (e.kind, e.message),
        }
    }

    fn module_error(source: &str) -> (ParseErrorKind, String) {
        match parse_module(source) {
            Ok(_) => panic!("expected a parse error for {:?}", source),
            Err(e) => (e.kind, e.message),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PRECEDENCE
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let expr = expression("a + b * c;");
        assert_eq!(expr["operator"], "+");
        assert_eq!(expr["left"]["value"], "a");
        assert_eq!(expr["right"]["operator"], "*");
    }

    #[test]
    fn test_null_coalescing_is_loosest() {
        let expr = expression("x ?? y || z;");
        assert_eq!(expr["type"], "BinaryExpression");
        assert_eq!(expr["operator"], "??");
        assert_eq!(expr["left"]["value"], "x");
        assert_eq!(expr["right"]["operator"], "||");
    }

    #[test]
    fn test_null_coalescing_rejects_unparenthesized_logical_left() {
        let (kind, _) = script_error("x || y ?? z;");
        assert_eq!(kind, ParseErrorKind::Syntax);
        script_error("x && y ?? z;");
    }

    #[test]
    fn test_null_coalescing_accepts_parenthesized_logical_left() {
        let expr = expression("(x || y) ?? z;");
        assert_eq!(expr["operator"], "??");
        assert_eq!(expr["left"]["type"], "ParenExpression");
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let expr = expression("2 ** 3 ** 2;");
        assert_eq!(expr["operator"], "**");
        assert_eq!(expr["left"]["value"], 2.0);
        assert_eq!(expr["right"]["operator"], "**");
        assert_eq!(expr["right"]["left"]["value"], 3.0);
    }

    #[test]
    fn test_unary_exponent_base_is_rejected() {
        script_error("-2 ** 2;");
        let expr = expression("(-2) ** 2;");
        assert_eq!(expr["operator"], "**");
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = expression("a - b - c;");
        assert_eq!(expr["left"]["operator"], "-");
        assert_eq!(expr["right"]["value"], "c");
    }

    #[test]
    fn test_conditional_and_assignment() {
        let expr = expression("a = b ? c : d;");
        assert_eq!(expr["type"], "AssignmentExpression");
        assert_eq!(expr["right"]["type"], "ConditionalExpression");
    }

    #[test]
    fn test_regex_versus_division() {
        let expr = expression("a / b / c;");
        assert_eq!(expr["operator"], "/");

        let expr = expression("x = /ab+c/g;");
        assert_eq!(expr["right"]["type"], "RegularExpression");
        assert_eq!(expr["right"]["flags"], "g");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // AUTOMATIC SEMICOLON INSERTION
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_asi_before_brace_and_end_of_input() {
        assert_eq!(statements("{ a }").len(), 1);
        assert_eq!(statements("a").len(), 1);
        assert_eq!(statements("a\nb").len(), 2);
    }

    #[test]
    fn test_asi_rejects_same_line_statements() {
        let (_, message) = script_error("a b");
        assert_eq!(message, "Unexpected token IDENTIFIER");
    }

    #[test]
    fn test_asi_hook_can_reject_insertion() {
        let result = Parser::new("a\nb;")
            .with_asi_hook(Box::new(|_| false))
            .parse_script();
        assert!(result.is_err());

        let result = Parser::new("a;\nb;")
            .with_asi_hook(Box::new(|_| false))
            .parse_script();
        assert!(result.is_ok());
    }

    #[test]
    fn test_return_argument_stops_at_newline() {
        let body = statements("function f() { return\n1; }");
        let statements = body[0]["body"]["statements"].as_array().cloned().unwrap_or_default();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0]["argument"], Value::Null);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STRICT MODE
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_with_is_deferred_until_strictness_known() {
        assert!(parse_script("with (a) b;").is_ok());

        let (kind, message) = script_error("'use strict'; with (a) b;");
        assert_eq!(kind, ParseErrorKind::Strict);
        assert_eq!(message, "With statement is not allowed in strict mode");
    }

    #[test]
    fn test_octal_literal_before_directive_in_function() {
        assert!(parse_script("function f() { return 010; }").is_ok());
        let (kind, _) = script_error("function f() { 'use strict'; return 010; }");
        assert_eq!(kind, ParseErrorKind::Strict);
    }

    #[test]
    fn test_nested_function_inherits_strictness() {
        let (kind, _) = script_error("'use strict'; function f() { with (a) {} }");
        assert_eq!(kind, ParseErrorKind::Strict);

        // Sloppy outer code is unaffected by an inner directive
        assert!(parse_script("function f() { 'use strict'; } with (a) {}").is_ok());
    }

    #[test]
    fn test_directive_rewrites_statement() {
        let body = statements("'use strict';\nx;");
        assert_eq!(body[0]["type"], "Directive");
        assert_eq!(body[0]["value"], "use strict");
        assert_eq!(body[1]["type"], "ExpressionStatement");
    }

    #[test]
    fn test_use_strict_rejected_with_complex_parameters() {
        let (_, message) = script_error("function f(a = 1) { 'use strict'; }");
        assert_eq!(message, "Invalid \"use strict\" directive");
    }

    #[test]
    fn test_modules_are_strict() {
        let (kind, _) = module_error("with (a) {}");
        assert_eq!(kind, ParseErrorKind::Strict);
        module_error("let await = 1;");
    }

    #[test]
    fn test_module_top_level_await() {
        let output = parse_module("await x; async function f() { await y; }").unwrap();
        let tree = output.ast.to_json(output.root);
        assert_eq!(tree["statements"][0]["expression"]["operator"], "await");
        assert!(parse_script("await x;").is_err());
    }

    #[test]
    fn test_strict_binding_names() {
        assert!(parse_script("var eval = 1;").is_ok());
        let (kind, message) = script_error("'use strict'; var eval = 1;");
        assert_eq!(kind, ParseErrorKind::Strict);
        assert_eq!(message, "Binding cannot be created for 'eval' in strict mode");
    }

    #[test]
    fn test_duplicate_parameters() {
        assert!(parse_script("function f(a, a) {}").is_ok());
        script_error("'use strict'; function f(a, a) {}");
        script_error("(a, a) => 1;");
    }

    #[test]
    fn test_delete_identifier_in_strict_code() {
        assert!(parse_script("delete x;").is_ok());
        let (_, message) = script_error("'use strict'; delete x;");
        assert_eq!(message, "Cannot delete unqualified property in strict mode");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CONTROL FLOW
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_break_and_continue_validation() {
        let (_, message) = script_error("break;");
        assert_eq!(message, "Break not contained within a switch or loop");

        let (_, message) = script_error("switch (a) { case 1: continue; }");
        assert_eq!(message, "Continue not contained within a loop");

        assert!(parse_script("outer: for (;;) { for (;;) { continue outer; } }").is_ok());
        assert!(parse_script("block: { break block; }").is_ok());
        script_error("block: { continue block; }");
    }

    #[test]
    fn test_label_reuse_rejected() {
        let (_, message) = script_error("a: a: x;");
        assert_eq!(message, "Invalid label");
    }

    #[test]
    fn test_return_outside_function() {
        let (_, message) = script_error("return 1;");
        assert_eq!(message, "Return statement outside of function");
    }

    #[test]
    fn test_duplicate_default_case() {
        script_error("switch (a) { default: break; default: break; }");
    }

    #[test]
    fn test_for_variants() {
        let body = statements("for (let x of y) {}\nfor (var k in o) {}\nfor (let i = 0; i < 3; i++) {}");
        assert_eq!(body[0]["type"], "ForOfStatement");
        assert_eq!(body[1]["type"], "ForInStatement");
        assert_eq!(body[2]["type"], "ForStatement");
    }

    #[test]
    fn test_for_of_destructuring_target() {
        let body = statements("for ([a, b] of pairs) {}");
        assert_eq!(body[0]["left"]["type"], "ArrayPattern");
    }

    #[test]
    fn test_const_requires_initializer() {
        let (_, message) = script_error("const a;");
        assert_eq!(message, "Missing const initializer");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ARROW FUNCTIONS AND PATTERNS
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_arrow_head_confirmed() {
        let expr = expression("(a, b = 1, ...c) => a;");
        assert_eq!(expr["type"], "ArrowFunction");

        let params = expr["params"].as_array().cloned().unwrap_or_default();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0]["type"], "FormalParameter");
        assert_eq!(params[1]["initializer"]["value"], 1.0);
        assert_eq!(params[2]["type"], "RestParameter");
    }

    #[test]
    fn test_parenthesized_expression_not_arrow() {
        let expr = expression("(a, b);");
        assert_eq!(expr["type"], "ParenExpression");
        assert_eq!(expr["expression"]["type"], "SequenceExpression");
    }

    #[test]
    fn test_arrow_across_newline_rejected() {
        script_error("(a)\n=> a;");
    }

    #[test]
    fn test_spread_outside_arrow_head_rejected() {
        let (_, message) = script_error("(...a);");
        assert_eq!(message, "Invalid spread expression");
    }

    #[test]
    fn test_cover_initializer_only_valid_as_pattern() {
        let (_, message) = script_error("x = { a = 1 };");
        assert_eq!(message, "Invalid property definition in object literal");

        let expr = expression("({ a = 1 } = obj);");
        assert_eq!(expr["expression"]["left"]["type"], "ObjectPattern");
        assert_eq!(expr["expression"]["left"]["properties"][0]["type"], "PatternProperty");
    }

    #[test]
    fn test_async_arrow() {
        let expr = expression("async (x) => await x;");
        assert_eq!(expr["type"], "ArrowFunction");
        assert_eq!(expr["kind"], "Async");
        assert_eq!(expr["body"]["type"], "UnaryExpression");
        assert_eq!(expr["body"]["operator"], "await");
    }

    #[test]
    fn test_binding_patterns() {
        let body = statements("let { a, b: [c, , ...d], e = 2 } = obj;");
        let pattern = &body[0]["declarations"][0]["pattern"];
        assert_eq!(pattern["type"], "ObjectPattern");
        assert_eq!(pattern["properties"][1]["pattern"]["type"], "ArrayPattern");
        assert_eq!(pattern["properties"][1]["pattern"]["elements"][1]["type"], "Elision");
        assert_eq!(pattern["properties"][1]["pattern"]["elements"][2]["type"], "PatternRestElement");
        assert_eq!(pattern["properties"][2]["initializer"]["value"], 2.0);
    }

    #[test]
    fn test_rest_element_must_be_last() {
        let (_, message) = script_error("let [...a, b] = c;");
        assert_eq!(message, "Invalid rest element");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let (_, message) = script_error("a + b = c;");
        assert_eq!(message, "Invalid assignment target");
        script_error("a() += 1;");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FUNCTIONS AND CLASSES
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_generator_and_yield() {
        let body = statements("function* g() { yield* other(); }");
        assert_eq!(body[0]["kind"], "Generator");

        let yielded = &body[0]["body"]["statements"][0]["expression"];
        assert_eq!(yielded["type"], "YieldExpression");
        assert_eq!(yielded["delegate"], true);

        let (_, message) = script_error("function* g() { var yield; }");
        assert_eq!(message, "yield cannot be an identifier inside of a generator function");
    }

    #[test]
    fn test_class_members() {
        let body = statements(
            "class A extends B {\n  constructor() { super(); }\n  static create() {}\n  get size() { return 1; }\n  count = 0;\n}",
        );
        let elements = body[0]["body"]["elements"].as_array().cloned().unwrap_or_default();
        assert_eq!(elements.len(), 4);
        assert_eq!(elements[0]["kind"], "Constructor");
        assert_eq!(elements[1]["isStatic"], true);
        assert_eq!(elements[2]["kind"], "Get");
        assert_eq!(elements[3]["type"], "ClassField");
    }

    #[test]
    fn test_duplicate_constructor() {
        let (_, message) = script_error("class A { constructor() {} constructor() {} }");
        assert_eq!(message, "Duplicate constructor definitions");
    }

    #[test]
    fn test_static_prototype_rejected() {
        let (_, message) = script_error("class A { static prototype() {} }");
        assert_eq!(message, "Invalid prototype property in class definition");
    }

    #[test]
    fn test_class_body_is_strict() {
        let (kind, _) = script_error("class A { m() { with (a) {} } }");
        assert_eq!(kind, ParseErrorKind::Strict);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // EXTENSIONS
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_class_mixins() {
        let body = statements("class A extends Base with B, C {}");
        assert_eq!(body[0]["base"]["value"], "Base");
        assert_eq!(body[0]["mixins"], json!([
            { "type": "Identifier", "value": "B", "context": "variable" },
            { "type": "Identifier", "value": "C", "context": "variable" },
        ]));
    }

    #[test]
    fn test_call_with_operator() {
        let expr = expression("obj->foo.bar(1, 2);");
        assert_eq!(expr["type"], "CallWithExpression");
        assert_eq!(expr["subject"]["value"], "obj");
        assert_eq!(expr["callee"]["type"], "MemberExpression");
        assert_eq!(expr["arguments"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_symbol_names() {
        let expr = expression("x.@y = 1;");
        assert_eq!(expr["left"]["property"]["type"], "SymbolName");
        assert_eq!(expr["left"]["property"]["value"], "@y");
    }

    #[test]
    fn test_method_extraction() {
        let expr = expression("&obj.fn;");
        assert_eq!(expr["type"], "UnaryExpression");
        assert_eq!(expr["operator"], "&");

        let (_, message) = script_error("&fn;");
        assert_eq!(message, "Invalid method extraction");
    }

    #[test]
    fn test_async_block() {
        let body = statements("async { await 1; }");
        assert_eq!(body[0]["type"], "AsyncBlock");
        assert_eq!(body[0]["statements"][0]["expression"]["operator"], "await");
    }

    #[test]
    fn test_async_expression() {
        let expr = expression("x = async { await 1; };");
        assert_eq!(expr["right"]["type"], "AsyncExpression");
        assert_eq!(expr["right"]["statements"][0]["expression"]["operator"], "await");

        let expr = expression("p = async {}.then;");
        assert_eq!(expr["right"]["type"], "MemberExpression");
        assert_eq!(expr["right"]["object"]["type"], "AsyncExpression");

        // A line break after `async` leaves a plain identifier
        let body = statements("x = async\n{}");
        assert_eq!(body[0]["expression"]["right"]["type"], "Identifier");
        assert_eq!(body[1]["type"], "Block");
    }

    #[test]
    fn test_class_initializer() {
        let body = statements("class A { static { this.x = super.y; } static z = 1; }");
        let elements = body[0]["body"]["elements"].as_array().cloned().unwrap_or_default();

        assert_eq!(elements[0]["type"], "ClassInitializer");
        assert_eq!(elements[0]["statements"][0]["expression"]["operator"], "=");
        assert_eq!(elements[1]["type"], "ClassField");
        assert_eq!(elements[1]["isStatic"], true);
    }

    #[test]
    fn test_class_initializer_is_not_a_function() {
        let (_, message) = script_error("class A { static { return; } }");
        assert_eq!(message, "Return statement outside of function");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ANNOTATIONS
    // ═══════════════════════════════════════════════════════════════════════

    fn annotated_kinds(output: &ParseOutput) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = output
            .annotations
            .keys()
            .map(|&id| output.ast.kind(id).name())
            .collect();
        kinds.sort();
        kinds
    }

    #[test]
    fn test_annotated_declarations_and_members() {
        let output = script("#[a] function f() {}\n#[b, c(1)] #[d] class C { #[e] m() {} #[f] x = 1; }");
        assert_eq!(
            annotated_kinds(&output),
            vec!["ClassDeclaration", "ClassField", "FunctionDeclaration", "MethodDefinition"]
        );

        let class = output
            .annotations
            .iter()
            .find(|(&id, _)| output.ast.kind(id) == Kind::ClassDeclaration)
            .map(|(_, list)| list.clone())
            .unwrap_or_default();
        assert_eq!(class.len(), 2);

        let first = output.ast.to_json(class[0]);
        assert_eq!(first["type"], "Annotation");
        assert_eq!(first["expressions"][0]["value"], "b");
        assert_eq!(first["expressions"][1]["type"], "CallExpression");
    }

    #[test]
    fn test_annotated_object_members() {
        let output = script("x = { #[a] p: 1, #[b] m() {}, #[c] get g() { return 1; } };");
        assert_eq!(
            annotated_kinds(&output),
            vec!["MethodDefinition", "MethodDefinition", "PropertyDefinition"]
        );
    }

    #[test]
    fn test_annotated_exports() {
        let output = parse_module("#[a] export function f() {}\n#[b] export default class {}")
            .unwrap_or_else(|e| panic!("{}", e));
        assert_eq!(annotated_kinds(&output), vec!["ClassDeclaration", "FunctionDeclaration"]);
    }

    #[test]
    fn test_annotation_errors() {
        let (_, message) = script_error("#[a] x;");
        assert_eq!(message, "Invalid annotation target");

        let (_, message) = script_error("x = { #[a] ...y };");
        assert_eq!(message, "Invalid annotation target");

        let (_, message) = module_error("#[a] export default x;");
        assert_eq!(message, "Invalid annotation target");

        let (_, message) = script_error("#[] function f() {}");
        assert_eq!(message, "Empty annotation");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // MODULES
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_import_forms() {
        let output = parse_module(
            "import a from 'a';\nimport * as b from 'b';\nimport { c as d, default as e } from 'c';\nimport 'd';",
        )
        .unwrap_or_else(|e| panic!("{}", e));
        let tree = output.ast.to_json(output.root);
        let body = tree["statements"].as_array().cloned().unwrap_or_default();

        assert_eq!(body[0]["imports"]["type"], "DefaultImport");
        assert_eq!(body[1]["imports"]["type"], "NamespaceImport");
        assert_eq!(body[2]["imports"]["specifiers"][1]["imported"]["value"], "default");
        assert_eq!(body[2]["imports"]["specifiers"][1]["local"]["value"], "e");
        assert_eq!(body[3]["imports"], Value::Null);
    }

    #[test]
    fn test_export_forms() {
        let output = parse_module(
            "export default class {}\nexport function f() {}\nexport { x as y };\nexport * from 'z';\nexport v from 'w';\nlet x;",
        )
        .unwrap_or_else(|e| panic!("{}", e));
        let tree = output.ast.to_json(output.root);
        let body = tree["statements"].as_array().cloned().unwrap_or_default();

        assert_eq!(body[0]["binding"]["type"], "ClassDeclaration");
        assert_eq!(body[1]["declaration"]["type"], "FunctionDeclaration");
        assert_eq!(body[2]["specifiers"][0]["local"]["context"], "variable");
        assert_eq!(body[3]["type"], "ExportNamespace");
        assert_eq!(body[4]["type"], "ExportDefaultFrom");
    }

    #[test]
    fn test_export_reserved_local_rejected() {
        module_error("export { default };");
    }

    #[test]
    fn test_dynamic_import_and_meta() {
        let output = parse_module("import('x');\nimport.meta;").unwrap_or_else(|e| panic!("{}", e));
        let tree = output.ast.to_json(output.root);
        assert_eq!(tree["statements"][0]["expression"]["type"], "ImportCall");
        assert_eq!(tree["statements"][1]["expression"]["type"], "MetaProperty");

        let (_, message) = script_error("import.meta;");
        assert_eq!(message, "Invalid meta property");

        let (_, message) = script_error("function f() { new.foo; }");
        assert_eq!(message, "Invalid meta property");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SPANS AND COMMENTS
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_comments_recorded_once_in_order() {
        let output = script("// first\na /* second */ + b;\n/* third */");
        let values: Vec<&str> = output
            .comments
            .iter()
            .filter_map(|&id| match output.ast.get(id) {
                NodeKind::Comment { value } => Some(value.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![" first", " second ", " third "]);
    }

    #[test]
    fn test_node_spans() {
        let output = script("  foo(bar);");
        let statement = match output.ast.get(output.root) {
            NodeKind::Script { statements } => statements[0],
            _ => panic!("expected script"),
        };
        let span = output.ast.span(statement);
        assert_eq!((span.start, span.end), (2, 11));
        assert_eq!(output.ast.kind(statement), Kind::ExpressionStatement);
    }

    #[test]
    fn test_error_span_points_at_token() {
        let error = parse_script("a = ;").err().map(|e| e.span.start);
        assert_eq!(error, Some(4));
    }
}
