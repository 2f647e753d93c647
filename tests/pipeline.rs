mod common;

use inkwell::context::Context;

/// 1. Hello world: a single `extern` declaration plus a `main` that calls it.
#[test]
fn hello_world_lowers_to_a_call_into_printf() {
    let source = r#"
        extern print(msg:string) -> void;

        func main() -> int {
            print("hello, world");
            return 0;
        }
    "#;
    let context = Context::create();
    let ir = common::lower_one(&context, "hello", source).expect("hello world should lower cleanly");
    assert!(ir.contains("define"), "expected at least one function definition in the IR:\n{ir}");
    assert!(ir.contains("main"), "expected a 'main' symbol in the IR:\n{ir}");
}

/// 2. Operator precedence: `1 + 2 * 3` must bind as `1 + (2 * 3)`, not `(1 + 2) * 3`.
#[test]
fn operator_precedence_binds_multiplication_tighter_than_addition() {
    let source = r#"
        func main() -> int {
            var x:int = 1 + 2 * 3;
            return x;
        }
    "#;
    let stmts = common::bind_one(source).expect("well-typed arithmetic should bind");
    assert_eq!(stmts.len(), 1);
}

/// 3. if/else: both branches assign the same variable, so the merge block must see a coherent
/// value regardless of which branch ran - exercised by binding successfully with no fallthrough
/// type mismatch, and by lowering producing exactly one merge block per `if`.
#[test]
fn if_else_branches_merge_to_a_single_join_point() {
    let source = r#"
        func classify(n:int) -> int {
            var result:int = 0;
            if (n) {
                result = 1;
            } else {
                result = 2;
            }
            return result;
        }
    "#;
    let context = Context::create();
    let ir = common::lower_one(&context, "ifelse", source).expect("if/else should lower");
    let merge_blocks = ir.matches("merge").count();
    assert_eq!(merge_blocks, 1, "expected exactly one merge block for a single if/else:\n{ir}");
}

/// 4. while with a loop-carried variable: the phi table must be primed before the loop body
/// lowers and restored afterwards, so nested loops over the same variable name don't collide.
#[test]
fn while_loop_carries_a_phi_node_for_its_mutated_variable() {
    let source = r#"
        func sum_to(n:int) -> int {
            var total:int = 0;
            var i:int = n;
            while (i) {
                total = total + i;
                i = i - 1;
            }
            return total;
        }
    "#;
    let context = Context::create();
    let ir = common::lower_one(&context, "whileloop", source).expect("while loop should lower");
    assert!(ir.contains("phi"), "expected a phi node for the loop-carried variable:\n{ir}");
}

#[test]
fn nested_while_loops_over_distinct_variables_do_not_collide() {
    let source = r#"
        func nested(n:int) -> int {
            var total:int = 0;
            var i:int = n;
            while (i) {
                var j:int = i;
                while (j) {
                    total = total + j;
                    j = j - 1;
                }
                i = i - 1;
            }
            return total;
        }
    "#;
    let context = Context::create();
    common::lower_one(&context, "nestedwhile", source)
        .expect("nested while loops should lower without a phi-table collision");
}

/// 5. A struct with a constructor: the constructor's arity gates `StructCtor` calls, not the
/// struct's total field count.
#[test]
fn struct_with_constructor_is_checked_against_ctor_arity() {
    let source = r#"
        Point -> struct {
            x:int;
            y:int;

            func ctor(x:int, y:int) -> void {
                this->x = x;
                this->y = y;
            }

            func sum() -> int {
                return this->x + this->y;
            }
        }

        func main() -> int {
            var p:Point = new Point(1, 2);
            return p->sum();
        }
    "#;
    let context = Context::create();
    let ir = common::lower_one(&context, "structctor", source)
        .expect("struct construction and member call should lower");
    assert!(ir.contains("Point"), "expected a Point struct type in the IR:\n{ir}");
}

#[test]
fn struct_ctor_call_with_wrong_arity_is_rejected() {
    let source = r#"
        Point -> struct {
            x:int;
            y:int;

            func ctor(x:int, y:int) -> void {
                this->x = x;
                this->y = y;
            }
        }

        func main() -> int {
            var p:Point = new Point(1);
            return 0;
        }
    "#;
    let err = common::bind_one(source).expect_err("one argument against a two-argument ctor should be rejected");
    assert!(matches!(err, occ::errors::CompileError::Arity { .. }));
}

#[test]
fn struct_with_no_ctor_accepts_zero_arg_construction() {
    let source = r#"
        Empty -> struct {
            tag:int;
        }

        func main() -> int {
            var e:Empty = new Empty();
            return 0;
        }
    "#;
    common::bind_one(source).expect("a struct with no declared ctor should accept a zero-arg construction");
}

/// 6. Cross-file forward reference: a file calling a function declared in a later file, as the
/// build driver would feed them to the binder after merging both summaries.
#[test]
fn cross_file_forward_reference_resolves_through_the_merged_global_table() {
    let caller = r#"
        func main() -> int {
            return helper(41);
        }
    "#;
    let callee = r#"
        func helper(n:int) -> int {
            return n + 1;
        }
    "#;
    common::bind_many(&[caller, callee]).expect("a forward reference to a function declared in a sibling file should resolve");
}

#[test]
fn cross_file_reference_to_an_undeclared_function_is_rejected() {
    let caller = r#"
        func main() -> int {
            return missing(1);
        }
    "#;
    let err = common::bind_many(&[caller]).expect_err("a call to a function that exists nowhere should fail resolution");
    assert!(matches!(err, occ::errors::CompileError::Resolution { .. }));
}

#[test]
fn mismatched_var_decl_initializer_type_is_a_type_error() {
    let source = r#"
        func main() -> int {
            var x:int = "not a number";
            return 0;
        }
    "#;
    let err = common::bind_one(source).expect_err("assigning a string literal to an int-typed variable should fail");
    assert!(matches!(err, occ::errors::CompileError::Type { .. }));
}

#[test]
fn return_type_mismatch_is_a_type_error() {
    let source = r#"
        func answer() -> int {
            return "forty-two";
        }
    "#;
    let err = common::bind_one(source).expect_err("returning a string from an int-returning function should fail");
    assert!(matches!(err, occ::errors::CompileError::Type { .. }));
}

#[test]
fn if_and_while_bodies_leak_declarations_into_the_enclosing_scope() {
    let source = r#"
        func main() -> int {
            if (1) {
                var leaked:int = 5;
            }
            return leaked;
        }
    "#;
    common::bind_one(source).expect("a variable declared inside an if-body should remain visible after it, by design");
}

#[test]
fn redeclaring_a_name_in_the_same_scope_is_rejected() {
    let source = r#"
        func main() -> int {
            var x:int = 1;
            var x:int = 2;
            return x;
        }
    "#;
    let err = common::bind_one(source).expect_err("redeclaring a name already bound in the innermost scope should fail");
    assert!(matches!(err, occ::errors::CompileError::Resolution { .. }));
}

#[test]
fn undefined_name_reference_is_rejected() {
    let source = r#"
        func main() -> int {
            return undeclared_name;
        }
    "#;
    let err = common::bind_one(source).expect_err("referencing a name that was never declared should fail");
    assert!(matches!(err, occ::errors::CompileError::Resolution { .. }));
}

#[test]
fn member_function_call_gets_an_implicit_this_argument() {
    let source = r#"
        Counter -> struct {
            value:int;

            func ctor(start:int) -> void {
                this->value = start;
            }

            func get() -> int {
                return this->value;
            }
        }

        func main() -> int {
            var c:Counter = new Counter(10);
            return c->get();
        }
    "#;
    common::bind_one(source).expect("calling a zero-declared-arg member function should succeed once `this` is implicit");
}

#[test]
fn comparison_operators_yield_a_type_usable_where_a_bool_is_declared() {
    let source = r#"
        func main() -> int {
            var a:int = 1;
            var b:int = 2;
            var cmp:bool = a < b;
            if (cmp) {
                return 1;
            }
            return 0;
        }
    "#;
    common::bind_one(source).expect("a bool-typed variable initialized from a comparison should type-check");
}

#[test]
fn postfix_increment_parses_but_is_rejected_at_lowering() {
    let source = r#"
        func main() -> int {
            var x:int = 0;
            x++;
            return x;
        }
    "#;
    let context = Context::create();
    let err = common::lower_one(&context, "postfix", source)
        .expect_err("postfix increment should parse and bind but fail at the lowering stage");
    assert!(matches!(err, occ::errors::CompileError::Lowering { .. }));
}

#[test]
fn const_decl_parses_and_binds_but_is_rejected_at_lowering() {
    let source = r#"
        func main() -> int {
            const x:int = 5;
            return x;
        }
    "#;
    let context = Context::create();
    let err = common::lower_one(&context, "constdecl", source)
        .expect_err("a const declaration should parse and bind but fail at the lowering stage");
    assert!(matches!(err, occ::errors::CompileError::Lowering { .. }));
}

#[test]
fn malformed_source_is_a_syntax_error_not_a_panic() {
    let source = r#"
        func main() -> int {
            var x:int = ;
            return x;
        }
    "#;
    let err = common::bind_one(source).expect_err("a missing initializer expression should be a clean syntax error");
    assert!(matches!(err, occ::errors::CompileError::Syntax { .. }));
}
