use approx::assert_relative_eq;
use relplot::syntax::{Expr, Relation, parse_expression, parse_relation};
use relplot::{RelationError, compile, evaluate_relation};

mod expression_tests {
  use super::*;

  fn eval(source: &str, x: f64) -> f64 {
    compile(source)
      .unwrap_or_else(|err| panic!("{source:?} does not compile: {err}"))
      .eval1("x", x)
  }

  fn constant(source: &str) -> f64 {
    eval(source, 0.0)
  }

  mod arithmetic {
    use super::*;

    #[test]
    fn linear() {
      assert_eq!(eval("2x+5", 3.0), 11.0);
      assert_eq!(eval("2 * x - 5", -1.0), -7.0);
      assert_eq!(eval("x/4", 2.0), 0.5);
    }

    #[test]
    fn implicit_products() {
      assert_eq!(eval("3(x+1)", 1.0), 6.0);
      assert_eq!(eval("x(x+1)", 2.0), 6.0);
      assert_eq!(eval("(x+1)(x-1)", 3.0), 8.0);
      assert_relative_eq!(constant("2pi"), 2.0 * std::f64::consts::PI);
      assert_relative_eq!(eval("sin(x)cos(x)", 0.3), 0.3f64.sin() * 0.3f64.cos());
    }

    #[test]
    fn powers_are_right_associative() {
      assert_eq!(constant("2^3^2"), 512.0);
      assert_eq!(constant("-2^2"), -4.0);
      assert_eq!(eval("x^-2", 2.0), 0.25);
    }

    #[test]
    fn factorials() {
      assert_eq!(constant("5!"), 120.0);
      assert_eq!(constant("0!"), 1.0);
      assert_relative_eq!(
        constant("factorial(0.5)"),
        0.886_226_925_452_758,
        epsilon = 1e-12
      );
      assert!(constant("(-1)!").is_nan());
    }

    #[test]
    fn scientific_notation() {
      assert_eq!(constant("1e3 + 1"), 1001.0);
      assert_eq!(constant("2.5e-1"), 0.25);
    }
  }

  mod functions {
    use super::*;

    #[test]
    fn trigonometry() {
      assert_relative_eq!(constant("sin(pi/2)"), 1.0);
      assert_relative_eq!(constant("cos(0)"), 1.0);
      assert_relative_eq!(constant("sec(0)"), 1.0);
      assert_relative_eq!(constant("atan2(1, 1)"), std::f64::consts::FRAC_PI_4);
    }

    #[test]
    fn logarithms() {
      assert_relative_eq!(constant("ln(e)"), 1.0);
      assert_relative_eq!(constant("log(e^2)"), 2.0);
      assert_relative_eq!(constant("log(100, 10)"), 2.0);
      assert_relative_eq!(constant("log10(1000)"), 3.0);
    }

    #[test]
    fn statistics_and_integers() {
      assert_eq!(constant("max(1, 5, 3)"), 5.0);
      assert_eq!(constant("min(1, 5, 3)"), 1.0);
      assert_eq!(constant("median(4, 1, 3, 2)"), 2.5);
      assert_eq!(constant("gcd(12, 18)"), 6.0);
      assert_eq!(constant("lcm(4, 6)"), 12.0);
      assert_eq!(constant("combinations(5, 2)"), 10.0);
      assert_relative_eq!(constant("nthroot(-8, 3)"), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn integer_functions_saturate_to_nan_or_infinity() {
      assert!(constant("lcm(1000000000000000, 1000000000000001)").is_nan());
      assert!(constant("gcd(-1e19, 2)").is_nan());
      assert_eq!(constant("gcd(-9007199254740992, 2)"), 2.0);
      assert!(constant("combinations(1e15, 5e14)").is_infinite());
      assert_eq!(constant("combinations(2000, 3)"), 1_331_334_000.0);
      assert!(constant("factorial(1e20)").is_infinite());
      assert!(constant("200!").is_infinite());
    }

    #[test]
    fn names_are_case_insensitive() {
      assert_relative_eq!(constant("SIN(pi/2)"), 1.0);
    }

    #[test]
    fn non_real_results_are_nan() {
      assert!(constant("sqrt(-1)").is_nan());
      assert!(constant("ln(-1)").is_nan());
      assert!(constant("i").is_nan());
    }
  }

  mod errors {
    use super::*;

    #[test]
    fn empty_input() {
      assert!(matches!(compile(""), Err(RelationError::EmptyInput)));
      assert!(matches!(compile("   "), Err(RelationError::EmptyInput)));
    }

    #[test]
    fn parse_errors() {
      assert!(matches!(compile("2x +"), Err(RelationError::ParseError(_))));
      assert!(matches!(compile("(x"), Err(RelationError::ParseError(_))));
    }

    #[test]
    fn unbound_variable() {
      let c = compile("2q").unwrap();
      assert!(matches!(
        c.eval(&[("x", 1.0)]),
        Err(RelationError::UnboundVariable(name)) if name == "q"
      ));
      assert!(c.eval_or_nan(&[]).is_nan());
    }

    #[test]
    fn unknown_function() {
      let c = compile("foo(2)").unwrap();
      assert!(matches!(
        c.eval(&[]),
        Err(RelationError::UnknownFunction(name)) if name == "foo"
      ));
    }
  }

  mod syntax {
    use super::*;

    #[test]
    fn display_is_explicit() {
      assert_eq!(parse_expression("2x+5").unwrap().to_string(), "2*x+5");
      assert_eq!(parse_expression("-x^2").unwrap().to_string(), "-x^2");
      assert_eq!(parse_expression("(a+b)c").unwrap().to_string(), "(a+b)*c");
    }

    #[test]
    fn relation_forms() {
      assert!(matches!(
        parse_relation("y = 2x").unwrap(),
        Relation::Assignment { name, .. } if name == "y"
      ));
      assert!(matches!(
        parse_relation("f(x) = x^2").unwrap(),
        Relation::FunctionAssignment { name, params, .. }
          if name == "f" && params == ["x"]
      ));
      assert!(matches!(
        parse_relation("x^2 + y^2 = 4").unwrap(),
        Relation::Equation { .. }
      ));
      assert!(matches!(
        parse_relation("<cos(t), sin(t)>").unwrap(),
        Relation::Parametric { .. }
      ));
      assert!(matches!(
        parse_relation("2x + 1").unwrap(),
        Relation::Expression(_)
      ));
    }

    #[test]
    fn compiled_keeps_trimmed_source() {
      let c = compile("  x^2 + 1 ").unwrap();
      assert_eq!(c.source(), "x^2 + 1");
      assert_eq!(c.expr().to_string(), "x^2+1");
    }

    #[test]
    fn multi_letter_identifiers() {
      assert_eq!(
        parse_expression("xy").unwrap(),
        Expr::Identifier("xy".to_string())
      );
    }
  }

  mod evaluate_relation {
    use super::*;

    #[test]
    fn piecewise_picks_containing_piece() {
      let f = "{x^2 (-oo,0); 2x [0,oo)}";
      assert_eq!(evaluate_relation(f, -3.0, "x"), 9.0);
      assert_eq!(evaluate_relation(f, 0.0, "x"), 0.0);
      assert_eq!(evaluate_relation(f, 3.0, "x"), 6.0);
    }

    #[test]
    fn outside_every_piece_is_nan() {
      let f = "x (0,1); x^2 (2,3)";
      assert!(evaluate_relation(f, 1.5, "x").is_nan());
      assert_eq!(evaluate_relation(f, 2.5, "x"), 6.25);
    }

    #[test]
    fn holes_are_excluded() {
      assert!(evaluate_relation("y = 4x on x != 4", 4.0, "x").is_nan());
      assert_eq!(evaluate_relation("y = 4x on x != 4", 1.0, "x"), 4.0);

      let f = "{x != 2; y = x/(x-2)}";
      assert!(evaluate_relation(f, 2.0, "x").is_nan());
      assert_eq!(evaluate_relation(f, 3.0, "x"), 3.0);
    }

    #[test]
    fn overflowing_integer_arguments_are_nan() {
      assert!(evaluate_relation("y = gcd(-1e19, 2)", 0.0, "x").is_nan());
      let f = "y = lcm(x, 9007199254740991)";
      assert!(evaluate_relation(f, 9e15, "x").is_nan());
    }

    #[test]
    fn points_are_ignored() {
      assert_eq!(evaluate_relation("{(1,2); y = x+1}", 3.0, "x"), 4.0);
    }

    #[test]
    fn unrestricted_pieces_use_the_first() {
      assert_eq!(evaluate_relation("y = x; y = 2x", 2.0, "x"), 2.0);
    }

    #[test]
    fn other_variables() {
      assert_eq!(evaluate_relation("f(t) = t^2", 3.0, "t"), 9.0);
      assert!(evaluate_relation("y = q x", 1.0, "x").is_nan());
    }
  }
}
