use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relplot::functions::interval::*;
use relplot::functions::numeric::{NEGATIVE_INFINITY, PI, POSITIVE_INFINITY};

mod interval_tests {
  use super::*;

  mod get_interval {
    use super::*;

    #[test]
    fn after_on_keyword() {
      assert_eq!(get_interval("y=2x+5 on (2,5)"), "(2,5)");
      assert_eq!(get_interval("y=2x+5 on (-2,5)"), "(-2,5)");
      assert_eq!(get_interval("y=2x+5 on (1.8,-2.5)"), "(1.8,-2.5)");
      assert_eq!(get_interval("y=(x-2)^2 on (-1,5)"), "(-1,5)");
    }

    #[test]
    fn expression_endpoints() {
      assert_eq!(get_interval("y=2x+5 on [2+4,-pi/2)"), "[2+4,-pi/2)");
      assert_eq!(get_interval("y=2x+5 on [2,f(2)]"), "[2,f(2)]");
      assert_eq!(get_interval("y=2x+5 on (-oo,a+b)"), "(-oo,a+b)");
    }

    #[test]
    fn polar_and_parametric() {
      assert_eq!(get_interval("r=sin(2t) on (0,2pi)"), "(0,2pi)");
      assert_eq!(get_interval("<t,2t> on (-1,4]"), "(-1,4]");
    }

    #[test]
    fn hole() {
      assert_eq!(get_interval("y=4x on x!=4"), "x!=4");
      assert_eq!(get_interval("y = 1/(x-1) x != 1"), "x != 1");
    }

    #[test]
    fn without_keyword() {
      assert_eq!(get_interval("y=2x+5 (-2,5]"), "(-2,5]");
    }

    #[test]
    fn none() {
      assert_eq!(get_interval(""), "");
      assert_eq!(get_interval("y=2x"), "");
      assert_eq!(get_interval("y = (x+1)"), "");
    }

    #[test]
    fn call_arguments_are_not_intervals() {
      assert_eq!(get_interval("y = max(x,2)"), "");
      assert_eq!(get_interval("y = log(x,2)"), "");
      assert_eq!(get_interval("y = max(x,2) [0,1]"), "[0,1]");
    }
  }

  mod remove_interval {
    use super::*;

    #[test]
    fn strips_restriction_and_keyword() {
      assert_eq!(remove_interval("y=2x+5 on (2,5)"), "y=2x+5");
      assert_eq!(remove_interval("y=2x+5 on(-2,5)"), "y=2x+5");
      assert_eq!(remove_interval("y=2x+5on (1.8,-2.5)"), "y=2x+5");
      assert_eq!(remove_interval("y=2x+5on[2+4,-pi/2)"), "y=2x+5");
      assert_eq!(remove_interval("y=2x+5 on [2,f(2)]"), "y=2x+5");
      assert_eq!(remove_interval("y=2x+5 on (-oo,a+b)"), "y=2x+5");
      assert_eq!(remove_interval("r=sin(2t)on(0,2pi)"), "r=sin(2t)");
      assert_eq!(remove_interval("<t,2t>on (-1,4]"), "<t,2t>");
    }

    #[test]
    fn leaves_unrestricted_relations_alone() {
      assert_eq!(remove_interval(""), "");
      assert_eq!(remove_interval("y=2x"), "y=2x");
      assert_eq!(remove_interval("y = max(x,2)"), "y = max(x,2)");
    }

    #[test]
    fn words_ending_in_on_are_kept() {
      // "on" must stand alone to be a keyword
      assert_eq!(get_interval("y=lon(2,3)"), "");
    }

    #[test]
    fn empty_interval_iff_unchanged() {
      let relations = [
        "y=2x",
        "y=2x+5 (-2,5]",
        "y=4x on x!=4",
        "r=sin(2t)",
        "<t,2t> on (-1,4]",
        "x^2+y^2=4",
        "y = max(x,2)",
      ];
      for r in relations {
        assert_eq!(
          get_interval(r).is_empty(),
          remove_interval(r) == r,
          "relation {r}"
        );
      }
    }

    #[test]
    fn splice_reconstructs_relation() {
      for r in ["y=2x+5 (-2,5]", "y=4x x!=4", "<t,2t> [0,1)"] {
        let (expression, interval) = splice_interval(r);
        assert_eq!(format!("{expression} {interval}"), r);
      }
    }
  }

  mod parse_restriction {
    use super::*;

    #[test]
    fn half_open_interval() {
      let (expression, restriction) = parse_restriction("y=2x+5 (-2,5]");
      assert_eq!(expression, "y=2x+5");
      assert_eq!(
        restriction,
        Restriction::Interval(Interval::new(-2.0, 5.0, false, true))
      );
      assert_eq!(get_lower_endpoint("(-2,5]"), -2.0);
      assert_eq!(get_upper_endpoint("(-2,5]"), 5.0);
      assert!(lower_bound_open("(-2,5]"));
      assert!(upper_bound_closed("(-2,5]"));
      assert!(!lower_bound_closed("(-2,5]"));
      assert!(!upper_bound_open("(-2,5]"));
    }

    #[test]
    fn hole() {
      let (expression, restriction) = parse_restriction("y = 4x on x != 4");
      assert_eq!(expression, "y = 4x");
      assert_eq!(
        restriction,
        Restriction::Hole {
          variable: 'x',
          value: 4.0
        }
      );
      assert!(!restriction.admits(4.0));
      assert!(restriction.admits(3.9));
    }

    #[test]
    fn unrestricted() {
      let (expression, restriction) = parse_restriction("y = x^2");
      assert_eq!(expression, "y = x^2");
      assert_eq!(restriction, Restriction::Unrestricted);
      assert_eq!(restriction.interval(), Interval::UNIVERSAL);
    }
  }

  mod endpoints {
    use super::*;

    #[test]
    fn evaluates_expressions() {
      assert_eq!(get_lower_endpoint("[2+4,-pi/2)"), 6.0);
      assert_relative_eq!(get_upper_endpoint("[2+4,-pi/2)"), -PI / 2.0);
      assert_relative_eq!(get_upper_endpoint("[0, 2pi)"), 2.0 * PI);
    }

    #[test]
    fn infinity_sentinels() {
      assert_eq!(get_lower_endpoint("(-oo, 3)"), NEGATIVE_INFINITY);
      assert_eq!(get_upper_endpoint("(0, oo)"), POSITIVE_INFINITY);
      assert_eq!(get_upper_endpoint("(0, +Inf)"), POSITIVE_INFINITY);
      // the side decides the sign, not the text
      assert_eq!(get_lower_endpoint("(oo, 3)"), NEGATIVE_INFINITY);
    }

    #[test]
    fn no_restriction_is_universal() {
      assert_eq!(get_endpoints(""), (NEGATIVE_INFINITY, POSITIVE_INFINITY));
      assert_eq!(Interval::parse(""), Interval::UNIVERSAL);
    }

    #[test]
    fn unevaluable_side_is_nan() {
      assert!(get_upper_endpoint("(-oo,a+b)").is_nan());
      assert!(Interval::parse("(-oo,a+b)").is_empty());
    }

    #[test]
    fn hole_value() {
      assert_eq!(get_hole_value("x != 5"), 5.0);
      assert_eq!(get_hole_value("x!=-1"), -1.0);
      assert_relative_eq!(get_hole_value("t != pi/2"), PI / 2.0);
      assert!(get_hole_value("(2,5)").is_nan());
    }
  }

  mod predicates {
    use super::*;

    #[test]
    fn is_interval_table() {
      assert!(is_interval("(2,5)"));
      assert!(is_interval("(2,5]"));
      assert!(is_interval("[2,5]"));
      assert!(is_interval("(-2,3]"));
      assert!(!is_interval("y=2x+5 (-2,3)"));
      assert!(!is_interval("y=sin(x) (-1,pi)"));
      assert!(is_interval("  (f(a),2a^2-b]"));
      assert!(!is_interval("(2,5,7)"));
      assert!(!is_interval("x != 2"));
    }

    #[test]
    fn is_point_table() {
      assert!(is_point("(2,5)"));
      assert!(!is_point("(2,5]"));
      assert!(!is_point("[2,5)"));
      assert!(is_point("[2,5]"));
      assert!(!is_point("(-2,3]"));
      assert!(!is_point("y=2x+5 on (-2,3)"));
      assert!(!is_point("(a,oo]"));
      assert!(!is_point("(f(a),2a^2-b]"));
    }

    #[test]
    fn point_conventions() {
      assert!(is_closed_point("(2,5)"));
      assert!(!is_open_point("(2,5)"));
      assert!(is_open_point("[2,5]"));
      assert!(!is_closed_point("[2,5]"));
      assert!(!is_closed_point("(-oo,5)"));
    }

    #[test]
    fn asymptotes() {
      assert!(is_asymptote("x != 2"));
      assert!(is_asymptote("y = 1/x on x!=0"));
      assert!(!is_asymptote("y = 1/x"));
      assert!(!is_asymptote("y = x (0,1)"));
    }

    #[test]
    fn bound_shapes_need_an_interval() {
      assert!(!lower_bound_open("y = (x+1)"));
      assert!(!upper_bound_closed("[x]"));
      assert!(lower_bound_closed("[0, 1)"));
      assert!(upper_bound_open("[0, 1)"));
    }
  }

  mod interval_values {
    use super::*;

    #[test]
    fn contains_honours_each_side() {
      let i = Interval::parse("(2,5]");
      assert!(!i.contains(2.0));
      assert!(i.contains(2.0001));
      assert!(i.contains(5.0));
      assert!(!i.contains(5.0001));
    }

    #[test]
    fn inverted_and_degenerate_intervals_are_empty() {
      let inverted = Interval::parse("(5,2)");
      assert_eq!((inverted.lower, inverted.upper), (5.0, 2.0));
      assert!(inverted.is_empty());
      assert!(Interval::parse("(3,3)").is_empty());
      assert!(!Interval::parse("[3,3]").is_empty());
      assert!(!Interval::UNIVERSAL.is_empty());
    }

    #[test]
    fn display() {
      assert_eq!(Interval::parse("(-oo, 2]").to_string(), "(-oo,2]");
      assert_eq!(Interval::parse("[0,1)").to_string(), "[0,1)");
    }
  }

  mod is_between {
    use super::*;

    #[test]
    fn table() {
      assert!(is_between(2.0, 0.0, 10.0, false));
      assert!(!is_between(-4.0, 0.0, 10.0, false));
      assert!(!is_between(25.0, 0.0, 10.0, false));
      assert!(!is_between(10.0, 0.0, 10.0, false));
      assert!(is_between(10.0, 0.0, 10.0, true));
      assert!(!is_between(2.0, 10.0, 0.0, false));
      assert!(is_between(-8.0, -25.0, -5.0, false));
    }

    #[test]
    fn matches_comparisons() {
      let mut rng = StdRng::seed_from_u64(7);
      for _ in 0..2000 {
        let x: f64 = rng.gen_range(-20.0..20.0);
        let lower: f64 = rng.gen_range(-20.0..20.0);
        let upper: f64 = rng.gen_range(-20.0..20.0);
        assert_eq!(is_between(x, lower, upper, false), lower < x && x < upper);
        assert_eq!(
          is_between(x, lower, upper, true),
          lower <= x && x <= upper
        );
      }
    }

    #[test]
    fn inverted_range_is_never_between() {
      let mut rng = StdRng::seed_from_u64(11);
      for _ in 0..2000 {
        let upper: f64 = rng.gen_range(-20.0..20.0);
        let lower = upper + rng.gen_range(0.001..20.0);
        let x: f64 = rng.gen_range(-40.0..40.0);
        assert!(!is_between(x, lower, upper, false));
        assert!(!is_between(x, lower, upper, true));
      }
    }
  }
}
