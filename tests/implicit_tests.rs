use relplot::{
  Domain, ImplicitTracer, RelationError, Trace, TraceOptions, TraceStats,
  compile, trace_implicit,
};

mod implicit_tests {
  use super::*;

  fn circle(r: f64) -> impl Fn(f64, f64) -> f64 {
    move |x, y| x * x + y * y - r * r
  }

  mod circles {
    use super::*;

    #[test]
    fn unit_circle_points_lie_on_the_curve() {
      let f = circle(1.0);
      let lines =
        trace_implicit(&f, Domain::new(-2.0, 2.0, -2.0, 2.0), (360, 360))
          .unwrap();
      assert!(!lines.is_empty());
      for line in &lines {
        for &(x, y) in line {
          assert!(f(x, y).abs() < 0.1, "f({x}, {y}) = {}", f(x, y));
        }
      }
    }

    #[test]
    fn radius_two_within_tolerance() {
      let lines = trace_implicit(
        circle(2.0),
        Domain::new(-3.0, 3.0, -3.0, 3.0),
        (200, 200),
      )
      .unwrap();
      let points: Vec<(f64, f64)> = lines.into_iter().flatten().collect();
      assert!(points.len() > 20);
      for (x, y) in points {
        assert!((x.hypot(y) - 2.0).abs() < 0.05);
      }
    }

    #[test]
    fn closed_curve_is_one_closed_loop() {
      let lines = trace_implicit(
        circle(2.0),
        Domain::new(-3.0, 3.0, -3.0, 3.0),
        (200, 200),
      )
      .unwrap();
      assert_eq!(lines.len(), 1);
      let line = &lines[0];
      assert_eq!(line.first(), line.last());
    }

    #[test]
    fn no_degenerate_polylines() {
      let f = |x: f64, y: f64| (x * 3.0).sin() - y;
      let lines =
        trace_implicit(f, Domain::new(-5.0, 5.0, -2.0, 2.0), (400, 160))
          .unwrap();
      assert!(!lines.is_empty());
      assert!(lines.iter().all(|line| line.len() > 1));
    }
  }

  mod shapes {
    use super::*;

    #[test]
    fn crossing_lines() {
      let f = |x: f64, y: f64| x * x - y * y;
      let lines =
        trace_implicit(f, Domain::new(-1.0, 1.0, -1.0, 1.0), (360, 360))
          .unwrap();
      assert!(!lines.is_empty());
      for &(x, y) in lines.iter().flatten() {
        assert!((x.abs() - y.abs()).abs() < 0.1, "({x}, {y})");
      }
    }

    #[test]
    fn undefined_regions_are_skipped() {
      let f = |x: f64, y: f64| x.sqrt() - y;
      let lines =
        trace_implicit(f, Domain::new(-1.0, 1.0, -1.0, 1.0), (360, 360))
          .unwrap();
      assert!(!lines.is_empty());
      assert!(lines.iter().flatten().all(|&(x, _)| x >= 0.0));
    }

    #[test]
    fn no_zero_set_gives_nothing() {
      let lines = trace_implicit(
        |x: f64, y: f64| x * x + y * y + 1.0,
        Domain::new(-1.0, 1.0, -1.0, 1.0),
        (100, 100),
      )
      .unwrap();
      assert!(lines.is_empty());
    }

    #[test]
    fn compiled_equation() {
      let c = compile("x^2 + x*y^3 - 4").unwrap();
      let lines = trace_implicit(
        |x, y| c.eval_or_nan(&[("x", x), ("y", y)]),
        Domain::new(-10.0, 10.0, -10.0, 10.0),
        (360, 360),
      )
      .unwrap();
      // the curve crosses the x axis at x = 2 and x = -2
      let near = |px: f64| {
        lines
          .iter()
          .flatten()
          .any(|&(x, y)| (x - px).abs() < 0.3 && y.abs() < 0.3)
      };
      assert!(near(2.0));
      assert!(near(-2.0));
    }
  }

  mod tracer {
    use super::*;

    #[test]
    fn grid_follows_resolution() {
      let mut tracer = ImplicitTracer::new();
      let domain = Domain::new(-1.0, 1.0, -1.0, 1.0);
      let options = TraceOptions {
        resolution: (160, 80),
        fast: false,
      };
      tracer.trace(circle(0.5), &domain, &options).unwrap();
      assert_eq!(tracer.grid_size(), (20, 10));
      assert!(tracer.cell(19, 9).is_some());
      assert!(tracer.cell(20, 0).is_none());
    }

    #[test]
    fn fast_mode_uses_a_coarse_grid() {
      let mut tracer = ImplicitTracer::new();
      let options = TraceOptions {
        fast: true,
        ..TraceOptions::default()
      };
      let trace = tracer
        .trace(circle(1.0), &Domain::new(-2.0, 2.0, -2.0, 2.0), &options)
        .unwrap();
      assert_eq!(tracer.grid_size(), (8, 8));
      assert!(!trace.is_empty());
    }

    #[test]
    fn storage_is_reused_until_the_grid_changes() {
      let mut tracer = ImplicitTracer::new();
      let domain = Domain::new(-2.0, 2.0, -2.0, 2.0);
      let options = TraceOptions::default();
      tracer.trace(circle(1.0), &domain, &options).unwrap();
      tracer.trace(circle(1.5), &domain, &options).unwrap();
      assert_eq!(tracer.reallocations(), 1);

      let wider = TraceOptions {
        resolution: (720, 360),
        ..options
      };
      tracer.trace(circle(1.0), &domain, &wider).unwrap();
      assert_eq!(tracer.reallocations(), 2);
    }

    #[test]
    fn cells_record_corner_signs() {
      let mut tracer = ImplicitTracer::new();
      let options = TraceOptions {
        resolution: (16, 16),
        fast: false,
      };
      // 2x2 grid; the line x = 0.5 runs through the right column
      tracer
        .trace(|x, _| x - 0.5, &Domain::new(-2.0, 2.0, -2.0, 2.0), &options)
        .unwrap();
      let left = tracer.cell(0, 0).unwrap();
      assert!(left.status.empty);
      assert_eq!(left.status.negative, 4);
      let right = tracer.cell(1, 0).unwrap();
      assert!(!right.status.empty);
      assert!(right.status.valid);
      assert_eq!((right.status.positive, right.status.negative), (2, 2));
      assert_eq!(right.code, 0b0110);
    }

    #[test]
    fn invalid_domain() {
      let mut tracer = ImplicitTracer::new();
      for domain in [
        Domain::new(1.0, -1.0, -1.0, 1.0),
        Domain::new(-1.0, 1.0, 0.0, 0.0),
        Domain::new(f64::NEG_INFINITY, 1.0, -1.0, 1.0),
      ] {
        let result = tracer.trace(circle(1.0), &domain, &TraceOptions::default());
        assert!(matches!(result, Err(RelationError::InvalidBounds(_))));
      }
    }

    #[test]
    fn flat_points_split_into_polylines() {
      let mut tracer = ImplicitTracer::new();
      let f = |x: f64, y: f64| (x * x + y * y - 1.0) * (x * x + y * y - 9.0);
      let trace: Trace = tracer
        .trace(f, &Domain::new(-4.0, 4.0, -4.0, 4.0), &TraceOptions::default())
        .unwrap();
      let lines = trace.polylines();
      assert_eq!(lines.len(), 2);
      let starts = trace.points.iter().filter(|p| p.starts_subpath).count();
      assert_eq!(starts, lines.len());
      assert_eq!(
        lines.iter().map(Vec::len).sum::<usize>(),
        trace.points.len()
      );
    }

    #[test]
    fn many_open_chains_are_flushed() {
      // about 76 vertical zero lines, all open while the rows are scanned
      let f = |x: f64, _: f64| (40.0 * x).sin();
      let mut tracer = ImplicitTracer::new();
      let options = TraceOptions {
        resolution: (2880, 80),
        fast: false,
      };
      let trace = tracer
        .trace(f, &Domain::new(-2.9, 3.1, -1.0, 1.0), &options)
        .unwrap();
      assert!(trace.stats.flushed > 0);
      assert!(trace.polylines().len() > 64);
      for p in &trace.points {
        let value = f(p.x, p.y);
        assert!(value.abs() < 0.05, "f({}, {}) = {value}", p.x, p.y);
      }
    }

    #[test]
    fn persistent_saddle_is_decided_at_the_depth_limit() {
      // the crossing never lands on a subdivision line, so every level
      // keeps a saddle until the centre sign settles it
      let f = |x: f64, y: f64| (x - 0.3) * (y - 0.1);
      let mut tracer = ImplicitTracer::new();
      let options = TraceOptions {
        resolution: (8, 8),
        fast: false,
      };
      let trace = tracer
        .trace(f, &Domain::new(-1.0, 1.0, -1.0, 1.0), &options)
        .unwrap();
      assert_eq!(tracer.grid_size(), (1, 1));
      assert_eq!(
        trace.stats,
        TraceStats {
          revisited: 1,
          decided: 1,
          flushed: 0,
        }
      );
      for p in &trace.points {
        assert!(f(p.x, p.y).abs() < 1e-9, "({}, {})", p.x, p.y);
      }
      assert!(
        trace
          .points
          .iter()
          .any(|p| (p.x - 0.3).abs() < 0.125 && (p.y - 0.1).abs() < 0.125)
      );
    }
  }
}
