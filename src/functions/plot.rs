//! Turn relation strings into objects on a [`Surface`].
//!
//! A [`PlotObject`] owns the pieces of one relation. Plotting it again
//! updates the surface objects it already holds instead of recreating them,
//! so their identity survives viewport and data changes.

use crate::RelationError;
use crate::evaluator::{Compiled, compile};
use crate::functions::classify::{
  RelationKind, classify, convert_implicit_equation, remove_function_name,
  strip_braces,
};
use crate::functions::implicit::{self, ImplicitTracer, TraceOptions};
use crate::functions::interval::{
  Interval, Restriction, get_endpoints, get_hole_value, get_interval,
  parse_restriction, remove_interval,
};
use crate::functions::numeric::{PI, is_finite_bound};
use crate::functions::surface::{
  Axis, Bounds, CurveHandle, CurveSource, CurveStyle, ObjectId, PointHandle,
  PointStyle, SegmentHandle, Surface, SuspendGuard,
};
use crate::syntax::{Relation, parse_relation};

/// Polar curves with an unbounded interval side run this far.
const POLAR_LIMIT: f64 = 12.0 * PI;
/// Upper bound on samples for one parametric, polar or sequence curve.
const MAX_SAMPLES: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
  pub color: String,
  pub width: f64,
  pub dashed: bool,
  /// Parameter step for polar and parametric sampling.
  pub density: f64,
  /// Overrides the independent variable picked by the classifier.
  pub variable: Option<String>,
  /// Radius of point markers.
  pub size: f64,
  /// Coarse implicit tracing, for interactive dragging.
  pub fast: bool,
}

impl Default for PlotOptions {
  fn default() -> Self {
    Self {
      color: "blue".to_string(),
      width: 2.0,
      dashed: false,
      density: 0.01,
      variable: None,
      size: 2.0,
      fast: false,
    }
  }
}

impl PlotOptions {
  fn curve_style(&self) -> CurveStyle {
    CurveStyle {
      color: self.color.clone(),
      width: self.width,
      dashed: self.dashed,
      dots_only: false,
    }
  }

  fn point_style(&self, solid: bool) -> PointStyle {
    PointStyle {
      color: self.color.clone(),
      size: self.size,
      solid,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
  Curve,
  Point,
  Asymptote,
}

/// One `;`-separated piece of a relation and the surface objects drawing it.
#[derive(Debug, Clone)]
pub struct PlotPiece {
  pub kind: PieceKind,
  pub family: RelationKind,
  /// The piece with its restriction removed.
  pub relation: String,
  /// The restriction text, `""` when there is none.
  pub interval: String,
  curve: Option<CurveHandle>,
  point: Option<PointHandle>,
  lower_marker: Option<PointHandle>,
  upper_marker: Option<PointHandle>,
  hole_marker: Option<PointHandle>,
  asymptote: Option<SegmentHandle>,
  contours: Vec<CurveHandle>,
}

impl PlotPiece {
  fn new() -> Self {
    Self {
      kind: PieceKind::Curve,
      family: RelationKind::Implicit,
      relation: String::new(),
      interval: String::new(),
      curve: None,
      point: None,
      lower_marker: None,
      upper_marker: None,
      hole_marker: None,
      asymptote: None,
      contours: Vec::new(),
    }
  }

  pub fn curve(&self) -> Option<CurveHandle> {
    self.curve
  }

  pub fn point(&self) -> Option<PointHandle> {
    self.point
  }

  pub fn lower_marker(&self) -> Option<PointHandle> {
    self.lower_marker
  }

  pub fn upper_marker(&self) -> Option<PointHandle> {
    self.upper_marker
  }

  pub fn hole_marker(&self) -> Option<PointHandle> {
    self.hole_marker
  }

  pub fn asymptote(&self) -> Option<SegmentHandle> {
    self.asymptote
  }

  pub fn contours(&self) -> &[CurveHandle] {
    &self.contours
  }

  /// Every surface object this piece holds.
  pub fn object_ids(&self) -> Vec<ObjectId> {
    let points = [
      self.point,
      self.lower_marker,
      self.upper_marker,
      self.hole_marker,
    ];
    self
      .curve
      .map(ObjectId::from)
      .into_iter()
      .chain(points.into_iter().flatten().map(ObjectId::from))
      .chain(self.asymptote.map(ObjectId::from))
      .chain(self.contours.iter().map(|&c| ObjectId::from(c)))
      .collect()
  }
}

/// Everything drawn for one relation string.
#[derive(Debug, Default)]
pub struct PlotObject {
  pieces: Vec<PlotPiece>,
  active: usize,
  warnings: Vec<String>,
  tracer: ImplicitTracer,
}

impl PlotObject {
  pub fn new() -> Self {
    Self::default()
  }

  /// Pieces drawn by the last plot.
  pub fn pieces(&self) -> &[PlotPiece] {
    &self.pieces[..self.active]
  }

  /// All pieces ever allocated, including hidden leftovers from an earlier
  /// plot with more pieces.
  pub fn all_pieces(&self) -> &[PlotPiece] {
    &self.pieces
  }

  /// Pieces that failed during the last plot, one message each.
  pub fn warnings(&self) -> &[String] {
    &self.warnings
  }

  /// Draw `relation`, reusing the objects of an earlier plot.
  ///
  /// A piece that fails is recorded in [`warnings`](Self::warnings) and the
  /// others still draw. Only an unusable viewport aborts the call.
  pub fn plot<S: Surface + ?Sized>(
    &mut self,
    surface: &mut S,
    relation: &str,
    options: &PlotOptions,
  ) -> Result<(), RelationError> {
    let bounds = surface.bounds();
    bounds.validate()?;
    self.warnings.clear();

    let mut surface = SuspendGuard::new(surface);
    for id in self.pieces.iter().flat_map(PlotPiece::object_ids) {
      surface.set_visible(id, false);
    }

    let text = relation.to_lowercase();
    let parts: Vec<&str> = strip_braces(&text)
      .split(';')
      .map(str::trim)
      .filter(|p| !p.is_empty())
      .collect();

    let half_pixel = bounds.width() / surface.pixel_size().0.max(1) as f64 / 2.0;
    let gaps = Gaps {
      values: parts
        .iter()
        .filter_map(|p| match Restriction::from_text(p) {
          Restriction::Hole { variable: 'x', value } => Some(value),
          _ => None,
        })
        .collect(),
      tolerance: half_pixel,
    };

    for (index, part) in parts.iter().enumerate() {
      if index == self.pieces.len() {
        self.pieces.push(PlotPiece::new());
      }
      let piece = &mut self.pieces[index];
      let ctx = DrawContext {
        bounds,
        options,
        gaps: &gaps,
      };
      if let Err(err) =
        draw_piece(&mut *surface, piece, part, &ctx, &mut self.tracer)
      {
        log::warn!("could not plot {part:?}: {err}");
        self.warnings.push(format!("{part}: {err}"));
      }
    }
    self.active = parts.len();
    Ok(())
  }

  /// Delete every object this plot owns from the surface.
  pub fn remove<S: Surface + ?Sized>(self, surface: &mut S) {
    let mut surface = SuspendGuard::new(surface);
    for id in self.pieces.iter().flat_map(PlotPiece::object_ids) {
      surface.remove(id);
    }
  }
}

/// Plot a relation onto `surface`.
///
/// ```
/// use relplot::{PlotOptions, SvgSurface, plot};
///
/// let mut surface = SvgSurface::default();
/// let object = plot(&mut surface, "y = x^2 [-2, 2)", &PlotOptions::default())
///   .unwrap();
/// assert_eq!(object.pieces().len(), 1);
/// ```
pub fn plot<S: Surface + ?Sized>(
  surface: &mut S,
  relation: &str,
  options: &PlotOptions,
) -> Result<PlotObject, RelationError> {
  let mut object = PlotObject::new();
  object.plot(surface, relation, options)?;
  Ok(object)
}

// ─── Piece drawing ──────────────────────────────────────────────────────────

/// x values excluded by standalone hole pieces.
struct Gaps {
  values: Vec<f64>,
  tolerance: f64,
}

impl Gaps {
  fn hits(&self, x: f64) -> bool {
    self.values.iter().any(|g| (x - g).abs() <= self.tolerance)
  }
}

struct DrawContext<'a> {
  bounds: Bounds,
  options: &'a PlotOptions,
  gaps: &'a Gaps,
}

fn draw_piece<S: Surface + ?Sized>(
  surface: &mut S,
  piece: &mut PlotPiece,
  text: &str,
  ctx: &DrawContext,
  tracer: &mut ImplicitTracer,
) -> Result<(), RelationError> {
  let classification = classify(text);
  piece.family = classification.kind;
  piece.relation = remove_interval(text).to_string();
  piece.interval = get_interval(text).to_string();
  log::debug!("plotting {text:?} as {}", classification.kind);

  let variable = ctx
    .options
    .variable
    .clone()
    .or(classification.variable)
    .unwrap_or_else(|| "x".to_string());

  match classification.kind {
    RelationKind::Point { solid } => {
      piece.kind = PieceKind::Point;
      piece.relation = text.to_string();
      piece.interval.clear();
      let (x, y) = get_endpoints(text);
      if !x.is_finite() || !y.is_finite() {
        return Err(RelationError::EvaluationError(format!(
          "point {text} has no numeric coordinates"
        )));
      }
      let style = ctx.options.point_style(solid);
      place_point(surface, &mut piece.point, x, y, &style);
      Ok(())
    }
    RelationKind::Asymptote => {
      piece.kind = PieceKind::Asymptote;
      piece.relation = text.to_string();
      piece.interval.clear();
      draw_asymptote(surface, piece, text, ctx)
    }
    RelationKind::Piecewise => {
      Err(RelationError::Unplottable(format!("nested pieces in {text}")))
    }
    kind => {
      piece.kind = PieceKind::Curve;
      let (expression, restriction) = parse_restriction(text);
      let interval = restriction.interval();
      if interval.is_empty() {
        return Err(RelationError::InvalidBounds(format!(
          "empty interval {}",
          piece.interval
        )));
      }
      let domain = Restricted {
        restriction,
        interval,
      };
      match kind {
        RelationKind::FunctionOfX => {
          draw_graph(surface, piece, &expression, &variable, Axis::X, &domain, ctx)
        }
        RelationKind::FunctionOfY => {
          draw_graph(surface, piece, &expression, &variable, Axis::Y, &domain, ctx)
        }
        RelationKind::Polar => {
          draw_polar(surface, piece, &expression, &variable, &domain, ctx)
        }
        RelationKind::Parametric => {
          draw_parametric(surface, piece, &expression, &variable, &domain, ctx)
        }
        RelationKind::Sequence => {
          draw_sequence(surface, piece, &expression, &variable, &domain, ctx)
        }
        _ => draw_implicit(surface, piece, &expression, &domain, ctx, tracer),
      }
    }
  }
}

/// The parsed restriction of a curve piece.
struct Restricted {
  restriction: Restriction,
  interval: Interval,
}

fn place_point<S: Surface + ?Sized>(
  surface: &mut S,
  slot: &mut Option<PointHandle>,
  x: f64,
  y: f64,
  style: &PointStyle,
) {
  match *slot {
    Some(handle) => {
      surface.move_point(handle, x, y, style);
      surface.set_visible(handle.id(), true);
    }
    None => *slot = Some(surface.create_point(x, y, style)),
  }
}

/// Show a marker at `(x, y)` when it lies strictly inside the viewport;
/// otherwise leave it hidden.
fn place_marker<S: Surface + ?Sized>(
  surface: &mut S,
  slot: &mut Option<PointHandle>,
  (x, y): (f64, f64),
  bounds: &Bounds,
  style: &PointStyle,
) {
  if bounds.contains(x, y) {
    place_point(surface, slot, x, y, style);
  }
}

fn place_curve<S: Surface + ?Sized>(
  surface: &mut S,
  slot: &mut Option<CurveHandle>,
  source: CurveSource,
  style: &CurveStyle,
) {
  match *slot {
    Some(handle) => {
      surface.update_curve(handle, source, style);
      surface.set_visible(handle.id(), true);
    }
    None => *slot = Some(surface.create_curve(source, style)),
  }
}

fn draw_asymptote<S: Surface + ?Sized>(
  surface: &mut S,
  piece: &mut PlotPiece,
  text: &str,
  ctx: &DrawContext,
) -> Result<(), RelationError> {
  let value = get_hole_value(text);
  if !value.is_finite() {
    return Err(RelationError::EvaluationError(format!(
      "hole {text} has no numeric value"
    )));
  }
  let b = ctx.bounds;
  let horizontal = matches!(
    Restriction::from_text(text),
    Restriction::Hole { variable: 'y', .. }
  );
  let (from, to) = if horizontal {
    ((b.xmin, value), (b.xmax, value))
  } else {
    ((value, b.ymin), (value, b.ymax))
  };
  let style = CurveStyle {
    dashed: true,
    ..ctx.options.curve_style()
  };
  match piece.asymptote {
    Some(handle) => {
      surface.move_segment(handle, from, to);
      surface.set_visible(handle.id(), true);
    }
    None => piece.asymptote = Some(surface.create_segment(from, to, &style)),
  }
  Ok(())
}

/// Compile the right-hand side of an explicit relation.
fn compile_body(expression: &str) -> Result<Compiled, RelationError> {
  compile(remove_function_name(expression))
}

/// `y = f(x)` or `x = g(y)`, evaluated lazily by the surface.
fn draw_graph<S: Surface + ?Sized>(
  surface: &mut S,
  piece: &mut PlotPiece,
  expression: &str,
  variable: &str,
  axis: Axis,
  domain: &Restricted,
  ctx: &DrawContext,
) -> Result<(), RelationError> {
  let compiled = compile_body(expression)?;
  let interval = domain.interval;
  let at = |v: f64| -> (f64, f64) {
    let w = compiled.eval1(variable, v);
    match axis {
      Axis::X => (v, w),
      Axis::Y => (w, v),
    }
  };

  let lower = interval.lower;
  if is_finite_bound(lower) {
    let style = ctx.options.point_style(interval.lower_closed);
    place_marker(surface, &mut piece.lower_marker, at(lower), &ctx.bounds, &style);
  }
  let upper = interval.upper;
  if is_finite_bound(upper) {
    let style = ctx.options.point_style(interval.upper_closed);
    place_marker(surface, &mut piece.upper_marker, at(upper), &ctx.bounds, &style);
  }
  if let Some(hole) = domain.restriction.hole() {
    let style = ctx.options.point_style(false);
    place_marker(surface, &mut piece.hole_marker, at(hole), &ctx.bounds, &style);
  }

  let mut gaps = if axis == Axis::X {
    ctx.gaps.values.clone()
  } else {
    Vec::new()
  };
  gaps.extend(domain.restriction.hole());
  let tolerance = ctx.gaps.tolerance;
  let variable = variable.to_string();
  let producer = move |v: f64| -> f64 {
    if !interval.contains(v) || gaps.iter().any(|g| (v - g).abs() <= tolerance)
    {
      return f64::NAN;
    }
    compiled.eval1(&variable, v)
  };
  place_curve(
    surface,
    &mut piece.curve,
    CurveSource::Graph {
      axis,
      producer: Box::new(producer),
    },
    &ctx.options.curve_style(),
  );
  Ok(())
}

/// Parameter values from `tmin` to `tmax` in steps of `density`.
fn parameter_samples(
  tmin: f64,
  tmax: f64,
  density: f64,
) -> Result<Vec<f64>, RelationError> {
  if !(density > 0.0) || !density.is_finite() {
    return Err(RelationError::InvalidBounds(format!(
      "sampling density {density}"
    )));
  }
  if !tmin.is_finite() || !tmax.is_finite() || tmin > tmax {
    return Err(RelationError::InvalidBounds(format!(
      "parameter range [{tmin}, {tmax}]"
    )));
  }
  let mut step = density;
  if (tmax - tmin) / density > MAX_SAMPLES as f64 {
    step = (tmax - tmin) / MAX_SAMPLES as f64;
    log::warn!(
      "density {density} needs more than {MAX_SAMPLES} samples over [{tmin}, {tmax}], using step {step}"
    );
  }
  let steps = ((tmax - tmin) / step).floor() as usize;
  let mut samples: Vec<f64> =
    (0..=steps).map(|i| tmin + i as f64 * step).collect();
  if samples.last().is_some_and(|&t| t < tmax) {
    samples.push(tmax);
  }
  Ok(samples)
}

/// Endpoint markers of a parametrised curve, at the finite interval
/// bounds.
fn parameter_markers<S: Surface + ?Sized>(
  surface: &mut S,
  piece: &mut PlotPiece,
  domain: &Restricted,
  ctx: &DrawContext,
  at: &dyn Fn(f64) -> (f64, f64),
) {
  let interval = domain.interval;
  if is_finite_bound(interval.lower) {
    let style = ctx.options.point_style(interval.lower_closed);
    place_marker(
      surface,
      &mut piece.lower_marker,
      at(interval.lower),
      &ctx.bounds,
      &style,
    );
  }
  if is_finite_bound(interval.upper) {
    let style = ctx.options.point_style(interval.upper_closed);
    place_marker(
      surface,
      &mut piece.upper_marker,
      at(interval.upper),
      &ctx.bounds,
      &style,
    );
  }
  if let Some(hole) = domain.restriction.hole() {
    let style = ctx.options.point_style(false);
    place_marker(surface, &mut piece.hole_marker, at(hole), &ctx.bounds, &style);
  }
}

/// `r = f(t)`, sampled over `[0, 2pi]` unless an interval says otherwise.
fn draw_polar<S: Surface + ?Sized>(
  surface: &mut S,
  piece: &mut PlotPiece,
  expression: &str,
  variable: &str,
  domain: &Restricted,
  ctx: &DrawContext,
) -> Result<(), RelationError> {
  let compiled = compile_body(expression)?;
  let (tmin, tmax) = match domain.restriction {
    Restriction::Interval(interval) => (
      if is_finite_bound(interval.lower) {
        interval.lower
      } else {
        -POLAR_LIMIT
      },
      if is_finite_bound(interval.upper) {
        interval.upper
      } else {
        POLAR_LIMIT
      },
    ),
    _ => (0.0, 2.0 * PI),
  };

  let at = |t: f64| {
    let r = compiled.eval1(variable, t);
    (r * t.cos(), r * t.sin())
  };
  let points = parameter_samples(tmin, tmax, ctx.options.density)?
    .into_iter()
    .map(at)
    .collect();
  parameter_markers(surface, piece, domain, ctx, &at);
  place_curve(
    surface,
    &mut piece.curve,
    CurveSource::Points(points),
    &ctx.options.curve_style(),
  );
  Ok(())
}

/// `<x(t), y(t)>`, sampled over the interval or a range covering the
/// viewport.
fn draw_parametric<S: Surface + ?Sized>(
  surface: &mut S,
  piece: &mut PlotPiece,
  expression: &str,
  variable: &str,
  domain: &Restricted,
  ctx: &DrawContext,
) -> Result<(), RelationError> {
  let Relation::Parametric { x, y } = parse_relation(expression)? else {
    return Err(RelationError::Unplottable(format!(
      "{expression} is not a parametric pair"
    )));
  };
  let fx = Compiled::from_expr(x);
  let fy = Compiled::from_expr(y);

  let b = ctx.bounds;
  let interval = domain.interval;
  let tmin = if is_finite_bound(interval.lower) {
    interval.lower
  } else {
    b.xmin.min(b.ymin)
  };
  let tmax = if is_finite_bound(interval.upper) {
    interval.upper
  } else {
    b.xmax.max(b.ymax)
  };

  let at = |t: f64| (fx.eval1(variable, t), fy.eval1(variable, t));
  let points = parameter_samples(tmin, tmax, ctx.options.density)?
    .into_iter()
    .map(at)
    .collect();
  parameter_markers(surface, piece, domain, ctx, &at);
  place_curve(
    surface,
    &mut piece.curve,
    CurveSource::Points(points),
    &ctx.options.curve_style(),
  );
  Ok(())
}

/// `a = f(n)`, one dot per integer `n` in view and in the interval.
fn draw_sequence<S: Surface + ?Sized>(
  surface: &mut S,
  piece: &mut PlotPiece,
  expression: &str,
  variable: &str,
  domain: &Restricted,
  ctx: &DrawContext,
) -> Result<(), RelationError> {
  let compiled = compile_body(expression)?;
  let interval = domain.interval;
  let first = ctx.bounds.xmin.max(interval.lower).ceil();
  let last = ctx.bounds.xmax.min(interval.upper).floor();

  let mut points = Vec::new();
  let mut n = first;
  while n <= last && points.len() < MAX_SAMPLES {
    if interval.contains(n) && domain.restriction.admits(n) {
      points.push((n, compiled.eval1(variable, n)));
    }
    n += 1.0;
  }
  let style = CurveStyle {
    dots_only: true,
    ..ctx.options.curve_style()
  };
  place_curve(surface, &mut piece.curve, CurveSource::Points(points), &style);
  Ok(())
}

/// Anything else: trace `lhs - rhs = 0` over the viewport.
fn draw_implicit<S: Surface + ?Sized>(
  surface: &mut S,
  piece: &mut PlotPiece,
  expression: &str,
  domain: &Restricted,
  ctx: &DrawContext,
  tracer: &mut ImplicitTracer,
) -> Result<(), RelationError> {
  for curve in piece.contours.drain(..) {
    surface.remove(curve.id());
  }

  let zero_form = if expression.contains('=') {
    convert_implicit_equation(expression)
  } else {
    expression.to_string()
  };
  let compiled = compile(&zero_form)?;
  let unsupported: Vec<String> = classify(&zero_form)
    .free_variables
    .into_iter()
    .filter(|v| v != "x" && v != "y")
    .collect();
  if !unsupported.is_empty() {
    return Err(RelationError::Unplottable(format!(
      "{expression} depends on {}",
      unsupported.join(", ")
    )));
  }

  let interval = domain.interval;
  let f = |x: f64, y: f64| {
    if !interval.contains(x) {
      return f64::NAN;
    }
    compiled.eval_or_nan(&[("x", x), ("y", y)])
  };
  let options = TraceOptions {
    resolution: surface.pixel_size(),
    fast: ctx.options.fast,
  };
  let b = ctx.bounds;
  let trace = tracer.trace(
    f,
    &implicit::Domain::new(b.xmin, b.xmax, b.ymin, b.ymax),
    &options,
  )?;

  let style = ctx.options.curve_style();
  for line in trace.polylines() {
    let handle = surface.create_curve(CurveSource::Points(line), &style);
    piece.contours.push(handle);
  }
  Ok(())
}
