//! Marching-squares tracer for the zero set of `f(x, y)`.
//!
//! The domain is cut into a grid of cells sharing one table of corner
//! values. Each non-empty cell emits one or two segments from a fixed edge
//! table; the two saddle patterns are subdivided until they resolve or the
//! depth limit is reached, where the sign at the centre decides. Segments
//! are oriented with the positive side on their right, so a segment always
//! continues a chain by its end and the stitcher only ever joins tail to
//! head.

use crate::RelationError;

/// Target cell size in pixels per axis.
const CELL_PIXELS: u32 = 8;
/// Cells per axis in fast mode.
const FAST_GRID: usize = 8;
const SHALLOW_DEPTH: u8 = 1;
const MAX_DEPTH: u8 = 4;
const FAST_MAX_DEPTH: u8 = 2;
const JOIN_TOLERANCE: f64 = 1e-6;
const MAX_OPEN_CHAINS: usize = 64;

// ─── Public types ───────────────────────────────────────────────────────────

/// Rectangle the function is traced over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
  pub xmin: f64,
  pub xmax: f64,
  pub ymin: f64,
  pub ymax: f64,
}

impl Domain {
  pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
    Self {
      xmin,
      xmax,
      ymin,
      ymax,
    }
  }

  pub fn validate(&self) -> Result<(), RelationError> {
    let finite = [self.xmin, self.xmax, self.ymin, self.ymax]
      .iter()
      .all(|v| v.is_finite());
    if finite && self.xmin < self.xmax && self.ymin < self.ymax {
      Ok(())
    } else {
      Err(RelationError::InvalidBounds(format!(
        "[{}, {}] x [{}, {}]",
        self.xmin, self.xmax, self.ymin, self.ymax
      )))
    }
  }
}

impl From<crate::functions::surface::Bounds> for Domain {
  fn from(b: crate::functions::surface::Bounds) -> Self {
    Domain::new(b.xmin, b.xmax, b.ymin, b.ymax)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOptions {
  /// Size in pixels of the area the domain is drawn into.
  pub resolution: (u32, u32),
  /// Coarse fixed grid for interactive dragging.
  pub fast: bool,
}

impl Default for TraceOptions {
  fn default() -> Self {
    Self {
      resolution: (360, 360),
      fast: false,
    }
  }
}

/// One point of the flat output list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
  pub x: f64,
  pub y: f64,
  /// True when this point does not continue the previous one.
  pub starts_subpath: bool,
}

pub type Polyline = Vec<(f64, f64)>;

/// Counters from one trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
  /// Saddles deferred by the shallow pass.
  pub revisited: usize,
  /// Saddles still ambiguous at the depth limit, settled by the centre sign.
  pub decided: usize,
  /// Chains emitted unjoined because too many were open at once.
  pub flushed: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
  pub points: Vec<PathPoint>,
  pub stats: TraceStats,
}

impl Trace {
  fn from_polylines(polylines: Vec<Polyline>, stats: TraceStats) -> Self {
    let points = polylines
      .into_iter()
      .flat_map(|line| {
        line.into_iter().enumerate().map(|(i, (x, y))| PathPoint {
          x,
          y,
          starts_subpath: i == 0,
        })
      })
      .collect();
    Trace { points, stats }
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Split the flat list back into one point sequence per subpath.
  pub fn polylines(&self) -> Vec<Polyline> {
    let mut lines: Vec<Polyline> = Vec::new();
    for p in &self.points {
      match lines.last_mut() {
        Some(line) if !p.starts_subpath => line.push((p.x, p.y)),
        _ => lines.push(vec![(p.x, p.y)]),
      }
    }
    lines
  }
}

// ─── Cells ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStatus {
  pub positive: u8,
  pub negative: u8,
  pub zero: u8,
  /// Every corner evaluated to a finite number.
  pub valid: bool,
  /// No contour passes through.
  pub empty: bool,
}

impl CellStatus {
  fn of(corners: &[f64; 4]) -> Self {
    let mut status = CellStatus {
      valid: corners.iter().all(|v| v.is_finite()),
      ..CellStatus::default()
    };
    for &v in corners {
      if v > 0.0 {
        status.positive += 1;
      } else if v < 0.0 {
        status.negative += 1;
      } else if v == 0.0 {
        status.zero += 1;
      }
    }
    status.empty = !status.valid
      || status.positive + status.zero == 4
      || status.negative + status.zero == 4;
    status
  }
}

/// Corner order is south-west, south-east, north-east, north-west.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cell {
  pub corners: [f64; 4],
  pub status: CellStatus,
  /// Bit `i` is set when corner `i` is positive.
  pub code: u8,
}

impl Cell {
  fn new(corners: [f64; 4]) -> Self {
    Cell {
      corners,
      status: CellStatus::of(&corners),
      code: sign_code(&corners),
    }
  }
}

fn sign_code(corners: &[f64; 4]) -> u8 {
  corners
    .iter()
    .enumerate()
    .fold(0, |code, (i, &v)| if v > 0.0 { code | 1 << i } else { code })
}

// Edges: 0 bottom (sw-se), 1 right (se-ne), 2 top (ne-nw), 3 left (nw-sw).
const EDGE_CORNERS: [(usize, usize); 4] = [(0, 1), (1, 2), (2, 3), (3, 0)];

#[derive(Debug, Clone, Copy)]
enum Edges {
  None,
  One(u8, u8),
  Saddle,
}

const EDGE_TABLE: [Edges; 16] = [
  Edges::None,
  Edges::One(3, 0),
  Edges::One(0, 1),
  Edges::One(3, 1),
  Edges::One(1, 2),
  Edges::Saddle,
  Edges::One(0, 2),
  Edges::One(3, 2),
  Edges::One(2, 3),
  Edges::One(2, 0),
  Edges::Saddle,
  Edges::One(2, 1),
  Edges::One(1, 3),
  Edges::One(1, 0),
  Edges::One(0, 3),
  Edges::None,
];

/// Segments of a saddle once the centre sign is known:
/// `(code, centre positive, segments)`.
const SADDLE_TABLE: [(u8, bool, [(u8, u8); 2]); 4] = [
  (5, true, [(1, 0), (3, 2)]),
  (5, false, [(3, 0), (1, 2)]),
  (10, true, [(0, 3), (2, 1)]),
  (10, false, [(0, 1), (2, 3)]),
];

fn saddle_segments(code: u8, centre_positive: bool) -> [(u8, u8); 2] {
  SADDLE_TABLE
    .iter()
    .find(|(c, positive, _)| *c == code && *positive == centre_positive)
    .map(|(_, _, segments)| *segments)
    .unwrap_or([(0, 0), (0, 0)])
}

/// A cell-sized piece of the domain, possibly produced by subdivision.
#[derive(Debug, Clone, Copy)]
struct Region {
  x0: f64,
  y0: f64,
  x1: f64,
  y1: f64,
  corners: [f64; 4],
  depth: u8,
}

impl Region {
  fn positions(&self) -> [(f64, f64); 4] {
    [
      (self.x0, self.y0),
      (self.x1, self.y0),
      (self.x1, self.y1),
      (self.x0, self.y1),
    ]
  }

  /// Crossing point on `edge`, interpolated from the lower-left end so
  /// neighbouring cells produce bit-identical points.
  fn edge_point(&self, edge: u8) -> (f64, f64) {
    let (a, b) = EDGE_CORNERS[edge as usize];
    let pos = self.positions();
    let (mut pa, mut va, mut pb, mut vb) =
      (pos[a], self.corners[a], pos[b], self.corners[b]);
    if pb < pa {
      std::mem::swap(&mut pa, &mut pb);
      std::mem::swap(&mut va, &mut vb);
    }
    let t = va / (va - vb);
    (pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1))
  }

  fn centre(&self) -> (f64, f64) {
    ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
  }

  fn quarters<F: Fn(f64, f64) -> f64>(&self, f: &F) -> [Region; 4] {
    let (xm, ym) = self.centre();
    let [sw, se, ne, nw] = self.corners;
    let s = f(xm, self.y0);
    let e = f(self.x1, ym);
    let n = f(xm, self.y1);
    let w = f(self.x0, ym);
    let c = f(xm, ym);
    let depth = self.depth + 1;
    let region = |x0, y0, x1, y1, corners| Region {
      x0,
      y0,
      x1,
      y1,
      corners,
      depth,
    };
    [
      region(self.x0, self.y0, xm, ym, [sw, s, c, w]),
      region(xm, self.y0, self.x1, ym, [s, se, e, c]),
      region(xm, ym, self.x1, self.y1, [c, e, ne, n]),
      region(self.x0, ym, xm, self.y1, [w, c, n, nw]),
    ]
  }
}

// ─── Chain stitching ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Chain {
  points: std::collections::VecDeque<(f64, f64)>,
}

impl Chain {
  fn head(&self) -> Option<(f64, f64)> {
    self.points.front().copied()
  }

  fn tail(&self) -> Option<(f64, f64)> {
    self.points.back().copied()
  }
}

fn near(a: (f64, f64), b: (f64, f64)) -> bool {
  (a.0 - b.0).abs() <= JOIN_TOLERANCE && (a.1 - b.1).abs() <= JOIN_TOLERANCE
}

/// Open chains indexed by position, plus the finished polylines.
#[derive(Debug, Default)]
struct Stitcher {
  open: Vec<Chain>,
  finished: Vec<Polyline>,
  flushed: usize,
}

impl Stitcher {
  fn add(&mut self, a: (f64, f64), b: (f64, f64)) {
    if near(a, b) {
      return;
    }
    let extends = self
      .open
      .iter()
      .position(|c| c.tail().is_some_and(|t| near(t, a)));
    let precedes = self
      .open
      .iter()
      .position(|c| c.head().is_some_and(|h| near(h, b)));

    match (extends, precedes) {
      (Some(i), Some(j)) if i == j => self.close(i),
      (Some(i), Some(j)) => self.merge(i, j),
      (Some(i), None) => self.open[i].points.push_back(b),
      (None, Some(j)) => self.open[j].points.push_front(a),
      (None, None) => {
        self.open.push(Chain {
          points: [a, b].into_iter().collect(),
        });
        if self.open.len() > MAX_OPEN_CHAINS {
          self.flush(0);
        }
      }
    }
  }

  /// Join chain `j` onto the end of chain `i`.
  fn merge(&mut self, i: usize, j: usize) {
    let moved = self.open.swap_remove(j);
    // swap_remove moved the last chain into slot j
    let i = if i == self.open.len() { j } else { i };
    self.open[i].points.extend(moved.points);
  }

  /// The chain's tail met its own head: emit it as a closed loop.
  fn close(&mut self, i: usize) {
    let mut chain = self.open.swap_remove(i);
    if let Some(head) = chain.head() {
      chain.points.push_back(head);
    }
    self.finished.push(chain.points.into_iter().collect());
  }

  /// Give up on joining chain `i` and emit it as it is.
  fn flush(&mut self, i: usize) {
    let chain = self.open.remove(i);
    self.flushed += 1;
    self.finished.push(chain.points.into_iter().collect());
  }

  fn finish(mut self) -> (Vec<Polyline>, usize) {
    while !self.open.is_empty() {
      let chain = self.open.remove(0);
      self.finished.push(chain.points.into_iter().collect());
    }
    self.finished.retain(|line| line.len() > 1);
    (self.finished, self.flushed)
  }
}

// ─── Tracer ─────────────────────────────────────────────────────────────────

/// Reusable tracer. The corner-value table and the cells are kept between
/// calls and only reallocated when the grid dimensions change.
#[derive(Debug, Default)]
pub struct ImplicitTracer {
  cols: usize,
  rows: usize,
  values: Vec<f64>,
  cells: Vec<Cell>,
  reallocations: usize,
}

impl ImplicitTracer {
  pub fn new() -> Self {
    Self::default()
  }

  /// `(columns, rows)` of the last grid built.
  pub fn grid_size(&self) -> (usize, usize) {
    (self.cols, self.rows)
  }

  /// How often the grid storage had to be allocated.
  pub fn reallocations(&self) -> usize {
    self.reallocations
  }

  pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
    if col < self.cols && row < self.rows {
      self.cells.get(row * self.cols + col)
    } else {
      None
    }
  }

  fn grid_dimensions(options: &TraceOptions) -> (usize, usize) {
    if options.fast {
      return (FAST_GRID, FAST_GRID);
    }
    let (w, h) = options.resolution;
    (
      (w / CELL_PIXELS).max(1) as usize,
      (h / CELL_PIXELS).max(1) as usize,
    )
  }

  fn resize(&mut self, cols: usize, rows: usize) {
    if (cols, rows) == (self.cols, self.rows) && !self.cells.is_empty() {
      return;
    }
    self.cols = cols;
    self.rows = rows;
    self.values = vec![f64::NAN; (cols + 1) * (rows + 1)];
    self.cells = vec![Cell::default(); cols * rows];
    self.reallocations += 1;
  }

  /// Trace the zero set of `f` over `domain`.
  pub fn trace<F: Fn(f64, f64) -> f64>(
    &mut self,
    f: F,
    domain: &Domain,
    options: &TraceOptions,
  ) -> Result<Trace, RelationError> {
    domain.validate()?;
    let (cols, rows) = Self::grid_dimensions(options);
    self.resize(cols, rows);

    let dx = (domain.xmax - domain.xmin) / cols as f64;
    let dy = (domain.ymax - domain.ymin) / rows as f64;
    let x_at = |i: usize| domain.xmin + i as f64 * dx;
    let y_at = |j: usize| domain.ymin + j as f64 * dy;

    for j in 0..=rows {
      for i in 0..=cols {
        self.values[j * (cols + 1) + i] = f(x_at(i), y_at(j));
      }
    }

    let max_depth = if options.fast {
      FAST_MAX_DEPTH
    } else {
      MAX_DEPTH
    };
    let mut stitcher = Stitcher::default();
    let mut pending = Vec::new();
    let mut decided = 0;

    for j in 0..rows {
      for i in 0..cols {
        let v = |i: usize, j: usize| self.values[j * (cols + 1) + i];
        let corners = [v(i, j), v(i + 1, j), v(i + 1, j + 1), v(i, j + 1)];
        let cell = Cell::new(corners);
        self.cells[j * cols + i] = cell;
        if cell.status.empty {
          continue;
        }
        let region = Region {
          x0: x_at(i),
          y0: y_at(j),
          x1: x_at(i + 1),
          y1: y_at(j + 1),
          corners,
          depth: 0,
        };
        let mut pass = Pass {
          stitcher: &mut stitcher,
          pending: &mut pending,
          decided: &mut decided,
        };
        pass.process(&f, region, SHALLOW_DEPTH, false);
      }
    }

    // second pass: saddles the shallow pass could not resolve
    let unresolved = std::mem::take(&mut pending);
    let revisited = unresolved.len();
    let mut pass = Pass {
      stitcher: &mut stitcher,
      pending: &mut pending,
      decided: &mut decided,
    };
    for region in unresolved {
      pass.process(&f, region, max_depth, true);
    }

    let (polylines, flushed) = stitcher.finish();
    log::debug!(
      "traced {} polylines on a {cols}x{rows} grid ({revisited} saddles revisited, {decided} decided, {flushed} chains flushed)",
      polylines.len()
    );
    let stats = TraceStats {
      revisited,
      decided,
      flushed,
    };
    Ok(Trace::from_polylines(polylines, stats))
  }
}

/// Where one pass sends its output.
struct Pass<'a> {
  stitcher: &'a mut Stitcher,
  pending: &'a mut Vec<Region>,
  decided: &'a mut usize,
}

impl Pass<'_> {
  /// Emit the segments of one region. Saddles are split into quarters
  /// while `depth < max_depth`; at the limit they are either decided by the
  /// centre sign or deferred to `pending`.
  fn process<F: Fn(f64, f64) -> f64>(
    &mut self,
    f: &F,
    region: Region,
    max_depth: u8,
    decide: bool,
  ) {
    let cell = Cell::new(region.corners);
    if cell.status.empty {
      return;
    }
    match EDGE_TABLE[cell.code as usize] {
      Edges::None => {}
      Edges::One(a, b) => self
        .stitcher
        .add(region.edge_point(a), region.edge_point(b)),
      Edges::Saddle if region.depth < max_depth => {
        for quarter in region.quarters(f) {
          self.process(f, quarter, max_depth, decide);
        }
      }
      Edges::Saddle if decide => {
        *self.decided += 1;
        let (xm, ym) = region.centre();
        for (a, b) in saddle_segments(cell.code, f(xm, ym) > 0.0) {
          self.stitcher.add(region.edge_point(a), region.edge_point(b));
        }
      }
      Edges::Saddle => self.pending.push(region),
    }
  }
}

/// Trace `f(x, y) = 0` over `domain` drawn at `resolution` pixels and
/// return one polyline per connected piece.
pub fn trace_implicit<F: Fn(f64, f64) -> f64>(
  f: F,
  domain: Domain,
  resolution: (u32, u32),
) -> Result<Vec<Polyline>, RelationError> {
  let options = TraceOptions {
    resolution,
    fast: false,
  };
  let trace = ImplicitTracer::new().trace(f, &domain, &options)?;
  Ok(trace.polylines())
}
