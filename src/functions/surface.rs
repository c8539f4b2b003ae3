//! The drawing canvas the plotter renders onto.
//!
//! A surface owns every object it hands out; callers only keep the handles
//! and mutate through them. Object identity survives updates, so a host
//! widget can keep hit-testing the same curve across re-plots.

use crate::RelationError;
use crate::functions::interval::is_between;

/// Identity of one object on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

macro_rules! handle {
  ($name:ident) => {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct $name(pub ObjectId);

    impl $name {
      pub fn id(self) -> ObjectId {
        self.0
      }
    }

    impl From<$name> for ObjectId {
      fn from(handle: $name) -> ObjectId {
        handle.0
      }
    }
  };
}

handle!(CurveHandle);
handle!(PointHandle);
handle!(SegmentHandle);

/// Visible world-coordinate window of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
  pub xmin: f64,
  pub xmax: f64,
  pub ymin: f64,
  pub ymax: f64,
}

impl Bounds {
  pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
    Self {
      xmin,
      xmax,
      ymin,
      ymax,
    }
  }

  /// A usable window has finite sides and positive extent on both axes.
  pub fn validate(&self) -> Result<(), RelationError> {
    let finite = [self.xmin, self.xmax, self.ymin, self.ymax]
      .iter()
      .all(|v| v.is_finite());
    if !finite || self.xmin >= self.xmax || self.ymin >= self.ymax {
      return Err(RelationError::InvalidBounds(format!(
        "[{}, {}] x [{}, {}]",
        self.xmin, self.xmax, self.ymin, self.ymax
      )));
    }
    Ok(())
  }

  pub fn width(&self) -> f64 {
    self.xmax - self.xmin
  }

  pub fn height(&self) -> f64 {
    self.ymax - self.ymin
  }

  /// Strictly inside the window; markers on the border are not drawn.
  pub fn contains(&self, x: f64, y: f64) -> bool {
    is_between(x, self.xmin, self.xmax, false)
      && is_between(y, self.ymin, self.ymax, false)
  }
}

impl Default for Bounds {
  fn default() -> Self {
    Bounds::new(-10.0, 10.0, -10.0, 10.0)
  }
}

/// Which axis a graph producer is sampled along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
  /// `y = f(x)` for every visible `x`.
  X,
  /// `x = g(y)` for every visible `y`.
  Y,
}

/// What a curve is drawn from.
pub enum CurveSource {
  /// Evaluated lazily by the surface at render time, once per pixel along
  /// `axis`. NaN means "no curve here".
  Graph {
    axis: Axis,
    producer: Box<dyn Fn(f64) -> f64>,
  },
  /// A fixed list of world coordinates; non-finite entries are gaps.
  Points(Vec<(f64, f64)>),
}

impl std::fmt::Debug for CurveSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      CurveSource::Graph { axis, .. } => write!(f, "Graph({axis:?})"),
      CurveSource::Points(points) => write!(f, "Points({})", points.len()),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveStyle {
  pub color: String,
  pub width: f64,
  pub dashed: bool,
  /// Draw only the sample points, unconnected.
  pub dots_only: bool,
}

impl Default for CurveStyle {
  fn default() -> Self {
    Self {
      color: "blue".to_string(),
      width: 2.0,
      dashed: false,
      dots_only: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
  pub color: String,
  pub size: f64,
  /// Filled circle when true, white-filled circle when false.
  pub solid: bool,
}

impl Default for PointStyle {
  fn default() -> Self {
    Self {
      color: "blue".to_string(),
      size: 2.0,
      solid: true,
    }
  }
}

/// Drawing primitives consumed by the plotter.
pub trait Surface {
  fn bounds(&self) -> Bounds;

  /// Canvas size in pixels.
  fn pixel_size(&self) -> (u32, u32);

  fn create_curve(
    &mut self,
    source: CurveSource,
    style: &CurveStyle,
  ) -> CurveHandle;

  fn update_curve(
    &mut self,
    curve: CurveHandle,
    source: CurveSource,
    style: &CurveStyle,
  );

  fn create_point(&mut self, x: f64, y: f64, style: &PointStyle)
  -> PointHandle;

  fn move_point(
    &mut self,
    point: PointHandle,
    x: f64,
    y: f64,
    style: &PointStyle,
  );

  fn create_segment(
    &mut self,
    from: (f64, f64),
    to: (f64, f64),
    style: &CurveStyle,
  ) -> SegmentHandle;

  fn move_segment(
    &mut self,
    segment: SegmentHandle,
    from: (f64, f64),
    to: (f64, f64),
  );

  fn set_visible(&mut self, id: ObjectId, visible: bool);

  fn remove(&mut self, id: ObjectId);

  fn suspend_update(&mut self);

  fn unsuspend_update(&mut self);
}

/// Suspends redraw for as long as it lives. The surface is resumed when the
/// guard is dropped, including while unwinding.
pub struct SuspendGuard<'a, S: Surface + ?Sized> {
  surface: &'a mut S,
}

impl<'a, S: Surface + ?Sized> SuspendGuard<'a, S> {
  pub fn new(surface: &'a mut S) -> Self {
    surface.suspend_update();
    Self { surface }
  }
}

impl<S: Surface + ?Sized> Drop for SuspendGuard<'_, S> {
  fn drop(&mut self) {
    self.surface.unsuspend_update();
  }
}

impl<S: Surface + ?Sized> std::ops::Deref for SuspendGuard<'_, S> {
  type Target = S;

  fn deref(&self) -> &S {
    self.surface
  }
}

impl<S: Surface + ?Sized> std::ops::DerefMut for SuspendGuard<'_, S> {
  fn deref_mut(&mut self) -> &mut S {
    self.surface
  }
}
