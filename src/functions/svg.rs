//! In-memory [`Surface`] that keeps its objects in an arena and renders them
//! to SVG text on demand.

use serde_json::{Value, json};

use crate::functions::numeric::scalemap;
use crate::functions::surface::{
  Axis, Bounds, CurveHandle, CurveSource, CurveStyle, ObjectId, PointHandle,
  PointStyle, SegmentHandle, Surface,
};

pub const DEFAULT_WIDTH: u32 = 360;
pub const DEFAULT_HEIGHT: u32 = 360;

enum Shape {
  Curve {
    source: CurveSource,
    style: CurveStyle,
  },
  Point {
    x: f64,
    y: f64,
    style: PointStyle,
  },
  Segment {
    from: (f64, f64),
    to: (f64, f64),
    style: CurveStyle,
  },
}

struct SvgObject {
  shape: Shape,
  visible: bool,
}

pub struct SvgSurface {
  bounds: Bounds,
  width: u32,
  height: u32,
  objects: Vec<Option<SvgObject>>,
  suspended: usize,
  redraws: usize,
}

impl SvgSurface {
  pub fn new(bounds: Bounds, width: u32, height: u32) -> Self {
    Self {
      bounds,
      width: width.max(1),
      height: height.max(1),
      objects: Vec::new(),
      suspended: 0,
      redraws: 0,
    }
  }

  pub fn set_bounds(&mut self, bounds: Bounds) {
    self.bounds = bounds;
    self.refresh();
  }

  /// How many times the canvas would have been repainted.
  pub fn redraw_count(&self) -> usize {
    self.redraws
  }

  pub fn is_suspended(&self) -> bool {
    self.suspended > 0
  }

  /// Number of live (not removed) objects, hidden ones included.
  pub fn object_count(&self) -> usize {
    self.objects.iter().flatten().count()
  }

  pub fn contains(&self, id: ObjectId) -> bool {
    self.object(id).is_some()
  }

  pub fn is_visible(&self, id: ObjectId) -> bool {
    self.object(id).is_some_and(|o| o.visible)
  }

  pub fn point(&self, handle: PointHandle) -> Option<(f64, f64, &PointStyle)> {
    match &self.object(handle.id())?.shape {
      Shape::Point { x, y, style } => Some((*x, *y, style)),
      _ => None,
    }
  }

  pub fn segment(
    &self,
    handle: SegmentHandle,
  ) -> Option<((f64, f64), (f64, f64))> {
    match &self.object(handle.id())?.shape {
      Shape::Segment { from, to, .. } => Some((*from, *to)),
      _ => None,
    }
  }

  pub fn curve_style(&self, handle: CurveHandle) -> Option<&CurveStyle> {
    match &self.object(handle.id())?.shape {
      Shape::Curve { style, .. } => Some(style),
      _ => None,
    }
  }

  /// The world coordinates a curve renders at the current bounds. Graph
  /// curves are sampled once per pixel.
  pub fn curve_points(&self, handle: CurveHandle) -> Option<Vec<(f64, f64)>> {
    match &self.object(handle.id())?.shape {
      Shape::Curve { source, .. } => Some(self.sample(source)),
      _ => None,
    }
  }

  fn object(&self, id: ObjectId) -> Option<&SvgObject> {
    self.objects.get(id.0).and_then(Option::as_ref)
  }

  fn object_mut(&mut self, id: ObjectId) -> Option<&mut SvgObject> {
    self.objects.get_mut(id.0).and_then(Option::as_mut)
  }

  fn insert(&mut self, shape: Shape) -> ObjectId {
    self.objects.push(Some(SvgObject {
      shape,
      visible: true,
    }));
    self.refresh();
    ObjectId(self.objects.len() - 1)
  }

  fn refresh(&mut self) {
    if self.suspended == 0 {
      self.redraws += 1;
    }
  }

  fn sample(&self, source: &CurveSource) -> Vec<(f64, f64)> {
    let b = self.bounds;
    match source {
      CurveSource::Points(points) => points.clone(),
      CurveSource::Graph {
        axis: Axis::X,
        producer,
      } => (0..=self.width)
        .map(|i| {
          let x = scalemap(i as f64, (0.0, self.width as f64), (b.xmin, b.xmax));
          (x, producer(x))
        })
        .collect(),
      CurveSource::Graph {
        axis: Axis::Y,
        producer,
      } => (0..=self.height)
        .map(|j| {
          let y =
            scalemap(j as f64, (0.0, self.height as f64), (b.ymin, b.ymax));
          (producer(y), y)
        })
        .collect(),
    }
  }

  fn to_pixel(&self, (x, y): (f64, f64)) -> (f64, f64) {
    let b = self.bounds;
    (
      scalemap(x, (b.xmin, b.xmax), (0.0, self.width as f64)),
      scalemap(y, (b.ymin, b.ymax), (self.height as f64, 0.0)),
    )
  }

  /// Render all visible objects, with axes, as a standalone SVG document.
  pub fn to_svg(&self) -> String {
    let (w, h) = (self.width, self.height);
    let mut svg = svg_header(w, h);

    let (ox, oy) = self.to_pixel((0.0, 0.0));
    if (0.0..=w as f64).contains(&ox) {
      svg.push_str(&format!(
        "<line x1=\"{ox:.1}\" y1=\"0\" x2=\"{ox:.1}\" y2=\"{h}\" stroke=\"#999\" stroke-width=\"1\"/>\n"
      ));
    }
    if (0.0..=h as f64).contains(&oy) {
      svg.push_str(&format!(
        "<line x1=\"0\" y1=\"{oy:.1}\" x2=\"{w}\" y2=\"{oy:.1}\" stroke=\"#999\" stroke-width=\"1\"/>\n"
      ));
    }

    for object in self.objects.iter().flatten().filter(|o| o.visible) {
      match &object.shape {
        Shape::Curve { source, style } => {
          let points = self.sample(source);
          if style.dots_only {
            for &p in points.iter().filter(|p| p.0.is_finite() && p.1.is_finite())
            {
              let (px, py) = self.to_pixel(p);
              svg.push_str(&format!(
                "<circle cx=\"{px:.1}\" cy=\"{py:.1}\" r=\"{:.1}\" fill=\"{}\"/>\n",
                style.width, style.color
              ));
            }
            continue;
          }
          let dash = if style.dashed {
            " stroke-dasharray=\"3\""
          } else {
            ""
          };
          for segment in split_into_segments(&points) {
            let coords: Vec<String> = segment
              .iter()
              .map(|&p| {
                let (px, py) = self.to_pixel(p);
                format!("{px:.1},{py:.1}")
              })
              .collect();
            svg.push_str(&format!(
              "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"{dash}/>\n",
              coords.join(" "),
              style.color,
              style.width
            ));
          }
        }
        Shape::Point { x, y, style } => {
          let (px, py) = self.to_pixel((*x, *y));
          let fill = if style.solid { style.color.as_str() } else { "white" };
          svg.push_str(&format!(
            "<circle cx=\"{px:.1}\" cy=\"{py:.1}\" r=\"{:.1}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"1.5\"/>\n",
            style.size * 2.0,
            style.color
          ));
        }
        Shape::Segment { from, to, style } => {
          let (x1, y1) = self.to_pixel(*from);
          let (x2, y2) = self.to_pixel(*to);
          let dash = if style.dashed {
            " stroke-dasharray=\"3\""
          } else {
            ""
          };
          svg.push_str(&format!(
            "<line x1=\"{x1:.1}\" y1=\"{y1:.1}\" x2=\"{x2:.1}\" y2=\"{y2:.1}\" stroke=\"{}\" stroke-width=\"{}\"{dash}/>\n",
            style.color, style.width
          ));
        }
      }
    }

    svg.push_str("</svg>");
    svg
  }

  /// Describe the visible scene as JSON, in world coordinates.
  pub fn to_json(&self) -> Value {
    let objects: Vec<Value> = self
      .objects
      .iter()
      .enumerate()
      .filter_map(|(id, o)| o.as_ref().map(|o| (id, o)))
      .filter(|(_, o)| o.visible)
      .map(|(id, o)| match &o.shape {
        Shape::Curve { source, style } => json!({
          "id": id,
          "type": "curve",
          "color": style.color,
          "dashed": style.dashed,
          "segments": split_into_segments(&self.sample(source)),
        }),
        Shape::Point { x, y, style } => json!({
          "id": id,
          "type": "point",
          "x": x,
          "y": y,
          "solid": style.solid,
          "color": style.color,
        }),
        Shape::Segment { from, to, style } => json!({
          "id": id,
          "type": "segment",
          "from": [from.0, from.1],
          "to": [to.0, to.1],
          "dashed": style.dashed,
        }),
      })
      .collect();
    let b = self.bounds;
    json!({
      "bounds": [b.xmin, b.xmax, b.ymin, b.ymax],
      "objects": objects,
    })
  }
}

impl Default for SvgSurface {
  fn default() -> Self {
    SvgSurface::new(Bounds::default(), DEFAULT_WIDTH, DEFAULT_HEIGHT)
  }
}

impl Surface for SvgSurface {
  fn bounds(&self) -> Bounds {
    self.bounds
  }

  fn pixel_size(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  fn create_curve(
    &mut self,
    source: CurveSource,
    style: &CurveStyle,
  ) -> CurveHandle {
    CurveHandle(self.insert(Shape::Curve {
      source,
      style: style.clone(),
    }))
  }

  fn update_curve(
    &mut self,
    curve: CurveHandle,
    source: CurveSource,
    style: &CurveStyle,
  ) {
    if let Some(object) = self.object_mut(curve.id()) {
      object.shape = Shape::Curve {
        source,
        style: style.clone(),
      };
      self.refresh();
    }
  }

  fn create_point(
    &mut self,
    x: f64,
    y: f64,
    style: &PointStyle,
  ) -> PointHandle {
    PointHandle(self.insert(Shape::Point {
      x,
      y,
      style: style.clone(),
    }))
  }

  fn move_point(
    &mut self,
    point: PointHandle,
    x: f64,
    y: f64,
    style: &PointStyle,
  ) {
    if let Some(object) = self.object_mut(point.id()) {
      object.shape = Shape::Point {
        x,
        y,
        style: style.clone(),
      };
      self.refresh();
    }
  }

  fn create_segment(
    &mut self,
    from: (f64, f64),
    to: (f64, f64),
    style: &CurveStyle,
  ) -> SegmentHandle {
    SegmentHandle(self.insert(Shape::Segment {
      from,
      to,
      style: style.clone(),
    }))
  }

  fn move_segment(
    &mut self,
    segment: SegmentHandle,
    from: (f64, f64),
    to: (f64, f64),
  ) {
    if let Some(object) = self.object_mut(segment.id()) {
      if let Shape::Segment {
        from: old_from,
        to: old_to,
        ..
      } = &mut object.shape
      {
        *old_from = from;
        *old_to = to;
      }
      self.refresh();
    }
  }

  fn set_visible(&mut self, id: ObjectId, visible: bool) {
    if let Some(object) = self.object_mut(id) {
      object.visible = visible;
      self.refresh();
    }
  }

  fn remove(&mut self, id: ObjectId) {
    if let Some(slot) = self.objects.get_mut(id.0) {
      if slot.take().is_some() {
        self.refresh();
      }
    }
  }

  fn suspend_update(&mut self) {
    self.suspended += 1;
  }

  fn unsuspend_update(&mut self) {
    self.suspended = self.suspended.saturating_sub(1);
    self.refresh();
  }
}

/// Header for a plain SVG canvas with a white background.
fn svg_header(w: u32, h: u32) -> String {
  format!(
    "<svg width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" preserveAspectRatio=\"xMidYMid meet\" xmlns=\"http://www.w3.org/2000/svg\">\n\
     <rect width=\"{w}\" height=\"{h}\" fill=\"white\"/>\n"
  )
}

/// Split points into contiguous finite runs, breaking at NaN/Infinity on
/// either coordinate. Runs of a single point are dropped.
pub fn split_into_segments(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
  let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
  let mut current: Vec<(f64, f64)> = Vec::new();

  for &(x, y) in points {
    if x.is_finite() && y.is_finite() {
      current.push((x, y));
    } else if current.len() > 1 {
      segments.push(std::mem::take(&mut current));
    } else {
      current.clear();
    }
  }
  if current.len() > 1 {
    segments.push(current);
  }
  segments
}
