//! Domain restrictions written after a relation: intervals such as
//! `(-2,5]`, `[0, 2pi)` or `(-oo, a+b)`, and holes such as `x != 4`.
//!
//! Relations carry at most one trailing restriction, optionally introduced
//! by the keyword `on`:
//!
//! ```text
//! y = 2x+5 (-2,5]
//! r = sin(2t) on [0, 2pi)
//! y = 4x on x != 4
//! ```

use pest::Parser;
use pest::iterators::Pair;

use crate::evaluator::evaluate_str;
use crate::functions::numeric::{NEGATIVE_INFINITY, POSITIVE_INFINITY};
use crate::{RelationParser, Rule};

// ─── Types ──────────────────────────────────────────────────────────────────

/// A bounded or (half-)infinite range with independently open or closed
/// ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
  pub lower: f64,
  pub upper: f64,
  pub lower_closed: bool,
  pub upper_closed: bool,
}

impl Interval {
  /// `(-oo, oo)`: what a relation without a restriction is defined on.
  pub const UNIVERSAL: Interval = Interval {
    lower: NEGATIVE_INFINITY,
    upper: POSITIVE_INFINITY,
    lower_closed: false,
    upper_closed: false,
  };

  pub fn new(
    lower: f64,
    upper: f64,
    lower_closed: bool,
    upper_closed: bool,
  ) -> Self {
    Self {
      lower,
      upper,
      lower_closed,
      upper_closed,
    }
  }

  /// Parse an interval literal; anything else yields the universal
  /// interval.
  pub fn parse(literal: &str) -> Interval {
    if !is_interval(literal) {
      return Interval::UNIVERSAL;
    }
    let (lower, upper) = get_endpoints(literal);
    Interval {
      lower,
      upper,
      lower_closed: lower_bound_closed(literal),
      upper_closed: upper_bound_closed(literal),
    }
  }

  pub fn contains(&self, x: f64) -> bool {
    let above = if self.lower_closed {
      x >= self.lower
    } else {
      x > self.lower
    };
    let below = if self.upper_closed {
      x <= self.upper
    } else {
      x < self.upper
    };
    above && below
  }

  /// True when no number lies inside: inverted bounds, `(a,a)`, or an
  /// endpoint that failed to evaluate.
  pub fn is_empty(&self) -> bool {
    if self.lower.is_nan() || self.upper.is_nan() {
      return true;
    }
    self.lower > self.upper
      || (self.lower == self.upper && !(self.lower_closed && self.upper_closed))
  }
}

impl Default for Interval {
  fn default() -> Self {
    Interval::UNIVERSAL
  }
}

impl std::fmt::Display for Interval {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let open = if self.lower_closed { '[' } else { '(' };
    let close = if self.upper_closed { ']' } else { ')' };
    let side = |v: f64| {
      if v == POSITIVE_INFINITY {
        "oo".to_string()
      } else if v == NEGATIVE_INFINITY {
        "-oo".to_string()
      } else {
        format!("{v}")
      }
    };
    write!(f, "{open}{},{}{close}", side(self.lower), side(self.upper))
  }
}

/// What a relation's trailing restriction says about its domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
  Unrestricted,
  Interval(Interval),
  /// A single excluded value of `variable`.
  Hole { variable: char, value: f64 },
}

impl Restriction {
  pub fn from_text(text: &str) -> Restriction {
    let text = text.trim();
    if text.is_empty() {
      Restriction::Unrestricted
    } else if is_interval(text) {
      Restriction::Interval(Interval::parse(text))
    } else if let Some((variable, value)) = hole_parts(text) {
      Restriction::Hole {
        variable,
        value: evaluate_str(&value),
      }
    } else {
      Restriction::Unrestricted
    }
  }

  /// The interval the relation is defined on; holes do not narrow it.
  pub fn interval(&self) -> Interval {
    match self {
      Restriction::Interval(interval) => *interval,
      _ => Interval::UNIVERSAL,
    }
  }

  pub fn hole(&self) -> Option<f64> {
    match self {
      Restriction::Hole { value, .. } => Some(*value),
      _ => None,
    }
  }

  /// Whether `x` lies in the relation's domain.
  pub fn admits(&self, x: f64) -> bool {
    match self {
      Restriction::Unrestricted => true,
      Restriction::Interval(interval) => interval.contains(x),
      Restriction::Hole { value, .. } => x != *value,
    }
  }
}

// ─── Recognition ────────────────────────────────────────────────────────────

fn parse_tail(text: &str) -> Option<Pair<'_, Rule>> {
  RelationParser::parse(Rule::RestrictionTail, text)
    .ok()
    .and_then(|mut pairs| pairs.next())
}

/// A restriction may only start after whitespace, at the start of the text,
/// or right after the keyword `on`. Anything else (`max(x,2)`, `2(x,1)`) is
/// part of the expression.
fn may_start_restriction(before: &str) -> bool {
  match before.chars().last() {
    None => true,
    Some(c) if c.is_whitespace() => true,
    Some(_) => ends_with_on_keyword(before),
  }
}

fn ends_with_on_keyword(text: &str) -> bool {
  let Some(head) = text.strip_suffix("on") else {
    return false;
  };
  !head.chars().last().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Byte offset where the trailing restriction of `relation` starts.
fn restriction_start(relation: &str) -> Option<usize> {
  relation
    .char_indices()
    .filter(|(_, c)| matches!(c, '(' | '[' | 'x' | 'X' | 'y' | 'Y' | 't' | 'T'))
    .map(|(i, _)| i)
    .find(|&i| {
      may_start_restriction(&relation[..i])
        && parse_tail(&relation[i..]).is_some()
    })
}

/// Parse the whole of `text` as one restriction literal.
fn whole_literal(text: &str) -> Option<Pair<'_, Rule>> {
  parse_tail(text.trim())
    .and_then(|tail| tail.into_inner().next())
}

/// `(variable, value text)` of a hole literal such as `x != -1`.
fn hole_parts(text: &str) -> Option<(char, String)> {
  let literal = whole_literal(text)?;
  if literal.as_rule() != Rule::HoleLiteral {
    return None;
  }
  let mut variable = 'x';
  let mut value = String::new();
  for part in literal.into_inner() {
    match part.as_rule() {
      Rule::HoleVariable => {
        variable = part
          .as_str()
          .chars()
          .next()
          .map(|c| c.to_ascii_lowercase())
          .unwrap_or('x')
      }
      Rule::HoleValue => value = part.as_str().trim().to_string(),
      _ => {}
    }
  }
  Some((variable, value))
}

/// The two endpoint texts of an interval literal, trimmed.
fn endpoint_texts(interval: &str) -> Option<(String, String)> {
  let literal = whole_literal(interval)?;
  if literal.as_rule() != Rule::IntervalLiteral {
    return None;
  }
  let mut endpoints = literal
    .into_inner()
    .filter(|p| p.as_rule() == Rule::Endpoint)
    .map(|p| p.as_str().trim().to_string());
  Some((endpoints.next()?, endpoints.next()?))
}

// ─── Splitting relations ────────────────────────────────────────────────────

/// The trailing restriction of a relation, or `""` when it has none.
///
/// `get_interval("y=2x+5 on (2,5)") == "(2,5)"`
pub fn get_interval(relation: &str) -> &str {
  match restriction_start(relation) {
    Some(start) => relation[start..].trim(),
    None => "",
  }
}

/// The relation with its trailing restriction (and `on` keyword) removed.
///
/// `remove_interval("y=2x+5 on (2,5)") == "y=2x+5"`
pub fn remove_interval(relation: &str) -> &str {
  match restriction_start(relation) {
    Some(start) => {
      let head = relation[..start].trim_end();
      let head = if ends_with_on_keyword(head) {
        &head[..head.len() - 2]
      } else {
        head
      };
      head.trim()
    }
    None => relation,
  }
}

/// `(expression, restriction)` in one pass.
pub fn splice_interval(relation: &str) -> (String, String) {
  (
    remove_interval(relation).to_string(),
    get_interval(relation).to_string(),
  )
}

/// Split a relation into its expression and a typed restriction.
pub fn parse_restriction(relation: &str) -> (String, Restriction) {
  let (expression, restriction) = splice_interval(relation);
  let restriction = Restriction::from_text(&restriction);
  (expression, restriction)
}

// ─── Endpoints ──────────────────────────────────────────────────────────────

/// Lower bound of an interval literal. `inf`/`oo` anywhere on the lower
/// side means negative infinity; no interval at all means the universal
/// interval.
pub fn get_lower_endpoint(interval: &str) -> f64 {
  get_endpoints(interval).0
}

/// Upper bound of an interval literal, see [`get_lower_endpoint`].
pub fn get_upper_endpoint(interval: &str) -> f64 {
  get_endpoints(interval).1
}

pub fn get_endpoints(interval: &str) -> (f64, f64) {
  if interval.trim().is_empty() {
    return (NEGATIVE_INFINITY, POSITIVE_INFINITY);
  }
  match endpoint_texts(interval) {
    Some((lower, upper)) => (
      endpoint_value(&lower, NEGATIVE_INFINITY),
      endpoint_value(&upper, POSITIVE_INFINITY),
    ),
    None => (f64::NAN, f64::NAN),
  }
}

fn endpoint_value(text: &str, infinity: f64) -> f64 {
  let lower = text.to_ascii_lowercase();
  if lower.contains("inf") || lower.contains("oo") {
    infinity
  } else {
    evaluate_str(text)
  }
}

/// Value excluded by a hole literal (`x != 5` gives 5).
pub fn get_hole_value(hole: &str) -> f64 {
  hole_parts(hole)
    .map(|(_, value)| evaluate_str(&value))
    .unwrap_or(f64::NAN)
}

// ─── Predicates ─────────────────────────────────────────────────────────────

/// The whole text (ignoring surrounding whitespace) is an interval literal.
pub fn is_interval(text: &str) -> bool {
  whole_literal(text).is_some_and(|p| p.as_rule() == Rule::IntervalLiteral)
}

/// The whole text is a point: matching bracket shapes and finite sides.
pub fn is_point(text: &str) -> bool {
  is_closed_point(text) || is_open_point(text)
}

/// `(a,b)`: an ordinary point, drawn solid.
pub fn is_closed_point(text: &str) -> bool {
  let text = text.trim();
  is_interval(text)
    && text.starts_with('(')
    && text.ends_with(')')
    && has_finite_sides(text)
}

/// `[a,b]`: a point drawn as a hollow circle.
pub fn is_open_point(text: &str) -> bool {
  let text = text.trim();
  is_interval(text)
    && text.starts_with('[')
    && text.ends_with(']')
    && has_finite_sides(text)
}

fn has_finite_sides(text: &str) -> bool {
  endpoint_texts(text).is_some_and(|(a, b)| {
    let infinite =
      |s: &str| s.to_ascii_lowercase().contains("inf") || s.contains("oo");
    !infinite(&a) && !infinite(&b)
  })
}

/// The relation ends with a hole literal such as `x != 5`.
pub fn is_asymptote(relation: &str) -> bool {
  hole_parts(get_interval(relation)).is_some()
}

pub fn lower_bound_open(interval: &str) -> bool {
  is_interval(interval) && interval.trim_start().starts_with('(')
}

pub fn lower_bound_closed(interval: &str) -> bool {
  is_interval(interval) && interval.trim_start().starts_with('[')
}

pub fn upper_bound_open(interval: &str) -> bool {
  is_interval(interval) && interval.trim_end().ends_with(')')
}

pub fn upper_bound_closed(interval: &str) -> bool {
  is_interval(interval) && interval.trim_end().ends_with(']')
}

/// Whether `x` lies between `lower` and `upper`. One `closed` flag applies
/// to both ends; with `lower > upper` nothing is between.
pub fn is_between(x: f64, lower: f64, upper: f64, closed: bool) -> bool {
  if closed {
    lower <= x && x <= upper
  } else {
    lower < x && x < upper
  }
}
