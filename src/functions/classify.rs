//! Decide how a relation should be drawn from its shape, its assignment
//! target and its free variables.

use std::cell::RefCell;

use crate::evaluator::{is_known_constant, is_known_function};
use crate::functions::interval::{
  Restriction, is_closed_point, is_point, remove_interval,
};
use crate::syntax::{Relation, parse_relation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
  /// `(a,b)` is solid, `[a,b]` hollow.
  Point { solid: bool },
  /// A bare hole literal such as `x != 2`.
  Asymptote,
  /// `y = f(x)`, or any single-variable function.
  FunctionOfX,
  /// `x = g(y)`
  FunctionOfY,
  /// `r = f(t)`
  Polar,
  /// `<x(t), y(t)>`
  Parametric,
  /// `a = f(n)`, drawn at integer `n`.
  Sequence,
  /// Anything that has to go through the contour tracer.
  Implicit,
  /// Several `;`-separated pieces.
  Piecewise,
}

impl RelationKind {
  pub fn name(&self) -> &'static str {
    match self {
      RelationKind::Point { solid: true } => "point",
      RelationKind::Point { solid: false } => "open-point",
      RelationKind::Asymptote => "asymptote",
      RelationKind::FunctionOfX => "function-of-x",
      RelationKind::FunctionOfY => "function-of-y",
      RelationKind::Polar => "polar",
      RelationKind::Parametric => "parametric",
      RelationKind::Sequence => "sequence",
      RelationKind::Implicit => "implicit",
      RelationKind::Piecewise => "piecewise",
    }
  }
}

impl std::fmt::Display for RelationKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
  pub kind: RelationKind,
  /// The independent variable the relation is sampled over.
  pub variable: Option<String>,
  /// Left side of the assignment, or the defaulted `y` of a bare
  /// expression in `x`.
  pub target_name: Option<String>,
  pub free_variables: Vec<String>,
}

impl Classification {
  fn new(kind: RelationKind) -> Self {
    Self {
      kind,
      variable: None,
      target_name: None,
      free_variables: Vec::new(),
    }
  }

  fn with_variable(mut self, variable: &str) -> Self {
    self.variable = Some(variable.to_string());
    self
  }
}

/// Strip an enclosing `{ }` from a piecewise definition.
pub(crate) fn strip_braces(relation: &str) -> &str {
  let trimmed = relation.trim();
  trimmed
    .strip_prefix('{')
    .and_then(|s| s.strip_suffix('}'))
    .unwrap_or(trimmed)
    .trim()
}

/// Classify a relation. The first matching rule wins:
///
/// 1. `;`-separated pieces are piecewise
/// 2. point literals, then bare hole literals
/// 3. text that does not parse falls back to implicit
/// 4. parametric pairs, then equations (implicit)
/// 5. `y`, `x` and `r` targets over `x`, `y` and `t`
/// 6. function assignments `f(p) = ...` by parameter name
/// 7. sequences in `n`, other single-variable functions
/// 8. everything else is implicit
pub fn classify(relation: &str) -> Classification {
  let text = relation.trim().to_lowercase();
  let text = strip_braces(&text);

  if text.contains(';') {
    return Classification::new(RelationKind::Piecewise);
  }
  if is_point(text) {
    return Classification::new(RelationKind::Point {
      solid: is_closed_point(text),
    });
  }
  if let Restriction::Hole { variable, .. } = Restriction::from_text(text) {
    return Classification::new(RelationKind::Asymptote)
      .with_variable(&variable.to_string());
  }

  let expression = remove_interval(text);
  let parsed = match parse_relation(expression) {
    Ok(parsed) => parsed,
    Err(err) => {
      log::debug!("classifying {expression:?} as implicit: {err}");
      return Classification::new(RelationKind::Implicit);
    }
  };
  classify_parsed(&parsed)
}

fn classify_parsed(parsed: &Relation) -> Classification {
  let vars = free_variables(parsed);
  let within = |allowed: &[&str]| vars.iter().all(|v| allowed.contains(&&**v));

  let mut result = Classification::new(RelationKind::Implicit);
  result.free_variables = vars.clone();

  match parsed {
    Relation::Parametric { .. } if vars.len() <= 1 => {
      let variable = vars.first().map(String::as_str).unwrap_or("t");
      result.kind = RelationKind::Parametric;
      return result.with_variable(variable);
    }
    Relation::Parametric { .. } | Relation::Equation { .. } => return result,
    _ => {}
  }

  let target = match parsed.target_name() {
    Some(name) => Some(name.to_string()),
    None if within(&["x"]) => Some("y".to_string()),
    None => None,
  };
  result.target_name = target.clone();

  let (kind, variable) = match target.as_deref() {
    Some("y") if within(&["x"]) => (RelationKind::FunctionOfX, "x".into()),
    Some("x") if within(&["y"]) => (RelationKind::FunctionOfY, "y".into()),
    Some("r") if within(&["t"]) => (RelationKind::Polar, "t".into()),
    _ => match parsed {
      Relation::FunctionAssignment { params, .. }
        if params.len() == 1 && within(&[params[0].as_str()]) =>
      {
        let param = params[0].clone();
        match param.as_str() {
          "y" => (RelationKind::FunctionOfY, param),
          "n" => (RelationKind::Sequence, param),
          _ => (RelationKind::FunctionOfX, param),
        }
      }
      _ if target.is_some() && vars == ["n"] => {
        (RelationKind::Sequence, "n".into())
      }
      _ if vars.len() == 1 => (RelationKind::FunctionOfX, vars[0].clone()),
      _ => return result,
    },
  };
  result.kind = kind;
  result.variable = Some(variable);
  result
}

/// Free variable names of a parsed relation, in order of first appearance.
///
/// Constants and known function names are skipped, and so is the relation's
/// own target. A call to an unknown name with a single argument is an
/// implicit product (`x(x+1)`), so its name counts as a variable.
pub fn free_variables(relation: &Relation) -> Vec<String> {
  let target = relation.target_name();
  let mut vars: Vec<String> = Vec::new();
  let mut push = |name: &str| {
    if is_known_constant(name)
      || is_known_function(name)
      || Some(name) == target
      || vars.iter().any(|v| v == name)
    {
      return;
    }
    vars.push(name.to_string());
  };

  for body in relation.bodies() {
    let seen: RefCell<Vec<&str>> = RefCell::new(Vec::new());
    body.walk_symbols(
      &mut |name| seen.borrow_mut().push(name),
      &mut |name, arity| {
        if arity == 1 && !is_known_function(name) {
          seen.borrow_mut().push(name);
        }
      },
    );
    for name in seen.into_inner() {
      push(name);
    }
  }
  vars
}

/// The assignment target or function name, `""` when there is none.
pub fn function_name(relation: &str) -> String {
  let expression = remove_interval(relation.trim());
  if let Ok(parsed) = parse_relation(expression) {
    return parsed.target_name().unwrap_or_default().to_string();
  }
  match expression.split_once('=') {
    Some((lhs, _)) => {
      let lhs = lhs.trim();
      lhs.split('(').next().unwrap_or(lhs).trim().to_string()
    }
    None => String::new(),
  }
}

/// Everything right of the first `=`, or the whole relation.
pub fn remove_function_name(relation: &str) -> &str {
  match relation.split_once('=') {
    Some((_, rhs)) => rhs.trim(),
    None => relation.trim(),
  }
}

/// True when the relation has no explicit form: an equation, or text that
/// does not parse at all.
pub fn is_implicit_equation(relation: &str) -> bool {
  let text = relation.trim().to_lowercase();
  matches!(
    parse_relation(remove_interval(&text)),
    Ok(Relation::Equation { .. }) | Err(_)
  )
}

/// Rewrite `lhs = rhs` as one expression whose zero set is the equation's
/// solution set, flipping the sign of every top-level term of `rhs`.
///
/// `x^2+y^2=4` becomes `x^2+y^2-4`, `y=-x+1` becomes `y+x-1`.
pub fn convert_implicit_equation(equation: &str) -> String {
  let Some((lhs, rhs)) = equation.split_once('=') else {
    return equation.trim().to_string();
  };
  let lhs = lhs.trim();
  let rhs = rhs.trim();

  let mut out = String::with_capacity(lhs.len() + rhs.len() + 1);
  out.push_str(lhs);
  if !rhs.starts_with(['+', '-']) {
    out.push('-');
  }

  let mut depth = 0usize;
  let mut prev: Option<char> = None;
  let mut before_prev: Option<char> = None;
  let mut chars = rhs.chars().peekable();
  while let Some(c) = chars.next() {
    let next = chars.peek().copied();
    let flipped = match c {
      '(' | '[' => {
        depth += 1;
        c
      }
      ')' | ']' => {
        depth = depth.saturating_sub(1);
        c
      }
      '+' | '-' if depth == 0 && starts_term(prev, before_prev, next) => {
        if c == '+' { '-' } else { '+' }
      }
      _ => c,
    };
    out.push(flipped);
    if !c.is_whitespace() {
      before_prev = prev;
      prev = Some(c);
    }
  }
  out
}

/// A sign starts a new term unless it belongs to a factor: after `*`, `/`,
/// `^` or another sign, or inside a number's exponent such as `1e-3`.
/// `2e-y` is `2*e - y`, so an exponent needs a digit after the sign.
fn starts_term(
  prev: Option<char>,
  before_prev: Option<char>,
  next: Option<char>,
) -> bool {
  match prev {
    None => true,
    Some('*' | '/' | '^' | '+' | '-' | ',') => false,
    Some('e' | 'E') => {
      let exponent = before_prev.is_some_and(|c| c.is_ascii_digit())
        && next.is_some_and(|c| c.is_ascii_digit());
      !exponent
    }
    Some(_) => true,
  }
}
