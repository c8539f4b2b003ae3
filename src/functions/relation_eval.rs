use crate::evaluator::compile;
use crate::functions::classify::{remove_function_name, strip_braces};
use crate::functions::interval::{
  Restriction, is_point, parse_restriction,
};

/// Evaluate a relation, possibly piecewise, at `x`.
///
/// Point pieces are ignored and hole pieces exclude their value. When any
/// piece carries an interval, the first piece whose interval contains `x`
/// is used. Anything that cannot be evaluated gives NaN.
///
/// ```
/// use relplot::evaluate_relation;
///
/// let f = "{x^2 (-oo,0); 2x [0,oo)}";
/// assert_eq!(evaluate_relation(f, -3.0, "x"), 9.0);
/// assert_eq!(evaluate_relation(f, 3.0, "x"), 6.0);
/// ```
pub fn evaluate_relation(relation: &str, x: f64, variable: &str) -> f64 {
  let text = relation.to_lowercase();
  let mut holes = Vec::new();
  let mut pieces = Vec::new();

  for piece in strip_braces(&text).split(';') {
    let piece = piece.trim();
    if piece.is_empty() || is_point(piece) {
      continue;
    }
    if let Restriction::Hole { value, .. } = Restriction::from_text(piece) {
      holes.push(value);
      continue;
    }
    let (expression, restriction) = parse_restriction(piece);
    if let Some(value) = restriction.hole() {
      holes.push(value);
    }
    pieces.push((expression, restriction));
  }

  if holes.contains(&x) {
    return f64::NAN;
  }

  let restricted = pieces
    .iter()
    .any(|(_, r)| matches!(r, Restriction::Interval(_)));
  let chosen = if restricted {
    pieces
      .iter()
      .find(|(_, r)| matches!(r, Restriction::Interval(i) if i.contains(x)))
  } else {
    pieces.first()
  };
  let Some((expression, _)) = chosen else {
    return f64::NAN;
  };

  match compile(remove_function_name(expression)) {
    Ok(compiled) => compiled.eval_or_nan(&[(variable, x)]),
    Err(err) => {
      log::debug!("cannot evaluate {expression:?}: {err}");
      f64::NAN
    }
  }
}
