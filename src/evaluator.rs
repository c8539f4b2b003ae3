//! The expression engine: compiles algebraic text into an evaluable tree and
//! evaluates it numerically for a set of variable bindings.
//!
//! Results that are not real numbers (square roots of negatives, logarithms
//! of non-positive values, complex constants) come back as NaN rather than
//! as errors, so sampling code can treat them as gaps.

use crate::RelationError;
use crate::functions::numeric;
use crate::syntax::{BinaryOperator, Expr, UnaryOperator, parse_expression};

/// Names treated as constants rather than free variables.
pub const KNOWN_CONSTANTS: &[&str] = &["e", "pi", "i"];

/// Function names recognized by the evaluator. These never count as free
/// variables of a relation.
pub const KNOWN_FUNCTIONS: &[&str] = &[
  "abs",
  "cbrt",
  "ceil",
  "cube",
  "exp",
  "expm1",
  "fix",
  "floor",
  "gcd",
  "lcm",
  "ln",
  "log",
  "log10",
  "log1p",
  "log2",
  "norm",
  "nthroot",
  "pow",
  "round",
  "sign",
  "sqrt",
  "square",
  "factorial",
  "gamma",
  "combinations",
  "permutations",
  "cumsum",
  "mad",
  "max",
  "mean",
  "median",
  "min",
  "mode",
  "prod",
  "std",
  "sum",
  "variance",
  "acos",
  "acosh",
  "acot",
  "acoth",
  "acsc",
  "acsch",
  "asec",
  "asech",
  "asin",
  "asinh",
  "atan",
  "atan2",
  "atanh",
  "cos",
  "cosh",
  "cot",
  "coth",
  "csc",
  "csch",
  "sec",
  "sech",
  "sin",
  "sinh",
  "tan",
  "tanh",
];

pub fn is_known_function(name: &str) -> bool {
  KNOWN_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

pub fn is_known_constant(name: &str) -> bool {
  KNOWN_CONSTANTS.contains(&name)
}

/// A parsed expression ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
  source: String,
  expr: Expr,
}

/// Compile algebraic text such as `2x^2 - sin(pi t)`.
pub fn compile(source: &str) -> Result<Compiled, RelationError> {
  let expr = parse_expression(source)?;
  Ok(Compiled {
    source: source.trim().to_string(),
    expr,
  })
}

/// Evaluate a constant expression, mapping any failure to NaN.
pub fn evaluate_str(source: &str) -> f64 {
  compile(source).map(|c| c.eval_or_nan(&[])).unwrap_or(f64::NAN)
}

impl Compiled {
  pub fn from_expr(expr: Expr) -> Self {
    Self {
      source: expr.to_string(),
      expr,
    }
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn expr(&self) -> &Expr {
    &self.expr
  }

  pub fn eval(&self, bindings: &[(&str, f64)]) -> Result<f64, RelationError> {
    eval_expr(&self.expr, bindings)
  }

  /// Evaluate, treating every failure as a gap.
  pub fn eval_or_nan(&self, bindings: &[(&str, f64)]) -> f64 {
    self.eval(bindings).unwrap_or(f64::NAN)
  }

  /// Evaluate as a function of one variable.
  pub fn eval1(&self, variable: &str, value: f64) -> f64 {
    self.eval_or_nan(&[(variable, value)])
  }
}

fn lookup(name: &str, bindings: &[(&str, f64)]) -> Option<f64> {
  bindings
    .iter()
    .find(|(bound, _)| *bound == name)
    .map(|(_, v)| *v)
}

fn eval_expr(
  expr: &Expr,
  bindings: &[(&str, f64)],
) -> Result<f64, RelationError> {
  match expr {
    Expr::Number(n) => Ok(*n),
    Expr::Identifier(name) => {
      if let Some(v) = lookup(name, bindings) {
        return Ok(v);
      }
      match name.as_str() {
        "pi" => Ok(numeric::PI),
        "e" => Ok(numeric::E),
        // the imaginary unit has no real value
        "i" => Ok(f64::NAN),
        _ => Err(RelationError::UnboundVariable(name.clone())),
      }
    }
    Expr::UnaryOp { op, operand } => {
      let v = eval_expr(operand, bindings)?;
      Ok(match op {
        UnaryOperator::Plus => v,
        UnaryOperator::Minus => -v,
        UnaryOperator::Factorial => factorial(v),
      })
    }
    Expr::BinaryOp { op, left, right } => {
      let a = eval_expr(left, bindings)?;
      let b = eval_expr(right, bindings)?;
      Ok(match op {
        BinaryOperator::Plus => a + b,
        BinaryOperator::Minus => a - b,
        BinaryOperator::Times => a * b,
        BinaryOperator::Divide => a / b,
        BinaryOperator::Power => a.powf(b),
      })
    }
    Expr::FunctionCall { name, args } => {
      let values = args
        .iter()
        .map(|a| eval_expr(a, bindings))
        .collect::<Result<Vec<_>, _>>()?;
      if is_known_function(name) {
        return call_function(&name.to_ascii_lowercase(), &values);
      }
      // `x(x+1)` reads as a product when `x` is bound
      match (lookup(name, bindings), values.as_slice()) {
        (Some(factor), [v]) => Ok(factor * v),
        _ => Err(RelationError::UnknownFunction(name.clone())),
      }
    }
  }
}

fn arity_error(name: &str, expected: &str) -> RelationError {
  RelationError::EvaluationError(format!("{name}: expected {expected}"))
}

fn call_function(name: &str, args: &[f64]) -> Result<f64, RelationError> {
  // single-argument functions
  if let [x] = args {
    let x = *x;
    let value = match name {
      "abs" => Some(x.abs()),
      "cbrt" => Some(x.cbrt()),
      "ceil" => Some(x.ceil()),
      "cube" => Some(x * x * x),
      "exp" => Some(x.exp()),
      "expm1" => Some(x.exp_m1()),
      "fix" => Some(x.trunc()),
      "floor" => Some(x.floor()),
      "ln" | "log" => Some(x.ln()),
      "log10" => Some(x.log10()),
      "log1p" => Some(x.ln_1p()),
      "log2" => Some(x.log2()),
      "round" => Some(numeric::round(x, 0)),
      "sign" => Some(if x == 0.0 { 0.0 } else { x.signum() }),
      "sqrt" => Some(x.sqrt()),
      "square" => Some(x * x),
      "factorial" => Some(factorial(x)),
      "gamma" => Some(gamma(x)),
      "acos" => Some(x.acos()),
      "acosh" => Some(x.acosh()),
      "acot" => Some((1.0 / x).atan()),
      "acoth" => Some((1.0 / x).atanh()),
      "acsc" => Some((1.0 / x).asin()),
      "acsch" => Some((1.0 / x).asinh()),
      "asec" => Some((1.0 / x).acos()),
      "asech" => Some((1.0 / x).acosh()),
      "asin" => Some(x.asin()),
      "asinh" => Some(x.asinh()),
      "atan" => Some(x.atan()),
      "atanh" => Some(x.atanh()),
      "cos" => Some(x.cos()),
      "cosh" => Some(x.cosh()),
      "cot" => Some(1.0 / x.tan()),
      "coth" => Some(1.0 / x.tanh()),
      "csc" => Some(1.0 / x.sin()),
      "csch" => Some(1.0 / x.sinh()),
      "sec" => Some(1.0 / x.cos()),
      "sech" => Some(1.0 / x.cosh()),
      "sin" => Some(x.sin()),
      "sinh" => Some(x.sinh()),
      "tan" => Some(x.tan()),
      "tanh" => Some(x.tanh()),
      _ => None,
    };
    if let Some(v) = value {
      return Ok(v);
    }
  }

  match name {
    "log" => match args {
      [x, base] => Ok(x.ln() / base.ln()),
      _ => Err(arity_error(name, "1 or 2 arguments")),
    },
    "round" => match args {
      [x, places] => Ok(numeric::round(*x, *places as i32)),
      _ => Err(arity_error(name, "1 or 2 arguments")),
    },
    "pow" => match args {
      [x, y] => Ok(x.powf(*y)),
      _ => Err(arity_error(name, "2 arguments")),
    },
    "atan2" => match args {
      [y, x] => Ok(y.atan2(*x)),
      _ => Err(arity_error(name, "2 arguments")),
    },
    "nthroot" => match args {
      [x] => Ok(x.sqrt()),
      [x, n] => Ok(nth_root(*x, *n)),
      _ => Err(arity_error(name, "1 or 2 arguments")),
    },
    "gcd" | "lcm" => {
      if args.is_empty() {
        return Err(arity_error(name, "at least 1 argument"));
      }
      let mut acc = integer(args[0]);
      for &a in &args[1..] {
        acc = match (acc, integer(a)) {
          (Some(x), Some(y)) if name == "gcd" => Some(gcd(x, y)),
          (Some(0), Some(_)) | (Some(_), Some(0)) => Some(0),
          (Some(x), Some(y)) => {
            (x / gcd(x, y)).checked_mul(y).and_then(i64::checked_abs)
          }
          _ => None,
        };
      }
      Ok(acc.map(|v| v as f64).unwrap_or(f64::NAN))
    }
    "combinations" => match args {
      [n, k] => Ok(combinations(*n, *k)),
      _ => Err(arity_error(name, "2 arguments")),
    },
    "permutations" => match args {
      [n] => Ok(factorial(*n)),
      [n, k] => Ok(factorial(*n) / factorial(n - k)),
      _ => Err(arity_error(name, "1 or 2 arguments")),
    },
    "cumsum" => Err(RelationError::EvaluationError(
      "cumsum does not produce a single number".into(),
    )),
    _ if args.is_empty() => Err(arity_error(name, "at least 1 argument")),
    "max" => Ok(args.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
    "min" => Ok(args.iter().cloned().fold(f64::INFINITY, f64::min)),
    "sum" => Ok(args.iter().sum()),
    "prod" => Ok(args.iter().product()),
    "mean" => Ok(mean(args)),
    "median" => Ok(median(args)),
    "mode" => Ok(mode(args)),
    "variance" => Ok(variance(args)),
    "std" => Ok(variance(args).sqrt()),
    "mad" => {
      let m = median(args);
      let deviations: Vec<f64> = args.iter().map(|v| (v - m).abs()).collect();
      Ok(median(&deviations))
    }
    "norm" => Ok(args.iter().map(|v| v * v).sum::<f64>().sqrt()),
    _ => Err(arity_error(name, "a different number of arguments")),
  }
}

/// Largest magnitude at which every integer is exactly representable.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// `C(n, k)` with `min(k, n - k)` above this exceeds the f64 range.
const MAX_PRODUCT_TERMS: i64 = 1000;

fn integer(v: f64) -> Option<i64> {
  if v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER {
    Some(v as i64)
  } else {
    None
  }
}

fn gcd(a: i64, b: i64) -> i64 {
  let (mut a, mut b) = (a.abs(), b.abs());
  while b != 0 {
    (a, b) = (b, a % b);
  }
  a
}

fn nth_root(x: f64, n: f64) -> f64 {
  // odd roots of negative numbers stay real
  if x < 0.0 && integer(n).is_some_and(|k| k % 2 != 0) {
    -(-x).powf(1.0 / n)
  } else {
    x.powf(1.0 / n)
  }
}

fn factorial(x: f64) -> f64 {
  if x > numeric::MAXFACT {
    return f64::INFINITY;
  }
  match integer(x) {
    Some(n) if n < 0 => f64::NAN,
    Some(n) => (1..=n).fold(1.0, |acc, k| acc * k as f64),
    None => gamma(x + 1.0),
  }
}

fn combinations(n: f64, k: f64) -> f64 {
  match (integer(n), integer(k)) {
    (Some(n), Some(k)) if n >= 0 && k >= 0 && k <= n => {
      let k = k.min(n - k);
      if k > MAX_PRODUCT_TERMS {
        return f64::INFINITY;
      }
      (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
    }
    _ => f64::NAN,
  }
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
  0.999_999_999_999_809_9,
  676.520_368_121_885_1,
  -1_259.139_216_722_402_8,
  771.323_428_777_653_1,
  -176.615_029_162_140_6,
  12.507_343_278_686_905,
  -0.138_571_095_265_720_12,
  9.984_369_578_019_572e-6,
  1.505_632_735_149_311_6e-7,
];

/// Lanczos approximation (g = 7, n = 9).
fn gamma(x: f64) -> f64 {
  if x <= 0.0 && x.fract() == 0.0 {
    return f64::NAN;
  }
  if x < 0.5 {
    return numeric::PI / ((numeric::PI * x).sin() * gamma(1.0 - x));
  }
  let x = x - 1.0;
  let mut a = LANCZOS_COEFFICIENTS[0];
  let t = x + LANCZOS_G + 0.5;
  for (i, c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
    a += c / (x + i as f64);
  }
  numeric::SQRT2PI * t.powf(x + 0.5) * (-t).exp() * a
}

fn mean(values: &[f64]) -> f64 {
  values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
  let mut sorted = values.to_vec();
  sorted.sort_by(|a, b| a.total_cmp(b));
  let mid = sorted.len() / 2;
  if sorted.len() % 2 == 0 {
    (sorted[mid - 1] + sorted[mid]) / 2.0
  } else {
    sorted[mid]
  }
}

/// Most frequent value; ties go to the smallest.
fn mode(values: &[f64]) -> f64 {
  let mut sorted = values.to_vec();
  sorted.sort_by(|a, b| a.total_cmp(b));
  let mut best = (sorted[0], 0usize);
  let mut run = (sorted[0], 0usize);
  for &v in &sorted {
    if v == run.0 {
      run.1 += 1;
    } else {
      run = (v, 1);
    }
    if run.1 > best.1 {
      best = run;
    }
  }
  best.0
}

/// Sample variance (n - 1 denominator).
fn variance(values: &[f64]) -> f64 {
  if values.len() < 2 {
    return 0.0;
  }
  let m = mean(values);
  values.iter().map(|v| (v - m).powi(2)).sum::<f64>()
    / (values.len() - 1) as f64
}
