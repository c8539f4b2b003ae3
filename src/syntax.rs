use pest::iterators::Pair;

use crate::{RelationError, RelationParser, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
  Plus,
  Minus,
  Times,
  Divide,
  Power,
}

impl BinaryOperator {
  fn precedence(self) -> u8 {
    match self {
      Self::Plus | Self::Minus => 1,
      Self::Times | Self::Divide => 2,
      Self::Power => 4,
    }
  }

  fn symbol(self) -> &'static str {
    match self {
      Self::Plus => "+",
      Self::Minus => "-",
      Self::Times => "*",
      Self::Divide => "/",
      Self::Power => "^",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
  Plus,
  Minus,
  Factorial,
}

/// Algebraic expression tree produced by the `Expression` grammar rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Number(f64),
  Identifier(String),
  UnaryOp {
    op: UnaryOperator,
    operand: Box<Expr>,
  },
  BinaryOp {
    op: BinaryOperator,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  FunctionCall {
    name: String,
    args: Vec<Expr>,
  },
}

/// The structural forms a relation string can take once its domain
/// restriction has been removed.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
  /// `2x + 5`
  Expression(Expr),
  /// `y = 2x + 5`
  Assignment { name: String, body: Expr },
  /// `f(x) = 2x + 5`
  FunctionAssignment {
    name: String,
    params: Vec<String>,
    body: Expr,
  },
  /// `x^2 + y^2 = 4`
  Equation { left: Expr, right: Expr },
  /// `<cos(t), sin(t)>`
  Parametric { x: Expr, y: Expr },
}

impl Relation {
  /// Name on the left of `=` for assignments, `None` otherwise.
  pub fn target_name(&self) -> Option<&str> {
    match self {
      Relation::Assignment { name, .. }
      | Relation::FunctionAssignment { name, .. } => Some(name),
      _ => None,
    }
  }

  /// The expressions whose identifiers are the relation's free variables.
  pub fn bodies(&self) -> Vec<&Expr> {
    match self {
      Relation::Expression(body)
      | Relation::Assignment { body, .. }
      | Relation::FunctionAssignment { body, .. } => vec![body],
      Relation::Equation { left, right } => vec![left, right],
      Relation::Parametric { x, y } => vec![x, y],
    }
  }
}

/// Parse a bare algebraic expression.
pub fn parse_expression(input: &str) -> Result<Expr, RelationError> {
  if input.trim().is_empty() {
    return Err(RelationError::EmptyInput);
  }
  let mut pairs = RelationParser::parse_formula(input)?;
  let formula = pairs.next().ok_or(RelationError::EmptyInput)?;
  let expression = formula
    .into_inner()
    .find(|p| p.as_rule() == Rule::Expression)
    .ok_or(RelationError::EmptyInput)?;
  build_expr(expression)
}

/// Parse a relation (no domain restriction attached).
pub fn parse_relation(input: &str) -> Result<Relation, RelationError> {
  if input.trim().is_empty() {
    return Err(RelationError::EmptyInput);
  }
  let mut pairs = RelationParser::parse_relation(input)?;
  let relation = pairs.next().ok_or(RelationError::EmptyInput)?;
  let form = relation
    .into_inner()
    .find(|p| p.as_rule() != Rule::EOI)
    .ok_or(RelationError::EmptyInput)?;

  match form.as_rule() {
    Rule::Expression => Ok(Relation::Expression(build_expr(form)?)),
    Rule::Assignment => {
      let mut inner = form.into_inner();
      let name = next_pair(&mut inner)?.as_str().to_string();
      let body = build_expr(next_pair(&mut inner)?)?;
      Ok(Relation::Assignment { name, body })
    }
    Rule::FunctionAssignment => {
      let mut inner = form.into_inner();
      let name = next_pair(&mut inner)?.as_str().to_string();
      let params = next_pair(&mut inner)?
        .into_inner()
        .map(|p| p.as_str().to_string())
        .collect();
      let body = build_expr(next_pair(&mut inner)?)?;
      Ok(Relation::FunctionAssignment { name, params, body })
    }
    Rule::Equation => {
      let mut inner = form.into_inner();
      let left = build_expr(next_pair(&mut inner)?)?;
      let right = build_expr(next_pair(&mut inner)?)?;
      Ok(Relation::Equation { left, right })
    }
    Rule::Parametric => {
      let mut inner = form.into_inner();
      let x = build_expr(next_pair(&mut inner)?)?;
      let y = build_expr(next_pair(&mut inner)?)?;
      Ok(Relation::Parametric { x, y })
    }
    other => Err(RelationError::EvaluationError(format!(
      "unexpected relation form {other:?}"
    ))),
  }
}

fn next_pair<'a>(
  pairs: &mut pest::iterators::Pairs<'a, Rule>,
) -> Result<Pair<'a, Rule>, RelationError> {
  pairs.next().ok_or_else(|| {
    RelationError::EvaluationError("truncated parse tree".into())
  })
}

/// Convert a pest pair from the expression rules into an `Expr`.
fn build_expr(pair: Pair<Rule>) -> Result<Expr, RelationError> {
  match pair.as_rule() {
    Rule::Expression | Rule::Group => {
      build_expr(next_pair(&mut pair.into_inner())?)
    }
    Rule::Sum => {
      let mut inner = pair.into_inner();
      let mut acc = build_expr(next_pair(&mut inner)?)?;
      while let Some(op) = inner.next() {
        let op = if op.as_str() == "-" {
          BinaryOperator::Minus
        } else {
          BinaryOperator::Plus
        };
        let right = build_expr(next_pair(&mut inner)?)?;
        acc = binary(op, acc, right);
      }
      Ok(acc)
    }
    Rule::Product => {
      let mut inner = pair.into_inner();
      let mut acc = build_expr(next_pair(&mut inner)?)?;
      while let Some(next) = inner.next() {
        if next.as_rule() == Rule::MulOp {
          let op = if next.as_str() == "/" {
            BinaryOperator::Divide
          } else {
            BinaryOperator::Times
          };
          let right = build_expr(next_pair(&mut inner)?)?;
          acc = binary(op, acc, right);
        } else {
          // implicit multiplication
          acc = binary(BinaryOperator::Times, acc, build_expr(next)?);
        }
      }
      Ok(acc)
    }
    Rule::Unary => {
      let mut inner = pair.into_inner();
      let first = next_pair(&mut inner)?;
      if first.as_rule() == Rule::Sign {
        let op = if first.as_str() == "-" {
          UnaryOperator::Minus
        } else {
          UnaryOperator::Plus
        };
        let operand = build_expr(next_pair(&mut inner)?)?;
        Ok(Expr::UnaryOp {
          op,
          operand: Box::new(operand),
        })
      } else {
        build_expr(first)
      }
    }
    Rule::Power => {
      let mut inner = pair.into_inner();
      let base = build_expr(next_pair(&mut inner)?)?;
      match inner.next() {
        Some(exponent) => {
          Ok(binary(BinaryOperator::Power, base, build_expr(exponent)?))
        }
        None => Ok(base),
      }
    }
    Rule::Postfix => {
      let mut inner = pair.into_inner();
      let mut acc = build_expr(next_pair(&mut inner)?)?;
      for _ in inner {
        acc = Expr::UnaryOp {
          op: UnaryOperator::Factorial,
          operand: Box::new(acc),
        };
      }
      Ok(acc)
    }
    Rule::Call => {
      let mut inner = pair.into_inner();
      let name = next_pair(&mut inner)?.as_str().to_string();
      let args = inner.map(build_expr).collect::<Result<Vec<_>, _>>()?;
      Ok(Expr::FunctionCall { name, args })
    }
    Rule::Identifier => Ok(Expr::Identifier(pair.as_str().to_string())),
    Rule::Number => {
      let text = pair.as_str();
      text.parse::<f64>().map(Expr::Number).map_err(|_| {
        RelationError::EvaluationError(format!("Invalid number {text}"))
      })
    }
    other => Err(RelationError::EvaluationError(format!(
      "unexpected expression node {other:?}"
    ))),
  }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
  Expr::BinaryOp {
    op,
    left: Box::new(left),
    right: Box::new(right),
  }
}

impl Expr {
  /// Visit every identifier in source order. Function-call names are
  /// reported through `on_call` so the caller can decide whether they are
  /// known functions or implicit products such as `x(x+1)`.
  pub fn walk_symbols<'a>(
    &'a self,
    on_identifier: &mut dyn FnMut(&'a str),
    on_call: &mut dyn FnMut(&'a str, usize),
  ) {
    match self {
      Expr::Number(_) => {}
      Expr::Identifier(name) => on_identifier(name),
      Expr::UnaryOp { operand, .. } => {
        operand.walk_symbols(on_identifier, on_call)
      }
      Expr::BinaryOp { left, right, .. } => {
        left.walk_symbols(on_identifier, on_call);
        right.walk_symbols(on_identifier, on_call);
      }
      Expr::FunctionCall { name, args } => {
        on_call(name, args.len());
        for arg in args {
          arg.walk_symbols(on_identifier, on_call);
        }
      }
    }
  }

  fn precedence(&self) -> u8 {
    match self {
      Expr::BinaryOp { op, .. } => op.precedence(),
      Expr::UnaryOp {
        op: UnaryOperator::Factorial,
        ..
      } => 5,
      Expr::UnaryOp { .. } => 3,
      _ => 6,
    }
  }
}

impl std::fmt::Display for Expr {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let wrap = |f: &mut std::fmt::Formatter<'_>, e: &Expr, min: u8| {
      if e.precedence() < min {
        write!(f, "({e})")
      } else {
        write!(f, "{e}")
      }
    };
    match self {
      Expr::Number(n) => {
        if n.fract() == 0.0 && n.abs() < 1e15 {
          write!(f, "{}", *n as i64)
        } else {
          write!(f, "{n}")
        }
      }
      Expr::Identifier(name) => write!(f, "{name}"),
      Expr::UnaryOp { op, operand } => match op {
        UnaryOperator::Minus => {
          write!(f, "-")?;
          wrap(f, operand, 3)
        }
        UnaryOperator::Plus => {
          write!(f, "+")?;
          wrap(f, operand, 3)
        }
        UnaryOperator::Factorial => {
          wrap(f, operand, 6)?;
          write!(f, "!")
        }
      },
      Expr::BinaryOp { op, left, right } => {
        let p = op.precedence();
        match op {
          // right-associative
          BinaryOperator::Power => {
            wrap(f, left, p + 1)?;
            write!(f, "^")?;
            wrap(f, right, 3)
          }
          _ => {
            wrap(f, left, p)?;
            write!(f, "{}", op.symbol())?;
            wrap(f, right, p + 1)
          }
        }
      }
      Expr::FunctionCall { name, args } => {
        write!(f, "{name}(")?;
        for (i, arg) in args.iter().enumerate() {
          if i > 0 {
            write!(f, ",")?;
          }
          write!(f, "{arg}")?;
        }
        write!(f, ")")
      }
    }
  }
}
