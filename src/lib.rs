use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

pub mod evaluator;
pub mod functions;
pub mod syntax;

pub use evaluator::{Compiled, compile};
pub use functions::classify::{Classification, RelationKind, classify};
pub use functions::implicit::{
  Domain, ImplicitTracer, PathPoint, Polyline, Trace, TraceOptions,
  TraceStats, trace_implicit,
};
pub use functions::interval::{Interval, Restriction, parse_restriction};
pub use functions::plot::{
  PieceKind, PlotObject, PlotOptions, PlotPiece, plot,
};
pub use functions::relation_eval::evaluate_relation;
pub use functions::surface::{Bounds, Surface, SuspendGuard};
pub use functions::svg::SvgSurface;

#[derive(Parser)]
#[grammar = "relation.pest"]
pub struct RelationParser;

#[derive(Error, Debug)]
pub enum RelationError {
  #[error("Parse error: {0}")]
  ParseError(#[from] Box<pest::error::Error<Rule>>),
  #[error("Empty input")]
  EmptyInput,
  #[error("Evaluation error: {0}")]
  EvaluationError(String),
  #[error("Unknown function: {0}")]
  UnknownFunction(String),
  #[error("Unbound variable: {0}")]
  UnboundVariable(String),
  #[error("Invalid bounds: {0}")]
  InvalidBounds(String),
  #[error("Cannot plot {0}")]
  Unplottable(String),
}

impl RelationParser {
  pub fn parse_relation(
    input: &str,
  ) -> Result<pest::iterators::Pairs<'_, Rule>, Box<pest::error::Error<Rule>>>
  {
    Self::parse(Rule::Relation, input).map_err(Box::new)
  }

  pub fn parse_formula(
    input: &str,
  ) -> Result<pest::iterators::Pairs<'_, Rule>, Box<pest::error::Error<Rule>>>
  {
    Self::parse(Rule::Formula, input).map_err(Box::new)
  }
}
