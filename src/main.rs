use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use env_logger::Env;
use serde_json::json;

use relplot::functions::classify::convert_implicit_equation;
use relplot::functions::interval::{
  get_endpoints, lower_bound_closed, upper_bound_closed,
};
use relplot::{
  Bounds, Domain, PlotOptions, Restriction, SvgSurface, TraceOptions,
  classify, compile, evaluate_relation, parse_restriction, plot,
};

/// Parse, classify and draw relations such as `y = 2x+5 (-2,5]`
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(clap::Args, Debug)]
struct View {
  #[arg(long, default_value_t = -10.0, allow_negative_numbers = true)]
  xmin: f64,
  #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
  xmax: f64,
  #[arg(long, default_value_t = -10.0, allow_negative_numbers = true)]
  ymin: f64,
  #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
  ymax: f64,
  /// Canvas width in pixels
  #[arg(long, default_value_t = 360)]
  width: u32,
  /// Canvas height in pixels
  #[arg(long, default_value_t = 360)]
  height: u32,
}

impl View {
  fn bounds(&self) -> Bounds {
    Bounds::new(self.xmin, self.xmax, self.ymin, self.ymax)
  }
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Print how a relation would be drawn
  Classify { relation: String },
  /// Split a relation into its expression and domain restriction
  Restrict { relation: String },
  /// Evaluate a (possibly piecewise) relation at one point
  Eval {
    relation: String,
    #[arg(allow_negative_numbers = true)]
    x: f64,
    #[arg(long, default_value = "x")]
    variable: String,
  },
  /// Render a relation to SVG
  Plot {
    relation: String,
    #[command(flatten)]
    view: View,
    #[arg(long, default_value = "blue")]
    color: String,
    #[arg(long, default_value_t = 2.0)]
    line_width: f64,
    #[arg(long)]
    dashed: bool,
    #[arg(long, default_value_t = 0.01)]
    density: f64,
    #[arg(long)]
    fast: bool,
    /// Write the SVG here instead of stdout
    #[arg(short, long)]
    output: Option<std::path::PathBuf>,
    /// Print the scene as JSON instead of SVG
    #[arg(long)]
    json: bool,
  },
  /// Print the contour polylines of an equation such as `x^2+y^2=1`
  Trace {
    equation: String,
    #[command(flatten)]
    view: View,
    #[arg(long)]
    fast: bool,
    #[arg(long)]
    json: bool,
  },
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
    .init();
  let cli = Cli::parse();

  match cli.command {
    Commands::Classify { relation } => {
      let c = classify(&relation);
      println!("kind: {}", c.kind);
      println!("variable: {}", c.variable.as_deref().unwrap_or("-"));
      println!("target: {}", c.target_name.as_deref().unwrap_or("-"));
      println!("free variables: {}", c.free_variables.join(", "));
    }
    Commands::Restrict { relation } => {
      let (expression, restriction) = parse_restriction(&relation);
      println!("expression: {expression}");
      match restriction {
        Restriction::Unrestricted => println!("restriction: none"),
        Restriction::Interval(interval) => {
          let text = relplot::functions::interval::get_interval(&relation);
          let (lower, upper) = get_endpoints(text);
          println!("restriction: {text}");
          println!(
            "lower: {lower} ({})",
            if lower_bound_closed(text) { "closed" } else { "open" }
          );
          println!(
            "upper: {upper} ({})",
            if upper_bound_closed(text) { "closed" } else { "open" }
          );
          if interval.is_empty() {
            println!("warning: the interval is empty");
          }
        }
        Restriction::Hole { variable, value } => {
          println!("restriction: {variable} != {value}")
        }
      }
    }
    Commands::Eval {
      relation,
      x,
      variable,
    } => {
      println!("{}", evaluate_relation(&relation, x, &variable));
    }
    Commands::Plot {
      relation,
      view,
      color,
      line_width,
      dashed,
      density,
      fast,
      output,
      json,
    } => {
      let mut surface = SvgSurface::new(view.bounds(), view.width, view.height);
      let options = PlotOptions {
        color,
        width: line_width,
        dashed,
        density,
        fast,
        ..PlotOptions::default()
      };
      let object = plot(&mut surface, &relation, &options)
        .with_context(|| format!("cannot plot {relation:?}"))?;
      for warning in object.warnings() {
        eprintln!("warning: {warning}");
      }
      let rendered = if json {
        serde_json::to_string_pretty(&surface.to_json())?
      } else {
        surface.to_svg()
      };
      match output {
        Some(path) => std::fs::write(&path, rendered)
          .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{rendered}"),
      }
    }
    Commands::Trace {
      equation,
      view,
      fast,
      json,
    } => {
      let zero_form = convert_implicit_equation(&equation);
      let compiled = compile(&zero_form)
        .with_context(|| format!("cannot parse {equation:?}"))?;
      let b = view.bounds();
      let domain = Domain::new(b.xmin, b.xmax, b.ymin, b.ymax);
      let options = TraceOptions {
        resolution: (view.width, view.height),
        fast,
      };
      let trace = relplot::ImplicitTracer::new().trace(
        |x, y| compiled.eval_or_nan(&[("x", x), ("y", y)]),
        &domain,
        &options,
      )?;
      let polylines = trace.polylines();
      if polylines.is_empty() {
        bail!("no contour of {equation:?} in view");
      }
      if json {
        println!("{}", json!({ "equation": equation, "polylines": polylines }));
      } else {
        for line in polylines {
          let coords: Vec<String> =
            line.iter().map(|(x, y)| format!("{x:.4},{y:.4}")).collect();
          println!("{}", coords.join(" "));
        }
      }
    }
  }
  Ok(())
}
