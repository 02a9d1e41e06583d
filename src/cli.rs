use crate::config::{Config, load_config};
use crate::export::export_svg;
use crate::import::{build_model, parse_parameter_table};
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use crate::model::CoefficientDisplay;
use crate::project::{load_project_if_exists, save_project};
use crate::render::{render_view, write_output_svg};
use crate::text_metrics::FontMeasure;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "semd", version, about = "SEM path diagram layout and rendering")]
pub struct Args {
    /// Parameter table (JSON array of rows) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Saved project; positions and connector edits are reused when it exists
    #[arg(short = 'p', long = "project")]
    pub project: Option<PathBuf>,

    /// Write the laid-out model as a project file
    #[arg(long = "save-project")]
    pub save_project: Option<PathBuf>,

    /// Output file (svg/png/pdf). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Interactive viewport or a page cropped to the diagram
    #[arg(short = 'm', long = "mode", value_enum, default_value = "document")]
    pub mode: Mode,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Viewport width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Viewport height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Seed for the initial scatter of new nodes
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Coefficient label style
    #[arg(long = "coeff", value_enum)]
    pub coeff: Option<CoeffArg>,

    /// Also draw connectors the estimator added
    #[arg(long = "view-generated")]
    pub view_generated: bool,

    /// Write a JSON dump of the resolved layout
    #[arg(long = "dump")]
    pub dump: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Pdf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Document,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoeffArg {
    None,
    Value,
    Interval,
    Star,
}

impl From<CoeffArg> for CoefficientDisplay {
    fn from(arg: CoeffArg) -> Self {
        match arg {
            CoeffArg::None => Self::None,
            CoeffArg::Value => Self::Value,
            CoeffArg::Interval => Self::Interval,
            CoeffArg::Star => Self::Star,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = resolve_config(&args)?;
    let input = read_input(args.input.as_deref())?;
    let rows = parse_parameter_table(&input)?;
    let prior = match args.project.as_deref() {
        Some(path) => load_project_if_exists(path)?,
        None => None,
    };

    let mut model = build_model(&rows, prior, &config.layout)?;
    if args.view_generated {
        model.set_view_generated(true);
    }
    let measure = FontMeasure::new(config.theme.font_family.clone());
    let layout = compute_layout(&mut model, &measure, &config.layout);

    if let Some(path) = args.save_project.as_deref() {
        save_project(&model, path)?;
    }
    if let Some(path) = args.dump.as_deref() {
        write_layout_dump(path, &layout)?;
    }

    let svg = match args.mode {
        Mode::View => render_view(&layout, &config.theme, &config.render),
        Mode::Document => export_svg(&layout, &config.theme, &config.export),
    };
    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref()),
        OutputFormat::Png => write_png(&svg, &ensure_output(&args.output, "png")?, &config),
        OutputFormat::Pdf => write_pdf(&svg, &ensure_output(&args.output, "pdf")?),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if let Some(seed) = args.seed {
        config.layout.force.seed = seed;
    }
    if let Some(coeff) = args.coeff {
        config.layout.coeff_display = Some(coeff.into());
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path.filter(|p| *p != Path::new("-")) {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

#[cfg(feature = "pdf")]
fn write_pdf(svg: &str, output: &Path) -> Result<()> {
    let pdf = crate::export::svg_to_pdf(svg)?;
    std::fs::write(output, pdf)?;
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn write_pdf(_svg: &str, _output: &Path) -> Result<()> {
    Err(anyhow::anyhow!("PDF output requires the `pdf` feature"))
}
