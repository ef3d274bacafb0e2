//! Command-line front end for slide layout conversion.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use slide_core::{DecodeOptions, GradientMode, SlideLayout};
use slide_markup::{TextEdit, Transpiler};
use slide_pptx::PptxDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Convert presentation slides to HTML and React components.
#[derive(Parser, Debug)]
#[command(name = "slide-convert")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a .pptx file to layout IR JSON
    Decode {
        /// Input presentation (.pptx)
        input: PathBuf,

        #[command(flatten)]
        assets: AssetArgs,

        /// Collapse gradients to their first stop
        #[arg(long)]
        flat_gradients: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render slides to HTML, one file per slide
    Render {
        /// Input presentation (.pptx) or layout IR (.json)
        input: PathBuf,

        #[command(flatten)]
        assets: AssetArgs,

        /// Output directory (default: stdout)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Transpile rendered HTML to a React component
    Transpile {
        /// Input HTML file
        input: PathBuf,

        /// Component name
        #[arg(short, long, default_value = "SlideLayout")]
        name: String,

        /// Stylesheet URL loaded by the component (repeatable)
        #[arg(long = "font")]
        fonts: Vec<String>,

        /// Extra path marker for user-supplied images (repeatable)
        #[arg(long = "user-content")]
        user_content: Vec<String>,
    },

    /// Apply selector edits from a JSON file to HTML
    Edit {
        /// Input HTML file
        input: PathBuf,

        /// JSON array of {selector, action, value}
        #[arg(short, long)]
        edits: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List editable text elements of an HTML file as JSON
    Extract {
        /// Input HTML file
        input: PathBuf,
    },

    /// Render the shapes of a slide layout
    Template {
        /// Input presentation (.pptx)
        input: PathBuf,

        /// Layout index, 0-based
        #[arg(short, long, default_value = "0")]
        layout: usize,

        /// Print the template as JSON instead of HTML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct AssetArgs {
    /// Directory for extracted images
    #[arg(short, long, default_value = "assets")]
    assets: PathBuf,

    /// URL prefix for extracted images
    #[arg(long, default_value = "/assets")]
    asset_prefix: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Command::Decode {
            input,
            assets,
            flat_gradients,
            output,
        } => {
            let mut options = DecodeOptions::new();
            if flat_gradients {
                options = options.with_gradient_mode(GradientMode::Flat);
            }
            let slides = decode_file(&input, &assets, options)?;
            let json = serde_json::to_string_pretty(&slides).context("Failed to serialize layout IR")?;
            emit(output.as_deref(), &json)
        }
        Command::Render {
            input,
            assets,
            output_dir,
        } => {
            let slides = load_slides(&input, &assets)?;
            for slide in &slides {
                let html = slide_markup::render(slide);
                match &output_dir {
                    Some(dir) => {
                        fs::create_dir_all(dir)
                            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
                        let path = dir.join(format!("slide_{}.html", slide.index));
                        write_output(&path, &html)?;
                        log::info!("Slide {} written to {}", slide.index, path.display());
                    }
                    None => println!("{}", html),
                }
            }
            Ok(())
        }
        Command::Transpile {
            input,
            name,
            fonts,
            user_content,
        } => {
            let markup = read_text(&input)?;
            let mut options = slide_markup::TranspileOptions::new();
            for marker in user_content {
                options = options.with_user_content_marker(marker);
            }
            let tsx = Transpiler::with_options(options)
                .transpile(&markup, &fonts, &name)
                .with_context(|| format!("Failed to transpile {}", input.display()))?;
            emit(None, &tsx)
        }
        Command::Edit {
            input,
            edits: edits_path,
            output,
        } => {
            let markup = read_text(&input)?;
            let edits: Vec<TextEdit> = serde_json::from_str(&read_text(&edits_path)?)
                .with_context(|| format!("Invalid edit list in {}", edits_path.display()))?;
            let edited = slide_markup::apply_edits(&markup, &edits)
                .with_context(|| format!("Failed to edit {}", input.display()))?;
            emit(output.as_deref(), &edited)
        }
        Command::Extract { input } => {
            let markup = read_text(&input)?;
            let elements = slide_markup::extract_editable_elements(&markup)
                .with_context(|| format!("Failed to scan {}", input.display()))?;
            emit(None, &serde_json::to_string_pretty(&elements)?)
        }
        Command::Template { input, layout, json } => {
            let file = File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?;
            let template = slide_pptx::extract_layout_template(BufReader::new(file), layout)
                .with_context(|| format!("Failed to read layout {} of {}", layout, input.display()))?;
            if json {
                emit(None, &serde_json::to_string_pretty(&template)?)
            } else {
                emit(None, &slide_markup::render_template(&template))
            }
        }
    }
}

fn decode_file(input: &Path, assets: &AssetArgs, options: DecodeOptions) -> Result<Vec<SlideLayout>> {
    log::debug!("Decoding {}", input.display());
    let slides = PptxDecoder::new()
        .with_options(options)
        .decode_file(input, &assets.assets, &assets.asset_prefix)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    log::debug!("Found {} slides", slides.len());
    Ok(slides)
}

/// Slides from a presentation, or from previously decoded IR when the input
/// is a `.json` file holding one slide or a list of them.
fn load_slides(input: &Path, assets: &AssetArgs) -> Result<Vec<SlideLayout>> {
    let is_json = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return decode_file(input, assets, DecodeOptions::new());
    }

    let json = read_text(input)?;
    let value: serde_json::Value =
        serde_json::from_str(&json).with_context(|| format!("Invalid JSON in {}", input.display()))?;
    let slides = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|slide| vec![slide])
    };
    slides.with_context(|| format!("Invalid layout IR in {}", input.display()))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write to `path`, or stdout when none is given.
fn emit(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => write_output(path, content),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
