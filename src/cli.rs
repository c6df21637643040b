//! Earlywarn CLI Module
//!
//! Command-line interface for serving, one-off scoring, and artifact
//! inspection.

use std::path::{Path, PathBuf};
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use colored::*;

use crate::demo;
use crate::model::{sigmoid, GradientBoostedTrees};
use crate::pipeline::RiskPipeline;
use crate::schema::FeatureSchema;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 50; // box inner width

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn line_box_top() {
    println!("  {}", dim(&format!("┌{}┐", "─".repeat(W + 3))));
}
fn line_box_bottom() {
    println!("  {}", dim(&format!("└{}┘", "─".repeat(W + 3))));
}

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!(
        "  {}  {}{}{} {}",
        dim("│"),
        " ".repeat(left),
        content,
        " ".repeat(right),
        dim("│")
    );
}

fn line_box_empty() {
    line_box("");
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
            continue;
        }
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(48)));
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "earlywarn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Student academic risk scoring with per-prediction explanations")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the prediction server
    Serve {
        /// Server port
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Model artifact
        #[arg(long, default_value = "risk_model.json")]
        model: PathBuf,

        /// Training-time column list artifact
        #[arg(long, default_value = "model_columns.json")]
        schema: PathBuf,
    },

    /// Score one student from the command line
    Predict {
        /// Model artifact
        #[arg(long, default_value = "risk_model.json")]
        model: PathBuf,

        /// Training-time column list artifact
        #[arg(long, default_value = "model_columns.json")]
        schema: PathBuf,

        /// First-period grade (0-20)
        #[arg(long)]
        g1: i64,

        /// Number of absences
        #[arg(long)]
        absences: i64,

        /// Weekly study time band (1-4)
        #[arg(long)]
        studytime: i64,

        /// Write the explanation chart PNG to this path
        #[arg(long)]
        image_out: Option<PathBuf>,
    },

    /// Show the shape of a model and column artifact pair
    Inspect {
        /// Model artifact
        #[arg(long, default_value = "risk_model.json")]
        model: PathBuf,

        /// Training-time column list artifact
        #[arg(long, default_value = "model_columns.json")]
        schema: PathBuf,
    },

    /// Write demonstration artifacts for trying the service out
    Demo {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_serve(
    host: &str,
    port: u16,
    model: &Path,
    schema: &Path,
) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Earlywarn".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box(&kv("Predict ", &format!("http://{}:{}/predict", host, port)));
    line_box(&kv("Health  ", &format!("http://{}:{}/health", host, port)));
    line_box(&kv("Model   ", &model.display().to_string()));
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig {
        host: host.to_string(),
        port,
        model_path: model.to_path_buf(),
        schema_path: schema.to_path_buf(),
    };
    run_server(config).await
}

pub fn cmd_predict(
    model_path: &Path,
    schema_path: &Path,
    g1: i64,
    absences: i64,
    studytime: i64,
    image_out: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading artifacts");
    let start = Instant::now();
    let pipeline = RiskPipeline::load(model_path, schema_path)?;
    step_done(&format!(
        "{} columns, {} trees in {:?}",
        pipeline.schema().len(),
        pipeline.model().n_trees(),
        start.elapsed()
    ));

    let prediction = pipeline.predict(g1, absences, studytime)?;

    let label = match prediction.label {
        crate::scorer::RiskLabel::HighRisk => prediction.label.as_str().red().bold(),
        crate::scorer::RiskLabel::Safe => prediction.label.as_str().green().bold(),
    };
    println!();
    println!(
        "  {:<14} {}",
        muted("Risk score"),
        format!("{:.3}", prediction.probability).white().bold()
    );
    println!("  {:<14} {}", muted("Label"), label);

    match prediction.explanation.attribution() {
        Some(attribution) => {
            println!(
                "  {:<14} {}",
                muted("Baseline"),
                format!("{:.3}", sigmoid(attribution.base_value)).white()
            );
            println!();
            println!("  {}", muted("Top factors"));
            for c in attribution.top_k_contributors(5) {
                if c.contribution == 0.0 {
                    continue;
                }
                let arrow = if c.contribution > 0.0 {
                    "▲".red()
                } else {
                    "▼".green()
                };
                println!(
                    "    {} {:<22} {}",
                    arrow,
                    format!("{} = {}", c.feature_name, c.feature_value),
                    dim(&format!("{:+.3}", c.contribution))
                );
            }
        }
        None => {
            println!("  {}", dim("explanation unavailable for this prediction"));
        }
    }

    if let Some(out) = image_out {
        match prediction.explanation.image_base64() {
            "" => println!("  {}", dim("no chart rendered, skipping image output")),
            encoded => {
                let png = STANDARD.decode(encoded)?;
                std::fs::write(out, png)?;
                step_ok(&format!("Chart written to {}", out.display()));
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_inspect(model_path: &Path, schema_path: &Path) -> anyhow::Result<()> {
    section("Inspect");

    let schema = FeatureSchema::load(schema_path)?;
    let model = GradientBoostedTrees::load(model_path)?;

    println!("  {:<16} {}", muted("Columns"), schema.len());
    println!("  {:<16} {}", muted("Trees"), model.n_trees());
    println!("  {:<16} {}", muted("Base score"), model.base_score());
    println!("  {:<16} {}", muted("Learning rate"), model.learning_rate());
    println!(
        "  {:<16} {}",
        muted("Baseline prob"),
        format!("{:.3}", sigmoid(model.expected_margin()))
    );
    if model.n_features() != schema.len() {
        println!(
            "  {} {}",
            "✗".red(),
            format!(
                "artifact mismatch: model expects {} features, schema lists {}",
                model.n_features(),
                schema.len()
            )
        );
    } else {
        step_ok("Artifact pair is consistent");
    }

    println!();
    println!("  {}", muted("Tree shapes"));
    for (i, tree) in model.trees().iter().enumerate() {
        println!(
            "    {}",
            dim(&format!(
                "tree {:<3} depth {:<3} leaves {}",
                i,
                tree.depth(),
                tree.leaf_count()
            ))
        );
    }

    println!();
    Ok(())
}

pub fn cmd_demo(out: &Path) -> anyhow::Result<()> {
    section("Demo artifacts");

    step_run("Writing model and column list");
    let (model_path, schema_path) = demo::write_demo_artifacts(out)?;
    step_done("");
    step_ok(&format!("{}", model_path.display()));
    step_ok(&format!("{}", schema_path.display()));

    println!();
    println!(
        "  {}",
        dim(&format!(
            "try: earlywarn serve --model {} --schema {}",
            model_path.display(),
            schema_path.display()
        ))
    );
    println!();
    Ok(())
}
