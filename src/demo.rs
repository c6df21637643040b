//! Built-in demonstration artifacts.
//!
//! Training happens offline in a separate pipeline; this module ships a
//! small hand-assembled ensemble over the same 40-column schema so the
//! service can be exercised without the real artifacts. The trees
//! reproduce the qualitative behavior of the trained model: low
//! first-period grades, high absence counts, and low study time push
//! toward risk.

use std::path::{Path, PathBuf};

use crate::error::{EarlywarnError, Result};
use crate::model::{GradientBoostedTrees, TreeNode};
use crate::schema::FeatureSchema;

/// The post-encoding column list of the student dataset: numeric columns
/// first, then one-hot columns with the first category dropped.
const DEMO_COLUMNS: [&str; 40] = [
    "age",
    "Medu",
    "Fedu",
    "traveltime",
    "studytime",
    "failures",
    "famrel",
    "freetime",
    "goout",
    "Dalc",
    "Walc",
    "health",
    "absences",
    "G1",
    "school_MS",
    "sex_M",
    "address_U",
    "famsize_LE3",
    "Pstatus_T",
    "Mjob_health",
    "Mjob_other",
    "Mjob_services",
    "Mjob_teacher",
    "Fjob_health",
    "Fjob_other",
    "Fjob_services",
    "Fjob_teacher",
    "reason_home",
    "reason_other",
    "reason_reputation",
    "guardian_mother",
    "guardian_other",
    "schoolsup_yes",
    "famsup_yes",
    "paid_yes",
    "activities_yes",
    "nursery_yes",
    "higher_yes",
    "internet_yes",
    "romantic_yes",
];

/// Schema matching the demonstration model.
pub fn demo_schema() -> Result<FeatureSchema> {
    FeatureSchema::new(DEMO_COLUMNS.iter().map(|c| c.to_string()).collect())
}

fn column(schema: &FeatureSchema, name: &str) -> Result<usize> {
    schema
        .position(name)
        .ok_or_else(|| EarlywarnError::Schema(format!("demo schema is missing column {name}")))
}

/// Demonstration ensemble over the demo schema.
pub fn demo_model(schema: &FeatureSchema) -> Result<GradientBoostedTrees> {
    let g1 = column(schema, "G1")?;
    let absences = column(schema, "absences")?;
    let studytime = column(schema, "studytime")?;
    let failures = column(schema, "failures")?;
    let goout = column(schema, "goout")?;
    let dalc = column(schema, "Dalc")?;
    let higher = column(schema, "higher_yes")?;

    let trees = vec![
        // First-period grade is the dominant signal.
        TreeNode::split(
            g1,
            9.5,
            0.0,
            TreeNode::split(g1, 6.5, 1.05, TreeNode::leaf(1.6), TreeNode::leaf(0.7)),
            TreeNode::split(g1, 13.5, -0.95, TreeNode::leaf(-0.5), TreeNode::leaf(-1.5)),
        ),
        // Absences escalate risk past two cut points.
        TreeNode::split(
            absences,
            7.5,
            0.0,
            TreeNode::leaf(-0.45),
            TreeNode::split(
                absences,
                15.5,
                0.75,
                TreeNode::leaf(0.45),
                TreeNode::leaf(1.15),
            ),
        ),
        // Minimal weekly study time is risky on its own; otherwise past
        // failures decide.
        TreeNode::split(
            studytime,
            1.5,
            0.0,
            TreeNode::leaf(0.8),
            TreeNode::split(
                failures,
                0.5,
                -0.25,
                TreeNode::leaf(-0.4),
                TreeNode::leaf(0.55),
            ),
        ),
        // Grade and absences interact.
        TreeNode::split(
            g1,
            11.5,
            0.05,
            TreeNode::split(
                absences,
                11.5,
                0.55,
                TreeNode::leaf(0.35),
                TreeNode::leaf(0.95),
            ),
            TreeNode::leaf(-0.65),
        ),
        // Not aiming for higher education is a standing risk factor.
        TreeNode::split(
            higher,
            0.5,
            0.1,
            TreeNode::leaf(0.5),
            TreeNode::split(g1, 8.5, -0.1, TreeNode::leaf(0.45), TreeNode::leaf(-0.35)),
        ),
        // Social habits carry a mild signal.
        TreeNode::split(
            goout,
            3.5,
            0.0,
            TreeNode::split(dalc, 2.5, -0.15, TreeNode::leaf(-0.25), TreeNode::leaf(0.3)),
            TreeNode::leaf(0.35),
        ),
    ];

    GradientBoostedTrees::new(0.0, 0.3, schema.len(), trees)
}

/// Write both demonstration artifacts into a directory and return their
/// paths as (model, columns).
pub fn write_demo_artifacts<P: AsRef<Path>>(dir: P) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let schema = demo_schema()?;
    let model = demo_model(&schema)?;

    let model_path = dir.join("risk_model.json");
    let schema_path = dir.join("model_columns.json");
    model.save(&model_path)?;
    schema.save(&schema_path)?;
    Ok((model_path, schema_path))
}
