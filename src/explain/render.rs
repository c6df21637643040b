//! Force-plot style rendering of an attribution into a base64 PNG.
//!
//! Rendering happens off-screen into an RGB buffer; nothing touches the
//! display server or the filesystem. Text uses an embedded font so the
//! output does not depend on host font configuration.

use std::io::Cursor;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use parking_lot::Mutex;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle, TextStyle};

use crate::error::{EarlywarnError, Result};
use crate::explain::attribution::{Attribution, FeatureContribution};
use crate::model::sigmoid;

static FONT_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();
const FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

fn register_embedded_font() -> Result<()> {
    let outcome = FONT_INIT.get_or_init(|| {
        register_font("sans-serif", FontStyle::Normal, FONT_BYTES)
            .map_err(|_| "embedded font rejected by text backend".to_string())
    });
    outcome.clone().map_err(EarlywarnError::Render)
}

fn render_err<E: std::fmt::Display>(e: E) -> EarlywarnError {
    EarlywarnError::Render(e.to_string())
}

/// Render settings for the explanation chart.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// How many features to show, picked by contribution magnitude
    pub max_features: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 400,
            max_features: 10,
        }
    }
}

/// Renders attributions as horizontal contribution bars.
///
/// Renders are serialized through an internal lock: a slow render queues
/// the next one instead of multiplying peak buffer memory. Scoring never
/// takes this lock.
pub struct ForcePlotRenderer {
    config: RenderConfig,
    render_lock: Mutex<()>,
}

impl ForcePlotRenderer {
    /// Create a renderer, registering the embedded font on first use.
    pub fn new(config: RenderConfig) -> Result<Self> {
        register_embedded_font()?;
        Ok(Self {
            config,
            render_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the attribution and return the PNG as standard base64.
    pub fn render(&self, attribution: &Attribution, probability: f64) -> Result<String> {
        let _guard = self.render_lock.lock();

        let RenderConfig { width, height, .. } = self.config;
        if width == 0 || height == 0 {
            return Err(EarlywarnError::Render(
                "render canvas has zero area".to_string(),
            ));
        }

        let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];
        self.draw_chart(&mut buffer, attribution, probability)?;

        let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            EarlywarnError::Render("rendered buffer does not match canvas size".to_string())
        })?;
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(render_err)?;
        Ok(STANDARD.encode(&png))
    }

    fn draw_chart(
        &self,
        buffer: &mut [u8],
        attribution: &Attribution,
        probability: f64,
    ) -> Result<()> {
        let RenderConfig { width, height, max_features } = self.config;

        let bars: Vec<&FeatureContribution> = attribution
            .sorted_contributions()
            .into_iter()
            .filter(|c| c.contribution != 0.0)
            .take(max_features)
            .collect();
        let rows = bars.len().max(1) as f64;

        let lo = bars.iter().map(|c| c.contribution).fold(0.0_f64, f64::min);
        let hi = bars.iter().map(|c| c.contribution).fold(0.0_f64, f64::max);
        let span = (hi - lo).max(1e-6);
        // Wide pad keeps the feature labels clear of the bars.
        let pad = span * 0.45;
        let (x_lo, x_hi) = (lo - pad, hi + pad);

        let root = BitMapBackend::with_buffer(buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let caption = format!(
            "Student risk {:.1}%  (baseline {:.1}%)",
            probability * 100.0,
            sigmoid(attribution.base_value) * 100.0
        );
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 18).into_font())
            .margin(12)
            .x_label_area_size(42)
            .y_label_area_size(10)
            .build_cartesian_2d(x_lo..x_hi, 0f64..rows)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(8)
            .y_labels(0)
            .x_desc("contribution to log-odds")
            .label_style(("sans-serif", 12))
            .axis_desc_style(("sans-serif", 13))
            .draw()
            .map_err(render_err)?;

        // Largest contribution on top; red pushes toward risk, blue away.
        chart
            .draw_series(bars.iter().enumerate().map(|(i, c)| {
                let y0 = (bars.len() - 1 - i) as f64 + 0.18;
                let y1 = (bars.len() - i) as f64 - 0.18;
                let color = if c.contribution > 0.0 { RED } else { BLUE };
                Rectangle::new([(0.0, y0), (c.contribution, y1)], color.mix(0.8).filled())
            }))
            .map_err(render_err)?;

        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(0.0, 0.0), (0.0, rows)],
                BLACK.stroke_width(1),
            )))
            .map_err(render_err)?;

        let label_font = TextStyle::from(("sans-serif", 13).into_font()).color(&BLACK);
        let anchor_right = label_font.pos(Pos::new(HPos::Right, VPos::Center));
        let anchor_left = label_font.pos(Pos::new(HPos::Left, VPos::Center));
        let offset = span * 0.02;
        chart
            .draw_series(bars.iter().enumerate().map(|(i, c)| {
                let y_mid = (bars.len() - 1 - i) as f64 + 0.5;
                let label = format!("{} = {}", c.feature_name, format_value(c.feature_value));
                if c.contribution > 0.0 {
                    Text::new(label, (-offset, y_mid), anchor_right.clone())
                } else {
                    Text::new(label, (offset, y_mid), anchor_left.clone())
                }
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1.0e9 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
