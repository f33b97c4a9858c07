// =============================================================================
// Dual-Axis Price / Volatility Chart — SVG
// =============================================================================
//
// Left axis:  adjusted close, solid blue line, light horizontal grid.
// Right axis: annualized volatility in percent, dashed red line.
// A dotted gray horizontal line marks the alert threshold on the right axis.
//
// Both series share one date-based x axis, so the volatility line starts
// `window - 1` trading days after the price line.
// =============================================================================

use chrono::NaiveDate;

use crate::api::escape_html;
use crate::pipeline::AnalysisReport;
use crate::runtime_config::ChartConfig;

const PRICE_COLOR: &str = "#1f77b4";
const VOL_COLOR: &str = "#d62728";
const THRESHOLD_COLOR: &str = "#808080";

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 80.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 50.0;

const Y_TICKS: usize = 5;
const X_TICKS: usize = 6;

/// Linear map from a data range onto a pixel range.
#[derive(Debug, Clone, Copy)]
struct Scale {
    lo: f64,
    hi: f64,
    px_lo: f64,
    px_hi: f64,
}

impl Scale {
    fn new(lo: f64, hi: f64, px_lo: f64, px_hi: f64) -> Self {
        // Degenerate ranges still need a visible span.
        let (lo, hi) = if (hi - lo).abs() < f64::EPSILON {
            (lo - 1.0, hi + 1.0)
        } else {
            (lo, hi)
        };
        Self { lo, hi, px_lo, px_hi }
    }

    fn map(&self, v: f64) -> f64 {
        self.px_lo + (v - self.lo) / (self.hi - self.lo) * (self.px_hi - self.px_lo)
    }

    fn ticks(&self, n: usize) -> Vec<f64> {
        if n < 2 {
            return vec![self.lo];
        }
        (0..n)
            .map(|i| self.lo + (self.hi - self.lo) * i as f64 / (n - 1) as f64)
            .collect()
    }
}

/// Date → x pixel, measured in calendar days from the first price date.
#[derive(Debug, Clone, Copy)]
struct DateScale {
    start: NaiveDate,
    inner: Scale,
}

impl DateScale {
    fn new(start: NaiveDate, end: NaiveDate, px_lo: f64, px_hi: f64) -> Self {
        let span = (end - start).num_days().max(1) as f64;
        Self {
            start,
            inner: Scale::new(0.0, span, px_lo, px_hi),
        }
    }

    fn map(&self, d: NaiveDate) -> f64 {
        self.inner.map((d - self.start).num_days() as f64)
    }
}

fn polyline(points: impl Iterator<Item = (f64, f64)>) -> String {
    points
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the report as a standalone SVG document.
pub fn render_svg(report: &AnalysisReport, chart: &ChartConfig) -> String {
    let width = chart.width as f64;
    let height = chart.height as f64;
    let left = MARGIN_LEFT;
    let right = width - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = height - MARGIN_BOTTOM;

    let prices = report.prices.points();
    let vols = report.volatility.points();
    let threshold = report.threshold_pct();

    // --- Scales ----------------------------------------------------------------
    let (first, last) = match (prices.first(), prices.last()) {
        (Some(f), Some(l)) => (f.date, l.date),
        _ => return empty_svg(chart),
    };
    let x = DateScale::new(first, last, left, right);

    let (p_min, p_max) = prices
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.price), hi.max(p.price))
        });
    let pad = (p_max - p_min) * 0.05;
    let price_y = Scale::new(p_min - pad, p_max + pad, bottom, top);

    let v_max = report.volatility.max_pct().unwrap_or(0.0).max(threshold) * 1.1;
    let vol_y = Scale::new(0.0, v_max.max(1.0), bottom, top);

    let mut svg = String::with_capacity(prices.len() * 24 + 4096);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" font-family="sans-serif" font-size="12" role="img">"#,
        w = chart.width,
        h = chart.height,
    ));
    svg.push_str(&format!(
        "<title>{} price vs. volatility regime</title>",
        escape_html(&report.request.ticker)
    ));
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#,
        chart.width, chart.height
    ));

    // --- Grid + left axis (price) ---------------------------------------------
    for t in price_y.ticks(Y_TICKS) {
        let y = price_y.map(t);
        svg.push_str(&format!(
            r##"<line x1="{left:.1}" y1="{y:.1}" x2="{right:.1}" y2="{y:.1}" stroke="#000" stroke-opacity="0.1"/>"##
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="{PRICE_COLOR}">{:.2}</text>"#,
            left - 6.0,
            y + 4.0,
            t
        ));
    }

    // --- Right axis (volatility %) --------------------------------------------
    for t in vol_y.ticks(Y_TICKS) {
        let y = vol_y.map(t);
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="start" fill="{VOL_COLOR}">{:.1}</text>"#,
            right + 6.0,
            y + 4.0,
            t
        ));
    }

    // --- X axis (dates) ----------------------------------------------------------
    let step = (prices.len().saturating_sub(1) / (X_TICKS - 1)).max(1);
    for p in prices.iter().step_by(step) {
        let px = x.map(p.date);
        svg.push_str(&format!(
            r##"<line x1="{px:.1}" y1="{top:.1}" x2="{px:.1}" y2="{bottom:.1}" stroke="#000" stroke-opacity="0.1"/>"##
        ));
        svg.push_str(&format!(
            r#"<text x="{px:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            bottom + 18.0,
            p.date.format("%Y-%m")
        ));
    }

    // Plot frame.
    svg.push_str(&format!(
        r##"<rect x="{left:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#444"/>"##,
        right - left,
        bottom - top
    ));

    // --- Series -------------------------------------------------------------------
    svg.push_str(&format!(
        r#"<polyline fill="none" stroke="{PRICE_COLOR}" stroke-width="1.5" points="{}"/>"#,
        polyline(prices.iter().map(|p| (x.map(p.date), price_y.map(p.price))))
    ));
    if !vols.is_empty() {
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{VOL_COLOR}" stroke-width="1.5" stroke-dasharray="6 4" points="{}"/>"#,
            polyline(vols.iter().map(|v| (x.map(v.date), vol_y.map(v.pct()))))
        ));
    }
    let ty = vol_y.map(threshold);
    svg.push_str(&format!(
        r#"<line x1="{left:.1}" y1="{ty:.1}" x2="{right:.1}" y2="{ty:.1}" stroke="{THRESHOLD_COLOR}" stroke-opacity="0.5" stroke-width="1.5" stroke-dasharray="2 3"/>"#
    ));

    // --- Axis titles ------------------------------------------------------------
    let mid_y = (top + bottom) / 2.0;
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">Date</text>"#,
        (left + right) / 2.0,
        height - 10.0
    ));
    svg.push_str(&format!(
        r#"<text transform="translate(18 {mid_y:.1}) rotate(-90)" text-anchor="middle" fill="{PRICE_COLOR}">Price ($)</text>"#
    ));
    svg.push_str(&format!(
        r#"<text transform="translate({:.1} {mid_y:.1}) rotate(90)" text-anchor="middle" fill="{VOL_COLOR}">Annualized Volatility (%)</text>"#,
        width - 18.0
    ));

    // --- Legend -----------------------------------------------------------------
    let entries = [
        (PRICE_COLOR, "", "Asset Price".to_string()),
        (VOL_COLOR, "6 4", "Volatility".to_string()),
        (THRESHOLD_COLOR, "2 3", format!("Threshold ({}%)", report.request.threshold.get())),
    ];
    let lx = left + 10.0;
    let mut ly = top + 16.0;
    svg.push_str(&format!(
        r##"<rect x="{:.1}" y="{:.1}" width="150" height="{}" fill="white" fill-opacity="0.8" stroke="#ccc"/>"##,
        lx - 6.0,
        top + 4.0,
        entries.len() * 18 + 6
    ));
    for (color, dash, label) in entries {
        svg.push_str(&format!(
            r#"<line x1="{lx:.1}" y1="{ly:.1}" x2="{:.1}" y2="{ly:.1}" stroke="{color}" stroke-width="2" stroke-dasharray="{dash}"/>"#,
            lx + 24.0
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}">{}</text>"#,
            lx + 30.0,
            ly + 4.0,
            escape_html(&label)
        ));
        ly += 18.0;
    }

    svg.push_str("</svg>");
    svg
}

fn empty_svg(chart: &ChartConfig) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}"></svg>"#,
        w = chart.width,
        h = chart.height
    )
}
