use anyhow::Result;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::types::ComparativeStat;

// Matplotlib's default cycle, so charts stay visually comparable with
// earlier report generations.
const PALETTE: [RGBColor; 4] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
];

const DISPLAY_ORDER: [&str; 4] = ["REST", "SOAP", "GraphQL", "gRPC"];

/// Trend chart for one technology: the load axis is a discrete ordered
/// category axis with one tick per observed load level.
fn line_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    loads: &[u64],
    values: &[f64],
) -> Result<()> {
    let root = SVGBackend::new(path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = values.iter().copied().fold(0.0_f64, f64::max).max(1e-9) * 1.15;
    let x_range = -0.5_f64..(loads.len() as f64 - 0.5);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(64)
        .build_cartesian_2d(x_range, 0.0_f64..y_max)?;

    let labels = loads.to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(loads.len())
        .x_label_formatter(&move |x| category_label(*x, labels.len()).map_or_else(String::new, |i| labels[i].to_string()))
        .x_desc("simulated users")
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(LineSeries::new(
        values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
        PALETTE[0].stroke_width(2),
    ))?;
    chart.draw_series(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Circle::new((i as f64, *v), 4, PALETTE[0].filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Index of the category whose tick sits at continuous coordinate `x`.
fn category_label(x: f64, categories: usize) -> Option<usize> {
    let idx = x.round();
    if (x - idx).abs() > 0.01 || idx < 0.0 || idx >= categories as f64 {
        return None;
    }
    Some(idx as usize)
}

/// Grouped comparison: technology on the category axis, one bar per load
/// level within each cluster.
fn grouped_bar_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    techs: &[String],
    loads: &[u64],
    value: impl Fn(usize, usize) -> Option<f64>,
) -> Result<()> {
    let root = SVGBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut y_max = 0.0_f64;
    for ti in 0..techs.len() {
        for li in 0..loads.len() {
            if let Some(v) = value(ti, li) {
                y_max = y_max.max(v);
            }
        }
    }
    let y_max = y_max.max(1e-9) * 1.15;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(64)
        .build_cartesian_2d(-0.5_f64..(techs.len() as f64 - 0.5), 0.0_f64..y_max)?;

    let labels = techs.to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(techs.len())
        .x_label_formatter(&move |x| category_label(*x, labels.len()).map_or_else(String::new, |i| labels[i].clone()))
        .y_desc(y_desc)
        .draw()?;

    let cluster = 0.8_f64;
    let bar = cluster / loads.len() as f64;

    for (li, load) in loads.iter().enumerate() {
        let color = PALETTE[li % PALETTE.len()];
        chart
            .draw_series((0..techs.len()).filter_map(|ti| {
                let v = value(ti, li)?;
                let x0 = ti as f64 - cluster / 2.0 + li as f64 * bar;
                Some(Rectangle::new([(x0, 0.0), (x0 + bar * 0.9, v)], color.filled()))
            }))?
            .label(format!("{load} users"))
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
            });
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Renders the full artifact set and returns the written paths.
pub(crate) fn render_all(stats: &[ComparativeStat], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    // Per-technology trends across load levels.
    let mut tokens: Vec<(String, String)> = Vec::new();
    for s in stats {
        if !tokens.iter().any(|(t, _)| t == &s.tech_token) {
            tokens.push((s.tech_token.clone(), s.tech.clone()));
        }
    }

    for (token, label) in &tokens {
        let mut rows: Vec<&ComparativeStat> =
            stats.iter().filter(|s| &s.tech_token == token).collect();
        rows.sort_by_key(|s| s.load);

        let loads: Vec<u64> = rows.iter().map(|s| s.load).collect();
        let charts: [(&str, &str, Vec<f64>); 3] = [
            (
                "avg_latency",
                "average latency (ms)",
                rows.iter().map(|s| s.avg_ms).collect(),
            ),
            (
                "p95_latency",
                "p95 latency (ms)",
                rows.iter().map(|s| s.p95_ms).collect(),
            ),
            ("rps", "requests per second", rows.iter().map(|s| s.rps).collect()),
        ];

        for (suffix, y_desc, values) in charts {
            let path = out_dir.join(format!("{token}_{suffix}.svg"));
            line_chart(
                &path,
                &format!("{y_desc} - {label}"),
                y_desc,
                &loads,
                &values,
            )?;
            written.push(path);
        }
    }

    // Cross-technology comparisons, one bar cluster per load level.
    let techs: Vec<String> = DISPLAY_ORDER
        .iter()
        .filter(|label| stats.iter().any(|s| &s.tech == *label))
        .map(|label| label.to_string())
        .chain(
            tokens
                .iter()
                .filter(|(_, label)| !DISPLAY_ORDER.contains(&label.as_str()))
                .map(|(_, label)| label.clone()),
        )
        .collect();

    let mut loads: Vec<u64> = stats.iter().map(|s| s.load).collect();
    loads.sort_unstable();
    loads.dedup();

    let lookup = |metric: fn(&ComparativeStat) -> f64| {
        let stats = stats.to_vec();
        let techs = techs.clone();
        let loads = loads.clone();
        move |ti: usize, li: usize| -> Option<f64> {
            stats
                .iter()
                .find(|s| s.tech == techs[ti] && s.load == loads[li])
                .map(metric)
        }
    };

    let comparisons: [(&str, &str, fn(&ComparativeStat) -> f64); 3] = [
        ("compare_avg_latency", "average latency (ms)", |s| s.avg_ms),
        ("compare_p95_latency", "p95 latency (ms)", |s| s.p95_ms),
        ("compare_rps", "requests per second", |s| s.rps),
    ];

    for (name, y_desc, metric) in comparisons {
        let path = out_dir.join(format!("{name}.svg"));
        grouped_bar_chart(
            &path,
            &format!("{y_desc} by technology and load"),
            y_desc,
            &techs,
            &loads,
            lookup(metric),
        )?;
        written.push(path);
    }

    Ok(written)
}
