//! Three stacked scatter panels against output shaft speed: torque,
//! efficiency, and input/output power.

use plotters::coord::Shift;
use plotters::prelude::*;
use rig_core::tags::{self, Tag};
use rig_core::Measurement;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

const IMAGE_SIZE: (u32, u32) = (900, 1200);
const LABELS: bool = cfg!(feature = "plot-labels");

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("plot drawing failed: {0}")]
    Draw(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Draw(e.to_string())
}

struct Trace {
    tag: Tag,
    value: fn(&Measurement) -> f64,
    color: RGBColor,
}

struct Panel {
    title: &'static str,
    traces: &'static [Trace],
}

const PANELS: [Panel; 3] = [
    Panel {
        title: "Torque vs Output Speed",
        traces: &[Trace {
            tag: tags::TORQUE_NM,
            value: |m| m.torque_nm,
            color: BLUE,
        }],
    },
    Panel {
        title: "Efficiency vs Output Speed",
        traces: &[Trace {
            tag: tags::EFFICIENCY_PCT,
            value: |m| m.efficiency_pct,
            color: GREEN,
        }],
    },
    Panel {
        title: "Power vs Output Speed",
        traces: &[
            Trace {
                tag: tags::INPUT_POWER_W,
                value: |m| m.input_power_w,
                color: RED,
            },
            Trace {
                tag: tags::OUTPUT_POWER_W,
                value: |m| m.output_power_w,
                color: MAGENTA,
            },
        ],
    },
];

/// Render every record in `history` to a PNG at `path`.
pub fn render_history(path: &Path, history: &[Measurement]) -> Result<(), PlotError> {
    let root = BitMapBackend::new(path, IMAGE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let areas = root.split_evenly((PANELS.len(), 1));
    for (area, panel) in areas.iter().zip(PANELS.iter()) {
        draw_panel(area, panel, history)?;
    }

    root.present().map_err(draw_err)
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &Panel,
    history: &[Measurement],
) -> Result<(), PlotError> {
    let x_range = axis_range(history.iter().map(|m| m.gearbox_rpm));
    let y_range = axis_range(
        history
            .iter()
            .flat_map(|m| panel.traces.iter().map(move |t| (t.value)(m))),
    );

    let mut builder = ChartBuilder::on(area);
    builder.margin(10);
    if LABELS {
        builder
            .caption(panel.title, ("sans-serif", 20))
            .x_label_area_size(30)
            .y_label_area_size(50);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, y_range)
        .map_err(draw_err)?;

    let mut mesh = chart.configure_mesh();
    if LABELS {
        mesh.x_desc(tags::GEARBOX_RPM.plot_label);
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw().map_err(draw_err)?;

    for trace in panel.traces {
        let series = chart
            .draw_series(history.iter().map(|m| {
                Circle::new((m.gearbox_rpm, (trace.value)(m)), 2, trace.color.filled())
            }))
            .map_err(draw_err)?;
        if LABELS {
            let color = trace.color;
            series
                .label(trace.tag.plot_label)
                .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
        }
    }

    if LABELS {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;
    }

    Ok(())
}

/// Padded data range; falls back to 0..1 with no finite data.
fn axis_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return 0.0..1.0;
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}
