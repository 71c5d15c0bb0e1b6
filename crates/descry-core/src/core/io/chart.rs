use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

use super::samples::VariantSeries;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Chart rendering failed: {0}")]
    Render(String),
}

const CHART_SIZE: (u32, u32) = (900, 700);
const MARKER_SIZE: i32 = 4;

/// Renders one scaling chart: one curve per variant over shared axes
/// (site count against elapsed seconds), with markers and a legend.
///
/// The output is an SVG vector image, laid out deterministically for a
/// given input and overwriting any existing file at `path`. An empty
/// variant list still produces a valid chart with axes and no curves.
pub fn render_scaling_chart(
    path: &Path,
    title: &str,
    series: &[VariantSeries],
) -> Result<(), ChartError> {
    draw(path, title, series).map_err(|e| ChartError::Render(e.to_string()))
}

fn draw(
    path: &Path,
    title: &str,
    series: &[VariantSeries],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_range, y_range) = axis_ranges(series);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Number of atoms")
        .y_desc("Time (s)")
        .axis_desc_style(("sans-serif", 20))
        .draw()?;

    for (index, variant) in series.iter().enumerate() {
        let color = Palette99::pick(index).to_rgba();
        let style = color.stroke_width(2);
        let points: Vec<(f64, f64)> = variant
            .samples
            .iter()
            .map(|s| (s.n_atoms as f64, s.seconds))
            .collect();

        chart
            .draw_series(LineSeries::new(points.clone(), style))?
            .label(variant.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        chart.draw_series(
            points
                .iter()
                .map(|&point| Circle::new(point, MARKER_SIZE, color.filled())),
        )?;
    }

    if !series.is_empty() {
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .label_font(("sans-serif", 18))
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn axis_ranges(series: &[VariantSeries]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_max: f64 = 0.0;
    for variant in series {
        for sample in &variant.samples {
            x_min = x_min.min(sample.n_atoms as f64);
            x_max = x_max.max(sample.n_atoms as f64);
            y_max = y_max.max(sample.seconds);
        }
    }

    if !x_min.is_finite() {
        return (0.0..1.0, 0.0..1.0);
    }
    if x_max - x_min < 1.0 {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if y_max <= 0.0 {
        y_max = 1.0;
    }
    (x_min..x_max, 0.0..y_max * 1.05)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::samples::TimingSample;

    fn example_series() -> Vec<VariantSeries> {
        vec![
            VariantSeries {
                label: "gto".to_string(),
                samples: vec![
                    TimingSample {
                        n_atoms: 250,
                        seconds: 0.1,
                    },
                    TimingSample {
                        n_atoms: 432,
                        seconds: 0.4,
                    },
                ],
            },
            VariantSeries {
                label: "polynomial".to_string(),
                samples: vec![
                    TimingSample {
                        n_atoms: 250,
                        seconds: 0.3,
                    },
                    TimingSample {
                        n_atoms: 432,
                        seconds: 0.9,
                    },
                ],
            },
        ]
    }

    #[test]
    fn chart_file_is_written_with_labels_and_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaling.svg");
        render_scaling_chart(&path, "SOAP nmax=4, lmax=4, version=0.2.0", &example_series())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("<?xml") || content.starts_with("<svg"));
        assert!(content.contains("SOAP nmax=4, lmax=4, version=0.2.0"));
        assert!(content.contains("Number of atoms"));
        assert!(content.contains("gto"));
        assert!(content.contains("polynomial"));
    }

    #[test]
    fn rendering_is_deterministic_for_identical_input() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.svg");
        let second = dir.path().join("b.svg");
        render_scaling_chart(&first, "t", &example_series()).unwrap();
        render_scaling_chart(&second, "t", &example_series()).unwrap();
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );
    }

    #[test]
    fn empty_variant_list_still_produces_a_valid_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.svg");
        render_scaling_chart(&path, "no variants", &[]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("svg"));
    }

    #[test]
    fn existing_chart_files_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaling.svg");
        std::fs::write(&path, "old").unwrap();
        render_scaling_chart(&path, "fresh", &example_series()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("fresh"));
    }

    #[test]
    fn unwritable_paths_surface_a_render_error() {
        let path = Path::new("/nonexistent-directory/scaling.svg");
        assert!(matches!(
            render_scaling_chart(path, "t", &example_series()),
            Err(ChartError::Render(_))
        ));
    }
}
