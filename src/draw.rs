use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use gnuplot::{
    AutoOption::Fix,
    AxesCommon, Figure,
    PlotOption::{Caption, Color, PointSymbol},
    Tick,
};
use tracing::debug;

use crate::axis::{axis_label, context_summary, AxisChoice, AxisKind, Policy};
use crate::table::ExperimentGroup;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// Why a (group, metric) chart was not produced. These are expected
/// data-sparsity conditions, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyGroup,
    MissingMetric,
    NoPoints,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyGroup => write!(f, "empty group"),
            SkipReason::MissingMetric => write!(f, "missing metric column"),
            SkipReason::NoPoints => write!(f, "no plottable points"),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Written(PathBuf),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Points {
    /// Sorted (x, y) pairs for a numeric axis.
    Line(Vec<(f64, f64)>),
    /// (label, height) per distinct category, in canonical order.
    Bars(Vec<(String, f64)>),
}

/// Everything needed to draw one chart, computed without touching the
/// filesystem.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub experiment: String,
    pub metric: String,
    pub title: String,
    pub x_label: String,
    pub path: PathBuf,
    pub points: Points,
}

/// Builds the chart for one (group, metric) pair, or the reason to skip it.
pub fn plan(
    group: &ExperimentGroup,
    axis: &AxisChoice,
    metric: &str,
    out_dir: &Path,
) -> Result<ChartSpec, SkipReason> {
    if group.rows.is_empty() {
        return Err(SkipReason::EmptyGroup);
    }
    if !group.has_column(metric) {
        return Err(SkipReason::MissingMetric);
    }

    let points = match axis.kind {
        AxisKind::Numeric => Points::Line(numeric_points(group, axis.column, metric)),
        AxisKind::Categorical => Points::Bars(categorical_points(group, axis.column, metric)),
    };
    let empty = match &points {
        Points::Line(pts) => pts.is_empty(),
        Points::Bars(bars) => bars.is_empty(),
    };
    if empty {
        return Err(SkipReason::NoPoints);
    }

    Ok(ChartSpec {
        experiment: group.experiment.clone(),
        metric: metric.to_string(),
        title: chart_title(group, axis, metric),
        x_label: axis_label(axis.column).to_string(),
        path: output_path(out_dir, &group.experiment, metric),
        points,
    })
}

/// Renders one chart image, or reports why it was skipped. Drawing failures
/// are environment problems and propagate as fatal errors.
pub fn render(
    group: &ExperimentGroup,
    axis: &AxisChoice,
    metric: &str,
    out_dir: &Path,
) -> Result<Outcome, Box<dyn Error>> {
    match plan(group, axis, metric, out_dir) {
        Ok(spec) => {
            let path = spec.path.clone();
            draw(&spec)?;
            Ok(Outcome::Written(path))
        }
        Err(reason) => Ok(Outcome::Skipped(reason)),
    }
}

fn draw(spec: &ChartSpec) -> Result<(), Box<dyn Error>> {
    debug!("Drawing {}", spec.path.display());
    let mut fg = Figure::new();
    let axes = fg.axes2d();
    axes.set_title(&spec.title, &[])
        .set_x_label(&spec.x_label, &[])
        .set_y_label(&spec.metric, &[])
        .set_y_grid(true);

    match &spec.points {
        Points::Line(points) => {
            axes.set_x_grid(true).lines_points(
                points.iter().map(|(x, _)| *x),
                points.iter().map(|(_, y)| *y),
                &[Caption(&spec.metric), Color("blue"), PointSymbol('O')],
            );
        }
        Points::Bars(bars) => {
            let ticks = bars
                .iter()
                .enumerate()
                .map(|(i, (label, _))| Tick::Major(i as f64, Fix(label.as_str())));
            axes.set_x_ticks_custom(ticks, &[], &[])
                .set_x_range(Fix(-0.5), Fix(bars.len() as f64 - 0.5))
                .boxes(
                    bars.iter().enumerate().map(|(i, _)| i as f64),
                    bars.iter().map(|(_, y)| *y),
                    &[Caption(&spec.metric), Color("blue")],
                );
        }
    }

    fg.save_to_png(&spec.path, WIDTH, HEIGHT)
        .map_err(|e| format!("saving {}: {e:?}", spec.path.display()))?;
    Ok(())
}

/// (x, y) pairs sorted ascending by x. Rows whose axis or metric cell is
/// missing or non-numeric contribute no point.
pub fn numeric_points(group: &ExperimentGroup, axis: &str, metric: &str) -> Vec<(f64, f64)> {
    let mut points: Vec<(f64, f64)> = group
        .rows
        .iter()
        .filter_map(|row| Some((row.numeric(axis)?, row.numeric(metric)?)))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

/// One (label, height) per distinct category, the first row in table order
/// supplying the height. Known policies come in canonical order; anything
/// else follows in first-seen order.
pub fn categorical_points(group: &ExperimentGroup, axis: &str, metric: &str) -> Vec<(String, f64)> {
    let mut bars: Vec<(String, f64)> = Vec::new();
    for row in &group.rows {
        let Some(label) = row.get(axis) else { continue };
        let Some(height) = row.numeric(metric) else { continue };
        if !bars.iter().any(|(seen, _)| seen == label) {
            bars.push((label.to_string(), height));
        }
    }
    // Stable sort keeps first-seen order among unknown labels.
    bars.sort_by_key(|(label, _)| Policy::rank(label));
    bars
}

pub fn chart_title(group: &ExperimentGroup, axis: &AxisChoice, metric: &str) -> String {
    let context = context_summary(group, axis);
    if context.is_empty() {
        format!("{}: {} vs {}", group.experiment, metric, axis.column)
    } else {
        format!(
            "{}: {} vs {} ({})",
            group.experiment,
            metric,
            axis.column,
            context.join(", ")
        )
    }
}

/// Replaces every character outside [A-Za-z0-9_-] so the name is safe as a
/// filename component.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn output_path(out_dir: &Path, experiment: &str, metric: &str) -> PathBuf {
    out_dir.join(format!("{}_{}.png", sanitize(experiment), sanitize(metric)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::select_axis;
    use crate::table::ResultTable;
    use hashbrown::HashSet;

    fn group(csv: &str) -> ExperimentGroup {
        ResultTable::from_reader(csv.as_bytes())
            .unwrap()
            .groups()
            .remove(0)
    }

    #[test]
    fn numeric_points_sort_ascending_regardless_of_row_order() {
        let shuffled = group(
            "experiment,cache_kb,miss_rate\n\
             sweep_cache_size,256,0.05\n\
             sweep_cache_size,64,0.20\n\
             sweep_cache_size,512,0.02\n\
             sweep_cache_size,128,0.10\n",
        );
        let sorted = group(
            "experiment,cache_kb,miss_rate\n\
             sweep_cache_size,64,0.20\n\
             sweep_cache_size,128,0.10\n\
             sweep_cache_size,256,0.05\n\
             sweep_cache_size,512,0.02\n",
        );
        let a = numeric_points(&shuffled, "cache_kb", "miss_rate");
        let b = numeric_points(&sorted, "cache_kb", "miss_rate");
        assert_eq!(a, b);
        let xs: Vec<f64> = a.iter().map(|(x, _)| *x).collect();
        assert_eq!(xs, vec![64.0, 128.0, 256.0, 512.0]);
    }

    #[test]
    fn nan_axis_values_sort_deterministically() {
        // "NaN" parses as a float, so it can reach the sort.
        let forward = group(
            "experiment,cache_kb,miss_rate\n\
             sweep,NaN,0.3\n\
             sweep,128,0.1\n\
             sweep,64,0.2\n",
        );
        let reversed = group(
            "experiment,cache_kb,miss_rate\n\
             sweep,64,0.2\n\
             sweep,128,0.1\n\
             sweep,NaN,0.3\n",
        );
        let a = numeric_points(&forward, "cache_kb", "miss_rate");
        let b = numeric_points(&reversed, "cache_kb", "miss_rate");
        let ys_a: Vec<f64> = a.iter().map(|(_, y)| *y).collect();
        let ys_b: Vec<f64> = b.iter().map(|(_, y)| *y).collect();
        assert_eq!(ys_a, ys_b);
        assert_eq!(ys_a, vec![0.2, 0.1, 0.3]);
        assert!(a[2].0.is_nan());
    }

    #[test]
    fn rows_without_values_contribute_no_point() {
        let g = group(
            "experiment,cache_kb,miss_rate\n\
             sweep,64,0.2\n\
             sweep,128,\n\
             sweep,abc,0.1\n",
        );
        assert_eq!(
            numeric_points(&g, "cache_kb", "miss_rate"),
            vec![(64.0, 0.2)]
        );
    }

    #[test]
    fn bars_follow_canonical_policy_order() {
        let g = group(
            "experiment,policy,amat\n\
             sweep_policy,FIFO,2.4\n\
             sweep_policy,RANDOM,2.6\n\
             sweep_policy,LRU,2.0\n",
        );
        let bars = categorical_points(&g, "policy", "amat");
        let labels: Vec<&str> = bars.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["LRU", "FIFO", "RANDOM"]);
        assert_eq!(bars[0].1, 2.0);
    }

    #[test]
    fn unknown_categories_sort_after_known_in_first_seen_order() {
        let g = group(
            "experiment,policy,amat\n\
             sweep_policy,CLOCK,2.9\n\
             sweep_policy,LRU,2.0\n\
             sweep_policy,ARC,2.7\n\
             sweep_policy,FIFO,2.4\n",
        );
        let bars = categorical_points(&g, "policy", "amat");
        let labels: Vec<&str> = bars.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["LRU", "FIFO", "CLOCK", "ARC"]);
    }

    #[test]
    fn duplicate_category_takes_first_row() {
        let g = group(
            "experiment,policy,amat\n\
             sweep_policy,LRU,2.0\n\
             sweep_policy,LRU,9.9\n",
        );
        let bars = categorical_points(&g, "policy", "amat");
        assert_eq!(bars, vec![("LRU".to_string(), 2.0)]);
    }

    #[test]
    fn sanitized_names_stay_distinct_for_realistic_tags() {
        let pairs = [
            ("sweep cache size", "miss_rate"),
            ("sweep/cache/size", "amat"),
            ("sweep_cache_size", "miss_rate"),
            ("sweep:policy!", "amat"),
            ("sweep policy", "miss_rate"),
        ];
        let names: HashSet<String> = pairs
            .iter()
            .map(|(e, m)| format!("{}_{}.png", sanitize(e), sanitize(m)))
            .collect();
        assert_eq!(names.len(), pairs.len());
        assert_eq!(sanitize("sweep/cache size!"), "sweep_cache_size_");
    }

    #[test]
    fn title_includes_context_when_present() {
        let g = group(
            "experiment,cache_kb,assoc,miss_rate\n\
             sweep_cache_size,64,8,0.2\n\
             sweep_cache_size,128,8,0.1\n",
        );
        let axis = select_axis(&g).unwrap();
        assert_eq!(
            chart_title(&g, &axis, "miss_rate"),
            "sweep_cache_size: miss_rate vs cache_kb (assoc=8)"
        );
    }

    #[test]
    fn title_omits_empty_context() {
        let g = group(
            "experiment,cache_kb,miss_rate\n\
             sweep,64,0.2\n\
             sweep,128,0.1\n",
        );
        let axis = select_axis(&g).unwrap();
        assert_eq!(
            chart_title(&g, &axis, "miss_rate"),
            "sweep: miss_rate vs cache_kb"
        );
    }

    #[test]
    fn sweep_cache_size_plans_a_line_chart() {
        let g = group(
            "experiment,cache_kb,assoc,miss_rate\n\
             sweep_cache_size,512,8,0.02\n\
             sweep_cache_size,64,8,0.20\n\
             sweep_cache_size,256,8,0.05\n\
             sweep_cache_size,128,8,0.10\n",
        );
        let axis = select_axis(&g).unwrap();
        let spec = plan(&g, &axis, "miss_rate", Path::new("plots")).unwrap();
        assert!(spec.title.contains("assoc=8"));
        assert_eq!(spec.x_label, "Cache size (KB)");
        assert_eq!(
            spec.path,
            PathBuf::from("plots/sweep_cache_size_miss_rate.png")
        );
        match spec.points {
            Points::Line(points) => {
                let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
                assert_eq!(xs, vec![64.0, 128.0, 256.0, 512.0]);
            }
            Points::Bars(_) => panic!("numeric axis must plan a line chart"),
        }
    }

    #[test]
    fn sweep_policy_plans_a_bar_chart() {
        let g = group(
            "experiment,policy,amat\n\
             sweep_policy,FIFO,2.4\n\
             sweep_policy,RANDOM,2.6\n\
             sweep_policy,LRU,2.0\n",
        );
        let axis = select_axis(&g).unwrap();
        let spec = plan(&g, &axis, "amat", Path::new("plots")).unwrap();
        match spec.points {
            Points::Bars(bars) => {
                let labels: Vec<&str> = bars.iter().map(|(l, _)| l.as_str()).collect();
                assert_eq!(labels, vec!["LRU", "FIFO", "RANDOM"]);
            }
            Points::Line(_) => panic!("categorical axis must plan a bar chart"),
        }
    }

    #[test]
    fn absent_metric_skips_only_that_chart() {
        let g = group(
            "experiment,line_size,miss_rate\n\
             sweep_line_size,32,0.3\n\
             sweep_line_size,64,0.2\n",
        );
        let axis = select_axis(&g).unwrap();
        assert_eq!(
            plan(&g, &axis, "amat", Path::new("plots")).unwrap_err(),
            SkipReason::MissingMetric
        );
        assert!(plan(&g, &axis, "miss_rate", Path::new("plots")).is_ok());
    }

    #[test]
    fn metric_with_no_parseable_values_is_skipped() {
        let g = group(
            "experiment,cache_kb,miss_rate\n\
             sweep,64,n/a\n\
             sweep,128,n/a\n",
        );
        let axis = select_axis(&g).unwrap();
        assert_eq!(
            plan(&g, &axis, "miss_rate", Path::new("plots")).unwrap_err(),
            SkipReason::NoPoints
        );
    }
}
