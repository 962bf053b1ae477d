use crate::table::ExperimentGroup;

/// Candidate axis columns, scanned in priority order. The first one that
/// varies within a group becomes the independent variable; `policy` (always
/// last) is the only categorical candidate.
pub const AXIS_CANDIDATES: [&str; 8] = [
    "cache_kb",
    "assoc",
    "line_size",
    "stride_bytes",
    "working_set_kb",
    "hit_latency",
    "miss_penalty",
    "policy",
];

pub const CATEGORICAL_AXIS: &str = "policy";

/// Metric columns charted per experiment, in report order.
pub const METRICS: [&str; 2] = ["miss_rate", "amat"];

/// Columns eligible for the title's context summary, in display order.
pub const CONTEXT_COLUMNS: [&str; 9] = [
    "cache_kb",
    "line_size",
    "assoc",
    "policy",
    "trace",
    "working_set_kb",
    "stride_bytes",
    "hit_latency",
    "miss_penalty",
];

pub const CONTEXT_LIMIT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Numeric,
    Categorical,
}

/// The column chosen as a group's independent variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisChoice {
    pub column: &'static str,
    pub kind: AxisKind,
}

/// Replacement policies the simulator reports, in canonical display order.
/// Labels outside this enumeration sort after every known one, stable by
/// first appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Lru,
    Fifo,
    Random,
}

impl Policy {
    pub const CANONICAL: [Policy; 3] = [Policy::Lru, Policy::Fifo, Policy::Random];

    pub fn parse(label: &str) -> Option<Policy> {
        match label {
            "LRU" => Some(Policy::Lru),
            "FIFO" => Some(Policy::Fifo),
            "RANDOM" => Some(Policy::Random),
            _ => None,
        }
    }

    /// Sort key for a category label; unknown labels rank last.
    pub fn rank(label: &str) -> usize {
        match Policy::parse(label) {
            Some(policy) => Policy::CANONICAL
                .iter()
                .position(|p| *p == policy)
                .unwrap_or(Policy::CANONICAL.len()),
            None => Policy::CANONICAL.len(),
        }
    }
}

/// Picks the first candidate column that varies within the group. A group
/// with a single configuration (e.g. a baseline row) has no varying column
/// and yields `None`.
pub fn select_axis(group: &ExperimentGroup) -> Option<AxisChoice> {
    for column in AXIS_CANDIDATES {
        if group.distinct(column) > 1 {
            let kind = if column == CATEGORICAL_AXIS {
                AxisKind::Categorical
            } else {
                AxisKind::Numeric
            };
            return Some(AxisChoice { column, kind });
        }
    }
    None
}

/// `name=value` entries for display-list columns that are constant within
/// the group, excluding the chosen axis, capped to keep titles short.
pub fn context_summary(group: &ExperimentGroup, axis: &AxisChoice) -> Vec<String> {
    let mut context = Vec::new();
    for column in CONTEXT_COLUMNS {
        if column == axis.column {
            continue;
        }
        if let Some(value) = group.constant(column) {
            context.push(format!("{column}={value}"));
        }
        if context.len() == CONTEXT_LIMIT {
            break;
        }
    }
    context
}

/// Human x-axis label for a column; unknown columns label as themselves.
pub fn axis_label(column: &str) -> &str {
    match column {
        "cache_kb" => "Cache size (KB)",
        "assoc" => "Associativity (ways)",
        "line_size" => "Line size (bytes)",
        "stride_bytes" => "Stride (bytes)",
        "working_set_kb" => "Working set (KB)",
        "hit_latency" => "Hit latency (cycles)",
        "miss_penalty" => "Miss penalty (cycles)",
        "policy" => "Policy",
        other => other,
    }
}
