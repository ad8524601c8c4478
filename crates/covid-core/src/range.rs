use serde::{Deserialize, Serialize};
use tracing::debug;

/// A maximum within this factor of a supporting value is a genuine peak.
pub const DEFAULT_MAX_JUMP: f64 = 1.25;

/// Head-room added above the chosen basis.
pub const DEFAULT_MARGIN: f64 = 1.05;

// ── SpikeConfig ───────────────────────────────────────────────────────────────

/// Configuration for the spike-suppressing y-axis estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeConfig {
    /// Ratio above every supporting value at which the maximum is a spike.
    pub max_jump: f64,
    /// Multiplier applied to the basis to leave a margin at the top.
    pub margin: f64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            max_jump: DEFAULT_MAX_JUMP,
            margin: DEFAULT_MARGIN,
        }
    }
}

// ── RangeEstimate ─────────────────────────────────────────────────────────────

/// Result of [`estimate_range`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeEstimate {
    /// Value the bound was derived from (maximum or second maximum).
    pub basis: f64,
    /// Upper y-axis bound; the lower bound is always 0.
    pub upper: f64,
    /// Whether the maximum was discarded as an isolated spike.
    pub spike_suppressed: bool,
}

impl RangeEstimate {
    /// A zero-height axis; callers fall back to default autoscaling.
    pub fn is_degenerate(&self) -> bool {
        self.upper <= 0.0
    }
}

// ── Estimation ────────────────────────────────────────────────────────────────

/// Y-axis upper bound for a chart, or `None` when the renderer should
/// autoscale: on log axes and when the estimate is degenerate.
pub fn estimate_upper_bound(
    values: &[Option<f64>],
    config: &SpikeConfig,
    log_scale: bool,
) -> Option<f64> {
    if log_scale {
        return None;
    }
    let estimate = estimate_range(values, config);
    (!estimate.is_degenerate()).then_some(estimate.upper)
}

/// Pick a spike-robust upper bound for `values`.
///
/// Undefined entries keep their position but never count as the maximum or as
/// a supporting neighbour. The maximum at position `i` is a spike unless:
/// * `i` is the last position,
/// * the value directly before or after `i` is within `max_jump` of it, or
/// * the second-largest value is within `max_jump` of it.
///
/// A spike is replaced by the second-largest value. Fewer than two defined
/// values use a basis of 1.
pub fn estimate_range(values: &[Option<f64>], config: &SpikeConfig) -> RangeEstimate {
    let defined: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| (*v).filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();

    if defined.len() < 2 {
        return finish(1.0, false, config);
    }

    // First position of the maximum wins ties.
    let (max_index, highest1) = defined
        .iter()
        .copied()
        .fold(defined[0], |best, cur| if cur.1 > best.1 { cur } else { best });
    let highest2 = defined
        .iter()
        .filter(|(i, _)| *i != max_index)
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max);

    debug!("highest1 = {}, highest2 = {}", highest1, highest2);

    let supports = |v: f64| v * config.max_jump >= highest1;
    let neighbour = |i: Option<usize>| i.and_then(|i| values.get(i).copied().flatten());

    let spike = if max_index + 1 == values.len() {
        debug!("maximum at {} is the last entry, not a spike", max_index);
        false
    } else if neighbour(max_index.checked_sub(1)).is_some_and(supports)
        || neighbour(Some(max_index + 1)).is_some_and(supports)
    {
        debug!("maximum at {} is supported by a neighbour, not a spike", max_index);
        false
    } else if supports(highest2) {
        debug!("second-highest value supports the maximum, not a spike");
        false
    } else {
        true
    };

    let basis = if spike { highest2 } else { highest1 };
    finish(basis, spike, config)
}

fn finish(basis: f64, spike_suppressed: bool, config: &SpikeConfig) -> RangeEstimate {
    RangeEstimate {
        basis,
        upper: (basis * config.margin).max(0.0),
        spike_suppressed,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
