/// Scheduling policy identifier, reported with budget analyses.
pub const SCHEDULING_POLICY_VERSION: &str = "scheduling/v1";

/// v1 scheduling policy.
///
/// Notes:
/// - Appending takes one day from a last phase of up to three weeks and
///   six days from a longer one.
/// - Occurrence caps only apply when a rule has no other bound.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingPolicy {
    pub short_phase_threshold_days: i64,
    pub short_phase_new_span_days: i64,
    pub long_phase_new_span_days: i64,
    pub min_phase_gap_days: i64,
    pub default_max_occurrences: usize,
    pub max_scanned_periods: usize,
    pub near_budget_percentage: f64,
    pub low_utilization_percentage: f64,
}

impl SchedulingPolicy {
    /// Days the new phase spans when appended after a phase spanning
    /// `last_span_days`.
    pub fn new_phase_span_days(self, last_span_days: i64) -> i64 {
        if last_span_days <= self.short_phase_threshold_days {
            self.short_phase_new_span_days
        } else {
            self.long_phase_new_span_days
        }
    }
}

pub const SCHEDULING_POLICY_V1: SchedulingPolicy = SchedulingPolicy {
    short_phase_threshold_days: 21,
    short_phase_new_span_days: 1,
    long_phase_new_span_days: 6,
    min_phase_gap_days: 1,
    default_max_occurrences: 1000,
    max_scanned_periods: 12_000,
    near_budget_percentage: 90.0,
    low_utilization_percentage: 50.0,
};

#[cfg(test)]
mod tests {
    use super::SCHEDULING_POLICY_V1;

    #[test]
    fn new_span_switches_after_three_weeks() {
        assert_eq!(SCHEDULING_POLICY_V1.new_phase_span_days(10), 1);
        assert_eq!(SCHEDULING_POLICY_V1.new_phase_span_days(21), 1);
        assert_eq!(SCHEDULING_POLICY_V1.new_phase_span_days(22), 6);
    }
}
