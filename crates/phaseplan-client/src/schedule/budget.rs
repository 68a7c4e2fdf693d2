use serde::Serialize;

use crate::schedule::model::Phase;
use crate::schedule::policy::{SCHEDULING_POLICY_V1, SchedulingPolicy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAnalysis {
    pub total_allocated: f64,
    pub remaining: f64,
    pub overage: f64,
    pub utilization_percentage: f64,
    pub is_over_budget: bool,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleCheck {
    pub can_schedule: bool,
    pub budget_conflicts: Vec<String>,
    pub current_allocation: f64,
    pub new_allocation: f64,
}

pub fn total_allocation(phases: &[Phase]) -> f64 {
    phases.iter().map(|phase| phase.time_allocation_hours).sum()
}

pub fn utilization(allocated: f64, budget: f64) -> f64 {
    if budget == 0.0 {
        return 0.0;
    }
    allocated / budget * 100.0
}

pub fn remaining(allocated: f64, budget: f64) -> f64 {
    budget - allocated
}

pub fn overage(allocated: f64, budget: f64) -> f64 {
    (allocated - budget).max(0.0)
}

/// Whether `new_allocation` more hours still fit. Landing exactly on the
/// budget is allowed.
pub fn can_schedule_additional(existing: &[Phase], new_allocation: f64, budget: f64) -> ScheduleCheck {
    let current_allocation = total_allocation(existing);
    let projected = current_allocation + new_allocation;
    let mut budget_conflicts = Vec::new();
    if projected > budget {
        budget_conflicts.push(format!(
            "Allocating {}h would exceed the project budget by {}h ({}h of {}h).",
            format_hours(new_allocation),
            format_hours(overage(projected, budget)),
            format_hours(projected),
            format_hours(budget)
        ));
    }

    ScheduleCheck {
        can_schedule: budget_conflicts.is_empty(),
        budget_conflicts,
        current_allocation,
        new_allocation,
    }
}

pub fn analyze(phases: &[Phase], budget: f64) -> BudgetAnalysis {
    analyze_with_policy(phases, budget, SCHEDULING_POLICY_V1)
}

fn analyze_with_policy(phases: &[Phase], budget: f64, policy: SchedulingPolicy) -> BudgetAnalysis {
    let total_allocated = total_allocation(phases);
    let utilization_percentage = utilization(total_allocated, budget);
    let over = overage(total_allocated, budget);

    let mut recommendations = Vec::new();
    if over > 0.0 {
        recommendations.push(format!(
            "Reduce phase allocations by {}h or raise the project estimate.",
            format_hours(over)
        ));
    } else if budget > 0.0 && utilization_percentage >= policy.near_budget_percentage {
        recommendations.push(format!(
            "Only {}h remain unallocated; review estimates before adding phases.",
            format_hours(remaining(total_allocated, budget))
        ));
    } else if !phases.is_empty() && budget > 0.0 && utilization_percentage < policy.low_utilization_percentage {
        recommendations.push(format!(
            "{}h of the budget is unallocated; assign it to phases.",
            format_hours(remaining(total_allocated, budget))
        ));
    }

    let unassigned = phases
        .iter()
        .filter(|phase| phase.is_phase() && phase.time_allocation_hours == 0.0)
        .count();
    if unassigned > 0 {
        recommendations.push(format!("{unassigned} phase(s) have no hours allocated yet."));
    }

    BudgetAnalysis {
        total_allocated,
        remaining: remaining(total_allocated, budget),
        overage: over,
        utilization_percentage,
        is_over_budget: over > 0.0,
        recommendations,
    }
}

pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        return format!("{hours:.0}");
    }
    let text = format!("{hours:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::schedule::model::Phase;

    use super::{analyze, can_schedule_additional, format_hours, overage, remaining, total_allocation, utilization};

    fn phase(name: &str, hours: f64) -> Phase {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).and_then(|date| date.and_hms_opt(0, 0, 0));
        let end = NaiveDate::from_ymd_opt(2026, 1, 10).and_then(|date| date.and_hms_opt(0, 0, 0));
        assert!(start.is_some() && end.is_some());
        Phase {
            id: Some(format!("ph_{name}")),
            project_id: "prj_1".to_string(),
            name: name.to_string(),
            start_date: start,
            end_date: end.unwrap_or_default(),
            time_allocation_hours: hours,
            is_recurring: false,
            recurring_config: None,
        }
    }

    #[test]
    fn aggregates_are_consistent() {
        let phases = vec![phase("a", 30.0), phase("b", 25.5)];
        assert_eq!(total_allocation(&phases), 55.5);
        assert_eq!(remaining(55.5, 50.0), -5.5);
        assert_eq!(overage(55.5, 50.0), 5.5);
        assert_eq!(overage(40.0, 50.0), 0.0);
        assert_eq!(utilization(110.0, 100.0), 110.0);
        assert_eq!(utilization(10.0, 0.0), 0.0);
    }

    #[test]
    fn exactly_at_budget_is_schedulable() {
        let phases = vec![phase("a", 60.0)];
        let at_budget = can_schedule_additional(&phases, 40.0, 100.0);
        assert!(at_budget.can_schedule);
        assert!(at_budget.budget_conflicts.is_empty());

        let over = can_schedule_additional(&phases, 45.0, 100.0);
        assert!(!over.can_schedule);
        assert_eq!(over.current_allocation, 60.0);
        assert_eq!(
            over.budget_conflicts,
            vec!["Allocating 45h would exceed the project budget by 5h (105h of 100h).".to_string()]
        );
    }

    #[test]
    fn recommendations_track_utilization() {
        let over = analyze(&[phase("a", 110.0)], 100.0);
        assert!(over.is_over_budget);
        assert!(over.recommendations[0].contains("Reduce phase allocations by 10h"));

        let near = analyze(&[phase("a", 95.0)], 100.0);
        assert!(near.recommendations[0].contains("Only 5h remain"));

        let low = analyze(&[phase("a", 20.0), phase("b", 0.0)], 100.0);
        assert_eq!(low.recommendations.len(), 2);
        assert!(low.recommendations[1].starts_with("1 phase(s)"));
    }

    #[test]
    fn hours_format_without_trailing_zeros() {
        assert_eq!(format_hours(40.0), "40");
        assert_eq!(format_hours(12.5), "12.5");
        assert_eq!(format_hours(1.25), "1.25");
    }
}
