//! Derived display values for goals: progress percentage and deadline countdown.
//!
//! Pure functions only; nothing here touches storage.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::models::{Goal, GoalType};

/// Percentage of the way from the goal's starting point to its target, 0–100.
///
/// Weight goals are "lower is better". Their starting value is not stored, so it
/// is reconstructed: while still above target the goal is assumed to be halfway
/// done (`initial = current + (current - target)`); at or below target the
/// current value is taken as the start, which yields 0.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn progress_percent(goal: &Goal) -> u8 {
    if goal.current == goal.target {
        return 100;
    }

    let ratio = if goal.goal_type == GoalType::Weight {
        let initial = if goal.target < goal.current {
            goal.current + (goal.current - goal.target)
        } else {
            goal.current
        };
        let range = (initial - goal.target).abs();
        let progressed = (initial - goal.current).abs();
        progressed / range
    } else {
        goal.current / goal.target
    };

    clamp_percent(ratio * 100.0)
}

/// Round half up and clamp into 0–100. `+inf` saturates to 100; NaN and
/// negatives go to 0.
#[allow(clippy::cast_sign_loss)]
fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value + 0.5).floor().clamp(0.0, 100.0) as u8
}

/// How long until a goal's deadline, as shown next to the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "days", rename_all = "lowercase")]
pub enum TimeRemaining {
    /// The goal has no deadline.
    Ongoing,
    /// The deadline is in the past.
    Passed,
    /// Whole days left, rounded up.
    Days(i64),
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => f.write_str("Ongoing goal"),
            Self::Passed => f.write_str("Deadline passed"),
            Self::Days(1) => f.write_str("1 day remaining"),
            Self::Days(n) => write!(f, "{n} days remaining"),
        }
    }
}

/// Days left until `deadline`, rounded up: 30 minutes away is "1 day remaining".
#[must_use]
pub fn time_remaining(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TimeRemaining {
    let Some(deadline) = deadline else {
        return TimeRemaining::Ongoing;
    };
    if deadline < now {
        return TimeRemaining::Passed;
    }
    let remaining = deadline - now;
    let whole = remaining.num_days();
    if remaining > TimeDelta::days(whole) {
        TimeRemaining::Days(whole + 1)
    } else {
        TimeRemaining::Days(whole)
    }
}

#[must_use]
pub fn time_remaining_now(deadline: Option<DateTime<Utc>>) -> TimeRemaining {
    time_remaining(deadline, Utc::now())
}

/// A goal together with its derived display values.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalStatus {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress: u8,
    pub time_remaining: TimeRemaining,
    pub time_remaining_label: String,
}

impl GoalStatus {
    #[must_use]
    pub fn new(goal: Goal, now: DateTime<Utc>) -> Self {
        let progress = progress_percent(&goal);
        let time_remaining = time_remaining(goal.deadline, now);
        Self {
            goal,
            progress,
            time_remaining,
            time_remaining_label: time_remaining.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn goal(goal_type: GoalType, target: f64, current: f64) -> Goal {
        Goal {
            id: 1,
            user_id: 1,
            title: "Goal".to_string(),
            description: None,
            goal_type,
            target,
            current,
            unit: "units".to_string(),
            deadline: None,
            completed: false,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_equal_target_and_current_is_complete() {
        for t in GoalType::ALL {
            assert_eq!(progress_percent(&goal(*t, 5.0, 5.0)), 100);
        }
    }

    #[test]
    fn test_running_goal_uses_higher_is_better() {
        // 27 / 25 = 108%, clamped
        assert_eq!(progress_percent(&goal(GoalType::Running, 25.0, 27.0)), 100);
        assert_eq!(progress_percent(&goal(GoalType::Frequency, 5.0, 3.0)), 60);
        assert_eq!(progress_percent(&goal(GoalType::Other, 3.0, 1.0)), 33);
    }

    #[test]
    fn test_rounds_half_up() {
        // 1 / 8 = 12.5%
        assert_eq!(progress_percent(&goal(GoalType::Frequency, 8.0, 1.0)), 13);
    }

    // Reproduces the existing weight heuristic; not a verified-correct model of
    // weight-loss progress.
    #[test]
    fn test_weight_goal_above_target_reports_half() {
        // initial = 172 + 7 = 179, range 14, progressed 7
        assert_eq!(progress_percent(&goal(GoalType::Weight, 165.0, 172.0)), 50);
        assert_eq!(progress_percent(&goal(GoalType::Weight, 150.0, 200.0)), 50);
    }

    // Reproduces the existing weight heuristic: below target, current is taken
    // as the starting point, so no progress is reported.
    #[test]
    fn test_weight_goal_below_target_reports_zero() {
        assert_eq!(progress_percent(&goal(GoalType::Weight, 165.0, 160.0)), 0);
    }

    #[test]
    fn test_zero_target_does_not_panic() {
        assert_eq!(progress_percent(&goal(GoalType::Running, 0.0, 4.0)), 100);
        assert_eq!(progress_percent(&goal(GoalType::Running, 0.0, -4.0)), 0);
    }

    #[test]
    fn test_negative_progress_clamps_to_zero() {
        assert_eq!(progress_percent(&goal(GoalType::Other, 10.0, -2.0)), 0);
    }

    #[test]
    fn test_no_deadline_is_ongoing() {
        assert_eq!(time_remaining(None, now()), TimeRemaining::Ongoing);
        assert_eq!(time_remaining(None, now()).to_string(), "Ongoing goal");
    }

    #[test]
    fn test_past_deadline() {
        let remaining = time_remaining(Some(now() - Duration::minutes(10)), now());
        assert_eq!(remaining, TimeRemaining::Passed);
        assert_eq!(remaining.to_string(), "Deadline passed");
    }

    #[test]
    fn test_days_round_up() {
        let remaining = time_remaining(Some(now() + Duration::hours(36)), now());
        assert_eq!(remaining, TimeRemaining::Days(2));
        assert_eq!(remaining.to_string(), "2 days remaining");

        let remaining = time_remaining(Some(now() + Duration::minutes(30)), now());
        assert_eq!(remaining.to_string(), "1 day remaining");
    }

    #[test]
    fn test_sub_millisecond_remainder_counts_as_a_day() {
        let deadline = now() + Duration::microseconds(500);
        let remaining = time_remaining(Some(deadline), now());
        assert_eq!(remaining, TimeRemaining::Days(1));

        let deadline = now() + Duration::days(3) + Duration::nanoseconds(1);
        let remaining = time_remaining(Some(deadline), now());
        assert_eq!(remaining, TimeRemaining::Days(4));
    }

    #[test]
    fn test_exact_days() {
        assert_eq!(
            time_remaining(Some(now() + Duration::days(1)), now()).to_string(),
            "1 day remaining"
        );
        assert_eq!(
            time_remaining(Some(now() + Duration::days(7)), now()),
            TimeRemaining::Days(7)
        );
    }

    #[test]
    fn test_deadline_exactly_now() {
        assert_eq!(time_remaining(Some(now()), now()), TimeRemaining::Days(0));
        assert_eq!(
            time_remaining(Some(now()), now()).to_string(),
            "0 days remaining"
        );
    }

    #[test]
    fn test_goal_status_serializes_flat() {
        let mut g = goal(GoalType::Weight, 165.0, 172.0);
        g.deadline = Some(now() + Duration::days(25));
        let status = GoalStatus::new(g, now());
        assert_eq!(status.progress, 50);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["type"], "weight");
        assert_eq!(json["progress"], 50);
        assert_eq!(json["timeRemaining"]["kind"], "days");
        assert_eq!(json["timeRemaining"]["days"], 25);
        assert_eq!(json["timeRemainingLabel"], "25 days remaining");
    }
}
