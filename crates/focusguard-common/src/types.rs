use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// An application whose daily foreground time is budgeted.
///
/// `current_usage_minutes` is cumulative since local midnight and is replaced
/// on every sampler refresh. `daily_limit_minutes` only grows through
/// challenge rewards; explicit user edits are the only way to lower it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredApp {
    /// Opaque package / application identifier reported by the compositor
    pub package_id: String,
    /// Human readable name shown on the blocking surface
    pub app_name: String,
    pub daily_limit_minutes: u32,
    pub current_usage_minutes: u32,
    pub enabled: bool,
    /// Start of the usage day the counters belong to
    pub last_reset_at: DateTime<Utc>,
}

impl MonitoredApp {
    pub fn new(
        package_id: impl Into<String>,
        app_name: impl Into<String>,
        daily_limit_minutes: u32,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            app_name: app_name.into(),
            daily_limit_minutes,
            current_usage_minutes: 0,
            enabled: true,
            last_reset_at: Utc::now(),
        }
    }

    pub fn is_over_limit(&self) -> bool {
        self.current_usage_minutes >= self.daily_limit_minutes
    }

    pub fn remaining_minutes(&self) -> u32 {
        self.daily_limit_minutes.saturating_sub(self.current_usage_minutes)
    }

    pub fn overage_minutes(&self) -> u32 {
        self.current_usage_minutes.saturating_sub(self.daily_limit_minutes)
    }

    /// True when the counters were last reset on an earlier local calendar day.
    pub fn needs_daily_reset(&self, now: DateTime<Local>) -> bool {
        self.last_reset_at.with_timezone(&Local).date_naive() != now.date_naive()
    }
}

/// Per-day counters. One record per local calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStatistics {
    pub date: NaiveDate,
    pub total_screen_time_minutes: u32,
    pub problems_solved: u32,
    pub problems_attempted: u32,
    pub breaks_taken: u32,
    pub time_saved_minutes: u32,
    pub apps_blocked: u32,
    pub last_updated: DateTime<Utc>,
}

impl DailyStatistics {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_screen_time_minutes: 0,
            problems_solved: 0,
            problems_attempted: 0,
            breaks_taken: 0,
            time_saved_minutes: 0,
            apps_blocked: 0,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn time_limit_secs(&self) -> u32 {
        match self {
            Difficulty::Easy => 30,
            Difficulty::Medium => 45,
            Difficulty::Hard => 60,
        }
    }

    pub fn extra_time_reward_minutes(&self) -> u32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 10,
            Difficulty::Hard => 15,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EASY" => Ok(Difficulty::Easy),
            "MEDIUM" => Ok(Difficulty::Medium),
            "HARD" => Ok(Difficulty::Hard),
            other => Err(Error::InvalidDifficulty(other.to_string())),
        }
    }
}

/// The arithmetic a problem was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expression {
    Add { a: i64, b: i64 },
    Subtract { minuend: i64, subtrahend: i64 },
    Multiply { a: i64, b: i64 },
    Divide { dividend: i64, divisor: i64 },
    /// `(a + b) × factor`
    SumTimes { a: i64, b: i64, factor: i64 },
}

impl Expression {
    /// Exact integer value, or `None` on overflow or inexact division.
    pub fn evaluate(&self) -> Option<i64> {
        match *self {
            Expression::Add { a, b } => a.checked_add(b),
            Expression::Subtract { minuend, subtrahend } => minuend.checked_sub(subtrahend),
            Expression::Multiply { a, b } => a.checked_mul(b),
            Expression::Divide { dividend, divisor } => {
                if divisor == 0 || dividend % divisor != 0 {
                    None
                } else {
                    dividend.checked_div(divisor)
                }
            }
            Expression::SumTimes { a, b, factor } => a.checked_add(b)?.checked_mul(factor),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Add { a, b } => write!(f, "{} + {}", a, b),
            Expression::Subtract { minuend, subtrahend } => write!(f, "{} - {}", minuend, subtrahend),
            Expression::Multiply { a, b } => write!(f, "{} × {}", a, b),
            Expression::Divide { dividend, divisor } => write!(f, "{} ÷ {}", dividend, divisor),
            Expression::SumTimes { a, b, factor } => write!(f, "({} + {}) × {}", a, b, factor),
        }
    }
}

/// A single challenge. A fresh instance is generated for every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArithmeticProblem {
    pub question: String,
    pub answer: i64,
    pub difficulty: Difficulty,
    pub time_limit_secs: u32,
    pub extra_time_reward_minutes: u32,
    pub expression: Expression,
}

impl ArithmeticProblem {
    pub fn new(expression: Expression, answer: i64, difficulty: Difficulty) -> Self {
        Self {
            question: format!("{} = ?", expression),
            answer,
            difficulty,
            time_limit_secs: difficulty.time_limit_secs(),
            extra_time_reward_minutes: difficulty.extra_time_reward_minutes(),
            expression,
        }
    }

    pub fn check_answer(&self, submitted: i64) -> bool {
        submitted == self.answer
    }

    /// The stored answer matches the expression and is non-negative.
    pub fn is_consistent(&self) -> bool {
        self.answer >= 0 && self.expression.evaluate() == Some(self.answer)
    }
}

/// How a blocking session was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingAction {
    BreakTaken,
    ProblemSolved,
    Skipped,
    Expired,
    SurfaceUnavailable,
    /// Extra time granted without a problem because none could be generated.
    FallbackGranted,
}

impl BlockingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockingAction::BreakTaken => "break_taken",
            BlockingAction::ProblemSolved => "problem_solved",
            BlockingAction::Skipped => "skipped",
            BlockingAction::Expired => "expired",
            BlockingAction::SurfaceUnavailable => "surface_unavailable",
            BlockingAction::FallbackGranted => "fallback_granted",
        }
    }
}

impl FromStr for BlockingAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "break_taken" => Ok(BlockingAction::BreakTaken),
            "problem_solved" => Ok(BlockingAction::ProblemSolved),
            "skipped" => Ok(BlockingAction::Skipped),
            "expired" => Ok(BlockingAction::Expired),
            "surface_unavailable" => Ok(BlockingAction::SurfaceUnavailable),
            "fallback_granted" => Ok(BlockingAction::FallbackGranted),
            other => Err(Error::InvalidAction(other.to_string())),
        }
    }
}

/// A closed interval during which one package held the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSession {
    pub package_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl AppSession {
    pub fn duration(&self) -> Duration {
        self.ended_at.signed_duration_since(self.started_at).max(Duration::zero())
    }
}

/// Formats a minute count the way the dashboard shows it: `45min`, `2h 5min`, `1d 3h`.
pub fn format_minutes(minutes: u64) -> String {
    match minutes {
        m if m < 60 => format!("{}min", m),
        m if m < 1440 => format!("{}h {}min", m / 60, m % 60),
        m => format!("{}d {}h", m / 1440, (m % 1440) / 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitored_app_limit_checks() {
        let mut app = MonitoredApp::new("org.example.Focus", "Focus", 30);
        assert!(!app.is_over_limit());
        assert_eq!(app.remaining_minutes(), 30);

        app.current_usage_minutes = 30;
        assert!(app.is_over_limit());

        app.current_usage_minutes = 32;
        assert_eq!(app.remaining_minutes(), 0);
        assert_eq!(app.overage_minutes(), 2);
    }

    #[test]
    fn test_needs_daily_reset() {
        let mut app = MonitoredApp::new("org.example.Focus", "Focus", 30);
        let now = Local::now();
        app.last_reset_at = now.with_timezone(&Utc);
        assert!(!app.needs_daily_reset(now));

        app.last_reset_at = (now - Duration::days(1)).with_timezone(&Utc);
        assert!(app.needs_daily_reset(now));
    }

    #[test]
    fn test_difficulty_parsing() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("MEDIUM".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" Hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("impossible".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }

    #[test]
    fn test_difficulty_serializes_uppercase() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "\"HARD\"");
    }

    #[test]
    fn test_expression_display_and_evaluate() {
        let expr = Expression::Multiply { a: 14, b: 7 };
        assert_eq!(expr.to_string(), "14 × 7");
        assert_eq!(expr.evaluate(), Some(98));

        let expr = Expression::SumTimes { a: 12, b: 8, factor: 3 };
        assert_eq!(expr.to_string(), "(12 + 8) × 3");
        assert_eq!(expr.evaluate(), Some(60));

        assert_eq!(Expression::Divide { dividend: 10, divisor: 3 }.evaluate(), None);
        assert_eq!(Expression::Divide { dividend: 10, divisor: 0 }.evaluate(), None);
    }

    #[test]
    fn test_problem_question_and_consistency() {
        let problem =
            ArithmeticProblem::new(Expression::Multiply { a: 14, b: 7 }, 98, Difficulty::Medium);
        assert_eq!(problem.question, "14 × 7 = ?");
        assert_eq!(problem.time_limit_secs, 45);
        assert_eq!(problem.extra_time_reward_minutes, 10);
        assert!(problem.is_consistent());
        assert!(problem.check_answer(98));
        assert!(!problem.check_answer(97));

        let broken =
            ArithmeticProblem::new(Expression::Multiply { a: 14, b: 7 }, 99, Difficulty::Medium);
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_blocking_action_round_trip_names() {
        for action in [
            BlockingAction::BreakTaken,
            BlockingAction::ProblemSolved,
            BlockingAction::Skipped,
            BlockingAction::Expired,
            BlockingAction::SurfaceUnavailable,
            BlockingAction::FallbackGranted,
        ] {
            assert_eq!(action.as_str().parse::<BlockingAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(45), "45min");
        assert_eq!(format_minutes(125), "2h 5min");
        assert_eq!(format_minutes(1500), "1d 1h");
    }

    #[test]
    fn test_session_duration_never_negative() {
        let now = Utc::now();
        let session = AppSession {
            package_id: "firefox".to_string(),
            started_at: now,
            ended_at: now - Duration::seconds(5),
        };
        assert_eq!(session.duration(), Duration::zero());
    }
}
