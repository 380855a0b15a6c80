use async_trait::async_trait;
use focusguard_common::{ArithmeticProblem, Difficulty, Expression};
use focusguard_db::queries::settings::{SettingsQueries, DIFFICULTY_LEVEL};
use focusguard_db::Database;
use rand::Rng;
use tracing::{debug, warn};

/// Builds arithmetic problems. Stateless apart from the random source.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChallengeGenerator;

impl ChallengeGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, difficulty: Difficulty) -> ArithmeticProblem {
        self.generate_with(difficulty, &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> ArithmeticProblem {
        let expression = match difficulty {
            Difficulty::Easy => easy_expression(rng),
            Difficulty::Medium => medium_expression(rng),
            Difficulty::Hard => hard_expression(rng),
        };

        let answer = answer_for(&expression);
        let problem = ArithmeticProblem::new(expression, answer, difficulty);
        debug!("Generated {} problem: {}", difficulty, problem.question);
        problem
    }
}

fn easy_expression<R: Rng + ?Sized>(rng: &mut R) -> Expression {
    match rng.gen_range(0..3) {
        0 => Expression::Add { a: rng.gen_range(1..10), b: rng.gen_range(1..10) },
        1 => {
            let minuend = rng.gen_range(5..20);
            Expression::Subtract { minuend, subtrahend: rng.gen_range(1..minuend) }
        }
        _ => Expression::Multiply { a: rng.gen_range(2..10), b: rng.gen_range(2..10) },
    }
}

fn medium_expression<R: Rng + ?Sized>(rng: &mut R) -> Expression {
    match rng.gen_range(0..4) {
        0 => Expression::Add { a: rng.gen_range(10..100), b: rng.gen_range(10..100) },
        1 => {
            let minuend = rng.gen_range(50..200);
            Expression::Subtract { minuend, subtrahend: rng.gen_range(10..minuend) }
        }
        2 => Expression::Multiply { a: rng.gen_range(10..25), b: rng.gen_range(2..12) },
        _ => division(rng, 2..12, 5..20),
    }
}

fn hard_expression<R: Rng + ?Sized>(rng: &mut R) -> Expression {
    match rng.gen_range(0..3) {
        0 => Expression::Multiply { a: rng.gen_range(20..50), b: rng.gen_range(10..25) },
        1 => division(rng, 5..15, 8..25),
        _ => Expression::SumTimes {
            a: rng.gen_range(10..30),
            b: rng.gen_range(5..15),
            factor: rng.gen_range(2..8),
        },
    }
}

/// Picks divisor and quotient first so the dividend always divides evenly.
fn division<R: Rng + ?Sized>(
    rng: &mut R,
    divisors: std::ops::Range<i64>,
    quotients: std::ops::Range<i64>,
) -> Expression {
    let divisor = rng.gen_range(divisors);
    let quotient = rng.gen_range(quotients);
    Expression::Divide { dividend: divisor * quotient, divisor }
}

fn answer_for(expression: &Expression) -> i64 {
    match *expression {
        Expression::Add { a, b } => a + b,
        Expression::Subtract { minuend, subtrahend } => minuend - subtrahend,
        Expression::Multiply { a, b } => a * b,
        Expression::Divide { dividend, divisor } => dividend / divisor,
        Expression::SumTimes { a, b, factor } => (a + b) * factor,
    }
}

/// Current difficulty tier, read at the moment a challenge is requested.
#[async_trait]
pub trait DifficultySource: Send + Sync {
    async fn current_difficulty(&self) -> Difficulty;
}

/// Reads `difficulty_level` from the settings table.
pub struct SettingsDifficulty {
    database: Database,
    fallback: Difficulty,
}

impl SettingsDifficulty {
    pub fn new(database: Database, fallback: Difficulty) -> Self {
        Self { database, fallback }
    }
}

#[async_trait]
impl DifficultySource for SettingsDifficulty {
    async fn current_difficulty(&self) -> Difficulty {
        match SettingsQueries::get(&self.database, DIFFICULTY_LEVEL).await {
            Ok(Some(value)) => value.parse().unwrap_or_else(|_| {
                warn!("Ignoring unknown difficulty setting {:?}", value);
                self.fallback
            }),
            Ok(None) => self.fallback,
            Err(e) => {
                warn!("Failed to read difficulty setting: {}", e);
                self.fallback
            }
        }
    }
}
