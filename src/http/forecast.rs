//! Weather forecast payload returned to admitted callers.

use chrono::{Days, Local, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of days covered by one response.
pub const FORECAST_DAYS: u64 = 5;

/// Possible forecast summaries.
pub const SUMMARIES: [&str; 10] = [
    "Freezing",
    "Bracing",
    "Chilly",
    "Cool",
    "Mild",
    "Warm",
    "Balmy",
    "Hot",
    "Sweltering",
    "Scorching",
];

/// One day of forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    pub date: NaiveDate,
    pub temperature_c: i32,
    pub temperature_f: i32,
    pub summary: String,
}

impl WeatherForecast {
    pub fn new(date: NaiveDate, temperature_c: i32, summary: impl Into<String>) -> Self {
        Self {
            date,
            temperature_c,
            temperature_f: celsius_to_fahrenheit(temperature_c),
            summary: summary.into(),
        }
    }
}

fn celsius_to_fahrenheit(c: i32) -> i32 {
    32 + (f64::from(c) / 0.5556) as i32
}

/// Generate forecasts for the days following `today`.
pub fn generate_from<R: Rng + ?Sized>(today: NaiveDate, rng: &mut R) -> Vec<WeatherForecast> {
    (1..=FORECAST_DAYS)
        .map(|offset| {
            let summary = SUMMARIES.choose(&mut *rng).copied().unwrap_or(SUMMARIES[0]);
            WeatherForecast::new(
                today + Days::new(offset),
                rng.gen_range(-20..55),
                summary,
            )
        })
        .collect()
}

/// Generate forecasts starting tomorrow in local time.
pub fn generate() -> Vec<WeatherForecast> {
    generate_from(Local::now().date_naive(), &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_covers_following_days() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let forecasts = generate_from(today, &mut rng);

        assert_eq!(forecasts.len(), 5);
        assert_eq!(forecasts[0].date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(forecasts[4].date, NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
        for forecast in &forecasts {
            assert!((-20..55).contains(&forecast.temperature_c));
            assert!(SUMMARIES.contains(&forecast.summary.as_str()));
        }
    }

    #[test]
    fn test_fahrenheit_truncates() {
        assert_eq!(celsius_to_fahrenheit(0), 32);
        assert_eq!(celsius_to_fahrenheit(-20), 32 - 35);
        assert_eq!(celsius_to_fahrenheit(54), 32 + 97);
    }

    #[test]
    fn test_serializes_camel_case() {
        let forecast = WeatherForecast::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), 10, "Mild");
        let json = serde_json::to_value(&forecast).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "date": "2025-03-01",
                "temperatureC": 10,
                "temperatureF": 49,
                "summary": "Mild"
            })
        );
    }
}
