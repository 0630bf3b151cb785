use crate::pipeline::{JobRunner, RunError};
use chrono::{DateTime, Datelike, Days, Duration, NaiveTime, Utc, Weekday};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// 00:00 UTC on Sunday, Wednesday and Saturday
pub const DEFAULT_FETCH_SCHEDULE: &str = "0 0 * * 0,3,6";

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("expected 5 fields (minute hour day-of-month month day-of-week), got {0}")]
    FieldCount(usize),

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("only '*' is supported for day-of-month and month")]
    Unsupported,
}

/// A weekly trigger in the restricted cron form `M H * * D[,D...]`, always in UTC
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSchedule {
    minute: u32,
    hour: u32,
    weekdays: Vec<Weekday>,
}

impl FetchSchedule {
    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    /// The first trigger strictly later than `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN);
        let start = after.date_naive();

        (0..=7)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .filter(|day| self.weekdays.contains(&day.weekday()))
            .map(|day| day.and_time(time).and_utc())
            .find(|candidate| *candidate > after)
            .unwrap_or(after + Duration::days(7))
    }
}

fn parse_field(value: &str, field: &'static str, max: u32) -> Result<u32, ScheduleError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| ScheduleError::InvalidField {
            field,
            value: value.to_string(),
        })
}

fn parse_weekday(value: &str) -> Result<Weekday, ScheduleError> {
    match value.trim() {
        "0" | "7" => Ok(Weekday::Sun),
        "1" => Ok(Weekday::Mon),
        "2" => Ok(Weekday::Tue),
        "3" => Ok(Weekday::Wed),
        "4" => Ok(Weekday::Thu),
        "5" => Ok(Weekday::Fri),
        "6" => Ok(Weekday::Sat),
        other => Err(ScheduleError::InvalidField {
            field: "day-of-week",
            value: other.to_string(),
        }),
    }
}

impl FromStr for FetchSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ScheduleError::FieldCount(fields.len()));
        }

        let minute = parse_field(fields[0], "minute", 59)?;
        let hour = parse_field(fields[1], "hour", 23)?;
        if fields[2] != "*" || fields[3] != "*" {
            return Err(ScheduleError::Unsupported);
        }

        let mut weekdays = if fields[4] == "*" {
            vec![
                Weekday::Sun,
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
            ]
        } else {
            fields[4]
                .split(',')
                .map(parse_weekday)
                .collect::<Result<Vec<_>, _>>()?
        };
        weekdays.sort_by_key(|day| day.num_days_from_sunday());
        weekdays.dedup();

        Ok(Self {
            minute,
            hour,
            weekdays,
        })
    }
}

impl fmt::Display for FetchSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<String> = self
            .weekdays
            .iter()
            .map(|day| day.num_days_from_sunday().to_string())
            .collect();
        write!(f, "{} {} * * {}", self.minute, self.hour, days.join(","))
    }
}

/// Sleep until each trigger and run the job. Never returns.
///
/// A trigger that fires while a run is still in progress is skipped.
pub async fn run_scheduler(schedule: FetchSchedule, runner: Arc<JobRunner>) {
    info!(schedule = %schedule, "Scheduled data fetch enabled");

    loop {
        let now = Utc::now();
        let next = schedule.next_after(now);
        info!(next = %next, "Next scheduled data fetch");

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        info!("Running scheduled data fetch...");
        match runner.try_run(Utc::now().date_naive()).await {
            Ok(outcome) => info!(?outcome, "Scheduled data fetch finished"),
            Err(RunError::AlreadyRunning) => {
                warn!("Previous data fetch still running, skipping this trigger")
            }
            Err(e) => error!(error = %e, "Scheduled data fetch failed"),
        }
    }
}
