use crate::config::ScheduleConfig;
use crate::error::{Result, ScraperError};
use crate::pipeline::Pipeline;
use crate::types::RunSummary;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Daily time-triggered invocation of the pipeline.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    schedule: ScheduleConfig,
    retry_delay: Duration,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, schedule: ScheduleConfig) -> Self {
        Self {
            pipeline,
            schedule,
            retry_delay: Duration::from_secs(60),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sleep until each trigger time and run; never returns unless the schedule is invalid.
    pub async fn run_forever(&self) -> Result<()> {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, &self.schedule)?;
            let wait = (next - now).to_std().unwrap_or_default();
            info!("Next scheduled scrape at {} (in {}s)", next, wait.as_secs());
            tokio::time::sleep(wait).await;

            match run_with_retries(&self.pipeline, self.schedule.retry_count, self.retry_delay).await {
                Ok(summary) => info!("Scheduled scrape succeeded: {}", summary.message),
                Err(e) => error!("Scheduled scrape failed after retries: {}", e),
            }
        }
    }
}

/// Run the pipeline, retrying up to `retries` more times with linear backoff.
pub async fn run_with_retries(
    pipeline: &Pipeline,
    retries: u32,
    base_delay: Duration,
) -> Result<RunSummary> {
    let mut attempt: u32 = 0;
    loop {
        match pipeline.run().await {
            Ok(summary) => return Ok(summary),
            Err(e) if attempt < retries => {
                attempt += 1;
                let delay = base_delay * attempt;
                warn!(
                    "Scrape attempt {} failed ({}); retrying in {}s",
                    attempt,
                    e,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// First `hour:minute` in the configured UTC offset strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, schedule: &ScheduleConfig) -> Result<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(schedule.utc_offset_hours * 3600).ok_or_else(|| {
        ScraperError::Config(format!("invalid UTC offset {}", schedule.utc_offset_hours))
    })?;
    let local_now = now.with_timezone(&offset);
    let trigger_time = local_now
        .date_naive()
        .and_hms_opt(schedule.hour, schedule.minute, 0)
        .ok_or_else(|| {
            ScraperError::Config(format!(
                "invalid trigger time {:02}:{:02}",
                schedule.hour, schedule.minute
            ))
        })?;
    let today = offset
        .from_local_datetime(&trigger_time)
        .single()
        .ok_or_else(|| ScraperError::Config("ambiguous trigger time".into()))?;

    let next = if today > local_now {
        today
    } else {
        today + ChronoDuration::days(1)
    };
    Ok(next.with_timezone(&Utc))
}
