//! Nightly schedule around the batch load

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sportmonks_client::SportMonks;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{RetryConfig, StoreConfig};
use crate::fixtures::load_fixtures_range;
use crate::reference::load_reference_tables;
use crate::writer::{IfExists, PgWriter};

/// Runs the nightly load: reference tables first, then today's fixtures
/// for every configured league.
pub struct NightlyLoader {
    config: StoreConfig,
    client: SportMonks,
    writer: PgWriter,
}

impl NightlyLoader {
    /// Build the API client and database pool from configuration
    pub async fn new(config: StoreConfig) -> Result<Self> {
        let client = config.api.client()?;
        let writer = PgWriter::connect(&config.database).await?;

        Ok(Self { config, client, writer })
    }

    /// Run forever: sleep until the configured fetch time, load, repeat.
    pub async fn run(&self) -> Result<()> {
        info!("starting nightly loader schedule");

        loop {
            let next_fetch =
                next_fetch_time_after(Utc::now(), &self.config.scheduler.nightly_fetch_time);
            let sleep_duration =
                (next_fetch - Utc::now()).to_std().unwrap_or(Duration::from_secs(3600));

            info!(%next_fetch, "next load scheduled");
            sleep(sleep_duration).await;

            match run_with_retry(|| self.run_once(), &self.config.scheduler.retry).await {
                Ok(()) => info!("nightly load completed"),
                Err(e) => error!(error = %format!("{e:#}"), "nightly load failed after retries"),
            }
        }
    }

    /// One full batch for today's fixtures.
    pub async fn run_once(&self) -> Result<()> {
        let today = Utc::now().date_naive();
        self.load_range(today, today).await
    }

    /// One full batch for a date range: replace the reference tables, then
    /// append each league's fixtures.
    pub async fn load_range(&self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        let started = Instant::now();

        load_reference_tables(&self.client, &self.writer).await?;

        for job in &self.config.loader.leagues {
            load_fixtures_range(
                &self.client,
                &self.writer,
                &self.config.loader,
                job,
                start,
                end,
                IfExists::Append,
            )
            .await
            .with_context(|| format!("failed to load league table {}", job.table))?;
        }

        info!(elapsed = ?started.elapsed(), "batch load complete");
        Ok(())
    }

    /// The client, for binaries that only fetch
    pub fn client(&self) -> &SportMonks {
        &self.client
    }
}

/// Next occurrence of `HH:MM` UTC strictly after `now`. An unparseable
/// time falls back to 03:00.
fn next_fetch_time_after(now: DateTime<Utc>, fetch_time: &str) -> DateTime<Utc> {
    let fetch_time = NaiveTime::parse_from_str(fetch_time, "%H:%M")
        .unwrap_or_else(|_| NaiveTime::from_hms_opt(3, 0, 0).unwrap());

    let today_fetch = now.date_naive().and_time(fetch_time).and_utc();

    if today_fetch > now {
        today_fetch
    } else {
        (now.date_naive() + chrono::Duration::days(1)).and_time(fetch_time).and_utc()
    }
}

/// Run a batch with bounded exponential backoff between attempts.
async fn run_with_retry<F, Fut, T>(mut f: F, retry: &RetryConfig) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut delay = Duration::from_secs(retry.initial_delay_secs);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= retry.max_retries {
                    return Err(e);
                }

                warn!(attempt, error = %format!("{e:#}"), ?delay, "load attempt failed, retrying");
                sleep(delay).await;

                delay = Duration::from_secs(
                    (delay.as_secs() as f64 * retry.backoff_multiplier)
                        .min(retry.max_delay_secs as f64) as u64,
                );
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fetch_time_later_today_is_today() {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 1, 0, 0).unwrap();
        let next = next_fetch_time_after(now, "03:00");
        assert_eq!(next, Utc.with_ymd_and_hms(2020, 6, 1, 3, 0, 0).unwrap());
    }

    #[test]
    fn fetch_time_already_past_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 4, 0, 0).unwrap();
        let next = next_fetch_time_after(now, "03:00");
        assert_eq!(next, Utc.with_ymd_and_hms(2020, 6, 2, 3, 0, 0).unwrap());
    }

    #[test]
    fn exactly_at_fetch_time_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 3, 0, 0).unwrap();
        let next = next_fetch_time_after(now, "03:00");
        assert_eq!(next, Utc.with_ymd_and_hms(2020, 6, 2, 3, 0, 0).unwrap());
    }

    #[test]
    fn garbage_fetch_times_fall_back() {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 1, 0, 0).unwrap();
        let next = next_fetch_time_after(now, "not a time");
        assert_eq!(next, Utc.with_ymd_and_hms(2020, 6, 1, 3, 0, 0).unwrap());
    }

    #[test]
    fn retries_give_up_after_the_configured_attempts() {
        let retry = RetryConfig {
            max_retries: 3,
            initial_delay_secs: 0,
            max_delay_secs: 0,
            backoff_multiplier: 2.0,
        };

        let mut attempts = 0;
        let result: Result<()> = tokio_test::block_on(run_with_retry(
            || {
                attempts += 1;
                async { anyhow::bail!("always fails") }
            },
            &retry,
        ));

        assert!(result.is_err());
        assert_eq!(attempts, 3);
    }

    #[test]
    fn retries_stop_on_first_success() {
        let retry = RetryConfig {
            max_retries: 3,
            initial_delay_secs: 0,
            max_delay_secs: 0,
            backoff_multiplier: 2.0,
        };

        let mut attempts = 0;
        let result = tokio_test::block_on(run_with_retry(
            || {
                attempts += 1;
                let attempt = attempts;
                async move {
                    if attempt < 2 {
                        anyhow::bail!("first attempt fails")
                    }
                    Ok(attempt)
                }
            },
            &retry,
        ));

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts, 2);
    }
}
