use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::services::alerts::{AlertCycle, CycleReport, StopFlag};

/// When alert cycles fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Six-field cron expression (seconds first).
    Cron(String),
    Every(Duration),
}

impl Schedule {
    /// Accepts `@hourly`, `@daily`, `@midnight`, `@weekly`, `@every <duration>`
    /// (e.g. `@every 1h30m`), or a five- or six-field cron expression.
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();

        if let Some(duration) = expr.strip_prefix("@every") {
            let every = parse_duration(duration.trim())?;
            if every.is_zero() {
                bail!("@every interval must be greater than zero");
            }
            return Ok(Self::Every(every));
        }

        let cron = match expr {
            "@hourly" => "0 0 * * * *".to_string(),
            "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
            "@weekly" => "0 0 0 * * Sun".to_string(),
            other if other.starts_with('@') => bail!("Unknown schedule macro: {other}"),
            other => {
                let fields: Vec<&str> = other.split_whitespace().collect();
                if let Some(bad) = fields.iter().find(|field| !is_cron_field(field)) {
                    bail!("Invalid cron field '{bad}' in {other}");
                }
                match fields.len() {
                    6 => fields.join(" "),
                    5 => format!("0 {}", fields.join(" ")),
                    n => bail!("Cron expression must have 5 or 6 fields, got {n}"),
                }
            }
        };

        Ok(Self::Cron(cron))
    }
}

const CRON_NAMES: [&str; 19] = [
    "sun", "mon", "tue", "wed", "thu", "fri", "sat", "jan", "feb", "mar", "apr", "may", "jun",
    "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Numbers, ranges, steps, lists, `*`, `?`, `L`/`W`/`#` modifiers, and
/// three-letter day or month names.
fn is_cron_field(field: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    field.split([',', '-', '/']).all(|token| {
        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "*" | "?" | "l" | "lw" => true,
            t if all_digits(t) => true,
            t if CRON_NAMES.contains(&t) => true,
            t => {
                if let Some((day, nth)) = t.split_once('#') {
                    return (all_digits(day) || CRON_NAMES.contains(&day)) && all_digits(nth);
                }
                t.strip_suffix(['l', 'w'])
                    .is_some_and(|base| all_digits(base) || CRON_NAMES.contains(&base))
            }
        }
    })
}

/// Parses durations like `90s`, `30m`, `1h30m`.
fn parse_duration(value: &str) -> Result<Duration> {
    if value.is_empty() {
        bail!("Missing duration");
    }

    let mut total = 0u64;
    let mut digits = String::new();

    for ch in value.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let amount: u64 = digits
            .parse()
            .with_context(|| format!("Invalid duration: {value}"))?;
        digits.clear();

        let unit = match ch {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => bail!("Invalid duration unit '{ch}' in {value}"),
        };
        total = total.saturating_add(amount.saturating_mul(unit));
    }

    if !digits.is_empty() {
        bail!("Duration {value} is missing a unit");
    }

    Ok(Duration::from_secs(total))
}

/// Held while a cycle runs; releases the in-flight flag on drop.
pub struct CycleGuard {
    flag: Arc<AtomicBool>,
}

impl CycleGuard {
    #[must_use]
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    cycle: Arc<AlertCycle>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
    in_flight: Arc<AtomicBool>,
    stop: StopFlag,
}

impl Scheduler {
    pub fn new(cycle: Arc<AlertCycle>, config: SchedulerConfig) -> Self {
        Self {
            cycle,
            config,
            running: Arc::new(RwLock::new(false)),
            in_flight: Arc::new(AtomicBool::new(false)),
            stop: StopFlag::new(),
        }
    }

    /// Runs until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        let schedule = Schedule::parse(&self.config.schedule)?;

        // A previous stop() leaves the flag set; clear it for the new run.
        self.stop.reset();
        *self.running.write().await = true;
        info!("Starting alert scheduler");

        match schedule {
            Schedule::Cron(expr) => self.run_with_cron(&expr).await,
            Schedule::Every(every) => self.run_with_interval(every).await,
        }
    }

    /// Stops firing new cycles. An in-flight cycle finishes its current
    /// search; we wait up to the configured grace period for it.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.stop.request_stop();

        if self.wait_for_idle().await {
            info!("Scheduler stopped");
        } else {
            warn!(
                "Alert cycle still running after {}s, abandoning it",
                self.config.shutdown_grace_seconds
            );
        }
    }

    async fn wait_for_idle(&self) -> bool {
        let deadline = Instant::now() + Duration::from_secs(self.config.shutdown_grace_seconds);
        while self.in_flight.load(Ordering::Acquire) {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        true
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Runs one cycle now, unless one is already in flight.
    pub async fn run_once(&self) -> Option<CycleReport> {
        if !self.in_flight.load(Ordering::Acquire) {
            self.stop.reset();
        }
        fire(&self.cycle, &self.in_flight, &self.stop).await
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let cycle = Arc::clone(&self.cycle);
        let running = Arc::clone(&self.running);
        let in_flight = Arc::clone(&self.in_flight);
        let stop = self.stop.clone();

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let cycle = Arc::clone(&cycle);
            let running = Arc::clone(&running);
            let in_flight = Arc::clone(&in_flight);
            let stop = stop.clone();
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                fire(&cycle, &in_flight, &stop).await;
            })
        })
        .with_context(|| format!("Invalid cron expression: {cron_expr}"))?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        // Job tasks end with the scheduler, so let a running cycle finish first.
        self.wait_for_idle().await;
        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self, every: Duration) -> Result<()> {
        info!("Scheduler running: alert cycle every {:?}", every);

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut watchdog = interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    let cycle = Arc::clone(&self.cycle);
                    let in_flight = Arc::clone(&self.in_flight);
                    let stop = self.stop.clone();
                    tokio::spawn(async move {
                        fire(&cycle, &in_flight, &stop).await;
                    });
                }
                _ = watchdog.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

async fn fire(
    cycle: &AlertCycle,
    in_flight: &Arc<AtomicBool>,
    stop: &StopFlag,
) -> Option<CycleReport> {
    let Some(_guard) = CycleGuard::try_acquire(in_flight) else {
        warn!(
            event = "job_skipped",
            job_name = "alert_cycle",
            "Previous alert cycle still running, skipping this trigger"
        );
        metrics::counter!("alert_cycles_skipped_total").increment(1);
        return None;
    };

    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "alert_cycle", "Starting scheduled alert cycle");

    match cycle.run_cycle(stop).await {
        Ok(report) => {
            info!(
                event = "job_finished",
                job_name = "alert_cycle",
                duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                "Scheduled alert cycle finished"
            );
            Some(report)
        }
        Err(e) => {
            error!(event = "job_failed", job_name = "alert_cycle", error = %e, "Alert cycle failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_macros() {
        assert_eq!(
            Schedule::parse("@hourly").unwrap(),
            Schedule::Cron("0 0 * * * *".to_string())
        );
        assert_eq!(
            Schedule::parse("@daily").unwrap(),
            Schedule::Cron("0 0 0 * * *".to_string())
        );
        assert_eq!(
            Schedule::parse(" @midnight ").unwrap(),
            Schedule::Cron("0 0 0 * * *".to_string())
        );
        assert!(Schedule::parse("@yearly-ish").is_err());
    }

    #[test]
    fn test_parse_every() {
        assert_eq!(
            Schedule::parse("@every 1h30m").unwrap(),
            Schedule::Every(Duration::from_secs(5400))
        );
        assert_eq!(
            Schedule::parse("@every 45s").unwrap(),
            Schedule::Every(Duration::from_secs(45))
        );
        assert!(Schedule::parse("@every 0s").is_err());
        assert!(Schedule::parse("@every 10").is_err());
        assert!(Schedule::parse("@every soon").is_err());
        assert!(Schedule::parse("@every").is_err());
    }

    #[test]
    fn test_parse_cron() {
        assert_eq!(
            Schedule::parse("*/15 * * * *").unwrap(),
            Schedule::Cron("0 */15 * * * *".to_string())
        );
        assert_eq!(
            Schedule::parse("0 30 9 * * Mon").unwrap(),
            Schedule::Cron("0 30 9 * * Mon".to_string())
        );
        assert!(Schedule::parse("* *").is_err());
    }

    #[test]
    fn test_parse_cron_rejects_garbage_fields() {
        assert!(Schedule::parse("a b c d e").is_err());
        assert!(Schedule::parse("0 9 * * whenever").is_err());
        assert!(Schedule::parse("0 0 25:00 * * *").is_err());
        assert!(Schedule::parse("*/ * * * *").is_err());

        assert_eq!(
            Schedule::parse("0 9-17/2 * jan-jun MON,wed").unwrap(),
            Schedule::Cron("0 0 9-17/2 * jan-jun MON,wed".to_string())
        );
        assert!(Schedule::parse("0 0 12 L * ?").is_ok());
        assert!(Schedule::parse("0 0 12 15W * *").is_ok());
        assert!(Schedule::parse("0 0 12 ? * FRI#3").is_ok());
        assert!(Schedule::parse("0 0 12 ? * 5L").is_ok());
    }

    #[test]
    fn test_cycle_guard_is_single_flight() {
        let flag = Arc::new(AtomicBool::new(false));

        let first = CycleGuard::try_acquire(&flag);
        assert!(first.is_some());
        assert!(CycleGuard::try_acquire(&flag).is_none());

        drop(first);
        assert!(CycleGuard::try_acquire(&flag).is_some());
    }
}
