//! Weekly sky context
//!
//! Computed locally from mean lunar motion and the sun-sign date table,
//! held once per week for the whole process, and shared through the store.

use super::profile::approximate_moon_sign;
use super::with_timeout;
use crate::models::{MoonPhase, SkyContext, SkyEvent, SkyEventKind};
use crate::services::ContentStore;
use crate::zodiac::ZodiacSign;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const SYNODIC_MONTH_DAYS: f64 = 29.530588853;
const SECONDS_PER_DAY: f64 = 86_400.0;

const QUARTERS: [(SkyEventKind, MoonPhase); 4] = [
    (SkyEventKind::NewMoon, MoonPhase::NewMoon),
    (SkyEventKind::FirstQuarter, MoonPhase::FirstQuarter),
    (SkyEventKind::FullMoon, MoonPhase::FullMoon),
    (SkyEventKind::LastQuarter, MoonPhase::LastQuarter),
];

const PHASES: [MoonPhase; 8] = [
    MoonPhase::NewMoon,
    MoonPhase::WaxingCrescent,
    MoonPhase::FirstQuarter,
    MoonPhase::WaxingGibbous,
    MoonPhase::FullMoon,
    MoonPhase::WaningGibbous,
    MoonPhase::LastQuarter,
    MoonPhase::WaningCrescent,
];

/// New moon of 2000-01-06 18:14 UTC
fn reference_new_moon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 6)
        .and_then(|d| d.and_hms_opt(18, 14, 0))
        .unwrap_or_default()
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Days since the most recent new moon
pub fn moon_age_days(instant: NaiveDateTime) -> f64 {
    let days = (instant - reference_new_moon()).num_seconds() as f64 / SECONDS_PER_DAY;
    days.rem_euclid(SYNODIC_MONTH_DAYS)
}

/// Nearest of the eight phases for a moon age
pub fn phase_for_age(age_days: f64) -> MoonPhase {
    let eighths = (age_days / SYNODIC_MONTH_DAYS * 8.0).round() as usize;
    PHASES[eighths % 8]
}

fn quarter_events(week_start: NaiveDate) -> Vec<SkyEvent> {
    let start = midnight(week_start);
    let age = moon_age_days(start);
    let mut events = Vec::new();

    for (quarter, (kind, phase)) in QUARTERS.iter().enumerate() {
        let target = SYNODIC_MONTH_DAYS * quarter as f64 / 4.0;
        let until = (target - age).rem_euclid(SYNODIC_MONTH_DAYS);
        if until >= 7.0 {
            continue;
        }
        let instant = start + Duration::seconds((until * SECONDS_PER_DAY) as i64);
        let sign = approximate_moon_sign(instant);
        events.push(SkyEvent {
            date: instant.date(),
            kind: *kind,
            sign,
            description: format!("{} in {}", phase.label(), sign),
        });
    }
    events
}

fn ingress_events(week_start: NaiveDate) -> Vec<SkyEvent> {
    (0..7)
        .filter_map(|offset| {
            let date = week_start + Duration::days(offset);
            let sign = ZodiacSign::from_date(date);
            let previous = ZodiacSign::from_date(date - Duration::days(1));
            (sign != previous).then(|| SkyEvent {
                date,
                kind: SkyEventKind::SunIngress,
                sign,
                description: format!("Sun enters {}", sign),
            })
        })
        .collect()
}

/// Sky context for the week beginning at `week_start`
pub fn compute_sky_context(week_start: NaiveDate) -> SkyContext {
    let start = midnight(week_start);
    let age = moon_age_days(start);

    let mut events = quarter_events(week_start);
    events.extend(ingress_events(week_start));
    events.sort_by_key(|event| event.date);

    SkyContext {
        week_start,
        moon_phase: phase_for_age(age),
        lunar_day: age.floor() as u8,
        moon_sign: approximate_moon_sign(start),
        sun_sign: ZodiacSign::from_date(week_start),
        events,
    }
}

/// Process-wide per-week sky context: memory, then store, then computed
pub struct SkyContextSource {
    store: ContentStore,
    remote_timeout: std::time::Duration,
    weeks: RwLock<HashMap<NaiveDate, SkyContext>>,
}

impl SkyContextSource {
    pub fn new(store: ContentStore, remote_timeout: std::time::Duration) -> Self {
        Self {
            store,
            remote_timeout,
            weeks: RwLock::new(HashMap::new()),
        }
    }

    /// Never fails; store problems only cost a local computation
    pub async fn context_for(&self, week_start: NaiveDate) -> SkyContext {
        if let Some(sky) = self.weeks.read().await.get(&week_start) {
            return sky.clone();
        }

        let fetched = with_timeout(
            self.remote_timeout,
            "sky context fetch",
            self.store.fetch_sky_context(week_start),
        )
        .await;

        let sky = match fetched {
            Ok(Some(sky)) => {
                debug!(week = %week_start, "Sky context loaded from store");
                sky
            }
            missed => {
                if let Err(e) = missed {
                    warn!(week = %week_start, error = %e, "Sky context fetch failed, computing locally");
                }
                let sky = compute_sky_context(week_start);
                match with_timeout(
                    self.remote_timeout,
                    "sky context save",
                    self.store.save_sky_context(&sky),
                )
                .await
                {
                    Ok(()) => info!(week = %week_start, "Sky context computed and stored"),
                    Err(e) => warn!(week = %week_start, error = %e, "Sky context not persisted"),
                }
                sky
            }
        };

        let mut weeks = self.weeks.write().await;
        weeks.retain(|week, _| *week >= week_start - Duration::days(7));
        weeks.insert(week_start, sky.clone());
        sky
    }
}
