// src/utils/analytics.rs

//! Pure reductions over page-visit rows for the admin dashboard.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, DurationRound, NaiveDate, NaiveTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::{
    models::page_visit::{
        AnalyticsStats, BrowserStats, DeviceBreakdown, HourlyVisitData, TopPage, VisitSample,
        VisitTrendData,
    },
    utils::user_agent::DeviceType,
};

/// Cardinality of the distinct id set.
pub fn unique_visitors<'a, I>(visitor_ids: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    visitor_ids.into_iter().collect::<HashSet<_>>().len()
}

/// Mean of the known durations, rounded to whole seconds. 0 when none are known.
pub fn average_duration<I>(durations: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    let (sum, count) = durations
        .into_iter()
        .flatten()
        .fold((0i128, 0i128), |(sum, count), d| (sum + i128::from(d), count + 1));

    if count == 0 {
        0
    } else {
        (sum as f64 / count as f64).round() as i64
    }
}

/// Rounded share of `count` in `total`, in percent.
pub fn percentage(count: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as i64
}

/// Visits per device type. Missing or unrecognised types count as `unknown`.
pub fn device_breakdown<'a, I>(device_types: I) -> Vec<DeviceBreakdown>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: HashMap<DeviceType, i64> = HashMap::new();
    let mut total = 0;
    for device in device_types {
        *counts.entry(DeviceType::parse(device)).or_default() += 1;
        total += 1;
    }

    let mut out: Vec<DeviceBreakdown> = counts
        .into_iter()
        .map(|(device_type, visit_count)| DeviceBreakdown {
            device_type,
            visit_count,
            percentage: percentage(visit_count, total),
        })
        .collect();
    out.sort_by(|a, b| {
        b.visit_count
            .cmp(&a.visit_count)
            .then_with(|| a.device_type.as_str().cmp(b.device_type.as_str()))
    });
    out
}

/// Visits per browser, most used first. Rows without a browser are ignored.
pub fn browser_breakdown<'a, I>(browsers: I) -> Vec<BrowserStats>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: HashMap<&str, i64> = HashMap::new();
    let mut total = 0;
    for browser in browsers.into_iter().flatten() {
        *counts.entry(browser).or_default() += 1;
        total += 1;
    }

    let mut out: Vec<BrowserStats> = counts
        .into_iter()
        .map(|(browser, visit_count)| BrowserStats {
            browser: browser.to_string(),
            visit_count,
            percentage: percentage(visit_count, total),
        })
        .collect();
    out.sort_by(|a, b| b.visit_count.cmp(&a.visit_count).then_with(|| a.browser.cmp(&b.browser)));
    out
}

/// Start of the UTC day containing `now`.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// 24 hourly buckets ending with the hour containing `now`, zero-filled.
pub fn hourly_buckets<I>(timestamps: I, now: DateTime<Utc>) -> Vec<HourlyVisitData>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let current_hour = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);
    let first_hour = current_hour - TimeDelta::hours(23);

    let mut counts = [0i64; 24];
    for ts in timestamps {
        if ts < first_hour || ts > now {
            continue;
        }
        let idx = (ts - first_hour).num_hours();
        if let Some(slot) = usize::try_from(idx).ok().and_then(|i| counts.get_mut(i)) {
            *slot += 1;
        }
    }

    counts
        .iter()
        .enumerate()
        .map(|(i, count)| HourlyVisitData {
            hour_timestamp: first_hour + TimeDelta::hours(i as i64),
            visit_count: *count,
        })
        .collect()
}

/// Daily totals and distinct visitors from `start` to `end` inclusive, zero-filled.
pub fn daily_trend<'a, I>(visits: I, start: NaiveDate, end: NaiveDate) -> Vec<VisitTrendData>
where
    I: IntoIterator<Item = (DateTime<Utc>, &'a str)>,
{
    let mut days: BTreeMap<NaiveDate, (i64, HashSet<&str>)> = BTreeMap::new();
    let mut day = start;
    while day <= end {
        days.insert(day, (0, HashSet::new()));
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    for (ts, visitor) in visits {
        if let Some((total, visitors)) = days.get_mut(&ts.date_naive()) {
            *total += 1;
            visitors.insert(visitor);
        }
    }

    days.into_iter()
        .map(|(date, (total, visitors))| VisitTrendData {
            date,
            total_visits: total,
            unique_visitors: visitors.len() as i64,
        })
        .collect()
}

/// "42s", "3m 5s", "2h 10m".
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Dashboard totals over every recorded visit. "Today" is the current UTC day.
pub fn summarize(samples: &[VisitSample], most_visited_page: Option<TopPage>, now: DateTime<Utc>) -> AnalyticsStats {
    let today = day_start(now);
    let todays: Vec<&VisitSample> = samples.iter().filter(|v| v.visit_timestamp >= today).collect();
    let avg = average_duration(samples.iter().map(|v| v.session_duration));

    AnalyticsStats {
        total_visits: samples.len() as i64,
        total_visits_today: todays.len() as i64,
        unique_visitors_total: unique_visitors(samples.iter().map(|v| v.visitor_id.as_str())) as i64,
        unique_visitors_today: unique_visitors(todays.iter().map(|v| v.visitor_id.as_str())) as i64,
        avg_session_duration: avg,
        avg_session_duration_display: format_duration(avg),
        most_visited_page,
    }
}

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..13].to_string()
}

/// Self-reported visitor id; not guaranteed unique.
pub fn new_visitor_id(now: DateTime<Utc>) -> String {
    format!("visitor_{}_{}", now.timestamp_millis(), random_suffix())
}

pub fn new_session_id(now: DateTime<Utc>) -> String {
    format!("session_{}_{}", now.timestamp_millis(), random_suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn unique_visitors_ignores_order_and_duplicates() {
        let a = ["v1", "v2", "v1", "v3", "v2"];
        let mut b = a;
        b.reverse();
        assert_eq!(unique_visitors(a.iter().copied()), 3);
        assert_eq!(unique_visitors(b.iter().copied()), 3);
        assert_eq!(unique_visitors(Vec::<&str>::new()), 0);
    }

    #[test]
    fn average_skips_missing_durations() {
        assert_eq!(average_duration([Some(10), None, Some(21)]), 16);
        assert_eq!(average_duration([None, None]), 0);
    }

    #[test]
    fn average_survives_extreme_durations() {
        let avg = average_duration([Some(i64::MAX), Some(i64::MAX), None]);
        assert_eq!(avg, i64::MAX);
    }

    #[test]
    fn device_percentages() {
        let rows = [Some("desktop"), Some("mobile"), Some("desktop"), None];
        let out = device_breakdown(rows);
        assert_eq!(out[0].device_type, DeviceType::Desktop);
        assert_eq!(out[0].visit_count, 2);
        assert_eq!(out[0].percentage, 50);
        let unknown = out.iter().find(|d| d.device_type == DeviceType::Unknown).unwrap();
        assert_eq!(unknown.percentage, 25);
    }

    #[test]
    fn browsers_sorted_by_count_without_nulls() {
        let rows = [Some("Safari"), None, Some("Chrome"), Some("Chrome"), Some("Firefox")];
        let out = browser_breakdown(rows);
        assert_eq!(out[0].browser, "Chrome");
        assert_eq!(out[0].percentage, 50);
        assert_eq!(out.iter().map(|b| b.visit_count).sum::<i64>(), 4);
    }

    #[test]
    fn percentage_of_empty_total_is_zero() {
        assert_eq!(percentage(3, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
    }

    #[test]
    fn hourly_buckets_cover_the_last_day() {
        let now = at(15, 30);
        let visits = [at(15, 5), at(15, 25), at(14, 59), at(0, 0), at(16, 0)];
        let out = hourly_buckets(visits, now);
        assert_eq!(out.len(), 24);
        assert_eq!(out[23].hour_timestamp, at(15, 0));
        assert_eq!(out[23].visit_count, 2);
        assert_eq!(out[22].visit_count, 1);
        assert_eq!(out[0].hour_timestamp, Utc.with_ymd_and_hms(2025, 3, 9, 16, 0, 0).unwrap());
        assert_eq!(out.iter().map(|h| h.visit_count).sum::<i64>(), 4);
    }

    #[test]
    fn trend_counts_per_day() {
        let d1 = Utc.with_ymd_and_hms(2025, 3, 8, 10, 0, 0).unwrap();
        let d3 = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let visits = [(d1, "a"), (d1, "a"), (d1, "b"), (d3, "c")];
        let out = daily_trend(visits, d1.date_naive(), d3.date_naive());
        assert_eq!(out.len(), 3);
        assert_eq!((out[0].total_visits, out[0].unique_visitors), (3, 2));
        assert_eq!(out[1].total_visits, 0);
        assert_eq!((out[2].total_visits, out[2].unique_visitors), (1, 1));
    }

    #[test]
    fn day_start_is_utc_midnight() {
        assert_eq!(day_start(at(15, 30)), at(0, 0));
    }

    #[test]
    fn durations_are_human_readable() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(185), "3m 5s");
        assert_eq!(format_duration(7800), "2h 10m");
    }

    #[test]
    fn generated_ids_have_prefixes() {
        let now = at(1, 0);
        let v = new_visitor_id(now);
        assert!(v.starts_with(&format!("visitor_{}_", now.timestamp_millis())));
        assert_ne!(new_session_id(now), new_session_id(now));
    }

    #[test]
    fn summary_splits_today_from_total() {
        let yesterday = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 0).unwrap();
        let sample = |visitor: &str, ts, duration| VisitSample {
            visitor_id: visitor.to_string(),
            visit_timestamp: ts,
            session_duration: duration,
        };
        let samples = vec![
            sample("a", yesterday, Some(30)),
            sample("a", at(8, 0), None),
            sample("b", at(9, 0), Some(90)),
            sample("b", at(9, 5), None),
        ];

        let stats = summarize(&samples, None, at(12, 0));
        assert_eq!(stats.total_visits, 4);
        assert_eq!(stats.total_visits_today, 3);
        assert_eq!(stats.unique_visitors_total, 2);
        assert_eq!(stats.unique_visitors_today, 2);
        assert_eq!(stats.avg_session_duration, 60);
        assert_eq!(stats.avg_session_duration_display, "1m 0s");
    }
}
