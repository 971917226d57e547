//! Aggregation
//!
//! Groups the three record streams by day (and by distance bucket for
//! samples), builds four per-day tables, and merges them into one dense
//! [`ReportTable`]:
//! - exposure minutes, pivoted by bucket
//! - approximated score, pivoted by bucket
//! - contact count
//! - official score

use crate::report::{ReportRow, ReportTable, RowKey};
use crate::types::{ClassifiedSample, ContactEvent, DailyOfficialScore, DayKey};
use std::collections::{BTreeMap, BTreeSet};

const SECONDS_PER_MINUTE: f64 = 60.0;

/// Per-day values pivoted by distance bucket, plus the row total
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketPivot {
    pub by_bucket: [f64; 4],
    pub total: f64,
}

impl BucketPivot {
    fn from_buckets(by_bucket: [f64; 4]) -> Self {
        let total = by_bucket.iter().sum();
        Self { by_bucket, total }
    }
}

/// Aggregator for building the merged report
pub struct Aggregator;

impl Aggregator {
    /// Build the merged report from parsed record streams.
    ///
    /// Pure: the same input always yields an identical table.
    pub fn aggregate(
        daily_scores: &[DailyOfficialScore],
        samples: &[ClassifiedSample],
        events: &[ContactEvent],
    ) -> ReportTable {
        let minutes = exposure_minutes_table(samples);
        let scores = approximated_score_table(samples);
        let best_case = best_case_score_table(samples);
        let contacts = contact_count_table(events);
        let official = official_score_table(daily_scores);

        let days: BTreeSet<&DayKey> = minutes
            .keys()
            .chain(contacts.keys())
            .chain(official.keys())
            .collect();

        let rows: Vec<ReportRow> = days
            .into_iter()
            .map(|day| {
                let minutes = minutes.get(day).copied().unwrap_or_default();
                let scores = scores.get(day).copied().unwrap_or_default();
                ReportRow {
                    key: RowKey::Day(day.clone()),
                    minutes_by_bucket: minutes.by_bucket,
                    minutes_total: minutes.total,
                    contact_count: contacts.get(day).copied().unwrap_or(0),
                    official_score: official.get(day).copied().unwrap_or(0.0),
                    score_by_bucket: scores.by_bucket,
                    score_total: scores.total,
                    best_case_score: best_case.get(day).copied().unwrap_or(0.0),
                }
            })
            .collect();

        let grand_total = grand_total_row(&rows);

        if rows.is_empty() {
            log::warn!("aggregation produced no data rows");
        } else {
            log::debug!(
                "aggregated {} samples, {} events, {} daily scores into {} rows",
                samples.len(),
                events.len(),
                daily_scores.len(),
                rows.len()
            );
        }

        ReportTable::new(rows, grand_total)
    }
}

/// Exposure minutes per day and bucket: Σ seconds / 60
pub fn exposure_minutes_table(samples: &[ClassifiedSample]) -> BTreeMap<DayKey, BucketPivot> {
    let mut seconds: BTreeMap<DayKey, [f64; 4]> = BTreeMap::new();
    for s in samples {
        let cells = seconds.entry(s.sample.day_key()).or_insert([0.0; 4]);
        cells[s.distance_bucket.index()] += f64::from(s.sample.duration_seconds);
    }

    seconds
        .into_iter()
        .map(|(day, cells)| {
            let minutes = cells.map(|secs| secs / SECONDS_PER_MINUTE);
            (day, BucketPivot::from_buckets(minutes))
        })
        .collect()
}

/// Approximated score per day and bucket
pub fn approximated_score_table(samples: &[ClassifiedSample]) -> BTreeMap<DayKey, BucketPivot> {
    let mut scores: BTreeMap<DayKey, [f64; 4]> = BTreeMap::new();
    for s in samples {
        let cells = scores.entry(s.sample.day_key()).or_insert([0.0; 4]);
        cells[s.distance_bucket.index()] += s.score;
    }

    scores
        .into_iter()
        .map(|(day, cells)| (day, BucketPivot::from_buckets(cells)))
        .collect()
}

/// Best-case score per day
pub fn best_case_score_table(samples: &[ClassifiedSample]) -> BTreeMap<DayKey, f64> {
    let mut scores = BTreeMap::new();
    for s in samples {
        *scores.entry(s.sample.day_key()).or_insert(0.0) += s.min_score;
    }
    scores
}

/// Number of exposure windows per day
pub fn contact_count_table(events: &[ContactEvent]) -> BTreeMap<DayKey, u64> {
    let mut counts = BTreeMap::new();
    for e in events {
        *counts.entry(e.day_key()).or_insert(0) += 1;
    }
    counts
}

/// Official score per day.
///
/// Logs carry one summary per day; summing keeps duplicates from being lost.
pub fn official_score_table(daily_scores: &[DailyOfficialScore]) -> BTreeMap<DayKey, f64> {
    let mut scores = BTreeMap::new();
    for d in daily_scores {
        *scores.entry(d.day_key()).or_insert(0.0) += d.score;
    }
    scores
}

fn grand_total_row(rows: &[ReportRow]) -> ReportRow {
    let mut total = ReportRow::zeroed(RowKey::GrandTotal);
    for row in rows {
        for i in 0..4 {
            total.minutes_by_bucket[i] += row.minutes_by_bucket[i];
            total.score_by_bucket[i] += row.score_by_bucket[i];
        }
        total.contact_count += row.contact_count;
        total.official_score += row.official_score;
        total.best_case_score += row.best_case_score;
    }
    total.minutes_total = total.minutes_by_bucket.iter().sum();
    total.score_total = total.score_by_bucket.iter().sum();
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SampleClassifier;
    use crate::types::{DistanceBucket, ExposureSample};
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;

    const DAY_MS: i64 = 86_400_000;
    // 2022-08-15T10:00:00+09:00
    const AUG_15_MORNING: i64 = 1_660_525_200_000;

    fn at(millis: i64) -> chrono::DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .timestamp_millis_opt(millis)
            .unwrap()
    }

    fn sample(millis: i64, db: i32, secs: u32) -> ClassifiedSample {
        let ts = at(millis);
        let key = DayKey::from_timestamp(&ts);
        SampleClassifier::classify_sample(ExposureSample {
            date: key.date,
            day_of_week: key.day_of_week,
            timestamp: ts,
            typical_attenuation_db: db,
            min_attenuation_db: db,
            duration_seconds: secs,
        })
    }

    fn event(millis: i64) -> ContactEvent {
        let ts = at(millis);
        let key = DayKey::from_timestamp(&ts);
        ContactEvent {
            date: key.date,
            day_of_week: key.day_of_week,
            timestamp: ts,
        }
    }

    fn official(millis: i64, score: f64) -> DailyOfficialScore {
        let key = DayKey::from_timestamp(&at(millis));
        DailyOfficialScore {
            date: key.date,
            day_of_week: key.day_of_week,
            score,
        }
    }

    #[test]
    fn test_single_sample_report() {
        let table = Aggregator::aggregate(
            &[official(AUG_15_MORNING, 100.0)],
            &[sample(AUG_15_MORNING, 30, 120)],
            &[event(AUG_15_MORNING)],
        );

        assert_eq!(table.data_rows().len(), 1);
        let row = &table.data_rows()[0];
        assert_eq!(
            row.key,
            RowKey::Day(DayKey {
                date: NaiveDate::from_ymd_opt(2022, 8, 15).unwrap(),
                day_of_week: "Mon".into(),
            })
        );
        assert_eq!(row.minutes_by_bucket, [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(row.minutes_total, 2.0);
        assert_eq!(row.contact_count, 1);
        assert_eq!(row.official_score, 100.0);
        assert_eq!(row.score_by_bucket[DistanceBucket::Immediate.index()], 120.0);
        assert_eq!(row.score_total, 120.0);
    }

    #[test]
    fn test_two_buckets_same_day() {
        let samples = [
            sample(AUG_15_MORNING, 40, 60),
            sample(AUG_15_MORNING, 50, 30),
        ];
        let table = Aggregator::aggregate(&[], &samples, &[event(AUG_15_MORNING)]);

        let row = &table.data_rows()[0];
        assert_eq!(row.minutes_by_bucket, [1.0, 0.5, 0.0, 0.0]);
        assert_eq!(row.minutes_total, 1.5);
        assert_eq!(row.score_by_bucket, [60.0, 75.0, 0.0, 0.0]);
        assert_eq!(row.score_total, 135.0);
    }

    #[test]
    fn test_empty_streams_yield_zero_total_only() {
        let table = Aggregator::aggregate(&[], &[], &[]);
        assert!(!table.has_data());
        assert_eq!(table.grand_total(), &ReportRow::zeroed(RowKey::GrandTotal));
        assert_eq!(table.rows().count(), 1);
    }

    #[test]
    fn test_outer_merge_fills_zeros() {
        // Samples only on day 1, events only on day 2, official score only on day 3
        let day1 = AUG_15_MORNING;
        let day2 = AUG_15_MORNING + DAY_MS;
        let day3 = AUG_15_MORNING + 2 * DAY_MS;

        let table = Aggregator::aggregate(
            &[official(day3, 900.0)],
            &[sample(day1, 62, 600)],
            &[event(day2), event(day2)],
        );

        let rows = table.data_rows();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].minutes_total, 10.0);
        assert_eq!(rows[0].contact_count, 0);
        assert_eq!(rows[0].official_score, 0.0);

        assert_eq!(rows[1].minutes_total, 0.0);
        assert_eq!(rows[1].contact_count, 2);
        assert_eq!(rows[1].official_score, 0.0);

        assert_eq!(rows[2].minutes_total, 0.0);
        assert_eq!(rows[2].contact_count, 0);
        assert_eq!(rows[2].official_score, 900.0);
    }

    #[test]
    fn test_rows_ascend_by_date_with_total_last() {
        let later = AUG_15_MORNING + 5 * DAY_MS;
        let table = Aggregator::aggregate(
            &[],
            &[],
            &[event(later), event(AUG_15_MORNING), event(later)],
        );

        let labels: Vec<String> = table.rows().map(|r| r.key.date_label()).collect();
        assert_eq!(labels, vec!["2022-08-15", "2022-08-20", "Total"]);
        assert_eq!(table.grand_total().contact_count, 3);
    }

    #[test]
    fn test_totals_are_consistent() {
        let samples = [
            sample(AUG_15_MORNING, 30, 120),
            sample(AUG_15_MORNING, 55, 180),
            sample(AUG_15_MORNING, 63, 240),
            sample(AUG_15_MORNING + DAY_MS, 70, 300),
            sample(AUG_15_MORNING + DAY_MS, 44, 60),
            sample(AUG_15_MORNING + 2 * DAY_MS, 59, 90),
        ];
        let table = Aggregator::aggregate(&[], &samples, &[]);

        for row in table.rows() {
            let bucket_sum: f64 = row.minutes_by_bucket.iter().sum();
            assert_eq!(row.minutes_total, bucket_sum);
            let score_sum: f64 = row.score_by_bucket.iter().sum();
            assert_eq!(row.score_total, score_sum);
        }

        let all_cells: f64 = table
            .data_rows()
            .iter()
            .flat_map(|r| r.minutes_by_bucket.iter())
            .sum();
        assert!((table.grand_total().minutes_total - all_cells).abs() < 1e-9);
        assert_eq!(table.grand_total().minutes_total, 16.5);
    }

    #[test]
    fn test_duplicate_daily_scores_are_summed() {
        let table = Aggregator::aggregate(
            &[official(AUG_15_MORNING, 100.0), official(AUG_15_MORNING, 50.0)],
            &[],
            &[],
        );
        assert_eq!(table.data_rows().len(), 1);
        assert_eq!(table.data_rows()[0].official_score, 150.0);
    }

    #[test]
    fn test_best_case_score() {
        let ts = at(AUG_15_MORNING);
        let key = DayKey::from_timestamp(&ts);
        let s = SampleClassifier::classify_sample(ExposureSample {
            date: key.date,
            day_of_week: key.day_of_week,
            timestamp: ts,
            typical_attenuation_db: 66,
            min_attenuation_db: 50,
            duration_seconds: 100,
        });
        let table = Aggregator::aggregate(&[], &[s], &[]);
        assert_eq!(table.data_rows()[0].best_case_score, 250.0);
        assert_eq!(table.grand_total().best_case_score, 250.0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let samples = [sample(AUG_15_MORNING, 30, 120), sample(AUG_15_MORNING, 61, 45)];
        let events = [event(AUG_15_MORNING)];
        let scores = [official(AUG_15_MORNING, 300.0)];

        let first = Aggregator::aggregate(&scores, &samples, &events);
        let second = Aggregator::aggregate(&scores, &samples, &events);
        assert_eq!(first, second);
    }
}
