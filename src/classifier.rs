//! Sample classification
//!
//! Maps a scan instance's attenuation and duration to a distance bucket and an
//! attenuation-weighted score. The weights approximate the device's own
//! exposure scoring but are not guaranteed to match it.

use crate::types::{ClassifiedSample, DistanceBucket, ExposureSample};

/// Upper bound (inclusive) of the ≤1m band
pub const IMMEDIATE_MAX_DB: i32 = 45;
/// Upper bound (inclusive) of the 1–2m band
pub const NEAR_MAX_DB: i32 = 59;
/// Upper bound (inclusive) of the 1–3m band
pub const MEDIUM_MAX_DB: i32 = 64;

/// Sample classifier for computing buckets and weighted scores
pub struct SampleClassifier;

impl SampleClassifier {
    /// Classify one reading.
    ///
    /// Returns the bucket of the typical attenuation, the score weighted by the
    /// typical attenuation, and the score weighted by the minimum attenuation.
    pub fn classify(
        typical_attenuation_db: i32,
        min_attenuation_db: i32,
        duration_seconds: u32,
    ) -> (DistanceBucket, f64, f64) {
        let bucket = bucket_for(typical_attenuation_db);
        let duration = f64::from(duration_seconds);
        let score = duration * multiplier(bucket);
        let min_score = duration * multiplier(bucket_for(min_attenuation_db));
        (bucket, score, min_score)
    }

    /// Classify a parsed sample
    pub fn classify_sample(sample: ExposureSample) -> ClassifiedSample {
        let (distance_bucket, score, min_score) = Self::classify(
            sample.typical_attenuation_db,
            sample.min_attenuation_db,
            sample.duration_seconds,
        );
        ClassifiedSample {
            sample,
            distance_bucket,
            score,
            min_score,
        }
    }
}

/// Bands are checked in ascending order; the first match wins
pub fn bucket_for(attenuation_db: i32) -> DistanceBucket {
    if attenuation_db <= IMMEDIATE_MAX_DB {
        DistanceBucket::Immediate
    } else if attenuation_db <= NEAR_MAX_DB {
        DistanceBucket::Near
    } else if attenuation_db <= MEDIUM_MAX_DB {
        DistanceBucket::Medium
    } else {
        DistanceBucket::Other
    }
}

/// Score weight of a bucket
pub fn multiplier(bucket: DistanceBucket) -> f64 {
    match bucket {
        DistanceBucket::Immediate => 1.0,
        DistanceBucket::Near => 2.5,
        DistanceBucket::Medium => 1.3,
        DistanceBucket::Other => 0.01,
    }
}
