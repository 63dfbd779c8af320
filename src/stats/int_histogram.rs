use anyhow::Result;

use crate::error::DbError;
use crate::tuple::value::CompareOp;

/// A fixed-width histogram over one integer column, used to estimate the
/// selectivity of `column op constant` predicates. Space and update time are
/// constant in the number of recorded values.
#[derive(Debug)]
pub struct IntHistogram {
    buckets: Vec<usize>,
    min: i32,
    max: i32,
    // real-valued so the buckets exactly cover [min, max]
    bucket_width: f64,
    total: usize,
}

impl IntHistogram {
    pub fn new(buckets: usize, min: i32, max: i32) -> Result<Self> {
        if max < min {
            return Err(DbError::IllegalArgument(format!(
                "histogram bounds are inverted: min {} > max {}",
                min, max
            ))
            .into());
        }
        if buckets == 0 {
            return Err(
                DbError::IllegalArgument("a histogram needs at least one bucket".to_owned()).into(),
            );
        }

        let bucket_width = (max as f64 - min as f64 + 1.0) / buckets as f64;
        Ok(Self {
            buckets: vec![0; buckets],
            min,
            max,
            bucket_width,
            total: 0,
        })
    }

    /// Records one value. The value must lie within the bounds the histogram
    /// was created with.
    pub fn add_value(&mut self, v: i32) -> Result<()> {
        if v < self.min || v > self.max {
            return Err(DbError::IllegalArgument(format!(
                "value {} is outside the histogram range {}..={}",
                v, self.min, self.max
            ))
            .into());
        }
        let bucket = self.bucket_index(v);
        self.buckets[bucket] += 1;
        self.total += 1;
        Ok(())
    }

    fn bucket_index(&self, v: i32) -> usize {
        ((v as f64 - self.min as f64) / self.bucket_width) as usize
    }

    /// The smallest value covered by the bucket.
    fn bucket_min(&self, bucket: usize) -> i32 {
        (bucket as f64 * self.bucket_width).ceil() as i32 + self.min
    }

    /// The largest value covered by the bucket. With more buckets than
    /// distinct values some buckets collapse to a single value.
    fn bucket_max(&self, bucket: usize) -> i32 {
        let this_min = self.bucket_min(bucket);
        let next_min = self.bucket_min(bucket + 1);
        if this_min == next_min {
            this_min
        } else {
            next_min - 1
        }
    }

    fn selectivity_equal(&self, v: i32) -> f64 {
        if v < self.min || v > self.max {
            return 0.0;
        }
        let bucket = self.bucket_index(v);
        let height = self.buckets[bucket] as f64;
        let width = (self.bucket_max(bucket) - self.bucket_min(bucket) + 1) as f64;
        height / (width * self.total as f64)
    }

    fn selectivity_greater(&self, v: i32) -> f64 {
        if v > self.max {
            return 0.0;
        }
        if v < self.min {
            return 1.0;
        }
        let bucket = self.bucket_index(v);
        let height = self.buckets[bucket] as f64;
        let width = (self.bucket_max(bucket) - self.bucket_min(bucket) + 1) as f64;

        let mut selectivity =
            (self.bucket_max(bucket) - v) as f64 * height / (width * self.total as f64);
        for i in bucket + 1..self.buckets.len() {
            selectivity += self.buckets[i] as f64 / self.total as f64;
        }
        selectivity
    }

    fn selectivity_less(&self, v: i32) -> f64 {
        if v < self.min {
            return 0.0;
        }
        if v > self.max {
            return 1.0;
        }
        let bucket = self.bucket_index(v);
        let height = self.buckets[bucket] as f64;
        let width = (self.bucket_max(bucket) - self.bucket_min(bucket) + 1) as f64;

        let mut selectivity =
            (v - self.bucket_min(bucket)) as f64 * height / (width * self.total as f64);
        for i in 0..bucket {
            selectivity += self.buckets[i] as f64 / self.total as f64;
        }
        selectivity
    }

    /// The estimated fraction of recorded values satisfying `value op v`.
    pub fn estimate_selectivity(&self, op: CompareOp, v: i32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        match op {
            CompareOp::Equals | CompareOp::Like => self.selectivity_equal(v),
            CompareOp::NotEquals => 1.0 - self.selectivity_equal(v),
            CompareOp::GreaterThan => self.selectivity_greater(v),
            CompareOp::GreaterThanOrEq => self.selectivity_equal(v) + self.selectivity_greater(v),
            CompareOp::LessThan => self.selectivity_less(v),
            CompareOp::LessThanOrEq => self.selectivity_less(v) + self.selectivity_equal(v),
        }
    }
}
