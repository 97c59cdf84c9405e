//! The `(min, max, sum, count)` tuple folded by the statistics combiner.

use crate::encoding::{format_radix, parse_radix};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub min: i64,
    pub max: i64,
    pub sum: i64,
    pub count: i64,
}

impl Stats {
    /// Identity of [`Stats::merge`].
    pub const EMPTY: Stats = Stats {
        min: i64::MAX,
        max: i64::MIN,
        sum: 0,
        count: 0,
    };

    pub fn single(value: i64) -> Self {
        Self {
            min: value,
            max: value,
            sum: value,
            count: 1,
        }
    }

    /// Fold two tuples. Sum and count wrap on overflow so the fold stays
    /// associative and commutative.
    pub fn merge(self, other: Stats) -> Stats {
        Stats {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            sum: self.sum.wrapping_add(other.sum),
            count: self.count.wrapping_add(other.count),
        }
    }

    /// Parse `v` (a bare value) or `min,max,sum,count` in `radix`.
    pub fn parse(text: &str, radix: u32) -> Result<Stats, String> {
        let fields: Vec<&str> = text.split(',').collect();
        match fields.as_slice() {
            [v] => Ok(Stats::single(parse_radix(v, radix)?)),
            [min, max, sum, count] => Ok(Stats {
                min: parse_radix(min, radix)?,
                max: parse_radix(max, radix)?,
                sum: parse_radix(sum, radix)?,
                count: parse_radix(count, radix)?,
            }),
            _ => Err(format!(
                "expected 1 or 4 comma-separated fields, got {}",
                fields.len()
            )),
        }
    }

    pub fn encode(&self, radix: u32) -> String {
        format!(
            "{},{},{},{}",
            format_radix(self.min, radix),
            format_radix(self.max, radix),
            format_radix(self.sum, radix),
            format_radix(self.count, radix)
        )
    }
}

impl Default for Stats {
    fn default() -> Self {
        Stats::EMPTY
    }
}
