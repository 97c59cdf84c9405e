use strata_core::{Key, Record};

use super::Upstream;
use crate::error::IteratorError;
use crate::setting::{options, IteratorSetting};

/// Drops records whose age has reached the time-to-live.
///
/// `age = current_time - timestamp`; a record is kept while `age < ttl`.
/// Records from the future have a negative age and are always kept.
#[derive(Debug, Clone)]
pub struct AgeOff {
    ttl: i64,
    /// Explicit reference time from the `currentTime` option.
    fixed_time: Option<i64>,
    current_time: i64,
    negate: bool,
}

impl AgeOff {
    pub fn from_setting(setting: &IteratorSetting) -> Result<Self, IteratorError> {
        let ttl = setting
            .i64_option(options::TTL)?
            .ok_or_else(|| IteratorError::config(&setting.name, "'ttl' must be set"))?;
        if ttl < 0 {
            return Err(IteratorError::config(
                &setting.name,
                format!("'ttl' must not be negative, got {}", ttl),
            ));
        }
        let fixed_time = setting.i64_option(options::CURRENT_TIME)?;

        Ok(Self {
            ttl,
            fixed_time,
            current_time: fixed_time.unwrap_or(0),
            negate: setting.bool_option(options::NEGATE)?.unwrap_or(false),
        })
    }

    pub(crate) fn begin_pass(&mut self, now_ms: i64) {
        self.current_time = self.fixed_time.unwrap_or(now_ms);
    }

    pub fn accept(&self, key: &Key) -> bool {
        let age = self.current_time.saturating_sub(key.timestamp);
        (age < self.ttl) != self.negate
    }

    pub(crate) fn step<I>(&mut self, upstream: &mut Upstream<'_, I>) -> Result<Option<Record>, IteratorError>
    where
        I: Iterator<Item = Record>,
    {
        while let Some(record) = upstream.next()? {
            if self.accept(&record.key) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
