use strata_core::{Key, PartialKey, Record, Value};
use tracing::trace;

use super::stats::Stats;
use super::Upstream;
use crate::columns::ColumnPolicy;
use crate::encoding::{LongEncoding, MAX_RADIX, MIN_RADIX};
use crate::error::IteratorError;
use crate::setting::{options, IteratorSetting, StageKind};

/// How a combiner folds the values of one aggregation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum(LongEncoding),
    Stats { radix: u32 },
}

/// Running fold over one group.
enum Accumulator {
    Sum(i64),
    Stats(Stats),
}

impl Reducer {
    fn start(&self) -> Accumulator {
        match self {
            Reducer::Sum(_) => Accumulator::Sum(0),
            Reducer::Stats { .. } => Accumulator::Stats(Stats::EMPTY),
        }
    }

    fn add(&self, acc: &mut Accumulator, record: &Record) -> Result<(), IteratorError> {
        match (self, acc) {
            (Reducer::Sum(encoding), Accumulator::Sum(total)) => {
                let v = encoding
                    .decode(record.value.as_bytes())
                    .map_err(|e| IteratorError::decode(&record.key, encoding.to_string(), e))?;
                *total = total.saturating_add(v);
            }
            (Reducer::Stats { radix }, Accumulator::Stats(stats)) => {
                let text = record.value.as_str().ok_or_else(|| {
                    IteratorError::decode(&record.key, self.label(), "not UTF-8 text")
                })?;
                let parsed = Stats::parse(text, *radix)
                    .map_err(|e| IteratorError::decode(&record.key, self.label(), e))?;
                *stats = stats.merge(parsed);
            }
            _ => unreachable!("accumulator always comes from Reducer::start"),
        }
        Ok(())
    }

    fn finish(&self, acc: Accumulator) -> Value {
        match (self, acc) {
            (Reducer::Sum(encoding), Accumulator::Sum(total)) => Value::new(encoding.encode(total)),
            (Reducer::Stats { radix }, Accumulator::Stats(stats)) => Value::from(stats.encode(*radix)),
            _ => unreachable!("accumulator always comes from Reducer::start"),
        }
    }

    fn label(&self) -> String {
        match self {
            Reducer::Sum(encoding) => encoding.to_string(),
            Reducer::Stats { radix } => format!("stats(radix {})", radix),
        }
    }
}

/// Folds every run of consecutive records of the same cell into one record.
///
/// The emitted record takes the key of the group's first (newest) member.
/// Deletion markers and columns outside the policy pass through untouched,
/// and a deletion marker ends the group in progress.
#[derive(Debug, Clone)]
pub struct Combiner {
    policy: ColumnPolicy,
    group_by: PartialKey,
    reducer: Reducer,
    lookahead: Option<Record>,
}

impl Combiner {
    pub fn from_setting(setting: &IteratorSetting) -> Result<Self, IteratorError> {
        let reducer = match setting.kind {
            StageKind::SummingCombiner => {
                let encoding = match setting.get(options::ENCODING) {
                    Some(raw) => raw
                        .parse::<LongEncoding>()
                        .map_err(|e| IteratorError::config(&setting.name, e))?,
                    None => LongEncoding::default(),
                };
                Reducer::Sum(encoding)
            }
            StageKind::StatsCombiner => {
                let radix = setting.u32_option(options::RADIX)?.unwrap_or(10);
                if !(MIN_RADIX..=MAX_RADIX).contains(&radix) {
                    return Err(IteratorError::config(
                        &setting.name,
                        format!("'radix' must be between {} and {}, got {}", MIN_RADIX, MAX_RADIX, radix),
                    ));
                }
                Reducer::Stats { radix }
            }
            other => {
                return Err(IteratorError::config(
                    &setting.name,
                    format!("{} is not a combiner", other),
                ))
            }
        };

        let group_by = if setting.bool_option(options::IGNORE_VISIBILITY)?.unwrap_or(false) {
            PartialKey::RowFamilyQualifier
        } else {
            PartialKey::RowFamilyQualifierVisibility
        };

        Ok(Self {
            policy: ColumnPolicy::from_setting(setting)?,
            group_by,
            reducer,
            lookahead: None,
        })
    }

    pub fn kind(&self) -> StageKind {
        match self.reducer {
            Reducer::Sum(_) => StageKind::SummingCombiner,
            Reducer::Stats { .. } => StageKind::StatsCombiner,
        }
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    pub(crate) fn begin_pass(&mut self) {
        self.lookahead = None;
    }

    fn in_group(&self, first: &Key, candidate: &Record) -> bool {
        !candidate.key.deleted && first.equals(&candidate.key, self.group_by)
    }

    pub(crate) fn step<I>(&mut self, upstream: &mut Upstream<'_, I>) -> Result<Option<Record>, IteratorError>
    where
        I: Iterator<Item = Record>,
    {
        let first = match self.lookahead.take() {
            Some(record) => record,
            None => match upstream.next()? {
                Some(record) => record,
                None => return Ok(None),
            },
        };

        if first.key.deleted || !self.policy.applies_to(&first.key) {
            return Ok(Some(first));
        }

        let mut acc = self.reducer.start();
        self.reducer.add(&mut acc, &first)?;
        let mut members = 1usize;

        loop {
            match upstream.next()? {
                Some(next) if self.in_group(&first.key, &next) => {
                    self.reducer.add(&mut acc, &next)?;
                    members += 1;
                }
                other => {
                    self.lookahead = other;
                    break;
                }
            }
        }

        trace!(key = %first.key, members, "Combined group");
        let value = self.reducer.finish(acc);
        Ok(Some(Record::new(first.key, value)))
    }
}
