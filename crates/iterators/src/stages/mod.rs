//! Stage implementations and the pull protocol that chains them.
//!
//! Stages form a strict pull pipeline: a stage asks the [`Upstream`] below it
//! for the next record, one at a time. Only combiners keep a single
//! look-ahead record between calls.

mod age_off;
mod combiner;
pub mod stats;
mod versioning;

use strata_core::Record;
use tracing::warn;

use crate::error::IteratorError;
use crate::setting::{IteratorSetting, StageKind};

pub use age_off::AgeOff;
pub use combiner::{Combiner, Reducer};
pub use versioning::Versioning;

/// A configured pipeline stage. The set of kinds is closed.
#[derive(Debug, Clone)]
pub enum Stage {
    AgeOff(AgeOff),
    Versioning(Versioning),
    Combiner(Combiner),
}

impl Stage {
    /// Build a stage from its setting, validating every option.
    pub fn from_setting(setting: &IteratorSetting) -> Result<Stage, IteratorError> {
        for key in setting.options.keys() {
            if !setting.kind.known_options().contains(&key.as_str()) {
                warn!(
                    iterator = %setting.name,
                    kind = %setting.kind,
                    option = %key,
                    "Ignoring unknown iterator option"
                );
            }
        }

        let stage = match setting.kind {
            StageKind::AgeOff => Stage::AgeOff(AgeOff::from_setting(setting)?),
            StageKind::Versioning => Stage::Versioning(Versioning::from_setting(setting)?),
            StageKind::SummingCombiner | StageKind::StatsCombiner => {
                Stage::Combiner(Combiner::from_setting(setting)?)
            }
        };
        Ok(stage)
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Stage::AgeOff(_) => StageKind::AgeOff,
            Stage::Versioning(_) => StageKind::Versioning,
            Stage::Combiner(c) => c.kind(),
        }
    }

    /// Reset per-pass state and fix the pass reference time.
    pub(crate) fn begin_pass(&mut self, now_ms: i64) {
        match self {
            Stage::AgeOff(s) => s.begin_pass(now_ms),
            Stage::Versioning(s) => s.begin_pass(),
            Stage::Combiner(s) => s.begin_pass(),
        }
    }

    /// Produce the next record of this stage's output.
    pub(crate) fn step<I>(&mut self, upstream: &mut Upstream<'_, I>) -> Result<Option<Record>, IteratorError>
    where
        I: Iterator<Item = Record>,
    {
        match self {
            Stage::AgeOff(s) => s.step(upstream),
            Stage::Versioning(s) => s.step(upstream),
            Stage::Combiner(s) => s.step(upstream),
        }
    }
}

/// Everything beneath a stage: the raw input plus the lower-priority stages.
pub(crate) struct Upstream<'a, I> {
    source: &'a mut I,
    stages: &'a mut [Stage],
}

impl<'a, I> Upstream<'a, I>
where
    I: Iterator<Item = Record>,
{
    pub(crate) fn new(source: &'a mut I, stages: &'a mut [Stage]) -> Self {
        Self { source, stages }
    }

    pub(crate) fn next(&mut self) -> Result<Option<Record>, IteratorError> {
        match self.stages.split_last_mut() {
            None => Ok(self.source.next()),
            Some((top, below)) => {
                let mut beneath = Upstream {
                    source: &mut *self.source,
                    stages: below,
                };
                top.step(&mut beneath)
            }
        }
    }
}
