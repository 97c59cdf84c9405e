//! Priority-ordered stage stacks and single-use evaluation passes.

use std::collections::HashSet;
use std::iter::Fuse;

use strata_core::{now_millis, Record};
use tracing::debug;

use crate::error::IteratorError;
use crate::setting::IteratorSetting;
use crate::stages::{Stage, Upstream};

/// A validated stack of stages, lowest priority applied first.
///
/// A pipeline is configuration only. Each [`Pipeline::open`] builds fresh
/// stage state, so one pipeline can serve many concurrent passes.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    settings: Vec<IteratorSetting>,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Validate `settings` and order them by priority.
    ///
    /// Fails with a configuration error if any setting is invalid or if two
    /// settings share a name or a priority.
    pub fn new(settings: impl IntoIterator<Item = IteratorSetting>) -> Result<Self, IteratorError> {
        let mut settings: Vec<IteratorSetting> = settings.into_iter().collect();
        settings.sort_by_key(|s| s.priority);

        let mut names = HashSet::new();
        let mut priorities = HashSet::new();
        for setting in &settings {
            if !names.insert(setting.name.as_str()) {
                return Err(IteratorError::config(&setting.name, "iterator name used more than once"));
            }
            if !priorities.insert(setting.priority) {
                return Err(IteratorError::config(
                    &setting.name,
                    format!("priority {} used more than once", setting.priority),
                ));
            }
            setting.validate()?;
        }

        let stages = settings
            .iter()
            .map(Stage::from_setting)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { settings, stages })
    }

    pub fn settings(&self) -> &[IteratorSetting] {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Start a pass over `input`, which must already be in key order.
    pub fn open<I>(&self, input: I) -> Pass<I::IntoIter>
    where
        I: IntoIterator<Item = Record>,
    {
        self.open_at(input, now_millis())
    }

    /// Like [`Pipeline::open`] with an explicit reference time for age-off
    /// stages that have no `currentTime` option.
    pub fn open_at<I>(&self, input: I, now_ms: i64) -> Pass<I::IntoIter>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut stages = self.stages.clone();
        for stage in &mut stages {
            stage.begin_pass(now_ms);
        }
        debug!(
            stages = ?self.settings.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Opened pipeline pass"
        );
        Pass {
            source: input.into_iter().fuse(),
            stages,
            finished: false,
            emitted: 0,
        }
    }
}

/// One single-threaded traversal of a pipeline.
///
/// `next_record` returns `Ok(None)` at end of stream. A decode error ends
/// the pass: the error is returned once and the pass yields nothing after it.
pub struct Pass<I: Iterator<Item = Record>> {
    source: Fuse<I>,
    stages: Vec<Stage>,
    finished: bool,
    emitted: u64,
}

impl<I> Pass<I>
where
    I: Iterator<Item = Record>,
{
    pub fn next_record(&mut self) -> Result<Option<Record>, IteratorError> {
        if self.finished {
            return Ok(None);
        }

        let result = Upstream::new(&mut self.source, &mut self.stages).next();
        match &result {
            Ok(Some(_)) => self.emitted += 1,
            Ok(None) => self.finished = true,
            Err(e) => {
                debug!(error = %e, emitted = self.emitted, "Pipeline pass failed");
                self.finished = true;
            }
        }
        result
    }

    /// Number of records returned so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Release the pass. Dropping it has the same effect.
    pub fn close(self) {
        debug!(emitted = self.emitted, complete = self.finished, "Closed pipeline pass");
    }
}

impl<I> Iterator for Pass<I>
where
    I: Iterator<Item = Record>,
{
    type Item = Result<Record, IteratorError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
