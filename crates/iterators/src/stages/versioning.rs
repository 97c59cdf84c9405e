use strata_core::{Key, PartialKey, Record};

use super::Upstream;
use crate::error::IteratorError;
use crate::setting::{options, IteratorSetting};

/// Keeps the newest `max_versions` records of each cell.
#[derive(Debug, Clone)]
pub struct Versioning {
    max_versions: u32,
    current: Option<Key>,
    seen: u32,
}

impl Versioning {
    pub fn from_setting(setting: &IteratorSetting) -> Result<Self, IteratorError> {
        let max_versions = setting.u32_option(options::MAX_VERSIONS)?.unwrap_or(1);
        if max_versions == 0 {
            return Err(IteratorError::config(&setting.name, "'maxVersions' must be at least 1"));
        }
        Ok(Self {
            max_versions,
            current: None,
            seen: 0,
        })
    }

    pub(crate) fn begin_pass(&mut self) {
        self.current = None;
        self.seen = 0;
    }

    pub(crate) fn step<I>(&mut self, upstream: &mut Upstream<'_, I>) -> Result<Option<Record>, IteratorError>
    where
        I: Iterator<Item = Record>,
    {
        while let Some(record) = upstream.next()? {
            let same_cell = self
                .current
                .as_ref()
                .is_some_and(|k| k.equals(&record.key, PartialKey::RowFamilyQualifierVisibility));
            if same_cell {
                self.seen = self.seen.saturating_add(1);
            } else {
                self.current = Some(record.key.clone());
                self.seen = 1;
            }
            if self.seen <= self.max_versions {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
