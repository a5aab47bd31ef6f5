//! Aggregation pass: routes records into a [`StationIndex`].
//!
//! [`Aggregator::apply`] holds the create-if-absent policy. A station entry is
//! only created by a record that declares a positive capacity; a record that
//! carries load for a station nobody has declared yet is dropped. Stations
//! that never report a capacity therefore never reach the output.

use std::fmt;

use clap::ValueEnum;
use thiserror::Error;
use tracing::{info, warn};

use crate::index::{IndexError, StationIndex};
use crate::record::{FeedError, Record, Tier};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("consumption of station {id} overflows: {consumption} + {load}")]
    Overflow { id: u32, consumption: u64, load: u64 },
}

// =============================================================================
// Category
// =============================================================================

/// Consumer class whose load is aggregated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Category {
    /// Companies.
    Comp,
    /// Individuals.
    Indiv,
    /// Companies and individuals.
    All,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Comp => "comp",
            Category::Indiv => "indiv",
            Category::All => "all",
        }
    }

    /// Station declarations carry no consumer and match every category.
    pub fn accepts(self, record: &Record) -> bool {
        match self {
            Category::Comp => record.individual.is_none(),
            Category::Indiv => record.company.is_none(),
            Category::All => true,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// RecordFilter
// =============================================================================

/// Selects the records that take part in a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordFilter {
    pub tier: Tier,
    pub category: Category,
    /// Restrict to one power plant.
    pub plant: Option<u32>,
}

impl RecordFilter {
    pub fn new(tier: Tier, category: Category) -> Self {
        Self {
            tier,
            category,
            plant: None,
        }
    }

    pub fn with_plant(mut self, plant: Option<u32>) -> Self {
        self.plant = plant;
        self
    }

    /// A record passes when it comes from the selected plant, belongs to a
    /// station of the selected tier (not to a lower-tier station below it),
    /// and its consumer matches the category.
    pub fn accepts(&self, record: &Record) -> bool {
        self.plant.map_or(true, |p| record.power_plant == Some(p))
            && record.is_station_of(self.tier)
            && self.category.accepts(record)
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// What [`Aggregator::apply`] did with a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The record has no id for the tier; the index was not touched.
    Skipped,
    /// The id is not indexed and the record declares no capacity.
    Unknown,
    /// The record resolved to an entry.
    Applied { declared: bool, accumulated: bool },
}

pub struct Aggregator {
    tier: Tier,
    index: StationIndex,
}

impl Aggregator {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            index: StationIndex::new(),
        }
    }

    #[inline]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[inline]
    pub fn index(&self) -> &StationIndex {
        &self.index
    }

    pub fn into_index(self) -> StationIndex {
        self.index
    }

    /// Applies one record to the index.
    ///
    /// 1. No id for the tier: skipped.
    /// 2. Positive capacity: the entry is looked up or created with it.
    ///    Otherwise the entry is only looked up.
    /// 3. If an entry was found and the load is positive, it is accumulated.
    ///    A load that would overflow the total is an error and leaves the
    ///    entry unchanged.
    pub fn apply(&mut self, record: &Record) -> Result<Outcome, AggregateError> {
        let Some(id) = record.station(self.tier) else {
            return Ok(Outcome::Skipped);
        };

        let capacity = record.capacity();
        let declared = capacity > 0;
        let entry = if declared {
            Some(self.index.insert(id, capacity)?)
        } else {
            self.index.find_mut(id)
        };
        let Some(entry) = entry else {
            return Ok(Outcome::Unknown);
        };

        let load = record.load();
        let accumulated = load > 0;
        if accumulated {
            let consumption = entry.consumption();
            if consumption.checked_add(load).is_none() {
                return Err(AggregateError::Overflow {
                    id,
                    consumption,
                    load,
                });
            }
            entry.accumulate(load);
        }
        Ok(Outcome::Applied {
            declared,
            accumulated,
        })
    }
}

// =============================================================================
// Whole pass
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// Records read from the feed.
    pub records: u64,
    /// Records rejected by the filter.
    pub filtered: u64,
    /// Records with no id for the tier.
    pub skipped: u64,
    pub unknown: u64,
    /// Records that declared a positive capacity.
    pub declared: u64,
    /// Records whose load was added to an entry.
    pub accumulated: u64,
}

impl Counters {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Unknown => self.unknown += 1,
            Outcome::Applied {
                declared,
                accumulated,
            } => {
                self.declared += u64::from(declared);
                self.accumulated += u64::from(accumulated);
            }
        }
    }
}

#[derive(Debug)]
pub struct Summary {
    pub index: StationIndex,
    pub counters: Counters,
}

/// Runs every record through `filter` and an [`Aggregator`] for the filter's
/// tier. Stops at the first feed, index or overflow error.
pub fn aggregate<I>(records: I, filter: &RecordFilter) -> Result<Summary, AggregateError>
where
    I: IntoIterator<Item = Result<Record, FeedError>>,
{
    let mut aggregator = Aggregator::new(filter.tier);
    let mut counters = Counters::default();

    for record in records {
        let record = record?;
        counters.records += 1;
        if record.station(filter.tier).is_none() {
            counters.record(Outcome::Skipped);
            continue;
        }
        if !filter.accepts(&record) {
            counters.filtered += 1;
            continue;
        }
        counters.record(aggregator.apply(&record)?);
    }

    let index = aggregator.into_index();
    info!(
        tier = %filter.tier,
        category = %filter.category,
        plant = ?filter.plant,
        stations = index.len(),
        height = index.height(),
        records = counters.records,
        filtered = counters.filtered,
        unknown = counters.unknown,
        "aggregation pass finished"
    );
    if index.is_empty() {
        warn!(tier = %filter.tier, "no station declared a capacity; report will be empty");
    }

    Ok(Summary { index, counters })
}
