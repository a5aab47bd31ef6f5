//! Record feed: decodes the `;`-separated distribution file into [`Record`]s.
//!
//! The input starts with a header line, then one record per line:
//!
//! ```text
//! power_plant;hvb;hva;lv;company;individual;capacity;load
//! ```
//!
//! A field counts as present only when it starts with a digit; `-` (or any
//! other non-numeric text) means the field is absent for that record.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use thiserror::Error;
use tracing::debug;

/// Number of fields a record must carry.
pub const RECORD_FIELDS: usize = 8;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("cannot open input file {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read input")]
    Read(#[from] csv::Error),
}

// =============================================================================
// Tier
// =============================================================================

/// Station tier used as the grouping key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Tier {
    /// High-voltage B station.
    Hvb,
    /// High-voltage A station.
    Hva,
    /// Low-voltage post.
    Lv,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Hvb, Tier::Hva, Tier::Lv];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Hvb => "hvb",
            Tier::Hva => "hva",
            Tier::Lv => "lv",
        }
    }

    /// Tiers fed by this one.
    fn lower(self) -> &'static [Tier] {
        match self {
            Tier::Hvb => &[Tier::Hva, Tier::Lv],
            Tier::Hva => &[Tier::Lv],
            Tier::Lv => &[],
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Record
// =============================================================================

/// One decoded line of the input. Absent fields are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub power_plant: Option<u32>,
    pub hvb: Option<u32>,
    pub hva: Option<u32>,
    pub lv: Option<u32>,
    pub company: Option<u32>,
    pub individual: Option<u32>,
    pub capacity: Option<u64>,
    pub load: Option<u64>,
}

impl Record {
    /// Decodes the first [`RECORD_FIELDS`] fields. Returns `None` when there
    /// are fewer; extra fields are ignored.
    pub fn from_fields<'a, I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut fields = fields.into_iter();
        Some(Self {
            power_plant: leading_number(fields.next()?),
            hvb: leading_number(fields.next()?),
            hva: leading_number(fields.next()?),
            lv: leading_number(fields.next()?),
            company: leading_number(fields.next()?),
            individual: leading_number(fields.next()?),
            capacity: leading_number(fields.next()?),
            load: leading_number(fields.next()?),
        })
    }

    /// Decodes a single `;`-separated line.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        Self::from_fields(line.split(';').map(str::as_bytes))
    }

    /// The station id this record carries for `tier`.
    pub fn station(&self, tier: Tier) -> Option<u32> {
        match tier {
            Tier::Hvb => self.hvb,
            Tier::Hva => self.hva,
            Tier::Lv => self.lv,
        }
    }

    /// Whether the record belongs to a station of `tier` itself, rather than
    /// to one of the stations it feeds.
    pub fn is_station_of(&self, tier: Tier) -> bool {
        self.station(tier).is_some() && tier.lower().iter().all(|&t| self.station(t).is_none())
    }

    /// Declared capacity, 0 when absent.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity.unwrap_or(0)
    }

    /// Load contribution, 0 when absent.
    #[inline]
    pub fn load(&self) -> u64 {
        self.load.unwrap_or(0)
    }
}

/// Parses the run of ASCII digits at the start of `field`. Anything that does
/// not start with a digit, or does not fit in `T`, is absent.
fn leading_number<T: FromStr>(field: &[u8]) -> Option<T> {
    let digits = field.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    std::str::from_utf8(&field[..digits]).ok()?.parse().ok()
}

// =============================================================================
// RecordFeed
// =============================================================================

/// Streams [`Record`]s out of a reader, skipping the header line and any
/// line with too few fields.
pub struct RecordFeed<R> {
    reader: csv::Reader<R>,
    raw: csv::ByteRecord,
    records: u64,
    skipped: u64,
}

impl RecordFeed<File> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: io::Read> RecordFeed<R> {
    pub fn from_reader(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);
        Self {
            reader,
            raw: csv::ByteRecord::new(),
            records: 0,
            skipped: 0,
        }
    }

    /// Records yielded so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Malformed lines skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: io::Read> Iterator for RecordFeed<R> {
    type Item = Result<Record, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_byte_record(&mut self.raw) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(err.into())),
            }

            match Record::from_fields(self.raw.iter()) {
                Some(record) => {
                    self.records += 1;
                    return Some(Ok(record));
                }
                None => {
                    self.skipped += 1;
                    debug!(
                        line = ?self.raw.position().map(|p| p.line()),
                        fields = self.raw.len(),
                        "skipping malformed record"
                    );
                }
            }
        }
    }
}
