//! # cwire
//!
//! Per-station consumption aggregation for an electricity distribution
//! network.
//!
//! Records from a `;`-separated distribution file are grouped by the station
//! of one tier (`hvb`, `hva` or `lv`). Each station's capacity is taken from
//! the first record that declares one, and consumer load is summed into it.
//! Stations are kept in an AVL tree ([`StationIndex`]) and reported in
//! ascending id order.
//!
//! ## Example
//!
//! ```rust
//! use cwire::{aggregate, Category, RecordFeed, RecordFilter, Tier};
//!
//! let input = "\
//! plant;hvb;hva;lv;company;individual;capacity;load
//! 1;10;-;-;-;-;500;-
//! 1;10;-;-;3;-;-;20
//! 1;10;-;-;4;-;-;30
//! 1;4;-;-;-;-;200;-
//! 1;4;-;-;5;-;-;5
//! ";
//!
//! let feed = RecordFeed::from_reader(input.as_bytes());
//! let summary = aggregate(feed, &RecordFilter::new(Tier::Hvb, Category::Comp)).unwrap();
//!
//! let lines: Vec<String> = summary.index.iter().map(|s| s.to_string()).collect();
//! assert_eq!(lines, ["4:200:5", "10:500:50"]);
//! ```

#![deny(unsafe_code)]

pub mod aggregate;
pub mod config;
pub mod index;
pub mod record;
pub mod report;

pub use aggregate::{
    aggregate, AggregateError, Aggregator, Category, Counters, Outcome, RecordFilter, Summary,
};
pub use index::{IndexError, Iter, Station, StationIndex};
pub use record::{FeedError, Record, RecordFeed, Tier};
