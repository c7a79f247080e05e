//! Bucket listing parser for the one-time catalog import.
//!
//! The input is the output of a plain bucket listing, one object per line:
//!
//! ```text
//! 2021-01-02 10:00:00        512 notes.txt
//! ```
//!
//! Timestamps are printed in the local time of the machine that produced the
//! listing, so parsing takes the zone to interpret them in. Each line gets the
//! offset in effect on its own date.

use crate::entry::CatalogEntry;
use crate::error::{Error, Result};
use crate::zone::{TimeZone, from_local};
use regex::Regex;
use std::sync::LazyLock;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

static LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}) +([0-9]+) (.*)$")
        .expect("listing line pattern is valid")
});

const LISTING_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// One object from a bucket listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedObject {
    /// Upload time in Unix seconds.
    pub uploaded: i64,
    /// Object size in bytes (informational only).
    pub size: u64,
    /// Object key.
    pub key: String,
}

/// Parse a single listing line. `line_number` is 1-based and only used for errors.
pub fn parse_listing_line(
    line: &str,
    line_number: usize,
    zone: &dyn TimeZone,
) -> Result<ListedObject> {
    let trimmed = line.trim();
    let invalid = || Error::InvalidListingLine {
        line_number,
        line: line.to_string(),
    };

    let captures = LISTING_LINE.captures(trimmed).ok_or_else(invalid)?;
    let timestamp = &captures[1];
    let size = captures[2].parse::<u64>().map_err(|_| invalid())?;
    let key = captures[3].to_string();

    let parsed = PrimitiveDateTime::parse(timestamp, LISTING_TIME_FORMAT).map_err(|e| {
        Error::InvalidTimestamp {
            value: timestamp.to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(ListedObject {
        uploaded: from_local(parsed, zone).unix_timestamp(),
        size,
        key,
    })
}

/// Parse a whole listing, failing on the first line that does not match.
pub fn parse_listing(text: &str, zone: &dyn TimeZone) -> Result<Vec<ListedObject>> {
    text.lines()
        .enumerate()
        .map(|(i, line)| parse_listing_line(line, i + 1, zone))
        .collect()
}

/// Order objects by upload time and number them from 1.
///
/// The sort is stable: objects uploaded in the same second keep their input order.
pub fn assign_indices(mut objects: Vec<ListedObject>) -> Vec<CatalogEntry> {
    objects.sort_by_key(|o| o.uploaded);
    objects
        .into_iter()
        .zip(1u64..)
        .map(|(o, index)| CatalogEntry::new(index, o.key, o.uploaded))
        .collect()
}
