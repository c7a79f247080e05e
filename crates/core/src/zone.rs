//! Wall-clock time zones.
//!
//! Listings and `--list` output use the local wall clock, whose offset from
//! UTC changes with daylight saving. Offsets are therefore looked up per
//! timestamp, never once per process.

use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Maps between wall-clock times and instants.
pub trait TimeZone {
    /// Offset in effect at the instant `at`.
    fn offset_at(&self, at: OffsetDateTime) -> UtcOffset;

    /// Offset that turns the wall-clock time `local` into an instant.
    ///
    /// A repeated wall time (clocks going back) resolves to the earlier
    /// instant. A skipped one (clocks going forward) uses the offset in
    /// effect before the change.
    fn offset_for_local(&self, local: PrimitiveDateTime) -> UtcOffset;
}

/// A fixed offset is a zone without transitions.
impl TimeZone for UtcOffset {
    fn offset_at(&self, _at: OffsetDateTime) -> UtcOffset {
        *self
    }

    fn offset_for_local(&self, _local: PrimitiveDateTime) -> UtcOffset {
        *self
    }
}

/// Interpret `local` as wall-clock time in `zone`.
pub fn from_local(local: PrimitiveDateTime, zone: &dyn TimeZone) -> OffsetDateTime {
    local.assume_offset(zone.offset_for_local(local))
}

/// Express `at` as wall-clock time in `zone`.
pub fn to_local(at: OffsetDateTime, zone: &dyn TimeZone) -> OffsetDateTime {
    at.to_offset(zone.offset_at(at))
}
