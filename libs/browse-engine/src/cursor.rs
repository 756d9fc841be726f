//! Resume tokens.
//!
//! A [`Cursor`] holds, for every partition consulted by the previous page,
//! the offset the next page starts from. In oldest-first order that is the
//! next offset to read; in newest-first order it is the exclusive upper
//! bound of what is left to read.
//!
//! On the wire a cursor is `"<partition>-<offset>"` pairs joined by `_`,
//! in ascending partition order: `0-17_1-17_2-16`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use browse_api::{Offset, PartitionId, SortOrder};

use crate::window::PartitionWindow;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    offsets: BTreeMap<PartitionId, Offset>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, partition: PartitionId) -> Option<Offset> {
        self.offsets.get(&partition).copied()
    }

    pub fn insert(&mut self, partition: PartitionId, offset: Offset) {
        self.offsets.insert(partition, offset);
    }

    pub fn partitions(&self) -> impl Iterator<Item = PartitionId> + '_ {
        self.offsets.keys().copied()
    }

    /// Opaque token form; empty cursor encodes as `""`.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (partition, offset)) in self.offsets.iter().enumerate() {
            if i > 0 {
                f.write_str("_")?;
            }
            write!(f, "{partition}-{offset}")?;
        }
        Ok(())
    }
}

impl FromStr for Cursor {
    type Err = String;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let mut cursor = Cursor::new();
        if token.is_empty() {
            return Ok(cursor);
        }
        for pair in token.split('_') {
            let (partition, offset) = pair
                .split_once('-')
                .ok_or_else(|| format!("'{pair}' is not <partition>-<offset>"))?;
            let partition: PartitionId = partition
                .parse()
                .map_err(|e| format!("partition '{partition}': {e}"))?;
            let offset: Offset = offset.parse().map_err(|e| format!("offset '{offset}': {e}"))?;
            if cursor.offsets.insert(partition, offset).is_some() {
                return Err(format!("partition {partition} appears twice"));
            }
        }
        Ok(cursor)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Cursor building
// ═══════════════════════════════════════════════════════════════

/// What one read did to one partition's window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PartitionProgress {
    pub window: PartitionWindow,
    /// Last offset delivered (bounded read) or scanned (search), in read order.
    pub consumed: Option<Offset>,
    /// The read hit the window bound: nothing left in this direction.
    pub exhausted: bool,
}

impl PartitionProgress {
    fn next_offset(&self, order: SortOrder) -> Offset {
        if self.exhausted {
            return self.window.bound(order);
        }
        match self.consumed {
            Some(offset) => self.window.step_past(offset, order),
            None => self.window.start,
        }
    }
}

/// Cursor for the page that follows the one described by `progress`.
pub(crate) fn next_cursor(progress: &[PartitionProgress], order: SortOrder) -> Cursor {
    let mut cursor = Cursor::new();
    for p in progress {
        cursor.insert(p.window.partition, p.next_offset(order));
    }
    cursor
}
