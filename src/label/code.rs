//! Label code minting
//!
//! Codes look like `L261019-00000042`: a fixed prefix, the issue date as
//! `yymmdd`, and a zero-padded global sequence number. The sequence never
//! repeats, so codes are unique across all compounds and all days.

use std::convert::Infallible;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

pub const CODE_PREFIX: char = 'L';
pub const SEQUENCE_WIDTH: usize = 8;
const DATE_FORMAT: &str = "%y%m%d";

/// A minted label code together with the sequence number it encodes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LabelCode {
    code: String,
    sequence: u64,
}

impl LabelCode {
    pub fn new(date: NaiveDate, sequence: u64) -> Self {
        let code = format!(
            "{}{}-{:0width$}",
            CODE_PREFIX,
            date.format(DATE_FORMAT),
            sequence,
            width = SEQUENCE_WIDTH
        );
        Self { code, sequence }
    }

    /// Parse a code previously produced by `new`
    pub fn parse(code: &str) -> Option<Self> {
        let rest = code.strip_prefix(CODE_PREFIX)?;
        let (date, sequence) = rest.split_once('-')?;
        if date.len() != 6 || sequence.len() < SEQUENCE_WIDTH {
            return None;
        }
        if !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        let sequence = sequence.parse().ok()?;
        let parsed = Self::new(date, sequence);
        (parsed.code == code).then_some(parsed)
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for LabelCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Issues label codes from a single global sequence counter
#[derive(Debug, Default)]
pub struct LabelCodeGenerator {
    last_issued: Mutex<u64>,
}

impl LabelCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after `last_issued`, e.g. the high-water mark stored in the database
    pub fn resume(last_issued: u64) -> Self {
        Self {
            last_issued: Mutex::new(last_issued),
        }
    }

    pub fn last_issued(&self) -> u64 {
        *self.last_issued.lock()
    }

    /// Mint the next code. Only the sequence counter changes.
    pub fn mint(&self, compound_id: i64, timestamp: DateTime<Utc>) -> LabelCode {
        match self.mint_with(compound_id, timestamp, |_| Ok::<(), Infallible>(())) {
            Ok(code) => code,
            Err(never) => match never {},
        }
    }

    /// Mint the next code, calling `reserve` with its sequence number while
    /// the counter is held. The counter only advances if `reserve` succeeds.
    pub fn mint_with<E>(
        &self,
        compound_id: i64,
        timestamp: DateTime<Utc>,
        reserve: impl FnOnce(u64) -> Result<(), E>,
    ) -> Result<LabelCode, E> {
        let mut last_issued = self.last_issued.lock();
        let sequence = *last_issued + 1;
        reserve(sequence)?;
        *last_issued = sequence;

        let code = LabelCode::new(timestamp.date_naive(), sequence);
        debug!(compound_id, label_code = %code, "Minted label code");
        Ok(code)
    }
}
