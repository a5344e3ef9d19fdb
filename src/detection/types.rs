use serde::Serialize;

use crate::constants::PLACEHOLDER_RECORDS;

/// One timestamped reading of the watched channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Milliseconds since session start
    pub timestamp: i64,
    pub amplitude: f64,
}

impl Sample {
    pub fn new(timestamp: i64, amplitude: f64) -> Self {
        Self {
            timestamp,
            amplitude,
        }
    }
}

/// Which kind of local extremum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Extremum {
    Peak,
    Trough,
}

impl Extremum {
    pub fn opposite(self) -> Self {
        match self {
            Self::Peak => Self::Trough,
            Self::Trough => Self::Peak,
        }
    }
}

/// Kind of a history record
///
/// A forced record remembers the extremum it stood in for. That extremum is
/// still awaited afterwards, so confirmed records keep alternating across a
/// timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionKind {
    Peak,
    Trough,
    Forced(Extremum),
}

impl DetectionKind {
    /// The confirmed extremum, if this is not a forced record
    pub fn confirmed(self) -> Option<Extremum> {
        match self {
            Self::Peak => Some(Extremum::Peak),
            Self::Trough => Some(Extremum::Trough),
            Self::Forced(_) => None,
        }
    }

    pub fn is_forced(self) -> bool {
        matches!(self, Self::Forced(_))
    }
}

impl From<Extremum> for DetectionKind {
    fn from(extremum: Extremum) -> Self {
        match extremum {
            Extremum::Peak => Self::Peak,
            Extremum::Trough => Self::Trough,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub kind: DetectionKind,
    pub timestamp: i64,
    pub amplitude: f64,
}

impl DetectionRecord {
    pub fn new(kind: DetectionKind, timestamp: i64, amplitude: f64) -> Self {
        Self {
            kind,
            timestamp,
            amplitude,
        }
    }
}

/// Ordered record of past detections, oldest first
///
/// A history is never empty. A fresh one starts with alternating placeholder
/// records at time 0 / amplitude 0; these decide which extremum is awaited
/// first but are never paired when thresholds are estimated.
///
/// Records a history starts from (placeholders or a baseline seed) are
/// carried; they say nothing about the phase of the live signal.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    records: Vec<DetectionRecord>,
    placeholders: usize,
    carried: usize,
}

impl History {
    /// Fresh history made of placeholders only, awaiting a peak
    pub fn placeholder() -> Self {
        Self::placeholder_at(0)
    }

    /// Placeholder history anchored at `timestamp`
    pub fn placeholder_at(timestamp: i64) -> Self {
        let records = (0..PLACEHOLDER_RECORDS)
            .map(|i| {
                let kind = if (PLACEHOLDER_RECORDS - i) % 2 == 0 {
                    DetectionKind::Peak
                } else {
                    DetectionKind::Trough
                };
                DetectionRecord::new(kind, timestamp, 0.0)
            })
            .collect();
        Self {
            records,
            placeholders: PLACEHOLDER_RECORDS,
            carried: PLACEHOLDER_RECORDS,
        }
    }

    /// History made of real records, e.g. from a baseline recording
    ///
    /// Records are sorted by timestamp. Falls back to placeholders when
    /// `records` is empty.
    pub fn from_records(mut records: Vec<DetectionRecord>) -> Self {
        if records.is_empty() {
            return Self::placeholder();
        }
        records.sort_by_key(|r| r.timestamp);
        let carried = records.len();
        Self {
            records,
            placeholders: 0,
            carried,
        }
    }

    /// Copy with every timestamp shifted so the newest record sits at `anchor`
    ///
    /// Only differences between timestamps feed the thresholds, so a history
    /// taken from an earlier recording can be carried into a new session.
    pub fn rebased(&self, anchor: i64) -> Self {
        let shift = anchor - self.last().timestamp;
        Self {
            records: self
                .records
                .iter()
                .map(|r| DetectionRecord {
                    timestamp: r.timestamp + shift,
                    ..*r
                })
                .collect(),
            placeholders: self.placeholders,
            carried: self.carried,
        }
    }

    /// Restart from this history while `awaited` is still outstanding
    ///
    /// Trailing records of the awaited kind are dropped so the restarted
    /// history ends on the opposite extremum, then the result is rebased to
    /// `anchor`. All remaining records count as carried.
    pub fn resumed(&self, awaited: Extremum, anchor: i64) -> Self {
        let awaited = DetectionKind::from(awaited);
        let mut records = self.records.clone();
        while records.len() > 1 && records.last().map(|r| r.kind) == Some(awaited) {
            records.pop();
        }
        let carried = records.len();
        Self {
            placeholders: self.placeholders.min(carried),
            records,
            carried,
        }
        .rebased(anchor)
    }

    pub fn push(&mut self, record: DetectionRecord) {
        self.records.push(record);
    }

    pub fn last(&self) -> &DetectionRecord {
        // never empty: both constructors guarantee at least one record
        &self.records[self.records.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.records
    }

    /// Records that may be paired for threshold estimation
    pub fn qualifying(&self) -> impl Iterator<Item = &DetectionRecord> {
        self.records[self.placeholders..]
            .iter()
            .filter(|r| !r.kind.is_forced())
    }

    /// Newest non-forced record of the given kind, placeholders included
    pub fn last_of(&self, kind: Extremum) -> Option<&DetectionRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.kind.confirmed() == Some(kind))
    }

    /// Whether the newest record is a live confirmation
    ///
    /// False right after a (re)start and after a forced record, when the phase
    /// of the signal relative to the history is unknown.
    pub fn is_settled(&self) -> bool {
        self.records.len() > self.carried && !self.last().kind.is_forced()
    }

    /// The extremum the classifier should look for next
    pub fn awaiting(&self) -> Extremum {
        match self.last().kind {
            DetectionKind::Peak => Extremum::Trough,
            DetectionKind::Trough => Extremum::Peak,
            DetectionKind::Forced(stood_in_for) => stood_in_for,
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Samples accumulated since the last event
///
/// Never empty; a reset keeps only the newest sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    samples: Vec<Sample>,
}

impl Window {
    pub fn new(first: Sample) -> Self {
        Self {
            samples: vec![first],
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn last(&self) -> &Sample {
        &self.samples[self.samples.len() - 1]
    }

    /// Keep only the newest sample
    pub fn reset(&mut self) {
        let last = *self.last();
        self.samples.clear();
        self.samples.push(last);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn amplitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.amplitude).collect()
    }
}

impl From<Vec<Sample>> for Window {
    /// # Panics
    /// Panics if `samples` is empty.
    fn from(samples: Vec<Sample>) -> Self {
        assert!(!samples.is_empty(), "window needs at least one sample");
        Self { samples }
    }
}
