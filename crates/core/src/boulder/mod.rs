use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{analysis::Move, BoulderVizError, Result};

/// Raw tri-axial accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn new(time: f64, x: f64, y: f64, z: f64) -> Self {
        Self { time, x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.time.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

const SEED_BITS: u32 = 31;
const SEED_MASK: u64 = (1 << SEED_BITS) - 1;

/// Stable identifier of a boulder. Only ever used to seed the PRNG and to key
/// persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoulderId {
    Number(i64),
    Text(String),
}

impl BoulderId {
    /// Numeric seed derived from the identifier.
    ///
    /// Both forms land in `[0, 2^31)`, where consecutive attempt offsets
    /// stay distinct in `f64`. Integers already in range seed directly;
    /// larger or negative ones are xor-folded into it. Text is folded with a
    /// wrapping 32-bit `h * 31 + c` hash and the absolute value is taken.
    pub fn seed(&self) -> f64 {
        match self {
            Self::Number(value) => {
                let bits = *value as u64;
                ((bits ^ (bits >> SEED_BITS) ^ (bits >> (2 * SEED_BITS))) & SEED_MASK) as f64
            }
            Self::Text(text) => {
                let hash = text
                    .chars()
                    .fold(0_i32, |hash, c| hash.wrapping_mul(31).wrapping_add(c as i32));
                (hash as i64).abs() as f64
            }
        }
    }
}

impl fmt::Display for BoulderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for BoulderId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for BoulderId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for BoulderId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// A recorded boulder attempt as supplied by the ingestion side.
///
/// `moves` may be pre-populated by the caller; when it is empty the engine
/// detects moves from `samples`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoulderRecord {
    pub id: BoulderId,
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub moves: Vec<Move>,
}

impl BoulderRecord {
    pub fn new(id: impl Into<BoulderId>, samples: Vec<Sample>) -> Self {
        Self {
            id: id.into(),
            samples,
            moves: Vec::new(),
        }
    }
}

/// Registry of boulder records available to the visualizer.
#[derive(Debug, Default)]
pub struct BoulderLibrary {
    records: HashMap<BoulderId, Arc<BoulderRecord>>,
}

impl BoulderLibrary {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub fn register(&mut self, record: BoulderRecord) -> Arc<BoulderRecord> {
        let record = Arc::new(record);
        self.records.insert(record.id.clone(), record.clone());
        record
    }

    pub fn resolve(&self, id: &BoulderId) -> Result<Arc<BoulderRecord>> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| BoulderVizError::msg(format!("unknown boulder `{id}`")))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_combines_all_axes() {
        let sample = Sample::new(0.0, 3.0, 4.0, 12.0);
        assert_eq!(sample.magnitude(), 13.0);
    }

    #[test]
    fn text_ids_hash_to_stable_seeds() {
        let a = BoulderId::from("boulderA");
        assert_eq!(a.seed(), BoulderId::from("boulderA").seed());
        assert_ne!(a.seed(), BoulderId::from("boulderB").seed());
        assert!(a.seed() >= 0.0);
    }

    #[test]
    fn integer_ids_seed_directly() {
        assert_eq!(BoulderId::from(42_i64).seed(), 42.0);
        assert_eq!(BoulderId::from(0_i64).seed(), 0.0);
    }

    #[test]
    fn large_integer_ids_fold_into_seed_range() {
        let ids = [i64::MAX, i64::MAX - 1, i64::MIN, -1, 1 << 40];
        let seeds: Vec<f64> = ids.iter().map(|&id| BoulderId::from(id).seed()).collect();
        for seed in &seeds {
            assert!((0.0..(1_u64 << 31) as f64).contains(seed));
            assert_eq!(seed.fract(), 0.0);
        }
        assert_ne!(seeds[0], seeds[1]);

        let attempts = crate::attempts::simulate(&BoulderId::from(i64::MAX), 20);
        for pair in attempts.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn ids_deserialize_from_strings_or_numbers() {
        let text: BoulderId = serde_json::from_str(r#""crimpy""#).unwrap();
        let number: BoulderId = serde_json::from_str("7").unwrap();
        assert_eq!(text, BoulderId::from("crimpy"));
        assert_eq!(number, BoulderId::from(7_i64));
    }

    #[test]
    fn resolves_registered_boulders() {
        let mut library = BoulderLibrary::new();
        library.register(BoulderRecord::new("slab", Vec::new()));

        assert!(library.resolve(&BoulderId::from("slab")).is_ok());
        let err = library.resolve(&BoulderId::from("missing")).unwrap_err();
        assert!(format!("{err}").contains("missing"));
    }
}
