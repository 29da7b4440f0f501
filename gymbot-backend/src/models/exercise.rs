use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Persisted table name. The executor's table allow-list and the
/// synthesizer's schema description both key off this constant.
pub const TABLE_NAME: &str = "exercise_records";

/// Bumped whenever the persisted shape changes. Embedded in the schema
/// description handed to the model so drift shows up in transcripts.
pub const SCHEMA_VERSION: u32 = 1;

/// Column name, SQLite type, and description — single source of truth
/// for the CREATE TABLE DDL and the schema description given to the
/// query synthesizer. The two must never drift apart.
const COLUMNS: &[(&str, &str, &str)] = &[
    ("id", "INTEGER PRIMARY KEY AUTOINCREMENT", "record id, assigned on insert"),
    ("user_id", "TEXT NOT NULL", "id of the owning user"),
    ("exercise_name", "TEXT NOT NULL", "lowercase exercise name"),
    ("sets", "INTEGER NOT NULL", "set count, 0 for pure-duration work"),
    ("reps", "TEXT NOT NULL", "JSON array of reps per set, e.g. [10,10,10]"),
    ("weights", "TEXT NOT NULL", "JSON array of kilograms per set, or \"bodyweight\""),
    ("duration_secs", "REAL", "duration in seconds, NULL unless duration-based"),
    ("notes", "TEXT NOT NULL", "free-text remarks, possibly empty"),
    ("created_at", "TEXT NOT NULL", "RFC3339 timestamp assigned on insert"),
];

pub fn create_table_sql() -> String {
    let columns: Vec<String> = COLUMNS
        .iter()
        .map(|(name, sql_type, _)| format!("{} {}", name, sql_type))
        .collect();
    format!("CREATE TABLE IF NOT EXISTS {} ({})", TABLE_NAME, columns.join(", "))
}

/// Human-readable schema description for the query synthesizer prompt.
pub fn schema_description() -> String {
    let mut out = format!(
        "The database has a table named '{}' (schema v{}) with the following columns:\n",
        TABLE_NAME, SCHEMA_VERSION
    );
    for (name, sql_type, description) in COLUMNS {
        out.push_str(&format!("- {} ({}): {}\n", name, sql_type, description));
    }
    out.push_str(&format!(
        "\nExample row: (1, '12345', 'bench press', 3, '[10,10,10]', '[60.0,60.0,60.0]', NULL, '', '2024-05-01T10:00:00Z')\n\
         Example query: SELECT * FROM {} WHERE user_id = '12345';\n",
        TABLE_NAME
    ));
    out
}

/// Per-set resistance. Bodyweight work carries an explicit marker so
/// "no weight stated" and "no external load" stay distinguishable.
#[derive(Debug, Clone, PartialEq)]
pub enum Weights {
    Bodyweight,
    /// Kilograms per set, same length as `reps`.
    Loaded(Vec<f64>),
}

impl Serialize for Weights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Weights::Bodyweight => serializer.serialize_str("bodyweight"),
            Weights::Loaded(loads) => loads.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Weights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("bodyweight") => {
                Ok(Weights::Bodyweight)
            }
            serde_json::Value::Array(items) => {
                let mut loads = Vec::with_capacity(items.len());
                for item in items {
                    let load = item
                        .as_f64()
                        .ok_or_else(|| de::Error::custom("weights entries must be numbers"))?;
                    loads.push(load);
                }
                Ok(Weights::Loaded(loads))
            }
            other => Err(de::Error::custom(format!(
                "weights must be a number array or \"bodyweight\", got {}",
                other
            ))),
        }
    }
}

/// An unpersisted candidate record produced by extraction. Unknown
/// fields in the model output are rejected rather than ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExerciseDraft {
    #[serde(default)]
    pub exercise_name: String,
    #[serde(default)]
    pub sets: u32,
    #[serde(default)]
    pub reps: Vec<u32>,
    #[serde(default = "default_weights")]
    pub weights: Weights,
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub notes: String,
}

fn default_weights() -> Weights {
    Weights::Loaded(vec![])
}

impl ExerciseDraft {
    /// Normalize model-provided fields: lowercase the exercise name,
    /// trim whitespace.
    pub fn normalize(&mut self) {
        self.exercise_name = self.exercise_name.trim().to_lowercase();
        self.notes = self.notes.trim().to_string();
    }

    /// Check the record invariants. Any violation fails the whole
    /// batch this draft belongs to.
    pub fn validate(&self) -> Result<(), String> {
        if self.exercise_name.trim().is_empty() {
            return Err("draft is missing an exercise name".to_string());
        }

        if let Weights::Loaded(loads) = &self.weights {
            if loads.len() != self.reps.len() {
                return Err(format!(
                    "weights length {} does not match reps length {}",
                    loads.len(),
                    self.reps.len()
                ));
            }
            if loads.iter().any(|load| !load.is_finite() || *load < 0.0) {
                return Err("weights must be finite and non-negative".to_string());
            }
        }

        if self.sets > 0 && self.reps.len() != self.sets as usize {
            return Err(format!(
                "reps length {} does not match sets {}",
                self.reps.len(),
                self.sets
            ));
        }

        if let Some(duration) = self.duration_secs {
            if !duration.is_finite() || duration < 0.0 {
                return Err("duration must be finite and non-negative".to_string());
            }
        }

        // No set/rep structure means the work is duration-based
        if self.sets == 0 && self.reps.is_empty() {
            match self.duration_secs {
                Some(duration) if duration > 0.0 => {}
                _ => {
                    return Err(
                        "duration is required for exercises without sets and reps".to_string()
                    );
                }
            }
        }

        Ok(())
    }
}

/// One persisted unit of logged activity. Immutable once written —
/// corrections are new records, never in-place edits.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseRecord {
    pub id: i64,
    pub user_id: String,
    pub exercise_name: String,
    pub sets: u32,
    pub reps: Vec<u32>,
    pub weights: Weights,
    pub duration_secs: Option<f64>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl ExerciseRecord {
    /// One confirmation line listing the saved fields, e.g.
    /// "bench press — 3 sets of 10/10/10 reps at 60 kg".
    pub fn summary_line(&self) -> String {
        let mut line = self.exercise_name.clone();

        if self.sets > 0 {
            let reps: Vec<String> = self.reps.iter().map(|r| r.to_string()).collect();
            line.push_str(&format!(" — {} sets of {} reps", self.sets, reps.join("/")));
            match &self.weights {
                Weights::Bodyweight => line.push_str(" at bodyweight"),
                Weights::Loaded(loads) if !loads.is_empty() => {
                    if loads.windows(2).all(|pair| pair[0] == pair[1]) {
                        line.push_str(&format!(" at {} kg", format_number(loads[0])));
                    } else {
                        let parts: Vec<String> =
                            loads.iter().map(|load| format_number(*load)).collect();
                        line.push_str(&format!(" at {} kg", parts.join("/")));
                    }
                }
                Weights::Loaded(_) => {}
            }
        }

        if let Some(duration) = self.duration_secs {
            line.push_str(&format!(" — {} seconds", format_number(duration)));
        }

        if !self.notes.is_empty() {
            line.push_str(&format!(" ({})", self.notes));
        }

        line
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench_draft() -> ExerciseDraft {
        ExerciseDraft {
            exercise_name: "bench press".to_string(),
            sets: 3,
            reps: vec![10, 10, 10],
            weights: Weights::Loaded(vec![60.0, 60.0, 60.0]),
            duration_secs: None,
            notes: String::new(),
        }
    }

    #[test]
    fn test_weights_serde_round_trip() {
        assert_eq!(
            serde_json::to_string(&Weights::Bodyweight).unwrap(),
            "\"bodyweight\""
        );
        assert_eq!(
            serde_json::to_string(&Weights::Loaded(vec![60.0, 62.5])).unwrap(),
            "[60.0,62.5]"
        );

        let parsed: Weights = serde_json::from_str("\"bodyweight\"").unwrap();
        assert_eq!(parsed, Weights::Bodyweight);

        let parsed: Weights = serde_json::from_str("[60, 62.5]").unwrap();
        assert_eq!(parsed, Weights::Loaded(vec![60.0, 62.5]));

        assert!(serde_json::from_str::<Weights>("{\"kg\": 60}").is_err());
        assert!(serde_json::from_str::<Weights>("\"heavy\"").is_err());
    }

    #[test]
    fn test_draft_rejects_unknown_fields() {
        let raw = r#"{"exercise_name":"squat","sets":1,"reps":[5],"weights":[100],"duration_secs":null,"notes":"","intensity":"high"}"#;
        assert!(serde_json::from_str::<ExerciseDraft>(raw).is_err());
    }

    #[test]
    fn test_validate_accepts_bench_draft() {
        assert!(bench_draft().validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_duration_cardio() {
        let draft = ExerciseDraft {
            exercise_name: "treadmill".to_string(),
            sets: 0,
            reps: vec![],
            weights: Weights::Bodyweight,
            duration_secs: Some(1200.0),
            notes: String::new(),
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_name() {
        let mut draft = bench_draft();
        draft.exercise_name = "  ".to_string();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_length_mismatches() {
        let mut draft = bench_draft();
        draft.weights = Weights::Loaded(vec![60.0]);
        assert!(draft.validate().unwrap_err().contains("weights length"));

        let mut draft = bench_draft();
        draft.reps = vec![10, 10];
        draft.weights = Weights::Loaded(vec![60.0, 60.0]);
        assert!(draft.validate().unwrap_err().contains("sets"));
    }

    #[test]
    fn test_validate_rejects_cardio_without_duration() {
        let draft = ExerciseDraft {
            exercise_name: "treadmill".to_string(),
            sets: 0,
            reps: vec![],
            weights: Weights::Bodyweight,
            duration_secs: None,
            notes: String::new(),
        };
        assert!(draft.validate().unwrap_err().contains("duration"));
    }

    #[test]
    fn test_normalize_lowercases_and_trims() {
        let mut draft = bench_draft();
        draft.exercise_name = "  Bench Press ".to_string();
        draft.notes = " felt heavy ".to_string();
        draft.normalize();
        assert_eq!(draft.exercise_name, "bench press");
        assert_eq!(draft.notes, "felt heavy");
    }

    #[test]
    fn test_summary_line_for_sets_and_reps() {
        let record = ExerciseRecord {
            id: 1,
            user_id: "u1".to_string(),
            exercise_name: "bench press".to_string(),
            sets: 3,
            reps: vec![10, 10, 10],
            weights: Weights::Loaded(vec![60.0, 60.0, 60.0]),
            duration_secs: None,
            notes: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(record.summary_line(), "bench press — 3 sets of 10/10/10 reps at 60 kg");
    }

    #[test]
    fn test_summary_line_for_duration_work() {
        let record = ExerciseRecord {
            id: 2,
            user_id: "u1".to_string(),
            exercise_name: "treadmill".to_string(),
            sets: 0,
            reps: vec![],
            weights: Weights::Bodyweight,
            duration_secs: Some(1200.0),
            notes: "easy pace".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(record.summary_line(), "treadmill — 1200 seconds (easy pace)");
    }

    #[test]
    fn test_schema_description_tracks_ddl() {
        let ddl = create_table_sql();
        let description = schema_description();

        assert!(ddl.contains(TABLE_NAME));
        assert!(description.contains(TABLE_NAME));
        for (name, _, _) in COLUMNS {
            assert!(ddl.contains(name), "DDL missing column {}", name);
            assert!(description.contains(name), "description missing column {}", name);
        }
    }
}
