//! Detection specs and recorded verdicts

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde_json::{Map, Value};

use super::MetadataStore;
use crate::classify::schema::{FieldSpec, ResponseSchema};
use crate::error::Result;

impl MetadataStore {
    /// Create a response format with its ordered fields and a detection
    /// spec pointing at it. Returns the spec id.
    pub fn create_detection_spec(
        &self,
        instruction: &str,
        schema: &ResponseSchema,
    ) -> Result<i64> {
        self.transaction(|store| {
            let now = Utc::now();
            store.conn.execute(
                "INSERT INTO response_formats (name, created_at, modified_at) VALUES (?1, ?2, ?2)",
                params![schema.name, now],
            )?;
            let format_id = store.conn.last_insert_rowid();

            for (position, field) in schema.fields.iter().enumerate() {
                store.conn.execute(
                    "INSERT INTO response_format_fields
                         (format_id, position, name, data_type, created_at, modified_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![
                        format_id,
                        position as i64,
                        field.name,
                        field.field_type.as_str(),
                        now
                    ],
                )?;
            }

            store.conn.execute(
                "INSERT INTO information_to_detect (instruction, response_format_id) VALUES (?, ?)",
                params![instruction, format_id],
            )?;
            Ok(store.conn.last_insert_rowid())
        })
    }

    /// Every detection spec with its response schema, fields in order
    pub fn list_detection_specs(&self) -> Result<Vec<DetectionSpec>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT i.id, i.instruction, f.id, f.name
               FROM information_to_detect i
               JOIN response_formats f ON f.id = i.response_format_id
               ORDER BY i.id"#,
        )?;
        let heads = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut fields_stmt = self.conn.prepare(
            "SELECT name, data_type FROM response_format_fields
             WHERE format_id = ? ORDER BY position, id",
        )?;

        let mut specs = Vec::with_capacity(heads.len());
        for (id, instruction, format_id, format_name) in heads {
            let raw = fields_stmt
                .query_map(params![format_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let fields = raw
                .into_iter()
                .map(|(name, tag)| -> Result<FieldSpec> { Ok(FieldSpec::new(name, tag.parse()?)) })
                .collect::<Result<Vec<_>>>()?;

            specs.push(DetectionSpec {
                id,
                instruction,
                format_id,
                schema: ResponseSchema::new(format_name, fields),
            });
        }

        Ok(specs)
    }

    pub fn has_detection(&self, submission_id: i64, information_id: i64) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM detected_information
                           WHERE submission_id = ? AND information_id = ?)",
            params![submission_id, information_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Store a verdict, replacing any earlier one for the same pair
    pub fn record_detection(
        &self,
        submission_id: i64,
        information_id: i64,
        verdict: &Map<String, Value>,
        model: &str,
    ) -> Result<()> {
        let verdict = serde_json::to_string(verdict)?;
        let now = Utc::now();
        self.conn.execute(
            r#"INSERT INTO detected_information
                   (submission_id, information_id, verdict, model, created_at, modified_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?5)
               ON CONFLICT(submission_id, information_id) DO UPDATE SET
                   verdict = excluded.verdict,
                   model = excluded.model,
                   modified_at = excluded.modified_at"#,
            params![submission_id, information_id, verdict, model, now],
        )?;
        Ok(())
    }

    pub fn list_detections(
        &self,
        information_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<DetectionRow>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT d.submission_id, s.reddit_id, s.title, d.information_id,
                      d.verdict, d.model, d.modified_at
               FROM detected_information d
               JOIN submissions s ON s.id = d.submission_id
               WHERE ?1 IS NULL OR d.information_id = ?1
               ORDER BY d.modified_at DESC, d.id DESC
               LIMIT ?2"#,
        )?;

        let raw = stmt
            .query_map(params![information_id, limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, DateTime<Utc>>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(
                |(submission_id, reddit_id, title, information_id, verdict, model, recorded_at)|
                 -> Result<DetectionRow> {
                    Ok(DetectionRow {
                        submission_id,
                        reddit_id,
                        title,
                        information_id,
                        verdict: serde_json::from_str(&verdict)?,
                        model,
                        recorded_at,
                    })
                },
            )
            .collect()
    }
}

// ============================================
// ROW TYPES
// ============================================

/// An instruction plus the response schema the model must fill
#[derive(Debug, Clone)]
pub struct DetectionSpec {
    pub id: i64,
    pub instruction: String,
    pub format_id: i64,
    pub schema: ResponseSchema,
}

#[derive(Debug)]
pub struct DetectionRow {
    pub submission_id: i64,
    pub reddit_id: String,
    pub title: String,
    pub information_id: i64,
    pub verdict: Value,
    pub model: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
