use gurukul_core::model::{LessonDocument, StudentId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{StorageError, StudentRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn student_id_to_i64(id: StudentId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("student_id overflow".into()))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    u64::try_from(v)
        .map(StudentId::new)
        .map_err(|_| StorageError::Serialization("student_id sign overflow".into()))
}

pub(crate) fn points_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("points out of range: {v}")))
}

/// Stored lessons are re-validated on the way out.
pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<LessonDocument, StorageError> {
    let document: String = row.try_get("document").map_err(ser)?;
    LessonDocument::from_json(&document).map_err(ser)
}

pub(crate) fn map_student_row(row: &SqliteRow) -> Result<StudentRecord, StorageError> {
    Ok(StudentRecord {
        id: student_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        name: row.try_get::<String, _>("name").map_err(ser)?,
        points: points_from_i64(row.try_get::<i64, _>("points").map_err(ser)?)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_ids_and_points() {
        assert!(matches!(
            student_id_from_i64(-1),
            Err(StorageError::Serialization(_))
        ));
        assert!(matches!(
            points_from_i64(-5),
            Err(StorageError::Serialization(_))
        ));
        assert_eq!(points_from_i64(42).unwrap(), 42);
        assert_eq!(student_id_to_i64(StudentId::new(7)).unwrap(), 7);
    }
}
