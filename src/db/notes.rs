//! Notes left on recipes.

use crate::types::{NoteId, RecipeId, UserId, now_millis};
use crate::Result;

use super::{Database, Note, NoteWithAuthor, query_error};

const NOTE_WITH_AUTHOR_QUERY: &str = r#"
    SELECT n.id, n.recipe_id, n.user_id, n.content, n.created_at, n.updated_at,
           u.first_name AS author_first_name, u.last_name AS author_last_name
    FROM notes n
    JOIN users u ON u.id = n.user_id
"#;

impl Database {
    /// List the notes on a recipe, newest first
    pub async fn list_notes(&self, recipe_id: RecipeId) -> Result<Vec<NoteWithAuthor>> {
        let sql = format!(
            "{NOTE_WITH_AUTHOR_QUERY} WHERE n.recipe_id = ? ORDER BY n.created_at DESC, n.id"
        );
        let notes = sqlx::query_as::<_, NoteWithAuthor>(&sql)
            .bind(recipe_id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list notes"))?;

        Ok(notes)
    }

    /// Add a note to a recipe
    pub async fn insert_note(
        &self,
        recipe_id: RecipeId,
        user_id: UserId,
        content: &str,
    ) -> Result<Note> {
        let now = now_millis();
        let note = Note {
            id: NoteId::new(),
            recipe_id,
            user_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO notes (id, recipe_id, user_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(note.id)
        .bind(note.recipe_id)
        .bind(note.user_id)
        .bind(&note.content)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_error("Failed to insert note"))?;

        Ok(note)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: NoteId) -> Result<Option<NoteWithAuthor>> {
        let sql = format!("{NOTE_WITH_AUTHOR_QUERY} WHERE n.id = ?");
        let note = sqlx::query_as::<_, NoteWithAuthor>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("Failed to get note"))?;

        Ok(note)
    }

    /// Replace a note's content
    ///
    /// Returns the updated note, or None if it does not exist.
    pub async fn update_note(&self, id: NoteId, content: &str) -> Result<Option<NoteWithAuthor>> {
        let result = sqlx::query("UPDATE notes SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error("Failed to update note"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_note(id).await
    }

    /// Delete a note
    ///
    /// Returns false if it did not exist.
    pub async fn delete_note(&self, id: NoteId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error("Failed to delete note"))?;

        Ok(result.rows_affected() > 0)
    }
}
