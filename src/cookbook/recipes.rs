//! Recipe authoring, the recipe page and the actions submitted from it.

use super::Cookbook;
use crate::config::RecipeConfig;
use crate::db::{Note, NoteWithAuthor, RecipeDetails, User};
use crate::error::{DatabaseError, FormError, ValidationError};
use crate::form::validation::FORM_NOT_SUBMITTED_CORRECTLY;
use crate::form::{FormData, NoteForm, RecipeForm, RecipeSubmission};
use crate::types::{NoteId, RecipeId, UserId};
use crate::{Error, Result};
use serde::Serialize;

/// Form field that selects the recipe page action
pub const ACTION_ID_FIELD: &str = "actionId";

/// Everything the recipe page shows
#[derive(Debug, Clone, Serialize)]
pub struct RecipePage {
    /// Recipe, author, categories, ingredients and favorite state
    pub details: RecipeDetails,
    /// Notes, newest first
    pub notes: Vec<NoteWithAuthor>,
}

/// An action submitted from the recipe page, selected by `actionId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeAction {
    /// Add the recipe to the user's favorites
    Favorite,
    /// Remove the recipe from the user's favorites
    Unfavorite,
    /// Leave a note
    AddNote {
        /// Validated note text
        content: String,
    },
    /// Edit one of the user's notes
    UpdateNote {
        /// Note to edit
        note_id: NoteId,
        /// Validated note text
        content: String,
    },
    /// Delete one of the user's notes
    DeleteNote {
        /// Note to delete
        note_id: NoteId,
    },
}

/// What an applied [`RecipeAction`] did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RecipeActionOutcome {
    /// Recipe is now a favorite
    Favorited,
    /// Recipe is no longer a favorite
    Unfavorited,
    /// Note was created
    NoteAdded {
        /// The new note
        note: Note,
    },
    /// Note was edited
    NoteUpdated {
        /// The note after the edit
        note: NoteWithAuthor,
    },
    /// Note was deleted
    NoteDeleted {
        /// The deleted note's ID
        note_id: NoteId,
    },
}

fn form_not_submitted_correctly() -> Error {
    ValidationError::form(FORM_NOT_SUBMITTED_CORRECTLY).into()
}

fn parse_note_id(form: &FormData) -> Result<NoteId> {
    let raw = form.get("noteId").ok_or_else(form_not_submitted_correctly)?;
    raw.parse()
        .map_err(|_| Error::NotFound(format!("note {}", raw)))
}

impl RecipeAction {
    /// Read and validate the action fields of a recipe page submission
    ///
    /// Missing fields are a form-level validation error; an `actionId` that names
    /// no action is a [`FormError::UnknownAction`].
    pub fn from_form(form: &FormData, rules: &RecipeConfig) -> Result<Self> {
        let action = form.get(ACTION_ID_FIELD).unwrap_or_default();

        match action {
            "favorite" => Ok(RecipeAction::Favorite),
            "unfavorite" => Ok(RecipeAction::Unfavorite),
            "addNote" => Ok(RecipeAction::AddNote {
                content: NoteForm::from_form(form).validate(rules)?,
            }),
            "updateNote" => {
                // Both fields must be present before either is checked further
                if form.get("noteId").is_none() || form.get("content").is_none() {
                    return Err(form_not_submitted_correctly());
                }
                let content = NoteForm::from_form(form).validate(rules)?;
                Ok(RecipeAction::UpdateNote {
                    note_id: parse_note_id(form)?,
                    content,
                })
            }
            "deleteNote" => Ok(RecipeAction::DeleteNote {
                note_id: parse_note_id(form)?,
            }),
            other => Err(FormError::UnknownAction {
                action: other.to_string(),
            }
            .into()),
        }
    }
}

impl Cookbook {
    /// Validate a recipe form, including that every chosen category exists
    async fn recipe_submission(&self, form: &FormData) -> Result<RecipeSubmission> {
        let recipe_form = RecipeForm::from_form(form)?;
        let submission = recipe_form.validate(&self.config.recipes)?;

        let missing = self.db.missing_categories(&submission.categories).await?;
        if !missing.is_empty() {
            tracing::debug!(?missing, "recipe form named unknown categories");
            return Err(ValidationError::field("categories", "Unknown category")
                .with_fields(recipe_form.echo())
                .into());
        }

        Ok(submission)
    }

    /// Create a recipe from the new-recipe form
    pub async fn create_recipe(&self, author: Option<UserId>, form: &FormData) -> Result<RecipeId> {
        let author = self.require_user(author).await?;
        let submission = self.recipe_submission(form).await?;

        let recipe_id = self.db.insert_recipe(author.id, &submission).await?;

        tracing::info!(
            recipe_id = %recipe_id,
            user_id = %author.id,
            ingredients = submission.ingredients.len(),
            "recipe created"
        );
        Ok(recipe_id)
    }

    /// Replace a recipe's details, categories and ingredients from the edit form
    ///
    /// Only the author or an admin may edit.
    pub async fn update_recipe(
        &self,
        editor: Option<UserId>,
        recipe_id: RecipeId,
        form: &FormData,
    ) -> Result<()> {
        let editor = self.require_user(editor).await?;
        self.require_recipe_owner(&editor, recipe_id).await?;
        let submission = self.recipe_submission(form).await?;

        self.db
            .update_recipe(recipe_id, &submission)
            .await
            .map_err(|e| match e {
                Error::Database(DatabaseError::NotFound(_)) => {
                    Error::NotFound(format!("recipe {}", recipe_id))
                }
                other => other,
            })?;

        tracing::info!(recipe_id = %recipe_id, user_id = %editor.id, "recipe updated");
        Ok(())
    }

    /// Delete a recipe; only the author or an admin may
    pub async fn delete_recipe(&self, user: Option<UserId>, recipe_id: RecipeId) -> Result<()> {
        let user = self.require_user(user).await?;
        self.require_recipe_owner(&user, recipe_id).await?;

        if !self.db.delete_recipe(recipe_id).await? {
            return Err(Error::NotFound(format!("recipe {}", recipe_id)));
        }

        tracing::info!(recipe_id = %recipe_id, user_id = %user.id, "recipe deleted");
        Ok(())
    }

    async fn require_recipe_owner(&self, user: &User, recipe_id: RecipeId) -> Result<()> {
        let recipe = self
            .db
            .get_recipe_record(recipe_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("recipe {}", recipe_id)))?;

        if recipe.user_id != user.id && !user.is_admin() {
            return Err(Error::Forbidden(
                "only the author or an admin may change this recipe".into(),
            ));
        }
        Ok(())
    }

    /// Load the recipe page
    ///
    /// A signed-in viewer's visit is recorded for their recently viewed list.
    pub async fn view_recipe(
        &self,
        recipe_id: RecipeId,
        viewer: Option<UserId>,
    ) -> Result<RecipePage> {
        let details = self
            .db
            .get_recipe(recipe_id, viewer)
            .await?
            .ok_or_else(|| Error::NotFound(format!("recipe {}", recipe_id)))?;
        let notes = self.db.list_notes(recipe_id).await?;

        if let Some(viewer) = viewer {
            self.db.record_recipe_view(viewer, recipe_id).await?;
        }

        tracing::debug!(recipe_id = %recipe_id, notes = notes.len(), "recipe viewed");
        Ok(RecipePage { details, notes })
    }

    /// Apply an action submitted from the recipe page
    pub async fn apply_recipe_action(
        &self,
        user: Option<UserId>,
        recipe_id: RecipeId,
        form: &FormData,
    ) -> Result<RecipeActionOutcome> {
        let user = self.require_user(user).await?;
        let action = RecipeAction::from_form(form, &self.config.recipes)?;

        if self.db.get_recipe_record(recipe_id).await?.is_none() {
            return Err(Error::NotFound(format!("recipe {}", recipe_id)));
        }

        let outcome = match action {
            RecipeAction::Favorite => {
                self.db.favorite_recipe(user.id, recipe_id).await?;
                RecipeActionOutcome::Favorited
            }
            RecipeAction::Unfavorite => {
                self.db.unfavorite_recipe(user.id, recipe_id).await?;
                RecipeActionOutcome::Unfavorited
            }
            RecipeAction::AddNote { content } => {
                let note = self.db.insert_note(recipe_id, user.id, &content).await?;
                RecipeActionOutcome::NoteAdded { note }
            }
            RecipeAction::UpdateNote { note_id, content } => {
                self.require_note_author(&user, recipe_id, note_id).await?;
                let note = self
                    .db
                    .update_note(note_id, &content)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("note {}", note_id)))?;
                RecipeActionOutcome::NoteUpdated { note }
            }
            RecipeAction::DeleteNote { note_id } => {
                self.require_note_author(&user, recipe_id, note_id).await?;
                if !self.db.delete_note(note_id).await? {
                    return Err(Error::NotFound(format!("note {}", note_id)));
                }
                RecipeActionOutcome::NoteDeleted { note_id }
            }
        };

        tracing::info!(recipe_id = %recipe_id, user_id = %user.id, ?outcome, "recipe action applied");
        Ok(outcome)
    }

    async fn require_note_author(
        &self,
        user: &User,
        recipe_id: RecipeId,
        note_id: NoteId,
    ) -> Result<()> {
        let note = self
            .db
            .get_note(note_id)
            .await?
            .filter(|n| n.note.recipe_id == recipe_id)
            .ok_or_else(|| Error::NotFound(format!("note {}", note_id)))?;

        if note.note.user_id != user.id {
            return Err(Error::Forbidden("only the author may change this note".into()));
        }
        Ok(())
    }
}
