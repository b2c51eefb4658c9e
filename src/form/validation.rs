//! Form validation.
//!
//! Each form type is read from [`FormData`] first, then validated. Validation
//! checks every field and reports all failures together, echoing the submitted
//! values so the form can be re-rendered.

use super::{FormData, IngredientDraft};
use crate::config::RecipeConfig;
use crate::error::{FormError, ValidationError};
use crate::types::{CategoryId, IngredientId};
use serde::Serialize;

/// Message for submissions missing a field the form always renders
pub const FORM_NOT_SUBMITTED_CORRECTLY: &str = "Form not submitted correctly.";

/// Recipe create/edit form as submitted
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecipeForm {
    /// Recipe title
    pub title: Option<String>,
    /// Preparation instructions
    pub instructions: Option<String>,
    /// Servings description ("4 to 6")
    pub servings: Option<String>,
    /// Story behind the recipe
    pub background: Option<String>,
    /// Selected category ids, unparsed
    pub categories: Vec<String>,
    /// Decoded ingredient rows
    pub ingredients: Vec<IngredientDraft>,
}

/// Ingredient ready for persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientInput {
    /// Id of the row being edited, if the form carried a well-formed one
    pub id: Option<IngredientId>,
    /// Ingredient name
    pub name: String,
    /// Free-text quantity
    pub quantity: Option<String>,
}

impl IngredientInput {
    /// New ingredient without an existing row
    pub fn new(name: impl Into<String>, quantity: Option<&str>) -> Self {
        Self {
            id: None,
            name: name.into(),
            quantity: quantity.map(String::from),
        }
    }
}

/// A recipe form that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSubmission {
    /// Recipe title, trimmed
    pub title: String,
    /// Preparation instructions
    pub instructions: String,
    /// Servings description
    pub servings: Option<String>,
    /// Story behind the recipe
    pub background: Option<String>,
    /// Categories to link, deduplicated in submission order
    pub categories: Vec<CategoryId>,
    /// Ingredients in submission order
    pub ingredients: Vec<IngredientInput>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl RecipeForm {
    /// Read the recipe fields, decoding ingredients
    ///
    /// Fails only when the ingredient keys are malformed.
    pub fn from_form(form: &FormData) -> Result<Self, FormError> {
        Ok(Self {
            title: form.get("title").map(String::from),
            instructions: form.get("instructions").map(String::from),
            servings: form.get("servings").map(String::from),
            background: form.get("background").map(String::from),
            categories: form
                .get_all("categories")
                .into_iter()
                .map(String::from)
                .collect(),
            ingredients: form.ingredients()?,
        })
    }

    /// Check every field and build the submission
    pub fn validate(&self, rules: &RecipeConfig) -> Result<RecipeSubmission, ValidationError> {
        let mut errors = ValidationError::default();

        let title = non_blank(self.title.as_deref());
        if title.is_none() {
            errors
                .field_errors
                .insert("title".into(), "Title required".into());
        }

        let instructions = self.instructions.clone().unwrap_or_default();
        if instructions.trim().chars().count() < rules.min_instructions_length {
            errors.field_errors.insert(
                "instructions".into(),
                format!(
                    "Instructions need at least {} characters",
                    rules.min_instructions_length
                ),
            );
        }

        let ingredients = match self.validate_ingredients() {
            Ok(ingredients) => ingredients,
            Err(message) => {
                errors.field_errors.insert("ingredients".into(), message);
                Vec::new()
            }
        };

        let categories = match self.validate_categories() {
            Ok(categories) => categories,
            Err(message) => {
                errors.field_errors.insert("categories".into(), message);
                Vec::new()
            }
        };

        if !errors.is_empty() {
            return Err(errors.with_fields(self.echo()));
        }

        Ok(RecipeSubmission {
            title: title.unwrap_or_default(),
            instructions,
            servings: non_blank(self.servings.as_deref()),
            background: non_blank(self.background.as_deref()),
            categories,
            ingredients,
        })
    }

    fn validate_ingredients(&self) -> Result<Vec<IngredientInput>, String> {
        if self.ingredients.is_empty() {
            return Err("A recipe needs at least one ingredient".into());
        }

        self.ingredients
            .iter()
            .map(|draft| {
                let name = non_blank(draft.name.as_deref())
                    .ok_or_else(|| "Each ingredient must have a name".to_string())?;
                Ok(IngredientInput {
                    id: draft.id.as_deref().and_then(|id| id.parse().ok()),
                    name,
                    quantity: draft.quantity.clone(),
                })
            })
            .collect()
    }

    fn validate_categories(&self) -> Result<Vec<CategoryId>, String> {
        if self.categories.iter().all(|c| c.trim().is_empty()) {
            return Err("At least one category required".into());
        }

        let mut ids: Vec<CategoryId> = Vec::with_capacity(self.categories.len());
        for raw in self.categories.iter().filter(|c| !c.trim().is_empty()) {
            let id: CategoryId = raw.parse().map_err(|_| "Unknown category".to_string())?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    pub(crate) fn echo(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Note add/update form
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoteForm {
    /// Note text
    pub content: Option<String>,
}

impl NoteForm {
    /// Read the note fields
    pub fn from_form(form: &FormData) -> Self {
        Self {
            content: form.get("content").map(String::from),
        }
    }

    /// Validate the note content
    pub fn validate(&self, rules: &RecipeConfig) -> Result<String, ValidationError> {
        let Some(content) = &self.content else {
            return Err(ValidationError::form(FORM_NOT_SUBMITTED_CORRECTLY));
        };

        if content.chars().count() < rules.min_note_length {
            return Err(ValidationError::field("content", "That note is too short.")
                .with_fields(serde_json::json!({ "content": content })));
        }

        Ok(content.clone())
    }
}

/// Admin category creation form
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryForm {
    /// Category name
    pub name: Option<String>,
}

impl CategoryForm {
    /// Read the category fields
    pub fn from_form(form: &FormData) -> Self {
        Self {
            name: form.get("name").map(String::from),
        }
    }

    /// Validate and trim the category name
    pub fn validate(&self) -> Result<String, ValidationError> {
        non_blank(self.name.as_deref()).ok_or_else(|| {
            ValidationError::field("name", "Name required")
                .with_fields(serde_json::json!({ "name": self.name }))
        })
    }
}

/// Admin profile form
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileForm {
    /// Given name, required
    pub first_name: Option<String>,
    /// Family name, optional
    pub last_name: Option<String>,
}

impl ProfileForm {
    /// Read the profile fields
    pub fn from_form(form: &FormData) -> Self {
        Self {
            first_name: form.get("firstName").map(String::from),
            last_name: form.get("lastName").map(String::from),
        }
    }

    /// Validate, returning `(first_name, last_name)`
    pub fn validate(&self) -> Result<(String, Option<String>), ValidationError> {
        let first_name = non_blank(self.first_name.as_deref()).ok_or_else(|| {
            ValidationError::field("firstName", "First name required")
                .with_fields(serde_json::json!({ "firstName": self.first_name }))
        })?;
        Ok((first_name, non_blank(self.last_name.as_deref())))
    }
}

/// Password reset completion form
#[derive(Debug, Clone, Default)]
pub struct PasswordResetForm {
    /// Account email, carried from the reset link
    pub email: Option<String>,
    /// Reset token, carried from the reset link
    pub token: Option<String>,
    /// New password
    pub password: Option<String>,
}

impl PasswordResetForm {
    /// Read the reset fields
    pub fn from_form(form: &FormData) -> Self {
        Self {
            email: form.get("email").map(String::from),
            token: form.get("token").map(String::from),
            password: form.get("password").map(String::from),
        }
    }

    /// Email and token, which the form carries as hidden fields
    pub fn credentials(&self) -> Result<(&str, &str), ValidationError> {
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| ValidationError::form("Missing email"))?;
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ValidationError::form("Missing token"))?;
        Ok((email, token))
    }

    /// The new password, checked against the minimum length
    pub fn new_password(&self, min_length: usize) -> Result<&str, ValidationError> {
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| ValidationError::field("password", "Password is required"))?;
        validate_password(password, min_length)?;
        Ok(password)
    }
}

/// Loose email shape check: more than three characters and an `@`
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 3 && email.contains('@') {
        Ok(())
    } else {
        Err(ValidationError::field("email", "Email is invalid")
            .with_fields(serde_json::json!({ "email": email })))
    }
}

/// Minimum length password check
pub fn validate_password(password: &str, min_length: usize) -> Result<(), ValidationError> {
    if password.chars().count() < min_length {
        return Err(ValidationError::field(
            "password",
            format!("Password must be at least {} characters.", min_length),
        ));
    }
    Ok(())
}
