//! Submitted form handling
//!
//! The embedding request layer hands over either the raw URL-encoded body or the
//! pairs it already decoded. [`FormData`] keeps them in submission order, which the
//! ingredient decoder relies on.
//!
//! ## Submodules
//!
//! - [`ingredients`] - regroup `ingredient[<group>][<field>]` fields into drafts
//! - [`validation`] - per-form field checks producing [`ValidationError`](crate::error::ValidationError)

pub mod ingredients;
pub mod validation;

pub use ingredients::{IngredientDraft, decode_ingredients};
pub use validation::{
    CategoryForm, IngredientInput, NoteForm, PasswordResetForm, ProfileForm, RecipeForm,
    RecipeSubmission,
};

use crate::error::FormError;

/// Ordered key/value pairs of one form submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    /// Decode an `application/x-www-form-urlencoded` body
    ///
    /// `+` becomes a space and percent escapes are decoded; invalid UTF-8 is replaced
    /// rather than rejected.
    pub fn parse(body: &str) -> Self {
        let pairs = url::form_urlencoded::parse(body.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Wrap pairs the caller already decoded
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First value submitted under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value submitted under `name`, in order
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// All pairs in submission order
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Decode the ingredient fields of this submission
    pub fn ingredients(&self) -> Result<Vec<IngredientDraft>, FormError> {
        decode_ingredients(&self.pairs)
    }
}
