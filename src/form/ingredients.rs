//! Ingredient field decoding.
//!
//! Recipe forms submit each ingredient as a group of flat fields whose keys carry
//! a group token and a field name:
//!
//! ```text
//! ingredient[7f3c][name]=flour
//! ingredient[7f3c][quantity]=2 cups
//! ingredient[a91e][id]=...&ingredient[a91e][name]=salt
//! ```
//!
//! [`decode_ingredients`] regroups those fields into one [`IngredientDraft`] per
//! group token, in the order each token first appears. Tokens are opaque: rows
//! rendered by older forms used array positions (`ingredient[0][name]`) and those
//! decode the same way.

use crate::error::FormError;
use serde::Serialize;
use std::collections::HashMap;

/// Key prefix that marks a form field as belonging to an ingredient
pub const INGREDIENT_PREFIX: &str = "ingredient";

/// One ingredient as submitted, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngredientDraft {
    /// Token tying this draft's fields together
    pub group_key: String,
    /// Existing ingredient id, only present when editing a saved row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Ingredient name, absent if the group had no name field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-text quantity; empty or missing submissions are `None`
    pub quantity: Option<String>,
}

impl IngredientDraft {
    fn new(group_key: &str) -> Self {
        Self {
            group_key: group_key.to_string(),
            ..Default::default()
        }
    }

    fn set(&mut self, field: IngredientField, value: &str) {
        match field {
            IngredientField::Id => self.id = Some(value.to_string()),
            IngredientField::Name => self.name = Some(value.to_string()),
            IngredientField::Quantity => {
                self.quantity = (!value.is_empty()).then(|| value.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngredientField {
    Id,
    Name,
    Quantity,
}

impl IngredientField {
    fn parse(key: &str, field: &str) -> Result<Self, FormError> {
        match field {
            "id" => Ok(IngredientField::Id),
            "name" => Ok(IngredientField::Name),
            "quantity" => Ok(IngredientField::Quantity),
            other => Err(FormError::UnknownField {
                key: key.to_string(),
                field: other.to_string(),
            }),
        }
    }
}

/// Split `ingredient[<group>][<field>]` into its group and field segments.
///
/// The group is the text inside the first bracket pair, the field the text inside
/// the last one, which must end the key.
fn split_key(key: &str) -> Result<(&str, &str), FormError> {
    let malformed = || FormError::MalformedKey {
        key: key.to_string(),
    };

    let group_start = key.find('[').ok_or_else(malformed)? + 1;
    let group_end = group_start + key[group_start..].find(']').ok_or_else(malformed)?;
    let field_open = key.rfind('[').ok_or_else(malformed)?;
    let field_end = key.rfind(']').ok_or_else(malformed)?;

    // The field needs its own bracket pair after the group's, closing the key
    if field_open <= group_end || field_end <= field_open || field_end + 1 != key.len() {
        return Err(malformed());
    }

    let group = &key[group_start..group_end];
    if group.is_empty() {
        return Err(malformed());
    }

    Ok((group, &key[field_open + 1..field_end]))
}

/// Regroup flat ingredient fields into ordered drafts.
///
/// Pairs whose key does not start with [`INGREDIENT_PREFIX`] are ignored. A key that
/// does start with it but is malformed, or names a field other than `id`, `name` or
/// `quantity`, fails the whole batch. When a group submits the same field twice the
/// later value wins.
pub fn decode_ingredients<'a, I, K, V>(pairs: I) -> Result<Vec<IngredientDraft>, FormError>
where
    I: IntoIterator<Item = &'a (K, V)>,
    K: AsRef<str> + 'a,
    V: AsRef<str> + 'a,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut drafts: Vec<IngredientDraft> = Vec::new();

    for (key, value) in pairs {
        let key = key.as_ref();
        if !key.starts_with(INGREDIENT_PREFIX) {
            continue;
        }

        let (group, field) = split_key(key)?;
        let field = IngredientField::parse(key, field)?;

        let index = match positions.get(group) {
            Some(&index) => index,
            None => {
                drafts.push(IngredientDraft::new(group));
                positions.insert(group.to_string(), drafts.len() - 1);
                drafts.len() - 1
            }
        };
        drafts[index].set(field, value.as_ref());
    }

    Ok(drafts)
}
