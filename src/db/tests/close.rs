use super::{insert_test_user, open_db};
use crate::types::RecipeId;

/// Verify that querying the database after closing the pool returns an error
/// rather than hanging or panicking.
#[tokio::test]
async fn test_get_user_after_pool_close_returns_error() {
    let (db, _temp_file) = open_db().await;

    let user = insert_test_user(&db, "close@example.com").await;

    // Verify the user exists before closing
    let before = db.get_user(user.id).await.unwrap();
    assert!(before.is_some(), "user should exist before close");

    // Close the pool (but keep the Database struct alive)
    db.pool().close().await;

    let result = db.get_user(user.id).await;
    assert!(
        result.is_err(),
        "get_user after pool close should return an error, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_list_categories_after_pool_close_returns_error() {
    let (db, _temp_file) = open_db().await;

    db.pool().close().await;

    let result = db.list_categories().await;
    assert!(
        result.is_err(),
        "list_categories after pool close should return an error, got: {:?}",
        result
    );
}

#[tokio::test]
async fn test_delete_recipe_after_pool_close_returns_error() {
    let (db, _temp_file) = open_db().await;

    db.pool().close().await;

    let result = db.delete_recipe(RecipeId::new()).await;
    assert!(
        result.is_err(),
        "delete_recipe after pool close should return an error, got: {:?}",
        result
    );
}
