use super::{insert_test_user, open_db, submission};
use crate::types::ViewOrder;
use std::time::Duration;

#[tokio::test]
async fn test_recently_viewed_orders_by_latest_view() {
    let (db, _temp_file) = open_db().await;

    let user = insert_test_user(&db, "reader@example.com").await;
    let category = db.insert_category("breakfast").await.unwrap();
    let oats = db
        .insert_recipe(user.id, &submission("Oats", vec![category.id], &["oats"]))
        .await
        .unwrap();
    let toast = db
        .insert_recipe(user.id, &submission("Toast", vec![category.id], &["bread"]))
        .await
        .unwrap();

    db.record_recipe_view(user.id, oats).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    db.record_recipe_view(user.id, toast).await.unwrap();

    let newest = db.list_recently_viewed(user.id, ViewOrder::Newest).await.unwrap();
    assert_eq!(newest.len(), 2);
    assert_eq!(newest[0].recipe.id, toast);
    assert_eq!(newest[1].recipe.id, oats);

    // Viewing again moves it to the front without adding a row
    tokio::time::sleep(Duration::from_millis(5)).await;
    db.record_recipe_view(user.id, oats).await.unwrap();

    let newest = db.list_recently_viewed(user.id, ViewOrder::Newest).await.unwrap();
    assert_eq!(newest.len(), 2);
    assert_eq!(newest[0].recipe.id, oats);
    assert!(newest[0].viewed_at > newest[1].viewed_at);

    let oldest = db.list_recently_viewed(user.id, ViewOrder::Oldest).await.unwrap();
    assert_eq!(oldest[0].recipe.id, toast);

    db.close().await;
}

#[tokio::test]
async fn test_views_are_per_user() {
    let (db, _temp_file) = open_db().await;

    let first = insert_test_user(&db, "one@example.com").await;
    let second = insert_test_user(&db, "two@example.com").await;
    let category = db.insert_category("entree").await.unwrap();
    let recipe = db
        .insert_recipe(first.id, &submission("Roast", vec![category.id], &["chicken"]))
        .await
        .unwrap();

    db.record_recipe_view(first.id, recipe).await.unwrap();

    assert_eq!(
        db.list_recently_viewed(first.id, ViewOrder::Newest)
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(
        db.list_recently_viewed(second.id, ViewOrder::Newest)
            .await
            .unwrap()
            .is_empty()
    );

    db.close().await;
}
