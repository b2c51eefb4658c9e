use super::open_db;
use crate::error::{DatabaseError, Error};
use crate::types::CategoryId;

#[tokio::test]
async fn test_insert_and_list_categories_by_name() {
    let (db, _temp_file) = open_db().await;

    db.insert_category("salad").await.unwrap();
    db.insert_category("Bread").await.unwrap();
    db.insert_category("appetizer").await.unwrap();

    let names: Vec<String> = db
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["appetizer", "Bread", "salad"]);

    db.close().await;
}

#[tokio::test]
async fn test_get_category_by_id_and_name() {
    let (db, _temp_file) = open_db().await;

    let cake = db.insert_category("cake").await.unwrap();

    assert_eq!(db.get_category(cake.id).await.unwrap(), Some(cake.clone()));
    assert_eq!(db.get_category_by_name("CAKE").await.unwrap(), Some(cake));
    assert!(db.get_category(CategoryId::new()).await.unwrap().is_none());
    assert!(db.get_category_by_name("pie").await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_duplicate_name_ignoring_case_is_rejected() {
    let (db, _temp_file) = open_db().await;

    db.insert_category("Dessert").await.unwrap();
    let result = db.insert_category("dessert").await;

    assert!(matches!(
        result,
        Err(Error::Database(DatabaseError::ConstraintViolation(_)))
    ));

    db.close().await;
}

#[tokio::test]
async fn test_missing_categories_reports_unknown_ids_in_order() {
    let (db, _temp_file) = open_db().await;

    let sauce = db.insert_category("sauce").await.unwrap();
    let candy = db.insert_category("candy").await.unwrap();
    let ghost_a = CategoryId::new();
    let ghost_b = CategoryId::new();

    let missing = db
        .missing_categories(&[ghost_a, sauce.id, ghost_b, candy.id])
        .await
        .unwrap();
    assert_eq!(missing, vec![ghost_a, ghost_b]);

    assert!(db.missing_categories(&[sauce.id]).await.unwrap().is_empty());
    assert!(db.missing_categories(&[]).await.unwrap().is_empty());

    db.close().await;
}
