//! Saving a workbook as xlsx and reading it back
use sheet_image_fill::domain::{StoreError, TabularStore};
use sheet_image_fill::infrastructure::Workbook;
use sheet_image_fill::infrastructure::workbook::{Cell, Sheet};

#[test]
fn saved_workbook_reopens_with_same_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products_with_images.xlsx");

    let mut workbook = Workbook::new()
        .with_sheet(
            "Cards & Codes",
            vec![
                vec!["Title", "Brand", "Region"],
                vec!["Tom & Jerry <DVD>", "", "Global"],
                vec!["", "", ""],
                vec!["Visa Gift Card", "Visa", "India"],
            ],
        )
        .with_sheet("Second", vec![vec!["Title"], vec!["Only title"]])
        .with_output(&path);
    let headers = workbook.ensure_headers("Cards & Codes", &["Title", "Image"]).unwrap();
    workbook
        .set_cell("Cards & Codes", 4, headers["Image"], "https://cdn.shop.test/visa.jpg?w=600&h=400")
        .unwrap();

    let saved = workbook.save().unwrap();
    assert_eq!(saved.as_deref(), Some(path.as_path()));

    let reopened = Workbook::open(&path).unwrap();
    assert_eq!(reopened.sheets(), vec!["Cards & Codes".to_string(), "Second".to_string()]);
    assert_eq!(reopened.row_count("Cards & Codes").unwrap(), 4);
    assert_eq!(reopened.get_cell("Cards & Codes", 1, 4).unwrap().as_deref(), Some("Image"));
    assert_eq!(
        reopened.get_cell("Cards & Codes", 2, 1).unwrap().as_deref(),
        Some("Tom & Jerry <DVD>")
    );
    assert_eq!(reopened.get_cell("Cards & Codes", 2, 2).unwrap(), None);
    assert_eq!(reopened.get_cell("Cards & Codes", 2, 3).unwrap().as_deref(), Some("Global"));
    assert_eq!(
        reopened.get_cell("Cards & Codes", 4, 4).unwrap().as_deref(),
        Some("https://cdn.shop.test/visa.jpg?w=600&h=400")
    );
    assert_eq!(reopened.get_cell("Second", 2, 1).unwrap().as_deref(), Some("Only title"));
}

#[test]
fn numeric_and_boolean_cells_keep_their_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.xlsx");

    let sheet = Sheet {
        name: "Prices".into(),
        rows: vec![
            vec![Some(Cell::Text("Title".into())), Some(Cell::Text("Price".into())), Some(Cell::Text("Active".into()))],
            vec![Some(Cell::Text("Gift card".into())), Some(Cell::Number(19.99)), Some(Cell::Bool(true))],
            vec![Some(Cell::Text("Voucher".into())), Some(Cell::Number(3.0)), Some(Cell::Bool(false))],
        ],
    };
    let mut workbook = Workbook::from_sheets(vec![sheet]).with_output(&path);
    workbook.save().unwrap();

    let reopened = Workbook::open(&path).unwrap();
    let rows = &reopened.sheet("Prices").unwrap().rows;
    assert_eq!(rows[1][1], Some(Cell::Number(19.99)));
    assert_eq!(rows[2][1], Some(Cell::Number(3.0)));
    assert_eq!(rows[1][2], Some(Cell::Bool(true)));
    assert_eq!(reopened.get_cell("Prices", 3, 2).unwrap().as_deref(), Some("3"));
}

#[test]
fn date_cells_survive_repeated_saves() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("orders.xlsx");
    let second = dir.path().join("orders_again.xlsx");

    let sheet = Sheet {
        name: "Orders".into(),
        rows: vec![
            vec![Some(Cell::Text("Title".into())), Some(Cell::Text("Ordered".into())), Some(Cell::Text("Picked".into()))],
            vec![Some(Cell::Text("Gift card".into())), Some(Cell::Date(45292.0)), Some(Cell::Date(45292.25))],
        ],
    };
    Workbook::from_sheets(vec![sheet]).with_output(&first).save().unwrap();

    Workbook::open(&first).unwrap().with_output(&second).save().unwrap();

    let reopened = Workbook::open(&second).unwrap();
    let rows = &reopened.sheet("Orders").unwrap().rows;
    assert_eq!(rows[1][1], Some(Cell::Date(45292.0)));
    assert_eq!(rows[1][2], Some(Cell::Date(45292.25)));
    assert_eq!(reopened.get_cell("Orders", 2, 2).unwrap().as_deref(), Some("2024-01-01"));
    assert_eq!(
        reopened.get_cell("Orders", 2, 3).unwrap().as_deref(),
        Some("2024-01-01 06:00:00")
    );
}

#[test]
fn opening_a_missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Workbook::open(&dir.path().join("nope.xlsx")).unwrap_err();
    assert!(matches!(err, StoreError::Read { .. }));
}
