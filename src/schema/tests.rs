//! Schema inference tests

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use test_case::test_case;

fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable::with_rows(
        headers.iter().map(|h| (*h).to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| (*c).to_string()).collect())
            .collect(),
    )
    .unwrap()
}

fn types_of(schema: &ColumnSchema) -> Vec<ColumnType> {
    schema.columns().iter().map(|c| c.column_type).collect()
}

#[test]
fn test_infer_integer_and_float_columns() {
    let t = table(&["a", "b"], &[&["1", "2.5"], &["", "3"], &["4", ""]]);
    let schema = infer_schema(&t).unwrap();
    assert_eq!(types_of(&schema), vec![ColumnType::Integer, ColumnType::Float]);
}

#[test]
fn test_empty_cells_do_not_veto_integer() {
    let t = table(&["n"], &[&["1"], &[""], &["  "], &["2"]]);
    let schema = infer_schema(&t).unwrap();
    assert_eq!(types_of(&schema), vec![ColumnType::Integer]);
}

#[test]
fn test_not_available_is_a_null_token() {
    let t = table(
        &["won", "started", "name"],
        &[&["N/A", "N/A", "N/A"], &["true", "yes", "Alpha"], &["false", "null", "N/A"]],
    );
    let schema = infer_schema(&t).unwrap();
    assert_eq!(
        types_of(&schema),
        vec![ColumnType::Boolean, ColumnType::Boolean, ColumnType::Text]
    );

    let rows = schema.coerce(&t).unwrap();
    assert_eq!(rows[0], vec![CellValue::Null, CellValue::Null, CellValue::Null]);
    assert_eq!(rows[2][1], CellValue::Null);
    assert_eq!(rows[1][2], CellValue::Text("Alpha".to_string()));
}

#[test]
fn test_all_empty_column_is_text() {
    let t = table(&["blank"], &[&[""], &[""]]);
    assert_eq!(types_of(&infer_schema(&t).unwrap()), vec![ColumnType::Text]);

    let no_rows = table(&["blank"], &[]);
    assert_eq!(
        types_of(&infer_schema(&no_rows).unwrap()),
        vec![ColumnType::Text]
    );
}

#[test]
fn test_single_late_value_widens_column() {
    let mut rows: Vec<Vec<String>> = (0..500).map(|i| vec![i.to_string()]).collect();
    rows.push(vec!["unknown".to_string()]);
    let t = RawTable::with_rows(vec!["count".to_string()], rows).unwrap();
    assert_eq!(types_of(&infer_schema(&t).unwrap()), vec![ColumnType::Text]);
}

#[test_case(&["true", "False", "YES", "no"], ColumnType::Boolean ; "mixed case tokens")]
#[test_case(&["1", "0", "1"], ColumnType::Integer ; "integer wins over boolean")]
#[test_case(&["1", "0.5"], ColumnType::Float ; "integer and float")]
#[test_case(&["1.0", "NaN"], ColumnType::Text ; "nan is not a float")]
#[test_case(&["inf", "2"], ColumnType::Text ; "infinity is not a float")]
#[test_case(&["-7", "+3"], ColumnType::Integer ; "signed integers")]
#[test_case(&["1e3", "2"], ColumnType::Float ; "exponent notation")]
#[test_case(&["yes", "2"], ColumnType::Text ; "boolean and integer")]
fn test_infer_column(values: &[&str], expected: ColumnType) {
    let inferrer = SchemaInferrer::new();
    assert_eq!(inferrer.infer_column(values.iter().copied()), expected);
}

#[test]
fn test_boolean_detection_can_be_disabled() {
    let inferrer = SchemaInferrer::new().with_boolean_detection(false);
    assert_eq!(
        inferrer.infer_column(["true", "false"]),
        ColumnType::Text
    );
}

#[test]
fn test_inference_is_deterministic() {
    let t = table(
        &["Series ID", "score", "won"],
        &[&["10", "1.5", "true"], &["11", "", "false"]],
    );
    let first = infer_schema(&t).unwrap();
    let second = infer_schema(&t).unwrap();
    assert_eq!(first, second);
}

#[test_case("Series ID", "series_id")]
#[test_case("52w-High", "_52w_high")]
#[test_case("price ($)", "price____")]
#[test_case("team_1_name", "team_1_name")]
#[test_case("", "_")]
fn test_sanitize_name(input: &str, expected: &str) {
    assert_eq!(sanitize_name(input), expected);
}

#[test]
fn test_sanitize_collision_is_schema_conflict() {
    let headers = vec!["Team Name".to_string(), "team-name".to_string()];
    let err = sanitize_columns(&headers).unwrap_err();
    assert!(matches!(err, Error::SchemaConflict { .. }));
    let text = err.to_string();
    assert!(text.contains("Team Name") && text.contains("team-name"));
}

#[test]
fn test_schema_keeps_source_names() {
    let t = table(&["Item Name"], &[&["Tritanium"]]);
    let schema = infer_schema(&t).unwrap();
    let column = schema.get("item_name").unwrap();
    assert_eq!(column.source_name, "Item Name");
    assert_eq!(schema.position("item_name"), Some(0));
}

#[test]
fn test_coerce_rows() {
    let t = table(
        &["id", "price", "ok", "name"],
        &[&["1", "4.2", "yes", "Tritanium"], &["2", "", "no", ""]],
    );
    let schema = infer_schema(&t).unwrap();
    let rows = schema.coerce(&t).unwrap();

    assert_eq!(
        rows[0],
        vec![
            CellValue::Integer(1),
            CellValue::Float(4.2),
            CellValue::Boolean(true),
            CellValue::Text("Tritanium".to_string()),
        ]
    );
    assert_eq!(rows[1][1], CellValue::Null);
    assert_eq!(rows[1][3], CellValue::Null);
}

#[test]
fn test_coerce_rejects_values_outside_schema() {
    let schema = infer_schema(&table(&["id"], &[&["1"]])).unwrap();
    let other = table(&["id"], &[&["one"]]);
    let err = schema.coerce(&other).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert!(err.to_string().contains("row 1"));
}

#[test]
fn test_raw_table_rejects_ragged_rows() {
    let mut t = RawTable::new(vec!["a".to_string(), "b".to_string()]);
    assert!(t.push_row(vec!["1".to_string()]).is_err());
    assert!(t.is_empty());
}

#[test]
fn test_fits_declared_column_types() {
    assert!(ColumnType::Integer.fits_declared("BIGINT"));
    assert!(ColumnType::Integer.fits_declared("DOUBLE"));
    assert!(ColumnType::Integer.fits_declared("VARCHAR"));
    assert!(ColumnType::Float.fits_declared("DECIMAL(18,3)"));
    assert!(!ColumnType::Float.fits_declared("BIGINT"));
    assert!(!ColumnType::Text.fits_declared("BIGINT"));
    assert!(ColumnType::Text.fits_declared("timestamp with time zone"));
    assert!(!ColumnType::Boolean.fits_declared("INTEGER"));
}
