//! SQL statement builders

use super::sink::quote_ident;
use crate::schema::{Column, ColumnSchema};

fn column_list(schema: &ColumnSchema) -> String {
    schema
        .names()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub fn create_table(qualified: &str, schema: &ColumnSchema, primary_key: &[String]) -> String {
    let mut definitions: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type()))
        .collect();
    if !primary_key.is_empty() {
        let keys: Vec<String> = primary_key.iter().map(|k| quote_ident(k)).collect();
        definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {qualified} ({})",
        definitions.join(", ")
    )
}

pub fn add_column(qualified: &str, column: &Column) -> String {
    format!(
        "ALTER TABLE {qualified} ADD COLUMN {} {}",
        quote_ident(&column.name),
        column.column_type.sql_type()
    )
}

pub fn insert(qualified: &str, schema: &ColumnSchema) -> String {
    format!(
        "INSERT INTO {qualified} ({}) VALUES ({})",
        column_list(schema),
        placeholders(schema.len())
    )
}

/// Insert that overwrites every non-key column on key conflict
pub fn upsert_on_conflict(qualified: &str, schema: &ColumnSchema, primary_key: &[String]) -> String {
    let keys: Vec<String> = primary_key.iter().map(|k| quote_ident(k)).collect();
    let updates: Vec<String> = schema
        .names()
        .filter(|name| !primary_key.iter().any(|k| k == name))
        .map(|name| {
            let quoted = quote_ident(name);
            format!("{quoted} = EXCLUDED.{quoted}")
        })
        .collect();

    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "{} ON CONFLICT ({}) {action}",
        insert(qualified, schema),
        keys.join(", ")
    )
}

pub fn delete_by_key(qualified: &str, primary_key: &[String]) -> String {
    let predicate: Vec<String> = primary_key
        .iter()
        .map(|k| format!("{} = ?", quote_ident(k)))
        .collect();
    format!("DELETE FROM {qualified} WHERE {}", predicate.join(" AND "))
}

pub fn count(qualified: &str) -> String {
    format!("SELECT COUNT(*) FROM {qualified}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use pretty_assertions::assert_eq;

    fn schema() -> ColumnSchema {
        let column = |name: &str, column_type| Column {
            name: name.to_string(),
            source_name: name.to_string(),
            column_type,
        };
        ColumnSchema::new(vec![
            column("region_id", ColumnType::Integer),
            column("typeid", ColumnType::Integer),
            column("price", ColumnType::Float),
        ])
    }

    fn keys() -> Vec<String> {
        vec!["region_id".to_string(), "typeid".to_string()]
    }

    #[test]
    fn test_create_table_with_primary_key() {
        assert_eq!(
            create_table("\"main\".\"prices\"", &schema(), &keys()),
            "CREATE TABLE IF NOT EXISTS \"main\".\"prices\" (\"region_id\" BIGINT, \"typeid\" BIGINT, \"price\" DOUBLE, PRIMARY KEY (\"region_id\", \"typeid\"))"
        );
    }

    #[test]
    fn test_upsert_updates_only_non_key_columns() {
        assert_eq!(
            upsert_on_conflict("\"t\"", &schema(), &keys()),
            "INSERT INTO \"t\" (\"region_id\", \"typeid\", \"price\") VALUES (?, ?, ?) ON CONFLICT (\"region_id\", \"typeid\") DO UPDATE SET \"price\" = EXCLUDED.\"price\""
        );
    }

    #[test]
    fn test_upsert_with_only_key_columns_does_nothing() {
        let only_keys = ColumnSchema::new(schema().columns()[..2].to_vec());
        assert!(upsert_on_conflict("\"t\"", &only_keys, &keys()).ends_with("DO NOTHING"));
    }

    #[test]
    fn test_delete_by_key() {
        assert_eq!(
            delete_by_key("\"t\"", &keys()),
            "DELETE FROM \"t\" WHERE \"region_id\" = ? AND \"typeid\" = ?"
        );
    }
}
