//! Bulk loader
//!
//! Each load runs inside one sink transaction, so a failed attempt leaves
//! the table as it was. Attempts that fail with a transient sink error are
//! repeated as a whole.

use super::types::{LoadMode, LoadPhase, LoadReport, UpsertSpec};
use crate::database::{ExistingColumn, Sink, TableRef};
use crate::error::{Error, Result};
use crate::retry::{RetryDecision, RetryKind, RetryPolicy, RetryState};
use crate::schema::{CellValue, Column, ColumnSchema, RawTable, SchemaInferrer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loads string tables into a [`Sink`]
pub struct BulkLoader<'s, S: Sink + ?Sized> {
    sink: &'s mut S,
    retry: RetryPolicy,
    inferrer: SchemaInferrer,
    cancel: Option<Arc<AtomicBool>>,
}

/// Where an attempt got to before it returned
struct Progress {
    phase: LoadPhase,
    rows_applied: usize,
}

impl Progress {
    fn advance(&mut self, table: &TableRef, phase: LoadPhase) {
        debug!("Load {}: {} -> {}", table, self.phase, phase);
        self.phase = phase;
    }
}

struct Applied {
    rows: usize,
    before: u64,
    after: u64,
    created: bool,
    columns_added: Vec<String>,
}

impl<'s, S: Sink + ?Sized> BulkLoader<'s, S> {
    pub fn new(sink: &'s mut S) -> Self {
        Self {
            sink,
            retry: RetryPolicy::default(),
            inferrer: SchemaInferrer::new(),
            cancel: None,
        }
    }

    /// Backoff for transient sink errors
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_inferrer(mut self, inferrer: SchemaInferrer) -> Self {
        self.inferrer = inferrer;
        self
    }

    /// Abort before commit once the flag is set
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Append every row to `target`, optionally replacing the table first.
    ///
    /// Without `drop_existing`, an existing table must accept the inferred
    /// column types; input columns it lacks are added.
    pub fn load_fresh(&mut self, rows: &RawTable, target: &TableRef, drop_existing: bool) -> Result<LoadReport> {
        self.run(rows, target, &LoadMode::Append { drop_existing })
    }

    /// Insert new keys and overwrite the non-key columns of existing ones
    pub fn upsert(&mut self, rows: &RawTable, spec: &UpsertSpec) -> Result<LoadReport> {
        if spec.primary_keys.is_empty() {
            return Err(Error::validation("upsert needs at least one primary key column"));
        }
        self.run(
            rows,
            &spec.table,
            &LoadMode::Upsert {
                primary_keys: spec.primary_keys.clone(),
            },
        )
    }

    fn run(&mut self, input: &RawTable, target: &TableRef, mode: &LoadMode) -> Result<LoadReport> {
        let mut report = LoadReport::new(target, input.len());

        if input.is_empty() {
            info!("No rows for {}, nothing to load", target);
            return Ok(report);
        }

        let fail = |phase: LoadPhase, rows_applied: usize, source: Error| {
            debug!("Load {}: {} -> {}", target, phase, LoadPhase::Failed);
            Error::Load {
                table: target.to_string(),
                phase,
                rows_applied,
                source: Box::new(source),
            }
        };

        let schema = self
            .inferrer
            .infer(input)
            .map_err(|e| fail(LoadPhase::Pending, 0, e))?;
        debug!(
            "Inferred schema for {}: {}",
            target,
            schema
                .columns()
                .iter()
                .map(|c| format!("{} {}", c.name, c.column_type))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let rows = schema
            .coerce(input)
            .and_then(|rows| prepare_rows(&schema, rows, mode.primary_keys()))
            .map_err(|e| fail(LoadPhase::SchemaInferred, 0, e))?;
        report.phase = LoadPhase::SchemaInferred;

        let mut retry_state = RetryState::new();
        loop {
            report.attempts += 1;
            let mut progress = Progress {
                phase: LoadPhase::SchemaInferred,
                rows_applied: 0,
            };

            let outcome = apply(&mut *self.sink, self.cancel.as_deref(), target, &schema, &rows, mode, &mut progress);
            match outcome {
                Ok(applied) => {
                    report.phase = LoadPhase::Committed;
                    report.rows_applied = applied.rows;
                    report.inserted = applied.after.saturating_sub(applied.before);
                    report.updated = (applied.rows as u64).saturating_sub(report.inserted);
                    report.table_created = applied.created;
                    report.columns_added = applied.columns_added;
                    report.schema = schema;
                    info!(
                        "Loaded {} rows into {} ({} inserted, {} updated)",
                        report.rows_applied, target, report.inserted, report.updated
                    );
                    return Ok(report);
                }
                Err(err) => {
                    // A rolled-back attempt applied nothing
                    let transactional = self.sink.supports_transactions();
                    let applied = if transactional {
                        0
                    } else {
                        warn!(
                            "Sink {} is not transactional; {} may be partially modified",
                            self.sink.describe(),
                            target
                        );
                        progress.rows_applied
                    };

                    // Repeating a half-written non-transactional batch would duplicate rows
                    let safe_to_repeat = transactional || progress.phase == LoadPhase::SchemaInferred;
                    if !err.is_retryable() || !safe_to_repeat {
                        return Err(fail(progress.phase, applied, err));
                    }

                    match retry_state.next(&self.retry, RetryKind::Transient, None) {
                        RetryDecision::Retry { attempt, delay } => {
                            warn!(
                                "Load into {} failed during {}: {}, attempt {}/{} in {:?}",
                                target, progress.phase, err, attempt + 1, self.retry.max_retries, delay
                            );
                            std::thread::sleep(delay);
                        }
                        RetryDecision::GiveUp { attempts } => {
                            let source = Error::MaxRetriesExceeded {
                                attempts,
                                last_cause: err.to_string(),
                            };
                            return Err(fail(progress.phase, applied, source));
                        }
                    }
                }
            }
        }
    }
}

/// One attempt: everything between `begin` and `commit`
fn apply<S: Sink + ?Sized>(
    sink: &mut S,
    cancel: Option<&AtomicBool>,
    target: &TableRef,
    schema: &ColumnSchema,
    rows: &[Vec<CellValue>],
    mode: &LoadMode,
    progress: &mut Progress,
) -> Result<Applied> {
    let cancelled = || cancel.is_some_and(|c| c.load(Ordering::SeqCst));
    if cancelled() {
        return Err(Error::Cancelled);
    }

    let tx = sink.begin()?;
    let existing = tx.table_columns(target)?;
    let primary_keys = mode.primary_keys();

    let mut created = false;
    let mut columns_added = Vec::new();
    match (mode, existing) {
        (LoadMode::Append { drop_existing: true }, existing) => {
            if existing.is_some() {
                info!("Dropping existing table {}", target);
                tx.drop_table(target)?;
            }
            tx.create_table(target, schema, primary_keys)?;
            created = true;
        }
        (_, None) => {
            info!("Creating table {}", target);
            tx.create_table(target, schema, primary_keys)?;
            created = true;
        }
        (_, Some(columns)) => {
            let missing = missing_columns(target, schema, &columns, rows)?;
            if !missing.is_empty() {
                info!(
                    "Adding {} column(s) to {}: {}",
                    missing.len(),
                    target,
                    missing.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
                );
                tx.add_columns(target, &missing)?;
                columns_added = missing.into_iter().map(|c| c.name).collect();
            }
        }
    }
    progress.advance(target, LoadPhase::TableEnsured);

    let before = if created { 0 } else { tx.row_count(target)? };
    let written = match mode {
        LoadMode::Append { .. } => tx.append(target, schema, rows)?,
        LoadMode::Upsert { primary_keys } => tx.upsert(target, schema, primary_keys, rows)?,
    };
    progress.rows_applied = written;
    progress.advance(target, LoadPhase::RowsApplied);
    let after = tx.row_count(target)?;

    // Dropping the transaction here rolls back
    if cancelled() {
        return Err(Error::Cancelled);
    }
    tx.commit()?;
    progress.advance(target, LoadPhase::Committed);

    Ok(Applied {
        rows: written,
        before,
        after,
        created,
        columns_added,
    })
}

/// Input columns absent from the table; shared columns must have compatible
/// types unless every input cell of the column is null.
fn missing_columns(
    target: &TableRef,
    schema: &ColumnSchema,
    existing: &[ExistingColumn],
    rows: &[Vec<CellValue>],
) -> Result<Vec<Column>> {
    let mut missing = Vec::new();
    for (index, column) in schema.columns().iter().enumerate() {
        let all_null = rows.iter().all(|row| row[index].is_null());
        match existing.iter().find(|e| e.name == column.name) {
            Some(declared) if !all_null && !column.column_type.fits_declared(&declared.data_type) => {
                return Err(Error::schema_conflict(format!(
                    "column '{}' of {} is {}, input values are {}",
                    column.name, target, declared.data_type, column.column_type
                )));
            }
            Some(_) => {}
            None => missing.push(column.clone()),
        }
    }
    Ok(missing)
}

/// Check key columns and collapse duplicate keys, keeping the last row
/// in the position of the first.
fn prepare_rows(schema: &ColumnSchema, rows: Vec<Vec<CellValue>>, primary_keys: &[String]) -> Result<Vec<Vec<CellValue>>> {
    if primary_keys.is_empty() {
        return Ok(rows);
    }

    let positions: Vec<usize> = primary_keys
        .iter()
        .map(|key| {
            schema.position(key).ok_or_else(|| {
                Error::validation(format!("primary key column '{key}' is not in the input"))
            })
        })
        .collect::<Result<_>>()?;

    let total = rows.len();
    let mut seen: HashMap<Vec<String>, usize> = HashMap::with_capacity(total);
    let mut unique: Vec<Vec<CellValue>> = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let mut key = Vec::with_capacity(positions.len());
        for (&pos, name) in positions.iter().zip(primary_keys) {
            if row[pos].is_null() {
                return Err(Error::validation(format!(
                    "row {}: primary key column '{name}' is empty",
                    index + 1
                )));
            }
            key.push(row[pos].key_text());
        }

        match seen.get(&key) {
            Some(&slot) => unique[slot] = row,
            None => {
                seen.insert(key, unique.len());
                unique.push(row);
            }
        }
    }

    if unique.len() < total {
        debug!("Collapsed {} duplicate key row(s)", total - unique.len());
    }
    Ok(unique)
}
