//! Script generator
//!
//! This module renders catalog metadata into idempotent T-SQL script files,
//! one body per schema object, data table or schema.

use crate::config::{Config, IdempotencyMode};
use crate::error::{Error, Result};
use crate::schema::grouping::{group_constraints, ConstraintGroup};
use crate::schema::types::{
    quote_ident, quote_qualified, Catalog, Column, ForeignKeyColumn, IndexColumn, KeyColumn,
    ObjectKind, ObjectRows, ReferentialAction, SchemaObject, TableData,
};

/// Batch separator understood by SQL Server tooling
pub const BATCH_SEPARATOR: &str = "GO";

const INDENT: &str = "    ";

/// Script generator bound to one configuration
pub struct ScriptGenerator<'a> {
    config: &'a Config,
}

impl<'a> ScriptGenerator<'a> {
    /// Create a new script generator
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Render the script for an object, using the mode configured for its kind
    pub fn render_object(&self, object: &SchemaObject, catalog: &Catalog) -> Result<String> {
        let rows = catalog.rows_for(object.object_id);

        if object.kind == ObjectKind::Table {
            check_foreign_key_targets(object, &rows, catalog)?;
        }

        render(object, &rows, self.config.idempotency.mode_for(object.kind))
    }

    /// Render the data script for a table
    pub fn render_data(&self, data: &TableData) -> Result<String> {
        render_data(data, self.config.idempotency.data)
    }

    /// Render the script creating a schema
    pub fn render_schema(&self, name: &str) -> String {
        render_schema(name)
    }
}

/// Render one object from its structural rows
///
/// The result is a pure function of its inputs.
pub fn render(object: &SchemaObject, rows: &ObjectRows<'_>, mode: IdempotencyMode) -> Result<String> {
    let mut output = idempotency_prefix(object, mode)?;

    match object.kind {
        ObjectKind::Table => output.push_str(&table(object, rows)?),
        ObjectKind::Type => output.push_str(&table_type(object, rows)?),
        ObjectKind::View
        | ObjectKind::Procedure
        | ObjectKind::ScalarFunction
        | ObjectKind::TableFunction
        | ObjectKind::InlineFunction
        | ObjectKind::Trigger => {
            let text = object
                .text
                .as_deref()
                .ok_or_else(|| Error::render(object.qualified_name(), "object has no source text"))?;
            output.push_str(text);
        }
    }

    Ok(output)
}

/// Render the rows of a table as insert statements
pub fn render_data(data: &TableData, mode: IdempotencyMode) -> Result<String> {
    let table_name = data.qualified_name();
    let mut sections = Vec::new();

    match mode {
        IdempotencyMode::Truncate => sections.push(format!("TRUNCATE TABLE {}", table_name)),
        IdempotencyMode::Delete => sections.push(format!("DELETE FROM {}", table_name)),
        IdempotencyMode::DeleteAndReseed => sections.push(format!(
            "DELETE FROM {}\nDBCC CHECKIDENT ('{}', RESEED, 0)",
            table_name,
            escape_literal(&table_name)
        )),
        IdempotencyMode::None => {}
        IdempotencyMode::IfExistsDrop | IdempotencyMode::IfNotExists => {
            return Err(Error::render(
                &table_name,
                format!("'{}' does not apply to data scripts", mode.as_str()),
            ));
        }
    }

    sections.push(format!("SET IDENTITY_INSERT {} ON", table_name));

    let columns = data
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut inserts = Vec::with_capacity(data.rows.len());
    for (i, row) in data.rows.iter().enumerate() {
        if row.len() != data.columns.len() {
            return Err(Error::render(
                &table_name,
                format!(
                    "row {} has {} values for {} columns",
                    i,
                    row.len(),
                    data.columns.len()
                ),
            ));
        }

        let values = row
            .iter()
            .map(|value| value.to_sql_literal())
            .collect::<Vec<_>>()
            .join(", ");
        inserts.push(format!("INSERT INTO {} ({}) VALUES ({})", table_name, columns, values));
    }

    if !inserts.is_empty() {
        sections.push(inserts.join("\n"));
    }

    sections.push(format!("SET IDENTITY_INSERT {} OFF", table_name));

    Ok(sections.join("\n\n"))
}

/// Render the script creating a schema; always guarded
pub fn render_schema(name: &str) -> String {
    format!(
        "IF NOT EXISTS (SELECT 1 FROM sys.schemas WHERE name = '{}')\nEXEC('CREATE SCHEMA {}')",
        escape_literal(name),
        escape_literal(&quote_ident(name))
    )
}

/// Existence guard rendered ahead of an object's body
fn idempotency_prefix(object: &SchemaObject, mode: IdempotencyMode) -> Result<String> {
    let object_id = object.qualified_name();

    let exists_check = if object.kind == ObjectKind::Type {
        format!(
            "(\n{i}SELECT 1 FROM sys.table_types AS t\n{i}JOIN sys.schemas s ON t.schema_id = s.schema_id\n{i}WHERE t.name = '{}' AND s.name = '{}'\n)",
            escape_literal(&object.name),
            escape_literal(&object.schema),
            i = INDENT
        )
    } else {
        format!(
            "(SELECT 1 FROM sys.objects WHERE object_id = OBJECT_ID('{}') AND type = '{}')",
            escape_literal(&object_id),
            object.kind.type_code()
        )
    };

    match mode {
        IdempotencyMode::IfExistsDrop => Ok(format!(
            "IF EXISTS {}\nDROP {} {}\n{}\n",
            exists_check,
            object.kind.drop_keyword(),
            object_id,
            BATCH_SEPARATOR
        )),
        IdempotencyMode::IfNotExists => Ok(format!("IF NOT EXISTS {}\n", exists_check)),
        IdempotencyMode::None => Ok(String::new()),
        IdempotencyMode::Truncate | IdempotencyMode::Delete | IdempotencyMode::DeleteAndReseed => {
            Err(Error::render(
                object_id,
                format!("'{}' only applies to data scripts", mode.as_str()),
            ))
        }
    }
}

/// `CREATE TABLE` followed by foreign key and index sections
fn table(object: &SchemaObject, rows: &ObjectRows<'_>) -> Result<String> {
    let object_id = object.qualified_name();

    if rows.columns.is_empty() {
        return Err(Error::render(object_id, "table has no columns"));
    }

    let primary_keys = group_constraints(rows.primary_keys.iter().copied());
    let foreign_keys = group_constraints(rows.foreign_keys.iter().copied());
    let indexes = group_constraints(rows.indexes.iter().copied());

    for group in &primary_keys {
        check_columns(&object_id, &rows.columns, group.columns.iter().map(|c| c.column.as_str()))?;
    }
    for group in &foreign_keys {
        check_columns(&object_id, &rows.columns, group.columns.iter().map(|c| c.column.as_str()))?;
    }
    for group in &indexes {
        check_columns(&object_id, &rows.columns, group.columns.iter().map(|c| c.column.as_str()))?;
    }

    let mut clauses = column_clauses(&object_id, &rows.columns)?;
    clauses.extend(primary_keys.iter().map(primary_key));

    let mut sections = vec![format!(
        "CREATE TABLE {}\n(\n{}\n)",
        object_id,
        indent_clauses(&clauses)
    )];

    if !foreign_keys.is_empty() {
        sections.push(
            foreign_keys
                .iter()
                .map(foreign_key)
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    if !indexes.is_empty() {
        let rendered = indexes
            .iter()
            .map(|group| index(&object_id, group))
            .collect::<Result<Vec<_>>>()?;
        sections.push(rendered.join("\n"));
    }

    Ok(sections.join("\n\n"))
}

/// `CREATE TYPE ... AS TABLE`
fn table_type(object: &SchemaObject, rows: &ObjectRows<'_>) -> Result<String> {
    let object_id = object.qualified_name();

    if rows.columns.is_empty() {
        return Err(Error::render(object_id, "table type has no columns"));
    }

    let clauses = column_clauses(&object_id, &rows.columns)?;

    Ok(format!(
        "CREATE TYPE {} AS TABLE\n(\n{}\n)",
        object_id,
        indent_clauses(&clauses)
    ))
}

fn indent_clauses(clauses: &[String]) -> String {
    clauses
        .iter()
        .map(|clause| format!("{}{}", INDENT, clause))
        .collect::<Vec<_>>()
        .join(",\n")
}

/// Column clauses of one object; a failing column is reported against the object
fn column_clauses(object_id: &str, columns: &[&Column]) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|item| {
            column(item).map_err(|e| match e {
                Error::RenderError { object, reason } => {
                    Error::render(object_id, format!("column {}: {}", object, reason))
                }
                other => other,
            })
        })
        .collect()
}

/// Column definition inside a `CREATE TABLE` or `CREATE TYPE`
pub fn column(item: &Column) -> Result<String> {
    let mut output = quote_ident(&item.name);

    if item.is_computed {
        let formula = item
            .formula
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| Error::render(quote_ident(&item.name), "computed column has no formula"))?;
        output.push_str(&format!(" AS {}", formula));
        return Ok(output);
    }

    output.push(' ');
    output.push_str(&item.datatype);
    output.push_str(&size_qualifier(item));

    if let Some(collation) = item.collation.as_deref().filter(|c| !c.is_empty()) {
        output.push_str(&format!(" COLLATE {}", collation));
    }

    output.push_str(if item.is_nullable { " NULL" } else { " NOT NULL" });

    if let Some(default) = item.default_expr.as_deref().filter(|d| !d.is_empty()) {
        output.push_str(&format!(" DEFAULT {}", default));
    }

    if item.is_identity {
        output.push_str(&format!(
            " IDENTITY({}, {})",
            item.seed.unwrap_or(0),
            item.increment.unwrap_or(1)
        ));
    }

    Ok(output)
}

/// Length, precision or scale suffix for a data type
pub fn size_qualifier(item: &Column) -> String {
    match item.datatype.to_lowercase().as_str() {
        "varchar" | "char" | "varbinary" | "binary" | "text" => {
            if item.max_length == -1 {
                "(max)".to_string()
            } else {
                format!("({})", item.max_length)
            }
        }
        // storage length is in bytes, two per character
        "nvarchar" | "nchar" | "ntext" => {
            if item.max_length == -1 {
                "(max)".to_string()
            } else {
                format!("({})", item.max_length / 2)
            }
        }
        "datetime2" | "time2" | "datetimeoffset" => format!("({})", item.scale),
        "decimal" => format!("({}, {})", item.precision, item.scale),
        _ => String::new(),
    }
}

fn direction(is_descending: bool) -> &'static str {
    if is_descending {
        "DESC"
    } else {
        "ASC"
    }
}

fn primary_key(group: &ConstraintGroup<'_, KeyColumn>) -> String {
    let columns = group
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.column), direction(c.is_descending)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("CONSTRAINT {} PRIMARY KEY ({})", quote_ident(group.name), columns)
}

fn foreign_key(group: &ConstraintGroup<'_, ForeignKeyColumn>) -> String {
    // every row of a group shares the table, parent and actions
    let first = group.columns[0];
    let table_name = first.table_name();
    let constraint = quote_ident(group.name);
    let (columns, references) = group.column_pairs();

    let mut output = format!(
        "ALTER TABLE {} WITH {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        table_name,
        if first.is_not_trusted { "NOCHECK" } else { "CHECK" },
        constraint,
        quote_list(&columns),
        first.referenced_table_name(),
        quote_list(&references)
    );

    if let Some(action) = ReferentialAction::from_code(first.on_delete).as_sql() {
        output.push_str(&format!(" ON DELETE {}", action));
    }

    if let Some(action) = ReferentialAction::from_code(first.on_update).as_sql() {
        output.push_str(&format!(" ON UPDATE {}", action));
    }

    output.push_str(&format!("\nALTER TABLE {} CHECK CONSTRAINT {}", table_name, constraint));
    output
}

fn index(table_name: &str, group: &ConstraintGroup<'_, IndexColumn>) -> Result<String> {
    let keys = group.key_columns();

    if keys.is_empty() {
        return Err(Error::render(
            table_name,
            format!("index {} has no key columns", group.name),
        ));
    }

    let key_list = keys
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.column), direction(c.is_descending)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut output = format!(
        "IF NOT EXISTS (SELECT 1 FROM sys.indexes WHERE object_id = OBJECT_ID('{}') AND name = '{}')\nCREATE{} NONCLUSTERED INDEX {} ON {} ({})",
        escape_literal(table_name),
        escape_literal(group.name),
        if group.is_unique() { " UNIQUE" } else { "" },
        quote_ident(group.name),
        table_name,
        key_list
    );

    let included: Vec<&str> = group
        .included_columns()
        .iter()
        .map(|c| c.column.as_str())
        .collect();

    if !included.is_empty() {
        output.push_str(&format!(" INCLUDE ({})", quote_list(&included)));
    }

    Ok(output)
}

fn quote_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn check_columns<'c>(
    object_id: &str,
    columns: &[&Column],
    names: impl IntoIterator<Item = &'c str>,
) -> Result<()> {
    for name in names {
        if !columns.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(Error::render(
                object_id,
                format!("constraint column [{}] is not a column of the table", name),
            ));
        }
    }

    Ok(())
}

/// Referenced columns must exist on the parent table when the parent is known
fn check_foreign_key_targets(
    object: &SchemaObject,
    rows: &ObjectRows<'_>,
    catalog: &Catalog,
) -> Result<()> {
    for fk in &rows.foreign_keys {
        let Some(parent) = catalog.find_table(&fk.referenced_schema, &fk.referenced_table) else {
            continue;
        };

        let parent_rows = catalog.rows_for(parent.object_id);
        if !parent_rows
            .columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&fk.referenced_column))
        {
            return Err(Error::render(
                object.qualified_name(),
                format!(
                    "foreign key {} references missing column [{}] on {}",
                    quote_ident(&fk.constraint_name),
                    fk.referenced_column,
                    quote_qualified(&fk.referenced_schema, &fk.referenced_table)
                ),
            ));
        }
    }

    Ok(())
}
