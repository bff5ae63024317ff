//! Type definitions for catalog metadata rows

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a scripted schema object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    #[serde(alias = "U")]
    Table,
    #[serde(alias = "V")]
    View,
    #[serde(alias = "P")]
    Procedure,
    #[serde(alias = "FN")]
    ScalarFunction,
    #[serde(alias = "TF")]
    TableFunction,
    #[serde(alias = "IF")]
    InlineFunction,
    #[serde(alias = "TR")]
    Trigger,
    #[serde(alias = "TT")]
    Type,
}

impl ObjectKind {
    /// Catalog type code used in existence checks
    pub fn type_code(&self) -> &'static str {
        match self {
            ObjectKind::Table => "U",
            ObjectKind::View => "V",
            ObjectKind::Procedure => "P",
            ObjectKind::ScalarFunction => "FN",
            ObjectKind::TableFunction => "TF",
            ObjectKind::InlineFunction => "IF",
            ObjectKind::Trigger => "TR",
            ObjectKind::Type => "TT",
        }
    }

    /// Keyword used in a `DROP` statement
    pub fn drop_keyword(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::ScalarFunction
            | ObjectKind::TableFunction
            | ObjectKind::InlineFunction => "FUNCTION",
            ObjectKind::Trigger => "TRIGGER",
            ObjectKind::Type => "TYPE",
        }
    }
}

/// A schema object as returned by the object catalog queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaObject {
    pub object_id: i64,
    pub kind: ObjectKind,
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl SchemaObject {
    /// Create a new object without source text
    pub fn new(object_id: i64, kind: ObjectKind, schema: &str, name: &str) -> Self {
        Self {
            object_id,
            kind,
            schema: schema.to_string(),
            name: name.to_string(),
            text: None,
        }
    }

    /// Attach the stored source text
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Bracket-quoted `[schema].[name]`
    pub fn qualified_name(&self) -> String {
        quote_qualified(&self.schema, &self.name)
    }

    /// Unsanitized script file name
    pub fn file_name(&self) -> String {
        format!("{}.{}.sql", self.schema, self.name)
    }
}

/// A table or table type column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub object_id: i64,
    pub name: String,
    pub datatype: String,
    #[serde(default)]
    pub max_length: i32,
    #[serde(default)]
    pub precision: i32,
    #[serde(default)]
    pub scale: i32,
    #[serde(default)]
    pub is_computed: bool,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub default_expr: Option<String>,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub increment: Option<i64>,
}

impl Column {
    /// Create a new non-nullable column with the given name and type
    pub fn new(object_id: i64, name: &str, datatype: &str) -> Self {
        Self {
            object_id,
            name: name.to_string(),
            datatype: datatype.to_string(),
            max_length: 0,
            precision: 0,
            scale: 0,
            is_computed: false,
            formula: None,
            collation: None,
            is_nullable: false,
            default_expr: None,
            is_identity: false,
            seed: None,
            increment: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    pub fn max_length(mut self, max_length: i32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn precision_scale(mut self, precision: i32, scale: i32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn default(mut self, expr: &str) -> Self {
        self.default_expr = Some(expr.to_string());
        self
    }

    pub fn identity(mut self, seed: i64, increment: i64) -> Self {
        self.is_identity = true;
        self.seed = Some(seed);
        self.increment = Some(increment);
        self
    }

    pub fn computed(mut self, formula: &str) -> Self {
        self.is_computed = true;
        self.formula = Some(formula.to_string());
        self
    }
}

/// Rows that belong to a named constraint
pub trait ConstraintRow {
    fn constraint_name(&self) -> &str;
}

/// One column of a primary key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyColumn {
    pub object_id: i64,
    pub constraint_name: String,
    pub column: String,
    #[serde(default)]
    pub is_descending: bool,
}

impl KeyColumn {
    pub fn new(object_id: i64, constraint_name: &str, column: &str) -> Self {
        Self {
            object_id,
            constraint_name: constraint_name.to_string(),
            column: column.to_string(),
            is_descending: false,
        }
    }

    pub fn descending(mut self) -> Self {
        self.is_descending = true;
        self
    }
}

impl ConstraintRow for KeyColumn {
    fn constraint_name(&self) -> &str {
        &self.constraint_name
    }
}

/// One column pair of a foreign key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyColumn {
    pub object_id: i64,
    pub constraint_name: String,
    pub column: String,
    pub referenced_column: String,
    pub schema: String,
    pub table: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    #[serde(default)]
    pub on_delete: i32,
    #[serde(default)]
    pub on_update: i32,
    #[serde(default)]
    pub is_not_trusted: bool,
}

impl ForeignKeyColumn {
    pub fn table_name(&self) -> String {
        quote_qualified(&self.schema, &self.table)
    }

    pub fn referenced_table_name(&self) -> String {
        quote_qualified(&self.referenced_schema, &self.referenced_table)
    }
}

impl ConstraintRow for ForeignKeyColumn {
    fn constraint_name(&self) -> &str {
        &self.constraint_name
    }
}

/// One column of a nonclustered index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub object_id: i64,
    pub constraint_name: String,
    pub column: String,
    #[serde(default)]
    pub is_descending: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_included_column: bool,
}

impl IndexColumn {
    pub fn new(object_id: i64, constraint_name: &str, column: &str) -> Self {
        Self {
            object_id,
            constraint_name: constraint_name.to_string(),
            column: column.to_string(),
            is_descending: false,
            is_unique: false,
            is_included_column: false,
        }
    }
}

impl ConstraintRow for IndexColumn {
    fn constraint_name(&self) -> &str {
        &self.constraint_name
    }
}

/// Referential action code on a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Unknown codes are treated as no action
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => ReferentialAction::Cascade,
            2 => ReferentialAction::SetNull,
            3 => ReferentialAction::SetDefault,
            _ => ReferentialAction::NoAction,
        }
    }

    /// SQL keywords, `None` when the clause is omitted
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            ReferentialAction::NoAction => None,
            ReferentialAction::Cascade => Some("CASCADE"),
            ReferentialAction::SetNull => Some("SET NULL"),
            ReferentialAction::SetDefault => Some("SET DEFAULT"),
        }
    }
}

/// A single value of a scripted data row
///
/// Plain strings always stay text. Date/time values are written as
/// `{"datetime": "<rfc3339>"}` so a string that looks like a date is never
/// reinterpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime { datetime: DateTime<Utc> },
}

impl DataValue {
    /// Render the value as a SQL literal
    pub fn to_sql_literal(&self) -> String {
        match self {
            DataValue::Null => "NULL".to_string(),
            DataValue::Bool(value) => (if *value { "1" } else { "0" }).to_string(),
            DataValue::Int(value) => value.to_string(),
            DataValue::Float(value) => value.to_string(),
            DataValue::DateTime { datetime } => {
                format!("'{}'", datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            DataValue::Text(value) => format!("'{}'", value.replace('\'', "''")),
        }
    }
}

/// Rows of one table selected for data scripting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub schema: String,
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<DataValue>>,
}

impl TableData {
    pub fn qualified_name(&self) -> String {
        quote_qualified(&self.schema, &self.name)
    }

    /// `schema.name`, as listed in the `data` configuration
    pub fn dotted_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn file_name(&self) -> String {
        format!("{}.sql", self.dotted_name())
    }
}

/// Structural rows belonging to one object
#[derive(Debug, Clone, Default)]
pub struct ObjectRows<'a> {
    pub columns: Vec<&'a Column>,
    pub primary_keys: Vec<&'a KeyColumn>,
    pub foreign_keys: Vec<&'a ForeignKeyColumn>,
    pub indexes: Vec<&'a IndexColumn>,
}

/// Everything read from the database catalog for one pull
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub schemas: Vec<String>,
    pub objects: Vec<SchemaObject>,
    pub columns: Vec<Column>,
    pub primary_keys: Vec<KeyColumn>,
    pub foreign_keys: Vec<ForeignKeyColumn>,
    pub indexes: Vec<IndexColumn>,
    pub data: Vec<TableData>,
}

impl Catalog {
    /// Collect the structural rows of one object, keeping row order
    pub fn rows_for(&self, object_id: i64) -> ObjectRows<'_> {
        ObjectRows {
            columns: self
                .columns
                .iter()
                .filter(|c| c.object_id == object_id)
                .collect(),
            primary_keys: self
                .primary_keys
                .iter()
                .filter(|k| k.object_id == object_id)
                .collect(),
            foreign_keys: self
                .foreign_keys
                .iter()
                .filter(|k| k.object_id == object_id)
                .collect(),
            indexes: self
                .indexes
                .iter()
                .filter(|k| k.object_id == object_id)
                .collect(),
        }
    }

    /// Find a table by schema and name, ignoring case
    pub fn find_table(&self, schema: &str, name: &str) -> Option<&SchemaObject> {
        self.objects.iter().find(|o| {
            o.kind == ObjectKind::Table
                && o.schema.eq_ignore_ascii_case(schema)
                && o.name.eq_ignore_ascii_case(name)
        })
    }
}

/// `[name]`, with closing brackets doubled
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// `[schema].[name]`
pub fn quote_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}
