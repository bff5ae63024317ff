//! Script rendering tests

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::*;

use sql_source_control::config::IdempotencyMode;
use sql_source_control::schema::generator::{render, render_data};
use sql_source_control::schema::types::{
    Catalog, Column, DataValue, ForeignKeyColumn, IndexColumn, KeyColumn, ObjectKind, ObjectRows,
    SchemaObject, TableData,
};
use sql_source_control::{Config, Error, ScriptGenerator};

fn foreign_key(column: &str, referenced: &str, on_delete: i32, on_update: i32) -> ForeignKeyColumn {
    ForeignKeyColumn {
        object_id: 2,
        constraint_name: "FK_Orders_Users".to_string(),
        column: column.to_string(),
        referenced_column: referenced.to_string(),
        schema: "dbo".to_string(),
        table: "Orders".to_string(),
        referenced_schema: "dbo".to_string(),
        referenced_table: "Users".to_string(),
        on_delete,
        on_update,
        is_not_trusted: false,
    }
}

#[fixture]
fn catalog() -> Catalog {
    let mut email_index = IndexColumn::new(1, "IX_Users_Email", "Email");
    email_index.is_unique = true;
    let mut name_include = IndexColumn::new(1, "IX_Users_Email", "Name");
    name_include.is_unique = true;
    name_include.is_included_column = true;

    Catalog {
        schemas: vec!["dbo".to_string()],
        objects: vec![
            SchemaObject::new(1, ObjectKind::Table, "dbo", "Users"),
            SchemaObject::new(2, ObjectKind::Table, "dbo", "Orders"),
            SchemaObject::new(3, ObjectKind::View, "dbo", "ActiveUsers")
                .with_text("CREATE VIEW [dbo].[ActiveUsers] AS SELECT [Id] FROM [dbo].[Users]"),
            SchemaObject::new(4, ObjectKind::Type, "dbo", "IdList"),
        ],
        columns: vec![
            Column::new(1, "Id", "int").identity(1, 1),
            Column::new(1, "Email", "nvarchar").max_length(200),
            Column::new(1, "Name", "nvarchar").max_length(-1).nullable(true),
            Column::new(2, "Id", "int"),
            Column::new(2, "UserId", "int").nullable(true),
            Column::new(2, "Total", "decimal").precision_scale(18, 4),
            Column::new(4, "Id", "int"),
        ],
        primary_keys: vec![
            KeyColumn::new(1, "PK_Users", "Id"),
            KeyColumn::new(2, "PK_Orders", "Id").descending(),
        ],
        foreign_keys: vec![foreign_key("UserId", "Id", 2, 0)],
        indexes: vec![email_index, name_include],
        data: vec![],
    }
}

fn object<'a>(catalog: &'a Catalog, name: &str) -> &'a SchemaObject {
    catalog
        .objects
        .iter()
        .find(|o| o.name == name)
        .unwrap()
}

#[rstest]
fn test_table_with_primary_key_and_index(catalog: Catalog) {
    let config = Config::default();
    let script = ScriptGenerator::new(&config)
        .render_object(object(&catalog, "Users"), &catalog)
        .unwrap();

    assert_eq!(
        script,
        "IF NOT EXISTS (SELECT 1 FROM sys.objects WHERE object_id = OBJECT_ID('[dbo].[Users]') AND type = 'U')\n\
         CREATE TABLE [dbo].[Users]\n\
         (\n    \
         [Id] int NOT NULL IDENTITY(1, 1),\n    \
         [Email] nvarchar(100) NOT NULL,\n    \
         [Name] nvarchar(max) NULL,\n    \
         CONSTRAINT [PK_Users] PRIMARY KEY ([Id] ASC)\n\
         )\n\
         \n\
         IF NOT EXISTS (SELECT 1 FROM sys.indexes WHERE object_id = OBJECT_ID('[dbo].[Users]') AND name = 'IX_Users_Email')\n\
         CREATE UNIQUE NONCLUSTERED INDEX [IX_Users_Email] ON [dbo].[Users] ([Email] ASC) INCLUDE ([Name])"
    );
}

#[rstest]
fn test_table_with_foreign_key(catalog: Catalog) {
    let config = Config::default();
    let script = ScriptGenerator::new(&config)
        .render_object(object(&catalog, "Orders"), &catalog)
        .unwrap();

    assert_eq!(
        script,
        "IF NOT EXISTS (SELECT 1 FROM sys.objects WHERE object_id = OBJECT_ID('[dbo].[Orders]') AND type = 'U')\n\
         CREATE TABLE [dbo].[Orders]\n\
         (\n    \
         [Id] int NOT NULL,\n    \
         [UserId] int NULL,\n    \
         [Total] decimal(18, 4) NOT NULL,\n    \
         CONSTRAINT [PK_Orders] PRIMARY KEY ([Id] DESC)\n\
         )\n\
         \n\
         ALTER TABLE [dbo].[Orders] WITH CHECK ADD CONSTRAINT [FK_Orders_Users] FOREIGN KEY ([UserId]) REFERENCES [dbo].[Users] ([Id]) ON DELETE SET NULL\n\
         ALTER TABLE [dbo].[Orders] CHECK CONSTRAINT [FK_Orders_Users]"
    );
}

#[rstest]
#[case(0, 0, "")]
#[case(1, 0, " ON DELETE CASCADE")]
#[case(2, 3, " ON DELETE SET NULL ON UPDATE SET DEFAULT")]
#[case(0, 1, " ON UPDATE CASCADE")]
fn test_referential_actions(
    mut catalog: Catalog,
    #[case] on_delete: i32,
    #[case] on_update: i32,
    #[case] expected: &str,
) {
    catalog.foreign_keys = vec![foreign_key("UserId", "Id", on_delete, on_update)];
    let config = Config::default();
    let script = ScriptGenerator::new(&config)
        .render_object(object(&catalog, "Orders"), &catalog)
        .unwrap();

    let line = format!(
        "REFERENCES [dbo].[Users] ([Id]){}\nALTER TABLE [dbo].[Orders] CHECK CONSTRAINT",
        expected
    );
    assert!(script.contains(&line), "missing `{}` in:\n{}", line, script);
}

#[rstest]
fn test_composite_foreign_key_keeps_pairs_aligned(mut catalog: Catalog) {
    catalog.columns.push(Column::new(2, "UserEmail", "nvarchar").max_length(200));
    catalog.foreign_keys = vec![
        foreign_key("UserId", "Id", 0, 0),
        foreign_key("UserEmail", "Email", 0, 0),
    ];

    let config = Config::default();
    let script = ScriptGenerator::new(&config)
        .render_object(object(&catalog, "Orders"), &catalog)
        .unwrap();

    assert!(script.contains(
        "FOREIGN KEY ([UserId], [UserEmail]) REFERENCES [dbo].[Users] ([Id], [Email])"
    ));
    assert_eq!(script.matches("ADD CONSTRAINT [FK_Orders_Users]").count(), 1);
}

#[test]
fn test_composite_key_and_index_keep_column_order() {
    let table = SchemaObject::new(9, ObjectKind::Table, "dbo", "X");
    let c1 = Column::new(9, "C1", "int");
    let c2 = Column::new(9, "C2", "int");
    let c3 = Column::new(9, "C3", "int");
    let a = Column::new(9, "A", "int");
    let b = Column::new(9, "B", "int");

    let pk1 = KeyColumn::new(9, "PK_X", "C1");
    let pk2 = KeyColumn::new(9, "PK_X", "C2").descending();
    let pk3 = KeyColumn::new(9, "PK_X", "C3");
    let ix_a = IndexColumn::new(9, "IX_X_AB", "A");
    let mut ix_b = IndexColumn::new(9, "IX_X_AB", "B");
    ix_b.is_descending = true;

    let rows = ObjectRows {
        columns: vec![&c1, &c2, &c3, &a, &b],
        primary_keys: vec![&pk1, &pk2, &pk3],
        indexes: vec![&ix_a, &ix_b],
        ..ObjectRows::default()
    };

    let script = render(&table, &rows, IdempotencyMode::None).unwrap();
    assert!(
        script.contains("CONSTRAINT [PK_X] PRIMARY KEY ([C1] ASC, [C2] DESC, [C3] ASC)\n)"),
        "{}",
        script
    );
    assert!(
        script.ends_with("CREATE NONCLUSTERED INDEX [IX_X_AB] ON [dbo].[X] ([A] ASC, [B] DESC)"),
        "{}",
        script
    );
}

#[rstest]
fn test_rendering_is_repeatable(catalog: Catalog) {
    let config = Config::default();
    let generator = ScriptGenerator::new(&config);

    for item in &catalog.objects {
        let first = generator.render_object(item, &catalog).unwrap();
        let second = generator.render_object(item, &catalog).unwrap();
        assert_eq!(first, second);
    }
}

#[rstest]
fn test_view_if_exists_drop(catalog: Catalog) {
    let config = Config::default();
    let script = ScriptGenerator::new(&config)
        .render_object(object(&catalog, "ActiveUsers"), &catalog)
        .unwrap();

    assert_eq!(
        script,
        "IF EXISTS (SELECT 1 FROM sys.objects WHERE object_id = OBJECT_ID('[dbo].[ActiveUsers]') AND type = 'V')\n\
         DROP VIEW [dbo].[ActiveUsers]\n\
         GO\n\
         CREATE VIEW [dbo].[ActiveUsers] AS SELECT [Id] FROM [dbo].[Users]"
    );
}

#[rstest]
fn test_view_without_guard(catalog: Catalog) {
    let view = object(&catalog, "ActiveUsers");
    let script = render(view, &catalog.rows_for(view.object_id), IdempotencyMode::None).unwrap();

    assert_eq!(script, "CREATE VIEW [dbo].[ActiveUsers] AS SELECT [Id] FROM [dbo].[Users]");
}

#[rstest]
fn test_table_type(catalog: Catalog) {
    let config = Config::default();
    let script = ScriptGenerator::new(&config)
        .render_object(object(&catalog, "IdList"), &catalog)
        .unwrap();

    assert_eq!(
        script,
        "IF NOT EXISTS (\n    \
         SELECT 1 FROM sys.table_types AS t\n    \
         JOIN sys.schemas s ON t.schema_id = s.schema_id\n    \
         WHERE t.name = 'IdList' AND s.name = 'dbo'\n\
         )\n\
         CREATE TYPE [dbo].[IdList] AS TABLE\n\
         (\n    \
         [Id] int NOT NULL\n\
         )"
    );
}

#[test]
fn test_procedure_without_text_is_render_error() {
    let proc = SchemaObject::new(9, ObjectKind::Procedure, "dbo", "Sync");
    let err = render(&proc, &ObjectRows::default(), IdempotencyMode::IfExistsDrop).unwrap_err();

    match err {
        Error::RenderError { object, .. } => assert_eq!(object, "[dbo].[Sync]"),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn test_missing_key_column_is_render_error(mut catalog: Catalog) {
    catalog.primary_keys.push(KeyColumn::new(1, "PK_Users", "Missing"));
    let config = Config::default();

    let err = ScriptGenerator::new(&config)
        .render_object(object(&catalog, "Users"), &catalog)
        .unwrap_err();
    assert!(matches!(err, Error::RenderError { .. }));
}

#[rstest]
fn test_missing_referenced_column_is_render_error(mut catalog: Catalog) {
    catalog.foreign_keys = vec![foreign_key("UserId", "Missing", 0, 0)];
    let config = Config::default();

    let err = ScriptGenerator::new(&config)
        .render_object(object(&catalog, "Orders"), &catalog)
        .unwrap_err();
    assert!(err.to_string().contains("[Missing]"));
}

fn users_data() -> TableData {
    TableData {
        schema: "dbo".to_string(),
        name: "Users".to_string(),
        columns: vec!["Id".to_string(), "Email".to_string(), "CreatedAt".to_string()],
        rows: vec![
            vec![
                DataValue::Int(1),
                DataValue::Text("a@example.com".to_string()),
                DataValue::DateTime {
                    datetime: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                },
            ],
            vec![
                DataValue::Int(2),
                DataValue::Text("O'Neil".to_string()),
                DataValue::Null,
            ],
        ],
    }
}

#[test]
fn test_data_script_with_truncate() {
    let script = render_data(&users_data(), IdempotencyMode::Truncate).unwrap();

    assert_eq!(
        script,
        "TRUNCATE TABLE [dbo].[Users]\n\
         \n\
         SET IDENTITY_INSERT [dbo].[Users] ON\n\
         \n\
         INSERT INTO [dbo].[Users] ([Id], [Email], [CreatedAt]) VALUES (1, 'a@example.com', '2024-01-02T03:04:05.000Z')\n\
         INSERT INTO [dbo].[Users] ([Id], [Email], [CreatedAt]) VALUES (2, 'O''Neil', NULL)\n\
         \n\
         SET IDENTITY_INSERT [dbo].[Users] OFF"
    );
}

#[rstest]
#[case(IdempotencyMode::Delete, "DELETE FROM [dbo].[Users]\n\nSET IDENTITY_INSERT")]
#[case(
    IdempotencyMode::DeleteAndReseed,
    "DELETE FROM [dbo].[Users]\nDBCC CHECKIDENT ('[dbo].[Users]', RESEED, 0)\n\nSET IDENTITY_INSERT"
)]
#[case(IdempotencyMode::None, "SET IDENTITY_INSERT")]
fn test_data_pre_statements(#[case] mode: IdempotencyMode, #[case] prefix: &str) {
    let script = render_data(&users_data(), mode).unwrap();
    assert!(script.starts_with(prefix), "unexpected script:\n{}", script);
}

#[test]
fn test_data_row_width_mismatch_is_render_error() {
    let mut data = users_data();
    data.rows.push(vec![DataValue::Int(3)]);

    let err = render_data(&data, IdempotencyMode::Truncate).unwrap_err();
    assert!(matches!(err, Error::RenderError { .. }));
}

#[test]
fn test_object_mode_rejected_for_data() {
    let err = render_data(&users_data(), IdempotencyMode::IfNotExists).unwrap_err();
    assert!(matches!(err, Error::RenderError { .. }));
}
