#![cfg(feature = "sqlite")]

use sql_dbi::prelude::*;

fn seeded() -> Result<Database, DbiError> {
    let db = Database::open_sqlite(":memory:")?;
    db.upsert(
        "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, active BOOLEAN, seen TEXT)",
        &[vec![]],
    )?;
    db.upsert(
        "INSERT INTO people (id, name, score, active, seen) VALUES (?, ?, ?, ?, ?)",
        &[
            vec![1.into(), "alice".into(), 1.5.into(), true.into(), RowValues::Null],
            vec![2.into(), "bob".into(), RowValues::Null, false.into(), "2024-03-05".into()],
        ],
    )?;
    Ok(db)
}

#[test]
fn query_returns_rows_keyed_by_column() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let rows = db.query(
        "SELECT id, name, score, active FROM people ORDER BY id",
        &[],
    )?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], RowValues::Int(1));
    assert_eq!(rows[0]["name"], RowValues::Text("alice".into()));
    assert_eq!(rows[0]["score"], RowValues::Float(1.5));
    // SQLite stores booleans as integers
    assert_eq!(rows[0]["active"], RowValues::Int(1));
    assert!(rows[1]["score"].is_null());
    Ok(())
}

#[test]
fn query_string_renders_every_value() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let rows = db.query_string(
        "SELECT id, name, score FROM people WHERE id = ?",
        &[1.into()],
    )?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "1");
    assert_eq!(rows[0]["name"], "alice");
    assert_eq!(rows[0]["score"], "1.500000");

    let rows = db.query_string("SELECT score FROM people WHERE id = ?", &[2.into()])?;
    assert_eq!(rows[0]["score"], "");
    Ok(())
}

#[test]
fn empty_result_still_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let rows = db.query("SELECT id FROM people WHERE id = ?", &[42.into()])?;
    assert!(rows.is_empty());
    Ok(())
}

#[test]
fn multi_query_returns_one_result_set_per_statement() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    let sets = db.multi_query(
        &[
            "INSERT INTO people (id, name) VALUES (?, ?)",
            "SELECT name FROM people WHERE id = ?",
            "SELECT COUNT(*) AS n FROM people",
        ],
        &[vec![3.into(), "carol".into()], vec![3.into()]],
    )?;

    assert_eq!(sets.len(), 3);
    assert!(sets[0].is_empty());
    assert_eq!(sets[1][0]["name"], RowValues::Text("carol".into()));
    assert_eq!(sets[2][0]["n"], RowValues::Int(3));
    Ok(())
}

#[test]
fn multi_query_rolls_back_when_a_later_statement_fails() -> Result<(), Box<dyn std::error::Error>>
{
    let db = seeded()?;
    let result = db.multi_query(
        &[
            "INSERT INTO people (id, name) VALUES (?, ?)",
            "SELECT nope FROM missing_table WHERE id = ?",
        ],
        &[vec![10.into(), "dave".into()], vec![10.into()]],
    );
    assert!(result.is_err());

    let rows = db.query("SELECT id FROM people WHERE id = ?", &[10.into()])?;
    assert!(rows.is_empty(), "insert should have been rolled back");
    Ok(())
}

#[test]
fn prepare_test_checks_without_running() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    db.prepare_test("DELETE FROM people WHERE id = ?")?;
    assert!(db.prepare_test("SELEKT everything").is_err());

    let rows = db.query("SELECT COUNT(*) AS n FROM people", &[])?;
    assert_eq!(rows[0]["n"], RowValues::Int(2));
    Ok(())
}

#[test]
fn ping_and_type() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open_sqlite(":memory:")?;
    db.ping()?;
    assert_eq!(db.database_type(), DatabaseType::Sqlite);
    db.close();
    Ok(())
}

#[test]
fn open_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dbi.sqlite");
    let config: DbConfig = serde_json::from_value(serde_json::json!({
        "driver": "sqlite",
        "name": path.to_string_lossy(),
    }))?;

    let db = Database::open(&config)?;
    db.upsert("CREATE TABLE t (v TEXT)", &[vec![]])?;
    db.upsert("INSERT INTO t (v) VALUES (?)", &[vec!["kept".into()]])?;
    db.close();

    let db = Database::open(&config)?;
    let rows = db.query_string("SELECT v FROM t", &[])?;
    assert_eq!(rows[0]["v"], "kept");
    Ok(())
}

#[test]
fn open_rejects_incomplete_config() {
    let config = DbConfig {
        driver: Some(DatabaseType::Sqlite),
        ..DbConfig::default()
    };
    let err = Database::open(&config).err().map(|e| e.is_config_error());
    assert_eq!(err, Some(true));
}

#[test]
fn concurrent_callers_share_the_connection() -> Result<(), Box<dyn std::error::Error>> {
    let db = seeded()?;
    std::thread::scope(|scope| {
        for worker in 0..4_i64 {
            let db = &db;
            scope.spawn(move || {
                let rows: Vec<Vec<RowValues>> = (0..10)
                    .map(|i| vec![(100 + worker * 10 + i).into(), format!("w{worker}-{i}").into()])
                    .collect();
                db.upsert("INSERT INTO people (id, name) VALUES (?, ?)", &rows)
                    .unwrap();
            });
        }
    });

    let rows = db.query("SELECT COUNT(*) AS n FROM people", &[])?;
    assert_eq!(rows[0]["n"], RowValues::Int(42));
    Ok(())
}
