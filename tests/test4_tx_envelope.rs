//! Transaction envelope checked against a scripted backend that records every call.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};

use sql_dbi::backend::{Connector, RowSink, Transaction, TxOptions};
use sql_dbi::transaction::run_in_transaction;
use sql_dbi::{DbiError, PlaceholderStyle, RowValues, batch, dbi_record, executor, unmarshal};

#[derive(Default)]
struct Script {
    log: RefCell<Vec<String>>,
    fail_sql: Option<&'static str>,
    fail_commit: bool,
    fail_second_row: bool,
}

impl Script {
    fn failing_on(sql: &'static str) -> Self {
        Self {
            fail_sql: Some(sql),
            ..Self::default()
        }
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.borrow_mut().push(entry.into());
    }

    fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

struct ScriptTx<'c> {
    script: &'c Script,
}

impl ScriptTx<'_> {
    fn check(&self, sql: &str) -> Result<(), DbiError> {
        match self.script.fail_sql {
            Some(bad) if sql.contains(bad) => {
                Err(DbiError::ExecutionError(format!("scripted failure: {sql}")))
            }
            _ => Ok(()),
        }
    }
}

impl Transaction for ScriptTx<'_> {
    type Statement = String;

    fn prepare(&mut self, sql: &str) -> Result<String, DbiError> {
        self.script.record(format!("prepare {sql}"));
        Ok(sql.to_string())
    }

    fn execute(&mut self, stmt: &String, params: &[RowValues]) -> Result<u64, DbiError> {
        self.script
            .record(format!("execute {stmt} ({} params)", params.len()));
        self.check(stmt)?;
        Ok(1)
    }

    fn query(
        &mut self,
        stmt: &String,
        params: &[RowValues],
        sink: &mut dyn RowSink,
    ) -> Result<(), DbiError> {
        self.script
            .record(format!("query {stmt} ({} params)", params.len()));
        self.check(stmt)?;
        sink.columns(&["label".to_string(), "n".to_string()])?;
        sink.row(vec![RowValues::Text("2021-07-01 12:00:00".into()), RowValues::Int(1)])?;
        if self.script.fail_second_row {
            return Err(DbiError::ExecutionError("connection reset reading row 2".into()));
        }
        sink.row(vec![RowValues::Text("short".into()), RowValues::Int(2)])
    }

    fn commit(&mut self) -> Result<(), DbiError> {
        self.script.record("commit");
        if self.script.fail_commit {
            return Err(DbiError::ExecutionError("scripted commit failure".into()));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbiError> {
        self.script.record("rollback");
        Ok(())
    }
}

impl Connector for Script {
    type Tx<'c> = ScriptTx<'c>;

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Postgres
    }

    fn begin(&self, options: &TxOptions) -> Result<ScriptTx<'_>, DbiError> {
        self.record(if options.read_only {
            "begin read only"
        } else {
            "begin"
        });
        Ok(ScriptTx { script: self })
    }
}

dbi_record! {
    #[derive(Debug, Default)]
    struct Labelled {
        #[dbi = "label,date"]
        label: String,
        #[dbi = "n"]
        n: i64,
    }
}

dbi_record! {
    #[derive(Debug, Default)]
    #[allow(dead_code)]
    struct Twice {
        #[dbi = "n"]
        a: i64,
        #[dbi = "n"]
        b: i64,
    }
}

#[test]
fn success_commits_exactly_once() -> Result<(), DbiError> {
    let script = Script::default();
    let sets = executor::multi_query(
        &script,
        &["SELECT label, n FROM t WHERE a = ? AND b = ?"],
        &[vec![1.into(), 2.into()]],
    )?;

    assert_eq!(sets[0].len(), 2);
    assert_eq!(
        script.log(),
        vec![
            "begin",
            "prepare SELECT label, n FROM t WHERE a = $1 AND b = $2",
            "query SELECT label, n FROM t WHERE a = $1 AND b = $2 (2 params)",
            "commit",
        ]
    );
    Ok(())
}

#[test]
fn failing_statement_rolls_back_and_keeps_its_error() {
    let script = Script::failing_on("second");
    let err = executor::multi_query(&script, &["first", "second", "third"], &[])
        .unwrap_err();

    assert_eq!(err.to_string(), "SQL execution error: scripted failure: second");
    assert_eq!(script.count("commit"), 0);
    assert_eq!(script.count("rollback"), 1);
    assert_eq!(script.count("prepare third"), 0);
}

#[test]
fn panic_inside_work_rolls_back() {
    let script = Script::default();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), DbiError> = run_in_transaction(&script, &TxOptions::default(), |tx| {
            let stmt = tx.prepare("UPDATE t SET n = n + 1")?;
            tx.execute(&stmt, &[])?;
            panic!("worker blew up")
        });
    }));

    let payload = outcome.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"worker blew up"));
    assert_eq!(script.count("commit"), 0);
    assert_eq!(script.log().last().map(String::as_str), Some("rollback"));
}

#[test]
fn commit_failure_is_surfaced() {
    let script = Script {
        fail_commit: true,
        ..Script::default()
    };
    let err = batch::upsert(&script, "INSERT INTO t VALUES (?)", &[vec![1.into()]]).unwrap_err();

    assert_eq!(err.to_string(), "SQL execution error: scripted commit failure");
    let log = script.log();
    assert_eq!(&log[log.len() - 2..], ["commit", "rollback"]);
}

#[test]
fn upsert_reports_one_based_row() {
    let script = Script::failing_on("boom");
    let rows: Vec<Vec<RowValues>> = vec![Vec::new(); 3];
    let err = batch::upsert(&script, "boom", &rows).unwrap_err();

    assert!(matches!(err, DbiError::UpsertRow { row: 1, .. }));
    assert_eq!(script.count("execute"), 1);
    assert_eq!(script.count("rollback"), 1);
}

#[test]
fn count_mismatch_never_begins() {
    let script = Script::default();
    let err = batch::transaction(&script, &["a", "b"], &[vec![], vec![], vec![]]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "uneven set of sql and data: 2 statements, 3 argument sets"
    );
    assert!(script.log().is_empty());
}

#[test]
fn transaction_prepares_everything_before_executing() -> Result<(), DbiError> {
    let script = Script::default();
    batch::transaction(
        &script,
        &["INSERT INTO a VALUES (?)", "INSERT INTO b VALUES (?, ?)"],
        &[vec![vec![1.into()]], vec![vec![1.into(), 2.into()]; 2]],
    )?;

    assert_eq!(
        script.log(),
        vec![
            "begin",
            "prepare INSERT INTO a VALUES ($1)",
            "prepare INSERT INTO b VALUES ($1, $2)",
            "execute INSERT INTO a VALUES ($1) (1 params)",
            "execute INSERT INTO b VALUES ($1, $2) (2 params)",
            "execute INSERT INTO b VALUES ($1, $2) (2 params)",
            "commit",
        ]
    );
    Ok(())
}

#[test]
fn unmarshal_honours_read_only_and_date() -> Result<(), DbiError> {
    let script = Script::default();
    let mut target: Vec<Box<Labelled>> = Vec::new();
    unmarshal::unmarshal(
        &script,
        &TxOptions::read_only(),
        &mut target,
        "SELECT label, n FROM t",
        &[],
    )?;

    assert_eq!(script.log()[0], "begin read only");
    assert_eq!(target[0].label, "2021-07-01");
    assert_eq!(target[1].label, "short");
    assert_eq!(target[1].n, 2);
    Ok(())
}

#[test]
fn duplicate_columns_fail_before_begin() {
    let script = Script::default();
    let mut target: Vec<Box<Twice>> = Vec::new();
    let err = unmarshal::unmarshal(
        &script,
        &TxOptions::default(),
        &mut target,
        "SELECT n FROM t",
        &[],
    )
    .unwrap_err();

    assert_eq!(err.to_string(), "column n used on multiple fields");
    assert!(script.log().is_empty());
}

#[test]
fn read_fault_mid_result_discards_the_rows() {
    let script = Script {
        fail_second_row: true,
        ..Script::default()
    };
    let result = executor::multi_query(&script, &["SELECT label, n FROM t"], &[]);

    assert!(matches!(result, Err(DbiError::ExecutionError(ref m)) if m.contains("row 2")));
    assert_eq!(script.count("commit"), 0);
    assert_eq!(script.log().last().map(String::as_str), Some("rollback"));
}

#[test]
fn read_fault_keeps_records_already_appended() {
    let script = Script {
        fail_second_row: true,
        ..Script::default()
    };
    let mut target: Vec<Box<Labelled>> = Vec::new();
    let result = unmarshal::unmarshal(
        &script,
        &TxOptions::default(),
        &mut target,
        "SELECT label, n FROM t",
        &[],
    );

    assert!(result.is_err());
    assert_eq!(target.len(), 1);
    assert_eq!(target[0].label, "2021-07-01");
    assert_eq!(script.count("commit"), 0);
    assert_eq!(script.log().last().map(String::as_str), Some("rollback"));
}
