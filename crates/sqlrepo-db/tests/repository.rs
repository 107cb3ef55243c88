//! Integration tests for the repository facade.
//!
//! A recording executor stands in for a database session: it compiles every
//! statement it receives, records the SQL, and answers with canned rows.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::MyModel;
use sqlrepo_core::{DisableError, RepositorySettings, SqlRepoError, SqlRepoResult};
use sqlrepo_db::executor::StatementExecutor;
use sqlrepo_db::filters::{FilterMap, Filters};
use sqlrepo_db::model::Row;
use sqlrepo_db::query::{DatabaseBackendType, InsertData, ListQuery, Statement};
use sqlrepo_db::repository::Repository;
use sqlrepo_db::value::Value;
use tokio::sync::Mutex as TokioMutex;

/// A mock executor that records compiled SQL.
struct RecordingDb {
    statements: TokioMutex<Vec<String>>,
    rows: Vec<Row>,
    affected: u64,
    flushes: AtomicUsize,
    commits: AtomicUsize,
}

impl RecordingDb {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            statements: TokioMutex::new(Vec::new()),
            rows,
            affected: 1,
            flushes: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        }
    }

    async fn record(&self, statement: &Statement) {
        let (sql, _) = self.compile(statement);
        self.statements.lock().await.push(sql);
    }

    async fn statements(&self) -> Vec<String> {
        self.statements.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl StatementExecutor for RecordingDb {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::PostgreSQL
    }

    async fn fetch_optional(&self, statement: &Statement) -> SqlRepoResult<Option<Row>> {
        self.record(statement).await;
        Ok(self.rows.first().cloned())
    }

    async fn fetch_all(&self, statement: &Statement) -> SqlRepoResult<Vec<Row>> {
        self.record(statement).await;
        Ok(self.rows.clone())
    }

    async fn execute(&self, statement: &Statement) -> SqlRepoResult<u64> {
        self.record(statement).await;
        Ok(self.affected)
    }

    async fn execute_returning(&self, statement: &Statement) -> SqlRepoResult<Vec<Row>> {
        self.record(statement).await;
        Ok(self.rows.clone())
    }

    async fn flush(&self) -> SqlRepoResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> SqlRepoResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn repo(rows: Vec<Row>) -> Repository<MyModel, RecordingDb> {
    Repository::new(RecordingDb::new(rows), RepositorySettings::default()).unwrap()
}

fn repo_with(rows: Vec<Row>, settings: RepositorySettings) -> Repository<MyModel, RecordingDb> {
    Repository::new(RecordingDb::new(rows), settings).unwrap()
}

fn disable_settings() -> RepositorySettings {
    RepositorySettings {
        disable_id_field: Some("id".into()),
        disable_field: Some("bl".into()),
        ..RepositorySettings::default()
    }
}

// ── Reads ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_maps_row() {
    let repo = repo(vec![MyModel::new(1, "a").row()]);
    let item = repo
        .get(FilterMap::new().with("id", 1), &[], &[])
        .await
        .unwrap();
    assert_eq!(item, Some(MyModel::new(1, "a")));
    assert_eq!(
        repo.executor().statements().await,
        vec!["SELECT \"my_model\".* FROM \"my_model\" WHERE \"my_model\".\"id\" = $1"]
    );
}

#[tokio::test]
async fn test_get_missing_row() {
    let repo = repo(vec![]);
    let item = repo.get(Filters::none(), &[], &[]).await.unwrap();
    assert!(item.is_none());
}

#[tokio::test]
async fn test_count_reads_first_column() {
    let repo = repo(vec![Row::from_pairs([("count", Value::Int(3))])]);
    assert_eq!(repo.count(Filters::none(), &[]).await.unwrap(), 3);
    assert_eq!(
        repo.executor().statements().await,
        vec!["SELECT count(*) FROM \"my_model\""]
    );
}

#[tokio::test]
async fn test_list_deduplicates_by_primary_key() {
    let rows = vec![
        MyModel::new(1, "a").row(),
        MyModel::new(1, "a").row(),
        MyModel::new(2, "b").row(),
    ];
    let items = repo(rows.clone()).list(ListQuery::default()).await.unwrap();
    assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2]);

    let settings = RepositorySettings {
        unique_list_items: false,
        ..RepositorySettings::default()
    };
    let items = repo_with(rows, settings)
        .list(ListQuery::default())
        .await
        .unwrap();
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn test_invalid_filter_reaches_no_session() {
    let repo = repo(vec![]);
    let err = repo
        .list(ListQuery {
            filters: FilterMap::new().with("children", 1).into(),
            ..ListQuery::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SqlRepoError::Filter(_)));
    assert!(repo.executor().statements().await.is_empty());
}

// ── Writes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_instance_with_defaults_flushes() {
    let repo = repo(vec![MyModel::new(5, "").row()]);
    let item = repo.create_instance(None).await.unwrap();
    assert_eq!(item.id, 5);
    assert_eq!(
        repo.executor().statements().await,
        vec!["INSERT INTO \"my_model\" DEFAULT VALUES RETURNING *"]
    );
    assert_eq!(repo.executor().flushes.load(Ordering::SeqCst), 1);
    assert_eq!(repo.executor().commits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_empty_sequence_reaches_no_session() {
    let repo = repo(vec![MyModel::new(5, "").row()]);
    let items = repo.create(InsertData::Many(vec![])).await.unwrap();
    assert!(items.is_empty());
    assert!(repo.executor().statements().await.is_empty());
    assert_eq!(repo.executor().flushes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_writes_commit_without_flush() {
    let settings = RepositorySettings {
        use_flush: false,
        ..RepositorySettings::default()
    };
    let repo = repo_with(vec![], settings);
    repo.delete(FilterMap::new().with("bl", true)).await.unwrap();
    assert_eq!(repo.executor().commits.load(Ordering::SeqCst), 1);
    assert_eq!(repo.executor().flushes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_instance_without_returned_row() {
    let err = repo(vec![]).create_instance(None).await.unwrap_err();
    assert!(matches!(err, SqlRepoError::DatabaseError(_)));
}

#[tokio::test]
async fn test_update_with_empty_data_is_noop() {
    let repo = repo(vec![]);
    let out = repo
        .update(FilterMap::new(), Filters::none())
        .await
        .unwrap();
    assert!(out.is_none());
    assert!(repo.executor().statements().await.is_empty());
}

#[tokio::test]
async fn test_update_returns_rows() {
    let repo = repo(vec![MyModel::new(1, "new").row()]);
    let out = repo
        .update(
            FilterMap::new().with("name", "new"),
            FilterMap::new().with("id", 1),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out, vec![MyModel::new(1, "new")]);
}

#[tokio::test]
async fn test_update_instance() {
    let repo = repo(vec![]);
    let (changed, item) = repo
        .update_instance(MyModel::new(1, "a"), &FilterMap::new().with("name", "a"))
        .await
        .unwrap();
    assert!(!changed);
    assert_eq!(item, MyModel::new(1, "a"));
    assert!(repo.executor().statements().await.is_empty());

    let (changed, item) = repo
        .update_instance(item, &FilterMap::new().with("name", "b"))
        .await
        .unwrap();
    assert!(changed);
    assert_eq!(item.name, "b");
    let statements = repo.executor().statements().await;
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements,
        vec!["UPDATE \"my_model\" SET \"name\" = $1 WHERE \"my_model\".\"id\" = $2"]
    );
}

#[tokio::test]
async fn test_delete_item() {
    let repo = repo(vec![]);
    assert!(repo.delete_item(&MyModel::new(3, "x")).await.unwrap());
    assert_eq!(
        repo.executor().statements().await,
        vec!["DELETE FROM \"my_model\" WHERE \"my_model\".\"id\" = $1"]
    );
}

// ── Disable ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disable_requires_configuration() {
    let err = repo(vec![])
        .disable(vec![Value::Int(1)], Filters::none())
        .await
        .unwrap_err();
    assert!(matches!(err, SqlRepoError::ImproperlyConfigured(_)));
}

#[tokio::test]
async fn test_disable_boolean_field() {
    let repo = repo_with(vec![], disable_settings());
    let disabled = repo
        .disable(vec![Value::Int(1), Value::Int(2)], Filters::none())
        .await
        .unwrap();
    assert_eq!(disabled, 1);
    assert_eq!(
        repo.executor().statements().await,
        vec!["UPDATE \"my_model\" SET \"bl\" = $1 WHERE (\"my_model\".\"id\" IN ($2, $3) AND \"my_model\".\"bl\" IS NOT TRUE)"]
    );
}

#[tokio::test]
async fn test_disable_without_exclusion() {
    let settings = RepositorySettings {
        allow_disable_filter_by_value: false,
        ..disable_settings()
    };
    let repo = repo_with(vec![], settings);
    repo.disable(vec![Value::Int(1)], FilterMap::new().with("name", "aboba"))
        .await
        .unwrap();
    assert_eq!(
        repo.executor().statements().await,
        vec!["UPDATE \"my_model\" SET \"bl\" = $1 WHERE (\"my_model\".\"id\" IN ($2) AND \"my_model\".\"name\" = $3)"]
    );
}

#[tokio::test]
async fn test_disable_empty_ids_builds_nothing() {
    let repo = repo_with(vec![], disable_settings());
    let err = repo.disable(vec![], Filters::none()).await.unwrap_err();
    assert!(matches!(err, SqlRepoError::Disable(DisableError::EmptyIds)));
    assert!(repo.executor().statements().await.is_empty());
}

#[tokio::test]
async fn test_disable_field_of_wrong_type() {
    let settings = RepositorySettings {
        disable_field: Some("name".into()),
        ..disable_settings()
    };
    let err = repo_with(vec![], settings)
        .disable(vec![Value::Int(1)], Filters::none())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SqlRepoError::Disable(DisableError::UnsupportedFieldType { .. })
    ));
}

#[test]
fn test_bad_column_mapping_is_rejected() {
    let mut settings = RepositorySettings::default();
    settings
        .specific_column_mapping
        .insert("x".into(), "not-a-column".into());
    let result = Repository::<MyModel, RecordingDb>::new(RecordingDb::new(vec![]), settings);
    assert!(matches!(result, Err(SqlRepoError::ConfigurationError(_))));
}
