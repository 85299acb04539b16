use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock, task::JoinSet};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub title: String,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct BatchCreate {
    pub titles: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCreateResult {
    pub title: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchCreateResponse {
    pub results: Vec<BatchCreateResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

type HandlerError = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: &str) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// In-memory table. Ids are handed out sequentially from 1.
#[derive(Debug, Default)]
pub struct Store {
    last_id: i64,
    todos: BTreeMap<i64, Todo>,
}

impl Store {
    pub fn insert(&mut self, title: String) -> Todo {
        self.last_id += 1;
        let todo = Todo {
            id: self.last_id,
            title,
            completed: false,
            created_at: Utc::now(),
        };
        self.todos.insert(todo.id, todo.clone());
        todo
    }

    /// Newest first, ties broken by the higher id.
    pub fn list(&self) -> Vec<Todo> {
        let mut todos: Vec<Todo> = self.todos.values().cloned().collect();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        todos
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with_db(Db::default())
}

/// Router over an existing table, so tests can seed or inspect it.
pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/batch", post(batch_create))
        .route("/api/todos/{id}", put(update_todo).delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_todos(State(db): State<Db>) -> Json<Vec<Todo>> {
    Json(db.read().await.list())
}

async fn create_todo(
    State(db): State<Db>,
    payload: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), HandlerError> {
    let Json(input) = payload.map_err(|rejection| {
        tracing::warn!(%rejection, "rejected create payload");
        error(StatusCode::BAD_REQUEST, "invalid request body")
    })?;
    if input.title.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "title is required"));
    }
    let todo = db.write().await.insert(input.title);
    tracing::info!(id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateTodo>, JsonRejection>,
) -> Result<Json<Message>, HandlerError> {
    let Json(input) = payload.map_err(|_| error(StatusCode::BAD_REQUEST, "invalid request body"))?;
    if input.title.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "title is required"));
    }
    let mut store = db.write().await;
    let todo = store
        .todos
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "todo not found"))?;
    todo.title = input.title;
    todo.completed = input.completed;
    tracing::info!(id, "todo updated");
    Ok(Json(Message {
        message: "todo updated".to_string(),
    }))
}

async fn delete_todo(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<Message>, HandlerError> {
    db.write()
        .await
        .todos
        .remove(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "todo not found"))?;
    tracing::info!(id, "todo deleted");
    Ok(Json(Message {
        message: "todo deleted".to_string(),
    }))
}

/// Creates every title on its own task and answers once all have finished.
/// Results arrive in completion order.
async fn batch_create(
    State(db): State<Db>,
    payload: Result<Json<BatchCreate>, JsonRejection>,
) -> Result<Json<BatchCreateResponse>, HandlerError> {
    let Json(input) = payload.map_err(|_| error(StatusCode::BAD_REQUEST, "invalid request body"))?;

    let mut tasks = JoinSet::new();
    for title in input.titles {
        let db = db.clone();
        tasks.spawn(async move { create_one(&db, title).await });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(join_error) => {
                tracing::error!(%join_error, "batch create task failed");
                return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "batch create failed"));
            }
        }
    }
    Ok(Json(BatchCreateResponse { results }))
}

async fn create_one(db: &Db, title: String) -> BatchCreateResult {
    if title.is_empty() {
        return BatchCreateResult {
            title,
            status: "error".to_string(),
            message: Some("title is required".to_string()),
            id: None,
        };
    }
    let todo = db.write().await.insert(title);
    BatchCreateResult {
        title: todo.title,
        status: "success".to_string(),
        message: None,
        id: Some(todo.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_serializes_created_at_as_rfc3339() {
        let todo = Todo {
            id: 1,
            title: "Test".to_string(),
            completed: false,
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["title"], "Test");
        assert_eq!(json["completed"], false);
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn store_assigns_sequential_ids() {
        let mut store = Store::default();
        assert_eq!(store.insert("a".to_string()).id, 1);
        assert_eq!(store.insert("b".to_string()).id, 2);
    }

    #[test]
    fn store_lists_newest_first() {
        let mut store = Store::default();
        store.insert("first".to_string());
        store.insert("second".to_string());
        let titles: Vec<String> = store.list().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[test]
    fn create_todo_rejects_missing_title() {
        let result: Result<CreateTodo, _> = serde_json::from_str(r#"{"completed":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_todo_defaults_completed_to_false() {
        let input: UpdateTodo = serde_json::from_str(r#"{"title":"New title"}"#).unwrap();
        assert_eq!(input.title, "New title");
        assert!(!input.completed);
    }

    #[test]
    fn batch_result_skips_empty_fields() {
        let result = BatchCreateResult {
            title: "x".to_string(),
            status: "success".to_string(),
            message: None,
            id: Some(1),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("message").is_none());
    }
}
