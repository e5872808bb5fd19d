use std::env;

use anyhow::{anyhow, ensure, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use cleaning_backend::auth::jwt::JwtService;
use cleaning_backend::auth::password::hash_password;
use cleaning_backend::config::AppConfig;
use cleaning_backend::db::{self, PgPool};
use cleaning_backend::models::{NewUser, Role};
use cleaning_backend::routes;
use cleaning_backend::state::AppState;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// A response with its body already read as JSON (`Value::Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Builds the app against `TEST_DATABASE_URL`, or returns `None` when the
    /// variable is unset so database tests are skipped.
    pub async fn try_new() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return Ok(None);
        };

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            run_migrations: true,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, jwt);
        let router = routes::create_router(state.clone());

        Ok(Some(Self { state, router }))
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(|conn| truncate_all(conn)).await
    }

    pub async fn insert_user(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<Uuid> {
        let email = email.to_string();
        let password = password.to_string();
        let full_name = full_name.to_string();
        self.with_conn(move |conn| {
            let user = NewUser {
                id: Uuid::new_v4(),
                email,
                password_hash: hash_password(&password)?,
                full_name,
                phone: String::new(),
                role: role.as_str().to_string(),
            };
            diesel::insert_into(cleaning_backend::schema::users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    pub async fn login_token(&self, email: &str, password: &str) -> Result<String> {
        let response = self
            .post_json(
                "/api/auth/login",
                &json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        ensure!(
            response.status == StatusCode::OK,
            "login failed with status {}",
            response.status
        );
        response.body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("login response has no access_token"))
    }

    /// Inserts a user with the given role and returns its id and a token.
    pub async fn user_with_token(&self, email: &str, full_name: &str, role: Role) -> Result<(Uuid, String)> {
        let password = "correct-horse";
        let id = self.insert_user(email, password, full_name, role).await?;
        let token = self.login_token(email, password).await?;
        Ok((id, token))
    }

    /// Creates an address through the admin API and returns its id.
    pub async fn create_address(&self, admin_token: &str, service_type: &str) -> Result<Uuid> {
        let response = self
            .post_json(
                "/api/admin?action=addresses",
                &json!({
                    "address": "221B Baker Street",
                    "client_name": "Mrs Hudson",
                    "client_phone": "+44 20 7946 0000",
                    "service_type": service_type,
                    "area": 85,
                    "price": 4200.0,
                    "scheduled_date": "2025-04-10",
                    "scheduled_time": "09:30:00",
                }),
                Some(admin_token),
            )
            .await?;
        ensure!(
            response.status == StatusCode::CREATED,
            "address creation failed: {} {}",
            response.status,
            response.body
        );
        id_at(&response.body["address"]["id"])
    }

    pub async fn address_status(&self, address_id: Uuid) -> Result<String> {
        self.with_conn(move |conn| {
            use cleaning_backend::schema::cleaning_addresses::dsl::*;
            cleaning_addresses
                .find(address_id)
                .select(status)
                .first::<String>(conn)
                .context("failed to load address status")
        })
        .await
    }

    pub async fn post_json(
        &self,
        path: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        self.send(Method::POST, path, Some(payload), token).await
    }

    #[allow(dead_code)]
    pub async fn put_json(
        &self,
        path: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        self.send(Method::PUT, path, Some(payload), token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.send(Method::GET, path, None, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.send(Method::DELETE, path, None, token).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match payload {
            Some(payload) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(payload)?)
            }
            None => Body::empty(),
        };
        let request = builder.body(body)?;
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response");

        let status = response.status();
        let bytes = body_to_vec(response.into_body()).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };
        Ok(TestResponse { status, body })
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub fn id_at(value: &Value) -> Result<Uuid> {
    let raw = value
        .as_str()
        .ok_or_else(|| anyhow!("expected a UUID string, got {value}"))?;
    Ok(raw.parse()?)
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    db::run_migrations(pool)?;
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        truncate_all(&mut conn)
    })
    .await
    .context("truncate task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE assignments, cleaning_addresses, users CASCADE;")
        .context("failed to truncate tables")?;
    Ok(())
}
