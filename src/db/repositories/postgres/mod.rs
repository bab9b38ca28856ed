//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres
//! database. The three composite unique indexes on
//! (date, shift_type, driver_id / bus_id / route_id) are the authoritative
//! double-booking guard; a violation at write time is translated back into
//! the same [`Conflict`] shape the advisory pre-check produces, so callers
//! see one consistent error contract regardless of which layer caught the
//! collision.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::DatabaseErrorKind;
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task;

use crate::api::{BusId, DriverId, RouteId, ScheduleId};
use crate::db::repository::{
    DirectoryRepository, ErrorContext, RepositoryError, RepositoryResult, ScheduleRepository,
};
use crate::models::{
    Bus, Conflict, ConflictKind, Driver, NewSchedule, RouteInfo, RouteStop, Schedule,
    ScheduleFilter, ScheduleStatus, ScheduleUpdate, Shift, StudentRider,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: std::sync::Arc::new(AtomicU64::new(0)),
            failed_queries: std::sync::Arc::new(AtomicU64::new(0)),
            retried_operations: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient
    /// failures (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                // Get connection
                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                // Execute the operation
                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Get detailed health information: (is_healthy, latency_ms, error).
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        match self.health_check().await {
            Ok(true) => (true, Some(start.elapsed().as_millis() as u64), None),
            Ok(false) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some("Health check returned false".to_string()),
            ),
            Err(e) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some(e.to_string()),
            ),
        }
    }
}

/// Translate a schedule write error into the repository error contract.
///
/// Unique violations on the slot indexes become the same [`Conflict`]
/// shape the advisory pre-check produces; foreign-key violations mean a
/// reference entity does not exist and surface as validation errors.
fn map_schedule_write_error(
    err: diesel::result::Error,
    date: NaiveDate,
    shift: Shift,
    operation: &str,
) -> RepositoryError {
    enum Mapped {
        SlotConflict(ConflictKind),
        MissingReference(String),
        Passthrough,
    }

    let mapped = match &err {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            match info.constraint_name() {
                Some("uq_schedules_slot_driver") => Mapped::SlotConflict(ConflictKind::DriverConflict),
                Some("uq_schedules_slot_bus") => Mapped::SlotConflict(ConflictKind::BusConflict),
                Some("uq_schedules_slot_route") => Mapped::SlotConflict(ConflictKind::RouteConflict),
                _ => Mapped::Passthrough,
            }
        }
        diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            Mapped::MissingReference(info.message().to_string())
        }
        _ => Mapped::Passthrough,
    };

    match mapped {
        Mapped::SlotConflict(kind) => RepositoryError::unique_violation_with_context(
            Conflict::for_slot(kind, date, shift),
            ErrorContext::new(operation).with_entity("schedule"),
        ),
        Mapped::MissingReference(message) => RepositoryError::validation_with_context(
            format!("referenced entity does not exist: {}", message),
            ErrorContext::new(operation).with_entity("schedule"),
        ),
        Mapped::Passthrough => RepositoryError::from(err),
    }
}

#[async_trait]
impl ScheduleRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn insert_schedule(&self, new_schedule: &NewSchedule) -> RepositoryResult<Schedule> {
        let changeset = ScheduleChangeset::from_new(new_schedule);
        let date = new_schedule.date;
        let shift = new_schedule.shift;

        self.with_conn(move |conn| {
            let row: ScheduleRow = diesel::insert_into(schedules::table)
                .values(&changeset)
                .returning(ScheduleRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_schedule_write_error(e, date, shift, "insert_schedule"))?;
            row.into_schedule()
        })
        .await
    }

    async fn replace_schedule(
        &self,
        id: ScheduleId,
        update: &ScheduleUpdate,
    ) -> RepositoryResult<Schedule> {
        let update = update.clone();
        let date = update.date;
        let shift = update.shift;

        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let current: ScheduleRow = schedules::table
                    .find(id.value())
                    .select(ScheduleRow::as_select())
                    .first(tx)
                    .optional()
                    .map_err(RepositoryError::from)?
                    .ok_or_else(|| {
                        RepositoryError::not_found_with_context(
                            format!("schedule {} not found", id),
                            ErrorContext::new("replace_schedule")
                                .with_entity("schedule")
                                .with_entity_id(id),
                        )
                    })?;

                let current_status: ScheduleStatus = current.status.parse().map_err(
                    |e: String| RepositoryError::internal(format!("bad status column: {e}")),
                )?;
                let changeset = ScheduleChangeset::from_update(&update, current_status);

                let row: ScheduleRow = diesel::update(schedules::table.find(id.value()))
                    .set(&changeset)
                    .returning(ScheduleRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| map_schedule_write_error(e, date, shift, "replace_schedule"))?;
                row.into_schedule()
            })
        })
        .await
    }

    async fn update_status(
        &self,
        id: ScheduleId,
        status: ScheduleStatus,
    ) -> RepositoryResult<Schedule> {
        self.with_conn(move |conn| {
            let row: Option<ScheduleRow> = diesel::update(schedules::table.find(id.value()))
                .set(schedules::status.eq(status.as_str()))
                .returning(ScheduleRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(RepositoryError::from)?;

            row.ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("schedule {} not found", id),
                    ErrorContext::new("update_status")
                        .with_entity("schedule")
                        .with_entity_id(id),
                )
            })?
            .into_schedule()
        })
        .await
    }

    async fn fetch_schedule(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>> {
        self.with_conn(move |conn| {
            let row: Option<ScheduleRow> = schedules::table
                .find(id.value())
                .select(ScheduleRow::as_select())
                .first(conn)
                .optional()
                .map_err(RepositoryError::from)?;
            row.map(ScheduleRow::into_schedule).transpose()
        })
        .await
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        let filter = *filter;
        self.with_conn(move |conn| {
            let mut query = schedules::table.into_boxed();
            if let Some(driver_id) = filter.driver_id {
                query = query.filter(schedules::driver_id.eq(driver_id.value()));
            }
            if let Some(date) = filter.date {
                query = query.filter(schedules::date.eq(date));
            }

            let rows: Vec<ScheduleRow> = query
                .order((
                    schedules::date.desc(),
                    schedules::scheduled_start_time.asc(),
                ))
                .select(ScheduleRow::as_select())
                .load(conn)
                .map_err(RepositoryError::from)?;
            rows.into_iter().map(ScheduleRow::into_schedule).collect()
        })
        .await
    }

    async fn find_assignments(
        &self,
        date: NaiveDate,
        shift: Shift,
        exclude: Option<ScheduleId>,
    ) -> RepositoryResult<Vec<Schedule>> {
        self.with_conn(move |conn| {
            let mut query = schedules::table
                .filter(schedules::date.eq(date))
                .filter(schedules::shift_type.eq(shift.as_str()))
                .into_boxed();
            if let Some(exclude) = exclude {
                query = query.filter(schedules::id.ne(exclude.value()));
            }

            let rows: Vec<ScheduleRow> = query
                .select(ScheduleRow::as_select())
                .load(conn)
                .map_err(RepositoryError::from)?;
            rows.into_iter().map(ScheduleRow::into_schedule).collect()
        })
        .await
    }

    async fn delete_schedule(&self, id: ScheduleId) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(schedules::table.find(id.value()))
                .execute(conn)
                .map_err(RepositoryError::from)?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[async_trait]
impl DirectoryRepository for PostgresRepository {
    async fn fetch_driver(&self, id: DriverId) -> RepositoryResult<Option<Driver>> {
        self.with_conn(move |conn| {
            let row: Option<DriverRow> = drivers::table
                .find(id.value())
                .select(DriverRow::as_select())
                .first(conn)
                .optional()
                .map_err(RepositoryError::from)?;
            Ok(row.map(Into::into))
        })
        .await
    }

    async fn fetch_bus(&self, id: BusId) -> RepositoryResult<Option<Bus>> {
        self.with_conn(move |conn| {
            let row: Option<BusRow> = buses::table
                .find(id.value())
                .select(BusRow::as_select())
                .first(conn)
                .optional()
                .map_err(RepositoryError::from)?;
            Ok(row.map(Into::into))
        })
        .await
    }

    async fn fetch_route(&self, id: RouteId) -> RepositoryResult<Option<RouteInfo>> {
        self.with_conn(move |conn| {
            let row: Option<RouteRow> = routes::table
                .find(id.value())
                .select(RouteRow::as_select())
                .first(conn)
                .optional()
                .map_err(RepositoryError::from)?;
            Ok(row.map(Into::into))
        })
        .await
    }

    async fn fetch_route_stops(&self, route_id: RouteId) -> RepositoryResult<Vec<RouteStop>> {
        self.with_conn(move |conn| {
            let rows: Vec<(RouteStopRow, StopRow)> = route_stops::table
                .inner_join(stops::table)
                .filter(route_stops::route_id.eq(route_id.value()))
                .order(route_stops::stop_order.asc())
                .select((RouteStopRow::as_select(), StopRow::as_select()))
                .load(conn)
                .map_err(RepositoryError::from)?;
            Ok(rows
                .into_iter()
                .map(|(rs, stop)| rs.with_stop(stop))
                .collect())
        })
        .await
    }

    async fn list_riders(
        &self,
        route_id: RouteId,
        shift: Shift,
    ) -> RepositoryResult<Vec<StudentRider>> {
        self.with_conn(move |conn| {
            let mut query = students::table
                .filter(students::active.eq(true))
                .into_boxed();
            query = match shift {
                Shift::Morning => {
                    query.filter(students::morning_route_id.eq(Some(route_id.value())))
                }
                Shift::Afternoon => {
                    query.filter(students::afternoon_route_id.eq(Some(route_id.value())))
                }
            };

            let rows: Vec<StudentRow> = query
                .order(students::name.asc())
                .select(StudentRow::as_select())
                .load(conn)
                .map_err(RepositoryError::from)?;
            Ok(rows.into_iter().map(Into::into).collect())
        })
        .await
    }
}
