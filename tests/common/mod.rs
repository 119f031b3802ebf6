#![allow(dead_code)]

// Shared harness for the DB-backed integration tests: one throwaway
// database per test, a global lock so tests mutate it one at a time, and
// the ledger fixtures the scenario files share.

use std::{
    env,
    sync::{Mutex, MutexGuard, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use bson::{DateTime, oid::ObjectId};
use chrono::{Duration, NaiveDate, Utc};
use mongodb::Client;

use udhar_khata::models::LineItem;
use udhar_khata::state::{AppState, create_session, init_state};

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestContext {
    pub state: AppState,
    /// The shopkeeper the test's fixtures are scoped to.
    pub owner: ObjectId,
    db_name: String,
    _guard: MutexGuard<'static, ()>,
}

impl TestContext {
    /// Issues a bearer token for `owner`, standing in for the external
    /// auth service.
    pub async fn token_for(&self, owner: &ObjectId) -> String {
        create_session(&self.state, owner)
            .await
            .expect("failed to issue session token")
    }
}

/// Connects to MongoDB, drops and re-points `MONGODB_DB` at a fresh
/// timestamped database, and initializes the state against it. Returns
/// `None` (tests skip, not fail) when no MongoDB is reachable.
pub async fn setup_state() -> Option<TestContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("failed to lock test db mutex");

    let db_name = format!("udhar_khata_test_{}", unix_millis());
    unsafe {
        env::set_var("MONGODB_DB", &db_name);
    }

    if let Err(err) = drop_database(&db_name).await {
        eprintln!("Skipping test; MongoDB unavailable: {err:?}");
        drop(guard);
        return None;
    }

    match init_state().await {
        Ok(state) => Some(TestContext {
            state,
            owner: ObjectId::new(),
            db_name,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; init_state failed: {err:?}");
            drop(guard);
            None
        }
    }
}

pub async fn teardown(ctx: Option<TestContext>) {
    if let Some(ctx) = ctx {
        let _ = drop_database(&ctx.db_name).await;
        drop(ctx);
    }
}

async fn drop_database(db_name: &str) -> mongodb::error::Result<()> {
    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let client = Client::with_uri_str(uri).await?;
    client.database(db_name).drop().await
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis()
}

/// Line items from (name, quantity, unit price) triples. Subtotals are
/// deliberately left stale so the store has to derive them.
pub fn items(entries: &[(&str, i64, f64)]) -> Vec<LineItem> {
    entries
        .iter()
        .map(|(name, quantity, price)| LineItem {
            item_name: name.to_string(),
            quantity: *quantity,
            price_per_item: *price,
            subtotal: 0.0,
        })
        .collect()
}

pub fn due_on(year: i32, month: u32, day: u32) -> DateTime {
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
    DateTime::from_chrono(date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

pub fn due_in_days(days: i64) -> DateTime {
    DateTime::from_chrono(Utc::now() + Duration::days(days))
}
