// state module: AppState, initialization, and re-exports of submodules.

use anyhow::Result;
use bson::doc;
use mongodb::{Client, Collection, IndexModel, options::IndexOptions};
use std::env;

use crate::models::{
    BorrowRecord, Customer, Notification, ReceiptCounter, Sale, Session, UdharRecord,
};

mod borrow;
mod customers;
mod dashboard;
mod notifications;
mod sales;
mod sessions;
mod udhar;

pub use borrow::*;
pub use customers::*;
pub use dashboard::*;
pub use notifications::*;
pub use sales::*;
pub use sessions::*;
pub use udhar::*;

pub const SESSION_TTL_SECONDS: u64 = 60 * 60 * 24; // 1 day
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

/// Escapes user-supplied search text before it lands in a `$regex` query.
pub(crate) fn regex_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct AppState {
    pub customers: Collection<Customer>,
    pub udhar_records: Collection<UdharRecord>,
    pub borrow_records: Collection<BorrowRecord>,
    pub sales: Collection<Sale>,
    pub receipt_counters: Collection<ReceiptCounter>,
    pub notifications: Collection<Notification>,
    pub sessions: Collection<Session>,
}

pub async fn init_state() -> Result<AppState> {
    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = env::var("MONGODB_DB").unwrap_or_else(|_| "udhar_khata".to_string());

    let client = Client::with_uri_str(uri).await?;
    let db = client.database(&db_name);

    let state = AppState {
        customers: db.collection::<Customer>("customers"),
        udhar_records: db.collection::<UdharRecord>("customer_udhar"),
        borrow_records: db.collection::<BorrowRecord>("shop_borrow"),
        sales: db.collection::<Sale>("sales"),
        receipt_counters: db.collection::<ReceiptCounter>("receipt_counters"),
        notifications: db.collection::<Notification>("notifications"),
        sessions: db.collection::<Session>("sessions"),
    };

    ensure_indexes(&state).await?;

    Ok(state)
}

/// Uniqueness lives in the store: one phone per owner in the customer
/// directory, one counter document per owner per day.
async fn ensure_indexes(state: &AppState) -> Result<()> {
    let unique = IndexOptions::builder().unique(true).build();

    state
        .customers
        .create_index(
            IndexModel::builder()
                .keys(doc! { "phone": 1, "createdBy": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    state
        .receipt_counters
        .create_index(
            IndexModel::builder()
                .keys(doc! { "owner": 1, "day": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    state
        .sessions
        .create_index(
            IndexModel::builder()
                .keys(doc! { "token": 1 })
                .options(unique)
                .build(),
        )
        .await?;

    Ok(())
}
