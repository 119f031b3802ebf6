// models.rs
// Document models for the MongoDB collections and their embedded types.

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Stored + effective status of a customer udhar record.
///
/// Mutations only ever persist Pending, PartialPaid or Paid; Overdue is
/// produced by the status resolver at read time (see `status.rs`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UdharStatus {
    Pending,
    PartialPaid,
    Paid,
    Overdue,
}

impl UdharStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UdharStatus::Pending => "Pending",
            UdharStatus::PartialPaid => "PartialPaid",
            UdharStatus::Paid => "Paid",
            UdharStatus::Overdue => "Overdue",
        }
    }
}

impl Default for UdharStatus {
    fn default() -> Self {
        UdharStatus::Pending
    }
}

/// Stored + effective status of a shop borrow record. No partial concept.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BorrowStatus {
    Pending,
    Paid,
    Overdue,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "Pending",
            BorrowStatus::Paid => "Paid",
            BorrowStatus::Overdue => "Overdue",
        }
    }
}

impl Default for BorrowStatus {
    fn default() -> Self {
        BorrowStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Card,
    JazzCash,
    EasyPaisa,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::JazzCash => "JazzCash",
            PaymentMethod::EasyPaisa => "EasyPaisa",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Other => "Other",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// Customer directory entry. Phone is unique per owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub created_by: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// One line of an udhar/borrow/sale record. `subtotal` is recomputed on
/// every save and never trusted from input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item_name: String,
    pub quantity: i64,
    pub price_per_item: f64,
    #[serde(default)]
    pub subtotal: f64,
}

/// A single payment applied to an udhar record. Append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    pub amount: f64,
    pub date: DateTime,
    #[serde(default)]
    pub note: String,
}

/// Credit extended to a customer, to be repaid by `due_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdharRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub customer: ObjectId,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub remaining_amount: f64,
    #[serde(default)]
    pub payments: Vec<PaymentEntry>,
    pub due_date: DateTime,
    #[serde(default)]
    pub status: UdharStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime>,
    /// Weak back-reference to the predecessor in a carry-forward chain.
    /// Lookup/display only; deletes never cascade through it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_forward_from: Option<ObjectId>,
    pub created_by: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// Credit the shop took from a supplier or lender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub from_name: String,
    pub phone: String,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub due_date: DateTime,
    #[serde(default)]
    pub status: BorrowStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime>,
    pub created_by: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// An immediate, fully settled cash transaction with a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<ObjectId>,
    #[serde(default)]
    pub walk_in_name: String,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub amount_received: f64,
    #[serde(default)]
    pub change_returned: f64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub notes: String,
    pub receipt_number: String,
    pub created_by: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

/// Per-owner per-day sequence backing receipt numbers. Bumped with an
/// atomic `$inc` so concurrent sales cannot share a number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptCounter {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner: ObjectId,
    pub day: String,
    pub seq: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationKind {
    DueToday,
    Overdue,
    Reminder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordKind {
    CustomerUdhar,
    ShopBorrow,
}

/// Due-date alert written by the external reminder job; this service only
/// lists notifications and marks them read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner: ObjectId,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_kind: Option<RecordKind>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

/// Session document linking a bearer token to an owner. Issued by the
/// external auth service; this crate only resolves and expires them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub token: String,
    pub owner: ObjectId,
    pub expires_at: DateTime,
}
