// Customer directory. Ledger records reference customers weakly: deleting
// a customer never touches their udhar records, the reference simply stops
// resolving on read.

use bson::{DateTime, doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::time::SystemTime;

use crate::error::{ApiError, map_write_error};
use crate::models::Customer;

use super::{AppState, regex_escape};

fn now() -> DateTime {
    DateTime::from_system_time(SystemTime::now())
}

/// Display projection of a customer for embedding in ledger responses.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRef {
    pub id: ObjectId,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

pub async fn list_customers(
    state: &AppState,
    owner: &ObjectId,
    search: Option<&str>,
) -> Result<Vec<Customer>, ApiError> {
    let mut query = doc! { "createdBy": owner };
    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        let pattern = regex_escape(search.trim());
        query.insert(
            "$or",
            vec![
                doc! { "name": { "$regex": &pattern, "$options": "i" } },
                doc! { "phone": { "$regex": &pattern, "$options": "i" } },
            ],
        );
    }

    let mut cursor = state
        .customers
        .find(query)
        .sort(doc! { "name": 1 })
        .await?;
    let mut customers = Vec::new();
    while let Some(customer) = cursor.try_next().await? {
        customers.push(customer);
    }
    Ok(customers)
}

pub async fn create_customer(
    state: &AppState,
    owner: &ObjectId,
    name: &str,
    phone: &str,
    email: Option<String>,
    address: Option<String>,
) -> Result<Customer, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("Customer name is required".into()));
    }
    if phone.trim().is_empty() {
        return Err(ApiError::Validation("Phone number is required".into()));
    }

    let mut customer = Customer {
        id: None,
        name: name.trim().to_string(),
        phone: phone.trim().to_string(),
        email: email.unwrap_or_default().trim().to_lowercase(),
        address: address.unwrap_or_default().trim().to_string(),
        created_by: owner.clone(),
        created_at: Some(now()),
        updated_at: None,
    };

    let res = state
        .customers
        .insert_one(customer.clone())
        .await
        .map_err(|e| map_write_error(e, "Phone"))?;
    customer.id = res.inserted_id.as_object_id();
    Ok(customer)
}

pub async fn update_customer(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
    name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
) -> Result<Customer, ApiError> {
    let mut set = doc! { "updatedAt": now() };
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Customer name is required".into()));
        }
        set.insert("name", name.trim());
    }
    if let Some(phone) = phone {
        if phone.trim().is_empty() {
            return Err(ApiError::Validation("Phone number is required".into()));
        }
        set.insert("phone", phone.trim());
    }
    if let Some(email) = email {
        set.insert("email", email.trim().to_lowercase());
    }
    if let Some(address) = address {
        set.insert("address", address.trim());
    }

    let res = state
        .customers
        .update_one(doc! { "_id": id, "createdBy": owner }, doc! { "$set": set })
        .await
        .map_err(|e| map_write_error(e, "Phone"))?;
    if res.matched_count == 0 {
        return Err(ApiError::NotFound("Customer"));
    }

    state
        .customers
        .find_one(doc! { "_id": id, "createdBy": owner })
        .await?
        .ok_or(ApiError::NotFound("Customer"))
}

pub async fn delete_customer(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
) -> Result<(), ApiError> {
    let res = state
        .customers
        .delete_one(doc! { "_id": id, "createdBy": owner })
        .await?;
    if res.deleted_count == 0 {
        return Err(ApiError::NotFound("Customer"));
    }
    Ok(())
}

pub async fn count_customers(state: &AppState, owner: &ObjectId) -> Result<u64, ApiError> {
    Ok(state
        .customers
        .count_documents(doc! { "createdBy": owner })
        .await?)
}

/// Batch lookup for resolving ledger references on read. Missing ids are
/// simply absent from the map (deleted customers are tolerated).
pub async fn customer_ref_map(
    state: &AppState,
    ids: &[ObjectId],
) -> Result<HashMap<ObjectId, CustomerRef>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut cursor = state
        .customers
        .find(doc! { "_id": { "$in": ids } })
        .await?;
    let mut map = HashMap::new();
    while let Some(customer) = cursor.try_next().await? {
        if let Some(id) = customer.id {
            map.insert(
                id,
                CustomerRef {
                    id,
                    name: customer.name,
                    phone: customer.phone,
                    address: Some(customer.address).filter(|a| !a.is_empty()),
                },
            );
        }
    }
    Ok(map)
}
