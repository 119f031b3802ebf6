// Session lookup and issuance. Tokens are normally written by the external
// auth service; `create_session` is the seam it (and the test harness) uses.

use anyhow::Result;
use bson::{DateTime, doc, oid::ObjectId};
use data_encoding::BASE32_NOPAD;
use rand::RngCore;
use std::time::{Duration, SystemTime};

use crate::models::Session;

use super::{AppState, SESSION_TTL_SECONDS};

pub async fn create_session(state: &AppState, owner: &ObjectId) -> Result<String> {
    let mut token_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut token_bytes);
    let token = BASE32_NOPAD.encode(&token_bytes);

    let expires_at =
        DateTime::from_system_time(SystemTime::now() + Duration::from_secs(SESSION_TTL_SECONDS));

    state
        .sessions
        .insert_one(Session {
            id: None,
            token: token.clone(),
            owner: owner.clone(),
            expires_at,
        })
        .await?;

    Ok(token)
}

/// Resolves a bearer token to the owning shopkeeper id, reaping the session
/// if it has expired.
pub async fn find_owner_by_session(state: &AppState, token: &str) -> Result<Option<ObjectId>> {
    if let Some(session) = state.sessions.find_one(doc! { "token": token }).await? {
        if session.expires_at.to_system_time() <= SystemTime::now() {
            let _ = state.sessions.delete_one(doc! { "token": token }).await;
            return Ok(None);
        }
        Ok(Some(session.owner))
    } else {
        Ok(None)
    }
}
