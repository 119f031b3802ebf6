// response.rs
// The JSON envelope shared by every endpoint:
// { success, message?, data?, total?, page?, pages? }

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u64>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            total: None,
            page: None,
            pages: None,
        }
    }

    pub fn message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::data(data)
        }
    }

    pub fn page(data: T, total: u64, page: u64, limit: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            total: Some(total),
            page: Some(page),
            pages: Some(pages),
            ..Self::data(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            total: None,
            page: None,
            pages: None,
        }
    }
}
