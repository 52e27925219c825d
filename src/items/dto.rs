use serde::Deserialize;

use crate::error::AppError;

/// Body of add and update. Fields are optional at the decode step so a
/// missing one is reported as a 400 with the field name.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ItemRequest {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub category: Option<String>,
}

/// Validated item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub name: String,
    pub quantity: i32,
    pub category: Option<String>,
}

impl ItemRequest {
    pub fn validate(self) -> Result<ItemFields, AppError> {
        let name = match self.name {
            Some(n) if !n.trim().is_empty() => n,
            _ => return Err(AppError::validation("Item name is required")),
        };
        let quantity = match self.quantity {
            Some(q) if q >= 1 && q <= i32::MAX as i64 => q as i32,
            Some(_) => return Err(AppError::validation("Quantity must be a positive integer")),
            None => return Err(AppError::validation("Quantity is required")),
        };
        let category = self.category.filter(|c| !c.trim().is_empty());
        Ok(ItemFields {
            name,
            quantity,
            category,
        })
    }
}

/// Optional window over an owner's list. Without `limit` the whole list is
/// returned.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 100;

    pub fn clamped(&self) -> (Option<i64>, i64) {
        (
            self.limit.map(|l| l.clamp(1, Self::MAX_LIMIT)),
            self.offset.max(0),
        )
    }
}
