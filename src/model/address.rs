use serde::{Deserialize, Serialize};

use crate::model::Id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: Id,
    pub postal_code: String,
    pub province: String,
    pub city: String,
}

/// Address payload on writes; resolved to an existing row when one matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAddress {
    pub postal_code: String,
    pub province: String,
    pub city: String,
}

impl NewAddress {
    /// Trim and lowercase the lookup fields so that equal addresses share a row
    pub fn normalized(&self) -> Self {
        Self {
            postal_code: self.postal_code.trim().to_string(),
            province: self.province.trim().to_lowercase(),
            city: self.city.trim().to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: Id,
    pub name: String,
}
