use restodir_common::{record, Record, RecordError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bootstrap::BOOTSTRAP_MARKER_ID;

/// A directory record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(default)]
    pub restaurant_id: String,

    #[serde(default)]
    pub restaurant_name: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub website: String,

    #[serde(default)]
    pub cuisine_type: String,

    #[serde(default)]
    pub is_kosher: bool,

    /// Day name (`Monday` ..) to `HH:MM-HH:MM`, `Closed` or empty
    #[serde(default)]
    pub opening_hours: BTreeMap<String, String>,
}

impl Restaurant {
    pub fn validate(&self) -> Result<(), super::DirectoryError> {
        if self.restaurant_name.trim().is_empty() {
            return Err(super::DirectoryError::NameRequired);
        }
        if self.restaurant_id == BOOTSTRAP_MARKER_ID {
            return Err(super::DirectoryError::ReservedId(self.restaurant_id.clone()));
        }
        Ok(())
    }

    pub fn to_record(&self) -> Result<Record, RecordError> {
        record::to_record(self)
    }

    pub fn from_record(record: &Record) -> Result<Self, RecordError> {
        record::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restodir_common::FieldValue;

    #[test]
    fn test_missing_fields_default() {
        let restaurant: Restaurant =
            serde_json::from_str(r#"{"restaurant_name": "Falafel Place"}"#).unwrap();
        assert_eq!(restaurant.restaurant_id, "");
        assert!(!restaurant.is_kosher);
        assert!(restaurant.opening_hours.is_empty());
    }

    #[test]
    fn test_record_round_trip_keeps_hours() {
        let mut restaurant = Restaurant {
            restaurant_id: "r1".into(),
            restaurant_name: "Noodle Bar".into(),
            cuisine_type: "Asian".into(),
            is_kosher: true,
            ..Default::default()
        };
        restaurant
            .opening_hours
            .insert("Monday".into(), "11:00-22:00".into());

        let record = restaurant.to_record().unwrap();
        assert_eq!(record["is_kosher"], FieldValue::Bool(true));
        assert_eq!(Restaurant::from_record(&record).unwrap(), restaurant);
    }

    #[test]
    fn test_validate() {
        let mut restaurant = Restaurant::default();
        assert!(restaurant.validate().is_err());

        restaurant.restaurant_name = "  ".into();
        assert!(restaurant.validate().is_err());

        restaurant.restaurant_name = "Pizza".into();
        assert!(restaurant.validate().is_ok());

        restaurant.restaurant_id = BOOTSTRAP_MARKER_ID.into();
        assert!(restaurant.validate().is_err());
    }
}
