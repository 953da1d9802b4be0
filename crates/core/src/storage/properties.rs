//! Property storage operations

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::parse::{parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{GeoPoint, Property};

const PROPERTY_COLUMNS: &str = "id, owner_id, building_name, host_name, city, address, capacity, \
     rooms, bathrooms, wifi_ssid, wifi_pass, rules, guides, checkout_instructions, \
     whatsapp_contact, location_lat, location_lng";

pub struct PropertyStore<'a> {
    conn: &'a Connection,
}

impl<'a> PropertyStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
        let lat: Option<f64> = row.get(15)?;
        let lng: Option<f64> = row.get(16)?;
        Ok(Property {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            owner_id: parse_uuid(&row.get::<_, String>(1)?)?,
            building_name: row.get(2)?,
            host_name: row.get(3)?,
            city: row.get(4)?,
            address: row.get(5)?,
            capacity: row.get(6)?,
            rooms: row.get(7)?,
            bathrooms: row.get(8)?,
            wifi_ssid: row.get(9)?,
            wifi_pass: row.get(10)?,
            rules: row.get(11)?,
            guides: row.get(12)?,
            checkout_instructions: row.get(13)?,
            whatsapp_contact: row.get(14)?,
            location: lat.zip(lng).map(|(lat, lng)| GeoPoint { lat, lng }),
        })
    }

    /// Create a new property
    pub fn create(&self, property: &Property) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO properties ({PROPERTY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                property.id.to_string(),
                property.owner_id.to_string(),
                property.building_name,
                property.host_name,
                property.city,
                property.address,
                property.capacity,
                property.rooms,
                property.bathrooms,
                property.wifi_ssid,
                property.wifi_pass,
                property.rules,
                property.guides,
                property.checkout_instructions,
                property.whatsapp_contact,
                property.location.map(|p| p.lat),
                property.location.map(|p| p.lng),
            ],
        )?;
        Ok(())
    }

    /// Find property by ID
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Property>> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = ?1");
        let property = self
            .conn
            .query_row(&sql, params![id.to_string()], Self::from_row)
            .optional()?;
        Ok(property)
    }

    /// Update everything except ownership
    pub fn update(&self, property: &Property) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE properties SET building_name = ?2, host_name = ?3, city = ?4, address = ?5,
                 capacity = ?6, rooms = ?7, bathrooms = ?8, wifi_ssid = ?9, wifi_pass = ?10,
                 rules = ?11, guides = ?12, checkout_instructions = ?13, whatsapp_contact = ?14,
                 location_lat = ?15, location_lng = ?16
             WHERE id = ?1",
            params![
                property.id.to_string(),
                property.building_name,
                property.host_name,
                property.city,
                property.address,
                property.capacity,
                property.rooms,
                property.bathrooms,
                property.wifi_ssid,
                property.wifi_pass,
                property.rules,
                property.guides,
                property.checkout_instructions,
                property.whatsapp_contact,
                property.location.map(|p| p.lat),
                property.location.map(|p| p.lng),
            ],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("property {}", property.id)));
        }
        Ok(())
    }

    /// List an owner's properties by name
    pub fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Property>> {
        let sql = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE owner_id = ?1 ORDER BY building_name"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let properties = stmt
            .query_map(params![owner_id.to_string()], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(properties)
    }

    /// Delete property (and, by cascade, its grants)
    pub fn delete(&self, property_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM properties WHERE id = ?1",
            params![property_id.to_string()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{GeoPoint, Owner, OwnerRole, Property};
    use crate::storage::Database;
    use crate::Error;

    #[test]
    fn test_property_roundtrip_and_update() {
        let db = Database::open_in_memory().unwrap();
        let owner = Owner::new("Host", "HOST1", OwnerRole::Owner);
        db.owners().create(&owner).unwrap();

        let mut property = Property::draft(&owner);
        db.properties().create(&property).unwrap();

        let loaded = db.properties().find_by_id(property.id).unwrap().unwrap();
        assert_eq!(loaded.building_name, "New Property");
        assert!(loaded.location.is_none());

        property.wifi_ssid = "Casa".to_string();
        property.location = Some(GeoPoint { lat: 40.4, lng: -3.7 });
        db.properties().update(&property).unwrap();

        let loaded = db.properties().find_by_id(property.id).unwrap().unwrap();
        assert_eq!(loaded.wifi_ssid, "Casa");
        assert_eq!(loaded.location, Some(GeoPoint { lat: 40.4, lng: -3.7 }));
        assert_eq!(db.properties().list_for_owner(owner.id).unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_property() {
        let db = Database::open_in_memory().unwrap();
        let owner = Owner::new("Host", "HOST1", OwnerRole::Owner);
        let property = Property::draft(&owner);
        assert!(matches!(
            db.properties().update(&property),
            Err(Error::NotFound(_))
        ));
    }
}
