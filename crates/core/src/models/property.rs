//! Rental property model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Owner;

/// Geographic position used for the nearby-places guide
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A rental unit configured by its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub building_name: String,
    pub host_name: String,
    pub city: String,
    pub address: String,
    pub capacity: String,
    pub rooms: u32,
    pub bathrooms: u32,
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub rules: String,
    pub guides: String,
    pub checkout_instructions: String,
    pub whatsapp_contact: String,
    pub location: Option<GeoPoint>,
}

impl Property {
    /// A new property pre-filled with placeholder content for the owner to edit
    pub fn draft(owner: &Owner) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            building_name: "New Property".to_string(),
            host_name: owner.name.clone(),
            city: String::new(),
            address: String::new(),
            capacity: "2 guests".to_string(),
            rooms: 1,
            bathrooms: 1,
            wifi_ssid: String::new(),
            wifi_pass: String::new(),
            rules: "No smoking\nNo pets\nQuiet hours after 22:00\nNo parties".to_string(),
            guides: "TV: remote on the table.\nAir conditioning: set to 22 degrees.".to_string(),
            checkout_instructions: "Leave the keys on the table\nTake out the trash\nTurn off the lights\nClose the windows".to_string(),
            whatsapp_contact: String::new(),
            location: None,
        }
    }

    /// Payload for a WiFi join QR code
    pub fn wifi_qr_payload(&self) -> String {
        format!("WIFI:S:{};T:WPA;P:{};;", self.wifi_ssid, self.wifi_pass)
    }

    /// Non-empty lines of a multi-line text field
    pub fn lines(text: &str) -> Vec<&str> {
        text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    }
}
