//! Guest session and dashboard snapshot
//!
//! A guest logs in with a booking code, checks in once, and is shown a
//! dashboard assembled here as plain data for whatever renders it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::models::{AccessGrant, Property};
use crate::reveal::{display_credential, RevealState, RevealWindow};
use crate::storage::{CheckInOutcome, GrantRepository, PropertyRepository};

/// Dashboard sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuestSection {
    Summary,
    Guide,
    Rules,
    Checkout,
    Wifi,
    Maps,
}

impl GuestSection {
    pub const ALL: [GuestSection; 6] = [
        GuestSection::Summary,
        GuestSection::Guide,
        GuestSection::Rules,
        GuestSection::Checkout,
        GuestSection::Wifi,
        GuestSection::Maps,
    ];

    /// Only the summary is available before check-in
    pub fn is_unlocked(&self, checked_in: bool) -> bool {
        checked_in || *self == GuestSection::Summary
    }
}

/// A logged-in guest
#[derive(Debug, Clone)]
pub struct GuestSession {
    grant: AccessGrant,
    property: Property,
}

impl GuestSession {
    /// Resolve a booking code to its grant and property
    #[instrument(skip_all)]
    pub fn login<S>(store: &S, booking_code: &str) -> Result<Self>
    where
        S: GrantRepository + PropertyRepository + ?Sized,
    {
        let grant = store
            .find_grant_by_booking_code(booking_code)?
            .ok_or_else(|| Error::Authentication("booking code not found".to_string()))?;

        let property = store
            .find_property_by_id(grant.property_id)?
            .ok_or_else(|| Error::NotFound(format!("property {}", grant.property_id)))?;

        info!(grant_id = %grant.id, property_id = %property.id, "Guest logged in");
        Ok(Self { grant, property })
    }

    pub fn grant(&self) -> &AccessGrant {
        &self.grant
    }

    pub fn property(&self) -> &Property {
        &self.property
    }

    /// Check in. Returns true if the door code was issued by this call.
    pub fn check_in<S>(&mut self, store: &S, now: DateTime<Utc>) -> Result<bool>
    where
        S: GrantRepository + ?Sized,
    {
        let outcome = store.check_in(self.grant.id, now)?;
        let issued = matches!(outcome, CheckInOutcome::Issued(_));
        self.grant = outcome.into_grant();
        Ok(issued)
    }

    /// Re-read the grant from the store
    pub fn refresh<S>(&mut self, store: &S) -> Result<()>
    where
        S: GrantRepository + ?Sized,
    {
        self.grant = store
            .find_grant_by_id(self.grant.id)?
            .ok_or_else(|| Error::NotFound(format!("grant {}", self.grant.id)))?;
        Ok(())
    }

    pub fn dashboard(&self, window: &RevealWindow) -> GuestDashboard {
        GuestDashboard::build(&self.property, &self.grant, window)
    }
}

/// WiFi card contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiCard {
    pub ssid: String,
    pub password: String,
    pub qr_payload: String,
}

/// Everything the guest dashboard shows at one moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestDashboard {
    pub guest_name: String,
    pub building_name: String,
    pub host_name: String,
    pub address: String,
    pub city: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    /// Real code while the window is open, placeholder once it closes,
    /// absent before check-in
    pub door_code: Option<String>,
    pub clock: String,
    pub reveal: RevealWindow,
    pub wifi: Option<WifiCard>,
    pub rules: Vec<String>,
    pub guides: Vec<String>,
    pub checkout_instructions: Vec<String>,
    pub contact: String,
    pub unlocked_sections: Vec<GuestSection>,
}

impl GuestDashboard {
    pub fn build(property: &Property, grant: &AccessGrant, window: &RevealWindow) -> Self {
        let checked_in = window.state != RevealState::NotCheckedIn;
        let to_lines = |text: &str| {
            Property::lines(text)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        Self {
            guest_name: grant.guest_name.clone(),
            building_name: property.building_name.clone(),
            host_name: property.host_name.clone(),
            address: property.address.clone(),
            city: property.city.clone(),
            check_in: grant.check_in,
            check_out: grant.check_out,
            door_code: display_credential(grant, window).map(str::to_string),
            clock: window.clock(),
            reveal: *window,
            wifi: checked_in.then(|| WifiCard {
                ssid: property.wifi_ssid.clone(),
                password: property.wifi_pass.clone(),
                qr_payload: property.wifi_qr_payload(),
            }),
            rules: to_lines(&property.rules),
            guides: to_lines(&property.guides),
            checkout_instructions: to_lines(&property.checkout_instructions),
            contact: property.whatsapp_contact.clone(),
            unlocked_sections: GuestSection::ALL
                .into_iter()
                .filter(|s| s.is_unlocked(checked_in))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
