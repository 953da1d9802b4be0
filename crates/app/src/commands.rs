//! Command handlers
//!
//! Each handler returns the text to print so it can be exercised without a
//! terminal.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;
use concierge_core::history::{export_file_name, export_guest_history};
use concierge_core::storage::{DEMO_BOOKING_CODE, DEMO_OWNER_TOKEN};
use concierge_core::{
    normalize_code, redacted_credential, AccessGrant, Error, GrantRepository, GuestSession, Owner,
    OwnerRepository, OwnerRole, Property, PropertyRepository, Result, RevealState, RevealWindow,
};
use concierge_countdown::{start_countdown, CountdownOptions};
use tokio::sync::oneshot;
use tracing::info;
use uuid::Uuid;

use crate::display::{countdown_line, render_dashboard};
use crate::state::AppState;

pub fn seed(state: &AppState) -> Result<String> {
    if state.db.seed_demo(state.now())? {
        Ok(format!(
            "Demo data created. Owner token: {DEMO_OWNER_TOKEN}, booking code: {DEMO_BOOKING_CODE}"
        ))
    } else {
        Ok("Database already has data; nothing seeded".to_string())
    }
}

pub fn owner_login(state: &AppState, token: &str) -> Result<String> {
    let owner = state.require_owner(token)?;
    info!(owner_id = %owner.id, "Owner logged in");

    if owner.needs_token_setup() {
        return Ok(format!(
            "Welcome, {}. Choose a personal token with `set-token` before managing properties.",
            owner.name
        ));
    }

    let mut out = format!("Welcome, {} ({})", owner.name, owner.role.display_name());
    for property in state.db.properties().list_for_owner(owner.id)? {
        let grants = state.db.grants().list_for_property(property.id)?;
        let checked_in = grants.iter().filter(|g| g.checkin_status).count();
        out.push_str(&format!(
            "\n  {} [{}]: {} guests, {} checked in",
            property.building_name,
            property.id,
            grants.len(),
            checked_in
        ));
    }
    Ok(out)
}

pub fn set_token(state: &AppState, token: &str, new_token: &str) -> Result<String> {
    let owner = state.require_owner(token)?;
    let updated = state.db.owners().personalize_token(owner.id, new_token)?;
    Ok(format!("Token updated for {}", updated.name))
}

pub fn invite_owner(
    state: &AppState,
    admin_token: &str,
    name: &str,
    email: Option<&str>,
) -> Result<String> {
    state.require_super_admin(admin_token)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidOperation("owner name must not be empty".to_string()));
    }

    let mut owner = Owner::invite(name);
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        owner = owner.with_email(email);
    }
    state.db.create_owner(&owner)?;
    Ok(format!("Invitation created for {}. Token: {}", owner.name, owner.token))
}

pub fn list_owners(state: &AppState, admin_token: &str) -> Result<String> {
    state.require_super_admin(admin_token)?;

    let lines: Vec<String> = state
        .db
        .list_owners()?
        .iter()
        .map(|owner| {
            let setup = if owner.needs_token_setup() {
                format!("invite {}", owner.token)
            } else {
                "active".to_string()
            };
            format!(
                "{} [{}] {} <{}> {}",
                owner.name,
                owner.id,
                owner.role.display_name(),
                owner.email.as_deref().unwrap_or("-"),
                setup
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Delete an owner together with their properties and guests
pub fn remove_owner(state: &AppState, admin_token: &str, owner_id: Uuid) -> Result<String> {
    let admin = state.require_super_admin(admin_token)?;
    if admin.id == owner_id {
        return Err(Error::InvalidOperation("cannot remove yourself".to_string()));
    }

    let owner = state
        .db
        .find_owner_by_id(owner_id)?
        .ok_or_else(|| Error::NotFound(format!("owner {owner_id}")))?;
    state.db.delete_owner(owner.id)?;
    info!(owner_id = %owner.id, "Owner removed");
    Ok(format!("Removed {} and their properties", owner.name))
}

/// Property fields an owner may change
#[derive(Debug, Default, Args)]
pub struct PropertyChanges {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub wifi_ssid: Option<String>,
    #[arg(long)]
    pub wifi_pass: Option<String>,
    #[arg(long)]
    pub whatsapp: Option<String>,
}

impl PropertyChanges {
    fn apply(self, property: &mut Property) {
        let fields = [
            (self.name, &mut property.building_name),
            (self.city, &mut property.city),
            (self.address, &mut property.address),
            (self.wifi_ssid, &mut property.wifi_ssid),
            (self.wifi_pass, &mut property.wifi_pass),
            (self.whatsapp, &mut property.whatsapp_contact),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                *field = value.trim().to_string();
            }
        }
    }
}

/// Guest fields an owner may change. Check-in state is not among them.
#[derive(Debug, Default, Args)]
pub struct GrantChanges {
    #[arg(long)]
    pub guest_name: Option<String>,
    #[arg(long)]
    pub booking_code: Option<String>,
    #[arg(long)]
    pub door_code: Option<String>,
    /// First night (YYYY-MM-DD)
    #[arg(long)]
    pub check_in: Option<NaiveDate>,
    /// Departure day (YYYY-MM-DD)
    #[arg(long)]
    pub check_out: Option<NaiveDate>,
}

impl GrantChanges {
    fn apply(self, grant: &mut AccessGrant) -> Result<()> {
        if let Some(name) = self.guest_name {
            grant.guest_name = name.trim().to_string();
        }
        if let Some(code) = self.booking_code {
            grant.booking_code = normalize_code(&code);
        }
        if let Some(code) = self.door_code {
            grant.door_code = code.trim().to_string();
        }
        if self.check_in.is_some() {
            grant.check_in = self.check_in;
        }
        if self.check_out.is_some() {
            grant.check_out = self.check_out;
        }
        validate_grant(grant)
    }
}

fn validate_grant(grant: &AccessGrant) -> Result<()> {
    if grant.booking_code.is_empty() {
        return Err(Error::InvalidOperation("booking code must not be empty".to_string()));
    }
    if grant.door_code.is_empty() {
        return Err(Error::InvalidOperation("door code must not be empty".to_string()));
    }
    if let (Some(check_in), Some(check_out)) = (grant.check_in, grant.check_out) {
        if check_out < check_in {
            return Err(Error::InvalidOperation(
                "check-out must not be before check-in".to_string(),
            ));
        }
    }
    Ok(())
}

/// Load a property the owner may manage. Other owners' properties read as
/// missing; super admins may manage any.
fn managed_property(state: &AppState, owner: &Owner, property_id: Uuid) -> Result<Property> {
    state
        .db
        .find_property_by_id(property_id)?
        .filter(|p| p.owner_id == owner.id || owner.role == OwnerRole::SuperAdmin)
        .ok_or_else(|| Error::NotFound(format!("property {property_id}")))
}

pub fn add_property(state: &AppState, token: &str, name: &str) -> Result<String> {
    let owner = state.require_manager(token)?;
    let mut property = Property::draft(&owner);
    if !name.trim().is_empty() {
        property.building_name = name.trim().to_string();
    }

    state.db.create_property(&property)?;
    info!(property_id = %property.id, owner_id = %owner.id, "Property created");
    Ok(format!("Property created: {} [{}]", property.building_name, property.id))
}

pub fn edit_property(
    state: &AppState,
    token: &str,
    property_id: Uuid,
    changes: PropertyChanges,
) -> Result<String> {
    let owner = state.require_manager(token)?;
    let mut property = managed_property(state, &owner, property_id)?;
    changes.apply(&mut property);

    state.db.update_property(&property)?;
    Ok(format!("Property updated: {}", property.building_name))
}

/// Delete a property together with its guests
pub fn remove_property(state: &AppState, token: &str, property_id: Uuid) -> Result<String> {
    let owner = state.require_manager(token)?;
    let property = managed_property(state, &owner, property_id)?;

    state.db.delete_property(property.id)?;
    info!(property_id = %property.id, "Property removed");
    Ok(format!("Removed {}", property.building_name))
}

pub fn add_grant(
    state: &AppState,
    token: &str,
    property_id: Uuid,
    guest_name: &str,
    details: GrantChanges,
) -> Result<String> {
    let owner = state.require_manager(token)?;
    let property = managed_property(state, &owner, property_id)?;

    let mut grant = AccessGrant::new(property.id, guest_name.trim(), "", "");
    details.apply(&mut grant)?;

    state.db.create_grant(&grant)?;
    Ok(format!(
        "Guest {} added to {}. Booking code: {}",
        grant.guest_name, property.building_name, grant.booking_code
    ))
}

pub fn edit_grant(
    state: &AppState,
    token: &str,
    grant_id: Uuid,
    changes: GrantChanges,
) -> Result<String> {
    let owner = state.require_manager(token)?;
    let mut grant = state
        .db
        .find_grant_by_id(grant_id)?
        .ok_or_else(|| Error::NotFound(format!("grant {grant_id}")))?;
    managed_property(state, &owner, grant.property_id)?;

    changes.apply(&mut grant)?;
    state.db.update_grant_details(&grant)?;
    Ok(format!("Guest {} updated", grant.guest_name))
}

pub fn guest(state: &AppState, booking_code: &str, json: bool) -> Result<String> {
    let session = GuestSession::login(&state.db, booking_code)?;
    let window = RevealWindow::evaluate(session.grant(), &state.config.reveal.policy(), state.now());
    let dashboard = session.dashboard(&window);

    if json {
        dashboard.to_json()
    } else {
        Ok(render_dashboard(&dashboard))
    }
}

pub fn check_in(state: &AppState, booking_code: &str) -> Result<String> {
    let mut session = GuestSession::login(&state.db, booking_code)?;
    let now = state.now();
    let issued = session.check_in(&state.db, now)?;

    let window = RevealWindow::evaluate(session.grant(), &state.config.reveal.policy(), now);
    let code = session
        .dashboard(&window)
        .door_code
        .unwrap_or_else(|| redacted_credential().to_string());

    let headline = if issued {
        "Checked in. Welcome!"
    } else {
        "Already checked in."
    };
    Ok(format!("{headline}\n{}", countdown_line(&code, window.remaining_secs)))
}

/// Write one CSV per property owned by `owner_token` into `out_dir`
pub fn export(state: &AppState, owner_token: &str, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let owner = state.require_owner(owner_token)?;
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::new();
    for property in state.db.properties().list_for_owner(owner.id)? {
        let grants = state.db.grants().list_for_property(property.id)?;
        let path = out_dir.join(export_file_name(&property));
        std::fs::write(&path, export_guest_history(&property, &grants))?;
        written.push(path);
    }
    Ok(written)
}

/// Follow the reveal countdown until it expires or the user interrupts
pub async fn watch(state: &AppState, booking_code: &str) -> Result<()> {
    let session = GuestSession::login(&state.db, booking_code)?;
    let grant = session.grant().clone();
    let options = CountdownOptions::from_config(&state.config.reveal);

    let window = RevealWindow::evaluate(&grant, &options.policy, state.now());
    match window.state {
        RevealState::NotCheckedIn => {
            println!("Door code: check in to reveal");
            return Ok(());
        }
        RevealState::Expired => {
            println!("{}", countdown_line(redacted_credential(), 0));
            return Ok(());
        }
        RevealState::Active => {
            println!("{}", countdown_line(&grant.door_code, window.remaining_secs));
        }
    }

    let (expired_tx, expired_rx) = oneshot::channel();
    let door_code = grant.door_code.clone();
    let handle = start_countdown(
        &grant,
        options,
        move |remaining| println!("{}", countdown_line(&door_code, remaining)),
        move || {
            println!("{}", countdown_line(redacted_credential(), 0));
            let _ = expired_tx.send(());
        },
    );

    tokio::select! {
        _ = expired_rx => {}
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::storage::DEMO_DOOR_CODE;
    use concierge_core::ConciergeConfig;
    use tempfile::tempdir;

    fn seeded() -> AppState {
        let state = AppState::in_memory(ConciergeConfig::default()).unwrap();
        seed(&state).unwrap();
        state
    }

    #[test]
    fn test_guest_flow() {
        let state = seeded();

        let before = guest(&state, "guest777", false).unwrap();
        assert!(before.contains("check in to reveal"));
        assert!(!before.contains(DEMO_DOOR_CODE));

        let first = check_in(&state, DEMO_BOOKING_CODE).unwrap();
        assert!(first.starts_with("Checked in."));
        assert!(first.contains(DEMO_DOOR_CODE));

        let second = check_in(&state, DEMO_BOOKING_CODE).unwrap();
        assert!(second.starts_with("Already checked in."));

        let after = guest(&state, DEMO_BOOKING_CODE, false).unwrap();
        assert!(after.contains(DEMO_DOOR_CODE));
        assert!(after.contains("WiFi QR: WIFI:S:Demo-WiFi;T:WPA;P:welcome123;;"));
    }

    #[test]
    fn test_unknown_booking_code() {
        let state = seeded();
        assert!(matches!(
            guest(&state, "NOPE", false),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_invite_and_personalize() {
        let state = seeded();
        let out = invite_owner(&state, DEMO_OWNER_TOKEN, "Marta", None).unwrap();
        let token = out.rsplit("Token: ").next().unwrap().to_string();

        let welcome = owner_login(&state, &token).unwrap();
        assert!(welcome.contains("set-token"));

        set_token(&state, &token, "marta-2026").unwrap();
        let welcome = owner_login(&state, "marta-2026").unwrap();
        assert!(welcome.starts_with("Welcome, Marta (Owner)"));

        assert!(invite_owner(&state, "marta-2026", "Luis", None).is_err());
    }

    #[test]
    fn test_export_writes_csv() {
        let state = seeded();
        check_in(&state, DEMO_BOOKING_CODE).unwrap();
        let dir = tempdir().unwrap();

        let files = export(&state, DEMO_OWNER_TOKEN, dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        let csv = std::fs::read_to_string(&files[0]).unwrap();
        assert!(csv.contains(r#""GUEST777","4829","Checked in""#));
    }

    /// Invite an owner and finish their token setup
    fn onboard(state: &AppState, name: &str, token: &str) -> Owner {
        let out = invite_owner(state, DEMO_OWNER_TOKEN, name, None).unwrap();
        let invite = out.rsplit("Token: ").next().unwrap();
        set_token(state, invite, token).unwrap();
        state.require_manager(token).unwrap()
    }

    #[test]
    fn test_owner_sets_up_property_and_guest() {
        let state = seeded();
        let marta = onboard(&state, "Marta", "marta-2026");

        add_property(&state, "marta-2026", "Casa Azul").unwrap();
        let property = state.db.list_properties_for_owner(marta.id).unwrap().remove(0);
        assert_eq!(property.building_name, "Casa Azul");

        let changes = PropertyChanges {
            wifi_ssid: Some("Azul".to_string()),
            wifi_pass: Some("mar-2026".to_string()),
            ..Default::default()
        };
        edit_property(&state, "marta-2026", property.id, changes).unwrap();

        let details = GrantChanges {
            booking_code: Some(" azul01 ".to_string()),
            door_code: Some("7310".to_string()),
            check_in: NaiveDate::from_ymd_opt(2026, 10, 17),
            check_out: NaiveDate::from_ymd_opt(2026, 10, 20),
            ..Default::default()
        };
        let out = add_grant(&state, "marta-2026", property.id, "Luis", details).unwrap();
        assert!(out.ends_with("Booking code: AZUL01"));

        let checked_in = check_in(&state, "azul01").unwrap();
        assert!(checked_in.contains("7310"));
        let dashboard = guest(&state, "AZUL01", false).unwrap();
        assert!(dashboard.contains("WIFI:S:Azul;T:WPA;P:mar-2026;;"));
    }

    #[test]
    fn test_edit_grant_keeps_check_in() {
        let state = seeded();
        check_in(&state, DEMO_BOOKING_CODE).unwrap();
        let before = state.db.find_grant_by_booking_code(DEMO_BOOKING_CODE).unwrap().unwrap();

        let changes = GrantChanges {
            door_code: Some("1111".to_string()),
            ..Default::default()
        };
        edit_grant(&state, DEMO_OWNER_TOKEN, before.id, changes).unwrap();

        let after = state.db.find_grant_by_id(before.id).unwrap().unwrap();
        assert_eq!(after.door_code, "1111");
        assert!(after.checkin_status);
        assert_eq!(after.issued_at, before.issued_at);

        let backwards = GrantChanges {
            check_out: NaiveDate::from_ymd_opt(2000, 1, 1),
            ..Default::default()
        };
        assert!(matches!(
            edit_grant(&state, DEMO_OWNER_TOKEN, before.id, backwards),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_other_owners_properties_are_hidden() {
        let state = seeded();
        let marta = onboard(&state, "Marta", "marta-2026");
        onboard(&state, "Luis", "luis-2026");
        add_property(&state, "marta-2026", "Casa Azul").unwrap();
        let property = state.db.list_properties_for_owner(marta.id).unwrap().remove(0);

        assert!(matches!(
            edit_property(&state, "luis-2026", property.id, PropertyChanges::default()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            remove_property(&state, "luis-2026", property.id),
            Err(Error::NotFound(_))
        ));

        // Invited owners must set a token before managing anything
        let out = invite_owner(&state, DEMO_OWNER_TOKEN, "Ana", None).unwrap();
        let invite = out.rsplit("Token: ").next().unwrap();
        assert!(matches!(
            add_property(&state, invite, "Loft"),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_remove_property_removes_guests() {
        let state = seeded();
        let grant = state.db.find_grant_by_booking_code(DEMO_BOOKING_CODE).unwrap().unwrap();

        remove_property(&state, DEMO_OWNER_TOKEN, grant.property_id).unwrap();

        assert!(state.db.find_property_by_id(grant.property_id).unwrap().is_none());
        assert!(matches!(
            guest(&state, DEMO_BOOKING_CODE, false),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_super_admin_manages_owners() {
        let state = seeded();
        invite_owner(&state, DEMO_OWNER_TOKEN, "Marta", Some(" marta@example.com ")).unwrap();

        let listing = list_owners(&state, DEMO_OWNER_TOKEN).unwrap();
        assert_eq!(listing.lines().count(), 2);
        assert!(listing.contains("Marta ["));
        assert!(listing.contains("<marta@example.com> invite LUX-"));

        let admin = state.require_owner(DEMO_OWNER_TOKEN).unwrap();
        assert!(matches!(
            remove_owner(&state, DEMO_OWNER_TOKEN, admin.id),
            Err(Error::InvalidOperation(_))
        ));

        let marta = state
            .db
            .list_owners()
            .unwrap()
            .into_iter()
            .find(|o| o.name == "Marta")
            .unwrap();
        remove_owner(&state, DEMO_OWNER_TOKEN, marta.id).unwrap();
        assert!(state.db.find_owner_by_id(marta.id).unwrap().is_none());
        assert!(matches!(
            remove_owner(&state, DEMO_OWNER_TOKEN, marta.id),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_before_check_in_returns() {
        let state = seeded();
        watch(&state, DEMO_BOOKING_CODE).await.unwrap();
    }
}
