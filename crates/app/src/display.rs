//! Plain-text rendering of the guest dashboard

use std::fmt::Write;

use concierge_core::{format_clock, redacted_credential, GuestDashboard, RevealState};

/// Render the dashboard for a terminal
pub fn render_dashboard(dashboard: &GuestDashboard) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", dashboard.building_name);
    let _ = writeln!(out, "Host: {}", dashboard.host_name);
    if !dashboard.address.is_empty() {
        let _ = writeln!(out, "Address: {}, {}", dashboard.address, dashboard.city);
    }
    if let (Some(start), Some(end)) = (dashboard.check_in, dashboard.check_out) {
        let _ = writeln!(out, "Stay: {start} to {end}");
    }
    let _ = writeln!(out, "Guest: {}", dashboard.guest_name);
    out.push('\n');

    match dashboard.reveal.state {
        RevealState::NotCheckedIn => {
            let _ = writeln!(out, "Door code: check in to reveal");
        }
        RevealState::Active | RevealState::Expired => {
            let code = dashboard.door_code.as_deref().unwrap_or(redacted_credential());
            let _ = writeln!(out, "{}", countdown_line(code, dashboard.reveal.remaining_secs));
        }
    }

    if let Some(wifi) = &dashboard.wifi {
        let _ = writeln!(out, "WiFi: {} / {}", wifi.ssid, wifi.password);
        let _ = writeln!(out, "WiFi QR: {}", wifi.qr_payload);
    }

    if dashboard.reveal.state != RevealState::NotCheckedIn {
        section(&mut out, "House rules", &dashboard.rules);
        section(&mut out, "Guide", &dashboard.guides);
        section(&mut out, "Checkout", &dashboard.checkout_instructions);
    }

    if !dashboard.contact.is_empty() {
        let _ = writeln!(out, "\nContact: {}", dashboard.contact);
    }

    out
}

fn section(out: &mut String, title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for line in lines {
        let _ = writeln!(out, "  - {line}");
    }
}

/// One countdown status line
pub fn countdown_line(door_code: &str, remaining_secs: u32) -> String {
    format!("Door code: {door_code}  (available for {})", format_clock(remaining_secs))
}
