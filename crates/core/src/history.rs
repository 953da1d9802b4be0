//! Guest history export

use crate::models::{AccessGrant, Property};

const HEADER: &str = "Guest Name,Check-in,Check-out,Booking Code,Door Code,Status,Issued At";

/// Render a property's guest history as CSV, latest stay first
pub fn export_guest_history(property: &Property, grants: &[AccessGrant]) -> String {
    let mut rows: Vec<&AccessGrant> = grants
        .iter()
        .filter(|g| g.property_id == property.id)
        .collect();
    rows.sort_by(|a, b| b.check_in.cmp(&a.check_in));

    let mut out = String::from(HEADER);
    for grant in rows {
        let name = if grant.guest_name.trim().is_empty() {
            "Unnamed"
        } else {
            grant.guest_name.trim()
        };
        let status = if grant.checkin_status { "Checked in" } else { "Pending" };
        let issued = grant
            .issued_at
            .clone()
            .map(String::from)
            .unwrap_or_else(|| "-".to_string());

        out.push('\n');
        out.push_str(
            &[
                quote(name),
                quote(&date_cell(grant.check_in)),
                quote(&date_cell(grant.check_out)),
                quote(&grant.booking_code),
                quote(&grant.door_code),
                quote(status),
                quote(&issued),
            ]
            .join(","),
        );
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

/// File name for a property's export
pub fn export_file_name(property: &Property) -> String {
    let name: Vec<&str> = property.building_name.split_whitespace().collect();
    format!("Report_{}.csv", name.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Owner, OwnerRole};
    use crate::reveal::IssuedAt;
    use chrono::NaiveDate;

    #[test]
    fn test_export_orders_and_formats_rows() {
        let owner = Owner::new("Host", "T", OwnerRole::Owner);
        let mut property = Property::draft(&owner);
        property.building_name = "Sea  View Loft".to_string();
        let date = |d| NaiveDate::from_ymd_opt(2026, 10, d).unwrap();

        let old = AccessGrant::new(property.id, "", "OLD", "1").with_stay(date(1), date(2));
        let mut new = AccessGrant::new(property.id, "Ana \"Ani\"", "NEW", "2")
            .with_stay(date(5), date(9));
        new.checkin_status = true;
        new.issued_at = Some(IssuedAt::from_epoch_millis(1_700_000_000_000));
        let elsewhere = AccessGrant::new(uuid::Uuid::new_v4(), "X", "OTHER", "3");

        let csv = export_guest_history(&property, &[old, new, elsewhere]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(
            lines[1],
            r#""Ana ""Ani""","2026-10-05","2026-10-09","NEW","2","Checked in","2023-11-14T22:13:20+00:00""#
        );
        assert_eq!(
            lines[2],
            r#""Unnamed","2026-10-01","2026-10-02","OLD","1","Pending","-""#
        );
        assert_eq!(export_file_name(&property), "Report_Sea_View_Loft.csv");
    }

    #[test]
    fn test_export_quotes_commas_and_quotes_in_every_field() {
        let owner = Owner::new("Host", "T", OwnerRole::Owner);
        let property = Property::draft(&owner);

        let mut legacy = AccessGrant::new(property.id, "Ana", "LEGACY", "12,\"34");
        legacy.checkin_status = true;
        legacy.issued_at = IssuedAt::parse("17/10/2026, 14:03:22");

        let csv = export_guest_history(&property, &[legacy]);
        let row = csv.lines().nth(1).unwrap();

        assert_eq!(
            row,
            r#""Ana","","","LEGACY","12,""34","Checked in","17/10/2026, 14:03:22""#
        );
    }
}
