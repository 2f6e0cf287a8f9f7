//! CSV export of the declaration history.
//!
//! UTF-8 with a BOM prefix so spreadsheet programs detect the encoding, a
//! fixed 20-column French header, RFC 4180 quoting.

use chrono::NaiveDate;

use crate::Declaration;

pub const HEADER: [&str; 20] = [
    "N° Document",
    "Date",
    "Date Départ",
    "Client",
    "Destination",
    "Itinéraire",
    "Conducteur",
    "CIN Conducteur",
    "Téléphone Conducteur",
    "Modèle Véhicule",
    "Matricule Véhicule",
    "Convoyeur",
    "Carte de Contrôle Convoyeur",
    "CIN Convoyeur",
    "Téléphone Convoyeur",
    "Produits",
    "N° Passavant",
    "Expiration Passavant",
    "Bon de Livraison",
    "Date de Création",
];

/// Quote a field when it embeds a comma, quote, or newline.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row(decl: &Declaration) -> String {
    let products = decl
        .products
        .iter()
        .map(|p| format!("{} ({} {})", p.name, p.quantity, p.unit))
        .collect::<Vec<_>>()
        .join("; ");
    let itineraire = decl.itineraire.join(" - ");

    [
        decl.document_number.as_str(),
        decl.date.as_str(),
        decl.date_depart.as_str(),
        decl.client_name.as_str(),
        decl.destination.as_str(),
        itineraire.as_str(),
        decl.driver_name.as_str(),
        decl.driver_cin.as_str(),
        decl.driver_phone.as_str(),
        decl.vehicle_model.as_str(),
        decl.vehicle_matricule.as_str(),
        decl.convoyeur_name.as_str(),
        decl.convoyeur_card.as_str(),
        decl.convoyeur_cin.as_str(),
        decl.convoyeur_phone.as_str(),
        products.as_str(),
        decl.passavant_number.as_str(),
        decl.passavant_expiry.as_str(),
        decl.bon_livraison.as_str(),
        decl.timestamp.as_str(),
    ]
    .map(escape)
    .join(",")
}

/// Render `records` in their current order. The output always starts with
/// the BOM and the header line, even for an empty history.
pub fn to_csv(records: &[Declaration]) -> String {
    let mut out = String::from("\u{feff}");
    out.push_str(&HEADER.join(","));
    out.push('\n');
    for decl in records {
        out.push_str(&row(decl));
        out.push('\n');
    }
    out
}

/// `declarations_<ISO-date>.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("declarations_{}.csv", date.format("%Y-%m-%d"))
}
