//! Vertical card display for declarations.
//!
//! Renders a single declaration as a grouped, human-readable card and the
//! history as a paginated table.

use convoi_core::{Declaration, query};
use convoi_store::HistoryPage;

const PAD: usize = 22;

// ── Public API ──

/// Print a single declaration as a vertical card grouped by form section.
pub fn print_declaration_card(decl: &Declaration) {
    println!("=== Déclaration {} ===", decl.document_number);
    println!();

    println!("Document");
    field("date", &query::date_fr(&decl.date));
    field("date de départ", &decl.date_depart);
    field("enregistrée le", &decl.timestamp);
    println!();

    println!("Client");
    field("nom", &decl.client_name);
    field("destination", &decl.destination);
    if !decl.itineraire.is_empty() {
        field("itinéraire", &decl.itineraire.join(" - "));
    }
    println!();

    println!("Chauffeur");
    field("nom", &decl.driver_name);
    field("CIN", &decl.driver_cin);
    field("téléphone", &decl.driver_phone);
    field("matricule", &decl.vehicle_matricule);
    field("modèle", &decl.vehicle_model);
    println!();

    println!("Convoyeur");
    field("nom", &decl.convoyeur_name);
    field("carte CCE", &decl.convoyeur_card);
    field("CIN", &decl.convoyeur_cin);
    field("téléphone", &decl.convoyeur_phone);
    println!();

    if !decl.products.is_empty() {
        println!("Produits");
        for line in &decl.products {
            println!("  - {} ({} {})", line.name, line.quantity, line.unit);
        }
        println!();
    }

    println!("Annexes");
    field("passavant", &decl.passavant_number);
    field("expiration", &decl.passavant_expiry);
    field("bon de livraison", &decl.bon_livraison);
}

/// Print one page of the history as a numbered table. Row numbers are
/// global across pages so `show`/`delete` can take them directly.
pub fn print_history_table(page: &HistoryPage, page_size: usize) {
    if page.items.is_empty() {
        println!("Aucune déclaration trouvée.");
        return;
    }

    println!(
        "{:>4}  {:<10} {:<12} {:<20} {:<20} {:<20}",
        "#", "N°", "Date", "Client", "Chauffeur", "Destination"
    );
    let first = (page.page - 1) * page_size;
    for (i, decl) in page.items.iter().enumerate() {
        println!(
            "{:>4}  {:<10} {:<12} {:<20} {:<20} {:<20}",
            first + i + 1,
            decl.document_number,
            query::date_fr(&decl.date),
            truncate(&decl.client_name, 20),
            truncate(&decl.driver_name, 20),
            truncate(&decl.destination, 20),
        );
    }
    println!();
    println!(
        "page {}/{} ({} déclarations)",
        page.page, page.total_pages, page.total
    );
}

// ── Helpers ──

fn field(label: &str, value: &str) {
    if !value.is_empty() {
        println!("  {:<PAD$} {}", label, value);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
