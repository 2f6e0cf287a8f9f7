//! Flat tabular representation of records for the spreadsheet mirror.
//!
//! Column layouts match the historical workbook files: sequence-valued
//! fields are joined into one delimited cell, the driver's nested vehicle
//! expands into `vehicle.matricule` / `vehicle.model` columns, and a
//! declaration's product lines are stored as one JSON cell (explicit and
//! self-describing; only this mirror ever reads it back).

use convoi_core::{Client, Convoyeur, Declaration, Driver, Product, ProductLine, Record, Vehicle};
use tracing::warn;

/// A decoded single-sheet table: header row plus string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn column(&self, key: &str) -> Option<usize> {
        self.header.iter().position(|h| h == key)
    }
}

/// Cell under `key` for `row`, empty when the column or cell is missing.
/// Columns are resolved by header name, so files written with a different
/// column order still read correctly.
fn cell<'a>(sheet: &Sheet, row: &'a [String], key: &str) -> &'a str {
    sheet
        .column(key)
        .and_then(|i| row.get(i))
        .map(String::as_str)
        .unwrap_or("")
}

fn cell_id(sheet: &Sheet, row: &[String], key: &str) -> Option<i64> {
    cell(sheet, row, key).trim().parse().ok()
}

/// `["Point A", "Point B"]` → `"Point A, Point B"`.
pub fn join_waypoints(items: &[String]) -> String {
    items.join(", ")
}

/// Exact inverse of [`join_waypoints`] for trimmed, comma-free entries:
/// split on commas, trim, drop empty segments.
pub fn split_waypoints(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Binds a record type to its workbook layout.
pub trait SheetRecord: Record {
    /// Workbook file name, e.g. `clients.xlsx`.
    const FILE: &'static str;
    /// Fixed French sheet label.
    const SHEET: &'static str;

    fn header() -> &'static [&'static str];
    fn to_row(&self) -> Vec<String>;
    fn from_row(sheet: &Sheet, row: &[String]) -> Option<Self>
    where
        Self: Sized;

    /// Column/value pairs that identify an already-present row during an
    /// append. A row matching any pair is a duplicate.
    fn identity(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id().to_string())]
    }
}

/// Build the canonical sheet for a batch of records.
pub fn build_sheet<T: SheetRecord>(records: &[T]) -> Sheet {
    Sheet {
        name: T::SHEET.to_string(),
        header: T::header().iter().map(|h| (*h).to_string()).collect(),
        rows: records.iter().map(SheetRecord::to_row).collect(),
    }
}

/// Reconstruct records from a decoded sheet, skipping rows whose id does
/// not parse.
pub fn records_from_sheet<T: SheetRecord>(sheet: &Sheet) -> Vec<T> {
    let mut records = Vec::with_capacity(sheet.rows.len());
    for row in &sheet.rows {
        match T::from_row(sheet, row) {
            Some(record) => records.push(record),
            None => warn!(sheet = %sheet.name, ?row, "skipping row without a usable id"),
        }
    }
    records
}

impl SheetRecord for Client {
    const FILE: &'static str = "clients.xlsx";
    const SHEET: &'static str = "Clients";

    fn header() -> &'static [&'static str] {
        &["id", "name", "destination", "itineraire"]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.destination.clone(),
            join_waypoints(&self.itineraire),
        ]
    }

    fn from_row(sheet: &Sheet, row: &[String]) -> Option<Self> {
        Some(Self {
            id: cell_id(sheet, row, "id")?,
            name: cell(sheet, row, "name").to_string(),
            destination: cell(sheet, row, "destination").to_string(),
            itineraire: split_waypoints(cell(sheet, row, "itineraire")),
        })
    }
}

impl SheetRecord for Driver {
    const FILE: &'static str = "drivers.xlsx";
    const SHEET: &'static str = "Conducteurs";

    fn header() -> &'static [&'static str] {
        &["id", "name", "cin", "phone", "vehicle.matricule", "vehicle.model"]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.cin.clone(),
            self.phone.clone(),
            self.vehicle.matricule.clone(),
            self.vehicle.model.clone(),
        ]
    }

    fn from_row(sheet: &Sheet, row: &[String]) -> Option<Self> {
        Some(Self {
            id: cell_id(sheet, row, "id")?,
            name: cell(sheet, row, "name").to_string(),
            cin: cell(sheet, row, "cin").to_string(),
            phone: cell(sheet, row, "phone").to_string(),
            vehicle: Vehicle {
                matricule: cell(sheet, row, "vehicle.matricule").to_string(),
                model: cell(sheet, row, "vehicle.model").to_string(),
            },
        })
    }
}

impl SheetRecord for Convoyeur {
    const FILE: &'static str = "convoyeurs.xlsx";
    const SHEET: &'static str = "Convoyeurs";

    fn header() -> &'static [&'static str] {
        &["id", "name", "cin", "phone", "cce"]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.cin.clone(),
            self.phone.clone(),
            self.cce.clone().unwrap_or_default(),
        ]
    }

    fn from_row(sheet: &Sheet, row: &[String]) -> Option<Self> {
        let cce = cell(sheet, row, "cce");
        Some(Self {
            id: cell_id(sheet, row, "id")?,
            name: cell(sheet, row, "name").to_string(),
            cin: cell(sheet, row, "cin").to_string(),
            phone: cell(sheet, row, "phone").to_string(),
            cce: (!cce.is_empty()).then(|| cce.to_string()),
        })
    }
}

impl SheetRecord for Product {
    const FILE: &'static str = "products.xlsx";
    const SHEET: &'static str = "Produits";

    fn header() -> &'static [&'static str] {
        &["id", "name", "unit"]
    }

    fn to_row(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone(), self.unit.clone()]
    }

    fn from_row(sheet: &Sheet, row: &[String]) -> Option<Self> {
        Some(Self {
            id: cell_id(sheet, row, "id")?,
            name: cell(sheet, row, "name").to_string(),
            unit: cell(sheet, row, "unit").to_string(),
        })
    }
}

impl SheetRecord for Declaration {
    const FILE: &'static str = "history.xlsx";
    const SHEET: &'static str = "Historique";

    fn header() -> &'static [&'static str] {
        &[
            "id",
            "timestamp",
            "documentNumber",
            "date",
            "dateDepart",
            "clientId",
            "clientName",
            "destination",
            "itineraire",
            "driverId",
            "driverName",
            "driverCIN",
            "driverPhone",
            "vehicleMatricule",
            "vehicleModel",
            "convoyeurId",
            "convoyeurName",
            "convoyeurCard",
            "convoyeurCIN",
            "convoyeurPhone",
            "products",
            "passavantNumber",
            "passavantExpiry",
            "bonLivraison",
        ]
    }

    fn to_row(&self) -> Vec<String> {
        let products =
            serde_json::to_string(&self.products).unwrap_or_else(|_| String::from("[]"));
        vec![
            self.id.to_string(),
            self.timestamp.clone(),
            self.document_number.clone(),
            self.date.clone(),
            self.date_depart.clone(),
            self.client_id.to_string(),
            self.client_name.clone(),
            self.destination.clone(),
            join_waypoints(&self.itineraire),
            self.driver_id.to_string(),
            self.driver_name.clone(),
            self.driver_cin.clone(),
            self.driver_phone.clone(),
            self.vehicle_matricule.clone(),
            self.vehicle_model.clone(),
            self.convoyeur_id.to_string(),
            self.convoyeur_name.clone(),
            self.convoyeur_card.clone(),
            self.convoyeur_cin.clone(),
            self.convoyeur_phone.clone(),
            products,
            self.passavant_number.clone(),
            self.passavant_expiry.clone(),
            self.bon_livraison.clone(),
        ]
    }

    fn from_row(sheet: &Sheet, row: &[String]) -> Option<Self> {
        let products_json = cell(sheet, row, "products");
        let products: Vec<ProductLine> = if products_json.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(products_json).unwrap_or_else(|err| {
                warn!(%err, "unreadable product lines cell, keeping empty");
                Vec::new()
            })
        };
        Some(Self {
            id: cell_id(sheet, row, "id")?,
            timestamp: cell(sheet, row, "timestamp").to_string(),
            document_number: cell(sheet, row, "documentNumber").to_string(),
            date: cell(sheet, row, "date").to_string(),
            date_depart: cell(sheet, row, "dateDepart").to_string(),
            client_id: cell_id(sheet, row, "clientId").unwrap_or(0),
            client_name: cell(sheet, row, "clientName").to_string(),
            destination: cell(sheet, row, "destination").to_string(),
            itineraire: split_waypoints(cell(sheet, row, "itineraire")),
            driver_id: cell_id(sheet, row, "driverId").unwrap_or(0),
            driver_name: cell(sheet, row, "driverName").to_string(),
            driver_cin: cell(sheet, row, "driverCIN").to_string(),
            driver_phone: cell(sheet, row, "driverPhone").to_string(),
            vehicle_matricule: cell(sheet, row, "vehicleMatricule").to_string(),
            vehicle_model: cell(sheet, row, "vehicleModel").to_string(),
            convoyeur_id: cell_id(sheet, row, "convoyeurId").unwrap_or(0),
            convoyeur_name: cell(sheet, row, "convoyeurName").to_string(),
            convoyeur_card: cell(sheet, row, "convoyeurCard").to_string(),
            convoyeur_cin: cell(sheet, row, "convoyeurCIN").to_string(),
            convoyeur_phone: cell(sheet, row, "convoyeurPhone").to_string(),
            products,
            passavant_number: cell(sheet, row, "passavantNumber").to_string(),
            passavant_expiry: cell(sheet, row, "passavantExpiry").to_string(),
            bon_livraison: cell(sheet, row, "bonLivraison").to_string(),
        })
    }

    /// A declaration row is a duplicate when either the id or the document
    /// number is already present.
    fn identity(&self) -> Vec<(&'static str, String)> {
        let mut keys = vec![("id", self.id.to_string())];
        if !self.document_number.is_empty() {
            keys.push(("documentNumber", self.document_number.clone()));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: SheetRecord + PartialEq + std::fmt::Debug>(record: T) {
        let sheet = build_sheet(std::slice::from_ref(&record));
        let restored = T::from_row(&sheet, &sheet.rows[0]).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn client_row_round_trips() {
        round_trip(Client {
            id: 4,
            name: "ABC Company".into(),
            destination: "ABC Warehouse".into(),
            itineraire: vec!["Route 1".into(), "Route 2".into()],
        });
    }

    #[test]
    fn driver_vehicle_flattens_to_dotted_columns() {
        let driver = Driver {
            id: 1,
            name: "Ahmed Benali".into(),
            cin: "AB123456".into(),
            phone: "0612345678".into(),
            vehicle: Vehicle {
                matricule: "12345-A-56".into(),
                model: "Mercedes Actros".into(),
            },
        };
        let sheet = build_sheet(std::slice::from_ref(&driver));
        let col = sheet.column("vehicle.matricule").unwrap();
        assert_eq!(sheet.rows[0][col], "12345-A-56");
        round_trip(driver);
    }

    #[test]
    fn convoyeur_without_card_round_trips_to_none() {
        round_trip(Convoyeur {
            id: 3,
            name: "Karim Bensaid".into(),
            cin: "KB555666".into(),
            phone: "0667890123".into(),
            cce: None,
        });
    }

    #[test]
    fn declaration_products_round_trip_through_json_cell() {
        round_trip(Declaration {
            id: 1_700_000_000_000,
            timestamp: "2023-11-14T22:13:20.000Z".into(),
            document_number: "3/2023".into(),
            itineraire: vec!["Point A".into(), "Point B".into()],
            products: vec![
                ProductLine {
                    name: "Produit A".into(),
                    quantity: "10".into(),
                    unit: "Kg".into(),
                },
                ProductLine {
                    name: "Produit B".into(),
                    quantity: "2.5".into(),
                    unit: "Tonnes".into(),
                },
            ],
            ..Declaration::default()
        });
    }

    #[test]
    fn waypoint_split_trims_and_drops_empties() {
        assert_eq!(
            split_waypoints("Point A,  Point B , ,Point C,"),
            ["Point A", "Point B", "Point C"]
        );
        assert!(split_waypoints("").is_empty());
    }

    #[test]
    fn columns_resolve_by_name_not_position() {
        let sheet = Sheet {
            name: "Produits".into(),
            header: vec!["unit".into(), "id".into(), "name".into()],
            rows: vec![vec!["Kg".into(), "2".into(), "Produit B".into()]],
        };
        let product = Product::from_row(&sheet, &sheet.rows[0]).unwrap();
        assert_eq!(product.id, 2);
        assert_eq!(product.name, "Produit B");
        assert_eq!(product.unit, "Kg");
    }

    #[test]
    fn rows_without_ids_are_dropped() {
        let sheet = Sheet {
            name: "Produits".into(),
            header: vec!["id".into(), "name".into(), "unit".into()],
            rows: vec![
                vec!["1".into(), "Produit A".into(), "Kg".into()],
                vec!["".into(), "sans id".into(), "Kg".into()],
            ],
        };
        let products: Vec<Product> = records_from_sheet(&sheet);
        assert_eq!(products.len(), 1);
    }
}
