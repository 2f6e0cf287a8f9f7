//! Record types for transport declarations and their reference entities.
//!
//! Serialized field names keep the camelCase keys of the historical cache
//! payloads and spreadsheet files (`documentNumber`, `driverCIN`,
//! `itineraire`, …), so data written by earlier deployments stays readable.

use serde::{Deserialize, Serialize};

/// A record addressable by its unique integer id.
///
/// Declaration ids are millisecond timestamps; reference entities use small
/// sequential ids. Either way `i64` covers them.
pub trait Record: Clone {
    fn id(&self) -> i64;
}

/// A client with a standard destination and route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub destination: String,
    /// Ordered waypoints of the client's standard route. Always a sequence
    /// in memory; the spreadsheet mirror is the only place it is flattened.
    #[serde(default)]
    pub itineraire: Vec<String>,
}

impl Record for Client {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Vehicle descriptor, owned exclusively by its driver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub matricule: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub cin: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub vehicle: Vehicle,
}

impl Record for Driver {
    fn id(&self) -> i64 {
        self.id
    }
}

/// An escort/controller accompanying a shipment, distinct from the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Convoyeur {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub cin: String,
    #[serde(default)]
    pub phone: String,
    /// Control-card number; not every convoyeur carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cce: Option<String>,
}

impl Record for Convoyeur {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Unit of measure (Kg, Litre, …).
    #[serde(default)]
    pub unit: String,
}

impl Record for Product {
    fn id(&self) -> i64 {
        self.id
    }
}

/// One product line of a declaration. Quantities are kept as entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub name: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

/// A single transport-manifest record.
///
/// Client, driver, and convoyeur fields are denormalized snapshots taken at
/// creation or edit time; later changes to the reference entities do not
/// rewrite past declarations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    /// Millisecond timestamp at creation; kept across edits.
    pub id: i64,
    /// ISO 8601 creation instant. Set once, never changed by edits.
    pub timestamp: String,
    /// `N/YEAR`, unique per calendar year.
    pub document_number: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub date_depart: String,
    pub client_id: i64,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub itineraire: Vec<String>,
    pub driver_id: i64,
    #[serde(default)]
    pub driver_name: String,
    #[serde(rename = "driverCIN", default)]
    pub driver_cin: String,
    #[serde(default)]
    pub driver_phone: String,
    #[serde(default)]
    pub vehicle_matricule: String,
    #[serde(default)]
    pub vehicle_model: String,
    pub convoyeur_id: i64,
    #[serde(default)]
    pub convoyeur_name: String,
    #[serde(default)]
    pub convoyeur_card: String,
    #[serde(rename = "convoyeurCIN", default)]
    pub convoyeur_cin: String,
    #[serde(default)]
    pub convoyeur_phone: String,
    #[serde(default)]
    pub products: Vec<ProductLine>,
    #[serde(default)]
    pub passavant_number: String,
    #[serde(default)]
    pub passavant_expiry: String,
    #[serde(default)]
    pub bon_livraison: String,
}

impl Record for Declaration {
    fn id(&self) -> i64 {
        self.id
    }
}

// ── Dependent-field derivation ──
//
// Selecting a client, driver, or convoyeur auto-fills the dependent form
// fields. These are plain value conversions the presentation layer calls
// directly; no event simulation involved.

/// Form fields derived from a selected client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientFields {
    pub destination: String,
    pub itineraire: Vec<String>,
}

impl From<&Client> for ClientFields {
    fn from(client: &Client) -> Self {
        Self {
            destination: client.destination.clone(),
            itineraire: client.itineraire.clone(),
        }
    }
}

/// Form fields derived from a selected driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverFields {
    pub cin: String,
    pub phone: String,
    pub vehicle_matricule: String,
    pub vehicle_model: String,
}

impl From<&Driver> for DriverFields {
    fn from(driver: &Driver) -> Self {
        Self {
            cin: driver.cin.clone(),
            phone: driver.phone.clone(),
            vehicle_matricule: driver.vehicle.matricule.clone(),
            vehicle_model: driver.vehicle.model.clone(),
        }
    }
}

/// Form fields derived from a selected convoyeur.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvoyeurFields {
    pub card: String,
    pub cin: String,
    pub phone: String,
}

impl From<&Convoyeur> for ConvoyeurFields {
    fn from(convoyeur: &Convoyeur) -> Self {
        Self {
            card: convoyeur.cce.clone().unwrap_or_default(),
            cin: convoyeur.cin.clone(),
            phone: convoyeur.phone.clone(),
        }
    }
}
