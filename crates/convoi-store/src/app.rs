//! Application state and command handlers.
//!
//! One object owns the five record stores plus both mirrors; every user
//! action of the form layer is a method taking a typed request and
//! returning a typed result. The presentation layer never touches the
//! stores directly.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use convoi_core::{
    Client, ClientFields, Convoyeur, ConvoyeurFields, Declaration, Driver, DriverFields, Product,
    ProductLine, Vehicle, csv, docnum, query,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::StoreError;
use crate::cache::{
    CLIENTS_KEY, CONVOYEURS_KEY, CURRENT_KEY, CacheMirror, DRIVERS_KEY, EDITING_KEY, HISTORY_KEY,
    LAST_DOCNUM_KEY, PRODUCTS_KEY,
};
use crate::mirror::SpreadsheetMirror;
use crate::sheet::SheetRecord;
use crate::store::{RecordStore, merge_by_id};

pub struct App {
    cache: CacheMirror,
    mirror: SpreadsheetMirror,
    clients: RecordStore<Client>,
    drivers: RecordStore<Driver>,
    convoyeurs: RecordStore<Convoyeur>,
    products: RecordStore<Product>,
    history: RecordStore<Declaration>,
}

// ── Typed requests ──

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub destination: String,
    pub itineraire: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewDriver {
    pub name: String,
    pub cin: String,
    pub phone: String,
    pub vehicle: Vehicle,
}

#[derive(Debug, Clone, Default)]
pub struct NewConvoyeur {
    pub name: String,
    pub cin: String,
    pub phone: String,
    pub cce: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub unit: String,
}

/// Everything the declaration form submits. `None` on an override field
/// means "use the value derived from the selected entity".
#[derive(Debug, Clone, Default)]
pub struct DeclarationRequest {
    pub document_number: Option<String>,
    pub date: String,
    pub date_depart: String,
    pub client_id: i64,
    pub driver_id: i64,
    pub convoyeur_id: i64,
    pub destination: Option<String>,
    pub driver_cin: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_matricule: Option<String>,
    pub vehicle_model: Option<String>,
    pub convoyeur_card: Option<String>,
    pub convoyeur_cin: Option<String>,
    pub convoyeur_phone: Option<String>,
    pub products: Vec<ProductLine>,
    pub passavant_number: String,
    pub passavant_expiry: String,
    pub bon_livraison: String,
}

/// One page of the (sorted, filtered) history.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub items: Vec<Declaration>,
    pub page: usize,
    pub total_pages: usize,
    /// Total matching records across all pages.
    pub total: usize,
}

impl App {
    /// Hydrate every store: cache first, workbook fallback. A store filled
    /// from its workbook is written back to the cache for offline use.
    pub fn open(mut cache: CacheMirror, mirror: SpreadsheetMirror) -> Self {
        let clients = hydrate(&mut cache, &mirror, CLIENTS_KEY);
        let drivers = hydrate(&mut cache, &mirror, DRIVERS_KEY);
        let convoyeurs = hydrate(&mut cache, &mirror, CONVOYEURS_KEY);
        let products = hydrate(&mut cache, &mirror, PRODUCTS_KEY);
        let mut history: RecordStore<Declaration> = hydrate(&mut cache, &mirror, HISTORY_KEY);
        query::sort_newest_first(history.as_mut_slice());
        Self {
            cache,
            mirror,
            clients,
            drivers,
            convoyeurs,
            products,
            history,
        }
    }

    pub fn clients(&self) -> &[Client] {
        self.clients.records()
    }

    pub fn drivers(&self) -> &[Driver] {
        self.drivers.records()
    }

    pub fn convoyeurs(&self) -> &[Convoyeur] {
        self.convoyeurs.records()
    }

    pub fn products(&self) -> &[Product] {
        self.products.records()
    }

    pub fn history(&self) -> &[Declaration] {
        self.history.records()
    }

    // ── Reference entities ──

    pub fn add_client(&mut self, req: NewClient) -> Result<Client, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::MissingField("name"));
        }
        if req.destination.trim().is_empty() {
            return Err(StoreError::MissingField("destination"));
        }
        let client = Client {
            id: self.clients.next_id(),
            name: req.name,
            destination: req.destination,
            itineraire: req.itineraire,
        };
        self.clients.push(client.clone());
        self.cache.write(CLIENTS_KEY, self.clients.records());
        self.mirror.write_all(self.clients.records());
        info!(id = client.id, name = %client.name, "client added");
        Ok(client)
    }

    pub fn add_driver(&mut self, req: NewDriver) -> Result<Driver, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::MissingField("name"));
        }
        let driver = Driver {
            id: self.drivers.next_id(),
            name: req.name,
            cin: req.cin,
            phone: req.phone,
            vehicle: req.vehicle,
        };
        self.drivers.push(driver.clone());
        self.cache.write(DRIVERS_KEY, self.drivers.records());
        self.mirror.write_all(self.drivers.records());
        info!(id = driver.id, name = %driver.name, "driver added");
        Ok(driver)
    }

    pub fn add_convoyeur(&mut self, req: NewConvoyeur) -> Result<Convoyeur, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::MissingField("name"));
        }
        let convoyeur = Convoyeur {
            id: self.convoyeurs.next_id(),
            name: req.name,
            cin: req.cin,
            phone: req.phone,
            cce: req.cce.filter(|c| !c.trim().is_empty()),
        };
        self.convoyeurs.push(convoyeur.clone());
        self.cache.write(CONVOYEURS_KEY, self.convoyeurs.records());
        self.mirror.write_all(self.convoyeurs.records());
        info!(id = convoyeur.id, name = %convoyeur.name, "convoyeur added");
        Ok(convoyeur)
    }

    pub fn add_product(&mut self, req: NewProduct) -> Result<Product, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::MissingField("name"));
        }
        if req.unit.trim().is_empty() {
            return Err(StoreError::MissingField("unit"));
        }
        let product = Product {
            id: self.products.next_id(),
            name: req.name,
            unit: req.unit,
        };
        self.products.push(product.clone());
        self.cache.write(PRODUCTS_KEY, self.products.records());
        self.mirror.write_all(self.products.records());
        info!(id = product.id, name = %product.name, "product added");
        Ok(product)
    }

    // ── Declarations ──

    /// Arm edit mode for the given declaration and return it so the form
    /// can be repopulated. The flag survives restarts via the cache.
    pub fn begin_edit(&mut self, id: i64) -> Result<Declaration, StoreError> {
        let decl = self
            .history
            .get(id)
            .cloned()
            .ok_or(StoreError::UnknownId {
                kind: "declaration",
                id,
            })?;
        self.cache.write_scalar(EDITING_KEY, &id.to_string());
        Ok(decl)
    }

    pub fn cancel_edit(&mut self) {
        self.cache.remove(EDITING_KEY);
    }

    /// Create a declaration, or replace the one armed via [`begin_edit`].
    ///
    /// Edits keep the original id and timestamp and replace every other
    /// field. New declarations get a timestamp-derived id, a creation
    /// instant, and the next document number when the request carries
    /// none.
    ///
    /// [`begin_edit`]: Self::begin_edit
    pub fn submit_declaration(
        &mut self,
        req: DeclarationRequest,
    ) -> Result<Declaration, StoreError> {
        if req.date.trim().is_empty() {
            return Err(StoreError::MissingField("date"));
        }
        let client = self
            .clients
            .get(req.client_id)
            .ok_or(StoreError::UnknownId {
                kind: "client",
                id: req.client_id,
            })?
            .clone();
        let driver = self
            .drivers
            .get(req.driver_id)
            .ok_or(StoreError::UnknownId {
                kind: "driver",
                id: req.driver_id,
            })?
            .clone();
        let convoyeur = self
            .convoyeurs
            .get(req.convoyeur_id)
            .ok_or(StoreError::UnknownId {
                kind: "convoyeur",
                id: req.convoyeur_id,
            })?
            .clone();

        let editing = self
            .cache
            .read_scalar(EDITING_KEY)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(|id| self.history.get(id).cloned());
        let (id, timestamp, is_edit) = match &editing {
            Some(original) => (original.id, original.timestamp.clone(), true),
            None => {
                let now = Utc::now();
                (
                    now.timestamp_millis(),
                    now.to_rfc3339_opts(SecondsFormat::Millis, true),
                    false,
                )
            }
        };

        let document_number = match req.document_number.filter(|n| !n.trim().is_empty()) {
            Some(number) => number,
            None => self.next_document_number(),
        };

        let client_fields = ClientFields::from(&client);
        let driver_fields = DriverFields::from(&driver);
        let convoyeur_fields = ConvoyeurFields::from(&convoyeur);
        let declaration = Declaration {
            id,
            timestamp,
            document_number,
            date: req.date,
            date_depart: req.date_depart,
            client_id: client.id,
            client_name: client.name,
            destination: req.destination.unwrap_or(client_fields.destination),
            itineraire: client_fields.itineraire,
            driver_id: driver.id,
            driver_name: driver.name,
            driver_cin: req.driver_cin.unwrap_or(driver_fields.cin),
            driver_phone: req.driver_phone.unwrap_or(driver_fields.phone),
            vehicle_matricule: req
                .vehicle_matricule
                .unwrap_or(driver_fields.vehicle_matricule),
            vehicle_model: req.vehicle_model.unwrap_or(driver_fields.vehicle_model),
            convoyeur_id: convoyeur.id,
            convoyeur_name: convoyeur.name,
            convoyeur_card: req.convoyeur_card.unwrap_or(convoyeur_fields.card),
            convoyeur_cin: req.convoyeur_cin.unwrap_or(convoyeur_fields.cin),
            convoyeur_phone: req.convoyeur_phone.unwrap_or(convoyeur_fields.phone),
            products: req.products,
            passavant_number: req.passavant_number,
            passavant_expiry: req.passavant_expiry,
            bon_livraison: req.bon_livraison,
        };

        self.history.upsert(declaration.clone());
        query::sort_newest_first(self.history.as_mut_slice());
        self.cache.write(HISTORY_KEY, self.history.records());

        if is_edit {
            self.cache.remove(EDITING_KEY);
            self.mirror.write_all(self.history.records());
            info!(id, number = %declaration.document_number, "declaration updated");
        } else {
            if !self.mirror.append_row(&declaration) {
                warn!("workbook append unavailable, rewriting history file");
                self.mirror.write_all(self.history.records());
            }
            info!(id, number = %declaration.document_number, "declaration recorded");
        }

        match serde_json::to_string(&declaration) {
            Ok(json) => self.cache.write_scalar(CURRENT_KEY, &json),
            Err(err) => warn!(%err, "could not stash current declaration"),
        }
        Ok(declaration)
    }

    /// Remove the declaration at `index` of the newest-first ordering. The
    /// remaining records keep their relative order.
    pub fn delete_declaration(&mut self, index: usize) -> Result<Declaration, StoreError> {
        query::sort_newest_first(self.history.as_mut_slice());
        if index >= self.history.len() {
            return Err(StoreError::NoSuchIndex(index));
        }
        let removed = self.history.remove_at(index);
        self.cache.write(HISTORY_KEY, self.history.records());
        self.mirror.write_all(self.history.records());
        info!(id = removed.id, number = %removed.document_number, "declaration deleted");
        Ok(removed)
    }

    /// Merge a workbook into the history. File rows are the base and win on
    /// id collision, so re-importing the same file admits nothing new.
    /// Returns the number of records the import added.
    pub fn import_history(&mut self, bytes: &[u8]) -> Result<usize, StoreError> {
        let incoming: Vec<Declaration> = self.mirror.decode_records(bytes)?;
        let local = std::mem::take(&mut self.history).into_records();
        // Count distinct new ids directly; the local side may hold
        // duplicate ids from an old cache payload, which the merge
        // collapses.
        let mut new_ids: HashSet<i64> = incoming.iter().map(|d| d.id).collect();
        for decl in &local {
            new_ids.remove(&decl.id);
        }
        let added = new_ids.len();
        let (merged, _) = merge_by_id(incoming, local);
        self.history = RecordStore::from_records(merged);
        query::sort_newest_first(self.history.as_mut_slice());
        self.cache.write(HISTORY_KEY, self.history.records());
        self.mirror.write_all(self.history.records());
        info!(added, total = self.history.len(), "history imported");
        Ok(added)
    }

    /// Drop the whole history and its document-number counter.
    pub fn clear_history(&mut self) {
        self.history = RecordStore::default();
        self.cache.remove(HISTORY_KEY);
        self.cache.remove(LAST_DOCNUM_KEY);
        self.mirror.write_all::<Declaration>(&[]);
        info!("history cleared");
    }

    /// Rewrite all five workbook files from current state. Returns how many
    /// files were written.
    pub fn write_all_files(&self) -> usize {
        [
            self.mirror.write_all(self.clients.records()),
            self.mirror.write_all(self.drivers.records()),
            self.mirror.write_all(self.convoyeurs.records()),
            self.mirror.write_all(self.products.records()),
            self.mirror.write_all(self.history.records()),
        ]
        .iter()
        .filter(|ok| **ok)
        .count()
    }

    // ── Read-side views ──

    pub fn list_history(&self, page: usize, page_size: usize, filter: &str) -> HistoryPage {
        let mut sorted = self.history.records().to_vec();
        query::sort_newest_first(&mut sorted);
        let filtered = query::filter(&sorted, filter);
        let total = filtered.len();
        let (items, total_pages) = query::paginate(&filtered, page, page_size);
        HistoryPage {
            items,
            page,
            total_pages,
            total,
        }
    }

    /// CSV export of the full sorted history: `(filename, contents)`.
    pub fn export_csv(&self) -> (String, String) {
        let mut sorted = self.history.records().to_vec();
        query::sort_newest_first(&mut sorted);
        let filename = csv::export_filename(chrono::Local::now().date_naive());
        (filename, csv::to_csv(&sorted))
    }

    /// Allocate and persist the next document number for the current year.
    pub fn next_document_number(&mut self) -> String {
        let last = self.cache.read_counter(LAST_DOCNUM_KEY);
        let (number, counter) =
            docnum::next_document_number(self.history.records(), last, docnum::current_year());
        self.cache.write_counter(LAST_DOCNUM_KEY, counter);
        number
    }
}

/// Cache-first hydration with workbook fallback and cache write-back.
fn hydrate<T>(cache: &mut CacheMirror, mirror: &SpreadsheetMirror, key: &str) -> RecordStore<T>
where
    T: SheetRecord + Serialize + DeserializeOwned,
{
    let payload = cache.payload(key);
    let cached = RecordStore::load(payload.as_deref(), Vec::new());
    if !cached.is_empty() {
        info!(key, count = cached.len(), "hydrated from cache");
        return cached;
    }
    let records = mirror.read_all::<T>();
    if !records.is_empty() {
        cache.write(key, &records);
        info!(file = T::FILE, count = records.len(), "hydrated from workbook");
    }
    RecordStore::from_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{KvStore, MemoryKv};
    use crate::codec::XlsxCodec;
    use crate::mirror::{FsSheetDir, SheetCodec, SheetDir};
    use crate::sheet::build_sheet;
    use tempfile::TempDir;

    fn seeded_app(tmp: &TempDir) -> App {
        let mut app = App::open(
            CacheMirror::new(Box::new(MemoryKv::new())),
            SpreadsheetMirror::new(
                Box::new(XlsxCodec),
                Box::new(FsSheetDir::open(tmp.path()).unwrap()),
            ),
        );
        app.add_client(NewClient {
            name: "SFI".into(),
            destination: "SFI Depot".into(),
            itineraire: vec!["Point A".into(), "Point B".into()],
        })
        .unwrap();
        app.add_driver(NewDriver {
            name: "Ahmed Benali".into(),
            cin: "AB123456".into(),
            phone: "0612345678".into(),
            vehicle: Vehicle {
                matricule: "12345-A-56".into(),
                model: "Mercedes Actros".into(),
            },
        })
        .unwrap();
        app.add_convoyeur(NewConvoyeur {
            name: "Omar Tazi".into(),
            cin: "OT111222".into(),
            phone: "0645678901".into(),
            cce: Some("CCE001".into()),
        })
        .unwrap();
        app
    }

    fn request() -> DeclarationRequest {
        DeclarationRequest {
            date: "2024-03-01".into(),
            date_depart: "2024-03-02T08:00".into(),
            client_id: 1,
            driver_id: 1,
            convoyeur_id: 1,
            products: vec![ProductLine {
                name: "Produit A".into(),
                quantity: "10".into(),
                unit: "Kg".into(),
            }],
            ..DeclarationRequest::default()
        }
    }

    #[test]
    fn submit_snapshots_dependent_fields() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        let decl = app.submit_declaration(request()).unwrap();
        assert_eq!(decl.client_name, "SFI");
        assert_eq!(decl.destination, "SFI Depot");
        assert_eq!(decl.itineraire, ["Point A", "Point B"]);
        assert_eq!(decl.driver_cin, "AB123456");
        assert_eq!(decl.vehicle_model, "Mercedes Actros");
        assert_eq!(decl.convoyeur_card, "CCE001");
        assert!(decl.document_number.ends_with(&format!(
            "/{}",
            docnum::current_year()
        )));
    }

    #[test]
    fn submit_with_unknown_client_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        let req = DeclarationRequest {
            client_id: 99,
            ..request()
        };
        assert!(matches!(
            app.submit_declaration(req),
            Err(StoreError::UnknownId { kind: "client", .. })
        ));
    }

    #[test]
    fn submit_without_date_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        let req = DeclarationRequest {
            date: "  ".into(),
            ..request()
        };
        assert!(matches!(
            app.submit_declaration(req),
            Err(StoreError::MissingField("date"))
        ));
    }

    #[test]
    fn document_numbers_increment_within_the_year() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        let first = app.submit_declaration(request()).unwrap();
        let second = app.submit_declaration(request()).unwrap();
        let year = docnum::current_year();
        assert_eq!(first.document_number, format!("1/{year}"));
        assert_eq!(second.document_number, format!("2/{year}"));
    }

    #[test]
    fn edit_keeps_id_and_timestamp_and_replaces_fields() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        let original = app.submit_declaration(request()).unwrap();

        let armed = app.begin_edit(original.id).unwrap();
        assert_eq!(armed.id, original.id);
        let edited = app
            .submit_declaration(DeclarationRequest {
                date: "2024-04-01".into(),
                document_number: Some(original.document_number.clone()),
                ..request()
            })
            .unwrap();

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.timestamp, original.timestamp);
        assert_eq!(edited.date, "2024-04-01");
        assert_eq!(app.history().len(), 1);
    }

    #[test]
    fn delete_at_sorted_index_keeps_relative_order() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        // Five declarations with distinct timestamps, oldest first.
        for day in 1..=5 {
            let decl = Declaration {
                id: day,
                timestamp: format!("2024-01-0{day}T00:00:00Z"),
                document_number: format!("{day}/2024"),
                client_id: 1,
                driver_id: 1,
                convoyeur_id: 1,
                ..Declaration::default()
            };
            app.history.push(decl);
        }
        // Sorted order is 5,4,3,2,1; index 2 is id 3.
        let removed = app.delete_declaration(2).unwrap();
        assert_eq!(removed.id, 3);
        let ids: Vec<i64> = app.history().iter().map(|d| d.id).collect();
        assert_eq!(ids, [5, 4, 2, 1]);
    }

    #[test]
    fn delete_past_the_end_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        assert!(matches!(
            app.delete_declaration(0),
            Err(StoreError::NoSuchIndex(0))
        ));
    }

    #[test]
    fn importing_the_same_workbook_twice_adds_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        let history = vec![
            Declaration {
                id: 1,
                timestamp: "2024-01-01T00:00:00Z".into(),
                document_number: "1/2024".into(),
                ..Declaration::default()
            },
            Declaration {
                id: 2,
                timestamp: "2024-01-02T00:00:00Z".into(),
                document_number: "2/2024".into(),
                ..Declaration::default()
            },
            Declaration {
                id: 3,
                timestamp: "2024-01-03T00:00:00Z".into(),
                document_number: "3/2024".into(),
                ..Declaration::default()
            },
        ];
        let bytes = XlsxCodec.encode(&build_sheet(&history)).unwrap();

        assert_eq!(app.import_history(&bytes).unwrap(), 3);
        assert_eq!(app.import_history(&bytes).unwrap(), 0);
        assert_eq!(app.history().len(), 3);
    }

    #[test]
    fn import_tolerates_duplicate_ids_in_cached_history() {
        let tmp = TempDir::new().unwrap();
        // An old cache payload can carry the same id twice; it hydrates
        // verbatim and must not break the import accounting.
        let dup = Declaration {
            id: 1,
            timestamp: "2024-01-01T00:00:00Z".into(),
            document_number: "1/2024".into(),
            ..Declaration::default()
        };
        let mut kv = MemoryKv::new();
        kv.set(
            HISTORY_KEY,
            &serde_json::to_string(&[dup.clone(), dup.clone()]).unwrap(),
        )
        .unwrap();
        let mut app = App::open(
            CacheMirror::new(Box::new(kv)),
            SpreadsheetMirror::new(
                Box::new(XlsxCodec),
                Box::new(FsSheetDir::open(tmp.path()).unwrap()),
            ),
        );
        assert_eq!(app.history().len(), 2);

        let bytes = XlsxCodec.encode(&build_sheet(&[dup])).unwrap();
        assert_eq!(app.import_history(&bytes).unwrap(), 0);
        assert_eq!(app.history().len(), 1);
    }

    #[test]
    fn clear_history_resets_numbering() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        app.submit_declaration(request()).unwrap();
        app.clear_history();
        assert!(app.history().is_empty());
        let year = docnum::current_year();
        assert_eq!(app.next_document_number(), format!("1/{year}"));
    }

    #[test]
    fn numbering_survives_a_cleared_history_via_counter() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        app.submit_declaration(request()).unwrap();
        app.submit_declaration(request()).unwrap();
        // Empty the store but keep the persisted counter.
        clear_store_only(&mut app);
        let year = docnum::current_year();
        assert_eq!(app.next_document_number(), format!("3/{year}"));
    }

    fn clear_store_only(app: &mut App) {
        app.history = RecordStore::default();
        app.cache.remove(HISTORY_KEY);
    }

    #[test]
    fn hydration_prefers_cache_over_workbook() {
        let tmp = TempDir::new().unwrap();
        // Workbook claims one client, cache claims another.
        let dir = FsSheetDir::open(tmp.path()).unwrap();
        let from_file = vec![Client {
            id: 1,
            name: "from file".into(),
            destination: "X".into(),
            itineraire: vec![],
        }];
        dir.write(
            Client::FILE,
            &XlsxCodec.encode(&build_sheet(&from_file)).unwrap(),
        )
        .unwrap();

        let mut kv = MemoryKv::new();
        let cached = vec![Client {
            id: 1,
            name: "from cache".into(),
            destination: "Y".into(),
            itineraire: vec![],
        }];
        kv.set(CLIENTS_KEY, &serde_json::to_string(&cached).unwrap())
            .unwrap();

        let app = App::open(
            CacheMirror::new(Box::new(kv)),
            SpreadsheetMirror::new(Box::new(XlsxCodec), Box::new(dir)),
        );
        assert_eq!(app.clients()[0].name, "from cache");
    }

    #[test]
    fn hydration_falls_back_to_workbook_and_caches_it() {
        let tmp = TempDir::new().unwrap();
        let dir = FsSheetDir::open(tmp.path()).unwrap();
        let from_file = vec![Client {
            id: 1,
            name: "from file".into(),
            destination: "X".into(),
            itineraire: vec!["Point A".into()],
        }];
        dir.write(
            Client::FILE,
            &XlsxCodec.encode(&build_sheet(&from_file)).unwrap(),
        )
        .unwrap();

        let app = App::open(
            CacheMirror::new(Box::new(MemoryKv::new())),
            SpreadsheetMirror::new(Box::new(XlsxCodec), Box::new(dir)),
        );
        assert_eq!(app.clients()[0].name, "from file");
        // Written back to the cache for offline use.
        let cached: Vec<Client> = app.cache.read(CLIENTS_KEY);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn empty_cache_and_missing_workbooks_start_empty() {
        let tmp = TempDir::new().unwrap();
        let app = App::open(
            CacheMirror::new(Box::new(MemoryKv::new())),
            SpreadsheetMirror::new(
                Box::new(XlsxCodec),
                Box::new(FsSheetDir::open(tmp.path()).unwrap()),
            ),
        );
        assert!(app.clients().is_empty());
        assert!(app.history().is_empty());
    }

    #[test]
    fn list_history_filters_and_paginates() {
        let tmp = TempDir::new().unwrap();
        let mut app = seeded_app(&tmp);
        for _ in 0..3 {
            app.submit_declaration(request()).unwrap();
        }
        let page = app.list_history(1, 2, "");
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total, 3);

        let filtered = app.list_history(1, 10, "sfi");
        assert_eq!(filtered.total, 3);
        let none = app.list_history(1, 10, "introuvable");
        assert_eq!(none.total, 0);
    }

    #[test]
    fn export_csv_names_the_file_by_date() {
        let tmp = TempDir::new().unwrap();
        let app = seeded_app(&tmp);
        let (filename, contents) = app.export_csv();
        assert!(filename.starts_with("declarations_"));
        assert!(filename.ends_with(".csv"));
        assert!(contents.starts_with('\u{feff}'));
    }
}
