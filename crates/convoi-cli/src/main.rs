//! `convoi` command-line front end.
//!
//! Each subcommand plays the role of one form or modal of the declaration
//! app: typed request in, typed result out, card or table on stdout.

mod display;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};

use convoi_core::{ProductLine, Vehicle};
use convoi_store::{
    App, CacheMirror, DeclarationRequest, FsKvStore, FsSheetDir, MemoryKv, NewClient, NewConvoyeur,
    NewDriver, NewProduct, SpreadsheetMirror, XlsxCodec,
};

#[derive(Parser)]
#[command(name = "convoi", version, about = "Road transport declaration manager")]
struct Cli {
    /// Directory holding the spreadsheet files.
    #[arg(long, env = "CONVOI_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Cache directory. Omitted means an in-memory cache for this run.
    #[arg(long, env = "CONVOI_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Fallback directory for files when direct writes are declined.
    #[arg(long, env = "CONVOI_EXPORT_DIR", global = true)]
    export_dir: Option<PathBuf>,

    /// Decline direct spreadsheet writes; changes stay in the cache and
    /// full files land in the export directory when one is set.
    #[arg(long, global = true)]
    no_direct_write: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the declaration history, newest first.
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
        /// Case-insensitive text filter over number, dates, names,
        /// destination and products.
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Show one declaration by its row number in the sorted history.
    Show { row: usize },
    /// Record a new declaration.
    Declare(DeclareArgs),
    /// Edit an existing declaration; flags not given keep their value.
    Edit {
        id: i64,
        #[command(flatten)]
        args: DeclareArgs,
    },
    /// Delete the declaration at the given row number.
    Delete { row: usize },
    /// Merge a history workbook into the local history.
    Import { file: PathBuf },
    /// Export the full history as CSV.
    ExportCsv {
        /// Output path; defaults to `declarations_<date>.csv` here.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete the entire history and reset document numbering.
    ClearHistory {
        #[arg(long)]
        yes: bool,
    },
    AddClient {
        #[arg(long)]
        name: String,
        #[arg(long)]
        destination: String,
        /// Waypoint, repeatable in driving order.
        #[arg(long = "waypoint")]
        waypoints: Vec<String>,
    },
    AddDriver {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        cin: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        matricule: String,
        #[arg(long, default_value = "")]
        model: String,
    },
    AddConvoyeur {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        cin: String,
        #[arg(long, default_value = "")]
        phone: String,
        /// CCE control-card number.
        #[arg(long)]
        cce: Option<String>,
    },
    AddProduct {
        #[arg(long)]
        name: String,
        #[arg(long)]
        unit: String,
    },
    /// Rewrite every spreadsheet file from current state.
    WriteFiles,
    /// Allocate and print the next document number.
    NextNumber,
}

#[derive(Args)]
struct DeclareArgs {
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    date_depart: Option<String>,
    #[arg(long)]
    client: Option<i64>,
    #[arg(long)]
    driver: Option<i64>,
    #[arg(long)]
    convoyeur: Option<i64>,
    /// Overrides the number allocator.
    #[arg(long)]
    document_number: Option<String>,
    #[arg(long)]
    destination: Option<String>,
    #[arg(long)]
    driver_cin: Option<String>,
    #[arg(long)]
    driver_phone: Option<String>,
    #[arg(long)]
    matricule: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    convoyeur_card: Option<String>,
    #[arg(long)]
    convoyeur_cin: Option<String>,
    #[arg(long)]
    convoyeur_phone: Option<String>,
    /// Product line as NAME:QTY:UNIT, repeatable.
    #[arg(long = "product", value_parser = parse_product)]
    products: Vec<ProductLine>,
    #[arg(long)]
    passavant: Option<String>,
    #[arg(long)]
    passavant_expiry: Option<String>,
    #[arg(long)]
    bon_livraison: Option<String>,
}

fn parse_product(s: &str) -> Result<ProductLine, String> {
    let mut parts = s.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(qty), Some(unit)) if !name.is_empty() => Ok(ProductLine {
            name: name.to_string(),
            quantity: qty.to_string(),
            unit: unit.to_string(),
        }),
        _ => Err(format!("expected NAME:QTY:UNIT, got `{s}`")),
    }
}

fn open_app(cli: &Cli) -> anyhow::Result<App> {
    let cache = match &cli.cache_dir {
        Some(dir) => CacheMirror::new(Box::new(
            FsKvStore::open(dir).with_context(|| format!("cache dir {}", dir.display()))?,
        )),
        None => CacheMirror::new(Box::new(MemoryKv::new())),
    };
    let mut mirror = SpreadsheetMirror::new(
        Box::new(XlsxCodec),
        Box::new(
            FsSheetDir::open(&cli.data_dir)
                .with_context(|| format!("data dir {}", cli.data_dir.display()))?,
        ),
    );
    if cli.no_direct_write {
        mirror = mirror.without_direct_write();
    }
    if let Some(dir) = &cli.export_dir {
        mirror = mirror.with_export_dir(Box::new(
            FsSheetDir::open(dir).with_context(|| format!("export dir {}", dir.display()))?,
        ));
    }
    Ok(App::open(cache, mirror))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("convoi v{}", env!("CARGO_PKG_VERSION"));
    let cli = Cli::parse();
    let mut app = open_app(&cli)?;

    match cli.command {
        Command::List {
            page,
            page_size,
            filter,
        } => {
            let result = app.list_history(page, page_size, &filter);
            display::print_history_table(&result, page_size);
        }
        Command::Show { row } => {
            let decl = row
                .checked_sub(1)
                .and_then(|i| app.history().get(i))
                .with_context(|| format!("no declaration at row {row}"))?;
            display::print_declaration_card(decl);
        }
        Command::Declare(args) => {
            let req = declare_request(args)?;
            let decl = app.submit_declaration(req)?;
            display::print_declaration_card(&decl);
        }
        Command::Edit { id, args } => {
            let original = app.begin_edit(id)?;
            let req = edit_request(args, original);
            let decl = app.submit_declaration(req)?;
            display::print_declaration_card(&decl);
        }
        Command::Delete { row } => {
            let index = row.checked_sub(1).context("row numbers start at 1")?;
            let removed = app.delete_declaration(index)?;
            println!("Déclaration {} supprimée.", removed.document_number);
        }
        Command::Import { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let added = app.import_history(&bytes)?;
            println!("{added} déclaration(s) importée(s).");
        }
        Command::ExportCsv { out } => {
            let (default_name, contents) = app.export_csv();
            let path = out.unwrap_or_else(|| PathBuf::from(default_name));
            std::fs::write(&path, contents)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exporté vers {}.", path.display());
        }
        Command::ClearHistory { yes } => {
            if !yes {
                bail!("refusing to clear the history without --yes");
            }
            app.clear_history();
            println!("Historique effacé.");
        }
        Command::AddClient {
            name,
            destination,
            waypoints,
        } => {
            let client = app.add_client(NewClient {
                name,
                destination,
                itineraire: waypoints,
            })?;
            println!("Client {} ajouté (id {}).", client.name, client.id);
        }
        Command::AddDriver {
            name,
            cin,
            phone,
            matricule,
            model,
        } => {
            let driver = app.add_driver(NewDriver {
                name,
                cin,
                phone,
                vehicle: Vehicle { matricule, model },
            })?;
            println!("Chauffeur {} ajouté (id {}).", driver.name, driver.id);
        }
        Command::AddConvoyeur {
            name,
            cin,
            phone,
            cce,
        } => {
            let convoyeur = app.add_convoyeur(NewConvoyeur {
                name,
                cin,
                phone,
                cce,
            })?;
            println!("Convoyeur {} ajouté (id {}).", convoyeur.name, convoyeur.id);
        }
        Command::AddProduct { name, unit } => {
            let product = app.add_product(NewProduct { name, unit })?;
            println!("Produit {} ajouté (id {}).", product.name, product.id);
        }
        Command::WriteFiles => {
            let written = app.write_all_files();
            println!("{written}/5 fichier(s) écrit(s).");
        }
        Command::NextNumber => {
            println!("{}", app.next_document_number());
        }
    }
    Ok(())
}

/// A new declaration needs the date and the three entity ids up front.
fn declare_request(args: DeclareArgs) -> anyhow::Result<DeclarationRequest> {
    let date = args.date.clone().context("--date is required")?;
    let client_id = args.client.context("--client is required")?;
    let driver_id = args.driver.context("--driver is required")?;
    let convoyeur_id = args.convoyeur.context("--convoyeur is required")?;
    Ok(DeclarationRequest {
        document_number: args.document_number,
        date,
        date_depart: args.date_depart.unwrap_or_default(),
        client_id,
        driver_id,
        convoyeur_id,
        destination: args.destination,
        driver_cin: args.driver_cin,
        driver_phone: args.driver_phone,
        vehicle_matricule: args.matricule,
        vehicle_model: args.model,
        convoyeur_card: args.convoyeur_card,
        convoyeur_cin: args.convoyeur_cin,
        convoyeur_phone: args.convoyeur_phone,
        products: args.products,
        passavant_number: args.passavant.unwrap_or_default(),
        passavant_expiry: args.passavant_expiry.unwrap_or_default(),
        bon_livraison: args.bon_livraison.unwrap_or_default(),
    })
}

/// For an edit every absent flag keeps the stored value.
fn edit_request(args: DeclareArgs, original: convoi_core::Declaration) -> DeclarationRequest {
    DeclarationRequest {
        document_number: args.document_number.or(Some(original.document_number)),
        date: args.date.unwrap_or(original.date),
        date_depart: args.date_depart.unwrap_or(original.date_depart),
        client_id: args.client.unwrap_or(original.client_id),
        driver_id: args.driver.unwrap_or(original.driver_id),
        convoyeur_id: args.convoyeur.unwrap_or(original.convoyeur_id),
        destination: args.destination.or(Some(original.destination)),
        driver_cin: args.driver_cin.or(Some(original.driver_cin)),
        driver_phone: args.driver_phone.or(Some(original.driver_phone)),
        vehicle_matricule: args.matricule.or(Some(original.vehicle_matricule)),
        vehicle_model: args.model.or(Some(original.vehicle_model)),
        convoyeur_card: args.convoyeur_card.or(Some(original.convoyeur_card)),
        convoyeur_cin: args.convoyeur_cin.or(Some(original.convoyeur_cin)),
        convoyeur_phone: args.convoyeur_phone.or(Some(original.convoyeur_phone)),
        products: if args.products.is_empty() {
            original.products
        } else {
            args.products
        },
        passavant_number: args.passavant.unwrap_or(original.passavant_number),
        passavant_expiry: args.passavant_expiry.unwrap_or(original.passavant_expiry),
        bon_livraison: args.bon_livraison.unwrap_or(original.bon_livraison),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_flag_parses_all_three_parts() {
        let line = parse_product("Produit A:10:Kg").unwrap();
        assert_eq!(line.name, "Produit A");
        assert_eq!(line.quantity, "10");
        assert_eq!(line.unit, "Kg");
    }

    #[test]
    fn product_flag_without_unit_is_rejected() {
        assert!(parse_product("Produit A:10").is_err());
        assert!(parse_product(":10:Kg").is_err());
    }

    #[test]
    fn cli_parses_a_declare_invocation() {
        let cli = Cli::parse_from([
            "convoi",
            "declare",
            "--date",
            "2024-03-01",
            "--client",
            "1",
            "--driver",
            "2",
            "--convoyeur",
            "3",
            "--product",
            "Produit A:10:Kg",
        ]);
        let Command::Declare(args) = cli.command else {
            panic!("expected declare");
        };
        let req = declare_request(args).unwrap();
        assert_eq!(req.date, "2024-03-01");
        assert_eq!(req.client_id, 1);
        assert_eq!(req.products.len(), 1);
    }

    #[test]
    fn declare_without_date_is_rejected() {
        let cli = Cli::parse_from(["convoi", "declare", "--client", "1"]);
        let Command::Declare(args) = cli.command else {
            panic!("expected declare");
        };
        assert!(declare_request(args).is_err());
    }

    #[test]
    fn edit_keeps_unset_fields() {
        let original = convoi_core::Declaration {
            id: 7,
            date: "2024-03-01".into(),
            client_id: 1,
            driver_id: 2,
            convoyeur_id: 3,
            destination: "SFI Depot".into(),
            ..convoi_core::Declaration::default()
        };
        let cli = Cli::parse_from(["convoi", "edit", "7", "--date", "2024-04-01"]);
        let Command::Edit { args, .. } = cli.command else {
            panic!("expected edit");
        };
        let req = edit_request(args, original);
        assert_eq!(req.date, "2024-04-01");
        assert_eq!(req.client_id, 1);
        assert_eq!(req.destination.as_deref(), Some("SFI Depot"));
    }
}
