pub mod csv;
pub mod docnum;
pub mod query;
pub mod record;

pub use docnum::next_document_number;
pub use record::{
    Client, ClientFields, Convoyeur, ConvoyeurFields, Declaration, Driver, DriverFields, Product,
    ProductLine, Record, Vehicle,
};
