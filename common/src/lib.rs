pub mod csv_import;
pub mod message;
pub mod msisdn;
