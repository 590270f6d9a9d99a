//! Import and export of project data
//!
//! A [`Bundle`] holds every record of a project. It is written as JSON or
//! YAML and loaded back by an [`Importer`], which refuses the whole bundle
//! when any record is inconsistent.

mod bundle;
mod csv_export;
mod format;
mod import;

pub use bundle::{BUNDLE_VERSION, Bundle};
pub use csv_export::tickets_to_csv;
pub use format::DataFormat;
pub use import::{ImportSummary, Importer};
