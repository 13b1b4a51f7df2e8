//! Leads: pipeline status, ingest, search and export

pub mod export;
pub mod ingest;
pub mod search;
pub mod types;

pub use export::{export_leads, ExportFormat, ExportParams, LeadExport};
pub use ingest::{import_leads, normalize, ImportSummary};
pub use search::{search_leads, LeadFilter};
pub use types::{Lead, LeadStatus, RawLead};
