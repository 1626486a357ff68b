pub mod record;
pub mod validation;

pub use record::{ClinicalRecordService, ClinicalRecordStore, SupabaseClinicalRecordStore};
pub use validation::validate_measurements;
