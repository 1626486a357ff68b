pub mod error;
pub mod query;
pub mod supabase;

pub use error::DatabaseError;
pub use query::PostgrestQuery;
pub use supabase::SupabaseClient;
