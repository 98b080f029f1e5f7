pub mod checksum;
pub mod discovery;
pub mod drift;
pub mod error;
pub mod model;

pub use checksum::sha256_hex;
pub use discovery::{discover_migrations, MIGRATION_SUFFIX};
pub use drift::{detect_drift, Drift, LedgerRecord};
pub use error::{MigrationDiscoveryError, MigrationDriftError};
pub use model::Migration;
