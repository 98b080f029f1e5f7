pub mod client;
pub mod error;
pub mod provision;
pub mod roster;
pub mod supabase;

pub use client::{AuthAdmin, AuthUser, NewAuthUser, Profile};
pub use error::{ProvisionError, ProvisionStage};
pub use provision::{apply_plan, plan_accounts, AccountOutcome, AccountState, PlannedAccount, ProvisionReport};
pub use roster::{default_roster, TestAccount, DEFAULT_PASSWORD};
pub use supabase::{SupabaseAdminClient, SupabaseConfig};
