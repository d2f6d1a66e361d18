pub mod builder;
pub mod types;

pub use builder::build_ledger;
pub use types::{AssetId, Ledger};
