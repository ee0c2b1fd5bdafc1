pub mod admins;
pub mod ledger;
pub mod ownership;
pub mod quota;

pub use admins::{AdminService, CreateAdmin, UpdateAdmin};
pub use ledger::{ResourceLedger, UsageObserver};
pub use ownership::{OwnershipTransfer, TransferSummary};
pub use quota::QuotaGuard;
