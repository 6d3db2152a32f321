//! Sync engine: the token codec, transfer calculator, save validator,
//! cooperative cancellation, and the item service that orchestrates them
//! against an [`itemsync_repository::ItemRepository`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancellation;
pub mod config;
pub mod service;
pub mod token;
pub mod transfer;
pub mod validator;

pub use cancellation::CancellationToken;
pub use config::SyncConfig;
pub use service::{GetItemsRequest, GetItemsResult, ItemService, SaveItemsRequest, SaveItemsResult};
pub use token::{CursorToken, SyncToken};
pub use transfer::select_within_budget;
pub use validator::{
    ContentTypeRule, IdempotentResendRule, RuleOutcome, SaveValidator, SharedVaultPermissionRule,
    SyncConflictRule, ValidationContext, ValidationRule,
};
