//! Save validator (C3): decides, per item hash, whether a write passes,
//! is a no-op resend, or conflicts.
//!
//! Composed as an ordered list of rule objects, each returning one of
//! [`RuleOutcome::Pass`], [`RuleOutcome::Skip`], or
//! [`RuleOutcome::Conflict`]. The validator applies them in declared order
//! and stops at the first rule that doesn't pass — later rules never see
//! an item a prior rule already disposed of.

use crate::config::SyncConfig;
use itemsync_core::{ConflictKind, Item, ItemHash};
use itemsync_repository::SharedVaultUser;

/// The result of one validation rule.
pub enum RuleOutcome {
    /// Defer to the next rule.
    Pass,
    /// Treat as successfully saved without persisting a mutation; the
    /// item returned is the server's current copy.
    Skip(Item),
    /// Reject the write with this classification.
    Conflict(ConflictKind),
}

/// Everything a rule needs to judge one item hash.
pub struct ValidationContext<'a> {
    /// The client's proposed diff.
    pub hash: &'a ItemHash,
    /// The server's current copy, if the uuid already exists for this
    /// user.
    pub existing_item: Option<&'a Item>,
    /// The writer's shared-vault memberships, for the permission rule.
    pub vault_memberships: &'a [SharedVaultUser],
    /// Tuning (tolerance window, forbidden content types).
    pub config: &'a SyncConfig,
}

/// One rule in the validator's composed chain.
pub trait ValidationRule: Send + Sync {
    /// Judge this hash. Returning anything but `Pass` short-circuits the
    /// remaining rules.
    fn check(&self, ctx: &ValidationContext) -> RuleOutcome;
}

/// Rejects writes that target a forbidden content type.
pub struct ContentTypeRule;

impl ValidationRule for ContentTypeRule {
    fn check(&self, ctx: &ValidationContext) -> RuleOutcome {
        if let Some(content_type) = &ctx.hash.content_type {
            if ctx
                .config
                .forbidden_content_types
                .iter()
                .any(|forbidden| forbidden == content_type.as_str())
            {
                return RuleOutcome::Conflict(ConflictKind::ContentTypeError);
            }
        }
        RuleOutcome::Pass
    }
}

/// Rejects writes that set or change `shared_vault_uuid` to a vault the
/// writer cannot write into.
pub struct SharedVaultPermissionRule;

impl ValidationRule for SharedVaultPermissionRule {
    fn check(&self, ctx: &ValidationContext) -> RuleOutcome {
        let Some(Some(target_vault)) = ctx.hash.shared_vault_uuid else {
            return RuleOutcome::Pass;
        };

        let has_write_access = ctx
            .vault_memberships
            .iter()
            .any(|m| m.shared_vault_uuid == target_vault && m.has_write_access);

        if has_write_access {
            RuleOutcome::Pass
        } else {
            RuleOutcome::Conflict(ConflictKind::SharedVaultPermissionError)
        }
    }
}

/// Detects a hash that, if applied, would change nothing the server
/// doesn't already hold — a client resending an already-applied change.
/// Checked before the sync-conflict rule so an idempotent resend never
/// errors even if its echoed `updated_at_timestamp` is stale.
pub struct IdempotentResendRule;

impl ValidationRule for IdempotentResendRule {
    fn check(&self, ctx: &ValidationContext) -> RuleOutcome {
        let Some(existing) = ctx.existing_item else {
            return RuleOutcome::Pass;
        };

        if hash_changes_nothing(ctx.hash, existing) {
            RuleOutcome::Skip(existing.clone())
        } else {
            RuleOutcome::Pass
        }
    }
}

fn hash_changes_nothing(hash: &ItemHash, existing: &Item) -> bool {
    let content_unchanged = hash.content.as_ref().map(|c| Some(c) == existing.content.as_ref()).unwrap_or(true);
    let content_type_unchanged = hash
        .content_type
        .as_ref()
        .map(|ct| ct == &existing.content_type)
        .unwrap_or(true);
    let deleted_unchanged = hash.deleted.map(|d| d == existing.deleted).unwrap_or(true);
    let enc_item_key_unchanged = hash
        .enc_item_key
        .as_ref()
        .map(|v| Some(v) == existing.enc_item_key.as_ref())
        .unwrap_or(true);
    let auth_hash_unchanged = hash
        .auth_hash
        .as_ref()
        .map(|v| Some(v) == existing.auth_hash.as_ref())
        .unwrap_or(true);
    let items_key_id_unchanged = hash
        .items_key_id
        .as_ref()
        .map(|v| Some(v) == existing.items_key_id.as_ref())
        .unwrap_or(true);
    let duplicate_of_unchanged = hash.duplicate_of.map(|v| Some(v) == existing.duplicate_of).unwrap_or(true);
    let vault_unchanged = hash.shared_vault_uuid.map(|v| v == existing.shared_vault_uuid).unwrap_or(true);

    content_unchanged
        && content_type_unchanged
        && deleted_unchanged
        && enc_item_key_unchanged
        && auth_hash_unchanged
        && items_key_id_unchanged
        && duplicate_of_unchanged
        && vault_unchanged
}

/// Rejects an update whose echoed `updated_at_timestamp` is too far from
/// the server's current value — the write is based on a stale read.
pub struct SyncConflictRule;

impl ValidationRule for SyncConflictRule {
    fn check(&self, ctx: &ValidationContext) -> RuleOutcome {
        let (Some(existing), Some(claimed)) = (ctx.existing_item, ctx.hash.updated_at_timestamp) else {
            return RuleOutcome::Pass;
        };

        let actual = existing.updated_at_timestamp.as_micros();
        let claimed = claimed.as_micros();
        let drift = actual.abs_diff(claimed);

        if drift > ctx.config.sync_conflict_tolerance_micros {
            RuleOutcome::Conflict(ConflictKind::SyncConflict)
        } else {
            RuleOutcome::Pass
        }
    }
}

/// The composed validator: [`ContentTypeRule`], [`SharedVaultPermissionRule`],
/// [`IdempotentResendRule`], [`SyncConflictRule`], in that order.
pub struct SaveValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl SaveValidator {
    /// The default rule chain. `UuidConflict`/`ReadOnlyError` are decided
    /// outside the validator by the item service, not by a rule here.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ContentTypeRule),
                Box::new(SharedVaultPermissionRule),
                Box::new(IdempotentResendRule),
                Box::new(SyncConflictRule),
            ],
        }
    }

    /// Build a validator from a custom rule chain, for tests or deployments
    /// that need extra rules.
    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Run every rule in order, stopping at the first non-pass.
    pub fn validate(&self, ctx: &ValidationContext) -> RuleOutcome {
        for rule in &self.rules {
            match rule.check(ctx) {
                RuleOutcome::Pass => continue,
                outcome => return outcome,
            }
        }
        RuleOutcome::Pass
    }
}

impl Default for SaveValidator {
    fn default() -> Self {
        Self::new()
    }
}
