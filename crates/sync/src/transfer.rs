//! Transfer calculator (C2): picks the longest prefix of an ordered
//! `(uuid, content_size)` stream whose total size fits a byte budget.

use itemsync_core::ItemUuid;

/// Walk `stream` (already ordered the same way the full query would be)
/// and return the uuids to hydrate: the longest prefix whose accumulated
/// `content_size` does not exceed `budget`, except that a first item
/// larger than the whole budget is still included alone so a sync always
/// makes forward progress.
pub fn select_within_budget<I>(stream: I, budget: u64) -> Vec<ItemUuid>
where
    I: IntoIterator<Item = (ItemUuid, u64)>,
{
    let mut selected = Vec::new();
    let mut total: u64 = 0;

    for (index, (uuid, size)) in stream.into_iter().enumerate() {
        if index == 0 && size > budget {
            selected.push(uuid);
            break;
        }

        let candidate_total = total.saturating_add(size);
        if candidate_total > budget {
            break;
        }

        total = candidate_total;
        selected.push(uuid);
    }

    selected
}
