//! Lineage index naming.
//!
//! Every reindex creates `<base>_<YYYYMMDDHHMMSSmmm>`: a fixed-width,
//! monotonically distinguishing timestamp suffix. The fixed width is what
//! lets cleanup recognize members of the same lineage later without a
//! registry of created indices.

use chrono::{DateTime, Utc};

/// Timestamp suffix width produced by [`lineage_index_name`].
const SUFFIX_DIGITS: usize = 17;

/// Narrowest suffix accepted as lineage member, for indices created by
/// older deployments that used second precision.
const MIN_SUFFIX_DIGITS: usize = 14;

/// Build a new physical index name for `base` at `at`.
pub fn lineage_index_name(base: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", base, at.format("%Y%m%d%H%M%S%3f"))
}

/// Whether `name` is a member of `base`'s reindex lineage.
///
/// Members are `base`, an underscore, and 14 to 17 digits.
pub fn is_lineage_member(base: &str, name: &str) -> bool {
    let Some(rest) = name.strip_prefix(base) else {
        return false;
    };
    let Some(suffix) = rest.strip_prefix('_') else {
        return false;
    };
    (MIN_SUFFIX_DIGITS..=SUFFIX_DIGITS).contains(&suffix.len())
        && suffix.bytes().all(|b| b.is_ascii_digit())
}
