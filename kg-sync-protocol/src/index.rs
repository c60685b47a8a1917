//! Physical index naming.
//!
//! Every index name is derived from the lifecycle stage, the target type and
//! the kind of index. Temporary indexes used during a full rebuild carry a
//! `temporary_` prefix so that stage patterns (`{stage}_*`) never match them.
//!
//! | kind | name |
//! |---|---|
//! | searchable | `{temporary_}{stage}_searchable_{type}` |
//! | auto-released | `{temporary_}{stage}_{type}` |
//! | identifiers | `{stage}_identifiers` |
//! | resources | `resources` |

use crate::Stage;

pub const RESOURCES_INDEX: &str = "resources";

const TEMPORARY_PREFIX: &str = "temporary_";

fn temporary_prefix(temporary: bool) -> &'static str {
    if temporary {
        TEMPORARY_PREFIX
    } else {
        ""
    }
}

/// Full-text searchable index of one target type.
pub fn search_index(stage: Stage, target_type: &str, temporary: bool) -> String {
    format!(
        "{}{}_searchable_{}",
        temporary_prefix(temporary),
        stage.index_prefix(),
        target_type.to_lowercase()
    )
}

/// Index of an auto-released target type.
pub fn auto_released_index(stage: Stage, target_type: &str, temporary: bool) -> String {
    format!(
        "{}{}_{}",
        temporary_prefix(temporary),
        stage.index_prefix(),
        target_type.to_lowercase()
    )
}

/// Shared identifier-only index for every non-auto-released type.
pub fn identifiers_index(stage: Stage) -> String {
    format!("{}_identifiers", stage.index_prefix())
}

/// Pattern matching every real (non-temporary) index of a stage.
pub fn stage_pattern(stage: Stage) -> String {
    format!("{}_*", stage.index_prefix())
}

/// Returns true if `index` matches `pattern`, where `*` matches any run of
/// characters. Comma-separated patterns match if any alternative does.
pub fn matches_pattern(pattern: &str, index: &str) -> bool {
    pattern
        .split(',')
        .map(str::trim)
        .any(|alternative| glob_match(alternative, index))
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return candidate.is_empty();
    };
    let Some(mut rest) = candidate.strip_prefix(first) else {
        return false;
    };
    let remaining: Vec<&str> = parts.collect();
    if remaining.is_empty() {
        return rest.is_empty();
    }
    for (i, part) in remaining.iter().enumerate() {
        let last = i == remaining.len() - 1;
        if last {
            return rest.ends_with(part);
        }
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}
