//! Dangling reference sanitizer
//!
//! Clears the target id of every internal reference that does not point at a
//! document known to exist in the stage. Labels and context stay, so the
//! link renders as plain text instead of a broken link.

use kg_sync_protocol::TargetDocument;
use std::collections::HashSet;

/// Counts from one sanitizer pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeStats {
    /// References seen, including ones already empty
    pub visited: usize,
    /// References whose id was cleared
    pub cleared: usize,
}

/// Clear references to ids not in `known` across `documents`.
pub fn sanitize(documents: &mut [Box<dyn TargetDocument>], known: &HashSet<String>) -> SanitizeStats {
    let mut stats = SanitizeStats::default();
    for document in documents.iter_mut() {
        document.visit_references(&mut |reference| {
            stats.visited += 1;
            let dangling = reference
                .reference
                .as_ref()
                .is_some_and(|id| !known.contains(id));
            if dangling {
                reference.reference = None;
                stats.cleared += 1;
            }
        });
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{JsonTranslator, Translator};
    use kg_sync_protocol::Stage;
    use serde_json::json;

    #[test]
    fn test_clears_only_unknown_targets() {
        let translator = JsonTranslator::new("Source", vec![]);
        let mut docs = vec![
            translator
                .translate(
                    &json!({
                        "id": "d1",
                        "authors": [
                            {"reference": "p1", "value": "Known"},
                            {"reference": "p2", "value": "Unknown"}
                        ],
                        "license": {"reference": null, "value": "CC-BY"}
                    }),
                    Stage::Released,
                )
                .unwrap(),
            translator
                .translate(
                    &json!({"id": "d2", "parent": {"reference": "d1", "value": "D1"}}),
                    Stage::Released,
                )
                .unwrap(),
        ];
        let known: HashSet<String> = ["p1", "d1"].iter().map(|s| s.to_string()).collect();

        let stats = sanitize(&mut docs, &known);
        assert_eq!(stats, SanitizeStats { visited: 4, cleared: 1 });

        let first = docs[0].to_source().unwrap();
        assert_eq!(first["authors"][0]["reference"], "p1");
        assert_eq!(first["authors"][1]["reference"], serde_json::Value::Null);
        assert_eq!(first["authors"][1]["value"], "Unknown");
        assert_eq!(docs[1].to_source().unwrap()["parent"]["reference"], "d1");
    }
}
