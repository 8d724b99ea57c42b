use crate::qc::{is_standalone, QcEntry, SCRIPT_GROUP};

use std::collections::BTreeMap;

use tracing::debug;

pub struct ProcessOpts {
    pub chrono: bool,
}

/// Buckets entries by group name. Groups iterate in lexicographic order,
/// entries keep report order.
pub fn categorize(entries: Vec<QcEntry>, opts: &ProcessOpts) -> BTreeMap<String, Vec<QcEntry>> {
    let mut groups: BTreeMap<String, Vec<QcEntry>> = BTreeMap::new();

    for entry in entries {
        let group = if opts.chrono && !is_standalone(&entry.category) {
            SCRIPT_GROUP.to_string()
        } else {
            entry.category.clone()
        };
        groups.entry(group).or_default().push(entry);
    }

    for (group, notes) in &groups {
        debug!("Group '{}' has {} entries", group, notes.len());
    }
    groups
}
