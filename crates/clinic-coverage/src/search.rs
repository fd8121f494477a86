//! Facility lookup by name
//!
//! Deterministic case-folded substring matching, used to resolve a clinic a
//! user names in a chat message to a map target.

use crate::adapter::FacilityRecord;

/// Facilities whose name contains `query`, in input order
pub fn find_by_name<'a>(facilities: &'a [FacilityRecord], query: &str) -> Vec<&'a FacilityRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    facilities
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&needle))
        .collect()
}

/// First facility whose full name appears in `message`.
///
/// Longer names win over names they contain, so "City Clinic 2" is preferred
/// to "City Clinic" when both appear.
pub fn match_in_message<'a>(facilities: &'a [FacilityRecord], message: &str) -> Option<&'a FacilityRecord> {
    let haystack = message.to_lowercase();
    facilities
        .iter()
        .filter(|f| {
            let name = f.name.trim().to_lowercase();
            !name.is_empty() && haystack.contains(&name)
        })
        .fold(None, |best: Option<&FacilityRecord>, f| match best {
            Some(b) if b.name.trim().chars().count() >= f.name.trim().chars().count() => Some(b),
            _ => Some(f),
        })
}
