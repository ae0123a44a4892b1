//! Author resolution

use crate::error::Result;
use crate::source::AuthorRef;
use crate::store::MetadataStore;

/// Resolve an author attribution to a redditor id.
///
/// Deleted authors resolve to `None`. Redditors are keyed on username
/// alone; a stored creation time is never replaced by a later observation.
pub fn resolve(store: &MetadataStore, author: Option<&AuthorRef>) -> Result<Option<i64>> {
    let Some(author) = author else {
        return Ok(None);
    };
    let row = store.get_or_create_redditor(&author.username, author.created_utc)?;
    Ok(Some(row.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_missing_author_resolves_to_none() {
        let store = MetadataStore::open_in_memory().unwrap();
        assert_eq!(resolve(&store, None).unwrap(), None);
        assert_eq!(store.count_redditors().unwrap(), 0);
    }

    #[test]
    fn test_same_username_is_stable() {
        let store = MetadataStore::open_in_memory().unwrap();
        let mut author = AuthorRef::new("spez");
        author.created_utc = Some(Utc.with_ymd_and_hms(2005, 6, 6, 0, 0, 0).unwrap());

        let first = resolve(&store, Some(&author)).unwrap();
        author.created_utc = Some(Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap());
        let second = resolve(&store, Some(&author)).unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
        let stored = store.find_redditor("spez").unwrap().unwrap();
        assert_eq!(
            stored.created_utc,
            Some(Utc.with_ymd_and_hms(2005, 6, 6, 0, 0, 0).unwrap())
        );
    }
}
