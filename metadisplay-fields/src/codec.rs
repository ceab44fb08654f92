//! Storage key codec for Solr field names.
//!
//! Solr field names may contain periods, which the configuration backend
//! treats as path separators. Every period is replaced with
//! [`PERIOD_REPLACEMENT`] before a name is used as a storage key, and the
//! replacement is turned back into a period when reading keys back.
//!
//! The mapping is a bijection only over names that never contain the
//! replacement token literally. Field names containing `~dot~` are not
//! valid natural names; encoding one will not round-trip.

/// Token substituted for `.` in storage keys.
pub const PERIOD_REPLACEMENT: &str = "~dot~";

/// Convert a natural (Solr) field name into a storage-safe key.
pub fn encode(field_name: &str) -> String {
    field_name.replace('.', PERIOD_REPLACEMENT)
}

/// Convert a storage key back into the natural field name.
pub fn decode(storage_key: &str) -> String {
    storage_key.replace(PERIOD_REPLACEMENT, ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("dc.title", "dc~dot~title")]
    #[case("mods_titleInfo_title_ms", "mods_titleInfo_title_ms")]
    #[case("a.b.c", "a~dot~b~dot~c")]
    #[case(".leading", "~dot~leading")]
    #[case("", "")]
    fn encodes_periods(#[case] natural: &str, #[case] key: &str) {
        assert_eq!(encode(natural), key);
        assert_eq!(decode(key), natural);
    }

    #[test]
    fn encoded_keys_contain_no_periods() {
        assert!(!encode("RELS_EXT.hasModel.uri").contains('.'));
    }

    proptest! {
        #[test]
        fn round_trips_solr_field_names(name in "[a-zA-Z0-9_.:-]{0,48}") {
            prop_assert_eq!(decode(&encode(&name)), name);
        }
    }
}
