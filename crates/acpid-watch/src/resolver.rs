//! Two-stage lookup from a decoded event to a handler path.

use crate::events::CanonicalEvent;
use acpid_config::{ActionTable, EventMapEntry, EventTable, MappingTables};

/// A successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'t> {
    /// Description of the matching event map row.
    pub action_key: &'t str,
    /// Handler path of the matching action row.
    pub action_path: &'t str,
}

/// Resolve an event to a handler path, or `None` if either stage misses.
pub fn resolve<'t>(tables: &'t MappingTables, event: &CanonicalEvent) -> Option<&'t str> {
    resolve_detailed(tables, event).map(|r| r.action_path)
}

/// Like [`resolve`], but also returns the action key that linked the tables.
pub fn resolve_detailed<'t>(
    tables: &'t MappingTables,
    event: &CanonicalEvent,
) -> Option<Resolution<'t>> {
    let action_key = find_action_key(tables.events(), event)?;
    let action_path = find_action(tables.actions(), action_key)?;
    Some(Resolution {
        action_key,
        action_path,
    })
}

/// Stage 1: first event map row matching the event.
pub fn find_action_key<'t>(events: &'t EventTable, event: &CanonicalEvent) -> Option<&'t str> {
    events
        .iter()
        .find(|entry| matches_entry(entry, event))
        .map(|entry| entry.description.as_str())
}

/// Stage 2: first action row whose fragment occurs in the key.
pub fn find_action<'t>(actions: &'t ActionTable, action_key: &str) -> Option<&'t str> {
    actions
        .iter()
        .find(|entry| action_key.contains(entry.key_fragment.as_str()))
        .map(|entry| entry.action_path.as_str())
}

fn matches_entry(entry: &EventMapEntry, event: &CanonicalEvent) -> bool {
    match event {
        CanonicalEvent::Binary(ev) => {
            ev.type_ == entry.type_code
                && ev.code == entry.code_value
                && i64::from(ev.value) == i64::from(entry.value)
        }
        // The trimmed text only has to agree with the description up to its own length.
        CanonicalEvent::Text(text) => entry.description.as_bytes().starts_with(text.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{decode_text, RawInputEvent};
    use acpid_config::{ActionMapEntry, Table};
    use test_case::test_case;

    fn tables(events: Vec<EventMapEntry>, actions: Vec<ActionMapEntry>) -> MappingTables {
        MappingTables::new(Table::from_rows(events), Table::from_rows(actions))
    }

    fn binary(type_: u16, code: u16, value: i32) -> CanonicalEvent {
        CanonicalEvent::Binary(RawInputEvent::new(type_, code, value))
    }

    fn text(line: &[u8]) -> CanonicalEvent {
        CanonicalEvent::from_text(decode_text(line))
    }

    #[test]
    fn test_default_power_button_resolves() {
        let tables = MappingTables::default();
        assert_eq!(resolve(&tables, &binary(0x01, 116, 1)), Some("PWRF/00000080"));
    }

    #[test]
    fn test_first_matching_event_row_wins() {
        let tables = tables(
            vec![
                EventMapEntry::new("EV_KEY", 1, "KEY_POWER", 116, 1, "first PWRF"),
                EventMapEntry::new("EV_KEY", 1, "KEY_POWER", 116, 1, "second PWRB"),
            ],
            vec![
                ActionMapEntry::new("PWRF", "first-handler"),
                ActionMapEntry::new("PWRB", "second-handler"),
            ],
        );

        let resolution = resolve_detailed(&tables, &binary(1, 116, 1)).unwrap();
        assert_eq!(resolution.action_key, "first PWRF");
        assert_eq!(resolution.action_path, "first-handler");
    }

    #[test]
    fn test_first_matching_action_row_wins() {
        let tables = tables(
            MappingTables::default().events().entries().to_vec(),
            vec![
                ActionMapEntry::new("power", "generic"),
                ActionMapEntry::new("PWRF", "specific"),
            ],
        );
        assert_eq!(resolve(&tables, &binary(1, 116, 1)), Some("generic"));
    }

    #[test]
    fn test_binary_match_needs_all_three_fields() {
        let tables = MappingTables::default();
        assert_eq!(resolve(&tables, &binary(0x02, 116, 1)), None);
        assert_eq!(resolve(&tables, &binary(0x01, 117, 1)), None);
        assert_eq!(resolve(&tables, &binary(0x01, 116, 0)), None);
    }

    #[test]
    fn test_text_event_matches_by_prefix() {
        let tables = MappingTables::default();
        let event = text(b"button/power PWRF 00000080 00000000\n");
        assert_eq!(resolve(&tables, &event), Some("PWRF/00000080"));
    }

    #[test_case(b"\n" ; "blank line")]
    #[test_case(b"ac_adapte\n" ; "nine bytes")]
    #[test_case(b"button\n" ; "shorter than suffix")]
    fn test_short_text_matches_first_row(line: &[u8]) {
        let tables = MappingTables::default();
        assert_eq!(resolve(&tables, &text(line)), Some("PWRF/00000080"));
    }

    #[test]
    fn test_text_prefix_compares_raw_bytes() {
        let tables = tables(
            vec![EventMapEntry::new("EV_KEY", 1, "KEY_PROG1", 148, 1, "hotkey/é PROG1")],
            vec![ActionMapEntry::new("PROG1", "PROG1/handler")],
        );
        // The cut leaves only the first byte of "é".
        let event = text("hotkey/é 0000000\n".as_bytes());
        assert_eq!(resolve(&tables, &event), Some("PROG1/handler"));
    }

    #[test]
    fn test_shorter_text_matches_first_row_with_that_prefix() {
        let tables = MappingTables::default();
        let event = text(b"button/power 000000000");
        assert_eq!(
            find_action_key(tables.events(), &event),
            Some("button/power PWRF 00000080")
        );
    }

    #[test]
    fn test_text_longer_than_description_does_not_match() {
        let tables = MappingTables::default();
        let event = text(b"button/power PWRF 00000080 extra 00000000");
        assert_eq!(resolve(&tables, &event), None);
    }

    #[test]
    fn test_key_without_action_is_unresolved() {
        let tables = MappingTables::default();
        // PWRB is mapped in the event table but has no action by default.
        let event = text(b"button/power PWRB 00000080 00000000");
        assert_eq!(
            find_action_key(tables.events(), &event),
            Some("button/power PWRB 00000080")
        );
        assert_eq!(resolve(&tables, &event), None);
    }
}
