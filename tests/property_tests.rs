/// Property-based tests using proptest
/// Tests invariants of lead normalization that should hold for all inputs
use lexvoyage_api::errors::AppError;
use lexvoyage_api::intake::normalize_lead;
use lexvoyage_api::notifier::escape_html;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// Property: normalization never panics, whatever the field contents
proptest! {
    #[test]
    fn normalization_never_panics(name in "\\PC*", email in "\\PC*", phone in "\\PC*") {
        let _ = normalize_lead(&json!({"name": name, "email": email, "phone": phone}));
    }

    #[test]
    fn accepted_iff_name_and_email_non_blank(name in "[ a-zA-Z]{0,12}", email in "[ a-z@.]{0,12}") {
        let result = normalize_lead(&json!({"name": name, "email": email}));
        let should_accept = !name.trim().is_empty() && !email.trim().is_empty();

        match result {
            Ok(lead) => {
                prop_assert!(should_accept);
                prop_assert_eq!(lead.name, name.trim());
                prop_assert_eq!(lead.email, email.trim());
            }
            Err(AppError::Validation(_)) => prop_assert!(!should_accept),
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}

// Property: defaults and pass-through of counts
proptest! {
    #[test]
    fn children_defaults_to_zero_when_absent(adults in proptest::option::of(-5i64..50)) {
        let mut raw = Map::new();
        raw.insert("name".into(), json!("Jo"));
        raw.insert("email".into(), json!("jo@x.com"));
        if let Some(a) = adults {
            raw.insert("adults".into(), json!(a));
        }

        let lead = normalize_lead(&Value::Object(raw)).unwrap();
        prop_assert_eq!(lead.children, 0);
        prop_assert_eq!(lead.adults, adults);
    }

    #[test]
    fn counts_pass_through_unchanged(adults in any::<i64>(), children in any::<i64>()) {
        let lead = normalize_lead(&json!({
            "name": "Jo",
            "email": "jo@x.com",
            "adults": adults,
            "children": children
        }))
        .unwrap();

        prop_assert_eq!(lead.adults, Some(adults));
        prop_assert_eq!(lead.children, children);
    }
}

// Property: interests keep order and duplicates
proptest! {
    #[test]
    fn interests_preserved_verbatim(tags in proptest::collection::vec("\\PC{0,10}", 0..8)) {
        let lead = normalize_lead(&json!({
            "name": "Jo",
            "email": "jo@x.com",
            "interests": tags
        }))
        .unwrap();

        prop_assert_eq!(lead.interests, Some(tags));
    }

    #[test]
    fn non_array_interests_become_null(tag in "\\PC*") {
        let lead = normalize_lead(&json!({
            "name": "Jo",
            "email": "jo@x.com",
            "interests": tag
        }))
        .unwrap();

        prop_assert_eq!(lead.interests, None);
    }
}

// Property: escaped HTML contains no raw markup characters
proptest! {
    #[test]
    fn escaped_html_has_no_markup(input in "\\PC*") {
        let escaped = escape_html(&input);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
    }
}
