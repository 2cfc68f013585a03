use proptest::prelude::*;
use respawn::watch::PathFilter;
use respawn::watch::path_utils::extension_of;
use respawn_test_utils::builders::PathFilterBuilder;
use std::path::Path;

// Rule sets drawn from a small alphabet so paths and rules actually collide.
fn rule_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-c]{1,2}", 0..3)
}

fn ext_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("\\.[a-c]{1,2}", 0..3)
}

// Relative paths like `ab/c.b`, `a/B/.c`, `ca`.
fn path_strategy() -> impl Strategy<Value = String> {
    (
        proptest::collection::vec("[a-cA-C]{1,2}", 0..3),
        "[a-cA-C]{0,2}",
        proptest::option::of("[a-cA-C]{1,2}"),
    )
        .prop_map(|(dirs, stem, ext)| {
            let mut name = stem;
            if let Some(ext) = ext {
                name.push('.');
                name.push_str(&ext);
            }
            if name.is_empty() {
                name.push('a');
            }
            let mut parts = dirs;
            parts.push(name);
            parts.join("/")
        })
}

fn naive_any_match(rules: &[String], s: &str) -> bool {
    rules.iter().any(|r| s.contains(&r.to_lowercase()))
}

proptest! {
    #[test]
    fn actionable_iff_extension_allowed_and_not_excluded(
        exclusions in rule_strategy(),
        extensions in ext_strategy(),
        path in path_strategy(),
    ) {
        let filter = PathFilter::from_rules(&exclusions, &[], &extensions).unwrap();
        let key = path.to_lowercase();
        let ext = extension_of(Path::new(&key));

        let expected = extensions.iter().any(|e| e.to_lowercase() == ext)
            && !naive_any_match(&exclusions, &key);

        prop_assert_eq!(filter.is_actionable(&key, &ext), expected);
    }

    #[test]
    fn admitted_directory_is_included_or_not_excluded(
        exclusions in rule_strategy(),
        inclusions in rule_strategy(),
        path in path_strategy(),
    ) {
        let filter = PathFilter::from_rules(&exclusions, &inclusions, &[]).unwrap();
        let key = path.to_lowercase();

        let admitted = filter.admits_directory(&key);
        let expected = naive_any_match(&inclusions, &key) || !naive_any_match(&exclusions, &key);
        prop_assert_eq!(admitted, expected);
    }

    #[test]
    fn matching_ignores_case(path in path_strategy()) {
        let filter = PathFilterBuilder::new().exclude("B").extension(".A").build();
        let lower = path.to_lowercase();
        let upper = path.to_uppercase();
        let ext = extension_of(Path::new(&lower));

        prop_assert_eq!(
            filter.is_actionable(&lower, &ext),
            filter.is_actionable(&upper, &ext.to_uppercase())
        );
    }
}

#[test]
fn empty_filter_admits_everything_and_triggers_nothing() {
    let filter = PathFilterBuilder::new().build();
    assert!(filter.admits_directory("anything/at/all"));
    assert!(!filter.is_actionable("main.go", ".go"));
    assert!(!filter.is_actionable("Makefile", ""));
}
