//! The rule files shipped in `conf/` must load cleanly.

use std::path::{Path, PathBuf};

use mmsmedia_core::{AliasTable, ConfigResolver, RuleSet, Settings};

fn conf_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("conf")
}

fn rule_files() -> Vec<PathBuf> {
    std::fs::read_dir(conf_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter(|path| path.file_name().is_some_and(|name| name != "aliases.json"))
        .collect()
}

#[test]
fn every_rule_file_parses_with_valid_patterns() {
    let files = rule_files();
    assert!(files.len() >= 2);

    for path in files {
        let json = std::fs::read_to_string(&path).unwrap();
        let rules = RuleSet::from_json(&json)
            .unwrap_or_else(|e| panic!("{} is malformed: {e}", path.display()));
        assert!(!rules.is_empty(), "{} has no rules", path.display());

        for mime_type in ["image/gif", "image/jpeg", "text/plain", "text/html", "application/smil"] {
            for rule in rules.ignore_rules(mime_type) {
                assert!(rule.is_valid(), "{}: invalid {mime_type} rule {rule:?}", path.display());
            }
            for transform in rules.transform_rules(mime_type) {
                assert!(transform.is_valid(), "{}: invalid {mime_type} transform", path.display());
            }
        }
    }
}

#[test]
fn aliases_point_at_shipped_carriers() {
    let json = std::fs::read_to_string(conf_dir().join("aliases.json")).unwrap();
    let aliases = AliasTable::from_json(&json).unwrap();
    assert!(!aliases.is_empty());

    assert_eq!(aliases.resolve("pictures.sprintpcs.com"), "pm.sprint.com");
    assert!(conf_dir().join("pm.sprint.com.json").exists());
}

#[test]
fn sprint_number_rule() {
    let settings = Settings::new(std::env::temp_dir().join("mmsmedia-conf-test"), conf_dir());
    let resolved = ConfigResolver::new(&settings).resolve("messaging.sprintpcs.com");

    assert_eq!(resolved.carrier, "pm.sprint.com");
    let rule = resolved.rules.number().unwrap();
    assert_eq!(rule.header(), "X-Mms-From");
    assert_eq!(rule.apply("+12065551212/TYPE=PLMN"), "2065551212");
}

#[test]
fn subject_noise_rule_matches_whole_text_only() {
    let json = std::fs::read_to_string(conf_dir().join("default.json")).unwrap();
    let rules = RuleSet::from_json(&json).unwrap();
    let ignores = |text: &[u8]| {
        rules
            .ignore_rules("text/plain")
            .iter()
            .any(|rule| rule.is_match(text))
    };

    assert!(ignores(b"No Subject"));
    assert!(ignores(b"  MMS \n"));
    assert!(!ignores(b"Look at this\nmms\nsee you soon"));
    assert!(!ignores(b"no subject\nbut a real body"));
}
