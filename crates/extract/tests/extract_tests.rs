use change_extract::{
    apply_passes, extract_all, extract_changes, ChangeContent, ChangeContext, ChangeKind,
    ChangeRecord, CommitAttribution, ExtractOptions, FileInput,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_single_line_replacement_in_plain_text() {
    // A one-line edit becomes one replace record anchored on both sides
    let old = "alpha\nbeta\ngamma\n";
    let new = "alpha\nBETA\ngamma\n";

    let records = extract_changes("notes.txt", Some(old), Some(new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].change_type, ChangeKind::Replace);
    assert_eq!(records[0].context(), ChangeContext::Block);
    assert_eq!(records[0].line_old, Some(2));
    assert_eq!(records[0].line_new, Some(2));
    assert_eq!(
        records[0].content,
        ChangeContent::Block {
            old_lines: vec!["beta".to_string()],
            new_lines: vec!["BETA".to_string()],
        }
    );
}

#[test]
fn test_inserted_lines_have_no_old_anchor() {
    // Pure insertions carry only a new-side line number
    let old = "alpha\nomega\n";
    let new = "alpha\nbeta\ngamma\nomega\n";

    let records = extract_changes("notes.txt", Some(old), Some(new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].change_type, ChangeKind::Insert);
    assert_eq!(records[0].line_old, None);
    assert_eq!(records[0].line_new, Some(2));
    assert_eq!(
        records[0].content,
        ChangeContent::Block {
            old_lines: vec![],
            new_lines: vec!["beta".to_string(), "gamma".to_string()],
        }
    );
}

#[test]
fn test_deleted_lines_have_no_new_anchor() {
    // Pure deletions carry only an old-side line number
    let old = "alpha\nbeta\ngamma\nomega\n";
    let new = "alpha\nomega\n";

    let records = extract_changes("notes.txt", Some(old), Some(new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].change_type, ChangeKind::Delete);
    assert_eq!(records[0].line_old, Some(2));
    assert_eq!(records[0].line_new, None);
}

#[test]
fn test_multiple_edit_runs_yield_separate_records() {
    // Runs separated by unchanged lines stay separate records
    let old = "a\nx\nb\ny\nc\n";
    let new = "a\nX\nb\nY\nc\n";

    let records = extract_changes("notes.txt", Some(old), Some(new));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].line_old, Some(2));
    assert_eq!(records[1].line_old, Some(4));
    assert_eq!(records[0].change_type, ChangeKind::Replace);
    assert_eq!(records[1].change_type, ChangeKind::Replace);
}

#[test]
fn test_json_value_change_yields_kv_record() {
    // A changed JSON value is reported by key, not by line content
    let old = "{\n  \"name\": \"app\",\n  \"retries\": 2\n}\n";
    let new = "{\n  \"name\": \"app\",\n  \"retries\": 3\n}\n";

    let records = extract_changes("config.json", Some(old), Some(new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].context(), ChangeContext::Kv);
    assert_eq!(records[0].change_type, ChangeKind::Replace);
    assert_eq!(records[0].property(), Some("retries"));
    assert_eq!(records[0].line_old, Some(3));
    assert_eq!(records[0].line_new, Some(3));
    assert_eq!(
        records[0].content,
        ChangeContent::Kv {
            property: "retries".to_string(),
            old: Some("2".to_string()),
            new: Some("3".to_string()),
        }
    );
}

#[test]
fn test_json_nested_keys_use_dotted_paths() {
    // Nested objects and arrays are addressed with dotted paths
    let old = r#"{"server": {"port": 8080, "hosts": ["a"]}}"#;
    let new = r#"{"server": {"port": 9090, "hosts": ["a", "b"]}}"#;

    let records = extract_changes("config.json", Some(old), Some(new));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].property(), Some("server.port"));
    assert_eq!(records[1].property(), Some("server.hosts.1"));
    assert_eq!(records[1].change_type, ChangeKind::Insert);
}

#[test]
fn test_json_added_and_removed_keys() {
    // New keys become inserts, vanished keys become deletes
    let old = "{\n  \"keep\": 1,\n  \"drop\": 2\n}\n";
    let new = "{\n  \"keep\": 1,\n  \"add\": 3\n}\n";

    let records = extract_changes("config.json", Some(old), Some(new));

    assert_eq!(records.len(), 2);

    assert_eq!(records[0].property(), Some("add"));
    assert_eq!(records[0].change_type, ChangeKind::Insert);
    assert_eq!(records[0].line_old, None);
    assert_eq!(records[0].line_new, Some(3));
    assert_eq!(
        records[0].content,
        ChangeContent::Kv {
            property: "add".to_string(),
            old: None,
            new: Some("3".to_string()),
        }
    );

    assert_eq!(records[1].property(), Some("drop"));
    assert_eq!(records[1].change_type, ChangeKind::Delete);
    assert_eq!(records[1].line_old, Some(3));
    assert_eq!(records[1].line_new, None);
}

#[test]
fn test_created_json_file_reports_inserts() {
    // A freshly created structured file turns into per-key inserts
    let new = "{\n  \"port\": 8080\n}\n";

    let records = extract_changes("new.json", None, Some(new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].change_type, ChangeKind::Insert);
    assert_eq!(records[0].property(), Some("port"));
    assert_eq!(records[0].line_old, None);
    assert_eq!(records[0].line_new, Some(2));
}

#[test]
fn test_malformed_json_falls_back_to_block_records() {
    // If either side fails to parse, the diff degrades to line records
    let old = "{ \"mode\": \"fast\" }\n";
    let new = "{ \"mode\": oops,, }\n";

    let records = extract_changes("config.json", Some(old), Some(new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].context(), ChangeContext::Block);
    assert_eq!(records[0].change_type, ChangeKind::Replace);
}

#[test]
fn test_plist_value_change_yields_plist_kv_record() {
    // Parsed plists are diffed key by key like JSON, with their own context
    let old = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\">\n<dict>\n    <key>CFBundleVersion</key>\n    <string>100</string>\n</dict>\n</plist>\n";
    let new = old.replace("100", "101");

    let records = extract_changes("Info.plist", Some(old), Some(&new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].context(), ChangeContext::PlistKv);
    assert_eq!(records[0].property(), Some("CFBundleVersion"));
    assert_eq!(records[0].line_old, Some(5));
    assert_eq!(records[0].line_new, Some(5));
    assert_eq!(
        records[0].content,
        ChangeContent::PlistKv {
            property: "CFBundleVersion".to_string(),
            old: Some("100".to_string()),
            new: Some("101".to_string()),
        }
    );
}

#[test]
fn test_degraded_plist_diff_still_names_the_key() {
    // Even when the plist fails to parse, a one-line <string> edit is
    // attributed to the <key> above it
    let old = "<plist version=\"1.0\">\n<dict>\n    <key>Color</key>\n    <string>red</string>\n    <key>Blob</key>\n    <unsupported/>\n</dict>\n</plist>\n";
    let new = old.replace("red", "blue");

    let records = extract_changes("Settings.plist", Some(old), Some(&new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].context(), ChangeContext::PlistKv);
    assert_eq!(records[0].change_type, ChangeKind::Replace);
    assert_eq!(records[0].line_new, Some(4));
    assert_eq!(
        records[0].content,
        ChangeContent::PlistKv {
            property: "Color".to_string(),
            old: Some("red".to_string()),
            new: Some("blue".to_string()),
        }
    );
}

#[test]
fn test_properties_file_yields_kv_records() {
    // Flat key = value files are diffed by key
    let old = "# config\nname = app\ntimeout = 30\n";
    let new = "# config\nname = app\ntimeout = 45\n";

    let records = extract_changes("service.properties", Some(old), Some(new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].property(), Some("timeout"));
    assert_eq!(records[0].context(), ChangeContext::Kv);
    assert_eq!(records[0].line_old, Some(3));
    assert_eq!(records[0].line_new, Some(3));
}

#[test]
fn test_ini_sections_prefix_key_paths() {
    // Section headers become path prefixes so keys stay unambiguous
    let old = "[server]\nport = 8080\n";
    let new = "[server]\nport = 9090\n";

    let records = extract_changes("app.ini", Some(old), Some(new));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].property(), Some("server.port"));
}

#[test]
fn test_deleted_file_yields_single_marker_record() {
    // File deletion is one record with empty line runs
    let records = extract_changes("gone.txt", Some("line one\nline two\n"), None);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].change_type, ChangeKind::FileDeleted);
    assert_eq!(records[0].context(), ChangeContext::Block);
    assert_eq!(records[0].line_old, Some(1));
    assert_eq!(records[0].line_new, None);
    assert_eq!(
        records[0].content,
        ChangeContent::Block {
            old_lines: vec![],
            new_lines: vec![],
        }
    );
}

#[test]
fn test_identical_content_yields_no_records() {
    let text = "{\"a\": 1}\n";
    let records = extract_changes("same.json", Some(text), Some(text));
    assert_eq!(records, vec![]);
}

#[test]
fn test_block_record_serialization_shape() {
    // Block records carry line runs and no key fields
    let records = extract_changes("notes.txt", Some("alpha\nbeta\n"), Some("alpha\nBETA\n"));
    let value = serde_json::to_value(&records[0]).unwrap();
    let object = value.as_object().unwrap();

    assert_eq!(value["file"], "notes.txt");
    assert_eq!(value["context"], "block");
    assert_eq!(value["change_type"], "replace");
    assert_eq!(value["old_lines"], json!(["beta"]));
    assert_eq!(value["new_lines"], json!(["BETA"]));
    assert_eq!(value["line_old"], json!(2));
    assert_eq!(value["line_new"], json!(2));
    assert!(!object.contains_key("property"));
    assert!(!object.contains_key("old"));
    assert!(!object.contains_key("new"));
    assert!(!object.contains_key("commit_hash"));
}

#[test]
fn test_kv_record_serialization_includes_null_sides() {
    // The absent side of an insert or delete serializes as an explicit null
    let record = ChangeRecord::kv(
        "config.json",
        ChangeKind::Insert,
        "add",
        None,
        Some("3".to_string()),
        None,
        Some(3),
    );
    let value = serde_json::to_value(&record).unwrap();
    let object = value.as_object().unwrap();

    assert_eq!(value["context"], "kv");
    assert_eq!(value["change_type"], "insert");
    assert_eq!(value["property"], "add");
    assert!(object.contains_key("old"));
    assert!(value["old"].is_null());
    assert_eq!(value["new"], "3");
    assert!(object.contains_key("line_old"));
    assert!(value["line_old"].is_null());
    assert_eq!(value["line_new"], json!(3));
    assert!(!object.contains_key("old_lines"));
    assert!(!object.contains_key("new_lines"));
}

#[test]
fn test_deleted_file_serialization_shape() {
    let record = ChangeRecord::file_deleted("gone.txt", Some(1));
    let value = serde_json::to_value(&record).unwrap();
    let object = value.as_object().unwrap();

    assert_eq!(value["change_type"], "file-deleted");
    assert_eq!(value["context"], "block");
    assert_eq!(value["old_lines"], json!([]));
    assert_eq!(value["new_lines"], json!([]));
    assert_eq!(value["line_old"], json!(1));
    assert!(object.contains_key("line_new"));
    assert!(value["line_new"].is_null());
}

#[test]
fn test_commit_attribution_flattens_into_the_record() {
    // Commit fields sit at the top level of the serialized record
    let mut record = ChangeRecord::kv(
        "config.json",
        ChangeKind::Replace,
        "retries",
        Some("2".to_string()),
        Some("3".to_string()),
        Some(3),
        Some(3),
    );
    record.commit = Some(CommitAttribution {
        hash: "a1b2c3d".to_string(),
        author: "Dev One <dev@example.com>".to_string(),
        date: "2024-05-06T07:08:09+00:00".to_string(),
        message: "bump retries".to_string(),
    });

    let value = serde_json::to_value(&record).unwrap();

    assert_eq!(value["commit_hash"], "a1b2c3d");
    assert_eq!(value["commit_author"], "Dev One <dev@example.com>");
    assert_eq!(value["commit_date"], "2024-05-06T07:08:09+00:00");
    assert_eq!(value["commit_message"], "bump retries");
}

#[test]
fn test_records_round_trip_through_json() {
    let mut with_commit = ChangeRecord::kv(
        "config.json",
        ChangeKind::Replace,
        "retries",
        Some("2".to_string()),
        Some("3".to_string()),
        Some(3),
        Some(3),
    );
    with_commit.commit = Some(CommitAttribution {
        hash: "a1b2c3d".to_string(),
        author: "Dev One <dev@example.com>".to_string(),
        date: "2024-05-06T07:08:09+00:00".to_string(),
        message: "bump retries".to_string(),
    });
    let without_commit = ChangeRecord::block(
        "notes.txt",
        ChangeKind::Delete,
        vec!["beta".to_string()],
        vec![],
        Some(2),
        None,
    );

    for record in [with_commit, without_commit] {
        let value = serde_json::to_value(&record).unwrap();
        let back: ChangeRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}

#[test]
fn test_extract_all_keeps_input_order() {
    // Batch output follows the input order file by file
    let inputs = vec![
        FileInput {
            path: "b.txt".to_string(),
            old: Some("x\n".to_string()),
            new: Some("y\n".to_string()),
        },
        FileInput {
            path: "a.json".to_string(),
            old: Some("{\"k\": 1}".to_string()),
            new: Some("{\"k\": 2}".to_string()),
        },
    ];

    let records = extract_all(&inputs, &ExtractOptions::default());

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].file, "b.txt");
    assert_eq!(records[1].file, "a.json");
}

#[test]
fn test_structural_line_stripping_is_opt_in() {
    let record = ChangeRecord::block(
        "src/config.c",
        ChangeKind::Replace,
        vec!["};".to_string(), "old_call();".to_string()],
        vec!["new_call();".to_string(), "}".to_string()],
        Some(3),
        Some(3),
    );

    // off by default
    let kept = apply_passes(vec![record.clone()], &ExtractOptions::default());
    assert_eq!(kept, vec![record.clone()]);

    let options = ExtractOptions {
        strip_structural_lines: true,
        promote_single_line_kv: false,
    };
    let stripped = apply_passes(vec![record], &options);

    assert_eq!(stripped.len(), 1);
    assert_eq!(
        stripped[0].content,
        ChangeContent::Block {
            old_lines: vec!["old_call();".to_string()],
            new_lines: vec!["new_call();".to_string()],
        }
    );
    assert_eq!(stripped[0].change_type, ChangeKind::Replace);
}

#[test]
fn test_single_line_promotion_is_opt_in() {
    let record = ChangeRecord::block(
        "settings.conf.bak",
        ChangeKind::Replace,
        vec!["  \"level\": \"info\",".to_string()],
        vec!["  \"level\": \"debug\",".to_string()],
        Some(7),
        Some(7),
    );

    // off by default
    let kept = apply_passes(vec![record.clone()], &ExtractOptions::default());
    assert_eq!(kept[0].context(), ChangeContext::Block);

    let options = ExtractOptions {
        strip_structural_lines: false,
        promote_single_line_kv: true,
    };
    let promoted = apply_passes(vec![record], &options);

    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].change_type, ChangeKind::Replace);
    assert_eq!(promoted[0].line_old, Some(7));
    assert_eq!(
        promoted[0].content,
        ChangeContent::Kv {
            property: "level".to_string(),
            old: Some("\"info\"".to_string()),
            new: Some("\"debug\"".to_string()),
        }
    );
}
