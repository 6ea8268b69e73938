use super::*;

fn monorepo_config() -> Config {
    Config::from_json_str(
        r#"{
            "version": "1.0",
            "commands": {"test": {"command": "true"}},
            "paths": [
                {"path": "packages/frontend/**", "commands": {"test": {"command": "vitest"}}},
                {"path": "packages/backend/**", "commands": {"test": {"command": "pytest"}}},
                {"path": "packages/shared/**", "commands": {"test": {"command": "tsc"}}}
            ]
        }"#,
    )
    .unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn root() -> &'static Path {
    Path::new("/repo")
}

// --- glob semantics ---

#[test]
fn star_stays_within_one_segment() {
    let m = compile_glob("src/*.rs").unwrap();
    assert!(m.is_match("src/main.rs"));
    assert!(!m.is_match("src/nested/main.rs"));
}

#[test]
fn double_star_crosses_segments() {
    let m = compile_glob("pkg/foo/**").unwrap();
    assert!(m.is_match("pkg/foo/a.ts"));
    assert!(m.is_match("pkg/foo/deep/b.ts"));
    assert!(!m.is_match("pkg/foobar/a.ts"));
}

#[test]
fn question_mark_matches_one_character() {
    let m = compile_glob("a?.txt").unwrap();
    assert!(m.is_match("ab.txt"));
    assert!(!m.is_match("a/b.txt"));
    assert!(!m.is_match("abc.txt"));
}

#[test]
fn alternation_is_supported() {
    let m = compile_glob("src/**/*.{ts,tsx}").unwrap();
    assert!(m.is_match("src/app/view.tsx"));
    assert!(m.is_match("src/util.ts"));
    assert!(!m.is_match("src/util.js"));
}

#[test]
fn invalid_glob_is_a_config_error() {
    let err = compile_glob("src/[unclosed").unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

// --- routing ---

#[test]
fn files_route_to_their_scopes() {
    let config = monorepo_config();
    let files = strings(&["packages/frontend/src/a.ts", "packages/backend/svc/b.py"]);
    let groups = map_files(&config, &files, root()).unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].label(), "packages/frontend/**");
    assert_eq!(groups[0].files, vec!["packages/frontend/src/a.ts"]);
    assert_eq!(groups[1].label(), "packages/backend/**");
    assert_eq!(groups[1].files, vec!["packages/backend/svc/b.py"]);
}

#[test]
fn shared_file_does_not_fan_out_to_unrelated_scopes() {
    // No dependency inference: only the shared scope's own glob matches.
    let config = monorepo_config();
    let files = strings(&["packages/shared/lib/auth.ts"]);
    let groups = map_files(&config, &files, root()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].label(), "packages/shared/**");
}

#[test]
fn file_matching_several_globs_joins_every_group() {
    let config = Config::from_json_str(
        r#"{
            "version": "1.0",
            "commands": {},
            "paths": [
                {"path": "packages/**", "commands": {}},
                {"path": "**/*.ts", "commands": {}}
            ]
        }"#,
    )
    .unwrap();
    let files = strings(&["packages/app/index.ts"]);
    let groups = map_files(&config, &files, root()).unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].files, groups[1].files);
}

#[test]
fn unmatched_files_form_the_root_group_last() {
    let config = monorepo_config();
    let files = strings(&["README.md", "packages/frontend/src/a.ts"]);
    let groups = map_files(&config, &files, root()).unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].label(), "root");
    assert_eq!(groups[1].files, vec!["README.md"]);
}

#[test]
fn every_file_lands_somewhere_and_nowhere_wrong() {
    // Partition property: each file appears in the groups whose glob it
    // matches, or in root when it matches none.
    let config = monorepo_config();
    let files = strings(&[
        "packages/frontend/a.ts",
        "packages/backend/b.py",
        "tools/script.sh",
    ]);
    let groups = map_files(&config, &files, root()).unwrap();

    for file in &files {
        let holders: Vec<&str> = groups
            .iter()
            .filter(|g| g.files.contains(file))
            .map(ComponentGroup::label)
            .collect();
        assert_eq!(holders.len(), 1, "{file} held by {holders:?}");
    }
    for group in &groups {
        let Some(scope) = group.scope else { continue };
        let matcher = compile_glob(&scope.path).unwrap();
        for file in &group.files {
            assert!(matcher.is_match(file), "{file} in wrong group {}", group.label());
        }
    }
}

#[test]
fn absolute_paths_match_workspace_relative_globs() {
    let config = monorepo_config();
    let files = strings(&["/repo/packages/frontend/src/a.ts"]);
    let groups = map_files(&config, &files, root()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].label(), "packages/frontend/**");
    // The original path is preserved in the group.
    assert_eq!(groups[0].files, vec!["/repo/packages/frontend/src/a.ts"]);
}

#[test]
fn backslash_separators_are_normalized() {
    let config = monorepo_config();
    let files = strings(&["packages\\frontend\\src\\a.ts"]);
    let groups = map_files(&config, &files, root()).unwrap();
    assert_eq!(groups[0].label(), "packages/frontend/**");
}

#[test]
fn empty_file_list_yields_no_groups() {
    let config = monorepo_config();
    assert!(map_files(&config, &[], root()).unwrap().is_empty());
}

// --- unconditional mode ---

#[test]
fn unconditional_runs_every_scope_plus_root() {
    let config = monorepo_config();
    let groups = unconditional_groups(&config);

    let labels: Vec<&str> = groups.iter().map(ComponentGroup::label).collect();
    assert_eq!(
        labels,
        vec![
            "packages/frontend/**",
            "packages/backend/**",
            "packages/shared/**",
            "root"
        ]
    );
    assert!(groups.iter().all(|g| g.files.is_empty()));
}
