//! Integration tests for the per-archive pipeline stages.

mod common;

use common::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;
use whd_extractor::{ArchiveKind, ExtractMode, LowSpacePolicy, WalkOptions};

/// Snapshot of every file below a directory: contents and modification time.
fn snapshot(dir: &Path) -> BTreeMap<String, (Vec<u8>, SystemTime)> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let key = e.path().strip_prefix(dir).unwrap().display().to_string();
            let meta = e.metadata().unwrap();
            (key, (fs::read(e.path()).unwrap(), meta.modified().unwrap()))
        })
        .collect()
}

#[test]
fn test_low_space_skips_file() {
    let fixture = Fixture::new();
    fixture.add_source_file("A/game1.lha");

    let mut options = WalkOptions::default();
    options.space_check = true;

    let mut runner = FakeRunner::new();
    let summary = run_walk(&fixture, &options, &default_tools(), &mut runner, &FixedSpace(Some(5)));

    assert!(runner.commands.is_empty());
    assert!(runner.listings.is_empty());
    assert_eq!(summary.total_found(), 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(!summary.halted);
}

#[test]
fn test_unknown_space_counts_as_low() {
    let fixture = Fixture::new();
    fixture.add_source_file("game.lzx");

    let mut options = WalkOptions::default();
    options.space_check = true;

    let mut runner = FakeRunner::new();
    let summary = run_walk(&fixture, &options, &default_tools(), &mut runner, &FixedSpace(None));

    assert!(runner.commands.is_empty());
    assert_eq!(summary.found(ArchiveKind::Lzx), 0);
}

#[test]
fn test_low_space_skip_policy_keeps_walking() {
    let fixture = Fixture::new();
    fixture.add_source_file("A/one.lha");
    fixture.add_source_file("B/two.lha");

    let mut options = WalkOptions::default();
    options.space_check = true;

    let mut runner = FakeRunner::new();
    let summary = run_walk(&fixture, &options, &default_tools(), &mut runner, &FixedSpace(Some(1)));

    // both archives were considered and skipped
    assert_eq!(summary.errors.len(), 2);
    assert!(runner.commands.is_empty());
}

#[test]
fn test_low_space_halt_policy_stops_walk() {
    let fixture = Fixture::new();
    fixture.add_source_file("A/one.lha");
    fixture.add_source_file("B/two.lha");

    let mut options = WalkOptions::default();
    options.space_check = true;
    options.low_space_policy = LowSpacePolicy::HaltWalk;

    let mut runner = FakeRunner::new();
    let summary = run_walk(&fixture, &options, &default_tools(), &mut runner, &FixedSpace(Some(1)));

    assert_eq!(summary.errors.len(), 1);
    assert!(summary.halted);
    assert!(runner.commands.is_empty());
}

#[test]
fn test_space_guard_disabled_ignores_low_space() {
    let fixture = Fixture::new();
    fixture.add_source_file("A/one.lha");

    let mut runner = FakeRunner::new();
    let summary = run_walk(
        &fixture,
        &WalkOptions::default(),
        &default_tools(),
        &mut runner,
        &FixedSpace(Some(0)),
    );

    assert_eq!(runner.commands.len(), 1);
    assert_eq!(summary.found(ArchiveKind::Lha), 1);
}

#[test]
fn test_new_destination_skips_protection_reset() {
    let fixture = Fixture::new();
    fixture.add_source_file("A/game.lha");

    let mut runner = FakeRunner::new().with_listing("Game/readme\n");
    run_walk(
        &fixture,
        &WalkOptions::default(),
        &default_tools(),
        &mut runner,
        &FixedSpace(Some(1000)),
    );

    assert!(runner.listings.is_empty());
    assert_eq!(runner.commands.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_existing_destination_resets_protection() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = Fixture::new();
    fixture.add_source_file("A/game.lha");

    let protected = fixture.dst.path().join("A/Game/data/level1");
    fs::create_dir_all(protected.parent().unwrap()).unwrap();
    fs::write(&protected, b"old").unwrap();
    fs::set_permissions(&protected, fs::Permissions::from_mode(0o444)).unwrap();

    let mut runner = FakeRunner::new().with_listing("Game/data/level1\nGame/readme\n");
    let summary = run_walk(
        &fixture,
        &WalkOptions::default(),
        &default_tools(),
        &mut runner,
        &FixedSpace(Some(1000)),
    );

    let src = fixture.src_str();
    assert_eq!(runner.listings, [format!("lha vq \"{src}/A/game.lha\"")]);
    assert_eq!(runner.commands.len(), 1);
    assert_eq!(summary.found(ArchiveKind::Lha), 1);

    let mode = fs::metadata(&protected).unwrap().permissions().mode();
    assert_eq!(mode & 0o600, 0o600);
}

#[test]
fn test_listing_without_directory_still_extracts() {
    let fixture = Fixture::new();
    fixture.add_source_file("A/game.lha");
    fs::create_dir_all(fixture.dst.path().join("A")).unwrap();

    let mut runner = FakeRunner::new().with_listing("readme\nicon.info\n");
    let summary = run_walk(
        &fixture,
        &WalkOptions::default(),
        &default_tools(),
        &mut runner,
        &FixedSpace(Some(1000)),
    );

    assert_eq!(runner.listings.len(), 1);
    assert_eq!(runner.commands.len(), 1);
    assert_eq!(summary.found(ArchiveKind::Lha), 1);
    assert!(summary.errors.is_empty());
}

#[test]
fn test_lzx_never_lists_contents() {
    let fixture = Fixture::new();
    fixture.add_source_file("A/game.lzx");
    fs::create_dir_all(fixture.dst.path().join("A")).unwrap();

    let mut runner = FakeRunner::new().with_listing("Game/readme\n");
    run_walk(
        &fixture,
        &WalkOptions::default(),
        &default_tools(),
        &mut runner,
        &FixedSpace(Some(1000)),
    );

    assert!(runner.listings.is_empty());
    assert_eq!(runner.commands.len(), 1);
}

#[test]
fn test_test_only_rerun_leaves_destination_untouched() {
    let fixture = Fixture::new();
    fixture.add_source_file("A/game1.lha");
    fixture.add_source_file("B/C/game2.lzx");

    // first run extracts
    let mut runner = FakeRunner::new()
        .writing_output()
        .with_listing("A/x\n");
    let first = run_walk(
        &fixture,
        &WalkOptions::default(),
        &default_tools(),
        &mut runner,
        &FixedSpace(Some(1000)),
    );
    assert_eq!(first.total_found(), 2);
    let before = snapshot(fixture.dst.path());
    assert_eq!(before.len(), 2);

    // verification run
    let mut options = WalkOptions::default();
    options.mode = ExtractMode::TestOnly;
    let mut runner = FakeRunner::new()
        .writing_output()
        .with_listing("A/x\n");
    let second = run_walk(&fixture, &options, &default_tools(), &mut runner, &FixedSpace(Some(1000)));

    assert_eq!(second.total_found(), 2);
    assert!(runner.listings.is_empty());

    let src = fixture.src_str();
    assert!(runner
        .commands
        .contains(&format!("lha t \"{src}/A/game1.lha\" \"{}/A/\"", fixture.dst_str())));
    assert!(runner
        .commands
        .iter()
        .any(|c| c.starts_with("unlzx -v ")));

    assert_eq!(snapshot(fixture.dst.path()), before);
}
