//! Integration tests for the file module against a real file system

mod common;

use std::os::unix::fs::{MetadataExt, PermissionsExt};

use common::{assert_file_exists, assert_file_not_exists, TestEnvironment};
use rustle_play::modules::files::{FileArgs, FileModule};
use rustle_play::modules::{ModuleError, PlayModule, PlayStatus, ValidationError};

fn file_task(name: &str, body: &str) -> String {
    format!("- name: {name}\n  file:\n{body}")
}

#[tokio::test]
async fn test_directory_state_is_idempotent() {
    let env = TestEnvironment::new();
    let target = env.temp_str("a/b/c");
    let playbook = file_task("mk", &format!("    path: '{target}'\n    state: directory\n"));

    let first = env.run(&playbook).await;
    let second = env.run(&playbook).await;

    let expected = format!("step name:mk, module:file, result:success, path:{target}, state:directory");
    assert_eq!(first, vec![expected.clone()]);
    assert_eq!(second, vec![expected]);
    assert!(env.temp_path("a/b/c").is_dir());
}

#[tokio::test]
async fn test_absent_state_is_idempotent() {
    let env = TestEnvironment::new();
    env.create_test_file("doomed.txt", "bye");
    let target = env.temp_str("doomed.txt");
    let playbook = file_task("rm", &format!("    path: '{target}'\n    state: absent\n"));

    let first = env.run_records(&playbook).await;
    let second = env.run_records(&playbook).await;

    assert_eq!(first[0].status, PlayStatus::Success);
    assert_eq!(second[0].status, PlayStatus::Success);
    assert_eq!(first[0].msg, second[0].msg);
    assert_file_not_exists(&env.temp_path("doomed.txt"));
}

#[tokio::test]
async fn test_absent_removes_directory_tree() {
    let env = TestEnvironment::new();
    std::fs::create_dir_all(env.temp_path("tree/nested")).unwrap();
    env.create_test_file("tree/nested/file.txt", "x");

    let playbook = file_task(
        "rm",
        &format!("    path: '{}'\n    state: absent\n", env.temp_str("tree")),
    );
    let records = env.run_records(&playbook).await;

    assert_eq!(records[0].status, PlayStatus::Success);
    assert_file_not_exists(&env.temp_path("tree"));
}

#[tokio::test]
async fn test_touch_then_numeric_mode() {
    let env = TestEnvironment::new();
    let target = env.temp_str("touched");
    let playbook = file_task(
        "touch",
        &format!("    dest: '{target}'\n    state: touch\n    mode: '0640'\n"),
    );

    let lines = env.run(&playbook).await;

    assert_eq!(
        lines,
        vec![format!(
            "step name:touch, module:file, result:success, path:{target}, state:touch, mode:640"
        )]
    );
    let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o640);
}

#[tokio::test]
async fn test_symbolic_mode_only() {
    let env = TestEnvironment::new();
    let path = env.create_test_file("script.sh", "#!/bin/sh\n");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let playbook = file_task(
        "exec",
        &format!("    name: '{}'\n    mode: u+x,go-r\n", path.display()),
    );
    let records = env.run_records(&playbook).await;

    assert_eq!(records[0].status, PlayStatus::Success, "{}", records[0]);
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o700);
}

#[tokio::test]
async fn test_bad_mode_fails() {
    let env = TestEnvironment::new();
    let path = env.create_test_file("plain", "");

    let playbook = file_task(
        "bad",
        &format!("    path: '{}'\n    mode: u+q\n", path.display()),
    );
    let records = env.run_records(&playbook).await;

    assert_eq!(records[0].status, PlayStatus::Fail);
    assert!(records[0].msg.contains("u+q"), "{}", records[0].msg);
}

#[tokio::test]
async fn test_symlink_and_hard_link() {
    let env = TestEnvironment::new();
    let src = env.create_test_file("source.txt", "data");
    let soft = env.temp_str("soft");
    let hard = env.temp_str("hard");

    let playbook = format!(
        "{}{}",
        file_task(
            "soft",
            &format!("    src: '{}'\n    dest: '{soft}'\n    state: link\n", src.display())
        ),
        file_task(
            "hard",
            &format!("    src: '{}'\n    dest: '{hard}'\n    state: hard\n", src.display())
        ),
    );

    // Second run proves existing links are left alone
    for _ in 0..2 {
        let records = env.run_records(&playbook).await;
        assert!(
            records.iter().all(|r| r.status == PlayStatus::Success),
            "{records:?}"
        );
    }

    assert_eq!(std::fs::read_link(&soft).unwrap(), src);
    let src_ino = std::fs::metadata(&src).unwrap().ino();
    assert_eq!(std::fs::metadata(&hard).unwrap().ino(), src_ino);
}

#[tokio::test]
async fn test_missing_target_fails_validation() {
    let module = FileModule::new();
    let args = FileArgs {
        state: Some("touch".to_string()),
        ..Default::default()
    };

    let err = module.apply(&args).await.unwrap_err();
    assert!(matches!(
        err,
        ModuleError::Validation(ValidationError::NoFileName)
    ));
}

#[tokio::test]
async fn test_run_all_batch() {
    let env = TestEnvironment::new();
    let module = FileModule::new();
    let list = format!(
        "- name: one\n  file: {{path: '{}', state: directory}}\n- name: two\n  file: {{path: '{}', state: touch}}\n",
        env.temp_str("dir"),
        env.temp_str("dir/file"),
    );

    module.run_all(&list).await;
    let results = module.drain_results().await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.status == PlayStatus::Success));
    assert_file_exists(&env.temp_path("dir/file"));
    assert!(module.drain_results().await.is_empty());

    module.run_all("[]").await;
    let results = module.drain_results().await;
    assert_eq!(results[0].msg, "file book no data");
    assert_eq!(results[0].status, PlayStatus::Fail);
}
