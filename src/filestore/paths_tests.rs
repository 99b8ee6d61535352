use super::*;

#[test]
fn nfc_collapses_combining_marks() {
    assert_eq!(normalize_nfc("Cafe\u{0301}"), "Caf\u{00e9}");
    assert!(same_path("Cafe\u{0301}.png", "Caf\u{00e9}.png"));
    assert!(!same_path("a.png", "b.png"));
}

#[test]
fn invalid_repo_paths() {
    assert!(validate_repo_path("").is_err());
    assert!(validate_repo_path("/leading.png").is_err());
    assert!(validate_repo_path("trailing/").is_err());
    assert!(validate_repo_path("double//slash").is_err());
    assert!(validate_repo_path("a/./b").is_err());
    assert!(validate_repo_path("a/../b").is_err());
    assert!(validate_repo_path("a\u{0000}b").is_err());
    assert!(validate_repo_path("img/2024/cat.png").is_ok());
}

#[test]
fn dir_paths_allow_root() {
    assert_eq!(normalize_dir_path("").unwrap(), "");
    assert_eq!(normalize_dir_path("/").unwrap(), "");
    assert_eq!(normalize_dir_path("/img/2024/").unwrap(), "img/2024");
    assert!(normalize_dir_path("img/../etc").is_err());
}

#[test]
fn file_paths_must_be_concrete() {
    assert_eq!(normalize_file_path("/img/a.png").unwrap(), "img/a.png");
    assert!(matches!(normalize_file_path(""), Err(AppError::InvalidRequest(_))));
    assert!(normalize_file_path("img/").is_err());
}
