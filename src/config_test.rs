use std::sync::{Mutex, MutexGuard};

use super::*;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes env mutation across the test threads and starts from a clean slate.
fn clean_env() -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        std::env::remove_var("BLOCKBOARD_DATA_DIR");
        std::env::remove_var("BLOCKBOARD_STORE_KEY");
        std::env::remove_var("BLOCKBOARD_MAX_ROWS");
    }
    guard
}

#[test]
fn from_env_defaults() {
    let _env = clean_env();
    let cfg = Config::from_env().unwrap();
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.data_dir, PathBuf::from(".blockboard"));
    assert_eq!(cfg.store_key, "blockboard-dashboards");
    assert_eq!(cfg.max_rows, 1000);
}

#[test]
fn from_env_reads_overrides() {
    let _env = clean_env();
    unsafe {
        std::env::set_var("BLOCKBOARD_DATA_DIR", "/var/lib/boards");
        std::env::set_var("BLOCKBOARD_STORE_KEY", "team-a");
        std::env::set_var("BLOCKBOARD_MAX_ROWS", " 250 ");
    }
    let cfg = Config::from_env().unwrap();
    assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/boards"));
    assert_eq!(cfg.store_key, "team-a");
    assert_eq!(cfg.max_rows, 250);
}

#[test]
fn from_env_rejects_blank_store_key() {
    let _env = clean_env();
    unsafe { std::env::set_var("BLOCKBOARD_STORE_KEY", "  ") };
    let err = Config::from_env().unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "BLOCKBOARD_STORE_KEY", value: "  ".into() });
}

#[test]
fn from_env_rejects_bad_row_ceiling() {
    let _env = clean_env();
    for raw in ["0", "-3", "lots", ""] {
        unsafe { std::env::set_var("BLOCKBOARD_MAX_ROWS", raw) };
        let err = Config::from_env().unwrap_err();
        assert_eq!(err, ConfigError::Invalid { var: "BLOCKBOARD_MAX_ROWS", value: raw.into() }, "{raw:?}");
    }
}

#[test]
fn parse_max_rows_defaults_when_unset() {
    assert_eq!(parse_max_rows(None).unwrap(), DEFAULT_MAX_ROWS);
    assert_eq!(parse_max_rows(Some("12")).unwrap(), 12);
}

#[test]
fn from_env_rejects_row_ceiling_above_limit() {
    let _env = clean_env();
    for raw in ["10001", "4000000000"] {
        unsafe { std::env::set_var("BLOCKBOARD_MAX_ROWS", raw) };
        let err = Config::from_env().unwrap_err();
        assert_eq!(err, ConfigError::Invalid { var: "BLOCKBOARD_MAX_ROWS", value: raw.into() }, "{raw:?}");
    }
}

#[test]
fn parse_max_rows_accepts_the_limit() {
    assert_eq!(parse_max_rows(Some("10000")).unwrap(), MAX_ROWS_LIMIT);
}

#[cfg(unix)]
#[test]
fn from_env_rejects_non_unicode_value() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let _env = clean_env();
    unsafe { std::env::set_var("BLOCKBOARD_DATA_DIR", OsStr::from_bytes(b"/tmp/\xff")) };
    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { var: "BLOCKBOARD_DATA_DIR", .. }));
    unsafe { std::env::remove_var("BLOCKBOARD_DATA_DIR") };
}
