mod common;

use std::sync::Arc;
use std::thread;

use common::{keyed_manager, pem_pair, reference_payload, test_keypair};
use keystamp_license::{
    FsLicenseStore, LicenseError, LicenseManager, LicensePayload, LicenseStore, Rejection,
    StaticFingerprint,
};

fn current_window_payload(fingerprint: &str) -> LicensePayload {
    let now = chrono::Utc::now().timestamp_millis();
    LicensePayload::new(fingerprint, now - 60_000, now + 3_600_000).with_feature("pro")
}

// ── Issuance ─────────────────────────────────────────────────────

#[test]
fn issue_without_private_key_returns_no_token() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LicenseManager::new(StaticFingerprint::new("X"), FsLicenseStore::new(dir.path()));
    assert!(matches!(
        manager.issue(&reference_payload()),
        Err(LicenseError::NoPrivateKeyLoaded)
    ));
}

#[test]
fn inverted_window_is_refused_at_issuance() {
    let dir = tempfile::tempdir().unwrap();
    let manager = keyed_manager("X", dir.path());
    assert!(matches!(
        manager.issue(&LicensePayload::new("X", 2000, 1000)),
        Err(LicenseError::InvalidWindow {
            start: 2000,
            end: 1000
        })
    ));
}

#[test]
fn single_instant_window_is_issuable() {
    let dir = tempfile::tempdir().unwrap();
    let manager = keyed_manager("X", dir.path());
    let token = manager.issue(&LicensePayload::new("X", 1000, 1000)).unwrap();
    assert!(manager.verify(&token, "X", 1000).is_ok());
}

// ── Verification ─────────────────────────────────────────────────

#[test]
fn verify_now_uses_injected_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let manager = keyed_manager("THIS-HOST", dir.path());

    let token = manager.issue(&current_window_payload("THIS-HOST")).unwrap();
    assert!(manager.verify_now(&token).is_ok());

    let foreign = manager.issue(&current_window_payload("OTHER-HOST")).unwrap();
    assert_eq!(manager.verify_now(&foreign), Err(Rejection::DeviceMismatch));
}

#[test]
fn closure_fingerprint_source() {
    let dir = tempfile::tempdir().unwrap();
    let (private_pem, public_pem) = pem_pair(&test_keypair());
    let manager = LicenseManager::new(|| "from-closure".to_string(), FsLicenseStore::new(dir.path()));
    manager.load_private_key_pem(&private_pem).unwrap();
    manager.load_public_key_pem(&public_pem).unwrap();

    assert_eq!(manager.current_fingerprint(), "from-closure");
    let token = manager.issue(&current_window_payload("from-closure")).unwrap();
    assert!(manager.verify_now(&token).is_ok());
}

#[test]
fn managers_do_not_share_keys() {
    let dir = tempfile::tempdir().unwrap();
    let keyed = keyed_manager("X", dir.path());
    let bare = LicenseManager::new(StaticFingerprint::new("X"), FsLicenseStore::new(dir.path()));

    assert!(keyed.engine().has_private_key());
    assert!(!bare.engine().has_private_key());
    assert!(!bare.engine().has_public_key());

    let token = keyed.issue(&LicensePayload::new("X", 0, 10)).unwrap();
    assert_eq!(bare.verify(&token, "X", 5), Err(Rejection::InvalidSignature));
}

#[test]
fn parallel_verification_of_independent_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(keyed_manager("X", dir.path()));

    let handles: Vec<_> = (0..8i64)
        .map(|n| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let payload = LicensePayload::new("X", n * 100, n * 100 + 50);
                let token = manager.issue(&payload).unwrap();
                assert_eq!(manager.verify(&token, "X", n * 100 + 25).unwrap(), payload);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

// ── Persistence ──────────────────────────────────────────────────

#[test]
fn save_then_load_and_verify() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("nested").join("license");
    let manager = keyed_manager("X", &store_dir);

    let payload = current_window_payload("X");
    let token = manager.issue(&payload).unwrap();
    manager.save_license("app.lic", &token).unwrap();
    assert!(store_dir.join("app.lic").exists());

    assert_eq!(manager.load_and_verify("app.lic", None).unwrap(), payload);
    assert_eq!(manager.load_and_verify("app.lic", Some("X")).unwrap(), payload);
}

#[test]
fn load_and_verify_explicit_fingerprint_overrides_source() {
    let dir = tempfile::tempdir().unwrap();
    let manager = keyed_manager("X", dir.path());
    let token = manager.issue(&current_window_payload("X")).unwrap();
    manager.save_license("app.lic", &token).unwrap();

    assert!(matches!(
        manager.load_and_verify("app.lic", Some("Y")),
        Err(LicenseError::Rejected(Rejection::DeviceMismatch))
    ));
}

#[test]
fn load_and_verify_at_uses_given_instant() {
    let dir = tempfile::tempdir().unwrap();
    let manager = keyed_manager("X", dir.path());
    let payload = LicensePayload::new("X", 1000, 2000);
    let token = manager.issue(&payload).unwrap();
    manager.save_license("app.lic", &token).unwrap();

    assert_eq!(manager.load_and_verify_at("app.lic", "X", 2000).unwrap(), payload);
    assert!(matches!(
        manager.load_and_verify_at("app.lic", "X", 2001),
        Err(LicenseError::Rejected(Rejection::Expired { valid_end: 2000, now: 2001 }))
    ));
    assert!(matches!(
        manager.load_and_verify_at("absent.lic", "X", 1500),
        Err(LicenseError::NotFound(_))
    ));
}

#[test]
fn load_missing_license_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let manager = keyed_manager("X", dir.path());
    match manager.load_and_verify("absent.lic", None) {
        Err(LicenseError::NotFound(path)) => assert!(path.ends_with("absent.lic")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn non_utf8_license_file_is_malformed_token() {
    let dir = tempfile::tempdir().unwrap();
    let manager = keyed_manager("X", dir.path());
    FsLicenseStore::new(dir.path())
        .write_license("bad.lic", &[0xff, 0xfe, b'|'])
        .unwrap();
    assert!(matches!(
        manager.load_and_verify("bad.lic", None),
        Err(LicenseError::Rejected(Rejection::MalformedToken(_)))
    ));
}

#[test]
fn expired_stored_license_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let manager = keyed_manager("X", dir.path());
    let token = manager.issue(&LicensePayload::new("X", 0, 1)).unwrap();
    manager.save_license("old.lic", &token).unwrap();
    assert!(matches!(
        manager.load_and_verify("old.lic", None),
        Err(LicenseError::Rejected(Rejection::Expired { valid_end: 1, .. }))
    ));
}

#[test]
fn store_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsLicenseStore::new(dir.path());
    store.write_license("a.lic", b"first").unwrap();
    store.write_license("a.lic", b"second").unwrap();
    assert_eq!(store.read_license("a.lic").unwrap(), b"second");
    assert_eq!(store.path_for("a.lic"), dir.path().join("a.lic"));
}

#[test]
fn default_store_points_at_license_dir() {
    assert_eq!(
        FsLicenseStore::default().dir(),
        std::path::Path::new(keystamp_license::DEFAULT_LICENSE_DIR)
    );
}
