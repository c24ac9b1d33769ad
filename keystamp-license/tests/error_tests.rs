use keystamp_license::{LicenseError, Rejection, Stage};

#[test]
fn error_display_no_keys() {
    assert!(format!("{}", LicenseError::NoPrivateKeyLoaded).contains("private key"));
    assert!(format!("{}", LicenseError::NoPublicKeyLoaded).contains("public key"));
}

#[test]
fn error_display_signature_failure() {
    let err = LicenseError::SignatureFailure("backend down".into());
    let msg = format!("{err}");
    assert!(msg.contains("signature"));
    assert!(msg.contains("backend down"));
}

#[test]
fn error_display_malformed() {
    assert!(format!("{}", LicenseError::MalformedToken("x".into())).contains("malformed license token"));
    assert!(format!("{}", LicenseError::MalformedPayload("x".into())).contains("malformed license payload"));
}

#[test]
fn error_display_invalid_window() {
    let msg = format!("{}", LicenseError::InvalidWindow { start: 5, end: 1 });
    assert!(msg.contains('5'));
    assert!(msg.contains('1'));
}

#[test]
fn error_display_not_found() {
    let err = LicenseError::NotFound("license/app.lic".into());
    assert!(format!("{err}").contains("license/app.lic"));
}

#[test]
fn rejected_is_transparent() {
    let err: LicenseError = Rejection::DeviceMismatch.into();
    assert_eq!(format!("{err}"), format!("{}", Rejection::DeviceMismatch));
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: LicenseError = io.into();
    assert!(format!("{err}").contains("io error"));
}

#[test]
fn rejection_kinds_and_stages() {
    let cases = [
        (Rejection::MalformedToken("x".into()), "malformed_token", Stage::TokenParse),
        (Rejection::InvalidSignature, "invalid_signature", Stage::SignatureCheck),
        (Rejection::MalformedPayload("x".into()), "malformed_payload", Stage::PayloadDecode),
        (Rejection::DeviceMismatch, "device_mismatch", Stage::BindingCheck),
        (
            Rejection::NotYetValid { valid_start: 2, now: 1 },
            "not_yet_valid",
            Stage::TemporalCheck,
        ),
        (
            Rejection::Expired { valid_end: 1, now: 2 },
            "expired",
            Stage::TemporalCheck,
        ),
    ];
    for (rejection, kind, stage) in cases {
        assert_eq!(rejection.kind(), kind);
        assert_eq!(rejection.stage(), stage);
    }
}

#[test]
fn error_is_debug() {
    let _ = format!("{:?}", LicenseError::NoPublicKeyLoaded);
    let _ = format!("{:?}", Rejection::InvalidSignature);
}
