//! Test loading a service account key through the stream entry points.

use jsonwebtoken::Algorithm;
use tokio::io::AsyncReadExt;

use crate::auth::{AccessTokenError, IdentityStore};
use crate::e2e_tests::helpers::*;
use crate::testing::{TEST_ISSUER, decode_claims, service_account_json, test_identity};

#[test]
fn test_stream_matches_object_load() {
    let value = service_account_json();
    let bytes = serde_json::to_vec(&value).expect("serialize credentials");

    let mut from_object = TestIssuer::uninitialized();
    from_object
        .issuer
        .load_from_value(&value)
        .expect("valid credentials");

    let mut from_stream = TestIssuer::uninitialized();
    from_stream
        .load_from_stream_bytes(&bytes)
        .expect("valid credentials");

    assert_eq!(from_stream.issuer.identity(), from_object.issuer.identity());
}

#[test]
fn test_stream_load_issues_tokens() {
    let bytes = serde_json::to_vec(&service_account_json()).expect("serialize credentials");

    let mut test = TestIssuer::uninitialized();
    test.load_from_stream_bytes(&bytes).expect("valid credentials");

    let metadata = test.metadata(TARGET_URI).expect("metadata");
    let claims = decode_claims(metadata.bearer_token().expect("token"), Algorithm::RS256, TARGET_URI);
    assert_eq!(claims.iss, TEST_ISSUER);
    assert_eq!(claims.aud, TARGET_URI);
}

#[test]
fn test_file_stream_load() {
    let file = write_credentials_file(&service_account_json());

    let mut test = TestIssuer::uninitialized();
    assert_eq!(test.runtime_flavor(), tokio::runtime::RuntimeFlavor::CurrentThread);
    test.load_from_file(&file).expect("valid credentials file");

    assert_eq!(test.issuer.identity().issuer_subject(), Some(TEST_ISSUER));
    assert!(test.metadata(TARGET_URI).is_ok());
}

#[test]
fn test_blocking_reader_load() {
    let file = write_credentials_file(&service_account_json());
    let reader = std::fs::File::open(file.path()).expect("open credentials file");

    let mut test = TestIssuer::uninitialized();
    test.issuer
        .load_from_reader(reader)
        .expect("valid credentials file");

    assert_eq!(test.issuer.identity().issuer_subject(), Some(TEST_ISSUER));
}

#[test]
fn test_empty_stream_is_invalid_argument() {
    let mut test = TestIssuer::uninitialized();
    let result = test.load_from_stream_bytes(b"");

    assert!(matches!(result, Err(AccessTokenError::InvalidArgument(_))));
    assert!(!test.issuer.identity().is_populated());
}

#[test]
fn test_malformed_stream_is_parse_error() {
    let mut test = TestIssuer::uninitialized();
    let result = test.load_from_stream_bytes(b"client_email=foo@serviceaccount.com");

    assert!(matches!(result, Err(AccessTokenError::Parse(_))));
}

#[test]
fn test_truncated_stream_does_not_update_identity() {
    let bytes = serde_json::to_vec(&service_account_json()).expect("serialize credentials");
    let truncated = &bytes[..bytes.len() / 2];

    let mut test = TestIssuer::with_identity(IdentityStore::default());
    let result = test.load_from_stream_bytes(truncated);

    assert!(matches!(result, Err(AccessTokenError::Parse(_))));
    assert_eq!(test.issuer.identity(), &IdentityStore::default());
}

#[test]
fn test_stream_missing_required_field_is_invalid_argument() {
    let mut value = service_account_json();
    value
        .as_object_mut()
        .expect("credentials object")
        .remove("private_key");
    let bytes = serde_json::to_vec(&value).expect("serialize credentials");

    let mut test = TestIssuer::uninitialized();
    let result = test.load_from_stream_bytes(&bytes);

    assert!(matches!(result, Err(AccessTokenError::InvalidArgument(_))));
}

#[test]
fn test_read_failure_is_io_error() {
    let mut test = TestIssuer::uninitialized();
    let result = test.load_from_stream(FailingStream);

    match result {
        Err(AccessTokenError::Io(e)) => {
            assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset);
        }
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn test_failure_mid_stream_leaves_identity_untouched() {
    let bytes = serde_json::to_vec(&service_account_json()).expect("serialize credentials");
    let partial = &bytes[..bytes.len() / 2];

    let mut test = TestIssuer::with_identity(test_identity());
    let before = test.issuer.identity().clone();
    let before_metadata = test.metadata(TARGET_URI).expect("metadata");

    let result = test.load_from_stream(partial.chain(FailingStream));
    assert!(matches!(result, Err(AccessTokenError::Io(_))));

    assert_eq!(test.issuer.identity(), &before);
    assert_eq!(test.metadata(TARGET_URI).expect("metadata"), before_metadata);
    assert_eq!(test.signer.calls(), 1);
}
