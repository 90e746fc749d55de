//! End-to-end origin scenarios exercised through the public API only,
//! complementing the inline unit tests in `src/origin.rs` (which probe the
//! module's internals directly).

use url::Url;

#[test]
fn same_scheme_host_port_share_an_origin_regardless_of_path() {
    let a = Url::parse("https://example.com:8443/a").unwrap();
    let b = Url::parse("https://example.com:8443/b?x=1#f").unwrap();
    assert_eq!(a.origin(), b.origin());
}

#[test]
fn default_port_and_explicit_default_port_share_an_origin() {
    let a = Url::parse("https://example.com/").unwrap();
    let b = Url::parse("https://example.com:443/").unwrap();
    assert_eq!(a.origin(), b.origin());
}

#[test]
fn ftp_and_ws_schemes_are_tuple_origins_too() {
    let ftp = Url::parse("ftp://example.com/pub").unwrap();
    let ws = Url::parse("ws://example.com/socket").unwrap();
    assert!(ftp.origin().is_tuple());
    assert!(ws.origin().is_tuple());
}

#[test]
fn data_and_javascript_schemes_are_opaque_and_mutually_unequal() {
    let data = Url::parse("data:text/plain,hi").unwrap();
    let js = Url::parse("javascript:0").unwrap();
    assert!(!data.origin().is_tuple());
    assert!(!js.origin().is_tuple());
    assert_ne!(data.origin(), js.origin());
}

#[test]
fn joined_relative_reference_keeps_the_base_origin() {
    let base = Url::parse("http://example.com/a/b").unwrap();
    let joined = base.join("../c").unwrap();
    assert_eq!(base.origin(), joined.origin());
}

#[test]
fn ascii_serialization_round_trips_through_parse() {
    let a = Url::parse("http://example.com/").unwrap();
    assert_eq!(a.origin().ascii_serialization(), "http://example.com");
    assert_eq!(
        a.origin().unicode_serialization(),
        a.origin().ascii_serialization()
    );
}
