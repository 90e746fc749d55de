// Copyright 2016 The rust-url developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::host::Host;
use crate::Url;
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use core::sync::atomic::{AtomicUsize, Ordering};

/// The origin of a URL, per <https://url.spec.whatwg.org/#origin>.
///
/// Two URLs with the same origin are considered to come from the same
/// entity and can trust each other.
///
/// - `"ftp"`, `"http"`, `"https"`, `"ws"`, `"wss"` carry a tuple origin of
///   (scheme, host, port).
/// - Every other scheme (`file`, `data`, `mailto`, any custom scheme, ...)
///   gets a fresh opaque origin, equal only to itself.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum Origin {
    /// A globally unique identifier, equal only to the value it came from
    /// (not even to another opaque origin built from an identical URL).
    Opaque(OpaqueOrigin),

    /// The URL's scheme, host and explicit port (not the scheme's
    /// default, if the URL omitted one).
    Tuple(String, Host<String>, Option<u16>),
}

impl Origin {
    /// Creates a new opaque origin, distinct from every other origin ever
    /// created (including other opaque origins and itself if called
    /// again).
    pub fn new_opaque() -> Origin {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Origin::Opaque(OpaqueOrigin(COUNTER.fetch_add(1, Ordering::SeqCst)))
    }

    pub(crate) fn from_url(url: &Url) -> Origin {
        match url.scheme() {
            "ftp" | "http" | "https" | "ws" | "wss" => match url.host() {
                Some(host) => {
                    Origin::Tuple(url.scheme().to_owned(), owned_host(host), url.port())
                }
                None => Origin::new_opaque(),
            },
            _ => Origin::new_opaque(),
        }
    }

    /// Whether this origin is a (scheme, host, port) tuple, as opposed to
    /// opaque.
    pub fn is_tuple(&self) -> bool {
        matches!(*self, Origin::Tuple(..))
    }

    /// <https://html.spec.whatwg.org/multipage/#ascii-serialisation-of-an-origin>
    pub fn ascii_serialization(&self) -> String {
        match *self {
            Origin::Opaque(_) => "null".to_owned(),
            Origin::Tuple(ref scheme, ref host, Some(port)) => {
                format!("{}://{}:{}", scheme, host, port)
            }
            Origin::Tuple(ref scheme, ref host, None) => format!("{}://{}", scheme, host),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/#unicode-serialisation-of-an-origin>
    ///
    /// Domains here are always already-ASCII (non-ASCII domains are
    /// rejected at parse time), so this is the same as
    /// [`Origin::ascii_serialization`].
    pub fn unicode_serialization(&self) -> String {
        self.ascii_serialization()
    }
}

fn owned_host(host: Host<&str>) -> Host<String> {
    match host {
        Host::Domain(s) => Host::Domain(s.to_owned()),
        Host::Opaque(s) => Host::Opaque(s.to_owned()),
        Host::Ipv4(addr) => Host::Ipv4(addr),
        Host::Ipv6(addr) => Host::Ipv6(addr),
        Host::Empty => Host::Empty,
    }
}

/// Opaque identifier for a URL whose origin isn't a (scheme, host, port)
/// tuple.
#[derive(Eq, PartialEq, Hash, Clone, Debug)]
pub struct OpaqueOrigin(usize);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Url;

    #[test]
    fn http_origin_is_tuple() {
        let a = Url::parse("http://example.com/a").unwrap();
        let b = Url::parse("http://example.com/b").unwrap();
        assert_eq!(a.origin(), b.origin());
        assert!(a.origin().is_tuple());
    }

    #[test]
    fn different_hosts_differ() {
        let a = Url::parse("http://example.com/").unwrap();
        let b = Url::parse("http://example.org/").unwrap();
        assert_ne!(a.origin(), b.origin());
    }

    #[test]
    fn different_ports_differ() {
        let a = Url::parse("http://example.com:8080/").unwrap();
        let b = Url::parse("http://example.com:9090/").unwrap();
        assert_ne!(a.origin(), b.origin());
    }

    #[test]
    fn file_scheme_is_opaque_and_never_equal() {
        let a = Url::parse("file:///etc/passwd").unwrap();
        let b = Url::parse("file:///etc/passwd").unwrap();
        assert_ne!(a.origin(), b.origin());
        assert!(!a.origin().is_tuple());
    }

    #[test]
    fn opaque_origin_not_equal_to_itself_across_calls() {
        let a = Url::parse("data:text/plain,hi").unwrap();
        assert_ne!(a.origin(), a.origin());
    }

    #[test]
    fn ascii_serialization_of_tuple_origin() {
        let a = Url::parse("https://example.com:8443/").unwrap();
        assert_eq!(a.origin().ascii_serialization(), "https://example.com:8443");
    }

    #[test]
    fn ascii_serialization_of_opaque_origin() {
        let a = Url::parse("mailto:a@b.com").unwrap();
        assert_eq!(a.origin().ascii_serialization(), "null");
    }
}
