// Copyright 2013-2016 The rust-url developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The URL scanner and processor/writer: a single pass over the cleaned
//! input that determines the scheme, authority, path, query and
//! fragment, resolves against an optional base URL, and writes the
//! normalized result straight into a `Url`'s serialization buffer.
//!
//! One private method per named state (`parse_scheme_start`,
//! `parse_relative`, `parse_file`, ...), called directly rather than
//! dispatched through a generic state-enum loop — the 20 states of
//! <https://url.spec.whatwg.org/#url-parsing> are all represented, just
//! as a method-chain instead of a `match`-in-a-`loop`, which keeps the
//! borrow checker happy since each state can just take what it needs by
//! value.
//!
//! [`RawUrl`] holds the parsed-but-not-yet-serialized pieces as owned
//! `String`/`Vec<String>` fields rather than literal byte ranges into the
//! original input; [`write_url`] is the writer that turns a `RawUrl` into
//! the offset-and-buffer `Url` the rest of the crate works with. Encoding
//! always goes through `percent_encoding` on the writer side rather than
//! copying raw byte ranges through unescaped when nothing in them needed
//! encoding — simpler, and the cost is one alphanumeric-byte scan per
//! component, not a concern for a reference implementation.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Write as _;

use crate::ascii;
use crate::host::{Host, HostInternal, HostParseError};
use crate::path;
use crate::Url;
use percent_encoding::{
    percent_encode, AsciiSet, CONTROLS, FRAGMENT, QUERY, SPECIAL_QUERY, USERINFO,
};

struct HostAndPort {
    host: Option<Host<String>>,
    port: Option<u16>,
}

/// Non-fatal validation errors: reported to the caller's sink, never
/// interrupt parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntaxViolation {
    UnexpectedLeadingControlOrSpace,
    UnexpectedTrailingControlOrSpace,
    UnexpectedTabOrNewline,
    FileMissingFollowingSolidus,
    UnexpectedBackslash,
    MissingSolidusBeforeAuthority,
    UnexpectedAtSign,
    InvalidUrlCodePoint,
    UnescapedPercentSign,
}

impl SyntaxViolation {
    pub fn description(&self) -> &'static str {
        match self {
            SyntaxViolation::UnexpectedLeadingControlOrSpace => {
                "leading C0 control or space was stripped from the input"
            }
            SyntaxViolation::UnexpectedTrailingControlOrSpace => {
                "trailing C0 control or space was stripped from the input"
            }
            SyntaxViolation::UnexpectedTabOrNewline => "TAB, LF or CR was stripped from the input",
            SyntaxViolation::FileMissingFollowingSolidus => {
                "\"file:\" scheme not followed by \"//\""
            }
            SyntaxViolation::UnexpectedBackslash => "\"\\\" treated as \"/\"",
            SyntaxViolation::MissingSolidusBeforeAuthority => "expected a slash before authority",
            SyntaxViolation::UnexpectedAtSign => "unexpected \"@\" in the host component",
            SyntaxViolation::InvalidUrlCodePoint => "unexpected character in the URL",
            SyntaxViolation::UnescapedPercentSign => "\"%\" not followed by two hex digits",
        }
    }
}

impl fmt::Display for SyntaxViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Fatal parse errors: parsing stops and `parse` returns `Err`. The typed
/// host/IP errors are folded in directly rather than nested, since the
/// public surface only promises `std::error::Error + Display`, not a
/// matchable cause chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
    EmptyHost,
    IdnaError,
    InvalidPort,
    InvalidIpv4Address,
    InvalidIpv6Address,
    InvalidDomainCharacter,
    InvalidScheme,
    RelativeUrlWithoutBase,
    RelativeUrlWithCannotBeABaseBase,
    SetHostOnCannotBeABaseUrl,
    UnexpectedCredentialsWithoutHost,
    UnexpectedPortWithoutHost,
    Overflow,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseError::EmptyHost => "empty host",
            ParseError::IdnaError => "non-ASCII domains are not supported",
            ParseError::InvalidPort => "invalid port number",
            ParseError::InvalidIpv4Address => "invalid IPv4 address",
            ParseError::InvalidIpv6Address => "invalid IPv6 address",
            ParseError::InvalidDomainCharacter => "invalid domain character",
            ParseError::InvalidScheme => "scheme starts with an invalid character",
            ParseError::RelativeUrlWithoutBase => "relative URL without a base",
            ParseError::RelativeUrlWithCannotBeABaseBase => {
                "base URL cannot be a base (it has an opaque path)"
            }
            ParseError::SetHostOnCannotBeABaseUrl => "a cannot-be-a-base URL has no host to set",
            ParseError::UnexpectedCredentialsWithoutHost => "credentials without a host",
            ParseError::UnexpectedPortWithoutHost => "port without a host",
            ParseError::Overflow => "URLs more than 4 GiB are not supported",
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

impl From<HostParseError> for ParseError {
    fn from(e: HostParseError) -> ParseError {
        match e {
            HostParseError::EmptyHostInSpecialScheme => ParseError::EmptyHost,
            HostParseError::ForbiddenHostCodePoint => ParseError::InvalidDomainCharacter,
            HostParseError::NonAsciiDomain => ParseError::IdnaError,
            HostParseError::UnclosedIpv6Bracket | HostParseError::InvalidIpv6Address => {
                ParseError::InvalidIpv6Address
            }
            HostParseError::InvalidIpv4Address => ParseError::InvalidIpv4Address,
            HostParseError::InvalidPercentEncoding => ParseError::InvalidDomainCharacter,
        }
    }
}

/// Scheme kind: the six special schemes carry their default port inline;
/// anything else is generic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemeType {
    File,
    SpecialNotFile(u16),
    NotSpecial,
}

impl SchemeType {
    pub fn is_special(self) -> bool {
        !matches!(self, SchemeType::NotSpecial)
    }

    pub fn is_file(self) -> bool {
        matches!(self, SchemeType::File)
    }

    pub fn default_port(self) -> Option<u16> {
        match self {
            SchemeType::File => None,
            SchemeType::SpecialNotFile(port) => Some(port),
            SchemeType::NotSpecial => None,
        }
    }

    pub fn from_scheme(scheme: &str) -> SchemeType {
        match scheme {
            "file" => SchemeType::File,
            "ftp" => SchemeType::SpecialNotFile(21),
            "http" | "ws" => SchemeType::SpecialNotFile(80),
            "https" | "wss" => SchemeType::SpecialNotFile(443),
            _ => SchemeType::NotSpecial,
        }
    }
}

fn query_encode_set(scheme_type: SchemeType) -> &'static AsciiSet {
    if scheme_type.is_special() {
        SPECIAL_QUERY
    } else {
        QUERY
    }
}

type ViolationFn<'a> = Option<&'a mut dyn FnMut(SyntaxViolation)>;

fn report(vfn: &mut ViolationFn<'_>, violation: SyntaxViolation) {
    if let Some(f) = vfn.as_deref_mut() {
        f(violation);
    }
}

/// An owned, not-yet-serialized URL (see the module doc comment for why
/// this holds owned strings rather than byte ranges). `host ==
/// None` means no authority component at all (the URL is either
/// cannot-be-a-base, or a non-special scheme whose path was parsed
/// directly with no `//`); `Some(Host::Empty)` means an authority *is*
/// present and its host is the empty string (`file:///etc`, `a:///x`).
pub(crate) struct RawUrl {
    pub scheme: String,
    pub scheme_type: SchemeType,
    pub username: String,
    pub password: Option<String>,
    pub host: Option<Host<String>>,
    pub port: Option<u16>,
    pub path: PathData,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

pub(crate) enum PathData {
    /// A cannot-be-a-base URL's single opaque path string.
    Opaque(String),
    /// An ordered list of already percent-encoded path segments.
    List(Vec<String>),
}

/// Parse `input` as a URL, optionally resolved against `base`.
pub fn parse(
    input: &str,
    base: Option<&Url>,
    mut vfn: ViolationFn<'_>,
) -> Result<Url, ParseError> {
    let cleaned = clean_input(input, &mut vfn);
    parse_scheme_start(&cleaned, base, &mut vfn)
}

/// Strip leading/trailing C0-control-or-space (reporting a violation if
/// anything was trimmed) then remove interior TAB/LF/CR bytes (reporting
/// a second violation on first occurrence). Safe at the byte level: TAB,
/// LF, CR and C0/space are all single ASCII bytes that can never appear
/// as a UTF-8 continuation byte, so slicing and filtering by byte index
/// can't split a multi-byte code point.
fn clean_input(input: &str, vfn: &mut ViolationFn<'_>) -> String {
    let bytes = input.as_bytes();
    let is_c0_or_space = |b: u8| b <= 0x20;
    let mut start = 0usize;
    let mut end = bytes.len();
    while start < end && is_c0_or_space(bytes[start]) {
        start += 1;
    }
    while end > start && is_c0_or_space(bytes[end - 1]) {
        end -= 1;
    }
    if start > 0 {
        report(vfn, SyntaxViolation::UnexpectedLeadingControlOrSpace);
    }
    if end < bytes.len() {
        report(vfn, SyntaxViolation::UnexpectedTrailingControlOrSpace);
    }
    let trimmed = &input[start..end];
    if trimmed
        .bytes()
        .any(|b| matches!(b, 0x09 | 0x0A | 0x0D))
    {
        report(vfn, SyntaxViolation::UnexpectedTabOrNewline);
        let filtered: Vec<u8> = trimmed
            .bytes()
            .filter(|&b| !matches!(b, 0x09 | 0x0A | 0x0D))
            .collect();
        // Removing single-byte ASCII bytes from valid UTF-8 can never
        // produce invalid UTF-8.
        String::from_utf8(filtered).expect("byte-level ASCII filter preserves UTF-8 validity")
    } else {
        trimmed.to_string()
    }
}

/// `[A-Za-z][A-Za-z0-9+\-.]*` immediately followed by `:`; returns the
/// index of that `:`.
fn scan_scheme(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.is_empty() || !bytes[0].is_ascii_alphabetic() {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b':' => return Some(i),
            b if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.') => i += 1,
            _ => return None,
        }
    }
    None
}

fn parse_scheme_start(
    input: &str,
    base: Option<&Url>,
    vfn: &mut ViolationFn<'_>,
) -> Result<Url, ParseError> {
    if let Some(colon) = scan_scheme(input) {
        let scheme = input[..colon].to_ascii_lowercase();
        let scheme_type = SchemeType::from_scheme(&scheme);
        let rest = &input[colon + 1..];
        return parse_with_scheme(scheme, scheme_type, rest, base, vfn);
    }
    match base {
        Some(base) if !base.cannot_be_a_base() => parse_relative(base, input, vfn),
        Some(_) => Err(ParseError::RelativeUrlWithCannotBeABaseBase),
        None => Err(ParseError::RelativeUrlWithoutBase),
    }
}

fn parse_with_scheme(
    scheme: String,
    scheme_type: SchemeType,
    rest: &str,
    base: Option<&Url>,
    vfn: &mut ViolationFn<'_>,
) -> Result<Url, ParseError> {
    if scheme_type.is_file() {
        if !rest.starts_with("//") {
            report(vfn, SyntaxViolation::FileMissingFollowingSolidus);
        }
        return parse_file(scheme, rest, base, vfn);
    }
    if scheme_type.is_special() {
        if let Some(base) = base {
            if base.scheme() == scheme {
                return parse_special_relative_or_authority(base, rest, vfn);
            }
        }
        return parse_authority_and_path(
            scheme,
            scheme_type,
            rest.trim_start_matches(|c: char| c == '/' || c == '\\'),
            vfn,
        )
            .map(|mut raw| {
                if !rest.starts_with("//") {
                    report(vfn, SyntaxViolation::MissingSolidusBeforeAuthority);
                }
                raw.scheme = scheme.clone();
                raw
            })
            .and_then(|raw| Ok(write_url(raw)));
    }
    if let Some(after_slash) = rest.strip_prefix('/') {
        let mut raw = parse_authority_or_path(scheme_type, after_slash, vfn)?;
        raw.scheme = scheme;
        return Ok(write_url(raw));
    }
    let (opaque, query, fragment) = split_pqf(rest);
    check_opaque_codepoints(opaque, vfn);
    Ok(write_url(RawUrl {
        scheme,
        scheme_type,
        username: String::new(),
        password: None,
        host: None,
        port: None,
        path: PathData::Opaque(percent_encode(opaque.as_bytes(), CONTROLS).into_string()),
        query: encode_query(query, scheme_type),
        fragment: encode_fragment(fragment),
    }))
}

/// Entered for a special scheme whose explicit text matches the base's
/// scheme (e.g. re-typing `http:` while resolving against an `http:`
/// base): `//` goes on to parse its own authority, anything else falls
/// through to ordinary relative resolution against `base`, discarding the
/// redundant explicit scheme text (<https://url.spec.whatwg.org/#special-relative-or-authority-state>).
fn parse_special_relative_or_authority(
    base: &Url,
    rest: &str,
    vfn: &mut ViolationFn<'_>,
) -> Result<Url, ParseError> {
    if let Some(after) = rest.strip_prefix("//") {
        let mut raw = parse_authority_and_path(
            base.scheme().to_string(),
            SchemeType::from_scheme(base.scheme()),
            after,
            vfn,
        )?;
        raw.scheme = base.scheme().to_string();
        return Ok(write_url(raw));
    }
    parse_relative(base, rest, vfn)
}

/// Non-special scheme, `remaining` begins with exactly one `/`: could
/// still turn out to have an authority (`//`) or be a bare absolute path.
fn parse_authority_or_path(
    scheme_type: SchemeType,
    after_first_slash: &str,
    vfn: &mut ViolationFn<'_>,
) -> Result<RawUrl, ParseError> {
    if let Some(after) = after_first_slash.strip_prefix('/') {
        return parse_authority_and_path(String::new(), scheme_type, after, vfn);
    }
    let segments = parse_path_segments(scheme_type, Vec::new(), after_first_slash, vfn);
    let (_, query, fragment) = split_pqf(after_first_slash);
    Ok(RawUrl {
        scheme: String::new(),
        scheme_type,
        username: String::new(),
        password: None,
        host: None,
        port: None,
        path: PathData::List(segments),
        query: encode_query(query, scheme_type),
        fragment: encode_fragment(fragment),
    })
}

/// Relative-reference resolution against `base`
/// (<https://url.spec.whatwg.org/#relative-state>). `rest` is the cleaned
/// input with no scheme of its own.
fn parse_relative(base: &Url, rest: &str, vfn: &mut ViolationFn<'_>) -> Result<Url, ParseError> {
    let scheme = base.scheme().to_string();
    let scheme_type = SchemeType::from_scheme(&scheme);

    if rest.is_empty() {
        return Ok(write_url(RawUrl {
            scheme,
            scheme_type,
            username: base.username().to_string(),
            password: base.password().map(|s| s.to_string()),
            host: base.host_owned(),
            port: base.port_for_raw_url(),
            path: base.path_data_owned(),
            query: base.query().map(|s| s.to_string()),
            fragment: None,
        }));
    }

    let bytes = rest.as_bytes();
    match bytes[0] {
        b'/' => parse_relative_slash(base, scheme, scheme_type, &rest[1..], vfn),
        b'\\' if scheme_type.is_special() => {
            report(vfn, SyntaxViolation::UnexpectedBackslash);
            parse_relative_slash(base, scheme, scheme_type, &rest[1..], vfn)
        }
        b'?' => {
            let (_, query, fragment) = split_pqf(rest);
            Ok(write_url(RawUrl {
                scheme,
                scheme_type,
                username: base.username().to_string(),
                password: base.password().map(|s| s.to_string()),
                host: base.host_owned(),
                port: base.port_for_raw_url(),
                path: base.path_data_owned(),
                query: encode_query(query, scheme_type),
                fragment: encode_fragment(fragment),
            }))
        }
        b'#' => {
            let (_, _, fragment) = split_pqf(rest);
            Ok(write_url(RawUrl {
                scheme,
                scheme_type,
                username: base.username().to_string(),
                password: base.password().map(|s| s.to_string()),
                host: base.host_owned(),
                port: base.port_for_raw_url(),
                path: base.path_data_owned(),
                query: base.query().map(|s| s.to_string()),
                fragment: encode_fragment(fragment),
            }))
        }
        _ => {
            let mut segments = match base.path_data_owned() {
                PathData::List(segments) => segments,
                PathData::Opaque(_) => Vec::new(),
            };
            path::shorten(&mut segments, scheme_type.is_file());
            let segments = parse_path_segments(scheme_type, segments, rest, vfn);
            let (_, query, fragment) = split_pqf(rest);
            Ok(write_url(RawUrl {
                scheme,
                scheme_type,
                username: base.username().to_string(),
                password: base.password().map(|s| s.to_string()),
                host: base.host_owned(),
                port: base.port_for_raw_url(),
                path: PathData::List(segments),
                query: encode_query(query, scheme_type),
                fragment: encode_fragment(fragment),
            }))
        }
    }
}

fn parse_relative_slash(
    base: &Url,
    scheme: String,
    scheme_type: SchemeType,
    rest: &str,
    vfn: &mut ViolationFn<'_>,
) -> Result<Url, ParseError> {
    let is_double_slash = if scheme_type.is_special() {
        rest.starts_with('/') || rest.starts_with('\\')
    } else {
        rest.starts_with('/')
    };
    if is_double_slash {
        let after = if rest.as_bytes()[0] == b'\\' {
            report(vfn, SyntaxViolation::UnexpectedBackslash);
            &rest[1..]
        } else {
            &rest[1..]
        };
        let mut raw = parse_authority_and_path(scheme.clone(), scheme_type, after, vfn)?;
        raw.scheme = scheme;
        return Ok(write_url(raw));
    }
    let segments = parse_path_segments(scheme_type, Vec::new(), rest, vfn);
    let (_, query, fragment) = split_pqf(rest);
    Ok(write_url(RawUrl {
        scheme,
        scheme_type,
        username: base.username().to_string(),
        password: base.password().map(|s| s.to_string()),
        host: base.host_owned(),
        port: base.port_for_raw_url(),
        path: PathData::List(segments),
        query: encode_query(query, scheme_type),
        fragment: encode_fragment(fragment),
    }))
}

/// `file:` URLs get their own start state
/// (<https://url.spec.whatwg.org/#file-state>) because of the Windows
/// drive-letter and base-authority-copy quirks.
fn parse_file(
    scheme: String,
    rest: &str,
    base: Option<&Url>,
    vfn: &mut ViolationFn<'_>,
) -> Result<Url, ParseError> {
    let file_base = base.filter(|b| b.scheme() == "file");

    if let Some(after) = rest.strip_prefix("//") {
        // 2+ slashes: parse our own host, unless it turns out to be a
        // Windows drive letter (discarded into the path).
        return parse_file_host_and_path(scheme, after, vfn);
    }
    if let Some(after) = rest.strip_prefix('/') {
        // 1 slash: copy base authority; parse an absolute path that may
        // copy the base's Windows drive letter.
        let host = file_base.and_then(|b| b.host_owned());
        let mut segments = Vec::new();
        if let Some(Ok(PathData::List(base_segments))) =
            file_base.map(|b| Ok::<_, ParseError>(b.path_data_owned()))
        {
            if let Some(first) = base_segments.first() {
                if path::is_windows_drive_letter(first) {
                    segments.push(first.clone());
                }
            }
        }
        let new_segments = parse_path_segments(SchemeType::File, segments, after, vfn);
        let (_, query, fragment) = split_pqf(after);
        return Ok(write_url(RawUrl {
            scheme,
            scheme_type: SchemeType::File,
            username: String::new(),
            password: None,
            host,
            port: None,
            path: PathData::List(new_segments),
            query: encode_query(query, SchemeType::File),
            fragment: encode_fragment(fragment),
        }));
    }
    if rest.is_empty() {
        return match file_base {
            Some(b) => Ok(write_url(RawUrl {
                scheme,
                scheme_type: SchemeType::File,
                username: String::new(),
                password: None,
                host: b.host_owned(),
                port: None,
                path: b.path_data_owned(),
                query: b.query().map(|s| s.to_string()),
                fragment: None,
            })),
            None => Ok(write_url(RawUrl {
                scheme,
                scheme_type: SchemeType::File,
                username: String::new(),
                password: None,
                host: Some(Host::Empty),
                port: None,
                path: PathData::List(Vec::new()),
                query: None,
                fragment: None,
            })),
        };
    }
    if rest.as_bytes()[0] == b'?' || rest.as_bytes()[0] == b'#' {
        let (_, query, fragment) = split_pqf(rest);
        let (host, path) = match file_base {
            Some(b) => (b.host_owned(), b.path_data_owned()),
            None => (Some(Host::Empty), PathData::List(Vec::new())),
        };
        return Ok(write_url(RawUrl {
            scheme,
            scheme_type: SchemeType::File,
            username: String::new(),
            password: None,
            host,
            port: None,
            path,
            query: if rest.as_bytes()[0] == b'?' {
                encode_query(query, SchemeType::File)
            } else {
                file_base.and_then(|b| b.query().map(|s| s.to_string()))
            },
            fragment: encode_fragment(fragment),
        }));
    }
    // 0 slashes, non-empty, no leading '?'/'#': a Windows drive letter
    // short-circuits the base-relative-path shortening (`file:c:/foo`).
    if starts_with_windows_drive_letter_anchor(rest) {
        let segments = parse_path_segments(SchemeType::File, Vec::new(), rest, vfn);
        let (_, query, fragment) = split_pqf(rest);
        return Ok(write_url(RawUrl {
            scheme,
            scheme_type: SchemeType::File,
            username: String::new(),
            password: None,
            host: Some(Host::Empty),
            port: None,
            path: PathData::List(segments),
            query: encode_query(query, SchemeType::File),
            fragment: encode_fragment(fragment),
        }));
    }
    let (host, mut segments) = match file_base {
        Some(b) => (
            b.host_owned(),
            match b.path_data_owned() {
                PathData::List(s) => s,
                PathData::Opaque(_) => Vec::new(),
            },
        ),
        None => (Some(Host::Empty), Vec::new()),
    };
    path::shorten(&mut segments, true);
    let segments = parse_path_segments(SchemeType::File, segments, rest, vfn);
    let (_, query, fragment) = split_pqf(rest);
    Ok(write_url(RawUrl {
        scheme,
        scheme_type: SchemeType::File,
        username: String::new(),
        password: None,
        host,
        port: None,
        path: PathData::List(segments),
        query: encode_query(query, SchemeType::File),
        fragment: encode_fragment(fragment),
    }))
}

/// `[A-Za-z][:|]` followed by `/`, `\`, `?`, `#` or end of input.
fn starts_with_windows_drive_letter_anchor(input: &str) -> bool {
    let b = input.as_bytes();
    b.len() >= 2
        && b[0].is_ascii_alphabetic()
        && (b[1] == b':' || b[1] == b'|')
        && (b.len() == 2 || matches!(b[2], b'/' | b'\\' | b'?' | b'#'))
}

fn parse_file_host_and_path(
    scheme: String,
    rest: &str,
    vfn: &mut ViolationFn<'_>,
) -> Result<Url, ParseError> {
    let terminator = rest
        .find(|c: char| matches!(c, '/' | '\\' | '?' | '#'))
        .unwrap_or(rest.len());
    let host_text = &rest[..terminator];
    let after_host = &rest[terminator..];

    if starts_with_windows_drive_letter_anchor(host_text)
        || (host_text.len() == 2
            && host_text.as_bytes()[0].is_ascii_alphabetic()
            && matches!(host_text.as_bytes()[1], b':' | b'|'))
    {
        // A Windows drive letter masquerading as a host: it becomes the
        // first path segment instead, and the host is discarded.
        let segments = parse_path_segments(SchemeType::File, Vec::new(), rest, vfn);
        let (_, query, fragment) = split_pqf(rest);
        return Ok(write_url(RawUrl {
            scheme,
            scheme_type: SchemeType::File,
            username: String::new(),
            password: None,
            host: Some(Host::Empty),
            port: None,
            path: PathData::List(segments),
            query: encode_query(query, SchemeType::File),
            fragment: encode_fragment(fragment),
        }));
    }

    let host = if host_text.is_empty() {
        Host::Empty
    } else {
        Host::parse(host_text, true)?
    };
    let path_rest = after_host
        .strip_prefix(|c: char| c == '/' || c == '\\')
        .unwrap_or(after_host);
    let segments = parse_path_segments(SchemeType::File, Vec::new(), path_rest, vfn);
    let (_, query, fragment) = split_pqf(path_rest);
    Ok(write_url(RawUrl {
        scheme,
        scheme_type: SchemeType::File,
        username: String::new(),
        password: None,
        host: Some(host),
        port: None,
        path: PathData::List(segments),
        query: encode_query(query, SchemeType::File),
        fragment: encode_fragment(fragment),
    }))
}

/// Parse `"user:pass@host:port/path?query#fragment"` (authority already
/// known to be present — `input` starts right after the `//`).
fn parse_authority_and_path(
    scheme: String,
    scheme_type: SchemeType,
    input: &str,
    vfn: &mut ViolationFn<'_>,
) -> Result<RawUrl, ParseError> {
    let authority_end = input
        .find(|c: char| {
            matches!(c, '/' | '?' | '#') || (scheme_type.is_special() && c == '\\')
        })
        .unwrap_or(input.len());
    let (authority, rest) = input.split_at(authority_end);

    let (userinfo, host_port) = match authority.rfind('@') {
        Some(at) => {
            if authority[..at].contains('@') {
                report(vfn, SyntaxViolation::UnexpectedAtSign);
            }
            (Some(&authority[..at]), &authority[at + 1..])
        }
        None => (None, authority),
    };

    let (username, password) = match userinfo {
        Some(userinfo) => match userinfo.find(':') {
            Some(colon) => (
                encode_userinfo(&userinfo[..colon]),
                Some(encode_userinfo(&userinfo[colon + 1..])),
            ),
            None => (encode_userinfo(userinfo), None),
        },
        None => (String::new(), None),
    };

    let HostAndPort { host, port } = parse_host_and_port(host_port, scheme_type)?;

    if host.is_none() || matches!(host, Some(Host::Empty)) {
        if !username.is_empty() || password.is_some() {
            return Err(ParseError::UnexpectedCredentialsWithoutHost);
        }
        if port.is_some() {
            return Err(ParseError::UnexpectedPortWithoutHost);
        }
    }

    if input.as_bytes().get(authority_end) == Some(&b'\\') {
        report(vfn, SyntaxViolation::UnexpectedBackslash);
    }
    let path_rest = rest
        .strip_prefix(|c: char| c == '/' || c == '\\')
        .unwrap_or(rest);
    let leading_slash_consumed = rest.starts_with(|c: char| c == '/' || c == '\\');
    // A special URL always keeps a non-empty path, even when the authority
    // is followed directly by a query or fragment with no path slash at
    // all (`http://host?x`, `http://host#f`): falling through to
    // `parse_path_segments` here synthesizes the single empty segment that
    // serializes back out as `/`.
    let segments = if leading_slash_consumed || rest.is_empty() || scheme_type.is_special() {
        parse_path_segments(scheme_type, Vec::new(), path_rest, vfn)
    } else {
        Vec::new()
    };
    let (_, query, fragment) = split_pqf(path_rest);

    Ok(RawUrl {
        scheme,
        scheme_type,
        username,
        password,
        host: Some(host.unwrap_or(Host::Empty)),
        port,
        path: PathData::List(segments),
        query: encode_query(query, scheme_type),
        fragment: encode_fragment(fragment),
    })
}

fn parse_host_and_port(
    input: &str,
    scheme_type: SchemeType,
) -> Result<HostAndPort, ParseError> {
    if let Some(bracket_end) = input.strip_prefix('[').and_then(|_| input.find(']')) {
        let host = Host::parse(&input[..=bracket_end], scheme_type.is_special())?;
        let rest = &input[bracket_end + 1..];
        let port = parse_port(rest.strip_prefix(':').unwrap_or(""), scheme_type)?;
        return Ok(HostAndPort {
            host: Some(host),
            port,
        });
    }
    let colon = input.find(':');
    let (host_text, port_text) = match colon {
        Some(i) => (&input[..i], &input[i + 1..]),
        None => (input, ""),
    };
    let host = Host::parse(host_text, scheme_type.is_special())?;
    let port = parse_port(port_text, scheme_type)?;
    Ok(HostAndPort {
        host: Some(host),
        port,
    })
}

fn parse_port(digits: &str, scheme_type: SchemeType) -> Result<Option<u16>, ParseError> {
    if digits.is_empty() {
        return Ok(None);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidPort);
    }
    let value: u32 = digits.parse().map_err(|_| ParseError::InvalidPort)?;
    if value > u16::from(u16::MAX) as u32 {
        return Err(ParseError::InvalidPort);
    }
    let port = value as u16;
    if scheme_type.default_port() == Some(port) {
        Ok(None)
    } else {
        Ok(Some(port))
    }
}

/// Split raw (not yet percent-encoded) trailing input into `(path,
/// query, fragment)` on the first unescaped `?`/`#`.
fn split_pqf(input: &str) -> (&str, Option<&str>, Option<&str>) {
    if let Some(hash) = input.find('#') {
        let before_hash = &input[..hash];
        let fragment = &input[hash + 1..];
        match before_hash.find('?') {
            Some(q) => (
                &before_hash[..q],
                Some(&before_hash[q + 1..]),
                Some(fragment),
            ),
            None => (before_hash, None, Some(fragment)),
        }
    } else if let Some(q) = input.find('?') {
        (&input[..q], Some(&input[q + 1..]), None)
    } else {
        (input, None, None)
    }
}

/// Split a path's raw text on `/` (and on `\` too, for special schemes,
/// reporting a violation), run `.`/`..` normalization and the Windows
/// drive-letter quirk on each piece via [`path::push_segment`], and
/// append the results to `initial` (the caller's already-shortened base
/// segments, or an empty `Vec` for a fresh absolute path).
fn parse_path_segments(
    scheme_type: SchemeType,
    initial: Vec<String>,
    raw_path: &str,
    vfn: &mut ViolationFn<'_>,
) -> Vec<String> {
    let (path_part, _, _) = split_pqf(raw_path);
    check_path_codepoints(path_part, vfn);

    let normalized: Cow<str> = if scheme_type.is_special() && path_part.contains('\\') {
        report(vfn, SyntaxViolation::UnexpectedBackslash);
        Cow::Owned(path_part.replace('\\', "/"))
    } else {
        Cow::Borrowed(path_part)
    };

    let mut segments = initial;
    let parts: Vec<&str> = normalized.split('/').collect();
    let last_index = parts.len().saturating_sub(1);
    for (i, raw_segment) in parts.into_iter().enumerate() {
        path::push_segment(
            &mut segments,
            raw_segment,
            scheme_type.is_file(),
            i == last_index,
        );
    }
    segments
}

fn encode_userinfo(raw: &str) -> String {
    percent_encode(raw.as_bytes(), USERINFO).into_string()
}

fn encode_query(raw: Option<&str>, scheme_type: SchemeType) -> Option<String> {
    raw.map(|q| percent_encode(q.as_bytes(), query_encode_set(scheme_type)).into_string())
}

fn encode_fragment(raw: Option<&str>) -> Option<String> {
    raw.map(|f| percent_encode(f.as_bytes(), FRAGMENT).into_string())
}

fn is_c0_or_space_or_ascii_hi(byte: u8) -> bool {
    byte < 0x20 || byte == 0x7F
}

/// A deliberately simplified stand-in for the full "is URL code point"
/// Unicode bit-pattern test: every C0 control triggers the non-fatal
/// violation, plus an unescaped `%` not followed by two hex digits.
/// Parsing never fails because of this — it is diagnostics only.
fn check_url_codepoints(input: &str, vfn: &mut ViolationFn<'_>) {
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut reported_invalid = false;
    let mut reported_percent = false;
    while i < bytes.len() {
        let b = bytes[i];
        if is_c0_or_space_or_ascii_hi(b) && !reported_invalid {
            report(vfn, SyntaxViolation::InvalidUrlCodePoint);
            reported_invalid = true;
        }
        if b == b'%' && !reported_percent {
            let ok = bytes
                .get(i + 1..i + 3)
                .map_or(false, |h| h.iter().all(|&c| ascii::hex_digit_value(c).is_some()));
            if !ok {
                report(vfn, SyntaxViolation::UnescapedPercentSign);
                reported_percent = true;
            }
        }
        i += 1;
    }
}

fn check_path_codepoints(input: &str, vfn: &mut ViolationFn<'_>) {
    check_url_codepoints(input, vfn);
}

fn check_opaque_codepoints(input: &str, vfn: &mut ViolationFn<'_>) {
    check_url_codepoints(input, vfn);
}

/// Component G: consumes a [`RawUrl`] and writes the final normalized
/// `Url`, in serialization order: scheme, authority header,
/// username, password, host, port, path, query, fragment.
pub(crate) fn write_url(raw: RawUrl) -> Url {
    let RawUrl {
        scheme,
        scheme_type,
        username,
        mut password,
        host,
        mut port,
        path,
        query,
        fragment,
    } = raw;

    // Invariant 3: a port equal to the scheme's default is not stored.
    if let Some(p) = port {
        if scheme_type.default_port() == Some(p) {
            port = None;
        }
    }
    // Invariant 4: an explicitly-empty password collapses to absent.
    if password.as_deref() == Some("") {
        password = None;
    }

    let mut s = String::new();
    s.push_str(&scheme);
    s.push(':');
    let scheme_end = (s.len() - 1) as u32;

    let username_end;
    let host_start;
    let host_end;
    let host_internal;

    if let Some(host) = host {
        s.push_str("//");
        if !username.is_empty() {
            s.push_str(&username);
        }
        if let Some(pw) = &password {
            s.push(':');
            s.push_str(pw);
        }
        username_end = s.len() as u32;
        if !username.is_empty() || password.is_some() {
            s.push('@');
        }
        host_start = s.len() as u32;
        match &host {
            Host::Domain(d) => s.push_str(d),
            Host::Opaque(o) => s.push_str(o),
            Host::Ipv4(addr) => {
                write!(s, "{}", addr).expect("writing to a String never fails");
            }
            Host::Ipv6(addr) => {
                write!(s, "[{}]", addr).expect("writing to a String never fails");
            }
            Host::Empty => {}
        }
        host_end = s.len() as u32;
        host_internal = HostInternal::from(host);
        if let Some(p) = port {
            s.push(':');
            let mut buf = [0u8; 5];
            let n = ascii::write_decimal(u32::from(p), &mut buf);
            s.push_str(core::str::from_utf8(&buf[..n]).expect("digits are ASCII"));
        }
    } else {
        username_end = scheme_end + 1;
        host_start = username_end;
        host_end = username_end;
        host_internal = HostInternal::None;
    }

    let path_start = s.len() as u32;
    match path {
        PathData::Opaque(p) => s.push_str(&p),
        PathData::List(segments) => path::serialize(&segments, &mut s),
    }

    let query_start = query.map(|q| {
        s.push('?');
        let start = s.len() as u32 - 1;
        s.push_str(&q);
        start
    });
    let fragment_start = fragment.map(|f| {
        s.push('#');
        let start = s.len() as u32 - 1;
        s.push_str(&f);
        start
    });

    Url {
        serialization: s,
        scheme_end,
        username_end,
        host_start,
        host_end,
        host: host_internal,
        port,
        path_start,
        query_start,
        fragment_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Url;

    fn parse(input: &str) -> Result<Url, ParseError> {
        Url::parse(input)
    }

    #[test]
    fn scheme_lowercased_and_default_port_elided() {
        let u = parse("HTTP://EXAMPLE.com:80/a/./b/../c?q=1#f").unwrap();
        assert_eq!(u.as_str(), "http://example.com/a/c?q=1#f");
        assert_eq!(u.scheme(), "http");
        assert_eq!(u.port(), None);
        assert_eq!(u.host_str(), Some("example.com"));
        assert_eq!(u.path(), "/a/c");
        assert_eq!(u.query(), Some("q=1"));
        assert_eq!(u.fragment(), Some("f"));
    }

    #[test]
    fn file_url_windows_drive_letter() {
        let u = parse("file:c:/foo").unwrap();
        assert_eq!(u.as_str(), "file:///c:/foo");
        assert_eq!(u.host_str(), None);
        assert_eq!(u.path(), "/c:/foo");
    }

    #[test]
    fn authority_relative_reference_replaces_host() {
        let base = parse("http://example.com/a/b").unwrap();
        let joined = base.join("//other.example/path").unwrap();
        assert_eq!(joined.as_str(), "http://other.example/path");
    }

    #[test]
    fn ipv6_default_port_elided_and_compressed() {
        let u = parse("https://[2001:db8::1]:443/").unwrap();
        assert_eq!(u.as_str(), "https://[2001:db8::1]/");
    }

    #[test]
    fn numeric_domain_becomes_ipv4() {
        let u = parse("http://0x7f.1").unwrap();
        assert_eq!(u.as_str(), "http://127.0.0.1/");
    }

    #[test]
    fn plain_relative_path_appends_past_shortened_base() {
        let base = parse("http://example.com/x/y/z").unwrap();
        let joined = base.join("a/b/c").unwrap();
        assert_eq!(joined.as_str(), "http://example.com/x/y/a/b/c");
    }

    #[test]
    fn dotdot_at_end_of_path_leaves_trailing_slash() {
        let u = parse("http://example.com/a/b/c/..").unwrap();
        assert_eq!(u.path(), "/a/b/");
    }

    #[test]
    fn dotdot_followed_by_more_segments_does_not_leave_trailing_slash() {
        let u = parse("http://example.com/a/b/../c").unwrap();
        assert_eq!(u.path(), "/a/c");
    }

    #[test]
    fn mailto_is_cannot_be_a_base_with_opaque_path() {
        let u = parse("mailto:user@example.org").unwrap();
        assert!(u.cannot_be_a_base());
        assert_eq!(u.path(), "user@example.org");
    }

    #[test]
    fn empty_host_in_special_scheme_is_fatal() {
        assert_eq!(parse("http://"), Err(ParseError::EmptyHost));
    }

    #[test]
    fn credentials_without_host_is_fatal() {
        // Non-special scheme, empty host: "user@" leaves nothing after the
        // '@' for the host, which is an empty (not absent) host for a
        // non-special scheme -- but credentials require an actual host.
        assert!(Url::options().base_url(None).parse("foo://user@").is_err());
    }

    #[test]
    fn relative_without_base_is_fatal() {
        assert_eq!(parse("a/b/c"), Err(ParseError::RelativeUrlWithoutBase));
    }

    #[test]
    fn percent_encoding_non_ascii_in_component() {
        use percent_encoding::{percent_encode, COMPONENT};
        let encoded = percent_encode("hello, world! \u{1F60E}".as_bytes(), COMPONENT).to_string();
        assert_eq!(encoded, "hello%2C%20world!%20%F0%9F%98%8E");
    }
}
