//! Extraction pattern tables.
//!
//! Each table is an ordered list of alternatives; callers try them in order
//! and keep the first usable match. Order encodes confidence, so explicit
//! labels come before bare mentions.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

macro_rules! patterns {
    ($name:ident, [$($re:expr),+ $(,)?]) => {
        pub(crate) static $name: LazyLock<Vec<Regex>> =
            LazyLock::new(|| vec![$(Regex::new($re).unwrap()),+]);
    };
}

macro_rules! regex {
    ($name:ident, $re:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).unwrap());
    };
}

// Run against the lowercased message text. Group 1 is the number, group 2 the unit.
patterns!(
    SIZE_PATTERNS,
    [
        r"(?:tamanho|size|tam)(?:\s*)?[:-]?\s*(\d+(?:\.\d+)?)\s*(gb|mb|tb|kb)",
        r"(\d+(?:\.\d+)?)\s*(gb|mb|tb|kb)",
        r"size\s*[-:]?\s*(\d+(?:\.\d+)?)\s*(gb|mb|tb|kb)",
    ]
);

// Run against the lowercased message text. Group 1 is hours, group 2 minutes (optional).
patterns!(
    DURATION_PATTERNS,
    [
        r"(?:duração|duration|dur)(?:\s*)?[:-]?\s*(\d+)\s*h\s*(?:(\d+)\s*min)?",
        r"(\d+)\s*h(?:oras?)?\s*(?:(\d+)\s*min(?:utos?)?)?",
        r"(\d+):(\d+)(?::00)?",
    ]
);

// Run line by line. Group 1 is the username.
//
// `fonte|source...` binds the alternation at the top level, so a bare
// "fonte" match carries no capture and is ignored.
patterns!(
    ATTRIBUTION_PATTERNS,
    [
        r"(?i)(?:indexado\s+por|indexed\s+by)\s*@?(\w+)",
        r"(?i)(?:disponível\s+em|available\s+at)\s*@?(\w+)",
        r"(?i)(?:acesse|veja\s+em)\s*@?(\w+)",
        r"(?i)(?:conteúdo\s+em|content\s+at)\s*@?(\w+)",
        r"(?i)@?(\w+).*(?:indexou|indexado|indexed)",
        r"(?i)(?:canal(?:\s+oficial)?|channel)\s*[:-]?\s*@?(\w+)",
        r"(?i)(?:grupo|group)\s*[:-]?\s*@?(\w+)",
        r"(?i)fonte|source\s*[:-]?\s*@?(\w+)",
        r"(?i)@(\w+)",
        r"(?i)(?:by|por)\s+@?(\w+)",
    ]
);

regex!(CHANNEL_LINK, r"(?i)(?:https?://)?(?:www\.)?\bt(?:elegram)?\.me/(?:s/)?([A-Za-z0-9_+]+)");
regex!(USERNAME, r"^[A-Za-z][A-Za-z0-9_]{4,31}$");

/// `t.me` paths that name a Telegram feature rather than a channel.
pub const RESERVED_LINK_PATHS: &[&str] = &[
    "c", "s", "joinchat", "addstickers", "addemoji", "addtheme", "proxy", "socks", "iv", "share",
    "login", "setlanguage", "confirmphone",
];

/// Attribution usernames that are always false positives.
pub const ATTRIBUTION_DENYLIST: &[&str] = &["telegram", "me", "bot", "share"];

/// Substrings that mark a line as metadata rather than a title.
pub const TITLE_METADATA_KEYWORDS: &[&str] = &[
    "tamanho", "size", "duração", "duration", "indexado", "indexed", "@",
];

/// Words that mark course material.
pub const COURSE_KEYWORDS: &[&str] = &["módulo", "aula", "parte", "class", "curso", "lição"];

/// Hosting services whose links count as content.
pub const KNOWN_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "drive.google.com",
    "mega.nz",
    "mediafire.com",
    "dropbox.com",
];

/// Check whether a username is on the attribution denylist.
pub fn is_denied_attribution(username: &str) -> bool {
    let lower = username.to_lowercase();
    ATTRIBUTION_DENYLIST.contains(&lower.as_str())
}

/// Check whether a line looks like metadata.
pub fn is_metadata_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    TITLE_METADATA_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Check whether a URL points at a known hosting service.
pub fn is_known_host(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    KNOWN_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{}", known)))
}

/// Find the first public channel linked from the text.
///
/// Invite links (`t.me/+HASH`, `t.me/joinchat/HASH`), private post links
/// (`t.me/c/ID/POST`) and feature paths carry no username and are ignored.
pub fn find_channel_link(text: &str) -> Option<String> {
    CHANNEL_LINK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .find(|name| is_channel_username(name))
        .map(|name| name.to_string())
}

/// Check a `t.me` path segment against the public username grammar.
pub fn is_channel_username(segment: &str) -> bool {
    let lower = segment.to_lowercase();
    USERNAME.is_match(segment) && !RESERVED_LINK_PATHS.contains(&lower.as_str())
}

/// Render a number the way sizes are normalized: always with a fractional
/// part, switching to `1e+20` exponent form at 1e16 and below 1e-4.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let scientific = format!("{:e}", value);
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            return format!("{}e{}{:0>2}", mantissa, sign, digits);
        }
    }

    let rendered = value.to_string();
    if rendered.contains('.') {
        rendered
    } else {
        format!("{}.0", rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_compile() {
        assert_eq!(SIZE_PATTERNS.len(), 3);
        assert_eq!(DURATION_PATTERNS.len(), 3);
        assert_eq!(ATTRIBUTION_PATTERNS.len(), 10);
    }

    #[test]
    fn test_denylist_is_case_insensitive() {
        assert!(is_denied_attribution("bot"));
        assert!(is_denied_attribution("Telegram"));
        assert!(!is_denied_attribution("filmes_hd"));
    }

    #[test]
    fn test_metadata_line() {
        assert!(is_metadata_line("Tamanho: 4GB"));
        assert!(is_metadata_line("Duração: 2h"));
        assert!(is_metadata_line("join @channel"));
        assert!(!is_metadata_line("Curso Completo de Rust"));
    }

    #[test]
    fn test_known_host() {
        assert!(is_known_host("https://youtu.be/abc"));
        assert!(is_known_host("https://www.youtube.com/watch?v=abc"));
        assert!(is_known_host("https://drive.google.com/file/d/xyz"));
        assert!(!is_known_host("https://google.com/"));
        assert!(!is_known_host("https://notyoutube.com/"));
        assert!(!is_known_host("not a url"));
    }

    #[test]
    fn test_find_channel_link() {
        assert_eq!(
            find_channel_link("mais em https://t.me/filmes_hd/123"),
            Some("filmes_hd".to_string())
        );
        assert_eq!(find_channel_link("entre: t.me/+AbCdEf"), None);
        assert_eq!(find_channel_link("https://t.me/joinchat/AbCdEf"), None);
        assert_eq!(find_channel_link("sem links"), None);
    }

    #[test]
    fn test_channel_link_skips_private_and_feature_paths() {
        assert_eq!(find_channel_link("Aula nova em https://t.me/c/1234567/89"), None);
        assert_eq!(find_channel_link("pack em t.me/addstickers/Foo"), None);
        assert_eq!(find_channel_link("t.me/addemoji/Bar e t.me/proxy?server=x"), None);
        assert_eq!(find_channel_link("https://t.me/iv?url=x"), None);
        assert_eq!(
            find_channel_link("t.me/c/1/2 e depois https://t.me/s/cursos_online"),
            Some("cursos_online".to_string())
        );
    }

    #[test]
    fn test_channel_username_grammar() {
        assert!(is_channel_username("filmes_hd"));
        assert!(is_channel_username("Acervo"));
        assert!(!is_channel_username("abcd"));
        assert!(!is_channel_username("1filmes"));
        assert!(!is_channel_username("_filmes"));
        assert!(!is_channel_username(&"a".repeat(33)));
        assert!(!is_channel_username("AddStickers"));
        assert!(!is_channel_username("+AbCdEf"));
    }

    #[test]
    fn test_fonte_alternative_has_no_capture() {
        let fonte = &ATTRIBUTION_PATTERNS[7];
        let caps = fonte.captures("fonte: @origem").unwrap();
        assert!(caps.get(1).is_none());

        let caps = fonte.captures("source: @origem").unwrap();
        assert_eq!(caps.get(1).map(|m| m.as_str()), Some("origem"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.5), "4.5");
        assert_eq!(format_number(4.0), "4.0");
        assert_eq!(format_number(700.0), "700.0");
        assert_eq!(format_number(0.0), "0.0");
    }

    #[test]
    fn test_format_number_exponent_form() {
        assert_eq!(format_number(1e20), "1e+20");
        assert_eq!(format_number(1.5e20), "1.5e+20");
        assert_eq!(format_number(1e16), "1e+16");
        assert_eq!(format_number(9999999999999998.0), "9999999999999998.0");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(0.0001), "0.0001");
    }
}
