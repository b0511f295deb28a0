use crate::query_string::encode_value;
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use regex::{NoExpand, Regex};

/// http로 시작하는 URL 패턴
static HTTP_PTRN: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+").unwrap());

/// Solr 연산자로 해석되는 문자
static REMOVE_CHARS_PTRN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[&|!(){}\[\]^"~?\\;]"#).unwrap());

/// * 및 URL 인코딩된 *
static WILDCARD_PTRN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\*|%2a").unwrap());

static COLON_PTRN: Lazy<Regex> = Lazy::new(|| Regex::new(":").unwrap());

/// 주석, doctype, 태그
static HTML_PTRN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->|<[!/?]?[A-Za-z][^<>]*>").unwrap());

pub const DEFAULT_MAX_LENGTH: usize = 200;

/// clean 옵션
#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub allow_html_tags: bool,
    pub allow_http: bool,
    pub allow_wildcard: bool,
    /// (찾을 패턴, 바꿀 문자열). 바꿀 문자열의 $는 확장되지 않음
    pub escape_chars: Option<(Regex, String)>,
    /// 0이면 자르지 않음
    pub max_length: usize,
    pub remove_chars: Option<Regex>,
    pub url_encode: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            allow_html_tags: false,
            allow_http: false,
            allow_wildcard: false,
            escape_chars: Some((COLON_PTRN.clone(), r"\:".to_string())),
            max_length: DEFAULT_MAX_LENGTH,
            remove_chars: Some(REMOVE_CHARS_PTRN.clone()),
            url_encode: false,
        }
    }
}

/// 사용자가 입력한 검색어를 Solr에 보내기 전에 정리함
pub fn clean(query: &str, options: &CleanOptions) -> String {
    let mut query = query.to_string();

    if !options.allow_http {
        query = HTTP_PTRN.replace_all(&query, "").into_owned();
    }

    if let Some(remove_chars) = &options.remove_chars {
        query = remove_matches(&query, remove_chars);
    }

    if !options.allow_wildcard {
        query = WILDCARD_PTRN.replace_all(&query, "").into_owned();
    }

    if let Some((pattern, replacement)) = &options.escape_chars {
        query = pattern
            .replace_all(&query, NoExpand(replacement))
            .into_owned();
    }

    if !options.allow_html_tags {
        query = strip_html(&query);
    }

    if options.max_length > 0 {
        // 너무 긴 검색어는 Solr 성능 문제를 일으킴
        query = truncate_utf8(&query, options.max_length, true);
    }

    if options.url_encode {
        query = encode_value(&query);
    }

    query
}

/// 기본 옵션으로 clean
pub fn clean_query(query: &str) -> String {
    clean(query, &CleanOptions::default())
}

/// 매칭된 문자를 제거.
/// <br>
/// 연속된 매칭 구간이 양쪽 단어 문자 사이에 있으면 단어가 붙지 않도록 공백 하나로 바꿈
fn remove_matches(query: &str, pattern: &Regex) -> String {
    let mut result = String::with_capacity(query.len());
    let mut last_end = 0;
    let mut run: Option<(usize, usize)> = None;

    for m in pattern.find_iter(query) {
        match run {
            Some((start, end)) if end == m.start() => run = Some((start, m.end())),
            Some((start, end)) => {
                result.push_str(&query[last_end..start]);
                push_run_separator(&mut result, query, start, end);
                last_end = end;
                run = Some((m.start(), m.end()));
            }
            None => run = Some((m.start(), m.end())),
        }
    }

    if let Some((start, end)) = run {
        result.push_str(&query[last_end..start]);
        push_run_separator(&mut result, query, start, end);
        last_end = end;
    }

    result.push_str(&query[last_end..]);
    result
}

fn push_run_separator(result: &mut String, query: &str, start: usize, end: usize) {
    let before = query[..start].chars().next_back();
    let after = query[end..].chars().next();

    if let (Some(before), Some(after)) = (before, after) {
        if before.is_alphanumeric() && after.is_alphanumeric() {
            result.push(' ');
        }
    }
}

/// HTML 마크업을 제거하고 텍스트만 남김. 남은 <, >, &는 escape
fn strip_html(query: &str) -> String {
    let stripped = HTML_PTRN.replace_all(query, "");
    partial_escape(&stripped).into_owned()
}

/// 문자열을 max_len 길이로 자름.
/// <br>
/// 길이는 UTF-16 code unit 기준. 서로게이트 쌍이 잘리는 위치에 걸리면 그 문자는 통째로 버림
/// (짝 없는 high surrogate가 남지 않음)
pub fn truncate_utf8(text: &str, max_len: usize, preserve_words: bool) -> String {
    // 앞뒤 공백 제거만으로 충분할 수도 있음
    let text = text.trim();

    let mut units = 0;
    let mut cut_pos = text.len();
    for (idx, c) in text.char_indices() {
        if units + c.len_utf16() > max_len {
            cut_pos = idx;
            break;
        }
        units += c.len_utf16();
    }

    let mut truncated = &text[..cut_pos];

    // 실제로 잘렸으면 마지막 단어 조각을 버림
    if cut_pos < text.len() && preserve_words {
        if let Some(pos) = truncated.rfind(char::is_whitespace) {
            truncated = &truncated[..pos];
        }
    }

    truncated.trim_end().to_string()
}

#[test]
fn clean_find_and_replace_test() {
    assert_eq!(clean_query("large:intestines"), r"large\:intestines");
    assert_eq!(clean_query("peace|smoke"), "peace smoke");
    assert_eq!(
        clean_query("query1:filter1 query2:filter2"),
        r"query1\:filter1 query2\:filter2"
    );
    assert_eq!(clean_query(r#""quoted""#), "quoted");
}

#[test]
fn clean_is_idempotent_for_colons_test() {
    for query in [
        "title:rust",
        "a:b:c",
        "query1:filter1 query2:filter2",
        r"already\:escaped",
        "time 12:30 ko:한국어",
    ] {
        let once = clean_query(query);
        let twice = clean_query(&once);
        assert_eq!(once, twice, "query: {query}");
        assert!(!once.contains(r"\\:"));
        assert_eq!(once.matches(':').count(), once.matches(r"\:").count());
    }
}

#[test]
fn clean_operator_runs_test() {
    assert_eq!(clean_query("(foo) || {bar}"), "foo  bar");
    assert_eq!(clean_query("foo&&bar"), "foo bar");
    assert_eq!(clean_query("!important"), "important");
    assert_eq!(clean_query(r"path\to"), "path to");
}

#[test]
fn clean_wildcard_test() {
    assert_eq!(clean_query("rust*"), "rust");
    assert_eq!(clean_query("rust%2a lang%2A"), "rust lang");

    let options = CleanOptions {
        allow_wildcard: true,
        ..CleanOptions::default()
    };
    assert_eq!(clean("rust*", &options), "rust*");
}

#[test]
fn clean_http_test() {
    assert_eq!(
        clean_query("see https://example.com/a?b=c now"),
        "see  now"
    );

    let options = CleanOptions {
        allow_http: true,
        escape_chars: None,
        ..CleanOptions::default()
    };
    assert_eq!(clean("http://example.com", &options), "http://example.com");
}

#[test]
fn clean_html_test() {
    assert_eq!(
        clean_query("<script>alert(1)</script>hello <b>world</b>"),
        "alert 1hello world"
    );

    let options = CleanOptions {
        remove_chars: None,
        ..CleanOptions::default()
    };
    assert_eq!(clean("a <!-- hidden --> b", &options), "a  b");
    // 태그를 지운 뒤 다시 태그가 만들어지지 않음
    assert_eq!(clean_query("<<b>script>"), "&lt;script&gt;");

    let options = CleanOptions {
        allow_html_tags: true,
        ..CleanOptions::default()
    };
    assert_eq!(clean("<b>bold</b>", &options), "<b>bold</b>");
}

#[test]
fn clean_max_length_and_urlencode_test() {
    let options = CleanOptions {
        max_length: 10,
        url_encode: true,
        ..CleanOptions::default()
    };
    assert_eq!(clean("hello big world", &options), "hello+big");

    let options = CleanOptions {
        max_length: 0,
        ..CleanOptions::default()
    };
    assert_eq!(clean(" spaced ", &options), " spaced ");
}

#[test]
fn clean_custom_escape_test() {
    let options = CleanOptions {
        escape_chars: Some((Regex::new("-").unwrap(), "$1 minus".to_string())),
        ..CleanOptions::default()
    };
    assert_eq!(clean("a-b", &options), "a$1 minusb");
}

#[test]
fn truncate_short_text_unchanged_test() {
    assert_eq!(truncate_utf8("  short text  ", 200, true), "short text");
    assert_eq!(truncate_utf8("exact", 5, true), "exact");
    assert_eq!(truncate_utf8("", 5, true), "");
}

#[test]
fn truncate_preserve_words_test() {
    assert_eq!(truncate_utf8("hello wonderful world", 12, true), "hello");
    assert_eq!(truncate_utf8("hello wonderful world", 12, false), "hello wonder");
    // 공백이 없으면 잘린 그대로
    assert_eq!(truncate_utf8("supercalifragilistic", 5, true), "super");

    let text = "the quick brown fox jumps over the lazy dog";
    let words: Vec<&str> = text.split(' ').collect();
    for max_len in 1..text.len() {
        let truncated = truncate_utf8(text, max_len, true);
        assert!(truncated.len() <= max_len);
        if truncated.contains(' ') {
            for word in truncated.split(' ') {
                assert!(words.contains(&word), "partial word {word} at {max_len}");
            }
        }
    }
}

#[test]
fn truncate_surrogate_boundary_test() {
    // 😀 는 UTF-16에서 2 unit
    let text = "ab😀";
    assert_eq!(truncate_utf8(text, 3, false), "ab");
    assert_eq!(truncate_utf8(text, 4, false), "ab😀");

    let text = "검색 😀😀 결과";
    for max_len in 0..12 {
        let truncated = truncate_utf8(text, max_len, false);
        assert!(truncated.encode_utf16().count() <= max_len);
        // 유효한 UTF-16으로 왕복 가능해야 함
        let utf16: Vec<u16> = truncated.encode_utf16().collect();
        assert_eq!(String::from_utf16(&utf16).unwrap(), truncated);
    }
    assert_eq!(truncate_utf8(text, 4, false), "검색");
    assert_eq!(truncate_utf8(text, 5, false), "검색 😀");
}
