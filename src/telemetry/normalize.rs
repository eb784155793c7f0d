//! 엔드포인트 식별자 정규화
//!
//! 경로의 가변 세그먼트(UUID, 숫자, 주민번호류 긴 숫자)를 자리표시자로 바꿔 카디널리티를 제한합니다.

use uuid::Uuid;

/// 정규화할 수 없는 이름이 모이는 버킷
pub const UNKNOWN_ENDPOINT: &str = "unknown";

/// 이 자릿수 이상의 숫자 세그먼트는 문서 번호로 취급
const DOCUMENT_MIN_DIGITS: usize = 9;

/// `"GET /clients/42/profile?x=1"` → `"GET /clients/{n}/profile"`
pub fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
        return UNKNOWN_ENDPOINT.to_string();
    }

    let without_query = trimmed
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    let (method, path) = match without_query.split_once(char::is_whitespace) {
        Some((method, rest)) if !method.is_empty() && method.chars().all(|c| c.is_ascii_alphabetic()) => {
            (Some(method.to_ascii_uppercase()), rest.trim())
        }
        Some(_) => return UNKNOWN_ENDPOINT.to_string(),
        None => (None, without_query),
    };

    if path.chars().any(char::is_whitespace) {
        return UNKNOWN_ENDPOINT.to_string();
    }

    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(normalize_segment)
        .collect();
    let path = format!("/{}", segments.join("/"));

    match method {
        Some(method) => format!("{} {}", method, path),
        None => path,
    }
}

fn normalize_segment(segment: &str) -> String {
    if Uuid::parse_str(segment).is_ok() {
        return "{id}".to_string();
    }

    // 123.456.789-09 처럼 구분자가 섞인 번호 포함
    let digits = segment.chars().filter(char::is_ascii_digit).count();
    let numeric = digits > 0 && segment.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    if numeric {
        return if digits >= DOCUMENT_MIN_DIGITS {
            "{doc}".to_string()
        } else if digits == segment.len() {
            "{n}".to_string()
        } else {
            segment.to_string()
        };
    }

    segment.to_ascii_lowercase()
}
