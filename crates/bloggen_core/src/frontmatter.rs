//! Front matter parsing for source documents

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub title: Option<String>,
    pub date: Option<i64>,
    pub tags: Vec<String>,
    pub draft: bool,
}

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("invalid front matter line: {0}")]
    InvalidLine(String),
    #[error("unknown front matter key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("unterminated front matter block")]
    Unterminated,
}

/// Split a raw document into its parsed header and Markdown body.
///
/// Documents without a leading `---` fence get a default header and the
/// whole input as body.
pub fn parse_front_matter(raw: &str) -> Result<(Header, &str), HeaderError> {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return Ok((Header::default(), raw));
    };
    let Some((block, body)) = split_fence(rest) else {
        return Err(HeaderError::Unterminated);
    };
    let header = parse_header(block)?;
    Ok((header, body))
}

fn split_fence(rest: &str) -> Option<(&str, &str)> {
    if let Some(body) = rest.strip_prefix("---\n") {
        return Some(("", body));
    }
    let mut search = 0;
    while let Some(pos) = rest[search..].find("\n---") {
        let start = search + pos;
        let after = start + 4;
        let tail = &rest[after..];
        if tail.is_empty() {
            return Some((&rest[..start], ""));
        }
        if let Some(body) = tail.strip_prefix('\n') {
            return Some((&rest[..start], body));
        }
        if let Some(body) = tail.strip_prefix("\r\n") {
            return Some((&rest[..start], body));
        }
        search = after;
    }
    None
}

fn parse_header(block: &str) -> Result<Header, HeaderError> {
    let mut header = Header::default();
    for raw_line in block.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| HeaderError::InvalidLine(line.to_string()))?;
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        match key {
            "title" => header.title = non_empty(value),
            "date" => {
                header.date = Some(parse_date(value).ok_or_else(|| {
                    HeaderError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    }
                })?);
            }
            "tags" => {
                header.tags = value
                    .split(',')
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect();
            }
            "draft" => {
                header.draft = match value {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(HeaderError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        });
                    }
                };
            }
            _ => return Err(HeaderError::UnknownKey(key.to_string())),
        }
    }
    Ok(header)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_date(value: &str) -> Option<i64> {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(datetime.and_utc().timestamp());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Some(datetime.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|datetime| datetime.and_utc().timestamp());
    }
    None
}
