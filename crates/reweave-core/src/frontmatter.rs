//! Frontmatter parsing for content files.

use std::{fmt, path::Path};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{
    Deserialize, Deserializer,
    de::{self, IgnoredAny, MapAccess, Visitor},
};

use crate::error::{CoreError, Result};

/// Frontmatter metadata for content files.
///
/// Every key is optional. Unknown keys are ignored so that sources written
/// for other generators still build.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Frontmatter {
    #[serde(default, deserialize_with = "de_scalar")]
    pub title: Option<String>,

    /// Publication date.
    #[serde(default, deserialize_with = "de_date")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "de_scalar")]
    pub excerpt: Option<String>,

    /// Cover image path or URL.
    #[serde(default, deserialize_with = "de_scalar")]
    pub image: Option<String>,

    #[serde(default, deserialize_with = "de_scalar")]
    pub category: Option<String>,

    /// A single tag or a list of tags.
    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,

    #[serde(default, deserialize_with = "de_flag")]
    pub draft: bool,

    #[serde(default, deserialize_with = "de_flag")]
    pub hide: bool,

    #[serde(default, deserialize_with = "de_flag")]
    pub pin: bool,

    /// Short permanent identifier, preferred over the file name as slug.
    #[serde(default, deserialize_with = "de_scalar")]
    pub abbrlink: Option<String>,
}

/// Delimiter types for frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML frontmatter delimited by `---`.
    Yaml,
    /// TOML frontmatter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Split content into frontmatter and body.
///
/// The closing delimiter must start a line.
pub fn split_frontmatter(content: &str) -> Option<(FrontmatterFormat, &str, &str)> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let format = if content.starts_with("---") {
        FrontmatterFormat::Yaml
    } else if content.starts_with("+++") {
        FrontmatterFormat::Toml
    } else {
        return None;
    };

    let delimiter = format.delimiter();
    let after_first = &content[delimiter.len()..];
    let closing_pos = after_first.find(&format!("\n{delimiter}"))?;

    let frontmatter = after_first[..closing_pos].trim();
    let body = after_first[closing_pos + 1 + delimiter.len()..].trim_start();

    Some((format, frontmatter, body))
}

/// Parse frontmatter from a string, returning the metadata and the body.
pub fn parse_frontmatter<'a>(content: &'a str, path: &Path) -> Result<(Frontmatter, &'a str)> {
    let Some((format, fm_str, body)) = split_frontmatter(content) else {
        return Ok((Frontmatter::default(), content));
    };

    if fm_str.is_empty() {
        return Ok((Frontmatter::default(), body));
    }

    let frontmatter: Frontmatter = match format {
        FrontmatterFormat::Yaml => {
            serde_yaml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
        FrontmatterFormat::Toml => {
            toml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
    };

    Ok((frontmatter, body))
}

/// Parse a date in any of the accepted spellings, interpreting naive values as UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Str(s) => s.trim().to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Scalar),
    Many(Vec<Scalar>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Other(IgnoredAny),
}

fn de_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.map(Scalar::into_string).filter(|s| !s.is_empty()))
}

fn de_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let scalars = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(one)) => vec![one],
        Some(OneOrMany::Many(many)) => many,
    };

    let mut tags: Vec<String> = Vec::with_capacity(scalars.len());
    for tag in scalars.into_iter().map(Scalar::into_string) {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// Only a literal boolean `true` sets a flag; strings such as `"yes"` do not.
fn de_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Flag::deserialize(deserializer)?, Flag::Bool(true)))
}

fn de_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DateVisitor)
}

#[derive(Clone, Copy)]
struct DateVisitor;

impl<'de> Visitor<'de> for DateVisitor {
    type Value = Option<DateTime<Utc>>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an RFC 3339 timestamp or YYYY-MM-DD date")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        parse_date(v)
            .map(Some)
            .ok_or_else(|| E::custom(format!("unrecognized date `{v}`")))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    // TOML datetimes arrive as a single-entry map holding their string form.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut parsed = None;
        while let Some((_key, value)) = map.next_entry::<String, String>()? {
            parsed = Some(self.visit_str::<A::Error>(&value)?);
        }
        parsed.ok_or_else(|| de::Error::custom("empty date value"))
    }
}
