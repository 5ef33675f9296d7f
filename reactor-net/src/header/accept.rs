//! `Accept` / `Accept-Language` parsing, scoring, and matching (§4.C1).

use super::{content_type::ContentType, malformed};
use crate::error::Result;

/// One `Accept` media-range entry with its quality weight and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub r#type: String,
    pub subtype: String,
    pub weight: f32,
    /// Parameters other than `q`, in declaration order.
    pub params: Vec<(String, String)>,
}

/// One `Accept-Language` range entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRange {
    pub primary: String,
    pub subtag: Option<String>,
    pub weight: f32,
}

impl MediaRange {
    /// `score = 1000*weight + type_score*10 + parameterCount*{1|2}` (§4.C1).
    ///
    /// `type_score`: `*/* = 0`, `*/x = 10`, `x/* = 20`, `x/x = 30`.
    /// Each parameter is worth 1 when its value is empty (null), else 2.
    pub fn score(&self) -> f64 {
        let type_score: f64 = match (self.r#type.as_str(), self.subtype.as_str()) {
            ("*", "*") => 0.0,
            ("*", _) => 10.0,
            (_, "*") => 20.0,
            _ => 30.0,
        };
        let param_score: f64 = self
            .params
            .iter()
            .map(|(_, v)| if v.is_empty() { 1.0 } else { 2.0 })
            .sum();
        1000.0 * self.weight as f64 + type_score + param_score
    }

    /// Whether `ct` matches this range: wildcards in either side match,
    /// and every parameter on the range must be present on `ct` with an
    /// equal value (token comparison case-insensitive).
    pub fn matches(&self, ct: &ContentType) -> bool {
        let type_ok = self.r#type == "*" || self.r#type.eq_ignore_ascii_case(&ct.r#type);
        let subtype_ok = self.subtype == "*" || self.subtype.eq_ignore_ascii_case(&ct.subtype);
        if !type_ok || !subtype_ok {
            return false;
        }
        self.params.iter().all(|(k, v)| {
            ct.params
                .iter()
                .any(|(ck, cv)| ck.eq_ignore_ascii_case(k) && cv.eq_ignore_ascii_case(v))
        })
    }
}

impl LanguageRange {
    /// Same scoring shape as `MediaRange`, with the primary/subtag acting
    /// as the type/subtype slots (`*-* = 0`, `*-x = 10`, `x-* = 20`, `x-x = 30`).
    pub fn score(&self) -> f64 {
        let primary_wild = self.primary == "*";
        let subtag_wild = self.subtag.as_deref().map(|s| s == "*").unwrap_or(true);
        let type_score: f64 = match (primary_wild, subtag_wild) {
            (true, true) => 0.0,
            (true, false) => 10.0,
            (false, true) => 20.0,
            (false, false) => 30.0,
        };
        1000.0 * self.weight as f64 + type_score
    }

    pub fn matches(&self, tag: &str) -> bool {
        let mut parts = tag.splitn(2, '-');
        let primary = parts.next().unwrap_or("");
        let subtag = parts.next();
        let primary_ok = self.primary == "*" || self.primary.eq_ignore_ascii_case(primary);
        let subtag_ok = match (&self.subtag, subtag) {
            (None, _) => true,
            (Some(s), _) if s == "*" => true,
            (Some(s), Some(t)) => s.eq_ignore_ascii_case(t),
            (Some(_), None) => false,
        };
        primary_ok && subtag_ok
    }
}

pub fn parse_media_ranges(raw: &str) -> Result<Vec<MediaRange>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_one_media_range)
        .collect()
}

fn parse_one_media_range(entry: &str) -> Result<MediaRange> {
    let mut parts = entry.split(';').map(str::trim);
    let type_subtype = parts.next().ok_or_else(|| malformed("empty media range"))?;
    let (t, s) = type_subtype
        .split_once('/')
        .ok_or_else(|| malformed("media range missing '/'"))?;
    if t.is_empty() || s.is_empty() {
        return Err(malformed("media range has empty type or subtype"));
    }

    let mut weight = 1.0f32;
    let mut params = Vec::new();
    for param in parts {
        if param.is_empty() {
            continue;
        }
        let (k, v) = param
            .split_once('=')
            .ok_or_else(|| malformed("media range parameter missing '='"))?;
        let k = k.trim();
        let v = super::unquote(v.trim());
        if k.eq_ignore_ascii_case("q") {
            weight = v.parse().map_err(|_| malformed("invalid q value"))?;
        } else {
            params.push((k.to_string(), v));
        }
    }

    Ok(MediaRange {
        r#type: t.to_string(),
        subtype: s.to_string(),
        weight,
        params,
    })
}

pub fn parse_language_ranges(raw: &str) -> Result<Vec<LanguageRange>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_one_language_range)
        .collect()
}

fn parse_one_language_range(entry: &str) -> Result<LanguageRange> {
    let mut parts = entry.split(';').map(str::trim);
    let tag = parts.next().ok_or_else(|| malformed("empty language range"))?;
    let mut weight = 1.0f32;
    for param in parts {
        if let Some((k, v)) = param.split_once('=') {
            if k.trim().eq_ignore_ascii_case("q") {
                weight = v.trim().parse().map_err(|_| malformed("invalid q value"))?;
            }
        }
    }
    let mut tag_parts = tag.splitn(2, '-');
    let primary = tag_parts
        .next()
        .ok_or_else(|| malformed("empty language tag"))?
        .to_string();
    let subtag = tag_parts.next().map(|s| s.to_string());
    Ok(LanguageRange {
        primary,
        subtag,
        weight,
    })
}

pub fn encode_media_ranges(ranges: &[MediaRange]) -> String {
    ranges
        .iter()
        .map(|r| {
            let mut s = format!("{}/{}", r.r#type, r.subtype);
            for (k, v) in &r.params {
                s.push_str(&format!(";{k}={v}"));
            }
            if (r.weight - 1.0).abs() > f32::EPSILON {
                s.push_str(&format!(";q={}", r.weight));
            }
            s
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn encode_language_ranges(ranges: &[LanguageRange]) -> String {
    ranges
        .iter()
        .map(|r| {
            let mut s = r.primary.clone();
            if let Some(sub) = &r.subtag {
                s.push('-');
                s.push_str(sub);
            }
            if (r.weight - 1.0).abs() > f32::EPSILON {
                s.push_str(&format!(";q={}", r.weight));
            }
            s
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Picks the candidate content type maximizing score against `accept`
/// (§4.C1, used by the Accept routing link, §4.C10).
pub fn best_match<'a>(accept: &[MediaRange], candidates: &'a [ContentType]) -> Option<&'a ContentType> {
    let mut best: Option<(&ContentType, f64)> = None;
    for candidate in candidates {
        let top = accept
            .iter()
            .filter(|range| range.matches(candidate))
            .map(MediaRange::score)
            .fold(f64::MIN, f64::max);
        if top == f64::MIN {
            continue;
        }
        if best.is_none() || top > best.unwrap().1 {
            best = Some((candidate, top));
        }
    }
    best.map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_strictly_orders_specificity_at_equal_weight() {
        let exact = parse_one_media_range("a/b").unwrap();
        let type_wild = parse_one_media_range("a/*").unwrap();
        let subtype_wild = parse_one_media_range("*/b").unwrap();
        let both_wild = parse_one_media_range("*/*").unwrap();
        assert!(exact.score() > type_wild.score());
        assert!(type_wild.score() > subtype_wild.score());
        assert!(subtype_wild.score() > both_wild.score());
    }

    #[test]
    fn score_is_monotone_in_weight() {
        let low = parse_one_media_range("a/b;q=0.5").unwrap();
        let high = parse_one_media_range("a/b;q=0.9").unwrap();
        assert!(high.score() > low.score());
    }

    #[test]
    fn parameter_count_contributes_to_score() {
        let none = parse_one_media_range("a/b").unwrap();
        let one_null = parse_one_media_range("a/b;charset").unwrap();
        let one_valued = parse_one_media_range("a/b;charset=utf-8").unwrap();
        assert!(one_null.score() > none.score());
        assert!(one_valued.score() > one_null.score());
    }

    #[test]
    fn media_range_matches_wildcards_both_directions() {
        let range = parse_one_media_range("application/*").unwrap();
        let ct = ContentType {
            r#type: "application".into(),
            subtype: "json".into(),
            params: vec![],
        };
        assert!(range.matches(&ct));
    }

    #[test]
    fn best_match_picks_highest_scoring_candidate() {
        let accept = parse_media_ranges("text/html;q=0.9, application/json").unwrap();
        let candidates = vec![
            ContentType { r#type: "text".into(), subtype: "html".into(), params: vec![] },
            ContentType { r#type: "application".into(), subtype: "json".into(), params: vec![] },
        ];
        let chosen = best_match(&accept, &candidates).unwrap();
        assert_eq!(chosen.subtype, "json");
    }

    #[test]
    fn language_range_matches_subtag_wildcard() {
        let ranges = parse_language_ranges("en-*;q=0.8").unwrap();
        assert!(ranges[0].matches("en-US"));
        assert!(!ranges[0].matches("fr-FR"));
    }
}
