//! `application/x-www-form-urlencoded` decoding (§4.C2).

use percent_encoding::percent_decode_str;

/// Decodes a `application/x-www-form-urlencoded` body into an ordered list
/// of key/value pairs. `+` decodes to space; repeated keys preserve order
/// (the caller folds them into a multi-map if it wants repeat semantics).
pub fn decode_urlencoded(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let replaced = raw.replace('+', " ");
    percent_decode_str(&replaced)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plus_as_space() {
        let pairs = decode_urlencoded("name=John+Doe");
        assert_eq!(pairs, vec![("name".to_string(), "John Doe".to_string())]);
    }

    #[test]
    fn decodes_percent_escapes() {
        let pairs = decode_urlencoded("q=a%26b");
        assert_eq!(pairs, vec![("q".to_string(), "a&b".to_string())]);
    }

    #[test]
    fn preserves_order_of_repeated_keys() {
        let pairs = decode_urlencoded("tag=a&tag=b&tag=c");
        assert_eq!(
            pairs,
            vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
                ("tag".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn handles_value_less_keys() {
        let pairs = decode_urlencoded("flag&other=1");
        assert_eq!(
            pairs,
            vec![
                ("flag".to_string(), "".to_string()),
                ("other".to_string(), "1".to_string()),
            ]
        );
    }
}
