use crate::error::{Error, ErrorKind, Result};

/// An absolute URI identifying a logical service, plus a request target
/// derived from it that is always an absolute path starting with `/`
/// (§3 "ServiceID").
///
/// Two shapes are accepted:
/// - hierarchical: `scheme://authority/path` — the authority must be
///   non-empty, `path` (or `/` if absent) becomes the request target.
/// - opaque: `scheme:ssp#/path` — the fragment must itself be an absolute
///   path, which becomes the request target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceID {
    raw: String,
    scheme: String,
    authority: Option<String>,
    request_target: String,
}

impl ServiceID {
    pub fn parse(raw: &str) -> Result<Self> {
        let scheme_end = raw
            .find(':')
            .filter(|&i| raw[..i].chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'))
            .filter(|&i| i > 0);

        let Some(scheme_end) = scheme_end else {
            return Err(not_absolute(raw));
        };

        let scheme = raw[..scheme_end].to_string();
        let rest = &raw[scheme_end + 1..];

        if let Some(ssp) = rest.strip_prefix("//") {
            let authority_end = ssp.find('/').unwrap_or(ssp.len());
            let authority = &ssp[..authority_end];
            if authority.is_empty() {
                return Err(missing_authority(raw));
            }
            let path = &ssp[authority_end..];
            let request_target = if path.is_empty() { "/".to_string() } else { path.to_string() };
            Ok(Self {
                raw: raw.to_string(),
                scheme,
                authority: Some(authority.to_string()),
                request_target,
            })
        } else {
            let fragment = match rest.find('#') {
                Some(i) => &rest[i + 1..],
                None => "",
            };
            if !fragment.starts_with('/') {
                return Err(opaque_fragment_not_absolute(raw));
            }
            Ok(Self {
                raw: raw.to_string(),
                scheme,
                authority: None,
                request_target: fragment.to_string(),
            })
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn request_target(&self) -> &str {
        &self.request_target
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn not_absolute(raw: &str) -> Error {
    Error::new(ErrorKind::IllegalScheme, format!("URI must be absolute: {raw}"))
}

fn missing_authority(raw: &str) -> Error {
    Error::new(
        ErrorKind::IllegalScheme,
        format!("URI must have an authority component: {raw}"),
    )
}

fn opaque_fragment_not_absolute(raw: &str) -> Error {
    Error::new(
        ErrorKind::IllegalScheme,
        format!("Opaque URI fragment path must be absolute: {raw}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hierarchical_with_authority() {
        let id = ServiceID::parse("scheme://authority/path").unwrap();
        assert_eq!(id.scheme(), "scheme");
        assert_eq!(id.authority(), Some("authority"));
        assert_eq!(id.request_target(), "/path");
    }

    #[test]
    fn accepts_opaque_with_absolute_fragment() {
        let id = ServiceID::parse("scheme:ssp#/path").unwrap();
        assert_eq!(id.scheme(), "scheme");
        assert_eq!(id.authority(), None);
        assert_eq!(id.request_target(), "/path");
    }

    #[test]
    fn rejects_relative_path() {
        let err = ServiceID::parse("/path").unwrap_err();
        assert_eq!(err.message, "URI must be absolute: /path");
    }

    #[test]
    fn rejects_hierarchical_with_empty_authority() {
        let err = ServiceID::parse("scheme:///path").unwrap_err();
        assert_eq!(err.message, "URI must have an authority component: scheme:///path");
    }

    #[test]
    fn rejects_opaque_with_relative_fragment() {
        let err = ServiceID::parse("scheme:ssp#path").unwrap_err();
        assert_eq!(
            err.message,
            "Opaque URI fragment path must be absolute: scheme:ssp#path"
        );
    }
}
