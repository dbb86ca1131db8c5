/// String evidence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrC {
    pub samples: u64,
    pub max_len: usize,
    /// Every sample looked like an absolute link.
    pub is_uri: bool,
}

impl StrC {
    pub fn observe(s: &str) -> Self {
        Self { samples: 1, max_len: s.chars().count(), is_uri: looks_like_uri(s) }
    }
}

pub fn join_str(a: &StrC, b: &StrC) -> StrC {
    StrC {
        samples: a.samples + b.samples,
        max_len: a.max_len.max(b.max_len),
        is_uri: a.is_uri && b.is_uri,
    }
}

pub fn looks_like_uri(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("mailto:") || s.starts_with("tel:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_needs_every_sample() {
        let a = StrC::observe("https://例え.テスト/a");
        assert!(a.is_uri);
        assert_eq!(a.max_len, 16);
        let joined = join_str(&a, &StrC::observe("relative/path"));
        assert!(!joined.is_uri);
        assert_eq!(joined.samples, 2);
    }
}
