use serde::de::DeserializeOwned;
use thiserror::Error;

/// Deserialization failure located by its JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
    /// 1-based line of the failure in the source text.
    pub line: usize,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        PathError { path, line: inner.line(), message: inner.to_string() }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Outer {
        items: Vec<Inner>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Inner {
        id: u32,
    }

    #[test]
    fn reports_path_and_line() {
        let src = "{\"items\": [\n{\"id\": 1},\n{\"id\": \"x\"}\n]}";
        let err = from_str_with_path::<Outer>(src).unwrap_err();
        assert_eq!(err.path, "items[1].id");
        assert_eq!(err.line, 3);
        assert!(err.to_string().starts_with("at JSON path items[1].id → "));
    }
}
