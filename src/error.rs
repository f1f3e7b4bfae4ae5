pub type ScopeResult<T> = Result<T, ScopeError>;

#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    #[error("data error: {0}")]
    Data(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("view error: {0}")]
    View(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScopeError {
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn view(msg: impl Into<String>) -> Self {
        Self::View(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(ScopeError::data("x").to_string().contains("data error:"));
        assert!(
            ScopeError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(ScopeError::view("x").to_string().contains("view error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ScopeError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
