use crate::context::EnvProvider;
use crate::error::ConfigError;

/// Read a variable, treating an empty value as unset.
pub(crate) fn optional_env(env: &dyn EnvProvider, key: &str) -> Option<String> {
    env.get(key).filter(|val| !val.trim().is_empty())
}

/// Parse a variable, falling back to `default` when unset.
pub(crate) fn parse_optional_env<T>(
    env: &dyn EnvProvider,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(env, key)
        .map(|s| {
            s.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

/// Like [`parse_optional_env`], but zero is rejected.
pub(crate) fn parse_positive_env<T>(
    env: &dyn EnvProvider,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = parse_optional_env(env, key, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticEnv;

    #[test]
    fn test_empty_value_is_unset() {
        let env = StaticEnv::new().with("A", "  ").with("B", "x");
        assert_eq!(optional_env(&env, "A"), None);
        assert_eq!(optional_env(&env, "B").as_deref(), Some("x"));
        assert_eq!(optional_env(&env, "C"), None);
    }

    #[test]
    fn test_parse_optional_env() {
        let env = StaticEnv::new().with("N", " 42 ").with("BAD", "forty");
        assert_eq!(parse_optional_env(&env, "N", 1u64).unwrap(), 42);
        assert_eq!(parse_optional_env(&env, "MISSING", 7u64).unwrap(), 7);

        let err = parse_optional_env(&env, "BAD", 1u64).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "BAD"));
    }

    #[test]
    fn test_parse_positive_env_rejects_zero() {
        let env = StaticEnv::new().with("Z", "0");
        let err = parse_positive_env(&env, "Z", 5usize).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }
}
