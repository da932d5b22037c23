use std::path::PathBuf;

pub const DEFAULT_BUNDLE_PATH: &str = "data/recipes.db";
pub const DEFAULT_TOP_N: i64 = 3;

/// Settings read from the environment; command-line flags override them.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bundle_path: PathBuf,
    pub top_n: i64,
    pub min_df: usize,
    pub max_features: Option<usize>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let bundle_path = lookup("RECIPE_BUNDLE")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUNDLE_PATH));

        Settings {
            bundle_path,
            top_n: env_positive(&lookup, "RECIPE_TOP_N").map_or(DEFAULT_TOP_N, |v| v as i64),
            min_df: env_positive(&lookup, "RECIPE_MIN_DF").unwrap_or(1),
            max_features: env_positive(&lookup, "RECIPE_MAX_FEATURES"),
        }
    }
}

fn env_positive<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let s = settings(&[]);
        assert_eq!(s.bundle_path, PathBuf::from(DEFAULT_BUNDLE_PATH));
        assert_eq!(s.top_n, DEFAULT_TOP_N);
        assert_eq!(s.min_df, 1);
        assert_eq!(s.max_features, None);
    }

    #[test]
    fn environment_values_are_used() {
        let s = settings(&[
            ("RECIPE_BUNDLE", "/srv/recipes.db"),
            ("RECIPE_TOP_N", "5"),
            ("RECIPE_MIN_DF", "2"),
            ("RECIPE_MAX_FEATURES", "5000"),
        ]);
        assert_eq!(s.bundle_path, PathBuf::from("/srv/recipes.db"));
        assert_eq!(s.top_n, 5);
        assert_eq!(s.min_df, 2);
        assert_eq!(s.max_features, Some(5000));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let s = settings(&[("RECIPE_TOP_N", "0"), ("RECIPE_MIN_DF", "many")]);
        assert_eq!(s.top_n, DEFAULT_TOP_N);
        assert_eq!(s.min_df, 1);
    }
}
