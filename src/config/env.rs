// dbassist/src/config/env.rs
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env reference pattern is valid")
});

/// Loads `<project_root>/.env` into the process environment if it exists.
/// Variables already set in the environment are left alone.
pub fn load_dotenv(project_root: &Path) {
    let env_path = project_root.join(".env");
    if !env_path.is_file() {
        return;
    }
    match dotenv::from_path(&env_path) {
        Ok(()) => debug!("Loaded environment from {}", env_path.display()),
        Err(e) => debug!("Ignoring unreadable {}: {}", env_path.display(), e),
    }
}

/// Expands `${NAME}` references using `lookup`.
///
/// Returns the name of the first undefined variable on failure.
pub fn interpolate<F>(value: &str, lookup: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = String::with_capacity(value.len());
    let mut last = 0;

    for caps in ENV_REFERENCE.captures_iter(value) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let resolved = lookup(name.as_str()).ok_or_else(|| name.as_str().to_string())?;
        expanded.push_str(&value[last..whole.start()]);
        expanded.push_str(&resolved);
        last = whole.end();
    }

    expanded.push_str(&value[last..]);
    Ok(expanded)
}
