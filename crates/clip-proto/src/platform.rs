use std::path::{Path, PathBuf};

use crate::APP_NAME;

/// Directories searched after `PATH`.  GUI sessions (login items, app
/// bundles) often start with a minimal `PATH` that misses these.
#[cfg(unix)]
const EXTRA_SEARCH_DIRS: &[&str] = &[
    "/usr/local/bin",
    "/opt/homebrew/bin",
    "/usr/bin",
    "/bin",
    "/usr/sbin",
    "/sbin",
    "/usr/local/sbin",
];

#[cfg(windows)]
const EXTRA_SEARCH_DIRS: &[&str] = &[];

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/twitch-clip/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_NAME)
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_NAME)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}

pub fn cache_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| temp_dir())
            .join(".cache")
            .join(APP_NAME)
    }
    #[cfg(windows)]
    {
        dirs::cache_dir()
            .unwrap_or_else(|| temp_dir())
            .join(APP_NAME)
    }
}

pub fn avatar_cache_dir() -> PathBuf {
    cache_dir().join("avatars")
}

#[cfg(unix)]
fn binary_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(windows)]
fn binary_names(name: &str) -> Vec<String> {
    if name.to_ascii_lowercase().ends_with(".exe") {
        vec![name.to_string()]
    } else {
        vec![format!("{}.exe", name), name.to_string()]
    }
}

fn find_in_dirs<'a, I>(dirs: I, names: &[String]) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    for dir in dirs {
        for name in names {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

fn find_on_path(names: &[String]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
    find_in_dirs(dirs.iter().map(PathBuf::as_path), names)
}

/// Locate an executable.  Absolute or relative paths are accepted as-is when
/// they exist; bare names are searched on `PATH`, then in the usual install
/// directories.
pub fn find_binary(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let candidate = Path::new(name);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let names = binary_names(name);
    if let Some(p) = find_on_path(&names) {
        return Some(p);
    }

    find_in_dirs(EXTRA_SEARCH_DIRS.iter().map(Path::new), &names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_app_scoped() {
        assert!(data_dir().ends_with(APP_NAME));
        assert!(config_dir().ends_with(APP_NAME));
        assert!(avatar_cache_dir().ends_with(format!("{}/avatars", APP_NAME)));
    }

    #[test]
    fn test_find_binary_rejects_empty_and_missing() {
        assert!(find_binary("").is_none());
        assert!(find_binary("definitely-not-a-real-binary-name-4242").is_none());
        assert!(find_binary("/nonexistent/dir/streamlink").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_binary_finds_shell() {
        assert!(find_binary("sh").is_some());
        assert_eq!(find_binary("/bin/sh"), Some(PathBuf::from("/bin/sh")));
    }
}
