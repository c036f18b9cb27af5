use std::path::PathBuf;

/// Where records live and whose records they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub user_id: String,
}

impl Settings {
    /// Explicit values win; otherwise the XDG data directory and the login name.
    pub fn resolve(db: Option<PathBuf>, user: Option<String>) -> Self {
        let db_path = db.unwrap_or_else(default_db_path);
        let user_id = user
            .filter(|u| !u.trim().is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| "local".to_string());
        Self { db_path, user_id }
    }
}

fn default_db_path() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "intrack") {
        proj_dirs.data_dir().join("intrack.db")
    } else {
        PathBuf::from("intrack.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_values_win() {
        let settings = Settings::resolve(Some(PathBuf::from("/tmp/x.db")), Some("alice".to_string()));
        assert_eq!(settings.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.user_id, "alice");
    }

    #[test]
    fn test_defaults_are_never_blank() {
        let settings = Settings::resolve(None, Some("   ".to_string()));
        assert!(!settings.user_id.trim().is_empty());
        assert!(settings.db_path.ends_with("intrack.db"));
    }
}
