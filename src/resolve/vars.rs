//! Symbolic path variables
//!
//! Patterns and candidate paths may start with `$HOME`, `$APP_DATA` and
//! friends. Expansion is whole-token string substitution: `$HOMEDIR` is not
//! `$HOME` followed by `DIR`, and an unknown or unresolvable variable stays
//! literal so it can never match a real canonical path.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Concrete values for every supported path variable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVars {
    pub home: Option<PathBuf>,
    pub temp: Option<PathBuf>,
    pub app_data: Option<PathBuf>,
    pub app_local_data: Option<PathBuf>,
    pub app_config: Option<PathBuf>,
    pub downloads: Option<PathBuf>,
    pub desktop: Option<PathBuf>,
    pub documents: Option<PathBuf>,
    pub project: Option<PathBuf>,
}

impl PathVars {
    /// Resolve every variable against the current OS state
    ///
    /// `identifier` names the application's own data/config subdirectory.
    pub fn from_os(identifier: &str, project: Option<&Path>) -> Self {
        let app_dir = |base: Option<PathBuf>| base.map(|b| b.join(identifier));

        Self {
            home: dirs::home_dir(),
            temp: Some(std::env::temp_dir()),
            app_data: app_dir(dirs::data_dir()),
            app_local_data: app_dir(dirs::data_local_dir()),
            app_config: app_dir(dirs::config_dir()),
            downloads: dirs::download_dir(),
            desktop: dirs::desktop_dir(),
            documents: dirs::document_dir(),
            project: project.map(Path::to_path_buf),
        }
    }

    /// Look up a variable by name (without the `$`)
    pub fn get(&self, name: &str) -> Option<&Path> {
        let value = match name {
            "HOME" => &self.home,
            "TEMP" | "TMPDIR" => &self.temp,
            "APP_DATA" => &self.app_data,
            "APP_LOCAL_DATA" => &self.app_local_data,
            "APP_CONFIG" => &self.app_config,
            "DOWNLOADS" => &self.downloads,
            "DESKTOP" => &self.desktop,
            "DOCUMENTS" => &self.documents,
            "PROJECT" => &self.project,
            _ => return None,
        };
        value.as_deref()
    }

    /// Substitute every known `$NAME` token in `input`
    pub fn expand<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.contains('$') {
            return Cow::Borrowed(input);
        }

        let mut out = String::with_capacity(input.len() + 32);
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            match self.get(name) {
                Some(value) if !name.is_empty() => {
                    out.push_str(&to_slash(value));
                }
                _ => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[name_len..];
        }
        out.push_str(rest);

        Cow::Owned(out)
    }
}

/// Where a policy gets its variable values from
#[derive(Debug, Clone)]
pub enum VarSource {
    /// Re-read from the OS on every check
    Live {
        identifier: String,
        project: Option<PathBuf>,
    },
    /// Fixed values, for embedding hosts that sandbox their own directories
    Fixed(PathVars),
}

impl VarSource {
    pub fn live(identifier: impl Into<String>, project: Option<PathBuf>) -> Self {
        VarSource::Live {
            identifier: identifier.into(),
            project,
        }
    }

    pub fn resolve(&self) -> Cow<'_, PathVars> {
        match self {
            VarSource::Live {
                identifier,
                project,
            } => Cow::Owned(PathVars::from_os(identifier, project.as_deref())),
            VarSource::Fixed(vars) => Cow::Borrowed(vars),
        }
    }
}

/// Render a path with `/` separators for string comparison
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> PathVars {
        PathVars {
            home: Some(PathBuf::from("/home/ada")),
            temp: Some(PathBuf::from("/tmp")),
            app_data: Some(PathBuf::from("/home/ada/.local/share/com.example.app")),
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_known_variables() {
        let v = vars();
        assert_eq!(v.expand("$HOME/Documents/**"), "/home/ada/Documents/**");
        assert_eq!(v.expand("$TEMP/x"), "/tmp/x");
        assert_eq!(
            v.expand("$APP_DATA/cache"),
            "/home/ada/.local/share/com.example.app/cache"
        );
    }

    #[test]
    fn test_expand_is_whole_token() {
        let v = vars();
        assert_eq!(v.expand("$HOMEDIR/x"), "$HOMEDIR/x");
        assert_eq!(v.expand("$HOME_x"), "$HOME_x");
    }

    #[test]
    fn test_unresolved_variable_stays_literal() {
        let v = vars();
        assert_eq!(v.expand("$DESKTOP/a"), "$DESKTOP/a");
        assert_eq!(v.expand("$NOPE/a"), "$NOPE/a");
        assert_eq!(v.expand("cost: $"), "cost: $");
    }

    #[test]
    fn test_no_variables_borrows() {
        let v = vars();
        assert!(matches!(v.expand("/etc/hosts"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_fixed_source_is_returned_as_is() {
        let source = VarSource::Fixed(vars());
        assert_eq!(source.resolve().home, Some(PathBuf::from("/home/ada")));
    }

    #[test]
    fn test_live_source_uses_identifier() {
        let source = VarSource::live("com.example.app", None);
        let resolved = source.resolve();
        if let Some(app_data) = &resolved.app_data {
            assert!(app_data.ends_with("com.example.app"));
        }
        assert!(resolved.temp.is_some());
    }
}
