// Page routing - maps a browser path onto one of the dashboard pages
const SNAPSHOT_PREFIX: &str = "/snapshot-";
const EDIT_SUFFIX: &str = "/edit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Realtime,
    Create,
    Archive,
    Dashboard { id: String, editable: bool },
    NotFound,
}

impl Page {
    /// Resolve `path` relative to the application's `base_path`.
    pub fn resolve(path: Option<&str>, base_path: &str) -> Page {
        let Some(path) = path else {
            return Page::Realtime;
        };

        let Some(relative) = strip_base(path, base_path) else {
            return Page::NotFound;
        };

        match relative.as_str() {
            "" | "/" | "/realtime" => Page::Realtime,
            "/create" | "/create/" => Page::Create,
            "/archive" => Page::Archive,
            _ => Self::resolve_snapshot(&relative),
        }
    }

    fn resolve_snapshot(path: &str) -> Page {
        let Some(rest) = path.strip_prefix(SNAPSHOT_PREFIX) else {
            return Page::NotFound;
        };

        let (raw_id, editable) = match rest.strip_suffix(EDIT_SUFFIX) {
            Some(id) => (id, true),
            None => (rest, false),
        };

        if raw_id.is_empty() || raw_id.contains('/') {
            return Page::NotFound;
        }

        match urlencoding::decode(raw_id) {
            Ok(id) => Page::Dashboard {
                id: id.into_owned(),
                editable,
            },
            Err(_) => Page::NotFound,
        }
    }
}

fn strip_base(path: &str, base_path: &str) -> Option<String> {
    let base = base_path.trim_end_matches('/');
    if base.is_empty() {
        return Some(path.to_string());
    }
    path.strip_prefix(base).map(|rest| rest.to_string())
}

/// Prefix an application path with the configured base path
pub fn relative_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    format!("{}/{}", base, path.trim_start_matches('/'))
}

pub fn snapshot_path(base_path: &str, id: &str) -> String {
    relative_path(
        base_path,
        &format!("{}{}", SNAPSHOT_PREFIX, urlencoding::encode(id)),
    )
}

pub fn snapshot_edit_path(base_path: &str, id: &str) -> String {
    format!("{}{}", snapshot_path(base_path, id), EDIT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(path: &str) -> Page {
        Page::resolve(Some(path), "/")
    }

    #[test]
    fn test_defined_paths() {
        assert_eq!(Page::resolve(None, "/"), Page::Realtime);
        assert_eq!(resolve("/"), Page::Realtime);
        assert_eq!(resolve("/realtime"), Page::Realtime);
        assert_eq!(resolve("/create"), Page::Create);
        assert_eq!(resolve("/create/"), Page::Create);
        assert_eq!(resolve("/archive"), Page::Archive);
        assert_eq!(
            resolve("/snapshot-42"),
            Page::Dashboard {
                id: "42".to_string(),
                editable: false
            }
        );
        assert_eq!(
            resolve("/snapshot-42/edit"),
            Page::Dashboard {
                id: "42".to_string(),
                editable: true
            }
        );
    }

    #[test]
    fn test_unmatched_paths() {
        for path in [
            "/realtime/extra",
            "/archives",
            "/snapshot-",
            "/snapshot-/edit",
            "/snapshot-1/2",
            "/snapshots",
            "/edit",
            "nonsense",
        ] {
            assert_eq!(resolve(path), Page::NotFound, "path {}", path);
        }
    }

    #[test]
    fn test_base_path_is_stripped() {
        assert_eq!(Page::resolve(Some("/iot/archive"), "/iot/"), Page::Archive);
        assert_eq!(Page::resolve(Some("/iot/"), "/iot/"), Page::Realtime);
        assert_eq!(Page::resolve(Some("/archive"), "/iot/"), Page::NotFound);
    }

    #[test]
    fn test_snapshot_paths_round_trip() {
        let id = "a b";
        let path = snapshot_edit_path("/", id);
        assert_eq!(path, "/snapshot-a%20b/edit");
        assert_eq!(
            resolve(&path),
            Page::Dashboard {
                id: id.to_string(),
                editable: true
            }
        );
        assert_eq!(relative_path("/iot/", "/archive"), "/iot/archive");
    }
}
