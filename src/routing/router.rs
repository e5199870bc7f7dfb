//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled handler rules in configured order
//! - Look up the first rule matching a request URL
//! - Resolve the matched target template against the application root
//!
//! # Design Decisions
//! - Immutable after construction (shared across requests without locks)
//! - O(n) ordered scan, first match wins
//! - Explicit `None` for no-match; the caller answers 404

use std::path::{Component, Path, PathBuf};

use crate::config::HandlerConfig;
use crate::routing::matcher::{RoutePattern, Template};
use crate::routing::RouteError;

/// What a matched rule hands the request to.
#[derive(Debug, Clone)]
pub enum RouteTarget {
    /// Run the CGI interpreter with this script.
    Script(Template),
    /// Serve this file from disk.
    StaticFiles(Template),
}

/// A compiled handler rule.
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: RoutePattern,
    pub target: RouteTarget,
}

impl Route {
    /// Compile a single handler entry.
    pub fn compile(handler: &HandlerConfig) -> Result<Self, RouteError> {
        let pattern = RoutePattern::compile(&handler.url)?;
        let groups = pattern.group_count();

        let target = match (&handler.script, &handler.static_files) {
            (Some(script), None) => RouteTarget::Script(Template::parse(script, groups)?),
            (None, Some(files)) => RouteTarget::StaticFiles(Template::parse(files, groups)?),
            (None, None) => return Err(RouteError::MissingTarget(handler.url.clone())),
            (Some(_), Some(_)) => return Err(RouteError::ConflictingTargets(handler.url.clone())),
        };

        Ok(Self { pattern, target })
    }
}

/// The first rule that matched a URL.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// Position of the rule in the configured list.
    pub index: usize,
    pub route: &'a Route,
    /// Capture slots; index 0 is the whole match.
    pub captures: Vec<String>,
}

/// A matched rule with its target resolved to a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Script(PathBuf),
    StaticFile(PathBuf),
}

/// Ordered, immutable rule list.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    approot: PathBuf,
}

impl RouteTable {
    /// Compile handlers in order. Fails on the first invalid entry.
    pub fn compile(
        handlers: &[HandlerConfig],
        approot: impl Into<PathBuf>,
    ) -> Result<Self, RouteError> {
        let routes = handlers
            .iter()
            .map(Route::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            routes,
            approot: approot.into(),
        })
    }

    /// An empty table; every request is unmatched.
    pub fn empty(approot: impl Into<PathBuf>) -> Self {
        Self {
            routes: Vec::new(),
            approot: approot.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first rule whose pattern occurs in `url`.
    pub fn match_url(&self, url: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().enumerate().find_map(|(index, route)| {
            route.pattern.captures(url).map(|captures| RouteMatch {
                index,
                route,
                captures,
            })
        })
    }

    /// Match `url` and resolve the target path.
    pub fn dispatch(&self, url: &str) -> Option<Dispatch> {
        let matched = self.match_url(url)?;
        let resolve = |template: &Template| {
            resolve_path(&self.approot, &template.render(&matched.captures))
        };
        let dispatch = match &matched.route.target {
            RouteTarget::Script(template) => Dispatch::Script(resolve(template)),
            RouteTarget::StaticFiles(template) => Dispatch::StaticFile(resolve(template)),
        };

        tracing::trace!(
            rule = matched.index,
            pattern = matched.route.pattern.as_str(),
            ?dispatch,
            "Route matched"
        );
        Some(dispatch)
    }
}

/// Join `relative` onto `root` and collapse `.` and `..` lexically.
///
/// An absolute `relative` replaces `root`, and `..` never climbs above the
/// filesystem root.
pub fn resolve_path(root: &Path, relative: &str) -> PathBuf {
    let joined = root.join(relative);
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    resolved.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                );
                if !at_root {
                    resolved.pop();
                }
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(url: &str, template: &str) -> HandlerConfig {
        HandlerConfig {
            url: url.into(),
            script: Some(template.into()),
            static_files: None,
        }
    }

    fn files(url: &str, template: &str) -> HandlerConfig {
        HandlerConfig {
            url: url.into(),
            script: None,
            static_files: Some(template.into()),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let table = RouteTable::compile(
            &[
                files(r"^/static/(.*)$", r"public/\1"),
                script(r"^/static/special$", "never.php"),
                script(r"^/(.*)$", "index.php"),
            ],
            "/srv/app",
        )
        .unwrap();

        let matched = table.match_url("/static/special").unwrap();
        assert_eq!(matched.index, 0);
        assert_eq!(matched.captures[1], "special");

        assert_eq!(table.match_url("/other").unwrap().index, 2);
    }

    #[test]
    fn test_no_match() {
        let table = RouteTable::compile(&[script(r"^/api/", "api.php")], "/srv/app").unwrap();
        assert!(table.match_url("/home").is_none());
        assert!(table.dispatch("/home").is_none());
        assert!(RouteTable::empty("/srv").dispatch("/").is_none());
    }

    #[test]
    fn test_dispatch_resolves_against_approot() {
        let table = RouteTable::compile(
            &[
                script(r"^/item/(\d+)", r"items/item-\1.php"),
                files(r"^/assets/(.*)$", r"public/\1"),
            ],
            "/srv/app",
        )
        .unwrap();

        assert_eq!(
            table.dispatch("/item/42?full=1"),
            Some(Dispatch::Script(PathBuf::from("/srv/app/items/item-42.php")))
        );
        assert_eq!(
            table.dispatch("/assets/css/site.css"),
            Some(Dispatch::StaticFile(PathBuf::from("/srv/app/public/css/site.css")))
        );
    }

    #[test]
    fn test_matches_against_query_string_too() {
        let table =
            RouteTable::compile(&[script(r"\?debug=(\w+)", r"debug-\1.php")], "/srv").unwrap();
        assert_eq!(
            table.dispatch("/page?debug=on"),
            Some(Dispatch::Script(PathBuf::from("/srv/debug-on.php")))
        );
    }

    #[test]
    fn test_target_validation() {
        let neither = HandlerConfig {
            url: "/".into(),
            script: None,
            static_files: None,
        };
        assert!(matches!(Route::compile(&neither), Err(RouteError::MissingTarget(_))));

        let both = HandlerConfig {
            url: "/".into(),
            script: Some("a".into()),
            static_files: Some("b".into()),
        };
        assert!(matches!(Route::compile(&both), Err(RouteError::ConflictingTargets(_))));
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/srv/app");
        assert_eq!(resolve_path(root, "a/./b/../c.php"), PathBuf::from("/srv/app/a/c.php"));
        assert_eq!(resolve_path(root, "/usr/lib/cgi.php"), PathBuf::from("/usr/lib/cgi.php"));
        assert_eq!(resolve_path(root, "../../../../etc"), PathBuf::from("/etc"));
    }
}
