use std::net::SocketAddr;
use std::time::Duration;

use tastemap_cluster::{layout::{DEFAULT_CENTER, DEFAULT_MAX_DISTANCE}, ForceLayout, DEFAULT_CLUSTERS, MAX_CLUSTERS, MIN_CLUSTERS};
use tastemap_schema::Point;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:7443";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutMode { Radial, Force(ForceLayout) }

impl LayoutMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "radial" => Some(LayoutMode::Radial),
            "force" | "force-directed" => Some(LayoutMode::Force(ForceLayout::default())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub default_cluster_count: usize,
    /// Cluster the focal user together with the other members.
    pub include_focal: bool,
    pub center: Point,
    pub max_distance: f32,
    pub layout: LayoutMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { default_cluster_count: DEFAULT_CLUSTERS, include_focal: true, center: DEFAULT_CENTER, max_distance: DEFAULT_MAX_DISTANCE, layout: LayoutMode::Radial }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub api_base: String,
    pub http_timeout: Duration,
    pub listen: SocketAddr,
    pub session: SessionConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Unparsable values fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
            match raw {
                None => default,
                Some(v) => v.trim().parse().unwrap_or_else(|_| { tracing::warn!(key, value = %v, "ignoring unparsable setting"); default }),
            }
        }
        let defaults = SessionConfig::default();
        let default_listen = SocketAddr::from(([0, 0, 0, 0], 7443));
        let layout = match lookup("TASTEMAP_LAYOUT") {
            None => defaults.layout,
            Some(v) => LayoutMode::parse(&v).unwrap_or_else(|| { tracing::warn!(value = %v, "unknown layout, using radial"); LayoutMode::Radial }),
        };
        let session = SessionConfig {
            default_cluster_count: parsed("TASTEMAP_DEFAULT_CLUSTERS", lookup("TASTEMAP_DEFAULT_CLUSTERS"), defaults.default_cluster_count).clamp(MIN_CLUSTERS, MAX_CLUSTERS),
            include_focal: parsed("TASTEMAP_INCLUDE_FOCAL", lookup("TASTEMAP_INCLUDE_FOCAL"), defaults.include_focal),
            layout,
            ..defaults
        };
        Self {
            api_base: lookup("TASTEMAP_API_BASE").map(|s| s.trim_end_matches('/').to_string()).unwrap_or_else(|| DEFAULT_API_BASE.into()),
            http_timeout: Duration::from_millis(parsed("TASTEMAP_HTTP_TIMEOUT_MS", lookup("TASTEMAP_HTTP_TIMEOUT_MS"), DEFAULT_HTTP_TIMEOUT_MS)),
            listen: parsed("TASTEMAP_LISTEN", lookup("TASTEMAP_LISTEN"), default_listen),
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ServerConfig::from_lookup(|_| None);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.listen.to_string(), DEFAULT_LISTEN);
        assert_eq!(cfg.http_timeout, Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS));
        assert_eq!(cfg.session, SessionConfig::default());
    }

    #[test]
    fn overrides_and_clamps() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("TASTEMAP_API_BASE", "https://api.example.com/"),
            ("TASTEMAP_DEFAULT_CLUSTERS", "9"),
            ("TASTEMAP_INCLUDE_FOCAL", "false"),
            ("TASTEMAP_LAYOUT", "force"),
            ("TASTEMAP_LISTEN", "127.0.0.1:9000"),
        ]));
        assert_eq!(cfg.api_base, "https://api.example.com");
        assert_eq!(cfg.session.default_cluster_count, MAX_CLUSTERS);
        assert!(!cfg.session.include_focal);
        assert!(matches!(cfg.session.layout, LayoutMode::Force(_)));
        assert_eq!(cfg.listen.port(), 9000);
    }

    #[test]
    fn garbage_falls_back() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[("TASTEMAP_HTTP_TIMEOUT_MS", "soon"), ("TASTEMAP_LAYOUT", "spiral")]));
        assert_eq!(cfg.http_timeout, Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS));
        assert_eq!(cfg.session.layout, LayoutMode::Radial);
    }
}
