/*!
Structs to hold configuration data and global variables.
*/
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::{
    auth::Sessions,
    criteria::{self, Criteria, Criterion},
    store::{self, Store},
};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SESSION_HOURS: i64 = 31 * 24;

#[derive(Deserialize)]
struct ConfigFile {
    db_file: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    template_dir: Option<String>,
    static_dir: Option<String>,
    session_hours: Option<i64>,
    hash_iterations: Option<u32>,
    criteria_version: Option<u32>,
    criteria: Option<Vec<Criterion>>,
}

#[derive(Debug)]
pub struct Cfg {
    pub db_file: PathBuf,
    pub addr: SocketAddr,
    pub template_dir: PathBuf,
    pub static_dir: PathBuf,
    pub session_hours: i64,
    pub hash_iterations: u32,
    pub criteria_version: u32,
    pub criteria: Option<Vec<Criterion>>,
}

impl std::default::Default for Cfg {
    fn default() -> Self {
        Self {
            db_file: PathBuf::from("feedback.db"),
            template_dir: PathBuf::from("templates/"),
            static_dir: PathBuf::from("static/"),
            session_hours: DEFAULT_SESSION_HOURS,
            hash_iterations: store::DEFAULT_HASH_ITERATIONS,
            criteria_version: criteria::DEFAULT_VERSION,
            criteria: None,
            addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                DEFAULT_PORT
            ),
        }
    }
}

impl Cfg {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file: {}", &e))?;
        Self::from_toml(&file_contents)
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        let cf: ConfigFile = toml::from_str(text)
            .map_err(|e| format!("Unable to deserialize config file: {}", &e))?;

        let mut c = Self::default();

        if let Some(s) = cf.db_file {
            c.db_file = PathBuf::from(s);
        }
        if let Some(s) = cf.host {
            c.addr.set_ip(
                s.parse().map_err(|e| format!(
                    "Error parsing {:?} as IP address: {}",
                    &s, &e
                ))?
            );
        }
        if let Some(n) = cf.port {
            c.addr.set_port(n);
        }
        if let Some(s) = cf.template_dir {
            c.template_dir = PathBuf::from(s);
        }
        if let Some(s) = cf.static_dir {
            c.static_dir = PathBuf::from(s);
        }
        if let Some(n) = cf.session_hours {
            if n < 0 {
                return Err(format!("session_hours must not be negative (got {}).", &n));
            }
            c.session_hours = n;
        }
        if let Some(n) = cf.hash_iterations {
            if n == 0 {
                return Err("hash_iterations must be positive.".to_owned());
            }
            c.hash_iterations = n;
        }
        if let Some(n) = cf.criteria_version {
            c.criteria_version = n;
        }
        if let Some(v) = cf.criteria {
            c.criteria = Some(v);
        }

        Ok(c)
    }

    /// Let a `PORT` environment variable override the configured port.
    pub fn apply_env(&mut self) -> Result<(), String> {
        if let Ok(s) = std::env::var("PORT") {
            let port: u16 = s.trim().parse().map_err(|e| format!(
                "Error parsing PORT value {:?}: {}", &s, &e
            ))?;
            self.addr.set_port(port);
        }
        Ok(())
    }

    /// The criteria this configuration calls for.
    pub fn criteria(&self) -> Result<Criteria, String> {
        match &self.criteria {
            Some(items) => Criteria::custom(self.criteria_version, items.clone()),
            None => Criteria::builtin(self.criteria_version),
        }
    }
}

/**
This guy hauls around the state every handler needs and gets passed in an
`axum::Extension` to the handlers who need him.
*/
#[derive(Debug)]
pub struct Glob {
    pub store: Store,
    pub criteria: Criteria,
    pub addr: SocketAddr,
    auth: RwLock<Sessions>,
}

impl Glob {
    pub fn new(store: Store, criteria: Criteria, addr: SocketAddr, sessions: Sessions) -> Self {
        Self { store, criteria, addr, auth: RwLock::new(sessions) }
    }

    pub fn auth(&self) -> &RwLock<Sessions> { &self.auth }
}

/// Builds the global state from a configuration and ensures all appropriate
/// database tables exist.
pub fn load_configuration(cfg: &Cfg) -> Result<Glob, String> {
    log::info!("Configuration:\n{:#?}", cfg);

    let criteria = cfg.criteria()?;
    log::info!(
        "Using criteria version {} ({} rated items).",
        &criteria.version(), criteria.rated().count()
    );

    log::trace!("Checking state of data DB...");
    let mut store = Store::new(&cfg.db_file);
    store.set_hash_iterations(cfg.hash_iterations);
    if let Err(e) = store.ensure_db_schema() {
        let estr = format!("Unable to ensure state of data DB: {}", &e);
        return Err(estr);
    }
    log::trace!("...data DB okay.");

    let sessions = Sessions::new(time::Duration::hours(cfg.session_hours));

    Ok(Glob::new(store, criteria, cfg.addr, sessions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{ensure_logging, scratch_dir};

    #[test]
    fn defaults() {
        let c = Cfg::default();
        assert_eq!(c.addr.port(), 5000);
        assert_eq!(c.db_file, PathBuf::from("feedback.db"));
        assert_eq!(c.criteria().unwrap(), Criteria::builtin(2).unwrap());
    }

    #[test]
    fn toml_overrides() {
        let c = Cfg::from_toml(r#"
            db_file = "/tmp/elsewhere.db"
            host = "127.0.0.1"
            port = 8080
            session_hours = 2
            criteria_version = 1
        "#).unwrap();

        assert_eq!(c.db_file, PathBuf::from("/tmp/elsewhere.db"));
        assert_eq!(c.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.session_hours, 2);
        assert_eq!(c.criteria().unwrap().all().len(), 10);
        assert_eq!(c.template_dir, PathBuf::from("templates/"));
    }

    #[test]
    fn custom_criteria() {
        let c = Cfg::from_toml(r#"
            criteria_version = 7

            [[criteria]]
            text = "Basics"
            header = true

            [[criteria]]
            text = "criterion A"
        "#).unwrap();

        let crits = c.criteria().unwrap();
        assert_eq!(crits.version(), 7);
        assert_eq!(crits.all(), &[
            Criterion::header("Basics"),
            Criterion::rated("criterion A"),
        ]);
    }

    #[test]
    fn bad_values() {
        assert!(Cfg::from_toml("host = \"not an address\"").is_err());
        assert!(Cfg::from_toml("session_hours = -1").is_err());
        assert!(Cfg::from_toml("hash_iterations = 0").is_err());
        assert!(Cfg::from_toml("port = \"five thousand\"").is_err());

        let c = Cfg::from_toml("criteria_version = 99").unwrap();
        assert!(c.criteria().is_err());
    }

    #[test]
    fn loading() {
        ensure_logging();

        let dir = scratch_dir("config");
        let mut cfg = Cfg::default();
        cfg.db_file = dir.path().join("feedback.db");
        let glob = load_configuration(&cfg).unwrap();
        assert!(glob.store.get_subjects(1).unwrap().is_empty());
        assert!(cfg.db_file.exists());
    }
}
