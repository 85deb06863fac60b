use crate::{
    checks::site::{Site, Sites},
    products::unexpected::StoreError,
    utilities::{produce_list_absolute, read_text_file, write_atomic},
    *,
};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    sync::Mutex,
};


/// Which sites a sweep goes through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every registered site
    All,

    /// Sites with last verdict offline
    Failed,

    /// Sites registered under one domain
    Domain(String),
}


impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "all sites"),
            Selection::Failed => write!(f, "failed sites"),
            Selection::Domain(domain) => write!(f, "domain: {}", domain),
        }
    }
}


/// Keyed storage of Site records
pub trait SiteStore: Send + Sync {
    /// All registered sites
    fn list_all(&self) -> Result<Sites, StoreError>;

    /// Sites whose last verdict was offline
    fn list_failed(&self) -> Result<Sites, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|site| !site.is_online)
            .collect())
    }

    /// Sites registered under exact domain
    fn list_by_domain(&self, domain: &str) -> Result<Sites, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|site| site.domain == domain)
            .collect())
    }

    /// Persist a single site record
    fn save(&self, site: &Site) -> Result<(), StoreError>;

    /// Sites for given selection
    fn select(&self, selection: &Selection) -> Result<Sites, StoreError> {
        match selection {
            Selection::All => self.list_all(),
            Selection::Failed => self.list_failed(),
            Selection::Domain(domain) => self.list_by_domain(domain),
        }
    }
}


/// Site store keeping one JSON record per site: `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}


impl FileStore {
    /// Open store in an existing directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<FileStore, StoreError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        debug!("Opened site store under: {}", dir.display());
        Ok(FileStore {
            dir: dir.to_path_buf(),
        })
    }


    /// Path of the record for given site id
    pub fn record_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }


    fn load_record(record: &str) -> Result<Site, StoreError> {
        let contents =
            read_text_file(record).map_err(|err| StoreError::Io(record.to_string(), err))?;
        serde_json::from_str(&contents)
            .map_err(|err| StoreError::Serialization(record.to_string(), err))
    }
}


impl SiteStore for FileStore {
    fn list_all(&self) -> Result<Sites, StoreError> {
        let pattern = format!("{}/*.json", self.dir.display());
        let records = produce_list_absolute(&pattern)
            .map_err(|err| StoreError::Io(pattern.clone(), err))?;
        let mut sites = records
            .iter()
            .filter_map(|record| {
                match Self::load_record(record) {
                    Ok(site) if is_keyed_by(record, site.id) => Some(site),
                    Ok(site) => {
                        warn!(
                            "Skipping site record: {}. Record with id: {} has to be stored as: {}",
                            record,
                            site.id,
                            self.record_path(site.id).display()
                        );
                        None
                    }
                    Err(err) => {
                        error!("Skipping site record. {}", err);
                        None
                    }
                }
            })
            .collect::<Sites>();
        sites.sort_by_key(|site| site.id);
        Ok(sites)
    }


    fn save(&self, site: &Site) -> Result<(), StoreError> {
        let record = self.record_path(site.id);
        let name = record.to_string_lossy().to_string();
        if !record.exists() {
            return Err(StoreError::NotFound(site.id));
        }
        let contents = serde_json::to_string_pretty(site)
            .map_err(|err| StoreError::Serialization(name.clone(), err))?;
        write_atomic(&name, &contents).map_err(|err| StoreError::Io(name.clone(), err))?;
        trace!("Saved site record: {}", name);
        Ok(())
    }
}


/// Whether record file name matches the id it holds
fn is_keyed_by(record: &str, id: u64) -> bool {
    Path::new(record)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map_or(false, |stem| stem == id.to_string())
}


/// Site store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    sites: Mutex<BTreeMap<u64, Site>>,
}


impl MemoryStore {
    /// New store holding given sites
    pub fn new(sites: Sites) -> MemoryStore {
        MemoryStore {
            sites: Mutex::new(sites.into_iter().map(|site| (site.id, site)).collect()),
        }
    }


    /// Current record of given site
    pub fn get(&self, id: u64) -> Option<Site> {
        self.sites
            .lock()
            .ok()
            .and_then(|sites| sites.get(&id).cloned())
    }


    fn poisoned() -> StoreError {
        StoreError::Unavailable("memory store lock poisoned".to_string())
    }
}


impl SiteStore for MemoryStore {
    fn list_all(&self) -> Result<Sites, StoreError> {
        let sites = self.sites.lock().map_err(|_| Self::poisoned())?;
        Ok(sites.values().cloned().collect())
    }


    fn save(&self, site: &Site) -> Result<(), StoreError> {
        let mut sites = self.sites.lock().map_err(|_| Self::poisoned())?;
        match sites.get_mut(&site.id) {
            Some(record) => {
                *record = site.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(site.id)),
        }
    }
}
