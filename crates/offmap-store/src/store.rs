//! SQLite-backed per-map resource store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use offmap_types::{ImageQuality, MapId};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::directory::remove_store_files;
use crate::error::{Result, StoreError};

/// Metadata key holding the store's unique id.
pub const META_UNIQUE_ID: &str = "uniqueID";
/// Metadata key holding the map id.
pub const META_MAP_ID: &str = "mapID";
/// Metadata key recording whether the map metadata document was requested.
pub const META_INCLUDES_METADATA: &str = "includesMetadata";
/// Metadata key recording whether markers were requested.
pub const META_INCLUDES_MARKERS: &str = "includesMarkers";
/// Metadata key holding the integer image quality code.
pub const META_IMAGE_QUALITY: &str = "imageQuality";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS metadata (
        name TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS resources (
        url TEXT PRIMARY KEY,
        status INTEGER NOT NULL,
        data BLOB NOT NULL
    );
";

/// Encodes a flag the way it is persisted in store metadata.
#[must_use]
pub const fn flag_value(flag: bool) -> &'static str {
    if flag { "YES" } else { "NO" }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("YES")
}

/// Identity fields cached from a store's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreIdentity {
    /// Unique id assigned when the store was created.
    pub unique_id: String,
    /// Map the store holds resources for.
    pub map_id: MapId,
    /// Whether the map metadata document was requested.
    pub includes_metadata: bool,
    /// Whether markers and marker icons were requested.
    pub includes_markers: bool,
    /// Tile quality every tile in the store was fetched at.
    pub image_quality: ImageQuality,
}

impl StoreIdentity {
    /// Creates the identity of a new store with a freshly assigned unique id.
    #[must_use]
    pub fn new(
        map_id: MapId,
        image_quality: ImageQuality,
        includes_metadata: bool,
        includes_markers: bool,
    ) -> Self {
        Self {
            unique_id: uuid::Uuid::new_v4().to_string(),
            map_id,
            includes_metadata,
            includes_markers,
            image_quality,
        }
    }

    /// Returns the metadata entries that persist this identity.
    #[must_use]
    pub fn to_metadata(&self) -> Vec<(String, String)> {
        vec![
            (META_UNIQUE_ID.to_string(), self.unique_id.clone()),
            (META_MAP_ID.to_string(), self.map_id.to_string()),
            (
                META_INCLUDES_METADATA.to_string(),
                flag_value(self.includes_metadata).to_string(),
            ),
            (
                META_INCLUDES_MARKERS.to_string(),
                flag_value(self.includes_markers).to_string(),
            ),
            (
                META_IMAGE_QUALITY.to_string(),
                self.image_quality.code().to_string(),
            ),
        ]
    }

    /// Rebuilds an identity from metadata, or `None` if a required entry is
    /// missing, empty or unparseable.
    fn from_lookup(
        mut lookup: impl FnMut(&str) -> rusqlite::Result<Option<String>>,
    ) -> rusqlite::Result<Option<Self>> {
        let mut required = |name: &str| -> rusqlite::Result<Option<String>> {
            Ok(lookup(name)?.filter(|value| !value.is_empty()))
        };

        let (
            Some(unique_id),
            Some(map_id),
            Some(includes_metadata),
            Some(includes_markers),
            Some(image_quality),
        ) = (
            required(META_UNIQUE_ID)?,
            required(META_MAP_ID)?,
            required(META_INCLUDES_METADATA)?,
            required(META_INCLUDES_MARKERS)?,
            required(META_IMAGE_QUALITY)?,
        )
        else {
            return Ok(None);
        };

        let Some(image_quality) = image_quality
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(ImageQuality::from_code)
        else {
            return Ok(None);
        };

        Ok(Some(Self {
            unique_id,
            map_id: MapId::new(map_id),
            includes_metadata: parse_flag(&includes_metadata),
            includes_markers: parse_flag(&includes_markers),
            image_quality,
        }))
    }
}

#[derive(Debug)]
enum Handle {
    Unopened,
    Open(Connection),
    Invalidated,
}

#[derive(Debug)]
struct Inner {
    handle: Handle,
    identity: Option<StoreIdentity>,
}

/// Persistent mapping from resource URL to status and payload for one map.
///
/// The SQLite connection is opened on first use and may be closed at any
/// time; the next operation reopens it. Once [`invalidate`](Self::invalidate)
/// has been called every operation fails with [`StoreError::Unavailable`].
/// All operations take the store's lock, so a store may be shared freely
/// between threads.
#[derive(Debug)]
pub struct ResourceStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl ResourceStore {
    /// Creates a handle for the store file at `path` without touching disk.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(Inner {
                handle: Handle::Unopened,
                identity: None,
            }),
        }
    }

    /// Creates a new store at `path` and writes `identity` into it.
    ///
    /// If the new file does not pass [`initialize`](Self::initialize) it is
    /// deleted again.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or fails to initialize.
    pub fn create(path: impl Into<PathBuf>, identity: &StoreIdentity) -> Result<Self> {
        let store = Self::open(path);

        let outcome = store
            .set_metadata(identity.to_metadata())
            .and_then(|()| store.initialize());

        match outcome {
            Ok(true) => {
                tracing::debug!(path = %store.path.display(), map_id = %identity.map_id, "created store");
                Ok(store)
            }
            Ok(false) => {
                store.discard()?;
                Err(StoreError::NotInitialized(store.path.clone()))
            }
            Err(e) => {
                if let Err(cleanup) = store.discard() {
                    tracing::warn!(error = %cleanup, "failed to clean up store");
                }
                Err(e)
            }
        }
    }

    /// Returns the path of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reloads the identity fields from metadata.
    ///
    /// Returns `false` if any required entry is missing or the image quality
    /// does not decode; the store must then not be exposed to readers.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or cannot be read.
    pub fn initialize(&self) -> Result<bool> {
        let mut inner = self.inner.lock();
        let identity = {
            let conn: &Connection = self.connection(&mut inner)?;
            StoreIdentity::from_lookup(|name| read_metadata(conn, name))?
        };
        let valid = identity.is_some();
        if valid {
            inner.identity = identity;
        }
        Ok(valid)
    }

    /// Returns the cached identity, if the store has been initialized.
    #[must_use]
    pub fn identity(&self) -> Option<StoreIdentity> {
        self.inner.lock().identity.clone()
    }

    /// Returns the map id from the cached identity.
    #[must_use]
    pub fn map_id(&self) -> Option<MapId> {
        self.inner.lock().identity.as_ref().map(|id| id.map_id.clone())
    }

    /// Returns the payload stored for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or cannot be read.
    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        let conn = self.connection(&mut inner)?;
        let data = conn
            .query_row(
                "SELECT data FROM resources WHERE url = ?1",
                params![url],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(data)
    }

    /// Returns the HTTP status stored for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or cannot be read.
    pub fn status(&self, url: &str) -> Result<Option<u16>> {
        let mut inner = self.inner.lock();
        let conn = self.connection(&mut inner)?;
        let status = conn
            .query_row(
                "SELECT status FROM resources WHERE url = ?1",
                params![url],
                |row| row.get::<_, u16>(0),
            )
            .optional()?;
        Ok(status)
    }

    /// Returns true if a record exists for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or cannot be read.
    pub fn contains(&self, url: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        let conn = self.connection(&mut inner)?;
        let found = conn
            .query_row(
                "SELECT 1 FROM resources WHERE url = ?1",
                params![url],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Inserts or replaces the record for `url` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    pub fn put(&self, url: &str, data: &[u8], status: u16) -> Result<()> {
        let mut inner = self.inner.lock();
        let conn = self.connection(&mut inner)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO resources (url, status, data) VALUES (?1, ?2, ?3)",
            params![url, status, data],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Deletes the record for `url`, returning whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    pub fn delete(&self, url: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        let conn = self.connection(&mut inner)?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM resources WHERE url = ?1", params![url])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Returns the number of stored resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or cannot be read.
    pub fn resource_count(&self) -> Result<u64> {
        let mut inner = self.inner.lock();
        let conn = self.connection(&mut inner)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Returns the metadata value stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or cannot be read.
    pub fn metadata(&self, name: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock();
        let conn: &Connection = self.connection(&mut inner)?;
        Ok(read_metadata(conn, name)?)
    }

    /// Upserts every entry in one transaction, then refreshes the cached
    /// identity if the metadata is now complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    pub fn set_metadata<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut inner = self.inner.lock();
        let identity = {
            let conn = self.connection(&mut inner)?;
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare("INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)")?;
                for (name, value) in entries {
                    stmt.execute(params![name.as_ref(), value.as_ref()])?;
                }
            }
            tx.commit()?;
            let conn: &Connection = conn;
            StoreIdentity::from_lookup(|name| read_metadata(conn, name))?
        };
        if identity.is_some() {
            inner.identity = identity;
        }
        Ok(())
    }

    /// Closes the connection; the next operation reopens it.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if matches!(inner.handle, Handle::Open(_)) {
            inner.handle = Handle::Unopened;
        }
    }

    /// Closes the connection and refuses every later operation.
    pub fn invalidate(&self) {
        self.inner.lock().handle = Handle::Invalidated;
    }

    /// Returns true once the store has been invalidated.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        matches!(self.inner.lock().handle, Handle::Invalidated)
    }

    /// Invalidates the store and deletes its files.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be deleted.
    pub fn discard(&self) -> Result<()> {
        self.invalidate();
        remove_store_files(&self.path)
    }

    fn connection<'a>(&self, inner: &'a mut Inner) -> Result<&'a mut Connection> {
        if matches!(inner.handle, Handle::Unopened) {
            inner.handle = Handle::Open(open_connection(&self.path)?);
        }
        match &mut inner.handle {
            Handle::Open(conn) => Ok(conn),
            Handle::Unopened | Handle::Invalidated => {
                Err(StoreError::Unavailable(self.path.clone()))
            }
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute_batch(SCHEMA)?;
    tracing::trace!(path = %path.display(), "opened store connection");
    Ok(conn)
}

fn read_metadata(conn: &Connection, name: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM metadata WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
}
