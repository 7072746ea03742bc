use crate::domain::{
    backup_file_name, BackupFiles, Booking, DataFiles, Movie, SeatMap, Showtime,
};
use crate::Result;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Everything the ledger owns, as plain data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub movies: Vec<Movie>,
    pub showtimes: Vec<Showtime>,
    pub seat_maps: BTreeMap<String, SeatMap>,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ShowtimesDocument {
    WithSeatMaps {
        #[serde(default)]
        showtimes: Vec<Showtime>,
        #[serde(default)]
        seat_maps: BTreeMap<String, SeatMap>,
    },
    Bare(Vec<Showtime>),
}

/// Directory of pretty-printed JSON documents, each replaced atomically on write.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Returns `None` when the document does not exist.
    pub fn get<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let path = self.path(name);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(Some(value))
    }

    pub fn put<T>(&self, name: &str, value: &T) -> Result<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        fs::create_dir_all(&self.base_dir)?;
        let path = self.path(name);

        let mut file = NamedTempFile::new_in(&self.base_dir)?;
        serde_json::to_writer_pretty(&mut file, value)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;

        debug!("Wrote {:?}", path);
        Ok(path)
    }
}

/// Loads movies, showtimes, seat maps and bookings from `data_dir`.
/// Missing files load as empty collections.
pub fn load_state<P: AsRef<Path>>(data_dir: P) -> Result<LedgerState> {
    let store = JsonStore::new(data_dir);

    let movies: Vec<Movie> = store.get(DataFiles::MOVIES)?.unwrap_or_default();
    let (showtimes, seat_maps) = match store.get::<ShowtimesDocument>(DataFiles::SHOWTIMES)? {
        Some(ShowtimesDocument::WithSeatMaps {
            showtimes,
            seat_maps,
        }) => (showtimes, seat_maps),
        Some(ShowtimesDocument::Bare(showtimes)) => (showtimes, BTreeMap::new()),
        None => (Vec::new(), BTreeMap::new()),
    };
    let (showtimes, rejected): (Vec<Showtime>, Vec<Showtime>) =
        showtimes.into_iter().partition(validate_showtime);
    if !rejected.is_empty() {
        warn!(
            skipped = rejected.len(),
            "Skipping incomplete showtime records"
        );
    }
    let bookings: Vec<Booking> = store.get(DataFiles::BOOKINGS)?.unwrap_or_default();

    info!(
        movies = movies.len(),
        showtimes = showtimes.len(),
        bookings = bookings.len(),
        "Loaded state"
    );

    Ok(LedgerState {
        movies,
        showtimes,
        seat_maps,
        bookings,
    })
}

pub fn save_state<P: AsRef<Path>>(data_dir: P, state: &LedgerState) -> Result<()> {
    let store = JsonStore::new(data_dir);

    store.put(DataFiles::MOVIES, &state.movies)?;
    store.put(
        DataFiles::SHOWTIMES,
        &ShowtimesDocument::WithSeatMaps {
            showtimes: state.showtimes.clone(),
            seat_maps: state.seat_maps.clone(),
        },
    )?;
    store.put(DataFiles::BOOKINGS, &state.bookings)?;

    info!(bookings = state.bookings.len(), "Saved state");
    Ok(())
}

/// Writes timestamped copies of the state into `backup_dir` and returns their paths.
pub fn backup_state<P: AsRef<Path>, Q: AsRef<Path>>(
    data_dir: P,
    state: &LedgerState,
    backup_dir: Q,
) -> Result<Vec<PathBuf>> {
    let store = JsonStore::new(&backup_dir);
    let timestamp = Utc::now().format(BackupFiles::TIMESTAMP_FORMAT).to_string();

    let mut paths = vec![
        store.put(
            &backup_file_name(BackupFiles::SHOWTIMES, &timestamp),
            &state.showtimes,
        )?,
        store.put(
            &backup_file_name(BackupFiles::BOOKINGS, &timestamp),
            &state.bookings,
        )?,
        store.put(
            &backup_file_name(BackupFiles::SEAT_MAPS, &timestamp),
            &state.seat_maps,
        )?,
    ];

    let movies_src = data_dir.as_ref().join(DataFiles::MOVIES);
    if movies_src.is_file() {
        let movies_dst = store.path(&backup_file_name(BackupFiles::MOVIES, &timestamp));
        fs::copy(&movies_src, &movies_dst)?;
        paths.push(movies_dst);
    }

    info!("Backups created: {:?}", paths);
    Ok(paths)
}

/// Light validation to keep incomplete records out of the schedule.
pub fn validate_showtime(showtime: &Showtime) -> bool {
    !showtime.id.trim().is_empty()
        && !showtime.movie_id.trim().is_empty()
        && !showtime.screen.trim().is_empty()
        && showtime.pricing.get("standard").is_some()
}
