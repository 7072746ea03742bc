// Data file definitions
pub struct DataFiles;

impl DataFiles {
    pub const MOVIES: &'static str = "movies.json";
    pub const SHOWTIMES: &'static str = "showtimes.json";
    pub const BOOKINGS: &'static str = "bookings.json";
}

// Backup file prefixes
pub struct BackupFiles;

impl BackupFiles {
    pub const SHOWTIMES: &'static str = "showtimes";
    pub const BOOKINGS: &'static str = "bookings";
    pub const SEAT_MAPS: &'static str = "seatmaps";
    pub const MOVIES: &'static str = "movies";
    pub const TIMESTAMP_FORMAT: &'static str = "%Y%m%d-%H%M%S";
}

// Utility functions for file name generation
pub fn ticket_file_name(booking_id: &str) -> String {
    format!("ticket_{}.txt", booking_id)
}

pub fn backup_file_name(prefix: &str, timestamp: &str) -> String {
    format!("{}-{}.json", prefix, timestamp)
}
