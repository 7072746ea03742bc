use crate::domain::{format_showtime_datetime, ticket_file_name, Booking};
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn render_ticket(booking: &Booking) -> String {
    let showtime = &booking.showtime_snapshot;
    [
        "=== MOVIE TICKET ===".to_string(),
        format!("Booking ID : {}", booking.id),
        format!("Showtime   : {}", format_showtime_datetime(&showtime.datetime)),
        format!("Screen     : {}", showtime.screen),
        format!("Seats      : {}", booking.seats.join(", ")),
        format!("Status     : {}", booking.status.as_str()),
        format!("Name       : {}", booking.customer.name),
        format!("Email      : {}", booking.customer.email),
        format!("Total      : {:.2}", booking.pricing.total),
    ]
    .join("\n")
}

/// Writes `ticket_<id>.txt` into `directory`, creating it if needed.
pub fn generate_ticket<P: AsRef<Path>>(booking: &Booking, directory: P) -> Result<PathBuf> {
    let directory = directory.as_ref();
    fs::create_dir_all(directory)?;

    let path = directory.join(ticket_file_name(&booking.id));
    fs::write(&path, render_ticket(booking))?;

    info!(booking_id = %booking.id, "Ticket written to {:?}", path);
    Ok(path)
}
