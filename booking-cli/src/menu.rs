use anyhow::Context;
use chrono::{Duration, Local, NaiveTime};
use movie_booking::catalog::{NewMovie, NewShowtime, ShowtimeFilter, ShowtimeUpdate};
use movie_booking::reports::{self, DEFAULT_TOP_MOVIES};
use movie_booking::{
    backup_state, format_showtime_datetime, generate_ticket, parse_showtime_datetime, save_state,
    AppConfig, BookingError, BookingLedger, CreateBooking, Customer, Discount, PriceTable,
    ScreenConfig, SeatZone,
};
use rust_decimal::Decimal;
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use tracing::{debug, info};

/// Raised when the input stream closes; unwinds to the main loop, which
/// persists and exits.
#[derive(Debug)]
struct EndOfInput;

impl fmt::Display for EndOfInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "end of input")
    }
}

impl std::error::Error for EndOfInput {}

pub struct Menu<R, W> {
    ledger: BookingLedger,
    config: AppConfig,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(ledger: BookingLedger, config: AppConfig, input: R, output: W) -> Self {
        Self {
            ledger,
            config,
            input,
            output,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            writeln!(self.output, "\n=== Movie Ticket Booking System ===")?;
            writeln!(self.output, "1) Customer")?;
            writeln!(self.output, "2) Admin")?;
            writeln!(self.output, "3) Reports snapshot")?;
            writeln!(self.output, "4) Export report")?;
            writeln!(self.output, "9) Backup data")?;
            writeln!(self.output, "0) Exit")?;

            let result = match self.ask("Select: ") {
                Ok(choice) => match choice.as_str() {
                    "1" => self.customer_menu().and_then(|_| self.persist()),
                    "2" => self.admin_menu().and_then(|_| self.persist()),
                    "3" => self.show_reports(),
                    "4" => {
                        let exported = self.export_report();
                        self.report_outcome(exported)
                    }
                    "9" => {
                        let backed_up = self.backup();
                        self.report_outcome(backed_up)
                    }
                    "0" => {
                        self.persist()?;
                        writeln!(self.output, "Goodbye!")?;
                        return Ok(());
                    }
                    _ => writeln!(self.output, "Invalid option.").map_err(Into::into),
                },
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is::<EndOfInput>() => {
                    debug!("Input closed, saving and exiting");
                    self.persist()?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn customer_menu(&mut self) -> anyhow::Result<()> {
        loop {
            writeln!(self.output, "\n-- Customer Menu --")?;
            writeln!(self.output, "1) List movies")?;
            writeln!(self.output, "2) List showtimes")?;
            writeln!(self.output, "3) View seats & book")?;
            writeln!(self.output, "4) Cancel booking")?;
            writeln!(self.output, "5) My bookings")?;
            writeln!(self.output, "0) Back")?;

            let result = match self.ask("Select: ")?.as_str() {
                "1" => self.print_movies(),
                "2" => self.print_showtimes(),
                "3" => self.book(),
                "4" => self.cancel(),
                "5" => self.my_bookings(),
                "0" => return Ok(()),
                _ => writeln!(self.output, "Invalid option.").map_err(Into::into),
            };
            self.report_outcome(result)?;
        }
    }

    fn admin_menu(&mut self) -> anyhow::Result<()> {
        loop {
            writeln!(self.output, "\n-- Admin Menu --")?;
            writeln!(self.output, "1) Add movie")?;
            writeln!(self.output, "2) Schedule showtime")?;
            writeln!(self.output, "3) Create/Rebuild seat map")?;
            writeln!(self.output, "4) Update showtime pricing/date")?;
            writeln!(self.output, "0) Back")?;

            let result = match self.ask("Select: ")?.as_str() {
                "1" => self.add_movie(),
                "2" => self.schedule_showtime(),
                "3" => self.rebuild_seat_map(),
                "4" => self.update_showtime(),
                "0" => return Ok(()),
                _ => writeln!(self.output, "Invalid option.").map_err(Into::into),
            };
            self.report_outcome(result)?;
        }
    }

    // Customer actions

    fn print_movies(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "\nMovies:")?;
        for movie in self.ledger.movies() {
            writeln!(
                self.output,
                "- {}: {} ({}, {} min)",
                movie.id, movie.title, movie.genre, movie.duration_min
            )?;
        }
        Ok(())
    }

    fn print_showtimes(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "\nShowtimes:")?;
        for showtime in self.ledger.list_showtimes(&ShowtimeFilter::default()) {
            let title = self
                .ledger
                .movie(&showtime.movie_id)
                .map(|m| m.title)
                .unwrap_or_else(|| "Unknown".to_string());
            writeln!(
                self.output,
                "- {} | {} | {} | {} | {} | Price S/P: {}/{}",
                showtime.id,
                title,
                format_showtime_datetime(&showtime.datetime),
                showtime.screen,
                showtime.language,
                showtime.pricing.get("standard").unwrap_or_default(),
                showtime.pricing.get("premium").unwrap_or_default(),
            )?;
        }
        Ok(())
    }

    fn book(&mut self) -> anyhow::Result<()> {
        self.print_showtimes()?;
        let showtime_id = self.ask("Showtime ID: ")?;
        let Some(rendered) = self.ledger.render_seat_map(&showtime_id) else {
            writeln!(self.output, "Seat map not found.")?;
            return Ok(());
        };
        writeln!(self.output, "{}", rendered)?;

        let seats = self.ask("Seats (comma separated, e.g., A1,A2): ")?;
        let seats: Vec<&str> = seats
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let name = self.ask("Name: ")?;
        let email = self.ask("Email: ")?;
        let phone = self.ask("Phone (optional): ")?;
        let discount = self.ask("Discount (e.g., 10% or 5, blank for none): ")?;
        let discounts = parse_discount(&discount)?.into_iter().collect();

        let request = CreateBooking::new(&showtime_id, &seats, Customer::new(&name, &email, &phone))
            .with_discounts(discounts);
        match self.ledger.create_booking(request) {
            Ok(booking) => {
                let path = generate_ticket(&booking, &self.config.ticket_dir)?;
                writeln!(
                    self.output,
                    "Booking confirmed! ID: {}. Total: {:.2}. Ticket saved to {}",
                    booking.id,
                    booking.pricing.total,
                    path.display()
                )?;
            }
            Err(e) => writeln!(self.output, "Booking failed: {}", e)?,
        }
        Ok(())
    }

    fn cancel(&mut self) -> anyhow::Result<()> {
        let booking_id = self.ask("Booking ID: ")?;
        let outcome = self.ledger.cancel_booking(&booking_id);
        writeln!(self.output, "{}.", outcome)?;
        Ok(())
    }

    fn my_bookings(&mut self) -> anyhow::Result<()> {
        let email = self.ask("Email: ")?;
        let mine = self.ledger.customer_bookings(&email);
        if mine.is_empty() {
            writeln!(self.output, "No active bookings.")?;
        }
        for booking in mine {
            writeln!(
                self.output,
                "- {} | {} | Seats: {} | Total: {:.2}",
                booking.id,
                format_showtime_datetime(&booking.showtime_snapshot.datetime),
                booking.seats.join(", "),
                booking.pricing.total
            )?;
        }
        Ok(())
    }

    // Admin actions

    fn add_movie(&mut self) -> anyhow::Result<()> {
        let title = self.ask("Title: ")?;
        let genre = self.ask("Genre: ")?;
        let duration = self.ask("Duration (min): ")?;
        let rating = self.ask("Rating (e.g., PG-13): ")?;
        let description = self.ask("Description: ")?;

        let movie = self.ledger.add_movie(NewMovie {
            id: None,
            title: non_empty(title),
            genre: non_empty(genre),
            duration_min: parse_optional(&duration)?,
            rating: non_empty(rating),
            description: non_empty(description),
        });
        writeln!(self.output, "Added movie {}", movie.id)?;
        Ok(())
    }

    fn schedule_showtime(&mut self) -> anyhow::Result<()> {
        self.print_movies()?;
        let movie_id = self.ask("Movie ID: ")?;
        if self.ledger.movie(&movie_id).is_none() {
            writeln!(self.output, "Movie not found.")?;
            return Ok(());
        }
        let screen = self.ask("Screen name: ")?;
        let datetime = self.ask("Date/time (YYYY-MM-DD HH:MM): ")?;
        let datetime = match non_empty(datetime) {
            Some(text) => Some(parse_showtime_datetime(&text)?),
            None => None,
        };
        let language = self.ask("Language: ")?;
        let standard: Decimal = parse_optional(&self.ask("Standard price: ")?)?.unwrap_or(Decimal::TEN);
        let premium: Decimal =
            parse_optional(&self.ask("Premium price: ")?)?.unwrap_or_else(|| Decimal::from(14));
        let rows = non_empty(self.ask("Rows (e.g., ABCDEF): ")?).unwrap_or_else(|| "ABCDEFGH".to_string());
        let seats_per_row: u32 = parse_optional(&self.ask("Seats per row: ")?)?.unwrap_or(12);
        let premium_rows =
            non_empty(self.ask("Premium rows (e.g., AB): ")?).unwrap_or_else(|| "AB".to_string());

        let showtime = self.ledger.schedule_showtime(NewShowtime {
            id: None,
            movie_id,
            screen: non_empty(screen),
            datetime,
            language: non_empty(language),
            pricing: Some(PriceTable::new(standard, premium)),
            screen_config: Some(ScreenConfig::from_row_letters(&rows, seats_per_row, &premium_rows)),
        });
        writeln!(self.output, "Showtime created: {}", showtime.id)?;
        Ok(())
    }

    fn rebuild_seat_map(&mut self) -> anyhow::Result<()> {
        let showtime_id = self.ask("Showtime ID: ")?;
        self.ledger.rebuild_seat_map(&showtime_id)?;
        writeln!(self.output, "Seat map rebuilt.")?;
        Ok(())
    }

    fn update_showtime(&mut self) -> anyhow::Result<()> {
        let showtime_id = self.ask("Showtime ID: ")?;
        let Some(current) = self.ledger.showtime(&showtime_id) else {
            writeln!(self.output, "Showtime not found.")?;
            return Ok(());
        };
        let datetime = self.ask("New datetime (leave blank to keep): ")?;
        let standard: Option<Decimal> = parse_optional(&self.ask("New standard price (blank to keep): ")?)?;
        let premium: Option<Decimal> = parse_optional(&self.ask("New premium price (blank to keep): ")?)?;

        let mut update = ShowtimeUpdate::default();
        if let Some(text) = non_empty(datetime) {
            update.datetime = Some(parse_showtime_datetime(&text)?);
        }
        if standard.is_some() || premium.is_some() {
            let mut pricing = current.pricing;
            if let Some(price) = standard {
                pricing.set(SeatZone::Standard, price);
            }
            if let Some(price) = premium {
                pricing.set(SeatZone::Premium, price);
            }
            update.pricing = Some(pricing);
        }

        match self.ledger.update_showtime(&showtime_id, update) {
            Some(_) => writeln!(self.output, "Showtime updated.")?,
            None => writeln!(self.output, "Showtime not found.")?,
        }
        Ok(())
    }

    // Reports and maintenance

    fn show_reports(&mut self) -> anyhow::Result<()> {
        let state = self.ledger.snapshot();
        writeln!(self.output, "\n-- Reports --")?;
        for entry in reports::occupancy_report(&state.showtimes, &state.seat_maps, &state.bookings) {
            writeln!(
                self.output,
                "{} | {} | {} | {}% full ({}/{})",
                entry.showtime_id,
                format_showtime_datetime(&entry.datetime),
                entry.screen,
                entry.occupancy,
                entry.reserved,
                entry.total_seats
            )?;
        }

        let (start, end) = revenue_period();
        let revenue = reports::revenue_summary(&state.bookings, start, end);
        writeln!(
            self.output,
            "Projected revenue {} to {}: {:.2} ({} bookings)",
            format_showtime_datetime(&start),
            format_showtime_datetime(&end),
            revenue.total_revenue,
            revenue.booking_count
        )?;

        writeln!(self.output, "Top movies:")?;
        for sales in reports::top_movies(&state.bookings, &state.showtimes, DEFAULT_TOP_MOVIES) {
            let title = state
                .movies
                .iter()
                .find(|m| m.id == sales.movie_id)
                .map(|m| m.title.as_str())
                .unwrap_or("Unknown");
            writeln!(self.output, "- {} ({}): {} seats", title, sales.movie_id, sales.seats_sold)?;
        }

        writeln!(self.output, "\n{}", self.ledger.metrics().export()?)?;
        Ok(())
    }

    fn export_report(&mut self) -> anyhow::Result<()> {
        let default_path = self.config.data_dir.join("reports").join(format!(
            "snapshot-{}.json",
            Local::now().format("%Y%m%d-%H%M%S")
        ));
        let path = non_empty(self.ask(&format!("Output path [{}]: ", default_path.display()))?)
            .map(Into::into)
            .unwrap_or(default_path);

        let (start, end) = revenue_period();
        let report = reports::snapshot_report(&self.ledger.snapshot(), start, end);
        let path = reports::export_report(&report, &path)?;
        writeln!(self.output, "Report exported to {}", path.display())?;
        Ok(())
    }

    fn backup(&mut self) -> anyhow::Result<()> {
        let paths = backup_state(
            &self.config.data_dir,
            &self.ledger.snapshot(),
            &self.config.backup_dir,
        )?;
        writeln!(self.output, "Backups created:")?;
        for path in paths {
            writeln!(self.output, "- {}", path.display())?;
        }
        Ok(())
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        save_state(&self.config.data_dir, &self.ledger.snapshot())
            .with_context(|| format!("failed to save state to {:?}", self.config.data_dir))?;
        info!("State persisted");
        Ok(())
    }

    // Input

    /// Reads one trimmed line after printing `label`.
    fn ask(&mut self, label: &str) -> anyhow::Result<String> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(EndOfInput.into());
        }
        Ok(line.trim().to_string())
    }

    /// Prints booking errors and carries on; anything else propagates.
    fn report_outcome(&mut self, result: anyhow::Result<()>) -> anyhow::Result<()> {
        match result {
            Err(e) => match e.downcast_ref::<BookingError>() {
                Some(err) => {
                    writeln!(self.output, "Error: {}", err)?;
                    Ok(())
                }
                None => Err(e),
            },
            ok => ok,
        }
    }
}

/// Today 00:00 through the end of the 30th day after, venue-local.
fn revenue_period() -> (chrono::NaiveDateTime, chrono::NaiveDateTime) {
    let start = Local::now().date_naive().and_time(NaiveTime::MIN);
    let end = start + Duration::days(31) - Duration::minutes(1);
    (start, end)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_optional<T: FromStr>(value: &str) -> Result<Option<T>, BookingError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| BookingError::Validation(format!("invalid number: {}", value)))
}

/// `10%` is a percent discount, a bare amount is a flat one.
fn parse_discount(value: &str) -> Result<Option<Discount>, BookingError> {
    let (amount, is_percent) = match value.strip_suffix('%') {
        Some(percent) => (percent.trim(), true),
        None => (value, false),
    };
    let Some(amount) = parse_optional::<Decimal>(amount)? else {
        return Ok(None);
    };
    if amount.is_sign_negative() {
        return Err(BookingError::Validation(format!(
            "discount must not be negative: {}",
            value
        )));
    }
    Ok(Some(if is_percent {
        Discount::percent(amount)
    } else {
        Discount::flat(amount)
    }))
}
