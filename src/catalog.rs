use crate::domain::{generate_id, Movie, PriceTable, ScreenConfig, Showtime};
use chrono::{Local, NaiveDateTime, SubsecRound, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMovie {
    pub id: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub duration_min: Option<u32>,
    pub rating: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewShowtime {
    pub id: Option<String>,
    pub movie_id: String,
    pub screen: Option<String>,
    pub datetime: Option<NaiveDateTime>,
    pub language: Option<String>,
    pub pricing: Option<PriceTable>,
    pub screen_config: Option<ScreenConfig>,
}

impl NewShowtime {
    pub fn for_movie(movie_id: &str) -> Self {
        Self {
            movie_id: movie_id.to_string(),
            ..Self::default()
        }
    }
}

/// Fields left as `None` are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShowtimeUpdate {
    pub movie_id: Option<String>,
    pub screen: Option<String>,
    pub datetime: Option<NaiveDateTime>,
    pub language: Option<String>,
    pub pricing: Option<PriceTable>,
}

#[derive(Debug, Clone, Default)]
pub struct ShowtimeFilter {
    pub movie_id: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub screen: Option<String>,
}

impl ShowtimeFilter {
    pub fn matches(&self, showtime: &Showtime) -> bool {
        if let Some(movie_id) = &self.movie_id {
            if &showtime.movie_id != movie_id {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if showtime.datetime.date().format("%Y-%m-%d").to_string() != *date {
                return false;
            }
        }
        if let Some(screen) = &self.screen {
            if &showtime.screen != screen {
                return false;
            }
        }
        true
    }
}

pub fn default_pricing() -> PriceTable {
    PriceTable::new(Decimal::TEN, Decimal::from(14))
}

/// Rows A-H, 12 seats each, the first two rows premium.
pub fn default_screen_config() -> ScreenConfig {
    ScreenConfig::new(&["A", "B", "C", "D", "E", "F", "G", "H"], 12, &["A", "B"])
}

pub fn add_movie(movies: &mut Vec<Movie>, new: NewMovie) -> Movie {
    let movie = Movie {
        id: new.id.unwrap_or_else(|| generate_id(8)),
        title: new.title.unwrap_or_else(|| "Untitled".to_string()),
        genre: new.genre.unwrap_or_else(|| "Unknown".to_string()),
        duration_min: new.duration_min.unwrap_or(90),
        rating: new.rating.unwrap_or_else(|| "NR".to_string()),
        description: new.description.unwrap_or_default(),
        created_at: Utc::now(),
    };
    movies.push(movie.clone());
    movie
}

pub fn schedule_showtime(showtimes: &mut Vec<Showtime>, new: NewShowtime) -> Showtime {
    let showtime = Showtime {
        id: new.id.unwrap_or_else(|| generate_id(10)),
        movie_id: new.movie_id,
        screen: new.screen.unwrap_or_else(|| "Screen 1".to_string()),
        datetime: new.datetime.unwrap_or_else(current_minute),
        language: new.language.unwrap_or_else(|| "OV".to_string()),
        pricing: new.pricing.unwrap_or_else(default_pricing),
        screen_config: new.screen_config.unwrap_or_else(default_screen_config),
        updated_at: None,
    };
    showtimes.push(showtime.clone());
    showtime
}

pub fn list_showtimes<'a>(showtimes: &'a [Showtime], filter: &ShowtimeFilter) -> Vec<&'a Showtime> {
    showtimes.iter().filter(|s| filter.matches(s)).collect()
}

pub fn update_showtime(
    showtimes: &mut [Showtime],
    showtime_id: &str,
    update: ShowtimeUpdate,
) -> Option<Showtime> {
    let showtime = showtimes.iter_mut().find(|s| s.id == showtime_id)?;

    if let Some(movie_id) = update.movie_id {
        showtime.movie_id = movie_id;
    }
    if let Some(screen) = update.screen {
        showtime.screen = screen;
    }
    if let Some(datetime) = update.datetime {
        showtime.datetime = datetime;
    }
    if let Some(language) = update.language {
        showtime.language = language;
    }
    if let Some(pricing) = update.pricing {
        showtime.pricing = pricing;
    }
    showtime.updated_at = Some(Utc::now());

    Some(showtime.clone())
}

fn current_minute() -> NaiveDateTime {
    let now = Local::now().naive_local().trunc_subsecs(0);
    now.with_second(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_showtime_datetime;
    use rust_decimal_macros::dec;

    #[test]
    fn test_add_movie_defaults() {
        let mut movies = Vec::new();
        let movie = add_movie(&mut movies, NewMovie::default());
        assert_eq!(movie.id.len(), 8);
        assert_eq!(movie.title, "Untitled");
        assert_eq!(movie.genre, "Unknown");
        assert_eq!(movie.duration_min, 90);
        assert_eq!(movie.rating, "NR");
        assert_eq!(movies, vec![movie]);
    }

    #[test]
    fn test_schedule_showtime_defaults() {
        let mut showtimes = Vec::new();
        let showtime = schedule_showtime(&mut showtimes, NewShowtime::for_movie("MV001"));
        assert_eq!(showtime.id.len(), 10);
        assert_eq!(showtime.screen, "Screen 1");
        assert_eq!(showtime.language, "OV");
        assert_eq!(showtime.pricing, default_pricing());
        assert_eq!(showtime.screen_config.premium_rows, vec!["A", "B"]);
        assert_eq!(showtime.datetime.second(), 0);
        assert_eq!(showtimes.len(), 1);
    }

    #[test]
    fn test_list_showtimes_filters() {
        let mut showtimes = Vec::new();
        for (id, movie, when, screen) in [
            ("S1", "M1", "2026-01-07 19:30", "Screen 1"),
            ("S2", "M2", "2026-01-07 21:00", "Screen 2"),
            ("S3", "M1", "2026-01-08 19:30", "Screen 2"),
        ] {
            schedule_showtime(
                &mut showtimes,
                NewShowtime {
                    id: Some(id.to_string()),
                    movie_id: movie.to_string(),
                    screen: Some(screen.to_string()),
                    datetime: Some(parse_showtime_datetime(when).unwrap()),
                    ..NewShowtime::default()
                },
            );
        }

        let ids = |filter: ShowtimeFilter| -> Vec<String> {
            list_showtimes(&showtimes, &filter)
                .into_iter()
                .map(|s| s.id.clone())
                .collect()
        };

        assert_eq!(ids(ShowtimeFilter::default()), vec!["S1", "S2", "S3"]);
        assert_eq!(
            ids(ShowtimeFilter { movie_id: Some("M1".into()), ..Default::default() }),
            vec!["S1", "S3"]
        );
        assert_eq!(
            ids(ShowtimeFilter { date: Some("2026-01-07".into()), ..Default::default() }),
            vec!["S1", "S2"]
        );
        assert_eq!(
            ids(ShowtimeFilter {
                movie_id: Some("M1".into()),
                screen: Some("Screen 2".into()),
                ..Default::default()
            }),
            vec!["S3"]
        );
    }

    #[test]
    fn test_update_showtime() {
        let mut showtimes = Vec::new();
        let original = schedule_showtime(&mut showtimes, NewShowtime::for_movie("M1"));

        let updated = update_showtime(
            &mut showtimes,
            &original.id,
            ShowtimeUpdate {
                pricing: Some(PriceTable::new(dec!(12), dec!(16))),
                ..ShowtimeUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.datetime, original.datetime);
        assert_eq!(updated.pricing.get("standard"), Some(dec!(12)));
        assert!(updated.updated_at.is_some());
        assert_eq!(showtimes[0], updated);

        assert!(update_showtime(&mut showtimes, "missing", ShowtimeUpdate::default()).is_none());
    }
}
