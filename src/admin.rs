use std::path::Path;

use tracing::{info, warn};

use crate::{
    config::Config,
    entities::{movie, reservation},
    error::{AppError, AppResult},
    models::{Dashboard, MovieFields, MovieForm, Slot, SlotForm},
    session::Session,
    store::Store,
};

const LATEST_LIMIT: u64 = 20;
const POSTER_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

pub const CSV_HEADER: [&str; 12] = [
    "id",
    "type",
    "student_id",
    "student_name",
    "date",
    "time",
    "hall",
    "group_name",
    "group_size",
    "teacher_name",
    "class_info",
    "status",
];

/// Checks the admin password and returns the session with a fresh admin login.
pub fn login(config: &Config, session: Session, password: &str, now: i64) -> AppResult<Session> {
    if password != config.admin_password {
        warn!("admin login rejected");
        return Err(AppError::Auth("The password is incorrect.".to_string()));
    }
    info!("admin logged in");
    Ok(session.with_admin(now, config.session_ttl_minutes))
}

pub fn logout(session: Session) -> Session {
    session.without_admin()
}

/// Checks the teacher passcode and marks the session as teacher-verified.
pub fn verify_teacher(config: &Config, session: Session, code: &str) -> AppResult<Session> {
    if code.trim() != config.teacher_passcode {
        warn!("teacher passcode rejected");
        return Err(AppError::Auth("The passcode is incorrect.".to_string()));
    }
    Ok(session.with_teacher())
}

pub async fn dashboard(store: &Store) -> AppResult<Dashboard> {
    Ok(Dashboard {
        counts: store.status_counts().await?,
        latest: store.latest_reservations(LATEST_LIMIT).await?,
        movies: store.movie_summaries().await?,
    })
}

pub async fn create_movie(store: &Store, form: &MovieForm) -> AppResult<movie::Model> {
    let fields = parse_movie_fields(form)?;
    let slots = parse_schedule_lines(&form.schedule)?;
    let created = store.create_movie(fields, &slots).await?;
    info!(movie_id = created.id, title = %created.title, screenings = slots.len(), "movie created");
    Ok(created)
}

/// Updates the movie's fields; schedule lines in the form are added to its schedule.
pub async fn update_movie(store: &Store, id: i32, form: &MovieForm) -> AppResult<movie::Model> {
    let fields = parse_movie_fields(form)?;
    let slots = parse_schedule_lines(&form.schedule)?;
    let updated = store.update_movie(id, fields, &slots).await?;
    info!(movie_id = id, screenings = slots.len(), "movie updated");
    Ok(updated)
}

pub async fn delete_movie(store: &Store, id: i32) -> AppResult<()> {
    store.delete_movie(id).await?;
    info!(movie_id = id, "movie deleted");
    Ok(())
}

pub async fn add_screening(store: &Store, movie_id: i32, form: &SlotForm) -> AppResult<Slot> {
    if store.get_movie(movie_id).await?.is_none() {
        return Err(AppError::not_found("movie", movie_id));
    }
    let slot = parse_slot(&form.date, &form.time, &form.hall)?;
    store.upsert_screening(movie_id, &slot).await?;
    info!(movie_id, date = %slot.date, hall = %slot.hall, "screening saved");
    Ok(slot)
}

/// Writes an uploaded poster into the poster directory and points the movie at it.
pub async fn save_poster(
    store: &Store,
    config: &Config,
    movie_id: i32,
    file_name: &str,
    bytes: &[u8],
) -> AppResult<movie::Model> {
    if store.get_movie(movie_id).await?.is_none() {
        return Err(AppError::not_found("movie", movie_id));
    }
    if bytes.is_empty() {
        return Err(AppError::validation("The poster file is empty."));
    }
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| POSTER_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| {
            let allowed = POSTER_EXTENSIONS.join(", ");
            AppError::validation(format!("Posters must be one of: {allowed}."))
        })?;

    let stored = format!("movie-{movie_id}.{ext}");
    tokio::fs::create_dir_all(&config.poster_dir).await?;
    tokio::fs::write(config.poster_dir.join(&stored), bytes).await?;

    let updated = store.set_poster(movie_id, format!("/posters/{stored}")).await?;
    info!(movie_id, file = %stored, size = bytes.len(), "poster uploaded");
    Ok(updated)
}

/// Renders the reservations of one movie as CSV, header row first.
pub async fn export_csv(store: &Store, movie_id: i32) -> AppResult<Vec<u8>> {
    if store.get_movie(movie_id).await?.is_none() {
        return Err(AppError::not_found("movie", movie_id));
    }
    let rows = store.reservations_for_movie(movie_id).await?;
    let out = reservations_csv(&rows)?;
    info!(movie_id, rows = rows.len(), "reservations exported");
    Ok(out)
}

pub fn reservations_csv(rows: &[reservation::Model]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for r in rows {
        let group_size = r.group_size.map(|n| n.to_string()).unwrap_or_default();
        writer.write_record([
            r.id.as_str(),
            r.rtype.as_str(),
            r.student_id.as_str(),
            r.student_name.as_str(),
            r.date.as_str(),
            r.time.as_str(),
            r.hall.as_str(),
            r.group_name.as_deref().unwrap_or_default(),
            group_size.as_str(),
            r.teacher_name.as_deref().unwrap_or_default(),
            r.class_info.as_deref().unwrap_or_default(),
            r.status.as_str(),
        ])?;
    }
    writer.into_inner().map_err(|e| AppError::Other(anyhow::anyhow!("flush csv: {e}")))
}

pub fn export_file_name(movie_id: i32) -> String {
    format!("reservations-movie-{movie_id}.csv")
}

fn parse_movie_fields(form: &MovieForm) -> AppResult<MovieFields> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Enter a title."));
    }
    let duration = match form.duration.trim() {
        "" => 90,
        raw => match raw.parse::<i32>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(AppError::validation(
                    "The running time must be a positive number of minutes.",
                ));
            },
        },
    };
    let genre = form.genre.trim();
    let rating = form.rating.trim();
    let poster = form.poster.trim();

    Ok(MovieFields {
        title: title.to_string(),
        genre: if genre.is_empty() { "Other".to_string() } else { genre.to_string() },
        rating: if rating.is_empty() { "ALL".to_string() } else { rating.to_string() },
        duration,
        poster: (!poster.is_empty()).then(|| poster.to_string()),
    })
}

/// Parses `YYYY-MM-DD HH:MM Hall name` lines; blank lines are skipped.
pub fn parse_schedule_lines(text: &str) -> AppResult<Vec<Slot>> {
    let mut slots = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (date, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let (time, hall) = rest.trim_start().split_once(char::is_whitespace).unwrap_or((rest, ""));
        let slot = parse_slot(date, time, hall).map_err(|err| {
            AppError::validation(format!("Schedule line {}: {}", n + 1, err))
        })?;
        slots.push(slot);
    }
    Ok(slots)
}

pub fn parse_slot(date: &str, time: &str, hall: &str) -> AppResult<Slot> {
    let date = date.trim();
    let time = time.trim();
    let hall = hall.trim();
    if date.is_empty() || time.is_empty() || hall.is_empty() {
        return Err(AppError::validation("Date, time and hall are all required."));
    }
    let date = date
        .parse()
        .map_err(|_| AppError::validation(format!("'{date}' is not a date (YYYY-MM-DD).")))?;
    let time = time
        .parse()
        .map_err(|_| AppError::validation(format!("'{time}' is not a time (HH:MM).")))?;
    Ok(Slot { date, time, hall: hall.to_string() })
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, time};

    use super::*;
    use crate::{
        booking,
        models::{ReservationForm, ReservationType},
        store::memory_store,
        test_support,
    };

    #[test]
    fn login_requires_the_configured_password() {
        let config = test_support::config();
        let err = login(&config, Session::default(), "guess", 100).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));

        let session = login(&config, Session::default(), &config.admin_password, 100).unwrap();
        assert!(session.is_admin(101));
        assert!(!logout(session).is_admin(101));
    }

    #[test]
    fn teacher_passcode_is_trimmed() {
        let config = test_support::config();
        let code = format!(" {} ", config.teacher_passcode);
        assert!(verify_teacher(&config, Session::default(), &code).unwrap().teacher_verified);
        assert!(verify_teacher(&config, Session::default(), "nope").is_err());
    }

    #[test]
    fn schedule_lines_parse_with_multiword_halls() {
        let text = "2025-03-14 16:30 Main Auditorium\n\n2025-03-21 09:05 Gym";
        let slots = parse_schedule_lines(text).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(
            slots[0],
            Slot {
                date: date(2025, 3, 14),
                time: time(16, 30, 0, 0),
                hall: "Main Auditorium".to_string(),
            }
        );
        assert_eq!(slots[1].time_label(), "09:05");
    }

    #[test]
    fn bad_schedule_line_names_its_number() {
        let err = parse_schedule_lines("2025-03-14 16:30 A\n2025-02-30 10:00 B").unwrap_err();
        assert!(err.to_string().starts_with("Schedule line 2"));
        assert!(parse_schedule_lines("2025-03-14 16:30").is_err());
    }

    #[test]
    fn movie_defaults_fill_blank_fields() {
        let form = MovieForm { title: " Wonka ".to_string(), ..Default::default() };
        let fields = parse_movie_fields(&form).unwrap();
        assert_eq!(fields.title, "Wonka");
        assert_eq!(fields.genre, "Other");
        assert_eq!(fields.rating, "ALL");
        assert_eq!(fields.duration, 90);
        assert_eq!(fields.poster, None);

        let bad = MovieForm {
            title: "Wonka".to_string(),
            duration: "-3".to_string(),
            ..Default::default()
        };
        assert!(parse_movie_fields(&bad).is_err());
        assert!(parse_movie_fields(&MovieForm::default()).is_err());
    }

    #[tokio::test]
    async fn csv_has_one_row_per_reservation_of_the_movie() {
        let store = memory_store().await;
        let movie = create_movie(
            &store,
            &MovieForm {
                title: "Inside Out 2".to_string(),
                schedule: "2025-03-14 16:30 Auditorium".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let other = create_movie(
            &store,
            &MovieForm {
                title: "Wonka".to_string(),
                schedule: "2025-03-14 18:00 Gym".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let base = |movie_id: i32, student: &str| ReservationForm {
            movie_id: movie_id.to_string(),
            date: "2025-03-14".to_string(),
            student_id: student.to_string(),
            student_name: "Kim".to_string(),
            ..Default::default()
        };
        booking::book(&store, ReservationType::Normal, &base(movie.id, "30215")).await.unwrap();
        let mut group = base(movie.id, "30216");
        group.group_name = Some("Film club".to_string());
        group.group_size = Some("7".to_string());
        booking::book(&store, ReservationType::Group, &group).await.unwrap();
        let mut teacher = base(movie.id, "30218");
        teacher.teacher_name = Some("Park".to_string());
        teacher.class_info = Some("3-2".to_string());
        booking::book(&store, ReservationType::Teacher, &teacher).await.unwrap();
        booking::book(&store, ReservationType::Normal, &base(other.id, "30217")).await.unwrap();

        let bytes = export_csv(&store, movie.id).await.unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), CSV_HEADER.to_vec());

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 3);
        let normal = records.iter().find(|r| &r[0] == "25031430215").unwrap();
        assert_eq!(&normal[7], "");
        assert_eq!(&normal[8], "");
        assert_eq!(&normal[9], "");
        assert_eq!(&normal[10], "");
        let supervised = records.iter().find(|r| &r[0] == "25031430218").unwrap();
        assert_eq!(&supervised[1], "teacher");
        assert_eq!(&supervised[9], "Park");
        assert_eq!(&supervised[10], "3-2");
        assert_eq!(&supervised[11], "confirmed");
        let grouped = records.iter().find(|r| &r[0] == "25031430216").unwrap();
        assert_eq!(&grouped[7], "Film club");
        assert_eq!(&grouped[8], "7");
        assert_eq!(&grouped[6], "Auditorium");
    }

    #[tokio::test]
    async fn export_of_unknown_movie_is_not_found() {
        let store = memory_store().await;
        assert!(matches!(export_csv(&store, 42).await, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn poster_upload_checks_extension_and_writes_file() {
        let store = memory_store().await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_support::config();
        config.poster_dir = dir.path().to_path_buf();

        let form = MovieForm { title: "Wonka".to_string(), ..Default::default() };
        let movie = create_movie(&store, &form).await.unwrap();

        let err = save_poster(&store, &config, movie.id, "poster.exe", b"MZ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated =
            save_poster(&store, &config, movie.id, "Poster.PNG", b"\x89PNG").await.unwrap();
        let expected = format!("movie-{}.png", movie.id);
        assert_eq!(updated.poster, Some(format!("/posters/{expected}")));
        assert_eq!(std::fs::read(dir.path().join(expected)).unwrap(), b"\x89PNG");
    }
}
