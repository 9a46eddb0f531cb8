use jiff::civil::Date;
use sea_orm::Set;
use tracing::info;

use crate::{
    entities::reservation,
    error::{AppError, AppResult},
    models::{ReservationForm, ReservationType, Slot, Status},
    store::{self, Store},
    ticket::ticket_id,
};

pub const MIN_GROUP_SIZE: i32 = 5;

/// Validates a submitted reservation form and persists the reservation.
pub async fn book(
    store: &Store,
    rtype: ReservationType,
    form: &ReservationForm,
) -> AppResult<reservation::Model> {
    let movie_id = parse_movie_id(&form.movie_id)?;
    let movie = store
        .movie_with_schedule(movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("movie", movie_id))?;

    let date_raw = form.date.trim();
    if date_raw.is_empty() {
        return Err(AppError::validation("Choose a screening date."));
    }
    let date: Date = date_raw
        .parse()
        .map_err(|_| AppError::validation(format!("'{date_raw}' is not a valid date.")))?;
    let slot = movie
        .schedule
        .iter()
        .find(|s| s.date == date)
        .ok_or_else(|| {
            AppError::validation(format!("{} has no screening on {date}.", movie.movie.title))
        })?;

    let student_id = form.student_id.trim();
    if student_id.is_empty() {
        return Err(AppError::validation("Enter the student number."));
    }
    if !student_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::validation("The student number may only contain letters and digits."));
    }
    let student_name = form.student_name.trim();
    if student_name.is_empty() {
        return Err(AppError::validation("Enter the student name."));
    }

    let mut group_name = None;
    let mut group_size = None;
    let mut teacher_name = None;
    let mut class_info = None;

    match rtype {
        ReservationType::Normal => {},
        ReservationType::Group => {
            let name = non_empty(form.group_name.as_deref())
                .ok_or_else(|| AppError::validation("Enter the group name."))?;
            group_name = Some(name);
            group_size = Some(parse_group_size(form.group_size.as_deref())?);
        },
        ReservationType::Teacher => {
            let name = non_empty(form.teacher_name.as_deref())
                .ok_or_else(|| AppError::validation("Enter the supervising teacher's name."))?;
            teacher_name = Some(name);
            class_info = non_empty(form.class_info.as_deref());
        },
    }

    let id = ticket_id(date, student_id);
    if store.get_reservation(&id).await?.is_some() {
        return Err(store::duplicate_ticket());
    }

    let model = reservation::ActiveModel {
        id: Set(id),
        rtype: Set(rtype.as_code().to_string()),
        movie_id: Set(movie.movie.id),
        movie_title: Set(movie.movie.title.clone()),
        date: Set(slot.date.to_string()),
        time: Set(slot.time_label()),
        hall: Set(slot.hall.clone()),
        student_id: Set(student_id.to_string()),
        student_name: Set(student_name.to_string()),
        group_name: Set(group_name),
        group_size: Set(group_size),
        teacher_name: Set(teacher_name),
        class_info: Set(class_info),
        status: Set(Status::Confirmed.as_code().to_string()),
        created_at: Set(store::now_sec()),
    };

    let created = store.insert_reservation(model).await?;
    info!(
        ticket_id = %created.id,
        rtype = rtype.as_code(),
        movie_id = created.movie_id,
        "reservation created"
    );
    Ok(created)
}

/// Picks the date a fresh booking form should preselect: the first screening on or
/// after `today`, falling back to the earliest one.
pub fn default_date(schedule: &[Slot], today: Date) -> Option<Date> {
    schedule
        .iter()
        .map(|s| s.date)
        .filter(|d| *d >= today)
        .min()
        .or_else(|| schedule.iter().map(|s| s.date).min())
}

/// First screening on or after `today`.
pub fn next_screening(schedule: &[Slot], today: Date) -> Option<Slot> {
    schedule.iter().filter(|s| s.date >= today).min_by_key(|s| (s.date, s.time)).cloned()
}

pub fn parse_movie_id(raw: &str) -> AppResult<i32> {
    raw.trim().parse().map_err(|_| AppError::not_found("movie", raw.trim()))
}

/// A present-but-blank field means the minimum group; a missing field is an error.
fn parse_group_size(raw: Option<&str>) -> AppResult<i32> {
    let Some(raw) = raw else {
        return Err(AppError::validation("Enter the group size."));
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(MIN_GROUP_SIZE);
    }
    let size: i32 =
        raw.parse().map_err(|_| AppError::validation("The group size must be a whole number."))?;
    if size < MIN_GROUP_SIZE {
        return Err(AppError::validation(format!(
            "Group reservations need at least {MIN_GROUP_SIZE} people."
        )));
    }
    Ok(size)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
