use jiff::civil::{Date, Time};
use serde::Deserialize;

use crate::entities::{movie, reservation, screening};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReservationType {
    Normal,
    Group,
    Teacher,
}

impl ReservationType {
    pub const ALL: [ReservationType; 3] =
        [ReservationType::Normal, ReservationType::Group, ReservationType::Teacher];

    pub fn as_code(self) -> &'static str {
        match self {
            ReservationType::Normal => "normal",
            ReservationType::Group => "group",
            ReservationType::Teacher => "teacher",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(ReservationType::Normal),
            "group" => Some(ReservationType::Group),
            "teacher" => Some(ReservationType::Teacher),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReservationType::Normal => "Individual",
            ReservationType::Group => "Group",
            ReservationType::Teacher => "Teacher",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Confirmed,
    Pending,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Confirmed, Status::Pending, Status::Rejected];

    pub fn as_code(self) -> &'static str {
        match self {
            Status::Confirmed => "confirmed",
            Status::Pending => "pending",
            Status::Rejected => "rejected",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "confirmed" => Some(Status::Confirmed),
            "pending" => Some(Status::Pending),
            "rejected" => Some(Status::Rejected),
            _ => None,
        }
    }
}

/// One screening of a movie, parsed out of its stored row.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub date: Date,
    pub time: Time,
    pub hall: String,
}

impl Slot {
    pub fn from_row(row: &screening::Model) -> Option<Self> {
        Some(Self {
            date: row.date.parse().ok()?,
            time: row.time.parse().ok()?,
            hall: row.hall.clone(),
        })
    }

    pub fn time_label(&self) -> String {
        self.time.strftime("%H:%M").to_string()
    }
}

#[derive(Clone, Debug)]
pub struct MovieWithSchedule {
    pub movie: movie::Model,
    pub schedule: Vec<Slot>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReservationForm {
    #[serde(default)]
    pub movie_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    pub group_name: Option<String>,
    pub group_size: Option<String>,
    pub teacher_name: Option<String>,
    pub class_info: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub poster: String,
    #[serde(default)]
    pub schedule: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlotForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub hall: String,
}

/// Validated movie fields ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieFields {
    pub title: String,
    pub genre: String,
    pub rating: String,
    pub duration: i32,
    pub poster: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: u64,
    pub confirmed: u64,
    pub pending: u64,
    pub rejected: u64,
}

#[derive(Clone, Debug)]
pub struct MovieSummary {
    pub movie: movie::Model,
    pub reservations: u64,
    pub screenings: u64,
}

#[derive(Clone, Debug)]
pub struct Dashboard {
    pub counts: StatusCounts,
    pub latest: Vec<reservation::Model>,
    pub movies: Vec<MovieSummary>,
}
