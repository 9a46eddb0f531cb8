use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use crate::{
    entities::{movie, reservation, screening},
    error::{AppError, AppResult},
    models::{
        MovieFields, MovieSummary, MovieWithSchedule, ReservationType, Slot, Status, StatusCounts,
    },
};

#[derive(Clone)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_movies(&self) -> AppResult<Vec<movie::Model>> {
        Ok(movie::Entity::find()
            .order_by_asc(movie::Column::Title)
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_movie(&self, id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn movie_with_schedule(&self, id: i32) -> AppResult<Option<MovieWithSchedule>> {
        let Some(movie) = self.get_movie(id).await? else {
            return Ok(None);
        };
        let schedule = self.schedule(id).await?;
        Ok(Some(MovieWithSchedule { movie, schedule }))
    }

    pub async fn movies_with_schedule(&self) -> AppResult<Vec<MovieWithSchedule>> {
        let movies = self.list_movies().await?;
        let rows = screening::Entity::find()
            .order_by_asc(screening::Column::Date)
            .order_by_asc(screening::Column::Time)
            .all(&self.db)
            .await?;

        Ok(movies
            .into_iter()
            .map(|movie| {
                let schedule = rows
                    .iter()
                    .filter(|row| row.movie_id == movie.id)
                    .filter_map(Slot::from_row)
                    .collect();
                MovieWithSchedule { movie, schedule }
            })
            .collect())
    }

    /// Inserts the movie and its initial schedule in one transaction.
    pub async fn create_movie(
        &self,
        fields: MovieFields,
        slots: &[Slot],
    ) -> AppResult<movie::Model> {
        let txn = self.db.begin().await?;

        let created = movie::ActiveModel {
            id: Default::default(),
            title: Set(fields.title),
            genre: Set(fields.genre),
            rating: Set(fields.rating),
            duration: Set(fields.duration),
            poster: Set(fields.poster),
            created_at: Set(now_sec()),
        }
        .insert(&txn)
        .await?;

        for slot in slots {
            screening::Entity::insert(slot_model(created.id, slot))
                .on_conflict(slot_conflict())
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(created)
    }

    /// Rewrites the movie's fields and upserts `slots` into its schedule in one transaction.
    pub async fn update_movie(
        &self,
        id: i32,
        fields: MovieFields,
        slots: &[Slot],
    ) -> AppResult<movie::Model> {
        let txn = self.db.begin().await?;

        let existing = movie::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("movie", id))?;
        let mut model: movie::ActiveModel = existing.into();
        model.title = Set(fields.title);
        model.genre = Set(fields.genre);
        model.rating = Set(fields.rating);
        model.duration = Set(fields.duration);
        model.poster = Set(fields.poster);
        let updated = model.update(&txn).await?;

        for slot in slots {
            screening::Entity::insert(slot_model(id, slot))
                .on_conflict(slot_conflict())
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn set_poster(&self, id: i32, poster: String) -> AppResult<movie::Model> {
        let existing = self.get_movie(id).await?.ok_or_else(|| AppError::not_found("movie", id))?;
        let mut model: movie::ActiveModel = existing.into();
        model.poster = Set(Some(poster));
        Ok(model.update(&self.db).await?)
    }

    /// Deletes a movie and its schedule. Refused while reservations point at it.
    pub async fn delete_movie(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        if movie::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(AppError::not_found("movie", id));
        }

        let booked = reservation::Entity::find()
            .filter(reservation::Column::MovieId.eq(id))
            .count(&txn)
            .await?;
        if booked > 0 {
            return Err(AppError::Conflict(format!(
                "movie {id} still has {booked} reservation(s); delete them first"
            )));
        }

        screening::Entity::delete_many()
            .filter(screening::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movie::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn schedule(&self, movie_id: i32) -> AppResult<Vec<Slot>> {
        let rows = screening::Entity::find()
            .filter(screening::Column::MovieId.eq(movie_id))
            .order_by_asc(screening::Column::Date)
            .order_by_asc(screening::Column::Time)
            .all(&self.db)
            .await?;
        Ok(rows.iter().filter_map(Slot::from_row).collect())
    }

    /// Adds a screening, replacing the time and hall of one already on that date.
    pub async fn upsert_screening(&self, movie_id: i32, slot: &Slot) -> AppResult<()> {
        screening::Entity::insert(slot_model(movie_id, slot))
            .on_conflict(slot_conflict())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn delete_screening(&self, movie_id: i32, date: &str) -> AppResult<bool> {
        let res = screening::Entity::delete_many()
            .filter(screening::Column::MovieId.eq(movie_id))
            .filter(screening::Column::Date.eq(date))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Persists a new reservation. A second row with the same ticket id is a conflict.
    pub async fn insert_reservation(
        &self,
        model: reservation::ActiveModel,
    ) -> AppResult<reservation::Model> {
        match model.insert(&self.db).await {
            Ok(created) => Ok(created),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(duplicate_ticket()),
                _ => Err(err.into()),
            },
        }
    }

    pub async fn get_reservation(&self, id: &str) -> AppResult<Option<reservation::Model>> {
        Ok(reservation::Entity::find_by_id(id.to_string()).one(&self.db).await?)
    }

    pub async fn list_reservations(
        &self,
        rtype: ReservationType,
    ) -> AppResult<Vec<reservation::Model>> {
        Ok(reservation::Entity::find()
            .filter(reservation::Column::Rtype.eq(rtype.as_code()))
            .order_by_asc(reservation::Column::CreatedAt)
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn reservations_for_movie(
        &self,
        movie_id: i32,
    ) -> AppResult<Vec<reservation::Model>> {
        Ok(reservation::Entity::find()
            .filter(reservation::Column::MovieId.eq(movie_id))
            .order_by_asc(reservation::Column::Date)
            .order_by_asc(reservation::Column::CreatedAt)
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn latest_reservations(&self, limit: u64) -> AppResult<Vec<reservation::Model>> {
        Ok(reservation::Entity::find()
            .order_by_desc(reservation::Column::CreatedAt)
            .order_by_desc(reservation::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn status_counts(&self) -> AppResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for status in Status::ALL {
            let n = reservation::Entity::find()
                .filter(reservation::Column::Status.eq(status.as_code()))
                .count(&self.db)
                .await?;
            match status {
                Status::Confirmed => counts.confirmed = n,
                Status::Pending => counts.pending = n,
                Status::Rejected => counts.rejected = n,
            }
        }
        counts.total = reservation::Entity::find().count(&self.db).await?;
        Ok(counts)
    }

    pub async fn movie_summaries(&self) -> AppResult<Vec<MovieSummary>> {
        let mut out = Vec::new();
        for movie in self.list_movies().await? {
            let reservations = reservation::Entity::find()
                .filter(reservation::Column::MovieId.eq(movie.id))
                .count(&self.db)
                .await?;
            let screenings = screening::Entity::find()
                .filter(screening::Column::MovieId.eq(movie.id))
                .count(&self.db)
                .await?;
            out.push(MovieSummary { movie, reservations, screenings });
        }
        Ok(out)
    }

    /// Returns whether a row was removed. Unknown ids are a no-op.
    pub async fn delete_reservation(&self, id: &str) -> AppResult<bool> {
        let res = reservation::Entity::delete_by_id(id.to_string()).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn set_status(&self, id: &str, status: Status) -> AppResult<reservation::Model> {
        let existing = self
            .get_reservation(id)
            .await?
            .ok_or_else(|| AppError::not_found("reservation", id))?;
        let mut model: reservation::ActiveModel = existing.into();
        model.status = Set(status.as_code().to_string());
        Ok(model.update(&self.db).await?)
    }
}

pub(crate) fn duplicate_ticket() -> AppError {
    AppError::Conflict(
        "a reservation for this date and student number already exists".to_string(),
    )
}

fn slot_model(movie_id: i32, slot: &Slot) -> screening::ActiveModel {
    screening::ActiveModel {
        id: Default::default(),
        movie_id: Set(movie_id),
        date: Set(slot.date.to_string()),
        time: Set(slot.time_label()),
        hall: Set(slot.hall.clone()),
    }
}

fn slot_conflict() -> sea_orm::sea_query::OnConflict {
    sea_orm::sea_query::OnConflict::columns([screening::Column::MovieId, screening::Column::Date])
        .update_columns([screening::Column::Time, screening::Column::Hall])
        .to_owned()
}

pub fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
pub(crate) async fn memory_store() -> Store {
    let db = crate::db::connect_and_migrate("sqlite::memory:", 1).await.unwrap();
    Store::new(db)
}
