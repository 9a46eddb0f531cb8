use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservation::Table)
                    .if_not_exists()
                    .col(string(Reservation::Id).primary_key())
                    .col(string(Reservation::Type))
                    .col(integer(Reservation::MovieId))
                    .col(string(Reservation::MovieTitle))
                    .col(string(Reservation::Date))
                    .col(string(Reservation::Time))
                    .col(string(Reservation::Hall))
                    .col(string(Reservation::StudentId))
                    .col(string(Reservation::StudentName))
                    .col(string_null(Reservation::GroupName))
                    .col(integer_null(Reservation::GroupSize))
                    .col(string_null(Reservation::TeacherName))
                    .col(string_null(Reservation::ClassInfo))
                    .col(string(Reservation::Status))
                    .col(big_integer(Reservation::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_type_created")
                    .table(Reservation::Table)
                    .col(Reservation::Type)
                    .col(Reservation::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_movie")
                    .table(Reservation::Table)
                    .col(Reservation::MovieId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Reservation::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Reservation {
    Table,
    Id,
    Type,
    MovieId,
    MovieTitle,
    Date,
    Time,
    Hall,
    StudentId,
    StudentName,
    GroupName,
    GroupSize,
    TeacherName,
    ClassInfo,
    Status,
    CreatedAt,
}
