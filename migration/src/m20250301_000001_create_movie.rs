use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(string(Movie::Title))
                    .col(string(Movie::Genre))
                    .col(string(Movie::Rating))
                    .col(integer(Movie::Duration))
                    .col(string_null(Movie::Poster))
                    .col(big_integer(Movie::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Screening::Table)
                    .if_not_exists()
                    .col(pk_auto(Screening::Id))
                    .col(integer(Screening::MovieId))
                    .col(string(Screening::Date))
                    .col(string(Screening::Time))
                    .col(string(Screening::Hall))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_screening_movie")
                            .from(Screening::Table, Screening::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_screening_movie_date_unique")
                    .table(Screening::Table)
                    .col(Screening::MovieId)
                    .col(Screening::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Screening::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    Title,
    Genre,
    Rating,
    Duration,
    Poster,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Screening {
    Table,
    Id,
    MovieId,
    Date,
    Time,
    Hall,
}
