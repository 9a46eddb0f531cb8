use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reservation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_name = "type")]
    pub rtype: String,
    pub movie_id: i32,
    pub movie_title: String,
    pub date: String,
    pub time: String,
    pub hall: String,
    pub student_id: String,
    pub student_name: String,
    pub group_name: Option<String>,
    pub group_size: Option<i32>,
    pub teacher_name: Option<String>,
    pub class_info: Option<String>,
    pub status: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
