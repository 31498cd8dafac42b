use sea_orm_migration::{
  prelude::*,
  schema::{binary, string, timestamp_with_time_zone, uuid},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Embedding::Table)
          .if_not_exists()
          .col(uuid(Embedding::Id).primary_key())
          .col(string(Embedding::TargetType).not_null())
          .col(uuid(Embedding::TargetId).not_null())
          .col(string(Embedding::Model).not_null())
          .col(binary(Embedding::Vector).not_null())
          .col(string(Embedding::ContentHash).not_null())
          .col(string(Embedding::SourceText).not_null())
          .col(
            timestamp_with_time_zone(Embedding::CreatedAt)
              .not_null()
              .default(Expr::current_timestamp()),
          )
          .col(
            timestamp_with_time_zone(Embedding::UpdatedAt)
              .not_null()
              .default(Expr::current_timestamp()),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_embedding_target_model")
          .table(Embedding::Table)
          .col(Embedding::TargetType)
          .col(Embedding::TargetId)
          .col(Embedding::Model)
          .unique()
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Embedding::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Embedding {
  Table,
  Id,
  TargetType,
  TargetId,
  Model,
  Vector,
  ContentHash,
  SourceText,
  CreatedAt,
  UpdatedAt,
}
