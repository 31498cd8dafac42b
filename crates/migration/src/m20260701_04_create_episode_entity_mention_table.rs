use sea_orm_migration::{
  prelude::*,
  schema::{integer, string, timestamp_with_time_zone, uuid},
};

use crate::m20260701_01_create_entity_table::Entity as EntityTable;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(EpisodeEntityMention::Table)
          .if_not_exists()
          .col(uuid(EpisodeEntityMention::Id).primary_key())
          .col(string(EpisodeEntityMention::EpisodeId).not_null())
          .col(string(EpisodeEntityMention::ChannelId).not_null())
          .col(uuid(EpisodeEntityMention::EntityId).not_null())
          .col(integer(EpisodeEntityMention::MentionCount).not_null().default(1))
          .col(
            timestamp_with_time_zone(EpisodeEntityMention::CreatedAt)
              .not_null()
              .default(Expr::current_timestamp()),
          )
          .col(
            timestamp_with_time_zone(EpisodeEntityMention::UpdatedAt)
              .not_null()
              .default(Expr::current_timestamp()),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_episode_entity_mention_entity")
              .from(EpisodeEntityMention::Table, EpisodeEntityMention::EntityId)
              .to(EntityTable::Table, EntityTable::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    // The idempotency check: has this episode already mentioned this entity?
    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_episode_entity_mention_unique")
          .table(EpisodeEntityMention::Table)
          .col(EpisodeEntityMention::EpisodeId)
          .col(EpisodeEntityMention::EntityId)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_episode_entity_mention_episode")
          .table(EpisodeEntityMention::Table)
          .col(EpisodeEntityMention::EpisodeId)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(EpisodeEntityMention::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum EpisodeEntityMention {
  Table,
  Id,
  EpisodeId,
  ChannelId,
  EntityId,
  MentionCount,
  CreatedAt,
  UpdatedAt,
}
