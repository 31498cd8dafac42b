pub use sea_orm_migration::*;

mod m20260701_01_create_entity_table;
mod m20260701_02_create_alias_table;
mod m20260701_03_create_relationship_table;
mod m20260701_04_create_episode_entity_mention_table;
mod m20260701_05_create_episode_relationship_mention_table;
mod m20260701_06_create_merge_candidate_table;
mod m20260701_07_create_embedding_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260701_01_create_entity_table::Migration),
      Box::new(m20260701_02_create_alias_table::Migration),
      Box::new(m20260701_03_create_relationship_table::Migration),
      Box::new(m20260701_04_create_episode_entity_mention_table::Migration),
      Box::new(m20260701_05_create_episode_relationship_mention_table::Migration),
      Box::new(m20260701_06_create_merge_candidate_table::Migration),
      Box::new(m20260701_07_create_embedding_table::Migration),
    ]
  }
}
