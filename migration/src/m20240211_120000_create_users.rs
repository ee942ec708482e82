use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users created by a provider flow carry no password.
        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS social_connect.users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                username VARCHAR(254) NOT NULL,
                email VARCHAR(75) NOT NULL,
                first_name VARCHAR(30) NOT NULL DEFAULT '',
                last_name VARCHAR(30) NOT NULL DEFAULT '',
                password VARCHAR,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE social_connect.users OWNER TO social")
            .await?;

        // Lookups by username and email ignore case.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_lower_username
                 ON social_connect.users(LOWER(username))",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_users_lower_email
                 ON social_connect.users(LOWER(email))",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS social_connect.users")
            .await?;

        Ok(())
    }
}
