use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE social_connect.provider AS ENUM
                 ('facebook', 'github', 'linkedin', 'twitter', 'paypal', 'moves_app')",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE social_connect.provider OWNER TO social")
            .await?;

        // A profile exists before the flow knows its user, so user_id starts out empty.
        // Deleting a user keeps the remote identity around, unlinked.
        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS social_connect.provider_profiles (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                provider social_connect.provider NOT NULL,
                user_id UUID REFERENCES social_connect.users(id) ON DELETE SET NULL,
                remote_uid VARCHAR(255) NOT NULL,

                access_token TEXT,
                access_token_secret TEXT,
                refresh_token TEXT,
                token_expires_at TIMESTAMPTZ,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                UNIQUE(provider, remote_uid)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE social_connect.provider_profiles OWNER TO social")
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_provider_profiles_user_provider
                 ON social_connect.provider_profiles(user_id, provider)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS social_connect.provider_profiles")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS social_connect.provider")
            .await?;

        Ok(())
    }
}
