use super::*;

#[test]
fn bytes_to_hex_encodes_lowercase_pairs() {
    assert_eq!(bytes_to_hex(&[0x00, 0xff, 0x0a]), "00ff0a");
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn generate_token_shape() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn generate_token_is_unique() {
    assert_ne!(generate_token(), generate_token());
}

#[test]
fn session_user_serializes_expected_fields() {
    let user = SessionUser { id: Uuid::nil(), name: "ada".into(), email: Some("ada@example.com".into()) };
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["name"], "ada");
    assert_eq!(json["email"], "ada@example.com");
    assert!(json["id"].is_string());
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;

    async fn live_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for live-db-tests");
        crate::db::init_pool(&url).await.expect("live db init")
    }

    async fn seed_user(pool: &PgPool) -> Uuid {
        sqlx::query_scalar("INSERT INTO users (name) VALUES ('session-test') RETURNING id")
            .fetch_one(pool)
            .await
            .expect("seed user")
    }

    #[tokio::test]
    async fn create_validate_delete_session_round_trip() {
        let pool = live_pool().await;
        let user_id = seed_user(&pool).await;

        let token = create_session(&pool, user_id).await.unwrap();
        let user = validate_session(&pool, &token).await.unwrap().expect("valid session");
        assert_eq!(user.id, user_id);

        delete_session(&pool, &token).await.unwrap();
        assert!(validate_session(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn validate_rejects_unknown_token() {
        let pool = live_pool().await;
        assert!(validate_session(&pool, "not-a-token").await.unwrap().is_none());
    }
}
