use attendance_portal::{
    error::ApiError,
    models::{CreateClassGroupRequest, CreateCourseRequest, CreateProgrammeRequest, Role, UpdateCourseRequest},
    repository::{NewUser, PostgresRepository, Repository},
};
use axum::http::StatusCode;
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the pool for a disposable database. Run with
/// `DATABASE_URL=... cargo test -- --ignored`.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

/// Codes are unique per run so the suite can be repeated against the same database.
fn unique_code(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase()
}

// --- Tests ---

#[tokio::test]
#[ignore]
#[serial]
async fn test_programme_catalog_round_trip() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let code = unique_code("bsc");

    let programme = repo
        .create_programme(CreateProgrammeRequest {
            code: code.clone(),
            name: "Computer Science".to_string(),
            department: "Computing".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(programme.code, code);

    let duplicate = repo
        .create_programme(CreateProgrammeRequest {
            code: code.to_lowercase(),
            name: "Duplicate".to_string(),
            department: "Computing".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(duplicate).status_code(), StatusCode::CONFLICT);

    let group = repo
        .create_class_group(CreateClassGroupRequest {
            programme_id: programme.id,
            name: "Year 1".to_string(),
            year_of_study: 1,
        })
        .await
        .unwrap();
    let course = repo
        .create_course(CreateCourseRequest {
            code: unique_code("csc"),
            title: "Programming I".to_string(),
            programme_id: programme.id,
            credit_hours: 3,
        })
        .await
        .unwrap();

    let updated = repo
        .update_course(course.id, UpdateCourseRequest { title: None, credit_hours: Some(4) })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.credit_hours, 4);
    assert_eq!(updated.title, "Programming I");

    assert!(repo.delete_programme(programme.id).await.unwrap());
    assert!(repo.get_class_group(group.id).await.unwrap().is_none());
    assert!(repo.get_course(course.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_user_email_is_unique_and_fk_checked() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = Uuid::new_v4();
    let email = format!("{id}@university.edu");

    let user = repo
        .create_user(NewUser {
            id,
            email: email.clone(),
            full_name: "Integration Lecturer".to_string(),
            role: Role::Lecturer,
            programme_id: None,
            class_group_id: None,
        })
        .await
        .unwrap();
    assert!(user.is_active);

    let clash = repo
        .create_user(NewUser {
            id: Uuid::new_v4(),
            email: email.to_uppercase(),
            full_name: "Someone Else".to_string(),
            role: Role::Lecturer,
            programme_id: None,
            class_group_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(clash).status_code(), StatusCode::CONFLICT);

    let dangling = repo
        .create_user(NewUser {
            id: Uuid::new_v4(),
            email: format!("{}@university.edu", Uuid::new_v4()),
            full_name: "Orphan Rep".to_string(),
            role: Role::ClassRep,
            programme_id: None,
            class_group_id: Some(Uuid::new_v4()),
        })
        .await
        .unwrap_err();
    assert_eq!(
        ApiError::from(dangling).status_code(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}
