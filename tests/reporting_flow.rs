mod common;

use anyhow::Result;
use axum::http::StatusCode;
use cleaning_backend::models::Role;
use common::{acquire_db_lock, id_at, TestApp};
use serde_json::json;
use uuid::Uuid;

/// Assigns, completes and admin-verifies a job; returns the assignment id.
async fn verified_job(
    app: &TestApp,
    admin: &str,
    maid_id: Uuid,
    maid: &str,
    salary: f64,
) -> Result<Uuid> {
    let address_id = app.create_address(admin, "basic").await?;
    let created = app
        .post_json(
            "/api/admin?action=assign",
            &json!({ "address_id": address_id, "maid_id": maid_id, "salary": salary }),
            Some(admin),
        )
        .await?;
    let assignment_id = id_at(&created.body["assignment"]["id"])?;

    for status in ["in_progress", "completed"] {
        let response = app
            .post_json(
                "/api/maid?action=update-status",
                &json!({ "assignment_id": assignment_id, "status": status }),
                Some(maid),
            )
            .await?;
        assert_eq!(response.status, StatusCode::OK);
    }

    let verified = app
        .post_json(
            "/api/admin?action=verify",
            &json!({ "assignment_id": assignment_id }),
            Some(admin),
        )
        .await?;
    assert_eq!(verified.status, StatusCode::OK);
    Ok(assignment_id)
}

#[tokio::test]
async fn payments_filter_by_paid_flag_and_date() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::try_new().await? else {
        return Ok(());
    };

    let (_, admin) = app
        .user_with_token("admin@example.com", "Ada", Role::Admin)
        .await?;
    let (maid_id, maid) = app
        .user_with_token("maid@example.com", "Mia", Role::Maid)
        .await?;

    let first = verified_job(&app, &admin, maid_id, &maid, 1000.0).await?;
    let second = verified_job(&app, &admin, maid_id, &maid, 1200.0).await?;

    let unfinished_address = app.create_address(&admin, "basic").await?;
    app.post_json(
        "/api/admin?action=assign",
        &json!({ "address_id": unfinished_address, "maid_id": maid_id }),
        Some(&admin),
    )
    .await?;

    let all = app.get("/api/admin?action=payments", Some(&admin)).await?;
    assert_eq!(all.status, StatusCode::OK);
    let rows = all.body["payments"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 2);
    // Newest completion first.
    assert_eq!(rows[0]["id"], second.to_string());
    assert_eq!(rows[1]["id"], first.to_string());
    assert_eq!(rows[0]["maid_name"], "Mia");
    assert_eq!(rows[0]["salary"].as_f64(), Some(1200.0));
    assert!(rows[0]["senior_cleaner_name"].is_null());

    let paid = app
        .post_json(
            "/api/admin?action=mark-paid",
            &json!({ "assignment_id": first }),
            Some(&admin),
        )
        .await?;
    assert_eq!(paid.status, StatusCode::OK);
    let paid_again = app
        .post_json(
            "/api/admin?action=mark-paid",
            &json!({ "assignment_id": first }),
            Some(&admin),
        )
        .await?;
    assert_eq!(paid_again.status, StatusCode::OK);

    let only_paid = app
        .get("/api/admin?action=payments&paid=true", Some(&admin))
        .await?;
    let rows = only_paid.body["payments"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], first.to_string());

    let only_unpaid = app
        .get("/api/admin?action=payments&paid=false", Some(&admin))
        .await?;
    let rows = only_unpaid.body["payments"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], second.to_string());

    let future = app
        .get("/api/admin?action=payments&date_from=2999-01-01", Some(&admin))
        .await?;
    assert_eq!(future.body["payments"], json!([]));

    let past = app
        .get(
            "/api/admin?action=payments&date_from=2000-01-01&date_to=2999-12-31",
            Some(&admin),
        )
        .await?;
    assert_eq!(past.body["payments"].as_array().map(Vec::len), Some(2));

    let malformed = app
        .get("/api/admin?action=payments&date_to=yesterday", Some(&admin))
        .await?;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let inverted = app
        .get(
            "/api/admin?action=payments&date_from=2025-02-01&date_to=2025-01-01",
            Some(&admin),
        )
        .await?;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);

    let stats = app
        .get("/api/admin?action=salary-stats", Some(&admin))
        .await?;
    assert_eq!(stats.body["total_paid"].as_f64(), Some(1000.0));

    let unverified = app
        .with_conn(move |conn| {
            use cleaning_backend::schema::assignments::dsl;
            use diesel::prelude::*;
            Ok(dsl::assignments
                .filter(dsl::address_id.eq(unfinished_address))
                .select(dsl::id)
                .first::<Uuid>(conn)?)
        })
        .await?;
    let not_payable = app
        .post_json(
            "/api/admin?action=mark-paid",
            &json!({ "assignment_id": unverified }),
            Some(&admin),
        )
        .await?;
    assert_eq!(not_payable.status, StatusCode::CONFLICT);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn salary_stats_list_every_worker() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::try_new().await? else {
        return Ok(());
    };

    let (_, admin) = app
        .user_with_token("admin@example.com", "Ada", Role::Admin)
        .await?;
    let (busy_id, busy) = app
        .user_with_token("busy@example.com", "Busy", Role::Maid)
        .await?;
    let (idle_id, _) = app
        .user_with_token("idle@example.com", "Idle", Role::Maid)
        .await?;
    let (senior_id, _) = app
        .user_with_token("senior@example.com", "Sam", Role::SeniorCleaner)
        .await?;

    verified_job(&app, &admin, busy_id, &busy, 900.0).await?;
    verified_job(&app, &admin, busy_id, &busy, 100.0).await?;

    let stats = app
        .get("/api/admin?action=salary-stats", Some(&admin))
        .await?;
    assert_eq!(stats.status, StatusCode::OK);
    let rows = stats.body["stats"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0]["worker_id"], busy_id.to_string());
    assert_eq!(rows[0]["total_earned"].as_f64(), Some(1000.0));
    assert_eq!(rows[0]["completed_count"], 2);
    assert_eq!(rows[0]["current_month_count"], 2);
    assert_eq!(rows[0]["current_month_earned"].as_f64(), Some(1000.0));

    for worker in [idle_id, senior_id] {
        let row = rows
            .iter()
            .find(|row| row["worker_id"] == worker.to_string())
            .cloned()
            .unwrap_or_default();
        assert_eq!(row["total_earned"].as_f64(), Some(0.0));
        assert_eq!(row["completed_count"], 0);
    }

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn admin_manages_addresses_and_workers() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::try_new().await? else {
        return Ok(());
    };

    let (_, admin) = app
        .user_with_token("admin@example.com", "Ada", Role::Admin)
        .await?;

    let worker = json!({
        "email": "new.maid@example.com",
        "password": "sparkle",
        "full_name": "Nina",
        "phone": "+1 555 0100",
        "role": "maid",
    });
    let created = app
        .post_json("/api/admin?action=workers", &worker, Some(&admin))
        .await?;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["worker"]["role"], "maid");
    assert!(created.body["worker"].get("password_hash").is_none());

    let duplicate = app
        .post_json("/api/admin?action=workers", &worker, Some(&admin))
        .await?;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let token = app.login_token("new.maid@example.com", "sparkle").await?;
    assert!(!token.is_empty());

    let maids = app
        .get("/api/admin?action=workers&role=maid", Some(&admin))
        .await?;
    assert_eq!(maids.body["workers"].as_array().map(Vec::len), Some(1));
    let legacy = app.get("/api/admin?action=maids", Some(&admin)).await?;
    assert_eq!(legacy.status, StatusCode::OK);
    assert_eq!(legacy.body["maids"][0]["email"], "new.maid@example.com");
    let defaulted = app
        .post_json(
            "/api/admin?action=maids",
            &json!({
                "email": "second.maid@example.com",
                "password": "sparkle",
                "full_name": "Olga",
            }),
            Some(&admin),
        )
        .await?;
    assert_eq!(defaulted.status, StatusCode::CREATED);
    assert_eq!(defaulted.body["worker"]["role"], "maid");

    let bad_role = app
        .get("/api/admin?action=workers&role=janitor", Some(&admin))
        .await?;
    assert_eq!(bad_role.status, StatusCode::BAD_REQUEST);

    let address_id = app.create_address(&admin, "office").await?;
    let updated = app
        .put_json(
            &format!("/api/admin?action=addresses&id={address_id}"),
            &json!({ "notes": "Key under the mat", "area": 120 }),
            Some(&admin),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["address"]["notes"], "Key under the mat");
    assert_eq!(updated.body["address"]["area"], 120);
    assert_eq!(updated.body["address"]["service_type"], "office");

    let bad_service = app
        .post_json(
            "/api/admin?action=addresses",
            &json!({
                "address": "1 Nowhere",
                "client_name": "Nobody",
                "client_phone": "",
                "service_type": "spring",
                "area": 10,
                "price": 10.0,
                "scheduled_date": "2025-01-01",
                "scheduled_time": "10:00:00",
            }),
            Some(&admin),
        )
        .await?;
    assert_eq!(bad_service.status, StatusCode::BAD_REQUEST);

    let deleted = app
        .delete(&format!("/api/admin?action=addresses&id={address_id}"), Some(&admin))
        .await?;
    assert_eq!(deleted.status, StatusCode::OK);
    let gone = app
        .delete(&format!("/api/admin?action=addresses&id={address_id}"), Some(&admin))
        .await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}
