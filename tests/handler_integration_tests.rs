mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use std::sync::Arc;
use traffic_portal::{
    MemoryRepository,
    models::{Role, RuleStatus},
    repository::Repository,
};
use uuid::Uuid;

// --- Approval workflow ---

#[tokio::test]
async fn test_approve_user_sets_flag_and_timestamp() {
    let repo = Arc::new(MemoryRepository::new());
    let reviewer = admin();
    let applicant = pending_rmv_admin("pending@rmv.lk");
    repo.insert_user(reviewer.clone()).await;
    repo.insert_user(applicant.clone()).await;

    let (status, _, body) = send(
        test_app(&repo),
        json_request(
            "POST",
            "/api/admin/approve-user",
            Some(&token_for(&reviewer)),
            json!({ "userId": applicant.id, "approved": true }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User approved successfully");

    let stored = repo.get_user(applicant.id).await.unwrap().unwrap();
    assert!(stored.is_approved);
    assert!(stored.approved_at.is_some());
}

#[tokio::test]
async fn test_reject_user_removes_record() {
    let repo = Arc::new(MemoryRepository::new());
    let reviewer = admin();
    let applicant = pending_rmv_admin("reject-me@rmv.lk");
    repo.insert_user(reviewer.clone()).await;
    repo.insert_user(applicant.clone()).await;

    let (status, _, body) = send(
        test_app(&repo),
        json_request(
            "POST",
            "/api/admin/approve-user",
            Some(&token_for(&reviewer)),
            json!({ "userId": applicant.id, "approved": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User rejected and removed");

    // The status lookup no longer finds the email.
    let (status, _, body) = send(
        test_app(&repo),
        json_request("POST", "/api/user/status", None, json!({ "email": "reject-me@rmv.lk" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "exists": false, "user": null }));
}

#[tokio::test]
async fn test_approve_user_without_user_id_is_bad_request() {
    let repo = Arc::new(MemoryRepository::new());
    let reviewer = admin();
    let applicant = pending_rmv_admin("untouched@rmv.lk");
    repo.insert_user(reviewer.clone()).await;
    repo.insert_user(applicant.clone()).await;

    let (status, _, _) = send(
        test_app(&repo),
        json_request(
            "POST",
            "/api/admin/approve-user",
            Some(&token_for(&reviewer)),
            json!({ "approved": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No mutation happened.
    let stored = repo.get_user(applicant.id).await.unwrap().unwrap();
    assert!(!stored.is_approved);
    assert!(stored.approved_at.is_none());
}

#[tokio::test]
async fn test_approve_user_rejects_non_boolean_decision() {
    let repo = Arc::new(MemoryRepository::new());
    let reviewer = admin();
    let applicant = pending_rmv_admin("strict@rmv.lk");
    repo.insert_user(reviewer.clone()).await;
    repo.insert_user(applicant.clone()).await;

    for decision in [json!("true"), json!(1), json!(null)] {
        let (status, _, _) = send(
            test_app(&repo),
            json_request(
                "POST",
                "/api/admin/approve-user",
                Some(&token_for(&reviewer)),
                json!({ "userId": applicant.id, "approved": decision }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "decision {decision}");
    }

    assert!(repo.get_user(applicant.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_approve_unknown_user_is_not_found() {
    let repo = Arc::new(MemoryRepository::new());
    let reviewer = admin();
    repo.insert_user(reviewer.clone()).await;

    for approved in [true, false] {
        let (status, _, body) = send(
            test_app(&repo),
            json_request(
                "POST",
                "/api/admin/approve-user",
                Some(&token_for(&reviewer)),
                json!({ "userId": Uuid::new_v4(), "approved": approved }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }
}

#[tokio::test]
async fn test_decisions_on_non_pending_accounts_are_not_found() {
    let repo = Arc::new(MemoryRepository::new());
    let reviewer = admin();
    let other_admin = user("second-admin@rmv.lk", Role::Admin, false, true);
    let mut approved_editor = user("approved-editor@rmv.lk", Role::RmvAdmin, true, true);
    approved_editor.approved_at = Some(chrono::Utc::now() - chrono::Duration::days(3));
    repo.insert_user(reviewer.clone()).await;
    repo.insert_user(other_admin.clone()).await;
    repo.insert_user(approved_editor.clone()).await;

    // Rejecting an active account, or the reviewer's own, deletes nothing.
    for target in [other_admin.id, reviewer.id, approved_editor.id] {
        let (status, _, body) = send(
            test_app(&repo),
            json_request(
                "POST",
                "/api/admin/approve-user",
                Some(&token_for(&reviewer)),
                json!({ "userId": target, "approved": false }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
        assert!(repo.get_user(target).await.unwrap().is_some());
    }

    // Re-approving keeps the original approval timestamp.
    let (status, _, _) = send(
        test_app(&repo),
        json_request(
            "POST",
            "/api/admin/approve-user",
            Some(&token_for(&reviewer)),
            json!({ "userId": approved_editor.id, "approved": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let stored = repo.get_user(approved_editor.id).await.unwrap().unwrap();
    assert_eq!(stored.approved_at, approved_editor.approved_at);
}

#[tokio::test]
async fn test_approval_requires_approved_admin() {
    let repo = Arc::new(MemoryRepository::new());
    let applicant = pending_rmv_admin("queue@rmv.lk");
    let editor = user("editor@rmv.lk", Role::RmvAdmin, true, true);
    repo.insert_user(applicant.clone()).await;
    repo.insert_user(editor.clone()).await;

    let body = json!({ "userId": applicant.id, "approved": true });

    let (status, _, _) = send(
        test_app(&repo),
        json_request("POST", "/api/admin/approve-user", None, body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A pending account cannot approve itself.
    let (status, _, _) = send(
        test_app(&repo),
        json_request("POST", "/api/admin/approve-user", Some(&token_for(&applicant)), body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Rule editors do not review accounts.
    let (status, _, _) = send(
        test_app(&repo),
        json_request("POST", "/api/admin/approve-user", Some(&token_for(&editor)), body),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(!repo.get_user(applicant.id).await.unwrap().unwrap().is_approved);
}

#[tokio::test]
async fn test_pending_users_lists_restricted_projection() {
    let repo = Arc::new(MemoryRepository::new());
    let reviewer = admin();
    let mut older = pending_rmv_admin("older@rmv.lk");
    older.created_at = older.created_at - chrono::Duration::hours(2);
    let newer = pending_rmv_admin("newer@rmv.lk");
    let approved = user("done@rmv.lk", Role::RmvAdmin, true, true);
    repo.insert_user(reviewer.clone()).await;
    repo.insert_user(older.clone()).await;
    repo.insert_user(newer.clone()).await;
    repo.insert_user(approved).await;

    let (status, _, body) = send(
        test_app(&repo),
        empty_request("GET", "/api/admin/pending-users", Some(&token_for(&reviewer))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let pending = body["pendingUsers"].as_array().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0]["email"], "older@rmv.lk");
    assert_eq!(pending[1]["email"], "newer@rmv.lk");
    assert_eq!(pending[0]["role"], "rmvAdmin");
    assert_eq!(pending[0]["district"], "Colombo");
    assert!(pending[0].get("createdAt").is_some());
    assert!(pending[0].get("isApproved").is_none());
}

// --- Rules ---

#[tokio::test]
async fn test_get_all_rules_hides_inactive_and_orders_newest_first() {
    let repo = Arc::new(MemoryRepository::new());
    repo.insert_rule(rule("101", RuleStatus::Active, 30)).await;
    repo.insert_rule(rule("102", RuleStatus::Inactive, 20)).await;
    repo.insert_rule(rule("103", RuleStatus::Active, 10)).await;

    let (status, _, body) = send(
        test_app(&repo),
        empty_request("GET", "/api/other/rules/getAllRules", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Rules fetched successfully");
    let rules = body["rules"].as_array().unwrap();
    let sections: Vec<&str> = rules.iter().map(|r| r["section"].as_str().unwrap()).collect();
    assert_eq!(sections, vec!["103", "101"]);
    assert!(rules.iter().all(|r| r["status"] == "active"));
}

#[tokio::test]
async fn test_delete_missing_rule_is_not_found_and_leaves_rules() {
    let repo = Arc::new(MemoryRepository::new());
    let editor = admin();
    repo.insert_user(editor.clone()).await;
    repo.insert_rule(rule("201", RuleStatus::Active, 5)).await;

    let (status, _, body) = send(
        test_app(&repo),
        empty_request(
            "DELETE",
            &format!("/api/other/rules/deleteRule/{}", Uuid::new_v4()),
            Some(&token_for(&editor)),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Rule not found");
    assert_eq!(repo.rule_count().await, 1);
}

#[tokio::test]
async fn test_delete_rule_removes_it() {
    let repo = Arc::new(MemoryRepository::new());
    let editor = user("editor@rmv.lk", Role::RmvAdmin, true, true);
    repo.insert_user(editor.clone()).await;
    let existing = rule("202", RuleStatus::Active, 5);
    repo.insert_rule(existing.clone()).await;

    let (status, _, body) = send(
        test_app(&repo),
        empty_request(
            "DELETE",
            &format!("/api/other/rules/deleteRule/{}", existing.id),
            Some(&token_for(&editor)),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Rule deleted successfully");
    assert_eq!(repo.rule_count().await, 0);
}

#[tokio::test]
async fn test_delete_rule_with_malformed_id_is_bad_request() {
    let repo = Arc::new(MemoryRepository::new());
    let editor = admin();
    repo.insert_user(editor.clone()).await;

    let (status, _, _) = send(
        test_app(&repo),
        empty_request(
            "DELETE",
            "/api/other/rules/deleteRule/not-a-uuid",
            Some(&token_for(&editor)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rule_trims_section_and_records_author() {
    let repo = Arc::new(MemoryRepository::new());
    let editor = admin();
    repo.insert_user(editor.clone()).await;

    let (status, _, body) = send(
        test_app(&repo),
        json_request(
            "POST",
            "/api/other/rules/createRule",
            Some(&token_for(&editor)),
            json!({
                "section": "  148(1)  ",
                "provision": "Driving without a licence",
                "fine": "Rs. 3000",
                "points": 4
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["rule"]["section"], "148(1)");
    assert_eq!(body["rule"]["status"], "active");
    assert_eq!(body["rule"]["createdBy"], editor.id.to_string());
}

#[tokio::test]
async fn test_create_rule_validates_points_and_duplicates() {
    let repo = Arc::new(MemoryRepository::new());
    let editor = admin();
    repo.insert_user(editor.clone()).await;
    repo.insert_rule(rule("300", RuleStatus::Active, 1)).await;
    let token = token_for(&editor);

    let (status, _, _) = send(
        test_app(&repo),
        json_request(
            "POST",
            "/api/other/rules/createRule",
            Some(&token),
            json!({ "section": "301", "provision": "p", "fine": "f", "points": 11 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(
        test_app(&repo),
        json_request(
            "POST",
            "/api/other/rules/createRule",
            Some(&token),
            json!({ "section": " 300 ", "provision": "p", "fine": "f", "points": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("300"));
    assert_eq!(repo.rule_count().await, 1);
}

#[tokio::test]
async fn test_update_rule_status_flip_hides_rule() {
    let repo = Arc::new(MemoryRepository::new());
    let editor = admin();
    repo.insert_user(editor.clone()).await;
    let existing = rule("400", RuleStatus::Active, 1);
    repo.insert_rule(existing.clone()).await;

    let (status, _, body) = send(
        test_app(&repo),
        json_request(
            "PUT",
            &format!("/api/other/rules/updateRule/{}", existing.id),
            Some(&token_for(&editor)),
            json!({ "status": "inactive" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rule"]["status"], "inactive");
    assert_eq!(body["rule"]["provision"], existing.provision);

    let (_, _, body) = send(
        test_app(&repo),
        empty_request("GET", "/api/other/rules/getAllRules", None),
    )
    .await;
    assert!(body["rules"].as_array().unwrap().is_empty());
    // Soft delete keeps the row.
    assert!(repo.get_rule(existing.id).await.is_some());
}

#[tokio::test]
async fn test_update_missing_rule_is_not_found() {
    let repo = Arc::new(MemoryRepository::new());
    let editor = admin();
    repo.insert_user(editor.clone()).await;

    let (status, _, _) = send(
        test_app(&repo),
        json_request(
            "PUT",
            &format!("/api/other/rules/updateRule/{}", Uuid::new_v4()),
            Some(&token_for(&editor)),
            json!({ "points": 3 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rule_mutations_need_approved_editor() {
    let repo = Arc::new(MemoryRepository::new());
    let citizen = user("citizen@example.com", Role::User, false, false);
    let pending = pending_rmv_admin("waiting@rmv.lk");
    repo.insert_user(citizen.clone()).await;
    repo.insert_user(pending.clone()).await;
    let existing = rule("500", RuleStatus::Active, 1);
    repo.insert_rule(existing.clone()).await;

    for who in [&citizen, &pending] {
        let (status, _, _) = send(
            test_app(&repo),
            empty_request(
                "DELETE",
                &format!("/api/other/rules/deleteRule/{}", existing.id),
                Some(&token_for(who)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
    assert_eq!(repo.rule_count().await, 1);
}

// --- User status ---

#[tokio::test]
async fn test_user_status_unknown_email() {
    let repo = Arc::new(MemoryRepository::new());

    let (status, _, body) = send(
        test_app(&repo),
        json_request("POST", "/api/user/status", None, json!({ "email": "a@b.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "exists": false, "user": null }));
}

#[tokio::test]
async fn test_user_status_known_email() {
    let repo = Arc::new(MemoryRepository::new());
    let applicant = pending_rmv_admin("known@rmv.lk");
    repo.insert_user(applicant.clone()).await;

    let (status, _, body) = send(
        test_app(&repo),
        json_request("POST", "/api/user/status", None, json!({ "email": "known@rmv.lk" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
    assert_eq!(body["user"]["id"], applicant.id.to_string());
    assert_eq!(body["user"]["needsApproval"], true);
    assert_eq!(body["user"]["isApproved"], false);
}

#[tokio::test]
async fn test_user_status_requires_email() {
    let repo = Arc::new(MemoryRepository::new());

    for body in [json!({}), json!({ "email": "  " })] {
        let (status, _, response) = send(
            test_app(&repo),
            json_request("POST", "/api/user/status", None, body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Email is required");
    }
}

// --- Store failures ---

#[tokio::test]
async fn test_store_outage_surfaces_generic_500() {
    let repo = Arc::new(MemoryRepository::new());
    repo.set_unavailable(true);

    let (status, _, body) = send(
        test_app(&repo),
        empty_request("GET", "/api/other/rules/getAllRules", None),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal server error" }));

    let (status, _, body) = send(
        test_app(&repo),
        json_request("POST", "/api/user/status", None, json!({ "email": "a@b.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_store_outage_on_approval_routes_surfaces_generic_500() {
    let repo = Arc::new(MemoryRepository::new());
    let reviewer = admin();
    let applicant = pending_rmv_admin("outage@rmv.lk");
    repo.insert_user(reviewer.clone()).await;
    repo.insert_user(applicant.clone()).await;
    let token = token_for(&reviewer);

    repo.set_unavailable(true);

    let (status, _, body) = send(
        test_app(&repo),
        empty_request("GET", "/api/admin/pending-users", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal server error" }));

    for approved in [true, false] {
        let (status, _, body) = send(
            test_app(&repo),
            json_request(
                "POST",
                "/api/admin/approve-user",
                Some(&token),
                json!({ "userId": applicant.id, "approved": approved }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "message": "Internal server error" }));
    }

    // Nothing was decided while the store was down.
    repo.set_unavailable(false);
    let stored = repo.get_user(applicant.id).await.unwrap().unwrap();
    assert!(!stored.is_approved);
    assert!(stored.approved_at.is_none());
}
