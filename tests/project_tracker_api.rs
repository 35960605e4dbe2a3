use axum::Router;
use axum::http::StatusCode;
use serde_json::{Value, json};
use test_util::{app, call, prepare_db_and_test};


async fn create_user(router: &Router, name: &str, email: &str) -> i64 {
    let (status, body) = call(
        router,
        "POST",
        "/users",
        Some(json!({"name": name, "email": email})),
    )
    .await;
    assert_eq!(StatusCode::CREATED, status, "{body}");
    body["id"].as_i64().expect("user id")
}

async fn create_project(router: &Router, name: &str, manager_id: i64) -> i64 {
    let (status, body) = call(
        router,
        "POST",
        "/projects",
        Some(json!({
            "name": name,
            "estimated_budget": 1000.0,
            "actual_expenditure": 250.0,
            "status": "in_progress",
            "manager_id": manager_id,
        })),
    )
    .await;
    assert_eq!(StatusCode::CREATED, status, "{body}");
    body["id"].as_i64().expect("project id")
}

fn task_body(title: &str, project_id: i64, assignee_id: i64, due_date: &str) -> Value {
    json!({
        "title": title,
        "project_id": project_id,
        "assignee_id": assignee_id,
        "due_date": due_date,
        "priority": "high",
        "status": "pending",
        "estimated_hours": 4.5,
    })
}

async fn create_task(router: &Router, body: Value) -> Value {
    let (status, created) = call(router, "POST", "/tasks", Some(body)).await;
    assert_eq!(StatusCode::CREATED, status, "{created}");
    created
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn created_task_is_returned_with_relations() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;

        let created = create_task(
            &router,
            task_body("Design homepage", project_id, user_id, "2030-01-10"),
        )
        .await;
        assert_eq!("Web Redesign", created["project"]["name"]);
        assert_eq!("Jane Doe", created["assignee"]["name"]);

        let task_uri = format!("/tasks/{}", created["id"]);
        let (status, fetched) = call(&router, "GET", &task_uri, None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(created, fetched);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn unknown_priority_is_rejected() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;

        let mut body = task_body("Design homepage", project_id, user_id, "2030-01-10");
        body["priority"] = json!("urgent");
        let (status, response) = call(&router, "POST", "/tasks", Some(body)).await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert!(response["errors"]["priority"].is_array());

        let (_, tasks) = call(&router, "GET", "/tasks", None).await;
        assert_eq!(json!([]), tasks);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn duplicate_email_is_rejected() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        create_user(&router, "Jane Doe", "jane@example.com").await;

        let (status, response) = call(
            &router,
            "POST",
            "/users",
            Some(json!({"name": "Jane Again", "email": "jane@example.com"})),
        )
        .await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!(
            json!(["The email has already been taken."]),
            response["errors"]["email"]
        );
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn repeated_status_update_is_idempotent() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;
        let created = create_task(
            &router,
            task_body("Design homepage", project_id, user_id, "2030-01-10"),
        )
        .await;
        let task_uri = format!("/tasks/{}", created["id"]);

        let (first_status, first) = call(
            &router,
            "PATCH",
            &task_uri,
            Some(json!({"status": "completed"})),
        )
        .await;
        let (second_status, second) = call(
            &router,
            "PATCH",
            &task_uri,
            Some(json!({"status": "completed"})),
        )
        .await;

        assert_eq!(StatusCode::OK, first_status);
        assert_eq!(StatusCode::OK, second_status);
        assert_eq!("completed", second["status"]);
        assert_eq!(first["title"], second["title"]);
        assert_eq!(first["due_date"], second["due_date"]);
        assert_eq!(created["priority"], second["priority"]);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn tasks_sort_by_due_date_descending() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;
        for (title, due_date) in [
            ("Middle", "2030-02-01"),
            ("Earliest", "2030-01-01"),
            ("Latest", "2030-03-01"),
        ] {
            create_task(&router, task_body(title, project_id, user_id, due_date)).await;
        }

        let (status, tasks) = call(
            &router,
            "GET",
            "/tasks?sort_by=due_date&sort_direction=desc",
            None,
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        let titles: Vec<&str> = tasks
            .as_array()
            .expect("task list")
            .iter()
            .filter_map(|task| task["title"].as_str())
            .collect();
        assert_eq!(vec!["Latest", "Middle", "Earliest"], titles);

        let (_, project_tasks) = call(
            &router,
            "GET",
            &format!("/projects/{project_id}/tasks?sort_direction=asc"),
            None,
        )
        .await;
        assert_eq!("Earliest", project_tasks[0]["title"]);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn deleting_project_removes_its_tasks() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;
        let created = create_task(
            &router,
            task_body("Design homepage", project_id, user_id, "2030-01-10"),
        )
        .await;

        let (status, response) =
            call(&router, "DELETE", &format!("/projects/{project_id}"), None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("Project deleted successfully", response["message"]);

        let (status, response) =
            call(&router, "GET", &format!("/tasks/{}", created["id"]), None).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("Task not found", response["message"]);

        let (_, tasks) = call(&router, "GET", "/tasks", None).await;
        assert_eq!(json!([]), tasks);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn deleting_user_unassigns_their_work() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let manager_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", manager_id).await;
        let created = create_task(
            &router,
            task_body("Design homepage", project_id, manager_id, "2030-01-10"),
        )
        .await;

        let (status, _) = call(&router, "DELETE", &format!("/users/{manager_id}"), None).await;
        assert_eq!(StatusCode::OK, status);

        let (_, task) = call(&router, "GET", &format!("/tasks/{}", created["id"]), None).await;
        assert_eq!(Value::Null, task["assignee_id"]);
        assert_eq!(Value::Null, task["assignee"]);

        let (_, project) = call(&router, "GET", &format!("/projects/{project_id}"), None).await;
        assert_eq!(Value::Null, project["manager_id"]);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn deleting_missing_records_is_not_found() {
    prepare_db_and_test(|db| async move {
        let router = app(db);

        for (uri, message) in [
            ("/tasks/999", "Task not found"),
            ("/projects/999", "Project not found"),
            ("/users/999", "User not found"),
        ] {
            let (status, response) = call(&router, "DELETE", uri, None).await;
            assert_eq!(StatusCode::NOT_FOUND, status, "{uri}");
            assert_eq!(message, response["message"], "{uri}");
        }
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn dashboard_reflects_stored_data() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;
        create_task(
            &router,
            task_body("Upcoming", project_id, user_id, "2099-01-10"),
        )
        .await;
        let mut done = task_body("Done", project_id, user_id, "2099-02-10");
        done["status"] = json!("completed");
        create_task(&router, done).await;

        let (status, stats) = call(&router, "GET", "/dashboard/stats", None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(
            json!({
                "total_projects": 1,
                "active_projects": 1,
                "total_tasks": 2,
                "completed_tasks": 1,
                "total_team_members": 1,
                "budget_utilization": 25.0,
            }),
            stats
        );

        let (_, upcoming) = call(&router, "GET", "/dashboard/upcoming-tasks", None).await;
        let titles: Vec<&str> = upcoming
            .as_array()
            .expect("task list")
            .iter()
            .filter_map(|task| task["title"].as_str())
            .collect();
        assert_eq!(vec!["Upcoming"], titles);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn budget_keeps_cents_exact() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let (status, created) = call(
            &router,
            "POST",
            "/projects",
            Some(json!({
                "name": "Cents",
                "estimated_budget": "100.00",
                "actual_expenditure": 100.10,
            })),
        )
        .await;
        assert_eq!(StatusCode::CREATED, status, "{created}");
        assert_eq!(json!("100.00"), created["estimated_budget"]);
        assert_eq!(json!("100.10"), created["actual_expenditure"]);

        let budget_uri = format!("/projects/{}/budget", created["id"]);
        let (status, budget) = call(&router, "GET", &budget_uri, None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!("-0.10"), budget["variance"]);
        assert_eq!(json!(0.1), budget["variance_percentage"]);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn budget_beyond_column_limit_is_rejected() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let (status, body) = call(
            &router,
            "POST",
            "/projects",
            Some(json!({"name": "Too big", "estimated_budget": 10_000_000_000.0_f64})),
        )
        .await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status, "{body}");
        assert_eq!(
            json!(["The estimated budget must not be greater than 9999999999.99."]),
            body["errors"]["estimated_budget"]
        );

        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;
        let (status, body) = call(
            &router,
            "PATCH",
            &format!("/projects/{project_id}"),
            Some(json!({"actual_expenditure": "99999999999.00"})),
        )
        .await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status, "{body}");
        assert!(body["errors"]["actual_expenditure"].is_array());
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn time_entries_follow_their_task() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;
        let task = create_task(
            &router,
            task_body("Design homepage", project_id, user_id, "2030-01-10"),
        )
        .await;
        let entries_uri = format!("/tasks/{}/time-entries", task["id"]);

        let (status, logged) = call(
            &router,
            "POST",
            &entries_uri,
            Some(json!({
                "description": "Wireframes",
                "start_time": "2030-01-02T09:00:00Z",
                "end_time": "2030-01-02T10:30:00Z",
            })),
        )
        .await;
        assert_eq!(StatusCode::CREATED, status, "{logged}");
        assert_eq!(90, logged["duration"]);

        let (status, running) = call(
            &router,
            "POST",
            &entries_uri,
            Some(json!({"start_time": "2030-01-03T09:00:00Z"})),
        )
        .await;
        assert_eq!(StatusCode::CREATED, status, "{running}");
        assert_eq!(Value::Null, running["duration"]);

        let running_uri = format!("{entries_uri}/{}", running["id"]);
        let (status, stopped) = call(
            &router,
            "PATCH",
            &running_uri,
            Some(json!({"end_time": "2030-01-03T09:45:00Z"})),
        )
        .await;
        assert_eq!(StatusCode::OK, status, "{stopped}");
        assert_eq!(45, stopped["duration"]);

        let (status, backwards) = call(
            &router,
            "PATCH",
            &running_uri,
            Some(json!({"end_time": "2030-01-03T08:00:00Z"})),
        )
        .await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert!(backwards["errors"]["end_time"].is_array());

        let (_, entries) = call(&router, "GET", &entries_uri, None).await;
        let ids: Vec<&Value> = entries
            .as_array()
            .expect("entries should be an array")
            .iter()
            .map(|entry| &entry["id"])
            .collect();
        assert_eq!(vec![&running["id"], &logged["id"]], ids);

        let (status, _) = call(&router, "DELETE", &format!("/tasks/{}", task["id"]), None).await;
        assert_eq!(StatusCode::OK, status);
        let (status, missing) = call(&router, "GET", &entries_uri, None).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("Task not found", missing["message"]);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn risks_issues_are_filtered_and_cleaned_up() {
    prepare_db_and_test(|db| async move {
        let router = app(db);
        let user_id = create_user(&router, "Jane Doe", "jane@example.com").await;
        let project_id = create_project(&router, "Web Redesign", user_id).await;
        let other_project_id = create_project(&router, "Mobile App", user_id).await;

        let (status, risk) = call(
            &router,
            "POST",
            "/risks-issues",
            Some(json!({
                "project_id": project_id,
                "title": "Vendor may miss the launch date",
                "severity": "high",
                "assigned_to": user_id,
                "due_date": "",
            })),
        )
        .await;
        assert_eq!(StatusCode::CREATED, status, "{risk}");
        assert_eq!("risk", risk["type"]);
        assert_eq!("open", risk["status"]);

        let (status, issue) = call(
            &router,
            "POST",
            "/risks-issues",
            Some(json!({
                "project_id": other_project_id,
                "title": "Staging server is down",
                "type": "issue",
                "severity": "critical",
            })),
        )
        .await;
        assert_eq!(StatusCode::CREATED, status, "{issue}");

        let (_, issues) = call(&router, "GET", "/risks-issues?type=issue", None).await;
        assert_eq!(json!([issue]), issues);
        let (status, _) = call(&router, "GET", "/risks-issues?status=escalated", None).await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);

        let (status, unknown_owner) = call(
            &router,
            "PATCH",
            &format!("/risks-issues/{}", risk["id"]),
            Some(json!({"assigned_to": 9999})),
        )
        .await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert!(unknown_owner["errors"]["assigned_to"].is_array());

        let (status, _) = call(&router, "DELETE", &format!("/users/{user_id}"), None).await;
        assert_eq!(StatusCode::OK, status);
        let (_, orphaned) = call(&router, "GET", &format!("/risks-issues/{}", risk["id"]), None).await;
        assert_eq!(Value::Null, orphaned["assigned_to"]);

        let (status, _) = call(
            &router,
            "DELETE",
            &format!("/projects/{other_project_id}"),
            None,
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        let (status, gone) = call(&router, "GET", &format!("/risks-issues/{}", issue["id"]), None).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("Risk or issue not found", gone["message"]);
    });
}
