mod common;

use actix_web::{test, App};
use academics::{app::configure, Security};
use chrono::{DateTime, Utc};
use serde_json::json;

fn ts(v: &serde_json::Value) -> DateTime<Utc> {
    v.as_str().unwrap().parse().unwrap()
}

#[actix_web::test]
async fn index_says_hello() {
    let app = test::init_service(
        App::new().configure(|cfg| configure(cfg, common::state(), Security::default()))
    ).await;
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(test::read_body(resp).await, "Hello");
}

#[actix_web::test]
async fn subject_crud_flow() {
    let app = test::init_service(
        App::new().configure(|cfg| configure(cfg, common::state(), Security::default()))
    ).await;

    // list starts empty
    let req = test::TestRequest::get().uri("/api/subjects").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(common::json(resp).await.as_array().unwrap().len(), 0);

    // parent department
    let req = test::TestRequest::post()
        .uri("/api/departments")
        .set_json(json!({"code": "CS", "name": "Computer Science"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let dept = common::json(resp).await;
    let dept_id = dept["id"].as_i64().unwrap();

    // create subject
    let req = test::TestRequest::post()
        .uri("/api/subjects")
        .set_json(json!({
            "departmentId": dept_id,
            "name": "Database Design",
            "code": "CS201",
            "description": "Relational modelling"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created = common::json(resp).await;
    assert_eq!(created["departmentId"].as_i64(), Some(dept_id));
    assert_eq!(created["code"], "CS201");
    let id = created["id"].as_i64().unwrap();

    // fetch by id
    let req = test::TestRequest::get().uri(&format!("/api/subjects/{id}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(common::json(resp).await["name"], "Database Design");

    // trailing slash lists too
    let req = test::TestRequest::get().uri("/api/subjects/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(common::json(resp).await.as_array().unwrap().len(), 1);

    // update
    let req = test::TestRequest::put()
        .uri(&format!("/api/subjects/{id}"))
        .set_json(json!({"name": "Databases"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let updated = common::json(resp).await;
    assert_eq!(updated["name"], "Databases");
    assert_eq!(updated["code"], "CS201");
    assert!(ts(&updated["updatedAt"]) > ts(&created["updatedAt"]));
    assert_eq!(ts(&updated["createdAt"]), ts(&created["createdAt"]));

    // delete
    let req = test::TestRequest::delete().uri(&format!("/api/subjects/{id}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    let req = test::TestRequest::get().uri(&format!("/api/subjects/{id}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(common::json(resp).await["error"], "not found");
}

#[actix_web::test]
async fn create_subject_validation_and_constraints() {
    let app = test::init_service(
        App::new().configure(|cfg| configure(cfg, common::state(), Security::default()))
    ).await;

    let req = test::TestRequest::post()
        .uri("/api/departments")
        .set_json(json!({"code": "CS", "name": "Computer Science"}))
        .to_request();
    let dept = common::json(test::call_service(&app, req).await).await;
    let dept_id = dept["id"].as_i64().unwrap();

    // missing required field
    let req = test::TestRequest::post()
        .uri("/api/subjects")
        .set_json(json!({"departmentId": dept_id, "name": "No code"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(common::json(resp).await["error"].as_str().unwrap().contains("code"));

    // blank name
    let req = test::TestRequest::post()
        .uri("/api/subjects")
        .set_json(json!({"departmentId": dept_id, "name": "   ", "code": "CS100"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // malformed JSON
    let req = test::TestRequest::post()
        .uri("/api/subjects")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(common::json(resp).await.get("error").is_some());

    // unknown department
    let req = test::TestRequest::post()
        .uri("/api/subjects")
        .set_json(json!({"departmentId": 9999, "name": "Orphan", "code": "XX1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(common::json(resp).await["error"], "department does not exist");

    // duplicate code
    for expected in [201, 409] {
        let req = test::TestRequest::post()
            .uri("/api/subjects")
            .set_json(json!({"departmentId": dept_id, "name": "Algorithms", "code": "CS301"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);
    }
}

#[actix_web::test]
async fn update_and_lookup_errors() {
    let app = test::init_service(
        App::new().configure(|cfg| configure(cfg, common::state(), Security::default()))
    ).await;

    let req = test::TestRequest::get().uri("/api/subjects/not-a-number").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::put()
        .uri("/api/subjects/1")
        .set_json(json!({"name": "Ghost"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::put()
        .uri("/api/subjects/1")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::delete().uri("/api/subjects/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn update_rejects_taken_code_and_unknown_department() {
    let app = test::init_service(
        App::new().configure(|cfg| configure(cfg, common::state(), Security::default()))
    ).await;

    let req = test::TestRequest::post()
        .uri("/api/departments")
        .set_json(json!({"code": "CS", "name": "Computer Science"}))
        .to_request();
    let dept_id = common::json(test::call_service(&app, req).await).await["id"].as_i64().unwrap();

    let mut ids = Vec::new();
    for code in ["CS101", "CS102"] {
        let req = test::TestRequest::post()
            .uri("/api/subjects")
            .set_json(json!({"departmentId": dept_id, "name": "Programming", "code": code}))
            .to_request();
        ids.push(common::json(test::call_service(&app, req).await).await["id"].as_i64().unwrap());
    }

    let req = test::TestRequest::put()
        .uri(&format!("/api/subjects/{}", ids[1]))
        .set_json(json!({"code": "CS101"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    assert!(common::json(resp).await.get("error").is_some());

    let req = test::TestRequest::put()
        .uri(&format!("/api/subjects/{}", ids[1]))
        .set_json(json!({"departmentId": 9999}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(common::json(resp).await["error"], "department does not exist");

    // neither failed update changed the row
    let req = test::TestRequest::get().uri(&format!("/api/subjects/{}", ids[1])).to_request();
    let subject = common::json(test::call_service(&app, req).await).await;
    assert_eq!(subject["code"], "CS102");
    assert_eq!(subject["departmentId"].as_i64(), Some(dept_id));
}

#[actix_web::test]
async fn list_filters_by_department_and_search() {
    let app = test::init_service(
        App::new().configure(|cfg| configure(cfg, common::state(), Security::default()))
    ).await;

    let mut dept_ids = Vec::new();
    for (code, name) in [("CS", "Computer Science"), ("MA", "Mathematics")] {
        let req = test::TestRequest::post()
            .uri("/api/departments")
            .set_json(json!({"code": code, "name": name}))
            .to_request();
        dept_ids.push(common::json(test::call_service(&app, req).await).await["id"].as_i64().unwrap());
    }
    for (dept, code, name) in [
        (dept_ids[0], "CS101", "Intro to Programming"),
        (dept_ids[0], "CS201", "Database Design"),
        (dept_ids[1], "MA101", "Calculus"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/subjects")
            .set_json(json!({"departmentId": dept, "name": name, "code": code}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/subjects?departmentId={}", dept_ids[1]))
        .to_request();
    let list = common::json(test::call_service(&app, req).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["code"], "MA101");

    let req = test::TestRequest::get().uri("/api/subjects?search=database").to_request();
    let list = common::json(test::call_service(&app, req).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["code"], "CS201");

    let req = test::TestRequest::get().uri("/api/subjects?limit=2&offset=2").to_request();
    let list = common::json(test::call_service(&app, req).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri("/api/subjects?limit=1000").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/api/subjects?departmentId=abc").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}
