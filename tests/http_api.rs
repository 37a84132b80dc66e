use actix_web::{http::StatusCode, test, web, App};
use serde_json::Value;

use fs_blobstore::api;
use fs_blobstore::app_state::AppState;

fn app_state(dir: &tempfile::TempDir) -> web::Data<AppState> {
    let state = AppState::new_for_testing(&dir.path().to_string_lossy()).expect("Failed to build app state");
    web::Data::new(state)
}

#[actix_web::test]
async fn test_container_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(&dir)).configure(api::configure)).await;

    let req = test::TestRequest::put().uri("/photos").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::put().uri("/photos").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri("/photos")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["containers"], serde_json::json!(["photos"]));

    let req = test::TestRequest::delete().uri("/photos").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri("/photos")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_put_get_blob_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(&dir)).configure(api::configure)).await;

    let req = test::TestRequest::put().uri("/docs").to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::put()
        .uri("/docs/notes/today.txt")
        .insert_header(("content-type", "text/plain"))
        .insert_header(("x-amz-meta-author", "sam"))
        .set_payload("hello world")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let etag = resp.headers().get("etag").unwrap().to_str().unwrap().to_string();
    assert_eq!(etag, format!("\"{}\"", hex::encode(md5::compute(b"hello world").0)));

    let req = test::TestRequest::get().uri("/docs/notes/today.txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/plain");
    assert_eq!(resp.headers().get("x-amz-meta-author").unwrap(), "sam");
    assert_eq!(resp.headers().get("etag").unwrap().to_str().unwrap(), etag);
    let body = test::read_body(resp).await;
    assert_eq!(body.as_ref(), b"hello world");

    let req = test::TestRequest::get().uri("/docs").to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["keys"], serde_json::json!(["notes/", "notes/today.txt"]));
    assert_eq!(listing["count"], 2);
}

#[actix_web::test]
async fn test_ranged_get_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(&dir)).configure(api::configure)).await;

    test::call_service(&app, test::TestRequest::put().uri("/data").to_request()).await;
    let req = test::TestRequest::put()
        .uri("/data/digits")
        .set_payload("0123456789")
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/data/digits")
        .insert_header(("range", "bytes=3-6"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers().get("content-range").unwrap(), "bytes 3-6/10");
    assert_eq!(test::read_body(resp).await.as_ref(), b"3456");

    let req = test::TestRequest::get()
        .uri("/data/digits")
        .insert_header(("range", "bytes=50-"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::RANGE_NOT_SATISFIABLE
    );

    let req = test::TestRequest::delete().uri("/data/digits").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::delete().uri("/data/digits").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri("/data/digits").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_error_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(&dir)).configure(api::configure)).await;

    let req = test::TestRequest::put()
        .uri("/missing/key")
        .set_payload("x")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("missing"));

    let req = test::TestRequest::put().uri("/CON").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/missing").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_directory_blob_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(&dir)).configure(api::configure)).await;

    test::call_service(&app, test::TestRequest::put().uri("/tree").to_request()).await;
    let req = test::TestRequest::put().uri("/tree/folder/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/tree/folder/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").unwrap(), "application/x-directory");

    let req = test::TestRequest::get().uri("/tree/folder").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_short_body_against_declared_length_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(app_state(&dir)).configure(api::configure)).await;

    test::call_service(&app, test::TestRequest::put().uri("/data").to_request()).await;
    let req = test::TestRequest::put()
        .uri("/data/short")
        .set_payload("0123456789")
        .insert_header(("content-length", "20"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("20"));

    let req = test::TestRequest::get().uri("/data/short").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    let req = test::TestRequest::get().uri("/data").to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["count"], 0);
}
