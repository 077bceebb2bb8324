// tests/api.rs

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use carnaval_logistics::{
    build_router,
    config::{AppState, Settings},
};

fn app() -> Router {
    let state = AppState::in_memory(Settings::default()).unwrap();
    build_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, json_request(Method::POST, uri, body)).await
}

async fn create_plaza_mayor(app: &Router) -> i64 {
    let (status, body) = post(
        app,
        "/aforo/recintos",
        json!({ "nombre": "Plaza Mayor", "capacidad_maxima": 5000, "ubicacion": "Centro" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn venue_occupancy_flow() {
    let app = app();
    let id = create_plaza_mayor(&app).await;
    let movements = format!("/aforo/recintos/{}/movimientos", id);

    let (status, body) =
        post(&app, &movements, json!({ "tipo": "entrada", "cantidad": 4800 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tipo"], "entrada");
    assert_eq!(body["cantidad"], 4800);

    let (status, body) = send(&app, get(&format!("/aforo/recintos/{}/ocupacion", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ocupacion_actual"], 4800);
    assert_eq!(body["porcentaje_ocupacion"], 96.0);
    assert_eq!(body["estado"], "WARNING");

    let (status, body) =
        post(&app, &movements, json!({ "tipo": "entrada", "cantidad": 300 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "capacity_exceeded");
    assert_eq!(body["details"]["ocupacion_actual"], 4800);

    let (status, body) =
        post(&app, &movements, json!({ "tipo": "salida", "cantidad": 5000 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "negative_occupancy");

    let (_, list) = send(&app, get("/aforo/recintos")).await;
    assert_eq!(list[0]["nombre"], "Plaza Mayor");
    assert_eq!(list[0]["ocupacion_actual"], 4800);
    assert_eq!(list[0]["estado"], "WARNING");

    let (_, log) = send(&app, get(&movements)).await;
    assert_eq!(log.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn validation_errors_are_400() {
    let app = app();
    let (status, body) = post(
        &app,
        "/aforo/recintos",
        json!({ "nombre": "", "capacidad_maxima": 0, "ubicacion": "Centro" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    // Chaves de `details` com os nomes do JSON
    assert!(body["details"]["nombre"].is_array());
    assert!(body["details"]["capacidad_maxima"].is_array());
    assert!(body["details"]["name"].is_null());

    // Corpo malformado também vira `validation`
    let request = Request::builder()
        .method(Method::POST)
        .uri("/aforo/recintos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ nombre: "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let id = create_plaza_mayor(&app).await;
    let (status, body) = post(
        &app,
        &format!("/aforo/recintos/{}/movimientos", id),
        json!({ "tipo": "entrada", "cantidad": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn unknown_venue_is_404_with_localized_message() {
    let app = app();
    let (status, body) = send(&app, get("/aforo/recintos/404")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let request = Request::builder()
        .uri("/aforo/recintos/404")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .body(Body::empty())
        .unwrap();
    let (_, english) = send(&app, request).await;
    assert_eq!(english["error"], "Venue 404 not found.");
    assert_ne!(english["error"], body["error"]);
}

#[tokio::test]
async fn duplicate_cedula_is_409() {
    let app = app();
    let merchant = json!({
        "nombre": "Ana Pérez",
        "cedula": "123456789",
        "email": "ana@correo.com",
        "telefono": "3001234567"
    });
    let (status, body) = post(&app, "/permisos/comerciantes", merchant.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activo"], true);

    let (status, body) = post(&app, "/permisos/comerciantes", merchant).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (_, list) = send(&app, get("/permisos/comerciantes")).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

async fn merchant_and_stall(app: &Router) -> (i64, i64) {
    let (_, merchant) = post(
        app,
        "/permisos/comerciantes",
        json!({
            "nombre": "Ana Pérez",
            "cedula": "123456789",
            "email": "ana@correo.com",
            "telefono": "3001234567"
        }),
    )
    .await;
    let (_, stall) = post(
        app,
        "/permisos/puestos",
        json!({ "nombre": "Puesto 12", "descripcion": "Fritos", "ubicacion": "Vía 40" }),
    )
    .await;
    (merchant["id"].as_i64().unwrap(), stall["id"].as_i64().unwrap())
}

#[tokio::test]
async fn merchant_and_stall_lookup() {
    let app = app();
    let (merchant_id, stall_id) = merchant_and_stall(&app).await;

    let (status, list) = send(&app, get("/permisos/puestos")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, stall) = send(&app, get(&format!("/permisos/puestos/{}", stall_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stall["nombre"], "Puesto 12");

    let (status, body) = send(&app, get("/permisos/puestos/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let merchant_uri = format!("/permisos/comerciantes/{}", merchant_id);
    let (status, merchant) = send(&app, get(&merchant_uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merchant["cedula"], "123456789");

    let (status, body) = send(&app, get("/permisos/comerciantes/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn merchant_input_is_trimmed() {
    let app = app();
    let (merchant_id, _) = merchant_and_stall(&app).await;
    let merchant_uri = format!("/permisos/comerciantes/{}", merchant_id);

    let (status, merchant) = send(
        &app,
        json_request(Method::PATCH, &merchant_uri, json!({ "email": "  nueva@correo.com " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merchant["email"], "nueva@correo.com");

    let (status, body) = send(
        &app,
        json_request(Method::PATCH, &merchant_uri, json!({ "nombre": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["nombre"].is_array());
}

#[tokio::test]
async fn permit_workflow() {
    let app = app();
    let (merchant_id, stall_id) = merchant_and_stall(&app).await;

    let (status, permit) = post(
        &app,
        "/permisos/permisos",
        json!({
            "comerciante_id": merchant_id,
            "puesto_id": stall_id,
            "fecha_inicio": "2099-02-26",
            "fecha_fin": "2099-03-01"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(permit["estado"], "PENDING");
    let permit_uri = format!("/permisos/permisos/{}", permit["id"]);

    let (status, approved) = send(
        &app,
        json_request(Method::PATCH, &permit_uri, json!({ "estado": "APROBADO" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["estado"], "APPROVED");

    // Mesmo puesto, período cruzando o aprovado
    let (status, body) = post(
        &app,
        "/permisos/permisos",
        json!({
            "comerciante_id": merchant_id,
            "puesto_id": stall_id,
            "fecha_inicio": "2099-03-01",
            "fecha_fin": "2099-03-03"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "overlap");

    let (status, _) = send(
        &app,
        json_request(Method::PATCH, &permit_uri, json!({ "estado": "CANCELLED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        json_request(Method::PATCH, &permit_uri, json!({ "estado": "APPROVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");

    let (_, list) = send(&app, get("/permisos/permisos")).await;
    assert_eq!(list[0]["estado"], "CANCELLED");
    assert_eq!(list[0]["comerciante_id"], merchant_id);
}

#[tokio::test]
async fn permit_with_unknown_references_is_404() {
    let app = app();
    let (status, body) = post(
        &app,
        "/permisos/permisos",
        json!({
            "comerciante_id": 11,
            "puesto_id": 12,
            "fecha_inicio": "2099-02-26",
            "fecha_fin": "2099-03-01"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn idempotency_key_replays_movement() {
    let app = app();
    let id = create_plaza_mayor(&app).await;
    let uri = format!("/aforo/recintos/{}/movimientos", id);
    let key = "2f1b6c1e-8d8a-4c55-9d39-0c4f8e1f6a10";

    let request = || {
        Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("Idempotency-Key", key)
            .body(Body::from(json!({ "tipo": "entrada", "cantidad": 10 }).to_string()))
            .unwrap()
    };

    let (first_status, first) = send(&app, request()).await;
    let (second_status, second) = send(&app, request()).await;
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);

    let (_, report) = send(&app, get(&format!("/aforo/recintos/{}/ocupacion", id))).await;
    assert_eq!(report["ocupacion_actual"], 10);

    // Mesma chave em outra rota
    let (status, body) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/permisos/permisos")
            .header(header::CONTENT_TYPE, "application/json")
            .header("Idempotency-Key", key)
            .body(Body::from(
                json!({
                    "comerciante_id": 1,
                    "puesto_id": 1,
                    "fecha_inicio": "2099-02-26",
                    "fecha_fin": "2099-03-01"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn invalid_idempotency_key_is_400() {
    let app = app();
    let id = create_plaza_mayor(&app).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/aforo/recintos/{}/movimientos", id))
        .header(header::CONTENT_TYPE, "application/json")
        .header("Idempotency-Key", "not-a-uuid")
        .body(Body::from(json!({ "tipo": "entrada", "cantidad": 1 }).to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, body) = send(&app(), get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/aforo/recintos"].is_object());
}
