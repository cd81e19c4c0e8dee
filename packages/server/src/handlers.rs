//! HTTP handler functions for the violation map API.

use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use actix_web::{HttpResponse, web};
use cpa_map_cluster::{ClusterThreshold, cluster_records, clusters_to_geojson};
use cpa_map_dataset::{DatasetError, ViolationReport, ViolationStore, ViolationUpdate};
use cpa_map_filter::{RecordFilter, ViolationSummary, distinct_types, find_by_barcode};
use cpa_map_server_models::{
    ApiError, ApiHealth, ApiViolationType, ClusterQueryParams, ClustersResponse,
    LanguageQueryParams, PriceQueryParams, ViolationFilterParams, ViolationQueryParams,
};
use serde_json::Value;

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/violations`
///
/// Returns the records passing the type, date, status and search filters,
/// in storage order.
pub async fn violations(
    state: web::Data<AppState>,
    params: web::Query<ViolationQueryParams>,
) -> HttpResponse {
    let filter = match ViolationFilterParams::from(&*params).to_filter() {
        Ok(filter) => filter,
        Err(e) => return bad_request(&e),
    };
    let store = match read_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    HttpResponse::Ok().json(filter.apply(store.records()))
}

/// `GET /api/violations/{id}`
pub async fn violation(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    let store = match read_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    store.get(id).map_or_else(
        || dataset_error(&DatasetError::NotFound(id)),
        |record| HttpResponse::Ok().json(record),
    )
}

/// `POST /api/violations`
///
/// Accepts a public report and stores it as a pending violation.
pub async fn submit_report(
    state: web::Data<AppState>,
    body: web::Json<ViolationReport>,
) -> HttpResponse {
    let report = body.into_inner();
    match commit(&state, |store| store.submit_report(report).cloned()) {
        Ok(record) => HttpResponse::Created().json(record),
        Err(response) => response,
    }
}

/// `PUT /api/violations/{id}`
///
/// Replaces every field of an existing violation, keeping its id and
/// position.
pub async fn update_violation(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ViolationUpdate>,
) -> HttpResponse {
    let record = body.into_inner().into_record(path.into_inner());
    let updated = record.clone();

    match commit(&state, |store| store.update(updated)) {
        Ok(()) => HttpResponse::Ok().json(record),
        Err(response) => response,
    }
}

/// `DELETE /api/violations/{id}`
pub async fn delete_violation(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    match commit(&state, |store| store.remove(id)) {
        Ok(removed) => HttpResponse::Ok().json(removed),
        Err(response) => response,
    }
}

/// `GET /api/audit-log`
///
/// Report and admin changes since the server started, newest first.
pub async fn audit_log(state: web::Data<AppState>) -> HttpResponse {
    let store = match read_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    HttpResponse::Ok().json(store.audit_log())
}

/// `GET /api/violation-types`
///
/// Lists the types that occur in the data, in first-seen order, with
/// labels in the requested language.
pub async fn violation_types(
    state: web::Data<AppState>,
    params: web::Query<LanguageQueryParams>,
) -> HttpResponse {
    let language = params.lang.unwrap_or_default();
    let store = match read_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    let types: Vec<ApiViolationType> = distinct_types(store.records())
        .into_iter()
        .map(|t| ApiViolationType::new(t, language))
        .collect();

    HttpResponse::Ok().json(types)
}

/// `GET /api/summary`
///
/// Counts the filtered records by review state.
pub async fn summary(
    state: web::Data<AppState>,
    params: web::Query<ViolationQueryParams>,
) -> HttpResponse {
    let filter = match ViolationFilterParams::from(&*params).to_filter() {
        Ok(filter) => filter,
        Err(e) => return bad_request(&e),
    };
    let store = match read_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    let filtered = filter.apply(store.records());
    HttpResponse::Ok().json(ViolationSummary::from_records(filtered.iter().copied()))
}

/// `GET /api/clusters`
///
/// Filters the records, then groups the survivors by proximity.
pub async fn clusters(
    state: web::Data<AppState>,
    params: web::Query<ClusterQueryParams>,
) -> HttpResponse {
    let (filter, threshold) = match cluster_request(&state, &params) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let store = match read_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    let filtered = filter.apply(store.records());
    let clusters = cluster_records(&filtered, threshold);

    HttpResponse::Ok().json(ClustersResponse {
        threshold: threshold.degrees(),
        record_count: filtered.len(),
        clusters,
    })
}

/// `GET /api/clusters/geojson`
///
/// Same as [`clusters`], rendered as a `GeoJSON` `FeatureCollection`.
/// Singleton features additionally carry the record's type and marker
/// color so the map can draw a typed pin.
pub async fn clusters_geojson(
    state: web::Data<AppState>,
    params: web::Query<ClusterQueryParams>,
) -> HttpResponse {
    let (filter, threshold) = match cluster_request(&state, &params) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let store = match read_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    let filtered = filter.apply(store.records());
    let clusters = cluster_records(&filtered, threshold);
    let mut collection = clusters_to_geojson(&clusters);

    for (feature, cluster) in collection.features.iter_mut().zip(&clusters) {
        if !cluster.is_singleton() {
            continue;
        }
        if let (Some(record), Some(properties)) =
            (cluster.members.first(), feature.properties.as_mut())
        {
            properties.insert(
                "violationType".to_string(),
                Value::from(record.violation_type.to_string()),
            );
            properties.insert(
                "markerColor".to_string(),
                Value::from(record.violation_type.marker_color()),
            );
        }
    }

    HttpResponse::Ok().json(collection)
}

/// `GET /api/prices`
pub async fn prices(
    state: web::Data<AppState>,
    params: web::Query<PriceQueryParams>,
) -> HttpResponse {
    match params.to_filter() {
        Ok(filter) => HttpResponse::Ok().json(filter.apply(&state.prices.items)),
        Err(e) => bad_request(&e),
    }
}

/// `GET /api/prices/barcode/{code}`
pub async fn price_by_barcode(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let code = path.into_inner();
    find_by_barcode(&state.prices.items, &code).map_or_else(
        || {
            HttpResponse::NotFound().json(ApiError::new(format!(
                "No price list entry for barcode {code}"
            )))
        },
        |item| HttpResponse::Ok().json(item),
    )
}

/// `GET /api/price-categories`
pub async fn price_categories(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.prices.categories)
}

/// Parses the filter and threshold shared by both cluster endpoints.
/// A missing threshold falls back to the configured default.
fn cluster_request(
    state: &AppState,
    params: &ClusterQueryParams,
) -> Result<(cpa_map_filter::ViolationFilter, ClusterThreshold), HttpResponse> {
    let filter = ViolationFilterParams::from(params)
        .to_filter()
        .map_err(|e| bad_request(&e))?;
    let threshold = params
        .threshold
        .map_or(Ok(state.config.cluster_threshold), ClusterThreshold::new)
        .map_err(|e| bad_request(&e))?;
    Ok((filter, threshold))
}

/// Applies `change` to a copy of the store and persists it. The live store
/// is replaced only once the save succeeds.
fn commit<T>(
    state: &AppState,
    change: impl FnOnce(&mut ViolationStore) -> Result<T, DatasetError>,
) -> Result<T, HttpResponse> {
    let mut store = write_store(state)?;
    let mut next = store.clone();

    let value = change(&mut next).map_err(|e| dataset_error(&e))?;
    next.save().map_err(|e| dataset_error(&e))?;

    *store = next;
    Ok(value)
}

fn read_store(state: &AppState) -> Result<RwLockReadGuard<'_, ViolationStore>, HttpResponse> {
    state.store.read().map_err(|_| {
        log::error!("Violation store lock poisoned");
        internal_error()
    })
}

fn write_store(state: &AppState) -> Result<RwLockWriteGuard<'_, ViolationStore>, HttpResponse> {
    state.store.write().map_err(|_| {
        log::error!("Violation store lock poisoned");
        internal_error()
    })
}

fn bad_request(e: &dyn std::error::Error) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ApiError::new("Failed to access violation store"))
}

fn dataset_error(e: &DatasetError) -> HttpResponse {
    match e {
        DatasetError::NotFound(_) => HttpResponse::NotFound().json(ApiError::new(e.to_string())),
        DatasetError::InvalidLocation(_) | DatasetError::DuplicateId(_) => bad_request(e),
        DatasetError::Io { .. } | DatasetError::Json { .. } => {
            log::error!("Failed to persist violations: {e}");
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use actix_web::{App, http::StatusCode, test};
    use cpa_map_config::MapConfig;
    use cpa_map_dataset::{bundled_prices, bundled_violations};
    use cpa_map_price_models::{PriceCategory, PriceItem};
    use serde_json::json;

    use super::*;
    use crate::configure;

    fn state() -> web::Data<AppState> {
        let store = ViolationStore::in_memory(bundled_violations()).unwrap();
        web::Data::new(AppState::new(store, bundled_prices(), MapConfig::default()))
    }

    fn ids(body: &Value) -> Vec<i64> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect()
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
    }

    #[actix_web::test]
    async fn unfiltered_list_returns_everything_in_order() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/violations").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[actix_web::test]
    async fn list_applies_type_and_date_filters() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/violations?type=PRICE_MANIPULATION")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec![1, 4, 6]);

        let req = test::TestRequest::get()
            .uri("/api/violations?from=2024-05-14&to=2024-05-15")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec![1, 2]);

        let req = test::TestRequest::get()
            .uri("/api/violations?date=2024-05-16")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec![3, 4]);
    }

    #[actix_web::test]
    async fn invalid_filter_values_are_bad_requests() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;

        for uri in [
            "/api/violations?from=14-05-2024",
            "/api/violations?type=SMUGGLING",
            "/api/clusters?threshold=0",
            "/api/clusters?threshold=abc",
            "/api/prices?category=food",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body: Value = test::read_body_json(resp).await;
            assert!(body["error"].is_string(), "{uri}");
        }
    }

    #[actix_web::test]
    async fn clusters_group_nearby_records() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/clusters").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["recordCount"], 7);
        let clusters = body["clusters"].as_array().unwrap();
        let groups: Vec<(String, u64)> = clusters
            .iter()
            .map(|c| {
                (
                    c["id"].as_str().unwrap().to_string(),
                    c["count"].as_u64().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            groups,
            vec![
                ("cluster-1".to_string(), 3),
                ("cluster-3".to_string(), 1),
                ("cluster-5".to_string(), 2),
                ("cluster-7".to_string(), 1),
            ]
        );
        assert_eq!(clusters[0]["members"][2]["id"], 4);
    }

    #[actix_web::test]
    async fn clusters_only_see_filtered_records() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/clusters?type=COMMERCIAL_FRAUD&threshold=0.01")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["threshold"], 0.01);
        assert_eq!(body["recordCount"], 2);
        assert_eq!(body["clusters"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn geojson_singletons_carry_marker_color() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/clusters/geojson")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["type"], "FeatureCollection");
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 4);
        assert_eq!(features[0]["properties"]["singleton"], false);
        assert!(features[0]["properties"].get("markerColor").is_none());
        assert_eq!(features[1]["properties"]["violationType"], "MONOPOLY");
        assert_eq!(features[1]["properties"]["markerColor"], "blue");
    }

    #[actix_web::test]
    async fn summary_counts_filtered_records() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/summary").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!({ "total": 7, "pending": 4, "verified": 2, "resolved": 1 })
        );

        let req = test::TestRequest::get()
            .uri("/api/summary?status=pending")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 4);
    }

    #[actix_web::test]
    async fn violation_types_use_requested_language() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/violation-types?lang=en")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let types: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["type"].as_str().unwrap())
            .collect();
        assert_eq!(
            types,
            vec!["PRICE_MANIPULATION", "COMMERCIAL_FRAUD", "MONOPOLY", "OTHER"]
        );
        assert_eq!(body[0]["markerColor"], "red");
    }

    #[actix_web::test]
    async fn report_then_edit_then_delete() {
        let state = state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/violations")
            .set_json(json!({
                "location": "13.5800, 44.0150",
                "violationType": "OTHER",
                "description": { "ar": "ميزان غير دقيق", "en": "Inaccurate scale" },
                "reportDate": "2024-06-01"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["id"], 8);
        assert_eq!(created["status"], "pending");

        let req = test::TestRequest::put()
            .uri("/api/violations/8")
            .set_json(json!({
                "lat": 13.5800,
                "lng": 44.0150,
                "violationType": "COMMERCIAL_FRAUD",
                "reportDate": "2024-06-01",
                "description": { "ar": "ميزان غير دقيق", "en": "Inaccurate scale" },
                "status": "verified"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            state.store.read().unwrap().get(8).unwrap().status.to_string(),
            "verified"
        );

        let req = test::TestRequest::delete()
            .uri("/api/violations/8")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/violations/8").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    fn blocked_data_dir(name: &str) -> (PathBuf, PathBuf) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let file = std::env::temp_dir().join(format!(
            "cpa_map_server_{name}_{}_{nanos}",
            std::process::id()
        ));
        std::fs::write(&file, b"").unwrap();
        let data_dir = file.join("data");
        (file, data_dir)
    }

    #[actix_web::test]
    async fn failed_save_leaves_store_unchanged() {
        let (file, data_dir) = blocked_data_dir("failed_save");
        let config = MapConfig {
            data_dir,
            ..MapConfig::default()
        };
        let state = web::Data::new(AppState::open(config).unwrap());
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/violations")
            .set_json(json!({
                "location": "13.5800, 44.0150",
                "violationType": "OTHER",
                "description": { "ar": "ميزان غير دقيق", "en": "Inaccurate scale" }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let req = test::TestRequest::get().uri("/api/violations/8").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri("/api/violations/1")
            .set_json(json!({
                "lat": 13.5783,
                "lng": 44.0135,
                "violationType": "PRICE_MANIPULATION",
                "reportDate": "2024-05-14",
                "description": { "ar": "", "en": "" },
                "status": "resolved"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let req = test::TestRequest::delete()
            .uri("/api/violations/1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let req = test::TestRequest::get().uri("/api/violations/1").to_request();
        let record: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(record["status"], "verified");
        assert_eq!(record["description"]["en"], bundled_violations()[0].description.en);

        let store = state.store.read().unwrap();
        assert_eq!(store.records(), bundled_violations().as_slice());
        assert!(store.audit_log().is_empty());
        drop(store);

        std::fs::remove_file(&file).unwrap();
    }

    #[actix_web::test]
    async fn edit_without_status_is_rejected() {
        let state = state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
        let req = test::TestRequest::put()
            .uri("/api/violations/1")
            .set_json(json!({
                "lat": 13.5783,
                "lng": 44.0135,
                "violationType": "PRICE_MANIPULATION",
                "reportDate": "2024-05-14",
                "description": { "ar": "", "en": "" }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            state.store.read().unwrap().get(1).unwrap().status.to_string(),
            "verified"
        );
    }

    #[actix_web::test]
    async fn audit_log_lists_admin_changes() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::delete()
            .uri("/api/violations/3")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/audit-log").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["action"], "deleted");
        assert_eq!(entries[0]["violationId"], 3);
        assert_eq!(entries[0]["label"], "حذف بلاغ");
    }

    #[actix_web::test]
    async fn report_with_bad_location_is_rejected() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/violations")
            .set_json(json!({
                "location": "somewhere in Taiz",
                "violationType": "OTHER",
                "description": { "ar": "", "en": "" }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn prices_filter_and_barcode_lookup() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/prices?category=1&q=rice")
            .to_request();
        let items: Vec<PriceItem> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, "F02");

        let req = test::TestRequest::get()
            .uri("/api/prices/barcode/89011234")
            .to_request();
        let item: PriceItem = test::call_and_read_body_json(&app, req).await;
        assert_eq!(item.code, "M01");

        let req = test::TestRequest::get()
            .uri("/api/prices/barcode/00000000")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn price_categories_are_listed() {
        let app =
            test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/price-categories")
            .to_request();
        let categories: Vec<PriceCategory> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].name.en, "Medicines");
    }
}
