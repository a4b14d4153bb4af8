// routes.rs - Router assembly
//
// Public → Protected (jwt_auth_middleware) → Elevated (jwt + require_admin)
// Rate limiting covers everything under /api; CORS, body limit and request
// tracing wrap the whole app.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, rate_limit_middleware, require_admin_middleware};

pub fn app() -> Router {
    let api = Router::new()
        .merge(public_api_routes())
        .merge(protected_routes())
        .merge(elevated_routes())
        .layer(from_fn(rate_limit_middleware));

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(api)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config::config().api.max_request_size_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn public_api_routes() -> Router {
    Router::new().route("/api/auth/login", post(public::login_post))
}

fn protected_routes() -> Router {
    use protected::{auth, export, kegiatan, laporan, reference, report};

    Router::new()
        // Session
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/auth/password", put(auth::password_put))
        // Report rows
        .route("/api/laporan", get(laporan::laporan_list).post(laporan::laporan_post))
        .route("/api/laporan/summary", get(laporan::laporan_summary))
        .route("/api/laporan/bulk", post(laporan::laporan_bulk_post))
        .route("/api/laporan/submit", post(laporan::laporan_submit_post))
        .route(
            "/api/laporan/:id",
            get(laporan::laporan_get)
                .put(laporan::laporan_put)
                .delete(laporan::laporan_delete),
        )
        // Form lookups
        .route("/api/reference/bulan", get(reference::bulan_get))
        .route("/api/reference/satuan", get(reference::satuan_get))
        .route("/api/reference/sumber-anggaran", get(reference::sumber_anggaran_get))
        .route("/api/reference/sub-kegiatan", get(reference::sub_kegiatan_get))
        .route("/api/reference/kegiatan", get(reference::kegiatan_get))
        .route("/api/reference/puskesmas", get(reference::puskesmas_get))
        // Kegiatan reads
        .route("/api/kegiatan", get(kegiatan::kegiatan_list))
        .route("/api/kegiatan/:id", get(kegiatan::kegiatan_get))
        .route("/api/kegiatan/:id/sub-kegiatan", get(kegiatan::sub_kegiatan_list))
        // Aggregates and export
        .route("/api/report/sub-kegiatan", get(report::sub_kegiatan_report))
        .route("/api/report/sumber-anggaran", get(report::sumber_anggaran_report))
        .route("/api/export/excel", get(export::excel_get))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn elevated_routes() -> Router {
    use elevated::{admin, kegiatan, masterdata, puskesmas_config, report, sumber_dana, users};

    Router::new()
        // Verification
        .route("/api/admin/verifikasi", get(admin::verifikasi_get))
        .route("/api/admin/verifikasi/detail", get(admin::verifikasi_detail_get))
        .route("/api/admin/verifikasi/bulk", post(admin::verifikasi_bulk_post))
        .route("/api/admin/laporan/:id/status", put(admin::laporan_status_put))
        .route("/api/admin/return", post(admin::return_post))
        .route("/api/admin/dashboard", get(admin::dashboard_get))
        .route("/api/report/puskesmas", get(report::puskesmas_report))
        // Accounts
        .route("/api/users", get(users::users_list).post(users::user_post))
        .route(
            "/api/users/:id",
            get(users::user_get).put(users::user_put).delete(users::user_delete),
        )
        .route("/api/users/:id/reset-password", put(users::user_reset_password_put))
        // Master data
        .route(
            "/api/masterdata/sumber-anggaran",
            get(masterdata::sumber_anggaran_list).post(masterdata::sumber_anggaran_post),
        )
        .route(
            "/api/masterdata/sumber-anggaran/:id",
            get(masterdata::sumber_anggaran_get)
                .put(masterdata::sumber_anggaran_put)
                .delete(masterdata::sumber_anggaran_delete),
        )
        .route(
            "/api/masterdata/satuan",
            get(masterdata::satuan_list).post(masterdata::satuan_post),
        )
        .route(
            "/api/masterdata/satuan/:id",
            get(masterdata::satuan_get)
                .put(masterdata::satuan_put)
                .delete(masterdata::satuan_delete),
        )
        // Kegiatan writes
        .route("/api/kegiatan", post(kegiatan::kegiatan_post))
        .route(
            "/api/kegiatan/:id",
            put(kegiatan::kegiatan_put).delete(kegiatan::kegiatan_delete),
        )
        .route("/api/kegiatan/:id/sub-kegiatan", post(kegiatan::sub_kegiatan_post))
        .route(
            "/api/kegiatan/sub-kegiatan/:id",
            put(kegiatan::sub_kegiatan_put).delete(kegiatan::sub_kegiatan_delete),
        )
        // Clinic configuration
        .route("/api/puskesmas-config", post(puskesmas_config::assignments_post))
        .route(
            "/api/puskesmas-config/:user_id",
            get(puskesmas_config::assignments_get).put(puskesmas_config::assignments_put),
        )
        .route(
            "/api/puskesmas-config/:user_id/:sub_kegiatan_id",
            axum::routing::delete(puskesmas_config::assignment_delete),
        )
        .route(
            "/api/sub-kegiatan-sumber-dana",
            get(sumber_dana::mappings_get).post(sumber_dana::mapping_post),
        )
        .route("/api/sub-kegiatan-sumber-dana/:id/toggle", patch(sumber_dana::mapping_toggle_patch))
        .route("/api/sub-kegiatan-sumber-dana/:id", axum::routing::delete(sumber_dana::mapping_delete))
        // route_layer runs outermost-last: jwt first, then the role check
        .route_layer(from_fn(require_admin_middleware))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn cors_layer() -> CorsLayer {
    let origins = &config::config().security.cors_origins;
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
}
