// handlers/public/system.rs - GET / and GET /health handlers

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;

/// GET / - Service information and endpoint overview
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "E-EVKIN API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Monthly puskesmas performance and budget reporting",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/api/auth/login (public - token acquisition)",
                "auth": "/api/auth/me, /api/auth/password (protected)",
                "laporan": "/api/laporan[/:id] (protected)",
                "reference": "/api/reference/* (protected)",
                "report": "/api/report/* (protected, per-puskesmas is admin only)",
                "export": "/api/export/excel (protected)",
                "admin": "/api/admin/* (admin)",
                "users": "/api/users[/:id] (admin)",
                "masterdata": "/api/masterdata/* (admin)",
                "kegiatan": "/api/kegiatan[/:id] (read protected, write admin)",
                "puskesmas_config": "/api/puskesmas-config (admin)",
                "sumber_dana": "/api/sub-kegiatan-sumber-dana (admin)",
            }
        }
    }))
}

/// GET /health - Liveness plus database reachability
///
/// 200 with `status: ok` when the pool answers, 503 otherwise.
pub async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": true,
                    "message": "Database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
