// handlers/elevated/mod.rs - Elevated handlers (JWT authentication + admin role)
//
// Routes here sit behind `require_admin_middleware`, so a puskesmas token
// answers 403 before any handler runs.
//
// Route Prefix: /api/admin, /api/users, /api/masterdata, /api/puskesmas-config,
//               /api/sub-kegiatan-sumber-dana, /api/report/puskesmas,
//               /api/kegiatan (writes)

pub mod admin;
pub mod kegiatan;
pub mod masterdata;
pub mod puskesmas_config;
pub mod report;
pub mod sumber_dana;
pub mod users;
