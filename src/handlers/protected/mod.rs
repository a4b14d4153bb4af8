// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Any authenticated role. Handlers receive the caller as `Extension<AuthUser>`
// and scope data through `policy`: a puskesmas only ever sees its own rows.
//
// Route Prefix: /api/auth, /api/laporan, /api/reference, /api/kegiatan (reads),
//               /api/report (per sub kegiatan / sumber anggaran), /api/export

pub mod auth;
pub mod export;
pub mod kegiatan;
pub mod laporan;
pub mod reference;
pub mod report;
