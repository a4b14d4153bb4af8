pub mod admin;
pub mod export;
pub mod kegiatan;
pub mod laporan;
pub mod masterdata;
pub mod puskesmas_config;
pub mod reference;
pub mod report;
pub mod sumber_dana;
pub mod user;
pub mod workflow;

pub use admin::AdminService;
pub use export::ExportService;
pub use kegiatan::KegiatanService;
pub use laporan::LaporanService;
pub use masterdata::MasterDataService;
pub use puskesmas_config::PuskesmasConfigService;
pub use reference::ReferenceService;
pub use report::ReportService;
pub use sumber_dana::SumberDanaService;
pub use user::UserService;
